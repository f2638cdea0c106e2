//! Deterministic offline driver: feeds a recorded track through the GPS
//! filter and a run session, ticking the session by fix timestamps instead
//! of a wall clock.

use serde::Serialize;

use crate::config::AppConfig;
use crate::cue::CueKind;
use crate::error::Result;
use crate::gps_filter::GpsFilter;
use crate::models::{GpsPoint, IntervalBlock, RunType};
use crate::records::{best_efforts, BestEffort};
use crate::run::{RunSession, RunSummary};

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub log_id: String,
    pub name: String,
    pub run_type: RunType,
    pub blocks: Vec<IntervalBlock>,
}

impl ReplayOptions {
    pub fn free(log_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            log_id: log_id.into(),
            name: name.into(),
            run_type: RunType::Free,
            blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub summary: RunSummary,
    pub accepted: usize,
    pub rejected: usize,
    /// Cues in emission order, with the elapsed second they fired at
    pub cues: Vec<(u32, CueKind)>,
    pub best_efforts: Vec<BestEffort>,
}

pub fn replay_track(points: &[GpsPoint], config: &AppConfig, options: ReplayOptions) -> Result<ReplayReport> {
    let mut run = RunSession::new(config.run);
    let mut filter = GpsFilter::new(config.gps);
    let mut cues = Vec::new();

    let start = run.start_run(options.log_id, None, options.name, options.run_type, &options.blocks)?;
    cues.push((0, start.kind));

    let origin = points.first().map_or(0, |p| p.timestamp);
    let mut accepted = 0;

    for point in points {
        let target = ((point.timestamp - origin).max(0) / 1000) as u32;
        while run.elapsed_seconds() < target {
            if let Some(cue) = run.tick() {
                cues.push((run.elapsed_seconds(), cue.kind));
            }
        }

        if filter.check(point).is_accepted() {
            run.add_gps_point(point.clone());
            accepted += 1;
        }
    }

    let summary = run.end_run();
    let efforts = best_efforts(&summary.track);
    tracing::info!(accepted, rejected = filter.rejected_count(), "replay finished");

    Ok(ReplayReport {
        summary,
        accepted,
        rejected: filter.rejected_count(),
        cues,
        best_efforts: efforts,
    })
}
