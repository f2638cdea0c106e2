//! Live run session
//!
//! Tracks elapsed time, accumulates GPS-derived distance, elevation gain and
//! pace, and for interval runs steps through the expanded block sequence.
//! Every fix handed to [`RunSession::add_gps_point`] is trusted; filtering
//! happens upstream in [`crate::gps_filter::GpsFilter`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RunSettings;
use crate::cue::{Cue, CueKind};
use crate::error::{Result, SessionKind, TrainLiveError};
use crate::geo::point_distance;
use crate::models::{expand_blocks, GpsPoint, IntervalBlock, PhaseKind, RunPhase, RunType};

/// Immutable result of a finished run, handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Activity log entry this run is stored under
    pub log_id: String,
    /// Training plan the run came from, if any
    pub plan_id: Option<String>,
    pub name: String,
    pub run_type: RunType,
    /// Ticks counted between start and end
    pub elapsed_seconds: u32,
    /// Sum of haversine distances between consecutive fixes
    pub distance_m: f64,
    /// Last pace reading in seconds per kilometer
    pub current_pace: Option<f64>,
    /// Elapsed time over total distance, in seconds per kilometer
    pub average_pace: Option<f64>,
    /// Lowest pace reading seen during the run
    pub best_pace: Option<f64>,
    /// Sum of positive altitude deltas in meters
    pub elevation_gain_m: f64,
    /// Every accepted fix in arrival order
    pub track: Vec<GpsPoint>,
    pub ended_at: DateTime<Utc>,
}

/// Read-only view for renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSnapshot {
    pub phase: RunPhase,
    pub active: bool,
    pub elapsed_seconds: u32,
    pub distance_m: f64,
    pub elevation_gain_m: f64,
    pub current_pace: Option<f64>,
    pub average_pace: Option<f64>,
    pub best_pace: Option<f64>,
    pub point_count: usize,
    pub block: Option<BlockProgress>,
}

/// Position within an interval program
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockProgress {
    /// Zero-based index into the expanded block list
    pub index: usize,
    /// Number of blocks after expanding repeats
    pub count: usize,
    pub kind: PhaseKind,
    /// Seconds left in the current block
    pub remaining_seconds: u32,
    /// Target pace in seconds per kilometer
    pub target_pace: Option<f64>,
    pub label: Option<String>,
}

/// State machine for one run
///
/// A run moves from `Idle` through `Free` (or the warmup/work/cooldown stages
/// of an interval program) to `Complete`. The caller owns the clock and calls
/// [`RunSession::tick`] once per second; fixes arrive independently through
/// [`RunSession::add_gps_point`].
#[derive(Debug, Clone)]
pub struct RunSession {
    settings: RunSettings,
    log_id: String,
    plan_id: Option<String>,
    name: String,
    run_type: RunType,
    phase: RunPhase,
    active: bool,
    elapsed_seconds: u32,
    track: Vec<GpsPoint>,
    distance_m: f64,
    elevation_gain_m: f64,
    current_pace: Option<f64>,
    best_pace: Option<f64>,
    blocks: Vec<IntervalBlock>,
    block_index: usize,
    block_remaining: u32,
}

impl Default for RunSession {
    fn default() -> Self {
        Self::new(RunSettings::default())
    }
}

impl RunSession {
    /// Create an idle session using the given pace window settings
    pub fn new(settings: RunSettings) -> Self {
        Self {
            settings,
            log_id: String::new(),
            plan_id: None,
            name: String::new(),
            run_type: RunType::Free,
            phase: RunPhase::Idle,
            active: false,
            elapsed_seconds: 0,
            track: Vec::new(),
            distance_m: 0.0,
            elevation_gain_m: 0.0,
            current_pace: None,
            best_pace: None,
            blocks: Vec::new(),
            block_index: 0,
            block_remaining: 0,
        }
    }

    /// Start a run. Interval runs with blocks begin in the stage of their first
    /// block; everything else runs in `free`.
    ///
    /// Returns the `RunStart` cue. Fails with `AlreadyActive` while a run is in
    /// progress and with `Validation` when an interval block is malformed.
    pub fn start_run(
        &mut self,
        log_id: impl Into<String>,
        plan_id: Option<String>,
        name: impl Into<String>,
        run_type: RunType,
        blocks: &[IntervalBlock],
    ) -> Result<Cue> {
        if self.active {
            return Err(TrainLiveError::AlreadyActive { session: SessionKind::Run });
        }

        let blocks = match run_type {
            RunType::Interval => expand_blocks(blocks)?,
            _ => Vec::new(),
        };

        *self = Self::new(self.settings);
        self.log_id = log_id.into();
        self.plan_id = plan_id;
        self.name = name.into();
        self.run_type = run_type;
        self.active = true;

        match blocks.first() {
            Some(first) => {
                self.phase = first.stage.into();
                self.block_remaining = first.duration_seconds;
            }
            None => self.phase = RunPhase::Free,
        }
        self.blocks = blocks;

        tracing::info!(
            log_id = %self.log_id,
            run_type = ?run_type,
            blocks = self.blocks.len(),
            "run started"
        );
        Ok(CueKind::RunStart.cue())
    }

    /// Advance one second. Returns the cue of a block transition if any.
    pub fn tick(&mut self) -> Option<Cue> {
        if !self.active {
            return None;
        }

        self.elapsed_seconds += 1;

        if self.run_type != RunType::Interval
            || self.blocks.is_empty()
            || self.phase == RunPhase::Complete
        {
            return None;
        }

        self.block_remaining = self.block_remaining.saturating_sub(1);
        if self.block_remaining > 0 {
            return None;
        }

        if self.block_index + 1 < self.blocks.len() {
            self.block_index += 1;
            let block = &self.blocks[self.block_index];
            self.block_remaining = block.duration_seconds;
            self.phase = block.stage.into();
            tracing::debug!(index = self.block_index, kind = ?block.kind, "interval block");
            Some(CueKind::BlockChange(block.kind).cue())
        } else {
            self.phase = RunPhase::Complete;
            tracing::info!(elapsed = self.elapsed_seconds, "interval program complete");
            Some(CueKind::RunComplete.cue())
        }
    }

    /// Append a fix and update distance, elevation gain and pace
    ///
    /// A reported speed above `min_reliable_speed_mps` gives the current pace
    /// directly. Otherwise the pace comes from [`RunSession::rolling_window_pace`].
    /// Fixes for an inactive run are dropped.
    pub fn add_gps_point(&mut self, point: GpsPoint) {
        if !self.active {
            tracing::debug!("ignoring fix for inactive run");
            return;
        }

        if let Some(prev) = self.track.last() {
            self.distance_m += point_distance(prev, &point);
            if let (Some(from), Some(to)) = (prev.altitude, point.altitude) {
                if to > from {
                    self.elevation_gain_m += to - from;
                }
            }
        }

        let reported = point
            .speed
            .filter(|speed| *speed > self.settings.min_reliable_speed_mps)
            .map(|speed| 1000.0 / speed);

        self.track.push(point);

        self.current_pace = reported.or_else(|| self.rolling_window_pace());
        if let Some(pace) = self.current_pace {
            self.best_pace = Some(self.best_pace.map_or(pace, |best| best.min(pace)));
        }
    }

    /// Pace over the trailing `rolling_window_m` of track, in seconds per km
    ///
    /// `None` until the window covers at least `min_window_m`, or when the
    /// fixes in the window share a timestamp.
    pub fn rolling_window_pace(&self) -> Option<f64> {
        let last = self.track.last()?;
        let mut window_m = 0.0;
        let mut start = last;

        for pair in self.track.windows(2).rev() {
            if window_m >= self.settings.rolling_window_m {
                break;
            }
            window_m += point_distance(&pair[0], &pair[1]);
            start = &pair[0];
        }

        if window_m < self.settings.min_window_m {
            return None;
        }

        let seconds = (last.timestamp - start.timestamp) as f64 / 1000.0;
        if seconds <= 0.0 {
            return None;
        }
        Some(seconds / (window_m / 1000.0))
    }

    /// Elapsed seconds per kilometer over the whole run
    pub fn average_pace(&self) -> Option<f64> {
        if self.elapsed_seconds == 0 || self.distance_m <= 0.0 {
            return None;
        }
        Some(self.elapsed_seconds as f64 / (self.distance_m / 1000.0))
    }

    /// Stop the run and capture its summary. State is kept until `reset`.
    pub fn end_run(&mut self) -> RunSummary {
        self.active = false;
        self.phase = RunPhase::Complete;

        let summary = RunSummary {
            log_id: self.log_id.clone(),
            plan_id: self.plan_id.clone(),
            name: self.name.clone(),
            run_type: self.run_type,
            elapsed_seconds: self.elapsed_seconds,
            distance_m: self.distance_m,
            current_pace: self.current_pace,
            average_pace: self.average_pace(),
            best_pace: self.best_pace,
            elevation_gain_m: self.elevation_gain_m,
            track: self.track.clone(),
            ended_at: Utc::now(),
        };

        tracing::info!(
            log_id = %summary.log_id,
            elapsed = summary.elapsed_seconds,
            distance_m = summary.distance_m,
            points = summary.track.len(),
            "run ended"
        );
        summary
    }

    /// Discard everything and return to idle
    pub fn reset(&mut self) {
        *self = Self::new(self.settings);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current stage; `Complete` once the program finishes or the run ends
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn run_type(&self) -> RunType {
        self.run_type
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn elevation_gain_m(&self) -> f64 {
        self.elevation_gain_m
    }

    pub fn current_pace(&self) -> Option<f64> {
        self.current_pace
    }

    pub fn best_pace(&self) -> Option<f64> {
        self.best_pace
    }

    pub fn track(&self) -> &[GpsPoint] {
        &self.track
    }

    pub fn blocks(&self) -> &[IntervalBlock] {
        &self.blocks
    }

    /// Index of the running block, `None` for runs without a program
    pub fn current_block_index(&self) -> Option<usize> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(self.block_index)
        }
    }

    pub fn current_block(&self) -> Option<&IntervalBlock> {
        self.blocks.get(self.block_index)
    }

    pub fn block_remaining_seconds(&self) -> u32 {
        self.block_remaining
    }

    /// Copy the renderable state, including block progress for interval runs
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            phase: self.phase,
            active: self.active,
            elapsed_seconds: self.elapsed_seconds,
            distance_m: self.distance_m,
            elevation_gain_m: self.elevation_gain_m,
            current_pace: self.current_pace,
            average_pace: self.average_pace(),
            best_pace: self.best_pace,
            point_count: self.track.len(),
            block: self.current_block().map(|block| BlockProgress {
                index: self.block_index,
                count: self.blocks.len(),
                kind: block.kind,
                remaining_seconds: self.block_remaining,
                target_pace: block.target_pace,
                label: block.label.clone(),
            }),
        }
    }
}
