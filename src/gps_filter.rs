//! Upstream acceptance policy for raw location fixes
//!
//! A run session trusts every point it receives, so noisy fixes have to be
//! dropped before they get there.

use serde::Serialize;

use crate::config::GpsFilterSettings;
use crate::geo::point_distance;
use crate::models::GpsPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDecision {
    Accepted,
    /// Horizontal accuracy worse than the threshold
    LowAccuracy { accuracy_m: f64 },
    /// Too close to the last accepted fix
    TooClose { distance_m: f64 },
}

impl FilterDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterDecision::Accepted)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GpsFilter {
    settings: GpsFilterSettings,
    last_accepted: Option<GpsPoint>,
    rejected: usize,
}

impl GpsFilter {
    pub fn new(settings: GpsFilterSettings) -> Self {
        Self {
            settings,
            last_accepted: None,
            rejected: 0,
        }
    }

    /// Decide whether a fix should reach the run session
    pub fn check(&mut self, point: &GpsPoint) -> FilterDecision {
        let decision = self.evaluate(point);
        match decision {
            FilterDecision::Accepted => self.last_accepted = Some(point.clone()),
            _ => {
                self.rejected += 1;
                tracing::trace!(?decision, "fix rejected");
            }
        }
        decision
    }

    fn evaluate(&self, point: &GpsPoint) -> FilterDecision {
        if point.accuracy > self.settings.max_accuracy_m {
            return FilterDecision::LowAccuracy { accuracy_m: point.accuracy };
        }

        if let Some(last) = &self.last_accepted {
            let distance_m = point_distance(last, point);
            if distance_m < self.settings.min_movement_m {
                return FilterDecision::TooClose { distance_m };
            }
        }

        FilterDecision::Accepted
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
        self.rejected = 0;
    }
}
