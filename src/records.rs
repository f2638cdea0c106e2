//! Best efforts over standard distances
//!
//! Personal records are judged by the persistence collaborator; this module
//! only extracts the fastest stretch of a finished track for each distance.

use serde::Serialize;
use std::fmt;

use crate::geo::cumulative_distances;
use crate::models::GpsPoint;

/// Slack for floating point sums of segment distances
const DISTANCE_EPSILON_M: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StandardDistance {
    OneK,
    OneMile,
    FiveK,
    TenK,
    HalfMarathon,
    Marathon,
}

impl StandardDistance {
    pub const ALL: [StandardDistance; 6] = [
        StandardDistance::OneK,
        StandardDistance::OneMile,
        StandardDistance::FiveK,
        StandardDistance::TenK,
        StandardDistance::HalfMarathon,
        StandardDistance::Marathon,
    ];

    pub fn meters(&self) -> f64 {
        match self {
            StandardDistance::OneK => 1_000.0,
            StandardDistance::OneMile => 1_609.344,
            StandardDistance::FiveK => 5_000.0,
            StandardDistance::TenK => 10_000.0,
            StandardDistance::HalfMarathon => 21_097.5,
            StandardDistance::Marathon => 42_195.0,
        }
    }
}

impl fmt::Display for StandardDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StandardDistance::OneK => write!(f, "1K"),
            StandardDistance::OneMile => write!(f, "1 mile"),
            StandardDistance::FiveK => write!(f, "5K"),
            StandardDistance::TenK => write!(f, "10K"),
            StandardDistance::HalfMarathon => write!(f, "Half marathon"),
            StandardDistance::Marathon => write!(f, "Marathon"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestEffort {
    pub distance: StandardDistance,
    /// Time for exactly the target distance, scaled from the covering stretch
    pub seconds: f64,
    pub start_index: usize,
    pub end_index: usize,
}

/// Fastest stretch of `track` covering at least `target_m`.
///
/// Returns `(seconds, start_index, end_index)` where `seconds` is scaled down
/// to the exact target distance.
pub fn best_effort_seconds(track: &[GpsPoint], target_m: f64) -> Option<(f64, usize, usize)> {
    if track.len() < 2 || target_m <= 0.0 {
        return None;
    }

    let cumulative = cumulative_distances(track);
    let mut best: Option<(f64, usize, usize)> = None;
    let mut start = 0;

    for end in 1..track.len() {
        while start + 1 < end && cumulative[end] - cumulative[start + 1] + DISTANCE_EPSILON_M >= target_m {
            start += 1;
        }

        let covered = cumulative[end] - cumulative[start];
        if covered + DISTANCE_EPSILON_M < target_m {
            continue;
        }

        let elapsed = (track[end].timestamp - track[start].timestamp) as f64 / 1000.0;
        if elapsed <= 0.0 {
            continue;
        }

        let seconds = elapsed * target_m / covered;
        if best.map_or(true, |(b, _, _)| seconds < b) {
            best = Some((seconds, start, end));
        }
    }

    best
}

/// Best efforts for every standard distance the track is long enough for
pub fn best_efforts(track: &[GpsPoint]) -> Vec<BestEffort> {
    StandardDistance::ALL
        .iter()
        .filter_map(|distance| {
            best_effort_seconds(track, distance.meters()).map(|(seconds, start_index, end_index)| BestEffort {
                distance: *distance,
                seconds,
                start_index,
                end_index,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::meters_to_latitude_degrees;

    /// 100 m segments with the given per-segment durations in seconds
    fn track_with_splits(splits: &[i64]) -> Vec<GpsPoint> {
        let step = meters_to_latitude_degrees(100.0);
        let mut t = 0;
        let mut points = vec![GpsPoint::new(0.0, 0.0, t)];
        for (i, split) in splits.iter().enumerate() {
            t += split * 1000;
            points.push(GpsPoint::new(step * (i + 1) as f64, 0.0, t));
        }
        points
    }

    #[test]
    fn test_short_track_has_no_effort() {
        assert!(best_effort_seconds(&track_with_splits(&[30, 30]), 1000.0).is_none());
        assert!(best_efforts(&[]).is_empty());
    }

    #[test]
    fn test_best_effort_finds_fastest_stretch() {
        // 15 x 100 m: slow 30 s splits with a fast 1 km in the middle
        let mut splits = vec![30; 3];
        splits.extend(vec![20; 10]);
        splits.extend(vec![30; 2]);
        let track = track_with_splits(&splits);

        let (seconds, start, end) = best_effort_seconds(&track, 1000.0).unwrap();
        assert!((seconds - 200.0).abs() < 0.5, "got {}", seconds);
        assert_eq!(start, 3);
        assert_eq!(end, 13);
    }

    #[test]
    fn test_best_efforts_lists_reachable_distances() {
        let track = track_with_splits(&vec![25; 60]);
        let efforts = best_efforts(&track);

        let distances: Vec<StandardDistance> = efforts.iter().map(|e| e.distance).collect();
        assert_eq!(distances, vec![StandardDistance::OneK, StandardDistance::OneMile, StandardDistance::FiveK]);

        let mile = &efforts[1];
        assert!((mile.seconds - 1609.344 * 0.25).abs() < 1.0);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(StandardDistance::HalfMarathon.to_string(), "Half marathon");
        assert_eq!(StandardDistance::FiveK.to_string(), "5K");
    }
}
