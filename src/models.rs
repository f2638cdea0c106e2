use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainLiveError};

/// One location fix delivered by the platform location provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Altitude in meters, when the fix carries one
    #[serde(default)]
    pub altitude: Option<f64>,

    /// Capture time in milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Instantaneous speed in meters per second
    #[serde(default)]
    pub speed: Option<f64>,

    /// Horizontal accuracy radius in meters
    #[serde(default)]
    pub accuracy: f64,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            timestamp,
            speed: None,
            accuracy: 0.0,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy;
        self
    }
}

/// Work or rest, shared by interval blocks and the rest/work timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Work,
    Rest,
}

/// Where a block sits in a structured run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStage {
    Warmup,
    #[default]
    Main,
    Cooldown,
}

/// One phase of a structured run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalBlock {
    /// Ordered position within the program
    pub position: u32,

    /// Work or rest
    pub kind: PhaseKind,

    /// Duration of one repetition in seconds
    pub duration_seconds: u32,

    /// Target pace in seconds per kilometer
    #[serde(default)]
    pub target_pace: Option<f64>,

    /// Human readable label ("400m repeat", "jog")
    #[serde(default)]
    pub label: Option<String>,

    /// Number of consecutive repetitions this block stands for
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,

    /// Warmup, main set or cooldown
    #[serde(default)]
    pub stage: BlockStage,
}

fn default_repetitions() -> u32 {
    1
}

impl IntervalBlock {
    pub fn work(duration_seconds: u32) -> Self {
        Self::new(PhaseKind::Work, duration_seconds)
    }

    pub fn rest(duration_seconds: u32) -> Self {
        Self::new(PhaseKind::Rest, duration_seconds)
    }

    fn new(kind: PhaseKind, duration_seconds: u32) -> Self {
        Self {
            position: 0,
            kind,
            duration_seconds,
            target_pace: None,
            label: None,
            repetitions: 1,
            stage: BlockStage::Main,
        }
    }

    pub fn repeated(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn in_stage(mut self, stage: BlockStage) -> Self {
        self.stage = stage;
        self
    }
}

/// Expand blocks with `repetitions > 1` into consecutive single-repetition
/// blocks, ordered by source position and renumbered from zero.
pub fn expand_blocks(blocks: &[IntervalBlock]) -> Result<Vec<IntervalBlock>> {
    let mut sorted: Vec<&IntervalBlock> = blocks.iter().collect();
    sorted.sort_by_key(|b| b.position);

    let mut expanded = Vec::new();
    for block in sorted {
        if block.duration_seconds == 0 {
            return Err(TrainLiveError::Validation(format!(
                "interval block {} has zero duration",
                block.position
            )));
        }
        if block.repetitions == 0 {
            return Err(TrainLiveError::Validation(format!(
                "interval block {} has zero repetitions",
                block.position
            )));
        }

        for _ in 0..block.repetitions {
            let mut single = block.clone();
            single.repetitions = 1;
            single.position = expanded.len() as u32;
            expanded.push(single);
        }
    }

    Ok(expanded)
}

/// How a run session is structured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Free,
    Distance,
    Duration,
    Interval,
}

impl std::str::FromStr for RunType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(RunType::Free),
            "distance" => Ok(RunType::Distance),
            "duration" => Ok(RunType::Duration),
            "interval" | "intervals" => Ok(RunType::Interval),
            _ => Err(format!("Invalid run type: {}", s)),
        }
    }
}

/// Phase of a run session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Idle,
    Warmup,
    Interval,
    Cooldown,
    Free,
    Complete,
}

impl From<BlockStage> for RunPhase {
    fn from(stage: BlockStage) -> Self {
        match stage {
            BlockStage::Warmup => RunPhase::Warmup,
            BlockStage::Main => RunPhase::Interval,
            BlockStage::Cooldown => RunPhase::Cooldown,
        }
    }
}

/// One step of a circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitStep {
    /// Exercise identifier in the external store
    pub exercise_id: String,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Timed duration in seconds (falls back to the configured default)
    #[serde(default)]
    pub duration_seconds: Option<u32>,

    /// Target repetitions for rep-based steps
    #[serde(default)]
    pub reps: Option<u32>,

    /// Rest after this step in seconds; zero skips the rest phase
    #[serde(default)]
    pub rest_seconds: u32,
}

impl CircuitStep {
    pub fn timed(exercise_id: impl Into<String>, duration_seconds: u32, rest_seconds: u32) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            name: None,
            duration_seconds: Some(duration_seconds),
            reps: None,
            rest_seconds,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.exercise_id)
    }
}

/// Whether an exercise is counted in reps or held for a duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseMode {
    #[default]
    Reps,
    Duration,
}

/// One logged set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSet {
    /// 1-based set number within the exercise
    pub set_number: u32,

    /// Load in kilograms
    pub weight: f64,

    /// Repetitions performed
    pub reps: u32,

    /// Subjective feeling 1 (very hard) to 5 (very easy)
    pub feeling: Option<u8>,

    /// When the set was completed
    pub completed_at: DateTime<Utc>,
}

/// Exercise within an in-progress strength session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExercise {
    /// Exercise identifier in the external store
    pub exercise_id: String,

    /// Display name
    pub name: String,

    /// Number of planned sets
    pub planned_sets: u32,

    /// Rest between sets in seconds
    pub rest_seconds: u32,

    /// Reps or duration based
    #[serde(default)]
    pub mode: ExerciseMode,

    /// Target reps per set
    #[serde(default)]
    pub target_reps: Option<u32>,

    /// Target hold per set in seconds (duration mode)
    #[serde(default)]
    pub target_duration_seconds: Option<u32>,

    /// Target load in kilograms
    #[serde(default)]
    pub target_weight: Option<f64>,

    /// Sets logged so far, append-only
    #[serde(default)]
    pub sets: Vec<CompletedSet>,
}

impl SessionExercise {
    pub fn new(exercise_id: impl Into<String>, name: impl Into<String>, planned_sets: u32, rest_seconds: u32) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            name: name.into(),
            planned_sets,
            rest_seconds,
            mode: ExerciseMode::Reps,
            target_reps: None,
            target_duration_seconds: None,
            target_weight: None,
            sets: Vec::new(),
        }
    }

    pub fn timed(mut self, duration_seconds: u32) -> Self {
        self.mode = ExerciseMode::Duration;
        self.target_duration_seconds = Some(duration_seconds);
        self
    }
}

/// Format a pace in seconds per kilometer as `m:ss /km`
pub fn format_pace(seconds_per_km: Option<f64>) -> String {
    match seconds_per_km {
        Some(pace) if pace.is_finite() && pace > 0.0 => {
            let total = pace.round() as u64;
            format!("{}:{:02} /km", total / 60, total % 60)
        }
        _ => "--:-- /km".to_string(),
    }
}

/// Format a second count as `h:mm:ss` or `m:ss`
pub fn format_duration(seconds: u32) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
