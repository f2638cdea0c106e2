// Library interface for the trainlive modules
// Integration tests and the CLI go through this crate root

pub mod circuit;
pub mod config;
pub mod cue;
pub mod error;
pub mod geo;
pub mod gps_filter;
pub mod live;
pub mod logging;
pub mod models;
pub mod records;
pub mod replay;
pub mod run;
pub mod strength;
pub mod timer;
pub mod track;

// Re-export commonly used types for convenience
pub use models::*;
pub use circuit::{CircuitPhase, CircuitRunner, CircuitSnapshot};
pub use config::AppConfig;
pub use cue::{Cue, CueKind, CueSink, NullCueSink, TracingCueSink};
pub use error::{Result, SessionKind, TrackError, TrainLiveError};
pub use gps_filter::{FilterDecision, GpsFilter};
pub use live::{ActivitySink, LiveCircuit, LiveRun, LiveStrength, LiveTimer};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use run::{RunSession, RunSnapshot, RunSummary};
pub use strength::{ActiveStrengthSession, SetRecord, StrengthSnapshot};
pub use timer::{NextPhase, RestWorkTimer, TimerSnapshot};
