//! Audible and haptic cue requests
//!
//! The core never plays anything. State transitions return [`Cue`] values and
//! the live shell hands them to a [`CueSink`] supplied by the platform.

use serde::{Deserialize, Serialize};

use crate::models::PhaseKind;

const LOW_TONE_HZ: u32 = 440;
const MID_TONE_HZ: u32 = 660;
const HIGH_TONE_HZ: u32 = 880;

/// What happened, independent of how it sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    WorkStart,
    RestStart,
    WorkEnd,
    RestEnd,
    PhaseChange,
    CircuitComplete,
    RunStart,
    /// Interval block change, tagged with the incoming block kind
    BlockChange(PhaseKind),
    RunComplete,
}

/// A single beep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

/// A cue request with its playback parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub kind: CueKind,

    /// Tones played back to back
    pub tones: Vec<Tone>,

    /// Alternating vibrate/pause durations in milliseconds
    pub haptic_ms: Vec<u32>,
}

impl CueKind {
    /// Resolve the playback parameters for this cue
    pub fn cue(self) -> Cue {
        let tone = |frequency_hz, duration_ms| Tone { frequency_hz, duration_ms };
        let (tones, haptic_ms) = match self {
            CueKind::WorkStart => (vec![tone(LOW_TONE_HZ, 200)], vec![100]),
            CueKind::RestStart => (vec![tone(HIGH_TONE_HZ, 200)], vec![100]),
            CueKind::WorkEnd => (vec![tone(MID_TONE_HZ, 300)], vec![200]),
            CueKind::RestEnd => (
                vec![tone(HIGH_TONE_HZ, 150), tone(HIGH_TONE_HZ, 150)],
                vec![100, 100, 100],
            ),
            CueKind::PhaseChange => (Vec::new(), vec![150]),
            CueKind::CircuitComplete => (Vec::new(), vec![400, 150, 400, 150, 400]),
            CueKind::RunStart => (vec![tone(MID_TONE_HZ, 400)], vec![300]),
            CueKind::BlockChange(PhaseKind::Work) => (vec![tone(HIGH_TONE_HZ, 300)], vec![200]),
            CueKind::BlockChange(PhaseKind::Rest) => (vec![tone(LOW_TONE_HZ, 300)], vec![200]),
            CueKind::RunComplete => (
                vec![tone(HIGH_TONE_HZ, 150), tone(HIGH_TONE_HZ, 150), tone(HIGH_TONE_HZ, 400)],
                vec![300, 100, 300, 100, 300],
            ),
        };

        Cue { kind: self, tones, haptic_ms }
    }
}

impl From<CueKind> for Cue {
    fn from(kind: CueKind) -> Self {
        kind.cue()
    }
}

/// Platform playback capability
pub trait CueSink: Send + Sync {
    fn play(&self, cue: &Cue);
}

/// Drops every cue
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCueSink;

impl CueSink for NullCueSink {
    fn play(&self, _cue: &Cue) {}
}

/// Logs cues instead of playing them; used by the CLI
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCueSink;

impl CueSink for TracingCueSink {
    fn play(&self, cue: &Cue) {
        tracing::debug!(kind = ?cue.kind, tones = cue.tones.len(), haptic = ?cue.haptic_ms, "cue");
    }
}
