//! Rest/work countdown used between strength sets
//!
//! A single countdown that alternates between work and rest. Completion of a
//! work phase hands back the follow-up captured at start time as a
//! [`NextPhase`] value; the caller decides how to act on it.

use serde::Serialize;

use crate::config::TimerSettings;
use crate::cue::{Cue, CueKind};
use crate::models::PhaseKind;

/// Transition to run once a work phase ends (naturally or skipped)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NextPhase {
    /// Start a rest countdown of this many seconds
    Rest(u32),
}

/// A countdown to start, as planned by a session that holds no timer itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub mode: PhaseKind,
    /// None falls back to the timer's configured default
    pub seconds: Option<u32>,
    pub then: Option<NextPhase>,
}

impl Countdown {
    pub fn start_on(self, timer: &mut RestWorkTimer) -> Cue {
        timer.start(self.seconds, self.mode, self.then)
    }
}

/// Effects produced by `tick` or `skip`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerOutcome {
    pub cues: Vec<Cue>,
    pub next: Option<NextPhase>,
}

impl TimerOutcome {
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty() && self.next.is_none()
    }
}

/// Read-only view for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub mode: PhaseKind,
    pub remaining_seconds: u32,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct RestWorkTimer {
    settings: TimerSettings,
    mode: PhaseKind,
    remaining: u32,
    active: bool,
    then: Option<NextPhase>,
}

impl Default for RestWorkTimer {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}

impl RestWorkTimer {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            settings,
            mode: PhaseKind::Rest,
            remaining: 0,
            active: false,
            then: None,
        }
    }

    /// Start a countdown, replacing whatever was running.
    ///
    /// `seconds` falls back to the configured default for the mode. `then` is
    /// only honoured for work phases.
    pub fn start(&mut self, seconds: Option<u32>, mode: PhaseKind, then: Option<NextPhase>) -> Cue {
        let seconds = seconds.unwrap_or(match mode {
            PhaseKind::Rest => self.settings.default_rest_seconds,
            PhaseKind::Work => self.settings.default_work_seconds,
        });

        if self.active {
            tracing::debug!(mode = ?self.mode, remaining = self.remaining, "replacing running countdown");
        }

        self.mode = mode;
        self.remaining = seconds;
        self.active = true;
        self.then = then;

        tracing::debug!(?mode, seconds, "countdown started");
        match mode {
            PhaseKind::Work => CueKind::WorkStart.cue(),
            PhaseKind::Rest => CueKind::RestStart.cue(),
        }
    }

    /// Start the phase described by a pending transition
    pub fn chain(&mut self, next: NextPhase) -> Cue {
        match next {
            NextPhase::Rest(seconds) => self.start(Some(seconds), PhaseKind::Rest, None),
        }
    }

    /// Advance one second
    pub fn tick(&mut self) -> TimerOutcome {
        if !self.active {
            return TimerOutcome::default();
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return TimerOutcome::default();
        }

        let cue = match self.mode {
            PhaseKind::Work => CueKind::WorkEnd.cue(),
            PhaseKind::Rest => CueKind::RestEnd.cue(),
        };
        TimerOutcome {
            cues: vec![cue],
            next: self.finish(),
        }
    }

    /// Stop immediately. A skipped work phase still yields its follow-up.
    pub fn skip(&mut self) -> TimerOutcome {
        if !self.active {
            return TimerOutcome::default();
        }

        tracing::debug!(mode = ?self.mode, remaining = self.remaining, "countdown skipped");
        self.remaining = 0;
        TimerOutcome {
            cues: Vec::new(),
            next: self.finish(),
        }
    }

    /// Add or remove seconds, floored at zero. No-op while inactive.
    pub fn adjust(&mut self, delta_seconds: i64) {
        if !self.active {
            return;
        }

        let adjusted = (self.remaining as i64 + delta_seconds).clamp(0, u32::MAX as i64);
        self.remaining = adjusted as u32;
    }

    /// Cancel without completing; no follow-up is produced
    pub fn stop(&mut self) {
        self.active = false;
        self.then = None;
    }

    fn finish(&mut self) -> Option<NextPhase> {
        self.active = false;
        let then = self.then.take();
        match self.mode {
            PhaseKind::Work => then,
            PhaseKind::Rest => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mode(&self) -> PhaseKind {
        self.mode
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            remaining_seconds: self.remaining,
            active: self.active,
        }
    }
}
