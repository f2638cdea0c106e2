//! Circuit runner: ordered timed steps cycled through a number of rounds
//!
//! ```text
//! exercise --(expire|skip)--> rest --(expire|skip)--> next step | next round | complete
//! ```
//!
//! A step with zero rest goes straight to the next step/round decision.

use serde::Serialize;

use crate::config::CircuitSettings;
use crate::cue::{Cue, CueKind};
use crate::error::{Result, SessionKind, TrainLiveError};
use crate::models::CircuitStep;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitPhase {
    #[default]
    Exercise,
    /// Recovery after a step with non-zero rest
    Rest,
    /// Last round finished; the runner is inactive
    Complete,
}

/// Read-only view for renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub phase: CircuitPhase,
    pub step_index: usize,
    pub exercise_id: Option<String>,
    /// One-based round number
    pub round: u32,
    pub total_rounds: u32,
    pub remaining_seconds: u32,
    pub active: bool,
}

/// Drives a circuit one second at a time
///
/// Each step runs its exercise phase, then its rest phase when
/// `rest_seconds > 0`. After the last step the runner wraps to step 0 of the
/// next round until `total_rounds` are done. Transitions come back as cues;
/// the caller decides how to play them.
#[derive(Debug, Clone)]
pub struct CircuitRunner {
    settings: CircuitSettings,
    steps: Vec<CircuitStep>,
    step_index: usize,
    round: u32,
    total_rounds: u32,
    phase: CircuitPhase,
    remaining: u32,
    active: bool,
}

impl Default for CircuitRunner {
    fn default() -> Self {
        Self::new(CircuitSettings::default())
    }
}

impl CircuitRunner {
    /// Create an idle runner; `settings` supplies the duration of steps
    /// that omit one
    pub fn new(settings: CircuitSettings) -> Self {
        Self {
            settings,
            steps: Vec::new(),
            step_index: 0,
            round: 1,
            total_rounds: 1,
            phase: CircuitPhase::Exercise,
            remaining: 0,
            active: false,
        }
    }

    /// Begin a circuit at step 0, round 1
    ///
    /// Rejects an empty step list, zero rounds and steps with an explicit zero
    /// duration, and fails with `AlreadyActive` while a circuit is running.
    pub fn start_workout(&mut self, steps: Vec<CircuitStep>, total_rounds: u32) -> Result<Cue> {
        if self.active {
            return Err(TrainLiveError::AlreadyActive { session: SessionKind::Circuit });
        }
        if steps.is_empty() {
            return Err(TrainLiveError::Validation("circuit has no steps".to_string()));
        }
        if total_rounds == 0 {
            return Err(TrainLiveError::Validation("circuit needs at least one round".to_string()));
        }
        if let Some(step) = steps.iter().find(|s| s.duration_seconds == Some(0)) {
            return Err(TrainLiveError::Validation(format!(
                "step {} has zero duration",
                step.display_name()
            )));
        }

        self.steps = steps;
        self.total_rounds = total_rounds;
        self.step_index = 0;
        self.round = 1;
        self.phase = CircuitPhase::Exercise;
        self.remaining = self.step_duration(0);
        self.active = true;

        tracing::info!(steps = self.steps.len(), rounds = total_rounds, "circuit started");
        Ok(CueKind::PhaseChange.cue())
    }

    /// Advance one second; returns the cue of a transition if one happened
    pub fn tick(&mut self) -> Option<Cue> {
        if !self.active {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return None;
        }
        Some(self.advance())
    }

    /// End the current phase now, exactly as if it had expired
    pub fn skip_phase(&mut self) -> Option<Cue> {
        if !self.active {
            return None;
        }
        Some(self.advance())
    }

    fn advance(&mut self) -> Cue {
        if self.phase == CircuitPhase::Exercise {
            let rest = self.steps[self.step_index].rest_seconds;
            if rest > 0 {
                self.phase = CircuitPhase::Rest;
                self.remaining = rest;
                tracing::debug!(step = self.step_index, round = self.round, rest, "circuit rest");
                return CueKind::PhaseChange.cue();
            }
        }
        self.next_step()
    }

    fn next_step(&mut self) -> Cue {
        if self.step_index + 1 < self.steps.len() {
            self.step_index += 1;
        } else if self.round < self.total_rounds {
            self.step_index = 0;
            self.round += 1;
        } else {
            self.phase = CircuitPhase::Complete;
            self.remaining = 0;
            self.active = false;
            tracing::info!(rounds = self.total_rounds, "circuit complete");
            return CueKind::CircuitComplete.cue();
        }

        self.phase = CircuitPhase::Exercise;
        self.remaining = self.step_duration(self.step_index);
        tracing::debug!(step = self.step_index, round = self.round, "circuit exercise");
        CueKind::PhaseChange.cue()
    }

    fn step_duration(&self, index: usize) -> u32 {
        self.steps[index]
            .duration_seconds
            .unwrap_or(self.settings.default_step_seconds)
    }

    /// Stop and return to the initial empty state
    pub fn reset(&mut self) {
        *self = Self::new(self.settings);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn phase(&self) -> CircuitPhase {
        self.phase
    }

    /// Step being exercised or rested after; `None` before the first start
    pub fn current_step(&self) -> Option<&CircuitStep> {
        self.steps.get(self.step_index)
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Seconds left in the current phase
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining
    }

    /// Seconds left until the circuit completes, assuming no skips
    pub fn total_remaining_seconds(&self) -> u32 {
        if !self.active {
            return 0;
        }

        let step_total = |i: usize| self.step_duration(i) + self.steps[i].rest_seconds;
        let mut total = self.remaining;
        if self.phase == CircuitPhase::Exercise {
            total += self.steps[self.step_index].rest_seconds;
        }
        total += (self.step_index + 1..self.steps.len()).map(step_total).sum::<u32>();
        let full_round: u32 = (0..self.steps.len()).map(step_total).sum();
        total + full_round * (self.total_rounds - self.round)
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        CircuitSnapshot {
            phase: self.phase,
            step_index: self.step_index,
            exercise_id: self.current_step().map(|s| s.exercise_id.clone()),
            round: self.round,
            total_rounds: self.total_rounds,
            remaining_seconds: self.remaining,
            active: self.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step_circuit() -> Vec<CircuitStep> {
        vec![
            CircuitStep::timed("squat", 3, 2),
            CircuitStep::timed("pushup", 2, 1),
        ]
    }

    fn run_phase(runner: &mut CircuitRunner) -> Cue {
        loop {
            if let Some(cue) = runner.tick() {
                return cue;
            }
        }
    }

    #[test]
    fn test_start_sets_initial_state() {
        let mut runner = CircuitRunner::default();
        runner.start_workout(two_step_circuit(), 3).unwrap();

        let snap = runner.snapshot();
        assert_eq!(snap.phase, CircuitPhase::Exercise);
        assert_eq!(snap.step_index, 0);
        assert_eq!(snap.round, 1);
        assert_eq!(snap.remaining_seconds, 3);
        assert_eq!(snap.exercise_id.as_deref(), Some("squat"));
        assert!(snap.active);
    }

    #[test]
    fn test_missing_duration_uses_default() {
        let mut runner = CircuitRunner::new(CircuitSettings { default_step_seconds: 30 });
        let step = CircuitStep {
            exercise_id: "burpee".to_string(),
            name: None,
            duration_seconds: None,
            reps: Some(10),
            rest_seconds: 0,
        };
        runner.start_workout(vec![step], 1).unwrap();
        assert_eq!(runner.remaining_seconds(), 30);
    }

    #[test]
    fn test_round_cycling_two_steps_three_rounds() {
        let mut runner = CircuitRunner::default();
        runner.start_workout(two_step_circuit(), 3).unwrap();

        let mut exercise_phases = 1;
        let mut visited = vec![(runner.step_index(), runner.round())];
        loop {
            let cue = run_phase(&mut runner);
            match runner.phase() {
                CircuitPhase::Exercise => {
                    exercise_phases += 1;
                    visited.push((runner.step_index(), runner.round()));
                    assert_eq!(cue.kind, CueKind::PhaseChange);
                }
                CircuitPhase::Rest => assert_eq!(cue.kind, CueKind::PhaseChange),
                CircuitPhase::Complete => {
                    assert_eq!(cue.kind, CueKind::CircuitComplete);
                    break;
                }
            }
        }

        assert_eq!(exercise_phases, 6);
        assert_eq!(visited, vec![(0, 1), (1, 1), (0, 2), (1, 2), (0, 3), (1, 3)]);
        assert!(!runner.is_active());
        assert_eq!(runner.round(), 3);
        assert_eq!(runner.step_index(), 1);
        assert!(runner.tick().is_none());
    }

    #[test]
    fn test_zero_rest_skips_rest_phase() {
        let mut runner = CircuitRunner::default();
        runner
            .start_workout(vec![CircuitStep::timed("plank", 2, 0), CircuitStep::timed("lunge", 2, 0)], 1)
            .unwrap();

        run_phase(&mut runner);
        assert_eq!(runner.phase(), CircuitPhase::Exercise);
        assert_eq!(runner.step_index(), 1);

        run_phase(&mut runner);
        assert_eq!(runner.phase(), CircuitPhase::Complete);
    }

    #[test]
    fn test_skip_is_indistinguishable_from_expiry() {
        let mut skipped = CircuitRunner::default();
        skipped.start_workout(two_step_circuit(), 2).unwrap();
        let mut expired = skipped.clone();

        for _ in 0..5 {
            let a = skipped.skip_phase();
            let b = run_phase(&mut expired);
            assert_eq!(a, Some(b));
            assert_eq!(skipped.snapshot(), expired.snapshot());
        }
    }

    #[test]
    fn test_complete_is_terminal() {
        let mut runner = CircuitRunner::default();
        runner.start_workout(vec![CircuitStep::timed("row", 1, 0)], 1).unwrap();

        let cue = runner.tick().unwrap();
        assert_eq!(cue.kind, CueKind::CircuitComplete);
        assert_eq!(runner.phase(), CircuitPhase::Complete);
        assert!(runner.skip_phase().is_none());
        assert!(runner.tick().is_none());
        assert_eq!(runner.phase(), CircuitPhase::Complete);
    }

    #[test]
    fn test_start_validation() {
        let mut runner = CircuitRunner::default();
        assert!(matches!(runner.start_workout(Vec::new(), 1), Err(TrainLiveError::Validation(_))));
        assert!(matches!(
            runner.start_workout(two_step_circuit(), 0),
            Err(TrainLiveError::Validation(_))
        ));

        runner.start_workout(two_step_circuit(), 1).unwrap();
        assert!(matches!(
            runner.start_workout(two_step_circuit(), 1),
            Err(TrainLiveError::AlreadyActive { session: SessionKind::Circuit })
        ));

        runner.reset();
        assert!(runner.start_workout(two_step_circuit(), 1).is_ok());
    }

    #[test]
    fn test_total_remaining_seconds() {
        let mut runner = CircuitRunner::default();
        runner.start_workout(two_step_circuit(), 2).unwrap();
        // (3 + 2) + (2 + 1) per round, two rounds
        assert_eq!(runner.total_remaining_seconds(), 16);

        runner.tick();
        assert_eq!(runner.total_remaining_seconds(), 15);

        runner.skip_phase();
        assert_eq!(runner.phase(), CircuitPhase::Rest);
        assert_eq!(runner.total_remaining_seconds(), 13);
    }
}
