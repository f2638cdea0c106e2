//! In-progress strength session: exercise list, set log and cursor
//!
//! The session owns no timer. After a set is logged the caller asks
//! [`ActiveStrengthSession::countdown_after_set`] what to run next and starts
//! it on a [`crate::timer::RestWorkTimer`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionKind, TrainLiveError};
use crate::models::{CompletedSet, ExerciseMode, PhaseKind, SessionExercise};
use crate::timer::{Countdown, NextPhase};

/// A logged set, ready for the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    /// Activity log entry the set belongs to
    pub log_id: String,
    /// Planned strength session the log was started from
    pub session_id: String,
    /// Position of the exercise within the session
    pub exercise_index: usize,
    pub exercise_id: String,
    pub set: CompletedSet,
}

/// Read-only view for renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrengthSnapshot {
    pub active: bool,
    pub current_index: usize,
    pub exercise_count: usize,
    pub exercise_id: Option<String>,
    /// Sets logged so far for the exercise under the cursor
    pub sets_logged: usize,
    pub planned_sets: u32,
}

/// A strength workout in progress
///
/// Holds the exercise list with each exercise's logged sets and a cursor
/// for the exercise on screen. Sets are only ever appended. Logging does not
/// depend on the cursor, so any exercise can receive a set at any time.
#[derive(Debug, Clone, Default)]
pub struct ActiveStrengthSession {
    log_id: String,
    session_id: String,
    name: String,
    exercises: Vec<SessionExercise>,
    current_index: usize,
    active: bool,
}

impl ActiveStrengthSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a session on a fresh exercise list with the cursor at 0
    ///
    /// Fails with `AlreadyActive` until the running session is completed or
    /// reset.
    pub fn start_session(
        &mut self,
        log_id: impl Into<String>,
        session_id: impl Into<String>,
        name: impl Into<String>,
        exercises: Vec<SessionExercise>,
    ) -> Result<()> {
        if self.active {
            return Err(TrainLiveError::AlreadyActive { session: SessionKind::Strength });
        }

        *self = Self {
            log_id: log_id.into(),
            session_id: session_id.into(),
            name: name.into(),
            exercises,
            current_index: 0,
            active: true,
        };

        tracing::info!(
            log_id = %self.log_id,
            exercises = self.exercises.len(),
            "strength session started"
        );
        Ok(())
    }

    /// Append a completed set to an exercise and return the record to persist
    ///
    /// `feeling`, when present, must lie in 1..=5. An index outside the
    /// exercise list fails with `InvalidIndex`.
    pub fn log_set(&mut self, exercise_index: usize, set: CompletedSet) -> Result<SetRecord> {
        if let Some(feeling) = set.feeling {
            if !(1..=5).contains(&feeling) {
                return Err(TrainLiveError::Validation(format!(
                    "feeling must be between 1 and 5, got {}",
                    feeling
                )));
            }
        }

        let len = self.exercises.len();
        let exercise = self
            .exercises
            .get_mut(exercise_index)
            .ok_or(TrainLiveError::InvalidIndex { index: exercise_index, len })?;

        exercise.sets.push(set.clone());
        tracing::debug!(
            exercise = %exercise.exercise_id,
            set = set.set_number,
            weight = set.weight,
            reps = set.reps,
            "set logged"
        );

        Ok(SetRecord {
            log_id: self.log_id.clone(),
            session_id: self.session_id.clone(),
            exercise_index,
            exercise_id: exercise.exercise_id.clone(),
            set,
        })
    }

    /// Move the cursor forward; returns false at the last exercise
    pub fn next_exercise(&mut self) -> bool {
        if self.current_index + 1 < self.exercises.len() {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    /// Move the cursor back; returns false at the first exercise
    pub fn previous_exercise(&mut self) -> bool {
        if self.current_index > 0 {
            self.current_index -= 1;
            true
        } else {
            false
        }
    }

    /// Mark the session finished. Logged data stays readable until `reset`.
    pub fn complete_session(&mut self) {
        self.active = false;
        tracing::info!(log_id = %self.log_id, volume = self.total_volume(), "strength session completed");
    }

    /// Drop the session and every logged set
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Countdown to run after a set of this exercise: a hold followed by rest
    /// for duration exercises, plain rest otherwise.
    pub fn countdown_after_set(&self, exercise_index: usize) -> Result<Countdown> {
        let exercise = self.exercise(exercise_index)?;
        Ok(match exercise.mode {
            ExerciseMode::Duration => Countdown {
                mode: PhaseKind::Work,
                seconds: exercise.target_duration_seconds,
                then: Some(NextPhase::Rest(exercise.rest_seconds)),
            },
            ExerciseMode::Reps => Countdown {
                mode: PhaseKind::Rest,
                seconds: Some(exercise.rest_seconds),
                then: None,
            },
        })
    }

    pub fn exercise(&self, index: usize) -> Result<&SessionExercise> {
        self.exercises.get(index).ok_or(TrainLiveError::InvalidIndex {
            index,
            len: self.exercises.len(),
        })
    }

    /// Set number the next logged set of this exercise should carry
    pub fn next_set_number(&self, exercise_index: usize) -> Result<u32> {
        Ok(self.exercise(exercise_index)?.sets.len() as u32 + 1)
    }

    /// True once the exercise has at least its planned number of sets
    pub fn is_exercise_complete(&self, exercise_index: usize) -> Result<bool> {
        let exercise = self.exercise(exercise_index)?;
        Ok(exercise.sets.len() as u32 >= exercise.planned_sets)
    }

    /// Sum of weight x reps over every logged set
    pub fn total_volume(&self) -> f64 {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .map(|s| s.weight * s.reps as f64)
            .sum()
    }

    pub fn current_exercise(&self) -> Option<&SessionExercise> {
        self.exercises.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn exercises(&self) -> &[SessionExercise] {
        &self.exercises
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn snapshot(&self) -> StrengthSnapshot {
        let current = self.current_exercise();
        StrengthSnapshot {
            active: self.active,
            current_index: self.current_index,
            exercise_count: self.exercises.len(),
            exercise_id: current.map(|e| e.exercise_id.clone()),
            sets_logged: current.map_or(0, |e| e.sets.len()),
            planned_sets: current.map_or(0, |e| e.planned_sets),
        }
    }
}
