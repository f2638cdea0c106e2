//! Effectful shell around the session state machines
//!
//! Each live session owns its state behind a mutex, one [`Clock`], a cue sink
//! and (where something is persisted) an activity sink. Ticks lock the state,
//! check their generation, then advance the pure core and forward its effects.

mod clock;

pub use clock::{Clock, Generation, TickControl};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::circuit::{CircuitRunner, CircuitSnapshot};
use crate::config::{CircuitSettings, GpsFilterSettings, RunSettings, TimerSettings};
use crate::cue::{Cue, CueSink};
use crate::error::Result;
use crate::gps_filter::{FilterDecision, GpsFilter};
use crate::models::{CircuitStep, CompletedSet, GpsPoint, IntervalBlock, PhaseKind, RunType, SessionExercise};
use crate::run::{RunSession, RunSnapshot, RunSummary};
use crate::strength::{ActiveStrengthSession, SetRecord, StrengthSnapshot};
use crate::timer::{Countdown, NextPhase, RestWorkTimer, TimerSnapshot};

/// Persistence collaborator for finished work
///
/// Delivery is fire-and-forget: the shell never waits on or inspects the
/// outcome.
pub trait ActivitySink: Send + Sync {
    fn set_logged(&self, record: &SetRecord);
    fn run_ended(&self, summary: &RunSummary);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullActivitySink;

impl ActivitySink for NullActivitySink {
    fn set_logged(&self, _record: &SetRecord) {}
    fn run_ended(&self, _summary: &RunSummary) {}
}

/// Logs what would be persisted
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivitySink;

impl ActivitySink for TracingActivitySink {
    fn set_logged(&self, record: &SetRecord) {
        tracing::info!(
            log_id = %record.log_id,
            exercise = %record.exercise_id,
            set = record.set.set_number,
            weight = record.set.weight,
            reps = record.set.reps,
            "set logged"
        );
    }

    fn run_ended(&self, summary: &RunSummary) {
        tracing::info!(
            log_id = %summary.log_id,
            elapsed = summary.elapsed_seconds,
            distance_m = summary.distance_m,
            points = summary.track.len(),
            "run ended"
        );
    }
}

/// A panicked tick must not wedge the session; the state is plain data.
fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn play_all(sink: &dyn CueSink, cues: &[Cue]) {
    for cue in cues {
        sink.play(cue);
    }
}

fn control(active: bool) -> TickControl {
    if active {
        TickControl::Continue
    } else {
        TickControl::Stop
    }
}

/// Rest/work countdown driven by a one-second clock
pub struct LiveTimer {
    state: Arc<Mutex<RestWorkTimer>>,
    clock: Clock,
    cues: Arc<dyn CueSink>,
}

impl LiveTimer {
    pub fn new(settings: TimerSettings, cues: Arc<dyn CueSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RestWorkTimer::new(settings))),
            clock: Clock::every_second(),
            cues,
        }
    }

    /// Start a countdown; a running one is replaced
    pub fn start(&mut self, seconds: Option<u32>, mode: PhaseKind, then: Option<NextPhase>) {
        self.start_countdown(Countdown { mode, seconds, then });
    }

    pub fn start_countdown(&mut self, countdown: Countdown) {
        let cue = {
            let mut timer = lock(&self.state);
            let cue = countdown.start_on(&mut timer);
            // Retire the old task while no tick can observe the new countdown
            self.clock.cancel();
            cue
        };
        self.cues.play(&cue);
        self.run_clock();
    }

    /// End the countdown now. A work phase with a follow-up chains into it
    /// without an end cue.
    pub fn skip(&mut self) {
        let chained = {
            let mut timer = lock(&self.state);
            let outcome = timer.skip();
            let chained = outcome.next.map(|next| timer.chain(next));
            self.clock.cancel();
            play_all(self.cues.as_ref(), &outcome.cues);
            chained
        };

        if let Some(cue) = chained {
            self.cues.play(&cue);
            self.run_clock();
        }
    }

    pub fn adjust(&self, delta_seconds: i64) {
        lock(&self.state).adjust(delta_seconds);
    }

    pub fn stop(&mut self) {
        self.clock.cancel();
        lock(&self.state).stop();
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        lock(&self.state).snapshot()
    }

    fn run_clock(&mut self) {
        let state = Arc::clone(&self.state);
        let cues = Arc::clone(&self.cues);

        self.clock.start(move |generation| {
            let mut timer = lock(&state);
            if !generation.is_current() {
                return TickControl::Stop;
            }

            let outcome = timer.tick();
            play_all(cues.as_ref(), &outcome.cues);
            if let Some(next) = outcome.next {
                let cue = timer.chain(next);
                cues.play(&cue);
            }
            control(timer.is_active())
        });
    }
}

pub struct LiveCircuit {
    state: Arc<Mutex<CircuitRunner>>,
    clock: Clock,
    cues: Arc<dyn CueSink>,
}

impl LiveCircuit {
    pub fn new(settings: CircuitSettings, cues: Arc<dyn CueSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CircuitRunner::new(settings))),
            clock: Clock::every_second(),
            cues,
        }
    }

    pub fn start_workout(&mut self, steps: Vec<CircuitStep>, total_rounds: u32) -> Result<()> {
        let cue = {
            let mut runner = lock(&self.state);
            let cue = runner.start_workout(steps, total_rounds)?;
            self.clock.cancel();
            cue
        };
        self.cues.play(&cue);
        self.run_clock();
        Ok(())
    }

    /// End the current phase now. The next phase gets a full first second.
    pub fn skip_phase(&mut self) {
        let (cue, active) = {
            let mut runner = lock(&self.state);
            let cue = runner.skip_phase();
            self.clock.cancel();
            (cue, runner.is_active())
        };

        if let Some(cue) = cue {
            self.cues.play(&cue);
        }
        if active {
            self.run_clock();
        }
    }

    pub fn reset(&mut self) {
        self.clock.cancel();
        lock(&self.state).reset();
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).is_active()
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        lock(&self.state).snapshot()
    }

    fn run_clock(&mut self) {
        let state = Arc::clone(&self.state);
        let cues = Arc::clone(&self.cues);

        self.clock.start(move |generation| {
            let mut runner = lock(&state);
            if !generation.is_current() {
                return TickControl::Stop;
            }

            if let Some(cue) = runner.tick() {
                cues.play(&cue);
            }
            control(runner.is_active())
        });
    }
}

/// Run session fed by raw location fixes
pub struct LiveRun {
    state: Arc<Mutex<RunSession>>,
    filter: GpsFilter,
    clock: Clock,
    cues: Arc<dyn CueSink>,
    activity: Arc<dyn ActivitySink>,
}

impl LiveRun {
    pub fn new(
        settings: RunSettings,
        gps: GpsFilterSettings,
        cues: Arc<dyn CueSink>,
        activity: Arc<dyn ActivitySink>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunSession::new(settings))),
            filter: GpsFilter::new(gps),
            clock: Clock::every_second(),
            cues,
            activity,
        }
    }

    pub fn start_run(
        &mut self,
        log_id: impl Into<String>,
        plan_id: Option<String>,
        name: impl Into<String>,
        run_type: RunType,
        blocks: &[IntervalBlock],
    ) -> Result<()> {
        let cue = {
            let mut run = lock(&self.state);
            let cue = run.start_run(log_id, plan_id, name, run_type, blocks)?;
            self.clock.cancel();
            cue
        };
        self.filter.reset();
        self.cues.play(&cue);
        self.run_clock();
        Ok(())
    }

    /// Pass a raw fix through the filter; accepted fixes reach the session
    pub fn add_fix(&mut self, point: GpsPoint) -> FilterDecision {
        let decision = self.filter.check(&point);
        if decision.is_accepted() {
            lock(&self.state).add_gps_point(point);
        }
        decision
    }

    /// Stop ticking, summarise and hand the summary to the activity sink.
    ///
    /// Returns `None` without touching the sink when no run is in progress, so
    /// a run is persisted at most once.
    pub fn end_run(&mut self) -> Option<RunSummary> {
        let summary = {
            let mut run = lock(&self.state);
            self.clock.cancel();
            if !run.is_active() {
                tracing::debug!("end_run without an active run");
                return None;
            }
            run.end_run()
        };
        self.activity.run_ended(&summary);
        Some(summary)
    }

    pub fn reset(&mut self) {
        self.clock.cancel();
        lock(&self.state).reset();
        self.filter.reset();
    }

    pub fn rejected_fixes(&self) -> usize {
        self.filter.rejected_count()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        lock(&self.state).snapshot()
    }

    fn run_clock(&mut self) {
        let state = Arc::clone(&self.state);
        let cues = Arc::clone(&self.cues);

        self.clock.start(move |generation| {
            let mut run = lock(&state);
            if !generation.is_current() {
                return TickControl::Stop;
            }

            if let Some(cue) = run.tick() {
                cues.play(&cue);
            }
            // Elapsed time keeps counting after the last block until end_run
            control(run.is_active())
        });
    }
}

/// Strength session with its between-set countdown
pub struct LiveStrength {
    session: ActiveStrengthSession,
    timer: LiveTimer,
    activity: Arc<dyn ActivitySink>,
}

impl LiveStrength {
    pub fn new(settings: TimerSettings, cues: Arc<dyn CueSink>, activity: Arc<dyn ActivitySink>) -> Self {
        Self {
            session: ActiveStrengthSession::new(),
            timer: LiveTimer::new(settings, cues),
            activity,
        }
    }

    pub fn start_session(
        &mut self,
        log_id: impl Into<String>,
        session_id: impl Into<String>,
        name: impl Into<String>,
        exercises: Vec<SessionExercise>,
    ) -> Result<()> {
        self.session.start_session(log_id, session_id, name, exercises)
    }

    /// Record a set and forward it to the activity sink
    pub fn log_set(&mut self, exercise_index: usize, set: CompletedSet) -> Result<SetRecord> {
        let record = self.session.log_set(exercise_index, set)?;
        self.activity.set_logged(&record);
        Ok(record)
    }

    /// Start the countdown that follows a set of this exercise: rest for
    /// rep-based exercises, a timed hold chaining into rest otherwise.
    pub fn start_countdown(&mut self, exercise_index: usize) -> Result<()> {
        let countdown = self.session.countdown_after_set(exercise_index)?;
        self.timer.start_countdown(countdown);
        Ok(())
    }

    pub fn next_exercise(&mut self) -> bool {
        self.session.next_exercise()
    }

    pub fn previous_exercise(&mut self) -> bool {
        self.session.previous_exercise()
    }

    pub fn complete_session(&mut self) {
        self.timer.stop();
        self.session.complete_session();
    }

    pub fn reset(&mut self) {
        self.timer.stop();
        self.session.reset();
    }

    pub fn session(&self) -> &ActiveStrengthSession {
        &self.session
    }

    pub fn timer(&self) -> &LiveTimer {
        &self.timer
    }

    /// Skip the running countdown (rest, or a hold chaining into rest)
    pub fn skip_countdown(&mut self) {
        self.timer.skip();
    }

    pub fn adjust_countdown(&self, delta_seconds: i64) {
        self.timer.adjust(delta_seconds);
    }

    pub fn snapshot(&self) -> StrengthSnapshot {
        self.session.snapshot()
    }
}
