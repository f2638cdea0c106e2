//! One-second tick source owned by a live session
//!
//! Each `start` spawns a fresh tokio interval task and bumps the generation.
//! A tick only acts while its generation is still current, so a tick that was
//! already in flight when the session was reset or restarted does nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Identity of one started tick task
#[derive(Debug, Clone)]
pub struct Generation {
    id: u64,
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }
}

#[derive(Debug)]
pub struct Clock {
    period: Duration,
    current: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl Default for Clock {
    fn default() -> Self {
        Self::every_second()
    }
}

impl Clock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            current: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }

    /// Start ticking, replacing any running task. The first tick fires one
    /// period from now. Must be called inside a tokio runtime.
    pub fn start<F>(&mut self, mut on_tick: F) -> Generation
    where
        F: FnMut(&Generation) -> TickControl + Send + 'static,
    {
        self.cancel();

        let generation = self.current();
        let token = generation.clone();
        let period = self.period;
        let first = Instant::now() + period;

        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if !token.is_current() || on_tick(&token) == TickControl::Stop {
                    break;
                }
            }
        }));

        tracing::trace!(generation = generation.id, "clock started");
        generation
    }

    /// Stop ticking and invalidate the current generation
    pub fn cancel(&mut self) {
        self.current.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Token of the latest generation; goes stale on the next cancel or start
    pub fn current(&self) -> Generation {
        Generation {
            id: self.current.load(Ordering::SeqCst),
            current: Arc::clone(&self.current),
        }
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use tokio::time::sleep;

    fn counter() -> (Arc<AtomicU32>, impl FnMut(&Generation) -> TickControl + Send + 'static) {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        (count, move |_: &Generation| {
            seen.fetch_add(1, Ordering::SeqCst);
            TickControl::Continue
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let mut clock = Clock::every_second();
        let (count, on_tick) = counter();
        clock.start(on_tick);

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let mut clock = Clock::every_second();
        let (count, on_tick) = counter();
        let generation = clock.start(on_tick);

        sleep(Duration::from_millis(2500)).await;
        clock.cancel();
        assert!(!generation.is_current());

        sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_task() {
        let mut clock = Clock::every_second();
        let (first, on_tick) = counter();
        let old = clock.start(on_tick);

        sleep(Duration::from_millis(1500)).await;
        let (second, on_tick) = counter();
        let new = clock.start(on_tick);

        sleep(Duration::from_millis(3200)).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 3);
        assert!(!old.is_current());
        assert!(new.is_current());
        assert_ne!(old.id(), new.id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_callback() {
        let mut clock = Clock::every_second();
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        clock.start(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 >= 2 {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        });

        sleep(Duration::from_secs(6)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!clock.is_running());
    }
}
