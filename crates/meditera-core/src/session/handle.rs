//! Owned, cancellable driver for a [`SessionTimer`].
//!
//! The handle spawns one tokio task that ticks the timer once per `period`
//! and publishes every resulting [`Event`] plus a `StateSnapshot` on an
//! unbounded channel. Dropping the handle tears the task down.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::engine::{SessionSnapshot, SessionTimer};
use crate::events::Event;

/// Receives lap completions from a running session.
///
/// Called on the tick task, so implementations must hand slow work off
/// (see `TrackerSink`).
pub trait CompletionSink: Send + Sync + 'static {
    fn session_completed(&self, laps: u32);
}

pub struct SessionHandle {
    timer: Arc<Mutex<SessionTimer>>,
    events: mpsc::UnboundedSender<Event>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Start ticking `timer` every `period` on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn(
        timer: SessionTimer,
        period: Duration,
        sink: Option<Arc<dyn CompletionSink>>,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(timer.started_event());

        let timer = Arc::new(Mutex::new(timer));
        let task = tokio::spawn(run(Arc::clone(&timer), period, sink, tx.clone()));

        let handle = Self {
            timer,
            events: tx,
            task: Some(task),
        };
        (handle, rx)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.timer).snapshot()
    }

    pub fn pause(&self) -> Option<Event> {
        let event = lock(&self.timer).pause()?;
        let _ = self.events.send(event.clone());
        Some(event)
    }

    pub fn resume(&self) -> Option<Event> {
        let event = lock(&self.timer).resume()?;
        let _ = self.events.send(event.clone());
        Some(event)
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.timer).is_finished()
    }

    /// Stop ticking. Emits `SessionCancelled` unless the session already finished.
    pub fn cancel(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort();

        let timer = lock(&self.timer);
        if !timer.is_finished() {
            tracing::info!(remaining_secs = timer.remaining_secs(), "session cancelled");
            let _ = self.events.send(Event::SessionCancelled {
                remaining_secs: timer.remaining_secs(),
                at: Utc::now(),
            });
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(timer: &Mutex<SessionTimer>) -> MutexGuard<'_, SessionTimer> {
    timer.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run(
    timer: Arc<Mutex<SessionTimer>>,
    period: Duration,
    sink: Option<Arc<dyn CompletionSink>>,
    tx: mpsc::UnboundedSender<Event>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let (events, snapshot) = {
            let mut state = lock(&timer);
            if state.is_paused() {
                continue;
            }
            let events = state.tick();
            (events, state.snapshot())
        };

        for event in events {
            if let (Event::LapCompleted { laps, .. }, Some(sink)) = (&event, &sink) {
                sink.session_completed(*laps);
            }
            // A dropped receiver only means nobody is rendering; keep ticking.
            let _ = tx.send(event);
        }
        let _ = tx.send(Event::StateSnapshot {
            snapshot,
            at: Utc::now(),
        });

        if timer_finished(&timer) {
            break;
        }
    }
}

fn timer_finished(timer: &Mutex<SessionTimer>) -> bool {
    lock(timer).is_finished()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Phase, SessionConfig, SessionStatus};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingSink(AtomicU32);

    impl CompletionSink for CountingSink {
        fn session_completed(&self, _laps: u32) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn timer(total: u64, exercise: u64, rest: u64, count: usize) -> SessionTimer {
        SessionTimer::start(SessionConfig {
            total_secs: total,
            exercise_secs: exercise,
            rest_secs: rest,
            exercise_count: count,
        })
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_completion_and_notifies_sink() {
        let sink = Arc::new(CountingSink::default());
        let (handle, mut rx) = SessionHandle::spawn(
            timer(8, 1, 1, 2),
            Duration::from_secs(1),
            Some(sink.clone() as Arc<dyn CompletionSink>),
        );

        assert!(matches!(rx.recv().await, Some(Event::SessionStarted { .. })));
        let mut snapshots = 0;
        loop {
            match rx.recv().await {
                Some(Event::SessionFinished { laps, .. }) => {
                    assert_eq!(laps, 2);
                    break;
                }
                Some(Event::StateSnapshot { .. }) => snapshots += 1,
                Some(_) => {}
                None => panic!("channel closed before finish"),
            }
        }

        assert_eq!(snapshots, 7);
        assert_eq!(sink.0.load(Ordering::SeqCst), 2);
        assert!(handle.is_finished());
        assert_eq!(handle.snapshot().status, SessionStatus::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_ticks_are_dropped() {
        let (handle, _rx) = SessionHandle::spawn(timer(100, 45, 15, 2), Duration::from_secs(1), None);

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(handle.snapshot().remaining_secs, 90);

        assert!(handle.pause().is_some());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.snapshot().remaining_secs, 90);
        assert!(handle.snapshot().paused);

        assert!(handle.resume().is_some());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.snapshot().remaining_secs, 80);
        assert_eq!(handle.snapshot().phase, Phase::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticking() {
        let (mut handle, mut rx) =
            SessionHandle::spawn(timer(100, 45, 15, 2), Duration::from_secs(1), None);
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.snapshot().remaining_secs, 97);

        let mut cancelled = false;
        while let Ok(event) = rx.try_recv() {
            if let Event::SessionCancelled { remaining_secs, .. } = event {
                assert_eq!(remaining_secs, 97);
                cancelled = true;
            }
        }
        assert!(cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_closes_channel() {
        let (handle, mut rx) = SessionHandle::spawn(timer(100, 45, 15, 2), Duration::from_secs(1), None);
        drop(handle);

        let drained = tokio::time::timeout(Duration::from_secs(5), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok());
    }
}
