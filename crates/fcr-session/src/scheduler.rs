//! Polling scheduler
//!
//! Owns the one recurring timer of a session. In polling mode each tick asks
//! the handler for a dataframe; in heartbeat mode each tick asks it for a
//! keepalive. Switching modes aborts the running timer before the next one is
//! armed, so two timers never overlap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::{SessionConfig, MIN_POLL_INTERVAL_MS};
use crate::error::{SessionError, SessionResult};

/// What a timer tick does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    Polling,
    Heartbeat,
}

/// Receiver of timer ticks
#[async_trait]
pub trait TickHandler: Send + Sync + 'static {
    async fn on_poll(&self);
    async fn on_heartbeat(&self);
}

struct ArmedTimer {
    mode: ScheduleMode,
    handler: Weak<dyn TickHandler>,
    handle: JoinHandle<()>,
}

/// Decrements the live timer count when the timer future is dropped
struct LiveTimer(Arc<AtomicUsize>);

impl LiveTimer {
    fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for LiveTimer {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Single-owner timer for dataframe polling and heartbeats
pub struct PollingScheduler {
    poll_interval: Duration,
    heartbeat_interval: Duration,
    timer: Option<ArmedTimer>,
    live: Arc<AtomicUsize>,
}

impl PollingScheduler {
    pub fn new(poll_interval: Duration, heartbeat_interval: Duration) -> Self {
        Self {
            poll_interval,
            heartbeat_interval,
            timer: None,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build from session config; an invalid poll interval falls back to the default
    pub fn from_config(config: &SessionConfig) -> Self {
        let poll_ms = if SessionConfig::is_valid_poll_interval(config.poll_interval_ms) {
            config.poll_interval_ms
        } else {
            warn!(
                poll_interval_ms = config.poll_interval_ms,
                "Configured poll interval too short, using default"
            );
            SessionConfig::default().poll_interval_ms
        };
        Self::new(
            Duration::from_millis(poll_ms),
            Duration::from_millis(config.heartbeat_interval_ms),
        )
    }

    /// Arm the timer in `mode`, cancelling any timer already running.
    ///
    /// The first tick fires one full period after arming. Each tick runs the
    /// handler on its own task, so cancelling the timer never interrupts a
    /// request that is already in flight.
    pub fn start(&mut self, mode: ScheduleMode, handler: Weak<dyn TickHandler>) {
        self.stop();

        let period = match mode {
            ScheduleMode::Polling => self.poll_interval,
            ScheduleMode::Heartbeat => self.heartbeat_interval,
        };
        let live = LiveTimer::new(self.live.clone());
        let tick_handler = handler.clone();

        let handle = tokio::spawn(async move {
            let _live = live;
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(handler) = tick_handler.upgrade() else {
                    debug!("Session dropped, timer exiting");
                    break;
                };
                tokio::spawn(async move {
                    match mode {
                        ScheduleMode::Polling => handler.on_poll().await,
                        ScheduleMode::Heartbeat => handler.on_heartbeat().await,
                    }
                });
            }
        });

        debug!(?mode, period_ms = period.as_millis() as u64, "Timer armed");
        self.timer = Some(ArmedTimer {
            mode,
            handler,
            handle,
        });
    }

    /// Cancel the running timer, if any
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
            debug!(mode = ?timer.mode, "Timer stopped");
        }
    }

    /// Change the polling period.
    ///
    /// Values at or below the floor are rejected and the previous period kept.
    /// A running polling timer is re-armed with the new period.
    pub fn reconfigure(&mut self, interval_ms: u64) -> SessionResult<()> {
        if !SessionConfig::is_valid_poll_interval(interval_ms) {
            return Err(SessionError::IntervalTooShort {
                requested_ms: interval_ms,
                minimum_ms: MIN_POLL_INTERVAL_MS,
            });
        }

        self.poll_interval = Duration::from_millis(interval_ms);
        let rearm = self
            .timer
            .as_ref()
            .filter(|t| t.mode == ScheduleMode::Polling)
            .map(|t| t.handler.clone());
        if let Some(handler) = rearm {
            self.start(ScheduleMode::Polling, handler);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Mode of the armed timer, if any
    pub fn mode(&self) -> Option<ScheduleMode> {
        self.timer.as_ref().map(|t| t.mode)
    }

    /// Timer tasks that have not been dropped yet
    ///
    /// Aborted timers are dropped asynchronously, so this can briefly exceed
    /// one right after a mode switch.
    pub fn live_timers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }
}
