//! Command dispatcher for adjustments and actuator tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fcr_core::{Adjustment, TelemetryBackend};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};
use crate::events::SessionEvent;
use crate::state::SessionMode;

type TargetLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Sends adjustment and actuator commands on behalf of the session.
///
/// Commands are rejected without touching the backend unless the session is
/// connected. At most one request per target is in flight; requests for
/// different targets run concurrently.
pub struct CommandDispatcher {
    backend: Arc<dyn TelemetryBackend>,
    mode: watch::Receiver<SessionMode>,
    events: broadcast::Sender<SessionEvent>,
    pulse: Duration,
    /// Session generation whose pulses may still fire
    generation: Arc<AtomicU64>,
    targets: TargetLocks,
    pulses: Mutex<HashMap<String, JoinHandle<()>>>,
}

/// Holds a per-target lock; the map entry goes away with its last holder
struct TargetLease<'a> {
    targets: &'a TargetLocks,
    target: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> TargetLease<'a> {
    fn acquire(targets: &'a TargetLocks, target: &'a str) -> Self {
        let lock = targets.lock().entry(target.to_string()).or_default().clone();
        Self {
            targets,
            target,
            lock,
        }
    }
}

impl Drop for TargetLease<'_> {
    fn drop(&mut self) {
        let mut targets = self.targets.lock();
        // Only the map and this lease hold it
        let unused = targets
            .get(self.target)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2);
        if unused {
            targets.remove(self.target);
        }
    }
}

impl CommandDispatcher {
    pub fn new(
        backend: Arc<dyn TelemetryBackend>,
        mode: watch::Receiver<SessionMode>,
        events: broadcast::Sender<SessionEvent>,
        pulse: Duration,
    ) -> Self {
        Self {
            backend,
            mode,
            events,
            pulse,
            generation: Arc::new(AtomicU64::new(0)),
            targets: Mutex::new(HashMap::new()),
            pulses: Mutex::new(HashMap::new()),
        }
    }

    fn ensure_connected(&self) -> SessionResult<()> {
        if self.mode.borrow().is_connected() {
            Ok(())
        } else {
            Err(SessionError::CommandRejectedNotConnected)
        }
    }

    /// Move to a new session generation, cancelling the old session's pulses
    pub fn reset(&self, generation: u64) {
        self.generation.store(generation, Ordering::SeqCst);
        self.cancel_pulses();
    }

    /// Step `adjustment` by `steps` and return the value the ECU confirmed
    pub async fn send_adjustment(&self, adjustment: Adjustment, steps: i32) -> SessionResult<f64> {
        self.ensure_connected()?;

        let lease = TargetLease::acquire(&self.targets, adjustment.as_str());
        let _permit = lease.lock.lock().await;
        // The session may have ended while queued behind another request
        self.ensure_connected()?;

        debug!(%adjustment, steps, "Sending adjustment");
        let response = self
            .backend
            .send_adjustment(adjustment.as_str(), steps)
            .await
            .map_err(SessionError::CommandFailed)?;

        debug!(%adjustment, value = response.value, "Adjustment confirmed");
        Ok(response.value)
    }

    /// Switch an actuator test for the session `generation` and return the
    /// activation the ECU confirmed.
    ///
    /// A confirmed activation schedules a deactivation notification after the
    /// pulse delay; a confirmed deactivation cancels any pending one. A
    /// response arriving after the generation moved on yields `SessionEnded`
    /// and schedules nothing.
    pub async fn send_actuator(
        &self,
        actuator: &str,
        activate: bool,
        generation: u64,
    ) -> SessionResult<bool> {
        self.ensure_connected()?;

        let lease = TargetLease::acquire(&self.targets, actuator);
        let _permit = lease.lock.lock().await;
        self.ensure_connected()?;

        debug!(actuator, activate, "Sending actuator command");
        let response = self
            .backend
            .send_actuator(actuator, activate)
            .await
            .map_err(SessionError::CommandFailed)?;

        if response.activate {
            self.schedule_pulse(actuator, generation)?;
        } else {
            self.cancel_pulse(actuator);
        }
        Ok(response.activate)
    }

    fn schedule_pulse(&self, actuator: &str, generation: u64) -> SessionResult<()> {
        // Checked under the pulse lock so a concurrent reset() cancels what we insert
        let mut pulses = self.pulses.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(actuator, "Not scheduling pulse for ended session");
            return Err(SessionError::SessionEnded);
        }

        let events = self.events.clone();
        let mode = self.mode.clone();
        let current = self.generation.clone();
        let pulse = self.pulse;
        let name = actuator.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(pulse).await;
            if current.load(Ordering::SeqCst) == generation && mode.borrow().is_connected() {
                info!(actuator = %name, "Actuator test ended");
                let _ = events.send(SessionEvent::ActuatorDeactivated { actuator: name });
            }
        });

        pulses.retain(|_, h| !h.is_finished());
        if let Some(previous) = pulses.insert(actuator.to_string(), handle) {
            previous.abort();
        }
        Ok(())
    }

    fn cancel_pulse(&self, actuator: &str) {
        if let Some(handle) = self.pulses.lock().remove(actuator) {
            handle.abort();
        }
    }

    /// Abort every pending deactivation notification
    pub fn cancel_pulses(&self) {
        let mut pulses = self.pulses.lock();
        if !pulses.is_empty() {
            debug!(count = pulses.len(), "Cancelling actuator pulses");
        }
        for (_, handle) in pulses.drain() {
            handle.abort();
        }
    }

    /// Deactivation notifications still waiting to fire
    pub fn pending_pulses(&self) -> usize {
        self.pulses
            .lock()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }
}

impl Drop for CommandDispatcher {
    fn drop(&mut self) {
        for (_, handle) in self.pulses.get_mut().drain() {
            handle.abort();
        }
    }
}
