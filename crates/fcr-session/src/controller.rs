//! Session controller
//!
//! Owns the session state machine. State lives behind short-lived
//! `parking_lot` locks that are never held across an await; every await on
//! the backend re-checks the session generation afterwards so responses that
//! belong to an ended session are dropped.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fcr_core::{
    evaluate, Adjustment, BackendError, DerivedFaultState, PortList, ReplayProgress, Sample,
    ScenarioInfo, ServerEvent, TelemetryBackend,
};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::dispatcher::CommandDispatcher;
use crate::error::{SessionError, SessionResult};
use crate::events::{DataframeUpdate, SessionEvent};
use crate::scheduler::{PollingScheduler, ScheduleMode, TickHandler};
use crate::state::{SessionMode, SessionState};

const EVENT_CAPACITY: usize = 64;

struct SessionInner {
    backend: Arc<dyn TelemetryBackend>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    faults: Mutex<DerivedFaultState>,
    scheduler: Mutex<PollingScheduler>,
    dispatcher: CommandDispatcher,
    /// Task following the server event stream
    server_link: Mutex<Option<JoinHandle<()>>>,
    mode_tx: watch::Sender<SessionMode>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionInner {
    /// Must be called with the state lock held
    fn set_mode(&self, state: &mut SessionState, mode: SessionMode) {
        if state.mode != mode {
            debug!(from = %state.mode, to = %mode, "Session transition");
        }
        state.mode = mode;
        self.mode_tx.send_replace(mode);
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn apply_sample(&self, generation: u64, sample: Sample) -> SessionResult<DataframeUpdate> {
        let mut state = self.state.lock();
        if state.generation != generation || !state.mode.is_connected() {
            debug!("Discarding dataframe from ended session");
            return Err(SessionError::SessionEnded);
        }

        let indicators = evaluate(&sample, &mut self.faults.lock());
        if let Some(iac) = sample.iac_position {
            state.iac_position = Some(iac);
        }
        let replay = if state.is_emulated {
            state.replay.advance();
            Some(state.replay)
        } else {
            None
        };
        drop(state);

        let update = DataframeUpdate {
            received_at: Utc::now(),
            adjustments: sample.adjustment_values(),
            sample,
            indicators,
            replay,
        };
        debug!(
            fault_count = update.indicators.fault_count,
            "Dataframe applied"
        );
        self.publish(SessionEvent::Dataframe(Box::new(update.clone())));
        Ok(update)
    }

    fn report_transient(&self, generation: u64, error: &BackendError) {
        {
            let state = self.state.lock();
            if state.generation != generation || !state.mode.is_connected() {
                return;
            }
        }
        warn!(%error, "Backend request failed");
        self.publish(SessionEvent::TransientError {
            message: error.to_string(),
        });
    }

    fn apply_server_event(&self, generation: u64, event: ServerEvent) {
        let mut state = self.state.lock();
        if state.generation != generation || !state.mode.is_connected() {
            return;
        }

        match event {
            ServerEvent::Heartbeat => {
                trace!("Server heartbeat");
                state.server_heartbeat_at = Some(Utc::now());
            }
            ServerEvent::Status(status) => {
                drop(state);
                info!(
                    connected = ?status.connected,
                    message = status.message.as_deref().unwrap_or(""),
                    "Server status changed"
                );
                self.publish(SessionEvent::ServerStatus(status));
            }
        }
    }

    fn stop_server_link(&self) {
        if let Some(handle) = self.server_link.lock().take() {
            handle.abort();
        }
    }

    async fn poll_once(&self) -> SessionResult<DataframeUpdate> {
        let generation = {
            let state = self.state.lock();
            if !state.mode.is_connected() {
                return Err(SessionError::invalid(state.mode, "fetch a dataframe"));
            }
            state.generation
        };

        match self.backend.fetch_dataframe().await {
            Ok(sample) => self.apply_sample(generation, sample),
            Err(e) => {
                self.report_transient(generation, &e);
                Err(SessionError::TransientFetch(e))
            }
        }
    }
}

#[async_trait]
impl TickHandler for SessionInner {
    async fn on_poll(&self) {
        // A tick spawned just before pause or disconnect
        if !self.state.lock().mode.is_polling() {
            return;
        }
        if let Err(e) = self.poll_once().await {
            debug!(error = %e, "Poll tick produced no dataframe");
        }
    }

    async fn on_heartbeat(&self) {
        let generation = {
            let state = self.state.lock();
            if !state.heartbeat_active {
                return;
            }
            state.generation
        };

        match self.backend.heartbeat().await {
            Ok(()) => debug!("Heartbeat OK"),
            Err(e) => self.report_transient(generation, &e),
        }
    }
}

/// Follow the server event stream for one session generation
async fn follow_server_events(session: Weak<SessionInner>, generation: u64) {
    let Some(backend) = session.upgrade().map(|inner| inner.backend.clone()) else {
        return;
    };

    let mut events = match backend.subscribe_events().await {
        Ok(events) => events,
        Err(BackendError::NotSupported(_)) => {
            debug!("Backend has no server event stream");
            return;
        }
        Err(e) => {
            if let Some(inner) = session.upgrade() {
                inner.report_transient(generation, &e);
            }
            return;
        }
    };
    debug!("Following server events");

    while let Some(event) = events.next().await {
        let Some(inner) = session.upgrade() else {
            return;
        };
        match event {
            Ok(event) => inner.apply_server_event(generation, event),
            Err(e) => inner.report_transient(generation, &e),
        }
    }
    debug!("Server event stream closed");
}

/// Drives one ECU monitoring session at a time.
///
/// While connected, the controller also follows the backend's server event
/// stream: `status` events are published as [`SessionEvent::ServerStatus`].
///
/// ```no_run
/// # use std::sync::Arc;
/// # async fn example() -> anyhow::Result<()> {
/// use fcr_client::FcrClient;
/// use fcr_session::{SessionConfig, SessionController, SessionEvent};
///
/// let client = FcrClient::new("http://localhost:8081")?;
/// let session = SessionController::new(Arc::new(client), SessionConfig::default());
/// let mut events = session.subscribe();
///
/// session.connect("/dev/ttyUSB0").await?;
/// while let Ok(event) = events.recv().await {
///     if let SessionEvent::Dataframe(update) = event {
///         println!("{} faults", update.indicators.fault_count);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct SessionController {
    inner: Arc<SessionInner>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn TelemetryBackend>, config: SessionConfig) -> Self {
        let (mode_tx, mode_rx) = watch::channel(SessionMode::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let dispatcher = CommandDispatcher::new(
            backend.clone(),
            mode_rx,
            events.clone(),
            Duration::from_millis(config.actuator_pulse_ms),
        );

        Self {
            inner: Arc::new(SessionInner {
                backend,
                scheduler: Mutex::new(PollingScheduler::from_config(&config)),
                config,
                state: Mutex::new(SessionState::default()),
                faults: Mutex::new(DerivedFaultState::default()),
                dispatcher,
                server_link: Mutex::new(None),
                mode_tx,
                events,
            }),
        }
    }

    fn tick_handler(&self) -> Weak<dyn TickHandler> {
        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        weak
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn mode(&self) -> SessionMode {
        self.inner.state.lock().mode
    }

    /// Follow mode changes
    pub fn watch_mode(&self) -> watch::Receiver<SessionMode> {
        self.inner.mode_tx.subscribe()
    }

    /// Receive dataframes, confirmations and transient errors
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.lock().clone()
    }

    pub fn derived_faults(&self) -> DerivedFaultState {
        *self.inner.faults.lock()
    }

    /// Playback progress while replaying a scenario
    pub fn replay_progress(&self) -> Option<ReplayProgress> {
        let state = self.inner.state.lock();
        state.is_emulated.then_some(state.replay)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.scheduler.lock().poll_interval()
    }

    /// What the session timer is currently doing, if armed
    pub fn scheduled_mode(&self) -> Option<ScheduleMode> {
        self.inner.scheduler.lock().mode()
    }

    /// Timer tasks not yet torn down
    pub fn live_timers(&self) -> usize {
        self.inner.scheduler.lock().live_timers()
    }

    /// Actuator deactivation notifications still pending
    pub fn pending_pulses(&self) -> usize {
        self.inner.dispatcher.pending_pulses()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connect to the ECU on a serial port
    pub async fn connect(&self, port: &str) -> SessionResult<()> {
        self.open(port, None, "connect").await
    }

    /// Load a recorded scenario and connect to it
    pub async fn replay(&self, scenario: &str) -> SessionResult<()> {
        {
            let state = self.inner.state.lock();
            if state.mode != SessionMode::Disconnected {
                return Err(SessionError::invalid(state.mode, "replay"));
            }
        }

        let description = self
            .inner
            .backend
            .load_scenario(scenario)
            .await
            .map_err(|e| {
                SessionError::ConnectFailed(format!("failed to load scenario {}: {}", scenario, e))
            })?;
        info!(
            scenario,
            count = description.count,
            position = description.position,
            "Scenario loaded"
        );

        self.open(scenario, Some(ReplayProgress::from(description)), "replay")
            .await
    }

    async fn open(
        &self,
        target: &str,
        replay: Option<ReplayProgress>,
        operation: &'static str,
    ) -> SessionResult<()> {
        let generation = {
            let mut state = self.inner.state.lock();
            if state.mode != SessionMode::Disconnected {
                return Err(SessionError::invalid(state.mode, operation));
            }
            state.reset();
            state.generation += 1;
            self.inner.dispatcher.reset(state.generation);
            state.port = target.to_string();
            state.is_emulated = replay.is_some();
            state.replay = replay.unwrap_or_default();
            self.inner.set_mode(&mut state, SessionMode::Connecting);
            state.generation
        };
        info!(target, emulated = replay.is_some(), "Connecting");

        let result = self.inner.backend.connect(target).await;

        let mut state = self.inner.state.lock();
        if state.generation != generation {
            debug!(target, "Session disconnected while connecting");
            return Err(SessionError::SessionEnded);
        }

        let failure = match result {
            Ok(response) if response.initialised => {
                state.last_ecu_id = response.ecu_id;
                self.inner.faults.lock().reset();

                let mode = if state.is_emulated {
                    SessionMode::ConnectedReplay
                } else {
                    SessionMode::ConnectedLive
                };
                self.inner.set_mode(&mut state, mode);
                self.inner
                    .scheduler
                    .lock()
                    .start(ScheduleMode::Polling, self.tick_handler());
                self.start_server_link(generation);

                info!(
                    target,
                    ecu_id = state.last_ecu_id.as_deref().unwrap_or("unknown"),
                    %mode,
                    "Connected"
                );
                return Ok(());
            }
            Ok(_) => format!("ECU on {} did not initialise", target),
            Err(e) => e.to_string(),
        };

        state.reset();
        self.inner.set_mode(&mut state, SessionMode::Disconnected);
        warn!(target, reason = %failure, "Connect failed");
        Err(SessionError::ConnectFailed(failure))
    }

    fn start_server_link(&self, generation: u64) {
        let session = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(follow_server_events(session, generation));
        if let Some(previous) = self.inner.server_link.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop polling and keep the session alive with heartbeats
    pub fn pause(&self) -> SessionResult<()> {
        let mut state = self.inner.state.lock();
        let next = state
            .mode
            .paused()
            .ok_or_else(|| SessionError::invalid(state.mode, "pause"))?;

        state.heartbeat_active = true;
        self.inner.set_mode(&mut state, next);
        self.inner
            .scheduler
            .lock()
            .start(ScheduleMode::Heartbeat, self.tick_handler());
        info!("Paused");
        Ok(())
    }

    /// Resume dataframe polling
    pub fn resume(&self) -> SessionResult<()> {
        let mut state = self.inner.state.lock();
        let next = state
            .mode
            .resumed()
            .ok_or_else(|| SessionError::invalid(state.mode, "resume"))?;

        state.heartbeat_active = false;
        self.inner.set_mode(&mut state, next);
        self.inner
            .scheduler
            .lock()
            .start(ScheduleMode::Polling, self.tick_handler());
        info!("Resumed");
        Ok(())
    }

    /// End the session.
    ///
    /// The local transition to `Disconnected` always happens first; a failing
    /// backend disconnect is reported afterwards as `CommandFailed`.
    pub async fn disconnect(&self) -> SessionResult<()> {
        {
            let mut state = self.inner.state.lock();
            if state.mode == SessionMode::Disconnected {
                return Err(SessionError::invalid(state.mode, "disconnect"));
            }

            self.inner.scheduler.lock().stop();
            self.inner.stop_server_link();
            state.reset();
            state.generation += 1;
            self.inner.dispatcher.reset(state.generation);
            self.inner.set_mode(&mut state, SessionMode::Disconnected);
        }
        info!("Disconnected");

        self.inner.backend.disconnect().await.map_err(|e| {
            warn!(error = %e, "Backend disconnect failed");
            SessionError::CommandFailed(e)
        })
    }

    /// Change the dataframe poll period
    pub fn set_poll_interval(&self, interval_ms: u64) -> SessionResult<()> {
        self.inner.scheduler.lock().reconfigure(interval_ms)?;
        info!(interval_ms, "Poll interval changed");
        Ok(())
    }

    // =========================================================================
    // Dataframes
    // =========================================================================

    /// Fetch and apply one dataframe now, outside the timer
    pub async fn poll_once(&self) -> SessionResult<DataframeUpdate> {
        self.inner.poll_once().await
    }

    /// Apply a sample obtained elsewhere, as if it had just been polled
    pub fn ingest(&self, sample: Sample) -> SessionResult<DataframeUpdate> {
        let generation = {
            let state = self.inner.state.lock();
            if !state.mode.is_connected() {
                return Err(SessionError::invalid(state.mode, "ingest a dataframe"));
            }
            state.generation
        };
        self.inner.apply_sample(generation, sample)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Step an adjustable setting and return the value the ECU confirmed
    pub async fn send_adjustment(&self, adjustment: Adjustment, steps: i32) -> SessionResult<f64> {
        let generation = self.inner.state.lock().generation;
        let value = self
            .inner
            .dispatcher
            .send_adjustment(adjustment, steps)
            .await?;

        {
            let mut state = self.inner.state.lock();
            if state.generation != generation || !state.mode.is_connected() {
                debug!(%adjustment, "Discarding adjustment from ended session");
                return Err(SessionError::SessionEnded);
            }
            if adjustment == Adjustment::IacPosition {
                state.iac_position = Some(value);
            }
        }

        info!(%adjustment, value, "Adjustment confirmed");
        self.inner
            .publish(SessionEvent::AdjustmentConfirmed { adjustment, value });
        Ok(value)
    }

    pub async fn increase(&self, adjustment: Adjustment) -> SessionResult<f64> {
        self.send_adjustment(adjustment, 1).await
    }

    pub async fn decrease(&self, adjustment: Adjustment) -> SessionResult<f64> {
        self.send_adjustment(adjustment, -1).await
    }

    /// Switch an actuator test and return the confirmed activation
    pub async fn send_actuator(&self, actuator: &str, activate: bool) -> SessionResult<bool> {
        let generation = self.inner.state.lock().generation;
        let active = self
            .inner
            .dispatcher
            .send_actuator(actuator, activate, generation)
            .await?;

        {
            let state = self.inner.state.lock();
            if state.generation != generation || !state.mode.is_connected() {
                debug!(actuator, "Discarding actuator response from ended session");
                return Err(SessionError::SessionEnded);
            }
        }

        info!(actuator, active, "Actuator confirmed");
        self.inner.publish(SessionEvent::ActuatorConfirmed {
            actuator: actuator.to_string(),
            active,
        });
        Ok(active)
    }

    // =========================================================================
    // Backend passthroughs
    // =========================================================================

    pub async fn list_scenarios(&self) -> SessionResult<Vec<ScenarioInfo>> {
        self.inner
            .backend
            .list_scenarios()
            .await
            .map_err(SessionError::CommandFailed)
    }

    /// Serial ports the backend can open
    pub async fn list_ports(&self) -> SessionResult<PortList> {
        self.inner
            .backend
            .list_ports()
            .await
            .map_err(SessionError::CommandFailed)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.inner.scheduler.lock().stop();
        self.inner.stop_server_link();
        self.inner.dispatcher.cancel_pulses();
    }
}
