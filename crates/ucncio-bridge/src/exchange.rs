//! The connect/poll/reconnect control loop.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use ucncio_transport::{AbortHandle, Connection, Connector};
use ucncio_wire::{decode, encode, outputs_to_logical, RECORD_SIZE};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::panel::PanelPort;
use crate::status::{
    CycleMeasurement, CycleTimer, StatusChannel, STATUS_CONNECTED, STATUS_DISCONNECTED,
    STATUS_FREQUENCY_UNAVAILABLE, STATUS_WAITING,
};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Between sessions.
    Idle,
    /// A connect attempt is in progress.
    WaitingForPeer,
    /// A session is exchanging records.
    Active,
    /// The loop has exited.
    Stopped,
}

/// Why the loop exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The cancellation token fired.
    Cancelled,
    /// The panel's end of the UI channel went away.
    PanelClosed,
}

/// Counters kept across sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub connect_attempts: u64,
    pub sessions: u64,
    pub cycles: u64,
    pub faults: u64,
}

/// Shared slot holding the abort handle of the current session, so that a
/// shutdown request can unblock a pending read or write.
#[derive(Debug, Clone, Default)]
pub struct AbortSlot {
    inner: Arc<Mutex<Option<AbortHandle>>>,
}

impl AbortSlot {
    fn lock(&self) -> MutexGuard<'_, Option<AbortHandle>> {
        // The slot holds no invariant a panic could break.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, handle: AbortHandle) {
        *self.lock() = Some(handle);
    }

    pub fn clear(&self) {
        self.lock().take();
    }

    /// Abort the current session, if any.
    pub fn abort(&self) {
        if let Some(handle) = self.lock().as_ref() {
            handle.abort();
        }
    }
}

/// Granularity of the cancel check while pacing a failed connect.
const PACING_SLICE: Duration = Duration::from_millis(10);

/// Sleep until `until`, waking early once `cancel` fires.
fn pause_until(until: Instant, cancel: &CancellationToken) {
    loop {
        let remaining = until.saturating_duration_since(Instant::now());
        if remaining.is_zero() || cancel.is_cancelled() {
            return;
        }
        thread::sleep(remaining.min(PACING_SLICE));
    }
}

/// Last text published on each status channel.
#[derive(Debug, Default)]
struct PublishedStatus {
    connection: Option<String>,
    frequency: Option<String>,
}

impl PublishedStatus {
    fn slot(&mut self, channel: StatusChannel) -> &mut Option<String> {
        match channel {
            StatusChannel::Connection => &mut self.connection,
            StatusChannel::Frequency => &mut self.frequency,
        }
    }

    /// Record `text`; false when it repeats the channel's current text.
    fn update(&mut self, channel: StatusChannel, text: &str) -> bool {
        let slot = self.slot(channel);
        if slot.as_deref() == Some(text) {
            return false;
        }
        *slot = Some(text.to_string());
        true
    }
}

enum SessionEnd {
    Faulted,
    Cancelled,
}

/// Drives sessions against `C` and reflects them on panel `P`.
pub struct ExchangeLoop<C, P> {
    connector: C,
    panel: P,
    config: BridgeConfig,
    state: LoopState,
    stats: LoopStats,
    abort: AbortSlot,
    published: PublishedStatus,
}

impl<C: Connector, P: PanelPort> ExchangeLoop<C, P> {
    pub fn new(connector: C, panel: P, config: BridgeConfig) -> Self {
        Self {
            connector,
            panel,
            config,
            state: LoopState::Idle,
            stats: LoopStats::default(),
            abort: AbortSlot::default(),
            published: PublishedStatus::default(),
        }
    }

    /// Share the session abort slot with a controller thread.
    pub fn with_abort_slot(mut self, slot: AbortSlot) -> Self {
        self.abort = slot;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run sessions until `cancel` fires or the panel goes away.
    ///
    /// Every transport or decode failure only ends the current session; the
    /// loop then publishes the disconnected status and dials again.
    pub fn run(&mut self, cancel: &CancellationToken) -> LoopExit {
        let exit = loop {
            if cancel.is_cancelled() {
                break LoopExit::Cancelled;
            }
            self.transition(LoopState::Idle);

            match self.session(cancel) {
                Ok(SessionEnd::Faulted) => continue,
                Ok(SessionEnd::Cancelled) => break LoopExit::Cancelled,
                Err(_) if cancel.is_cancelled() => break LoopExit::Cancelled,
                Err(err) => {
                    debug!(error = %err, "panel channel closed; stopping");
                    break LoopExit::PanelClosed;
                }
            }
        };
        self.transition(LoopState::Stopped);
        info!(?exit, stats = ?self.stats, "exchange loop stopped");
        exit
    }

    fn session(&mut self, cancel: &CancellationToken) -> Result<SessionEnd> {
        self.publish_changed(StatusChannel::Connection, STATUS_DISCONNECTED)?;
        self.publish_changed(StatusChannel::Frequency, STATUS_FREQUENCY_UNAVAILABLE)?;

        self.transition(LoopState::WaitingForPeer);
        self.publish_changed(StatusChannel::Connection, STATUS_WAITING)?;

        self.stats.connect_attempts += 1;
        let started = Instant::now();
        let mut conn = match self.connector.connect(self.config.connect_timeout) {
            Ok(conn) => conn,
            Err(err) => {
                debug!(error = %err, attempt = self.stats.connect_attempts, "connect failed");
                // Failures that return early still wait out the timeout.
                pause_until(started + self.config.connect_timeout, cancel);
                return Ok(SessionEnd::Faulted);
            }
        };

        self.abort.register(conn.abort_handle());
        let result = if cancel.is_cancelled() {
            // Shutdown raced the connect; the abort it issued hit no session.
            Ok(SessionEnd::Cancelled)
        } else {
            self.stats.sessions += 1;
            info!(session = self.stats.sessions, "controller connected");
            self.transition(LoopState::Active);
            self.exchange(&mut conn, cancel)
        };
        self.abort.clear();
        conn.close();
        result
    }

    fn exchange(
        &mut self,
        conn: &mut Connection<C::Stream>,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd> {
        self.publish_changed(StatusChannel::Connection, STATUS_CONNECTED)?;

        let mut buf = [0u8; RECORD_SIZE];
        loop {
            if cancel.is_cancelled() {
                return Ok(SessionEnd::Cancelled);
            }

            match self.cycle(conn, &mut buf) {
                Ok(measurement) => {
                    self.stats.cycles += 1;
                    trace!(elapsed = ?measurement.elapsed(), "cycle complete");
                    // Every cycle is reported, even when the rate is unchanged.
                    let text = measurement.frequency_text();
                    self.published.update(StatusChannel::Frequency, &text);
                    self.panel.publish_status(StatusChannel::Frequency, &text)?;
                }
                Err(err) if err.is_session_fault() => {
                    if cancel.is_cancelled() {
                        return Ok(SessionEnd::Cancelled);
                    }
                    self.stats.faults += 1;
                    warn!(error = %err, "session lost; reconnecting");
                    return Ok(SessionEnd::Faulted);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One read, process, write round trip.
    fn cycle(
        &mut self,
        conn: &mut Connection<C::Stream>,
        buf: &mut [u8; RECORD_SIZE],
    ) -> Result<CycleMeasurement> {
        let timer = CycleTimer::start();

        conn.read_exact(&mut buf[..])?;
        let mut record = decode(&buf[..])?;

        self.panel.show_outputs(outputs_to_logical(&record).collect())?;
        self.panel.sample_inputs()?.apply_to(&mut record);

        conn.write_exact_and_flush(&encode(&record))?;
        Ok(timer.finish())
    }

    /// Publish `text` unless the channel already shows it.
    fn publish_changed(&mut self, channel: StatusChannel, text: &str) -> Result<()> {
        if self.published.update(channel, text) {
            self.panel.publish_status(channel, text)?;
        }
        Ok(())
    }

    fn transition(&mut self, next: LoopState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "loop state");
            self.state = next;
        }
    }
}
