//! The operator panel seen from the exchange loop.
//!
//! The panel's controls belong to the host's UI thread. The loop never calls
//! into them directly: it talks to a [`PanelPort`], and the production port
//! ([`PanelProxy`]) forwards every request over a channel to a
//! [`PanelDispatcher`] that the UI thread pumps. Input sampling carries a
//! reply channel, so the accessors run on the UI thread as well.

use tokio::sync::{mpsc, oneshot};
use tracing::trace;
use ucncio_wire::{logical_to_inputs, InputFragment, PinId, PinUpdate};

use crate::error::{BridgeError, Result};
use crate::status::StatusChannel;

/// Controls of the operator panel, implemented by the host UI.
///
/// Ids with no bound control are ignored by the setters and read as
/// `false` / `0` by the readers.
pub trait PinPanel {
    /// Show a digital output's state.
    fn set_output(&mut self, id: PinId, on: bool);

    /// Show a PWM channel's duty value.
    fn set_pwm(&mut self, id: PinId, duty: u8);

    /// Current state of a digital input control.
    fn read_input(&self, id: PinId) -> bool;

    /// Current value of an analog input control.
    fn read_analog(&self, id: PinId) -> u8;

    /// Replace the text of a status line.
    fn publish_status(&mut self, channel: StatusChannel, text: &str);
}

/// What the exchange loop needs from a panel, wherever it lives.
pub trait PanelPort {
    /// Display a batch of output/PWM values.
    fn show_outputs(&mut self, updates: Vec<PinUpdate>) -> Result<()>;

    /// Sample every input and analog control.
    fn sample_inputs(&mut self) -> Result<InputFragment>;

    /// Replace the text of a status line.
    fn publish_status(&mut self, channel: StatusChannel, text: &str) -> Result<()>;
}

fn show_on<P: PinPanel + ?Sized>(panel: &mut P, updates: &[PinUpdate]) {
    for update in updates {
        match *update {
            PinUpdate::Digital { id, on } => panel.set_output(id, on),
            PinUpdate::Level { id, value } => panel.set_pwm(id, value),
        }
    }
}

fn sample_from<P: PinPanel + ?Sized>(panel: &P) -> InputFragment {
    logical_to_inputs(|id| panel.read_input(id), |id| panel.read_analog(id))
}

/// A panel driven directly from the loop's own thread.
///
/// For panels whose state is not tied to a UI thread (headless hosts, tests).
#[derive(Debug, Default)]
pub struct LocalPanel<P> {
    inner: P,
}

impl<P: PinPanel> LocalPanel<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &P {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut P {
        &mut self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: PinPanel> PanelPort for LocalPanel<P> {
    fn show_outputs(&mut self, updates: Vec<PinUpdate>) -> Result<()> {
        show_on(&mut self.inner, &updates);
        Ok(())
    }

    fn sample_inputs(&mut self) -> Result<InputFragment> {
        Ok(sample_from(&self.inner))
    }

    fn publish_status(&mut self, channel: StatusChannel, text: &str) -> Result<()> {
        self.inner.publish_status(channel, text);
        Ok(())
    }
}

/// A request marshaled onto the UI thread.
#[derive(Debug)]
pub enum PanelRequest {
    Show(Vec<PinUpdate>),
    Sample(oneshot::Sender<InputFragment>),
    Status(StatusChannel, String),
}

/// Create a connected proxy/dispatcher pair.
pub fn panel_channel() -> (PanelProxy, PanelDispatcher) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        PanelProxy { tx },
        PanelDispatcher {
            rx,
            closed: false,
        },
    )
}

/// Loop-side end of the UI channel.
#[derive(Debug, Clone)]
pub struct PanelProxy {
    tx: mpsc::UnboundedSender<PanelRequest>,
}

impl PanelProxy {
    fn send(&self, request: PanelRequest) -> Result<()> {
        self.tx.send(request).map_err(|_| BridgeError::PanelClosed)
    }
}

impl PanelPort for PanelProxy {
    fn show_outputs(&mut self, updates: Vec<PinUpdate>) -> Result<()> {
        self.send(PanelRequest::Show(updates))
    }

    /// Blocks until the UI thread has answered.
    ///
    /// Fails with `PanelClosed` if the dispatcher is dropped first, which is
    /// how a waiting loop is released at shutdown.
    fn sample_inputs(&mut self) -> Result<InputFragment> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PanelRequest::Sample(reply_tx))?;
        reply_rx.blocking_recv().map_err(|_| BridgeError::PanelClosed)
    }

    fn publish_status(&mut self, channel: StatusChannel, text: &str) -> Result<()> {
        self.send(PanelRequest::Status(channel, text.to_string()))
    }
}

/// UI-side end of the UI channel.
#[derive(Debug)]
pub struct PanelDispatcher {
    rx: mpsc::UnboundedReceiver<PanelRequest>,
    closed: bool,
}

impl PanelDispatcher {
    /// Handle every request queued so far without blocking.
    ///
    /// Call this from the UI's event loop or timer. Returns the number of
    /// requests handled.
    pub fn pump<P: PinPanel + ?Sized>(&mut self, panel: &mut P) -> usize {
        let mut handled = 0usize;
        loop {
            match self.rx.try_recv() {
                Ok(request) => {
                    dispatch(panel, request);
                    handled += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => return handled,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.closed = true;
                    return handled;
                }
            }
        }
    }

    /// Handle requests until the loop side hangs up (blocking).
    ///
    /// For hosts that dedicate a thread to the panel.
    pub fn run<P: PinPanel + ?Sized>(&mut self, panel: &mut P) {
        while let Some(request) = self.rx.blocking_recv() {
            dispatch(panel, request);
        }
        self.closed = true;
    }

    /// True once the exchange loop has dropped its end.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

fn dispatch<P: PinPanel + ?Sized>(panel: &mut P, request: PanelRequest) {
    match request {
        PanelRequest::Show(updates) => show_on(panel, &updates),
        PanelRequest::Sample(reply) => {
            // The loop may have been cancelled while waiting; nothing to do then.
            let _ = reply.send(sample_from(panel));
        }
        PanelRequest::Status(channel, text) => {
            trace!(%channel, %text, "status");
            panel.publish_status(channel, &text);
        }
    }
}
