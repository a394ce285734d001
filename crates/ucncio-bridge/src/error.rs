/// Errors that can occur while running the exchange.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] ucncio_transport::TransportError),

    /// A received record could not be decoded.
    #[error("wire error: {0}")]
    Wire(#[from] ucncio_wire::WireError),

    /// The panel side of the UI channel has gone away.
    #[error("panel disconnected")]
    PanelClosed,

    /// The background worker thread could not be started.
    #[error("failed to spawn exchange worker: {0}")]
    Spawn(std::io::Error),

    /// The background worker panicked.
    #[error("exchange worker panicked")]
    WorkerPanicked,
}

impl BridgeError {
    /// True for failures that end the current session but not the loop.
    pub fn is_session_fault(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Wire(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
