//! Pin exchange between the controller pipe and an operator panel.
//!
//! This is the "just works" layer. [`Bridge::spawn`] starts the exchange loop
//! on a background thread; the host pumps the returned [`PanelDispatcher`]
//! on whatever thread owns its controls, and calls [`Bridge::shutdown`] on
//! exit.

pub mod bridge;
pub mod config;
pub mod error;
pub mod exchange;
pub mod panel;
pub mod status;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use exchange::{AbortSlot, ExchangeLoop, LoopExit, LoopState, LoopStats};
pub use panel::{panel_channel, LocalPanel, PanelDispatcher, PanelPort, PanelProxy, PinPanel};
pub use status::{
    CycleMeasurement, CycleTimer, StatusChannel, STATUS_CONNECTED, STATUS_DISCONNECTED,
    STATUS_FREQUENCY_UNAVAILABLE, STATUS_WAITING,
};

pub use tokio_util::sync::CancellationToken;
