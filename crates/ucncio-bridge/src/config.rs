use std::time::Duration;

use ucncio_transport::{PipeName, DEFAULT_CONNECT_TIMEOUT};

/// Configuration for the exchange loop.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Pipe shared with the controller. Default: `ucncio`.
    pub pipe: PipeName,
    /// Wait before a connect attempt is abandoned. Default: 1000 ms.
    ///
    /// This also paces reconnect attempts while the controller is absent.
    pub connect_timeout: Duration,
}

impl BridgeConfig {
    pub fn with_pipe(mut self, pipe: PipeName) -> Self {
        self.pipe = pipe;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            pipe: PipeName::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}
