use std::thread::{self, JoinHandle};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span};
use ucncio_transport::{Connector, PipeClient};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::exchange::{AbortSlot, ExchangeLoop, LoopExit};
use crate::panel::{panel_channel, PanelDispatcher};

const WORKER_NAME: &str = "ucncio-exchange";

/// A running exchange loop on its own thread.
///
/// Dropping a `Bridge` without calling [`Bridge::shutdown`] still cancels the
/// loop and aborts its session, but does not wait for the thread.
#[derive(Debug)]
pub struct Bridge {
    cancel: CancellationToken,
    abort: AbortSlot,
    worker: Option<JoinHandle<LoopExit>>,
}

impl Bridge {
    /// Start the loop against the pipe named in `config`.
    ///
    /// The returned dispatcher must be pumped by the thread that owns the
    /// panel's controls.
    pub fn spawn(config: BridgeConfig) -> Result<(Self, PanelDispatcher)> {
        let client = PipeClient::new(config.pipe.clone());
        Self::spawn_with(client, config)
    }

    /// Start the loop against an arbitrary connector.
    pub fn spawn_with<C>(connector: C, config: BridgeConfig) -> Result<(Self, PanelDispatcher)>
    where
        C: Connector + 'static,
    {
        let (proxy, dispatcher) = panel_channel();
        let cancel = CancellationToken::new();
        let abort = AbortSlot::default();

        let span = info_span!("bridge", pipe = %config.pipe);
        let mut exchange = ExchangeLoop::new(connector, proxy, config).with_abort_slot(abort.clone());
        let token = cancel.clone();

        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let _entered = span.enter();
                exchange.run(&token)
            })
            .map_err(BridgeError::Spawn)?;

        Ok((
            Self {
                cancel,
                abort,
                worker: Some(worker),
            },
            dispatcher,
        ))
    }

    /// Token that stops the loop when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// True once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the loop and wait for the worker.
    ///
    /// A session blocked in I/O is aborted. A connect attempt in progress is
    /// allowed to run out its timeout. If the loop may be waiting on the
    /// panel, use [`Bridge::shutdown_with`] instead so that the dispatcher is
    /// released first.
    pub fn shutdown(mut self) -> Result<LoopExit> {
        self.stop();
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| BridgeError::WorkerPanicked),
            None => Ok(LoopExit::Cancelled),
        }
    }

    /// Cancel, release a loop waiting on the panel by dropping its
    /// dispatcher, then shut down.
    pub fn shutdown_with(self, dispatcher: PanelDispatcher) -> Result<LoopExit> {
        self.cancel.cancel();
        drop(dispatcher);
        self.shutdown()
    }

    fn stop(&self) {
        debug!("stopping exchange loop");
        self.cancel.cancel();
        self.abort.abort();
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}
