//! Signal handling for graceful shutdown

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, warn};

/// Handles shutdown signals (SIGTERM, SIGINT)
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal
    ///
    /// A signal whose handler cannot be installed is skipped; if neither
    /// can be installed this never resolves and the process has to be killed.
    pub async fn wait(&self) {
        let mut sigterm = register(SignalKind::terminate(), "SIGTERM");
        let mut sigint = register(SignalKind::interrupt(), "SIGINT");

        tokio::select! {
            Some(()) = recv(&mut sigterm) => {
                debug!("received SIGTERM");
            }
            Some(()) = recv(&mut sigint) => {
                debug!("received SIGINT");
            }
            else => std::future::pending::<()>().await,
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

fn register(kind: SignalKind, name: &str) -> Option<Signal> {
    signal(kind)
        .map_err(|e| warn!(signal = name, error = %e, "failed to register signal handler"))
        .ok()
}

async fn recv(signal: &mut Option<Signal>) -> Option<()> {
    match signal {
        Some(signal) => signal.recv().await,
        None => None,
    }
}
