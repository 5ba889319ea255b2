//! Signal handling for graceful shutdown

use tracing::{debug, warn};

/// Handles shutdown signals (Ctrl+C, console close, system shutdown)
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal
    #[cfg(windows)]
    pub async fn wait(&self) {
        use tokio::signal::windows::{ctrl_close, ctrl_shutdown};

        let mut close = match ctrl_close() {
            Ok(close) => Some(close),
            Err(e) => {
                warn!(?e, "failed to register console close handler");
                None
            }
        };
        let mut shutdown = match ctrl_shutdown() {
            Ok(shutdown) => Some(shutdown),
            Err(e) => {
                warn!(?e, "failed to register system shutdown handler");
                None
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(?e, "failed to listen for Ctrl+C");
                    std::future::pending::<()>().await;
                }
                debug!("received Ctrl+C");
            }
            Some(_) = async { close.as_mut()?.recv().await } => {
                debug!("received console close");
            }
            Some(_) = async { shutdown.as_mut()?.recv().await } => {
                debug!("received system shutdown");
            }
        }
    }

    /// Wait for a shutdown signal
    #[cfg(not(windows))]
    pub async fn wait(&self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(?e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        debug!("received Ctrl+C");
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
