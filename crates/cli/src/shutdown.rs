use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Listens for SIGINT and SIGTERM so a long `dump` can stop between pages
/// and report where to resume.
#[derive(Clone)]
pub struct ShutdownSignal {
    cancel_token: CancellationToken,
}

impl ShutdownSignal {
    pub fn install() -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to listen for SIGINT: {e}");
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to listen for SIGTERM: {e}");
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT, stopping after the current page"),
                _ = terminate => info!("Received SIGTERM, stopping after the current page"),
            }
            token.cancel();
        });

        ShutdownSignal { cancel_token }
    }

    pub fn is_requested(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}
