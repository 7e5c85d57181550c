//! Ctrl-C / SIGTERM as an interrupt for the checkout in progress.

use std::future::Future;

use tokio::signal;
use tokio::sync::watch;

/// Latched interrupt flag: once triggered it stays triggered, so a future
/// taken from [`signalled`](Self::signalled) afterwards resolves at once.
pub struct ShutdownController {
    flag: watch::Sender<bool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            flag: watch::Sender::new(false),
        }
    }

    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut flag = self.flag.subscribe();
        async move {
            // the sender lives as long as the controller; dropped means never
            if flag.wait_for(|set| *set).await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    pub fn trigger(&self) {
        self.flag.send_replace(true);
    }

    /// Resolve on the first SIGINT or SIGTERM and latch the flag.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = signal::ctrl_c() => tracing::info!(signal = "SIGINT", "interrupting checkout"),
            _ = terminate => tracing::info!(signal = "SIGTERM", "interrupting checkout"),
        }
        self.trigger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_wakes_waiting_future() {
        let controller = ShutdownController::new();
        let signalled = tokio::spawn(controller.signalled());
        controller.trigger();
        signalled.await.unwrap();
    }

    #[tokio::test]
    async fn late_future_sees_earlier_trigger() {
        let controller = ShutdownController::new();
        controller.trigger();
        controller.signalled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn untriggered_future_stays_pending() {
        let controller = ShutdownController::new();
        let waited =
            tokio::time::timeout(std::time::Duration::from_secs(60), controller.signalled()).await;
        assert!(waited.is_err());
    }
}
