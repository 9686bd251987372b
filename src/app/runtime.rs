use super::{ShutdownReason, TorchController};
use crate::error::{Result, TorchError};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

impl TorchController {
    /// Handle control requests until a shutdown request or signal arrives,
    /// then shut down. Returns the process exit code.
    pub async fn run(&mut self) -> Result<i32> {
        info!("Torchlight is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| TorchError::system("Shutdown sender already taken"))?;

        let mut shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| TorchError::system("Shutdown receiver already taken"))?;

        let mut control_receiver = self
            .control_receiver
            .take()
            .ok_or_else(|| TorchError::system("Control receiver already taken"))?;

        self.setup_signal_handlers(shutdown_sender);

        let shutdown_reason = loop {
            tokio::select! {
                reason = &mut shutdown_receiver => {
                    break reason.map_err(|_| {
                        TorchError::system("Shutdown channel closed unexpectedly")
                    })?;
                }
                request = control_receiver.recv() => match request {
                    Some(request) => {
                        if let Some(reason) = self.handle_request(request).await {
                            break reason;
                        }
                    }
                    None => break ShutdownReason::Error("control channel closed".to_string()),
                },
            }
        };

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Torchlight shutdown complete");
        Ok(exit_code)
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));
        let token = self.cancellation_token.clone();

        // Handle SIGTERM - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            let token = token.clone();
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                tokio::select! {
                    _ = token.cancelled() => {}
                    Some(()) = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                            let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                        }
                    }
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                Ok(()) = signal::ctrl_c() => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                    }
                }
            }
        });
    }
}
