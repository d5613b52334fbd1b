use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;

use super::guard::token_fingerprint;
use super::{AlertGuard, AlertPayload, AlertSink};

/// Non-blocking hand-off from pipelines to the delivery task.
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    tx: mpsc::Sender<AlertPayload>,
}

impl AlertDispatcher {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AlertPayload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue an alert without waiting. A full or closed queue drops it.
    pub fn dispatch(&self, alert: AlertPayload) -> bool {
        match self.tx.try_send(alert) {
            Ok(()) => true,
            Err(TrySendError::Full(alert)) => {
                tracing::warn!(
                    symbol = %alert.symbol(),
                    change = alert.change_percent(),
                    "Alert queue full, dropping alert"
                );
                false
            }
            Err(TrySendError::Closed(alert)) => {
                tracing::warn!(
                    symbol = %alert.symbol(),
                    change = alert.change_percent(),
                    "Alert delivery stopped, dropping alert"
                );
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Sink reported failure or timed out. Not retried.
    Failed,
    /// Blocked by the guard before reaching the sink.
    Rejected,
}

/// Owns the sink and runs guard checks ahead of every send.
pub struct AlertDelivery {
    sink: Arc<dyn AlertSink>,
    guard: AlertGuard,
    token: Option<String>,
    timeout: Duration,
}

impl AlertDelivery {
    pub fn new(
        sink: Arc<dyn AlertSink>,
        guard: AlertGuard,
        token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            sink,
            guard,
            token,
            timeout,
        }
    }

    pub async fn deliver(&self, alert: &AlertPayload) -> DeliveryOutcome {
        if let Err(e) = self.guard.authorize(self.sink.target(), self.token.as_deref()) {
            tracing::error!(
                symbol = %alert.symbol(),
                change = alert.change_percent(),
                token_fp = %self.token.as_deref().map(token_fingerprint).unwrap_or_default(),
                error = %e,
                "Alert rejected by guard"
            );
            return DeliveryOutcome::Rejected;
        }

        match tokio::time::timeout(self.timeout, self.sink.send(alert)).await {
            Ok(true) => DeliveryOutcome::Delivered,
            Ok(false) => DeliveryOutcome::Failed,
            Err(_) => {
                tracing::warn!(
                    symbol = %alert.symbol(),
                    change = alert.change_percent(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Alert delivery timed out"
                );
                DeliveryOutcome::Failed
            }
        }
    }

    /// Drain the queue until every dispatcher is dropped or shutdown fires.
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<AlertPayload>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                alert = rx.recv() => {
                    match alert {
                        Some(alert) => {
                            let _ = self.deliver(&alert).await;
                        }
                        None => break,
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        tracing::debug!("Alert delivery stopped");
    }
}
