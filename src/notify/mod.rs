pub mod telegram;

use crate::config::TelegramConfig;
use crate::core::Alert;
use crate::error::NotifyError;
use async_trait::async_trait;
use log::{debug, error, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

pub use telegram::TelegramNotifier;

/// Sink for alert notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, alert: &Alert) -> Result<(), NotifyError>;

    async fn send_text(&self, text: &str) -> Result<(), NotifyError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Used when no credentials are configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_alert(&self, alert: &Alert) -> Result<(), NotifyError> {
        debug!("Notifications disabled, skipping alert for {}", alert.symbol);
        Ok(())
    }

    async fn send_text(&self, _text: &str) -> Result<(), NotifyError> {
        debug!("Notifications disabled, skipping message");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

pub fn build_notifier(config: Option<&TelegramConfig>) -> Arc<dyn Notifier> {
    match config {
        Some(config) => match TelegramNotifier::new(config.clone()) {
            Ok(notifier) => Arc::new(notifier),
            Err(e) => {
                error!("Failed to set up Telegram notifier, notifications disabled: {}", e);
                Arc::new(NoopNotifier)
            }
        },
        None => {
            warn!("Telegram credentials not configured, notifications disabled");
            Arc::new(NoopNotifier)
        }
    }
}

/// Hands alerts to the notifier without blocking the caller.
///
/// Each alert is delivered once on its own task; failures are logged by the
/// supervisor task and never retried.
#[derive(Clone)]
pub struct AlertDispatcher {
    sender: mpsc::UnboundedSender<Alert>,
}

impl AlertDispatcher {
    pub fn spawn(notifier: Arc<dyn Notifier>) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let supervisor = tokio::spawn(supervise(notifier, receiver));
        (Self { sender }, supervisor)
    }

    pub fn dispatch(&self, alert: Alert) {
        if let Err(e) = self.sender.send(alert) {
            error!("Alert dispatcher is gone, dropping alert for {}", e.0.symbol);
        }
    }
}

async fn supervise(notifier: Arc<dyn Notifier>, mut receiver: mpsc::UnboundedReceiver<Alert>) {
    let mut deliveries: JoinSet<(String, Result<(), NotifyError>)> = JoinSet::new();

    loop {
        tokio::select! {
            alert = receiver.recv() => match alert {
                Some(alert) => {
                    let notifier = Arc::clone(&notifier);
                    deliveries.spawn(async move {
                        let result = notifier.send_alert(&alert).await;
                        (alert.symbol, result)
                    });
                }
                None => break,
            },
            Some(finished) = deliveries.join_next(), if !deliveries.is_empty() => {
                report(finished);
            }
        }
    }

    // Let in-flight deliveries finish once every dispatcher is dropped
    while let Some(finished) = deliveries.join_next().await {
        report(finished);
    }
}

fn report(finished: Result<(String, Result<(), NotifyError>), tokio::task::JoinError>) {
    match finished {
        Ok((symbol, Ok(()))) => debug!("Alert for {} delivered", symbol),
        Ok((symbol, Err(e))) => error!("Failed to deliver alert for {}: {}", symbol, e),
        Err(e) => error!("Alert delivery task failed: {}", e),
    }
}
