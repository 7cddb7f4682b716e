use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AppError;

/// Push payload. `channel` selects the client-side notification channel
/// ("booking", "transaction", ...).
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub channel: &'static str,
}

/// Delivery seam for the external push provider. Implementations talk to
/// FCM or similar; the core only ever calls this best-effort.
#[async_trait]
pub trait PushNotifier: Send + Sync {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), AppError>;
}

/// Default notifier: logs instead of delivering. Keeps the binary usable
/// without provider credentials.
pub struct LoggingNotifier;

#[async_trait]
impl PushNotifier for LoggingNotifier {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), AppError> {
        debug!(
            token = %token,
            channel = %message.channel,
            title = %message.title,
            "push notification (logging notifier)"
        );
        Ok(())
    }
}

/// Pushes never fail the operation that triggered them: missing tokens are
/// skipped, provider errors are logged and swallowed.
pub async fn push_best_effort(
    notifier: &dyn PushNotifier,
    token: Option<&str>,
    message: PushMessage,
) {
    let Some(token) = token else {
        debug!(title = %message.title, "no push token registered; skipping");
        return;
    };

    if let Err(err) = notifier.send(token, &message).await {
        warn!(error = %err, title = %message.title, "push notification failed");
    }
}
