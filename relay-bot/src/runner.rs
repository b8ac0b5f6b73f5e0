//! Event loop: bridges the notification stream into a channel consumed by a
//! single router task.
//!
//! One reader task forwards stream events into an unbounded mpsc; one
//! consumer runs the router end to end, one notification at a time. That
//! single consumer is what serializes per-user read-modify-write on the
//! rate-limit and conversation state; the handler only suspends at its own
//! await points and no second notification starts until it returns.

use crate::router::NotificationRouter;
use masto_client::MastoClient;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Runs the relay until the notification stream ends. The stream is not
/// restartable, so termination is reported as an error and the process is
/// expected to exit and be restarted by its supervisor; in-flight requests
/// are simply lost (at-most-once).
pub async fn run(client: MastoClient, router: NotificationRouter) -> anyhow::Result<()> {
    let mut stream = client.stream_user_notifications().await?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let reader = tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            match item {
                Ok(notification) => {
                    if tx.send(notification).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "notification stream failed");
                    break;
                }
            }
        }
        info!("notification stream ended");
    });

    while let Some(notification) = rx.recv().await {
        // Handler failures are absorbed per notification; nothing past
        // startup is fatal except losing the stream itself.
        if let Err(e) = router.handle(&notification).await {
            error!(error = %e, "failed to handle notification");
        }
    }

    reader.await.ok();
    anyhow::bail!("notification stream closed; restart the relay to reconnect")
}
