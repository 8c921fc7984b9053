//! Notification dispatchers.
//!
//! The chat core only produces notification requests. Fan-out to devices is
//! owned by the push service behind `NOTIFICATION_WEBHOOK_URL`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{BaseNotificationDispatcher, NotificationRequest};

/// POSTs each request as JSON to the push service
pub struct WebhookNotificationDispatcher {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotificationDispatcher {
    pub fn new(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build notification HTTP client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl BaseNotificationDispatcher for WebhookNotificationDispatcher {
    async fn deliver(&self, request: NotificationRequest) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Notification webhook unreachable")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Notification webhook returned {}", status);
        }

        debug!(
            recipient_id = %request.recipient_id,
            message_id = %request.message_id,
            "Notification delivered"
        );
        Ok(())
    }
}

/// Used when no webhook is configured
pub struct LogNotificationDispatcher;

#[async_trait]
impl BaseNotificationDispatcher for LogNotificationDispatcher {
    async fn deliver(&self, request: NotificationRequest) -> Result<()> {
        info!(
            recipient_id = %request.recipient_id,
            chat_id = %request.chat_id,
            message_id = %request.message_id,
            preview = %request.preview,
            "Notification (no webhook configured)"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery of a batch of requests, sent concurrently.
///
/// Runs on its own task so a slow or failing transport never holds up the
/// caller. Each failure is logged and dropped.
pub fn dispatch_in_background(
    dispatcher: Arc<dyn BaseNotificationDispatcher>,
    requests: Vec<NotificationRequest>,
) {
    if requests.is_empty() {
        return;
    }

    tokio::spawn(async move {
        let deliveries = requests.into_iter().map(|request| {
            let dispatcher = dispatcher.clone();
            async move {
                let recipient_id = request.recipient_id;
                let message_id = request.message_id;
                if let Err(e) = dispatcher.deliver(request).await {
                    warn!(
                        recipient_id = %recipient_id,
                        message_id = %message_id,
                        error = %e,
                        "Notification dispatch failed"
                    );
                }
            }
        });
        join_all(deliveries).await;
    });
}
