//! Slack webhook notification sender.
//!
//! Posts attachment-style messages to a Slack channel via an incoming
//! webhook URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::ChatDelivery;
use crate::errors::NotificationError;

// ---------------------------------------------------------------------------
// Message payload
// ---------------------------------------------------------------------------

/// An incoming-webhook message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackMessage {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// A legacy Slack message attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub fallback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub pretext: String,
    pub author_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_icon: Option<String>,
    pub title: String,
    pub title_link: String,
    pub fields: Vec<AttachmentField>,
    pub footer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_icon: Option<String>,
    /// Unix timestamp shown next to the footer.
    pub ts: i64,
    pub mrkdwn_in: Vec<String>,
}

/// A labeled field inside an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Slack incoming-webhook notifier.
pub struct SlackNotifier {
    webhook_url: String,
    http: reqwest::Client,
}

impl SlackNotifier {
    /// Create a new Slack notifier targeting the given webhook URL.
    pub fn new(webhook_url: String) -> Self {
        info!("initializing Slack notifier");
        Self {
            webhook_url,
            http: reqwest::Client::new(),
        }
    }

    /// Send a message to the configured Slack channel.
    pub async fn send_message(&self, message: &SlackMessage) -> Result<(), NotificationError> {
        debug!(
            attachments = message.attachments.len(),
            "sending Slack message"
        );

        let resp = self
            .http
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await
            .map_err(NotificationError::HttpError)?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if status.is_client_error() {
            warn!(status = %status, body = %body, "Slack webhook rejected message");
            return Err(NotificationError::SlackError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            error!(status = %status, body = %body, "Slack webhook returned error");
            return Err(NotificationError::SlackError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        info!(response = %body, "Slack message sent successfully");
        Ok(())
    }
}

#[async_trait]
impl ChatDelivery for SlackNotifier {
    async fn deliver(&self, message: &SlackMessage) -> Result<(), NotificationError> {
        self.send_message(message).await
    }
}
