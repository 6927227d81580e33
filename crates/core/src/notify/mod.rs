//! Chat notifications for repository change records.
//!
//! [`ChatDelivery`] is the seam to the outbound webhook; [`SlackNotifier`]
//! is the production implementation. [`format_change_notification`] turns a
//! parsed record plus its repository's metadata into a Slack message.

pub mod slack;

use async_trait::async_trait;

use crate::config::SlackConfig;
use crate::errors::NotificationError;
use crate::models::{ParsedRecord, RepositoryMetadata};

pub use slack::{Attachment, AttachmentField, SlackMessage, SlackNotifier};

/// Delivery collaborator for formatted chat notifications.
#[async_trait]
pub trait ChatDelivery: Send + Sync {
    /// Deliver one message. A returned error affects only this message.
    async fn deliver(&self, message: &SlackMessage) -> Result<(), NotificationError>;
}

/// Presentation settings shared by every attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentStyle {
    pub color: Option<String>,
    pub author_name: String,
    pub author_link: Option<String>,
    pub author_icon: Option<String>,
    pub footer: String,
    pub footer_icon: Option<String>,
}

impl From<&SlackConfig> for AttachmentStyle {
    fn from(config: &SlackConfig) -> Self {
        Self {
            color: config.color.clone(),
            author_name: config.author_name.clone(),
            author_link: config.author_link.clone(),
            author_icon: config.author_icon.clone(),
            footer: config.footer.clone(),
            footer_icon: config.footer_icon.clone().filter(|u| !u.is_empty()),
        }
    }
}

impl Default for AttachmentStyle {
    fn default() -> Self {
        Self::from(&SlackConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Build the Slack message announcing one change record.
pub fn format_change_notification(
    record: &ParsedRecord<'_>,
    metadata: &RepositoryMetadata,
    style: &AttachmentStyle,
) -> SlackMessage {
    let region = record.region();
    let repository = record.repository();

    let attachment = Attachment {
        fallback: "Event Detected.".into(),
        color: style.color.clone(),
        pretext: format!(
            "CodeCommit Event detected in `{}` in Repo:`{}`",
            region, repository
        ),
        author_name: style.author_name.clone(),
        author_link: style.author_link.clone(),
        author_icon: style.author_icon.clone(),
        title: format!("Repo Event: {}", record.record.event_name),
        title_link: console_url(repository, region),
        fields: vec![
            short_field("Repo Name", &metadata.repository_name),
            short_field(
                "Repo Default Branch",
                metadata.default_branch.as_deref().unwrap_or("(none)"),
            ),
            short_field("Triggered-By", &record.record.user_identity_arn),
            short_field("Trigger Name", &record.record.event_trigger_name),
        ],
        footer: style.footer.clone(),
        footer_icon: style.footer_icon.clone(),
        ts: record.event_time.timestamp(),
        mrkdwn_in: vec!["pretext".into(), "text".into(), "fields".into()],
    };

    SlackMessage {
        text: String::new(),
        attachments: vec![attachment],
    }
}

/// Console link for browsing a repository.
fn console_url(repository: &str, region: &str) -> String {
    format!(
        "https://console.aws.amazon.com/codesuite/codecommit/repositories/{}/browse?region={}",
        repository, region
    )
}

/// A short field whose value renders as inline code.
fn short_field(title: &str, value: &str) -> AttachmentField {
    AttachmentField {
        title: title.into(),
        value: format!("`{}`", value),
        short: true,
    }
}
