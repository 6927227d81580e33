//! Change-event to chat-notification relay.
//!
//! The [`EventNotifier`] runs one invocation as a straight line:
//!
//! 1. Validate every record (resource name, event time).
//! 2. Look up metadata once per distinct repository named by the records.
//! 3. Format and deliver one notification per record, if delivery is
//!    configured. A failed delivery is recorded and the next record is
//!    still attempted.
//! 4. Report the first record's repository metadata with its timestamps
//!    redacted.
//!
//! Steps 1 and 2 are fatal on failure; nothing is delivered in that case.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::errors::RelayError;
use crate::lookup::RepositoryLookup;
use crate::models::{
    ChangeEvent, DeliveryOutcome, InvocationResult, ParsedRecord, RepositoryMetadata,
};
use crate::notify::{format_change_notification, AttachmentStyle, ChatDelivery, SlackNotifier};

/// Relays repository change events to the chat webhook.
pub struct EventNotifier {
    lookup: Arc<dyn RepositoryLookup>,
    delivery: Option<Arc<dyn ChatDelivery>>,
    style: AttachmentStyle,
}

impl EventNotifier {
    /// Create a notifier from explicit collaborators. `delivery = None`
    /// disables notifications.
    pub fn new(
        lookup: Arc<dyn RepositoryLookup>,
        delivery: Option<Arc<dyn ChatDelivery>>,
        style: AttachmentStyle,
    ) -> Self {
        Self {
            lookup,
            delivery,
            style,
        }
    }

    /// Create a notifier from resolved configuration, delivering through
    /// Slack when a webhook URL is configured.
    pub fn from_config(config: &AppConfig, lookup: Arc<dyn RepositoryLookup>) -> Self {
        let delivery = config.slack.webhook_url.as_ref().map(|url| {
            info!("Slack notifications enabled");
            Arc::new(SlackNotifier::new(url.clone())) as Arc<dyn ChatDelivery>
        });
        Self::new(lookup, delivery, AttachmentStyle::from(&config.slack))
    }

    /// Return whether a delivery collaborator is configured.
    pub fn delivery_enabled(&self) -> bool {
        self.delivery.is_some()
    }

    /// Decode a raw envelope and handle it.
    pub async fn handle_payload(&self, raw: &[u8]) -> InvocationResult {
        match ChangeEvent::from_slice(raw) {
            Ok(event) => self.handle_event(&event).await,
            Err(e) => {
                error!(error = %e, "rejecting undecodable event");
                InvocationResult::failure(e)
            }
        }
    }

    /// Handle one change event.
    pub async fn handle_event(&self, event: &ChangeEvent) -> InvocationResult {
        info!(records = event.records.len(), "handling change event");

        let result = match self.process(event).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "invocation failed");
                InvocationResult::failure(e)
            }
        };

        info!(
            status = result.status,
            deliveries = result.deliveries.len(),
            failed_deliveries = result.failed_deliveries(),
            "invocation complete"
        );
        result
    }

    async fn process(&self, event: &ChangeEvent) -> Result<InvocationResult, RelayError> {
        let records = event.validate()?;

        for parsed in &records {
            info!(
                record = parsed.index,
                repository = parsed.repository(),
                event_name = %parsed.record.event_name,
                references = ?parsed.record.reference_names(),
                "change record"
            );
        }

        let metadata = self.fetch_metadata(&records).await?;

        let deliveries = match self.delivery {
            Some(ref delivery) => self.deliver_all(&**delivery, &records, &metadata).await,
            None => {
                info!("no delivery endpoint configured, skipping notifications");
                Vec::new()
            }
        };

        let repo_data = metadata
            .get(records[0].repository())
            .map(RepositoryMetadata::redacted);

        Ok(InvocationResult {
            status: true,
            error_message: String::new(),
            repo_data,
            deliveries,
        })
    }

    /// Look up each distinct repository once, in first-appearance order.
    async fn fetch_metadata(
        &self,
        records: &[ParsedRecord<'_>],
    ) -> Result<HashMap<String, RepositoryMetadata>, RelayError> {
        let mut metadata = HashMap::new();

        for parsed in records {
            let repository = parsed.repository();
            if metadata.contains_key(repository) {
                continue;
            }

            let meta = self.lookup.get_repository(repository).await.map_err(|e| {
                error!(
                    repository,
                    error = %e,
                    "error getting repository; make sure it exists and is in the same region as this service"
                );
                e
            })?;
            info!(
                repository,
                clone_url = meta.clone_url_http.as_deref().unwrap_or(""),
                "resolved repository metadata"
            );
            metadata.insert(repository.to_string(), meta);
        }

        Ok(metadata)
    }

    async fn deliver_all(
        &self,
        delivery: &dyn ChatDelivery,
        records: &[ParsedRecord<'_>],
        metadata: &HashMap<String, RepositoryMetadata>,
    ) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::with_capacity(records.len());

        for parsed in records {
            let repository = parsed.repository().to_string();
            let Some(meta) = metadata.get(&repository) else {
                error!(record = parsed.index, repository = %repository, "no metadata for record, not delivering");
                outcomes.push(DeliveryOutcome {
                    record_index: parsed.index,
                    repository: repository.clone(),
                    delivered: false,
                    error_message: Some(format!("no metadata for repository '{}'", repository)),
                });
                continue;
            };
            let message = format_change_notification(parsed, meta, &self.style);

            let outcome = match delivery.deliver(&message).await {
                Ok(()) => {
                    info!(record = parsed.index, repository = %repository, "notification delivered");
                    DeliveryOutcome {
                        record_index: parsed.index,
                        repository,
                        delivered: true,
                        error_message: None,
                    }
                }
                Err(e) => {
                    warn!(record = parsed.index, repository = %repository, error = %e, "notification failed");
                    DeliveryOutcome {
                        record_index: parsed.index,
                        repository,
                        delivered: false,
                        error_message: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
