//! Domain model types for repository change events.
//!
//! The inbound types mirror the CodeCommit trigger envelope field names so
//! they can be decoded straight from the platform's JSON. The outbound
//! [`InvocationResult`] is what an invocation reports back.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::EventError;

// ---------------------------------------------------------------------------
// Inbound event
// ---------------------------------------------------------------------------

/// The inbound trigger payload: an ordered list of change records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<ChangeRecord>,
}

/// One reference update as delivered by the trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeRecord {
    #[serde(rename = "awsRegion")]
    pub aws_region: String,

    /// Colon-delimited resource name; the sixth segment is the repository.
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,

    #[serde(rename = "eventName")]
    pub event_name: String,

    #[serde(rename = "userIdentityARN")]
    pub user_identity_arn: String,

    #[serde(rename = "eventTriggerName")]
    pub event_trigger_name: String,

    #[serde(rename = "eventTime")]
    pub event_time: String,

    /// CodeCommit-specific block carrying the updated references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codecommit: Option<CodeCommitDetail>,

    /// References given at the top level of the record.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeCommitDetail {
    #[serde(default)]
    pub references: Vec<Reference>,
}

/// A single updated reference (branch or tag).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    #[serde(rename = "ref")]
    pub ref_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl ChangeEvent {
    /// Decode an event envelope from raw JSON bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(raw).map_err(|e| EventError::InvalidEnvelope(e.to_string()))
    }

    /// Parse the resource name and event time of every record.
    ///
    /// Fails on the first record that cannot be parsed, so no partial work
    /// is ever done for a malformed event.
    pub fn validate(&self) -> Result<Vec<ParsedRecord<'_>>, EventError> {
        if self.records.is_empty() {
            return Err(EventError::NoRecords);
        }

        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let resource = ResourceName::parse(&record.event_source_arn).map_err(|detail| {
                    EventError::MalformedResourceName {
                        index,
                        resource_name: record.event_source_arn.clone(),
                        detail,
                    }
                })?;
                let event_time = parse_event_time(&record.event_time).ok_or_else(|| {
                    EventError::InvalidEventTime {
                        index,
                        value: record.event_time.clone(),
                    }
                })?;
                Ok::<_, EventError>(ParsedRecord {
                    index,
                    record,
                    resource,
                    event_time,
                })
            })
            .collect()
    }
}

impl ChangeRecord {
    /// Names of all references this record updated, deduplicated.
    pub fn reference_names(&self) -> BTreeSet<&str> {
        self.codecommit
            .iter()
            .flat_map(|c| c.references.iter())
            .chain(self.references.iter())
            .map(|r| r.ref_name.as_str())
            .collect()
    }
}

/// A record whose resource name and event time have been parsed.
#[derive(Debug, Clone)]
pub struct ParsedRecord<'a> {
    pub index: usize,
    pub record: &'a ChangeRecord,
    pub resource: ResourceName,
    pub event_time: DateTime<Utc>,
}

impl ParsedRecord<'_> {
    /// The repository this record refers to.
    pub fn repository(&self) -> &str {
        &self.resource.repository
    }

    /// The record's region, falling back to the resource name's region.
    pub fn region(&self) -> &str {
        if self.record.aws_region.trim().is_empty() {
            &self.resource.region
        } else {
            &self.record.aws_region
        }
    }
}

// ---------------------------------------------------------------------------
// Resource names
// ---------------------------------------------------------------------------

/// Parsed `arn:partition:service:region:account:repository` resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceName {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    pub repository: String,
}

impl ResourceName {
    /// Minimum number of `:`-separated segments.
    pub const MIN_SEGMENTS: usize = 6;

    /// Parse a resource name. The repository is segment index 5.
    pub fn parse(value: &str) -> Result<Self, String> {
        let segments: Vec<&str> = value.split(':').collect();
        if segments.len() < Self::MIN_SEGMENTS {
            return Err(format!(
                "expected at least {} ':'-separated segments, found {}",
                Self::MIN_SEGMENTS,
                segments.len()
            ));
        }
        let repository = segments[5].trim();
        if repository.is_empty() {
            return Err("repository segment is empty".into());
        }
        Ok(Self {
            partition: segments[1].to_string(),
            service: segments[2].to_string(),
            region: segments[3].to_string(),
            account_id: segments[4].to_string(),
            repository: repository.to_string(),
        })
    }
}

/// Parse an event timestamp into a UTC instant.
///
/// Accepts RFC 3339, CodeCommit's `2020-01-01T00:00:00.000+0000` form, and
/// offset-less timestamps (taken as UTC).
pub fn parse_event_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Repository metadata
// ---------------------------------------------------------------------------

/// Repository attributes returned by the lookup collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMetadata {
    pub repository_name: String,
    pub repository_id: Option<String>,
    pub account_id: Option<String>,
    pub arn: Option<String>,
    pub repository_description: Option<String>,
    pub default_branch: Option<String>,
    pub clone_url_http: Option<String>,
    pub clone_url_ssh: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl RepositoryMetadata {
    /// Copy with the volatile timestamps removed.
    pub fn redacted(&self) -> Self {
        Self {
            creation_date: None,
            last_modified_date: None,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Invocation result
// ---------------------------------------------------------------------------

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub record_index: usize,
    pub repository: String,
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// What an invocation reports back to its caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub status: bool,
    pub error_message: String,
    /// Metadata of the first record's repository, timestamps redacted.
    pub repo_data: Option<RepositoryMetadata>,
    #[serde(default)]
    pub deliveries: Vec<DeliveryOutcome>,
}

impl InvocationResult {
    /// A failed invocation carrying only the error message.
    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            status: false,
            error_message: error.to_string(),
            repo_data: None,
            deliveries: Vec::new(),
        }
    }

    /// Number of deliveries that failed.
    pub fn failed_deliveries(&self) -> usize {
        self.deliveries.iter().filter(|d| !d.delivered).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ARN: &str = "arn:aws:codecommit:us-east-1:111122223333:demo-repo";

    #[test]
    fn test_resource_name_parse() {
        let name = ResourceName::parse(ARN).unwrap();
        assert_eq!(name.partition, "aws");
        assert_eq!(name.service, "codecommit");
        assert_eq!(name.region, "us-east-1");
        assert_eq!(name.account_id, "111122223333");
        assert_eq!(name.repository, "demo-repo");
    }

    #[test]
    fn test_resource_name_too_few_segments() {
        let err = ResourceName::parse("arn:aws:codecommit:us-east-1:111122223333").unwrap_err();
        assert!(err.contains("found 5"));
        assert!(ResourceName::parse("").is_err());
        assert!(ResourceName::parse("arn:aws:codecommit:us-east-1:1:").is_err());
    }

    #[test]
    fn test_parse_event_time_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_event_time("2020-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_event_time("2020-01-01T00:00:00.000+0000"), Some(expected));
        assert_eq!(parse_event_time("2020-01-01T02:00:00+02:00"), Some(expected));
        assert_eq!(parse_event_time("2020-01-01T00:00:00"), Some(expected));
        assert_eq!(parse_event_time("2020-01-01 00:00:00"), Some(expected));
        assert_eq!(parse_event_time("yesterday"), None);
        assert_eq!(parse_event_time(""), None);
    }

    #[test]
    fn test_decode_codecommit_envelope() {
        let raw = br#"{
            "Records": [{
                "awsRegion": "us-east-2",
                "codecommit": {
                    "references": [
                        {"commit": "5e493c6f", "ref": "refs/heads/main"},
                        {"commit": "5e493c6f", "ref": "refs/tags/v1", "created": true}
                    ]
                },
                "eventId": "5a824061-17ca-46a9-bbf9-114edeadbeef",
                "eventName": "ReferenceChanges",
                "eventSource": "aws:codecommit",
                "eventSourceARN": "arn:aws:codecommit:us-east-2:123456789012:my-repo",
                "eventTime": "2019-03-12T20:58:25.400+0000",
                "eventTriggerName": "my-trigger",
                "userIdentityARN": "arn:aws:iam::123456789012:root"
            }]
        }"#;
        let event = ChangeEvent::from_slice(raw).unwrap();
        assert_eq!(event.records.len(), 1);
        let record = &event.records[0];
        assert_eq!(record.event_name, "ReferenceChanges");
        assert_eq!(
            record.reference_names().into_iter().collect::<Vec<_>>(),
            vec!["refs/heads/main", "refs/tags/v1"]
        );

        let parsed = event.validate().unwrap();
        assert_eq!(parsed[0].repository(), "my-repo");
        assert_eq!(parsed[0].region(), "us-east-2");
        assert_eq!(parsed[0].event_time.timestamp(), 1552424305);
    }

    #[test]
    fn test_region_falls_back_to_resource_name() {
        let event = ChangeEvent {
            records: vec![ChangeRecord {
                event_source_arn: ARN.into(),
                event_time: "2020-01-01T00:00:00Z".into(),
                references: vec![Reference {
                    ref_name: "refs/heads/main".into(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        let parsed = event.validate().unwrap();
        assert_eq!(parsed[0].region(), "us-east-1");
        assert_eq!(
            event.records[0].reference_names().into_iter().collect::<Vec<_>>(),
            vec!["refs/heads/main"]
        );
    }

    #[test]
    fn test_validate_reports_offending_record() {
        let good = ChangeRecord {
            event_source_arn: ARN.into(),
            event_time: "2020-01-01T00:00:00Z".into(),
            ..Default::default()
        };
        let bad_time = ChangeRecord {
            event_time: "soon".into(),
            ..good.clone()
        };
        let event = ChangeEvent {
            records: vec![good.clone(), bad_time],
        };
        assert!(matches!(
            event.validate(),
            Err(EventError::InvalidEventTime { index: 1, .. })
        ));

        let event = ChangeEvent { records: vec![] };
        assert!(matches!(event.validate(), Err(EventError::NoRecords)));
    }

    #[test]
    fn test_invalid_envelope() {
        assert!(matches!(
            ChangeEvent::from_slice(b"{\"Records\": 3}"),
            Err(EventError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_redacted_metadata_serializes_null_dates() {
        let meta = RepositoryMetadata {
            repository_name: "demo-repo".into(),
            default_branch: Some("main".into()),
            clone_url_http: Some("https://git-codecommit.us-east-1.amazonaws.com/v1/repos/demo-repo".into()),
            creation_date: Some(Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap()),
            last_modified_date: Some(Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        let value = serde_json::to_value(meta.redacted()).unwrap();
        assert_eq!(value["repositoryName"], "demo-repo");
        assert_eq!(value["defaultBranch"], "main");
        assert!(value["creationDate"].is_null());
        assert!(value["lastModifiedDate"].is_null());
        assert!(value.as_object().unwrap().contains_key("creationDate"));
        // The source value keeps its dates.
        assert!(meta.creation_date.is_some());
    }

    #[test]
    fn test_invocation_failure() {
        let result = InvocationResult::failure(EventError::NoRecords);
        assert!(!result.status);
        assert_eq!(result.error_message, "event contains no records");
        assert!(result.repo_data.is_none());
        assert_eq!(result.failed_deliveries(), 0);
    }
}
