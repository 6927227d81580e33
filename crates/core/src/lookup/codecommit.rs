//! CodeCommit `GetRepository` client.

use async_trait::async_trait;
use aws_sdk_codecommit::config::Region;
use aws_sdk_codecommit::error::DisplayErrorContext;
use aws_sdk_codecommit::primitives::DateTime as SdkDateTime;
use aws_sdk_codecommit::types;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::RepositoryLookup;
use crate::errors::LookupError;
use crate::models::RepositoryMetadata;

/// Repository lookup backed by the CodeCommit API.
#[derive(Clone)]
pub struct CodeCommitLookup {
    client: aws_sdk_codecommit::Client,
}

impl CodeCommitLookup {
    /// Build a client from the default AWS provider chain. An explicit
    /// `region` overrides the chain's region.
    pub async fn from_env(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;
        info!(region = ?sdk_config.region(), "created CodeCommit client");
        Self::new(aws_sdk_codecommit::Client::new(&sdk_config))
    }

    pub fn new(client: aws_sdk_codecommit::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RepositoryLookup for CodeCommitLookup {
    #[instrument(skip(self))]
    async fn get_repository(&self, name: &str) -> Result<RepositoryMetadata, LookupError> {
        let output = self
            .client
            .get_repository()
            .repository_name(name)
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                if err.is_repository_does_not_exist_exception() {
                    LookupError::RepositoryNotFound(name.to_string())
                } else {
                    let detail = DisplayErrorContext(&err).to_string();
                    warn!(repository = name, error = %detail, "GetRepository failed");
                    LookupError::Service {
                        repository: name.to_string(),
                        detail,
                    }
                }
            })?;

        let metadata = output
            .repository_metadata()
            .ok_or_else(|| LookupError::MissingMetadata(name.to_string()))?;
        let metadata = metadata_from_sdk(name, metadata);
        debug!(
            repository = %metadata.repository_name,
            clone_url = metadata.clone_url_http.as_deref().unwrap_or(""),
            "fetched repository metadata"
        );
        Ok(metadata)
    }
}

fn metadata_from_sdk(requested: &str, m: &types::RepositoryMetadata) -> RepositoryMetadata {
    RepositoryMetadata {
        repository_name: m.repository_name().unwrap_or(requested).to_string(),
        repository_id: m.repository_id().map(str::to_string),
        account_id: m.account_id().map(str::to_string),
        arn: m.arn().map(str::to_string),
        repository_description: m.repository_description().map(str::to_string),
        default_branch: m.default_branch().map(str::to_string),
        clone_url_http: m.clone_url_http().map(str::to_string),
        clone_url_ssh: m.clone_url_ssh().map(str::to_string),
        creation_date: m.creation_date().and_then(to_chrono),
        last_modified_date: m.last_modified_date().and_then(to_chrono),
    }
}

fn to_chrono(dt: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_sdk() {
        let sdk = types::RepositoryMetadata::builder()
            .repository_name("demo-repo")
            .account_id("111122223333")
            .default_branch("main")
            .clone_url_http("https://git-codecommit.us-east-1.amazonaws.com/v1/repos/demo-repo")
            .creation_date(SdkDateTime::from_secs(1_577_836_800))
            .build();

        let meta = metadata_from_sdk("demo-repo", &sdk);
        assert_eq!(meta.repository_name, "demo-repo");
        assert_eq!(meta.account_id.as_deref(), Some("111122223333"));
        assert_eq!(meta.default_branch.as_deref(), Some("main"));
        assert_eq!(meta.creation_date.map(|d| d.timestamp()), Some(1_577_836_800));
        assert!(meta.last_modified_date.is_none());
        assert!(meta.clone_url_ssh.is_none());
    }

    #[test]
    fn test_metadata_from_sdk_falls_back_to_requested_name() {
        let sdk = types::RepositoryMetadata::builder().build();
        let meta = metadata_from_sdk("requested", &sdk);
        assert_eq!(meta.repository_name, "requested");
    }
}
