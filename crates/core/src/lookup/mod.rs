//! Repository metadata lookup.

pub mod codecommit;

use async_trait::async_trait;

use crate::errors::LookupError;
use crate::models::RepositoryMetadata;

pub use codecommit::CodeCommitLookup;

/// Lookup collaborator returning descriptive attributes of a repository.
#[async_trait]
pub trait RepositoryLookup: Send + Sync {
    async fn get_repository(&self, name: &str) -> Result<RepositoryMetadata, LookupError>;
}
