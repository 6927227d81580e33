//! Repository event notifier core library.
//!
//! This crate turns CodeCommit repository change events into Slack
//! notifications: configuration, the event data model, the repository
//! metadata lookup, notification formatting and delivery, and the
//! [`EventNotifier`] that ties them together.

pub mod config;
pub mod errors;
pub mod lookup;
pub mod models;
pub mod notifier;
pub mod notify;

// Re-exports for convenience.
pub use config::AppConfig;
pub use models::{ChangeEvent, InvocationResult};
pub use notifier::EventNotifier;
