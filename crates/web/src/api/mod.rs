//! REST API endpoint modules.

pub mod events;
pub mod status;
