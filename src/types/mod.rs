//! Shared types used across layers.

pub mod response;

pub use response::{ApiResponse, Created, NoContent};
