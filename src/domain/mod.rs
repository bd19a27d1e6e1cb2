//! Domain layer - Core business entities and logic
//!
//! This module contains the core domain models that represent
//! business concepts independent of infrastructure concerns.

pub mod account;
pub mod password;
pub mod photo;

pub use account::{Account, AccountPatch, AccountResponse};
pub use password::Password;
pub use photo::PhotoUpload;
