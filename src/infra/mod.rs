//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections and repositories
//! - Filesystem-backed photo asset storage

pub mod db;
pub mod photo_store;
pub mod repositories;

pub use db::{Database, Migrator};
pub use photo_store::{AttachOutcome, FsPhotoStore, PhotoStore};
pub use repositories::{AccountRepository, AccountStore};
