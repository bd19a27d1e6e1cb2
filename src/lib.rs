//! recipe-admin - Account administration service
//!
//! Stores account records (username, email, hashed password, profile
//! photo, timestamps), exposes create/read/update/delete operations,
//! and keeps the filesystem-backed photo asset of each account
//! consistent with its database row.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core business entities (Account, Password, PhotoUpload)
//! - **services**: Account lifecycle orchestration
//! - **infra**: Database, repositories, photo asset storage
//! - **api**: HTTP handlers and routes
//! - **types**: Shared response types
//! - **errors**: Centralized error handling

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Account, Password, PhotoUpload};
pub use errors::{AppError, AppResult};
