//! Application state - Dependency injection container.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{AccountStore, Database, FsPhotoStore};
use crate::services::{AccountManager, AccountService};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    /// Account service
    pub account_service: Arc<dyn AccountService>,
    /// Database connection
    pub database: Arc<Database>,
    /// Application configuration
    pub config: Config,
}

impl AppState {
    /// Create application state from database connection and config.
    pub fn from_config(database: Arc<Database>, config: Config) -> Self {
        let repo = Arc::new(AccountStore::new(database.get_connection()));
        let photos = Arc::new(FsPhotoStore::new(&config));
        let account_service = Arc::new(AccountManager::new(repo, photos));

        Self::new(account_service, database, config)
    }

    /// Create application state with a manually injected service.
    pub fn new(
        account_service: Arc<dyn AccountService>,
        database: Arc<Database>,
        config: Config,
    ) -> Self {
        Self {
            account_service,
            database,
            config,
        }
    }
}
