//! Migrate command - schema management for the account database.

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    // Connect without auto-running migrations for manual control
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    match args.action {
        MigrateAction::Up => {
            tracing::info!("Applying pending schema migrations...");
            or_internal(db.run_migrations().await)?;
            tracing::info!("Account schema is up to date");
        }
        MigrateAction::Down => {
            tracing::info!("Rolling back the last schema migration...");
            or_internal(db.rollback_migration().await)?;
            tracing::info!("Rollback complete");
        }
        MigrateAction::Status => {
            for (name, applied) in or_internal(db.migration_status().await)? {
                println!("{}: {}", name, if applied { "applied" } else { "pending" });
            }
        }
        MigrateAction::Fresh => {
            tracing::warn!("Dropping the user, order and recipe tables and re-migrating...");
            or_internal(db.fresh_migrations().await)?;
            tracing::info!("Fresh schema ready");
        }
    }

    Ok(())
}

/// Surface migration failures as internal errors.
fn or_internal<T>(result: Result<T, sea_orm::DbErr>) -> AppResult<T> {
    result.map_err(|e| AppError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn config(db_path: &Path) -> Config {
        Config {
            database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            upload_dir: PathBuf::from("static/image"),
        }
    }

    #[tokio::test]
    async fn test_migrate_lifecycle_on_sqlite() {
        let dir =
            std::env::temp_dir().join(format!("recipe-admin-migrate-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = config(&dir.join("app.db"));

        for action in [
            MigrateAction::Up,
            MigrateAction::Status,
            MigrateAction::Down,
            MigrateAction::Fresh,
        ] {
            execute(MigrateArgs { action }, config.clone()).await.unwrap();
        }

        std::fs::remove_dir_all(&dir).ok();
    }
}
