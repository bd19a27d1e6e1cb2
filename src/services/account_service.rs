//! Account service - orchestrates the account lifecycle.
//!
//! The ordering protocol per operation is explicit here instead of
//! living in persistence hooks: validation, then hashing, then the row
//! write, then the photo asset step. No filesystem mutation happens
//! before the row operation it belongs to has been confirmed legal.

use std::sync::Arc;

use async_trait::async_trait;
use validator::ValidateEmail;

use crate::config::{USERNAME_MAX_LENGTH, USERNAME_MIN_LENGTH};
use crate::domain::{Account, AccountPatch, Password, PhotoUpload};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{AccountRepository, AttachOutcome, PhotoStore};

/// Fields an edit may change. `None` leaves the field untouched.
#[derive(Debug, Default)]
pub struct EditAccount {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Plaintext; hashed before persistence. Empty after trim means
    /// "keep the current password".
    pub password: Option<String>,
    pub photo: Option<PhotoUpload>,
}

/// Account service trait for dependency injection.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Register a new account, optionally with a profile photo
    async fn register(
        &self,
        username: String,
        email: String,
        password: String,
        photo: Option<PhotoUpload>,
    ) -> AppResult<Account>;

    /// Update any subset of username, email, password, and photo
    async fn edit(&self, id: i32, changes: EditAccount) -> AppResult<Account>;

    /// Delete an account together with its orders and photo asset
    async fn delete(&self, id: i32) -> AppResult<()>;

    /// Get account by id
    async fn get(&self, id: i32) -> AppResult<Account>;

    /// List all accounts in creation order
    async fn list(&self) -> AppResult<Vec<Account>>;
}

/// Concrete implementation of AccountService.
pub struct AccountManager {
    repo: Arc<dyn AccountRepository>,
    photos: Arc<dyn PhotoStore>,
}

impl AccountManager {
    pub fn new(repo: Arc<dyn AccountRepository>, photos: Arc<dyn PhotoStore>) -> Self {
        Self { repo, photos }
    }

    fn validate_username(username: &str) -> AppResult<()> {
        let len = username.chars().count();
        if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&len) {
            return Err(AppError::validation(format!(
                "username must be {} to {} characters",
                USERNAME_MIN_LENGTH, USERNAME_MAX_LENGTH
            )));
        }
        Ok(())
    }

    fn validate_email(email: &str) -> AppResult<()> {
        if !email.validate_email() {
            return Err(AppError::validation("invalid email address"));
        }
        Ok(())
    }

    fn validate_photo(photo: &PhotoUpload) -> AppResult<()> {
        if !photo.is_valid_image() {
            return Err(AppError::validation(format!(
                "'{}' is not an accepted image file",
                photo.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountService for AccountManager {
    async fn register(
        &self,
        username: String,
        email: String,
        password: String,
        photo: Option<PhotoUpload>,
    ) -> AppResult<Account> {
        // Step 1: trim and validate everything before any mutation,
        // including the photo, so a row is never created for an upload
        // that could not be stored anyway.
        let username = username.trim().to_string();
        let email = email.trim().to_string();
        if username.is_empty() || email.is_empty() || password.trim().is_empty() {
            return Err(AppError::validation(
                "username, email and password must not be empty",
            ));
        }
        Self::validate_username(&username)?;
        Self::validate_email(&email)?;
        if let Some(photo) = &photo {
            Self::validate_photo(photo)?;
        }

        // Step 2: hash. Never touches disk; an error here aborts cleanly.
        let password_hash = Password::new(&password)?.into_string();

        // Step 3: row first, photo second. The row create enforces
        // uniqueness; nothing has been written to the content area yet.
        let account = self.repo.create(username, email, password_hash).await?;

        // Step 4: attach. A failure here does not roll the row back;
        // the account simply exists without its photo.
        if let Some(photo) = photo {
            let outcome = self.photos.attach(None, &photo).await?;
            if let Some(key) = outcome.stored_key() {
                let patch = AccountPatch {
                    photo_ref: Some(Some(key.to_string())),
                    ..Default::default()
                };
                return self.repo.update(account.id, patch).await;
            }
        }

        Ok(account)
    }

    async fn edit(&self, id: i32, changes: EditAccount) -> AppResult<Account> {
        let account = self.repo.find_by_id(id).await?.ok_or_not_found()?;

        let mut patch = AccountPatch::default();

        if let Some(username) = changes.username {
            let username = username.trim().to_string();
            if username.is_empty() {
                return Err(AppError::validation("username must not be empty"));
            }
            Self::validate_username(&username)?;
            patch.username = Some(username);
        }

        if let Some(email) = changes.email {
            let email = email.trim().to_string();
            if email.is_empty() {
                return Err(AppError::validation("email must not be empty"));
            }
            Self::validate_email(&email)?;
            patch.email = Some(email);
        }

        // An absent or blank password preserves the stored hash; the
        // password is never cleared implicitly.
        if let Some(password) = changes.password {
            if !password.trim().is_empty() {
                patch.password_hash = Some(Password::new(&password)?.into_string());
            }
        }

        if let Some(photo) = changes.photo {
            Self::validate_photo(&photo)?;
            match self
                .photos
                .attach(account.photo_ref.as_deref(), &photo)
                .await?
            {
                AttachOutcome::Stored(key) => {
                    patch.photo_ref = Some(Some(key));
                }
                AttachOutcome::Replaced(_) => {
                    // Same key, same location: the persisted ref is
                    // already correct.
                }
                AttachOutcome::RejectedConflict { existing } => {
                    tracing::warn!(
                        account_id = id,
                        incoming = %photo.derived_key(),
                        existing = %existing,
                        "photo upload discarded: conflicts with the existing asset"
                    );
                }
            }
        }

        // Blank edits and rejected photo conflicts leave nothing to persist.
        if patch.is_empty() {
            return Ok(account);
        }

        self.repo.update(id, patch).await
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let account = self.repo.find_by_id(id).await?.ok_or_not_found()?;

        // Deletion legality comes first: the photo must not be removed
        // for a row that in the end cannot be deleted.
        if self.repo.count_recipes(id).await? > 0 {
            return Err(AppError::foreign_key("recipe"));
        }

        if let Some(key) = &account.photo_ref {
            self.photos.remove(key).await?;
        }

        // Orders cascade inside the repository's delete transaction.
        self.repo.delete(id).await
    }

    async fn get(&self, id: i32) -> AppResult<Account> {
        self.repo.find_by_id(id).await?.ok_or_not_found()
    }

    async fn list(&self) -> AppResult<Vec<Account>> {
        self.repo.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_bounds() {
        assert!(AccountManager::validate_username("abc").is_err());
        assert!(AccountManager::validate_username("alice").is_ok());
        assert!(AccountManager::validate_username("a".repeat(20).as_str()).is_ok());
        assert!(AccountManager::validate_username("a".repeat(21).as_str()).is_err());
    }

    #[test]
    fn test_email_syntax() {
        assert!(AccountManager::validate_email("a@x.com").is_ok());
        assert!(AccountManager::validate_email("not-an-email").is_err());
    }
}
