//! Account repository - persistence boundary for account records.
//!
//! Every mutating operation runs inside its own scoped transaction:
//! partial row writes roll back on any failure, and uniqueness checks
//! happen on the same connection as the insert/update they guard.
//! DB-level unique indexes remain the last line of defense against
//! concurrent writers.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use super::entities::{account, order, recipe};
use crate::domain::{Account, AccountPatch};
use crate::errors::{AppError, AppResult};

/// Account repository trait for dependency injection.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create an account; fails with a conflict when username or email is taken
    async fn create(
        &self,
        username: String,
        email: String,
        password_hash: String,
    ) -> AppResult<Account>;

    /// Find account by id
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Account>>;

    /// List all accounts in creation order
    async fn list(&self) -> AppResult<Vec<Account>>;

    /// Apply a partial update; only supplied fields change
    async fn update(&self, id: i32, patch: AccountPatch) -> AppResult<Account>;

    /// Delete an account; cascades orders, rejected while recipes exist
    async fn delete(&self, id: i32) -> AppResult<()>;

    /// Count recipes belonging to an account
    async fn count_recipes(&self, account_id: i32) -> AppResult<u64>;
}

/// SeaORM-backed implementation of AccountRepository.
pub struct AccountStore {
    db: DatabaseConnection,
}

impl AccountStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Run a closure result through commit/rollback handling.
    async fn finish<T>(txn: DatabaseTransaction, result: AppResult<T>) -> AppResult<T> {
        match result {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Reject when another row already holds the username or email.
    ///
    /// `exclude_id` skips the row being updated so an account can keep
    /// its own values.
    async fn check_uniqueness(
        txn: &DatabaseTransaction,
        username: Option<&str>,
        email: Option<&str>,
        exclude_id: Option<i32>,
    ) -> AppResult<()> {
        if let Some(username) = username {
            let mut query =
                account::Entity::find().filter(account::Column::Username.eq(username));
            if let Some(id) = exclude_id {
                query = query.filter(account::Column::Id.ne(id));
            }
            if query.one(txn).await?.is_some() {
                return Err(AppError::conflict("username"));
            }
        }

        if let Some(email) = email {
            let mut query = account::Entity::find().filter(account::Column::Email.eq(email));
            if let Some(id) = exclude_id {
                query = query.filter(account::Column::Id.ne(id));
            }
            if query.one(txn).await?.is_some() {
                return Err(AppError::conflict("email"));
            }
        }

        Ok(())
    }

    async fn create_in(
        txn: &DatabaseTransaction,
        username: String,
        email: String,
        password_hash: String,
    ) -> AppResult<Account> {
        Self::check_uniqueness(txn, Some(&username), Some(&email), None).await?;

        let now = Utc::now();
        let active_model = account::ActiveModel {
            id: NotSet,
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            photo: Set(None),
            is_active: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(txn).await?;
        Ok(Account::from(model))
    }

    async fn update_in(
        txn: &DatabaseTransaction,
        id: i32,
        patch: AccountPatch,
    ) -> AppResult<Account> {
        let model = account::Entity::find_by_id(id)
            .one(txn)
            .await?
            .ok_or(AppError::NotFound)?;

        Self::check_uniqueness(
            txn,
            patch.username.as_deref(),
            patch.email.as_deref(),
            Some(id),
        )
        .await?;

        let mut active: account::ActiveModel = model.into();

        if let Some(username) = patch.username {
            active.username = Set(username);
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(password_hash) = patch.password_hash {
            active.password_hash = Set(password_hash);
        }
        if let Some(photo_ref) = patch.photo_ref {
            active.photo = Set(photo_ref);
        }
        if let Some(is_active) = patch.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(txn).await?;
        Ok(Account::from(model))
    }

    async fn delete_in(txn: &DatabaseTransaction, id: i32) -> AppResult<()> {
        account::Entity::find_by_id(id)
            .one(txn)
            .await?
            .ok_or(AppError::NotFound)?;

        // Recipes have no cascade configured: their presence blocks deletion.
        let recipes = recipe::Entity::find()
            .filter(recipe::Column::UserId.eq(id))
            .count(txn)
            .await?;
        if recipes > 0 {
            return Err(AppError::foreign_key("recipe"));
        }

        // Orders cascade with their account.
        order::Entity::delete_many()
            .filter(order::Column::UserId.eq(id))
            .exec(txn)
            .await?;

        account::Entity::delete_by_id(id).exec(txn).await?;
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for AccountStore {
    async fn create(
        &self,
        username: String,
        email: String,
        password_hash: String,
    ) -> AppResult<Account> {
        let txn = self.db.begin().await?;
        let result = Self::create_in(&txn, username, email, password_hash).await;
        Self::finish(txn, result).await
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Account>> {
        let model = account::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Account::from))
    }

    async fn list(&self) -> AppResult<Vec<Account>> {
        let models = account::Entity::find()
            .order_by_asc(account::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    async fn update(&self, id: i32, patch: AccountPatch) -> AppResult<Account> {
        let txn = self.db.begin().await?;
        let result = Self::update_in(&txn, id, patch).await;
        Self::finish(txn, result).await
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;
        let result = Self::delete_in(&txn, id).await;
        Self::finish(txn, result).await
    }

    async fn count_recipes(&self, account_id: i32) -> AppResult<u64> {
        let count = recipe::Entity::find()
            .filter(recipe::Column::UserId.eq(account_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}
