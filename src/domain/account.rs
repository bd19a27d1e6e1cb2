//! Account domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Storage key of the associated profile photo, at most one per account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    /// Activation is an external concern; new accounts start inactive
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied by the repository.
///
/// `None` leaves a field untouched. `photo_ref` is doubly optional so a
/// patch can distinguish "unchanged" from "cleared".
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub photo_ref: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl AccountPatch {
    /// True when the patch would not change any field
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.photo_ref.is_none()
            && self.is_active.is_none()
    }
}

/// Account response (safe to return to client)
#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            photo_ref: account.photo_ref,
            is_active: account.is_active,
            created_at: account.created_at,
        }
    }
}
