//! Account service unit tests.
//!
//! The repository and photo store are mocked so these tests exercise
//! the orchestration rules: validation, hashing, attach-protocol
//! handling, and delete ordering.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use mockall::predicate::eq;
use mockall::Sequence;

use recipe_admin::domain::{Account, AccountPatch, Password, PhotoUpload};
use recipe_admin::errors::{AppError, AppResult};
use recipe_admin::infra::{AccountRepository, AttachOutcome, PhotoStore};
use recipe_admin::services::{AccountManager, AccountService, EditAccount};

mock! {
    Repo {}

    #[async_trait]
    impl AccountRepository for Repo {
        async fn create(
            &self,
            username: String,
            email: String,
            password_hash: String,
        ) -> AppResult<Account>;
        async fn find_by_id(&self, id: i32) -> AppResult<Option<Account>>;
        async fn list(&self) -> AppResult<Vec<Account>>;
        async fn update(&self, id: i32, patch: AccountPatch) -> AppResult<Account>;
        async fn delete(&self, id: i32) -> AppResult<()>;
        async fn count_recipes(&self, account_id: i32) -> AppResult<u64>;
    }
}

// `Option<&str>` inside an async-trait method can't be mocked directly
// (the generic lifetime would leak into the boxed future's bounds), so
// the expectations live on sync inherent methods and the trait impl is
// a thin delegation.
mock! {
    Photos {
        fn attach<'a>(
            &self,
            current: Option<&'a str>,
            upload: &PhotoUpload,
        ) -> AppResult<AttachOutcome>;
        fn remove(&self, key: &str) -> AppResult<()>;
        fn exists(&self, key: &str) -> AppResult<bool>;
    }
}

#[async_trait]
impl PhotoStore for MockPhotos {
    async fn attach(
        &self,
        current: Option<&str>,
        upload: &PhotoUpload,
    ) -> AppResult<AttachOutcome> {
        MockPhotos::attach(self, current, upload)
    }
    async fn remove(&self, key: &str) -> AppResult<()> {
        MockPhotos::remove(self, key)
    }
    async fn exists(&self, key: &str) -> AppResult<bool> {
        MockPhotos::exists(self, key)
    }
}

fn test_account(id: i32, username: &str, email: &str, password_hash: &str) -> Account {
    let now = Utc::now();
    Account {
        id,
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        photo_ref: None,
        is_active: false,
        created_at: now,
        updated_at: now,
    }
}

fn service(repo: MockRepo, photos: MockPhotos) -> AccountManager {
    AccountManager::new(Arc::new(repo), Arc::new(photos))
}

#[tokio::test]
async fn test_register_hashes_password_and_trims_fields() {
    let mut repo = MockRepo::new();
    repo.expect_create()
        .withf(|username, email, hash| {
            username == "alice" && email == "a@x.com" && hash != "secret1"
        })
        .returning(|u, e, h| Ok(test_account(1, &u, &e, &h)));

    let service = service(repo, MockPhotos::new());
    let account = service
        .register(
            "  alice  ".to_string(),
            " a@x.com ".to_string(),
            "secret1".to_string(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(account.username, "alice");
    assert_eq!(account.email, "a@x.com");
    assert_ne!(account.password_hash, "secret1");
    assert!(Password::from_hash(account.password_hash).verify("secret1"));
}

#[tokio::test]
async fn test_register_rejects_empty_fields() {
    // No repository or store expectation: nothing may be written
    let service = service(MockRepo::new(), MockPhotos::new());

    let result = service
        .register("alice".to_string(), "a@x.com".to_string(), "   ".to_string(), None)
        .await;
    assert!(matches!(result.unwrap_err(), AppError::Validation(_)));

    let result = service
        .register("  ".to_string(), "a@x.com".to_string(), "secret1".to_string(), None)
        .await;
    assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
}

#[tokio::test]
async fn test_register_validates_username_bounds_and_email() {
    let service = service(MockRepo::new(), MockPhotos::new());

    let result = service
        .register("abc".to_string(), "a@x.com".to_string(), "secret1".to_string(), None)
        .await;
    assert!(matches!(result.unwrap_err(), AppError::Validation(_)));

    let result = service
        .register("alice".to_string(), "not-an-email".to_string(), "secret1".to_string(), None)
        .await;
    assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts_without_photo_write() {
    let mut repo = MockRepo::new();
    repo.expect_create()
        .returning(|_, _, _| Err(AppError::conflict("username")));

    // MockPhotos has no expectations: any attach call would panic,
    // proving no file is written for a failed row create.
    let service = service(repo, MockPhotos::new());
    let result = service
        .register(
            "alice".to_string(),
            "b@y.com".to_string(),
            "secret2".to_string(),
            Some(PhotoUpload::new("b.png", vec![1, 2, 3])),
        )
        .await;

    assert!(matches!(result.unwrap_err(), AppError::Conflict(_)));
}

#[tokio::test]
async fn test_register_attaches_photo_after_row_create() {
    let mut seq = Sequence::new();

    let mut repo = MockRepo::new();
    repo.expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|u, e, h| Ok(test_account(7, &u, &e, &h)));

    let mut photos = MockPhotos::new();
    photos
        .expect_attach()
        .withf(|current, upload| current.is_none() && upload.derived_key() == "a.png")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, upload| Ok(AttachOutcome::Stored(upload.derived_key())));

    repo.expect_update()
        .withf(|id, patch| *id == 7 && patch.photo_ref == Some(Some("a.png".to_string())))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|id, patch| {
            let mut account = test_account(id, "alice", "a@x.com", "hash");
            account.photo_ref = patch.photo_ref.clone().flatten();
            Ok(account)
        });

    let service = service(repo, photos);
    let account = service
        .register(
            "alice".to_string(),
            "a@x.com".to_string(),
            "secret1".to_string(),
            Some(PhotoUpload::new("a.png", vec![1, 2, 3])),
        )
        .await
        .unwrap();

    assert_eq!(account.photo_ref.as_deref(), Some("a.png"));
}

#[tokio::test]
async fn test_register_rejects_bad_photo_before_any_write() {
    // Neither mock carries expectations: validation must fail first
    let service = service(MockRepo::new(), MockPhotos::new());

    let result = service
        .register(
            "alice".to_string(),
            "a@x.com".to_string(),
            "secret1".to_string(),
            Some(PhotoUpload::new("script.sh", vec![1])),
        )
        .await;

    assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
}

#[tokio::test]
async fn test_edit_without_password_preserves_hash() {
    let old_hash = Password::new("oldpass").unwrap().into_string();
    let stored = {
        let hash = old_hash.clone();
        move |_| Ok(Some(test_account(3, "alice", "a@x.com", &hash)))
    };

    let mut repo = MockRepo::new();
    repo.expect_find_by_id().with(eq(3)).returning(stored);
    repo.expect_update()
        .withf(|_, patch| patch.password_hash.is_none())
        .returning(|id, patch| {
            let mut account = test_account(id, "alice", "a@x.com", "unchanged");
            if let Some(username) = patch.username.clone() {
                account.username = username;
            }
            Ok(account)
        });

    let service = service(repo, MockPhotos::new());
    let account = service
        .edit(
            3,
            EditAccount {
                username: Some("alice2".to_string()),
                password: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(account.username, "alice2");
}

#[tokio::test]
async fn test_edit_with_password_hashes_new_one() {
    let old_hash = Password::new("oldpass").unwrap().into_string();
    let stored = {
        let hash = old_hash.clone();
        move |_| Ok(Some(test_account(3, "alice", "a@x.com", &hash)))
    };

    let mut repo = MockRepo::new();
    repo.expect_find_by_id().with(eq(3)).returning(stored);
    repo.expect_update()
        .withf(|_, patch| patch.password_hash.is_some())
        .returning(|id, patch| {
            Ok(test_account(id, "alice", "a@x.com", &patch.password_hash.unwrap()))
        });

    let service = service(repo, MockPhotos::new());
    let account = service
        .edit(
            3,
            EditAccount {
                password: Some("newpass".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let password = Password::from_hash(account.password_hash);
    assert!(password.verify("newpass"));
    assert!(!password.verify("oldpass"));
}

#[tokio::test]
async fn test_edit_unknown_id_not_found() {
    let mut repo = MockRepo::new();
    repo.expect_find_by_id().returning(|_| Ok(None));

    let service = service(repo, MockPhotos::new());
    let result = service.edit(99, EditAccount::default()).await;

    assert!(matches!(result.unwrap_err(), AppError::NotFound));
}

#[tokio::test]
async fn test_edit_photo_conflict_keeps_existing_ref() {
    let mut repo = MockRepo::new();
    repo.expect_find_by_id().with(eq(5)).returning(|_| {
        let mut account = test_account(5, "alice", "a@x.com", "hash");
        account.photo_ref = Some("old.png".to_string());
        Ok(Some(account))
    });
    // No expect_update: the rejected conflict leaves nothing to persist,
    // so the row must not be written at all

    let mut photos = MockPhotos::new();
    photos
        .expect_attach()
        .withf(|current, _| current == &Some("old.png"))
        .returning(|current, _| {
            Ok(AttachOutcome::RejectedConflict {
                existing: current.unwrap().to_string(),
            })
        });

    let service = service(repo, photos);
    let account = service
        .edit(
            5,
            EditAccount {
                photo: Some(PhotoUpload::new("new.png", vec![9, 9])),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(account.photo_ref.as_deref(), Some("old.png"));
}

#[tokio::test]
async fn test_edit_with_no_changes_performs_no_write() {
    let mut repo = MockRepo::new();
    repo.expect_find_by_id()
        .with(eq(7))
        .returning(|_| Ok(Some(test_account(7, "alice", "a@x.com", "hash"))));
    // No expect_update: an empty edit must leave the row alone

    let service = service(repo, MockPhotos::new());
    let account = service.edit(7, EditAccount::default()).await.unwrap();

    assert_eq!(account.username, "alice");
}

#[tokio::test]
async fn test_edit_photo_stored_updates_ref() {
    let mut repo = MockRepo::new();
    repo.expect_find_by_id()
        .with(eq(5))
        .returning(|_| Ok(Some(test_account(5, "alice", "a@x.com", "hash"))));
    repo.expect_update()
        .withf(|_, patch| patch.photo_ref == Some(Some("new.png".to_string())))
        .returning(|id, patch| {
            let mut account = test_account(id, "alice", "a@x.com", "hash");
            account.photo_ref = patch.photo_ref.clone().flatten();
            Ok(account)
        });

    let mut photos = MockPhotos::new();
    photos
        .expect_attach()
        .returning(|_, upload| Ok(AttachOutcome::Stored(upload.derived_key())));

    let service = service(repo, photos);
    let account = service
        .edit(
            5,
            EditAccount {
                photo: Some(PhotoUpload::new("new.png", vec![9, 9])),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(account.photo_ref.as_deref(), Some("new.png"));
}

#[tokio::test]
async fn test_delete_blocked_by_recipes_leaves_photo_alone() {
    let mut repo = MockRepo::new();
    repo.expect_find_by_id().with(eq(4)).returning(|_| {
        let mut account = test_account(4, "alice", "a@x.com", "hash");
        account.photo_ref = Some("a.png".to_string());
        Ok(Some(account))
    });
    repo.expect_count_recipes().with(eq(4)).returning(|_| Ok(2));
    // No expect_delete and no photo expectations: neither may run

    let service = service(repo, MockPhotos::new());
    let result = service.delete(4).await;

    assert!(matches!(result.unwrap_err(), AppError::ForeignKey(_)));
}

#[tokio::test]
async fn test_delete_removes_photo_then_row() {
    let mut seq = Sequence::new();

    let mut repo = MockRepo::new();
    repo.expect_find_by_id()
        .with(eq(4))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            let mut account = test_account(4, "alice", "a@x.com", "hash");
            account.photo_ref = Some("a.png".to_string());
            Ok(Some(account))
        });
    repo.expect_count_recipes()
        .with(eq(4))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(0));

    let mut photos = MockPhotos::new();
    photos
        .expect_remove()
        .withf(|key| key == "a.png")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    repo.expect_delete()
        .with(eq(4))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let service = service(repo, photos);
    assert!(service.delete(4).await.is_ok());
}

#[tokio::test]
async fn test_delete_without_photo_skips_asset_removal() {
    let mut repo = MockRepo::new();
    repo.expect_find_by_id()
        .with(eq(8))
        .returning(|_| Ok(Some(test_account(8, "bob", "b@y.com", "hash"))));
    repo.expect_count_recipes().with(eq(8)).returning(|_| Ok(0));
    repo.expect_delete().with(eq(8)).returning(|_| Ok(()));

    let service = service(repo, MockPhotos::new());
    assert!(service.delete(8).await.is_ok());
}

#[tokio::test]
async fn test_delete_unknown_id_not_found() {
    let mut repo = MockRepo::new();
    repo.expect_find_by_id().returning(|_| Ok(None));

    let service = service(repo, MockPhotos::new());
    let result = service.delete(42).await;

    assert!(matches!(result.unwrap_err(), AppError::NotFound));
}

#[tokio::test]
async fn test_duplicate_registration_scenario() {
    let mut seq = Sequence::new();

    let mut repo = MockRepo::new();
    repo.expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|u, e, h| Ok(test_account(1, &u, &e, &h)));
    repo.expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Err(AppError::conflict("username")));
    repo.expect_list()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(vec![test_account(1, "alice", "a@x.com", "hash")]));

    let service = service(repo, MockPhotos::new());

    let first = service
        .register("alice".to_string(), "a@x.com".to_string(), "secret1".to_string(), None)
        .await;
    assert!(first.is_ok());

    let second = service
        .register("alice".to_string(), "b@y.com".to_string(), "secret2".to_string(), None)
        .await;
    assert!(matches!(second.unwrap_err(), AppError::Conflict(_)));

    let accounts = service.list().await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].username, "alice");
}

#[tokio::test]
async fn test_get_account() {
    let mut repo = MockRepo::new();
    repo.expect_find_by_id()
        .with(eq(1))
        .returning(|id| Ok(Some(test_account(id, "alice", "a@x.com", "hash"))));

    let service = service(repo, MockPhotos::new());
    let account = service.get(1).await.unwrap();
    assert_eq!(account.id, 1);
}
