//! Account handlers.
//!
//! The forms are multipart because they may carry a photo file next to
//! the text fields, mirroring the admin form this transport replaces.
//! All validation happens in the service; handlers only collect fields.

use axum::{
    extract::{Multipart, Path, State},
    response::Json,
    routing::get,
    Router,
};

use crate::api::AppState;
use crate::domain::{AccountResponse, PhotoUpload};
use crate::errors::{AppError, AppResult};
use crate::services::EditAccount;
use crate::types::{ApiResponse, Created, NoContent};

/// Collected multipart form fields.
#[derive(Debug, Default)]
struct AccountForm {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    photo: Option<PhotoUpload>,
}

impl AccountForm {
    /// Drain a multipart stream into named fields. Unknown parts are
    /// ignored; an empty photo part counts as "no photo supplied".
    async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(format!("malformed form data: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "username" => form.username = Some(read_text(field).await?),
                "email" => form.email = Some(read_text(field).await?),
                "password" => form.password = Some(read_text(field).await?),
                "photo" => {
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(format!("invalid photo upload: {}", e)))?;
                    if let Some(file_name) = file_name {
                        if !file_name.is_empty() && !bytes.is_empty() {
                            form.photo = Some(PhotoUpload::new(file_name, bytes.to_vec()));
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("invalid form field: {}", e)))
}

/// Create account routes
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route(
            "/:id",
            get(get_account).put(update_account).delete(delete_account),
        )
}

/// List all accounts
pub async fn list_accounts(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<AccountResponse>>>> {
    let accounts = state.account_service.list().await?;
    let accounts: Vec<AccountResponse> = accounts.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(accounts)))
}

/// Get a single account
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let account = state.account_service.get(id).await?;
    Ok(Json(ApiResponse::success(AccountResponse::from(account))))
}

/// Register a new account
pub async fn create_account(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Created<AccountResponse>> {
    let form = AccountForm::from_multipart(multipart).await?;

    let account = state
        .account_service
        .register(
            form.username.unwrap_or_default(),
            form.email.unwrap_or_default(),
            form.password.unwrap_or_default(),
            form.photo,
        )
        .await?;

    Ok(Created(AccountResponse::from(account)))
}

/// Update an account
pub async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let form = AccountForm::from_multipart(multipart).await?;

    let account = state
        .account_service
        .edit(
            id,
            EditAccount {
                username: form.username,
                email: form.email,
                password: form.password,
                photo: form.photo,
            },
        )
        .await?;

    Ok(Json(ApiResponse::with_message(
        AccountResponse::from(account),
        "account updated",
    )))
}

/// Delete an account
pub async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<NoContent> {
    state.account_service.delete(id).await?;
    Ok(NoContent)
}
