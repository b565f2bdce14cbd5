//! User endpoints
//!
//! Each handler runs its queries in one broker-managed session. Single-user
//! reads go through the cache; writes evict after the session has committed.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::UserRepo;
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidId};
use crate::http::server::AppState;
use crate::models::{full_name, Email, NewUser, Pagination, PaginationParams, Password, UserChanges, Username};
use crate::serializers::{ApiResponse, PaginatedResponse, UserResponse};

/// How long a single user stays cached
pub const USER_CACHE_TTL: Duration = Duration::from_secs(300);

pub fn user_cache_key(id: i64) -> String {
    format!("user:{id}")
}

/// Create user request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Partial update request; absent fields are left alone
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn hash(password: Password) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || paddybot_core::security::hash_password(password.expose()))
        .await
        .map_err(|e| ApiError::Internal {
            message: format!("hashing task failed: {e}"),
        })?
        .map_err(ApiError::from)
}

/// POST /users - register a user
async fn create_user(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let username = Username::new(&req.username)?;
    let email = Email::new(&req.email)?;
    let password = Password::new(&req.password)?;
    let full_name = full_name(req.full_name.as_deref())?;

    let new_user = NewUser {
        username,
        email,
        hashed_password: hash(password).await?,
        full_name,
    };

    let user = state
        .db
        .scoped(move |session| {
            Box::pin(async move {
                let user = UserRepo::new(session.conn()?).create(&new_user).await?;
                Ok::<_, ApiError>(user)
            })
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(UserResponse::from(user)).with_message("User created successfully")),
    ))
}

/// GET /users - list users with pagination
async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let page = Pagination::from(params);

    let (users, total) = state
        .db
        .scoped(move |session| {
            Box::pin(async move {
                let result = UserRepo::new(session.conn()?).list(page).await?;
                Ok::<_, ApiError>(result)
            })
        })
        .await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        page.meta(total),
    )))
}

/// GET /users/{id} - read through the cache
async fn get_user(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let key = user_cache_key(id);
    if let Some(cached) = state.cache.get_json::<UserResponse>(&key).await {
        tracing::debug!(user_id = id, "User cache hit");
        return Ok(Json(ApiResponse::data(cached)));
    }

    let user = state
        .db
        .scoped(move |session| {
            Box::pin(async move {
                let user = UserRepo::new(session.conn()?).get(id).await?;
                Ok::<_, ApiError>(user)
            })
        })
        .await?;

    let response = UserResponse::from(user);
    state.cache.set(&key, &response, USER_CACHE_TTL).await;
    Ok(Json(ApiResponse::data(response)))
}

/// PATCH /users/{id} - partial update
async fn update_user(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let mut changes = UserChanges {
        email: req.email.as_deref().map(Email::new).transpose()?,
        full_name: full_name(req.full_name.as_deref())?,
        hashed_password: None,
        is_active: req.is_active,
        is_superuser: req.is_superuser,
    };
    if let Some(password) = req.password.as_deref() {
        changes.hashed_password = Some(hash(Password::new(password)?).await?);
    }
    let unchanged = changes.is_empty();

    let user = state
        .db
        .scoped(move |session| {
            Box::pin(async move {
                let user = UserRepo::new(session.conn()?).update(id, &changes).await?;
                Ok::<_, ApiError>(user)
            })
        })
        .await?;

    if unchanged {
        tracing::debug!(user_id = id, "Empty update, nothing written");
    } else {
        state.cache.delete(&user_cache_key(id)).await;
    }
    Ok(Json(
        ApiResponse::data(UserResponse::from(user)).with_message("User updated successfully"),
    ))
}

/// DELETE /users/{id}
async fn delete_user(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .db
        .scoped(move |session| {
            Box::pin(async move {
                UserRepo::new(session.conn()?).delete(id).await?;
                Ok::<_, ApiError>(())
            })
        })
        .await?;

    state.cache.delete(&user_cache_key(id)).await;
    tracing::info!(user_id = id, "User deleted");
    Ok(Json(ApiResponse::message("User deleted successfully")))
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}
