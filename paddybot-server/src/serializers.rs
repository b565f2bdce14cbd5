//! Response envelopes
//!
//! Every JSON body the service produces goes through one of these, so the
//! `{success, ...}` shape stays uniform across routes and errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::User;
use crate::lifecycle::ResourceStatus;
use crate::models::PaginationMeta;

/// Generic success envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// Success with a message and no payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            errors: None,
        }
    }
}

/// One page of items plus navigation metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: PaginationMeta) -> Self {
        Self {
            success: true,
            data,
            pagination,
        }
    }
}

/// Readiness report for `GET /health/ready`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentHealth {
    Up,
    Down,
    Uninitialized,
    Closed,
}

impl ComponentHealth {
    /// Combine lifecycle status with the outcome of a live probe.
    pub fn probe(status: ResourceStatus, reachable: bool) -> Self {
        match status {
            ResourceStatus::Uninitialized => Self::Uninitialized,
            ResourceStatus::Closed => Self::Closed,
            ResourceStatus::Ready if reachable => Self::Up,
            ResourceStatus::Ready => Self::Down,
        }
    }
}

impl HealthCheck {
    pub fn new(database: ComponentHealth, cache: ComponentHealth) -> Self {
        let status = if database == ComponentHealth::Up && cache == ComponentHealth::Up {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        Self {
            status,
            database,
            cache,
            timestamp: Utc::now(),
        }
    }
}

/// Error envelope produced by `ApiError`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, error_code: &str) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_code: error_code.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            full_name: u.full_name,
            is_active: u.is_active,
            is_superuser: u.is_superuser,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::calculate_pagination;
    use serde_json::json;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            username: "paddy".into(),
            email: "paddy@example.com".into(),
            hashed_password: "$argon2id$secret".into(),
            full_name: None,
            is_active: true,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn user_response_hides_hash() {
        let body = serde_json::to_value(UserResponse::from(user())).unwrap();
        assert!(body.get("hashed_password").is_none());
        assert_eq!(body["username"], "paddy");
        assert_eq!(body["full_name"], Value::Null);
    }

    #[test]
    fn message_only_response_omits_data() {
        let body = serde_json::to_value(ApiResponse::message("User deleted")).unwrap();
        assert_eq!(body, json!({"success": true, "message": "User deleted"}));
    }

    #[test]
    fn paginated_shape() {
        let page = PaginatedResponse::new(vec![1, 2], calculate_pagination(1, 2, 5));
        let body = serde_json::to_value(page).unwrap();
        assert_eq!(body["data"], json!([1, 2]));
        assert_eq!(body["pagination"]["total_pages"], 3);
        assert_eq!(body["pagination"]["has_next"], true);
    }

    #[test]
    fn health_is_degraded_unless_everything_is_up() {
        let up = HealthCheck::new(ComponentHealth::Up, ComponentHealth::Up);
        assert_eq!(up.status, HealthStatus::Healthy);

        let down = HealthCheck::new(ComponentHealth::Up, ComponentHealth::Down);
        assert_eq!(down.status, HealthStatus::Degraded);

        let body = serde_json::to_value(down).unwrap();
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["cache"], "down");
    }

    #[test]
    fn probe_prefers_lifecycle_state() {
        assert_eq!(
            ComponentHealth::probe(ResourceStatus::Closed, true),
            ComponentHealth::Closed
        );
        assert_eq!(
            ComponentHealth::probe(ResourceStatus::Ready, false),
            ComponentHealth::Down
        );
    }

    #[test]
    fn error_response_shape() {
        let body = serde_json::to_value(
            ErrorResponse::new("user not found", "not_found").with_details(json!({"id": "9"})),
        )
        .unwrap();
        assert_eq!(
            body,
            json!({
                "success": false,
                "message": "user not found",
                "error_code": "not_found",
                "details": {"id": "9"}
            })
        );
    }
}
