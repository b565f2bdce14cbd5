//! User repository
//!
//! - create: plain INSERT, unique violations come back as `DbError::Conflict`
//! - list: COUNT + page query inside the same transaction
//! - update: COALESCE so absent fields keep their value

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

use crate::db::DbError;
use crate::models::{NewUser, Pagination, UserChanges};

/// User record from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User repository over a session's connection
pub struct UserRepo<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> UserRepo<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert a user. A taken username or email yields `DbError::Conflict`.
    pub async fn create(&mut self, user: &NewUser) -> Result<User, DbError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, hashed_password, full_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, hashed_password, full_name,
                      is_active, is_superuser, created_at, updated_at
            "#,
        )
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(&user.hashed_password)
        .bind(&user.full_name)
        .fetch_one(&mut *self.conn)
        .await?;

        tracing::debug!(user_id = created.id, "User created");
        Ok(created)
    }

    /// Get a single user by id.
    pub async fn get(&mut self, id: i64) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, hashed_password, full_name,
                   is_active, is_superuser, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| not_found(id))
    }

    /// One page of users ordered by id, plus the total count.
    pub async fn list(&mut self, page: Pagination) -> Result<(Vec<User>, i64), DbError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.conn)
            .await?;

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, hashed_password, full_name,
                   is_active, is_superuser, created_at, updated_at
            FROM users
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *self.conn)
        .await?;

        Ok((users, total))
    }

    /// Apply a partial update and bump `updated_at`. An empty change set
    /// writes nothing and returns the stored row.
    pub async fn update(&mut self, id: i64, changes: &UserChanges) -> Result<User, DbError> {
        if changes.is_empty() {
            return self.get(id).await;
        }
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email           = COALESCE($2, email),
                full_name       = COALESCE($3, full_name),
                hashed_password = COALESCE($4, hashed_password),
                is_active       = COALESCE($5, is_active),
                is_superuser    = COALESCE($6, is_superuser),
                updated_at      = now()
            WHERE id = $1
            RETURNING id, username, email, hashed_password, full_name,
                      is_active, is_superuser, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.email.as_ref().map(|e| e.as_str()))
        .bind(&changes.full_name)
        .bind(&changes.hashed_password)
        .bind(changes.is_active)
        .bind(changes.is_superuser)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| not_found(id))
    }

    /// Hard delete.
    pub async fn delete(&mut self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

fn not_found(id: i64) -> DbError {
    DbError::NotFound {
        resource: "user",
        id: id.to_string(),
    }
}
