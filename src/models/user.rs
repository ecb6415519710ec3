use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::validate_password_rules;
use crate::error::AppError;

const USER_COLUMNS: &str = "id, name, email, password_hash, age, created_at, updated_at";

/// Keys a client may send to `PATCH /users/me`.
pub const USER_UPDATE_FIELDS: &[&str] = &["name", "email", "password", "age"];

/// A registered account. Serializes to the public view: the password hash is skipped and
/// the avatar bytes are never loaded into this struct.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of the caller's own profile.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
    #[validate(custom = "validate_password_rules")]
    pub password: Option<String>,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
}

impl UserUpdate {
    /// Applies the same trimming and lowercasing as registration.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|n| n.trim().to_string()),
            email: self.email.map(|e| e.trim().to_lowercase()),
            password: self.password.map(|p| p.trim().to_string()),
            age: self.age,
        }
    }
}

/// Columns for a new row; the password is already hashed.
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub age: i32,
}

impl User {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await?)
    }

    /// Looks the user up by email and checks the password. Both failure cases produce the
    /// same error so callers cannot probe which emails are registered.
    pub async fn find_by_credentials(
        pool: &PgPool,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let user = User::find_by_email(pool, email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

        if crate::auth::verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(AppError::Unauthorized("Invalid credentials".into()))
        }
    }

    pub async fn create(pool: &PgPool, new_user: NewUser<'_>) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, age) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(new_user.name)
            .bind(new_user.email)
            .bind(new_user.password_hash)
            .bind(new_user.age)
            .fetch_one(pool)
            .await?)
    }

    /// Writes the provided fields and leaves the rest untouched.
    /// `password_hash` must already be hashed; the plain `update.password` is ignored.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        update: &UserUpdate,
        password_hash: Option<&str>,
    ) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET \
             name = COALESCE($2, name), \
             email = COALESCE($3, email), \
             password_hash = COALESCE($4, password_hash), \
             age = COALESCE($5, age), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(update.name.as_deref())
            .bind(update.email.as_deref())
            .bind(password_hash)
            .bind(update.age)
            .fetch_one(pool)
            .await?)
    }

    /// Deletes the account. Tokens and tasks go with it via `ON DELETE CASCADE`.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn add_token(pool: &PgPool, user_id: Uuid, token: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO user_tokens (user_id, token) VALUES ($1, $2)")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn has_token(pool: &PgPool, user_id: Uuid, token: &str) -> Result<bool, AppError> {
        let row = sqlx::query_as::<_, (i32,)>(
            "SELECT 1 FROM user_tokens WHERE user_id = $1 AND token = $2",
        )
        .bind(user_id)
        .bind(token)
        .fetch_optional(pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn remove_token(pool: &PgPool, user_id: Uuid, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_tokens(pool: &PgPool, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_avatar(pool: &PgPool, user_id: Uuid, png: &[u8]) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(png)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn clear_avatar(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET avatar = NULL, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// `None` when the user does not exist or has no avatar.
    pub async fn avatar(pool: &PgPool, user_id: Uuid) -> Result<Option<Vec<u8>>, AppError> {
        let row = sqlx::query_as::<_, (Option<Vec<u8>>,)>("SELECT avatar FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.and_then(|(avatar,)| avatar))
    }
}
