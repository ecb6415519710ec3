use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

const TASK_COLUMNS: &str = "id, description, completed, owner_id, created_at, updated_at";

/// Keys a client may send to `PATCH /tasks/{id}`.
pub const TASK_UPDATE_FIELDS: &[&str] = &["description", "completed"];

/// Input structure for creating a task. Unknown keys, including any attempt to set the
/// owner, are ignored.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Trimmed before validation; must not be empty.
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    /// Defaults to `false`.
    #[serde(default)]
    pub completed: bool,
}

impl TaskInput {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.trim().to_string(),
            completed: self.completed,
        }
    }
}

/// Partial update of a task. Only the fields in `TASK_UPDATE_FIELDS` reach this struct.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.map(|d| d.trim().to_string()),
            completed: self.completed,
        }
    }
}

/// Represents a task as stored and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    /// The user who created and owns the task.
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query string accepted by `GET /tasks`.
///
/// - `completed`: when non-empty, `true` selects completed tasks and any other value
///   selects open ones.
/// - `limit` / `skip`: pagination; non-positive or non-numeric values are ignored.
/// - `sortBy`: `<field>_<asc|desc>`, e.g. `createdAt_desc`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskListQuery {
    pub completed: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub skip: Option<i64>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

impl TaskListQuery {
    pub fn completed_filter(&self) -> Option<bool> {
        self.completed
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(|value| value == "true")
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit.filter(|n| *n > 0)
    }

    pub fn skip(&self) -> Option<i64> {
        self.skip.filter(|n| *n > 0)
    }

    /// Resolves `sortBy` into a column and direction. Column names come from a fixed set,
    /// so the result is safe to splice into SQL.
    pub fn sort_order(&self) -> (&'static str, &'static str) {
        let Some(sort_by) = self.sort_by.as_deref() else {
            return ("created_at", "ASC");
        };
        let (field, order) = sort_by.rsplit_once('_').unwrap_or((sort_by, ""));
        let column = match field {
            "createdAt" | "created_at" => "created_at",
            "updatedAt" | "updated_at" => "updated_at",
            "description" => "description",
            "completed" => "completed",
            _ => "created_at",
        };
        let direction = if order == "desc" { "DESC" } else { "ASC" };
        (column, direction)
    }

    /// Builds the listing statement. `$1` is always the owner; filter and pagination
    /// parameters follow in the order `completed`, `limit`, `skip` when present.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM tasks WHERE owner_id = $1", TASK_COLUMNS);
        let mut param_count = 2;

        if self.completed_filter().is_some() {
            sql.push_str(&format!(" AND completed = ${}", param_count));
            param_count += 1;
        }

        let (column, direction) = self.sort_order();
        sql.push_str(&format!(" ORDER BY {} {}, id ASC", column, direction));

        if self.limit().is_some() {
            sql.push_str(&format!(" LIMIT ${}", param_count));
            param_count += 1;
        }
        if self.skip().is_some() {
            sql.push_str(&format!(" OFFSET ${}", param_count));
        }
        sql
    }
}

impl Task {
    pub async fn create(pool: &PgPool, input: TaskInput, owner_id: Uuid) -> Result<Task, AppError> {
        let sql = format!(
            "INSERT INTO tasks (id, description, completed, owner_id) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.description)
            .bind(input.completed)
            .bind(owner_id)
            .fetch_one(pool)
            .await?)
    }

    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        query: &TaskListQuery,
    ) -> Result<Vec<Task>, AppError> {
        let sql = query.to_sql();
        let mut query_builder = sqlx::query_as::<_, Task>(&sql).bind(owner_id);

        if let Some(completed) = query.completed_filter() {
            query_builder = query_builder.bind(completed);
        }
        if let Some(limit) = query.limit() {
            query_builder = query_builder.bind(limit);
        }
        if let Some(skip) = query.skip() {
            query_builder = query_builder.bind(skip);
        }

        Ok(query_builder.fetch_all(pool).await?)
    }

    /// `None` when the task does not exist or belongs to someone else.
    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND owner_id = $2",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        update: &TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "UPDATE tasks SET \
             description = COALESCE($3, description), \
             completed = COALESCE($4, completed), \
             updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2 RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(update.description.as_deref())
            .bind(update.completed)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn delete_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "DELETE FROM tasks WHERE id = $1 AND owner_id = $2 RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?)
    }
}
