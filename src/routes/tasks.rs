use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{parse_update, task::TASK_UPDATE_FIELDS, Task, TaskInput, TaskListQuery, TaskUpdate},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Retrieves the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): `true` for completed tasks, any other non-empty value for open ones.
/// - `limit` (optional): maximum number of tasks to return.
/// - `skip` (optional): number of tasks to skip.
/// - `sortBy` (optional): `<field>_<asc|desc>` where field is `createdAt`, `updatedAt`,
///   `description` or `completed`.
///
/// ## Responses:
/// - `200 OK`: a JSON array of `Task` objects.
/// - `401 Unauthorized`: missing or revoked token.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    query_params: web::Query<TaskListQuery>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = Task::list_for_owner(&**pool, session.user_id, &query_params).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Request Body:
/// - `description`: required, non-blank.
/// - `completed` (optional): defaults to `false`.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `400 Bad Request`: malformed JSON.
/// - `422 Unprocessable Entity`: blank description.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskInput>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task_data = task_data.into_inner().normalized();
    task_data.validate()?;

    let task = Task::create(&**pool, task_data, session.user_id).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves one task. Tasks owned by someone else are reported as not found.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = Task::find_owned(&**pool, task_id.into_inner(), session.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task.
///
/// Only `description` and `completed` may be sent; any other key yields
/// `400 Invalid updates` and the task is left as it was.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `400 Bad Request`: a key outside the allow-list or a wrongly typed value.
/// - `404 Not Found`: the task does not exist or is not owned by the caller.
/// - `422 Unprocessable Entity`: blank description.
#[patch("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    body: web::Json<Map<String, Value>>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let update: TaskUpdate = parse_update(body.into_inner(), TASK_UPDATE_FIELDS)?;
    let update = update.normalized();
    update.validate()?;

    let task = Task::update_owned(&**pool, task_id.into_inner(), session.user_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task and returns it.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = Task::delete_owned(&**pool, task_id.into_inner(), session.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    Ok(HttpResponse::Ok().json(task))
}
