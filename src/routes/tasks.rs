use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{Task, TaskInput},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashMap;
use validator::Validate;

/// Retrieves the authenticated user's tasks.
///
/// Soft-deleted tasks are excluded and the remaining tasks come back
/// ordered by position. An empty list serializes as `[]`, never `null`.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = Task::for_user(&pool, user.user_id()).await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task at the head of the user's list.
///
/// Every existing live task shifts down one position to make room.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::create(&pool, user.user_id(), &task_data).await?;

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a single task by ID.
///
/// Soft-deleted tasks are still visible here to their owner; other
/// users' tasks are indistinguishable from missing ones.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let task = Task::fetch_owned(&pool, path.into_inner(), user.user_id()).await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Updates a task's title, description, and status.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::update_owned(&pool, path.into_inner(), user.user_id(), &task_data).await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Soft-deletes a task and closes the position gap it leaves behind.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    Task::soft_delete(&pool, path.into_inner(), user.user_id()).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Applies a batch of position moves.
///
/// The body maps task IDs to target positions. Moves apply one at a
/// time; a task the user does not own fails the request with 404.
#[put("/positions")]
pub async fn update_positions(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    positions: web::Json<HashMap<i32, i32>>,
) -> Result<impl Responder, AppError> {
    for (&task_id, &position) in positions.iter() {
        Task::reposition(&pool, task_id, user.user_id(), position).await?;
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Positions updated" })))
}
