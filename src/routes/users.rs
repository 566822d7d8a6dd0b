use crate::{
    auth::{hash_password, verify_password, AuthenticatedUser, UpdateProfileRequest},
    error::AppError,
    models::User,
};
use actix_web::{get, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Returns the authenticated user's task statistics.
///
/// Everything is computed on read from the tasks table; nothing is
/// cached or stored.
#[get("/users/statistics")]
pub async fn get_statistics(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let stats = User::statistics(&pool, user.user_id()).await?;

    Ok(HttpResponse::Ok().json(stats))
}

/// Updates the authenticated user's profile.
///
/// The current password gates every change. Username and password are
/// each optional; a username collision is a 409.
#[put("/profile")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    profile_data: web::Json<UpdateProfileRequest>,
) -> Result<impl Responder, AppError> {
    profile_data.validate()?;

    let current = User::find_by_id(&pool, user.user_id()).await?;

    if !verify_password(&profile_data.current_password, &current.password)? {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }

    let new_hash = match &profile_data.new_password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    User::update_profile(
        &pool,
        current.id,
        profile_data.username.as_deref(),
        new_hash.as_deref(),
    )
    .await?;

    let username = profile_data
        .username
        .clone()
        .unwrap_or(current.username);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Profile updated",
        "username": username
    })))
}
