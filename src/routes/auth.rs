use crate::{
    auth::{
        hash_password, verify_password, AccessTokenResponse, ForgotPasswordRequest, LoginRequest,
        RefreshRequest, RegisterRequest, ResendVerificationRequest, ResetPasswordRequest,
        TokenPairResponse, TokenService,
    },
    email::EmailSender,
    error::AppError,
    models::user::{generate_opaque_token, User},
};
use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::{Duration, Utc};
use log::warn;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Password reset tokens stay valid for 15 minutes.
const RESET_TOKEN_MINUTES: i64 = 15;

/// Register a new user
///
/// Creates the account unverified and sends a verification email. The
/// email is fire-and-forget: a delivery failure is logged but the
/// registration still succeeds.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    mailer: web::Data<dyn EmailSender>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let password_hash = hash_password(&register_data.password)?;
    let (user, token) = User::create(
        &pool,
        &register_data.email,
        register_data.username.as_deref(),
        &password_hash,
    )
    .await?;

    if let Err(e) = mailer.send_verification_email(&user.email, &user.username, &token) {
        warn!("failed to send verification email to {}: {}", user.email, e);
    }

    Ok(HttpResponse::Created().json(json!({
        "message": "Registration successful. Please check your email to verify your account."
    })))
}

/// Login user
///
/// Unknown email and wrong password produce the same 401 so the response
/// does not reveal which accounts exist. A correct password on an
/// unverified account is a 403.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = User::find_by_email(&pool, &login_data.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    if !verify_password(&login_data.password, &user.password)? {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    if !user.is_verified {
        return Err(AppError::Forbidden(
            "Please verify your email before logging in".into(),
        ));
    }

    let access_token = tokens.issue_access_token(user.id, &user.username, &user.email)?;
    let refresh_token = tokens.issue_refresh_token(user.id, &user.username, &user.email)?;

    Ok(HttpResponse::Ok().json(TokenPairResponse {
        access_token,
        refresh_token,
    }))
}

/// Exchange a refresh token for a new access token
///
/// The user row is re-read so a renamed user gets current claims, and a
/// deleted account cannot keep minting access tokens.
#[post("/refresh")]
pub async fn refresh(
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    refresh_data: web::Json<RefreshRequest>,
) -> Result<impl Responder, AppError> {
    refresh_data.validate()?;

    let claims = tokens.verify_refresh_token(&refresh_data.refresh_token)?;
    let user = User::find_by_id(&pool, claims.user_id).await?;

    let access_token = tokens.issue_access_token(user.id, &user.username, &user.email)?;

    Ok(HttpResponse::Ok().json(AccessTokenResponse { access_token }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

/// Verify an email address
///
/// Consumes the verification token and marks the account verified.
#[get("/verify-email")]
pub async fn verify_email(
    pool: web::Data<PgPool>,
    mailer: web::Data<dyn EmailSender>,
    query: web::Query<VerifyEmailQuery>,
) -> Result<impl Responder, AppError> {
    let verified = User::verify_email(&pool, &query.token).await?;

    if let Err(e) = mailer.send_welcome_email(&verified.email, &verified.username) {
        warn!("failed to send welcome email to {}: {}", verified.email, e);
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Email verified successfully. You can now log in."
    })))
}

/// Resend the verification email
///
/// Invalidates any outstanding tokens for the account before minting a
/// fresh one.
#[post("/resend-verification")]
pub async fn resend_verification(
    pool: web::Data<PgPool>,
    mailer: web::Data<dyn EmailSender>,
    resend_data: web::Json<ResendVerificationRequest>,
) -> Result<impl Responder, AppError> {
    resend_data.validate()?;

    let user = User::find_by_email(&pool, &resend_data.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if user.is_verified {
        return Err(AppError::BadRequest("Email is already verified".into()));
    }

    let token = User::resend_verification_token(&pool, user.id).await?;

    if let Err(e) = mailer.send_verification_email(&user.email, &user.username, &token) {
        warn!("failed to send verification email to {}: {}", user.email, e);
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Verification email sent"
    })))
}

/// Start a password reset
///
/// Always answers 200 with the same body whether or not the account
/// exists, so the endpoint cannot be used to enumerate emails.
#[post("/forgot-password")]
pub async fn forgot_password(
    pool: web::Data<PgPool>,
    mailer: web::Data<dyn EmailSender>,
    forgot_data: web::Json<ForgotPasswordRequest>,
) -> Result<impl Responder, AppError> {
    forgot_data.validate()?;

    if let Some(user) = User::find_by_email(&pool, &forgot_data.email).await? {
        let token = generate_opaque_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES);
        User::set_reset_token(&pool, user.id, &token, expires_at).await?;

        if let Err(e) = mailer.send_password_reset_email(&user.email, &user.username, &token) {
            warn!("failed to send reset email to {}: {}", user.email, e);
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "If an account exists for that email, a reset link has been sent"
    })))
}

/// Complete a password reset
///
/// The token is cleared in the same statement that writes the new hash,
/// so it cannot be replayed.
#[post("/reset-password")]
pub async fn reset_password(
    pool: web::Data<PgPool>,
    reset_data: web::Json<ResetPasswordRequest>,
) -> Result<impl Responder, AppError> {
    reset_data.validate()?;

    let user = User::find_by_reset_token(&pool, &reset_data.token).await?;
    let password_hash = hash_password(&reset_data.new_password)?;
    User::update_password_and_clear_reset_token(&pool, user.id, &password_hash).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Password has been reset. You can now log in."
    })))
}
