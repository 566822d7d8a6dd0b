//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! It centralizes error management, providing a consistent way to handle and represent
//! the various error conditions that can occur, from database issues to authentication
//! failures.
//!
//! `AppError` implements `actix_web::error::ResponseError` to seamlessly convert
//! application errors into HTTP responses with a uniform `{"error": "..."}` JSON body.
//! `From` implementations for `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error`, and `bcrypt::BcryptError` allow conversion with `?`.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all error conditions the application reports to clients.
///
/// Each variant carries a message and maps to a fixed HTTP status code.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or invalid request input (HTTP 400).
    BadRequest(String),
    /// Missing, invalid, or expired credentials (HTTP 401).
    Unauthorized(String),
    /// Authenticated but denied by policy, e.g. unverified email (HTTP 403).
    Forbidden(String),
    /// A referenced entity does not exist (HTTP 404).
    NotFound(String),
    /// A uniqueness constraint was violated (HTTP 409).
    Conflict(String),
    /// Unexpected server-side failure: hashing, signing, etc. (HTTP 500).
    InternalServerError(String),
    /// Database failure other than "row not found" (HTTP 500).
    /// The raw driver message is logged but not sent to the client.
    DatabaseError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::Forbidden(msg) => HttpResponse::Forbidden().json(json!({
                "error": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": msg
            })),
            AppError::Conflict(msg) => HttpResponse::Conflict().json(json!({
                "error": msg
            })),
            AppError::InternalServerError(msg) => HttpResponse::InternalServerError().json(json!({
                "error": msg
            })),
            // The raw driver message is not safe to leak to the client.
            AppError::DatabaseError(_) => HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            })),
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` becomes `NotFound`, unique-constraint violations (Postgres
/// code 23505) become `Conflict`, everything else is a `DatabaseError`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match &error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(db_err) => {
                if db_err.code().as_deref() == Some("23505") {
                    AppError::Conflict("Resource already exists".into())
                } else {
                    log::error!("Database error: {}", db_err);
                    AppError::DatabaseError(db_err.to_string())
                }
            }
            _ => {
                log::error!("Database error: {}", error);
                AppError::DatabaseError(error.to_string())
            }
        }
    }
}

/// Validation failures are client errors; the HTTP surface fixes them at 400.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::BadRequest(error.to_string())
    }
}

/// JWT processing failures (signature, expiry, malformed payload).
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

/// Errors during password hashing or verification.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    #[test]
    fn test_error_responses() {
        let error = AppError::BadRequest("Invalid input".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::Unauthorized("Invalid token".into());
        assert_eq!(error.error_response().status(), 401);

        let error = AppError::Forbidden("Email not verified".into());
        assert_eq!(error.error_response().status(), 403);

        let error = AppError::NotFound("Task not found".into());
        assert_eq!(error.error_response().status(), 404);

        let error = AppError::Conflict("Email already exists".into());
        assert_eq!(error.error_response().status(), 409);

        let error = AppError::InternalServerError("Server error".into());
        assert_eq!(error.error_response().status(), 500);
    }

    #[test]
    fn test_database_error_body_is_generic() {
        let error = AppError::DatabaseError("connection refused at 10.0.0.3:5432".into());
        let response = error.error_response();
        assert_eq!(response.status(), 500);

        let bytes = response.into_body().try_into_bytes().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn test_error_body_shape() {
        let error = AppError::Conflict("Email already exists".into());
        let bytes = error.error_response().into_body().try_into_bytes().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Email already exists");
    }
}
