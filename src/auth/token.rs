use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Lifetime of access tokens.
const ACCESS_TOKEN_HOURS: i64 = 1;
/// Lifetime of refresh tokens.
const REFRESH_TOKEN_DAYS: i64 = 7;

/// Represents the claims encoded within both token classes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Unique identifier of the authenticated user.
    pub user_id: i32,
    /// Username at the time of issuance.
    pub username: String,
    /// Email at the time of issuance.
    pub email: String,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// Stateless issuance and verification of the two JWT classes.
///
/// Access and refresh tokens are signed with distinct secrets bound to
/// distinct lifetimes: a refresh token can only be exchanged for a new
/// access token through the refresh endpoint, never used for resource
/// access directly. Secrets are injected at startup and read-only after.
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenService {
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
        }
    }

    /// Issues a short-lived access token carrying the user's identity claims.
    ///
    /// Signing failures are internal errors and surface as 500.
    pub fn issue_access_token(
        &self,
        user_id: i32,
        username: &str,
        email: &str,
    ) -> Result<String, AppError> {
        let claims = Self::build_claims(
            user_id,
            username,
            email,
            chrono::Duration::hours(ACCESS_TOKEN_HOURS),
        );
        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Issues a long-lived refresh token, signed with the refresh secret.
    pub fn issue_refresh_token(
        &self,
        user_id: i32,
        username: &str,
        email: &str,
    ) -> Result<String, AppError> {
        let claims = Self::build_claims(
            user_id,
            username,
            email,
            chrono::Duration::days(REFRESH_TOKEN_DAYS),
        );
        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Verifies an access token and decodes its claims.
    ///
    /// Fails with `Unauthorized` on signature mismatch (including tokens
    /// signed with the refresh secret), malformed payload, or past expiry.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.access_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    /// Verifies a refresh token against the refresh secret only.
    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.refresh_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    fn build_claims(
        user_id: i32,
        username: &str,
        email: &str,
        lifetime: chrono::Duration,
    ) -> Claims {
        let expiration = chrono::Utc::now()
            .checked_add_signed(lifetime)
            .expect("valid timestamp")
            .timestamp() as usize;

        Claims {
            user_id,
            username: username.to_string(),
            email: email.to_string(),
            exp: expiration,
        }
    }
}
