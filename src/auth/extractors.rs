use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::token::Claims;
use crate::error::AppError;

/// Extracts the authenticated user's claims from request extensions.
///
/// Intended for routes protected by `AuthMiddleware`, which validates the
/// bearer token and inserts the decoded `Claims`. If the claims are absent
/// (middleware not applied or misconfigured routing) the extractor fails
/// with its own 401 rather than panicking on a missing value.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> i32 {
        self.claims.user_id
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>().cloned() {
            Some(claims) => ready(Ok(AuthenticatedUser { claims })),
            None => {
                let err = AppError::Unauthorized(
                    "Missing authentication context. Ensure AuthMiddleware is active.".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}
