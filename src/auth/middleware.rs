use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::sync::Arc;

use crate::auth::token::TokenService;
use crate::error::AppError;

/// Bearer-token gate for protected routes.
///
/// Reads the `Authorization: Bearer <token>` header, verifies the access
/// token, and on success inserts the decoded [`Claims`](crate::auth::Claims)
/// into the request extensions for downstream extractors. Requests without a
/// valid token are rejected with 401 before reaching the inner service.
pub struct AuthMiddleware {
    tokens: Arc<TokenService>,
}

impl AuthMiddleware {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    tokens: Arc<TokenService>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match bearer {
            Some(token) => match self.tokens.verify_access_token(token) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    let fut = self.service.call(req);
                    Box::pin(fut)
                }
                Err(app_err) => Box::pin(async move { Err(app_err.into()) }),
            },
            None => {
                let app_err = AppError::Unauthorized("Authorization header required".into());
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::extractors::AuthenticatedUser;
    use actix_web::{http::header, test, web, App, HttpResponse};

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({ "user_id": user.claims.user_id }))
    }

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new("mw_access_secret", "mw_refresh_secret"))
    }

    #[actix_rt::test]
    async fn test_missing_header_is_rejected() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(tokens()))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get().uri("/whoami").to_request();
        let resp = test::try_call_service(&app, req).await;
        let err = resp.expect_err("request without a token must fail");
        assert_eq!(err.error_response().status(), 401);
    }

    #[actix_rt::test]
    async fn test_valid_token_injects_claims() {
        let tokens = tokens();
        let token = tokens
            .issue_access_token(42, "alice", "alice@example.com")
            .unwrap();

        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(tokens))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/whoami")
            .append_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["user_id"], 42);
    }

    #[actix_rt::test]
    async fn test_refresh_token_is_not_accepted() {
        let tokens = tokens();
        let refresh = tokens
            .issue_refresh_token(42, "alice", "alice@example.com")
            .unwrap();

        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(tokens))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/whoami")
            .append_header((header::AUTHORIZATION, format!("Bearer {}", refresh)))
            .to_request();
        let resp = test::try_call_service(&app, req).await;
        let err = resp.expect_err("refresh token must not pass the access gate");
        assert_eq!(err.error_response().status(), 401);
    }

    #[actix_rt::test]
    async fn test_malformed_header_is_rejected() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(tokens()))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        // No "Bearer " prefix.
        let req = test::TestRequest::get()
            .uri("/whoami")
            .append_header((header::AUTHORIZATION, "Token abc"))
            .to_request();
        let resp = test::try_call_service(&app, req).await;
        let err = resp.expect_err("non-bearer scheme must fail");
        assert_eq!(err.error_response().status(), 401);
    }
}
