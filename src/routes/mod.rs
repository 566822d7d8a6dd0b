pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use std::sync::Arc;

use actix_web::web;

use crate::auth::{AuthMiddleware, TokenService};
use crate::error::AppError;

/// Mounts the whole HTTP surface: public auth endpoints at the root and a
/// bearer-protected scope for everything user-owned.
///
/// `update_positions` must register before the `/{id}` handlers so that
/// `PUT /tasks/positions` is not captured as a task ID. A path segment that
/// fails to parse as an ID is a 400, not actix's default 404.
pub fn config(cfg: &mut web::ServiceConfig, tokens: Arc<TokenService>) {
    cfg.app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid path parameter: {}", err)).into()
    }))
    .service(health::health)
        .service(auth::register)
        .service(auth::login)
        .service(auth::refresh)
        .service(auth::verify_email)
        .service(auth::resend_verification)
        .service(auth::forgot_password)
        .service(auth::reset_password)
        .service(
            web::scope("")
                .wrap(AuthMiddleware::new(tokens))
                .service(
                    web::scope("/tasks")
                        .service(tasks::update_positions)
                        .service(tasks::get_tasks)
                        .service(tasks::create_task)
                        .service(tasks::get_task)
                        .service(tasks::update_task)
                        .service(tasks::delete_task),
                )
                .service(users::get_statistics)
                .service(users::update_profile),
        );
}
