use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;
use sqlx::PgPool;

use actionhub::auth::TokenService;
use actionhub::config::Config;
use actionhub::email::{EmailSender, LogMailer};
use actionhub::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    let tokens = Arc::new(TokenService::new(
        &config.jwt_access_secret,
        &config.jwt_refresh_secret,
    ));
    let mailer: Arc<dyn EmailSender> = Arc::new(LogMailer::new(config.app_base_url.clone()));

    let addr = config.server_addr();
    info!("Starting ActionHub server at http://{}:{}", addr.0, addr.1);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let tokens = tokens.clone();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::from(tokens.clone()))
            .app_data(web::Data::from(mailer.clone()))
            .configure(move |cfg| routes::config(cfg, tokens))
    })
    .bind(addr)?
    .run()
    .await
}
