use std::env;

/// Fallback signing secrets for local development only.
const DEV_ACCESS_SECRET: &str = "dev_access_secret_change_in_production";
const DEV_REFRESH_SECRET: &str = "dev_refresh_secret_change_in_production";

/// Runtime configuration, read once at startup from the environment.
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Secret signing access tokens (1 hour lifetime).
    pub jwt_access_secret: String,
    /// Secret signing refresh tokens (7 day lifetime). Must differ from the
    /// access secret so a leak of one cannot forge the other class.
    pub jwt_refresh_secret: String,
    /// Base URL used when building verification and reset links in emails.
    pub app_base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_access_secret = env::var("JWT_ACCESS_SECRET").unwrap_or_else(|_| {
            log::warn!("JWT_ACCESS_SECRET not set, using insecure development fallback");
            DEV_ACCESS_SECRET.to_string()
        });
        let jwt_refresh_secret = env::var("JWT_REFRESH_SECRET").unwrap_or_else(|_| {
            log::warn!("JWT_REFRESH_SECRET not set, using insecure development fallback");
            DEV_REFRESH_SECRET.to_string()
        });
        if jwt_access_secret == jwt_refresh_secret {
            log::warn!(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET are identical; \
                 a leaked refresh secret can forge access tokens"
            );
        }

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            jwt_access_secret,
            jwt_refresh_secret,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        }
    }

    pub fn server_addr(&self) -> (String, u16) {
        (self.server_host.clone(), self.server_port)
    }
}
