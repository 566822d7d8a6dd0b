pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService};

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Payload for a new user registration request.
///
/// The username is optional; when absent it is derived from the email
/// local-part at creation time.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: Option<String>,
}

/// Payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Payload for exchanging a refresh token for a new access token.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Payload for requesting a fresh verification email.
#[derive(Debug, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email)]
    pub email: String,
}

/// Payload for the forgot-password flow.
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Payload for completing a password reset.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 6))]
    pub new_password: String,
}

/// Payload for profile updates. The current password is always required;
/// username and new password are each optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: Option<String>,
    #[validate(length(min = 6))]
    pub new_password: Option<String>,
    #[validate(length(min = 1))]
    pub current_password: String,
}

/// Response for a successful login: both token classes.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response for a successful refresh: a new access token only.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            username: Some("test_user-123".to_string()),
        };
        assert!(valid.validate().is_ok());

        let no_username = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            username: None,
        };
        assert!(no_username.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "testexample.com".to_string(),
            password: "password123".to_string(),
            username: None,
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "12345".to_string(),
            username: None,
        };
        assert!(short_password.validate().is_err());

        let bad_username = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            username: Some("has spaces!".to_string()),
        };
        assert!(bad_username.validate().is_err());
    }

    #[test]
    fn test_login_request_validation() {
        let valid = LoginRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = LoginRequest {
            email: "testexample.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let empty_password = LoginRequest {
            email: "test@example.com".to_string(),
            password: "".to_string(),
        };
        assert!(empty_password.validate().is_err());
    }

    #[test]
    fn test_reset_password_request_validation() {
        let valid = ResetPasswordRequest {
            token: "a".repeat(64),
            new_password: "secret1".to_string(),
        };
        assert!(valid.validate().is_ok());

        let short = ResetPasswordRequest {
            token: "a".repeat(64),
            new_password: "short".to_string(),
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_update_profile_request_validation() {
        let valid = UpdateProfileRequest {
            username: Some("new_name".to_string()),
            new_password: None,
            current_password: "current123".to_string(),
        };
        assert!(valid.validate().is_ok());

        let missing_current = UpdateProfileRequest {
            username: Some("new_name".to_string()),
            new_password: None,
            current_password: "".to_string(),
        };
        assert!(missing_current.validate().is_err());

        let short_new_password = UpdateProfileRequest {
            username: None,
            new_password: Some("12345".to_string()),
            current_password: "current123".to_string(),
        };
        assert!(short_new_password.validate().is_err());
    }
}
