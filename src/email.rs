//! Outbound email delivery.
//!
//! Delivery is a side effect of auth flows, never a precondition: callers
//! fire these notifications and log failures without surfacing them to the
//! client. The default [`LogMailer`] transport writes the messages to the
//! application log, which is also what local development runs with.

use log::info;

use crate::error::AppError;

/// Transport seam for outbound mail. Handlers depend on this trait so tests
/// can capture messages instead of sending them.
pub trait EmailSender: Send + Sync {
    fn send_verification_email(
        &self,
        to: &str,
        username: &str,
        token: &str,
    ) -> Result<(), AppError>;

    fn send_password_reset_email(
        &self,
        to: &str,
        username: &str,
        token: &str,
    ) -> Result<(), AppError>;

    fn send_welcome_email(&self, to: &str, username: &str) -> Result<(), AppError>;
}

/// Log-only transport: renders each message into the application log.
pub struct LogMailer {
    base_url: String,
}

impl LogMailer {
    pub fn new(base_url: impl Into<String>) -> Self {
        LogMailer {
            base_url: base_url.into(),
        }
    }
}

impl EmailSender for LogMailer {
    fn send_verification_email(
        &self,
        to: &str,
        username: &str,
        token: &str,
    ) -> Result<(), AppError> {
        info!(
            "email to {to}: Hi {username}, verify your ActionHub account at \
             {}/verify-email?token={token}",
            self.base_url
        );
        Ok(())
    }

    fn send_password_reset_email(
        &self,
        to: &str,
        username: &str,
        token: &str,
    ) -> Result<(), AppError> {
        info!(
            "email to {to}: Hi {username}, reset your ActionHub password at \
             {}/reset-password?token={token} (link expires in 15 minutes)",
            self.base_url
        );
        Ok(())
    }

    fn send_welcome_email(&self, to: &str, username: &str) -> Result<(), AppError> {
        info!("email to {to}: Welcome to ActionHub, {username}!");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::mock::RecordingMailer;
    use super::*;

    #[test]
    fn test_log_mailer_never_fails() {
        let mailer = LogMailer::new("http://localhost:8080");
        assert!(mailer
            .send_verification_email("a@example.com", "a", "tok")
            .is_ok());
        assert!(mailer
            .send_password_reset_email("a@example.com", "a", "tok")
            .is_ok());
        assert!(mailer.send_welcome_email("a@example.com", "a").is_ok());
    }

    #[test]
    fn test_recording_mailer_captures_messages() {
        let mailer = RecordingMailer::default();
        mailer
            .send_verification_email("a@example.com", "a", "tok")
            .unwrap();
        mailer.send_welcome_email("b@example.com", "b").unwrap();

        let messages = mailer.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ("a@example.com".into(), "verification".into()));
        assert_eq!(messages[1], ("b@example.com".into(), "welcome".into()));
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records every message for assertions instead of delivering it.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMailer {
        pub fn messages(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn record(&self, to: &str, kind: &str) {
            self.sent.lock().unwrap().push((to.into(), kind.into()));
        }
    }

    impl EmailSender for RecordingMailer {
        fn send_verification_email(
            &self,
            to: &str,
            _username: &str,
            _token: &str,
        ) -> Result<(), AppError> {
            self.record(to, "verification");
            Ok(())
        }

        fn send_password_reset_email(
            &self,
            to: &str,
            _username: &str,
            _token: &str,
        ) -> Result<(), AppError> {
            self.record(to, "password_reset");
            Ok(())
        }

        fn send_welcome_email(&self, to: &str, _username: &str) -> Result<(), AppError> {
            self.record(to, "welcome");
            Ok(())
        }
    }
}
