use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;

/// Verification tokens stay valid for 24 hours.
const VERIFICATION_TOKEN_HOURS: i64 = 24;

/// A registered user. The password field always holds a bcrypt hash and is
/// never serialized into responses.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single-use, time-boxed proof of email ownership.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct VerificationToken {
    pub id: i32,
    pub user_id: i32,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

/// Raw aggregates fetched in one query; the derived trend fields are
/// computed in [`UserStatistics::from_counts`].
#[derive(Debug, FromRow)]
pub struct StatisticsCounts {
    pub username: String,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub deleted_tasks: i64,
    pub tasks_created_today: i64,
    pub tasks_this_week: i64,
    pub tasks_last_week: i64,
    pub pending_this_week: i64,
    pub pending_last_week: i64,
    pub tasks_last_30_days: i64,
    pub first_created_last_30_days: Option<DateTime<Utc>>,
}

/// Read-only aggregate over a user's tasks, computed on demand.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserStatistics {
    pub user_id: i32,
    pub username: String,
    pub total_tasks: i32,
    pub completed_tasks: i32,
    pub pending_tasks: i32,
    pub in_progress_tasks: i32,
    pub deleted_tasks: i32,
    pub tasks_created_today: i32,
    pub tasks_last_week: i32,
    pub tasks_this_week: i32,
    pub weekly_trend_up: bool,
    pub weekly_trend_value: i32,
    pub pending_tasks_last_week: i32,
    pub pending_trend_up: bool,
    pub pending_trend_value: i32,
    pub average_daily_tasks: f64,
}

/// Week-over-week trend: an empty previous week counts as trending up, with
/// a delta of 0 when the current week is also empty and 100 otherwise.
fn trend(this_week: i64, last_week: i64) -> (bool, i32) {
    if last_week == 0 {
        let value = if this_week == 0 { 0 } else { 100 };
        (true, value)
    } else {
        let value = ((this_week - last_week) as f64 / last_week as f64 * 100.0) as i32;
        (this_week > last_week, value)
    }
}

impl UserStatistics {
    pub fn from_counts(user_id: i32, counts: StatisticsCounts, now: DateTime<Utc>) -> Self {
        let (weekly_trend_up, weekly_trend_value) =
            trend(counts.tasks_this_week, counts.tasks_last_week);
        let (pending_trend_up, pending_trend_value) =
            trend(counts.pending_this_week, counts.pending_last_week);

        // Average creations per day over the trailing 30-day window,
        // measured from the first task inside the window.
        let average_daily_tasks = match counts.first_created_last_30_days {
            Some(first) => {
                let days = (now - first).num_days().max(1) as f64;
                let avg = counts.tasks_last_30_days as f64 / days;
                (avg * 100.0).round() / 100.0
            }
            None => 0.0,
        };

        UserStatistics {
            user_id,
            username: counts.username,
            total_tasks: counts.total_tasks as i32,
            completed_tasks: counts.completed_tasks as i32,
            pending_tasks: counts.pending_tasks as i32,
            in_progress_tasks: counts.in_progress_tasks as i32,
            deleted_tasks: counts.deleted_tasks as i32,
            tasks_created_today: counts.tasks_created_today as i32,
            tasks_last_week: counts.tasks_last_week as i32,
            tasks_this_week: counts.tasks_this_week as i32,
            weekly_trend_up,
            weekly_trend_value,
            pending_tasks_last_week: counts.pending_last_week as i32,
            pending_trend_up,
            pending_trend_value,
            average_daily_tasks,
        }
    }
}

/// Generates a 64-character hex token from 32 bytes of OS randomness.
/// Used for both email verification and password reset tokens.
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Derives a username from the email local-part.
pub fn username_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

const USER_COLUMNS: &str = "id, username, email, password, is_verified, \
                            reset_password_token, reset_token_expires, created_at, updated_at";

impl User {
    /// Creates a user row together with its first verification token in one
    /// transaction, returning the new user and the token string to mail out.
    ///
    /// The password must already be hashed; a value without the bcrypt `$2`
    /// marker is rejected so plaintext can never reach the table.
    pub async fn create(
        pool: &PgPool,
        email: &str,
        username: Option<&str>,
        hashed_password: &str,
    ) -> Result<(User, String), AppError> {
        if !hashed_password.starts_with("$2") {
            return Err(AppError::InternalServerError(
                "Password must be hashed before saving".into(),
            ));
        }

        let username = match username {
            Some(name) => name.to_string(),
            None => username_from_email(email),
        };

        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, username, password, is_verified) \
             VALUES ($1, $2, $3, FALSE) \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(email)
        .bind(&username)
        .bind(hashed_password)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Email already exists".into()),
            other => other,
        })?;

        let token = generate_opaque_token();
        sqlx::query(
            "INSERT INTO verification_tokens (user_id, token, expires_at) \
             VALUES ($1, $2, NOW() + make_interval(hours => $3))",
        )
        .bind(user.id)
        .bind(&token)
        .bind(VERIFICATION_TOKEN_HOURS as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((user, token))
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        user.ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// Consumes a verification token and flips the user's verified flag.
    ///
    /// One transaction: the token row is claimed (`used_at` null to now, only
    /// while unexpired) and the user row updated; an already-used or expired
    /// token claims no row and fails without side effects.
    pub async fn verify_email(pool: &PgPool, token: &str) -> Result<User, AppError> {
        let mut tx = pool.begin().await?;

        let user_id: Option<i32> = sqlx::query_scalar(
            "UPDATE verification_tokens SET used_at = NOW() \
             WHERE token = $1 AND expires_at > NOW() AND used_at IS NULL \
             RETURNING user_id",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let user_id = user_id.ok_or_else(|| {
            AppError::BadRequest("Invalid or expired verification token".into())
        })?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_verified = TRUE, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// Invalidates all outstanding verification tokens for the user and
    /// mints a fresh one, so at most one token is active at a time.
    pub async fn resend_verification_token(
        pool: &PgPool,
        user_id: i32,
    ) -> Result<String, AppError> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE verification_tokens SET used_at = NOW() \
             WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let token = generate_opaque_token();
        sqlx::query(
            "INSERT INTO verification_tokens (user_id, token, expires_at) \
             VALUES ($1, $2, NOW() + make_interval(hours => $3))",
        )
        .bind(user_id)
        .bind(&token)
        .bind(VERIFICATION_TOKEN_HOURS as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(token)
    }

    /// Stores a password-reset token with its expiry on the user row.
    pub async fn set_reset_token(
        pool: &PgPool,
        user_id: i32,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users \
             SET reset_password_token = $1, reset_token_expires = $2, updated_at = NOW() \
             WHERE id = $3",
        )
        .bind(token)
        .bind(expires_at)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Looks up a user by reset token, rejecting expired tokens.
    /// Unknown and expired tokens are indistinguishable to the caller.
    pub async fn find_by_reset_token(pool: &PgPool, token: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE reset_password_token = $1",
            USER_COLUMNS
        ))
        .bind(token)
        .fetch_optional(pool)
        .await?;

        let user =
            user.ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".into()))?;

        match user.reset_token_expires {
            Some(expires) if expires > Utc::now() => Ok(user),
            _ => Err(AppError::BadRequest("Invalid or expired reset token".into())),
        }
    }

    /// Writes the new password hash and clears the reset token atomically,
    /// so a consumed token cannot be replayed.
    pub async fn update_password_and_clear_reset_token(
        pool: &PgPool,
        user_id: i32,
        hashed_password: &str,
    ) -> Result<(), AppError> {
        if !hashed_password.starts_with("$2") {
            return Err(AppError::InternalServerError(
                "Password must be hashed before saving".into(),
            ));
        }

        sqlx::query(
            "UPDATE users \
             SET password = $1, reset_password_token = NULL, reset_token_expires = NULL, \
                 updated_at = NOW() \
             WHERE id = $2",
        )
        .bind(hashed_password)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Applies a profile update. Absent fields keep their current value.
    /// A username collision surfaces as `Conflict`.
    pub async fn update_profile(
        pool: &PgPool,
        user_id: i32,
        username: Option<&str>,
        hashed_password: Option<&str>,
    ) -> Result<(), AppError> {
        if let Some(hash) = hashed_password {
            if !hash.starts_with("$2") {
                return Err(AppError::InternalServerError(
                    "Password must be hashed before saving".into(),
                ));
            }
        }

        let result = sqlx::query(
            "UPDATE users \
             SET username = COALESCE($1, username), \
                 password = COALESCE($2, password), \
                 updated_at = NOW() \
             WHERE id = $3",
        )
        .bind(username)
        .bind(hashed_password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Username already taken".into()),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }

        Ok(())
    }

    /// Fetches the raw task aggregates and derives the statistics object.
    pub async fn statistics(pool: &PgPool, user_id: i32) -> Result<UserStatistics, AppError> {
        let counts = sqlx::query_as::<_, StatisticsCounts>(
            "SELECT u.username, \
                    COUNT(t.id) AS total_tasks, \
                    COUNT(t.id) FILTER (WHERE t.status = 'completed') AS completed_tasks, \
                    COUNT(t.id) FILTER (WHERE t.status = 'pending') AS pending_tasks, \
                    COUNT(t.id) FILTER (WHERE t.status = 'in_progress') AS in_progress_tasks, \
                    COUNT(t.id) FILTER (WHERE t.status = 'deleted') AS deleted_tasks, \
                    COUNT(t.id) FILTER (WHERE t.created_at >= NOW() - INTERVAL '1 day') \
                        AS tasks_created_today, \
                    COUNT(t.id) FILTER (WHERE t.created_at >= NOW() - INTERVAL '7 days') \
                        AS tasks_this_week, \
                    COUNT(t.id) FILTER (WHERE t.created_at >= NOW() - INTERVAL '14 days' \
                        AND t.created_at < NOW() - INTERVAL '7 days') AS tasks_last_week, \
                    COUNT(t.id) FILTER (WHERE t.status = 'pending' \
                        AND t.created_at >= NOW() - INTERVAL '7 days') AS pending_this_week, \
                    COUNT(t.id) FILTER (WHERE t.status = 'pending' \
                        AND t.created_at >= NOW() - INTERVAL '14 days' \
                        AND t.created_at < NOW() - INTERVAL '7 days') AS pending_last_week, \
                    COUNT(t.id) FILTER (WHERE t.created_at >= NOW() - INTERVAL '30 days') \
                        AS tasks_last_30_days, \
                    MIN(t.created_at) FILTER (WHERE t.created_at >= NOW() - INTERVAL '30 days') \
                        AS first_created_last_30_days \
             FROM users u \
             LEFT JOIN tasks t ON t.user_id = u.id \
             WHERE u.id = $1 \
             GROUP BY u.id, u.username",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        let counts = counts.ok_or_else(|| AppError::NotFound("User not found".into()))?;

        Ok(UserStatistics::from_counts(user_id, counts, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn counts(this_week: i64, last_week: i64) -> StatisticsCounts {
        StatisticsCounts {
            username: "alice".into(),
            total_tasks: 10,
            completed_tasks: 4,
            pending_tasks: 3,
            in_progress_tasks: 2,
            deleted_tasks: 1,
            tasks_created_today: 1,
            tasks_this_week: this_week,
            tasks_last_week: last_week,
            pending_this_week: this_week,
            pending_last_week: last_week,
            tasks_last_30_days: 0,
            first_created_last_30_days: None,
        }
    }

    #[test]
    fn test_opaque_token_shape() {
        let token = generate_opaque_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_opaque_token());
    }

    #[test]
    fn test_username_from_email() {
        assert_eq!(username_from_email("alice@example.com"), "alice");
        assert_eq!(username_from_email("a.b+c@example.com"), "a.b+c");
        assert_eq!(username_from_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn test_trend_growth() {
        let stats = UserStatistics::from_counts(1, counts(6, 4), Utc::now());
        assert!(stats.weekly_trend_up);
        assert_eq!(stats.weekly_trend_value, 50);
    }

    #[test]
    fn test_trend_decline() {
        let stats = UserStatistics::from_counts(1, counts(2, 4), Utc::now());
        assert!(!stats.weekly_trend_up);
        assert_eq!(stats.weekly_trend_value, -50);
    }

    #[test]
    fn test_trend_from_empty_last_week() {
        let stats = UserStatistics::from_counts(1, counts(3, 0), Utc::now());
        assert!(stats.weekly_trend_up);
        assert_eq!(stats.weekly_trend_value, 100);

        let stats = UserStatistics::from_counts(1, counts(0, 0), Utc::now());
        assert!(stats.weekly_trend_up);
        assert_eq!(stats.weekly_trend_value, 0);
    }

    #[test]
    fn test_average_daily_tasks() {
        let now = Utc::now();
        let mut c = counts(0, 0);
        c.tasks_last_30_days = 15;
        c.first_created_last_30_days = Some(now - Duration::days(10));

        let stats = UserStatistics::from_counts(1, c, now);
        assert!((stats.average_daily_tasks - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_daily_tasks_without_recent_tasks() {
        let stats = UserStatistics::from_counts(1, counts(0, 0), Utc::now());
        assert_eq!(stats.average_daily_tasks, 0.0);
    }

    #[test]
    fn test_average_daily_tasks_same_day_floor() {
        // All tasks created moments ago: the window floors at one day.
        let now = Utc::now();
        let mut c = counts(0, 0);
        c.tasks_last_30_days = 4;
        c.first_created_last_30_days = Some(now - Duration::hours(2));

        let stats = UserStatistics::from_counts(1, c, now);
        assert!((stats.average_daily_tasks - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_password_is_not_serialized() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "$2b$12$secret".into(),
            is_verified: true,
            reset_password_token: None,
            reset_token_expires: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("reset_password_token").is_none());
        assert_eq!(json["username"], "alice");
    }
}
