//! services/storyteller/src/adapters/auth.rs
//!
//! A PostgreSQL-backed implementation of the `AuthProvider` port.
//!
//! Passwords are hashed with argon2. The signed-in identity lives in a watch
//! channel, which is what `identity_changes` streams to the session state.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use regex::Regex;
use sqlx::{FromRow, PgPool};
use std::sync::LazyLock;
use storyteller_core::domain::Identity;
use storyteller_core::ports::{AuthProvider, AuthProviderError, ProviderResult};
use tokio::sync::watch;
use tracing::{error, info};
use uuid::Uuid;

/// Shortest password the provider accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

const RESET_TOKEN_TTL_MINUTES: i64 = 60;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct PgAuthProvider {
    pool: PgPool,
    allow_signup: bool,
    current: watch::Sender<Option<Identity>>,
}

impl PgAuthProvider {
    pub fn new(pool: PgPool, allow_signup: bool) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            pool,
            allow_signup,
            current,
        }
    }

    fn publish(&self, identity: Option<Identity>) {
        self.current.send_replace(identity);
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
    disabled: bool,
}

//=========================================================================================
// Validation and Hashing Helpers
//=========================================================================================

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Trims and lowercases an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn check_email(email: &str) -> ProviderResult<()> {
    if EMAIL_PATTERN.is_match(email.trim()) {
        Ok(())
    } else {
        Err(AuthProviderError::new(
            "auth/invalid-email",
            "The email address is badly formatted.",
        ))
    }
}

pub fn check_password(password: &str) -> ProviderResult<()> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(AuthProviderError::new(
            "auth/weak-password",
            format!("Password should be at least {} characters.", MIN_PASSWORD_LEN),
        ))
    }
}

pub fn hash_password(password: &str) -> ProviderResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            AuthProviderError::transport("Failed to hash password")
        })
}

pub fn verify_password(password: &str, hashed_password: &str) -> ProviderResult<bool> {
    let parsed_hash = PasswordHash::new(hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        AuthProviderError::transport("Stored password hash is unreadable")
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn transport(e: sqlx::Error) -> AuthProviderError {
    error!("Auth database error: {:?}", e);
    AuthProviderError::transport(e.to_string())
}

/// Turns a watch receiver into a stream that yields the current value first,
/// then every later change. Ends when the sender is dropped.
pub fn identity_stream(
    receiver: watch::Receiver<Option<Identity>>,
) -> BoxStream<'static, Option<Identity>> {
    stream::unfold((receiver, true), |(mut receiver, first)| async move {
        if !first && receiver.changed().await.is_err() {
            return None;
        }
        let current = receiver.borrow_and_update().clone();
        Some((current, (receiver, false)))
    })
    .boxed()
}

//=========================================================================================
// `AuthProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthProvider for PgAuthProvider {
    async fn register(&self, email: &str, password: &str) -> ProviderResult<Identity> {
        // 1. Refuse early if email/password sign-up is switched off
        if !self.allow_signup {
            return Err(AuthProviderError::new(
                "auth/operation-not-allowed",
                "Email/password sign-up is disabled.",
            ));
        }

        // 2. Validate the input
        check_email(email)?;
        check_password(password)?;

        // 3. Hash the password
        let password_hash = hash_password(password)?;

        // 4. Create the user, unless the email is taken
        let email = normalize_email(email);
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO NOTHING RETURNING user_id",
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(transport)?;

        let Some(user_id) = user_id else {
            return Err(AuthProviderError::new(
                "auth/email-already-in-use",
                "The email address is already in use by another account.",
            ));
        };

        // 5. Sign the new user in
        let identity = Identity { id: user_id, email };
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn login(&self, email: &str, password: &str) -> ProviderResult<Identity> {
        check_email(email)?;

        // 1. Get user by email
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password, disabled FROM users WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(transport)?
        .ok_or_else(|| {
            AuthProviderError::new("auth/user-not-found", "There is no user record for this email.")
        })?;

        if record.disabled {
            return Err(AuthProviderError::new(
                "auth/user-disabled",
                "The user account has been disabled.",
            ));
        }

        // 2. Verify password
        if !verify_password(password, &record.hashed_password)? {
            return Err(AuthProviderError::new(
                "auth/wrong-password",
                "The password is invalid.",
            ));
        }

        // 3. Publish the new identity
        let identity = Identity {
            id: record.user_id,
            email: record.email,
        };
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn logout(&self) -> ProviderResult<()> {
        self.publish(None);
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> ProviderResult<()> {
        check_email(email)?;

        let user_id = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(transport)?
            .ok_or_else(|| {
                AuthProviderError::new("auth/user-not-found", "There is no user record for this email.")
            })?;

        // The reset link carries this token; mail delivery picks it up from the table.
        let token = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        sqlx::query("INSERT INTO password_resets (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(transport)?;

        info!(%user_id, %expires_at, "Password reset token issued");
        Ok(())
    }

    fn identity_changes(&self) -> BoxStream<'static, Option<Identity>> {
        identity_stream(self.current.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_syntax_is_checked() {
        assert!(check_email("mira@example.com").is_ok());
        assert!(check_email("  mira@example.com ").is_ok());

        for bad in ["", "mira", "mira@", "@example.com", "mira@example", "mi ra@example.com"] {
            let err = check_email(bad).unwrap_err();
            assert_eq!(err.code.as_deref(), Some("auth/invalid-email"), "{bad:?}");
        }
    }

    #[test]
    fn short_passwords_are_weak() {
        let err = check_password("12345").unwrap_err();
        assert_eq!(err.code.as_deref(), Some("auth/weak-password"));
        assert!(check_password("123456").is_ok());
    }

    #[test]
    fn emails_are_normalized_for_lookup() {
        assert_eq!(normalize_email("  Mira@Example.COM "), "mira@example.com");
    }

    #[test]
    fn password_hash_verifies_only_the_original_password() {
        let hash = hash_password("floating-island").unwrap();
        assert!(verify_password("floating-island", &hash).unwrap());
        assert!(!verify_password("sinking-island", &hash).unwrap());
    }

    #[test]
    fn unreadable_hash_is_a_codeless_error() {
        let err = verify_password("whatever", "not-a-phc-string").unwrap_err();
        assert_eq!(err.code, None);
    }

    #[tokio::test]
    async fn identity_stream_yields_current_value_then_changes() {
        let (tx, rx) = watch::channel(None);
        let mut changes = identity_stream(rx);

        assert_eq!(changes.next().await, Some(None));

        let mira = Identity {
            id: Uuid::new_v4(),
            email: "mira@example.com".to_string(),
        };
        tx.send_replace(Some(mira.clone()));
        assert_eq!(changes.next().await, Some(Some(mira)));

        drop(tx);
        assert_eq!(changes.next().await, None);
    }
}
