//! crates/storyteller_core/src/auth.rs
//!
//! The auth façade. Each operation wraps exactly one provider call and
//! normalizes whatever the provider reports into an [`AuthError`].

use tracing::{info, warn};

use crate::domain::Identity;
use crate::error::{AuthError, AuthErrorCode, UNKNOWN_AUTH_MESSAGE};
use crate::ports::{AuthProvider, AuthProviderError};

/// Creates an account and signs it in.
pub async fn register(
    provider: &dyn AuthProvider,
    email: &str,
    password: &str,
) -> Result<Identity, AuthError> {
    info!(email, "Attempting to register");
    let identity = provider
        .register(email, password)
        .await
        .map_err(|e| normalize_logged("register", e))?;
    info!(user_id = %identity.id, "Registration successful");
    Ok(identity)
}

pub async fn login(
    provider: &dyn AuthProvider,
    email: &str,
    password: &str,
) -> Result<Identity, AuthError> {
    info!(email, "Attempting to login");
    let identity = provider
        .login(email, password)
        .await
        .map_err(|e| normalize_logged("login", e))?;
    info!(user_id = %identity.id, "Login successful");
    Ok(identity)
}

pub async fn logout(provider: &dyn AuthProvider) -> Result<(), AuthError> {
    provider
        .logout()
        .await
        .map_err(|e| normalize_logged("logout", e))
}

/// Asks the provider to send a password reset email.
pub async fn reset_password(provider: &dyn AuthProvider, email: &str) -> Result<(), AuthError> {
    provider
        .reset_password(email)
        .await
        .map_err(|e| normalize_logged("reset_password", e))?;
    info!(email, "Password reset email requested");
    Ok(())
}

fn normalize_logged(operation: &str, error: AuthProviderError) -> AuthError {
    let normalized = normalize_error(&error);
    warn!(
        operation,
        code = normalized.code.as_str(),
        provider_message = ?error.message,
        "Auth provider rejected the request"
    );
    normalized
}

/// Maps a raw provider error onto the stable taxonomy.
///
/// Known codes get their fixed message. An unrecognized code keeps the provider's
/// message, and an error with neither code nor message gets the generic one.
pub fn normalize_error(error: &AuthProviderError) -> AuthError {
    let provider_message = error
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty());

    let Some(raw_code) = error.code.as_deref() else {
        return AuthError {
            code: AuthErrorCode::Unknown,
            message: UNKNOWN_AUTH_MESSAGE.to_string(),
        };
    };

    let code = AuthErrorCode::from_provider(raw_code);
    let message = code
        .known_message()
        .or(provider_message)
        .unwrap_or(UNKNOWN_AUTH_MESSAGE)
        .to_string();
    AuthError { code, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ProviderResult;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream, StreamExt};
    use uuid::Uuid;

    const KNOWN: &[(&str, AuthErrorCode, &str)] = &[
        ("auth/email-already-in-use", AuthErrorCode::EmailInUse, "This email is already registered."),
        ("auth/invalid-email", AuthErrorCode::InvalidEmail, "The email address is not valid."),
        ("auth/weak-password", AuthErrorCode::WeakPassword, "The password is too weak."),
        (
            "auth/operation-not-allowed",
            AuthErrorCode::OperationNotAllowed,
            "Email/password accounts are not enabled.",
        ),
        ("auth/user-disabled", AuthErrorCode::UserDisabled, "This account has been disabled."),
        ("auth/user-not-found", AuthErrorCode::UserNotFound, "No account exists for this email."),
        ("auth/wrong-password", AuthErrorCode::WrongPassword, "The password is incorrect."),
        (
            "auth/network-request-failed",
            AuthErrorCode::NetworkRequestFailed,
            "Network error. Please check your connection.",
        ),
    ];

    #[test]
    fn every_known_code_maps_to_its_message() {
        for (raw, code, message) in KNOWN {
            let normalized = normalize_error(&AuthProviderError::new(*raw, "raw provider text"));
            assert_eq!(&normalized.code, code, "code for {raw}");
            assert_eq!(normalized.message, *message, "message for {raw}");
            assert_eq!(normalized.code.as_str(), *raw);
        }
    }

    #[test]
    fn unrecognized_code_passes_provider_message_through() {
        let normalized =
            normalize_error(&AuthProviderError::new("auth/too-many-requests", "Slow down"));
        assert_eq!(
            normalized.code,
            AuthErrorCode::Unrecognized("auth/too-many-requests".to_string())
        );
        assert_eq!(normalized.message, "Slow down");
    }

    #[test]
    fn unrecognized_code_without_message_still_has_text() {
        let error = AuthProviderError {
            code: Some("auth/quota-exceeded".to_string()),
            message: Some("  ".to_string()),
        };
        let normalized = normalize_error(&error);
        assert!(!normalized.message.is_empty());
        assert_eq!(normalized.message, UNKNOWN_AUTH_MESSAGE);
    }

    #[test]
    fn codeless_error_is_unknown() {
        let normalized = normalize_error(&AuthProviderError::transport("socket closed"));
        assert_eq!(normalized.code, AuthErrorCode::Unknown);
        assert_eq!(normalized.message, UNKNOWN_AUTH_MESSAGE);
    }

    struct RejectingProvider {
        error: AuthProviderError,
    }

    #[async_trait]
    impl AuthProvider for RejectingProvider {
        async fn register(&self, _email: &str, _password: &str) -> ProviderResult<Identity> {
            Err(self.error.clone())
        }

        async fn login(&self, email: &str, _password: &str) -> ProviderResult<Identity> {
            if email == "ok@example.com" {
                return Ok(Identity {
                    id: Uuid::nil(),
                    email: email.to_string(),
                });
            }
            Err(self.error.clone())
        }

        async fn logout(&self) -> ProviderResult<()> {
            Err(self.error.clone())
        }

        async fn reset_password(&self, _email: &str) -> ProviderResult<()> {
            Err(self.error.clone())
        }

        fn identity_changes(&self) -> BoxStream<'static, Option<Identity>> {
            stream::empty().boxed()
        }
    }

    #[tokio::test]
    async fn facade_operations_normalize_provider_errors() {
        let provider = RejectingProvider {
            error: AuthProviderError::new("auth/user-not-found", "There is no user record."),
        };

        let err = login(&provider, "who@example.com", "secret1").await.unwrap_err();
        assert_eq!(err.code, AuthErrorCode::UserNotFound);

        let err = reset_password(&provider, "who@example.com").await.unwrap_err();
        assert_eq!(err.message, "No account exists for this email.");

        let identity = login(&provider, "ok@example.com", "secret1").await.unwrap();
        assert_eq!(identity.email, "ok@example.com");
    }

    #[tokio::test]
    async fn logout_transport_failure_is_unknown() {
        let provider = RejectingProvider {
            error: AuthProviderError::transport("connection reset"),
        };
        let err = logout(&provider).await.unwrap_err();
        assert_eq!(err.code, AuthErrorCode::Unknown);

        let err = register(&provider, "a@b.co", "secret1").await.unwrap_err();
        assert_eq!(err.message, UNKNOWN_AUTH_MESSAGE);
    }
}
