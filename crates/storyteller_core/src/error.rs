//! crates/storyteller_core/src/error.rs
//!
//! The caller-facing error taxonomy of the three façades.

/// Stable codes for branching on auth failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorCode {
    EmailInUse,
    InvalidEmail,
    WeakPassword,
    OperationNotAllowed,
    UserDisabled,
    UserNotFound,
    WrongPassword,
    ConfigurationNotFound,
    NetworkRequestFailed,
    /// A provider code this crate does not recognize, kept verbatim.
    Unrecognized(String),
    /// The provider reported no code at all.
    Unknown,
}

impl AuthErrorCode {
    /// Maps a raw provider code onto a stable code.
    pub fn from_provider(code: &str) -> Self {
        match code {
            "auth/email-already-in-use" => Self::EmailInUse,
            "auth/invalid-email" => Self::InvalidEmail,
            "auth/weak-password" => Self::WeakPassword,
            "auth/operation-not-allowed" => Self::OperationNotAllowed,
            "auth/user-disabled" => Self::UserDisabled,
            "auth/user-not-found" => Self::UserNotFound,
            "auth/wrong-password" => Self::WrongPassword,
            "auth/configuration-not-found" => Self::ConfigurationNotFound,
            "auth/network-request-failed" => Self::NetworkRequestFailed,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// The provider code string, for logging and round-tripping.
    pub fn as_str(&self) -> &str {
        match self {
            Self::EmailInUse => "auth/email-already-in-use",
            Self::InvalidEmail => "auth/invalid-email",
            Self::WeakPassword => "auth/weak-password",
            Self::OperationNotAllowed => "auth/operation-not-allowed",
            Self::UserDisabled => "auth/user-disabled",
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::ConfigurationNotFound => "auth/configuration-not-found",
            Self::NetworkRequestFailed => "auth/network-request-failed",
            Self::Unrecognized(code) => code,
            Self::Unknown => "auth/unknown",
        }
    }

    /// The human-readable message for a recognized code.
    pub fn known_message(&self) -> Option<&'static str> {
        let message = match self {
            Self::EmailInUse => "This email is already registered.",
            Self::InvalidEmail => "The email address is not valid.",
            Self::WeakPassword => "The password is too weak.",
            Self::OperationNotAllowed => "Email/password accounts are not enabled.",
            Self::UserDisabled => "This account has been disabled.",
            Self::UserNotFound => "No account exists for this email.",
            Self::WrongPassword => "The password is incorrect.",
            Self::ConfigurationNotFound => {
                "Authentication configuration is missing. Please check the provider settings."
            }
            Self::NetworkRequestFailed => "Network error. Please check your connection.",
            Self::Unrecognized(_) | Self::Unknown => return None,
        };
        Some(message)
    }
}

pub const UNKNOWN_AUTH_MESSAGE: &str = "An unknown error occurred";

/// A normalized auth failure: a stable code plus a message fit for display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
}

/// Which document operation failed. The cause is logged, never surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceOp {
    Save,
    List,
    Update,
    Delete,
    Tag,
}

impl PersistenceOp {
    pub fn message(self) -> &'static str {
        match self {
            Self::Save => "Failed to save story",
            Self::List => "Failed to get user stories",
            Self::Update => "Failed to update story",
            Self::Delete => "Failed to delete story",
            Self::Tag => "Failed to update story tags",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{}", .op.message())]
pub struct PersistenceFailure {
    pub op: PersistenceOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Failed to generate story")]
pub struct GenerationFailure;
