//! crates/storyteller_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the three remote collaborators.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! façades to be independent of a specific auth backend, document store or model API.

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::domain::{Identity, NewStory, StoryRecord};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for story store and model operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A raw error as reported by the auth provider.
///
/// Providers identify failures with an `auth/<kebab-case>` code. Transport-level
/// failures carry no code at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("auth provider error (code: {code:?}, message: {message:?})")]
pub struct AuthProviderError {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl AuthProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }

    /// An error without a provider code, e.g. the backend could not be reached.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(message.into()),
        }
    }
}

/// A convenience type alias for `Result<T, AuthProviderError>`.
pub type ProviderResult<T> = Result<T, AuthProviderError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn register(&self, email: &str, password: &str) -> ProviderResult<Identity>;

    async fn login(&self, email: &str, password: &str) -> ProviderResult<Identity>;

    async fn logout(&self) -> ProviderResult<()>;

    /// Starts the provider-side password reset flow for `email`.
    async fn reset_password(&self, email: &str) -> ProviderResult<()>;

    /// Every identity change, starting with the current one.
    fn identity_changes(&self) -> BoxStream<'static, Option<Identity>>;
}

#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Inserts a new story and returns the store-assigned id.
    async fn insert_story(&self, story: NewStory) -> PortResult<Uuid>;

    /// All stories owned by `user_id`, newest first.
    async fn stories_by_owner(&self, user_id: Uuid) -> PortResult<Vec<StoryRecord>>;

    async fn get_story(&self, story_id: Uuid) -> PortResult<StoryRecord>;

    /// Overwrites the favorite flag. Fails with `NotFound` if no row matched.
    async fn update_favorite(&self, story_id: Uuid, is_favorite: bool) -> PortResult<()>;

    /// Replaces the full tag list of a story.
    async fn update_tags(&self, story_id: Uuid, tags: Vec<String>) -> PortResult<()>;

    async fn delete_story(&self, story_id: Uuid) -> PortResult<()>;
}

/// A single chat-style completion request for the story model.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait StoryModel: Send + Sync {
    /// Returns the raw text of the first completion.
    async fn complete(&self, request: StoryRequest) -> PortResult<String>;
}
