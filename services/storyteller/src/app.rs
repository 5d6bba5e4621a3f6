//! services/storyteller/src/app.rs
//!
//! The `Storyteller` handle: the one object presentation code talks to.
//!
//! It binds the stateless façades to the process-wide session and draft state,
//! so that story operations run as whoever is currently signed in.

use async_openai::{config::OpenAIConfig, Client};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storyteller_core::domain::{GeneratedStory, Identity, StoredStory, StoryParameters};
use storyteller_core::{auth, stories};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::adapters::{DbAdapter, OpenAiStoryAdapter, PgAuthProvider};
use crate::config::Config;
use crate::error::AppError;
use crate::state::{AppState, DraftSnapshot, SessionListener, SessionSnapshot, SessionState, StoryDraft};

pub struct Storyteller {
    state: AppState,
    session: Arc<SessionState>,
    draft: StoryDraft,
    listener: Option<SessionListener>,
}

impl Storyteller {
    /// Wires up the state and subscribes to the provider's identity changes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(state: AppState) -> Self {
        let session = Arc::new(SessionState::new());
        let listener = session.attach(state.auth.identity_changes());
        Self {
            state,
            session,
            draft: StoryDraft::new(),
            listener: Some(listener),
        }
    }

    /// Builds the production adapters from `config` and starts the session.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        // --- 1. Connect to Database & Run Migrations ---
        info!("Connecting to database...");
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await?;
        let db_adapter = DbAdapter::new(db_pool.clone());
        info!("Running database migrations...");
        db_adapter.run_migrations().await?;
        info!("Database migrations complete.");

        // --- 2. Initialize Service Adapters ---
        let openai_config = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());
        let openai_client = Client::with_config(openai_config);
        let story_adapter = OpenAiStoryAdapter::new(openai_client, config.story_model.clone());
        let auth_provider = PgAuthProvider::new(db_pool, config.allow_signup);

        // --- 3. Build the Shared AppState ---
        let state = AppState {
            auth: Arc::new(auth_provider),
            stories: Arc::new(db_adapter),
            model: Arc::new(story_adapter),
        };
        info!(model = %config.story_model, "Storyteller ready");
        Ok(Self::new(state))
    }

    //=====================================================================================
    // Session
    //=====================================================================================

    pub fn session(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    fn require_identity(&self, action: &'static str) -> Result<Identity, AppError> {
        self.session
            .identity()
            .ok_or(AppError::NotSignedIn(action))
    }

    /// Session state changes once the provider's notification arrives, not here.
    pub async fn register(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        Ok(auth::register(self.state.auth.as_ref(), email, password).await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        Ok(auth::login(self.state.auth.as_ref(), email, password).await?)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        Ok(auth::logout(self.state.auth.as_ref()).await?)
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AppError> {
        Ok(auth::reset_password(self.state.auth.as_ref(), email).await?)
    }

    //=====================================================================================
    // Story Draft
    //=====================================================================================

    pub fn draft(&self) -> watch::Receiver<DraftSnapshot> {
        self.draft.subscribe()
    }

    pub async fn generate_story(&self, params: &StoryParameters) -> Result<GeneratedStory, AppError> {
        Ok(self.draft.generate(self.state.model.as_ref(), params).await?)
    }

    pub fn clear_draft(&self) {
        self.draft.clear();
    }

    //=====================================================================================
    // Stored Stories
    //=====================================================================================

    pub async fn save_story(&self, story: &GeneratedStory) -> Result<Uuid, AppError> {
        let owner = self.require_identity("save stories")?;
        Ok(stories::save_story(self.state.stories.as_ref(), story, &owner).await?)
    }

    pub async fn my_stories(&self) -> Result<Vec<StoredStory>, AppError> {
        let owner = self.require_identity("get stories")?;
        Ok(stories::get_user_stories(self.state.stories.as_ref(), &owner).await?)
    }

    // The three id-only operations trust the store to enforce ownership.

    pub async fn toggle_favorite(&self, story_id: Uuid, is_favorite: bool) -> Result<(), AppError> {
        Ok(stories::toggle_favorite(self.state.stories.as_ref(), story_id, is_favorite).await?)
    }

    pub async fn delete_story(&self, story_id: Uuid) -> Result<(), AppError> {
        Ok(stories::delete_story(self.state.stories.as_ref(), story_id).await?)
    }

    pub async fn add_tag(&self, story_id: Uuid, tag: &str) -> Result<(), AppError> {
        Ok(stories::add_tag(self.state.stories.as_ref(), story_id, tag).await?)
    }

    /// Stops listening for identity changes. Calling it twice is harmless.
    pub async fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.shutdown().await;
            info!("Storyteller shut down");
        }
    }
}
