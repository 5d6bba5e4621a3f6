//! services/storyteller/src/state.rs
//!
//! Defines the application's shared state: the port handles every façade call
//! goes through, plus the two process-wide observable slots (session, draft).

use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use storyteller_core::domain::{GeneratedStory, Identity, StoryParameters};
use storyteller_core::error::GenerationFailure;
use storyteller_core::generation;
use storyteller_core::ports::{AuthProvider, StoryModel, StoryStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

//=========================================================================================
// AppState (Shared Across the Whole Process)
//=========================================================================================

/// The remote collaborators, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthProvider>,
    pub stories: Arc<dyn StoryStore>,
    pub model: Arc<dyn StoryModel>,
}

//=========================================================================================
// Observable
//=========================================================================================

/// A single-writer cell that notifies every subscriber on each committed change.
///
/// Whoever owns the `Observable` is its only writer; everyone else gets a
/// receiver from [`Observable::subscribe`].
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Mutates the value in place; subscribers see the result as one change.
    pub fn update(&self, modify: impl FnOnce(&mut T)) {
        self.tx.send_modify(modify);
    }

    /// Like [`Observable::update`], but only notifies when `modify` returns true.
    pub fn update_if(&self, modify: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(modify)
    }
}

//=========================================================================================
// SessionState
//=========================================================================================

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// No notification from the provider yet; nothing should be shown.
    Initializing,
    Unauthenticated,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub loading: bool,
}

impl SessionSnapshot {
    pub fn phase(&self) -> AuthPhase {
        match (self.loading, &self.identity) {
            (true, _) => AuthPhase::Initializing,
            (false, None) => AuthPhase::Unauthenticated,
            (false, Some(_)) => AuthPhase::Authenticated,
        }
    }
}

/// The process-wide session slot. Written only by its [`SessionListener`].
pub struct SessionState {
    inner: Observable<SessionSnapshot>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            inner: Observable::new(SessionSnapshot {
                identity: None,
                loading: true,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.get()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.get().identity
    }

    pub fn phase(&self) -> AuthPhase {
        self.inner.get().phase()
    }

    /// Applies one provider notification. Identity and `loading` change together;
    /// a notification that changes nothing notifies no one. Returns whether it changed.
    fn apply(&self, identity: Option<Identity>) -> bool {
        let next = SessionSnapshot {
            identity,
            loading: false,
        };
        self.inner.update_if(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        })
    }

    /// Starts feeding provider notifications into this state.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(
        self: &Arc<Self>,
        mut changes: BoxStream<'static, Option<Identity>>,
    ) -> SessionListener {
        let cancel = CancellationToken::new();
        let state = Arc::clone(self);
        let stop = cancel.clone();

        let task = tokio::spawn(async move {
            debug!("Listening for identity changes");
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    next = changes.next() => match next {
                        Some(identity) => {
                            let authenticated = identity.is_some();
                            if state.apply(identity) {
                                info!(authenticated, "Session identity changed");
                            }
                        }
                        None => {
                            warn!("Identity change stream ended");
                            break;
                        }
                    },
                }
            }
            // `changes` is dropped here, which is the one and only unsubscribe.
            debug!("Stopped listening for identity changes");
        });

        SessionListener {
            cancel,
            task: Some(task),
        }
    }
}

/// Handle to the task that keeps [`SessionState`] in sync with the provider.
///
/// Dropping it stops the task too; [`SessionListener::shutdown`] also waits for it.
pub struct SessionListener {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionListener {
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Session listener task failed: {:?}", e);
            }
        }
    }
}

impl Drop for SessionListener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

//=========================================================================================
// StoryDraft
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftSnapshot {
    /// The last generated story that has not been cleared yet.
    pub current: Option<GeneratedStory>,
    pub is_generating: bool,
    pub error: Option<String>,
}

/// Holds the most recently generated, not-yet-saved story.
#[derive(Default)]
pub struct StoryDraft {
    inner: Observable<DraftSnapshot>,
}

impl StoryDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> watch::Receiver<DraftSnapshot> {
        self.inner.subscribe()
    }

    pub fn snapshot(&self) -> DraftSnapshot {
        self.inner.get()
    }

    /// Generates a story into the draft. Cancel-safe: dropping the future
    /// mid-call still clears `is_generating`.
    pub async fn generate(
        &self,
        model: &dyn StoryModel,
        params: &StoryParameters,
    ) -> Result<GeneratedStory, GenerationFailure> {
        self.inner.update(|draft| {
            draft.is_generating = true;
            draft.error = None;
        });
        let _generating = GeneratingFlag(&self.inner);

        let result = generation::generate_story(model, params).await;

        self.inner.update(|draft| {
            draft.is_generating = false;
            match &result {
                Ok(story) => draft.current = Some(story.clone()),
                Err(e) => draft.error = Some(e.to_string()),
            }
        });
        result
    }

    pub fn clear(&self) {
        self.inner.update_if(|draft| draft.current.take().is_some());
    }
}

/// Lowers `is_generating` if a generation ends without reaching its final update.
struct GeneratingFlag<'a>(&'a Observable<DraftSnapshot>);

impl Drop for GeneratingFlag<'_> {
    fn drop(&mut self) {
        self.0
            .update_if(|draft| std::mem::replace(&mut draft.is_generating, false));
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
