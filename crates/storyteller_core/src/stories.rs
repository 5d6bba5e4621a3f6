//! crates/storyteller_core/src/stories.rs
//!
//! The document façade: CRUD over story records, scoped to the caller.
//!
//! Every store error is logged here with its cause and re-raised as an opaque
//! [`PersistenceFailure`] that only names the failed operation.

use chrono::Utc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::{GeneratedStory, Identity, NewStory, StoredStory};
use crate::error::{PersistenceFailure, PersistenceOp};
use crate::ports::{PortError, StoryStore};

fn failure(op: PersistenceOp, story_id: Option<Uuid>, cause: PortError) -> PersistenceFailure {
    error!(?op, ?story_id, error = %cause, "Story store operation failed");
    PersistenceFailure { op }
}

/// Persists a generated story for `owner` and returns its new id.
///
/// The stored record starts unfavorited, untagged, and stamped with the save time.
pub async fn save_story(
    store: &dyn StoryStore,
    story: &GeneratedStory,
    owner: &Identity,
) -> Result<Uuid, PersistenceFailure> {
    let new_story = NewStory {
        user_id: owner.id,
        title: story.title.clone(),
        content: story.content.clone(),
        summary: story.summary.clone(),
        is_favorite: false,
        tags: Vec::new(),
        created_at: Utc::now(),
    };

    let id = store
        .insert_story(new_story)
        .await
        .map_err(|e| failure(PersistenceOp::Save, None, e))?;
    debug!(story_id = %id, user_id = %owner.id, "Story saved");
    Ok(id)
}

/// All of `owner`'s stories, newest first.
pub async fn get_user_stories(
    store: &dyn StoryStore,
    owner: &Identity,
) -> Result<Vec<StoredStory>, PersistenceFailure> {
    let records = store
        .stories_by_owner(owner.id)
        .await
        .map_err(|e| failure(PersistenceOp::List, None, e))?;

    let now = Utc::now();
    let mut stories: Vec<StoredStory> = records
        .into_iter()
        .filter(|record| {
            let owned = record.user_id == owner.id;
            if !owned {
                warn!(
                    story_id = %record.id,
                    user_id = %owner.id,
                    "Store returned a story owned by someone else; dropping it"
                );
            }
            owned
        })
        .map(|record| {
            if record.created_at.is_none() {
                debug!(story_id = %record.id, "Story has no stored timestamp; using now");
            }
            record.into_stored(now)
        })
        .collect();
    // Undated rows were just stamped with `now`, so the store's order no longer holds.
    stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(stories)
}

/// Overwrites the favorite flag of a story.
pub async fn toggle_favorite(
    store: &dyn StoryStore,
    story_id: Uuid,
    is_favorite: bool,
) -> Result<(), PersistenceFailure> {
    store
        .update_favorite(story_id, is_favorite)
        .await
        .map_err(|e| failure(PersistenceOp::Update, Some(story_id), e))
}

/// Deletes a story. Deleting an id that is already gone is not an error.
pub async fn delete_story(store: &dyn StoryStore, story_id: Uuid) -> Result<(), PersistenceFailure> {
    store
        .delete_story(story_id)
        .await
        .map_err(|e| failure(PersistenceOp::Delete, Some(story_id), e))
}

/// Adds `tag` to a story unless it is already present (exact, case-sensitive match).
///
/// This is a read-modify-write: two concurrent calls on the same story can race,
/// and the last write wins. A story that no longer exists is left alone.
pub async fn add_tag(store: &dyn StoryStore, story_id: Uuid, tag: &str) -> Result<(), PersistenceFailure> {
    let record = match store.get_story(story_id).await {
        Ok(record) => record,
        Err(PortError::NotFound(_)) => {
            debug!(%story_id, "Tag target no longer exists; nothing to do");
            return Ok(());
        }
        Err(e) => return Err(failure(PersistenceOp::Tag, Some(story_id), e)),
    };

    if record.tags.iter().any(|existing| existing == tag) {
        return Ok(());
    }

    let mut tags = record.tags;
    tags.push(tag.to_string());
    store
        .update_tags(story_id, tags)
        .await
        .map_err(|e| failure(PersistenceOp::Tag, Some(story_id), e))
}
