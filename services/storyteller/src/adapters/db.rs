//! services/storyteller/src/adapters/db.rs
//!
//! This module contains the story store adapter, which is the concrete implementation
//! of the `StoryStore` port from the `core` crate. It handles all interactions
//! with the `stories` table in PostgreSQL using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use storyteller_core::domain::{NewStory, StoryRecord};
use storyteller_core::ports::{PortError, PortResult, StoryStore};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `StoryStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const STORY_COLUMNS: &str =
    "id, user_id, title, content, summary, is_favorite, tags, created_at";

#[derive(FromRow)]
struct StoryRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: String,
    summary: String,
    is_favorite: bool,
    tags: Option<Vec<String>>,
    created_at: Option<DateTime<Utc>>,
}
impl StoryRow {
    fn to_domain(self) -> StoryRecord {
        StoryRecord {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            summary: self.summary,
            is_favorite: self.is_favorite,
            tags: self.tags.unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `StoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoryStore for DbAdapter {
    async fn insert_story(&self, story: NewStory) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO stories (id, user_id, title, content, summary, is_favorite, tags, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(story.user_id)
        .bind(&story.title)
        .bind(&story.content)
        .bind(&story.summary)
        .bind(story.is_favorite)
        .bind(&story.tags)
        .bind(story.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(id)
    }

    async fn stories_by_owner(&self, user_id: Uuid) -> PortResult<Vec<StoryRecord>> {
        let records = sqlx::query_as::<_, StoryRow>(&format!(
            "SELECT {STORY_COLUMNS} FROM stories WHERE user_id = $1 ORDER BY created_at DESC NULLS FIRST"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_story(&self, story_id: Uuid) -> PortResult<StoryRecord> {
        let record = sqlx::query_as::<_, StoryRow>(&format!(
            "SELECT {STORY_COLUMNS} FROM stories WHERE id = $1"
        ))
        .bind(story_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Story {} not found", story_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn update_favorite(&self, story_id: Uuid, is_favorite: bool) -> PortResult<()> {
        let result = sqlx::query("UPDATE stories SET is_favorite = $1 WHERE id = $2")
            .bind(is_favorite)
            .bind(story_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Story {} not found", story_id)));
        }
        Ok(())
    }

    async fn update_tags(&self, story_id: Uuid, tags: Vec<String>) -> PortResult<()> {
        let result = sqlx::query("UPDATE stories SET tags = $1 WHERE id = $2")
            .bind(&tags)
            .bind(story_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Story {} not found", story_id)));
        }
        Ok(())
    }

    async fn delete_story(&self, story_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(story_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
