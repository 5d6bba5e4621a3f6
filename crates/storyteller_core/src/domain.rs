//! crates/storyteller_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database, model API or auth backend.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

//=========================================================================================
// Identity
//=========================================================================================

/// An authenticated principal, as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

//=========================================================================================
// Story Parameters
//=========================================================================================

/// The four knobs a reader picks before asking for a story.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryParameters {
    pub main_character: String,
    pub setting: String,
    pub theme: String,
    pub age_group: String,
}

/// A required story parameter that was left blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MissingField {
    #[error("Please enter a main character")]
    MainCharacter,
    #[error("Please enter a setting")]
    Setting,
    #[error("Please enter a theme")]
    Theme,
    #[error("Please enter an age group")]
    AgeGroup,
}

impl StoryParameters {
    pub fn new(
        main_character: impl Into<String>,
        setting: impl Into<String>,
        theme: impl Into<String>,
        age_group: impl Into<String>,
    ) -> Self {
        Self {
            main_character: main_character.into(),
            setting: setting.into(),
            theme: theme.into(),
            age_group: age_group.into(),
        }
    }

    /// Checks that every field is non-empty after trimming, reporting the first blank one.
    ///
    /// Callers run this before generation; the generation façade itself forwards
    /// whatever it is given.
    pub fn validate(&self) -> Result<(), MissingField> {
        let fields = [
            (&self.main_character, MissingField::MainCharacter),
            (&self.setting, MissingField::Setting),
            (&self.theme, MissingField::Theme),
            (&self.age_group, MissingField::AgeGroup),
        ];
        match fields.into_iter().find(|(value, _)| value.trim().is_empty()) {
            Some((_, missing)) => Err(missing),
            None => Ok(()),
        }
    }
}

//=========================================================================================
// Stories
//=========================================================================================

/// A story fresh out of the generation façade. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStory {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted story, scoped to exactly one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredStory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub is_favorite: bool,
    pub tags: BTreeSet<String>,
}

impl StoredStory {
    /// The generated part of the record, without the store-owned fields.
    pub fn story(&self) -> GeneratedStory {
        GeneratedStory {
            title: self.title.clone(),
            content: self.content.clone(),
            summary: self.summary.clone(),
            created_at: self.created_at,
        }
    }
}

/// The insert payload handed to the story store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStory {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub is_favorite: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A story row exactly as the store hands it back.
///
/// `created_at` is optional because older or hand-edited rows may lack it;
/// the document façade fills the gap when converting to [`StoredStory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub is_favorite: bool,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl StoryRecord {
    pub fn into_stored(self, fallback_time: DateTime<Utc>) -> StoredStory {
        StoredStory {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            summary: self.summary,
            created_at: self.created_at.unwrap_or(fallback_time),
            is_favorite: self.is_favorite,
            tags: self.tags.into_iter().collect(),
        }
    }
}

//=========================================================================================
// Serialized Forms
//=========================================================================================

/// A [`GeneratedStory`] with its timestamp rendered as RFC 3339 text, for handing
/// a story across a serialization boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedStory {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub created_at: String,
}

/// A [`StoredStory`] in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedStoredStory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_favorite: bool,
    pub tags: BTreeSet<String>,
    #[serde(flatten)]
    pub story: SerializedStory,
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid story timestamp '{value}': {source}")]
pub struct TimestampError {
    pub value: String,
    #[source]
    pub source: chrono::ParseError,
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|source| TimestampError {
            value: value.to_string(),
            source,
        })
}

impl From<&GeneratedStory> for SerializedStory {
    fn from(story: &GeneratedStory) -> Self {
        Self {
            title: story.title.clone(),
            content: story.content.clone(),
            summary: story.summary.clone(),
            created_at: format_timestamp(&story.created_at),
        }
    }
}

impl TryFrom<SerializedStory> for GeneratedStory {
    type Error = TimestampError;

    fn try_from(value: SerializedStory) -> Result<Self, Self::Error> {
        let created_at = parse_timestamp(&value.created_at)?;
        Ok(Self {
            title: value.title,
            content: value.content,
            summary: value.summary,
            created_at,
        })
    }
}

impl From<&StoredStory> for SerializedStoredStory {
    fn from(story: &StoredStory) -> Self {
        Self {
            id: story.id,
            user_id: story.user_id,
            is_favorite: story.is_favorite,
            tags: story.tags.clone(),
            story: SerializedStory::from(&story.story()),
        }
    }
}

impl TryFrom<SerializedStoredStory> for StoredStory {
    type Error = TimestampError;

    fn try_from(value: SerializedStoredStory) -> Result<Self, Self::Error> {
        let story = GeneratedStory::try_from(value.story)?;
        Ok(Self {
            id: value.id,
            user_id: value.user_id,
            title: story.title,
            content: story.content,
            summary: story.summary,
            created_at: story.created_at,
            is_favorite: value.is_favorite,
            tags: value.tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_stored() -> StoredStory {
        StoredStory {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Mira's Leap".to_string(),
            content: "Mira looked over the edge of the island.".to_string(),
            summary: "Mira finds her courage.".to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(),
            is_favorite: true,
            tags: ["adventure".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn validate_reports_first_blank_field() {
        let params = StoryParameters::new("Mira", "   ", "", "6-8");
        assert_eq!(params.validate(), Err(MissingField::Setting));

        let params = StoryParameters::new("Mira", "a floating island", "courage", "6-8");
        assert_eq!(params.validate(), Ok(()));
    }

    #[test]
    fn stored_story_timestamp_survives_text_round_trip() {
        let stored = sample_stored();
        let serialized = SerializedStoredStory::from(&stored);
        let json = serde_json::to_string(&serialized).unwrap();
        let back: SerializedStoredStory = serde_json::from_str(&json).unwrap();
        let restored = StoredStory::try_from(back).unwrap();

        assert_eq!(
            restored.created_at.timestamp_millis(),
            stored.created_at.timestamp_millis()
        );
        assert_eq!(restored, stored);
    }

    #[test]
    fn serialized_story_uses_camel_case_keys() {
        let stored = sample_stored();
        let value = serde_json::to_value(SerializedStoredStory::from(&stored)).unwrap();

        assert!(value.get("createdAt").is_some());
        assert!(value.get("userId").is_some());
        assert_eq!(value["isFavorite"], serde_json::json!(true));
        assert_eq!(value["title"], serde_json::json!("Mira's Leap"));
    }

    #[test]
    fn malformed_timestamp_text_is_rejected() {
        let serialized = SerializedStory {
            title: "t".to_string(),
            content: "c".to_string(),
            summary: "s".to_string(),
            created_at: "yesterday-ish".to_string(),
        };
        let err = GeneratedStory::try_from(serialized).unwrap_err();
        assert_eq!(err.value, "yesterday-ish");
    }

    #[test]
    fn record_without_timestamp_takes_fallback_time() {
        let fallback = Utc.timestamp_opt(1_650_000_000, 0).unwrap();
        let record = StoryRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "t".to_string(),
            content: "c".to_string(),
            summary: "s".to_string(),
            is_favorite: false,
            tags: vec!["sea".to_string(), "sea".to_string()],
            created_at: None,
        };
        let stored = record.into_stored(fallback);
        assert_eq!(stored.created_at, fallback);
        assert_eq!(stored.tags.len(), 1);
    }
}
