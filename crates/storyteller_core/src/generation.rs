//! crates/storyteller_core/src/generation.rs
//!
//! The generation façade. Builds a deterministic prompt from the story
//! parameters, sends it to the story model, and turns the reply into a
//! [`GeneratedStory`]. Replies that are not the requested JSON degrade to a
//! fallback record instead of failing.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::domain::{GeneratedStory, StoryParameters};
use crate::error::GenerationFailure;
use crate::ports::{StoryModel, StoryRequest};

pub const SYSTEM_INSTRUCTIONS: &str =
    "You are a creative storyteller who creates engaging stories for different age groups.";
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 500;

pub const FALLBACK_TITLE: &str = "Generated Story";
pub const FALLBACK_SUMMARY: &str = "A story was generated based on your parameters.";

const PROMPT_TEMPLATE: &str = r#"Create a story with the following parameters:
- Main character: {main_character}
- Setting: {setting}
- Theme: {theme}
- Age group: {age_group}

Format your response as JSON with the following structure:
{
  "title": "Story title",
  "content": "Full story content with paragraphs",
  "summary": "A brief summary of the story"
}"#;

/// How a model reply was turned into a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryOutcome {
    /// The model replied with the requested JSON.
    Structured(GeneratedStory),
    /// The reply was not usable JSON; the raw text became the story content.
    Fallback(GeneratedStory),
}

impl StoryOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn into_story(self) -> GeneratedStory {
        match self {
            Self::Structured(story) | Self::Fallback(story) => story,
        }
    }
}

#[derive(Deserialize)]
struct StoryReply {
    title: String,
    content: String,
    summary: String,
}

/// Embeds the four parameters verbatim into the story prompt.
pub fn build_prompt(params: &StoryParameters) -> String {
    PROMPT_TEMPLATE
        .replace("{main_character}", &params.main_character)
        .replace("{setting}", &params.setting)
        .replace("{theme}", &params.theme)
        .replace("{age_group}", &params.age_group)
}

pub fn build_request(params: &StoryParameters) -> StoryRequest {
    StoryRequest {
        system: SYSTEM_INSTRUCTIONS.to_string(),
        prompt: build_prompt(params),
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

/// Strips surrounding whitespace and a Markdown code fence, if any.
fn unfence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    match body.split_once('\n') {
        Some((info, inner)) if !info.contains('{') => inner.trim(),
        _ => body.trim(),
    }
}

/// Interprets a raw model reply. Never fails.
pub fn parse_reply(raw: &str, now: DateTime<Utc>) -> StoryOutcome {
    match serde_json::from_str::<StoryReply>(unfence(raw)) {
        Ok(reply) => StoryOutcome::Structured(GeneratedStory {
            title: reply.title,
            content: reply.content,
            summary: reply.summary,
            created_at: now,
        }),
        Err(e) => {
            debug!(error = %e, "Model reply is not story JSON");
            StoryOutcome::Fallback(GeneratedStory {
                title: FALLBACK_TITLE.to_string(),
                content: raw.to_string(),
                summary: FALLBACK_SUMMARY.to_string(),
                created_at: now,
            })
        }
    }
}

/// Generates a story and reports whether the model's reply was usable JSON.
pub async fn generate_story_outcome(
    model: &dyn StoryModel,
    params: &StoryParameters,
) -> Result<StoryOutcome, GenerationFailure> {
    let raw = model.complete(build_request(params)).await.map_err(|e| {
        error!(error = %e, "Story model request failed");
        GenerationFailure
    })?;

    let outcome = parse_reply(&raw, Utc::now());
    if outcome.is_fallback() {
        warn!("Model did not return story JSON; using the raw reply as content");
    }
    Ok(outcome)
}

pub async fn generate_story(
    model: &dyn StoryModel,
    params: &StoryParameters,
) -> Result<GeneratedStory, GenerationFailure> {
    generate_story_outcome(model, params)
        .await
        .map(StoryOutcome::into_story)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a canned text and remembers the last request.
    struct CannedModel {
        reply: PortResult<String>,
        seen: Mutex<Option<StoryRequest>>,
    }

    impl CannedModel {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(PortError::Unexpected("401 Unauthorized".to_string())),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl StoryModel for CannedModel {
        async fn complete(&self, request: StoryRequest) -> PortResult<String> {
            *self.seen.lock().unwrap() = Some(request);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(PortError::Unexpected(e.to_string())),
            }
        }
    }

    fn mira() -> StoryParameters {
        StoryParameters::new("Mira", "a floating island", "courage", "6-8")
    }

    #[test]
    fn prompt_embeds_every_parameter_and_the_json_contract() {
        let prompt = build_prompt(&mira());
        assert!(prompt.contains("Main character: Mira"));
        assert!(prompt.contains("Setting: a floating island"));
        assert!(prompt.contains("Theme: courage"));
        assert!(prompt.contains("Age group: 6-8"));
        for key in ["\"title\"", "\"content\"", "\"summary\""] {
            assert!(prompt.contains(key), "prompt is missing {key}");
        }
        assert_eq!(prompt, build_prompt(&mira()));
    }

    #[tokio::test]
    async fn structured_reply_becomes_story() {
        let model = CannedModel::replying(
            r#"{"title":"Mira's Leap","content":"...","summary":"..."}"#,
        );
        let before = Utc::now();
        let outcome = generate_story_outcome(&model, &mira()).await.unwrap();
        let after = Utc::now();

        assert!(!outcome.is_fallback());
        let story = outcome.into_story();
        assert_eq!(story.title, "Mira's Leap");
        assert_eq!(story.content, "...");
        assert_eq!(story.summary, "...");
        assert!(story.created_at >= before && story.created_at <= after);

        let request = model.seen.lock().unwrap().clone().unwrap();
        assert_eq!(request.system, SYSTEM_INSTRUCTIONS);
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.max_tokens, 500);
    }

    #[tokio::test]
    async fn plain_text_reply_falls_back() {
        let model = CannedModel::replying("Once upon a time...");
        let before = Utc::now();
        let outcome = generate_story_outcome(&model, &mira()).await.unwrap();

        assert!(outcome.is_fallback());
        let story = outcome.into_story();
        assert_eq!(story.title, "Generated Story");
        assert_eq!(story.content, "Once upon a time...");
        assert_eq!(story.summary, "A story was generated based on your parameters.");
        assert!(story.created_at >= before);
    }

    #[tokio::test]
    async fn non_json_replies_never_fail_for_any_parameters() {
        let params = [
            mira(),
            StoryParameters::new("Tobi", "the moon", "friendship", "3-5"),
            StoryParameters::new("", "", "", ""),
            StoryParameters::new("\"quoted\"", "{braces}", "line\nbreak", "9-12"),
        ];
        let replies = ["", "not json", "[1, 2, 3]", r#"{"title": "only a title"}"#, "{"];

        for p in &params {
            for reply in replies {
                let model = CannedModel::replying(reply);
                let story = generate_story(&model, p).await.unwrap();
                assert_eq!(story.title, FALLBACK_TITLE);
                assert_eq!(story.content, reply);
            }
        }
    }

    #[test]
    fn fenced_json_is_repaired() {
        let raw = "```json\n{\"title\":\"T\",\"content\":\"C\",\"summary\":\"S\"}\n```\n";
        let outcome = parse_reply(raw, Utc::now());
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.into_story().title, "T");
    }

    #[tokio::test]
    async fn transport_errors_become_generation_failure() {
        let model = CannedModel::failing();
        let err = generate_story(&model, &mira()).await.unwrap_err();
        assert_eq!(err, GenerationFailure);
        assert_eq!(err.to_string(), "Failed to generate story");
    }
}
