//! Chat-completion client for AI collection suggestions and note summaries.
//!
//! Speaks the OpenAI-compatible `/chat/completions` protocol. The API key
//! comes from `SCROLL2STUDY_OPENAI_KEY` or the OS keyring entry
//! `openai_api_key`.

use indoc::formatdoc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::keyring_store;
use crate::catalog::CatalogItem;
use crate::error::{ConfigError, CoreError, Result};
use crate::storage::AiConfig;

const SERVICE: &str = "openai";
pub const API_KEY_ENV: &str = "SCROLL2STUDY_OPENAI_KEY";
pub const API_KEY_ENTRY: &str = "openai_api_key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// A collection proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSuggestion {
    pub name: String,
    pub description: String,
    #[serde(rename = "videoIds")]
    pub video_ids: Vec<String>,
}

pub struct AiClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f64,
    api_key: String,
}

impl AiClient {
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if the base URL is not http(s).
    pub fn new(config: &AiConfig, api_key: impl Into<String>) -> Result<Self> {
        let parsed = Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "ai.base_url".into(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                key: "ai.base_url".into(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            }
            .into());
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: api_key.into(),
        })
    }

    /// Build a client with the key from the environment or the keyring.
    pub fn from_stored_key(config: &AiConfig) -> Result<Self> {
        let key = match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => Some(key),
            _ => keyring_store::get(API_KEY_ENTRY).ok().flatten(),
        };
        let key = key.ok_or_else(|| ConfigError::MissingKey(API_KEY_ENTRY.into()))?;
        Self::new(config, key)
    }

    /// Send one chat request and return the first choice's content.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, model = %self.model, "sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                temperature: self.temperature,
            })
            .send()
            .await
            .map_err(|e| CoreError::remote(SERVICE, None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::remote(SERVICE, Some(status.as_u16()), text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CoreError::Parse(format!("chat completion body: {e}")))?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CoreError::Parse("chat completion returned no choices".into()))
    }

    /// Ask the model to group catalog videos around a topic.
    pub async fn suggest_collection(
        &self,
        topic: &str,
        videos: &[CatalogItem],
    ) -> Result<CollectionSuggestion> {
        let listing: Vec<String> = videos
            .iter()
            .map(|v| format!("- {} | {} | {} | level {}", v.id, v.title, v.subject_id, v.complexity_level))
            .collect();
        let prompt = formatdoc! {"
            Build a study collection about: {topic}

            Available videos (id | title | subject | level):
            {listing}

            Reply with a single JSON object with the keys \"name\", \"description\"
            and \"videoIds\". Only use ids from the list above.",
            topic = topic,
            listing = listing.join("\n"),
        };

        let content = self
            .chat(&[
                ChatMessage::system("You curate short educational videos into study collections."),
                ChatMessage::user(prompt),
            ])
            .await?;
        parse_collection_suggestion(&content)
    }

    pub async fn summarize_note(&self, note: &str) -> Result<String> {
        self.chat(&[
            ChatMessage::system("Summarize the student's note in two or three sentences."),
            ChatMessage::user(note),
        ])
        .await
    }
}

/// Parse the model's reply, tolerating a surrounding code fence.
pub fn parse_collection_suggestion(content: &str) -> Result<CollectionSuggestion> {
    let body = strip_code_fence(content);
    serde_json::from_str(body)
        .map_err(|e| CoreError::Parse(format!("collection suggestion: {e}")))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string, e.g. ```json
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
