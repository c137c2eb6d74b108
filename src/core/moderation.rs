// moderation gate - every user message goes through here before the model sees it

use crate::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Something that can classify text. `Ok(true)` means the text was flagged.
#[async_trait]
pub trait Moderator: Send + Sync {
    async fn classify(&self, text: &str) -> Result<bool, Error>;
}

pub struct OpenAiModerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct Request<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct Response {
    results: Vec<ModerationResult>,
}

#[derive(Deserialize)]
struct ModerationResult {
    flagged: bool,
}

impl OpenAiModerator {
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Moderator for OpenAiModerator {
    async fn classify(&self, text: &str) -> Result<bool, Error> {
        let response = self
            .client
            .post(format!("{}/moderations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&Request { input: text })
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response.text().await?;
            return Err(Error::Provider {
                provider: "OpenAI moderation",
                message,
            });
        }

        let response: Response = response.json().await?;
        response
            .results
            .first()
            .map(|r| r.flagged)
            .ok_or_else(|| Error::Provider {
                provider: "OpenAI moderation",
                message: "response contained no results".to_string(),
            })
    }
}

/// Fails closed: if the moderator can't give an answer the text is treated
/// as flagged.
#[derive(Clone)]
pub struct ModerationGate {
    moderator: Arc<dyn Moderator>,
}

impl ModerationGate {
    pub fn new(moderator: Arc<dyn Moderator>) -> Self {
        Self { moderator }
    }

    /// Returns true when the text is safe to forward.
    pub async fn check(&self, text: &str) -> bool {
        match self.moderator.classify(text).await {
            Ok(flagged) => {
                if flagged {
                    tracing::info!("message flagged by moderation");
                }
                !flagged
            }
            Err(e) => {
                tracing::warn!(error = %e, "moderation unavailable, treating message as flagged");
                false
            }
        }
    }
}
