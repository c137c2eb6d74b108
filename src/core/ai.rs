// provider bindings - openai chat completions and huggingface inference

use crate::Error;
use crate::core::history::Turn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co";

/// A generation service. Gets the whole conversation, system turn included.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Display name used when a failure is rendered as a reply.
    fn name(&self) -> &'static str;

    async fn generate(&self, model: &str, conversation: &[Turn]) -> Result<String, Error>;
}

pub struct OpenAi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

// what we send to openai
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
}

// what openai sends back
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAi {
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Backend for OpenAi {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    async fn generate(&self, model: &str, conversation: &[Turn]) -> Result<String, Error> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model,
                messages: conversation,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response.text().await?;
            return Err(Error::Provider {
                provider: self.name(),
                message,
            });
        }

        let response: ChatResponse = response.json().await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| Error::Provider {
                provider: self.name(),
                message: "response contained no message".to_string(),
            })
    }
}

pub struct HuggingFace {
    client: reqwest::Client,
    token: String,
    base_url: String,
    max_new_tokens: u32,
}

#[derive(Serialize)]
struct InferenceRequest {
    inputs: String,
    parameters: Parameters,
}

#[derive(Serialize)]
struct Parameters {
    max_new_tokens: u32,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct Generated {
    generated_text: String,
}

impl HuggingFace {
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_new_tokens: 512,
        }
    }
}

/// Text-generation models take a single prompt, so the turns are flattened
/// into role-labelled lines and the model is asked to continue as assistant.
pub fn render_prompt(conversation: &[Turn]) -> String {
    let mut prompt = String::new();
    for turn in conversation {
        prompt.push_str(turn.role().as_str());
        prompt.push_str(": ");
        prompt.push_str(turn.content());
        prompt.push('\n');
    }
    prompt.push_str("assistant:");
    prompt
}

#[async_trait]
impl Backend for HuggingFace {
    fn name(&self) -> &'static str {
        "HuggingFace"
    }

    async fn generate(&self, model: &str, conversation: &[Turn]) -> Result<String, Error> {
        let request = InferenceRequest {
            inputs: render_prompt(conversation),
            parameters: Parameters {
                max_new_tokens: self.max_new_tokens,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{model}", self.base_url))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response.text().await?;
            return Err(Error::Provider {
                provider: self.name(),
                message,
            });
        }

        let generated: Vec<Generated> = response.json().await?;
        generated
            .into_iter()
            .next()
            .map(|g| g.generated_text.trim().to_string())
            .ok_or_else(|| Error::Provider {
                provider: self.name(),
                message: "response contained no generated text".to_string(),
            })
    }
}
