// startup configuration - read once, validated, then handed to the chatbot

use crate::Error;
use crate::core::{BackendId, DEFAULT_HISTORY_SIZE, HUGGINGFACE_BASE_URL, OPENAI_BASE_URL};

pub const DEFAULT_BACKEND: &str = "openai:gpt-4";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub hf_token: Option<String>,
    pub backend: BackendId,
    pub history_size: usize,
    pub system_prompt: String,
    pub openai_base_url: String,
    pub hf_base_url: String,
}

impl Config {
    pub fn new(openai_api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: openai_api_key.into(),
            hf_token: None,
            backend: BackendId::parse(DEFAULT_BACKEND),
            history_size: DEFAULT_HISTORY_SIZE,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            openai_base_url: OPENAI_BASE_URL.to_string(),
            hf_base_url: HUGGINGFACE_BASE_URL.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.openai_api_key.trim().is_empty() {
            return Err(Error::MissingApiKey("OPENAI_API_KEY"));
        }

        if self.history_size == 0 {
            return Err(Error::Config("history size must be at least 1".to_string()));
        }

        if self.backend.provider() == "huggingface"
            && self.hf_token.as_deref().is_none_or(|t| t.trim().is_empty())
        {
            return Err(Error::MissingApiKey("HF_API_TOKEN"));
        }

        Ok(())
    }
}
