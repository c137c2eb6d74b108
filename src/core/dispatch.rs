// response dispatcher - picks a backend by the provider half of "provider:model"

use crate::Error;
use crate::core::ai::Backend;
use crate::core::history::Turn;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Provider names are always stored lowercased, so lookups can't disagree
/// with how the dispatcher registered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendId {
    provider: String,
    model: String,
}

impl BackendId {
    pub fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.trim().to_lowercase(),
            model: model.trim().to_string(),
        }
    }

    pub fn parse(id: &str) -> Self {
        let id = id.trim();
        let (provider, model) = id.split_once(':').unwrap_or((id, ""));
        Self::new(provider, model)
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl FromStr for BackendId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

#[derive(Default, Clone)]
pub struct Dispatcher {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, provider: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        self.backends.insert(provider.into().trim().to_lowercase(), backend);
        self
    }

    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Never fails: provider errors and unknown providers come back as text
    /// so the session can show them as the reply.
    pub async fn generate(&self, conversation: &[Turn], backend_id: &BackendId) -> String {
        let Some(backend) = self.backends.get(backend_id.provider()) else {
            tracing::warn!(backend = %backend_id, "no backend registered for provider");
            return format!(
                "Unsupported backend provider '{}' in '{}'. Available providers: {}",
                backend_id.provider(),
                backend_id,
                self.providers().join(", ")
            );
        };

        tracing::debug!(
            backend = %backend_id,
            turns = conversation.len(),
            "dispatching conversation"
        );

        match backend.generate(backend_id.model(), conversation).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(backend = %backend_id, error = %e, "generation failed");
                // the provider name is already in the prefix
                let detail = match e {
                    Error::Provider { message, .. } => message,
                    other => other.to_string(),
                };
                format!("Error calling {} API: {detail}", backend.name())
            }
        }
    }
}
