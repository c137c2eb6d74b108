// session loop - moderate, dispatch, remember. shared by the cli and the web server

use crate::Error;
use crate::config::Config;
use crate::core::ai::{HuggingFace, OpenAi};
use crate::core::dispatch::{BackendId, Dispatcher};
use crate::core::history::{History, Turn};
use crate::core::moderation::{ModerationGate, OpenAiModerator};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// What a turn produced, for whichever front end is rendering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Event {
    Warning(String),
    Reply(String),
    End,
}

pub const FLAGGED_WARNING: &str = "Your message was flagged and not sent to the model.";

pub fn is_exit_command(text: &str) -> bool {
    let text = text.trim();
    text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit")
}

/// Everything sessions share. Cheap to clone.
#[derive(Clone)]
pub struct Chatbot {
    gate: ModerationGate,
    dispatcher: Arc<Dispatcher>,
    backend: BackendId,
    system_prompt: String,
    history_size: NonZeroUsize,
}

impl Chatbot {
    pub fn new(
        gate: ModerationGate,
        dispatcher: Dispatcher,
        backend: BackendId,
        history_size: usize,
    ) -> Result<Self, Error> {
        let history_size = NonZeroUsize::new(history_size)
            .ok_or_else(|| Error::Config("history size must be at least 1".to_string()))?;

        Ok(Self {
            gate,
            dispatcher: Arc::new(dispatcher),
            backend,
            system_prompt: crate::config::DEFAULT_SYSTEM_PROMPT.to_string(),
            history_size,
        })
    }

    /// Wires the real openai / huggingface clients from startup config.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        config.validate()?;

        let gate = ModerationGate::new(Arc::new(OpenAiModerator::with_base_url(
            &config.openai_api_key,
            &config.openai_base_url,
        )));

        let mut dispatcher = Dispatcher::new().register(
            "openai",
            Arc::new(OpenAi::with_base_url(
                &config.openai_api_key,
                &config.openai_base_url,
            )),
        );
        // blank tokens count as unset
        if let Some(token) = config.hf_token.as_deref().filter(|t| !t.trim().is_empty()) {
            dispatcher = dispatcher.register(
                "huggingface",
                Arc::new(HuggingFace::with_base_url(token, &config.hf_base_url)),
            );
        }

        Ok(Self::new(gate, dispatcher, config.backend.clone(), config.history_size)?
            .with_system_prompt(&config.system_prompt))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn backend(&self) -> &BackendId {
        &self.backend
    }

    /// Providers the dispatcher can route to.
    pub fn providers(&self) -> Vec<&str> {
        self.dispatcher.providers()
    }

    pub fn session(&self) -> Session {
        Session {
            bot: self.clone(),
            history: History::with_capacity(self.history_size),
        }
    }
}

pub struct Session {
    bot: Chatbot,
    history: History,
}

impl Session {
    /// One full cycle for one user message. Flagged input leaves the history
    /// untouched and never reaches the dispatcher.
    pub async fn handle_turn(&mut self, text: &str) -> Event {
        if !self.bot.gate.check(text).await {
            return Event::Warning(FLAGGED_WARNING.to_string());
        }

        self.history.append(Turn::user(text));
        let conversation = self.history.conversation(&self.bot.system_prompt);
        let reply = self
            .bot
            .dispatcher
            .generate(&conversation, &self.bot.backend)
            .await;

        self.history.append(Turn::assistant(reply.clone()));
        Event::Reply(reply)
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}
