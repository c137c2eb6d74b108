// fakes shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chatgate::{Backend, BackendId, Chatbot, Dispatcher, Error, ModerationGate, Moderator, Turn};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Flags any text containing one of its words. Can be made to fail outright.
pub struct FakeModerator {
    pub blocked: Vec<&'static str>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeModerator {
    pub fn allowing_all() -> Self {
        Self::blocking(&[])
    }

    pub fn blocking(words: &[&'static str]) -> Self {
        Self {
            blocked: words.to_vec(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            blocked: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Moderator for FakeModerator {
    async fn classify(&self, text: &str) -> Result<bool, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Provider {
                provider: "fake moderation",
                message: "service unavailable".to_string(),
            });
        }
        Ok(self.blocked.iter().any(|w| text.contains(w)))
    }
}

/// Records every conversation it's given and answers with a fixed reply.
pub struct RecordingBackend {
    pub reply: Result<String, String>,
    pub seen: Mutex<Vec<(String, Vec<Turn>)>>,
}

impl RecordingBackend {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<(String, Vec<Turn>)> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    fn name(&self) -> &'static str {
        "Recording"
    }

    async fn generate(&self, model: &str, conversation: &[Turn]) -> Result<String, Error> {
        self.seen
            .lock()
            .unwrap()
            .push((model.to_string(), conversation.to_vec()));
        self.reply.clone().map_err(|message| Error::Provider {
            provider: "Recording",
            message,
        })
    }
}

pub fn chatbot(
    moderator: Arc<FakeModerator>,
    backend: Arc<RecordingBackend>,
    history_size: usize,
) -> Chatbot {
    let dispatcher = Dispatcher::new().register("openai", backend);
    Chatbot::new(
        ModerationGate::new(moderator),
        dispatcher,
        BackendId::parse("openai:gpt-4"),
        history_size,
    )
    .unwrap()
}

/// Serves `app` on an ephemeral local port and returns its base url.
pub async fn spawn(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
