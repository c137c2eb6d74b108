// http server mode - a chat page plus a small json api, one session per client

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::core::{Chatbot, Event, Session, Turn};
use crate::Error;

pub const DEFAULT_SESSION_TTL_SECS: u64 = 15 * 60;

struct Entry {
    // each session has its own lock so a slow provider call only holds up
    // the client that made it
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

struct AppState {
    bot: Chatbot,
    ttl: Duration,
    sessions: Mutex<HashMap<Uuid, Entry>>,
}

impl AppState {
    fn new(bot: Chatbot, ttl: Duration) -> Self {
        Self {
            bot,
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.ttl);

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, live = sessions.len(), "idle web sessions expired");
        }
    }

    async fn sweep(&self) {
        let mut sessions = self.sessions.lock().await;
        self.evict_idle(&mut sessions, Instant::now());
    }

    /// Looks up a live session and marks it as just used.
    async fn touch(&self, id: &Uuid) -> Option<Arc<Mutex<Session>>> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        self.evict_idle(&mut sessions, now);

        let entry = sessions.get_mut(id)?;
        entry.last_seen = now;
        Some(entry.session.clone())
    }

    async fn create(&self) -> (Uuid, Arc<Mutex<Session>>) {
        let now = Instant::now();
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(self.bot.session()));

        let mut sessions = self.sessions.lock().await;
        self.evict_idle(&mut sessions, now);
        sessions.insert(
            id,
            Entry {
                session: session.clone(),
                last_seen: now,
            },
        );
        tracing::info!(session = %id, live = sessions.len(), "web session started");
        (id, session)
    }

    async fn remove(&self, id: &Uuid) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    session_id: Option<Uuid>,
    message: String,
}

#[derive(Serialize, Default)]
struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<Vec<Turn>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ChatResponse {
    fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub struct Server;

impl Server {
    /// Sessions idle for longer than `session_ttl` are dropped the next time
    /// the session map is touched.
    pub fn router(bot: Chatbot, session_ttl: Duration) -> Router {
        Self::app(Arc::new(AppState::new(bot, session_ttl)))
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/health", get(health))
            .route("/chat", post(chat))
            .route("/sessions/{id}", get(get_session).delete(end_session))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    pub async fn run(
        bot: Chatbot,
        host: &str,
        port: u16,
        session_ttl: Duration,
    ) -> Result<(), Error> {
        if session_ttl.is_zero() {
            return Err(Error::Config("session ttl must be at least 1 second".to_string()));
        }

        let state = Arc::new(AppState::new(bot, session_ttl));

        // also sweep on a timer so a quiet server lets go of abandoned sessions
        let sweeper = state.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(session_ttl);
            loop {
                tick.tick().await;
                sweeper.sweep().await;
            }
        });

        let app = Self::app(state);

        let addr = format!("{host}:{port}");
        println!("server running at http://{addr}");
        tracing::info!(%addr, "web server listening");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        Ok(())
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse::error("message must not be empty")),
        );
    }

    let (id, session) = match req.session_id {
        Some(id) => match state.touch(&id).await {
            Some(session) => (id, session),
            None => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(ChatResponse::error(format!("unknown session {id}"))),
                );
            }
        },
        None => state.create().await,
    };

    let mut session = session.lock().await;
    let event = session.handle_turn(&req.message).await;

    (
        StatusCode::OK,
        Json(ChatResponse {
            session_id: Some(id),
            event: Some(event),
            history: Some(session.history().snapshot()),
            error: None,
        }),
    )
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ChatResponse>) {
    let Some(session) = state.touch(&id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(ChatResponse::error(format!("unknown session {id}"))),
        );
    };

    let history = session.lock().await.history().snapshot();
    (
        StatusCode::OK,
        Json(ChatResponse {
            session_id: Some(id),
            history: Some(history),
            ..ChatResponse::default()
        }),
    )
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ChatResponse>) {
    if !state.remove(&id).await {
        return (
            StatusCode::NOT_FOUND,
            Json(ChatResponse::error(format!("unknown session {id}"))),
        );
    }

    tracing::info!(session = %id, "web session ended");
    (
        StatusCode::OK,
        Json(ChatResponse {
            session_id: Some(id),
            event: Some(Event::End),
            ..ChatResponse::default()
        }),
    )
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Chatbot with Moderation</title>
<style>
  body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }
  #log p { margin: .4rem 0; white-space: pre-wrap; }
  #warning { color: #b45309; }
  form { display: flex; gap: .5rem; }
  input { flex: 1; }
</style>
</head>
<body>
<h1>Chatbot with Moderation</h1>
<div id="log"></div>
<p id="warning"></p>
<form id="form">
  <input id="input" placeholder="You:" autocomplete="off">
  <button>Send</button>
</form>
<script>
let sessionId = null;
const log = document.getElementById("log");
const warning = document.getElementById("warning");

function render(history) {
  log.innerHTML = "";
  for (const turn of history) {
    const p = document.createElement("p");
    const who = document.createElement("strong");
    who.textContent = turn.role === "user" ? "You: " : "Assistant: ";
    p.append(who, turn.content);
    log.append(p);
  }
}

document.getElementById("form").addEventListener("submit", async (e) => {
  e.preventDefault();
  const input = document.getElementById("input");
  const message = input.value;
  if (!message.trim()) return;
  const res = await fetch("/chat", {
    method: "POST",
    headers: { "content-type": "application/json" },
    body: JSON.stringify({ session_id: sessionId, message }),
  });
  const body = await res.json();
  // the server forgot us (expired or ended), next send starts over
  if (res.status === 404) sessionId = null;
  if (body.error) { warning.textContent = body.error; return; }
  sessionId = body.session_id;
  warning.textContent = body.event.kind === "warning" ? body.event.text : "";
  render(body.history);
  input.value = "";
});
</script>
</body>
</html>
"#;
