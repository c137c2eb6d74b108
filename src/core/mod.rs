// core logic - history, moderation, provider dispatch, and the session loop

mod ai;
mod dispatch;
mod history;
mod moderation;
mod session;

pub use ai::{Backend, HUGGINGFACE_BASE_URL, HuggingFace, OpenAi, render_prompt};
pub use dispatch::{BackendId, Dispatcher};
pub use history::{DEFAULT_HISTORY_SIZE, History, Role, Turn};
pub use moderation::{ModerationGate, Moderator, OPENAI_BASE_URL, OpenAiModerator};
pub use session::{Chatbot, Event, FLAGGED_WARNING, Session, is_exit_command};
