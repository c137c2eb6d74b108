// chatgate library - moderated chat over openai / huggingface

pub mod cli;
pub mod config;
mod core;
mod error;
mod output;
pub mod repl;
mod server;

pub use config::Config;
pub use crate::core::{
    Backend, BackendId, Chatbot, DEFAULT_HISTORY_SIZE, Dispatcher, Event, FLAGGED_WARNING,
    History, HuggingFace, ModerationGate, Moderator, OpenAi, OpenAiModerator, Role, Session, Turn,
    is_exit_command, render_prompt,
};
pub use error::Error;
pub use output::Output;
pub use server::Server;
