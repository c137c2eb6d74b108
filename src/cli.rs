// command line interface

use crate::config::{Config, DEFAULT_BACKEND, DEFAULT_SYSTEM_PROMPT};
use crate::core::{BackendId, Chatbot, DEFAULT_HISTORY_SIZE, HUGGINGFACE_BASE_URL, OPENAI_BASE_URL};
use crate::server::DEFAULT_SESSION_TTL_SECS;
use crate::{Server, repl};
use clap::{Parser, Subcommand};
use miette::Result;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatgate", about = "Chat with an LLM, every message moderated first")]
struct Cli {
    /// openai api key, used for moderation and the openai backend
    #[arg(long, short = 'k', env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// huggingface api token, needed for huggingface:* backends
    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true, global = true)]
    hf_token: Option<String>,

    /// backend as provider:model (openai:gpt-4, huggingface:meta-llama/Llama-2-7b-chat-hf)
    #[arg(long, short, env = "CHAT_BACKEND", default_value = DEFAULT_BACKEND, global = true)]
    backend: BackendId,

    /// how many past messages to keep
    #[arg(long, env = "CHAT_HISTORY_SIZE", default_value_t = DEFAULT_HISTORY_SIZE, global = true)]
    history_size: usize,

    /// system prompt sent ahead of every conversation
    #[arg(long, env = "CHAT_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT, global = true)]
    system_prompt: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = OPENAI_BASE_URL, global = true)]
    openai_base_url: String,

    #[arg(long, env = "HF_BASE_URL", default_value = HUGGINGFACE_BASE_URL, global = true)]
    hf_base_url: String,

    /// debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// start as http server
    Serve {
        /// port number
        #[arg(long, short, default_value = "3000")]
        port: u16,

        /// host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// seconds a web session may sit idle before it is dropped
        #[arg(long, env = "CHAT_SESSION_TTL", default_value_t = DEFAULT_SESSION_TTL_SECS)]
        session_ttl: u64,
    },
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            openai_api_key: self.api_key.clone().unwrap_or_default(),
            hf_token: self.hf_token.clone(),
            backend: self.backend.clone(),
            history_size: self.history_size,
            system_prompt: self.system_prompt.clone(),
            openai_base_url: self.openai_base_url.clone(),
            hf_base_url: self.hf_base_url.clone(),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "chatgate=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stderr so log lines don't interleave with the conversation on stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // bad config is the only thing that stops us before a session starts
    let config = cli.config();
    let bot = Chatbot::from_config(&config)?;
    tracing::debug!(
        backend = %bot.backend(),
        providers = ?bot.providers(),
        history_size = config.history_size,
        "configured"
    );

    match cli.command {
        Some(Commands::Serve {
            port,
            host,
            session_ttl,
        }) => Ok(Server::run(bot, &host, port, Duration::from_secs(session_ttl)).await?),
        None => {
            let backend = bot.backend().to_string();
            Ok(repl::run(bot.session(), &backend).await?)
        }
    }
}
