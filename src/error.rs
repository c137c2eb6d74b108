use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error("{provider} API error: {message}")]
    #[diagnostic(code(chatgate::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("Missing API key. Set {0} or pass it on the command line")]
    #[diagnostic(code(chatgate::missing_api_key))]
    MissingApiKey(&'static str),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(chatgate::config))]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}
