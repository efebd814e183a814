use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(calsync::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(calsync::config))]
    Config(String),

    #[error("Access token error: {0}")]
    #[diagnostic(code(calsync::oauth))]
    OAuth(String),

    #[error("Invalid id token: {0}")]
    #[diagnostic(code(calsync::id_token))]
    IdToken(String),

    #[error("API call returned {status}: {body}")]
    #[diagnostic(code(calsync::calendar_api))]
    Api { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    #[diagnostic(code(calsync::http))]
    Http(#[from] reqwest::Error),

    #[error("Session store error: {0}")]
    #[diagnostic(code(calsync::session))]
    Session(String),

    #[error("Template error: {0}")]
    #[diagnostic(code(calsync::template))]
    Template(#[from] askama::Error),

    #[error(transparent)]
    #[diagnostic(code(calsync::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(calsync::serialization))]
    Serialization(String),
}

impl Error {
    /// Whether the failure came from a remote service rather than this process
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::OAuth(_) | Error::IdToken(_) | Error::Api { .. } | Error::Http(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create OAuth provider errors
pub fn oauth_error(message: &str) -> Error {
    Error::OAuth(message.to_string())
}

/// Helper to create id token errors
pub fn id_token_error(message: &str) -> Error {
    Error::IdToken(message.to_string())
}

/// Helper to create session store errors
pub fn session_error(message: &str) -> Error {
    Error::Session(message.to_string())
}
