use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Authentication error: {0}")]
    #[diagnostic(code(weektab::auth), help("sign in again or set GOOGLE_ACCESS_TOKEN"))]
    Auth(String),

    #[error("Fetch error: {0}")]
    #[diagnostic(code(weektab::fetch))]
    Fetch(String),

    #[error("{context}: HTTP {status} - {body}")]
    #[diagnostic(code(weektab::http_status))]
    HttpStatus {
        context: String,
        status: u16,
        body: String,
    },

    #[error("Environment error: {0}")]
    #[diagnostic(code(weektab::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(weektab::config))]
    Config(String),

    #[error("Template error: {0}")]
    #[diagnostic(code(weektab::template))]
    Template(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(weektab::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(weektab::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(weektab::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(weektab::other))]
    Other(String),
}

impl Error {
    /// True for any failure talking to the calendar API, status or transport
    pub fn is_fetch(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::HttpStatus { .. })
    }

    /// True when the API rejected the bearer token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::HttpStatus { status: 401, .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Fetch(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<askama::Error> for Error {
    fn from(err: askama::Error) -> Self {
        Error::Template(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type TabResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create authentication errors
pub fn auth_error(message: &str) -> Error {
    Error::Auth(message.to_string())
}

/// Helper to create fetch errors
pub fn fetch_error(message: &str) -> Error {
    Error::Fetch(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
