//! Error types for the geektime-downloader application.

use std::io;

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // API errors
    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Product {0} has not been purchased")]
    AccessDenied(i64),

    // Download errors
    #[error("{engine} failed for '{item}': {source}")]
    Engine {
        engine: &'static str,
        item: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Rendering session error: {0}")]
    Session(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("M3U8 processing error: {0}")]
    M3U8(String),

    // External tool errors
    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("FFmpeg not found. Please install ffmpeg and ensure it's in your PATH.")]
    FFmpegNotFound,

    #[error("Interrupted")]
    Cancelled,

    #[error("Prompt error: {0}")]
    Prompt(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // WebSocket errors (boxed to reduce enum size)
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a validation failure on a named field.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Attribute a failure to a content engine working on `item`.
    ///
    /// Cancellation passes through untouched so callers can still tell an
    /// interrupt apart from a real engine failure.
    pub fn in_engine(self, engine: &'static str, item: &str) -> Self {
        match self {
            Error::Cancelled => Error::Cancelled,
            source => Error::Engine {
                engine,
                item: item.to_string(),
                source: Box::new(source),
            },
        }
    }

    /// Whether this error stems from an interrupt.
    pub fn is_cancellation(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Engine { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            _ if self.is_cancellation() => exit_codes::SUCCESS,
            Error::Validation { .. } | Error::Config(_) | Error::TomlParse(_) => {
                exit_codes::CONFIG_ERROR
            }
            Error::Authentication(_) => exit_codes::AUTH_ERROR,
            Error::Api(_) | Error::AccessDenied(_) | Error::Http(_) | Error::Json(_) => {
                exit_codes::API_ERROR
            }
            Error::Engine { .. }
            | Error::Session(_)
            | Error::Download(_)
            | Error::M3U8(_)
            | Error::FFmpeg(_)
            | Error::FFmpegNotFound => exit_codes::DOWNLOAD_ERROR,
            _ => exit_codes::UNEXPECTED_ERROR,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        // Ctrl+C inside a raw-mode prompt surfaces as an interrupted read.
        #[allow(unreachable_patterns)]
        match err {
            dialoguer::Error::IO(e) if e.kind() == io::ErrorKind::Interrupted => Error::Cancelled,
            dialoguer::Error::IO(e) => Error::Prompt(e.to_string()),
            other => Error::Prompt(other.to_string()),
        }
    }
}

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const API_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const AUTH_ERROR: i32 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_wrapping_keeps_cancellation() {
        let err = Error::Cancelled.in_engine("audio", "Intro");
        assert!(matches!(err, Error::Cancelled));

        let err = Error::Download("HTTP 500".into()).in_engine("audio", "Intro");
        assert!(matches!(err, Error::Engine { engine: "audio", .. }));
        assert!(err.to_string().contains("Intro"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::Cancelled.exit_code(), exit_codes::SUCCESS);
        assert_eq!(
            Error::validation("output", "out of range").exit_code(),
            exit_codes::CONFIG_ERROR
        );
        assert_eq!(
            Error::Authentication("expired".into()).exit_code(),
            exit_codes::AUTH_ERROR
        );
        assert_eq!(
            Error::Download("boom".into())
                .in_engine("document", "Intro")
                .exit_code(),
            exit_codes::DOWNLOAD_ERROR
        );
    }

    #[test]
    fn test_interrupted_prompt_is_cancellation() {
        let err: Error =
            dialoguer::Error::IO(io::Error::new(io::ErrorKind::Interrupted, "read interrupted"))
                .into();
        assert!(err.is_cancellation());
    }
}
