// CLI module for oggframe
//
// Command-line front end over the library: stream copy, page listing and
// per-file summaries. Compiled into the binary only.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config};
pub use output::OutputFormatter;

// Error type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub enum CliError {
    FileNotFound(String),
    InvalidPattern(String),
    IoError(std::io::Error),
    Ogg(oggframe::OggError),
    ParseError(String),
    Other(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::FileNotFound(path) => write!(f, "File not found: {}", path),
            CliError::InvalidPattern(msg) => write!(f, "Invalid pattern: {}", msg),
            CliError::IoError(e) => write!(f, "I/O error: {}", e),
            CliError::Ogg(e) => write!(f, "Ogg error: {}", e),
            CliError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            CliError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::IoError(e) => Some(e),
            CliError::Ogg(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::IoError(e)
    }
}

impl From<oggframe::OggError> for CliError {
    fn from(e: oggframe::OggError) -> Self {
        CliError::Ogg(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::ParseError(e.to_string())
    }
}

impl From<glob::PatternError> for CliError {
    fn from(e: glob::PatternError) -> Self {
        CliError::InvalidPattern(e.to_string())
    }
}
