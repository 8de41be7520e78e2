//! Error types for the cellgraph runner

use thiserror::Error;

/// Errors raised while reading or parsing a command script
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, RunnerError>;
