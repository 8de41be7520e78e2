//! Error types for coordinates, formula parsing and formula evaluation.

use thiserror::Error;

/// Errors raised while parsing or moving coordinates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordError {
    #[error("Illegal coordinate: {0}")]
    IllegalCoordinate(String),

    #[error("Coordinate {origin} shifted by ({col_delta}, {row_delta}) leaves the grid")]
    OutOfGrid {
        origin: String,
        col_delta: i64,
        row_delta: i64,
    },
}

/// Syntax error in formula text.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

/// Failure of a single cell evaluation.
///
/// These are stored on the cell as its result and compared like values, so a
/// cell whose error does not change does not wake its observers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("#SYNTAX! {0}")]
    Syntax(String),

    #[error("#DIV/0!")]
    DivideByZero,

    #[error("#VALUE! {0}")]
    Value(String),

    #[error("#NAME? unknown function `{0}`")]
    UnknownFunction(String),

    #[error("#REF!")]
    InvalidReference,

    #[error("#REF! referenced cell {cell} is in error")]
    Reference { cell: String },

    #[error("#ERROR! {name}: {message}")]
    Function { name: String, message: String },

    #[error("#RANGE! {range} spans more than {limit} cells")]
    RangeTooLarge { range: String, limit: usize },
}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        EvalError::Syntax(err.message)
    }
}
