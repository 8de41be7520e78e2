//! Error types for the cellgraph sheet model.

use thiserror::Error;

use cellgraph_engine::engine::{CoordError, Coordinate, EvalError};

/// Errors returned by spreadsheet operations.
///
/// A failed operation leaves the sheet as it was before the call, except for
/// multi-cell copies and line moves, which stop at the failing cell.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    #[error(transparent)]
    IllegalCoordinate(#[from] CoordError),

    #[error("Circular reference: {cell} would depend on itself through {target}")]
    CircularReference { cell: Coordinate, target: Coordinate },

    #[error("Cell {0} already exists")]
    AlreadyExists(Coordinate),

    #[error("Cell {0} is occupied")]
    Occupied(Coordinate),

    #[error("Cell {cell} is in error: {source}")]
    Evaluation { cell: Coordinate, source: EvalError },
}

pub type Result<T> = std::result::Result<T, SheetError>;
