//! Formula engine API.
//!
//! This module provides everything needed to turn cell text into values,
//! without any knowledge of the dependency graph:
//!
//! - [`Coordinate`], [`AnchoredRef`], [`CellRange`] - Addressing (A1 notation)
//! - [`Content`] - Raw cell content parsed from user input
//! - [`Formula`] - Parsed formula plus the references it reads
//! - [`extract_references`] - Reference extraction from an expression tree
//! - [`shift_formula_references`], [`offset_formula_references`],
//!   [`rename_references`] - Formula text rewriting for structural edits
//! - [`Value`], [`format_number`] - Evaluated values and their display form

mod ast;
mod cell;
mod cell_ref;
mod deps;
mod error;
mod eval;
mod lexer;
mod parser;
mod preprocess;
mod range;
mod value;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use cell::Content;
pub use cell_ref::{AnchoredRef, Coordinate, column_index, column_name};
pub use deps::{MAX_DEPENDENCY_RANGE_CELLS, RefToken, extract_references};
pub use error::{CoordError, EvalError, ParseError};
pub use eval::{Bindings, Formula};
pub use parser::{MAX_NESTING, parse};
pub use preprocess::{
    ShiftOperation, normalize_formula, offset_formula_references, rename_references,
    shift_formula_references,
};
pub use range::{CellRange, expand_range};
pub use value::{Value, format_number};
