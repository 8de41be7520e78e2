//! The reactive sheet: cell storage, reference graph, propagation and
//! structural edits.

mod cell;
mod check;
mod content;
mod cycle;
mod eval;
mod log;
mod ops;
mod state;

pub use cell::{CellId, CellView, Reference, ReferenceView};
pub use check::Inconsistency;
pub use self::log::{GlobalLogger, LOG_TARGET, NopLogger};
pub use state::Spreadsheet;
