//! cellgraph-core - Reactive spreadsheet model built on the formula engine.

pub mod config;
pub mod error;
pub mod sheet;

pub use config::SheetConfig;
pub use error::{Result, SheetError};
pub use sheet::{CellView, GlobalLogger, Inconsistency, NopLogger, ReferenceView, Spreadsheet};

pub use cellgraph_engine::engine::{CellRange, Content, Coordinate, Value};
