use chrono::{DateTime, Local};
use std::collections::BTreeSet;

use cellgraph_engine::engine::{AnchoredRef, Content, Coordinate, EvalError, Formula, Value};

/// Stable handle of a cell in the sheet's arena. Never reused.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CellId(pub(crate) usize);

/// An outgoing edge from a formula cell to a cell it reads.
#[derive(Clone, Copy, Debug)]
pub struct Reference {
    pub target: CellId,
    /// The token as written, including its anchoring markers.
    pub key: AnchoredRef,
    pub from_range: bool,
}

impl Reference {
    pub fn anchored_col(&self) -> bool {
        self.key.anchored_col
    }

    pub fn anchored_row(&self) -> bool {
        self.key.anchored_row
    }
}

/// Identity is the target plus the anchoring and origin flags. The written
/// coordinate follows the target and does not take part.
impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.key.anchored_col == other.key.anchored_col
            && self.key.anchored_row == other.key.anchored_row
            && self.from_range == other.from_range
    }
}

impl Eq for Reference {}

#[derive(Debug)]
pub(crate) struct Cell {
    pub(crate) coord: Coordinate,
    pub(crate) content: Content,
    pub(crate) formula: Option<Formula>,
    pub(crate) references: Vec<Reference>,
    pub(crate) observers: BTreeSet<CellId>,
    /// Last evaluation result, `None` until first evaluated.
    pub(crate) outcome: Option<Result<Value, EvalError>>,
    /// Logical time of the last evaluation.
    pub(crate) evaluated_at: u64,
    pub(crate) evaluated_on: Option<DateTime<Local>>,
    /// Largest `evaluated_at` seen among referenced cells.
    pub(crate) max_reference_stamp: u64,
    pub(crate) evaluations: u64,
}

impl Cell {
    pub(crate) fn new(coord: Coordinate) -> Self {
        Cell {
            coord,
            content: Content::Empty,
            formula: None,
            references: Vec::new(),
            observers: BTreeSet::new(),
            outcome: None,
            evaluated_at: 0,
            evaluated_on: None,
            max_reference_stamp: 0,
            evaluations: 0,
        }
    }

    pub(crate) fn is_formula(&self) -> bool {
        self.content.is_formula()
    }

    /// Safe to drop: no content and nobody reading it.
    pub(crate) fn is_collectable(&self) -> bool {
        self.content.is_empty() && self.observers.is_empty() && self.references.is_empty()
    }

    pub(crate) fn references_target(&self, target: CellId) -> bool {
        self.references.iter().any(|r| r.target == target)
    }
}

/// Read-only snapshot of a cell for callers outside the sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct CellView {
    pub coord: Coordinate,
    /// Content as it would be typed back in (`=` prefix for formulas).
    pub content: String,
    /// Display form of the value, or the error description.
    pub value: String,
    pub is_formula: bool,
    pub is_valid: bool,
    pub error: Option<EvalError>,
    pub last_evaluated_at: Option<DateTime<Local>>,
    pub evaluation_count: u64,
}

impl CellView {
    pub(crate) fn vacant(coord: Coordinate) -> Self {
        CellView {
            coord,
            content: String::new(),
            value: String::new(),
            is_formula: false,
            is_valid: true,
            error: None,
            last_evaluated_at: None,
            evaluation_count: 0,
        }
    }

    pub(crate) fn of(cell: &Cell) -> Self {
        let (value, error) = match &cell.outcome {
            Some(Ok(value)) => (value.to_string(), None),
            Some(Err(err)) => (err.to_string(), Some(err.clone())),
            None => (String::new(), None),
        };
        CellView {
            coord: cell.coord,
            content: cell.content.to_input_string(),
            value,
            is_formula: cell.is_formula(),
            is_valid: error.is_none(),
            error,
            last_evaluated_at: cell.evaluated_on,
            evaluation_count: cell.evaluations,
        }
    }
}

/// A reference as seen from outside the sheet, with the target's current coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceView {
    pub target: Coordinate,
    pub anchored_col: bool,
    pub anchored_row: bool,
    pub from_range: bool,
}
