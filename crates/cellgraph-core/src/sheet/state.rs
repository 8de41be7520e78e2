use chrono::{DateTime, Local};
use log::Level;
use std::collections::{BTreeMap, HashMap};

use super::cell::{Cell, CellId, CellView, ReferenceView};
use super::log::{SheetLog, sheet_log};
use crate::config::SheetConfig;
use crate::error::{Result, SheetError};
use cellgraph_engine::builtins::{Arg, FunctionRegistry};
use cellgraph_engine::engine::{Coordinate, EvalError, Value};

/// A reactive spreadsheet: owns every cell and the graph between them.
///
/// Cells live in an arena addressed by [`CellId`]. Three indices map
/// coordinates, columns and rows to cells and are kept in step with each
/// cell's own coordinate.
#[derive(Debug)]
pub struct Spreadsheet {
    pub(crate) cells: Vec<Option<Cell>>,
    pub(crate) by_coord: HashMap<Coordinate, CellId>,
    /// column -> row -> cell
    pub(crate) by_col: BTreeMap<u32, BTreeMap<u32, CellId>>,
    /// row -> column -> cell
    pub(crate) by_row: BTreeMap<u32, BTreeMap<u32, CellId>>,
    pub(crate) functions: FunctionRegistry,
    pub(crate) config: SheetConfig,
    pub(crate) log: SheetLog,
    /// Logical clock stamped on every evaluation.
    pub(crate) clock: u64,
}

impl Spreadsheet {
    /// Create an empty sheet with the builtin functions and no logging.
    pub fn new() -> Self {
        Spreadsheet::with_config(SheetConfig::default())
    }

    pub fn with_config(config: SheetConfig) -> Self {
        Spreadsheet {
            cells: Vec::new(),
            by_coord: HashMap::new(),
            by_col: BTreeMap::new(),
            by_row: BTreeMap::new(),
            functions: FunctionRegistry::with_builtins(),
            config,
            log: SheetLog::default(),
            clock: 0,
        }
    }

    /// Replace the log sink.
    pub fn with_logger(mut self, logger: Box<dyn log::Log>) -> Self {
        self.set_logger(logger);
        self
    }

    pub fn set_logger(&mut self, logger: Box<dyn log::Log>) {
        self.log = SheetLog::new(logger);
    }

    /// Make a function available to formulas. Existing cells are not
    /// re-evaluated.
    pub fn register_function<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[Arg]) -> std::result::Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.functions.register(name, func);
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    pub(crate) fn cell(&self, id: CellId) -> &Cell {
        match &self.cells[id.0] {
            Some(cell) => cell,
            None => unreachable!("cell {:?} used after collection", id),
        }
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        match &mut self.cells[id.0] {
            Some(cell) => cell,
            None => unreachable!("cell {:?} used after collection", id),
        }
    }

    pub(crate) fn is_live(&self, id: CellId) -> bool {
        matches!(self.cells.get(id.0), Some(Some(_)))
    }

    pub(crate) fn find(&self, coord: Coordinate) -> Option<CellId> {
        self.by_coord.get(&coord).copied()
    }

    pub(crate) fn find_or_create(&mut self, coord: Coordinate) -> (CellId, bool) {
        if let Some(id) = self.find(coord) {
            return (id, false);
        }
        let id = CellId(self.cells.len());
        self.cells.push(Some(Cell::new(coord)));
        self.index(id, coord);
        sheet_log!(self, Level::Trace, "created cell {}", coord);
        (id, true)
    }

    pub(crate) fn index(&mut self, id: CellId, coord: Coordinate) {
        self.by_coord.insert(coord, id);
        self.by_col
            .entry(coord.col())
            .or_default()
            .insert(coord.row(), id);
        self.by_row
            .entry(coord.row())
            .or_default()
            .insert(coord.col(), id);
    }

    /// Drop index entries for `id` at `coord`, leaving entries that now
    /// belong to another cell alone.
    pub(crate) fn unindex(&mut self, id: CellId, coord: Coordinate) {
        if self.by_coord.get(&coord) != Some(&id) {
            return;
        }
        self.by_coord.remove(&coord);
        if let Some(rows) = self.by_col.get_mut(&coord.col()) {
            rows.remove(&coord.row());
            if rows.is_empty() {
                self.by_col.remove(&coord.col());
            }
        }
        if let Some(cols) = self.by_row.get_mut(&coord.row()) {
            cols.remove(&coord.col());
            if cols.is_empty() {
                self.by_row.remove(&coord.row());
            }
        }
    }

    /// Re-key a cell under a new coordinate in all three indices.
    pub(crate) fn relocate(&mut self, id: CellId, to: Coordinate) {
        let from = self.cell(id).coord;
        self.unindex(id, from);
        self.cell_mut(id).coord = to;
        self.index(id, to);
    }

    /// Physically drop a cell once it is empty and unobserved.
    pub(crate) fn collect_garbage(&mut self, id: CellId) -> bool {
        if !self.is_live(id) || !self.cell(id).is_collectable() {
            return false;
        }
        let coord = self.cell(id).coord;
        self.unindex(id, coord);
        self.cells[id.0] = None;
        sheet_log!(self, Level::Trace, "collected cell {}", coord);
        true
    }

    pub(crate) fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub(crate) fn live_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_some())
            .map(|(i, _)| CellId(i))
    }

    /// Number of cells currently held, including empty cells kept alive
    /// because other cells read them.
    pub fn cell_count(&self) -> usize {
        self.by_coord.len()
    }

    /// Coordinates of all held cells in row-major order.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.by_row
            .values()
            .flat_map(|cols| cols.values().map(|id| self.cell(*id).coord))
            .collect()
    }

    /// Largest column and row holding a cell.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        let max_col = *self.by_col.keys().next_back()?;
        let max_row = *self.by_row.keys().next_back()?;
        Some((max_col, max_row))
    }

    /// Coordinates of the cells held in one row, ordered by column.
    pub fn row_coordinates(&self, row: u32) -> Vec<Coordinate> {
        self.by_row
            .get(&row)
            .map(|cols| cols.values().map(|id| self.cell(*id).coord).collect())
            .unwrap_or_default()
    }

    /// Coordinates of the cells held in one column, ordered by row.
    pub fn column_coordinates(&self, col: u32) -> Vec<Coordinate> {
        self.by_col
            .get(&col)
            .map(|rows| rows.values().map(|id| self.cell(*id).coord).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        self.by_coord.contains_key(&coord)
    }

    /// Snapshot of the cell at `coord`. A vacant coordinate reads as empty.
    pub fn get_cell(&self, coord: Coordinate) -> CellView {
        match self.find(coord) {
            Some(id) => CellView::of(self.cell(id)),
            None => CellView::vacant(coord),
        }
    }

    /// [`Spreadsheet::get_cell`] with a textual coordinate.
    pub fn get(&self, coord: &str) -> Result<CellView> {
        Ok(self.get_cell(Coordinate::parse(coord)?))
    }

    /// Evaluated value of a cell. Vacant cells are empty.
    pub fn value(&self, coord: Coordinate) -> std::result::Result<Value, EvalError> {
        match self.find(coord).and_then(|id| self.cell(id).outcome.clone()) {
            Some(outcome) => outcome,
            None => Ok(Value::Empty),
        }
    }

    /// Like [`Spreadsheet::value`], with cell errors lifted into [`SheetError`].
    pub fn evaluate(&self, coord: Coordinate) -> Result<Value> {
        self.value(coord)
            .map_err(|source| SheetError::Evaluation { cell: coord, source })
    }

    pub fn last_evaluated_at(&self, coord: Coordinate) -> Option<DateTime<Local>> {
        self.find(coord).and_then(|id| self.cell(id).evaluated_on)
    }

    /// Outgoing references of the cell at `coord`, in formula order.
    pub fn references_of(&self, coord: Coordinate) -> Vec<ReferenceView> {
        let Some(id) = self.find(coord) else {
            return Vec::new();
        };
        self.cell(id)
            .references
            .iter()
            .map(|r| ReferenceView {
                target: self.cell(r.target).coord,
                anchored_col: r.anchored_col(),
                anchored_row: r.anchored_row(),
                from_range: r.from_range,
            })
            .collect()
    }

    /// Cells whose formulas read the cell at `coord`.
    pub fn observers_of(&self, coord: Coordinate) -> Vec<Coordinate> {
        let Some(id) = self.find(coord) else {
            return Vec::new();
        };
        let mut coords: Vec<Coordinate> = self
            .cell(id)
            .observers
            .iter()
            .map(|o| self.cell(*o).coord)
            .collect();
        coords.sort_by_key(|c| (c.row(), c.col()));
        coords
    }
}

impl Default for Spreadsheet {
    fn default() -> Self {
        Self::new()
    }
}
