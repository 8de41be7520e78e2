//! Structural self-check of the cell graph.

use thiserror::Error;

use super::cell::Reference;
use super::state::Spreadsheet;
use cellgraph_engine::engine::{AnchoredRef, Coordinate, Formula};

/// First broken invariant found by [`Spreadsheet::check_consistency`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    #[error("{cell} reads {target} but is not among its observers")]
    MissingObserver { cell: Coordinate, target: Coordinate },

    #[error("{observer} is listed as observing {cell} but does not read it")]
    StrayObserver { cell: Coordinate, observer: Coordinate },

    #[error("{cell} holds a reference to a collected cell")]
    DanglingReference { cell: Coordinate },

    #[error("references of {cell} do not match its formula")]
    StaleReferences { cell: Coordinate },

    #[error("{cell} has no formula but holds references")]
    ScalarWithReferences { cell: Coordinate },

    #[error("index entry at column {col}, row {row} disagrees with the cell stored there")]
    IndexMismatch { col: u32, row: u32 },

    #[error("circular reference through {cells:?}")]
    Cycle { cells: Vec<Coordinate> },
}

impl Spreadsheet {
    /// Verify the graph invariants: indices agree with cell coordinates,
    /// references match each formula, observer sets mirror references, and
    /// there is no cycle.
    pub fn check_consistency(&self) -> Result<(), Inconsistency> {
        self.check_indices()?;

        for id in self.live_ids() {
            let cell = self.cell(id);
            let coord = cell.coord;

            let Some(text) = cell.content.formula() else {
                if !cell.references.is_empty() {
                    return Err(Inconsistency::ScalarWithReferences { cell: coord });
                }
                continue;
            };

            for reference in &cell.references {
                if !self.is_live(reference.target) {
                    return Err(Inconsistency::DanglingReference { cell: coord });
                }
                if !self.cell(reference.target).observers.contains(&id) {
                    return Err(Inconsistency::MissingObserver {
                        cell: coord,
                        target: self.cell(reference.target).coord,
                    });
                }
            }

            let expected = Formula::compile(text, self.config.max_range_cells);
            let matches = expected.references().len() == cell.references.len()
                && expected
                    .references()
                    .iter()
                    .zip(&cell.references)
                    .all(|(token, reference)| self.token_matches(token.key, token.from_range, reference));
            if !matches {
                return Err(Inconsistency::StaleReferences { cell: coord });
            }
        }

        for id in self.live_ids() {
            let cell = self.cell(id);
            for &observer in &cell.observers {
                if !self.is_live(observer) || !self.cell(observer).references_target(id) {
                    let observer = if self.is_live(observer) {
                        self.cell(observer).coord
                    } else {
                        cell.coord
                    };
                    return Err(Inconsistency::StrayObserver {
                        cell: cell.coord,
                        observer,
                    });
                }
            }
        }

        if let Some(cycle) = self.find_cycle() {
            return Err(Inconsistency::Cycle {
                cells: cycle.into_iter().map(|id| self.cell(id).coord).collect(),
            });
        }
        Ok(())
    }

    /// [`Spreadsheet::check_consistency`] as a plain flag.
    pub fn consistent_check(&self) -> bool {
        self.check_consistency().is_ok()
    }

    fn token_matches(
        &self,
        key: AnchoredRef,
        from_range: bool,
        reference: &Reference,
    ) -> bool {
        self.cell(reference.target).coord == key.coord
            && reference.key.coord == key.coord
            && reference.anchored_col() == key.anchored_col
            && reference.anchored_row() == key.anchored_row
            && reference.from_range == from_range
    }

    fn check_indices(&self) -> Result<(), Inconsistency> {
        for id in self.live_ids() {
            let coord = self.cell(id).coord;
            let indexed = self.find(coord) == Some(id)
                && self.by_col.get(&coord.col()).and_then(|rows| rows.get(&coord.row())) == Some(&id)
                && self.by_row.get(&coord.row()).and_then(|cols| cols.get(&coord.col())) == Some(&id);
            if !indexed {
                return Err(Inconsistency::IndexMismatch {
                    col: coord.col(),
                    row: coord.row(),
                });
            }
        }

        let entries = self
            .by_coord
            .iter()
            .map(|(coord, id)| (coord.col(), coord.row(), *id))
            .chain(self.by_col.iter().flat_map(|(&col, rows)| {
                rows.iter().map(move |(&row, &id)| (col, row, id))
            }))
            .chain(self.by_row.iter().flat_map(|(&row, cols)| {
                cols.iter().map(move |(&col, &id)| (col, row, id))
            }));
        for (col, row, id) in entries {
            let stored = self.is_live(id).then(|| self.cell(id).coord);
            if stored.is_none_or(|c| c.col() != col || c.row() != row) {
                return Err(Inconsistency::IndexMismatch { col, row });
            }
        }
        Ok(())
    }
}
