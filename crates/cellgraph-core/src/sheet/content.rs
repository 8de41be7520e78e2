//! Content replacement and reference reconciliation.

use log::Level;

use super::cell::{CellId, Reference};
use super::cycle::ReachSearch;
use super::log::sheet_log;
use super::state::Spreadsheet;
use crate::error::{Result, SheetError};
use cellgraph_engine::engine::{Content, Coordinate, Formula, normalize_formula};

impl Spreadsheet {
    /// Set the content of the cell at `coord`, creating it if needed, and
    /// propagate the change to every cell that reads it.
    ///
    /// A formula that would make a cell depend on itself is rejected with
    /// [`SheetError::CircularReference`] and leaves the sheet untouched.
    pub fn set_cell(&mut self, coord: Coordinate, content: impl Into<Content>) -> Result<()> {
        let content = canonical(content.into());
        let (id, created) = self.find_or_create(coord);
        let result = self.apply_content(id, content);
        if result.is_ok() || created {
            self.collect_garbage(id);
        }
        result
    }

    /// [`Spreadsheet::set_cell`] with a textual coordinate and raw user input.
    pub fn set(&mut self, coord: &str, input: &str) -> Result<()> {
        let coord = Coordinate::parse(coord)?;
        self.set_cell(coord, Content::from_input(input))
    }

    /// Create a cell on a vacant coordinate.
    pub fn add_cell(&mut self, coord: Coordinate, content: impl Into<Content>) -> Result<()> {
        if self.contains(coord) {
            return Err(SheetError::AlreadyExists(coord));
        }
        self.set_cell(coord, content)
    }

    /// Empty a cell. It stays in the sheet while other cells read it.
    pub fn clear_cell(&mut self, coord: Coordinate) -> Result<()> {
        if !self.contains(coord) {
            return Ok(());
        }
        self.set_cell(coord, Content::Empty)
    }

    /// Replace a cell's content, reconcile its outgoing references and
    /// re-evaluate it.
    pub(crate) fn apply_content(&mut self, id: CellId, content: Content) -> Result<()> {
        let coord = self.cell(id).coord;
        let formula = content
            .formula()
            .map(|text| Formula::compile(text, self.config.max_range_cells));

        let tokens = formula
            .as_ref()
            .map(|f| f.references().to_vec())
            .unwrap_or_default();
        let mut created = Vec::new();
        let mut references = Vec::with_capacity(tokens.len());
        for token in tokens {
            let (target, was_created) = self.find_or_create(token.key.coord);
            if was_created {
                created.push(target);
            }
            references.push(Reference {
                target,
                key: token.key,
                from_range: token.from_range,
            });
        }

        let previous = self.cell(id).references.clone();
        let added: Vec<Reference> = references
            .iter()
            .filter(|r| !previous.contains(r))
            .copied()
            .collect();
        let removed: Vec<Reference> = previous
            .iter()
            .filter(|r| !references.contains(r))
            .copied()
            .collect();

        let mut search = ReachSearch::new(id);
        for reference in &added {
            if reference.target == id || search.reaches_from(self, reference.target) {
                let target = self.cell(reference.target).coord;
                for fresh in created {
                    self.collect_garbage(fresh);
                }
                sheet_log!(
                    self,
                    Level::Warn,
                    "rejected content for {}: circular reference through {}",
                    coord,
                    target
                );
                return Err(SheetError::CircularReference { cell: coord, target });
            }
        }

        {
            let cell = self.cell_mut(id);
            cell.content = content;
            cell.formula = formula;
            cell.references = references;
        }
        sheet_log!(
            self,
            Level::Debug,
            "{} = {}",
            coord,
            self.cell(id).content.to_input_string()
        );

        for reference in &added {
            self.cell_mut(reference.target).observers.insert(id);
            sheet_log!(
                self,
                Level::Trace,
                "{} now reads {}",
                coord,
                self.cell(reference.target).coord
            );
        }
        for reference in &removed {
            if !self.is_live(reference.target) || self.cell(id).references_target(reference.target)
            {
                continue;
            }
            if self.cell_mut(reference.target).observers.remove(&id) {
                sheet_log!(
                    self,
                    Level::Trace,
                    "{} no longer reads {}",
                    coord,
                    self.cell(reference.target).coord
                );
            }
            self.collect_garbage(reference.target);
        }

        // Evaluation errors are kept on the cell, not returned.
        let _ = self.recompute(id);
        Ok(())
    }

    /// Re-apply a cell's current content, re-resolving its references.
    pub(crate) fn refresh_content(&mut self, id: CellId) -> Result<()> {
        let content = self.cell(id).content.clone();
        self.apply_content(id, content)
    }
}

/// Formulas built directly (not via `Content::from_input`) still get
/// canonical coordinate text.
fn canonical(content: Content) -> Content {
    match content {
        Content::Formula(text) => Content::Formula(normalize_formula(text.trim())),
        other => other,
    }
}
