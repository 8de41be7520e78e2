//! Lazy, memoised evaluation with change-gated propagation.
//!
//! A cell is recomputed when its content changes, or when a referenced cell
//! re-evaluated after it did. Observers are only woken when the new result
//! differs from the previous one. Propagation runs off an explicit worklist,
//! so chain length is not limited by the call stack.

use chrono::Local;
use log::Level;

use super::cell::CellId;
use super::log::sheet_log;
use super::state::Spreadsheet;
use cellgraph_engine::engine::{Bindings, EvalError, Value};

impl Spreadsheet {
    /// Current result of a cell.
    ///
    /// Without `force` a cached result is returned as is. With `force` a
    /// formula cell is recomputed only if one of its references was
    /// evaluated more recently than the cell itself.
    pub(crate) fn eval_cell(&mut self, id: CellId, force: bool) -> Result<Value, EvalError> {
        let outdated = force && self.is_outdated(id);
        if !outdated && let Some(outcome) = &self.cell(id).outcome {
            return outcome.clone();
        }
        self.recompute(id)
    }

    /// Evaluate a cell unconditionally, then bring every cell downstream of
    /// it up to date.
    ///
    /// Woken observers are visited depth first in observer order; each one
    /// is checked against the logical clock when it comes off the worklist.
    pub(crate) fn recompute(&mut self, id: CellId) -> Result<Value, EvalError> {
        let (outcome, changed) = self.evaluate_once(id);
        let mut pending = Vec::new();
        if changed {
            self.wake_observers(id, &mut pending);
        }

        while let Some(next) = pending.pop() {
            if !self.is_live(next) {
                continue;
            }
            if self.cell(next).outcome.is_some() && !self.is_outdated(next) {
                continue;
            }
            if self.evaluate_once(next).1 {
                self.wake_observers(next, &mut pending);
            }
        }
        outcome
    }

    fn is_outdated(&self, id: CellId) -> bool {
        let cell = self.cell(id);
        cell.is_formula() && cell.max_reference_stamp > cell.evaluated_at
    }

    /// Compute and store one cell's result. The flag is set when a previous
    /// result existed and differs from the new one.
    fn evaluate_once(&mut self, id: CellId) -> (Result<Value, EvalError>, bool) {
        let outcome = self.compute(id);
        let stamp = self.tick();

        let cell = self.cell_mut(id);
        let previous = cell.outcome.replace(outcome.clone());
        cell.evaluated_at = stamp;
        cell.evaluated_on = Some(Local::now());
        cell.evaluations += 1;
        let coord = cell.coord;
        let observers: Vec<CellId> = cell.observers.iter().copied().collect();

        for observer in observers {
            let observer = self.cell_mut(observer);
            observer.max_reference_stamp = observer.max_reference_stamp.max(stamp);
        }

        sheet_log!(self, Level::Trace, "evaluated {} -> {:?}", coord, outcome);
        let changed = previous.is_some_and(|p| p != outcome);
        (outcome, changed)
    }

    /// Queue a cell's live observers so the first one is taken next.
    fn wake_observers(&self, id: CellId, pending: &mut Vec<CellId>) {
        let cell = self.cell(id);
        for &observer in cell.observers.iter().rev() {
            if !self.is_live(observer) {
                continue;
            }
            sheet_log!(
                self,
                Level::Trace,
                "{} changed, waking {}",
                cell.coord,
                self.cell(observer).coord
            );
            pending.push(observer);
        }
    }

    fn compute(&mut self, id: CellId) -> Result<Value, EvalError> {
        let cell = self.cell(id);
        let Some(formula) = cell.formula.clone() else {
            return Ok(cell.content.scalar_value());
        };
        if let Some(err) = formula.error() {
            return Err(err.clone());
        }

        let references: Vec<(CellId, _)> = cell
            .references
            .iter()
            .map(|r| (r.target, r.key.coord))
            .collect();
        let mut bindings = Bindings::new();
        let mut failed = None;
        for (target, coord) in references {
            match self.eval_cell(target, false) {
                Ok(value) => bindings.insert(coord, value),
                Err(_) => {
                    failed.get_or_insert(coord);
                }
            }
        }
        if let Some(coord) = failed {
            return Err(EvalError::Reference {
                cell: coord.to_string(),
            });
        }

        formula.evaluate(&bindings, &self.functions)
    }
}
