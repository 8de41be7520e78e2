//! Moves, copies and row/column insertion and deletion.

use log::Level;
use std::collections::BTreeSet;

use super::cell::CellId;
use super::log::sheet_log;
use super::state::Spreadsheet;
use crate::error::{Result, SheetError};
use cellgraph_engine::engine::{
    CellRange, Content, CoordError, Coordinate, ShiftOperation, offset_formula_references,
    rename_references, shift_formula_references,
};

/// Dimension for row/column operations
#[derive(Copy, Clone, Debug)]
enum Dimension {
    Row,
    Column,
}

impl Dimension {
    /// Position of `coord` within its line.
    fn position(&self, coord: Coordinate) -> u32 {
        match self {
            Dimension::Row => coord.col(),
            Dimension::Column => coord.row(),
        }
    }

    fn at(&self, line: u32, position: u32) -> Result<Coordinate> {
        Ok(match self {
            Dimension::Row => Coordinate::new(position, line)?,
            Dimension::Column => Coordinate::new(line, position)?,
        })
    }

    fn insert(&self, at: u32, count: u32) -> ShiftOperation {
        match self {
            Dimension::Row => ShiftOperation::InsertRows { at, count },
            Dimension::Column => ShiftOperation::InsertColumns { at, count },
        }
    }

    fn delete(&self, at: u32, count: u32) -> ShiftOperation {
        match self {
            Dimension::Row => ShiftOperation::DeleteRows { at, count },
            Dimension::Column => ShiftOperation::DeleteColumns { at, count },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Dimension::Row => "row",
            Dimension::Column => "column",
        }
    }
}

fn delta(from: Coordinate, to: Coordinate) -> (i64, i64) {
    (
        i64::from(to.col()) - i64::from(from.col()),
        i64::from(to.row()) - i64::from(from.row()),
    )
}

impl Spreadsheet {
    /// Move the cell at `from` to `to`. Formulas that read it are rewritten
    /// to follow it; the moved cell's own formula is kept as written.
    ///
    /// The destination must be vacant or hold an empty cell, whose readers
    /// are handed over to the moved cell. Moving a vacant coordinate does
    /// nothing.
    pub fn move_cell(&mut self, from: Coordinate, to: Coordinate) -> Result<()> {
        if from == to {
            return Ok(());
        }
        let Some(id) = self.find(from) else {
            sheet_log!(self, Level::Debug, "move of vacant {} ignored", from);
            return Ok(());
        };

        let displaced = self.find(to);
        let mut adopted = Vec::new();
        if let Some(dest) = displaced {
            let cell = self.cell(dest);
            if !cell.content.is_empty() {
                return Err(SheetError::Occupied(to));
            }
            adopted.extend(cell.observers.iter().copied());
        }
        for &observer in &adopted {
            if observer == id || self.reaches(id, observer) {
                let cell = self.cell(observer).coord;
                sheet_log!(
                    self,
                    Level::Warn,
                    "rejected move {} -> {}: {} would read itself",
                    from,
                    to,
                    cell
                );
                return Err(SheetError::CircularReference { cell, target: to });
            }
        }

        let observers: Vec<CellId> = self.cell(id).observers.iter().copied().collect();
        if let Some(dest) = displaced {
            self.unindex(dest, to);
        }
        self.relocate(id, to);
        sheet_log!(self, Level::Info, "moved {} -> {}", from, to);

        for &observer in &observers {
            if !self.is_live(observer) {
                continue;
            }
            let cell = self.cell(observer);
            let content = match cell.content.formula() {
                Some(text)
                    if cell
                        .references
                        .iter()
                        .any(|r| r.target == id && !r.from_range) =>
                {
                    Content::Formula(rename_references(text, from, to))
                }
                _ => cell.content.clone(),
            };
            self.apply_content(observer, content)?;
        }
        for observer in adopted {
            if observers.contains(&observer) || !self.is_live(observer) {
                continue;
            }
            self.refresh_content(observer)?;
        }
        if let Some(dest) = displaced {
            self.collect_garbage(dest);
        }
        Ok(())
    }

    /// Move a cell by a column/row offset.
    pub fn move_cell_by(&mut self, coord: Coordinate, col_delta: i64, row_delta: i64) -> Result<()> {
        let to = coord.neighbor(col_delta, row_delta)?;
        self.move_cell(coord, to)
    }

    /// Copy the content of `from` into `to`, shifting floating references
    /// by the distance between the two cells.
    pub fn copy_cell(&mut self, from: Coordinate, to: Coordinate) -> Result<()> {
        if from == to {
            return Ok(());
        }
        let content = self.copied_content(from, to)?;
        self.set_cell(to, content)
    }

    /// Copy one cell into every cell of `range` except itself.
    ///
    /// All destination formulas are computed before anything is written. A
    /// circular reference stops the copy at that destination; earlier
    /// destinations keep their new content.
    pub fn copy_cell_to_range(&mut self, from: Coordinate, range: CellRange) -> Result<()> {
        let mut planned = Vec::new();
        for dest in range.iter() {
            if dest != from {
                planned.push((dest, self.copied_content(from, dest)?));
            }
        }
        for (dest, content) in planned {
            self.set_cell(dest, content)?;
        }
        Ok(())
    }

    /// Content `from` would have if copied to `to`. A vacant source copies
    /// as empty.
    pub(crate) fn copied_content(&self, from: Coordinate, to: Coordinate) -> Result<Content> {
        let Some(id) = self.find(from) else {
            return Ok(Content::Empty);
        };
        let content = &self.cell(id).content;
        match content.formula() {
            Some(text) => {
                let (col_delta, row_delta) = delta(from, to);
                Ok(Content::Formula(offset_formula_references(
                    text, col_delta, row_delta,
                )?))
            }
            None => Ok(content.clone()),
        }
    }

    /// Insert `count` empty rows before row `at`.
    pub fn insert_rows(&mut self, at: u32, count: u32) -> Result<()> {
        self.insert_dimension(Dimension::Row, at, count)
    }

    /// Insert `count` empty columns before column `at`.
    pub fn insert_columns(&mut self, at: u32, count: u32) -> Result<()> {
        self.insert_dimension(Dimension::Column, at, count)
    }

    /// Delete `count` rows starting at row `at`.
    pub fn delete_rows(&mut self, at: u32, count: u32) -> Result<()> {
        self.delete_dimension(Dimension::Row, at, count)
    }

    /// Delete `count` columns starting at column `at`.
    pub fn delete_columns(&mut self, at: u32, count: u32) -> Result<()> {
        self.delete_dimension(Dimension::Column, at, count)
    }

    /// Move every cell of row `from` into row `to`.
    pub fn move_row(&mut self, from: u32, to: u32) -> Result<()> {
        self.move_line(Dimension::Row, from, to)
    }

    /// Move every cell of column `from` into column `to`.
    pub fn move_column(&mut self, from: u32, to: u32) -> Result<()> {
        self.move_line(Dimension::Column, from, to)
    }

    /// Copy row `from` over row `to`.
    pub fn copy_row(&mut self, from: u32, to: u32) -> Result<()> {
        self.copy_line(Dimension::Row, from, to)
    }

    /// Copy column `from` over column `to`.
    pub fn copy_column(&mut self, from: u32, to: u32) -> Result<()> {
        self.copy_line(Dimension::Column, from, to)
    }

    fn line_coordinates(&self, dim: Dimension, line: u32) -> Vec<Coordinate> {
        match dim {
            Dimension::Row => self.row_coordinates(line),
            Dimension::Column => self.column_coordinates(line),
        }
    }

    fn check_line(dim: Dimension, line: u32) -> Result<()> {
        if line == 0 {
            return Err(CoordError::IllegalCoordinate(format!("{} 0", dim.name())).into());
        }
        Ok(())
    }

    fn insert_dimension(&mut self, dim: Dimension, at: u32, count: u32) -> Result<()> {
        Self::check_line(dim, at)?;
        if count == 0 {
            return Ok(());
        }
        self.shift_structure(dim.insert(at, count))?;
        sheet_log!(self, Level::Info, "inserted {} {}(s) at {}", count, dim.name(), at);
        Ok(())
    }

    fn delete_dimension(&mut self, dim: Dimension, at: u32, count: u32) -> Result<()> {
        Self::check_line(dim, at)?;
        if count == 0 {
            return Ok(());
        }
        self.shift_structure(dim.delete(at, count))?;
        sheet_log!(self, Level::Info, "deleted {} {}(s) at {}", count, dim.name(), at);
        Ok(())
    }

    /// Relocate cells for an insertion or deletion and rewrite every formula
    /// whose references are affected.
    fn shift_structure(&mut self, op: ShiftOperation) -> Result<()> {
        let inserting = matches!(
            op,
            ShiftOperation::InsertRows { .. } | ShiftOperation::InsertColumns { .. }
        );

        let mut moves: Vec<(CellId, Coordinate)> = Vec::new();
        let mut doomed: Vec<CellId> = Vec::new();
        for id in self.live_ids() {
            let coord = self.cell(id).coord;
            match op.shift_coordinate(coord) {
                Some(to) if to != coord => moves.push((id, to)),
                Some(_) => {}
                None if inserting => {
                    let (col_delta, row_delta) = match op {
                        ShiftOperation::InsertColumns { count, .. } => (i64::from(count), 0),
                        ShiftOperation::InsertRows { count, .. } => (0, i64::from(count)),
                        _ => (0, 0),
                    };
                    return Err(CoordError::OutOfGrid {
                        origin: coord.to_string(),
                        col_delta,
                        row_delta,
                    }
                    .into());
                }
                None => doomed.push(id),
            }
        }

        let rewrites: Vec<(CellId, String)> = self
            .live_ids()
            .filter_map(|id| {
                let text = self.cell(id).content.formula()?;
                let shifted = shift_formula_references(text, op);
                (shifted != text).then_some((id, shifted))
            })
            .collect();

        for &id in &doomed {
            let coord = self.cell(id).coord;
            self.unindex(id, coord);
        }

        // Insertions move the far end first, deletions the near end first,
        // so a cell never lands on one that has not moved yet.
        moves.sort_by_key(|(id, _)| op.line_of(self.cell(*id).coord));
        if inserting {
            moves.reverse();
        }
        for (id, to) in moves {
            self.relocate(id, to);
        }

        for (id, text) in rewrites {
            if !self.is_live(id) || doomed.contains(&id) {
                continue;
            }
            self.apply_content(id, Content::Formula(text))?;
        }

        for &id in &doomed {
            if self.is_live(id) {
                self.apply_content(id, Content::Empty)?;
            }
        }
        for id in doomed {
            self.collect_garbage(id);
        }
        Ok(())
    }

    fn move_line(&mut self, dim: Dimension, from: u32, to: u32) -> Result<()> {
        Self::check_line(dim, from)?;
        Self::check_line(dim, to)?;
        if from == to {
            return Ok(());
        }

        let mut planned = Vec::new();
        for coord in self.line_coordinates(dim, from) {
            let dest = dim.at(to, dim.position(coord))?;
            if let Some(id) = self.find(dest)
                && !self.cell(id).content.is_empty()
            {
                return Err(SheetError::Occupied(dest));
            }
            planned.push((coord, dest));
        }
        for (coord, dest) in planned {
            self.move_cell(coord, dest)?;
        }
        sheet_log!(self, Level::Info, "moved {} {} -> {}", dim.name(), from, to);
        Ok(())
    }

    fn copy_line(&mut self, dim: Dimension, from: u32, to: u32) -> Result<()> {
        Self::check_line(dim, from)?;
        Self::check_line(dim, to)?;
        if from == to {
            return Ok(());
        }

        let positions: BTreeSet<u32> = self
            .line_coordinates(dim, from)
            .into_iter()
            .chain(self.line_coordinates(dim, to))
            .map(|coord| dim.position(coord))
            .collect();

        let mut planned = Vec::new();
        for position in positions {
            let source = dim.at(from, position)?;
            let dest = dim.at(to, position)?;
            planned.push((dest, self.copied_content(source, dest)?));
        }
        for (dest, content) in planned {
            self.set_cell(dest, content)?;
        }
        sheet_log!(self, Level::Info, "copied {} {} -> {}", dim.name(), from, to);
        Ok(())
    }
}
