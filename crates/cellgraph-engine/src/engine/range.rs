//! Rectangular cell ranges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::cell_ref::{AnchoredRef, Coordinate};
use super::error::CoordError;

/// A rectangle of cells, always stored with normalised corners.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRange {
    top_left: Coordinate,
    bottom_right: Coordinate,
}

impl CellRange {
    /// Build a range from any two opposite corners.
    pub fn new(a: Coordinate, b: Coordinate) -> Self {
        CellRange {
            top_left: Coordinate::from_parts(a.col().min(b.col()), a.row().min(b.row())),
            bottom_right: Coordinate::from_parts(a.col().max(b.col()), a.row().max(b.row())),
        }
    }

    pub fn single(coord: Coordinate) -> Self {
        CellRange::new(coord, coord)
    }

    /// Parse `A1:B3`. Anchoring markers on either corner are accepted.
    pub fn parse(text: &str) -> Result<CellRange, CoordError> {
        let (start, end) = text
            .split_once(':')
            .ok_or_else(|| CoordError::IllegalCoordinate(text.to_string()))?;
        let start = AnchoredRef::parse(start.trim())?;
        let end = AnchoredRef::parse(end.trim())?;
        Ok(CellRange::new(start.coord, end.coord))
    }

    pub fn top_left(&self) -> Coordinate {
        self.top_left
    }

    pub fn bottom_right(&self) -> Coordinate {
        self.bottom_right
    }

    pub fn columns(&self) -> u32 {
        self.bottom_right.col() - self.top_left.col() + 1
    }

    pub fn rows(&self) -> u32 {
        self.bottom_right.row() - self.top_left.row() + 1
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.columns()) * u64::from(self.rows())
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        (self.top_left.col()..=self.bottom_right.col()).contains(&coord.col())
            && (self.top_left.row()..=self.bottom_right.row()).contains(&coord.row())
    }

    /// Row-major coordinate iterator.
    pub fn iter(&self) -> impl Iterator<Item = Coordinate> + '_ {
        let (c0, c1) = (self.top_left.col(), self.bottom_right.col());
        (self.top_left.row()..=self.bottom_right.row())
            .flat_map(move |row| (c0..=c1).map(move |col| Coordinate::from_parts(col, row)))
    }

    /// Ordered matrix of coordinates, one inner vector per row.
    pub fn expand(&self) -> Vec<Vec<Coordinate>> {
        (self.top_left.row()..=self.bottom_right.row())
            .map(|row| {
                (self.top_left.col()..=self.bottom_right.col())
                    .map(|col| Coordinate::from_parts(col, row))
                    .collect()
            })
            .collect()
    }
}

/// Expand the rectangle spanned by two corners in row-major order.
pub fn expand_range(a: Coordinate, b: Coordinate) -> Vec<Vec<Coordinate>> {
    CellRange::new(a, b).expand()
}

impl FromStr for CellRange {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRange::parse(s)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.top_left, self.bottom_right)
    }
}
