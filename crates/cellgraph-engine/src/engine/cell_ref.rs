//! Cell coordinates and anchored reference tokens.
//!
//! Provides bidirectional conversion between spreadsheet-style addresses
//! (e.g. "A1", "$B$2", "AA100") and 1-based column/row pairs.
//!
//! A [`Coordinate`] never carries anchoring. The `$` markers belong to the
//! [`AnchoredRef`] token that appears in formula text.
//!
//! # Examples
//!
//! ```ignore
//! let coord = Coordinate::parse("b3").unwrap();
//! assert_eq!(coord.col(), 2);
//! assert_eq!(coord.row(), 3);
//! assert_eq!(coord.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use super::error::CoordError;

/// A cell position by 1-based column and row.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "CoordinateParts")]
pub struct Coordinate {
    col: u32,
    row: u32,
}

/// Unchecked wire form of [`Coordinate`].
#[derive(Deserialize)]
struct CoordinateParts {
    col: u32,
    row: u32,
}

impl TryFrom<CoordinateParts> for Coordinate {
    type Error = CoordError;

    fn try_from(parts: CoordinateParts) -> Result<Self, Self::Error> {
        Coordinate::new(parts.col, parts.row)
    }
}

impl Coordinate {
    /// Build a coordinate from 1-based column and row numbers.
    pub fn new(col: u32, row: u32) -> Result<Coordinate, CoordError> {
        if col == 0 || row == 0 {
            return Err(CoordError::IllegalCoordinate(format!(
                "column {}, row {}",
                col, row
            )));
        }
        Ok(Coordinate { col, row })
    }

    /// Callers guarantee both axes are >= 1.
    pub(crate) const fn from_parts(col: u32, row: u32) -> Coordinate {
        Coordinate { col, row }
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    /// Parse `[$]letters[$]digits`, case-insensitive. Anchoring markers are
    /// accepted and dropped.
    pub fn parse(text: &str) -> Result<Coordinate, CoordError> {
        AnchoredRef::parse(text).map(|r| r.coord)
    }

    pub fn column_name(&self) -> String {
        column_name(self.col)
    }

    /// The coordinate `col_delta` columns right and `row_delta` rows down.
    pub fn neighbor(&self, col_delta: i64, row_delta: i64) -> Result<Coordinate, CoordError> {
        let out_of_grid = || CoordError::OutOfGrid {
            origin: self.to_string(),
            col_delta,
            row_delta,
        };
        let col = shift_axis(self.col, col_delta).ok_or_else(out_of_grid)?;
        let row = shift_axis(self.row, row_delta).ok_or_else(out_of_grid)?;
        Ok(Coordinate { col, row })
    }

    pub fn with_col(&self, col: u32) -> Result<Coordinate, CoordError> {
        Coordinate::new(col, self.row)
    }

    pub fn with_row(&self, row: u32) -> Result<Coordinate, CoordError> {
        Coordinate::new(self.col, row)
    }
}

fn shift_axis(value: u32, delta: i64) -> Option<u32> {
    let shifted = i64::from(value).checked_add(delta)?;
    if shifted < 1 {
        return None;
    }
    u32::try_from(shifted).ok()
}

impl FromStr for Coordinate {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coordinate::parse(s)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.col), self.row)
    }
}

/// Convert column letters to a 1-based index (A -> 1, Z -> 26, AA -> 27).
pub fn column_index(letters: &str) -> Result<u32, CoordError> {
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(CoordError::IllegalCoordinate(letters.to_string()));
    }
    let mut acc = 0u32;
    for b in letters.to_ascii_uppercase().bytes() {
        let digit = u32::from(b - b'A') + 1;
        acc = acc
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| CoordError::IllegalCoordinate(letters.to_string()))?;
    }
    Ok(acc)
}

/// Convert a 1-based column index to letters (1 -> A, 26 -> Z, 27 -> AA).
/// Index 0 has no name and yields an empty string.
pub fn column_name(index: u32) -> String {
    let mut result = Vec::new();
    let mut n = index;
    while n > 0 {
        n -= 1;
        result.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

fn anchored_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\$?)([A-Za-z]+)(\$?)([1-9][0-9]*)$")
            .expect("anchored reference regex must compile")
    })
}

/// A coordinate as written in a formula, with per-axis anchoring.
///
/// `A1`, `$A1`, `A$1` and `$A$1` are four distinct tokens even though they
/// name the same cell.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct AnchoredRef {
    pub coord: Coordinate,
    pub anchored_col: bool,
    pub anchored_row: bool,
}

impl AnchoredRef {
    pub fn new(coord: Coordinate, anchored_col: bool, anchored_row: bool) -> Self {
        AnchoredRef {
            coord,
            anchored_col,
            anchored_row,
        }
    }

    /// A token with neither axis anchored.
    pub fn floating(coord: Coordinate) -> Self {
        AnchoredRef::new(coord, false, false)
    }

    pub fn parse(text: &str) -> Result<AnchoredRef, CoordError> {
        let illegal = || CoordError::IllegalCoordinate(text.to_string());
        let caps = anchored_ref_re().captures(text).ok_or_else(illegal)?;
        let col = column_index(&caps[2])?;
        let row = caps[4].parse::<u32>().map_err(|_| illegal())?;
        Ok(AnchoredRef {
            coord: Coordinate::new(col, row)?,
            anchored_col: !caps[1].is_empty(),
            anchored_row: !caps[3].is_empty(),
        })
    }

    /// Re-target the token when its formula is copied by the given delta.
    /// Anchored axes stay put, floating axes move with the copy.
    pub fn shifted(&self, col_delta: i64, row_delta: i64) -> Result<AnchoredRef, CoordError> {
        let col_delta = if self.anchored_col { 0 } else { col_delta };
        let row_delta = if self.anchored_row { 0 } else { row_delta };
        Ok(AnchoredRef {
            coord: self.coord.neighbor(col_delta, row_delta)?,
            ..*self
        })
    }

    /// Same anchoring, different cell.
    pub fn moved_to(&self, coord: Coordinate) -> AnchoredRef {
        AnchoredRef { coord, ..*self }
    }
}

impl FromStr for AnchoredRef {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnchoredRef::parse(s)
    }
}

impl fmt::Display for AnchoredRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            if self.anchored_col { "$" } else { "" },
            column_name(self.coord.col),
            if self.anchored_row { "$" } else { "" },
            self.coord.row
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Holder {
        at: Coordinate,
    }

    #[test]
    fn test_deserialize_validates_axes() {
        let holder: Holder = toml::from_str("at = { col = 2, row = 7 }").unwrap();
        assert_eq!(holder.at, Coordinate::parse("B7").unwrap());
        let err = toml::from_str::<Holder>("at = { col = 0, row = 3 }").unwrap_err();
        assert!(err.to_string().contains("Illegal coordinate"));
        assert!(toml::from_str::<Holder>("at = { col = 1, row = 0 }").is_err());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let coord = Coordinate::parse("aB12").unwrap();
        assert_eq!(coord.col(), 28);
        assert_eq!(coord.row(), 12);
        assert_eq!(coord.to_string(), "AB12");
    }

    #[test]
    fn test_parse_rejects_bad_rows_and_garbage() {
        for bad in ["", "A", "12", "A0", "A01", "1A", "A 1", "A1B", "$$A1", "A-1"] {
            assert!(Coordinate::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_parse_column_overflow_is_illegal() {
        let huge = format!("{}1", "Z".repeat(10));
        assert!(Coordinate::parse(&huge).is_err());
    }

    #[test]
    fn test_column_name_and_index_are_inverse() {
        for index in 1..=2000u32 {
            assert_eq!(column_index(&column_name(index)).unwrap(), index);
        }
        assert_eq!(column_name(26), "Z");
        assert_eq!(column_name(27), "AA");
        assert_eq!(column_name(702), "ZZ");
        assert_eq!(column_name(703), "AAA");
    }

    #[test]
    fn test_neighbor_fails_outside_grid() {
        let b2 = Coordinate::parse("B2").unwrap();
        assert_eq!(b2.neighbor(-1, -1).unwrap().to_string(), "A1");
        assert!(matches!(
            b2.neighbor(-2, 0),
            Err(CoordError::OutOfGrid { .. })
        ));
        assert!(b2.neighbor(0, -2).is_err());
    }

    #[test]
    fn test_anchored_ref_round_trips_markers() {
        for text in ["A1", "$A1", "A$1", "$A$1"] {
            assert_eq!(AnchoredRef::parse(text).unwrap().to_string(), text);
        }
        let r = AnchoredRef::parse("$c$7").unwrap();
        assert!(r.anchored_col && r.anchored_row);
        assert_eq!(r.coord, Coordinate::new(3, 7).unwrap());
    }

    #[test]
    fn test_shifted_keeps_anchored_axes() {
        let shift = |t: &str| AnchoredRef::parse(t).unwrap().shifted(2, 2).unwrap().to_string();
        assert_eq!(shift("A1"), "C3");
        assert_eq!(shift("$B1"), "$B3");
        assert_eq!(shift("C$1"), "E$1");
        assert_eq!(shift("$D$1"), "$D$1");
    }
}
