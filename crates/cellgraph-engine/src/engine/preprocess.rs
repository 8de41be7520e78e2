//! Formula text rewriting.
//!
//! Formulas are stored as text, so every structural edit is a textual
//! rewrite of the coordinate tokens they contain:
//!
//! - **Normalisation**: uppercase coordinates, put range corners in
//!   top-left/bottom-right order
//! - **Copy offset**: shift floating axes by the copy delta
//! - **Rename**: re-point single references when their target cell moves
//! - **Structural shift**: adjust references when rows/columns are inserted
//!   or deleted
//!
//! Text inside string literals is never touched.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use super::cell_ref::{AnchoredRef, Coordinate};
use super::error::CoordError;

const REF_ERROR: &str = "#REF!";

/// Operation for shifting cell references when rows/columns are inserted or deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftOperation {
    InsertRows { at: u32, count: u32 },
    DeleteRows { at: u32, count: u32 },
    InsertColumns { at: u32, count: u32 },
    DeleteColumns { at: u32, count: u32 },
}

impl ShiftOperation {
    fn on_rows(&self) -> bool {
        matches!(
            self,
            ShiftOperation::InsertRows { .. } | ShiftOperation::DeleteRows { .. }
        )
    }

    /// New position of a line, or `None` if the line is deleted.
    pub fn apply(&self, line: u32) -> Option<u32> {
        match *self {
            ShiftOperation::InsertRows { at, count } | ShiftOperation::InsertColumns { at, count } => {
                if line >= at {
                    line.checked_add(count)
                } else {
                    Some(line)
                }
            }
            ShiftOperation::DeleteRows { at, count } | ShiftOperation::DeleteColumns { at, count } => {
                if line < at {
                    Some(line)
                } else if line - at < count {
                    None
                } else {
                    Some(line - count)
                }
            }
        }
    }

    /// Line of `coord` this operation acts on.
    pub fn line_of(&self, coord: Coordinate) -> u32 {
        if self.on_rows() { coord.row() } else { coord.col() }
    }

    /// Where `coord` lands, or `None` if it is deleted.
    pub fn shift_coordinate(&self, coord: Coordinate) -> Option<Coordinate> {
        let line = self.apply(self.line_of(coord))?;
        if self.on_rows() {
            Some(Coordinate::from_parts(coord.col(), line))
        } else {
            Some(Coordinate::from_parts(line, coord.row()))
        }
    }

    /// New `(low, high)` bounds of a span along the shifted axis. Deleted
    /// ends clamp to the surviving edge; `None` if the whole span is deleted.
    fn shift_span(&self, low: u32, high: u32) -> Option<(u32, u32)> {
        match *self {
            ShiftOperation::InsertRows { .. } | ShiftOperation::InsertColumns { .. } => {
                Some((self.apply(low)?, self.apply(high)?))
            }
            ShiftOperation::DeleteRows { at, .. } | ShiftOperation::DeleteColumns { at, .. } => {
                let new_low = self.apply(low).unwrap_or(at);
                let new_high = match self.apply(high) {
                    Some(h) => h,
                    None => at.checked_sub(1)?,
                };
                if new_high == 0 || new_low > new_high {
                    None
                } else {
                    Some((new_low, new_high))
                }
            }
        }
    }
}

/// A coordinate token found in formula text.
#[derive(Clone, Copy, Debug)]
enum Occurrence {
    Cell(AnchoredRef),
    Range(AnchoredRef, AnchoredRef),
}

fn occurrence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\$?[A-Za-z]+\$?[0-9]+)(?:\s*:\s*(\$?[A-Za-z]+\$?[0-9]+))?")
            .expect("formula reference regex must compile")
    })
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.'
}

fn parse_occurrence(caps: &Captures) -> Option<Occurrence> {
    let start = AnchoredRef::parse(&caps[1]).ok()?;
    match caps.get(2) {
        Some(end) => Some(Occurrence::Range(start, AnchoredRef::parse(end.as_str()).ok()?)),
        None => Some(Occurrence::Cell(start)),
    }
}

/// Rewrite every coordinate token outside string literals. The callback
/// returns the replacement text, or `None` to keep the token as written.
fn rewrite_occurrences<E>(
    formula: &str,
    mut rewrite: impl FnMut(Occurrence) -> Result<Option<String>, E>,
) -> Result<String, E> {
    let mut rewrite_segment = |seg: &str, out: &mut String| -> Result<(), E> {
        let bytes = seg.as_bytes();
        let mut last = 0;
        for caps in occurrence_re().captures_iter(seg) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let before_ok = whole.start() == 0 || !is_word_byte(bytes[whole.start() - 1]);
            let after_ok = bytes
                .get(whole.end())
                .is_none_or(|b| !is_word_byte(*b) && *b != b'(');
            if !before_ok || !after_ok {
                continue;
            }
            let Some(occurrence) = parse_occurrence(&caps) else {
                continue;
            };
            if let Some(replacement) = rewrite(occurrence)? {
                out.push_str(&seg[last..whole.start()]);
                out.push_str(&replacement);
                last = whole.end();
            }
        }
        out.push_str(&seg[last..]);
        Ok(())
    };

    // Process outside of string literals. A doubled quote inside a string
    // closes and reopens it, which leaves the state unchanged.
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len());
    let mut seg_start = 0;
    let mut in_string = false;

    for (i, &b) in bytes.iter().enumerate() {
        if b != b'"' {
            continue;
        }
        if in_string {
            out.push_str(&formula[seg_start..=i]);
            seg_start = i + 1;
        } else {
            rewrite_segment(&formula[seg_start..i], &mut out)?;
            seg_start = i;
        }
        in_string = !in_string;
    }

    if seg_start < formula.len() {
        if in_string {
            out.push_str(&formula[seg_start..]);
        } else {
            rewrite_segment(&formula[seg_start..], &mut out)?;
        }
    }

    Ok(out)
}

fn infallible(
    formula: &str,
    rewrite: impl FnMut(Occurrence) -> Result<Option<String>, std::convert::Infallible>,
) -> String {
    match rewrite_occurrences(formula, rewrite) {
        Ok(text) => text,
        Err(never) => match never {},
    }
}

/// Order range corners so the first is top-left, keeping each corner's markers.
fn normalized_corners(start: AnchoredRef, end: AnchoredRef) -> (AnchoredRef, AnchoredRef) {
    let (a, b) = (start.coord, end.coord);
    (
        start.moved_to(Coordinate::from_parts(a.col().min(b.col()), a.row().min(b.row()))),
        end.moved_to(Coordinate::from_parts(a.col().max(b.col()), a.row().max(b.row()))),
    )
}

fn range_text(start: AnchoredRef, end: AnchoredRef) -> String {
    format!("{}:{}", start, end)
}

/// Uppercase coordinate tokens and normalise range corners.
pub fn normalize_formula(formula: &str) -> String {
    infallible(formula, |occurrence| {
        Ok(Some(match occurrence {
            Occurrence::Cell(r) => r.to_string(),
            Occurrence::Range(start, end) => {
                let (start, end) = normalized_corners(start, end);
                range_text(start, end)
            }
        }))
    })
}

/// Shift cell references in a formula when rows/cols are inserted/deleted.
/// Returns the updated formula string.
///
/// Rules:
/// - Insert at N: refs at or after N move by the inserted count
/// - Delete span: single refs inside it become `#REF!`, refs after it move back
/// - Range ends inside a deleted span clamp to the surviving edge; a range
///   entirely inside the span becomes `#REF!`
/// - Anchoring does not protect a reference from structural shifts
pub fn shift_formula_references(formula: &str, op: ShiftOperation) -> String {
    infallible(formula, |occurrence| {
        Ok(Some(match occurrence {
            Occurrence::Cell(r) => match op.shift_coordinate(r.coord) {
                Some(coord) => r.moved_to(coord).to_string(),
                None => REF_ERROR.to_string(),
            },
            Occurrence::Range(start, end) => {
                let (start, end) = normalized_corners(start, end);
                let (low, high) = (op.line_of(start.coord), op.line_of(end.coord));
                match op.shift_span(low, high) {
                    Some((low, high)) => {
                        let (s, e) = if op.on_rows() {
                            (
                                Coordinate::from_parts(start.coord.col(), low),
                                Coordinate::from_parts(end.coord.col(), high),
                            )
                        } else {
                            (
                                Coordinate::from_parts(low, start.coord.row()),
                                Coordinate::from_parts(high, end.coord.row()),
                            )
                        };
                        range_text(start.moved_to(s), end.moved_to(e))
                    }
                    None => REF_ERROR.to_string(),
                }
            }
        }))
    })
}

/// Offset all cell references in a formula by a relative column/row delta.
/// Used by copy so pasted formulas preserve relative references.
///
/// Rules:
/// - `A1` offset by (+1, +2) becomes `B3`
/// - anchored axes (`$A`, `$1`) do not move
/// - range refs are offset on both corners
/// - a reference pushed off the grid fails the whole rewrite
pub fn offset_formula_references(
    formula: &str,
    col_delta: i64,
    row_delta: i64,
) -> Result<String, CoordError> {
    if col_delta == 0 && row_delta == 0 {
        return Ok(formula.to_string());
    }
    rewrite_occurrences(formula, |occurrence| {
        Ok(Some(match occurrence {
            Occurrence::Cell(r) => r.shifted(col_delta, row_delta)?.to_string(),
            Occurrence::Range(start, end) => range_text(
                start.shifted(col_delta, row_delta)?,
                end.shifted(col_delta, row_delta)?,
            ),
        }))
    })
}

/// Re-point single references to `from` at `to`, keeping their markers.
/// Range corners are left alone.
pub fn rename_references(formula: &str, from: Coordinate, to: Coordinate) -> String {
    infallible(formula, |occurrence| {
        Ok(match occurrence {
            Occurrence::Cell(r) if r.coord == from => Some(r.moved_to(to).to_string()),
            _ => None,
        })
    })
}
