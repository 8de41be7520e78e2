//! Reference extraction from parsed formulas.
//!
//! Walks an expression tree and lists every cell the formula reads, in
//! source order. Single references keep their anchoring markers, so `A1`
//! and `$A1` are reported separately. Cells reached through a range are
//! reported once per cell and flagged as range expansions.

use super::ast::Expr;
use super::cell_ref::AnchoredRef;
use super::error::EvalError;
use super::range::CellRange;

/// Default cap on the number of cells a single range may expand to.
pub const MAX_DEPENDENCY_RANGE_CELLS: usize = 1_000_000;

/// One outgoing edge as written in a formula.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct RefToken {
    pub key: AnchoredRef,
    pub from_range: bool,
}

/// List the distinct references of `expr`.
///
/// Fails with [`EvalError::RangeTooLarge`] when a range spans more than
/// `max_range_cells` cells.
pub fn extract_references(expr: &Expr, max_range_cells: usize) -> Result<Vec<RefToken>, EvalError> {
    let mut nodes = Vec::new();
    expr.walk(&mut |node| nodes.push(node));

    let mut refs: Vec<RefToken> = Vec::new();
    let mut push = |token: RefToken| {
        if !refs.contains(&token) {
            refs.push(token);
        }
    };

    for node in nodes {
        match node {
            Expr::Ref(key) => push(RefToken {
                key: *key,
                from_range: false,
            }),
            Expr::Range { start, end } => {
                let range = CellRange::new(start.coord, end.coord);
                if range.cell_count() > max_range_cells as u64 {
                    return Err(EvalError::RangeTooLarge {
                        range: range.to_string(),
                        limit: max_range_cells,
                    });
                }
                for coord in range.iter() {
                    push(RefToken {
                        key: AnchoredRef::floating(coord),
                        from_range: true,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(refs)
}
