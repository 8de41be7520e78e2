//! Reachability queries over the reference graph.
//!
//! Before an edge `cell -> target` is added we ask whether `target` already
//! reaches `cell`. A search remembers the cells it has explored only for as
//! long as it lives, so nothing is cached on the cells between edits.

use std::collections::HashSet;

use super::cell::CellId;
use super::state::Spreadsheet;

/// Depth-first search for one goal cell. Several start cells can share a
/// search; cells explored from an earlier start are not walked again.
pub(crate) struct ReachSearch {
    goal: CellId,
    visited: HashSet<CellId>,
}

impl ReachSearch {
    pub(crate) fn new(goal: CellId) -> Self {
        ReachSearch {
            goal,
            visited: HashSet::new(),
        }
    }

    /// Does `from` depend on the goal through one or more references?
    pub(crate) fn reaches_from(&mut self, sheet: &Spreadsheet, from: CellId) -> bool {
        // Only a cell with readers can be reached.
        if sheet.cell(self.goal).observers.is_empty() {
            return false;
        }
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if !self.visited.insert(current) || !sheet.is_live(current) {
                continue;
            }
            for reference in &sheet.cell(current).references {
                if reference.target == self.goal {
                    return true;
                }
                if !self.visited.contains(&reference.target) {
                    stack.push(reference.target);
                }
            }
        }
        false
    }
}

impl Spreadsheet {
    /// Does `from` depend on `goal`, directly or through other cells?
    pub(crate) fn reaches(&self, from: CellId, goal: CellId) -> bool {
        ReachSearch::new(goal).reaches_from(self, from)
    }

    /// Find a cycle by depth-first search. Returns the cells on the cycle,
    /// starting and ending with the same cell.
    pub(crate) fn find_cycle(&self) -> Option<Vec<CellId>> {
        let mut done = HashSet::new();
        for start in self.live_ids() {
            if done.contains(&start) {
                continue;
            }
            // Each path entry carries the index of the next reference to follow.
            let mut path: Vec<(CellId, usize)> = vec![(start, 0)];
            let mut on_path = HashSet::from([start]);

            while let Some(&(current, next)) = path.last() {
                let Some(reference) = self.cell(current).references.get(next) else {
                    path.pop();
                    on_path.remove(&current);
                    done.insert(current);
                    continue;
                };
                let depth = path.len() - 1;
                path[depth].1 += 1;

                let target = reference.target;
                if on_path.contains(&target) {
                    let first = path.iter().position(|&(id, _)| id == target)?;
                    let mut cycle: Vec<CellId> = path[first..].iter().map(|&(id, _)| id).collect();
                    cycle.push(target);
                    return Some(cycle);
                }
                if done.contains(&target) || !self.is_live(target) {
                    continue;
                }
                path.push((target, 0));
                on_path.insert(target);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellgraph_engine::engine::Coordinate;

    fn id_of(sheet: &Spreadsheet, text: &str) -> CellId {
        sheet.find(Coordinate::parse(text).unwrap()).unwrap()
    }

    #[test]
    fn test_reaches_follows_chain() {
        let mut sheet = Spreadsheet::new();
        sheet.set("A1", "1").unwrap();
        sheet.set("A2", "=A1").unwrap();
        sheet.set("A3", "=A2+B1").unwrap();
        let (a1, a3) = (id_of(&sheet, "A1"), id_of(&sheet, "A3"));
        assert!(sheet.reaches(a3, a1));
        assert!(!sheet.reaches(a1, a3));
        assert!(!sheet.reaches(a3, a3));
    }

    #[test]
    fn test_search_is_shared_between_starts() {
        let mut sheet = Spreadsheet::new();
        sheet.set("A1", "1").unwrap();
        sheet.set("B1", "=A1").unwrap();
        sheet.set("C1", "=A1").unwrap();
        let (a1, b1, c1) = (id_of(&sheet, "A1"), id_of(&sheet, "B1"), id_of(&sheet, "C1"));
        let mut search = ReachSearch::new(a1);
        assert!(search.reaches_from(&sheet, b1));
        assert!(search.reaches_from(&sheet, c1));
        let mut search = ReachSearch::new(c1);
        assert!(!search.reaches_from(&sheet, b1));
    }

    #[test]
    fn test_deep_chain_has_no_cycle() {
        let mut sheet = Spreadsheet::new();
        sheet.set("A1", "0").unwrap();
        for row in 2..=20_000 {
            sheet.set(&format!("A{}", row), &format!("=A{}", row - 1)).unwrap();
        }
        assert_eq!(sheet.find_cycle(), None);
        let (head, tail) = (id_of(&sheet, "A1"), id_of(&sheet, "A20000"));
        assert!(sheet.reaches(tail, head));
    }
}
