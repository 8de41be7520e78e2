//! Sheet configuration.

use serde::{Deserialize, Serialize};

use cellgraph_engine::engine::MAX_DEPENDENCY_RANGE_CELLS;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Largest number of cells a single range may expand to. Formulas with a
    /// bigger range get no references and evaluate to a `#RANGE!` error.
    pub max_range_cells: usize,
}

impl Default for SheetConfig {
    fn default() -> Self {
        SheetConfig {
            max_range_cells: MAX_DEPENDENCY_RANGE_CELLS,
        }
    }
}
