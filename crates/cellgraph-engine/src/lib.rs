//! cellgraph_engine - Coordinates, formula parsing and evaluation.

pub mod builtins;
pub mod engine;

pub use builtins::{Arg, FunctionRegistry, NativeFn};

#[cfg(test)]
mod tests {
    use crate::builtins::FunctionRegistry;
    use crate::engine::*;

    fn run(formula: &str, cells: &[(&str, f64)]) -> Result<Value, EvalError> {
        let compiled = Formula::compile(formula, MAX_DEPENDENCY_RANGE_CELLS);
        let mut bindings = Bindings::new();
        for (coord, n) in cells {
            bindings.insert(Coordinate::parse(coord).unwrap(), Value::Number(*n));
        }
        compiled.evaluate(&bindings, &FunctionRegistry::default())
    }

    #[test]
    fn test_fibonacci_step() {
        let cells = [("A1", 1.0), ("A2", 1.0)];
        assert_eq!(run("= $A$1 + $A$2", &cells), Ok(Value::Number(2.0)));
        assert_eq!(run("= sum(A1:A2)", &cells), Ok(Value::Number(2.0)));
    }

    #[test]
    fn test_normalised_text_compiles_to_same_references() {
        let raw = "sum(b2:a1) + $c$3";
        let normalised = normalize_formula(raw);
        let a = Formula::compile(raw, MAX_DEPENDENCY_RANGE_CELLS);
        let b = Formula::compile(&normalised, MAX_DEPENDENCY_RANGE_CELLS);
        assert_eq!(a.references(), b.references());
        assert_eq!(normalised, "sum(A1:B2) + $C$3");
    }

    #[test]
    fn test_copied_formula_reads_shifted_cells() {
        let copied = offset_formula_references("A1 * $B$1", 0, 1).unwrap();
        assert_eq!(copied, "A2 * $B$1");
        assert_eq!(
            run(&copied, &[("A1", 5.0), ("A2", 3.0), ("B1", 10.0)]),
            Ok(Value::Number(30.0))
        );
    }

    #[test]
    fn test_deleted_reference_evaluates_to_ref_error() {
        let shifted = shift_formula_references(
            "A2 + 1",
            ShiftOperation::DeleteRows { at: 2, count: 1 },
        );
        assert_eq!(shifted, "#REF! + 1");
        assert_eq!(run(&shifted, &[]), Err(EvalError::InvalidReference));
    }
}
