//! Compiled formulas and the tree-walking interpreter.
//!
//! A [`Formula`] is parsed once when a cell's content is set. Evaluation
//! reads referenced values from [`Bindings`] filled in by the caller and
//! delegates function calls to a [`FunctionRegistry`].

use std::cmp::Ordering;
use std::collections::HashMap;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::cell_ref::Coordinate;
use super::deps::{RefToken, extract_references};
use super::error::EvalError;
use super::parser::parse;
use super::range::CellRange;
use super::value::Value;
use crate::builtins::{Arg, FunctionRegistry};

/// Values of the cells a formula reads, keyed by coordinate.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    values: HashMap<Coordinate, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings::default()
    }

    pub fn insert(&mut self, coord: Coordinate, value: Value) {
        self.values.insert(coord, value);
    }

    /// Unbound cells read as empty.
    pub fn get(&self, coord: Coordinate) -> Value {
        self.values.get(&coord).cloned().unwrap_or_default()
    }
}

/// A parsed formula and the references it reads.
#[derive(Clone, Debug)]
pub struct Formula {
    body: Result<Expr, EvalError>,
    references: Vec<RefToken>,
}

impl Formula {
    /// Parse `text` (with or without the leading `=`). Parse failures and
    /// oversized ranges are kept as the formula's error; such a formula has
    /// no references.
    pub fn compile(text: &str, max_range_cells: usize) -> Formula {
        let compiled = parse(text)
            .map_err(EvalError::from)
            .and_then(|expr| extract_references(&expr, max_range_cells).map(|refs| (expr, refs)));
        match compiled {
            Ok((expr, references)) => Formula {
                body: Ok(expr),
                references,
            },
            Err(err) => Formula {
                body: Err(err),
                references: Vec::new(),
            },
        }
    }

    pub fn references(&self) -> &[RefToken] {
        &self.references
    }

    pub fn error(&self) -> Option<&EvalError> {
        self.body.as_ref().err()
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.body.as_ref().ok()
    }

    pub fn evaluate(
        &self,
        bindings: &Bindings,
        functions: &FunctionRegistry,
    ) -> Result<Value, EvalError> {
        let expr = self.body.as_ref().map_err(Clone::clone)?;
        Interpreter {
            bindings,
            functions,
        }
        .eval(expr)
    }
}

struct Interpreter<'a> {
    bindings: &'a Bindings,
    functions: &'a FunctionRegistry,
}

impl Interpreter<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Text(s) => Ok(Value::Text(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::InvalidRef => Err(EvalError::InvalidReference),
            Expr::Ref(r) => Ok(self.bindings.get(r.coord)),
            Expr::Range { start, end } => Err(EvalError::Value(format!(
                "range {}:{} used outside a function",
                start, end
            ))),
            Expr::Unary { op, operand } => {
                let n = self.eval(operand)?.as_number()?;
                Ok(Value::Number(match op {
                    UnaryOp::Neg => -n,
                    UnaryOp::Plus => n,
                }))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.argument(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.functions.call(name, &args)
            }
        }
    }

    fn argument(&self, expr: &Expr) -> Result<Arg, EvalError> {
        match expr {
            Expr::Range { start, end } => {
                let range = CellRange::new(start.coord, end.coord);
                let rows = range
                    .expand()
                    .into_iter()
                    .map(|row| Value::List(row.into_iter().map(|c| self.bindings.get(c)).collect()))
                    .collect();
                Ok(Arg {
                    value: Value::List(rows),
                    origin: Some(range),
                })
            }
            Expr::Ref(r) => Ok(Arg {
                value: self.bindings.get(r.coord),
                origin: Some(CellRange::single(r.coord)),
            }),
            other => self.eval(other).map(Arg::literal),
        }
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let arithmetic = |f: fn(f64, f64) -> f64| -> Result<Value, EvalError> {
        Ok(Value::Number(f(left.as_number()?, right.as_number()?)))
    };
    match op {
        BinaryOp::Add => arithmetic(|a, b| a + b),
        BinaryOp::Sub => arithmetic(|a, b| a - b),
        BinaryOp::Mul => arithmetic(|a, b| a * b),
        BinaryOp::Pow => arithmetic(f64::powf),
        BinaryOp::Div => {
            let divisor = right.as_number()?;
            if divisor == 0.0 {
                return Err(EvalError::DivideByZero);
            }
            Ok(Value::Number(left.as_number()? / divisor))
        }
        BinaryOp::Concat => Ok(Value::Text(format!("{}{}", left.as_text(), right.as_text()))),
        BinaryOp::Eq => Ok(Value::Bool(compare(left, right)? == Ordering::Equal)),
        BinaryOp::Ne => Ok(Value::Bool(compare(left, right)? != Ordering::Equal)),
        BinaryOp::Lt => Ok(Value::Bool(compare(left, right)? == Ordering::Less)),
        BinaryOp::Le => Ok(Value::Bool(compare(left, right)? != Ordering::Greater)),
        BinaryOp::Gt => Ok(Value::Bool(compare(left, right)? == Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(compare(left, right)? != Ordering::Less)),
    }
}

/// Text compares case-insensitively with text (and with blanks as ""),
/// everything else numerically.
fn compare(left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::Text(_), Value::Text(_) | Value::Empty) | (Value::Empty, Value::Text(_)) => Ok(left
            .as_text()
            .to_lowercase()
            .cmp(&right.as_text().to_lowercase())),
        _ => {
            let (a, b) = (left.as_number()?, right.as_number()?);
            a.partial_cmp(&b)
                .ok_or_else(|| EvalError::Value("cannot compare NaN".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::deps::MAX_DEPENDENCY_RANGE_CELLS;

    fn c(text: &str) -> Coordinate {
        Coordinate::parse(text).unwrap()
    }

    fn eval_with(formula: &str, values: &[(&str, Value)]) -> Result<Value, EvalError> {
        let mut bindings = Bindings::new();
        for (coord, value) in values {
            bindings.insert(c(coord), value.clone());
        }
        Formula::compile(formula, MAX_DEPENDENCY_RANGE_CELLS)
            .evaluate(&bindings, &FunctionRegistry::with_builtins())
    }

    fn eval(formula: &str) -> Result<Value, EvalError> {
        eval_with(formula, &[])
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), Ok(Value::Number(7.0)));
        assert_eq!(eval("(1 + 2) * 3"), Ok(Value::Number(9.0)));
        assert_eq!(eval("-2 ^ 2"), Ok(Value::Number(-4.0)));
        assert_eq!(eval("2 ^ 3 ^ 2"), Ok(Value::Number(512.0)));
        assert_eq!(eval("2 ^ -1"), Ok(Value::Number(0.5)));
        assert_eq!(eval("1 / 0"), Err(EvalError::DivideByZero));
    }

    #[test]
    fn test_refs_and_blanks() {
        let values = [("A1", Value::Number(2.0)), ("B1", Value::from("3"))];
        assert_eq!(eval_with("A1 * B1 + C1", &values), Ok(Value::Number(6.0)));
        assert!(matches!(
            eval_with("A1 + B1", &[("B1", Value::from("x"))]),
            Err(EvalError::Value(_))
        ));
    }

    #[test]
    fn test_ranges_in_functions() {
        let values = [
            ("A1", Value::Number(1.0)),
            ("A2", Value::Number(2.0)),
            ("A3", Value::Number(4.0)),
        ];
        assert_eq!(eval_with("sum(A1:A3)", &values), Ok(Value::Number(7.0)));
        assert_eq!(eval_with("rows(A1:A3) + column(C9)", &values), Ok(Value::Number(6.0)));
        assert!(matches!(eval("A1:A3"), Err(EvalError::Value(_))));
    }

    #[test]
    fn test_comparison_and_text() {
        assert_eq!(eval("\"a\" & 1 & TRUE"), Ok(Value::from("a1TRUE")));
        assert_eq!(eval("\"abc\" = \"ABC\""), Ok(Value::Bool(true)));
        assert_eq!(eval("2 >= 3"), Ok(Value::Bool(false)));
        assert_eq!(eval("if(1 < 2, \"yes\", \"no\")"), Ok(Value::from("yes")));
    }

    #[test]
    fn test_compile_errors_are_kept() {
        let formula = Formula::compile("1 +", MAX_DEPENDENCY_RANGE_CELLS);
        assert!(matches!(formula.error(), Some(EvalError::Syntax(_))));
        assert!(formula.references().is_empty());
        assert_eq!(eval("#REF! + 1"), Err(EvalError::InvalidReference));
        assert_eq!(
            eval("nope(1)"),
            Err(EvalError::UnknownFunction("nope".into()))
        );
    }

    #[test]
    fn test_compile_lists_references() {
        let formula = Formula::compile("=A1 + $A1 + sum(B1:B2)", MAX_DEPENDENCY_RANGE_CELLS);
        let keys: Vec<String> = formula
            .references()
            .iter()
            .map(|t| t.key.to_string())
            .collect();
        assert_eq!(keys, vec!["A1", "$A1", "B1", "B2"]);
    }
}
