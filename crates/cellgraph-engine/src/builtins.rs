//! Built-in spreadsheet functions and the registry formulas call into.
//!
//! Conventions:
//! - Function names are case-insensitive and stored lowercase.
//! - Functions receive already-resolved values. Range arguments arrive as a
//!   list of rows together with the range they came from, so functions like
//!   `column` and `rows` can answer from the corners.
//! - To add a builtin, append it to [`BUILTINS`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::engine::{CellRange, EvalError, Value};

/// One resolved function argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Arg {
    pub value: Value,
    /// The cells this argument was read from, when it was a reference or range.
    pub origin: Option<CellRange>,
}

impl Arg {
    pub fn literal(value: Value) -> Self {
        Arg {
            value,
            origin: None,
        }
    }
}

pub type NativeFn = Arc<dyn Fn(&[Arg]) -> Result<Value, EvalError> + Send + Sync>;

pub struct Builtin {
    pub name: &'static str,
    #[allow(dead_code)]
    pub description: &'static str,
    pub func: fn(&[Arg]) -> Result<Value, EvalError>,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "sum",
        description: "Sum of numeric values",
        func: fn_sum,
    },
    Builtin {
        name: "average",
        description: "Average of numeric values",
        func: fn_average,
    },
    Builtin {
        name: "avg",
        description: "Alias of average",
        func: fn_average,
    },
    Builtin {
        name: "count",
        description: "Count of numeric values",
        func: fn_count,
    },
    Builtin {
        name: "min",
        description: "Minimum numeric value",
        func: fn_min,
    },
    Builtin {
        name: "max",
        description: "Maximum numeric value",
        func: fn_max,
    },
    Builtin {
        name: "product",
        description: "Product of numeric values",
        func: fn_product,
    },
    Builtin {
        name: "abs",
        description: "Absolute value",
        func: fn_abs,
    },
    Builtin {
        name: "round",
        description: "Round to a number of decimal places",
        func: fn_round,
    },
    Builtin {
        name: "if",
        description: "Pick a value by condition",
        func: fn_if,
    },
    Builtin {
        name: "concat",
        description: "Join values as text",
        func: fn_concat,
    },
    Builtin {
        name: "column",
        description: "Column number of the first cell of a reference",
        func: fn_column,
    },
    Builtin {
        name: "row",
        description: "Row number of the first cell of a reference",
        func: fn_row,
    },
    Builtin {
        name: "columns",
        description: "Number of columns in a range",
        func: fn_columns,
    },
    Builtin {
        name: "rows",
        description: "Number of rows in a range",
        func: fn_rows,
    },
];

/// Named functions available to formulas.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, NativeFn>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        FunctionRegistry {
            functions: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = FunctionRegistry::empty();
        for builtin in BUILTINS {
            let func = builtin.func;
            registry.register(builtin.name, move |args: &[Arg]| func(args));
        }
        registry
    }

    /// Add or replace a function.
    pub fn register<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[Arg]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.functions
            .insert(name.to_ascii_lowercase(), Arc::new(func));
    }

    pub fn get(&self, name: &str) -> Option<&NativeFn> {
        self.functions.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn call(&self, name: &str, args: &[Arg]) -> Result<Value, EvalError> {
        let func = self
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        func(args)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        FunctionRegistry::with_builtins()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// Numbers of all arguments. Values read from cells skip text and blanks,
/// literal arguments must be numeric.
fn numbers(args: &[Arg]) -> Result<Vec<f64>, EvalError> {
    let mut out = Vec::new();
    for arg in args {
        if arg.origin.is_some() {
            out.extend(arg.value.flatten().iter().filter_map(|v| match v {
                Value::Number(n) => Some(*n),
                _ => None,
            }));
        } else {
            for v in arg.value.flatten() {
                out.push(v.as_number()?);
            }
        }
    }
    Ok(out)
}

fn arity(name: &str, args: &[Arg], min: usize, max: usize) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{} to {}", min, max)
        };
        return Err(EvalError::Function {
            name: name.to_string(),
            message: format!("expected {} arguments, got {}", expected, args.len()),
        });
    }
    Ok(())
}

fn origin_of<'a>(name: &str, args: &'a [Arg]) -> Result<&'a CellRange, EvalError> {
    arity(name, args, 1, 1)?;
    args[0].origin.as_ref().ok_or_else(|| EvalError::Function {
        name: name.to_string(),
        message: "argument must be a cell reference or range".to_string(),
    })
}

fn fn_sum(args: &[Arg]) -> Result<Value, EvalError> {
    Ok(Value::Number(numbers(args)?.iter().sum()))
}

fn fn_average(args: &[Arg]) -> Result<Value, EvalError> {
    let nums = numbers(args)?;
    if nums.is_empty() {
        return Err(EvalError::DivideByZero);
    }
    Ok(Value::Number(nums.iter().sum::<f64>() / nums.len() as f64))
}

fn fn_count(args: &[Arg]) -> Result<Value, EvalError> {
    let count = args
        .iter()
        .flat_map(|arg| arg.value.flatten())
        .filter(|v| match v {
            Value::Number(_) => true,
            Value::Text(s) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        })
        .count();
    Ok(Value::Number(count as f64))
}

fn fn_min(args: &[Arg]) -> Result<Value, EvalError> {
    let nums = numbers(args)?;
    Ok(Value::Number(nums.into_iter().reduce(f64::min).unwrap_or(0.0)))
}

fn fn_max(args: &[Arg]) -> Result<Value, EvalError> {
    let nums = numbers(args)?;
    Ok(Value::Number(nums.into_iter().reduce(f64::max).unwrap_or(0.0)))
}

fn fn_product(args: &[Arg]) -> Result<Value, EvalError> {
    let nums = numbers(args)?;
    if nums.is_empty() {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number(nums.iter().product()))
}

fn fn_abs(args: &[Arg]) -> Result<Value, EvalError> {
    arity("abs", args, 1, 1)?;
    Ok(Value::Number(args[0].value.as_number()?.abs()))
}

fn fn_round(args: &[Arg]) -> Result<Value, EvalError> {
    arity("round", args, 1, 2)?;
    let n = args[0].value.as_number()?;
    let digits = match args.get(1) {
        Some(arg) => arg.value.as_number()?.trunc() as i32,
        None => 0,
    };
    let factor = 10f64.powi(digits);
    Ok(Value::Number((n * factor).round() / factor))
}

fn fn_if(args: &[Arg]) -> Result<Value, EvalError> {
    arity("if", args, 2, 3)?;
    if args[0].value.truthy()? {
        Ok(args[1].value.clone())
    } else {
        Ok(args.get(2).map(|a| a.value.clone()).unwrap_or(Value::Bool(false)))
    }
}

fn fn_concat(args: &[Arg]) -> Result<Value, EvalError> {
    let text: String = args
        .iter()
        .flat_map(|arg| arg.value.flatten())
        .map(|v| v.as_text())
        .collect();
    Ok(Value::Text(text))
}

fn fn_column(args: &[Arg]) -> Result<Value, EvalError> {
    let range = origin_of("column", args)?;
    Ok(Value::Number(f64::from(range.top_left().col())))
}

fn fn_row(args: &[Arg]) -> Result<Value, EvalError> {
    let range = origin_of("row", args)?;
    Ok(Value::Number(f64::from(range.top_left().row())))
}

fn fn_columns(args: &[Arg]) -> Result<Value, EvalError> {
    let range = origin_of("columns", args)?;
    Ok(Value::Number(f64::from(range.columns())))
}

fn fn_rows(args: &[Arg]) -> Result<Value, EvalError> {
    let range = origin_of("rows", args)?;
    Ok(Value::Number(f64::from(range.rows())))
}
