//! Raw cell content as typed by the user.

use serde::{Deserialize, Serialize};

use super::preprocess::normalize_formula;
use super::value::Value;

/// The content stored in a cell.
///
/// A formula keeps its expression text without the leading `=`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Content {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Formula(String),
}

impl Content {
    /// Parse user input into content.
    /// - Empty string or whitespace -> Empty
    /// - Starts with '=' -> Formula, coordinate tokens uppercased
    /// - Quoted string -> Text (without quotes)
    /// - Finite number -> Number
    /// - Otherwise -> Text
    pub fn from_input(input: &str) -> Content {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Content::Empty;
        }

        if let Some(formula) = trimmed.strip_prefix('=') {
            return Content::Formula(normalize_formula(formula.trim()));
        }

        if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
            return Content::Text(trimmed[1..trimmed.len() - 1].to_string());
        }

        if looks_numeric(trimmed)
            && let Ok(n) = trimmed.parse::<f64>()
            && n.is_finite()
        {
            return Content::Number(n);
        }

        Content::Text(trimmed.to_string())
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, Content::Formula(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Empty)
    }

    /// Expression text of a formula, without the `=`.
    pub fn formula(&self) -> Option<&str> {
        match self {
            Content::Formula(body) => Some(body),
            _ => None,
        }
    }

    /// Text that reproduces this content when fed back to [`Content::from_input`].
    pub fn to_input_string(&self) -> String {
        match self {
            Content::Empty => String::new(),
            Content::Number(n) => n.to_string(),
            Content::Text(s) => {
                let reparsed = Content::from_input(s);
                if matches!(&reparsed, Content::Text(t) if t == s) {
                    s.clone()
                } else {
                    format!("\"{}\"", s)
                }
            }
            Content::Formula(body) => format!("={}", body),
        }
    }

    /// Value of a scalar cell. Formulas have no scalar value.
    pub fn scalar_value(&self) -> Value {
        match self {
            Content::Number(n) => Value::Number(*n),
            Content::Text(s) => Value::Text(s.clone()),
            Content::Empty | Content::Formula(_) => Value::Empty,
        }
    }
}

fn looks_numeric(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
}

impl From<&str> for Content {
    fn from(input: &str) -> Self {
        Content::from_input(input)
    }
}

impl From<String> for Content {
    fn from(input: String) -> Self {
        Content::from_input(&input)
    }
}

impl From<f64> for Content {
    fn from(n: f64) -> Self {
        Content::Number(n)
    }
}

impl From<i64> for Content {
    fn from(n: i64) -> Self {
        Content::Number(n as f64)
    }
}

impl From<i32> for Content {
    fn from(n: i32) -> Self {
        Content::Number(f64::from(n))
    }
}
