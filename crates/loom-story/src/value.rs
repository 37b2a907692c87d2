use std::fmt;

use serde::{Deserialize, Serialize};

/// A dynamic value held by a variable, a flag, or an operand.
///
/// Authored documents are JSON, so numbers are always `f64`. Arrays hold
/// scalar items in practice, but nesting is not rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean value.
    Bool(bool),
    /// A numeric value.
    Number(f64),
    /// A text value.
    String(String),
    /// An ordered list of values.
    Array(Vec<Value>),
}

impl Value {
    /// The number inside, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean inside, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text inside, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The items inside, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in log messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
        }
    }

    /// The zero value of this value's type: `false`, `0`, `""`, or `[]`.
    pub fn zero_like(&self) -> Value {
        match self {
            Self::Bool(_) => Self::Bool(false),
            Self::Number(_) => Self::Number(0.0),
            Self::String(_) => Self::String(String::new()),
            Self::Array(_) => Self::Array(Vec::new()),
        }
    }

    /// Truthiness: `false`, `0`, `NaN` and `""` are false, everything else
    /// (including empty arrays) is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) => true,
        }
    }

    /// Loose equality across types.
    ///
    /// Same-typed values compare directly. A boolean is compared as `1`/`0`,
    /// a string against a number is parsed as a number (blank is `0`,
    /// unparsable never matches), and an array against a scalar compares its
    /// comma-joined text.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Bool(b), other) => Self::Number(bool_to_number(*b)).loose_eq(other),
            (this, Self::Bool(b)) => this.loose_eq(&Self::Number(bool_to_number(*b))),
            (Self::Number(n), Self::String(s)) | (Self::String(s), Self::Number(n)) => {
                parse_loose_number(s) == *n
            }
            (Self::Array(items), scalar) | (scalar, Self::Array(items)) => {
                Self::String(join_items(items, ",")).loose_eq(scalar)
            }
        }
    }

    /// Render for display in narrative text: arrays are joined with `", "`,
    /// integral numbers print without a fractional part.
    pub fn render(&self) -> String {
        match self {
            Self::Array(items) => join_items(items, ", "),
            other => other.to_string(),
        }
    }
}

fn bool_to_number(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn parse_loose_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn join_items(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => format_number(*n, f),
            Self::String(s) => write!(f, "{s}"),
            Self::Array(items) => write!(f, "{}", join_items(items, ",")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_display_without_fraction() {
        assert_eq!(Value::Number(75.0).to_string(), "75");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn render_joins_arrays_with_comma_space() {
        let v = Value::Array(vec!["potion".into(), "sword".into()]);
        assert_eq!(v.render(), "potion, sword");
        assert_eq!(v.to_string(), "potion,sword");
    }

    #[test]
    fn deserializes_untagged_json() {
        let v: Vec<Value> = serde_json::from_str(r#"[true, 3, "x", [1, "a"]]"#).unwrap();
        assert_eq!(v[0], Value::Bool(true));
        assert_eq!(v[1], Value::Number(3.0));
        assert_eq!(v[2], Value::String("x".into()));
        assert_eq!(
            v[3],
            Value::Array(vec![Value::Number(1.0), Value::String("a".into())])
        );
    }

    #[test]
    fn loose_eq_coerces_between_types() {
        assert!(Value::from("5").loose_eq(&Value::from(5)));
        assert!(Value::from(true).loose_eq(&Value::from(1)));
        assert!(Value::from(false).loose_eq(&Value::from("")));
        assert!(Value::from("").loose_eq(&Value::from(0)));
        assert!(!Value::from("abc").loose_eq(&Value::from(0)));
        assert!(!Value::from(true).loose_eq(&Value::from("true")));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::Array(Vec::new()).is_truthy());
        assert!(Value::from("no").is_truthy());
    }

    #[test]
    fn zero_like_matches_type() {
        assert_eq!(Value::from(9).zero_like(), Value::from(0));
        assert_eq!(Value::from("x").zero_like(), Value::from(""));
        assert_eq!(Value::from(true).zero_like(), Value::from(false));
    }

    proptest::proptest! {
        #[test]
        fn integral_display_parses_back(n in -1_000_000i32..1_000_000) {
            let shown = Value::from(n).to_string();
            proptest::prop_assert_eq!(shown.parse::<i32>().ok(), Some(n));
        }

        #[test]
        fn numeric_strings_loosely_equal_their_number(n in -1_000_000i32..1_000_000) {
            proptest::prop_assert!(Value::from(n.to_string()).loose_eq(&Value::from(n)));
        }
    }
}
