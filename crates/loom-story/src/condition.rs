//! Conditions gate choices and select condition-node branches.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Comparison operator for [`Condition::Variable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    /// Loose equality.
    #[default]
    #[serde(rename = "==")]
    Eq,
    /// Loose inequality.
    #[serde(rename = "!=")]
    Ne,
    /// Numeric greater-than.
    #[serde(rename = ">")]
    Gt,
    /// Numeric greater-or-equal.
    #[serde(rename = ">=")]
    Ge,
    /// Numeric less-than.
    #[serde(rename = "<")]
    Lt,
    /// Numeric less-or-equal.
    #[serde(rename = "<=")]
    Le,
}

impl ComparisonOperator {
    /// The operator as written in documents.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// A predicate over the variable store, keyed by `type`.
///
/// `Variable` is the primary form. The remaining variants come from the
/// older flag/stat based model and are kept so existing documents still
/// evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Condition {
    /// Compare a declared variable against a value.
    Variable {
        /// Variable id to read.
        #[serde(default)]
        variable_id: Option<String>,
        /// Operator, `==` when absent.
        #[serde(default)]
        operator: Option<ComparisonOperator>,
        /// Right-hand operand.
        #[serde(default)]
        value: Option<Value>,
    },
    /// Legacy: range check against a variable named `gold`.
    Gold {
        /// Inclusive lower bound.
        #[serde(default)]
        min: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default)]
        max: Option<f64>,
        /// Exact match; takes precedence over the bounds.
        #[serde(default)]
        value: Option<Value>,
    },
    /// Legacy: range check against a variable named `hp`.
    Hp {
        /// Inclusive lower bound.
        #[serde(default)]
        min: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default)]
        max: Option<f64>,
        /// Exact match; takes precedence over the bounds.
        #[serde(default)]
        value: Option<Value>,
    },
    /// Legacy: look up a flag.
    Flag {
        /// Flag key.
        #[serde(default)]
        flag_key: Option<String>,
        /// Expected value; plain truthiness when absent.
        #[serde(default)]
        flag_value: Option<Value>,
    },
    /// The player previously picked the choice with this id.
    ChoiceMade {
        /// Choice id.
        #[serde(default)]
        choice_id: Option<String>,
    },
    /// Legacy: range check against `{characterId}_affection`.
    Affection {
        /// Character whose affection is checked.
        #[serde(default)]
        character_id: Option<String>,
        /// Inclusive lower bound.
        #[serde(default)]
        min: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default)]
        max: Option<f64>,
        /// Exact match; takes precedence over the bounds.
        #[serde(default)]
        value: Option<Value>,
    },
    /// Legacy: range check against `{factionId}_reputation`.
    Reputation {
        /// Faction whose reputation is checked.
        #[serde(default)]
        faction_id: Option<String>,
        /// Inclusive lower bound.
        #[serde(default)]
        min: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default)]
        max: Option<f64>,
        /// Exact match; takes precedence over the bounds.
        #[serde(default)]
        value: Option<Value>,
    },
    /// Legacy: the flag `relic_{value}` is truthy.
    HasRelic {
        /// Relic id.
        #[serde(default)]
        value: Option<Value>,
    },
    /// Party membership. Not modeled at runtime: always true.
    Character {
        /// Character id.
        #[serde(default)]
        character_id: Option<String>,
    },
    /// Any type this version does not know. Evaluates to true.
    #[serde(other)]
    Unknown,
}

impl Condition {
    /// Shorthand for a variable comparison.
    pub fn variable(
        variable_id: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self::Variable {
            variable_id: Some(variable_id.into()),
            operator: Some(operator),
            value: Some(value.into()),
        }
    }

    /// Shorthand for a choice-made check.
    pub fn choice_made(choice_id: impl Into<String>) -> Self {
        Self::ChoiceMade {
            choice_id: Some(choice_id.into()),
        }
    }

    /// The `type` discriminant as written in documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Variable { .. } => "variable",
            Self::Gold { .. } => "gold",
            Self::Hp { .. } => "hp",
            Self::Flag { .. } => "flag",
            Self::ChoiceMade { .. } => "choice_made",
            Self::Affection { .. } => "affection",
            Self::Reputation { .. } => "reputation",
            Self::HasRelic { .. } => "has_relic",
            Self::Character { .. } => "character",
            Self::Unknown => "unknown",
        }
    }
}
