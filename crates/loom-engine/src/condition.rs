//! Condition evaluation against the variable store.
//!
//! Evaluation never fails. Missing keys and mistyped values fall back to
//! safe defaults, and condition types this version does not know hold.

use loom_story::{ComparisonOperator, Condition, Value};
use tracing::warn;

use crate::variables::GameVariables;

/// Evaluate a condition against the current variables.
pub fn evaluate(condition: &Condition, vars: &GameVariables) -> bool {
    match condition {
        Condition::Variable {
            variable_id,
            operator,
            value,
        } => match non_empty(variable_id) {
            Some(id) => compare_values(
                vars.get(id),
                operator.unwrap_or_default(),
                value.as_ref(),
            ),
            None => false,
        },
        Condition::Gold { min, max, value } => legacy_stat(vars, "gold", *min, *max, value.as_ref()),
        Condition::Hp { min, max, value } => legacy_stat(vars, "hp", *min, *max, value.as_ref()),
        Condition::Flag {
            flag_key,
            flag_value,
        } => match non_empty(flag_key) {
            Some(key) => {
                let current = vars.flag(key);
                match flag_value {
                    Some(expected) => current == Some(expected),
                    None => current.is_some_and(Value::is_truthy),
                }
            }
            None => false,
        },
        Condition::ChoiceMade { choice_id } => {
            non_empty(choice_id).is_some_and(|id| vars.has_made_choice(id))
        }
        Condition::Affection {
            character_id,
            min,
            max,
            value,
        } => non_empty(character_id).is_some_and(|id| {
            derived_stat(vars, &format!("{id}_affection"), *min, *max, value.as_ref())
        }),
        Condition::Reputation {
            faction_id,
            min,
            max,
            value,
        } => non_empty(faction_id).is_some_and(|id| {
            derived_stat(vars, &format!("{id}_reputation"), *min, *max, value.as_ref())
        }),
        // Party membership is not tracked at runtime.
        Condition::Character { .. } => true,
        Condition::HasRelic { value } => match value {
            Some(relic) if relic.is_truthy() => vars
                .flag(&format!("relic_{relic}"))
                .is_some_and(Value::is_truthy),
            _ => false,
        },
        Condition::Unknown => true,
    }
}

/// Compare a variable's current value against an operand.
///
/// Arrays compare by length. A missing variable reads as the zero value of
/// the operand's type. `==` and `!=` compare loosely across types; ordering
/// operators hold only when both sides are numbers.
pub fn compare_values(
    left: Option<&Value>,
    operator: ComparisonOperator,
    right: Option<&Value>,
) -> bool {
    let left = match left {
        Some(Value::Array(items)) => Value::Number(items.len() as f64),
        Some(value) => value.clone(),
        None => match right {
            Some(r @ (Value::Number(_) | Value::Bool(_) | Value::String(_))) => r.zero_like(),
            _ => Value::Bool(false),
        },
    };

    let Some(right) = right else {
        return operator == ComparisonOperator::Ne;
    };

    match operator {
        ComparisonOperator::Eq => left.loose_eq(right),
        ComparisonOperator::Ne => !left.loose_eq(right),
        ComparisonOperator::Gt => numeric(&left, right, |a, b| a > b),
        ComparisonOperator::Ge => numeric(&left, right, |a, b| a >= b),
        ComparisonOperator::Lt => numeric(&left, right, |a, b| a < b),
        ComparisonOperator::Le => numeric(&left, right, |a, b| a <= b),
    }
}

fn numeric(left: &Value, right: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn legacy_stat(
    vars: &GameVariables,
    name: &str,
    min: Option<f64>,
    max: Option<f64>,
    exact: Option<&Value>,
) -> bool {
    match vars.get(name).and_then(Value::as_number) {
        Some(current) => in_range(current, min, max, exact),
        None => {
            warn!(condition = name, "legacy condition without a numeric variable of that name");
            true
        }
    }
}

fn derived_stat(
    vars: &GameVariables,
    key: &str,
    min: Option<f64>,
    max: Option<f64>,
    exact: Option<&Value>,
) -> bool {
    let current = vars.get(key).and_then(Value::as_number).unwrap_or(0.0);
    in_range(current, min, max, exact)
}

/// An exact value wins over the bounds; bounds are inclusive.
fn in_range(value: f64, min: Option<f64>, max: Option<f64>, exact: Option<&Value>) -> bool {
    if let Some(exact) = exact {
        return exact.as_number() == Some(value);
    }
    if min.is_some_and(|m| value < m) {
        return false;
    }
    if max.is_some_and(|m| value > m) {
        return false;
    }
    true
}

fn non_empty(id: &Option<String>) -> Option<&str> {
    id.as_deref().filter(|s| !s.is_empty())
}
