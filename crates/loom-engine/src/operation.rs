//! Variable operations and legacy effects.
//!
//! Operations run strictly in list order and each one reads the store as
//! the previous one left it. Operations that make no sense for the target's
//! current type leave it unchanged.

use loom_story::{ChoiceEffect, OperationAction, Value, VariableOperation};
use tracing::{debug, warn};

use crate::variables::GameVariables;

/// Execute a `variable` node's operations in order.
pub fn execute_all(operations: &[VariableOperation], vars: &mut GameVariables) {
    for op in operations {
        execute(op, vars);
    }
}

/// Execute one operation.
pub fn execute(op: &VariableOperation, vars: &mut GameVariables) {
    match op {
        VariableOperation::Variable {
            variable_id,
            action,
            value,
            index,
            use_variable_value,
            source_variable_id,
        } => {
            let Some(id) = variable_id.as_deref().filter(|s| !s.is_empty()) else {
                return;
            };
            let operand = operand(vars, value, *use_variable_value, source_variable_id);
            apply_to_variable(vars, id, *action, operand, *index);
        }
        VariableOperation::Flag {
            key,
            action,
            value,
            use_variable_value,
            source_variable_id,
        } => {
            let Some(key) = key.as_deref().filter(|s| !s.is_empty()) else {
                return;
            };
            let operand = operand(vars, value, *use_variable_value, source_variable_id);
            apply_to_flag(vars, key, *action, operand);
        }
        VariableOperation::Retired => {
            warn!("legacy variable operation target ignored; use a variable target instead");
        }
    }
}

/// Apply a choice's or a node's legacy effects.
///
/// Flags are merged into the flag map. Numeric stat deltas are retired and
/// only reported.
pub fn apply_effects(effects: &ChoiceEffect, vars: &mut GameVariables) {
    for (key, value) in &effects.set_flags {
        vars.set_flag(key.clone(), value.clone());
    }
    if effects.gold.is_some() || effects.hp.is_some() {
        warn!("legacy gold/hp effects ignored; use variable operations instead");
    }
    if !effects.affection.is_empty() || !effects.reputation.is_empty() {
        warn!("legacy affection/reputation effects ignored; use variable operations instead");
    }
    if let Some(card) = &effects.card_id {
        debug!(card = %card, "card reward left to the host");
    }
    if let Some(relic) = &effects.relic_id {
        debug!(relic = %relic, "relic reward left to the host");
    }
}

/// The operand, read from the source variable at execution time when the
/// operation asks for it and the source exists.
fn operand(
    vars: &GameVariables,
    literal: &Option<Value>,
    use_variable_value: bool,
    source: &Option<String>,
) -> Option<Value> {
    let from_source = use_variable_value
        .then(|| source.as_deref().and_then(|id| vars.get(id)))
        .flatten();
    from_source.cloned().or_else(|| literal.clone())
}

fn apply_to_variable(
    vars: &mut GameVariables,
    id: &str,
    action: OperationAction,
    operand: Option<Value>,
    index: Option<i64>,
) {
    let is_array = matches!(vars.get(id), Some(Value::Array(_)));
    if action == OperationAction::Set && !is_array {
        match operand {
            Some(value) => vars.set(id, value),
            None => {
                vars.variables.remove(id);
            }
        }
        return;
    }

    let number = operand.as_ref().and_then(Value::as_number).unwrap_or(0.0);
    match vars.variables.get_mut(id) {
        Some(Value::Array(items)) => apply_to_array(items, action, operand, index),
        Some(Value::Number(n)) => *n = arithmetic(*n, action, number),
        Some(Value::String(s)) if action == OperationAction::Add => {
            if let Some(value) = &operand {
                s.push_str(&value.to_string());
            }
        }
        _ => debug!(variable = id, ?action, "operation does not apply to current value"),
    }
}

fn apply_to_flag(
    vars: &mut GameVariables,
    key: &str,
    action: OperationAction,
    operand: Option<Value>,
) {
    if action == OperationAction::Set {
        match operand {
            Some(value) => vars.set_flag(key, value),
            None => {
                vars.flags.remove(key);
            }
        }
        return;
    }
    let number = operand.as_ref().and_then(Value::as_number).unwrap_or(0.0);
    if let Some(Value::Number(n)) = vars.flags.get_mut(key) {
        *n = arithmetic(*n, action, number);
    }
}

fn apply_to_array(
    items: &mut Vec<Value>,
    action: OperationAction,
    operand: Option<Value>,
    index: Option<i64>,
) {
    let slot = index
        .and_then(|i| usize::try_from(i).ok())
        .filter(|i| *i < items.len());

    match action {
        OperationAction::Push => items.extend(operand),
        OperationAction::Pop => {
            items.pop();
        }
        OperationAction::RemoveAt => {
            if let Some(i) = slot {
                items.remove(i);
            }
        }
        OperationAction::SetAt => {
            if let (Some(i), Some(value)) = (slot, operand) {
                items[i] = value;
            }
        }
        OperationAction::Clear => items.clear(),
        OperationAction::Set => {
            if let Some(Value::Array(replacement)) = operand {
                *items = replacement;
            }
        }
        OperationAction::Add | OperationAction::Subtract | OperationAction::Multiply => {
            debug!(?action, "arithmetic on an array is ignored");
        }
    }
}

fn arithmetic(current: f64, action: OperationAction, operand: f64) -> f64 {
    match action {
        OperationAction::Set => operand,
        OperationAction::Add => current + operand,
        OperationAction::Subtract => current - operand,
        OperationAction::Multiply => current * operand,
        _ => current,
    }
}
