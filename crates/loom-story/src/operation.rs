use serde::{Deserialize, Serialize};

use crate::value::Value;

/// What a [`VariableOperation`] does to its target.
///
/// Scalar targets understand `set`, `add`, `subtract` and `multiply`. Array
/// targets understand `push`, `pop`, `removeAt`, `setAt`, `clear` and `set`
/// (whole-array replacement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationAction {
    /// Assign the operand.
    Set,
    /// Numeric addition, or concatenation on strings.
    Add,
    /// Numeric subtraction.
    Subtract,
    /// Numeric multiplication.
    Multiply,
    /// Append to an array.
    Push,
    /// Drop the last array item.
    Pop,
    /// Remove the array item at `index`.
    RemoveAt,
    /// Replace the array item at `index`.
    SetAt,
    /// Empty the array.
    Clear,
}

/// One mutation executed by a `variable` node, keyed by `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum VariableOperation {
    /// Mutate a declared variable.
    Variable {
        /// Variable id to write.
        #[serde(default)]
        variable_id: Option<String>,
        /// Mutation to apply.
        action: OperationAction,
        /// Literal operand.
        #[serde(default)]
        value: Option<Value>,
        /// Item index for `removeAt`/`setAt`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<i64>,
        /// Read the operand from `source_variable_id` instead of `value`.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        use_variable_value: bool,
        /// Variable providing the operand when `use_variable_value` is set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_variable_id: Option<String>,
    },
    /// Legacy: mutate a flag.
    Flag {
        /// Flag key.
        #[serde(default)]
        key: Option<String>,
        /// Mutation to apply.
        action: OperationAction,
        /// Literal operand.
        #[serde(default)]
        value: Option<Value>,
        /// Read the operand from `source_variable_id` instead of `value`.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        use_variable_value: bool,
        /// Variable providing the operand when `use_variable_value` is set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_variable_id: Option<String>,
    },
    /// Retired targets (`gold`, `hp`, `affection`, `reputation`). Ignored at
    /// runtime; documents should use declared variables instead.
    #[serde(other)]
    Retired,
}

impl VariableOperation {
    /// Build a variable operation with a literal operand.
    pub fn on_variable(
        variable_id: impl Into<String>,
        action: OperationAction,
        value: impl Into<Value>,
    ) -> Self {
        Self::Variable {
            variable_id: Some(variable_id.into()),
            action,
            value: Some(value.into()),
            index: None,
            use_variable_value: false,
            source_variable_id: None,
        }
    }

    /// Build a variable operation whose operand is another variable's value.
    pub fn from_variable(
        variable_id: impl Into<String>,
        action: OperationAction,
        source_variable_id: impl Into<String>,
    ) -> Self {
        Self::Variable {
            variable_id: Some(variable_id.into()),
            action,
            value: None,
            index: None,
            use_variable_value: true,
            source_variable_id: Some(source_variable_id.into()),
        }
    }

    /// Build an indexed array operation (`removeAt`/`setAt`).
    pub fn at_index(
        variable_id: impl Into<String>,
        action: OperationAction,
        index: i64,
        value: Option<Value>,
    ) -> Self {
        Self::Variable {
            variable_id: Some(variable_id.into()),
            action,
            value,
            index: Some(index),
            use_variable_value: false,
            source_variable_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variable_target() {
        let op: VariableOperation = serde_json::from_str(
            r#"{"target":"variable","action":"subtract","variableId":"gold","value":50}"#,
        )
        .unwrap();
        assert_eq!(
            op,
            VariableOperation::on_variable("gold", OperationAction::Subtract, 50)
        );
    }

    #[test]
    fn parses_array_action_and_reference() {
        let op: VariableOperation = serde_json::from_str(
            r#"{"target":"variable","action":"removeAt","variableId":"bag","value":0,"index":2,
                "useVariableValue":true,"sourceVariableId":"other"}"#,
        )
        .unwrap();
        match op {
            VariableOperation::Variable {
                action,
                index,
                use_variable_value,
                source_variable_id,
                ..
            } => {
                assert_eq!(action, OperationAction::RemoveAt);
                assert_eq!(index, Some(2));
                assert!(use_variable_value);
                assert_eq!(source_variable_id.as_deref(), Some("other"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn retired_targets_parse() {
        let op: VariableOperation = serde_json::from_str(
            r#"{"target":"gold","action":"add","value":10}"#,
        )
        .unwrap();
        assert_eq!(op, VariableOperation::Retired);
    }
}
