use std::collections::BTreeMap;

use loom_story::{Value, VariableDefinition};
use serde::{Deserialize, Serialize};

/// The live variable store of one run.
///
/// `variables` is keyed by variable id and seeded from the declared
/// defaults. `flags` and `choices_made` belong to the older flag-based model
/// and are still read by legacy conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameVariables {
    /// Declared variables by id.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    /// Legacy flags by key.
    #[serde(default)]
    pub flags: BTreeMap<String, Value>,
    /// Ids of every choice picked, in order.
    #[serde(default)]
    pub choices_made: Vec<String>,
}

impl GameVariables {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with global defaults, then chapter-local defaults.
    /// A local definition with the same id as a global one wins.
    pub fn seeded(globals: &[VariableDefinition], locals: &[VariableDefinition]) -> Self {
        let mut vars = Self::new();
        vars.seed(globals);
        vars.seed(locals);
        vars
    }

    /// Overwrite each defined variable with its default value.
    pub fn seed(&mut self, definitions: &[VariableDefinition]) {
        for def in definitions {
            self.variables
                .insert(def.id.clone(), def.default_value.clone());
        }
    }

    /// Look up a variable by id.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.variables.get(id)
    }

    /// Assign a variable.
    pub fn set(&mut self, id: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(id.into(), value.into());
    }

    /// Look up a legacy flag.
    pub fn flag(&self, key: &str) -> Option<&Value> {
        self.flags.get(key)
    }

    /// Assign a legacy flag.
    pub fn set_flag(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.flags.insert(key.into(), value.into());
    }

    /// Record that a choice was picked.
    pub fn record_choice(&mut self, choice_id: impl Into<String>) {
        self.choices_made.push(choice_id.into());
    }

    /// Whether a choice with this id was ever picked.
    pub fn has_made_choice(&self, choice_id: &str) -> bool {
        self.choices_made.iter().any(|c| c == choice_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locals_override_globals() {
        let globals = vec![
            VariableDefinition::new("gold", "Gold", 10),
            VariableDefinition::new("name", "Name", "Ash"),
        ];
        let locals = vec![VariableDefinition::new("gold", "Gold", 99)];
        let vars = GameVariables::seeded(&globals, &locals);
        assert_eq!(vars.get("gold"), Some(&Value::from(99)));
        assert_eq!(vars.get("name"), Some(&Value::from("Ash")));
    }

    #[test]
    fn choices_and_flags() {
        let mut vars = GameVariables::new();
        vars.record_choice("buy");
        vars.set_flag("met_merchant", true);
        assert!(vars.has_made_choice("buy"));
        assert!(!vars.has_made_choice("leave"));
        assert_eq!(vars.flag("met_merchant"), Some(&Value::Bool(true)));
    }

    #[test]
    fn serializes_camel_case() {
        let mut vars = GameVariables::new();
        vars.record_choice("c1");
        let json = serde_json::to_value(&vars).unwrap();
        assert_eq!(json["choicesMade"][0], "c1");
    }
}
