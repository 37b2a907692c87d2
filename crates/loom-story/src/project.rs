use serde::{Deserialize, Serialize};

use crate::error::{StoryError, StoryResult};
use crate::node::{Node, NodeType};
use crate::value::Value;

/// Declared type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    /// `true`/`false`
    Boolean,
    /// Any JSON number.
    Number,
    /// Text.
    String,
    /// A list of scalar items.
    Array,
}

/// Schema for one variable. The live value is held by the interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    /// Variable id, used by conditions and operations.
    pub id: String,
    /// Display name, usable in `{{Name}}` interpolation.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub var_type: VariableType,
    /// Value seeded at chapter start.
    pub default_value: Value,
    /// Item type for arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_item_type: Option<VariableType>,
    /// Free-text note for authors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VariableDefinition {
    /// Create a definition whose type is inferred from the default value.
    pub fn new(id: impl Into<String>, name: impl Into<String>, default_value: impl Into<Value>) -> Self {
        let default_value = default_value.into();
        let var_type = match &default_value {
            Value::Bool(_) => VariableType::Boolean,
            Value::Number(_) => VariableType::Number,
            Value::String(_) => VariableType::String,
            Value::Array(_) => VariableType::Array,
        };
        Self {
            id: id.into(),
            name: name.into(),
            var_type,
            default_value,
            array_item_type: None,
            description: None,
        }
    }
}

/// An ordered chapter graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Chapter id, unique within its stage.
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Author notes.
    #[serde(default)]
    pub description: String,
    /// Nodes in authoring order.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Designated entry node; may be empty.
    #[serde(default)]
    pub start_node_id: String,
    /// Variables reset every time this chapter starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableDefinition>,
    /// Short name scripts use to address this chapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Chapter {
    /// Create an empty chapter.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            nodes: Vec::new(),
            start_node_id: String::new(),
            variables: Vec::new(),
            alias: None,
        }
    }

    /// Append a node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Set the designated entry node.
    pub fn with_start(mut self, node_id: impl Into<String>) -> Self {
        self.start_node_id = node_id.into();
        self
    }

    /// Declare a chapter-local variable.
    pub fn with_variable(mut self, definition: VariableDefinition) -> Self {
        self.variables.push(definition);
        self
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The node execution begins at.
    ///
    /// The designated `start_node_id` when it names a node in this chapter;
    /// otherwise the first `start` node, otherwise the first node in list
    /// order.
    pub fn entry_node_id(&self) -> Option<&str> {
        if self.node(&self.start_node_id).is_some() {
            return Some(&self.start_node_id);
        }
        self.nodes
            .iter()
            .find(|n| n.node_type() == NodeType::Start)
            .or_else(|| self.nodes.first())
            .map(|n| n.id.as_str())
    }

    /// Nodes of the given type.
    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.node_type() == node_type)
    }
}

/// A group of chapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    /// Stage id.
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Author notes.
    #[serde(default)]
    pub description: String,
    /// Chapters in play order.
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

impl Stage {
    /// Create an empty stage.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            chapters: Vec::new(),
        }
    }

    /// Append a chapter.
    pub fn with_chapter(mut self, chapter: Chapter) -> Self {
        self.chapters.push(chapter);
        self
    }

    /// Look up a chapter by id.
    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }
}

/// Playback defaults shipped with the project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// `visualNovel` or `textAdventure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_game_mode: Option<String>,
    /// Theme preset id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_theme_id: Option<String>,
}

/// The whole authored story.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryProject {
    /// Project name.
    #[serde(default)]
    pub name: String,
    /// Project version string.
    #[serde(default)]
    pub version: String,
    /// Stages in play order.
    #[serde(default)]
    pub stages: Vec<Stage>,
    /// Global variable definitions.
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
    /// Playback defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_settings: Option<GameSettings>,
}

impl StoryProject {
    /// Create an empty project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            ..Self::default()
        }
    }

    /// Parse a project from its JSON form.
    pub fn from_json(json: &str) -> StoryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the project to pretty JSON.
    pub fn to_json(&self) -> StoryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Append a stage.
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Declare a global variable.
    pub fn with_variable(mut self, definition: VariableDefinition) -> Self {
        self.variables.push(definition);
        self
    }

    /// Look up a stage by id.
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Look up a chapter by stage and chapter id.
    pub fn chapter(&self, stage_id: &str, chapter_id: &str) -> Option<&Chapter> {
        self.stage(stage_id).and_then(|s| s.chapter(chapter_id))
    }

    /// Resolve a stage/chapter pair, where `None` means "the first one".
    pub fn resolve(
        &self,
        stage_id: Option<&str>,
        chapter_id: Option<&str>,
    ) -> StoryResult<(&Stage, &Chapter)> {
        let stage = match stage_id {
            Some(id) => self
                .stage(id)
                .ok_or_else(|| StoryError::StageNotFound(id.to_string()))?,
            None => self
                .stages
                .first()
                .ok_or_else(|| StoryError::StageNotFound("<first>".to_string()))?,
        };
        let chapter = match chapter_id {
            Some(id) => stage
                .chapter(id)
                .ok_or_else(|| StoryError::ChapterNotFound {
                    stage: stage.id.clone(),
                    chapter: id.to_string(),
                })?,
            None => stage
                .chapters
                .first()
                .ok_or_else(|| StoryError::ChapterNotFound {
                    stage: stage.id.clone(),
                    chapter: "<first>".to_string(),
                })?,
        };
        Ok((stage, chapter))
    }

    /// The chapter played after the given one: the next chapter of the same
    /// stage, or the first chapter of the next non-empty stage.
    pub fn chapter_after(&self, stage_id: &str, chapter_id: &str) -> Option<(&Stage, &Chapter)> {
        let stage_index = self.stages.iter().position(|s| s.id == stage_id)?;
        let stage = &self.stages[stage_index];
        let chapter_index = stage.chapters.iter().position(|c| c.id == chapter_id)?;

        if let Some(chapter) = stage.chapters.get(chapter_index + 1) {
            return Some((stage, chapter));
        }
        self.stages[stage_index + 1..]
            .iter()
            .find_map(|s| s.chapters.first().map(|c| (s, c)))
    }

    /// Find a variable definition by display name, searching the chapter's
    /// local definitions before the global ones.
    pub fn variable_by_name<'a>(
        &'a self,
        chapter: Option<&'a Chapter>,
        name: &str,
    ) -> Option<&'a VariableDefinition> {
        chapter
            .into_iter()
            .flat_map(|c| c.variables.iter())
            .chain(self.variables.iter())
            .find(|v| v.name == name)
    }
}
