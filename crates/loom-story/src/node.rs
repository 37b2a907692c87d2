//! Nodes of a chapter graph and the payload carried by each node type.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::image::ImageData;
use crate::operation::VariableOperation;
use crate::value::Value;

/// One step in a chapter's execution graph.
///
/// Fields shared by every node type live here; the type tag and its
/// payload live in [`NodeKind`]. Editors sometimes write empty strings for
/// "no successor", so successor ids should be read through [`Node::next`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Author-assigned id, unique within its chapter.
    pub id: String,
    /// Successor pointer. Absent means no automatic successor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<String>,
    /// Speaker name for narrative nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Narrative text or choice prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Legacy effects applied when the node is entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_enter_effects: Option<ChoiceEffect>,
    /// Type tag and type-specific payload.
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Create a node of the given kind with no successor and no text.
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            next_node_id: None,
            speaker: None,
            text: None,
            on_enter_effects: None,
            kind,
        }
    }

    /// Set the successor.
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next_node_id = Some(next.into());
        self
    }

    /// Set the narrative text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the speaker.
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Set legacy on-enter effects.
    pub fn with_enter_effects(mut self, effects: ChoiceEffect) -> Self {
        self.on_enter_effects = Some(effects);
        self
    }

    /// The successor id, treating an empty string as absent.
    pub fn next(&self) -> Option<&str> {
        non_empty(self.next_node_id.as_deref())
    }

    /// The node's type tag.
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// The narrative text, or `""`.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Every node id this node can transfer control to.
    pub fn targets(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.next().into_iter().collect();
        match &self.kind {
            NodeKind::Choice { choices } => {
                out.extend(choices.iter().filter_map(Choice::target));
            }
            NodeKind::Condition {
                condition_branches,
                default_next_node_id,
            } => {
                out.extend(condition_branches.iter().filter_map(ConditionBranch::target));
                out.extend(non_empty(default_next_node_id.as_deref()));
            }
            _ => {}
        }
        out
    }
}

/// The type tag of a node and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NodeKind {
    /// Chapter entry point; passes straight through to its successor.
    Start,
    /// A line of dialogue; waits for the player to advance.
    Dialogue,
    /// A prompt with selectable choices; waits for a selection.
    Choice {
        /// Options offered to the player.
        #[serde(default)]
        choices: Vec<Choice>,
    },
    /// A battle encounter resolved by the host; waits for advance.
    Battle {
        /// Enemy group to fight.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        battle_group_id: Option<String>,
    },
    /// A shop screen provided by the host; waits for advance.
    Shop,
    /// A scripted event provided by the host; waits for advance.
    Event {
        /// Event to trigger.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
    /// End of the chapter.
    ChapterEnd {
        /// What happens after the chapter ends.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chapter_end_data: Option<ChapterEndData>,
    },
    /// Runs variable operations in order, then passes through.
    Variable {
        /// Operations, executed in array order.
        #[serde(default)]
        variable_operations: Vec<VariableOperation>,
    },
    /// Picks the first branch whose condition holds.
    Condition {
        /// Branches, tested in array order.
        #[serde(default)]
        condition_branches: Vec<ConditionBranch>,
        /// Target when no branch matches.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_next_node_id: Option<String>,
    },
    /// Shows, replaces, or clears an image slot.
    Image {
        /// Image payload.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_data: Option<ImageData>,
    },
    /// Embedded script. Opaque to the interpreter; passes through.
    Javascript {
        /// Script body.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        javascript_code: Option<String>,
    },
    /// Author-defined node rendered by the host; waits for advance.
    Custom {
        /// Field values filled in by the author.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_data: Option<CustomData>,
    },
}

impl NodeKind {
    /// The type tag without payload.
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Start => NodeType::Start,
            Self::Dialogue => NodeType::Dialogue,
            Self::Choice { .. } => NodeType::Choice,
            Self::Battle { .. } => NodeType::Battle,
            Self::Shop => NodeType::Shop,
            Self::Event { .. } => NodeType::Event,
            Self::ChapterEnd { .. } => NodeType::ChapterEnd,
            Self::Variable { .. } => NodeType::Variable,
            Self::Condition { .. } => NodeType::Condition,
            Self::Image { .. } => NodeType::Image,
            Self::Javascript { .. } => NodeType::Javascript,
            Self::Custom { .. } => NodeType::Custom,
        }
    }
}

/// Payload-free node type tag, as written in documents and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// `start`
    Start,
    /// `dialogue`
    Dialogue,
    /// `choice`
    Choice,
    /// `battle`
    Battle,
    /// `shop`
    Shop,
    /// `event`
    Event,
    /// `chapter_end`
    ChapterEnd,
    /// `variable`
    Variable,
    /// `condition`
    Condition,
    /// `image`
    Image,
    /// `javascript`
    Javascript,
    /// `custom`
    Custom,
}

impl NodeType {
    /// The tag as written in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Dialogue => "dialogue",
            Self::Choice => "choice",
            Self::Battle => "battle",
            Self::Shop => "shop",
            Self::Event => "event",
            Self::ChapterEnd => "chapter_end",
            Self::Variable => "variable",
            Self::Condition => "condition",
            Self::Image => "image",
            Self::Javascript => "javascript",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable option of a `choice` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    /// Choice id, recorded in `choicesMade` when picked.
    pub id: String,
    /// Label shown to the player.
    #[serde(default)]
    pub text: String,
    /// Node entered after picking this choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<String>,
    /// Gate; the choice is rejected at selection time when it fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Legacy effects applied when picked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<ChoiceEffect>,
    /// Text shown after the choice is picked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_text: Option<String>,
    /// Text shown in place of the label while the gate fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_text: Option<String>,
}

impl Choice {
    /// Create a choice leading to `next`.
    pub fn new(id: impl Into<String>, text: impl Into<String>, next: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            next_node_id: Some(next.into()),
            condition: None,
            effects: None,
            result_text: None,
            disabled_text: None,
        }
    }

    /// Gate the choice behind a condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Attach legacy effects.
    pub fn with_effects(mut self, effects: ChoiceEffect) -> Self {
        self.effects = Some(effects);
        self
    }

    /// The target node id, treating an empty string as absent.
    pub fn target(&self) -> Option<&str> {
        non_empty(self.next_node_id.as_deref())
    }
}

/// A stat change from the older effect model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatDelta {
    /// Character or faction the delta applies to.
    #[serde(alias = "characterId", alias = "factionId")]
    pub subject: String,
    /// Signed change.
    pub delta: f64,
}

/// Legacy side effects of a choice or of entering a node.
///
/// Only `set_flags` still has a runtime effect. The numeric deltas are
/// retired in favour of variable operations and are merely reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceEffect {
    /// Flags merged into the flag map.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set_flags: BTreeMap<String, Value>,
    /// Retired gold delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold: Option<f64>,
    /// Retired hp delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<f64>,
    /// Retired affection deltas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affection: Vec<StatDelta>,
    /// Retired reputation deltas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reputation: Vec<StatDelta>,
    /// Card reward, handled by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    /// Relic reward, handled by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relic_id: Option<String>,
}

impl ChoiceEffect {
    /// Effects that set one flag.
    pub fn set_flag(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut set_flags = BTreeMap::new();
        set_flags.insert(key.into(), value.into());
        Self {
            set_flags,
            ..Self::default()
        }
    }

    /// Whether any retired numeric delta is present.
    pub fn has_retired_deltas(&self) -> bool {
        self.gold.is_some()
            || self.hp.is_some()
            || !self.affection.is_empty()
            || !self.reputation.is_empty()
    }
}

/// One outgoing branch of a `condition` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionBranch {
    /// Branch id.
    #[serde(default)]
    pub id: String,
    /// Predicate for this branch.
    pub condition: Condition,
    /// Target when the predicate holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<String>,
}

impl ConditionBranch {
    /// Create a branch.
    pub fn new(id: impl Into<String>, condition: Condition, next: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            condition,
            next_node_id: Some(next.into()),
        }
    }

    /// The target node id, treating an empty string as absent.
    pub fn target(&self) -> Option<&str> {
        non_empty(self.next_node_id.as_deref())
    }
}

/// What the host should do once a chapter ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterEndAction {
    /// Continue with the following chapter.
    #[default]
    Next,
    /// Let the player pick a chapter.
    Select,
    /// End the game.
    End,
    /// Jump to a specific chapter.
    Goto,
}

/// Payload of a `chapter_end` node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterEndData {
    /// Follow-up action.
    #[serde(default)]
    pub action: ChapterEndAction,
    /// Target chapter for `goto`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_chapter_id: Option<String>,
    /// Target stage for `goto`; the current stage when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_stage_id: Option<String>,
    /// Whether visible images are cleared before the next chapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_visuals: Option<bool>,
}

/// Payload of a `custom` node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomData {
    /// Title shown by the host.
    #[serde(default)]
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field values keyed by field id.
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

fn non_empty(id: Option<&str>) -> Option<&str> {
    id.filter(|s| !s.is_empty())
}
