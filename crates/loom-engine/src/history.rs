use loom_story::{ImageData, ImageEffect, NodeType};
use serde::{Deserialize, Serialize};

/// Summary of an image change, kept for text-mode backlogs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryImage {
    /// Path that was shown; empty for a removal.
    pub resource_path: String,
    /// Layer that changed.
    pub layer: String,
    /// Whether the slot was cleared.
    #[serde(default)]
    pub is_removal: bool,
    /// Legacy single entrance effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<ImageEffect>,
    /// Entrance effects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<ImageEffect>,
    /// Entrance effect duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_duration: Option<u64>,
}

impl From<&ImageData> for HistoryImage {
    fn from(data: &ImageData) -> Self {
        Self {
            resource_path: data.resource_path.clone(),
            layer: data.layer.clone(),
            is_removal: data.is_removal(),
            effect: data.effect,
            effects: data.effects.clone(),
            effect_duration: data.effect_duration,
        }
    }
}

/// One presented beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Node that produced the beat.
    pub node_id: String,
    /// Type of that node; `choice` also marks a picked option.
    #[serde(rename = "type")]
    pub entry_type: NodeType,
    /// Narrative text or choice prompt.
    #[serde(default)]
    pub content: String,
    /// Speaker, for narrative nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// When the beat was recorded, in milliseconds.
    pub timestamp: i64,
    /// Text of the picked option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_text: Option<String>,
    /// Image change, for image nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<HistoryImage>,
}

/// The backlog of presented beats, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, evicting the oldest ones beyond `limit`.
    pub fn push(&mut self, entry: HistoryEntry, limit: usize) {
        self.entries.push(entry);
        let excess = self.entries.len().saturating_sub(limit.max(1));
        if excess > 0 {
            self.entries.drain(..excess);
        }
    }

    /// Append an entry unless the newest one has the same node and type.
    /// Returns whether the entry was added.
    pub fn push_unique(&mut self, entry: HistoryEntry, limit: usize) -> bool {
        let repeated = self
            .entries
            .last()
            .is_some_and(|last| last.node_id == entry.node_id && last.entry_type == entry.entry_type);
        if repeated {
            return false;
        }
        self.push(entry, limit);
        true
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The newest entry.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Render the backlog as plain text, one beat per line.
    pub fn export_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let line = match (&entry.choice_text, &entry.image_data) {
                (Some(choice), _) => format!("> {choice}"),
                (None, Some(image)) if image.is_removal => {
                    format!("[image removed: {}]", image.layer)
                }
                (None, Some(image)) => {
                    format!("[image: {} on {}]", image.resource_path, image.layer)
                }
                (None, None) => match &entry.speaker {
                    Some(speaker) if !speaker.is_empty() => {
                        format!("{speaker}: {}", entry.content)
                    }
                    _ => entry.content.clone(),
                },
            };
            if line.is_empty() {
                continue;
            }
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(node_id: &str, entry_type: NodeType) -> HistoryEntry {
        HistoryEntry {
            node_id: node_id.into(),
            entry_type,
            content: format!("text of {node_id}"),
            speaker: None,
            timestamp: 0,
            choice_text: None,
            image_data: None,
        }
    }

    #[test]
    fn push_unique_collapses_repeats() {
        let mut history = History::new();
        assert!(history.push_unique(entry("a", NodeType::Dialogue), 100));
        assert!(!history.push_unique(entry("a", NodeType::Dialogue), 100));
        assert!(history.push_unique(entry("a", NodeType::Image), 100));
        assert!(history.push_unique(entry("a", NodeType::Dialogue), 100));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn oldest_entries_are_evicted() {
        let mut history = History::new();
        for i in 0..5 {
            history.push(entry(&format!("n{i}"), NodeType::Dialogue), 3);
        }
        let ids: Vec<_> = history.entries().iter().map(|e| e.node_id.as_str()).collect();
        assert_eq!(ids, ["n2", "n3", "n4"]);
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut history = History::new();
        history.push(entry("a", NodeType::ChapterEnd), 10);
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json[0]["type"], "chapter_end");
        assert_eq!(json[0]["nodeId"], "a");
    }

    #[test]
    fn transcript() {
        let mut history = History::new();
        let mut line = entry("d1", NodeType::Dialogue);
        line.speaker = Some("Merchant".into());
        line.content = "Care to buy something?".into();
        history.push(line, 100);

        let mut image = entry("i1", NodeType::Image);
        image.content = String::new();
        image.image_data = Some(HistoryImage::from(&ImageData::new("shop.png", "background", 0)));
        history.push(image, 100);

        let mut prompt = entry("c1", NodeType::Choice);
        prompt.content = "What will you do?".into();
        history.push(prompt.clone(), 100);
        prompt.choice_text = Some("Buy the sword".into());
        history.push(prompt, 100);

        let mut cleared = entry("i2", NodeType::Image);
        cleared.content = "[image removed: background]".into();
        cleared.image_data = Some(HistoryImage::from(&ImageData::new("", "background", 0)));
        history.push(cleared, 100);

        insta::assert_snapshot!(history.export_text(), @r"
        Merchant: Care to buy something?
        [image: shop.png on background]
        What will you do?
        > Buy the sword
        [image removed: background]
        ");
    }

    proptest! {
        #[test]
        fn never_exceeds_limit(count in 0usize..300, limit in 1usize..150) {
            let mut history = History::new();
            for i in 0..count {
                history.push(entry(&format!("n{i}"), NodeType::Dialogue), limit);
            }
            prop_assert_eq!(history.len(), count.min(limit));
            if count > 0 {
                let newest = format!("n{}", count - 1);
                prop_assert_eq!(history.last().map(|e| e.node_id.clone()), Some(newest));
            }
        }
    }
}
