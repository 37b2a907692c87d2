//! Structural checks over a story project.
//!
//! Validation never blocks playback: the interpreter copes with every issue
//! reported here by halting or falling back. The checks exist so authors
//! hear about a broken graph before a player does.

use std::collections::HashSet;

use crate::node::NodeType;
use crate::project::{Chapter, Stage, StoryProject};

/// A warning or error found during project validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Where the issue was found, e.g. `stage 'Act I' / chapter 'Arrival'`.
    pub location: String,
    /// A human-readable description of the issue.
    pub message: String,
    /// Whether this is an error (true) or a warning (false).
    pub is_error: bool,
}

impl ValidationIssue {
    fn error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
            is_error: true,
        }
    }

    fn warning(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
            is_error: false,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = if self.is_error { "error" } else { "warning" };
        write!(f, "{level}: {}: {}", self.location, self.message)
    }
}

/// Validate every stage and chapter of a project.
///
/// Returns the issues found, errors and warnings interleaved in document
/// order. An empty list means the project is clean.
pub fn validate_project(project: &StoryProject) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if project.stages.is_empty() {
        issues.push(ValidationIssue::error(
            format!("project '{}'", project.name),
            "no stages defined",
        ));
        return issues;
    }

    for stage in &project.stages {
        validate_stage(stage, &mut issues);
    }

    issues
}

/// Validate a single chapter, addressed by stage and chapter id.
pub fn validate_chapter_by_id(
    project: &StoryProject,
    stage_id: &str,
    chapter_id: &str,
) -> Vec<ValidationIssue> {
    let Some(stage) = project.stage(stage_id) else {
        return vec![ValidationIssue::error(
            format!("stage '{stage_id}'"),
            "stage not found",
        )];
    };
    let Some(chapter) = stage.chapter(chapter_id) else {
        return vec![ValidationIssue::error(
            format!("stage '{}'", stage.title),
            format!("chapter '{chapter_id}' not found"),
        )];
    };

    let mut issues = Vec::new();
    validate_chapter(stage, chapter, &mut issues);
    issues
}

fn validate_stage(stage: &Stage, issues: &mut Vec<ValidationIssue>) {
    if stage.chapters.is_empty() {
        issues.push(ValidationIssue::warning(
            format!("stage '{}'", stage.title),
            "no chapters defined",
        ));
        return;
    }

    for chapter in &stage.chapters {
        validate_chapter(stage, chapter, issues);
    }
}

fn validate_chapter(stage: &Stage, chapter: &Chapter, issues: &mut Vec<ValidationIssue>) {
    let location = format!("stage '{}' / chapter '{}'", stage.title, chapter.title);

    match chapter.nodes_of_type(NodeType::Start).count() {
        0 => issues.push(ValidationIssue::error(&location, "no start node")),
        1 => {}
        n => issues.push(ValidationIssue::warning(
            &location,
            format!("{n} start nodes (one is recommended)"),
        )),
    }

    if chapter.nodes_of_type(NodeType::ChapterEnd).next().is_none() {
        issues.push(ValidationIssue::error(&location, "no chapter_end node"));
    }

    let mut ids = HashSet::new();
    for node in &chapter.nodes {
        if !ids.insert(node.id.as_str()) {
            issues.push(ValidationIssue::warning(
                &location,
                format!("duplicate node id '{}'", node.id),
            ));
        }
    }

    if !chapter.start_node_id.is_empty() && !ids.contains(chapter.start_node_id.as_str()) {
        issues.push(ValidationIssue::warning(
            &location,
            format!("startNodeId '{}' does not exist", chapter.start_node_id),
        ));
    }

    for node in &chapter.nodes {
        for target in node.targets() {
            if !ids.contains(target) {
                issues.push(ValidationIssue::warning(
                    &location,
                    format!("node '{}' points to missing node '{target}'", node.id),
                ));
            }
        }
    }
}
