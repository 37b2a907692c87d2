use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use loom_engine::GameEngine;
use loom_story::{NodeType, VariableDefinition, VariableType};

pub fn run(path: &Path) -> Result<(), String> {
    let engine = GameEngine::new(super::load_project(path)?);
    let info = engine.project_info();
    let project = engine.project();

    println!("  {} [{}]", info.name.bold(), format!("v{}", info.version).dimmed());
    println!("  mode: {} | theme: {}", info.game_mode, info.theme);
    println!();

    if project.stages.is_empty() {
        println!("  No stages.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Stage", "Chapter", "Title", "Nodes", "Choices", "Start"]);
    for stage in &project.stages {
        if stage.chapters.is_empty() {
            table.add_row(vec![stage.id.as_str(), "-", stage.title.as_str(), "0", "0", "-"]);
        }
        for chapter in &stage.chapters {
            let choices = chapter.nodes_of_type(NodeType::Choice).count();
            table.add_row(vec![
                stage.id.clone(),
                chapter.id.clone(),
                chapter.title.clone(),
                chapter.nodes.len().to_string(),
                choices.to_string(),
                chapter.entry_node_id().unwrap_or("-").to_string(),
            ]);
        }
    }
    println!("{table}");

    let mut variables: Vec<(&str, &VariableDefinition)> = project
        .variables
        .iter()
        .map(|v| ("global", v))
        .collect();
    for stage in &project.stages {
        for chapter in &stage.chapters {
            variables.extend(chapter.variables.iter().map(|v| (chapter.id.as_str(), v)));
        }
    }

    println!();
    if variables.is_empty() {
        println!("  No variables.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Name", "Type", "Default", "Scope"]);
    for (scope, definition) in &variables {
        table.add_row(vec![
            definition.id.clone(),
            definition.name.clone(),
            type_label(definition.var_type).to_string(),
            definition.default_value.render(),
            scope.to_string(),
        ]);
    }
    println!("{table}");
    println!();
    println!("  {} variables", variables.len());

    Ok(())
}

fn type_label(var_type: VariableType) -> &'static str {
    match var_type {
        VariableType::Boolean => "boolean",
        VariableType::Number => "number",
        VariableType::String => "string",
        VariableType::Array => "array",
    }
}
