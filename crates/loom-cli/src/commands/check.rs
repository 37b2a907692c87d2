use std::path::Path;

use colored::Colorize;
use loom_story::validate_project;

use super::plural;

pub fn run(path: &Path) -> Result<(), String> {
    let project = super::load_project(path)?;
    let issues = validate_project(&project);

    for issue in &issues {
        let level = if issue.is_error {
            "error".red().bold()
        } else {
            "warning".yellow().bold()
        };
        eprintln!("  {level}: {}: {}", issue.location, issue.message);
    }

    let errors = issues.iter().filter(|i| i.is_error).count();
    let warnings = issues.len() - errors;
    if errors > 0 {
        eprintln!(
            "  {errors} error{}, {warnings} warning{}",
            plural(errors),
            plural(warnings)
        );
        return Err("validation failed with errors".into());
    }
    if warnings > 0 {
        eprintln!("  {warnings} warning{}", plural(warnings));
    }

    let chapters: usize = project.stages.iter().map(|s| s.chapters.len()).sum();
    let nodes: usize = project
        .stages
        .iter()
        .flat_map(|s| &s.chapters)
        .map(|c| c.nodes.len())
        .sum();
    println!("  All checks passed for '{}'.", project.name);
    println!(
        "  {} stage{}, {chapters} chapter{}, {nodes} node{}",
        project.stages.len(),
        plural(project.stages.len()),
        plural(chapters),
        plural(nodes)
    );

    Ok(())
}
