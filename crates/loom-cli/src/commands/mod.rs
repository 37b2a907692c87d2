pub mod check;
pub mod play;
pub mod show;

use std::path::Path;

use loom_story::StoryProject;

/// Read and parse a story document.
fn load_project(path: &Path) -> Result<StoryProject, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    StoryProject::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
