//! Line-oriented player: Enter advances, a number picks a choice.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use loom_engine::{
    ChapterTransition, Clock, EngineConfig, EngineObserver, EngineResult, GameEngine, SystemClock,
};
use loom_story::{Node, NodeKind};
use tracing::debug;

const HELP: &str = "  <enter>      continue
  <number>     pick a choice
  vars         show variables and flags
  log          show the transcript so far
  save <file>  write the current run to a file
  load <file>  resume a run from a file
  restart      start the chapter over
  q            quit";

/// What the engine reported since the last prompt.
#[derive(Default)]
struct Feed {
    nodes: Vec<Node>,
    transition: Option<ChapterTransition>,
}

#[derive(Clone, Default)]
struct Tap(Rc<RefCell<Feed>>);

impl Tap {
    fn take_nodes(&self) -> Vec<Node> {
        std::mem::take(&mut self.0.borrow_mut().nodes)
    }

    fn take_transition(&self) -> Option<ChapterTransition> {
        self.0.borrow_mut().transition.take()
    }
}

impl EngineObserver for Tap {
    fn on_node_change(&mut self, node: Option<&Node>) {
        if let Some(node) = node {
            self.0.borrow_mut().nodes.push(node.clone());
        }
    }

    fn on_chapter_end(&mut self, transition: &ChapterTransition) {
        self.0.borrow_mut().transition = Some(transition.clone());
    }
}

pub fn run(
    path: &Path,
    stage: Option<&str>,
    chapter: Option<&str>,
    history_limit: Option<usize>,
) -> Result<(), String> {
    let project = super::load_project(path)?;
    let mut config = EngineConfig::default();
    if let Some(limit) = history_limit {
        config = config.with_history_limit(limit);
    }

    let tap = Tap::default();
    let mut engine = GameEngine::new(project)
        .with_config(config)
        .with_observer(tap.clone());
    engine
        .start(stage, chapter)
        .map_err(|e| format!("cannot start story: {e}"))?;

    println!("  {} {}", "Playing".bold(), engine.project_info().name);
    println!("  Press Enter to continue, a number to choose, 'help' for commands.\n");

    let mut scene = Vec::new();
    settle(&mut engine);
    render(&engine, &tap, &mut scene);

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        if let Some(transition) = tap.take_transition() {
            match transition.target() {
                Some((stage_id, chapter_id)) => {
                    debug!(stage = %stage_id, chapter = %chapter_id, "switching chapter");
                    println!("  {}\n", format!("~ {chapter_id} ~").dimmed());
                    engine
                        .start_chapter(stage_id, chapter_id)
                        .map_err(|e| format!("cannot continue story: {e}"))?;
                    settle(&mut engine);
                    render(&engine, &tap, &mut scene);
                }
                None => {
                    debug!("story finished");
                    println!("  {}", "The End.".bold());
                    break;
                }
            }
        }

        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        match input {
            "q" | "quit" => break,
            "help" => println!("{HELP}\n"),
            "vars" => print_variables(&engine),
            "log" => print!("{}", engine.history().export_text()),
            "restart" => report(engine.restart()),
            "" => report(engine.advance()),
            _ => {
                if let Some(file) = input.strip_prefix("save ") {
                    save(&engine, file.trim());
                } else if let Some(file) = input.strip_prefix("load ") {
                    load(&mut engine, file.trim());
                } else {
                    match input.parse::<usize>() {
                        Ok(n) if n >= 1 => report(engine.select_choice(n - 1)),
                        _ => println!("  {}\n", format!("unknown command: {input}").yellow()),
                    }
                }
            }
        }

        settle(&mut engine);
        render(&engine, &tap, &mut scene);
    }

    Ok(())
}

/// Sleep through pending image timers so effects finish before the prompt.
fn settle(engine: &mut GameEngine) {
    while let Some(due) = engine.next_timer_due() {
        let wait = due.saturating_sub(SystemClock.now_ms());
        if wait > 0 {
            thread::sleep(Duration::from_millis(wait.unsigned_abs()));
        }
        engine.poll_timers();
    }
}

fn report(result: EngineResult<()>) {
    if let Err(e) = result {
        println!("  {}\n", e.to_string().yellow());
    }
}

fn render(engine: &GameEngine, tap: &Tap, scene: &mut Vec<String>) {
    let shown: Vec<String> = engine
        .active_images()
        .images()
        .iter()
        .filter(|img| !img.is_exiting)
        .map(|img| format!("{} ({})", img.resource_path, img.layer))
        .collect();
    if shown != *scene {
        if shown.is_empty() {
            println!("  {}", "[scene cleared]".dimmed());
        } else {
            println!("  {}", format!("[scene: {}]", shown.join(", ")).dimmed());
        }
        *scene = shown;
    }

    for node in tap.take_nodes() {
        render_node(engine, &node);
    }
}

fn render_node(engine: &GameEngine, node: &Node) {
    let text = engine.interpolate_text(node.text_or_empty());
    let tag = match &node.kind {
        NodeKind::Battle { .. } => Some("battle"),
        NodeKind::Shop => Some("shop"),
        NodeKind::Event { .. } => Some("event"),
        NodeKind::Custom { .. } => Some("custom"),
        NodeKind::ChapterEnd { .. } => Some("end of chapter"),
        _ => None,
    };
    if let Some(tag) = tag {
        println!("  {}", format!("[{tag}]").dimmed());
    }

    match node.speaker.as_deref().filter(|s| !s.is_empty()) {
        Some(speaker) => println!("  {}: {text}", speaker.bold()),
        None if !text.is_empty() => println!("  {text}"),
        None => {}
    }

    if node.id == engine.state().current_node_id {
        for choice in engine.available_choices() {
            let label = engine.interpolate_text(choice.label());
            if choice.enabled {
                println!("    {}) {label}", choice.index + 1);
            } else {
                println!("    {}", format!("{}) {label} (locked)", choice.index + 1).dimmed());
            }
        }
    }
    println!();
}

fn print_variables(engine: &GameEngine) {
    let vars = engine.variables();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Value", "Kind"]);
    for (id, value) in &vars.variables {
        table.add_row(vec![id.clone(), value.render(), "variable".to_string()]);
    }
    for (key, value) in &vars.flags {
        table.add_row(vec![key.clone(), value.render(), "flag".to_string()]);
    }
    println!("{table}");
    if !vars.choices_made.is_empty() {
        println!("  choices: {}", vars.choices_made.join(", "));
    }
    println!();
}

fn save(engine: &GameEngine, file: &str) {
    let result = engine
        .save()
        .map_err(|e| e.to_string())
        .and_then(|data| std::fs::write(file, data).map_err(|e| e.to_string()));
    match result {
        Ok(()) => {
            debug!(file, node = %engine.state().current_node_id, "run saved");
            println!("  {}\n", format!("saved to {file}").green());
        }
        Err(e) => println!("  {}\n", format!("save failed: {e}").yellow()),
    }
}

fn load(engine: &mut GameEngine, file: &str) {
    let result = std::fs::read_to_string(file)
        .map_err(|e| e.to_string())
        .and_then(|data| engine.load(&data).map_err(|e| e.to_string()));
    match result {
        Ok(()) => {
            debug!(file, node = %engine.state().current_node_id, "run loaded");
            println!("  {}\n", format!("loaded {file}").green());
        }
        Err(e) => println!("  {}\n", format!("load failed: {e}").yellow()),
    }
}
