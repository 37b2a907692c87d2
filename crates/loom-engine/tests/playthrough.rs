//! Integration playthrough tests for the loom engine.
use std::cell::RefCell;
use std::rc::Rc;

use loom_engine::{
    ChapterTransition, EngineError, EngineObserver, EngineStatus, GameEngine, GameState,
    ManualClock,
};
use loom_story::{
    Chapter, ChapterEndAction, ChapterEndData, Choice, ComparisonOperator, Condition,
    ConditionBranch, ExitEffect, ImageData, ImageEffect, Node, NodeKind, OperationAction, Stage,
    StoryProject, TransitionTiming, Value, VariableDefinition, VariableOperation,
};

const MERCHANT: &str = r#"{
  "name": "Merchant",
  "version": "1.0.0",
  "variables": [
    { "id": "gold", "name": "Gold", "type": "number", "defaultValue": 75 },
    { "id": "bought_item", "name": "Bought", "type": "boolean", "defaultValue": false }
  ],
  "stages": [{
    "id": "town",
    "title": "Town",
    "chapters": [{
      "id": "market",
      "title": "Market",
      "startNodeId": "start",
      "nodes": [
        { "id": "start", "type": "start", "nextNodeId": "choice1" },
        { "id": "choice1", "type": "choice", "text": "The merchant shows you a sword.",
          "choices": [
            { "id": "buy", "text": "Buy it (50 gold)", "nextNodeId": "pay",
              "condition": { "type": "variable", "variableId": "gold", "operator": ">=", "value": 50 } },
            { "id": "leave", "text": "Walk away", "nextNodeId": "farewell" }
          ] },
        { "id": "pay", "type": "variable", "nextNodeId": "check",
          "variableOperations": [
            { "target": "variable", "variableId": "gold", "action": "subtract", "value": 50 },
            { "target": "variable", "variableId": "bought_item", "action": "set", "value": true }
          ] },
        { "id": "check", "type": "condition", "defaultNextNodeId": "farewell",
          "conditionBranches": [
            { "id": "bought", "nextNodeId": "bought_line",
              "condition": { "type": "variable", "variableId": "bought_item", "operator": "==", "value": true } },
            { "id": "rich", "nextNodeId": "rich_line",
              "condition": { "type": "variable", "variableId": "gold", "operator": ">=", "value": 100 } }
          ] },
        { "id": "bought_line", "type": "dialogue", "speaker": "Merchant",
          "text": "Enjoy the blade. You have {{Gold}} gold left.", "nextNodeId": "end" },
        { "id": "rich_line", "type": "dialogue", "text": "Come back anytime.", "nextNodeId": "end" },
        { "id": "farewell", "type": "dialogue", "text": "Suit yourself.", "nextNodeId": "end" },
        { "id": "end", "type": "chapter_end", "chapterEndData": { "action": "end" } }
      ]
    }]
  }]
}"#;

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<String>>>);

impl Recorder {
    fn count(&self, event: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == event).count()
    }
}

impl EngineObserver for Recorder {
    fn on_state_change(&mut self, _state: &GameState) {
        self.0.borrow_mut().push("state".into());
    }

    fn on_node_change(&mut self, node: Option<&Node>) {
        let id = node.map_or("-", |n| n.id.as_str());
        self.0.borrow_mut().push(format!("node:{id}"));
    }

    fn on_chapter_end(&mut self, _transition: &ChapterTransition) {
        self.0.borrow_mut().push("chapter_end".into());
    }

    fn on_game_end(&mut self) {
        self.0.borrow_mut().push("game_end".into());
    }
}

fn merchant() -> StoryProject {
    StoryProject::from_json(MERCHANT).unwrap()
}

fn single_chapter(nodes: Vec<Node>) -> StoryProject {
    let mut chapter = Chapter::new("c1", "Only").with_start("start");
    chapter.nodes = nodes;
    StoryProject::new("Test").with_stage(Stage::new("s1", "Stage").with_chapter(chapter))
}

fn start(next: &str) -> Node {
    Node::new("start", NodeKind::Start).with_next(next)
}

fn line(id: &str, text: &str) -> Node {
    Node::new(id, NodeKind::Dialogue).with_text(text)
}

fn chapter_end(id: &str) -> Node {
    Node::new(
        id,
        NodeKind::ChapterEnd {
            chapter_end_data: None,
        },
    )
}

fn ops(id: &str, operations: Vec<VariableOperation>) -> Node {
    Node::new(
        id,
        NodeKind::Variable {
            variable_operations: operations,
        },
    )
}

fn image(id: &str, data: ImageData) -> Node {
    Node::new(
        id,
        NodeKind::Image {
            image_data: Some(data),
        },
    )
}

// ---------------------------------------------------------------------------
// merchant scenario
// ---------------------------------------------------------------------------

#[test]
fn merchant_purchase_routes_to_first_matching_branch() {
    let recorder = Recorder::default();
    let mut engine = GameEngine::new(merchant())
        .with_clock(ManualClock::new(0))
        .with_observer(recorder.clone());

    engine.start(None, None).unwrap();
    assert_eq!(engine.state().current_node_id, "choice1");
    assert_eq!(engine.variables().get("gold"), Some(&Value::from(75)));

    engine.select_choice(0).unwrap();
    assert_eq!(engine.state().current_node_id, "bought_line");
    assert_eq!(engine.variables().get("gold"), Some(&Value::from(25)));
    assert_eq!(engine.variables().get("bought_item"), Some(&Value::Bool(true)));
    assert!(engine.variables().has_made_choice("buy"));

    let text = engine.current_node().unwrap().text_or_empty().to_string();
    assert_eq!(
        engine.interpolate_text(&text),
        "Enjoy the blade. You have 25 gold left."
    );

    engine.advance().unwrap();
    assert_eq!(engine.state().current_node_id, "end");
    let transition = engine.chapter_transition().unwrap();
    assert_eq!(transition.action, ChapterEndAction::End);
    assert_eq!(transition.target(), None);

    engine.advance().unwrap();
    assert_eq!(engine.status(), EngineStatus::Ended);
    assert!(matches!(engine.advance(), Err(EngineError::ChapterEnded)));
    assert_eq!(recorder.count("game_end"), 1);
    assert_eq!(recorder.count("chapter_end"), 1);

    insta::assert_snapshot!(engine.history().export_text(), @r"
    The merchant shows you a sword.
    > Buy it (50 gold)
    Merchant: Enjoy the blade. You have {{Gold}} gold left.
    ");
}

#[test]
fn reaching_chapter_end_fires_game_end_once() {
    let recorder = Recorder::default();
    let mut engine = GameEngine::new(merchant()).with_observer(recorder.clone());
    engine.start(None, None).unwrap();
    engine.select_choice(1).unwrap();

    let mut steps = 0;
    while engine.status() != EngineStatus::Ended {
        engine.advance().unwrap();
        steps += 1;
        assert!(steps < 10, "story never ended");
    }
    for _ in 0..3 {
        assert!(engine.advance().is_err());
    }
    assert_eq!(recorder.count("game_end"), 1);
}

// ---------------------------------------------------------------------------
// branching and gating
// ---------------------------------------------------------------------------

#[test]
fn condition_node_takes_first_true_branch() {
    let always = || Condition::variable("x", ComparisonOperator::Eq, 1);
    let project = single_chapter(vec![
        start("cond"),
        Node::new(
            "cond",
            NodeKind::Condition {
                condition_branches: vec![
                    ConditionBranch::new("b1", Condition::variable("x", ComparisonOperator::Gt, 5), "one"),
                    ConditionBranch::new("b2", always(), "two"),
                    ConditionBranch::new("b3", always(), "three"),
                ],
                default_next_node_id: Some("one".into()),
            },
        ),
        line("one", "1"),
        line("two", "2"),
        line("three", "3"),
    ])
    .with_variable(VariableDefinition::new("x", "X", 1));

    let mut engine = GameEngine::new(project);
    engine.start(None, None).unwrap();
    assert_eq!(engine.state().current_node_id, "two");
}

#[test]
fn locked_choice_leaves_state_untouched() {
    let mut project = merchant();
    project.variables[0].default_value = Value::from(10);
    let mut engine = GameEngine::new(project);
    engine.start(None, None).unwrap();
    assert_eq!(engine.variables().get("gold"), Some(&Value::from(10)));

    let before = engine.state().clone();
    assert!(matches!(
        engine.select_choice(0),
        Err(EngineError::ChoiceLocked(id)) if id == "buy"
    ));
    assert_eq!(engine.state(), &before);
    assert!(engine.variables().choices_made.is_empty());
}

#[test]
fn choice_with_missing_target_stays_put_and_records_each_pick() {
    let project = single_chapter(vec![
        start("ask"),
        Node::new(
            "ask",
            NodeKind::Choice {
                choices: vec![Choice::new("door", "Open the door", "nowhere")],
            },
        ),
    ]);
    let mut engine = GameEngine::new(project);
    engine.start(None, None).unwrap();

    engine.select_choice(0).unwrap();
    engine.select_choice(0).unwrap();
    assert_eq!(engine.state().current_node_id, "ask");
    assert_eq!(engine.variables().choices_made, ["door", "door"]);
    assert_eq!(engine.state().last_choice_index, Some(0));
}

// ---------------------------------------------------------------------------
// variable operations
// ---------------------------------------------------------------------------

#[test]
fn arithmetic_runs_in_listed_order() {
    let project = single_chapter(vec![
        start("math"),
        ops(
            "math",
            vec![
                VariableOperation::on_variable("x", OperationAction::Set, 10),
                VariableOperation::on_variable("x", OperationAction::Add, 5),
                VariableOperation::on_variable("x", OperationAction::Subtract, 3),
                VariableOperation::on_variable("x", OperationAction::Multiply, 2),
            ],
        )
        .with_next("done"),
        line("done", "x is {{x}}"),
    ])
    .with_variable(VariableDefinition::new("x", "X", 0));

    let mut engine = GameEngine::new(project);
    engine.start(None, None).unwrap();
    assert_eq!(engine.variables().get("x"), Some(&Value::from(24)));
    assert_eq!(engine.interpolate_text("x is {{x}}"), "x is 24");
}

#[test]
fn array_push_and_remove() {
    let project = single_chapter(vec![
        start("bag"),
        ops(
            "bag",
            vec![
                VariableOperation::on_variable("items", OperationAction::Push, "a"),
                VariableOperation::on_variable("items", OperationAction::Push, "b"),
                VariableOperation::at_index("items", OperationAction::RemoveAt, 0, None),
                VariableOperation::at_index("items", OperationAction::RemoveAt, 9, None),
            ],
        )
        .with_next("done"),
        line("done", "Carrying: {{Items}}"),
    ])
    .with_variable(VariableDefinition::new("items", "Items", Vec::<Value>::new()));

    let mut engine = GameEngine::new(project);
    engine.start(None, None).unwrap();
    assert_eq!(
        engine.variables().get("items"),
        Some(&Value::Array(vec![Value::from("b")]))
    );
    assert_eq!(engine.interpolate_text("Carrying: {{Items}}"), "Carrying: b");
}

#[test]
fn interpolation_resolves_names_and_keeps_unknown_tokens() {
    let mut engine = GameEngine::new(merchant());
    engine.start(None, None).unwrap();
    assert_eq!(
        engine.interpolate_text("{{Gold}} / {{gold}} / {{Nope}}"),
        "75 / 75 / {{Nope}}"
    );
}

// ---------------------------------------------------------------------------
// images
// ---------------------------------------------------------------------------

fn replacing(timing: TransitionTiming, exit_duration: Option<u64>) -> StoryProject {
    let mut second = ImageData::new("b.png", "character", 1);
    second.exit_effect = Some(ExitEffect::FadeOut);
    second.exit_effect_duration = exit_duration;
    second.transition_timing = timing;
    single_chapter(vec![
        start("first"),
        image("first", ImageData::new("a.png", "character", 1)).with_next("second"),
        image("second", second).with_next("talk"),
        line("talk", "..."),
    ])
}

fn paths(engine: &GameEngine) -> Vec<(String, bool)> {
    engine
        .active_images()
        .images()
        .iter()
        .map(|img| (img.resource_path.clone(), img.is_exiting))
        .collect()
}

#[test]
fn same_slot_without_exit_effect_keeps_one_image() {
    let project = single_chapter(vec![
        start("first"),
        image("first", ImageData::new("a.png", "background", 0)).with_next("second"),
        image("second", ImageData::new("b.png", "background", 0)).with_next("talk"),
        line("talk", "..."),
    ]);
    let mut engine = GameEngine::new(project);
    engine.start(None, None).unwrap();

    assert_eq!(engine.state().current_node_id, "talk");
    assert_eq!(paths(&engine), [("b.png".to_string(), false)]);
    let slot: Vec<_> = engine.active_images().in_slot("background", 0).collect();
    assert_eq!(slot.len(), 1);
    assert_eq!(slot[0].id, "second");
}

#[test]
fn sequential_replacement_waits_for_exit() {
    let clock = ManualClock::new(1_000);
    let mut engine = GameEngine::new(replacing(TransitionTiming::Sequential, Some(300)))
        .with_clock(clock.clone());
    engine.start(None, None).unwrap();

    assert_eq!(engine.state().current_node_id, "talk");
    assert_eq!(paths(&engine), [("a.png".to_string(), true)]);
    assert_eq!(engine.next_timer_due(), Some(1_300));

    clock.advance(299);
    assert_eq!(engine.poll_timers(), 0);
    assert_eq!(paths(&engine), [("a.png".to_string(), true)]);

    clock.advance(1);
    assert_eq!(engine.poll_timers(), 2);
    assert_eq!(paths(&engine), [("b.png".to_string(), false)]);
}

/// a.png is exiting towards b.png when `third` writes the same slot.
fn superseding(third: ImageData) -> StoryProject {
    let mut project = replacing(TransitionTiming::Sequential, Some(300));
    let chapter = &mut project.stages[0].chapters[0];
    let talk = chapter.nodes.pop().unwrap();
    chapter.nodes[2].next_node_id = Some("third".into());
    chapter.nodes.push(image("third", third).with_next("talk"));
    chapter.nodes.push(talk);
    project
}

#[test]
fn clearing_slot_cancels_waiting_replacement() {
    let clock = ManualClock::new(0);
    let mut engine = GameEngine::new(superseding(ImageData::new("", "character", 1)))
        .with_clock(clock.clone());
    engine.start(None, None).unwrap();
    assert_eq!(engine.state().current_node_id, "talk");
    assert!(paths(&engine).is_empty());

    clock.advance(300);
    engine.poll_timers();
    assert!(paths(&engine).is_empty());
}

#[test]
fn newest_replacement_wins_the_slot() {
    let mut third = ImageData::new("c.png", "character", 1);
    third.exit_effect = Some(ExitEffect::FadeOut);
    third.exit_effect_duration = Some(300);
    third.transition_timing = TransitionTiming::Sequential;

    let clock = ManualClock::new(0);
    let mut engine = GameEngine::new(superseding(third)).with_clock(clock.clone());
    engine.start(None, None).unwrap();
    assert_eq!(
        paths(&engine),
        [("a.png".to_string(), true), ("c.png".to_string(), false)]
    );

    clock.advance(300);
    engine.poll_timers();
    assert_eq!(paths(&engine), [("c.png".to_string(), false)]);
    assert_eq!(engine.pending_timers(), 0);
}

#[test]
fn crossfade_replacement_overlaps_exit() {
    let clock = ManualClock::new(0);
    let mut engine = GameEngine::new(replacing(TransitionTiming::Crossfade, Some(300)))
        .with_clock(clock.clone());
    engine.start(None, None).unwrap();

    assert_eq!(
        paths(&engine),
        [("a.png".to_string(), true), ("b.png".to_string(), false)]
    );
    let ids: Vec<u64> = engine
        .active_images()
        .images()
        .iter()
        .map(|img| img.instance_id)
        .collect();
    assert_ne!(ids[0], ids[1]);

    clock.advance(300);
    assert_eq!(engine.poll_timers(), 1);
    assert_eq!(paths(&engine), [("b.png".to_string(), false)]);
}

#[test]
fn zero_exit_duration_uses_default() {
    let clock = ManualClock::new(0);
    let mut engine =
        GameEngine::new(replacing(TransitionTiming::Crossfade, Some(0))).with_clock(clock.clone());
    engine.start(None, None).unwrap();
    assert_eq!(engine.next_timer_due(), Some(500));
}

#[test]
fn removal_node_clears_slot_and_is_logged() {
    let project = single_chapter(vec![
        start("show"),
        image("show", ImageData::new("a.png", "character", 2)).with_next("hide"),
        image("hide", ImageData::new("", "character", 2)).with_next("talk"),
        line("talk", "gone"),
    ]);
    let mut engine = GameEngine::new(project);
    engine.start(None, None).unwrap();
    assert!(engine.active_images().is_empty());
    assert!(
        engine
            .history()
            .entries()
            .iter()
            .any(|e| e.content == "[image removed: character]")
    );
}

fn fading_in() -> StoryProject {
    let mut data = ImageData::new("bg.png", "background", 0);
    data.effects = vec![ImageEffect::FadeIn];
    data.effect_duration = Some(400);
    single_chapter(vec![
        start("bg"),
        image("bg", data).with_next("talk"),
        line("talk", "The fog lifts.").with_next("end"),
        chapter_end("end"),
    ])
}

#[test]
fn double_advance_during_effect_is_rejected() {
    let clock = ManualClock::new(0);
    let mut engine = GameEngine::new(fading_in()).with_clock(clock.clone());
    engine.start(None, None).unwrap();
    let before = engine.state().clone();

    for _ in 0..2 {
        assert!(matches!(engine.advance(), Err(EngineError::TransitionPending)));
    }
    assert_eq!(engine.state(), &before);

    clock.advance(400);
    engine.poll_timers();
    assert_eq!(engine.state().current_node_id, "talk");
    engine.advance().unwrap();
    assert_eq!(engine.state().current_node_id, "end");
}

#[test]
fn restart_discards_stale_timers() {
    let clock = ManualClock::new(0);
    let mut engine = GameEngine::new(fading_in()).with_clock(clock.clone());
    engine.start(None, None).unwrap();

    clock.advance(200);
    engine.restart().unwrap();
    assert_eq!(engine.pending_timers(), 1);
    assert_eq!(engine.next_timer_due(), Some(600));

    clock.advance(200);
    assert_eq!(engine.poll_timers(), 0);
    assert_eq!(engine.state().current_node_id, "bg");

    clock.advance(200);
    assert_eq!(engine.poll_timers(), 1);
    assert_eq!(engine.state().current_node_id, "talk");
}

// ---------------------------------------------------------------------------
// save / load
// ---------------------------------------------------------------------------

#[test]
fn save_and_load_round_trip() {
    let clock = ManualClock::new(0);
    let mut engine = GameEngine::new(merchant()).with_clock(clock.clone());
    engine.start(None, None).unwrap();
    engine.select_choice(0).unwrap();
    clock.advance(5_000);
    let saved = engine.save().unwrap();

    let mut restored = GameEngine::new(merchant()).with_clock(ManualClock::new(90_000));
    restored.load(&saved).unwrap();

    let (a, b) = (engine.state(), restored.state());
    assert_eq!(a.current_node_id, b.current_node_id);
    assert_eq!(a.variables, b.variables);
    assert_eq!(a.history.len(), b.history.len());
    assert_eq!(b.status, EngineStatus::Playing);
    assert_eq!(b.play_time, 5_000);
    assert_eq!(b.started_at, 90_000);

    restored.advance().unwrap();
    assert_eq!(restored.state().current_node_id, "end");
}

#[test]
fn malformed_save_keeps_running_state() {
    let mut engine = GameEngine::new(merchant());
    engine.start(None, None).unwrap();
    let before = engine.state().clone();

    assert!(matches!(
        engine.load("{ not json"),
        Err(EngineError::MalformedSave(_))
    ));
    assert_eq!(engine.state(), &before);
    engine.select_choice(1).unwrap();
    assert_eq!(engine.state().current_node_id, "farewell");
}

#[test]
fn load_drops_images_caught_mid_exit() {
    let clock = ManualClock::new(0);
    let mut engine = GameEngine::new(replacing(TransitionTiming::Crossfade, Some(300)))
        .with_clock(clock.clone());
    engine.start(None, None).unwrap();
    let saved = engine.save().unwrap();

    engine.load(&saved).unwrap();
    assert_eq!(paths(&engine), [("b.png".to_string(), false)]);
    assert_eq!(engine.pending_timers(), 0);
}

#[test]
fn save_during_sequential_exit_keeps_incoming_image() {
    let clock = ManualClock::new(0);
    let mut engine = GameEngine::new(replacing(TransitionTiming::Sequential, Some(300)))
        .with_clock(clock.clone());
    engine.start(None, None).unwrap();
    assert_eq!(paths(&engine), [("a.png".to_string(), true)]);
    let saved = engine.save().unwrap();

    let later = ManualClock::new(0);
    let mut restored = GameEngine::new(replacing(TransitionTiming::Sequential, Some(300)))
        .with_clock(later.clone());
    restored.load(&saved).unwrap();
    assert_eq!(paths(&restored), [("b.png".to_string(), false)]);

    later.advance(1_000);
    clock.advance(1_000);
    restored.poll_timers();
    engine.poll_timers();
    assert_eq!(paths(&restored), paths(&engine));
    assert_eq!(restored.state().current_node_id, "talk");
}

// ---------------------------------------------------------------------------
// chapters
// ---------------------------------------------------------------------------

#[test]
fn goto_chapter_carries_globals_and_history() {
    let mut prologue = Chapter::new("prologue", "Prologue").with_start("start");
    prologue.nodes = vec![
        start("set"),
        ops(
            "set",
            vec![VariableOperation::on_variable("gold", OperationAction::Add, 5)],
        )
        .with_next("bye"),
        line("bye", "Onwards.").with_next("end"),
        Node::new(
            "end",
            NodeKind::ChapterEnd {
                chapter_end_data: Some(ChapterEndData {
                    action: ChapterEndAction::Goto,
                    next_chapter_id: Some("finale".into()),
                    next_stage_id: Some("act2".into()),
                    clear_visuals: None,
                }),
            },
        ),
    ];
    let finale = Chapter::new("finale", "Finale")
        .with_node(start("hello"))
        .with_node(line("hello", "Welcome back with {{Gold}} gold."))
        .with_variable(VariableDefinition::new("mood", "Mood", "calm"));
    let project = StoryProject::new("Saga")
        .with_variable(VariableDefinition::new("gold", "Gold", 1))
        .with_stage(Stage::new("act1", "Act I").with_chapter(prologue))
        .with_stage(Stage::new("act2", "Act II").with_chapter(finale));

    let recorder = Recorder::default();
    let mut engine = GameEngine::new(project).with_observer(recorder.clone());
    assert!(matches!(
        engine.start_chapter("act2", "finale"),
        Err(EngineError::NotStarted)
    ));

    engine.start(None, None).unwrap();
    engine.advance().unwrap();
    let transition = engine.chapter_transition().unwrap();
    assert_eq!(transition.target(), Some(("act2", "finale")));
    engine.advance().unwrap();
    assert_eq!(engine.status(), EngineStatus::Ended);

    let (stage, chapter) = transition.target().unwrap();
    engine.start_chapter(stage, chapter).unwrap();
    assert_eq!(engine.state().current_chapter_id, "finale");
    assert_eq!(engine.state().current_node_id, "hello");
    assert_eq!(engine.variables().get("gold"), Some(&Value::from(6)));
    assert_eq!(engine.variables().get("mood"), Some(&Value::from("calm")));
    assert_eq!(engine.history().len(), 3);
    assert_eq!(
        engine.interpolate_text("Welcome back with {{Gold}} gold."),
        "Welcome back with 6 gold."
    );
    assert_eq!(recorder.count("game_end"), 1);
}

#[test]
fn dangling_start_node_falls_back_to_start_type() {
    let mut chapter = Chapter::new("c1", "Only").with_start("ghost");
    chapter.nodes = vec![start("d1"), line("d1", "Awake.").with_next("end"), chapter_end("end")];
    let project =
        StoryProject::new("Test").with_stage(Stage::new("s1", "Stage").with_chapter(chapter));
    let mut engine = GameEngine::new(project);
    engine.start(None, None).unwrap();

    assert_eq!(engine.state().current_node_id, "d1");
    assert_eq!(engine.current_node().map(|n| n.id.as_str()), Some("d1"));
    engine.advance().unwrap();
    assert_eq!(engine.state().current_node_id, "end");
}

#[test]
fn unknown_chapter_is_reported_and_ignored() {
    let mut engine = GameEngine::new(merchant());
    assert!(engine.start(Some("town"), Some("docks")).is_err());
    assert_eq!(engine.status(), EngineStatus::Idle);
    assert!(engine.current_node().is_none());
}
