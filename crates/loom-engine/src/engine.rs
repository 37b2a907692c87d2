use std::sync::Arc;

use loom_story::{
    Chapter, ChapterEndAction, Choice, Condition, ImageData, Node, NodeKind, NodeType,
    StoryProject, TransitionTiming, VariableDefinition,
};
use tracing::{debug, error, warn};

use crate::clock::{Clock, SystemClock};
use crate::condition::evaluate;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::history::{History, HistoryEntry, HistoryImage};
use crate::images::{ActiveImage, ImageLayers};
use crate::interpolate::interpolate;
use crate::observer::{ChapterTransition, EngineObserver};
use crate::operation;
use crate::state::{EngineStatus, GameState};
use crate::timer::{TimerAction, TimerQueue};
use crate::variables::GameVariables;

/// Project metadata exposed to scripts and hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    /// Project name.
    pub name: String,
    /// Project version.
    pub version: String,
    /// Default game mode, `visualNovel` unless configured.
    pub game_mode: String,
    /// Default theme, `dark` unless configured.
    pub theme: String,
}

/// A choice of the current node together with whether its gate holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvailableChoice<'a> {
    /// Index to pass to [`GameEngine::select_choice`].
    pub index: usize,
    /// The authored choice.
    pub choice: &'a Choice,
    /// Whether selecting it would be accepted.
    pub enabled: bool,
}

impl AvailableChoice<'_> {
    /// Label to show: the choice text, or its disabled text while locked.
    pub fn label(&self) -> &str {
        match (&self.choice.disabled_text, self.enabled) {
            (Some(disabled), false) if !disabled.is_empty() => disabled,
            _ => &self.choice.text,
        }
    }
}

/// The story interpreter.
///
/// An engine owns one run: its variable store, images, history and pending
/// timers. Automatic nodes are executed synchronously inside [`start`],
/// [`advance`], [`select_choice`] and [`poll_timers`]; observers are notified
/// once each of those calls has settled.
///
/// [`start`]: GameEngine::start
/// [`advance`]: GameEngine::advance
/// [`select_choice`]: GameEngine::select_choice
/// [`poll_timers`]: GameEngine::poll_timers
pub struct GameEngine {
    project: Arc<StoryProject>,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    observers: Vec<Box<dyn EngineObserver>>,
    state: GameState,
    timers: TimerQueue,
    image_counter: u64,
}

impl GameEngine {
    /// Create an idle engine for a project, using the wall clock.
    pub fn new(project: impl Into<Arc<StoryProject>>) -> Self {
        Self {
            project: project.into(),
            config: EngineConfig::default(),
            clock: Box::new(SystemClock),
            observers: Vec::new(),
            state: GameState::default(),
            timers: TimerQueue::new(),
            image_counter: 0,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Register an observer.
    pub fn with_observer(mut self, observer: impl EngineObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Register an observer on an existing engine.
    pub fn add_observer(&mut self, observer: Box<dyn EngineObserver>) {
        self.observers.push(observer);
    }

    // --- queries ---

    /// The project being played.
    pub fn project(&self) -> &StoryProject {
        &self.project
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The full run snapshot.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The variable store.
    pub fn variables(&self) -> &GameVariables {
        &self.state.variables
    }

    /// The backlog.
    pub fn history(&self) -> &History {
        &self.state.history
    }

    /// Images on stage.
    pub fn active_images(&self) -> &ImageLayers {
        &self.state.active_images
    }

    /// Lifecycle status.
    pub fn status(&self) -> EngineStatus {
        self.state.status
    }

    /// The chapter being played.
    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.project
            .chapter(&self.state.current_stage_id, &self.state.current_chapter_id)
    }

    /// The node the run is suspended at.
    pub fn current_node(&self) -> Option<&Node> {
        self.current_chapter()?.node(&self.state.current_node_id)
    }

    /// Evaluate a condition against the live variables.
    pub fn check_condition(&self, condition: &Condition) -> bool {
        evaluate(condition, &self.state.variables)
    }

    /// Substitute `{{token}}` placeholders with live variable values.
    pub fn interpolate_text(&self, text: &str) -> String {
        let definitions: Vec<&VariableDefinition> = self
            .current_chapter()
            .into_iter()
            .flat_map(|c| c.variables.iter())
            .chain(self.project.variables.iter())
            .collect();
        interpolate(text, &self.state.variables, &definitions)
    }

    /// The current node's choices, each marked enabled or locked.
    pub fn available_choices(&self) -> Vec<AvailableChoice<'_>> {
        let Some(NodeKind::Choice { choices }) = self.current_node().map(|n| &n.kind) else {
            return Vec::new();
        };
        choices
            .iter()
            .enumerate()
            .map(|(index, choice)| AvailableChoice {
                index,
                choice,
                enabled: choice
                    .condition
                    .as_ref()
                    .is_none_or(|c| self.check_condition(c)),
            })
            .collect()
    }

    /// Name, version, game mode and theme of the project.
    pub fn project_info(&self) -> ProjectInfo {
        let settings = self.project.game_settings.as_ref();
        ProjectInfo {
            name: self.project.name.clone(),
            version: self.project.version.clone(),
            game_mode: settings
                .and_then(|s| s.default_game_mode.clone())
                .unwrap_or_else(|| "visualNovel".to_string()),
            theme: settings
                .and_then(|s| s.default_theme_id.clone())
                .unwrap_or_else(|| "dark".to_string()),
        }
    }

    /// Where the story goes after the current `chapter_end` node.
    pub fn chapter_transition(&self) -> Option<ChapterTransition> {
        let node = self.current_node()?;
        (node.node_type() == NodeType::ChapterEnd).then(|| self.resolve_transition(node))
    }

    /// Whether an entrance effect is holding the story back.
    pub fn is_transition_pending(&self) -> bool {
        self.timers.has_pending_transition()
    }

    /// When the next timer is due, in clock milliseconds.
    pub fn next_timer_due(&self) -> Option<i64> {
        self.timers.next_due()
    }

    /// Number of timers waiting to fire.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    // --- commands ---

    /// Start a run at the given stage and chapter, or the first of each.
    ///
    /// Variables are reseeded from their defaults, history and images are
    /// cleared, and automatic nodes run until the story needs the player.
    /// An unknown stage or chapter leaves the engine untouched.
    pub fn start(&mut self, stage_id: Option<&str>, chapter_id: Option<&str>) -> EngineResult<()> {
        let project = Arc::clone(&self.project);
        let (stage, chapter) = project
            .resolve(stage_id, chapter_id)
            .inspect_err(|e| warn!(error = %e, "cannot start story"))?;

        self.timers.bump_epoch();
        let variables = GameVariables::seeded(&project.variables, &chapter.variables);
        self.state = GameState::new(&stage.id, &chapter.id, variables, self.now());
        debug!(stage = %stage.id, chapter = %chapter.id, "story started");

        self.enter_chapter(chapter);
        self.notify(true);
        Ok(())
    }

    /// Start the same stage and chapter again from scratch.
    pub fn restart(&mut self) -> EngineResult<()> {
        if self.state.status == EngineStatus::Idle {
            return Err(EngineError::NotStarted);
        }
        let stage = self.state.current_stage_id.clone();
        let chapter = self.state.current_chapter_id.clone();
        self.start(Some(&stage), Some(&chapter))
    }

    /// Continue into another chapter.
    ///
    /// Global variables, flags, picked choices and history carry over;
    /// the new chapter's local variables are reseeded. Images are cleared
    /// unless the finishing `chapter_end` node asked to keep them.
    pub fn start_chapter(&mut self, stage_id: &str, chapter_id: &str) -> EngineResult<()> {
        if self.state.status == EngineStatus::Idle {
            return Err(EngineError::NotStarted);
        }
        let project = Arc::clone(&self.project);
        let (stage, chapter) = project
            .resolve(Some(stage_id), Some(chapter_id))
            .inspect_err(|e| warn!(error = %e, "cannot enter chapter"))?;

        let clear_visuals = self.chapter_transition().is_none_or(|t| t.clear_visuals);
        self.timers.bump_epoch();

        self.state.current_stage_id = stage.id.clone();
        self.state.current_chapter_id = chapter.id.clone();
        self.state.current_node_id.clear();
        self.state.variables.seed(&chapter.variables);
        if clear_visuals {
            self.state.active_images.clear();
        } else {
            self.state.active_images.drop_exiting();
        }
        self.state.status = EngineStatus::Playing;
        debug!(stage = %stage.id, chapter = %chapter.id, "chapter started");

        self.enter_chapter(chapter);
        self.notify(true);
        Ok(())
    }

    /// Move past the current node.
    ///
    /// At a `chapter_end` node this ends the run and notifies observers.
    /// At a node without a successor nothing happens.
    pub fn advance(&mut self) -> EngineResult<()> {
        self.ensure_playing()?;
        let project = Arc::clone(&self.project);
        let Some(node) = self.node_in(&project) else {
            debug!(node = %self.state.current_node_id, "advance ignored: no current node");
            return Ok(());
        };

        match node.node_type() {
            NodeType::Choice => return Err(EngineError::AwaitingChoice(node.id.clone())),
            NodeType::ChapterEnd => {
                self.finish_chapter(node);
                return Ok(());
            }
            _ => {}
        }

        let Some(next) = node.next() else {
            debug!(node = %node.id, "advance ignored: node has no successor");
            return Ok(());
        };
        if let Some(chapter) = self.chapter_in(&project) {
            self.run_from(chapter, next);
        }
        self.notify_after(&node.id);
        Ok(())
    }

    /// Pick a choice of the current `choice` node.
    ///
    /// A choice whose condition fails is rejected and nothing changes.
    pub fn select_choice(&mut self, index: usize) -> EngineResult<()> {
        self.ensure_playing()?;
        let project = Arc::clone(&self.project);
        let node = self.node_in(&project).ok_or(EngineError::NotAtChoice)?;
        let NodeKind::Choice { choices } = &node.kind else {
            return Err(EngineError::NotAtChoice);
        };
        let choice = choices.get(index).ok_or(EngineError::ChoiceOutOfRange {
            index,
            count: choices.len(),
        })?;
        let locked = choice
            .condition
            .as_ref()
            .is_some_and(|c| !evaluate(c, &self.state.variables));
        if locked {
            debug!(choice = %choice.id, "choice locked by its condition");
            return Err(EngineError::ChoiceLocked(choice.id.clone()));
        }

        self.state.variables.record_choice(choice.id.clone());
        self.state.last_choice_index = Some(index);
        self.state.last_choice_text = Some(choice.text.clone());
        let entry = HistoryEntry {
            node_id: node.id.clone(),
            entry_type: NodeType::Choice,
            content: node.text_or_empty().to_string(),
            speaker: None,
            timestamp: self.now(),
            choice_text: Some(choice.text.clone()),
            image_data: None,
        };
        self.state.history.push(entry, self.config.history_limit);
        if let Some(effects) = &choice.effects {
            operation::apply_effects(effects, &mut self.state.variables);
        }

        // The pick is recorded before its target resolves; a dangling target
        // leaves the run at this choice and a second pick is recorded again.
        match (choice.target(), self.chapter_in(&project)) {
            (Some(next), Some(chapter)) => self.run_from(chapter, next),
            _ => debug!(choice = %choice.id, "choice has no successor"),
        }
        self.notify_after(&node.id);
        Ok(())
    }

    /// Fire every timer that is due. Returns how many fired.
    pub fn poll_timers(&mut self) -> usize {
        let now = self.now();
        let mut fired = 0;
        while let Some(action) = self.timers.pop_due(now) {
            fired += 1;
            let previous = self.state.current_node_id.clone();
            match action {
                TimerAction::RemoveImage { instance_id } => {
                    debug!(instance_id, "exit animation finished");
                    self.state.active_images.remove_instance(instance_id);
                }
                TimerAction::ShowImage { node_id, image } => {
                    debug!(node = %node_id, "showing image after exit");
                    self.show_image(&node_id, &image);
                }
                TimerAction::Transition { next_node_id } => {
                    debug!(node = %next_node_id, "entrance effect finished");
                    let project = Arc::clone(&self.project);
                    if let Some(chapter) = self.chapter_in(&project) {
                        self.run_from(chapter, &next_node_id);
                    }
                }
            }
            self.notify_after(&previous);
        }
        fired
    }

    /// Serialize the run, with play time brought up to date.
    ///
    /// Image swaps still waiting on an exit animation are written as if they
    /// had already finished, so the restored scene matches the settled one.
    pub fn save(&self) -> EngineResult<String> {
        let mut snapshot = self.state.clone();
        snapshot.play_time = self.state.total_play_time(self.now());

        let layers = &mut snapshot.active_images;
        let mut counter = self
            .image_counter
            .max(layers.max_instance_id().unwrap_or(0));
        for action in self.timers.pending() {
            match action {
                TimerAction::RemoveImage { instance_id } => {
                    layers.remove_instance(*instance_id);
                }
                TimerAction::ShowImage { node_id, image } => {
                    counter += 1;
                    layers.place(ActiveImage::new(node_id, counter, image));
                }
                TimerAction::Transition { .. } => {}
            }
        }
        layers.drop_exiting();

        serde_json::to_string(&snapshot).map_err(EngineError::Serialize)
    }

    /// Resume a run from [`save`](GameEngine::save) output.
    ///
    /// Pending timers are discarded and images caught mid-exit are dropped.
    /// Malformed data is rejected and the current run continues unchanged.
    pub fn load(&mut self, data: &str) -> EngineResult<()> {
        let mut loaded: GameState = serde_json::from_str(data).map_err(|e| {
            warn!(error = %e, "failed to load save data");
            EngineError::MalformedSave(e)
        })?;

        self.timers.bump_epoch();
        loaded.started_at = self.now();
        loaded.active_images.drop_exiting();
        if loaded.status == EngineStatus::Idle && !loaded.current_node_id.is_empty() {
            loaded.status = EngineStatus::Playing;
        }
        self.image_counter = self
            .image_counter
            .max(loaded.active_images.max_instance_id().unwrap_or(0));
        self.state = loaded;
        debug!(node = %self.state.current_node_id, "save data loaded");

        self.notify(true);
        Ok(())
    }

    // --- node execution ---

    fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    fn chapter_in<'p>(&self, project: &'p StoryProject) -> Option<&'p Chapter> {
        project.chapter(&self.state.current_stage_id, &self.state.current_chapter_id)
    }

    fn node_in<'p>(&self, project: &'p StoryProject) -> Option<&'p Node> {
        self.chapter_in(project)?.node(&self.state.current_node_id)
    }

    fn ensure_playing(&self) -> EngineResult<()> {
        match self.state.status {
            EngineStatus::Idle => Err(EngineError::NotStarted),
            EngineStatus::Ended => Err(EngineError::ChapterEnded),
            EngineStatus::Playing if self.timers.has_pending_transition() => {
                Err(EngineError::TransitionPending)
            }
            EngineStatus::Playing => Ok(()),
        }
    }

    fn enter_chapter(&mut self, chapter: &Chapter) {
        if !chapter.start_node_id.is_empty() && chapter.node(&chapter.start_node_id).is_none() {
            warn!(
                chapter = %chapter.id,
                start = %chapter.start_node_id,
                "designated start node is missing; falling back"
            );
        }
        match chapter.entry_node_id() {
            Some(entry) => {
                self.state.current_node_id = entry.to_string();
                self.run_from(chapter, entry);
            }
            None => warn!(chapter = %chapter.id, "chapter has no nodes; add a start node"),
        }
    }

    /// Enter `first` and keep following automatic transitions until a node
    /// suspends, a timer takes over, or a target is missing.
    fn run_from(&mut self, chapter: &Chapter, first: &str) {
        let mut next = Some(first.to_string());
        let mut transitions = 0usize;

        while let Some(id) = next.take() {
            let Some(node) = chapter.node(&id) else {
                error!(node = %id, chapter = %chapter.id, "node not found; halting");
                break;
            };
            self.state.current_node_id = id;
            debug!(node = %node.id, kind = %node.node_type(), "entering node");
            next = self.enter_node(node);

            if next.is_some() {
                transitions += 1;
                if transitions > self.config.max_auto_steps {
                    error!(
                        node = %node.id,
                        limit = self.config.max_auto_steps,
                        "too many automatic transitions; halting"
                    );
                    break;
                }
            }
        }
    }

    /// Apply a node's entry behavior. Returns the node to move on to
    /// immediately, or `None` when the story suspends here.
    fn enter_node(&mut self, node: &Node) -> Option<String> {
        if let Some(effects) = &node.on_enter_effects {
            operation::apply_effects(effects, &mut self.state.variables);
        }

        match &node.kind {
            NodeKind::Start => match node.next() {
                Some(next) => Some(next.to_string()),
                None => {
                    self.record(node);
                    None
                }
            },
            NodeKind::Variable {
                variable_operations,
            } => {
                operation::execute_all(variable_operations, &mut self.state.variables);
                node.next().map(str::to_string)
            }
            NodeKind::Condition {
                condition_branches,
                default_next_node_id,
            } => {
                for branch in condition_branches {
                    if evaluate(&branch.condition, &self.state.variables) {
                        debug!(node = %node.id, branch = %branch.id, "branch matched");
                        return branch.target().map(str::to_string);
                    }
                }
                let fallback = default_next_node_id.as_deref().filter(|s| !s.is_empty());
                if fallback.is_none() {
                    debug!(node = %node.id, "no branch matched and no default; halting");
                }
                fallback.map(str::to_string)
            }
            NodeKind::Image { image_data } => self.enter_image(node, image_data.as_ref()),
            NodeKind::Javascript { javascript_code } => {
                debug!(
                    node = %node.id,
                    bytes = javascript_code.as_deref().map_or(0, str::len),
                    "script node passed through without execution"
                );
                node.next().map(str::to_string)
            }
            _ => {
                self.record(node);
                None
            }
        }
    }

    fn enter_image(&mut self, node: &Node, data: Option<&ImageData>) -> Option<String> {
        let next = node.next().map(str::to_string);
        let Some(data) = data else {
            return next;
        };

        self.update_layers(&node.id, data);
        self.record_image(node, data);

        let duration = data.effect_duration.unwrap_or(0);
        match next {
            Some(next_node_id) if data.has_entrance_effect() && duration > 0 => {
                debug!(node = %node.id, duration, "waiting for entrance effect");
                let due = self.due_in(duration);
                self.timers
                    .schedule(due, TimerAction::Transition { next_node_id });
                None
            }
            next => next,
        }
    }

    fn update_layers(&mut self, node_id: &str, data: &ImageData) {
        // A newer directive for the slot supersedes any replacement still
        // waiting on an exit.
        let superseded = self.timers.cancel_where(|action| {
            matches!(action, TimerAction::ShowImage { image, .. }
                if image.layer == data.layer && image.layer_order == data.layer_order)
        });
        if superseded > 0 {
            debug!(node = %node_id, layer = %data.layer, "dropped pending replacement");
        }

        let layers = &mut self.state.active_images;
        if data.is_removal() {
            layers.clear_slot(&data.layer, data.layer_order);
            return;
        }

        let resident = layers
            .resident(&data.layer, data.layer_order)
            .map(|img| img.instance_id);
        match (resident, data.active_exit_effect()) {
            (Some(instance_id), Some(effect)) => {
                let duration = data
                    .exit_effect_duration
                    .filter(|d| *d > 0)
                    .unwrap_or(self.config.default_exit_duration_ms);
                layers.begin_exit(instance_id, effect, data.exit_effect_duration);
                let due = self.due_in(duration);
                self.timers
                    .schedule(due, TimerAction::RemoveImage { instance_id });

                if data.transition_timing == TransitionTiming::Sequential {
                    debug!(node = %node_id, duration, "new image waits for exit");
                    self.timers.schedule(
                        due,
                        TimerAction::ShowImage {
                            node_id: node_id.to_string(),
                            image: data.clone(),
                        },
                    );
                    return;
                }
            }
            (Some(instance_id), None) => {
                layers.remove_instance(instance_id);
            }
            (None, _) => {}
        }

        self.show_image(node_id, data);
    }

    fn show_image(&mut self, node_id: &str, data: &ImageData) {
        self.image_counter += 1;
        self.state
            .active_images
            .place(ActiveImage::new(node_id, self.image_counter, data));
    }

    fn due_in(&self, ms: u64) -> i64 {
        self.now()
            .saturating_add(i64::try_from(ms).unwrap_or(i64::MAX))
    }

    fn record(&mut self, node: &Node) {
        let entry = HistoryEntry {
            node_id: node.id.clone(),
            entry_type: node.node_type(),
            content: node.text_or_empty().to_string(),
            speaker: node.speaker.clone(),
            timestamp: self.now(),
            choice_text: None,
            image_data: None,
        };
        self.state
            .history
            .push_unique(entry, self.config.history_limit);
    }

    fn record_image(&mut self, node: &Node, data: &ImageData) {
        let content = if data.is_removal() {
            format!("[image removed: {}]", data.layer)
        } else {
            String::new()
        };
        let entry = HistoryEntry {
            node_id: node.id.clone(),
            entry_type: NodeType::Image,
            content,
            speaker: None,
            timestamp: self.now(),
            choice_text: None,
            image_data: Some(HistoryImage::from(data)),
        };
        self.state
            .history
            .push_unique(entry, self.config.history_limit);
    }

    // --- chapter end ---

    fn finish_chapter(&mut self, node: &Node) {
        let transition = self.resolve_transition(node);
        self.state.status = EngineStatus::Ended;
        debug!(
            chapter = %self.state.current_chapter_id,
            action = ?transition.action,
            "chapter ended"
        );

        for observer in &mut self.observers {
            observer.on_chapter_end(&transition);
        }
        for observer in &mut self.observers {
            observer.on_game_end();
        }
        self.notify(false);
    }

    fn resolve_transition(&self, node: &Node) -> ChapterTransition {
        let data = match &node.kind {
            NodeKind::ChapterEnd {
                chapter_end_data: Some(data),
            } => data.clone(),
            _ => Default::default(),
        };
        let stage_id = &self.state.current_stage_id;
        let chapter_id = &self.state.current_chapter_id;

        let (next_stage_id, next_chapter_id) = match data.action {
            ChapterEndAction::Next => self
                .project
                .chapter_after(stage_id, chapter_id)
                .map(|(s, c)| (Some(s.id.clone()), Some(c.id.clone())))
                .unwrap_or_default(),
            ChapterEndAction::Goto => {
                let stage = data
                    .next_stage_id
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| stage_id.clone());
                let chapter = data.next_chapter_id.filter(|c| !c.is_empty());
                (Some(stage), chapter)
            }
            ChapterEndAction::Select | ChapterEndAction::End => (None, None),
        };

        ChapterTransition {
            action: data.action,
            from_stage_id: stage_id.clone(),
            from_chapter_id: chapter_id.clone(),
            next_stage_id,
            next_chapter_id,
            clear_visuals: data.clear_visuals.unwrap_or(true),
        }
    }

    // --- notifications ---

    fn notify_after(&mut self, previous_node_id: &str) {
        let moved = self.state.current_node_id != previous_node_id;
        self.notify(moved);
    }

    fn notify(&mut self, node_changed: bool) {
        if self.observers.is_empty() {
            return;
        }
        for observer in &mut self.observers {
            observer.on_state_change(&self.state);
        }
        if node_changed {
            let project = Arc::clone(&self.project);
            let node = self.node_in(&project);
            for observer in &mut self.observers {
                observer.on_node_change(node);
            }
        }
    }
}
