/// The narrative engine: node id → presentable turn.
///
/// Owns the content table, the encounter configuration and the session.
/// Every call resolves synchronously; presentation side effects are queued
/// as [`PresentationEvent`]s for the host to drain.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;
use thiserror::Error;

use crate::core::config::{ConfigError, EncounterConfig};
use crate::core::content::{ContentError, ContentTable, BUILTIN_DIALOGUE};
use crate::core::session::{GameOverCause, ProgressTracker, Session, Terminal};
use crate::core::status::Health;
use crate::schema::event::{Cue, EndKind, PresentationEvent};
use crate::schema::node::{Choice, Milestone, NodeCategory};
use crate::schema::status::StatusSnapshot;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("choice {index} out of range ({available} available)")]
    NoSuchChoice { index: usize, available: usize },
    #[error("the run has ended; restart to play again")]
    RunEnded,
    #[error("no dialogue is open")]
    NoActiveTurn,
    #[error("the ending cutscene is running")]
    CutsceneActive,
    #[error("no cutscene is pending")]
    NoCutscene,
    #[error("a dialogue is already open")]
    DialogueOpen,
    #[error("no node matches jump target '{0}'")]
    UnknownJumpTarget(String),
}

/// What kind of turn the engine produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    /// An authored node shown as written.
    Dialogue,
    /// A recoverable wrong answer with a single rephrase choice.
    Retry,
    /// The last text of a run that just ended.
    GameOver(GameOverCause),
}

/// A resolved node ready for presentation. `choices` are in the order the
/// player sees them.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub node_id: String,
    pub text: String,
    pub choices: Vec<Choice>,
    pub fallthrough: Option<String>,
    pub kind: TurnKind,
}

impl Turn {
    pub fn choice_labels(&self) -> Vec<String> {
        self.choices.iter().map(|c| c.text.clone()).collect()
    }
}

/// Result of a confirm input on an open turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A new turn is available from [`NarrativeEngine::current_turn`].
    Turn,
    /// The ending cutscene must now run; call
    /// [`NarrativeEngine::finish_cutscene`] when it is over.
    Cutscene,
    Ended(EndKind),
    /// The dialogue closed; an interact trigger reopens it.
    Closed,
    /// The turn has choices; confirm does nothing.
    AwaitingChoice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// No dialogue open, waiting for an interact trigger.
    Idle,
    Active(String),
    Cutscene,
    GameOver(GameOverCause),
    Completed,
}

/// The encounter state machine. Built via `NarrativeEngine::builder()`.
pub struct NarrativeEngine {
    content: ContentTable,
    config: EncounterConfig,
    session: Session,
    rng: StdRng,
    seed: u64,
    current_turn: Option<Turn>,
    /// Node to resolve once the ending cutscene finishes.
    cutscene_exit: Option<String>,
    events: Vec<PresentationEvent>,
    last_reported: Option<(StatusSnapshot, u32)>,
}

/// Builder for constructing a `NarrativeEngine`.
pub struct NarrativeEngineBuilder {
    seed: u64,
    content_files: Vec<String>,
    content_dir: Option<String>,
    config_path: Option<String>,
    /// Directly provided content (for testing without files).
    content: Option<ContentTable>,
    /// Directly provided config (for testing without files).
    config: Option<EncounterConfig>,
}

impl NarrativeEngine {
    pub fn builder() -> NarrativeEngineBuilder {
        NarrativeEngineBuilder {
            seed: 0,
            content_files: Vec::new(),
            content_dir: None,
            config_path: None,
            content: None,
            config: None,
        }
    }

    /// Reset the session and enter the entry node.
    pub fn start_encounter(&mut self) -> Result<&Turn, EngineError> {
        self.session.reset(&self.config);
        self.current_turn = None;
        self.cutscene_exit = None;
        self.last_reported = None;
        info!(
            "encounter started at '{}' (seed {}, {} main-track nodes)",
            self.config.entry_node,
            self.seed,
            self.session.progress.total()
        );
        let entry = self.config.entry_node.clone();
        self.resolve_node(&entry)
    }

    /// Resolve `id` into the current turn, applying fail handling and
    /// milestone side effects.
    fn resolve_node(&mut self, id: &str) -> Result<&Turn, EngineError> {
        if self.session.terminal.is_ended() {
            return Err(EngineError::RunEnded);
        }
        let class = self.content.class_of(id)?;
        if class.category.is_fail() {
            return self.resolve_fail(id, class.category);
        }

        let node = self.content.get(id)?.clone();
        self.session.enter_safe(id, class.category);
        debug!(
            "entered '{}' ({}), progress {}/{}",
            id,
            class.category.tag(),
            self.session.progress.visited(),
            self.session.progress.total()
        );
        self.report_status();

        let mut choices = node.choices;
        if choices.len() > 1 {
            choices.shuffle(&mut self.rng);
        }
        let turn = Turn {
            node_id: node.id,
            text: node.text,
            choices,
            fallthrough: node.fallthrough,
            kind: TurnKind::Dialogue,
        };
        self.emit_turn(&turn);

        if class.milestone == Some(Milestone::Celebration) {
            info!("celebration at '{}'", id);
            self.session.celebrating = true;
            self.events.push(PresentationEvent::CelebrationRequested);
            self.events
                .push(PresentationEvent::CueRequested { cue: Cue::Fanfare });
        }

        Ok(&*self.current_turn.insert(turn))
    }

    fn resolve_fail(&mut self, id: &str, category: NodeCategory) -> Result<&Turn, EngineError> {
        let node_text = self.content.get(id)?.text.clone();
        self.clear_celebration();

        let fatal = category == NodeCategory::FatalFail;
        if fatal {
            self.session.status.force_collapse();
            self.session.health.exhaust();
        } else {
            self.session.health.decrement();
            self.session
                .status
                .apply_failure_penalty(&self.config.failure_penalty);
        }
        debug!(
            "fail '{}' (fatal: {}), health {}/{}",
            id,
            fatal,
            self.session.health.current(),
            self.session.health.max()
        );
        self.report_status();
        self.events.push(PresentationEvent::ScreenShakeRequested {
            intensity: self.config.pacing.shake_intensity,
            duration_ticks: self.config.pacing.shake_ticks,
        });

        let messages = &self.config.messages;
        let turn = if !self.session.health.is_exhausted() {
            self.events
                .push(PresentationEvent::CueRequested { cue: Cue::Incorrect });
            Turn {
                node_id: id.to_string(),
                text: format!("{}\n\n{}", node_text, messages.status_drop_notice),
                choices: vec![Choice {
                    text: messages.retry_label.clone(),
                    target: self.session.last_safe.clone(),
                    effects: None,
                }],
                fallthrough: None,
                kind: TurnKind::Retry,
            }
        } else {
            let (cause, text) = if fatal {
                (
                    GameOverCause::Fatal,
                    format!("{}\n\n{}", node_text, messages.fatal_notice),
                )
            } else {
                (GameOverCause::Collapse, messages.collapse_text.clone())
            };
            Turn {
                node_id: id.to_string(),
                text,
                choices: Vec::new(),
                fallthrough: None,
                kind: TurnKind::GameOver(cause),
            }
        };

        self.emit_turn(&turn);
        if let TurnKind::GameOver(cause) = turn.kind {
            self.events
                .push(PresentationEvent::CueRequested { cue: Cue::Fatal });
            let banner = self.config.messages.banner_game_over.clone();
            self.end_run(Terminal::GameOver(cause), banner);
        }

        Ok(&*self.current_turn.insert(turn))
    }

    /// Apply the effects of the choice at `index` in the current turn and
    /// resolve its target.
    pub fn select_choice(&mut self, index: usize) -> Result<&Turn, EngineError> {
        self.ensure_running()?;
        let turn = self.current_turn.as_ref().ok_or(EngineError::NoActiveTurn)?;
        let Some(choice) = turn.choices.get(index).cloned() else {
            warn!(
                "choice {} out of range on '{}' ({} available)",
                index,
                turn.node_id,
                turn.choices.len()
            );
            return Err(EngineError::NoSuchChoice {
                index,
                available: turn.choices.len(),
            });
        };

        if let Some(effects) = &choice.effects {
            debug!(
                "choice '{}' -> '{}' with {:?}",
                choice.text, choice.target, effects
            );
        }
        self.session.status.apply_effects(choice.effects.as_ref());
        self.resolve_node(&choice.target)
    }

    /// Advance a turn that has no choices.
    pub fn confirm(&mut self) -> Result<Advance, EngineError> {
        self.ensure_running()?;
        let turn = self.current_turn.as_ref().ok_or(EngineError::NoActiveTurn)?;
        if !turn.choices.is_empty() {
            return Ok(Advance::AwaitingChoice);
        }

        let milestone = match turn.kind {
            TurnKind::Dialogue => self.content.class_of(&turn.node_id)?.milestone,
            _ => None,
        };
        let fallthrough = turn.fallthrough.clone();

        match milestone {
            Some(Milestone::Cutscene) => {
                let exit = fallthrough
                    .clone()
                    .or_else(|| self.config.rejection_node.clone());
                if let Some(exit) = exit {
                    info!("ending cutscene begins, resuming at '{}'", exit);
                    self.close_dialogue(false);
                    self.cutscene_exit = Some(exit);
                    return Ok(Advance::Cutscene);
                }
            }
            Some(Milestone::Rejection) => {
                let banner = self.config.messages.banner_rejected.clone();
                self.close_dialogue(false);
                self.events
                    .push(PresentationEvent::CueRequested { cue: Cue::Fatal });
                self.end_run(Terminal::GameOver(GameOverCause::Rejected), banner);
                return Ok(Advance::Ended(EndKind::GameOver));
            }
            Some(Milestone::Success) => {
                let banner = self.config.messages.banner_completed.clone();
                self.close_dialogue(false);
                self.events
                    .push(PresentationEvent::CueRequested { cue: Cue::Fanfare });
                self.end_run(Terminal::Completed, banner);
                return Ok(Advance::Ended(EndKind::Completed));
            }
            Some(Milestone::Celebration) | None => {}
        }

        match fallthrough {
            Some(next) => {
                self.resolve_node(&next)?;
                Ok(Advance::Turn)
            }
            None => {
                self.close_dialogue(true);
                Ok(Advance::Closed)
            }
        }
    }

    /// Resolve the node that follows the ending cutscene.
    pub fn finish_cutscene(&mut self) -> Result<&Turn, EngineError> {
        if self.session.terminal.is_ended() {
            return Err(EngineError::RunEnded);
        }
        let exit = self.cutscene_exit.take().ok_or(EngineError::NoCutscene)?;
        info!("ending cutscene finished");
        self.resolve_node(&exit)
    }

    /// Open the dialogue at the interaction node, as when the player
    /// walks up to the desk.
    pub fn open_interaction(&mut self) -> Result<&Turn, EngineError> {
        self.ensure_running()?;
        if self.current_turn.is_some() {
            return Err(EngineError::DialogueOpen);
        }
        let id = self.config.interaction_node.clone();
        self.resolve_node(&id)
    }

    /// Debug jump. Accepts a node id, or a bare step number: `0` is the
    /// entry node, `n` the first main-track id starting with `step{n}_`.
    pub fn jump_to_node(&mut self, target: &str) -> Result<&Turn, EngineError> {
        self.ensure_running()?;
        let id = self
            .resolve_jump_target(target)
            .ok_or_else(|| EngineError::UnknownJumpTarget(target.to_string()))?;
        info!("jump to '{}'", id);
        self.resolve_node(&id)
    }

    fn resolve_jump_target(&self, target: &str) -> Option<String> {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }
        if self.content.contains(target) {
            return Some(target.to_string());
        }
        let n: u32 = target.parse().ok()?;
        if n == 0 {
            return Some(self.config.entry_node.clone());
        }
        let prefix = format!("{}{}_", self.config.progress_prefix, n);
        self.content
            .ids_sorted()
            .into_iter()
            .find(|id| id.starts_with(&prefix))
            .map(str::to_string)
    }

    /// Take every queued presentation event, oldest first.
    pub fn drain_events(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> EngineState {
        match self.session.terminal {
            Terminal::GameOver(cause) => EngineState::GameOver(cause),
            Terminal::Completed => EngineState::Completed,
            Terminal::None if self.cutscene_exit.is_some() => EngineState::Cutscene,
            Terminal::None => match &self.current_turn {
                Some(turn) => EngineState::Active(turn.node_id.clone()),
                None => EngineState::Idle,
            },
        }
    }

    pub fn current_turn(&self) -> Option<&Turn> {
        self.current_turn.as_ref()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.session.status.snapshot()
    }

    pub fn health(&self) -> Health {
        self.session.health
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.session.progress
    }

    pub fn last_safe_node(&self) -> &str {
        &self.session.last_safe
    }

    pub fn is_celebrating(&self) -> bool {
        self.session.celebrating
    }

    pub fn content(&self) -> &ContentTable {
        &self.content
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.session.terminal.is_ended() {
            Err(EngineError::RunEnded)
        } else if self.cutscene_exit.is_some() {
            Err(EngineError::CutsceneActive)
        } else {
            Ok(())
        }
    }

    fn emit_turn(&mut self, turn: &Turn) {
        self.events.push(PresentationEvent::TurnPresented {
            node_id: turn.node_id.clone(),
            text: turn.text.clone(),
            choices: turn.choice_labels(),
        });
    }

    /// Queue a status event, but only when something changed.
    fn report_status(&mut self) {
        let now = (self.session.status.snapshot(), self.session.health.current());
        if self.last_reported == Some(now) {
            return;
        }
        self.last_reported = Some(now);
        self.events.push(PresentationEvent::StatusChanged {
            snapshot: now.0,
            health: now.1,
            max_health: self.session.health.max(),
        });
    }

    fn clear_celebration(&mut self) {
        if self.session.celebrating {
            self.session.celebrating = false;
            self.events.push(PresentationEvent::CelebrationCleared);
        }
    }

    fn close_dialogue(&mut self, announce: bool) {
        self.current_turn = None;
        self.clear_celebration();
        if announce {
            debug!("dialogue closed");
            self.events.push(PresentationEvent::DialogueClosed);
        }
    }

    fn end_run(&mut self, terminal: Terminal, banner: String) {
        let end = match terminal {
            Terminal::Completed => EndKind::Completed,
            _ => EndKind::GameOver,
        };
        info!(
            "run ended: {:?} after {}/{} main-track nodes",
            terminal,
            self.session.progress.visited(),
            self.session.progress.total()
        );
        self.session.terminal = terminal;
        self.events
            .push(PresentationEvent::EndStateReached { end, banner });
    }
}

impl NarrativeEngineBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Add a content file. Later files override nodes with the same id.
    pub fn content_file(mut self, path: &str) -> Self {
        self.content_files.push(path.to_string());
        self
    }

    /// Merge every `.ron` file in a directory, if it exists.
    pub fn content_dir(mut self, path: &str) -> Self {
        self.content_dir = Some(path.to_string());
        self
    }

    pub fn config_file(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    /// Provide content directly (for testing without files).
    pub fn with_content(mut self, content: ContentTable) -> Self {
        self.content = Some(content);
        self
    }

    /// Provide config directly (for testing without files).
    pub fn with_config(mut self, config: EncounterConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load, classify and validate content. Falls back to the shipped
    /// encounter when no content is given at all.
    pub fn build(self) -> Result<NarrativeEngine, EngineError> {
        let config = match &self.config_path {
            Some(path) => EncounterConfig::load_from_ron(Path::new(path))?,
            None => self.config.unwrap_or_default(),
        };

        let mut layers = Vec::new();
        if let Some(table) = self.content {
            layers.push(table);
        }
        for path in &self.content_files {
            layers.push(ContentTable::load_from_ron(Path::new(path))?);
        }
        if let Some(ref dir) = self.content_dir {
            if Path::new(dir).exists() {
                load_ron_files_from_dir(dir, |path| {
                    layers.push(ContentTable::load_from_ron(path)?);
                    Ok(())
                })?;
            }
        }

        let mut content = if layers.is_empty() {
            ContentTable::parse_ron(BUILTIN_DIALOGUE)?
        } else {
            let mut merged = ContentTable::default();
            for layer in layers {
                merged.merge(layer);
            }
            merged
        };
        content.classify(&config);
        content.validate(&config)?;

        let session = Session::new(&config, &content);
        Ok(NarrativeEngine {
            content,
            config,
            session,
            rng: StdRng::seed_from_u64(self.seed),
            seed: self.seed,
            current_turn: None,
            cutscene_exit: None,
            events: Vec::new(),
            last_reported: None,
        })
    }
}

/// Load all .ron files from a directory in name order, calling `loader`
/// for each.
fn load_ron_files_from_dir<F>(dir: &str, mut loader: F) -> Result<(), EngineError>
where
    F: FnMut(&Path) -> Result<(), EngineError>,
{
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(ContentError::from)? {
        let path = entry.map_err(ContentError::from)?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            paths.push(path);
        }
    }
    paths.sort();
    for path in &paths {
        loader(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(seed: u64) -> NarrativeEngine {
        NarrativeEngine::builder().seed(seed).build().unwrap()
    }

    fn pick(engine: &mut NarrativeEngine, target: &str) {
        let index = engine
            .current_turn()
            .unwrap()
            .choices
            .iter()
            .position(|c| c.target == target)
            .unwrap_or_else(|| panic!("no choice leads to {}", target));
        engine.select_choice(index).unwrap();
    }

    #[test]
    fn starts_at_entry_node() {
        let mut e = engine(1);
        let turn = e.start_encounter().unwrap();
        assert_eq!(turn.node_id, "step0_intro");
        assert_eq!(turn.kind, TurnKind::Dialogue);
        assert!(turn.choices.is_empty());
        assert_eq!(e.state(), EngineState::Active("step0_intro".to_string()));
        assert_eq!(e.progress().visited(), 1);

        let events = e.drain_events();
        assert!(matches!(events[0], PresentationEvent::StatusChanged { health: 5, .. }));
        assert!(matches!(events[1], PresentationEvent::TurnPresented { .. }));
    }

    #[test]
    fn confirm_follows_fallthrough() {
        let mut e = engine(1);
        e.start_encounter().unwrap();
        assert_eq!(e.confirm().unwrap(), Advance::Turn);
        assert_eq!(e.current_turn().unwrap().node_id, "start");
        assert_eq!(e.confirm().unwrap(), Advance::AwaitingChoice);
    }

    #[test]
    fn retry_points_at_last_safe_node() {
        let mut e = engine(3);
        e.start_encounter().unwrap();
        e.confirm().unwrap();
        pick(&mut e, "fail_play");

        let turn = e.current_turn().unwrap();
        assert_eq!(turn.kind, TurnKind::Retry);
        assert_eq!(turn.choices.len(), 1);
        assert_eq!(turn.choices[0].target, "start");
        assert!(turn.text.contains("heavy hit"));
        assert_eq!(e.health().current(), 4);
        assert_eq!(e.last_safe_node(), "start");
    }

    #[test]
    fn out_of_range_choice_is_rejected() {
        let mut e = engine(1);
        e.start_encounter().unwrap();
        e.confirm().unwrap();
        assert!(matches!(
            e.select_choice(9),
            Err(EngineError::NoSuchChoice { index: 9, available: 3 })
        ));
    }

    #[test]
    fn interaction_requires_closed_dialogue() {
        let mut e = engine(1);
        e.start_encounter().unwrap();
        assert!(matches!(e.open_interaction(), Err(EngineError::DialogueOpen)));
    }

    #[test]
    fn legacy_jump_numbers() {
        let mut e = engine(1);
        e.start_encounter().unwrap();
        assert_eq!(e.jump_to_node("63").unwrap().node_id, "step63_car");
        assert_eq!(e.jump_to_node("0").unwrap().node_id, "step0_intro");
        assert_eq!(
            e.jump_to_node("step79_statistical_fraud").unwrap().node_id,
            "step79_statistical_fraud"
        );
        assert!(matches!(
            e.jump_to_node("1"),
            Err(EngineError::UnknownJumpTarget(_))
        ));
        assert!(matches!(
            e.jump_to_node("nowhere"),
            Err(EngineError::UnknownJumpTarget(_))
        ));
    }

    #[test]
    fn cutscene_blocks_every_entry_into_the_graph() {
        let mut e = engine(1);
        e.start_encounter().unwrap();
        e.jump_to_node("step86_2weeks_later").unwrap();
        assert_eq!(e.confirm().unwrap(), Advance::Cutscene);

        assert!(matches!(
            e.jump_to_node("start"),
            Err(EngineError::CutsceneActive)
        ));
        assert!(matches!(e.select_choice(0), Err(EngineError::CutsceneActive)));
        assert!(matches!(
            e.open_interaction(),
            Err(EngineError::CutsceneActive)
        ));
        assert_eq!(e.state(), EngineState::Cutscene);

        assert_eq!(e.finish_cutscene().unwrap().node_id, "step87_rejection");
    }

    #[test]
    fn status_event_only_on_change() {
        let mut e = engine(1);
        e.start_encounter().unwrap();
        e.drain_events();
        // step0_intro -> start changes nothing
        e.confirm().unwrap();
        let events = e.drain_events();
        assert!(!events
            .iter()
            .any(|ev| matches!(ev, PresentationEvent::StatusChanged { .. })));
    }

    #[test]
    fn missing_content_file_is_an_error() {
        let result = NarrativeEngine::builder()
            .content_file("content/does_not_exist.ron")
            .build();
        assert!(matches!(
            result,
            Err(EngineError::Content(ContentError::Io(_)))
        ));
    }
}
