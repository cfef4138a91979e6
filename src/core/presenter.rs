/// Turn presenter — the per-tick loop between the engine and the host.
///
/// Reveals turn text, gates and debounces input, runs the ending
/// cutscene, and freezes on the end-of-run surface until a restart.

use log::{debug, info};

use crate::core::config::Pacing;
use crate::core::cutscene::Cutscene;
use crate::core::engine::{Advance, EngineError, EngineState, NarrativeEngine, Turn};
use crate::core::reveal::TextReveal;
use crate::schema::event::{CutscenePhase, EndKind, PresentationEvent};

/// Drops discrete inputs that arrive too soon after the last accepted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceGate {
    window_ms: u64,
    last: Option<u64>,
}

impl DebounceGate {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last: None,
        }
    }

    /// Returns true and records `now_ms` if the input should be handled.
    pub fn accept(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last {
            if now_ms.saturating_sub(last) < self.window_ms {
                return false;
            }
        }
        self.last = Some(now_ms);
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// What the player is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Dialogue closed; walk up to the desk to reopen it.
    Idle,
    Dialogue,
    Cutscene,
    Ended(EndKind),
}

/// How an input was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Debounced,
    Ignored,
    RevealCompleted,
    Advanced,
    ChoiceSelected,
    DialogueOpened,
    DialogueClosed,
    CutsceneStarted,
    Ended(EndKind),
    Restarted,
}

pub struct TurnPresenter {
    engine: NarrativeEngine,
    pacing: Pacing,
    surface: Surface,
    reveal: Option<TextReveal>,
    cutscene: Option<Cutscene>,
    debounce: DebounceGate,
    events: Vec<PresentationEvent>,
}

impl TurnPresenter {
    pub fn new(engine: NarrativeEngine) -> Self {
        let pacing = engine.config().pacing.clone();
        Self {
            debounce: DebounceGate::new(pacing.debounce_ms),
            engine,
            pacing,
            surface: Surface::Idle,
            reveal: None,
            cutscene: None,
            events: Vec::new(),
        }
    }

    /// Start (or restart) the run at the entry node.
    pub fn start_encounter(&mut self) -> Result<(), EngineError> {
        self.cutscene = None;
        self.engine.start_encounter()?;
        self.present_current();
        Ok(())
    }

    /// Advance the reveal or the cutscene by one frame.
    pub fn tick(&mut self) -> Result<(), EngineError> {
        match self.surface {
            Surface::Dialogue => {
                if let Some(count) = self.reveal.as_mut().and_then(TextReveal::tick) {
                    self.events
                        .push(PresentationEvent::CharactersRevealed { count });
                }
            }
            Surface::Cutscene => {
                let Some(cutscene) = self.cutscene.as_mut() else {
                    return Ok(());
                };
                if let Some(phase) = cutscene.tick() {
                    info!("cutscene phase {:?}", phase);
                    self.events
                        .push(PresentationEvent::CutscenePhaseChanged { phase });
                    if phase == CutscenePhase::Finished {
                        self.cutscene = None;
                        self.engine.finish_cutscene()?;
                        self.present_current();
                    }
                }
            }
            Surface::Idle | Surface::Ended(_) => {}
        }
        Ok(())
    }

    /// Space/Enter. Completes a running reveal, otherwise advances a turn
    /// without choices. Restarts from the end surface.
    pub fn submit_confirm(&mut self, now_ms: u64) -> Result<InputOutcome, EngineError> {
        if !self.debounce.accept(now_ms) {
            return Ok(InputOutcome::Debounced);
        }
        self.handle_confirm()
    }

    /// A tap or click anywhere. Restarts from the end surface, otherwise
    /// behaves like confirm.
    pub fn submit_pointer(&mut self, now_ms: u64) -> Result<InputOutcome, EngineError> {
        if !self.debounce.accept(now_ms) {
            return Ok(InputOutcome::Debounced);
        }
        self.handle_confirm()
    }

    pub fn submit_choice(&mut self, index: usize, now_ms: u64) -> Result<InputOutcome, EngineError> {
        if !self.debounce.accept(now_ms) {
            return Ok(InputOutcome::Debounced);
        }
        if self.surface != Surface::Dialogue {
            return Ok(InputOutcome::Ignored);
        }
        self.engine.select_choice(index)?;
        Ok(match self.present_current() {
            Surface::Ended(end) => InputOutcome::Ended(end),
            _ => InputOutcome::ChoiceSelected,
        })
    }

    /// The player reached the desk.
    pub fn submit_interact_trigger(&mut self, now_ms: u64) -> Result<InputOutcome, EngineError> {
        if !self.debounce.accept(now_ms) {
            return Ok(InputOutcome::Debounced);
        }
        if self.surface != Surface::Idle {
            return Ok(InputOutcome::Ignored);
        }
        self.engine.open_interaction()?;
        self.present_current();
        Ok(InputOutcome::DialogueOpened)
    }

    /// Play again. Only the end-of-run surface accepts it.
    pub fn submit_restart(&mut self, now_ms: u64) -> Result<InputOutcome, EngineError> {
        if !self.debounce.accept(now_ms) {
            return Ok(InputOutcome::Debounced);
        }
        match self.surface {
            Surface::Ended(_) => self.restart(),
            _ => Ok(InputOutcome::Ignored),
        }
    }

    /// Debug jump; see [`NarrativeEngine::jump_to_node`].
    pub fn jump_to_node(&mut self, target: &str) -> Result<(), EngineError> {
        self.engine.jump_to_node(target)?;
        self.present_current();
        Ok(())
    }

    fn handle_confirm(&mut self) -> Result<InputOutcome, EngineError> {
        match self.surface {
            Surface::Ended(_) => self.restart(),
            Surface::Idle | Surface::Cutscene => Ok(InputOutcome::Ignored),
            Surface::Dialogue => {
                if let Some(reveal) = self.reveal.as_mut() {
                    if !reveal.is_complete() {
                        reveal.complete();
                        let count = reveal.visible_chars();
                        self.events
                            .push(PresentationEvent::CharactersRevealed { count });
                        return Ok(InputOutcome::RevealCompleted);
                    }
                }
                match self.engine.confirm()? {
                    Advance::AwaitingChoice => Ok(InputOutcome::Ignored),
                    Advance::Turn => {
                        self.present_current();
                        Ok(InputOutcome::Advanced)
                    }
                    Advance::Cutscene => {
                        self.reveal = None;
                        self.cutscene =
                            Some(Cutscene::new(self.pacing.fade_ticks, self.pacing.hold_ticks));
                        self.surface = Surface::Cutscene;
                        self.events.push(PresentationEvent::CutscenePhaseChanged {
                            phase: CutscenePhase::FadeOut,
                        });
                        Ok(InputOutcome::CutsceneStarted)
                    }
                    Advance::Ended(end) => {
                        self.reveal = None;
                        self.surface = Surface::Ended(end);
                        Ok(InputOutcome::Ended(end))
                    }
                    Advance::Closed => {
                        self.reveal = None;
                        self.surface = Surface::Idle;
                        Ok(InputOutcome::DialogueClosed)
                    }
                }
            }
        }
    }

    fn restart(&mut self) -> Result<InputOutcome, EngineError> {
        info!("restart requested");
        self.start_encounter()?;
        Ok(InputOutcome::Restarted)
    }

    /// Sync the surface and reveal with whatever the engine now shows.
    fn present_current(&mut self) -> Surface {
        self.reveal = self
            .engine
            .current_turn()
            .map(|turn| TextReveal::new(&turn.text, self.pacing.ticks_per_reveal_unit));
        self.surface = match self.engine.state() {
            EngineState::GameOver(_) => Surface::Ended(EndKind::GameOver),
            EngineState::Completed => Surface::Ended(EndKind::Completed),
            EngineState::Cutscene => Surface::Cutscene,
            EngineState::Active(_) => Surface::Dialogue,
            EngineState::Idle => Surface::Idle,
        };
        // Nothing ticks on the end surface; the last text shows whole.
        if let (Surface::Ended(_), Some(reveal)) = (self.surface, self.reveal.as_mut()) {
            reveal.complete();
            let count = reveal.visible_chars();
            self.events
                .push(PresentationEvent::CharactersRevealed { count });
        }
        debug!("surface now {:?}", self.surface);
        self.surface
    }

    /// Engine events first, then the presenter's own, in order.
    pub fn drain_events(&mut self) -> Vec<PresentationEvent> {
        let mut out = self.engine.drain_events();
        out.append(&mut self.events);
        out
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn engine(&self) -> &NarrativeEngine {
        &self.engine
    }

    pub fn current_turn(&self) -> Option<&Turn> {
        self.engine.current_turn()
    }

    /// Text the renderer should show right now.
    pub fn visible_text(&self) -> &str {
        self.reveal.as_ref().map_or("", TextReveal::visible_text)
    }

    pub fn is_revealing(&self) -> bool {
        self.reveal.as_ref().is_some_and(|r| !r.is_complete())
    }

    /// Cutscene overlay opacity, zero outside the cutscene.
    pub fn cutscene_opacity(&self) -> f32 {
        self.cutscene.as_ref().map_or(0.0, Cutscene::opacity)
    }

    /// The interstitial caption, shown only while the cutscene holds.
    pub fn interstitial_text(&self) -> Option<&str> {
        match self.cutscene.as_ref().map(Cutscene::phase) {
            Some(CutscenePhase::Hold) => {
                Some(self.engine.config().messages.interstitial_text.as_str())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presenter() -> TurnPresenter {
        let engine = NarrativeEngine::builder().seed(5).build().unwrap();
        let mut p = TurnPresenter::new(engine);
        p.start_encounter().unwrap();
        p
    }

    #[test]
    fn debounce_window() {
        let mut gate = DebounceGate::new(100);
        assert!(gate.accept(1_000));
        assert!(!gate.accept(1_050));
        assert!(!gate.accept(1_099));
        assert!(gate.accept(1_100));
        gate.reset();
        assert!(gate.accept(0));
    }

    #[test]
    fn confirm_during_reveal_completes_text() {
        let mut p = presenter();
        p.tick().unwrap();
        p.tick().unwrap();
        assert!(p.is_revealing());

        assert_eq!(p.submit_confirm(0).unwrap(), InputOutcome::RevealCompleted);
        assert!(!p.is_revealing());
        assert_eq!(p.current_turn().unwrap().node_id, "step0_intro");
        assert_eq!(p.visible_text(), p.current_turn().unwrap().text);

        assert_eq!(p.submit_confirm(200).unwrap(), InputOutcome::Advanced);
        assert_eq!(p.current_turn().unwrap().node_id, "start");
    }

    #[test]
    fn quick_second_input_is_dropped() {
        let mut p = presenter();
        assert_eq!(p.submit_confirm(1_000).unwrap(), InputOutcome::RevealCompleted);
        assert_eq!(p.submit_confirm(1_040).unwrap(), InputOutcome::Debounced);
        assert_eq!(p.current_turn().unwrap().node_id, "step0_intro");
    }

    #[test]
    fn reveal_emits_character_counts() {
        let mut p = presenter();
        p.drain_events();
        for _ in 0..6 {
            p.tick().unwrap();
        }
        let counts: Vec<usize> = p
            .drain_events()
            .into_iter()
            .filter_map(|ev| match ev {
                PresentationEvent::CharactersRevealed { count } => Some(count),
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![1, 2, 3]);
    }

    #[test]
    fn no_cutscene_text_outside_hold() {
        let p = presenter();
        assert_eq!(p.interstitial_text(), None);
        assert_eq!(p.cutscene_opacity(), 0.0);
    }
}
