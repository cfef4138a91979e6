//! WASM bindings for guild-encounter — drives the encounter from a browser host.
//!
//! The host owns the canvas, audio and the animation frame loop. It calls
//! `tick()` once per frame, forwards inputs with `Date.now()` timestamps,
//! and drains presentation events as JSON.

use wasm_bindgen::prelude::*;

use guild_encounter::core::assets::AssetGate;
use guild_encounter::core::config::EncounterConfig;
use guild_encounter::core::engine::NarrativeEngine;
use guild_encounter::core::presenter::{InputOutcome, Surface, TurnPresenter};

// ---------------------------------------------------------------------------
// Embedded encounter settings, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const ENCOUNTER_CONFIG: &str =
        include_str!("../../content/guild_office/encounter.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct StatusInfo {
    fatigue: i32,
    psyche: i32,
    time: i32,
    health: u32,
    max_health: u32,
    progress: f32,
    surface: &'static str,
    celebrating: bool,
}

fn surface_label(surface: Surface) -> &'static str {
    match surface {
        Surface::Idle => "idle",
        Surface::Dialogue => "dialogue",
        Surface::Cutscene => "cutscene",
        Surface::Ended(_) => "ended",
    }
}

fn outcome_label(outcome: InputOutcome) -> &'static str {
    match outcome {
        InputOutcome::Debounced => "debounced",
        InputOutcome::Ignored => "ignored",
        InputOutcome::RevealCompleted => "reveal_completed",
        InputOutcome::Advanced => "advanced",
        InputOutcome::ChoiceSelected => "choice_selected",
        InputOutcome::DialogueOpened => "dialogue_opened",
        InputOutcome::DialogueClosed => "dialogue_closed",
        InputOutcome::CutsceneStarted => "cutscene_started",
        InputOutcome::Ended(_) => "ended",
        InputOutcome::Restarted => "restarted",
    }
}

fn js_err(context: &str, e: impl std::fmt::Display) -> JsError {
    JsError::new(&format!("{context}: {e}"))
}

// ---------------------------------------------------------------------------
// Encounter: the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct Encounter {
    presenter: TurnPresenter,
    assets: AssetGate,
    started: bool,
}

#[wasm_bindgen]
impl Encounter {
    /// Create an encounter that starts once `expected_assets` have loaded
    /// (or failed), or when the asset timeout passes.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64, expected_assets: usize) -> Result<Encounter, JsError> {
        let config = EncounterConfig::parse_ron(data::ENCOUNTER_CONFIG)
            .map_err(|e| js_err("Config parse error", e))?;
        let assets = AssetGate::new(expected_assets, config.pacing.asset_timeout_ms);

        let engine = NarrativeEngine::builder()
            .seed(seed)
            .with_config(config)
            .build()
            .map_err(|e| js_err("Engine build error", e))?;

        Ok(Encounter {
            presenter: TurnPresenter::new(engine),
            assets,
            started: false,
        })
    }

    pub fn asset_loaded(&mut self) {
        self.assets.asset_loaded();
    }

    pub fn asset_failed(&mut self, name: &str) {
        self.assets.asset_failed(name);
    }

    /// Poll the asset gate. Starts the encounter the first time it opens
    /// and returns true on that call.
    pub fn poll_assets(&mut self, now_ms: f64) -> Result<bool, JsError> {
        if !self.assets.poll(now_ms as u64) {
            return Ok(false);
        }
        self.presenter
            .start_encounter()
            .map_err(|e| js_err("Start error", e))?;
        self.started = true;
        Ok(true)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Advance one animation frame.
    pub fn tick(&mut self) -> Result<(), JsError> {
        if !self.started {
            return Ok(());
        }
        self.presenter.tick().map_err(|e| js_err("Tick error", e))
    }

    /// Space/Enter. Returns how the input was handled.
    pub fn confirm(&mut self, now_ms: f64) -> Result<String, JsError> {
        self.input(|p, now| p.submit_confirm(now), now_ms)
    }

    /// A tap or click anywhere on the canvas.
    pub fn pointer(&mut self, now_ms: f64) -> Result<String, JsError> {
        self.input(|p, now| p.submit_pointer(now), now_ms)
    }

    pub fn choose(&mut self, index: usize, now_ms: f64) -> Result<String, JsError> {
        self.input(|p, now| p.submit_choice(index, now), now_ms)
    }

    /// The player reached the desk.
    pub fn interact(&mut self, now_ms: f64) -> Result<String, JsError> {
        self.input(|p, now| p.submit_interact_trigger(now), now_ms)
    }

    pub fn restart(&mut self, now_ms: f64) -> Result<String, JsError> {
        self.input(|p, now| p.submit_restart(now), now_ms)
    }

    /// Debug jump by node id or step number.
    pub fn jump(&mut self, target: &str) -> Result<(), JsError> {
        self.presenter
            .jump_to_node(target)
            .map_err(|e| js_err("Jump error", e))
    }

    /// Return and clear queued presentation events as a JSON array.
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        let events = self.presenter.drain_events();
        serde_json::to_string(&events).map_err(|e| js_err("Serialization error", e))
    }

    /// Return the meters, health, progress and surface as JSON.
    pub fn status(&self) -> Result<String, JsError> {
        let engine = self.presenter.engine();
        let snapshot = engine.status();
        let health = engine.health();
        let info = StatusInfo {
            fatigue: snapshot.fatigue,
            psyche: snapshot.psyche,
            time: snapshot.time,
            health: health.current(),
            max_health: health.max(),
            progress: engine.progress().ratio(),
            surface: surface_label(self.presenter.surface()),
            celebrating: engine.is_celebrating(),
        };
        serde_json::to_string(&info).map_err(|e| js_err("Serialization error", e))
    }

    /// Return the current choice labels, in display order, as JSON.
    pub fn choices(&self) -> Result<String, JsError> {
        let labels = self
            .presenter
            .current_turn()
            .map(|t| t.choice_labels())
            .unwrap_or_default();
        serde_json::to_string(&labels).map_err(|e| js_err("Serialization error", e))
    }

    /// The part of the current text revealed so far, markup included.
    pub fn visible_text(&self) -> String {
        self.presenter.visible_text().to_string()
    }

    pub fn cutscene_opacity(&self) -> f32 {
        self.presenter.cutscene_opacity()
    }

    pub fn interstitial_text(&self) -> Option<String> {
        self.presenter.interstitial_text().map(str::to_string)
    }
}

// Private helpers
impl Encounter {
    fn input<F>(&mut self, f: F, now_ms: f64) -> Result<String, JsError>
    where
        F: FnOnce(&mut TurnPresenter, u64) -> Result<InputOutcome, guild_encounter::core::engine::EngineError>,
    {
        if !self.started {
            return Ok(outcome_label(InputOutcome::Ignored).to_string());
        }
        let outcome = f(&mut self.presenter, now_ms as u64).map_err(|e| js_err("Input error", e))?;
        Ok(outcome_label(outcome).to_string())
    }
}
