/// Encounter configuration — tunables, designated node ids and messages.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::node::Milestone;
use crate::schema::status::StatusDelta;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Frame-counted pacing for the presenter, plus the two wall-clock limits
/// the host supplies timestamps for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub ticks_per_reveal_unit: u32,
    pub debounce_ms: u64,
    pub fade_ticks: u32,
    pub hold_ticks: u32,
    pub shake_intensity: u32,
    pub shake_ticks: u32,
    pub asset_timeout_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            ticks_per_reveal_unit: 2,
            debounce_ms: 100,
            fade_ticks: 50,
            hold_ticks: 120,
            shake_intensity: 10,
            shake_ticks: 20,
            asset_timeout_ms: 3000,
        }
    }
}

/// Text the engine writes itself rather than reading from content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub retry_label: String,
    pub status_drop_notice: String,
    pub collapse_text: String,
    pub fatal_notice: String,
    pub interstitial_text: String,
    pub banner_game_over: String,
    pub banner_rejected: String,
    pub banner_completed: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            retry_label: "I apologise. (Rephrase)".to_string(),
            status_drop_notice: "<alert>(Your status took a heavy hit!)</alert>".to_string(),
            collapse_text: "[Clerk] ...If all you do is say whatever comes to mind, \
                            you lose our trust.\nI can't help you any further. Please leave.\n\n\
                            <alert>(Your mind gave out...)</alert>"
                .to_string(),
            fatal_notice: "<alert>(Your life just hit a dead end...)</alert>".to_string(),
            interstitial_text: "Two weeks later...".to_string(),
            banner_game_over: "GAME OVER".to_string(),
            banner_rejected: "THE END".to_string(),
            banner_completed: "CLEARED".to_string(),
        }
    }
}

/// Everything about an encounter that is not the dialogue graph itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    pub max_health: u32,
    pub failure_penalty: StatusDelta,
    pub progress_prefix: String,
    pub fail_prefix: String,
    /// Fail nodes that end the run regardless of health. Kept as an
    /// explicit list; no other fail node is ever treated as fatal.
    pub fatal_fail_ids: FxHashSet<String>,
    pub entry_node: String,
    pub interaction_node: String,
    pub celebration_node: Option<String>,
    pub cutscene_node: Option<String>,
    pub rejection_node: Option<String>,
    pub success_node: Option<String>,
    /// Progress denominator used when no content table is available.
    pub fallback_step_estimate: usize,
    pub pacing: Pacing,
    pub messages: Messages,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            max_health: 5,
            failure_penalty: StatusDelta::new(15, -15, -5),
            progress_prefix: "step".to_string(),
            fail_prefix: "fail_".to_string(),
            fatal_fail_ids: [
                "fail_rude_final",
                "fail_betrayal",
                "fail_thanking",
                "fail_sentimentality",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            entry_node: "step0_intro".to_string(),
            interaction_node: "start".to_string(),
            celebration_node: Some("step84_final_seal".to_string()),
            cutscene_node: Some("step86_2weeks_later".to_string()),
            rejection_node: Some("step87_rejection".to_string()),
            success_node: None,
            fallback_step_estimate: 80,
            pacing: Pacing::default(),
            messages: Messages::default(),
        }
    }
}

impl EncounterConfig {
    /// Load a configuration from a RON file. Missing fields keep defaults.
    pub fn load_from_ron(path: &Path) -> Result<EncounterConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EncounterConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    /// The milestone designated for `id`, if any.
    pub fn milestone_for(&self, id: &str) -> Option<Milestone> {
        let is = |slot: &Option<String>| slot.as_deref() == Some(id);
        if is(&self.celebration_node) {
            Some(Milestone::Celebration)
        } else if is(&self.cutscene_node) {
            Some(Milestone::Cutscene)
        } else if is(&self.success_node) {
            Some(Milestone::Success)
        } else if is(&self.rejection_node) {
            Some(Milestone::Rejection)
        } else {
            None
        }
    }

    /// Every designated id paired with the role it plays, for validation.
    pub fn designated_nodes(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![
            ("entry", self.entry_node.as_str()),
            ("interaction", self.interaction_node.as_str()),
        ];
        let optional = [
            ("celebration", &self.celebration_node),
            ("cutscene", &self.cutscene_node),
            ("rejection", &self.rejection_node),
            ("success", &self.success_node),
        ];
        for (role, slot) in optional {
            if let Some(id) = slot {
                out.push((role, id.as_str()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_encounter() {
        let c = EncounterConfig::default();
        assert_eq!(c.max_health, 5);
        assert_eq!(c.failure_penalty, StatusDelta::new(15, -15, -5));
        assert_eq!(c.fatal_fail_ids.len(), 4);
        assert!(c.fatal_fail_ids.contains("fail_betrayal"));
        assert_eq!(c.pacing.debounce_ms, 100);
        assert_eq!(c.pacing.ticks_per_reveal_unit, 2);
        assert_eq!(c.fallback_step_estimate, 80);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let c = EncounterConfig::parse_ron("(max_health: 3, pacing: (hold_ticks: 10))").unwrap();
        assert_eq!(c.max_health, 3);
        assert_eq!(c.pacing.hold_ticks, 10);
        assert_eq!(c.pacing.fade_ticks, 50);
        assert_eq!(c.entry_node, "step0_intro");
    }

    #[test]
    fn milestones_resolve_per_id() {
        let c = EncounterConfig::default();
        assert_eq!(
            c.milestone_for("step84_final_seal"),
            Some(Milestone::Celebration)
        );
        assert_eq!(
            c.milestone_for("step86_2weeks_later"),
            Some(Milestone::Cutscene)
        );
        assert_eq!(
            c.milestone_for("step87_rejection"),
            Some(Milestone::Rejection)
        );
        assert_eq!(c.milestone_for("step2_card"), None);
    }

    #[test]
    fn designated_nodes_skip_unset_slots() {
        let c = EncounterConfig::default();
        let roles: Vec<&str> = c.designated_nodes().iter().map(|(r, _)| *r).collect();
        assert_eq!(
            roles,
            vec!["entry", "interaction", "celebration", "cutscene", "rejection"]
        );
    }

    #[test]
    fn load_shipped_config_file() {
        let path = std::path::PathBuf::from("content/guild_office/encounter.ron");
        let c = EncounterConfig::load_from_ron(&path).unwrap();
        assert_eq!(c, EncounterConfig::default());
    }
}
