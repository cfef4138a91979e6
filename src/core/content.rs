/// Content table — the authored dialogue graph, loaded once and validated.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::core::config::EncounterConfig;
use crate::schema::node::{Choice, Node, NodeCategory, NodeClass};
use crate::schema::status::StatusDelta;

/// The shipped guild-office encounter.
pub const BUILTIN_DIALOGUE: &str = include_str!("../../content/guild_office/dialogue.ron");

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("unknown node: {0}")]
    UnknownNode(String),
    #[error("content has {} defect(s): {}", .0.len(), join_defects(.0))]
    Invalid(Vec<ContentDefect>),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A single authoring bug found by [`ContentTable::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentDefect {
    DanglingTarget { node: String, target: String },
    MissingDesignatedNode { role: &'static str, id: String },
    FatalWithoutFailPrefix(String),
}

impl fmt::Display for ContentDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingTarget { node, target } => {
                write!(f, "node '{}' points at missing node '{}'", node, target)
            }
            Self::MissingDesignatedNode { role, id } => {
                write!(f, "{} node '{}' is not in the table", role, id)
            }
            Self::FatalWithoutFailPrefix(id) => {
                write!(f, "fatal fail id '{}' lacks the fail prefix", id)
            }
        }
    }
}

fn join_defects(defects: &[ContentDefect]) -> String {
    defects
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// RON deserialization helpers. Authored content names the follow-on
// node `next`, and the id lives in the map key rather than the body.

#[derive(Debug, Deserialize)]
struct RonChoice {
    text: String,
    next: String,
    #[serde(default)]
    effects: Option<StatusDelta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Node")]
struct RonNode {
    text: String,
    #[serde(default)]
    choices: Vec<RonChoice>,
    #[serde(default)]
    next: Option<String>,
}

/// Read-only mapping of node ids to nodes, plus each id's classification
/// once [`ContentTable::classify`] has run.
#[derive(Debug, Clone, Default)]
pub struct ContentTable {
    nodes: HashMap<String, Node>,
    classes: HashMap<String, NodeClass>,
}

impl ContentTable {
    /// Parse, classify and validate the shipped encounter against `config`.
    pub fn builtin(config: &EncounterConfig) -> Result<ContentTable, ContentError> {
        let mut table = Self::parse_ron(BUILTIN_DIALOGUE)?;
        table.classify(config);
        table.validate(config)?;
        Ok(table)
    }

    /// Load a content table from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<ContentTable, ContentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a content table from a RON string. The result is not yet
    /// classified or validated.
    pub fn parse_ron(input: &str) -> Result<ContentTable, ContentError> {
        let raw: HashMap<String, RonNode> = ron::from_str(input)?;
        let mut nodes = HashMap::with_capacity(raw.len());

        for (id, ron_node) in raw {
            let choices = ron_node
                .choices
                .into_iter()
                .map(|c| Choice {
                    text: c.text,
                    target: c.next,
                    effects: c.effects,
                })
                .collect();
            nodes.insert(
                id.clone(),
                Node {
                    id,
                    text: ron_node.text,
                    choices,
                    fallthrough: ron_node.next,
                },
            );
        }

        Ok(ContentTable {
            nodes,
            classes: HashMap::new(),
        })
    }

    /// Merge another table into this one. Nodes from `other` replace nodes
    /// with the same id. Classification is dropped and must be redone.
    pub fn merge(&mut self, other: ContentTable) {
        for (id, node) in other.nodes {
            self.nodes.insert(id, node);
        }
        self.classes.clear();
    }

    /// Compute every node's category and milestone from the naming
    /// convention and the designated ids in `config`.
    pub fn classify(&mut self, config: &EncounterConfig) {
        self.classes = self
            .nodes
            .keys()
            .map(|id| (id.clone(), classify_id(id, config)))
            .collect();
    }

    /// Check that every reference in the graph, and every id the config
    /// designates, resolves. All defects are reported together.
    pub fn validate(&self, config: &EncounterConfig) -> Result<(), ContentError> {
        let mut defects = Vec::new();

        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort();
        for id in ids {
            let node = &self.nodes[id];
            for target in node.targets() {
                if !self.nodes.contains_key(target) {
                    defects.push(ContentDefect::DanglingTarget {
                        node: id.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        for (role, id) in config.designated_nodes() {
            if !self.nodes.contains_key(id) {
                defects.push(ContentDefect::MissingDesignatedNode {
                    role,
                    id: id.to_string(),
                });
            }
        }

        let mut fatal: Vec<&String> = config.fatal_fail_ids.iter().collect();
        fatal.sort();
        for id in fatal {
            if !id.starts_with(&config.fail_prefix) {
                defects.push(ContentDefect::FatalWithoutFailPrefix(id.clone()));
            } else if !self.nodes.contains_key(id.as_str()) {
                defects.push(ContentDefect::MissingDesignatedNode {
                    role: "fatal fail",
                    id: id.clone(),
                });
            }
        }

        if defects.is_empty() {
            Ok(())
        } else {
            Err(ContentError::Invalid(defects))
        }
    }

    pub fn get(&self, id: &str) -> Result<&Node, ContentError> {
        self.nodes
            .get(id)
            .ok_or_else(|| ContentError::UnknownNode(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// The classification computed by [`ContentTable::classify`].
    pub fn class_of(&self, id: &str) -> Result<NodeClass, ContentError> {
        self.classes
            .get(id)
            .copied()
            .ok_or_else(|| ContentError::UnknownNode(id.to_string()))
    }

    /// Number of main-track nodes, used as the progress denominator.
    pub fn count_main_track_nodes(&self) -> usize {
        self.classes
            .values()
            .filter(|c| c.category == NodeCategory::Progress)
            .count()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in lexicographic order.
    pub fn ids_sorted(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Ids reachable from `start` by following choice targets and
    /// fallthroughs. Targets missing from the table are not followed.
    pub fn reachable_from(&self, start: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        if self.nodes.contains_key(start) {
            queue.push_back(start.to_string());
        }

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                for target in node.targets() {
                    if self.nodes.contains_key(target) && !seen.contains(target) {
                        queue.push_back(target.to_string());
                    }
                }
            }
        }

        seen
    }
}

fn classify_id(id: &str, config: &EncounterConfig) -> NodeClass {
    let category = if id.starts_with(&config.fail_prefix) {
        if config.fatal_fail_ids.contains(id) {
            NodeCategory::FatalFail
        } else {
            NodeCategory::Fail
        }
    } else if id.starts_with(&config.progress_prefix) {
        NodeCategory::Progress
    } else {
        NodeCategory::Dialogue
    };

    NodeClass {
        category,
        milestone: config.milestone_for(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::Milestone;

    const SMALL: &str = r#"#![enable(implicit_some)]
    {
        "step0_intro": Node(
            text: "You wait.",
            next: "start",
        ),
        "start": Node(
            text: "[Clerk] Next.",
            choices: [
                (text: "I'm here to apply.", next: "step1_card", effects: (fatigue: 1, time: -1)),
                (text: "Just looking.", next: "fail_loiter"),
            ],
        ),
        "step1_card": Node(
            text: "[Clerk] ID, please.",
            choices: [
                (text: "Here.", next: "step0_intro"),
            ],
        ),
        "fail_loiter": Node(text: "[Clerk] Move along."),
    }"#;

    fn small_config() -> EncounterConfig {
        EncounterConfig {
            fatal_fail_ids: Default::default(),
            celebration_node: None,
            cutscene_node: None,
            rejection_node: None,
            ..EncounterConfig::default()
        }
    }

    #[test]
    fn parse_small_table() {
        let table = ContentTable::parse_ron(SMALL).unwrap();
        assert_eq!(table.len(), 4);

        let start = table.get("start").unwrap();
        assert_eq!(start.choices.len(), 2);
        assert_eq!(start.choices[0].target, "step1_card");
        assert_eq!(
            start.choices[0].effects,
            Some(StatusDelta::new(1, 0, -1))
        );
        assert_eq!(start.choices[1].effects, None);

        let intro = table.get("step0_intro").unwrap();
        assert!(intro.is_monologue());
        assert_eq!(intro.fallthrough.as_deref(), Some("start"));
    }

    #[test]
    fn unknown_node_is_an_error() {
        let table = ContentTable::parse_ron(SMALL).unwrap();
        assert!(matches!(
            table.get("step99_missing"),
            Err(ContentError::UnknownNode(id)) if id == "step99_missing"
        ));
    }

    #[test]
    fn classification_follows_prefixes() {
        let config = small_config();
        let mut table = ContentTable::parse_ron(SMALL).unwrap();
        table.classify(&config);

        assert_eq!(
            table.class_of("step1_card").unwrap().category,
            NodeCategory::Progress
        );
        assert_eq!(
            table.class_of("start").unwrap().category,
            NodeCategory::Dialogue
        );
        assert_eq!(
            table.class_of("fail_loiter").unwrap().category,
            NodeCategory::Fail
        );
        assert_eq!(table.count_main_track_nodes(), 2);
        table.validate(&config).unwrap();
    }

    #[test]
    fn fatal_ids_are_enumerated_not_inferred() {
        let mut config = small_config();
        config.fatal_fail_ids.insert("fail_loiter".to_string());
        let mut table = ContentTable::parse_ron(SMALL).unwrap();
        table.classify(&config);
        assert_eq!(
            table.class_of("fail_loiter").unwrap().category,
            NodeCategory::FatalFail
        );
    }

    #[test]
    fn validation_reports_every_defect() {
        let broken = r#"{
            "step0_intro": Node(text: "x", choices: [(text: "a", next: "nowhere")]),
        }"#;
        let mut config = small_config();
        config.fatal_fail_ids.insert("rude".to_string());
        let table = ContentTable::parse_ron(broken).unwrap();

        match table.validate(&config) {
            Err(ContentError::Invalid(defects)) => {
                assert!(defects.contains(&ContentDefect::DanglingTarget {
                    node: "step0_intro".to_string(),
                    target: "nowhere".to_string(),
                }));
                assert!(defects.contains(&ContentDefect::MissingDesignatedNode {
                    role: "interaction",
                    id: "start".to_string(),
                }));
                assert!(defects.contains(&ContentDefect::FatalWithoutFailPrefix(
                    "rude".to_string()
                )));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn merge_overrides_same_id() {
        let mut base = ContentTable::parse_ron(SMALL).unwrap();
        let patch = ContentTable::parse_ron(
            r#"{ "fail_loiter": Node(text: "[Clerk] Security!"), "fail_extra": Node(text: "x") }"#,
        )
        .unwrap();
        base.merge(patch);
        assert_eq!(base.get("fail_loiter").unwrap().text, "[Clerk] Security!");
        assert!(base.contains("fail_extra"));
        assert!(base.class_of("start").is_err(), "merge drops classification");
    }

    #[test]
    fn reachability_follows_choices_and_fallthrough() {
        let table = ContentTable::parse_ron(SMALL).unwrap();
        let reach = table.reachable_from("step0_intro");
        assert_eq!(reach.len(), 4);
        assert!(reach.contains("fail_loiter"));
        assert!(table.reachable_from("nope").is_empty());
    }

    #[test]
    fn builtin_milestones_are_classified() {
        let config = EncounterConfig::default();
        let table = ContentTable::builtin(&config).unwrap();
        let seal = table.class_of("step84_final_seal").unwrap();
        assert_eq!(seal.category, NodeCategory::Progress);
        assert_eq!(seal.milestone, Some(Milestone::Celebration));
        assert_eq!(
            table.class_of("fail_sentimentality").unwrap().category,
            NodeCategory::FatalFail
        );
    }
}
