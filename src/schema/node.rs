use serde::{Deserialize, Serialize};

use super::status::StatusDelta;

/// A player-selectable option attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub target: String,
    #[serde(default)]
    pub effects: Option<StatusDelta>,
}

/// A unit of dialogue in the encounter graph.
///
/// A node either offers choices or, when `choices` is empty, may name a
/// `fallthrough` node that a confirm input advances to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub text: String,
    pub choices: Vec<Choice>,
    pub fallthrough: Option<String>,
}

impl Node {
    /// Every node id this node can lead to, choices first.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.choices
            .iter()
            .map(|c| c.target.as_str())
            .chain(self.fallthrough.as_deref())
    }

    /// Returns true if this node chains onward without a player decision.
    pub fn is_monologue(&self) -> bool {
        self.choices.is_empty() && self.fallthrough.is_some()
    }
}

/// How a node takes part in the encounter, derived once when content loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Ordinary dialogue outside the main track (e.g. the desk greeting).
    Dialogue,
    /// Main-track node counted by the progress tracker.
    Progress,
    /// Rejected answer that costs one health.
    Fail,
    /// Rejected answer that ends the run outright.
    FatalFail,
}

impl NodeCategory {
    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail | Self::FatalFail)
    }

    /// Returns the tag string for this category (e.g., "category:fail").
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Dialogue => "category:dialogue",
            Self::Progress => "category:progress",
            Self::Fail => "category:fail",
            Self::FatalFail => "category:fatal_fail",
        }
    }
}

/// A scripted side effect tied to one specific node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Milestone {
    /// Entering the node plays the celebration and fanfare.
    Celebration,
    /// Confirming the node runs the ending cutscene.
    Cutscene,
    /// Confirming the node clears the encounter.
    Success,
    /// Confirming the node ends the run by denial.
    Rejection,
}

/// Load-time classification of a node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeClass {
    pub category: NodeCategory,
    pub milestone: Option<Milestone>,
}
