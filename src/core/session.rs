/// Per-playthrough session state — everything a restart throws away.

use rustc_hash::FxHashSet;

use crate::core::config::EncounterConfig;
use crate::core::content::ContentTable;
use crate::core::status::{Health, StatusTracker};
use crate::schema::node::NodeCategory;

/// Why a run ended in game over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameOverCause {
    /// Health ran out through ordinary wrong answers.
    Collapse,
    /// A run-ending wrong answer.
    Fatal,
    /// The application was denied at the end of the main track.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminal {
    #[default]
    None,
    GameOver(GameOverCause),
    Completed,
}

impl Terminal {
    pub fn is_ended(&self) -> bool {
        !matches!(self, Terminal::None)
    }
}

/// Set of visited main-track nodes. Display only; never gates anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTracker {
    visited: FxHashSet<String>,
    total: usize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            visited: FxHashSet::default(),
            total,
        }
    }

    /// Count of main-track nodes in `content`, or `fallback` when there is
    /// no table to count.
    pub fn denominator_for(content: Option<&ContentTable>, fallback: usize) -> usize {
        match content {
            Some(table) => table.count_main_track_nodes(),
            None => fallback,
        }
    }

    pub fn record(&mut self, id: &str) {
        self.visited.insert(id.to_string());
    }

    pub fn visited(&self) -> usize {
        self.visited.len()
    }

    pub fn has_visited(&self, id: &str) -> bool {
        self.visited.contains(id)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Fraction of main-track nodes seen so far, in `[0, 1]`.
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.visited.len() as f32 / self.total as f32).min(1.0)
    }

    pub fn clear(&mut self) {
        self.visited.clear();
    }
}

/// Explicit session value owned by the engine.
#[derive(Debug, Clone)]
pub struct Session {
    pub last_safe: String,
    pub health: Health,
    pub status: StatusTracker,
    pub progress: ProgressTracker,
    pub terminal: Terminal,
    pub celebrating: bool,
}

impl Session {
    pub fn new(config: &EncounterConfig, content: &ContentTable) -> Self {
        Self {
            last_safe: config.entry_node.clone(),
            health: Health::new(config.max_health),
            status: StatusTracker::new(),
            progress: ProgressTracker::new(ProgressTracker::denominator_for(
                Some(content),
                config.fallback_step_estimate,
            )),
            terminal: Terminal::None,
            celebrating: false,
        }
    }

    /// Record entry into a non-fail node: it becomes the retry anchor and,
    /// on the main track, counts toward progress.
    pub fn enter_safe(&mut self, id: &str, category: NodeCategory) {
        self.last_safe = id.to_string();
        if category == NodeCategory::Progress {
            self.progress.record(id);
        }
    }

    pub fn reset(&mut self, config: &EncounterConfig) {
        self.last_safe = config.entry_node.clone();
        self.health.reset();
        self.status.reset();
        self.progress.clear();
        self.terminal = Terminal::None;
        self.celebrating = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_ratio_is_bounded() {
        let mut p = ProgressTracker::new(4);
        assert_eq!(p.ratio(), 0.0);
        p.record("step1_a");
        p.record("step1_a");
        p.record("step2_b");
        assert_eq!(p.visited(), 2);
        assert!((p.ratio() - 0.5).abs() < f32::EPSILON);
        assert!(p.has_visited("step2_b"));

        assert_eq!(ProgressTracker::new(0).ratio(), 0.0);
    }

    #[test]
    fn denominator_falls_back_without_table() {
        assert_eq!(ProgressTracker::denominator_for(None, 80), 80);
    }

    #[test]
    fn denominator_counts_builtin_main_track() {
        let config = EncounterConfig::default();
        let table = ContentTable::builtin(&config).unwrap();
        assert_eq!(ProgressTracker::denominator_for(Some(&table), 80), 89);
    }

    #[test]
    fn enter_safe_only_records_main_track() {
        let config = EncounterConfig::default();
        let table = ContentTable::builtin(&config).unwrap();
        let mut s = Session::new(&config, &table);

        s.enter_safe("start", NodeCategory::Dialogue);
        assert_eq!(s.last_safe, "start");
        assert_eq!(s.progress.visited(), 0);

        s.enter_safe("step2_card", NodeCategory::Progress);
        assert_eq!(s.progress.visited(), 1);
    }

    #[test]
    fn reset_restores_entry_state() {
        let config = EncounterConfig::default();
        let table = ContentTable::builtin(&config).unwrap();
        let mut s = Session::new(&config, &table);
        s.enter_safe("step2_card", NodeCategory::Progress);
        s.health.decrement();
        s.terminal = Terminal::GameOver(GameOverCause::Collapse);
        s.celebrating = true;

        s.reset(&config);
        assert_eq!(s.last_safe, "step0_intro");
        assert_eq!(s.health.current(), 5);
        assert_eq!(s.progress.visited(), 0);
        assert!(!s.terminal.is_ended());
        assert!(!s.celebrating);
    }
}
