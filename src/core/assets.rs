/// Asset gate: turns per-asset load notices into one "ready" signal.

use log::{info, warn};

/// Counts settled assets and fires once when all of them are in, or when
/// the timeout passes first. A failed asset counts as settled.
#[derive(Debug, Clone)]
pub struct AssetGate {
    expected: usize,
    settled: usize,
    failed: Vec<String>,
    timeout_ms: u64,
    started_at: Option<u64>,
    fired: bool,
}

impl AssetGate {
    pub fn new(expected: usize, timeout_ms: u64) -> Self {
        Self {
            expected,
            settled: 0,
            failed: Vec::new(),
            timeout_ms,
            started_at: None,
            fired: false,
        }
    }

    pub fn asset_loaded(&mut self) {
        self.settled += 1;
    }

    pub fn asset_failed(&mut self, name: &str) {
        warn!("failed to load asset '{}', continuing without it", name);
        self.failed.push(name.to_string());
        self.settled += 1;
    }

    /// Returns true exactly once: on the first poll where every asset has
    /// settled or `timeout_ms` has passed since the first poll.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if self.fired {
            return false;
        }
        let started = *self.started_at.get_or_insert(now_ms);

        if self.settled >= self.expected {
            info!(
                "assets ready ({} loaded, {} failed)",
                self.settled - self.failed.len(),
                self.failed.len()
            );
        } else if now_ms.saturating_sub(started) >= self.timeout_ms {
            warn!(
                "asset loading timed out after {} ms ({}/{} settled), starting anyway",
                self.timeout_ms, self.settled, self.expected
            );
        } else {
            return false;
        }
        self.fired = true;
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn failed(&self) -> &[String] {
        &self.failed
    }
}
