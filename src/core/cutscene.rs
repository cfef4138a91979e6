/// The "two weeks later" fade: out, hold, back in.

use crate::schema::event::CutscenePhase;

/// Frame-counted cutscene. Nothing about it can be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cutscene {
    phase: CutscenePhase,
    remaining: u32,
    fade_ticks: u32,
    hold_ticks: u32,
}

impl Cutscene {
    pub fn new(fade_ticks: u32, hold_ticks: u32) -> Self {
        Self {
            phase: CutscenePhase::FadeOut,
            remaining: fade_ticks,
            fade_ticks,
            hold_ticks,
        }
    }

    pub fn phase(&self) -> CutscenePhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == CutscenePhase::Finished
    }

    /// Advance one tick. Returns the new phase when it changed.
    pub fn tick(&mut self) -> Option<CutscenePhase> {
        if self.is_finished() {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return None;
        }
        let (next, remaining) = match self.phase {
            CutscenePhase::FadeOut => (CutscenePhase::Hold, self.hold_ticks),
            CutscenePhase::Hold => (CutscenePhase::FadeIn, self.fade_ticks),
            CutscenePhase::FadeIn | CutscenePhase::Finished => (CutscenePhase::Finished, 0),
        };
        self.phase = next;
        self.remaining = remaining;
        Some(next)
    }

    /// Black overlay opacity in `[0, 1]`.
    pub fn opacity(&self) -> f32 {
        let fade = self.fade_ticks.max(1) as f32;
        match self.phase {
            CutscenePhase::FadeOut => 1.0 - self.remaining as f32 / fade,
            CutscenePhase::Hold => 1.0,
            CutscenePhase::FadeIn => self.remaining as f32 / fade,
            CutscenePhase::Finished => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_run_in_order() {
        let mut c = Cutscene::new(50, 120);
        let mut changes = Vec::new();
        let mut ticks = 0;
        while !c.is_finished() {
            ticks += 1;
            if let Some(phase) = c.tick() {
                changes.push((ticks, phase));
            }
        }
        assert_eq!(
            changes,
            vec![
                (50, CutscenePhase::Hold),
                (170, CutscenePhase::FadeIn),
                (220, CutscenePhase::Finished),
            ]
        );
        assert_eq!(c.tick(), None);
    }

    #[test]
    fn opacity_ramps() {
        let mut c = Cutscene::new(4, 2);
        assert_eq!(c.opacity(), 0.0);
        c.tick();
        c.tick();
        assert!((c.opacity() - 0.5).abs() < f32::EPSILON);
        c.tick();
        c.tick();
        assert_eq!(c.phase(), CutscenePhase::Hold);
        assert_eq!(c.opacity(), 1.0);
        c.tick();
        c.tick();
        assert_eq!(c.phase(), CutscenePhase::FadeIn);
        assert_eq!(c.opacity(), 1.0);
        c.tick();
        assert!((c.opacity() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_length_phases_still_advance() {
        let mut c = Cutscene::new(0, 0);
        assert_eq!(c.tick(), Some(CutscenePhase::Hold));
        assert_eq!(c.tick(), Some(CutscenePhase::FadeIn));
        assert_eq!(c.tick(), Some(CutscenePhase::Finished));
    }
}
