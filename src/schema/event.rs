/// Presentation events queued for the host, plus the small enums they carry.

use serde::{Deserialize, Serialize};

use super::status::StatusSnapshot;

/// Discrete audio cue requested from the audio collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Incorrect,
    Fatal,
    Fanfare,
}

impl Cue {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Incorrect => "incorrect",
            Self::Fatal => "fatal",
            Self::Fanfare => "fanfare",
        }
    }
}

/// Phase of the ending cutscene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutscenePhase {
    FadeOut,
    Hold,
    FadeIn,
    Finished,
}

/// Which kind of end-of-run surface is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndKind {
    GameOver,
    Completed,
}

/// A signal for the rendering and audio collaborators.
///
/// The core never renders or plays anything itself; it only queues these
/// in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresentationEvent {
    TurnPresented {
        node_id: String,
        text: String,
        choices: Vec<String>,
    },
    CharactersRevealed {
        count: usize,
    },
    StatusChanged {
        snapshot: StatusSnapshot,
        health: u32,
        max_health: u32,
    },
    ScreenShakeRequested {
        intensity: u32,
        duration_ticks: u32,
    },
    CueRequested {
        cue: Cue,
    },
    CelebrationRequested,
    CelebrationCleared,
    CutscenePhaseChanged {
        phase: CutscenePhase,
    },
    DialogueClosed,
    EndStateReached {
        end: EndKind,
        banner: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_names() {
        assert_eq!(Cue::Incorrect.name(), "incorrect");
        assert_eq!(Cue::Fatal.name(), "fatal");
        assert_eq!(Cue::Fanfare.name(), "fanfare");
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let ev = PresentationEvent::CueRequested { cue: Cue::Fanfare };
        let text = ron::to_string(&ev).unwrap();
        assert!(text.contains("cue_requested"));
        assert!(text.contains("fanfare"));
    }
}
