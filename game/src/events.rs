//! Values the progression engine hands to the presentation layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

/// A modal the shell should open. `expected_answer` is set when the dialog prompts for a
/// stage answer; the check itself still goes through `submit_answer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogRequest {
    pub title: String,
    pub body: String,
    pub expected_answer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Victory,
    Defeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefeatCause {
    OutOfLives,
    OutOfTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Notification(Notification),
    Dialog(DialogRequest),
    StageLoaded { stage: u32 },
    AllSymbolsCollected { code: String },
    TimeWarning { remaining_secs: u32 },
    GameOver {
        outcome: GameOutcome,
        cause: Option<DefeatCause>,
        final_score: u32,
    },
}

impl EngineEvent {
    pub fn notify(message: impl Into<String>, severity: Severity) -> Self {
        EngineEvent::Notification(Notification {
            message: message.into(),
            severity,
        })
    }

    pub fn dialog(
        title: impl Into<String>,
        body: impl Into<String>,
        expected_answer: Option<String>,
    ) -> Self {
        EngineEvent::Dialog(DialogRequest {
            title: title.into(),
            body: body.into(),
            expected_answer,
        })
    }

    pub fn as_notification(&self) -> Option<&Notification> {
        match self {
            EngineEvent::Notification(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_dialog(&self) -> Option<&DialogRequest> {
        match self {
            EngineEvent::Dialog(d) => Some(d),
            _ => None,
        }
    }
}
