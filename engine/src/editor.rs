//! Wire types shared by remote-control shells (HTTP API, browser front ends).
//!
//! Everything here is game-agnostic: a game describes itself through a manifest of action
//! ids, and reports each frame as a list of labelled stats plus an optional top-down grid.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorAction {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorManifest {
    pub title: String,
    pub actions: Vec<EditorAction>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GridOrigin {
    /// `cells[y][x]` where `y=0` is the bottom row.
    BottomLeft,
    /// `cells[y][x]` where `y=0` is the top row.
    TopLeft,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorPaletteEntry {
    pub value: u8,
    pub rgba: [u8; 4],
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorGrid {
    pub origin: GridOrigin,
    pub cells: Vec<Vec<u8>>,
    pub palette: Option<Vec<EditorPaletteEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorStat {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorTimeline {
    pub frame: usize,
    pub history_len: usize,
    pub can_rewind: bool,
    pub can_forward: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditorSnapshot {
    pub frame: usize,
    /// Raw game state, serialized by the game crate.
    pub state: serde_json::Value,
    pub stats: Vec<EditorStat>,
    pub grid: Option<EditorGrid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StepRequest {
    pub action_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FramesRequest {
    pub frames: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeekRequest {
    pub frame: usize,
}
