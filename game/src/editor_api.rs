use farm_engine::agent::{AgentCommand, AgentHost, AgentResponse};
use farm_engine::editor::{
    EditorAction, EditorGrid, EditorManifest, EditorPaletteEntry, EditorSnapshot, EditorStat,
    EditorTimeline, GridOrigin,
};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogError, PropKind};
use crate::config::GameConfig;
use crate::session::{FarmGame, FarmInput, FarmState};
use crate::world::{Direction, FarmLayout};

#[derive(Debug, Error)]
pub enum EditorApiError {
    #[error("unknown actionId: {0}")]
    UnknownActionId(String),
    #[error("game state could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("agent returned a history where a state was expected")]
    UnexpectedResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub text: String,
}

const ACTIONS: &[(&str, &str)] = &[
    ("finishLoading", "Finish loading"),
    ("startGame", "Start game"),
    ("returnToMenu", "Main menu"),
    ("showHowToPlay", "How to play"),
    ("closeDialog", "Close dialog"),
    ("togglePause", "Pause / resume"),
    ("moveForward", "Forward"),
    ("moveBackward", "Backward"),
    ("moveLeft", "Left"),
    ("moveRight", "Right"),
    ("interact", "Interact"),
    ("hint", "Hint"),
    ("tick", "Tick 1 s"),
    ("tickMinute", "Tick 60 s"),
];

/// Frames the HTTP session keeps for rewinding; older ones are dropped.
pub const HISTORY_LIMIT: usize = 10_000;

pub struct EditorSession {
    host: AgentHost<FarmGame>,
}

impl EditorSession {
    pub fn new(game: FarmGame) -> Self {
        Self::with_history_limit(game, HISTORY_LIMIT)
    }

    pub fn with_history_limit(game: FarmGame, max_len: usize) -> Self {
        Self {
            host: AgentHost::with_history_limit(game, max_len),
        }
    }

    pub fn with_config(config: &GameConfig) -> Result<Self, CatalogError> {
        Ok(Self::new(FarmGame::with_config(config)?))
    }

    pub fn manifest(&self) -> EditorManifest {
        EditorManifest {
            title: "Zombie Farm".to_string(),
            actions: ACTIONS
                .iter()
                .map(|(id, label)| EditorAction {
                    id: (*id).to_string(),
                    label: (*label).to_string(),
                })
                .collect(),
        }
    }

    pub fn timeline(&self) -> EditorTimeline {
        let runner = self.host.runner();
        let tm = runner.timemachine();
        EditorTimeline {
            frame: runner.frame(),
            history_len: runner.history().len(),
            can_rewind: tm.can_rewind(),
            can_forward: tm.can_forward(),
        }
    }

    pub fn state(&mut self) -> Result<EditorSnapshot, EditorApiError> {
        let response = self.host.handle(AgentCommand::GetState);
        self.snapshot_from_response(response)
    }

    pub fn step(&mut self, action_id: &str) -> Result<EditorSnapshot, EditorApiError> {
        let input = input_from_id(action_id)
            .ok_or_else(|| EditorApiError::UnknownActionId(action_id.to_string()))?;
        self.apply(input)
    }

    /// Submits free text as the current stage's answer.
    pub fn answer(&mut self, text: &str) -> Result<EditorSnapshot, EditorApiError> {
        self.apply(FarmInput::SubmitAnswer(text.to_string()))
    }

    pub fn apply(&mut self, input: FarmInput) -> Result<EditorSnapshot, EditorApiError> {
        let response = self.host.handle(AgentCommand::Step(input));
        self.snapshot_from_response(response)
    }

    pub fn rewind(&mut self, frames: usize) -> Result<EditorSnapshot, EditorApiError> {
        let response = self.host.handle(AgentCommand::Rewind { frames });
        self.snapshot_from_response(response)
    }

    pub fn forward(&mut self, frames: usize) -> Result<EditorSnapshot, EditorApiError> {
        let response = self.host.handle(AgentCommand::Forward { frames });
        self.snapshot_from_response(response)
    }

    pub fn seek(&mut self, frame: usize) -> Result<EditorSnapshot, EditorApiError> {
        let response = self.host.handle(AgentCommand::Seek { frame });
        self.snapshot_from_response(response)
    }

    pub fn reset(&mut self) -> Result<EditorSnapshot, EditorApiError> {
        let response = self.host.handle(AgentCommand::Reset);
        self.snapshot_from_response(response)
    }

    fn snapshot_from_response(
        &self,
        response: AgentResponse<FarmState>,
    ) -> Result<EditorSnapshot, EditorApiError> {
        match response {
            AgentResponse::State { frame, state } => {
                snapshot_from_state(self.host.runner().game(), frame, &state)
            }
            AgentResponse::History { .. } => Err(EditorApiError::UnexpectedResponse),
        }
    }
}

pub fn input_from_id(id: &str) -> Option<FarmInput> {
    let input = match id {
        "finishLoading" => FarmInput::LoadingProgress(100.0),
        "startGame" => FarmInput::StartGame,
        "returnToMenu" => FarmInput::ReturnToMenu,
        "showHowToPlay" => FarmInput::ShowHowToPlay,
        "closeDialog" => FarmInput::CloseDialog,
        "togglePause" => FarmInput::TogglePause,
        "moveForward" => FarmInput::Move(Direction::Forward),
        "moveBackward" => FarmInput::Move(Direction::Backward),
        "moveLeft" => FarmInput::Move(Direction::Left),
        "moveRight" => FarmInput::Move(Direction::Right),
        "interact" => FarmInput::Interact,
        "hint" => FarmInput::Hint,
        "tick" => FarmInput::Tick,
        "tickMinute" => FarmInput::TickBy(60),
        _ => return None,
    };
    Some(input)
}

pub fn snapshot_from_state(
    game: &FarmGame,
    frame: usize,
    state: &FarmState,
) -> Result<EditorSnapshot, EditorApiError> {
    let hud = game.hud(state);
    let snapshot = game.snapshot(state);

    let last_result = serde_json::to_value(&state.last_report)?
        .get("kind")
        .and_then(|kind| kind.as_str())
        .unwrap_or("-")
        .to_string();

    let stats = vec![
        stat("screen", format!("{:?}", state.screen)),
        stat("phase", format!("{:?}", snapshot.phase)),
        stat("stage", hud.stage_label),
        stat("score", hud.score),
        stat("lives", hud.lives),
        stat("timeLeft", hud.clock),
        stat("progress", format!("{:.0}%", hud.progress_percent)),
        stat_opt(
            "symbols",
            Some(snapshot.collected_symbols).filter(|s| !s.is_empty()),
        ),
        stat("playerX", format!("{:.1}", state.world.player.x)),
        stat("playerZ", format!("{:.1}", state.world.player.z)),
        stat("nearby", state.world.highlighted.len()),
        stat_opt("dialog", state.dialog.as_ref().map(|d| d.title.clone())),
        stat("lastResult", last_result),
    ];

    let grid = EditorGrid {
        origin: GridOrigin::TopLeft,
        cells: farm_grid(game, state),
        palette: Some(farm_palette()),
    };

    Ok(EditorSnapshot {
        frame,
        state: serde_json::to_value(state)?,
        stats,
        grid: Some(grid),
    })
}

fn stat(label: impl Into<String>, value: impl ToString) -> EditorStat {
    EditorStat {
        label: label.into(),
        value: value.to_string(),
    }
}

fn stat_opt(label: impl Into<String>, value: Option<String>) -> EditorStat {
    EditorStat {
        label: label.into(),
        value: value.unwrap_or_else(|| "-".to_string()),
    }
}

/// Cells per grid side; the cell size scales with the world extent.
const GRID_SIDE: usize = 41;

const CELL_GROUND: u8 = 0;
const CELL_FENCE: u8 = 1;
const CELL_HOUSE: u8 = 2;
const CELL_APPLE: u8 = 3;
const CELL_EGG: u8 = 4;
const CELL_BARN_CODE: u8 = 5;
const CELL_PLAYER: u8 = 6;

/// Top-down map, row 0 at the far (-z) edge.
fn farm_grid(game: &FarmGame, state: &FarmState) -> Vec<Vec<u8>> {
    let half_extent = game.world_model().config().half_extent;
    let cell_size = half_extent * 2.0 / (GRID_SIDE - 1) as f32;
    let side = GRID_SIDE;
    let mut cells = vec![vec![CELL_GROUND; side]; side];

    let mut paint = |position: Vec3, value: u8| {
        let col = ((position.x + half_extent) / cell_size).round();
        let row = ((position.z + half_extent) / cell_size).round();
        if col >= 0.0 && row >= 0.0 && (col as usize) < side && (row as usize) < side {
            cells[row as usize][col as usize] = value;
        }
    };

    let layout = FarmLayout::standard();
    for post in &layout.fence_posts {
        paint(*post, CELL_FENCE);
    }
    let house = layout.house;
    let mut x = house.position.x - house.size.x / 2.0;
    while x <= house.position.x + house.size.x / 2.0 {
        let mut z = house.position.z - house.size.z / 2.0;
        while z <= house.position.z + house.size.z / 2.0 {
            paint(Vec3::new(x, 0.0, z), CELL_HOUSE);
            z += cell_size;
        }
        x += cell_size;
    }

    for prop in game.engine().current_props(&state.progress) {
        let value = match prop.kind {
            PropKind::InfectedApple => CELL_APPLE,
            PropKind::ZombieEgg { symbol } => {
                if state.progress.collected_symbols().contains(&symbol) {
                    continue;
                }
                CELL_EGG
            }
            PropKind::BarnCode => CELL_BARN_CODE,
        };
        paint(prop.position, value);
    }
    paint(state.world.player, CELL_PLAYER);

    cells
}

fn farm_palette() -> Vec<EditorPaletteEntry> {
    let entries: [(u8, [u8; 4], &str); 7] = [
        (CELL_GROUND, [0x3A, 0x5F, 0x0B, 0xFF], "ground"),
        (CELL_FENCE, [0x8B, 0x45, 0x13, 0xFF], "fence"),
        (CELL_HOUSE, [0xFF, 0xD7, 0x00, 0xFF], "house"),
        (CELL_APPLE, [0xFF, 0x00, 0x00, 0xFF], "infected apple"),
        (CELL_EGG, [0xF0, 0xE6, 0x8C, 0xFF], "zombie egg"),
        (CELL_BARN_CODE, [0x00, 0xFF, 0xFF, 0xFF], "barn code"),
        (CELL_PLAYER, [0xFF, 0x69, 0xB4, 0xFF], "player"),
    ];
    entries
        .into_iter()
        .map(|(value, rgba, label)| EditorPaletteEntry {
            value,
            rgba,
            label: Some(label.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> EditorSession {
        EditorSession::with_config(&GameConfig::default()).expect("builtin catalog")
    }

    fn stat_value<'a>(snapshot: &'a EditorSnapshot, label: &str) -> &'a str {
        snapshot
            .stats
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.value.as_str())
            .unwrap_or_else(|| panic!("missing stat {label}"))
    }

    #[test]
    fn step_advances_frame() {
        let mut session = session();
        let initial = session.state().unwrap();

        let stepped = session.step("finishLoading").expect("valid action");
        assert_eq!(stepped.frame, initial.frame + 1);
        assert_eq!(stat_value(&stepped, "screen"), "MainMenu");
    }

    #[test]
    fn every_manifest_action_is_accepted() {
        let session = session();
        for action in session.manifest().actions {
            assert!(input_from_id(&action.id).is_some(), "{}", action.id);
        }
    }

    #[test]
    fn timeline_reports_history_len() {
        let mut session = session();
        assert_eq!(session.timeline().history_len, 1);

        session.step("finishLoading").unwrap();
        session.step("startGame").unwrap();

        let timeline = session.timeline();
        assert_eq!(timeline.frame, 2);
        assert_eq!(timeline.history_len, 3);
        assert!(timeline.can_rewind);
        assert!(!timeline.can_forward);
    }

    #[test]
    fn answer_updates_score_stat() {
        let mut session = session();
        session.step("finishLoading").unwrap();
        session.step("startGame").unwrap();

        let snapshot = session.answer("заражение_2024").unwrap();
        assert_eq!(stat_value(&snapshot, "stage"), "2/13");
        assert_eq!(stat_value(&snapshot, "score"), "100");
        assert_eq!(stat_value(&snapshot, "lastResult"), "answer");
    }

    #[test]
    fn grid_marks_player_and_stage_props() {
        let mut session = session();
        session.step("finishLoading").unwrap();
        let snapshot = session.step("startGame").unwrap();
        let grid = snapshot.grid.expect("grid");
        assert_eq!(grid.cells.len(), 41);
        // Player spawns at (0, 10) -> col 20, row 25; the stage 1 apple sits at (5, 5).
        assert_eq!(grid.cells[25][20], CELL_PLAYER);
        assert_eq!(grid.cells[23][23], CELL_APPLE);
        assert_eq!(grid.cells[30][20], CELL_FENCE);
    }

    #[test]
    fn grid_size_is_fixed_for_large_worlds() {
        let config: GameConfig =
            serde_json::from_str(r#"{"world":{"half_extent":3000.0}}"#).unwrap();
        let mut session = EditorSession::with_config(&config).expect("builtin catalog");
        session.step("finishLoading").unwrap();
        let snapshot = session.step("startGame").unwrap();

        let grid = snapshot.grid.expect("grid");
        assert_eq!(grid.cells.len(), GRID_SIDE);
        assert!(grid.cells.iter().all(|row| row.len() == GRID_SIDE));
        assert!(grid.cells.iter().flatten().any(|&c| c == CELL_PLAYER));
    }

    #[test]
    fn history_is_capped_but_frames_keep_counting() {
        let game = FarmGame::standard().unwrap();
        let mut session = EditorSession::with_history_limit(game, 8);
        for _ in 0..20 {
            session.step("tick").unwrap();
        }

        let timeline = session.timeline();
        assert_eq!(timeline.frame, 20);
        assert_eq!(timeline.history_len, 8);

        let snapshot = session.seek(0).unwrap();
        assert_eq!(snapshot.frame, 13);
        assert!(!session.timeline().can_rewind);
    }

    #[test]
    fn seek_moves_cursor_to_requested_frame() {
        let mut session = session();
        session.step("finishLoading").unwrap();
        session.step("startGame").unwrap();
        assert_eq!(session.timeline().frame, 2);

        let snapshot = session.seek(0).unwrap();
        assert_eq!(snapshot.frame, 0);
        assert_eq!(stat_value(&snapshot, "screen"), "Loading");
    }

    #[test]
    fn unknown_action_is_rejected() {
        let mut session = session();
        let err = session.step("doesNotExist").unwrap_err();
        match err {
            EditorApiError::UnknownActionId(id) => assert_eq!(id, "doesNotExist"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
