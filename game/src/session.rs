//! The whole game as a `GameLogic`: screen flow, world, held keys and progression in one
//! serializable state, advanced by `FarmInput`s.

use std::sync::Arc;

use farm_engine::GameLogic;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CatalogError, StageCatalog};
use crate::config::GameConfig;
use crate::events::{DialogRequest, EngineEvent, GameOutcome, Notification};
use crate::hud::HudModel;
use crate::input::{HeldKeys, KeyCommand};
use crate::progression::{
    AnswerOutcome, CollectOutcome, GameSnapshot, GameState, IntentError, InteractOutcome,
    ProgressionEngine, TickOutcome, ensure_running,
};
use crate::view::{HOW_TO_PLAY_BODY, HOW_TO_PLAY_TITLE, LoadingScreen, Screen, ScreenEffect, ScreenEvent};
use crate::world::{Direction, WorldModel, WorldState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "arg", rename_all = "snake_case")]
pub enum FarmInput {
    /// Percent added to the loading bar.
    LoadingProgress(f32),
    StartGame,
    ReturnToMenu,
    ShowHowToPlay,
    CloseDialog,
    Pause,
    Resume,
    TogglePause,
    Move(Direction),
    KeyDown(String),
    KeyUp(String),
    /// One render frame: held movement keys are applied.
    Frame,
    Interact,
    SubmitAnswer(String),
    CollectSymbol(char),
    Hint,
    Tick,
    TickBy(u32),
}

/// What the last input did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum IntentReport {
    Ok,
    /// The input means nothing on the current screen.
    Ignored,
    Answer(AnswerOutcome),
    Collect(CollectOutcome),
    Interact(InteractOutcome),
    Tick(TickOutcome),
    Rejected(IntentError),
}

impl IntentReport {
    pub fn is_rejected(&self) -> bool {
        matches!(self, IntentReport::Rejected(_))
    }
}

impl From<Result<(), IntentError>> for IntentReport {
    fn from(result: Result<(), IntentError>) -> Self {
        match result {
            Ok(()) => IntentReport::Ok,
            Err(err) => IntentReport::Rejected(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmState {
    pub screen: Screen,
    pub loading: LoadingScreen,
    pub progress: GameState,
    pub world: WorldState,
    pub held_keys: HeldKeys,
    /// The modal currently open, if any.
    pub dialog: Option<DialogRequest>,
    pub last_report: IntentReport,
    /// Events raised by the step that produced this state.
    pub events: Vec<EngineEvent>,
}

impl FarmState {
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.events.iter().filter_map(EngineEvent::as_notification)
    }
}

#[derive(Debug, Clone)]
pub struct FarmGame {
    engine: ProgressionEngine,
    world: WorldModel,
}

impl FarmGame {
    pub fn new(config: &GameConfig, catalog: Arc<StageCatalog>) -> Self {
        Self {
            engine: ProgressionEngine::new(catalog, config.rules.clone()),
            world: WorldModel::new(config.world),
        }
    }

    /// Built-in stages with the given settings.
    pub fn with_config(config: &GameConfig) -> Result<Self, CatalogError> {
        Ok(Self::new(config, Arc::new(StageCatalog::builtin()?)))
    }

    pub fn standard() -> Result<Self, CatalogError> {
        Self::with_config(&GameConfig::default())
    }

    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    pub fn world_model(&self) -> &WorldModel {
        &self.world
    }

    pub fn snapshot(&self, state: &FarmState) -> GameSnapshot {
        self.engine.snapshot(&state.progress)
    }

    pub fn hud(&self, state: &FarmState) -> HudModel {
        HudModel::from_snapshot(&self.snapshot(state))
    }

    fn apply(&self, state: &mut FarmState, input: FarmInput) -> IntentReport {
        match input {
            FarmInput::LoadingProgress(amount) => {
                if state.screen != Screen::Loading {
                    return IntentReport::Ignored;
                }
                if state.loading.advance(amount) {
                    self.change_screen(state, ScreenEvent::LoadingFinished);
                }
                IntentReport::Ok
            }
            FarmInput::StartGame => self.change_screen(state, ScreenEvent::StartGame),
            FarmInput::ReturnToMenu => self.change_screen(state, ScreenEvent::ReturnToMenu),
            FarmInput::ShowHowToPlay => {
                let report = self.change_screen(state, ScreenEvent::ShowHowToPlay);
                if state.screen == Screen::HowToPlay {
                    state.dialog = Some(DialogRequest {
                        title: HOW_TO_PLAY_TITLE.to_string(),
                        body: HOW_TO_PLAY_BODY.to_string(),
                        expected_answer: None,
                    });
                }
                report
            }
            FarmInput::CloseDialog => {
                if state.screen == Screen::HowToPlay {
                    self.change_screen(state, ScreenEvent::CloseDialog);
                }
                if state.dialog.take().is_some() {
                    IntentReport::Ok
                } else {
                    IntentReport::Ignored
                }
            }
            FarmInput::Pause => self.engine.pause(&mut state.progress).into(),
            FarmInput::Resume => self.engine.resume(&mut state.progress).into(),
            FarmInput::TogglePause => self.toggle_pause(state),
            FarmInput::Move(direction) => match ensure_running(&state.progress) {
                Ok(()) => {
                    self.world.move_player(&mut state.world, direction);
                    IntentReport::Ok
                }
                Err(err) => IntentReport::Rejected(err),
            },
            FarmInput::KeyDown(key) => match state.held_keys.on_key_down(&key) {
                Some(KeyCommand::Interact) => self.interact(state),
                Some(KeyCommand::TogglePause) => self.toggle_pause(state),
                Some(KeyCommand::Hint) => self.engine.request_hint(&mut state.progress).into(),
                Some(KeyCommand::Move(_)) | None => IntentReport::Ok,
            },
            FarmInput::KeyUp(key) => {
                state.held_keys.on_key_up(&key);
                IntentReport::Ok
            }
            FarmInput::Frame => {
                if !state.progress.is_running() {
                    return IntentReport::Ignored;
                }
                let held: Vec<Direction> = state.held_keys.directions().collect();
                for direction in held {
                    self.world.move_player(&mut state.world, direction);
                }
                IntentReport::Ok
            }
            FarmInput::Interact => self.interact(state),
            FarmInput::SubmitAnswer(text) => {
                match self.engine.submit_answer(&mut state.progress, &text) {
                    Ok(outcome) => {
                        if outcome.is_correct() {
                            state.dialog = None;
                        }
                        IntentReport::Answer(outcome)
                    }
                    Err(err) => IntentReport::Rejected(err),
                }
            }
            FarmInput::CollectSymbol(symbol) => {
                match self.engine.collect_symbol(&mut state.progress, symbol) {
                    Ok(outcome) => IntentReport::Collect(outcome),
                    Err(err) => IntentReport::Rejected(err),
                }
            }
            FarmInput::Hint => self.engine.request_hint(&mut state.progress).into(),
            FarmInput::Tick => IntentReport::Tick(self.engine.tick(&mut state.progress)),
            FarmInput::TickBy(secs) => {
                IntentReport::Tick(self.engine.tick_by(&mut state.progress, secs))
            }
        }
    }

    fn toggle_pause(&self, state: &mut FarmState) -> IntentReport {
        if state.progress.is_paused() {
            self.engine.resume(&mut state.progress).into()
        } else {
            self.engine.pause(&mut state.progress).into()
        }
    }

    fn interact(&self, state: &mut FarmState) -> IntentReport {
        if let Err(err) = ensure_running(&state.progress) {
            return IntentReport::Rejected(err);
        }
        let props = self.engine.current_props(&state.progress);
        let Some((index, prop)) = self.world.closest_prop_in_range(&state.world, props) else {
            return IntentReport::Rejected(IntentError::InteractionOutOfRange);
        };
        let prop = *prop;
        debug!(index, kind = %prop.kind, "interacting");
        match self.engine.interact(&mut state.progress, &prop) {
            Ok(outcome) => IntentReport::Interact(outcome),
            Err(err) => IntentReport::Rejected(err),
        }
    }

    fn change_screen(&self, state: &mut FarmState, event: ScreenEvent) -> IntentReport {
        let (screen, effect) = state.screen.handle(event);
        let changed = screen != state.screen;
        state.screen = screen;
        match effect {
            ScreenEffect::None => {}
            ScreenEffect::StartGame => {
                self.engine.start(&mut state.progress);
                self.respawn(state);
            }
            ScreenEffect::ResetGame => {
                self.engine.reset(&mut state.progress);
                self.respawn(state);
            }
        }
        if changed {
            debug!(?screen, "screen changed");
            IntentReport::Ok
        } else {
            IntentReport::Ignored
        }
    }

    fn respawn(&self, state: &mut FarmState) {
        state.world = self.world.spawn();
        state.held_keys.clear();
        state.dialog = None;
    }
}

impl GameLogic for FarmGame {
    type State = FarmState;
    type Input = FarmInput;

    fn initial_state(&self) -> Self::State {
        FarmState {
            screen: Screen::default(),
            loading: LoadingScreen::default(),
            progress: self.engine.idle_state(),
            world: self.world.spawn(),
            held_keys: HeldKeys::default(),
            dialog: None,
            last_report: IntentReport::Ok,
            events: Vec::new(),
        }
    }

    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State {
        let mut next = state.clone();
        next.events.clear();

        let report = self.apply(&mut next, input);
        if let IntentReport::Rejected(err) = &report {
            debug!(%err, "intent rejected");
        }
        next.last_report = report;
        next.events = next.progress.take_events();

        if let Some(dialog) = next.events.iter().rev().find_map(EngineEvent::as_dialog) {
            next.dialog = Some(dialog.clone());
        }
        let finished = next.events.iter().find_map(|event| match event {
            EngineEvent::GameOver { outcome, .. } => Some(*outcome),
            _ => None,
        });
        if let Some(outcome) = finished {
            next.held_keys.clear();
            next.dialog = None;
            let victory = outcome == GameOutcome::Victory;
            next.screen = next.screen.handle(ScreenEvent::GameOver { victory }).0;
        }

        let props = self.engine.current_props(&next.progress);
        self.world.refresh(&mut next.world, props);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_engine::HeadlessRunner;

    fn playing_runner() -> HeadlessRunner<FarmGame> {
        let mut runner = HeadlessRunner::new(FarmGame::standard().expect("builtin catalog"));
        runner.run([
            FarmInput::LoadingProgress(100.0),
            FarmInput::StartGame,
        ]);
        runner
    }

    #[test]
    fn loading_then_start_enters_play() {
        let runner = playing_runner();
        let state = runner.state();
        assert_eq!(state.screen, Screen::Playing);
        assert!(state.progress.is_running());
        assert!(
            state
                .events
                .contains(&EngineEvent::StageLoaded { stage: 1 })
        );
    }

    #[test]
    fn start_is_ignored_while_loading() {
        let mut runner = HeadlessRunner::new(FarmGame::standard().unwrap());
        runner.step(FarmInput::StartGame);
        assert_eq!(runner.state().last_report, IntentReport::Ignored);
        assert_eq!(runner.state().screen, Screen::Loading);
    }

    #[test]
    fn held_key_moves_once_per_frame() {
        let mut runner = playing_runner();
        runner.run([
            FarmInput::KeyDown("w".to_string()),
            FarmInput::Frame,
            FarmInput::Frame,
            FarmInput::KeyUp("w".to_string()),
            FarmInput::Frame,
        ]);
        assert!((runner.state().world.player.z - 9.8).abs() < 1e-4);
    }

    #[test]
    fn pause_key_blocks_movement() {
        let mut runner = playing_runner();
        runner.step(FarmInput::KeyDown("p".to_string()));
        assert!(runner.state().progress.is_paused());

        runner.step(FarmInput::Move(Direction::Left));
        assert_eq!(
            runner.state().last_report,
            IntentReport::Rejected(IntentError::Paused)
        );
        assert_eq!(runner.state().world.player.x, 0.0);
    }

    #[test]
    fn interaction_far_from_props_is_rejected() {
        let mut runner = playing_runner();
        runner.step(FarmInput::Interact);
        assert_eq!(
            runner.state().last_report,
            IntentReport::Rejected(IntentError::InteractionOutOfRange)
        );
    }

    #[test]
    fn how_to_play_dialog_round_trip() {
        let mut runner = HeadlessRunner::new(FarmGame::standard().unwrap());
        runner.run([FarmInput::LoadingProgress(100.0), FarmInput::ShowHowToPlay]);
        assert_eq!(runner.state().screen, Screen::HowToPlay);
        assert!(runner.state().dialog.is_some());

        runner.step(FarmInput::CloseDialog);
        assert_eq!(runner.state().screen, Screen::MainMenu);
        assert!(runner.state().dialog.is_none());
    }
}
