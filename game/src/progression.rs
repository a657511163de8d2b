//! Stage / answer / lives / countdown state machine.
//!
//! `ProgressionEngine` holds the immutable rules and the shared stage table. The mutable
//! `GameState` is owned by the caller and threaded through every operation; only this module
//! writes its fields. Operations never panic on player input: a rejected intent comes back
//! as an `IntentError` and leaves the state untouched.
//!
//! ```text
//! Idle --start--> Active <--pause/resume--> Paused
//! Active --correct answer on final stage--> Victory
//! Active --wrong answer, lives reach 0----> Defeat
//! Active --tick, time reaches 0-----------> Defeat
//! Victory | Defeat --reset--> Idle
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{PropKind, PropSpec, SYMBOLS_PER_STAGE, StageCatalog, StageDefinition};
use crate::config::RulesConfig;
use crate::events::{DefeatCause, EngineEvent, GameOutcome, Severity};
use crate::hud::format_clock;
use crate::round_timer::RoundTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Active,
    Paused,
    Victory,
    Defeat,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Victory | Phase::Defeat)
    }
}

/// Player/shell intents, used to describe rejected transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Pause,
    Resume,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Pause => f.write_str("pause"),
            Intent::Resume => f.write_str("resume"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum IntentError {
    #[error("answer is empty")]
    EmptyAnswerSubmitted,
    #[error("stage {stage} is not in the stage catalog")]
    NoStageLoaded { stage: u32 },
    #[error("nothing to interact with within reach")]
    InteractionOutOfRange,
    #[error("symbol {symbol:?} does not belong to stage {stage}")]
    SymbolNotInStage { symbol: char, stage: u32 },
    #[error("the game has not started")]
    NotStarted,
    #[error("the game is paused")]
    Paused,
    #[error("the game is over")]
    GameOver,
    #[error("cannot {intent} while {from:?}")]
    InvalidTransition { from: Phase, intent: Intent },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageAdvance {
    NextStage { stage: u32 },
    Victory { time_bonus: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AnswerOutcome {
    Correct { points: u32, advance: StageAdvance },
    Incorrect { lives_left: u32, defeated: bool },
}

impl AnswerOutcome {
    pub fn is_correct(&self) -> bool {
        matches!(self, AnswerOutcome::Correct { .. })
    }

    /// True when this answer ended the game (either way).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnswerOutcome::Correct {
                advance: StageAdvance::Victory { .. },
                ..
            } | AnswerOutcome::Incorrect { defeated: true, .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CollectOutcome {
    Collected { symbol: char, collected: usize },
    AlreadyCollected { symbol: char },
    /// The set just became complete; `code` is the symbols in collection order.
    Completed { code: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "interaction", rename_all = "snake_case")]
pub enum InteractOutcome {
    DialogOpened { prop: String },
    Collect(CollectOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Idle, paused or finished: nothing changed.
    NotRunning,
    Counting { remaining_secs: u32 },
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    phase: Phase,
    stage: u32,
    score: u32,
    lives: u32,
    timer: RoundTimer,
    collected_symbols: Vec<char>,
    completion_announced: bool,
    #[serde(default)]
    events: Vec<EngineEvent>,
}

impl GameState {
    fn idle(rules: &RulesConfig) -> Self {
        Self {
            phase: Phase::Idle,
            stage: 1,
            score: 0,
            lives: rules.max_lives,
            timer: RoundTimer::new(rules.initial_time_secs),
            collected_symbols: Vec::new(),
            completion_announced: false,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn time_left_secs(&self) -> u32 {
        self.timer.remaining_secs()
    }

    pub fn timer(&self) -> &RoundTimer {
        &self.timer
    }

    /// Symbols in the order they were collected.
    pub fn collected_symbols(&self) -> &[char] {
        &self.collected_symbols
    }

    /// A game is in progress (running or paused).
    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active | Phase::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Events raised since the last drain, oldest first.
    pub fn pending_events(&self) -> &[EngineEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    fn notify(&mut self, message: impl Into<String>, severity: Severity) {
        self.emit(EngineEvent::notify(message, severity));
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::idle(&RulesConfig::default())
    }
}

/// Read-only view of the state for HUDs and remote shells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub phase: Phase,
    pub stage: u32,
    pub total_stages: u32,
    pub score: u32,
    pub lives: u32,
    pub time_left_secs: u32,
    pub is_active: bool,
    pub is_paused: bool,
    pub collected_symbols: String,
    pub task: Option<String>,
}

/// Upper-cases and strips every whitespace character.
pub fn normalize_answer(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    catalog: Arc<StageCatalog>,
    rules: RulesConfig,
}

impl ProgressionEngine {
    pub fn new(catalog: Arc<StageCatalog>, rules: RulesConfig) -> Self {
        Self {
            catalog,
            rules: rules.sanitized(),
        }
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// A fresh, not yet started state.
    pub fn idle_state(&self) -> GameState {
        GameState::idle(&self.rules)
    }

    pub fn current_stage(&self, state: &GameState) -> Option<&StageDefinition> {
        self.catalog.stage(state.stage)
    }

    /// Props of the stage being played; empty outside of a running or paused game.
    pub fn current_props(&self, state: &GameState) -> &[PropSpec] {
        if !state.is_active() {
            return &[];
        }
        self.current_stage(state)
            .map(|stage| stage.props.as_slice())
            .unwrap_or(&[])
    }

    pub fn snapshot(&self, state: &GameState) -> GameSnapshot {
        GameSnapshot {
            phase: state.phase,
            stage: state.stage,
            total_stages: self.catalog.final_stage(),
            score: state.score,
            lives: state.lives,
            time_left_secs: state.time_left_secs(),
            is_active: state.is_active(),
            is_paused: state.is_paused(),
            collected_symbols: state.collected_symbols.iter().collect(),
            task: state
                .is_active()
                .then(|| self.current_stage(state).map(|s| s.task.clone()))
                .flatten(),
        }
    }

    /// Starts (or restarts) a game from stage 1 with full lives and time.
    pub fn start(&self, state: &mut GameState) {
        *state = GameState::idle(&self.rules);
        state.phase = Phase::Active;
        info!(
            lives = state.lives,
            time_secs = state.time_left_secs(),
            "game started"
        );
        self.load_stage(state, 1);
    }

    /// Returns the engine to its pre-`start` state.
    pub fn reset(&self, state: &mut GameState) {
        *state = GameState::idle(&self.rules);
        debug!("progression reset");
    }

    pub fn submit_answer(
        &self,
        state: &mut GameState,
        raw: &str,
    ) -> Result<AnswerOutcome, IntentError> {
        ensure_running(state)?;
        if raw.trim().is_empty() {
            return Err(IntentError::EmptyAnswerSubmitted);
        }
        let stage = self
            .current_stage(state)
            .ok_or(IntentError::NoStageLoaded { stage: state.stage })?;

        if normalize_answer(raw) == normalize_answer(&stage.answer) {
            Ok(self.accept_answer(state, stage.points))
        } else {
            Ok(self.reject_answer(state))
        }
    }

    fn accept_answer(&self, state: &mut GameState, points: u32) -> AnswerOutcome {
        state.score += points;
        state.collected_symbols.clear();
        state.completion_announced = false;
        state.notify(format!("✅ Правильно! +{points} очков"), Severity::Success);

        if state.stage >= self.catalog.final_stage() {
            let time_bonus = state.time_left_secs() / self.rules.time_bonus_divisor;
            state.score += time_bonus;
            state.stage = self.catalog.final_stage() + 1;
            if time_bonus > 0 {
                state.notify(
                    format!("⏱ Бонус за оставшееся время: +{time_bonus}"),
                    Severity::Success,
                );
            }
            self.finish(state, GameOutcome::Victory, None);
            return AnswerOutcome::Correct {
                points,
                advance: StageAdvance::Victory { time_bonus },
            };
        }

        let next = state.stage + 1;
        self.load_stage(state, next);
        AnswerOutcome::Correct {
            points,
            advance: StageAdvance::NextStage { stage: next },
        }
    }

    fn reject_answer(&self, state: &mut GameState) -> AnswerOutcome {
        state.lives = state.lives.saturating_sub(1);
        let defeated = state.lives == 0;
        if defeated {
            state.notify("💀 Закончились жизни!", Severity::Error);
            self.finish(state, GameOutcome::Defeat, Some(DefeatCause::OutOfLives));
        } else {
            state.notify(
                format!("❌ Неправильно! Осталось жизней: {}", state.lives),
                Severity::Error,
            );
        }
        AnswerOutcome::Incorrect {
            lives_left: state.lives,
            defeated,
        }
    }

    /// Adds an egg symbol to the current stage's set. Collecting a symbol twice is a no-op.
    pub fn collect_symbol(
        &self,
        state: &mut GameState,
        symbol: char,
    ) -> Result<CollectOutcome, IntentError> {
        ensure_running(state)?;
        let stage = self
            .current_stage(state)
            .ok_or(IntentError::NoStageLoaded { stage: state.stage })?;
        if !stage.has_symbol(symbol) {
            return Err(IntentError::SymbolNotInStage {
                symbol,
                stage: state.stage,
            });
        }
        if state.collected_symbols.contains(&symbol) {
            return Ok(CollectOutcome::AlreadyCollected { symbol });
        }

        state.collected_symbols.push(symbol);
        state.notify(format!("Собрано: {symbol}"), Severity::Success);

        let collected = state.collected_symbols.len();
        if collected == SYMBOLS_PER_STAGE && !state.completion_announced {
            state.completion_announced = true;
            let code: String = state.collected_symbols.iter().collect();
            debug!(stage = state.stage, %code, "all symbols collected");
            state.emit(EngineEvent::AllSymbolsCollected { code: code.clone() });
            state.emit(EngineEvent::dialog(
                "Все яйца собраны!",
                format!("Собранный код: {code}. Введите его для проверки."),
                None,
            ));
            return Ok(CollectOutcome::Completed { code });
        }

        Ok(CollectOutcome::Collected { symbol, collected })
    }

    /// Runs the effect bound to `prop`.
    pub fn interact(
        &self,
        state: &mut GameState,
        prop: &PropSpec,
    ) -> Result<InteractOutcome, IntentError> {
        ensure_running(state)?;
        let stage = self
            .current_stage(state)
            .ok_or(IntentError::NoStageLoaded { stage: state.stage })?;

        match prop.kind {
            PropKind::InfectedApple => {
                let body = format!("Вы нашли заражённое яблоко! Введите код: {}", stage.answer);
                let answer = Some(stage.answer.clone());
                state.emit(EngineEvent::dialog("Заражённое яблоко", body, answer));
            }
            PropKind::BarnCode => {
                let body = stage.task.clone();
                let answer = Some(stage.answer.clone());
                state.emit(EngineEvent::dialog("Шифр", body, answer));
            }
            PropKind::ZombieEgg { symbol } => {
                return self.collect_symbol(state, symbol).map(InteractOutcome::Collect);
            }
        }

        Ok(InteractOutcome::DialogOpened {
            prop: prop.kind.name().to_string(),
        })
    }

    pub fn request_hint(&self, state: &mut GameState) -> Result<(), IntentError> {
        ensure_running(state)?;
        let stage = self
            .current_stage(state)
            .ok_or(IntentError::NoStageLoaded { stage: state.stage })?;
        let message = match &stage.hint {
            Some(hint) => format!("💡 {hint}"),
            None => "Для этого этапа подсказки нет".to_string(),
        };
        state.notify(message, Severity::Info);
        Ok(())
    }

    /// One second of game time.
    pub fn tick(&self, state: &mut GameState) -> TickOutcome {
        self.tick_by(state, 1)
    }

    pub fn tick_by(&self, state: &mut GameState, delta_secs: u32) -> TickOutcome {
        if !state.is_running() {
            return TickOutcome::NotRunning;
        }

        let tick = state.timer.tick_if_running(delta_secs, true);
        if tick.expired() {
            state.notify("⏰ Время вышло!", Severity::Error);
            self.finish(state, GameOutcome::Defeat, Some(DefeatCause::OutOfTime));
            return TickOutcome::Expired;
        }

        for &threshold in &self.rules.warning_thresholds_secs {
            if tick.crossed(threshold) {
                state.emit(EngineEvent::TimeWarning {
                    remaining_secs: threshold,
                });
                state.notify(
                    format!("⏰ Осталось {}!", format_clock(threshold)),
                    Severity::Warning,
                );
            }
        }

        TickOutcome::Counting {
            remaining_secs: tick.after,
        }
    }

    pub fn pause(&self, state: &mut GameState) -> Result<(), IntentError> {
        if state.phase != Phase::Active {
            return Err(IntentError::InvalidTransition {
                from: state.phase,
                intent: Intent::Pause,
            });
        }
        state.phase = Phase::Paused;
        state.notify("Пауза", Severity::Info);
        Ok(())
    }

    pub fn resume(&self, state: &mut GameState) -> Result<(), IntentError> {
        if state.phase != Phase::Paused {
            return Err(IntentError::InvalidTransition {
                from: state.phase,
                intent: Intent::Resume,
            });
        }
        state.phase = Phase::Active;
        state.notify("Игра продолжается", Severity::Info);
        Ok(())
    }

    fn load_stage(&self, state: &mut GameState, index: u32) {
        state.stage = index;
        state.collected_symbols.clear();
        state.completion_announced = false;
        state.emit(EngineEvent::StageLoaded { stage: index });
        if let Some(stage) = self.catalog.stage(index) {
            info!(stage = index, props = stage.props.len(), "stage loaded");
            state.notify(
                format!("Этап {index} из {}", self.catalog.final_stage()),
                Severity::Info,
            );
        }
    }

    fn finish(&self, state: &mut GameState, outcome: GameOutcome, cause: Option<DefeatCause>) {
        state.phase = match outcome {
            GameOutcome::Victory => Phase::Victory,
            GameOutcome::Defeat => Phase::Defeat,
        };
        if outcome == GameOutcome::Victory {
            state.notify("🎉 Победа! Ферма спасена!", Severity::Success);
        }
        info!(?outcome, ?cause, score = state.score, stage = state.stage, "game over");
        state.emit(EngineEvent::GameOver {
            outcome,
            cause,
            final_score: state.score,
        });
    }
}

/// Gameplay intents are only accepted while the round is running.
pub fn ensure_running(state: &GameState) -> Result<(), IntentError> {
    match state.phase {
        Phase::Active => Ok(()),
        Phase::Idle => Err(IntentError::NotStarted),
        Phase::Paused => Err(IntentError::Paused),
        Phase::Victory | Phase::Defeat => Err(IntentError::GameOver),
    }
}
