//! The static table of stages: task text, expected answer, reward and the props placed in
//! the farm for each stage.
//!
//! The shipped table lives in `assets/stages.json` and is compiled into the binary; it is
//! parsed and validated once at start-up and then shared read-only (`Arc<StageCatalog>`).

use std::collections::HashSet;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TOTAL_STAGES: u32 = 13;
/// Number of egg symbols that make up a full code.
pub const SYMBOLS_PER_STAGE: usize = 5;

const BUILTIN_STAGES_JSON: &str = include_str!("../assets/stages.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("stage catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("stage catalog has no stages")]
    Empty,
    #[error("expected {expected} stages, found {found}")]
    WrongStageCount { expected: u32, found: usize },
    #[error("stage at position {position} has index {index}; indices must run 1, 2, 3, ...")]
    OutOfOrder { position: usize, index: u32 },
    #[error("stage {stage} has an empty answer")]
    EmptyAnswer { stage: u32 },
    #[error("stage {stage} places {count} eggs (max {max})", max = SYMBOLS_PER_STAGE)]
    TooManyEggs { stage: u32, count: usize },
    #[error("stage {stage} uses egg symbol {symbol:?} more than once")]
    DuplicateSymbol { stage: u32, symbol: char },
    #[error("zombie_egg prop is missing its symbol")]
    EggWithoutSymbol,
    #[error("{kind} prop cannot carry a symbol (got {symbol:?})")]
    SymbolOnNonEgg { kind: &'static str, symbol: char },
}

/// What a prop does when the player interacts with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKind {
    /// Opens a dialog revealing the stage code.
    InfectedApple,
    /// Adds its symbol to the collected set.
    ZombieEgg { symbol: char },
    /// Opens a dialog with the stage riddle.
    BarnCode,
}

impl PropKind {
    pub fn name(self) -> &'static str {
        match self {
            PropKind::InfectedApple => "infected_apple",
            PropKind::ZombieEgg { .. } => "zombie_egg",
            PropKind::BarnCode => "barn_code",
        }
    }

    pub fn symbol(self) -> Option<char> {
        match self {
            PropKind::ZombieEgg { symbol } => Some(symbol),
            PropKind::InfectedApple | PropKind::BarnCode => None,
        }
    }
}

impl fmt::Display for PropKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPropSpec", into = "RawPropSpec")]
pub struct PropSpec {
    pub kind: PropKind,
    pub position: Vec3,
}

impl PropSpec {
    pub fn new(kind: PropKind, position: Vec3) -> Self {
        Self { kind, position }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawPropKind {
    InfectedApple,
    ZombieEgg,
    BarnCode,
}

/// On-disk shape: `{ "kind": "zombie_egg", "position": [x, y, z], "symbol": "Ω" }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawPropSpec {
    kind: RawPropKind,
    position: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    symbol: Option<char>,
}

impl TryFrom<RawPropSpec> for PropSpec {
    type Error = CatalogError;

    fn try_from(raw: RawPropSpec) -> Result<Self, Self::Error> {
        let kind = match (raw.kind, raw.symbol) {
            (RawPropKind::ZombieEgg, Some(symbol)) => PropKind::ZombieEgg { symbol },
            (RawPropKind::ZombieEgg, None) => return Err(CatalogError::EggWithoutSymbol),
            (RawPropKind::InfectedApple, None) => PropKind::InfectedApple,
            (RawPropKind::BarnCode, None) => PropKind::BarnCode,
            (other, Some(symbol)) => {
                let kind = match other {
                    RawPropKind::InfectedApple => "infected_apple",
                    RawPropKind::BarnCode => "barn_code",
                    RawPropKind::ZombieEgg => "zombie_egg",
                };
                return Err(CatalogError::SymbolOnNonEgg { kind, symbol });
            }
        };
        Ok(PropSpec::new(kind, raw.position))
    }
}

impl From<PropSpec> for RawPropSpec {
    fn from(prop: PropSpec) -> Self {
        let kind = match prop.kind {
            PropKind::InfectedApple => RawPropKind::InfectedApple,
            PropKind::ZombieEgg { .. } => RawPropKind::ZombieEgg,
            PropKind::BarnCode => RawPropKind::BarnCode,
        };
        RawPropSpec {
            kind,
            position: prop.position,
            symbol: prop.kind.symbol(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub index: u32,
    pub task: String,
    pub answer: String,
    pub points: u32,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub props: Vec<PropSpec>,
}

impl StageDefinition {
    /// Egg symbols in placement order.
    pub fn egg_symbols(&self) -> impl Iterator<Item = char> + '_ {
        self.props.iter().filter_map(|p| p.kind.symbol())
    }

    pub fn has_symbol(&self, symbol: char) -> bool {
        self.egg_symbols().any(|s| s == symbol)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    stages: Vec<StageDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageCatalog {
    stages: Vec<StageDefinition>,
}

impl StageCatalog {
    /// Validates an ordered list of stages. Indices must be `1..=n` in order.
    pub fn new(stages: Vec<StageDefinition>) -> Result<Self, CatalogError> {
        if stages.is_empty() {
            return Err(CatalogError::Empty);
        }

        for (position, stage) in stages.iter().enumerate() {
            if stage.index as usize != position + 1 {
                return Err(CatalogError::OutOfOrder {
                    position,
                    index: stage.index,
                });
            }
            if stage.answer.chars().all(char::is_whitespace) {
                return Err(CatalogError::EmptyAnswer { stage: stage.index });
            }

            let mut seen = HashSet::new();
            for symbol in stage.egg_symbols() {
                if !seen.insert(symbol) {
                    return Err(CatalogError::DuplicateSymbol {
                        stage: stage.index,
                        symbol,
                    });
                }
            }
            if seen.len() > SYMBOLS_PER_STAGE {
                return Err(CatalogError::TooManyEggs {
                    stage: stage.index,
                    count: seen.len(),
                });
            }
        }

        Ok(Self { stages })
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(text)?;
        Self::new(file.stages)
    }

    /// The shipped 13-stage table.
    pub fn builtin() -> Result<Self, CatalogError> {
        let catalog = Self::from_json(BUILTIN_STAGES_JSON)?;
        if catalog.len() != TOTAL_STAGES as usize {
            return Err(CatalogError::WrongStageCount {
                expected: TOTAL_STAGES,
                found: catalog.len(),
            });
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Index of the last stage; answering it correctly wins the game.
    pub fn final_stage(&self) -> u32 {
        self.stages.len() as u32
    }

    pub fn stage(&self, index: u32) -> Option<&StageDefinition> {
        let position = (index as usize).checked_sub(1)?;
        self.stages.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageDefinition> {
        self.stages.iter()
    }

    pub fn total_points(&self) -> u32 {
        self.stages.iter().map(|s| s.points).sum()
    }
}
