pub mod api;
pub mod catalog;
pub mod config;
pub mod editor_api;
pub mod events;
pub mod hud;
pub mod input;
pub mod progression;
pub mod round_timer;
pub mod session;
pub mod telemetry;
pub mod view;
pub mod world;

pub use catalog::StageCatalog;
pub use progression::{GameState, ProgressionEngine};
pub use session::{FarmGame, FarmInput, FarmState};
