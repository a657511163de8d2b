//! Text the heads-up display shows, derived from a `GameSnapshot`.

use serde::{Deserialize, Serialize};

use crate::progression::{GameSnapshot, Phase};

/// `MM:SS`, minutes are not wrapped at an hour.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Share of stages already completed, `0.0..=100.0`.
pub fn progress_percent(stage: u32, total_stages: u32) -> f32 {
    if total_stages == 0 {
        return 0.0;
    }
    let done = stage.saturating_sub(1).min(total_stages);
    done as f32 / total_stages as f32 * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudModel {
    pub stage_label: String,
    pub score: u32,
    pub lives: u32,
    pub clock: String,
    pub progress_percent: f32,
    pub task: Option<String>,
    pub paused: bool,
}

impl HudModel {
    pub fn from_snapshot(snapshot: &GameSnapshot) -> Self {
        let shown_stage = snapshot.stage.min(snapshot.total_stages);
        Self {
            stage_label: format!("{shown_stage}/{}", snapshot.total_stages),
            score: snapshot.score,
            lives: snapshot.lives,
            clock: format_clock(snapshot.time_left_secs),
            progress_percent: progress_percent(snapshot.stage, snapshot.total_stages),
            task: snapshot.task.clone(),
            paused: snapshot.phase == Phase::Paused,
        }
    }

    /// One-line status for terminal shells.
    pub fn status_line(&self) -> String {
        const BAR_WIDTH: usize = 13;
        let filled = ((self.progress_percent / 100.0) * BAR_WIDTH as f32).round() as usize;
        let bar: String = (0..BAR_WIDTH)
            .map(|i| if i < filled.min(BAR_WIDTH) { '#' } else { '.' })
            .collect();
        let paused = if self.paused { " | ПАУЗА" } else { "" };
        format!(
            "Этап {} | Очки {} | Жизни {} | {} | [{bar}] {:.0}%{paused}",
            self.stage_label, self.score, self.lives, self.clock, self.progress_percent
        )
    }
}
