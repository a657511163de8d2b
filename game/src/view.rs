use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    Loading,
    MainMenu,
    /// Main menu with the how-to-play dialog on top.
    HowToPlay,
    Playing,
    Results { victory: bool },
}

impl Default for Screen {
    fn default() -> Self {
        Self::Loading
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenEvent {
    LoadingFinished,
    StartGame,
    ShowHowToPlay,
    CloseDialog,
    ReturnToMenu,
    GameOver { victory: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenEffect {
    None,
    StartGame,
    ResetGame,
}

impl Screen {
    /// Pure transition function for the screen flow.
    ///
    /// Engine side-effects are reported via `ScreenEffect` so the session applies them in one
    /// place.
    pub fn handle(self, event: ScreenEvent) -> (Screen, ScreenEffect) {
        match (self, event) {
            (Screen::Loading, ScreenEvent::LoadingFinished) => {
                (Screen::MainMenu, ScreenEffect::None)
            }

            (Screen::MainMenu, ScreenEvent::StartGame) => (Screen::Playing, ScreenEffect::StartGame),
            (Screen::MainMenu, ScreenEvent::ShowHowToPlay) => {
                (Screen::HowToPlay, ScreenEffect::None)
            }

            (Screen::HowToPlay, ScreenEvent::CloseDialog) => (Screen::MainMenu, ScreenEffect::None),
            (Screen::HowToPlay, ScreenEvent::StartGame) => {
                (Screen::Playing, ScreenEffect::StartGame)
            }

            (Screen::Playing, ScreenEvent::GameOver { victory }) => {
                (Screen::Results { victory }, ScreenEffect::None)
            }
            (Screen::Playing, ScreenEvent::ReturnToMenu) => {
                (Screen::MainMenu, ScreenEffect::ResetGame)
            }

            (Screen::Results { .. }, ScreenEvent::StartGame) => {
                (Screen::Playing, ScreenEffect::StartGame)
            }
            (Screen::Results { .. }, ScreenEvent::ReturnToMenu) => {
                (Screen::MainMenu, ScreenEffect::ResetGame)
            }

            (screen, _) => (screen, ScreenEffect::None),
        }
    }

    pub fn is_playing(self) -> bool {
        self == Screen::Playing
    }
}

pub const LOADING_TIPS: [&str; 5] = [
    "Загрузка фермы...",
    "Зомби-куры просыпаются...",
    "Подготовка загадок...",
    "Прячем яйца по ферме...",
    "Почти готово...",
];

pub const HOW_TO_PLAY_TITLE: &str = "Как играть";
pub const HOW_TO_PLAY_BODY: &str = "WASD или стрелки: движение. Пробел: взаимодействие. \
P или Esc: пауза. H: подсказка. Решите 13 загадок, пока не кончились время и жизни.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadingScreen {
    progress: f32,
}

impl LoadingScreen {
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_done(&self) -> bool {
        self.progress >= 100.0
    }

    /// Adds `amount` percent (negative and non-finite amounts are ignored). Returns true when
    /// this call completed the bar.
    pub fn advance(&mut self, amount: f32) -> bool {
        if self.is_done() || !amount.is_finite() || amount <= 0.0 {
            return false;
        }
        self.progress = (self.progress + amount).min(100.0);
        self.is_done()
    }

    pub fn tip(&self) -> &'static str {
        let index = (self.progress / 20.0).floor() as usize;
        LOADING_TIPS[index.min(LOADING_TIPS.len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_screen_is_loading() {
        assert_eq!(Screen::default(), Screen::Loading);
    }

    #[test]
    fn loading_finishes_into_main_menu() {
        assert_eq!(
            Screen::Loading.handle(ScreenEvent::LoadingFinished),
            (Screen::MainMenu, ScreenEffect::None)
        );
    }

    #[test]
    fn start_from_loading_is_ignored() {
        assert_eq!(
            Screen::Loading.handle(ScreenEvent::StartGame),
            (Screen::Loading, ScreenEffect::None)
        );
    }

    #[test]
    fn start_from_menu_requests_engine_start() {
        assert_eq!(
            Screen::MainMenu.handle(ScreenEvent::StartGame),
            (Screen::Playing, ScreenEffect::StartGame)
        );
    }

    #[test]
    fn how_to_play_opens_and_closes() {
        let (screen, _) = Screen::MainMenu.handle(ScreenEvent::ShowHowToPlay);
        assert_eq!(screen, Screen::HowToPlay);
        assert_eq!(
            screen.handle(ScreenEvent::CloseDialog),
            (Screen::MainMenu, ScreenEffect::None)
        );
    }

    #[test]
    fn game_over_shows_results_and_menu_resets() {
        let (screen, effect) = Screen::Playing.handle(ScreenEvent::GameOver { victory: true });
        assert_eq!(screen, Screen::Results { victory: true });
        assert_eq!(effect, ScreenEffect::None);

        assert_eq!(
            screen.handle(ScreenEvent::ReturnToMenu),
            (Screen::MainMenu, ScreenEffect::ResetGame)
        );
        assert_eq!(
            screen.handle(ScreenEvent::StartGame),
            (Screen::Playing, ScreenEffect::StartGame)
        );
    }

    #[test]
    fn loading_tip_follows_progress() {
        let mut loading = LoadingScreen::default();
        assert_eq!(loading.tip(), LOADING_TIPS[0]);
        assert!(!loading.advance(45.0));
        assert_eq!(loading.tip(), LOADING_TIPS[2]);
        assert!(!loading.advance(-10.0));
        assert!(loading.advance(70.0));
        assert_eq!(loading.progress(), 100.0);
        assert_eq!(loading.tip(), LOADING_TIPS[4]);
        assert!(!loading.advance(5.0));
    }
}
