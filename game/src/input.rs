//! Keyboard bindings. Movement keys are held (one step per frame while down); the other
//! bindings fire once on press.

use serde::{Deserialize, Serialize};

use crate::world::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCommand {
    Move(Direction),
    Interact,
    TogglePause,
    Hint,
}

/// Maps a DOM-style key name (`"w"`, `"ArrowUp"`, `" "`, `"Escape"`) to a command.
pub fn key_command(key: &str) -> Option<KeyCommand> {
    let command = match key {
        "w" | "W" | "ArrowUp" => KeyCommand::Move(Direction::Forward),
        "s" | "S" | "ArrowDown" => KeyCommand::Move(Direction::Backward),
        "a" | "A" | "ArrowLeft" => KeyCommand::Move(Direction::Left),
        "d" | "D" | "ArrowRight" => KeyCommand::Move(Direction::Right),
        " " | "Space" | "Spacebar" => KeyCommand::Interact,
        "p" | "P" | "Escape" => KeyCommand::TogglePause,
        "h" | "H" => KeyCommand::Hint,
        _ => return None,
    };
    Some(command)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldKeys {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldKeys {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn slot(&mut self, direction: Direction) -> &mut bool {
        match direction {
            Direction::Forward => &mut self.forward,
            Direction::Backward => &mut self.backward,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        }
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.forward,
            Direction::Backward => self.backward,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    /// Records a press. Returns the one-shot command for non-movement keys; OS key-repeat
    /// presses of an already held movement key are swallowed.
    pub fn on_key_down(&mut self, key: &str) -> Option<KeyCommand> {
        match key_command(key)? {
            KeyCommand::Move(direction) => {
                *self.slot(direction) = true;
                None
            }
            other => Some(other),
        }
    }

    pub fn on_key_up(&mut self, key: &str) {
        if let Some(KeyCommand::Move(direction)) = key_command(key) {
            *self.slot(direction) = false;
        }
    }

    /// Directions to apply this frame, in a fixed order.
    pub fn directions(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL.into_iter().filter(|d| self.is_held(*d))
    }
}
