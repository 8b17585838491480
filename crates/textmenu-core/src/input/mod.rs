//! Input abstraction layer.

mod mock;

pub use mock::ScriptedButton;

use crate::error::MenuError;

/// Logical button roles consumed by the menu.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonRole {
    Up = 0,
    Down = 1,
    Enter = 2,
    Back = 3,
}

impl ButtonRole {
    pub const COUNT: usize = 4;
    pub const ALL: [Self; Self::COUNT] = [Self::Up, Self::Down, Self::Enter, Self::Back];

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for ButtonRole {
    type Error = MenuError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Up),
            1 => Ok(Self::Down),
            2 => Ok(Self::Enter),
            3 => Ok(Self::Back),
            _ => Err(MenuError::InvalidButtonRole(value)),
        }
    }
}

/// Debounced push button polled by the menu.
pub trait MenuButton {
    /// Advances debounce state. Called exactly once per menu poll.
    fn update_state(&mut self);

    /// Whether the last [`MenuButton::update_state`] observed a fresh press.
    fn was_pressed(&self) -> bool;
}
