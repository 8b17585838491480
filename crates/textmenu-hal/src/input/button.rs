use embedded_hal::digital::InputPin;
use log::warn;

use textmenu_core::input::MenuButton;

#[derive(Debug, Clone, Copy)]
pub struct ButtonConfig {
    active_low: bool,
    debounce_polls: u8,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            active_low: true,
            debounce_polls: 3,
        }
    }
}

impl ButtonConfig {
    pub const fn with_active_low(mut self, active_low: bool) -> Self {
        self.active_low = active_low;
        self
    }

    /// Consecutive identical reads required before a level change is accepted.
    /// Zero behaves as one.
    pub const fn with_debounce_polls(mut self, debounce_polls: u8) -> Self {
        self.debounce_polls = debounce_polls;
        self
    }
}

/// Push button on a GPIO, debounced by counting stable reads across polls.
///
/// A failing pin reads as released; the first failure is logged.
#[derive(Debug)]
pub struct DebouncedButton<P> {
    pin: P,
    config: ButtonConfig,
    raw: bool,
    stable: bool,
    stable_count: u8,
    pressed_edge: bool,
    fault_logged: bool,
}

impl<P> DebouncedButton<P>
where
    P: InputPin,
{
    pub fn new(pin: P, config: ButtonConfig) -> Self {
        let mut button = Self {
            pin,
            config,
            raw: false,
            stable: false,
            stable_count: 0,
            pressed_edge: false,
            fault_logged: false,
        };
        let pressed = button.read_pressed();
        button.raw = pressed;
        button.stable = pressed;
        button
    }

    /// Current debounced level.
    pub fn is_held(&self) -> bool {
        self.stable
    }

    pub fn release(self) -> P {
        self.pin
    }

    fn read_pressed(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => pressed_from_level(high, self.config.active_low),
            Err(err) => {
                if !self.fault_logged {
                    warn!("button: pin read failed err={:?}", err);
                    self.fault_logged = true;
                }
                false
            }
        }
    }
}

impl<P> MenuButton for DebouncedButton<P>
where
    P: InputPin,
{
    fn update_state(&mut self) {
        self.pressed_edge = false;
        let pressed = self.read_pressed();

        if pressed == self.raw {
            self.stable_count = self.stable_count.saturating_add(1);
        } else {
            self.raw = pressed;
            self.stable_count = 0;
        }

        let threshold = self.config.debounce_polls.max(1);
        if self.stable_count >= threshold && self.stable != self.raw {
            self.stable = self.raw;
            self.pressed_edge = self.stable;
        }
    }

    fn was_pressed(&self) -> bool {
        self.pressed_edge
    }
}

#[inline]
fn pressed_from_level(high: bool, active_low: bool) -> bool {
    if active_low { !high } else { high }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, vec::Vec};

    use embedded_hal::digital::{ErrorKind, ErrorType};

    use super::*;

    struct ScriptedPin {
        levels: VecDeque<Result<bool, ErrorKind>>,
        last: bool,
    }

    impl ScriptedPin {
        fn new(levels: impl IntoIterator<Item = Result<bool, ErrorKind>>) -> Self {
            Self {
                levels: levels.into_iter().collect(),
                last: true,
            }
        }
    }

    impl ErrorType for ScriptedPin {
        type Error = ErrorKind;
    }

    impl InputPin for ScriptedPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            match self.levels.pop_front() {
                Some(Ok(level)) => {
                    self.last = level;
                    Ok(level)
                }
                Some(Err(err)) => Err(err),
                None => Ok(self.last),
            }
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.is_high().map(|high| !high)
        }
    }

    fn edges(button: &mut DebouncedButton<ScriptedPin>, polls: usize) -> Vec<bool> {
        (0..polls)
            .map(|_| {
                button.update_state();
                button.was_pressed()
            })
            .collect()
    }

    #[test]
    fn held_press_yields_one_edge() {
        // Idle high, then held low (active-low wiring).
        let levels = [Ok(true)]
            .into_iter()
            .chain(core::iter::repeat_n(Ok(false), 8));
        let mut button = DebouncedButton::new(ScriptedPin::new(levels), ButtonConfig::default());

        let seen = edges(&mut button, 8);

        assert_eq!(seen.iter().filter(|edge| **edge).count(), 1);
        assert!(seen[3]);
        assert!(button.is_held());
    }

    #[test]
    fn bounce_shorter_than_threshold_is_ignored() {
        let levels = [Ok(true), Ok(false), Ok(true), Ok(false), Ok(true), Ok(true)];
        let mut button = DebouncedButton::new(ScriptedPin::new(levels), ButtonConfig::default());

        let seen = edges(&mut button, 8);

        assert!(seen.iter().all(|edge| !edge));
        assert!(!button.is_held());
    }

    #[test]
    fn release_and_second_press_yield_second_edge() {
        let config = ButtonConfig::default().with_debounce_polls(1);
        let levels = [Ok(true), Ok(false), Ok(false), Ok(true), Ok(true), Ok(false), Ok(false)];
        let mut button = DebouncedButton::new(ScriptedPin::new(levels), config);

        let seen = edges(&mut button, 6);

        assert_eq!(seen, [false, true, false, false, false, true]);
    }

    #[test]
    fn active_high_wiring_is_supported() {
        let config = ButtonConfig::default()
            .with_active_low(false)
            .with_debounce_polls(0);
        let levels = [Ok(false), Ok(true), Ok(true)];
        let mut button = DebouncedButton::new(ScriptedPin::new(levels), config);

        assert_eq!(edges(&mut button, 2), [false, true]);
    }

    #[test]
    fn pin_fault_reads_as_released() {
        let config = ButtonConfig::default().with_debounce_polls(1);
        let levels = [
            Ok(true),
            Err(ErrorKind::Other),
            Err(ErrorKind::Other),
            Ok(false),
            Ok(false),
        ];
        let mut button = DebouncedButton::new(ScriptedPin::new(levels), config);

        assert_eq!(edges(&mut button, 4), [false, false, false, true]);
        assert!(button.fault_logged);
    }
}
