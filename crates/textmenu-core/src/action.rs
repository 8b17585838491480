//! Callables hung off menu entries: leaf actions and per-frame overlays.

use crate::display::MenuDisplay;

/// What a leaf action wants after one invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionStatus {
    /// Keep calling me every poll; the menu list is not drawn.
    Continue,
    /// Finished; the menu list is drawn again this same poll.
    Done,
}

impl From<bool> for ActionStatus {
    fn from(keep_running: bool) -> Self {
        if keep_running {
            Self::Continue
        } else {
            Self::Done
        }
    }
}

/// Task started by pressing ENTER on a leaf entry.
///
/// Actions are borrowed by the menu for its whole lifetime, so any state they
/// carry lives behind interior mutability. While an action returns
/// [`ActionStatus::Continue`] it owns the frame: the menu skips its own button
/// handling and only flushes what the action drew.
pub trait LeafAction {
    fn run(&self, display: &mut dyn MenuDisplay) -> ActionStatus;
}

impl<F> LeafAction for F
where
    F: Fn(&mut dyn MenuDisplay) -> ActionStatus,
{
    fn run(&self, display: &mut dyn MenuDisplay) -> ActionStatus {
        self(display)
    }
}

/// Draw hook invoked after the frame is cleared and before the menu list.
pub trait MenuOverlay {
    fn draw(&self, display: &mut dyn MenuDisplay);
}

impl<F> MenuOverlay for F
where
    F: Fn(&mut dyn MenuDisplay),
{
    fn draw(&self, display: &mut dyn MenuDisplay) {
        self(display)
    }
}
