use super::MenuButton;

/// Software button used during bring-up and in tests.
///
/// A queued press turns into a single edge on the next update.
#[derive(Default, Debug, Clone, Copy)]
pub struct ScriptedButton {
    queued: bool,
    edge: bool,
    updates: u32,
}

impl ScriptedButton {
    pub const fn new() -> Self {
        Self {
            queued: false,
            edge: false,
            updates: 0,
        }
    }

    /// Queues one press for the next poll.
    pub fn press(&mut self) {
        self.queued = true;
    }

    /// Number of debounce updates seen so far.
    pub fn updates(&self) -> u32 {
        self.updates
    }
}

impl MenuButton for ScriptedButton {
    fn update_state(&mut self) {
        self.updates = self.updates.saturating_add(1);
        self.edge = core::mem::take(&mut self.queued);
    }

    fn was_pressed(&self) -> bool {
        self.edge
    }
}
