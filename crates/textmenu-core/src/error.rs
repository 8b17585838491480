//! Usage errors reported by the menu arena.

/// Errors returned by [`crate::menu::Menu`] operations.
///
/// All of these are contract violations by the caller; none are transient.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MenuError {
    /// The node already holds `MAX_MENU_ENTRIES` entries.
    EntriesFull,
    /// Every node slot in the arena is in use.
    NodesFull,
    /// Every button slot in the arena is in use.
    ButtonsFull,
    /// A raw role index outside `UP..=BACK`.
    InvalidButtonRole(u8),
    /// The handle does not name a live node.
    UnknownNode,
    /// The handle does not name a live button.
    UnknownButton,
    /// The node is a root.
    NoParent,
    /// No active node has been recorded for this tree.
    NoActiveNode,
    /// The node already hangs under a parent; detach it first.
    AlreadyParented,
    /// The link would make a node reachable from itself.
    WouldCycle,
    /// Line height must be at least one pixel.
    InvalidLineHeight,
    /// The button belongs to a node and cannot be released by the caller.
    ButtonOwned,
    /// The two nodes hang in different trees.
    ForeignNode,
    /// The name does not fit in `MENU_NAME_BYTES`.
    NameTooLong,
}
