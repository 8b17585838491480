//! Menu tree arena and the per-poll navigation state machine.

use core::cmp;

use heapless::{String, Vec};
use log::{debug, warn};

use crate::{
    action::{ActionStatus, LeafAction, MenuOverlay},
    display::{FontSize, MenuDisplay, TextAlignment},
    error::MenuError,
    input::{ButtonRole, MenuButton},
};

pub const MAX_MENU_ENTRIES: usize = 10;
pub const MAX_MENU_NODES: usize = 32;
pub const MAX_BUTTONS: usize = 8;
pub const MENU_NAME_BYTES: usize = 32;

const DEFAULT_LINE_HEIGHT: u16 = 11;
const DEFAULT_TEXT_INDENT: i32 = 10;
const DEFAULT_MARKER_X: i32 = 2;
const DEFAULT_MARKER_WIDTH: u32 = 6;

type Label = String<MENU_NAME_BYTES>;

/// Handle to a node stored in a [`Menu`].
///
/// A handle outlives its node only as a dead value: once the node is freed,
/// lookups through it fail even after the slot is reused.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeId {
    index: u8,
    generation: u16,
}

impl NodeId {
    const fn index(self) -> usize {
        self.index as usize
    }
}

/// Handle to a button stored in a [`Menu`]. Goes stale the same way as
/// [`NodeId`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ButtonId {
    index: u8,
    generation: u16,
}

impl ButtonId {
    const fn index(self) -> usize {
        self.index as usize
    }
}

/// How a node holds the button bound to one of its roles.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonBinding {
    /// Created by this node; destroyed with it or when replaced.
    Owned(ButtonId),
    /// Supplied from outside or inherited from the parent.
    Borrowed(ButtonId),
}

impl ButtonBinding {
    pub const fn id(self) -> ButtonId {
        match self {
            Self::Owned(id) | Self::Borrowed(id) => id,
        }
    }
}

/// The four buttons a root menu is built from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ButtonSet {
    pub up: ButtonId,
    pub down: ButtonId,
    pub enter: ButtonId,
    pub back: ButtonId,
}

impl ButtonSet {
    fn bindings(self) -> [Option<ButtonBinding>; ButtonRole::COUNT] {
        [
            Some(ButtonBinding::Borrowed(self.up)),
            Some(ButtonBinding::Borrowed(self.down)),
            Some(ButtonBinding::Borrowed(self.enter)),
            Some(ButtonBinding::Borrowed(self.back)),
        ]
    }
}

/// Layout defaults applied to every node created by a [`Menu`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MenuConfig {
    line_height: u16,
    header_height: u16,
    font: FontSize,
    text_indent: i32,
    marker_x: i32,
    marker_width: u32,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            line_height: DEFAULT_LINE_HEIGHT,
            header_height: 0,
            font: FontSize::Small,
            text_indent: DEFAULT_TEXT_INDENT,
            marker_x: DEFAULT_MARKER_X,
            marker_width: DEFAULT_MARKER_WIDTH,
        }
    }
}

impl MenuConfig {
    /// Zero is bumped to one pixel.
    pub const fn with_line_height(mut self, line_height: u16) -> Self {
        self.line_height = if line_height == 0 { 1 } else { line_height };
        self
    }

    /// Zero means "same as the line height".
    pub const fn with_header_height(mut self, header_height: u16) -> Self {
        self.header_height = header_height;
        self
    }

    pub const fn with_font(mut self, font: FontSize) -> Self {
        self.font = font;
        self
    }

    pub const fn with_text_indent(mut self, text_indent: i32) -> Self {
        self.text_indent = text_indent;
        self
    }

    pub const fn with_cursor_marker(mut self, marker_x: i32, marker_width: u32) -> Self {
        self.marker_x = marker_x;
        self.marker_width = marker_width;
        self
    }
}

/// Result of one [`Menu::poll`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    /// The active node drew its own list.
    MenuDrawn(NodeId),
    /// Navigation moved the active node; the new one drew its list.
    Redirected(NodeId),
    /// A leaf action on this node kept the frame.
    ActionRunning(NodeId),
}

#[derive(Clone, Copy)]
enum EntryTarget<'a> {
    /// Sub-menu created through this node or adopted by it.
    OwnedMenu(NodeId),
    /// Sub-menu hung here without moving ownership.
    LinkedMenu(NodeId),
    Action(&'a dyn LeafAction),
}

impl EntryTarget<'_> {
    fn sub_menu(self) -> Option<NodeId> {
        match self {
            Self::OwnedMenu(id) | Self::LinkedMenu(id) => Some(id),
            Self::Action(_) => None,
        }
    }
}

#[derive(Clone)]
struct Entry<'a> {
    label: Label,
    target: EntryTarget<'a>,
}

struct MenuNode<'a> {
    name: Label,
    parent: Option<NodeId>,
    active: Option<NodeId>,
    entries: Vec<Entry<'a>, MAX_MENU_ENTRIES>,
    buttons: [Option<ButtonBinding>; ButtonRole::COUNT],
    cursor: usize,
    scroll: usize,
    line_height: u16,
    header_height: u16,
    active_action: Option<&'a dyn LeafAction>,
    overlay: Option<&'a dyn MenuOverlay>,
}

impl MenuNode<'_> {
    fn header_height(&self) -> u16 {
        if self.header_height == 0 {
            self.line_height
        } else {
            self.header_height
        }
    }

    fn visible_lines(&self, display_height: u32) -> usize {
        let body = display_height.saturating_sub(self.header_height() as u32);
        (body / self.line_height.max(1) as u32) as usize
    }
}

struct ButtonSlot<B> {
    device: B,
    owner: Option<NodeId>,
}

/// Arena cell; `generation` moves on every time the value is freed.
struct Slot<T> {
    generation: u16,
    value: Option<T>,
}

impl<T> Slot<T> {
    fn get(&self, generation: u16) -> Option<&T> {
        if self.generation != generation {
            return None;
        }
        self.value.as_ref()
    }

    fn get_mut(&mut self, generation: u16) -> Option<&mut T> {
        if self.generation != generation {
            return None;
        }
        self.value.as_mut()
    }

    fn take(&mut self, generation: u16) -> Option<T> {
        if self.generation != generation {
            return None;
        }
        let value = self.value.take()?;
        self.generation = self.generation.wrapping_add(1);
        Some(value)
    }

    fn is_vacant(&self) -> bool {
        self.value.is_none()
    }
}

/// Arena holding every menu node and every button the menu polls.
///
/// Leaf actions and overlays are borrowed for `'a`; buttons are moved in and
/// either released back to the caller or dropped with their owning node.
pub struct Menu<'a, B> {
    nodes: Vec<Slot<MenuNode<'a>>, MAX_MENU_NODES>,
    buttons: Vec<Slot<ButtonSlot<B>>, MAX_BUTTONS>,
    config: MenuConfig,
}

impl<B> Default for Menu<'_, B>
where
    B: MenuButton,
{
    fn default() -> Self {
        Self::new(MenuConfig::default())
    }
}

include!("tree.rs");
include!("navigation.rs");
include!("view.rs");

fn label_from(name: &str) -> Result<Label, MenuError> {
    Label::try_from(name).map_err(|_| {
        debug!("menu: label rejected name={:?} bytes={}", name, name.len());
        MenuError::NameTooLong
    })
}
