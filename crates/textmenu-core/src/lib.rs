#![cfg_attr(not(test), no_std)]

//! Four-button hierarchical text menu for small embedded displays.
//!
//! The whole tree lives in a [`menu::Menu`] arena. Board code supplies buttons
//! through [`input::MenuButton`] and a drawing surface through
//! [`display::MenuDisplay`], then calls [`menu::Menu::poll`] once per loop
//! iteration.

pub mod action;
pub mod display;
pub mod error;
pub mod input;
pub mod menu;

pub use error::MenuError;
