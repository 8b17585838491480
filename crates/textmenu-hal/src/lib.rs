#![cfg_attr(not(test), no_std)]

//! Board adapters for `textmenu-core`: debounced push buttons over
//! `embedded-hal` pins and an `embedded-graphics` menu surface that pushes
//! finished frames to a Sharp memory LCD.

pub mod input;
pub mod platform;
pub mod render;
