//! Drawing surface the menu renders onto.

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FontSize {
    #[default]
    Small,
    Medium,
    Large,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
}

/// Immediate-mode display surface.
///
/// Drawing goes to an off-screen frame; nothing reaches the panel until
/// [`MenuDisplay::flush`]. The menu flushes exactly once per poll.
pub trait MenuDisplay {
    fn clear(&mut self);
    fn set_font(&mut self, font: FontSize);
    fn set_text_alignment(&mut self, alignment: TextAlignment);

    /// Draws `text` with its top edge at `y`. `x` is the left edge or the
    /// center depending on the current alignment.
    fn draw_text(&mut self, x: i32, y: i32, text: &str);

    fn draw_horizontal_line(&mut self, x: i32, y: i32, length: u32);

    /// Pushes the finished frame to the panel.
    fn flush(&mut self);

    fn width(&self) -> u32;
    fn height(&self) -> u32;
}
