use core::fmt::Debug;

use embedded_graphics::{
    Drawable,
    draw_target::DrawTarget,
    geometry::{Dimensions, Point},
    mono_font::{
        MonoFont, MonoTextStyle,
        ascii::{FONT_6X10, FONT_8X13, FONT_10X20},
    },
    pixelcolor::BinaryColor,
    primitives::{Line, Primitive, PrimitiveStyle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use log::warn;

use textmenu_core::display::{FontSize, MenuDisplay, TextAlignment};

/// Receives a finished frame and pushes it to the panel.
pub trait FrameSink<T> {
    type Error: Debug;

    fn push_frame(&mut self, frame: &T) -> Result<(), Self::Error>;
}

/// [`MenuDisplay`] over an off-screen `embedded-graphics` target.
///
/// Everything draws into `target`; [`MenuDisplay::flush`] hands it to `sink`.
#[derive(Debug)]
pub struct GraphicsDisplay<T, S> {
    target: T,
    sink: S,
    font: FontSize,
    alignment: TextAlignment,
    inverted: bool,
    flush_failures: u32,
}

impl<T, S> GraphicsDisplay<T, S>
where
    T: DrawTarget<Color = BinaryColor>,
    T::Error: Debug,
    S: FrameSink<T>,
{
    pub fn new(target: T, sink: S) -> Self {
        Self {
            target,
            sink,
            font: FontSize::default(),
            alignment: TextAlignment::default(),
            inverted: false,
            flush_failures: 0,
        }
    }

    /// Light text on a dark background.
    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Frames the sink rejected since construction.
    pub fn flush_failures(&self) -> u32 {
        self.flush_failures
    }

    pub fn release(self) -> (T, S) {
        (self.target, self.sink)
    }

    fn foreground(&self) -> BinaryColor {
        if self.inverted {
            BinaryColor::Off
        } else {
            BinaryColor::On
        }
    }
}

impl<T, S> MenuDisplay for GraphicsDisplay<T, S>
where
    T: DrawTarget<Color = BinaryColor>,
    T::Error: Debug,
    S: FrameSink<T>,
{
    fn clear(&mut self) {
        let background = self.foreground().invert();
        if let Err(err) = self.target.clear(background) {
            warn!("graphics: clear failed err={:?}", err);
        }
    }

    fn set_font(&mut self, font: FontSize) {
        self.font = font;
    }

    fn set_text_alignment(&mut self, alignment: TextAlignment) {
        self.alignment = alignment;
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        let character_style = MonoTextStyle::new(mono_font(self.font), self.foreground());
        let alignment = match self.alignment {
            TextAlignment::Left => Alignment::Left,
            TextAlignment::Center => Alignment::Center,
        };
        let text_style = TextStyleBuilder::new()
            .baseline(Baseline::Top)
            .alignment(alignment)
            .build();

        if let Err(err) = Text::with_text_style(text, Point::new(x, y), character_style, text_style)
            .draw(&mut self.target)
        {
            warn!("graphics: text draw failed err={:?}", err);
        }
    }

    fn draw_horizontal_line(&mut self, x: i32, y: i32, length: u32) {
        if length == 0 {
            return;
        }
        let span = i32::try_from(length).unwrap_or(i32::MAX).saturating_sub(1);
        let bounds = self.target.bounding_box();
        let Some(bottom_right) = bounds.bottom_right() else {
            return;
        };
        // Only the on-screen span is rasterized.
        let start = x.max(bounds.top_left.x);
        let end = x.saturating_add(span).min(bottom_right.x);
        if start > end {
            return;
        }
        if let Err(err) = Line::new(Point::new(start, y), Point::new(end, y))
            .into_styled(PrimitiveStyle::with_stroke(self.foreground(), 1))
            .draw(&mut self.target)
        {
            warn!("graphics: line draw failed err={:?}", err);
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.sink.push_frame(&self.target) {
            self.flush_failures = self.flush_failures.saturating_add(1);
            warn!(
                "graphics: frame push failed failures={} err={:?}",
                self.flush_failures, err
            );
        }
    }

    fn width(&self) -> u32 {
        self.target.bounding_box().size.width
    }

    fn height(&self) -> u32 {
        self.target.bounding_box().size.height
    }
}

fn mono_font(font: FontSize) -> &'static MonoFont<'static> {
    match font {
        FontSize::Small => &FONT_6X10,
        FontSize::Medium => &FONT_8X13,
        FontSize::Large => &FONT_10X20,
    }
}

#[cfg(test)]
mod tests {
    use textmenu_core::{
        input::ScriptedButton,
        menu::{ButtonSet, Menu, MenuConfig, PollOutcome},
    };

    use super::*;
    use crate::platform::framebuffer::{FrameBuffer, HEIGHT, WIDTH};

    #[derive(Default)]
    struct CountingSink {
        pushed: u32,
        fail: bool,
        last_corner: Option<bool>,
    }

    impl FrameSink<FrameBuffer> for CountingSink {
        type Error = &'static str;

        fn push_frame(&mut self, frame: &FrameBuffer) -> Result<(), Self::Error> {
            if self.fail {
                return Err("bus down");
            }
            self.pushed += 1;
            self.last_corner = frame.pixel(0, 0);
            Ok(())
        }
    }

    fn surface() -> GraphicsDisplay<FrameBuffer, CountingSink> {
        GraphicsDisplay::new(FrameBuffer::new(), CountingSink::default())
    }

    fn lit_in(fb: &FrameBuffer, xs: core::ops::Range<usize>, ys: core::ops::Range<usize>) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .any(|(x, y)| fb.pixel(x, y) == Some(true))
    }

    #[test]
    fn dimensions_follow_target() {
        let display = surface();
        assert_eq!(display.width(), WIDTH as u32);
        assert_eq!(display.height(), HEIGHT as u32);
    }

    #[test]
    fn left_text_starts_at_x() {
        let mut display = surface();

        display.draw_text(20, 30, "Menu");

        let fb = display.target();
        assert!(lit_in(fb, 20..44, 30..40));
        assert!(!lit_in(fb, 0..20, 0..HEIGHT));
        assert!(!lit_in(fb, 0..WIDTH, 0..30));
    }

    #[test]
    fn centered_text_straddles_x() {
        let mut display = surface();
        display.set_text_alignment(TextAlignment::Center);

        display.draw_text(200, 0, "MMMM");

        let fb = display.target();
        assert!(lit_in(fb, 188..200, 0..10));
        assert!(lit_in(fb, 200..212, 0..10));
        assert!(!lit_in(fb, 0..186, 0..HEIGHT));
        assert!(!lit_in(fb, 214..WIDTH, 0..HEIGHT));
    }

    #[test]
    fn larger_font_covers_more_rows() {
        let mut display = surface();
        display.set_font(FontSize::Large);

        display.draw_text(0, 0, "H");

        assert!(lit_in(display.target(), 0..10, 12..20));
    }

    #[test]
    fn horizontal_line_has_exact_length() {
        let mut display = surface();

        display.draw_horizontal_line(2, 16, 6);
        display.draw_horizontal_line(50, 50, 0);

        let fb = display.target();
        assert_eq!(fb.pixel(1, 16), Some(false));
        assert!((2..8).all(|x| fb.pixel(x, 16) == Some(true)));
        assert_eq!(fb.pixel(8, 16), Some(false));
        assert!(!lit_in(fb, 0..WIDTH, 17..HEIGHT));
    }

    #[test]
    fn oversized_line_is_clipped_to_frame() {
        let mut display = surface();

        display.draw_horizontal_line(390, 5, u32::MAX);
        display.draw_horizontal_line(i32::MAX - 2, 7, 10);
        display.draw_horizontal_line(i32::MIN, 8, u32::MAX);

        let fb = display.target();
        assert_eq!(fb.pixel(389, 5), Some(false));
        assert!((390..WIDTH).all(|x| fb.pixel(x, 5) == Some(true)));
        // From i32::MIN the full span still ends left of the frame.
        assert!(!lit_in(fb, 0..WIDTH, 6..HEIGHT));
    }

    #[test]
    fn inverted_clear_fills_frame() {
        let mut display = surface().with_inverted(true);

        display.clear();
        display.draw_horizontal_line(0, 0, 4);
        display.flush();

        let fb = display.target();
        assert_eq!(fb.pixel(0, 0), Some(false));
        assert_eq!(fb.pixel(10, 10), Some(true));
        assert_eq!(display.sink().last_corner, Some(false));
    }

    #[test]
    fn failed_pushes_are_counted() {
        let mut display = surface();

        display.flush();
        display.sink_mut().fail = true;
        display.flush();
        display.flush();

        assert_eq!(display.sink().pushed, 1);
        assert_eq!(display.flush_failures(), 2);
    }

    #[test]
    fn menu_poll_renders_into_frame() {
        let mut menu: Menu<'_, ScriptedButton> = Menu::new(MenuConfig::default());
        let buttons = ButtonSet {
            up: menu.add_button(ScriptedButton::new()).unwrap(),
            down: menu.add_button(ScriptedButton::new()).unwrap(),
            enter: menu.add_button(ScriptedButton::new()).unwrap(),
            back: menu.add_button(ScriptedButton::new()).unwrap(),
        };
        let root = menu.create_root("Main", buttons).unwrap();
        menu.create_child(root, "Settings").unwrap();
        menu.create_child(root, "About").unwrap();
        let mut display = surface();

        menu.button_mut(buttons.down).unwrap().press();
        let outcome = menu.poll(root, &mut display).unwrap();

        assert_eq!(outcome, PollOutcome::MenuDrawn(root));
        assert_eq!(display.sink().pushed, 1);
        let fb = display.target();
        // Header centred, rows at y=11 and y=22, marker beside the second row.
        assert!(lit_in(fb, 180..220, 0..10));
        assert!(lit_in(fb, 10..60, 11..21));
        assert!(lit_in(fb, 10..60, 22..32));
        assert!((2..8).all(|x| fb.pixel(x, 27) == Some(true)));
        assert_eq!(fb.pixel(4, 16), Some(false));
    }
}
