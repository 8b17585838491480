#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::{cell::Cell, fmt::Write as _};

use embassy_executor::Spawner;
use embassy_time::Timer;
use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    spi::master::Spi,
    time::Rate,
    timer::timg::TimerGroup,
};
use heapless::String;
use log::{LevelFilter, error, info, warn};
use textmenu_core::{
    action::{ActionStatus, LeafAction, MenuOverlay},
    display::{FontSize, MenuDisplay, TextAlignment},
    input::ButtonRole,
    menu::{ButtonSet, Menu, MenuConfig, NodeId},
    MenuError,
};
use textmenu_hal::{
    input::{ButtonConfig, DebouncedButton},
    platform::{FrameBuffer, SharpDisplay},
    render::GraphicsDisplay,
};

const DISPLAY_SPI_HZ: u32 = 1_000_000;
const POLL_INTERVAL_MS: u64 = 20;
const BUTTON_DEBOUNCE_POLLS: u8 = 2;
const TEST_PATTERN_POLLS: u8 = 50;
const ABOUT_POLLS: u8 = 100;
const TITLE: &str = "Textmenu";

type Button = DebouncedButton<Input<'static>>;

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Counts ENTER presses on its entry.
struct Counter {
    presses: Cell<u32>,
}

impl LeafAction for Counter {
    fn run(&self, _display: &mut dyn MenuDisplay) -> ActionStatus {
        self.presses.set(self.presses.get().wrapping_add(1));
        info!("demo: counter presses={}", self.presses.get());
        ActionStatus::Done
    }
}

struct ResetCounter<'c> {
    counter: &'c Counter,
}

impl LeafAction for ResetCounter<'_> {
    fn run(&self, _display: &mut dyn MenuDisplay) -> ActionStatus {
        self.counter.presses.set(0);
        info!("demo: counter reset");
        ActionStatus::Done
    }
}

/// Full-screen page that keeps the frame for a fixed number of polls.
struct HoldScreen {
    title: &'static str,
    hold_polls: u8,
    remaining: Cell<u8>,
    stripes: bool,
}

impl HoldScreen {
    const fn new(title: &'static str, hold_polls: u8, stripes: bool) -> Self {
        Self {
            title,
            hold_polls,
            remaining: Cell::new(0),
            stripes,
        }
    }
}

impl LeafAction for HoldScreen {
    fn run(&self, display: &mut dyn MenuDisplay) -> ActionStatus {
        if self.remaining.get() == 0 {
            self.remaining.set(self.hold_polls.max(1));
        }

        let width = display.width();
        let height = display.height();
        display.clear();
        if self.stripes {
            for y in (0..height as i32).step_by(8) {
                display.draw_horizontal_line(0, y, width);
            }
        }
        display.set_font(FontSize::Large);
        display.set_text_alignment(TextAlignment::Center);
        display.draw_text((width / 2) as i32, (height / 2) as i32 - 10, self.title);

        let remaining = self.remaining.get() - 1;
        self.remaining.set(remaining);
        ActionStatus::from(remaining > 0)
    }
}

/// Footer showing the counter on every menu page.
struct StatusOverlay<'c> {
    counter: &'c Counter,
}

impl MenuOverlay for StatusOverlay<'_> {
    fn draw(&self, display: &mut dyn MenuDisplay) {
        let mut line: String<24> = String::new();
        let _ = write!(line, "presses {}", self.counter.presses.get());

        let height = display.height() as i32;
        display.draw_horizontal_line(0, height - 13, display.width());
        display.set_font(FontSize::Small);
        display.set_text_alignment(TextAlignment::Left);
        display.draw_text(2, height - 11, &line);
    }
}

struct Demo<'c> {
    counter: &'c Counter,
    reset: ResetCounter<'c>,
    test_pattern: HoldScreen,
    about: HoldScreen,
    status: StatusOverlay<'c>,
}

fn build_menu<'a>(
    menu: &mut Menu<'a, Button>,
    buttons: [Button; ButtonRole::COUNT],
    demo: &'a Demo<'a>,
) -> Result<NodeId, MenuError> {
    let [up, down, enter, back] = buttons;
    let buttons = ButtonSet {
        up: menu.add_button(up)?,
        down: menu.add_button(down)?,
        enter: menu.add_button(enter)?,
        back: menu.add_button(back)?,
    };

    let root = menu.create_root(TITLE, buttons)?;
    menu.add_leaf_entry(root, "Count", demo.counter)?;
    let settings = menu.create_child(root, "Settings")?;
    menu.add_leaf_entry(settings, "Reset count", &demo.reset)?;
    let panel = menu.create_child(settings, "Display")?;
    menu.add_leaf_entry(panel, "Test pattern", &demo.test_pattern)?;
    menu.add_leaf_entry(root, "About", &demo.about)?;
    menu.set_overlay(root, Some(&demo.status))?;
    Ok(root)
}

#[allow(
    clippy::large_stack_frames,
    reason = "the frame buffer lives on main's stack for the whole run"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: textmenu starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Display wiring:
    // CLK=GPIO13, DI=GPIO14, CS=GPIO15, DISP=GPIO2, EMD=GPIO9
    let disp = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    let emd = Output::new(peripherals.GPIO9, Level::Low, OutputConfig::default());
    let cs = Output::new(peripherals.GPIO15, Level::Low, OutputConfig::default());

    let spi_config = esp_hal::spi::master::Config::default()
        .with_frequency(Rate::from_hz(DISPLAY_SPI_HZ))
        // LS027B7DH01 uses CPOL=0, CPHA=1.
        .with_mode(esp_hal::spi::Mode::_1);

    let spi = Spi::new(peripherals.SPI2, spi_config)
        .unwrap()
        .with_sck(peripherals.GPIO13)
        .with_mosi(peripherals.GPIO14);

    let mut panel = SharpDisplay::new(spi, disp, emd, cs, Delay::new());
    if let Err(err) = panel.initialize() {
        warn!("display: initialize failed err={:?}", err);
    }
    if let Err(err) = panel.clear_all() {
        warn!("display: clear failed err={:?}", err);
    }
    let mut display = GraphicsDisplay::new(FrameBuffer::new(), panel);

    // Button wiring, active low with pull-ups:
    // UP=GPIO10, DOWN=GPIO11, ENTER=GPIO12, BACK=GPIO16
    let input_cfg = InputConfig::default().with_pull(Pull::Up);
    let button_cfg = ButtonConfig::default().with_debounce_polls(BUTTON_DEBOUNCE_POLLS);
    let buttons = [
        DebouncedButton::new(Input::new(peripherals.GPIO10, input_cfg), button_cfg),
        DebouncedButton::new(Input::new(peripherals.GPIO11, input_cfg), button_cfg),
        DebouncedButton::new(Input::new(peripherals.GPIO12, input_cfg), button_cfg),
        DebouncedButton::new(Input::new(peripherals.GPIO16, input_cfg), button_cfg),
    ];

    let counter = Counter {
        presses: Cell::new(0),
    };
    let demo = Demo {
        counter: &counter,
        reset: ResetCounter { counter: &counter },
        test_pattern: HoldScreen::new("Pattern", TEST_PATTERN_POLLS, true),
        about: HoldScreen::new(TITLE, ABOUT_POLLS, false),
        status: StatusOverlay { counter: &counter },
    };

    let mut menu = Menu::new(MenuConfig::default().with_line_height(12));
    let root = match build_menu(&mut menu, buttons, &demo) {
        Ok(root) => root,
        Err(err) => {
            error!("menu: build failed err={:?}", err);
            loop {
                Timer::after_secs(1).await;
            }
        }
    };
    info!("menu: ready root={:?}", root);

    let mut last_outcome = None;
    loop {
        match menu.poll(root, &mut display) {
            Ok(outcome) => {
                if last_outcome != Some(outcome) {
                    info!("menu: {:?}", outcome);
                    last_outcome = Some(outcome);
                }
            }
            Err(err) => warn!("menu: poll failed err={:?}", err),
        }
        Timer::after_millis(POLL_INTERVAL_MS).await;
    }
}
