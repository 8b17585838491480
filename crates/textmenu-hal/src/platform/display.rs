//! LS027B7DH01 Sharp memory LCD on a shared SPI bus.

use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiBus};
use log::debug;

use super::framebuffer::{FrameBuffer, HEIGHT, LINE_BYTES};
use crate::render::FrameSink;

const CS_SETUP_NS: u32 = 3_000;
const CS_HOLD_NS: u32 = 1_000;
const CLEAR_HOLD_NS: u32 = 220_000;
const POWER_UP_US: u32 = 60;

const CMD_WRITE: u8 = 0x80;
const CMD_CLEAR: u8 = 0x20;
const VCOM_BIT: u8 = 0x40;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DisplayError<SpiErr, DispErr, EmdErr, CsErr> {
    Spi(SpiErr),
    Disp(DispErr),
    Emd(EmdErr),
    Cs(CsErr),
}

pub type SharpDisplayResult<SpiErr, DispErr, EmdErr, CsErr> =
    Result<(), DisplayError<SpiErr, DispErr, EmdErr, CsErr>>;

/// Gate address for a one-based panel line, LSB first on the wire.
#[inline]
pub fn line_address(line: u16) -> Option<u8> {
    if !(1..=HEIGHT as u16).contains(&line) {
        return None;
    }
    Some((line as u8).reverse_bits())
}

/// Panel driver that owns its bus, control pins and delay source.
///
/// VCOM is toggled through the command byte on every transfer.
#[derive(Debug)]
pub struct SharpDisplay<SPI, DISP, EMD, CS, DELAY> {
    spi: SPI,
    disp: DISP,
    emd: EMD,
    cs: CS,
    delay: DELAY,
    vcom_high: bool,
}

impl<SPI, DISP, EMD, CS, DELAY> SharpDisplay<SPI, DISP, EMD, CS, DELAY>
where
    SPI: SpiBus<u8>,
    DISP: OutputPin,
    EMD: OutputPin,
    CS: OutputPin,
    DELAY: DelayNs,
{
    pub fn new(spi: SPI, disp: DISP, emd: EMD, cs: CS, delay: DELAY) -> Self {
        Self {
            spi,
            disp,
            emd,
            cs,
            delay,
            vcom_high: false,
        }
    }

    /// Puts the panel in serial VCOM mode and enables its output.
    pub fn initialize(
        &mut self,
    ) -> SharpDisplayResult<SPI::Error, DISP::Error, EMD::Error, CS::Error> {
        self.disp.set_high().map_err(DisplayError::Disp)?;
        self.emd.set_low().map_err(DisplayError::Emd)?;
        self.cs.set_low().map_err(DisplayError::Cs)?;

        self.delay.delay_us(POWER_UP_US);
        debug!("sharp: initialized");
        Ok(())
    }

    /// All-clear command.
    pub fn clear_all(
        &mut self,
    ) -> SharpDisplayResult<SPI::Error, DISP::Error, EMD::Error, CS::Error> {
        let command = CMD_CLEAR | self.next_vcom();

        self.cs.set_high().map_err(DisplayError::Cs)?;
        self.delay.delay_ns(CS_SETUP_NS);

        self.spi
            .write(&[command, 0x00, 0x00])
            .map_err(DisplayError::Spi)?;
        self.spi.flush().map_err(DisplayError::Spi)?;

        self.delay.delay_ns(CLEAR_HOLD_NS);
        self.cs.set_low().map_err(DisplayError::Cs)
    }

    /// Writes every line of `frame` in one chip-select window.
    pub fn flush_frame(
        &mut self,
        frame: &FrameBuffer,
    ) -> SharpDisplayResult<SPI::Error, DISP::Error, EMD::Error, CS::Error> {
        let command = CMD_WRITE | self.next_vcom();

        self.cs.set_high().map_err(DisplayError::Cs)?;
        self.delay.delay_ns(CS_SETUP_NS);

        self.spi.write(&[command]).map_err(DisplayError::Spi)?;

        // [address][line bytes][dummy]
        let mut packet = [0u8; LINE_BYTES + 2];
        for line in 1..=HEIGHT as u16 {
            let row = usize::from(line - 1);
            let (Some(address), Some(pixels)) = (line_address(line), frame.row(row)) else {
                continue;
            };
            packet[0] = address;
            packet[1..1 + LINE_BYTES].copy_from_slice(pixels);
            self.spi.write(&packet).map_err(DisplayError::Spi)?;
        }

        // Frame trailer.
        self.spi.write(&[0x00]).map_err(DisplayError::Spi)?;
        self.spi.flush().map_err(DisplayError::Spi)?;

        self.delay.delay_ns(CS_HOLD_NS);
        self.cs.set_low().map_err(DisplayError::Cs)
    }

    pub fn release(self) -> (SPI, DISP, EMD, CS, DELAY) {
        (self.spi, self.disp, self.emd, self.cs, self.delay)
    }

    fn next_vcom(&mut self) -> u8 {
        self.vcom_high = !self.vcom_high;
        if self.vcom_high { VCOM_BIT } else { 0x00 }
    }
}

impl<SPI, DISP, EMD, CS, DELAY> FrameSink<FrameBuffer> for SharpDisplay<SPI, DISP, EMD, CS, DELAY>
where
    SPI: SpiBus<u8>,
    DISP: OutputPin,
    EMD: OutputPin,
    CS: OutputPin,
    DELAY: DelayNs,
{
    type Error = DisplayError<SPI::Error, DISP::Error, EMD::Error, CS::Error>;

    fn push_frame(&mut self, frame: &FrameBuffer) -> Result<(), Self::Error> {
        self.flush_frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, vec::Vec};

    use embedded_hal::{digital::ErrorType as PinErrorType, spi::ErrorType as SpiErrorType};

    use super::*;
    use crate::platform::framebuffer::WIDTH;

    #[derive(Clone, Debug, Eq, PartialEq)]
    enum Event {
        Cs(bool),
        Write(Vec<u8>),
        Flush,
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct FakeSpi(Log);

    impl SpiErrorType for FakeSpi {
        type Error = core::convert::Infallible;
    }

    impl SpiBus<u8> for FakeSpi {
        fn read(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(Event::Write(words.to_vec()));
            Ok(())
        }

        fn transfer(&mut self, _read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
            self.write(write)
        }

        fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(Event::Flush);
            Ok(())
        }
    }

    /// Records level changes only when `log` is set.
    struct FakePin {
        log: Option<Log>,
        high: bool,
    }

    impl PinErrorType for FakePin {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            if let Some(log) = &self.log {
                log.borrow_mut().push(Event::Cs(false));
            }
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            if let Some(log) = &self.log {
                log.borrow_mut().push(Event::Cs(true));
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn display(log: &Log) -> SharpDisplay<FakeSpi, FakePin, FakePin, FakePin, NoDelay> {
        let pin = || FakePin {
            log: None,
            high: false,
        };
        SharpDisplay::new(
            FakeSpi(log.clone()),
            pin(),
            pin(),
            FakePin {
                log: Some(log.clone()),
                high: true,
            },
            NoDelay,
        )
    }

    #[test]
    fn line_address_is_bit_reversed() {
        assert_eq!(line_address(1), Some(0x80));
        assert_eq!(line_address(2), Some(0x40));
        assert_eq!(line_address(3), Some(0xC0));
        assert_eq!(line_address(240), Some(0x0F));
        assert_eq!(line_address(0), None);
        assert_eq!(line_address(241), None);
    }

    #[test]
    fn initialize_enables_panel_and_drops_cs() {
        let log: Log = Rc::default();
        let mut display = display(&log);

        display.initialize().unwrap();

        let (_, disp, emd, cs, _) = display.release();
        assert!(disp.high);
        assert!(!emd.high);
        assert!(!cs.high);
    }

    #[test]
    fn frame_push_writes_command_every_line_and_trailer() {
        let log: Log = Rc::default();
        let mut display = display(&log);
        let mut frame = FrameBuffer::new();
        frame.set_pixel(0, 0, true);
        frame.set_pixel(WIDTH - 1, HEIGHT - 1, true);

        display.push_frame(&frame).unwrap();

        let events = log.borrow();
        assert_eq!(events.first(), Some(&Event::Cs(true)));
        assert_eq!(events[1], Event::Write(vec![CMD_WRITE | VCOM_BIT]));

        let lines: Vec<&Vec<u8>> = events
            .iter()
            .filter_map(|event| match event {
                Event::Write(bytes) if bytes.len() == LINE_BYTES + 2 => Some(bytes),
                _ => None,
            })
            .collect();
        assert_eq!(lines.len(), HEIGHT);
        assert_eq!(lines[0][0], 0x80);
        assert_eq!(lines[0][1], 0b1000_0000);
        assert_eq!(lines[HEIGHT - 1][0], 0x0F);
        assert_eq!(lines[HEIGHT - 1][LINE_BYTES], 0b0000_0001);
        assert!(lines.iter().all(|line| line[LINE_BYTES + 1] == 0));

        let tail = &events[events.len() - 3..];
        assert_eq!(
            tail,
            [Event::Write(vec![0x00]), Event::Flush, Event::Cs(false)]
        );
    }

    #[test]
    fn vcom_alternates_between_transfers() {
        let log: Log = Rc::default();
        let mut display = display(&log);
        let frame = FrameBuffer::new();

        display.push_frame(&frame).unwrap();
        display.clear_all().unwrap();
        display.push_frame(&frame).unwrap();

        let commands: Vec<u8> = log
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Write(bytes) if bytes.len() == 1 && bytes[0] != 0 => Some(bytes[0]),
                Event::Write(bytes) if bytes.len() == 3 => Some(bytes[0]),
                _ => None,
            })
            .collect();
        assert_eq!(commands, [CMD_WRITE | VCOM_BIT, CMD_CLEAR, CMD_WRITE | VCOM_BIT]);
    }
}
