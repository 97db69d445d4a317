use std::thread::sleep;
use std::time::Duration;

use rppal::i2c::I2c;

type Result<T = ()> = std::result::Result<T, rppal::i2c::Error>;

/// HD44780 16x2 character display behind an FC-113 (PCF8574) I2C backpack.
///
/// The expander wires the controller in 4-bit mode, so every byte is sent as
/// two nibbles with an enable strobe each.
#[derive(Debug)]
pub struct Fc113 {
  bus: I2c,
  backlight: bool,
}

// HD44780 instruction set.
const CLEAR_DISPLAY: u8 = 0x01;
const ENTRY_MODE_SET: u8 = 0x04;
const DISPLAY_CONTROL: u8 = 0x08;
const FUNCTION_SET: u8 = 0x20;
const SET_CGRAM_ADDR: u8 = 0x40;
const SET_DDRAM_ADDR: u8 = 0x80;

const ENTRY_LEFT: u8 = 0x02;
const DISPLAY_ON: u8 = 0x04;
const TWO_ROWS: u8 = 0x08;

// Expander bit assignments.
const REGISTER_SELECT: u8 = 0b0000_0001;
const ENABLE: u8 = 0b0000_0100;
const BACKLIGHT: u8 = 0b0000_1000;

const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

impl Fc113 {
  pub const ADDR: u16 = 0x27;
  pub const WIDTH: usize = 16;
  pub const ROWS: usize = 2;

  pub fn new(bus: I2c) -> Result<Fc113> {
    let mut lcd = Fc113 { bus, backlight: true };
    lcd.init()?;
    Ok(lcd)
  }

  // Power-on reset sequence from the HD44780 datasheet: three 8-bit function
  // sets with mandatory delays, then the switch to 4-bit mode.
  fn init(&mut self) -> Result {
    self.bus.set_slave_address(Self::ADDR)?;

    sleep(Duration::from_millis(50));
    self.expander_write(0)?;
    sleep(Duration::from_millis(1000));

    for _ in 0..3 {
      self.write_nibble(0x03 << 4)?;
      sleep(Duration::from_micros(4500));
    }
    self.write_nibble(0x02 << 4)?;

    self.command(FUNCTION_SET | TWO_ROWS)?;
    self.command(DISPLAY_CONTROL | DISPLAY_ON)?;
    self.clear()?;
    self.command(ENTRY_MODE_SET | ENTRY_LEFT)
  }

  pub fn clear(&mut self) -> Result {
    self.command(CLEAR_DISPLAY)?;
    sleep(Duration::from_micros(2000));
    Ok(())
  }

  pub fn set_cursor(&mut self, col: usize, row: usize) -> Result {
    assert!(col < Self::WIDTH && row < Self::ROWS);
    self.command(SET_DDRAM_ADDR | (ROW_OFFSETS[row] + col as u8))
  }

  /// Prints ASCII text at the current cursor position.
  pub fn print(&mut self, text: &str) -> Result {
    for byte in text.bytes() {
      self.data(byte)?;
    }
    Ok(())
  }

  /// Writes a single character cell by glyph code. Codes 0 to 7 address the
  /// CGRAM slots filled via [`Fc113::create_char`]; 0xFF is the ROM solid
  /// block.
  pub fn write_glyph(&mut self, glyph: u8) -> Result {
    self.data(glyph)
  }

  /// Stores a 5x8 bitmap in one of the eight CGRAM slots.
  pub fn create_char(&mut self, slot: u8, pattern: impl Into<[u8; 8]>) -> Result {
    assert!(slot < 8);

    self.command(SET_CGRAM_ADDR | (slot << 3))?;
    for row in pattern.into() {
      self.data(row)?;
    }
    Ok(())
  }

  fn command(&mut self, byte: u8) -> Result {
    self.send(byte, 0)
  }

  fn data(&mut self, byte: u8) -> Result {
    self.send(byte, REGISTER_SELECT)
  }

  fn send(&mut self, byte: u8, mode: u8) -> Result {
    self.write_nibble(mode | (byte & 0xF0))?;
    self.write_nibble(mode | (byte << 4))
  }

  fn write_nibble(&mut self, bits: u8) -> Result {
    self.expander_write(bits)?;
    self.expander_write(bits | ENABLE)?;
    sleep(Duration::from_micros(1));
    self.expander_write(bits & !ENABLE)?;
    sleep(Duration::from_micros(50));
    Ok(())
  }

  fn expander_write(&mut self, bits: u8) -> Result {
    let bits = if self.backlight { bits | BACKLIGHT } else { bits };
    self.bus.write(&[bits])?;
    Ok(())
  }
}
