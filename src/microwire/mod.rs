/// Protocol for Atmel AT93C46 in x8 organisation, a 1-kbit EEPROM (128 x 8bit)
///
/// A 3-wire ("Microwire") device: CS, CLK, DI, DO. Driven here by a plain
/// SPI master, so every instruction gets padded with leading zero bits to a
/// multiple of 8 bits; the device ignores clocks before the start bit.
///
/// Instructions:
/// - Startbit: "1"
/// - 2-bit Opcode
/// - 7-bit Address
///
/// Opcodes: (@ address)
/// - 0b00 @ 0b11?????: EWEN (erase/write enable), no DATA
/// - 0b00 @ 0b00?????: EWDS (erase/write disable), no DATA
/// - 0b01: WRITE 8 bits to address, send DATA
/// - 0b10: READ 8 bits from address, recv DATA (after a dummy 0 bit)
///
/// After WRITE a short CS low pulse followed by CS high makes the device
/// report its status on DO: low while busy, high once the write is done.

mod commands;
mod driver;

pub use self::commands::{
	ADDRESS_LIMIT,
	decode_read_reply,
	read_command,
	write_command,
};

pub use self::driver::{
	SerialEepromDriver,
	WritesEnabled,
};
