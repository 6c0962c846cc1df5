/// I²C EEPROMs like the Microchip 24LC01B (128 x 8 bits).
///
/// A write consists of a one-byte word address followed by up to a page of
/// data. The data lands in the page buffer and is programmed during an
/// internal write cycle after STOP; while that cycle runs the device doesn't
/// acknowledge its own slave address.
///
/// Reads are sequential from the current word address, which is set by a
/// write carrying only the word address.

mod ack_poll;
mod paged;

pub use self::ack_poll::{
	AckOutcome,
	AckPoller,
};

pub use self::paged::{
	PageDescriptor,
	PagedWriter,
	pages,
};

use crate::error::{
	BResult,
	Error,
};
use crate::transport::I2cMaster;

/// Set the current word address of the slave.
pub fn set_word_address<B>(bus: &mut B, slave: u16, word_address: u8) -> BResult<()>
where
	B: I2cMaster + ?Sized,
{
	let written = bus.write(slave, &[word_address])?;
	Error::check_count("word address write", 1, written)
}
