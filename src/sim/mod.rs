//! Simulated peers implementing the transport traits.
//!
//! Close enough to the real parts to exercise the completion protocols:
//! write cycles take a configurable number of polls, reads come back with
//! the same framing as from the hardware.

mod i2c_eeprom;
mod microwire_eeprom;
mod slave_feed;

pub use self::i2c_eeprom::I2cEepromSim;
pub use self::microwire_eeprom::MicrowireEepromSim;
pub use self::slave_feed::SlaveFeedSim;

use std::io;

use crate::transport::{
	TResult,
	TransportError,
};

fn check_reply_buffer(tx: &[u8], rx: &[u8]) -> TResult<()> {
	if rx.len() < tx.len() {
		return Err(TransportError::Io(io::Error::new(
			io::ErrorKind::InvalidInput,
			format!("reply buffer of {} bytes for {} byte exchange", rx.len(), tx.len()),
		)));
	}
	Ok(())
}
