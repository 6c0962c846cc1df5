use crate::transport::{
	SpiMaster,
	TResult,
};

use super::check_reply_buffer;

/// AT93C46-like EEPROM (x8 organisation) behind an SPI master.
///
/// Only understands the padded instruction framing the driver sends. While
/// selected after an instruction, DO reports the write status: low for
/// `write_cycle_polls` exchanges after a WRITE, high afterwards.
#[derive(Clone, Debug)]
pub struct MicrowireEepromSim {
	memory: Vec<u8>,
	writes_enabled: bool,
	write_cycle_polls: u32,
	busy_left: u32,
	// DO stays low until the next instruction
	stuck: bool,
	stuck_addresses: Vec<u8>,
	selected: bool,
}

impl MicrowireEepromSim {
	pub fn new() -> Self {
		MicrowireEepromSim {
			memory: vec![0xff; 128],
			writes_enabled: false,
			write_cycle_polls: 2,
			busy_left: 0,
			stuck: false,
			stuck_addresses: Vec::new(),
			selected: false,
		}
	}

	pub fn with_write_cycle(mut self, polls: u32) -> Self {
		self.write_cycle_polls = polls;
		self
	}

	/// writes to `address` never complete
	pub fn with_stuck_address(mut self, address: u8) -> Self {
		self.stuck_addresses.push(address);
		self
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn writes_enabled(&self) -> bool {
		self.writes_enabled
	}

	fn instruction(&mut self, tx: &[u8], rx: &mut [u8]) {
		self.stuck = false;
		self.busy_left = 0;
		match (tx.len(), tx[0]) {
			(2, 0x04) => match tx[1] & 0xc0 {
				0xc0 => self.writes_enabled = true,
				0x00 => self.writes_enabled = false,
				_ => debug!("AT93C46 sim: unsupported instruction {:02x?}", tx),
			},
			(3, 0x02) if tx[1] & 0x80 != 0 => {
				let address = tx[1] & 0x7f;
				if !self.writes_enabled || self.stuck_addresses.contains(&address) {
					self.stuck = true;
				} else {
					self.memory[address as usize] = tx[2];
					self.busy_left = self.write_cycle_polls;
				}
			},
			(4, 0x03) if tx[1] & 0x80 == 0 => {
				let data = self.memory[tx[1] as usize];
				// dummy 0 bit, then data MSB first
				rx[2] = data >> 1;
				rx[3] = (data & 0x01) << 7;
			},
			_ => debug!("AT93C46 sim: unsupported instruction {:02x?}", tx),
		}
	}
}

impl Default for MicrowireEepromSim {
	fn default() -> Self {
		Self::new()
	}
}

impl SpiMaster for MicrowireEepromSim {
	fn transceive(&mut self, tx: &[u8], rx: &mut [u8], deassert_after: bool) -> TResult<usize> {
		check_reply_buffer(tx, rx)?;
		let rx = &mut rx[..tx.len()];
		for b in rx.iter_mut() {
			*b = 0;
		}

		let continued = self.selected;
		self.selected = !deassert_after;

		if continued || tx.iter().all(|&b| b == 0) {
			// no start bit: status output
			if self.stuck {
				return Ok(tx.len());
			}
			if self.busy_left > 0 {
				self.busy_left -= 1;
			} else {
				for b in rx.iter_mut() {
					*b = 0xff;
				}
			}
			return Ok(tx.len());
		}

		self.instruction(tx, rx);
		Ok(tx.len())
	}
}
