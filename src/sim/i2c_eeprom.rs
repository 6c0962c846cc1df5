use crate::transport::{
	ControllerStatus,
	I2cMaster,
	TResult,
};

// controller status after an acknowledged transfer
const STATUS_ACK: ControllerStatus = ControllerStatus(0x00);
const STATUS_BUS_BUSY: ControllerStatus = ControllerStatus(0x40);
const STATUS_ADDRESS_NACK: ControllerStatus = ControllerStatus(0x06);

/// 24LC01B-like EEPROM behind an I2C master.
///
/// Page writes wrap around inside their page. After each page write the
/// device ignores its address for `write_cycle_probes` transfers.
#[derive(Clone, Debug)]
pub struct I2cEepromSim {
	slave_address: u16,
	memory: Vec<u8>,
	page_size: usize,
	word_address: usize,
	write_cycle_probes: u32,
	busy_left: u32,
	status: ControllerStatus,
	page_writes: usize,
}

impl I2cEepromSim {
	pub fn new(slave_address: u16, size: usize, page_size: usize) -> Self {
		assert!(size > 0 && page_size > 0 && 0 == size % page_size);
		I2cEepromSim {
			slave_address,
			memory: vec![0xff; size],
			page_size,
			word_address: 0,
			write_cycle_probes: 3,
			busy_left: 0,
			status: STATUS_ACK,
			page_writes: 0,
		}
	}

	pub fn with_write_cycle(mut self, probes: u32) -> Self {
		self.write_cycle_probes = probes;
		self
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn page_writes(&self) -> usize {
		self.page_writes
	}

	// false if the device didn't acknowledge its address
	fn address(&mut self, slave: u16) -> bool {
		if slave != self.slave_address {
			self.status = STATUS_ADDRESS_NACK;
			return false;
		}
		if self.busy_left > 0 {
			// bus shows busy on the first probe of a write cycle
			self.status = if self.busy_left == self.write_cycle_probes {
				STATUS_BUS_BUSY
			} else {
				STATUS_ADDRESS_NACK
			};
			self.busy_left -= 1;
			return false;
		}
		self.status = STATUS_ACK;
		true
	}
}

impl I2cMaster for I2cEepromSim {
	fn write(&mut self, slave: u16, data: &[u8]) -> TResult<usize> {
		// the bridge clocks out everything whether acknowledged or not
		if !self.address(slave) || data.is_empty() {
			return Ok(data.len());
		}

		self.word_address = data[0] as usize % self.memory.len();
		let payload = &data[1..];
		if !payload.is_empty() {
			let page_start = self.word_address - self.word_address % self.page_size;
			let mut offset = self.word_address - page_start;
			for &b in payload {
				self.memory[page_start + offset] = b;
				offset = (offset + 1) % self.page_size;
			}
			self.word_address = page_start + offset;
			self.busy_left = self.write_cycle_probes;
			self.page_writes += 1;
			trace!("24LC01B sim: page write @{:02x}, {} bytes", page_start, payload.len());
		}
		Ok(data.len())
	}

	fn read(&mut self, slave: u16, target: &mut [u8]) -> TResult<usize> {
		if !self.address(slave) {
			return Ok(0);
		}
		for t in target.iter_mut() {
			*t = self.memory[self.word_address];
			self.word_address = (self.word_address + 1) % self.memory.len();
		}
		Ok(target.len())
	}

	fn status(&mut self) -> TResult<ControllerStatus> {
		Ok(self.status)
	}
}
