use std::time::Duration;

/// 24LC01B: 128 x 8 bits, written in 8-byte pages
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct I2cConfig {
	pub slave_address: u16,
	pub page_size: usize,
	pub device_size: usize,
	/// 25 retries work for a 24LC01B at 400 kHz
	pub ack_retries: u64,
}

impl Default for I2cConfig {
	fn default() -> Self {
		I2cConfig {
			slave_address: 0x50,
			page_size: 8,
			device_size: 128,
			ack_retries: 25,
		}
	}
}

/// AT93C46 in x8 organisation: 128 x 8 bits, 7-bit addresses
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MicrowireConfig {
	pub device_size: usize,
	pub poll_attempts: u64,
	/// dummy bytes clocked per busy poll
	pub poll_chunk_len: usize,
}

impl Default for MicrowireConfig {
	fn default() -> Self {
		MicrowireConfig {
			device_size: 128,
			poll_attempts: 1000,
			poll_chunk_len: 10,
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SlaveConfig {
	pub frame_len: usize,
	pub poll_attempts: u64,
	// the bridge needs time before it actually sends queued data, and
	// must stay in slave mode until the master clocked it all out
	pub settle_before: Duration,
	pub settle_after: Duration,
}

impl Default for SlaveConfig {
	fn default() -> Self {
		SlaveConfig {
			frame_len: 128,
			poll_attempts: 321_123_456,
			settle_before: Duration::from_secs(1),
			settle_after: Duration::from_secs(1),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Config {
	pub i2c: I2cConfig,
	pub microwire: MicrowireConfig,
	pub slave: SlaveConfig,
}
