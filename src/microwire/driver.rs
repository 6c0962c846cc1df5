use std::ops::{
	Deref,
	DerefMut,
};

use crate::config::MicrowireConfig;
use crate::error::{
	BResult,
	Error,
	FailurePolicy,
	SweepReport,
};
use crate::retry::{
	Attempts,
	RetryBudget,
	RetryPolicy,
};
use crate::transport::SpiMaster;

use super::commands::{
	ADDRESS_LIMIT,
	ERASE_WRITE_DISABLE,
	ERASE_WRITE_ENABLE,
	decode_read_reply,
	read_command,
	write_command,
};

fn exchange<B>(bus: &mut B, operation: &'static str, tx: &[u8], rx: &mut [u8], deassert_after: bool) -> BResult<()>
where
	B: SpiMaster + ?Sized,
{
	let transferred = bus.transceive(tx, rx, deassert_after)?;
	Error::check_count(operation, tx.len(), transferred)
}

// Slave select stays asserted across exchanges until released; a final
// one-byte exchange deasserts it. Also released on drop, so an aborted
// poll never leaves the device selected.
struct Selected<'a, B: SpiMaster + ?Sized + 'a> {
	bus: &'a mut B,
	released: bool,
}

impl<'a, B: SpiMaster + ?Sized> Selected<'a, B> {
	fn new(bus: &'a mut B) -> Self {
		Selected {
			bus,
			released: false,
		}
	}

	fn exchange(&mut self, operation: &'static str, tx: &[u8], rx: &mut [u8]) -> BResult<()> {
		exchange(&mut *self.bus, operation, tx, rx, false)
	}

	fn deassert(&mut self) -> BResult<()> {
		self.released = true;
		let mut reply = [0u8; 1];
		exchange(&mut *self.bus, "deselect", &[0x00], &mut reply, true)
	}

	fn release(mut self) -> BResult<()> {
		self.deassert()
	}
}

impl<'a, B: SpiMaster + ?Sized> Drop for Selected<'a, B> {
	fn drop(&mut self) {
		if !self.released {
			if let Err(e) = self.deassert() {
				warn!("Couldn't deassert slave select: {}", e);
			}
		}
	}
}

// clock all-zero chunks (no start bit) until DO goes high
fn wait_for_ready<B, P>(selected: &mut Selected<B>, chunk_len: usize, policy: P) -> BResult<u64>
where
	B: SpiMaster + ?Sized,
	P: RetryPolicy,
{
	let dummy = vec![0u8; chunk_len];
	let mut reply = vec![0u8; chunk_len];
	let mut budget = RetryBudget::new(policy);

	while budget.next_attempt() {
		selected.exchange("busy poll", &dummy, &mut reply)?;
		if reply.iter().any(|&b| b != 0) {
			return Ok(budget.attempts_made());
		}
	}

	Err(Error::BusyTimeout { attempts: budget.attempts_made() })
}

pub struct SerialEepromDriver<B: SpiMaster> {
	bus: B,
	device_size: usize,
	poll_attempts: u64,
	poll_chunk_len: usize,
}

impl<B: SpiMaster> SerialEepromDriver<B> {
	pub const SWEEP_POLICY: FailurePolicy = FailurePolicy::BestEffort;

	pub fn new(bus: B) -> Self {
		let config = MicrowireConfig::default();
		SerialEepromDriver {
			bus,
			device_size: config.device_size,
			poll_attempts: config.poll_attempts,
			poll_chunk_len: config.poll_chunk_len,
		}
	}

	pub fn from_config(bus: B, config: &MicrowireConfig) -> BResult<Self> {
		if config.device_size > ADDRESS_LIMIT {
			violation!("device size {} exceeds the 7-bit address range", config.device_size);
		}
		if 0 == config.poll_chunk_len {
			violation!("busy poll chunk length must not be zero");
		}
		Ok(SerialEepromDriver {
			bus,
			device_size: config.device_size,
			poll_attempts: config.poll_attempts,
			poll_chunk_len: config.poll_chunk_len,
		})
	}

	pub fn device_size(&self) -> usize {
		self.device_size
	}

	pub fn bus(&mut self) -> &mut B {
		&mut self.bus
	}

	pub fn into_inner(self) -> B {
		self.bus
	}

	fn check_address(&self, address: u8) -> BResult<()> {
		if address as usize >= self.device_size {
			violation!("address {:02x} out of range (device size {})", address, self.device_size);
		}
		Ok(())
	}

	/// EWEN; the device powers up with writes disabled.
	pub fn enable_writes(&mut self) -> BResult<()> {
		let mut reply = [0u8; 2];
		exchange(&mut self.bus, "write enable", &ERASE_WRITE_ENABLE, &mut reply, true)?;
		debug!("Microwire: writes enabled");
		Ok(())
	}

	/// EWDS
	pub fn disable_writes(&mut self) -> BResult<()> {
		let mut reply = [0u8; 2];
		exchange(&mut self.bus, "write disable", &ERASE_WRITE_DISABLE, &mut reply, true)?;
		debug!("Microwire: writes disabled");
		Ok(())
	}

	/// Enable writes until the returned guard is dropped.
	pub fn start_programming(&mut self) -> BResult<WritesEnabled<B>> {
		self.enable_writes()?;
		Ok(WritesEnabled(self))
	}

	pub fn write_byte(&mut self, address: u8, data: u8) -> BResult<()> {
		let policy = Attempts(self.poll_attempts);
		self.write_byte_with(address, data, policy)
	}

	/// WRITE, then poll DO until the device reports completion.
	///
	/// Once polling started slave select gets deasserted again whatever the
	/// outcome; a failing deassert is only returned if the write itself
	/// succeeded.
	pub fn write_byte_with<P>(&mut self, address: u8, data: u8, policy: P) -> BResult<()>
	where
		P: RetryPolicy,
	{
		self.check_address(address)?;

		let mut reply = [0u8; 3];
		exchange(&mut self.bus, "write command", &write_command(address, data), &mut reply, true)?;

		// the deassert above followed by the assert of the first poll is the
		// CS pulse starting the status output
		let mut selected = Selected::new(&mut self.bus);
		let polled = wait_for_ready(&mut selected, self.poll_chunk_len, policy);
		let released = selected.release();

		match (polled, released) {
			(Ok(polls), Ok(())) => {
				trace!("Microwire: wrote {:02x} @{:02x} after {} polls", data, address, polls);
				Ok(())
			},
			(Ok(_), Err(e)) => Err(e),
			(Err(e), Ok(())) => Err(e),
			(Err(e), Err(release_err)) => {
				warn!("Microwire: couldn't deassert slave select after failed write @{:02x}: {}", address, release_err);
				Err(e)
			},
		}
	}

	pub fn read_byte(&mut self, address: u8) -> BResult<u8> {
		self.check_address(address)?;

		let mut reply = [0u8; 4];
		exchange(&mut self.bus, "read command", &read_command(address), &mut reply, true)?;
		let data = decode_read_reply(&reply);
		trace!("Microwire: read {:02x} @{:02x}", data, address);
		Ok(data)
	}

	/// Write every address; failures are collected, not fatal.
	///
	/// Writes must already be enabled.
	pub fn write_all(&mut self, data: &[u8]) -> BResult<SweepReport> {
		if data.len() != self.device_size {
			violation!("need exactly {} bytes, got {}", self.device_size, data.len());
		}

		let mut report = SweepReport::default();
		for (address, &byte) in data.iter().enumerate() {
			let address = address as u8;
			let result = self.write_byte(address, byte);
			if let Err(ref e) = result {
				warn!("Failed to write to address {:02x}: {}", address, e);
			}
			report.record(address, result);
		}
		info!("Microwire: wrote {} of {} addresses", report.attempted - report.failures.len(), report.attempted);
		Ok(report)
	}

	/// Read every address into `target`; bytes at failed addresses are
	/// left untouched.
	pub fn read_all(&mut self, target: &mut [u8]) -> BResult<SweepReport> {
		if target.len() != self.device_size {
			violation!("need room for exactly {} bytes, got {}", self.device_size, target.len());
		}

		let mut report = SweepReport::default();
		for (address, slot) in target.iter_mut().enumerate() {
			let address = address as u8;
			let result = self.read_byte(address).map(|byte| *slot = byte);
			if let Err(ref e) = result {
				warn!("Failed to read address {:02x}: {}", address, e);
			}
			report.record(address, result);
		}
		Ok(report)
	}

	/// Enable writes, then write every address.
	///
	/// Only a failing write enable aborts.
	pub fn program(&mut self, data: &[u8]) -> BResult<SweepReport> {
		if data.len() != self.device_size {
			violation!("need exactly {} bytes, got {}", self.device_size, data.len());
		}
		self.enable_writes()?;
		self.write_all(data)
	}
}

pub struct WritesEnabled<'a, B: SpiMaster + 'a>(&'a mut SerialEepromDriver<B>);

impl<'a, B: SpiMaster> Drop for WritesEnabled<'a, B> {
	fn drop(&mut self) {
		if let Err(e) = self.0.disable_writes() {
			warn!("Couldn't disable Erase/Write mode: {}", e);
		}
	}
}

impl<'a, B: SpiMaster> Deref for WritesEnabled<'a, B> {
	type Target = SerialEepromDriver<B>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<'a, B: SpiMaster> DerefMut for WritesEnabled<'a, B> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::error::ErrorKind;
	use crate::test_support::*;
	use crate::transport::TransportError;

	fn call(tx: &[u8], deassert_after: bool) -> SpiCall {
		SpiCall {
			tx: tx.to_vec(),
			deassert_after,
		}
	}

	fn driver(bus: ScriptedSpi, poll_attempts: u64) -> SerialEepromDriver<ScriptedSpi> {
		let config = MicrowireConfig {
			poll_attempts,
			..Default::default()
		};
		SerialEepromDriver::from_config(bus, &config).unwrap()
	}

	#[test]
	fn enable_and_disable_writes() {
		let mut ee = SerialEepromDriver::new(ScriptedSpi::filled(0));
		ee.enable_writes().unwrap();
		ee.disable_writes().unwrap();
		assert_eq!(ee.bus().calls, vec![call(&[0x04, 0xff], true), call(&[0x04, 0x00], true)]);
	}

	#[test]
	fn short_enable_is_not_retried() {
		let mut ee = SerialEepromDriver::new(ScriptedSpi::new(|_, _, _| Ok(1)));
		let e = ee.enable_writes().unwrap_err();
		assert_eq!(e.kind(), ErrorKind::Transport);
		assert_eq!(ee.bus().calls.len(), 1);
	}

	#[test]
	fn write_polls_until_do_high() {
		let bus = ScriptedSpi::new(|index, tx, rx| {
			for b in rx.iter_mut() {
				*b = 0;
			}
			// third poll sees DO rise in the middle of the chunk
			if index == 3 {
				rx[7] = 0x1f;
			}
			Ok(tx.len())
		});
		let mut ee = driver(bus, 1000);
		ee.write_byte(0x2a, 0x55).unwrap();

		let zeros = [0u8; 10];
		assert_eq!(ee.bus().calls, vec![
			call(&[0x02, 0xaa, 0x55], true),
			call(&zeros, false),
			call(&zeros, false),
			call(&zeros, false),
			call(&[0x00], true),
		]);
	}

	#[test]
	fn write_gives_up_and_still_deasserts() {
		let mut ee = driver(ScriptedSpi::filled(0), 5);
		match ee.write_byte(1, 2) {
			Err(Error::BusyTimeout { attempts: 5 }) => (),
			r => panic!("unexpected {:?}", r),
		}
		let calls = &ee.bus().calls;
		assert_eq!(calls.len(), 7);
		assert!(calls[1..6].iter().all(|c| !c.deassert_after && c.tx.iter().all(|&b| b == 0)));
		assert_eq!(calls[6], call(&[0x00], true));
	}

	#[test]
	fn poll_transport_error_still_deasserts() {
		let bus = ScriptedSpi::new(|index, tx, rx| {
			for b in rx.iter_mut() {
				*b = 0;
			}
			if index == 2 {
				return Err(TransportError::NoResponse);
			}
			Ok(tx.len())
		});
		let mut ee = driver(bus, 1000);
		let e = ee.write_byte(1, 2).unwrap_err();
		assert_eq!(e.kind(), ErrorKind::Transport);
		let calls = &ee.bus().calls;
		assert_eq!(calls.len(), 4);
		assert_eq!(calls[3], call(&[0x00], true));
	}

	#[test]
	fn failed_deassert_after_good_write() {
		let bus = ScriptedSpi::new(|index, tx, rx| {
			for b in rx.iter_mut() {
				*b = 0xff;
			}
			if index == 2 {
				return Ok(0);
			}
			Ok(tx.len())
		});
		let mut ee = driver(bus, 1000);
		match ee.write_byte(1, 2) {
			Err(Error::ShortTransfer { operation: "deselect", .. }) => (),
			r => panic!("unexpected {:?}", r),
		}
	}

	#[test]
	fn short_write_command_skips_polling() {
		let mut ee = driver(ScriptedSpi::new(|_, _, _| Ok(2)), 1000);
		let e = ee.write_byte(1, 2).unwrap_err();
		assert_eq!(e.kind(), ErrorKind::Transport);
		assert_eq!(ee.bus().calls.len(), 1);
	}

	#[test]
	fn address_out_of_range() {
		let mut ee = SerialEepromDriver::new(ScriptedSpi::filled(0xff));
		assert_eq!(ee.write_byte(128, 0).unwrap_err().kind(), ErrorKind::ProtocolViolation);
		assert_eq!(ee.read_byte(200).unwrap_err().kind(), ErrorKind::ProtocolViolation);
		assert!(ee.bus().calls.is_empty());

		let config = MicrowireConfig {
			device_size: 256,
			..Default::default()
		};
		assert!(SerialEepromDriver::from_config(ScriptedSpi::filled(0), &config).is_err());
	}

	#[test]
	fn read_byte_realigns_reply() {
		let bus = ScriptedSpi::new(|_, tx, rx| {
			rx.copy_from_slice(&[0x00, 0x00, 0b1011_0100, 0b1000_0000]);
			Ok(tx.len())
		});
		let mut ee = SerialEepromDriver::new(bus);
		assert_eq!(ee.read_byte(0x2a).unwrap(), 0b0110_1001);
		assert_eq!(ee.bus().calls, vec![call(&[0x03, 0x2a, 0x00, 0x00], true)]);
	}

	#[test]
	fn write_sweep_continues_after_failure() {
		let bus = ScriptedSpi::new(|_, tx, rx| {
			for b in rx.iter_mut() {
				*b = 0xff;
			}
			if tx.len() == 3 && tx[1] == 0x80 | 42 {
				return Ok(1);
			}
			Ok(tx.len())
		});
		let mut ee = SerialEepromDriver::new(bus);
		let data: Vec<u8> = (0..128u8).collect();
		let report = ee.write_all(&data).unwrap();

		assert_eq!(report.attempted, 128);
		assert_eq!(report.failed_addresses(), vec![42u8]);
		let commands: Vec<u8> = ee.bus().calls.iter()
			.filter(|c| c.tx.len() == 3)
			.map(|c| c.tx[1] & 0x7f)
			.collect();
		assert_eq!(commands, data);
		assert_eq!(report.into_result().unwrap_err().kind(), ErrorKind::PartialFailure);
	}

	#[test]
	fn read_sweep_keeps_going() {
		let bus = ScriptedSpi::new(|_, tx, rx| {
			rx.copy_from_slice(&[0, 0, tx[1] >> 1, (tx[1] & 1) << 7]);
			if tx[1] == 42 {
				return Ok(3);
			}
			Ok(tx.len())
		});
		let mut ee = SerialEepromDriver::new(bus);
		let mut target = [b'!'; 128];
		let report = ee.read_all(&mut target).unwrap();

		assert_eq!(report.attempted, 128);
		assert_eq!(report.failed_addresses(), vec![42u8]);
		assert_eq!(target[41], 41);
		assert_eq!(target[42], b'!');
		assert_eq!(target[127], 127);
	}

	#[test]
	fn sweep_needs_full_geometry() {
		let mut ee = SerialEepromDriver::new(ScriptedSpi::filled(0xff));
		assert_eq!(ee.write_all(&[0u8; 64]).unwrap_err().kind(), ErrorKind::ProtocolViolation);
		assert_eq!(ee.program(&[0u8; 64]).unwrap_err().kind(), ErrorKind::ProtocolViolation);
		assert!(ee.bus().calls.is_empty());
	}

	#[test]
	fn program_stops_if_enable_fails() {
		let mut ee = SerialEepromDriver::new(ScriptedSpi::new(|_, _, _| Err(TransportError::LinkClosed)));
		assert_eq!(ee.program(&[0u8; 128]).unwrap_err().kind(), ErrorKind::Transport);
		assert_eq!(ee.bus().calls.len(), 1);
	}

	#[test]
	fn programming_guard_disables_writes() {
		let mut ee = SerialEepromDriver::new(ScriptedSpi::filled(0xff));
		{
			let mut prog = ee.start_programming().unwrap();
			prog.write_byte(3, 4).unwrap();
		}
		let calls = &ee.bus().calls;
		assert_eq!(calls.first(), Some(&call(&[0x04, 0xff], true)));
		assert_eq!(calls[1], call(&[0x02, 0x83, 0x04], true));
		assert_eq!(calls.last(), Some(&call(&[0x04, 0x00], true)));
	}
}
