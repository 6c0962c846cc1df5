//! Receiving a fixed-length message as SPI slave.
//!
//! The master's message arrives in bursts of whatever size the bridge
//! happens to have buffered. There's no length prefix or terminator: both
//! sides know the length up front.

use std::time::Duration;

use crate::config::SlaveConfig;
use crate::error::{
	BResult,
	Error,
};
use crate::retry::{
	Attempts,
	RetryBudget,
	RetryPolicy,
	reliable_sleep,
};
use crate::transport::SpiSlave;

/// Buffer of known length, filled from the front.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FrameBuffer {
	data: Vec<u8>,
	filled: usize,
}

impl FrameBuffer {
	pub fn new(target_len: usize) -> Self {
		FrameBuffer {
			data: vec![0u8; target_len],
			filled: 0,
		}
	}

	pub fn target_len(&self) -> usize {
		self.data.len()
	}

	pub fn filled(&self) -> usize {
		self.filled
	}

	pub fn remaining(&self) -> usize {
		self.data.len() - self.filled
	}

	pub fn is_complete(&self) -> bool {
		self.filled == self.data.len()
	}

	/// the part still waiting for data
	pub fn unfilled_mut(&mut self) -> &mut [u8] {
		&mut self.data[self.filled..]
	}

	/// mark `count` more bytes as received
	pub fn advance(&mut self, count: usize) {
		assert!(count <= self.remaining(), "advancing frame by {} with only {} bytes left", count, self.remaining());
		self.filled += count;
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.data[..self.filled]
	}

	pub fn into_vec(mut self) -> Vec<u8> {
		self.data.truncate(self.filled);
		self.data
	}
}

/// Checksum the bridge puts into a SLAVE_TRANSFER carrying `data`.
pub fn slave_transfer_checksum(data: &[u8]) -> u16 {
	let header = 0x5au16.wrapping_add(0x81).wrapping_add(data.len() as u16);
	data.iter().fold(header, |sum, &b| sum.wrapping_add(b as u16))
}

/// The reply transform of the reference setup.
pub fn uppercase(b: u8) -> u8 {
	b.to_ascii_uppercase()
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SlaveFrameReceiver {
	frame_len: usize,
	poll_attempts: u64,
	settle_before: Duration,
	settle_after: Duration,
}

impl SlaveFrameReceiver {
	pub fn new(frame_len: usize) -> Self {
		SlaveFrameReceiver {
			frame_len,
			..Self::from_config(&SlaveConfig::default())
		}
	}

	pub fn from_config(config: &SlaveConfig) -> Self {
		SlaveFrameReceiver {
			frame_len: config.frame_len,
			poll_attempts: config.poll_attempts,
			settle_before: config.settle_before,
			settle_after: config.settle_after,
		}
	}

	pub fn with_settle(self, before: Duration, after: Duration) -> Self {
		SlaveFrameReceiver {
			settle_before: before,
			settle_after: after,
			..self
		}
	}

	pub fn frame_len(&self) -> usize {
		self.frame_len
	}

	pub fn receive<S>(&self, bus: &mut S) -> BResult<FrameBuffer>
	where
		S: SpiSlave + ?Sized,
	{
		self.receive_with(bus, Attempts(self.poll_attempts))
	}

	/// Poll until a whole frame arrived.
	///
	/// Each poll costs one attempt, whether data was available or not.
	/// Never reads past the frame, even if the bridge has more.
	pub fn receive_with<S, P>(&self, bus: &mut S, policy: P) -> BResult<FrameBuffer>
	where
		S: SpiSlave + ?Sized,
		P: RetryPolicy,
	{
		let mut frame = FrameBuffer::new(self.frame_len);
		let mut budget = RetryBudget::new(policy);

		while !frame.is_complete() {
			if !budget.next_attempt() {
				return Err(Error::ReceiveTimeout {
					attempts: budget.attempts_made(),
					received: frame.filled(),
					expected: frame.target_len(),
				});
			}

			let available = bus.rx_available()?;
			if 0 == available {
				continue;
			}

			let wanted = available.min(frame.remaining());
			let read = bus.read(&mut frame.unfilled_mut()[..wanted])?;
			if read > wanted {
				return Err(Error::ShortTransfer {
					operation: "slave read",
					expected: wanted,
					actual: read,
				});
			}
			frame.advance(read);
			trace!("SPI slave: {} available, read {}, have {} of {}", available, read, frame.filled(), frame.target_len());
		}

		debug!("SPI slave: received {} bytes in {} polls", frame.filled(), budget.attempts_made());
		Ok(frame)
	}

	/// Transform a complete frame and send it back as one reply.
	pub fn respond<S, F>(&self, bus: &mut S, frame: FrameBuffer, transform: F) -> BResult<Vec<u8>>
	where
		S: SpiSlave + ?Sized,
		F: FnMut(u8) -> u8,
	{
		if !frame.is_complete() {
			violation!("frame incomplete: {} of {} bytes", frame.filled(), frame.target_len());
		}

		let reply: Vec<u8> = frame.into_vec().into_iter().map(transform).collect();
		debug!("SPI slave: reply checksum {:04x}", slave_transfer_checksum(&reply));

		reliable_sleep(self.settle_before);
		let written = bus.write(&reply)?;
		Error::check_count("slave write", reply.len(), written)?;
		// stay in slave mode until the master clocked the reply out
		reliable_sleep(self.settle_after);

		Ok(reply)
	}

	pub fn receive_and_respond<S, F>(&self, bus: &mut S, transform: F) -> BResult<Vec<u8>>
	where
		S: SpiSlave + ?Sized,
		F: FnMut(u8) -> u8,
	{
		let frame = self.receive(bus)?;
		self.respond(bus, frame, transform)
	}
}

impl Default for SlaveFrameReceiver {
	fn default() -> Self {
		Self::from_config(&SlaveConfig::default())
	}
}
