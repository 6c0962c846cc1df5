//! Scripted transports recording every call.

use std::collections::VecDeque;

use crate::transport::{
	ControllerStatus,
	I2cMaster,
	SpiMaster,
	SpiSlave,
	TResult,
	TransportError,
};

pub const ACK: ControllerStatus = ControllerStatus(0x00);
pub const BUS_BUSY: ControllerStatus = ControllerStatus(0x40);
pub const IDLE: ControllerStatus = ControllerStatus(0x20);
pub const NACK: ControllerStatus = ControllerStatus(0x06);

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum I2cCall {
	Write(u16, Vec<u8>),
	Read(u16, usize),
	Status,
}

#[derive(Default)]
pub struct ScriptedI2c {
	pub calls: Vec<I2cCall>,
	/// returned by `status()` in order; ACK once drained
	pub statuses: VecDeque<ControllerStatus>,
	/// write call index (0-based) => bytes reported written
	pub short_writes: Vec<(usize, usize)>,
	pub fail_write: Option<usize>,
	pub read_data: Vec<u8>,
	pub short_read: Option<usize>,
	writes: usize,
}

impl ScriptedI2c {
	pub fn with_statuses(statuses: &[ControllerStatus]) -> Self {
		ScriptedI2c {
			statuses: statuses.iter().cloned().collect(),
			..Default::default()
		}
	}

	pub fn writes(&self) -> Vec<Vec<u8>> {
		self.calls.iter().filter_map(|c| match c {
			I2cCall::Write(_, data) => Some(data.clone()),
			_ => None,
		}).collect()
	}

	pub fn status_calls(&self) -> usize {
		self.calls.iter().filter(|c| **c == I2cCall::Status).count()
	}
}

impl I2cMaster for ScriptedI2c {
	fn write(&mut self, slave: u16, data: &[u8]) -> TResult<usize> {
		let index = self.writes;
		self.writes += 1;
		self.calls.push(I2cCall::Write(slave, data.to_vec()));
		if self.fail_write == Some(index) {
			return Err(TransportError::NoResponse);
		}
		for &(at, count) in &self.short_writes {
			if at == index {
				return Ok(count);
			}
		}
		Ok(data.len())
	}

	fn read(&mut self, slave: u16, target: &mut [u8]) -> TResult<usize> {
		self.calls.push(I2cCall::Read(slave, target.len()));
		let n = self.short_read.unwrap_or(target.len()).min(self.read_data.len()).min(target.len());
		target[..n].copy_from_slice(&self.read_data[..n]);
		Ok(n)
	}

	fn status(&mut self) -> TResult<ControllerStatus> {
		self.calls.push(I2cCall::Status);
		Ok(self.statuses.pop_front().unwrap_or(ACK))
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SpiCall {
	pub tx: Vec<u8>,
	pub deassert_after: bool,
}

type Responder = Box<dyn FnMut(usize, &[u8], &mut [u8]) -> TResult<usize>>;

/// SPI master whose replies come from a closure `(call index, tx, rx)`.
pub struct ScriptedSpi {
	pub calls: Vec<SpiCall>,
	respond: Responder,
}

impl ScriptedSpi {
	pub fn new<F>(respond: F) -> Self
	where
		F: FnMut(usize, &[u8], &mut [u8]) -> TResult<usize> + 'static,
	{
		ScriptedSpi {
			calls: Vec::new(),
			respond: Box::new(respond),
		}
	}

	/// every exchange completes; replies are `rx` filled with `fill`
	pub fn filled(fill: u8) -> Self {
		Self::new(move |_, tx, rx| {
			for b in rx.iter_mut() {
				*b = fill;
			}
			Ok(tx.len())
		})
	}
}

impl SpiMaster for ScriptedSpi {
	fn transceive(&mut self, tx: &[u8], rx: &mut [u8], deassert_after: bool) -> TResult<usize> {
		let index = self.calls.len();
		self.calls.push(SpiCall {
			tx: tx.to_vec(),
			deassert_after,
		});
		(self.respond)(index, tx, &mut rx[..tx.len()])
	}
}

/// SPI slave reporting scripted "available" counts, one per poll.
#[derive(Default)]
pub struct ScriptedSlave {
	pub available: VecDeque<usize>,
	pub polls: usize,
	pub read_requests: Vec<usize>,
	pub written: Vec<Vec<u8>>,
	pub fail_poll: Option<usize>,
	pub short_reply: Option<usize>,
	next_byte: u8,
}

impl ScriptedSlave {
	pub fn with_bursts(bursts: &[usize]) -> Self {
		ScriptedSlave {
			available: bursts.iter().cloned().collect(),
			next_byte: b'a',
			..Default::default()
		}
	}
}

impl SpiSlave for ScriptedSlave {
	fn rx_available(&mut self) -> TResult<usize> {
		let index = self.polls;
		self.polls += 1;
		if self.fail_poll == Some(index) {
			return Err(TransportError::LinkClosed);
		}
		match self.available.front().cloned() {
			Some(0) => {
				self.available.pop_front();
				Ok(0)
			},
			Some(n) => Ok(n),
			None => Ok(0),
		}
	}

	fn read(&mut self, target: &mut [u8]) -> TResult<usize> {
		self.read_requests.push(target.len());
		let available = self.available.pop_front().unwrap_or(0);
		let n = available.min(target.len());
		for b in target[..n].iter_mut() {
			*b = self.next_byte;
			self.next_byte = if self.next_byte == b'z' { b'a' } else { self.next_byte + 1 };
		}
		if available > n {
			self.available.push_front(available - n);
		}
		Ok(n)
	}

	fn write(&mut self, data: &[u8]) -> TResult<usize> {
		self.written.push(data.to_vec());
		Ok(self.short_reply.unwrap_or(data.len()))
	}
}
