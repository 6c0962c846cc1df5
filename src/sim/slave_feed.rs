use std::collections::VecDeque;

use crate::transport::{
	SpiSlave,
	TResult,
};

/// A master sending one message in bursts, seen from the slave side.
///
/// Between bursts `rx_available` reports nothing for `idle_polls` polls.
#[derive(Clone, Debug)]
pub struct SlaveFeedSim {
	bursts: VecDeque<Vec<u8>>,
	idle_polls: u32,
	idle_left: u32,
	replies: Vec<Vec<u8>>,
}

impl SlaveFeedSim {
	/// Split `message` into bursts of `burst_sizes` (repeated as needed).
	pub fn new(message: &[u8], burst_sizes: &[usize], idle_polls: u32) -> Self {
		let mut bursts = VecDeque::new();
		let mut rest = message;
		let mut sizes = burst_sizes.iter().cloned().filter(|&s| s > 0).cycle();
		while !rest.is_empty() {
			let size = sizes.next().unwrap_or(rest.len()).min(rest.len());
			let (burst, tail) = rest.split_at(size);
			bursts.push_back(burst.to_vec());
			rest = tail;
		}
		SlaveFeedSim {
			bursts,
			idle_polls,
			idle_left: idle_polls,
			replies: Vec::new(),
		}
	}

	pub fn replies(&self) -> &[Vec<u8>] {
		&self.replies
	}
}

impl SpiSlave for SlaveFeedSim {
	fn rx_available(&mut self) -> TResult<usize> {
		if self.idle_left > 0 {
			self.idle_left -= 1;
			return Ok(0);
		}
		Ok(self.bursts.front().map(|b| b.len()).unwrap_or(0))
	}

	fn read(&mut self, target: &mut [u8]) -> TResult<usize> {
		let burst = match self.bursts.front_mut() {
			None => return Ok(0),
			Some(b) => b,
		};
		let n = burst.len().min(target.len());
		target[..n].copy_from_slice(&burst[..n]);
		burst.drain(..n);
		if burst.is_empty() {
			self.bursts.pop_front();
			self.idle_left = self.idle_polls;
		}
		Ok(n)
	}

	fn write(&mut self, data: &[u8]) -> TResult<usize> {
		self.replies.push(data.to_vec());
		Ok(data.len())
	}
}
