use crate::config::I2cConfig;
use crate::error::{
	BResult,
	Error,
};
use crate::retry::{
	Attempts,
	RetryBudget,
	RetryPolicy,
};
use crate::transport::{
	ControllerStatus,
	I2cMaster,
};

use super::set_word_address;

/// Result of waiting for a write cycle.
///
/// Running out of attempts is not an error by itself; `ready` tells the
/// two cases apart.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AckOutcome {
	pub ready: bool,
	pub attempts: u64,
	/// `None` only if the policy didn't allow a single attempt
	pub last_status: Option<ControllerStatus>,
}

impl AckOutcome {
	pub fn into_result(self) -> BResult<u64> {
		if !self.ready {
			return Err(Error::BusyTimeout { attempts: self.attempts });
		}
		Ok(self.attempts)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AckPoller {
	retry_limit: u64,
}

impl AckPoller {
	pub const DEFAULT_RETRY_LIMIT: u64 = 25;

	pub fn new(retry_limit: u64) -> Self {
		AckPoller { retry_limit }
	}

	pub fn from_config(config: &I2cConfig) -> Self {
		Self::new(config.ack_retries)
	}

	pub fn retry_limit(&self) -> u64 {
		self.retry_limit
	}

	pub fn wait_until_ready<B>(&self, bus: &mut B, slave: u16) -> BResult<AckOutcome>
	where
		B: I2cMaster + ?Sized,
	{
		self.wait_until_ready_with(bus, slave, Attempts(self.retry_limit))
	}

	/// Probe the slave by setting its word address to 0 until it
	/// acknowledges.
	///
	/// Transport errors and short probe writes end the wait immediately;
	/// only "not acknowledged yet" is retried.
	pub fn wait_until_ready_with<B, P>(&self, bus: &mut B, slave: u16, policy: P) -> BResult<AckOutcome>
	where
		B: I2cMaster + ?Sized,
		P: RetryPolicy,
	{
		let mut budget = RetryBudget::new(policy);
		let mut last_status = None;

		while budget.next_attempt() {
			set_word_address(bus, slave, 0)?;
			let status = bus.status()?;
			trace!("I2C {:02x}: probe {}: {:?}", slave, budget.attempts_made(), status);
			last_status = Some(status);

			// BUS_BUSY typically precedes the NACK
			if status.is_bus_busy() {
				continue;
			}
			// IDLE shows up both before and after the NACK
			if status.is_idle() {
				continue;
			}
			if !status.is_address_nack() {
				debug!("I2C {:02x}: ready after {} probes", slave, budget.attempts_made());
				return Ok(AckOutcome {
					ready: true,
					attempts: budget.attempts_made(),
					last_status,
				});
			}
		}

		debug!("I2C {:02x}: no ACK after {} probes (last status {:?})", slave, budget.attempts_made(), last_status);
		Ok(AckOutcome {
			ready: false,
			attempts: budget.attempts_made(),
			last_status,
		})
	}
}

impl Default for AckPoller {
	fn default() -> Self {
		Self::new(Self::DEFAULT_RETRY_LIMIT)
	}
}
