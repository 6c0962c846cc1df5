use crate::transport::TransportError;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ErrorKind {
	/// link fault or transfer count mismatch; never retried
	Transport,
	/// device didn't confirm completion of a write cycle in time
	BusyTimeout,
	/// frame wasn't complete when the receive budget ran out
	ReceiveTimeout,
	/// request rejected before touching the bus
	ProtocolViolation,
	/// some units (pages, addresses) of a bigger operation failed
	PartialFailure,
}

#[derive(Debug, Fail)]
pub enum Error {
	#[fail(display = "transport error: {}", _0)]
	Transport(#[cause] TransportError),
	#[fail(display = "{} transferred {} of {} bytes", operation, actual, expected)]
	ShortTransfer {
		operation: &'static str,
		expected: usize,
		actual: usize,
	},
	#[fail(display = "device still busy after {} attempts", attempts)]
	BusyTimeout {
		attempts: u64,
	},
	#[fail(display = "received {} of {} bytes in {} polls", received, expected, attempts)]
	ReceiveTimeout {
		attempts: u64,
		received: usize,
		expected: usize,
	},
	#[fail(display = "{}", _0)]
	ProtocolViolation(String),
	#[fail(display = "page {} (@{:02x}) failed: {}", page, address, source)]
	PageFailed {
		page: usize,
		address: u8,
		source: Box<Error>,
	},
	#[fail(display = "{} of {} addresses failed", failed, attempted)]
	SweepFailed {
		failed: usize,
		attempted: usize,
	},
}

pub type BResult<T> = Result<T, Error>;

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Transport(_) => ErrorKind::Transport,
			Error::ShortTransfer { .. } => ErrorKind::Transport,
			Error::BusyTimeout { .. } => ErrorKind::BusyTimeout,
			Error::ReceiveTimeout { .. } => ErrorKind::ReceiveTimeout,
			Error::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
			Error::PageFailed { .. } => ErrorKind::PartialFailure,
			Error::SweepFailed { .. } => ErrorKind::PartialFailure,
		}
	}

	/// innermost error, looking through page wrappers
	pub fn root(&self) -> &Error {
		match self {
			Error::PageFailed { source, .. } => source.root(),
			e => e,
		}
	}

	pub(crate) fn check_count(operation: &'static str, expected: usize, actual: usize) -> BResult<()> {
		if expected != actual {
			return Err(Error::ShortTransfer { operation, expected, actual });
		}
		Ok(())
	}
}

impl From<TransportError> for Error {
	fn from(e: TransportError) -> Self {
		Error::Transport(e)
	}
}

macro_rules! violation {
	($($arg:tt)*) => {
		return Err(crate::error::Error::ProtocolViolation(format!($($arg)*)))
	};
}

/// How a multi-unit operation reacts to one failing unit.
///
/// This is fixed per operation: page writes to an I2C EEPROM stop at the
/// first bad page, address sweeps over a Microwire EEPROM keep going.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum FailurePolicy {
	FailFast,
	BestEffort,
}

/// Outcome of a best-effort sweep over all addresses.
#[derive(Debug, Default)]
pub struct SweepReport {
	pub attempted: usize,
	pub failures: Vec<(u8, Error)>,
}

impl SweepReport {
	pub fn is_complete(&self) -> bool {
		self.failures.is_empty()
	}

	pub fn failed_addresses(&self) -> Vec<u8> {
		self.failures.iter().map(|&(address, _)| address).collect()
	}

	pub(crate) fn record(&mut self, address: u8, result: BResult<()>) {
		self.attempted += 1;
		if let Err(e) = result {
			self.failures.push((address, e));
		}
	}

	/// `Err(SweepFailed)` if any address failed
	pub fn into_result(self) -> BResult<()> {
		if self.failures.is_empty() {
			Ok(())
		} else {
			Err(Error::SweepFailed {
				failed: self.failures.len(),
				attempted: self.attempted,
			})
		}
	}
}
