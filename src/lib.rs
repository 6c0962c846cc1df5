#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

pub type AResult<T> = Result<T, failure::Error>;

#[macro_use]
pub mod error;

pub mod config;
pub mod i2c;
pub mod microwire;
pub mod retry;
pub mod sim;
pub mod spi_slave;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use self::config::Config;
pub use self::error::{
	BResult,
	Error,
	ErrorKind,
	FailurePolicy,
	SweepReport,
};
