//! Interface to the bridge driver (FT4222 or anything behaving like it).
//!
//! Each trait covers one role of the bridge. All calls are blocking and
//! return how many bytes were actually moved; checking that count against
//! the request is the caller's job.

use std::io;

mod status;

pub use self::status::ControllerStatus;

#[derive(Debug, Fail)]
pub enum TransportError {
	#[fail(display = "link closed")]
	LinkClosed,
	#[fail(display = "peer did not respond")]
	NoResponse,
	#[fail(display = "driver returned status {}", _0)]
	Status(u32),
	#[fail(display = "{}", _0)]
	Io(#[cause] io::Error),
}

impl From<io::Error> for TransportError {
	fn from(e: io::Error) -> Self {
		TransportError::Io(e)
	}
}

pub type TResult<T> = Result<T, TransportError>;

pub trait I2cMaster {
	/// START, address, `data`, STOP; returns number of bytes written
	fn write(&mut self, slave: u16, data: &[u8]) -> TResult<usize>;

	/// sequential read into `target`; returns number of bytes read
	fn read(&mut self, slave: u16, target: &mut [u8]) -> TResult<usize>;

	/// controller status after the last transfer
	fn status(&mut self) -> TResult<ControllerStatus>;
}

pub trait SpiMaster {
	/// Full duplex exchange of `tx.len()` bytes; `rx` must be at least as
	/// long as `tx`.
	///
	/// With `deassert_after == false` slave select stays asserted, so the
	/// next call continues the same selection.
	fn transceive(&mut self, tx: &[u8], rx: &mut [u8], deassert_after: bool) -> TResult<usize>;
}

pub trait SpiSlave {
	/// bytes received from the master but not read yet
	fn rx_available(&mut self) -> TResult<usize>;

	fn read(&mut self, target: &mut [u8]) -> TResult<usize>;

	/// queue `data` for the master to clock out
	fn write(&mut self, data: &[u8]) -> TResult<usize>;
}

impl<'a, B: ?Sized + I2cMaster> I2cMaster for &'a mut B {
	fn write(&mut self, slave: u16, data: &[u8]) -> TResult<usize> {
		B::write(*self, slave, data)
	}
	fn read(&mut self, slave: u16, target: &mut [u8]) -> TResult<usize> {
		B::read(*self, slave, target)
	}
	fn status(&mut self) -> TResult<ControllerStatus> {
		B::status(*self)
	}
}

impl<'a, B: ?Sized + SpiMaster> SpiMaster for &'a mut B {
	fn transceive(&mut self, tx: &[u8], rx: &mut [u8], deassert_after: bool) -> TResult<usize> {
		B::transceive(*self, tx, rx, deassert_after)
	}
}

impl<'a, B: ?Sized + SpiSlave> SpiSlave for &'a mut B {
	fn rx_available(&mut self) -> TResult<usize> {
		B::rx_available(*self)
	}
	fn read(&mut self, target: &mut [u8]) -> TResult<usize> {
		B::read(*self, target)
	}
	fn write(&mut self, data: &[u8]) -> TResult<usize> {
		B::write(*self, data)
	}
}
