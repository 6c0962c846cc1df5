use crate::config::I2cConfig;
use crate::error::{
	BResult,
	Error,
	FailurePolicy,
};
use crate::transport::I2cMaster;

use super::{
	AckPoller,
	set_word_address,
};

/// One page write: word address of the first byte, then the page data.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PageDescriptor<'a> {
	pub start_address: u8,
	pub payload: &'a [u8],
}

impl<'a> PageDescriptor<'a> {
	/// replaces content of `buf` with the bytes to send
	pub fn encode_into(&self, buf: &mut Vec<u8>) {
		buf.clear();
		buf.push(self.start_address);
		buf.extend_from_slice(self.payload);
	}
}

/// Split `data` into pages starting at word address 0.
///
/// Rejects data that isn't a whole number of pages or doesn't fit the
/// one-byte word address.
pub fn pages<'a>(data: &'a [u8], page_size: usize) -> BResult<impl Iterator<Item = PageDescriptor<'a>> + 'a> {
	if 0 == page_size {
		violation!("page size must not be zero");
	}
	if 0 != data.len() % page_size {
		violation!("data length {} is not a multiple of the page size {}", data.len(), page_size);
	}
	if data.len() > page_size && data.len() - page_size > 0xff {
		violation!("data length {} exceeds the one-byte word address", data.len());
	}

	Ok(data.chunks(page_size).enumerate().map(move |(index, payload)| {
		PageDescriptor {
			start_address: (index * page_size) as u8,
			payload,
		}
	}))
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PagedWriter {
	page_size: usize,
	poller: AckPoller,
}

impl PagedWriter {
	pub const FAILURE_POLICY: FailurePolicy = FailurePolicy::FailFast;

	pub fn new(page_size: usize, poller: AckPoller) -> Self {
		PagedWriter {
			page_size,
			poller,
		}
	}

	pub fn from_config(config: &I2cConfig) -> Self {
		Self::new(config.page_size, AckPoller::from_config(config))
	}

	pub fn page_size(&self) -> usize {
		self.page_size
	}

	/// Write `data` page by page from word address 0, waiting for each
	/// write cycle before starting the next page.
	///
	/// Stops at the first page failing; later pages are not touched.
	pub fn write_all<B>(&self, bus: &mut B, slave: u16, data: &[u8]) -> BResult<()>
	where
		B: I2cMaster + ?Sized,
	{
		let mut scratch = Vec::with_capacity(self.page_size + 1);
		for (index, page) in pages(data, self.page_size)?.enumerate() {
			if let Err(e) = self.write_page(bus, slave, &page, &mut scratch) {
				warn!("I2C {:02x}: page {} (@{:02x}) failed: {}", slave, index, page.start_address, e);
				return Err(Error::PageFailed {
					page: index,
					address: page.start_address,
					source: Box::new(e),
				});
			}
		}
		info!("I2C {:02x}: wrote {} bytes", slave, data.len());
		Ok(())
	}

	fn write_page<B>(&self, bus: &mut B, slave: u16, page: &PageDescriptor, scratch: &mut Vec<u8>) -> BResult<()>
	where
		B: I2cMaster + ?Sized,
	{
		page.encode_into(scratch);
		let written = bus.write(slave, scratch)?;
		Error::check_count("page write", scratch.len(), written)?;
		debug!("I2C {:02x}: wrote page @{:02x}", slave, page.start_address);

		self.poller.wait_until_ready(bus, slave)?.into_result()?;
		Ok(())
	}

	/// Sequential read of `target.len()` bytes from word address 0.
	pub fn read_all<B>(&self, bus: &mut B, slave: u16, target: &mut [u8]) -> BResult<()>
	where
		B: I2cMaster + ?Sized,
	{
		set_word_address(bus, slave, 0)?;
		let read = bus.read(slave, target)?;
		Error::check_count("sequential read", target.len(), read)
	}
}

impl Default for PagedWriter {
	fn default() -> Self {
		Self::from_config(&I2cConfig::default())
	}
}
