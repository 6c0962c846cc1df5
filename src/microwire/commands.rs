const ADDRESS_WIDTH: usize = 7;
pub const ADDRESS_LIMIT: usize = 1usize << ADDRESS_WIDTH;

// start bit + opcode 00 + 11xxxxx, padded to 16 bits
pub(super) const ERASE_WRITE_ENABLE: [u8; 2] = [0x04, 0xff];
// start bit + opcode 00 + 00xxxxx
pub(super) const ERASE_WRITE_DISABLE: [u8; 2] = [0x04, 0x00];

/// start bit + opcode 01 + 7-bit address + data, padded to 24 bits
pub fn write_command(address: u8, data: u8) -> [u8; 3] {
	debug_assert!((address as usize) < ADDRESS_LIMIT);
	[0x02, 0x80 | address, data]
}

/// start bit + opcode 10 + 7-bit address, then 16 clocks for the dummy bit
/// and the data
pub fn read_command(address: u8) -> [u8; 4] {
	debug_assert!((address as usize) < ADDRESS_LIMIT);
	[0x03, address, 0x00, 0x00]
}

/// Extract the data byte from the reply to `read_command`.
///
/// The dummy 0 bit shifts the data by one clock: bits 7..1 arrive in bits
/// 6..0 of the third byte, bit 0 in bit 7 of the fourth.
pub fn decode_read_reply(reply: &[u8; 4]) -> u8 {
	((reply[2] << 1) & 0xfe) | ((reply[3] >> 7) & 0x01)
}
