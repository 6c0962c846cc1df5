use std::fmt;

// I2C master controller status flags
const CONTROLLER_BUSY: u8 = 0x01; // all other bits invalid while set
const ERROR:           u8 = 0x02;
const ADDRESS_NACK:    u8 = 0x04;
const DATA_NACK:       u8 = 0x08;
const ARB_LOST:        u8 = 0x10;
const IDLE:            u8 = 0x20;
const BUS_BUSY:        u8 = 0x40;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControllerStatus(pub u8);

impl ControllerStatus {
	pub fn is_controller_busy(&self) -> bool {
		0 != self.0 & CONTROLLER_BUSY
	}
	pub fn is_error(&self) -> bool {
		0 != self.0 & ERROR
	}
	// the error bit alone already counts as "address not acknowledged"
	pub fn is_address_nack(&self) -> bool {
		0 != self.0 & (ERROR | ADDRESS_NACK)
	}
	pub fn is_data_nack(&self) -> bool {
		0 != self.0 & (ERROR | DATA_NACK)
	}
	pub fn is_arbitration_lost(&self) -> bool {
		0 != self.0 & (ERROR | ARB_LOST)
	}
	pub fn is_idle(&self) -> bool {
		0 != self.0 & IDLE
	}
	pub fn is_bus_busy(&self) -> bool {
		0 != self.0 & BUS_BUSY
	}
}

impl fmt::Display for ControllerStatus {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl fmt::Debug for ControllerStatus {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x} (", self.0)?;
		if 0 != self.0 & CONTROLLER_BUSY { write!(f, " [BUSY]")?; }
		if 0 != self.0 & ERROR { write!(f, " [ERROR]")?; }
		if 0 != self.0 & ADDRESS_NACK { write!(f, " [ADDRESS_NACK]")?; }
		if 0 != self.0 & DATA_NACK { write!(f, " [DATA_NACK]")?; }
		if 0 != self.0 & ARB_LOST { write!(f, " [ARB_LOST]")?; }
		if self.is_idle() { write!(f, " [IDLE]")?; }
		if self.is_bus_busy() { write!(f, " [BUS_BUSY]")?; }
		write!(f, " )")
	}
}

#[cfg(test)]
mod test {
	use super::ControllerStatus;

	#[test]
	fn predicates() {
		let s = ControllerStatus(0x40);
		assert!(s.is_bus_busy());
		assert!(!s.is_idle());
		assert!(!s.is_address_nack());

		let s = ControllerStatus(0x20);
		assert!(s.is_idle());
		assert!(!s.is_bus_busy());

		assert!(ControllerStatus(0x06).is_address_nack());
		assert!(ControllerStatus(0x02).is_address_nack());
		assert!(!ControllerStatus(0x08).is_address_nack());
		assert!(ControllerStatus(0x0a).is_data_nack());
		assert!(!ControllerStatus(0x00).is_address_nack());
	}

	#[test]
	fn debug_lists_flags() {
		assert_eq!(format!("{:?}", ControllerStatus(0x26)), "0x26 ( [ERROR] [ADDRESS_NACK] [IDLE] )");
		assert_eq!(ControllerStatus(0x26).to_string(), "0x26");
	}
}
