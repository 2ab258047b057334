use super::error::{MemoryAccessError, Result};

/// `Bus` is the memory the CPU executes against. The CPU never owns one; every entry point
/// that can touch memory borrows a `&impl Bus` (or `&mut impl Bus` for writes) for the
/// duration of the call.
///
/// Both operations can fail -- a host may back part of its address space with a device that
/// rejects out-of-range or mid-transfer accesses -- so the CPU threads `MemoryAccessError`
/// out of every instruction that reads or writes memory.
pub trait Bus {
    fn write(&mut self, address: u16, data: u8) -> Result<()>;

    fn read(&self, address: u16) -> Result<u8>;

    /// Read a `u16` from the bus starting at `address`. Assumes little-endian order.
    fn read_u16(&self, address: u16) -> Result<u16> {
        let lo = self.read(address)?;
        let hi = self.read(address.wrapping_add(1))?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Write a `u16` to the bus starting at `address` in little-endian order.
    fn write_u16(&mut self, address: u16, value: u16) -> Result<()> {
        let [lo, hi] = value.to_le_bytes();
        self.write(address, lo)?;
        self.write(address.wrapping_add(1), hi)?;
        Ok(())
    }
}

/// A flat 64KiB RAM bus used for testing. Not part of the production contract -- it exists
/// purely to exercise `MOS6502` in this crate's own test suite.
pub struct RamBus {
    pub memory: [u8; RamBus::SIZE],
}

impl RamBus {
    /// If we have a 16-bit addressing scheme then we can address
    /// _65536_ bytes of memory in total.
    pub const SIZE: usize = 65536;

    pub fn new() -> RamBus {
        RamBus {
            memory: [0; RamBus::SIZE],
        }
    }

    pub fn with_reset_vector(mut self, address: u16) -> RamBus {
        self.write_u16(0xFFFC, address).unwrap();
        self
    }

    pub fn with_irq_vector(mut self, address: u16) -> RamBus {
        self.write_u16(0xFFFE, address).unwrap();
        self
    }

    /// Writes `bytes` starting at `start` and points the reset vector at `start`.
    pub fn with_program(self, bytes: Vec<u8>) -> RamBus {
        let start = 0x0200;
        self.with_memory_at(start, bytes).with_reset_vector(start)
    }

    /// Writes memory into RAM starting from address `0x0000`
    pub fn with_memory(self, bytes: Vec<u8>) -> RamBus {
        self.with_memory_at(0, bytes)
    }

    pub fn with_memory_at(mut self, start: u16, bytes: Vec<u8>) -> RamBus {
        let start = start as usize;
        self.memory[start..start + bytes.len()].copy_from_slice(&bytes[..]);
        self
    }
}

impl Default for RamBus {
    fn default() -> RamBus {
        RamBus::new()
    }
}

impl Bus for RamBus {
    fn write(&mut self, address: u16, data: u8) -> Result<()> {
        self.memory[address as usize] = data;
        Ok(())
    }

    fn read(&self, address: u16) -> Result<u8> {
        Ok(self.memory[address as usize])
    }
}

/// A `RamBus` that fails every access at one fixed address. Used to exercise the guarantee
/// that state mutated before a bus failure stays mutated.
pub struct FaultingBus {
    pub inner: RamBus,
    pub fail_at: u16,
}

impl Bus for FaultingBus {
    fn write(&mut self, address: u16, data: u8) -> Result<()> {
        if address == self.fail_at {
            Err(MemoryAccessError::new(address, "simulated write failure"))
        } else {
            self.inner.write(address, data)
        }
    }

    fn read(&self, address: u16) -> Result<u8> {
        if address == self.fail_at {
            Err(MemoryAccessError::new(address, "simulated read failure"))
        } else {
            self.inner.read(address)
        }
    }
}

/// Tests for `Bus`
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn read_u16_is_little_endian() {
        let mut bus = RamBus::new();
        bus.memory[0xAAAA] = 0x01;
        bus.memory[0xAAAB] = 0xFF;

        let result = bus.read_u16(0xAAAA).unwrap();
        assert_eq!(result, 0xFF01);
    }

    #[test]
    pub fn write_u16_is_little_endian() {
        let mut bus = RamBus::new();
        bus.write_u16(0xAAAA, 0xFF01).unwrap();

        assert_eq!(bus.memory[0xAAAA], 0x01);
        assert_eq!(bus.memory[0xAAAB], 0xFF);
    }

    /// Assuming we have a read/write device connected to the bus we should
    /// expect that `write_u16(m, a)` followed by `read_u16(m)` should be `a`
    #[test]
    pub fn write_u16_read_u16_roundtrip() {
        let mut bus = RamBus::new();
        bus.write_u16(0xBBAA, 0xBEEF).unwrap();

        let result = bus.read_u16(0xBBAA).unwrap();
        assert_eq!(result, 0xBEEF);
    }
}

/// Tests for `RamBus`
#[cfg(test)]
mod rambus_tests {
    use super::*;

    #[test]
    pub fn with_program_sets_reset_vector() {
        let bus = RamBus::new().with_program(vec![0xAA, 0xBB, 0xCC]);

        assert_eq!(bus.memory[0x0200], 0xAA);
        assert_eq!(bus.memory[0x0201], 0xBB);
        assert_eq!(bus.memory[0x0202], 0xCC);
        assert_eq!(bus.read_u16(0xFFFC).unwrap(), 0x0200);
    }

    #[test]
    pub fn faulting_bus_fails_only_at_the_chosen_address() {
        let bus = FaultingBus {
            inner: RamBus::new(),
            fail_at: 0x4000,
        };

        assert!(bus.read(0x4000).is_err());
        assert!(bus.read(0x4001).is_ok());
    }
}
