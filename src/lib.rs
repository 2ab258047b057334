//! A cycle-free, instruction-stepped simulation of the MOS Technology 6502 microprocessor.
//!
//! `step` executes exactly one instruction against a caller-provided [`mos6502::Bus`]; the
//! core never tracks cycle counts or owns the memory it runs against.

pub mod mos6502;

pub use mos6502::{
    Bus, FaultingBus, MemoryAccessError, RamBus, Result, Status, StatusFlag, MOS6502,
};
