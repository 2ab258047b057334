use thiserror::Error;

/// The only error this core can raise: a failure to read or write a byte on the bus.
///
/// The CPU never inspects or retries a `MemoryAccessError`; it propagates whatever the bus
/// implementation produced, annotated with the address that was being accessed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("memory access error at ${address:04X}: {message}")]
pub struct MemoryAccessError {
    pub address: u16,
    pub message: String,
}

impl MemoryAccessError {
    pub fn new(address: u16, message: impl Into<String>) -> MemoryAccessError {
        MemoryAccessError {
            address,
            message: message.into(),
        }
    }
}

pub type Result<A> = std::result::Result<A, MemoryAccessError>;
