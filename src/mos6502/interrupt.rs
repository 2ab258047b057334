/// The interrupt sources `interrupt()` can sequence through.
///
/// `NMI`'s vector is kept here for completeness -- this core doesn't dispatch it, since there's
/// no non-maskable interrupt line driving it. `RESET` and `BRK` are handled.
#[derive(PartialEq, Eq)]
pub enum Interrupt {
    NMI,
    RESET,
    IRQ,
    BRK,
}

pub const NMI_VECTOR_ADDRESS: u16 = 0xFFFA;
pub const IRQ_VECTOR_ADDRESS: u16 = 0xFFFE;
pub const RESET_VECTOR_ADDRESS: u16 = 0xFFFC;

impl Interrupt {
    pub fn maskable(&self) -> bool {
        *self == Interrupt::IRQ
    }

    pub fn vector_address(&self) -> u16 {
        match self {
            Interrupt::NMI => NMI_VECTOR_ADDRESS,
            Interrupt::RESET => RESET_VECTOR_ADDRESS,
            Interrupt::IRQ => IRQ_VECTOR_ADDRESS,
            Interrupt::BRK => IRQ_VECTOR_ADDRESS,
        }
    }
}
