use super::addressing_mode::AddressingMode;
use super::opcode::Opcode;

/// Maps every opcode byte to the `(Opcode, AddressingMode)` pair it decodes to.
///
/// A dense 256-entry opcode → `(Opcode, AddressingMode)` table covering exactly the 151
/// documented NMOS 6502 opcodes. Entries left as `None` are the illegal/undocumented opcodes;
/// decoding one of them raises the CPU's op-trap flag rather than dispatching to a handler.
pub static INSTRUCTIONS: [Option<(Opcode, AddressingMode)>; 256] = [
    /*0x00*/ Some((Opcode::BRK, AddressingMode::Implied)),
    /*0x01*/ Some((Opcode::ORA, AddressingMode::IndexedIndirect)),
    /*0x02*/ None,
    /*0x03*/ None,
    /*0x04*/ None,
    /*0x05*/ Some((Opcode::ORA, AddressingMode::ZeroPage)),
    /*0x06*/ Some((Opcode::ASL, AddressingMode::ZeroPage)),
    /*0x07*/ None,
    /*0x08*/ Some((Opcode::PHP, AddressingMode::Implied)),
    /*0x09*/ Some((Opcode::ORA, AddressingMode::Immediate)),
    /*0x0A*/ Some((Opcode::ASL, AddressingMode::Accumulator)),
    /*0x0B*/ None,
    /*0x0C*/ None,
    /*0x0D*/ Some((Opcode::ORA, AddressingMode::Absolute)),
    /*0x0E*/ Some((Opcode::ASL, AddressingMode::Absolute)),
    /*0x0F*/ None,
    /*0x10*/ Some((Opcode::BPL, AddressingMode::Relative)),
    /*0x11*/ Some((Opcode::ORA, AddressingMode::IndirectIndexed)),
    /*0x12*/ None,
    /*0x13*/ None,
    /*0x14*/ None,
    /*0x15*/ Some((Opcode::ORA, AddressingMode::ZeroPageX)),
    /*0x16*/ Some((Opcode::ASL, AddressingMode::ZeroPageX)),
    /*0x17*/ None,
    /*0x18*/ Some((Opcode::CLC, AddressingMode::Implied)),
    /*0x19*/ Some((Opcode::ORA, AddressingMode::AbsoluteY)),
    /*0x1A*/ None,
    /*0x1B*/ None,
    /*0x1C*/ None,
    /*0x1D*/ Some((Opcode::ORA, AddressingMode::AbsoluteX)),
    /*0x1E*/ Some((Opcode::ASL, AddressingMode::AbsoluteX)),
    /*0x1F*/ None,
    /*0x20*/ Some((Opcode::JSR, AddressingMode::Absolute)),
    /*0x21*/ Some((Opcode::AND, AddressingMode::IndexedIndirect)),
    /*0x22*/ None,
    /*0x23*/ None,
    /*0x24*/ Some((Opcode::BIT, AddressingMode::ZeroPage)),
    /*0x25*/ Some((Opcode::AND, AddressingMode::ZeroPage)),
    /*0x26*/ Some((Opcode::ROL, AddressingMode::ZeroPage)),
    /*0x27*/ None,
    /*0x28*/ Some((Opcode::PLP, AddressingMode::Implied)),
    /*0x29*/ Some((Opcode::AND, AddressingMode::Immediate)),
    /*0x2A*/ Some((Opcode::ROL, AddressingMode::Accumulator)),
    /*0x2B*/ None,
    /*0x2C*/ Some((Opcode::BIT, AddressingMode::Absolute)),
    /*0x2D*/ Some((Opcode::AND, AddressingMode::Absolute)),
    /*0x2E*/ Some((Opcode::ROL, AddressingMode::Absolute)),
    /*0x2F*/ None,
    /*0x30*/ Some((Opcode::BMI, AddressingMode::Relative)),
    /*0x31*/ Some((Opcode::AND, AddressingMode::IndirectIndexed)),
    /*0x32*/ None,
    /*0x33*/ None,
    /*0x34*/ None,
    /*0x35*/ Some((Opcode::AND, AddressingMode::ZeroPageX)),
    /*0x36*/ Some((Opcode::ROL, AddressingMode::ZeroPageX)),
    /*0x37*/ None,
    /*0x38*/ Some((Opcode::SEC, AddressingMode::Implied)),
    /*0x39*/ Some((Opcode::AND, AddressingMode::AbsoluteY)),
    /*0x3A*/ None,
    /*0x3B*/ None,
    /*0x3C*/ None,
    /*0x3D*/ Some((Opcode::AND, AddressingMode::AbsoluteX)),
    /*0x3E*/ Some((Opcode::ROL, AddressingMode::AbsoluteX)),
    /*0x3F*/ None,
    /*0x40*/ Some((Opcode::RTI, AddressingMode::Implied)),
    /*0x41*/ Some((Opcode::EOR, AddressingMode::IndexedIndirect)),
    /*0x42*/ None,
    /*0x43*/ None,
    /*0x44*/ None,
    /*0x45*/ Some((Opcode::EOR, AddressingMode::ZeroPage)),
    /*0x46*/ Some((Opcode::LSR, AddressingMode::ZeroPage)),
    /*0x47*/ None,
    /*0x48*/ Some((Opcode::PHA, AddressingMode::Implied)),
    /*0x49*/ Some((Opcode::EOR, AddressingMode::Immediate)),
    /*0x4A*/ Some((Opcode::LSR, AddressingMode::Accumulator)),
    /*0x4B*/ None,
    /*0x4C*/ Some((Opcode::JMP, AddressingMode::Absolute)),
    /*0x4D*/ Some((Opcode::EOR, AddressingMode::Absolute)),
    /*0x4E*/ Some((Opcode::LSR, AddressingMode::Absolute)),
    /*0x4F*/ None,
    /*0x50*/ Some((Opcode::BVC, AddressingMode::Relative)),
    /*0x51*/ Some((Opcode::EOR, AddressingMode::IndirectIndexed)),
    /*0x52*/ None,
    /*0x53*/ None,
    /*0x54*/ None,
    /*0x55*/ Some((Opcode::EOR, AddressingMode::ZeroPageX)),
    /*0x56*/ Some((Opcode::LSR, AddressingMode::ZeroPageX)),
    /*0x57*/ None,
    /*0x58*/ Some((Opcode::CLI, AddressingMode::Implied)),
    /*0x59*/ Some((Opcode::EOR, AddressingMode::AbsoluteY)),
    /*0x5A*/ None,
    /*0x5B*/ None,
    /*0x5C*/ None,
    /*0x5D*/ Some((Opcode::EOR, AddressingMode::AbsoluteX)),
    /*0x5E*/ Some((Opcode::LSR, AddressingMode::AbsoluteX)),
    /*0x5F*/ None,
    /*0x60*/ Some((Opcode::RTS, AddressingMode::Implied)),
    /*0x61*/ Some((Opcode::ADC, AddressingMode::IndexedIndirect)),
    /*0x62*/ None,
    /*0x63*/ None,
    /*0x64*/ None,
    /*0x65*/ Some((Opcode::ADC, AddressingMode::ZeroPage)),
    /*0x66*/ Some((Opcode::ROR, AddressingMode::ZeroPage)),
    /*0x67*/ None,
    /*0x68*/ Some((Opcode::PLA, AddressingMode::Implied)),
    /*0x69*/ Some((Opcode::ADC, AddressingMode::Immediate)),
    /*0x6A*/ Some((Opcode::ROR, AddressingMode::Accumulator)),
    /*0x6B*/ None,
    /*0x6C*/ Some((Opcode::JMP, AddressingMode::Indirect)),
    /*0x6D*/ Some((Opcode::ADC, AddressingMode::Absolute)),
    /*0x6E*/ Some((Opcode::ROR, AddressingMode::Absolute)),
    /*0x6F*/ None,
    /*0x70*/ Some((Opcode::BVS, AddressingMode::Relative)),
    /*0x71*/ Some((Opcode::ADC, AddressingMode::IndirectIndexed)),
    /*0x72*/ None,
    /*0x73*/ None,
    /*0x74*/ None,
    /*0x75*/ Some((Opcode::ADC, AddressingMode::ZeroPageX)),
    /*0x76*/ Some((Opcode::ROR, AddressingMode::ZeroPageX)),
    /*0x77*/ None,
    /*0x78*/ Some((Opcode::SEI, AddressingMode::Implied)),
    /*0x79*/ Some((Opcode::ADC, AddressingMode::AbsoluteY)),
    /*0x7A*/ None,
    /*0x7B*/ None,
    /*0x7C*/ None,
    /*0x7D*/ Some((Opcode::ADC, AddressingMode::AbsoluteX)),
    /*0x7E*/ Some((Opcode::ROR, AddressingMode::AbsoluteX)),
    /*0x7F*/ None,
    /*0x80*/ None,
    /*0x81*/ Some((Opcode::STA, AddressingMode::IndexedIndirect)),
    /*0x82*/ None,
    /*0x83*/ None,
    /*0x84*/ Some((Opcode::STY, AddressingMode::ZeroPage)),
    /*0x85*/ Some((Opcode::STA, AddressingMode::ZeroPage)),
    /*0x86*/ Some((Opcode::STX, AddressingMode::ZeroPage)),
    /*0x87*/ None,
    /*0x88*/ Some((Opcode::DEY, AddressingMode::Implied)),
    /*0x89*/ None,
    /*0x8A*/ Some((Opcode::TXA, AddressingMode::Implied)),
    /*0x8B*/ None,
    /*0x8C*/ Some((Opcode::STY, AddressingMode::Absolute)),
    /*0x8D*/ Some((Opcode::STA, AddressingMode::Absolute)),
    /*0x8E*/ Some((Opcode::STX, AddressingMode::Absolute)),
    /*0x8F*/ None,
    /*0x90*/ Some((Opcode::BCC, AddressingMode::Relative)),
    /*0x91*/ Some((Opcode::STA, AddressingMode::IndirectIndexed)),
    /*0x92*/ None,
    /*0x93*/ None,
    /*0x94*/ Some((Opcode::STY, AddressingMode::ZeroPageX)),
    /*0x95*/ Some((Opcode::STA, AddressingMode::ZeroPageX)),
    /*0x96*/ Some((Opcode::STX, AddressingMode::ZeroPageY)),
    /*0x97*/ None,
    /*0x98*/ Some((Opcode::TYA, AddressingMode::Implied)),
    /*0x99*/ Some((Opcode::STA, AddressingMode::AbsoluteY)),
    /*0x9A*/ Some((Opcode::TXS, AddressingMode::Implied)),
    /*0x9B*/ None,
    /*0x9C*/ None,
    /*0x9D*/ Some((Opcode::STA, AddressingMode::AbsoluteX)),
    /*0x9E*/ None,
    /*0x9F*/ None,
    /*0xA0*/ Some((Opcode::LDY, AddressingMode::Immediate)),
    /*0xA1*/ Some((Opcode::LDA, AddressingMode::IndexedIndirect)),
    /*0xA2*/ Some((Opcode::LDX, AddressingMode::Immediate)),
    /*0xA3*/ None,
    /*0xA4*/ Some((Opcode::LDY, AddressingMode::ZeroPage)),
    /*0xA5*/ Some((Opcode::LDA, AddressingMode::ZeroPage)),
    /*0xA6*/ Some((Opcode::LDX, AddressingMode::ZeroPage)),
    /*0xA7*/ None,
    /*0xA8*/ Some((Opcode::TAY, AddressingMode::Implied)),
    /*0xA9*/ Some((Opcode::LDA, AddressingMode::Immediate)),
    /*0xAA*/ Some((Opcode::TAX, AddressingMode::Implied)),
    /*0xAB*/ None,
    /*0xAC*/ Some((Opcode::LDY, AddressingMode::Absolute)),
    /*0xAD*/ Some((Opcode::LDA, AddressingMode::Absolute)),
    /*0xAE*/ Some((Opcode::LDX, AddressingMode::Absolute)),
    /*0xAF*/ None,
    /*0xB0*/ Some((Opcode::BCS, AddressingMode::Relative)),
    /*0xB1*/ Some((Opcode::LDA, AddressingMode::IndirectIndexed)),
    /*0xB2*/ None,
    /*0xB3*/ None,
    /*0xB4*/ Some((Opcode::LDY, AddressingMode::ZeroPageX)),
    /*0xB5*/ Some((Opcode::LDA, AddressingMode::ZeroPageX)),
    /*0xB6*/ Some((Opcode::LDX, AddressingMode::ZeroPageY)),
    /*0xB7*/ None,
    /*0xB8*/ Some((Opcode::CLV, AddressingMode::Implied)),
    /*0xB9*/ Some((Opcode::LDA, AddressingMode::AbsoluteY)),
    /*0xBA*/ Some((Opcode::TSX, AddressingMode::Implied)),
    /*0xBB*/ None,
    /*0xBC*/ Some((Opcode::LDY, AddressingMode::AbsoluteX)),
    /*0xBD*/ Some((Opcode::LDA, AddressingMode::AbsoluteX)),
    /*0xBE*/ Some((Opcode::LDX, AddressingMode::AbsoluteY)),
    /*0xBF*/ None,
    /*0xC0*/ Some((Opcode::CPY, AddressingMode::Immediate)),
    /*0xC1*/ Some((Opcode::CMP, AddressingMode::IndexedIndirect)),
    /*0xC2*/ None,
    /*0xC3*/ None,
    /*0xC4*/ Some((Opcode::CPY, AddressingMode::ZeroPage)),
    /*0xC5*/ Some((Opcode::CMP, AddressingMode::ZeroPage)),
    /*0xC6*/ Some((Opcode::DEC, AddressingMode::ZeroPage)),
    /*0xC7*/ None,
    /*0xC8*/ Some((Opcode::INY, AddressingMode::Implied)),
    /*0xC9*/ Some((Opcode::CMP, AddressingMode::Immediate)),
    /*0xCA*/ Some((Opcode::DEX, AddressingMode::Implied)),
    /*0xCB*/ None,
    /*0xCC*/ Some((Opcode::CPY, AddressingMode::Absolute)),
    /*0xCD*/ Some((Opcode::CMP, AddressingMode::Absolute)),
    /*0xCE*/ Some((Opcode::DEC, AddressingMode::Absolute)),
    /*0xCF*/ None,
    /*0xD0*/ Some((Opcode::BNE, AddressingMode::Relative)),
    /*0xD1*/ Some((Opcode::CMP, AddressingMode::IndirectIndexed)),
    /*0xD2*/ None,
    /*0xD3*/ None,
    /*0xD4*/ None,
    /*0xD5*/ Some((Opcode::CMP, AddressingMode::ZeroPageX)),
    /*0xD6*/ Some((Opcode::DEC, AddressingMode::ZeroPageX)),
    /*0xD7*/ None,
    /*0xD8*/ Some((Opcode::CLD, AddressingMode::Implied)),
    /*0xD9*/ Some((Opcode::CMP, AddressingMode::AbsoluteY)),
    /*0xDA*/ None,
    /*0xDB*/ None,
    /*0xDC*/ None,
    /*0xDD*/ Some((Opcode::CMP, AddressingMode::AbsoluteX)),
    /*0xDE*/ Some((Opcode::DEC, AddressingMode::AbsoluteX)),
    /*0xDF*/ None,
    /*0xE0*/ Some((Opcode::CPX, AddressingMode::Immediate)),
    /*0xE1*/ Some((Opcode::SBC, AddressingMode::IndexedIndirect)),
    /*0xE2*/ None,
    /*0xE3*/ None,
    /*0xE4*/ Some((Opcode::CPX, AddressingMode::ZeroPage)),
    /*0xE5*/ Some((Opcode::SBC, AddressingMode::ZeroPage)),
    /*0xE6*/ Some((Opcode::INC, AddressingMode::ZeroPage)),
    /*0xE7*/ None,
    /*0xE8*/ Some((Opcode::INX, AddressingMode::Implied)),
    /*0xE9*/ Some((Opcode::SBC, AddressingMode::Immediate)),
    /*0xEA*/ Some((Opcode::NOP, AddressingMode::Implied)),
    /*0xEB*/ None,
    /*0xEC*/ Some((Opcode::CPX, AddressingMode::Absolute)),
    /*0xED*/ Some((Opcode::SBC, AddressingMode::Absolute)),
    /*0xEE*/ Some((Opcode::INC, AddressingMode::Absolute)),
    /*0xEF*/ None,
    /*0xF0*/ Some((Opcode::BEQ, AddressingMode::Relative)),
    /*0xF1*/ Some((Opcode::SBC, AddressingMode::IndirectIndexed)),
    /*0xF2*/ None,
    /*0xF3*/ None,
    /*0xF4*/ None,
    /*0xF5*/ Some((Opcode::SBC, AddressingMode::ZeroPageX)),
    /*0xF6*/ Some((Opcode::INC, AddressingMode::ZeroPageX)),
    /*0xF7*/ None,
    /*0xF8*/ Some((Opcode::SED, AddressingMode::Implied)),
    /*0xF9*/ Some((Opcode::SBC, AddressingMode::AbsoluteY)),
    /*0xFA*/ None,
    /*0xFB*/ None,
    /*0xFC*/ None,
    /*0xFD*/ Some((Opcode::SBC, AddressingMode::AbsoluteX)),
    /*0xFE*/ Some((Opcode::INC, AddressingMode::AbsoluteX)),
    /*0xFF*/ None,
];

/// Number of bytes an addressing mode consumes after the opcode byte itself.
impl AddressingMode {
    pub fn operand_len(&self) -> u16 {
        match self {
            AddressingMode::Implied => 0,
            AddressingMode::Accumulator => 0,
            AddressingMode::Immediate => 1,
            AddressingMode::ZeroPage => 1,
            AddressingMode::ZeroPageX => 1,
            AddressingMode::ZeroPageY => 1,
            AddressingMode::Relative => 1,
            AddressingMode::Absolute => 2,
            AddressingMode::AbsoluteX => 2,
            AddressingMode::AbsoluteY => 2,
            AddressingMode::Indirect => 2,
            AddressingMode::IndexedIndirect => 1,
            AddressingMode::IndirectIndexed => 1,
        }
    }
}

/// Total size in bytes of the instruction at `opcode`, including the opcode byte.
///
/// `BRK` is a special case: its addressing mode is `Implied` (no operand is read by the
/// decoder's addressing grid) but the instruction nonetheless occupies two bytes on the wire
/// -- the byte after the opcode is a padding/signature byte that `BRK`'s own handler skips by
/// advancing `pc` directly, matching the historical convention used by real monitors/debuggers.
pub fn instruction_size(opcode: u8) -> u8 {
    match INSTRUCTIONS[opcode as usize] {
        Some((Opcode::BRK, _)) => 2,
        Some((_, mode)) => 1 + mode.operand_len() as u8,
        None => 1,
    }
}
