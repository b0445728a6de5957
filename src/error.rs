use std::io;
use thiserror::Error;

/// Conditions that stop the interpreter. None of these are retried; the
/// machine state is left as it was when the fault was detected, so a caller
/// can inspect it before deciding to halt, log or reset.
#[derive(Debug, Error)]
pub enum VmError {
    /// A fetch or data access would reach 0xFFF or beyond.
    #[error("address fault: {len} byte(s) at 0x{addr:03X} exceed addressable memory")]
    AddressFault { addr: u32, len: u32 },

    /// CALL with all 16 return slots in use.
    #[error("stack overflow at PC 0x{pc:03X}")]
    StackOverflow { pc: u16 },

    /// RET with nothing on the stack.
    #[error("stack underflow at PC 0x{pc:03X}")]
    StackUnderflow { pc: u16 },

    /// The sub-opcode field holds a value the instruction does not allow.
    #[error("invalid encoding 0x{word:04X} at PC 0x{pc:03X}")]
    InvalidEncoding { word: u16, pc: u16 },

    /// A digit sprite or key lookup outside 0x0..=0xF.
    #[error("'{value}' is not a hexadecimal digit")]
    InvalidDigit { value: u8 },

    /// Opcode/sub-opcode combination not defined by the instruction set.
    #[error("unsupported instruction 0x{word:04X} at PC 0x{pc:03X}")]
    UnsupportedInstruction { word: u16, pc: u16 },

    /// ROM image doesn't fit between 0x200 and the end of addressable memory.
    #[error("program is {len} bytes but only {capacity} fit in memory")]
    ProgramTooLarge { len: usize, capacity: usize },

    /// Failure in a display or input device, or while reading a ROM.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl VmError {
    /// true for the conditions raised by executing a program, as opposed to
    /// host-side loading or device failures
    pub fn is_program_fault(&self) -> bool {
        !matches!(self, VmError::ProgramTooLarge { .. } | VmError::Io(_))
    }
}
