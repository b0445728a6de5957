///
/// ## Design
///
/// * one fixed instruction set: the 35 classic CHIP-8 instructions, minus
///   machine-language calls. no SUPER-CHIP
/// * 4K memory map, font at 0x000, programs at 0x200; 0xfff is never
///   addressable
/// * abstract display so can plug alternatives; starting with TUI in-console
/// * fatal conditions come back as a typed `VmError` from `step`; nothing
///   in the library exits the process
/// * instructions are paced against the wall clock, separately from the
///   60Hz timers, so throughput and timer cadence don't depend on each other
///
/// Model
///
/// main
///  |-- display, input, sound, config
///  |-- interpreter(display, input, sound)
///  |    |-- machine state: registers, stack, framebuffer, memory
///  |    `-- step() -> fetch, decode, execute
///  `-- runner::run(interpreter, config, cancel)
///       |-- fire any timer ticks that are due
///       |-- sleep until the next instruction is due
///       |-- interpreter.step()?
///       `-- stop on cancel, instruction limit, idle or fault
pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod runner;
pub mod sound;

pub use error::VmError;
pub use interpreter::{Chip8Interpreter, StepOutcome};
pub use runner::{CancelToken, RunOutcome, RunSummary};
