/// # machine
///
/// Passive state the interpreter works on. Each piece guards its own
/// invariants: the stack refuses to grow past 16 entries or pop when empty,
/// memory refuses out-of-bounds access, the framebuffer clips rows past the
/// bottom edge.
use crate::error::VmError;
use crate::memory::{self, Chip8MemoryMap};
use log::debug;
use std::fmt;

pub const REGISTER_COUNT: usize = 16;

/// index of the register doubling as carry/borrow/collision flag
pub const FLAG: usize = 0xF;

pub const STACK_DEPTH: usize = 16;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Registers {
    /// general purpose V0-VF
    pub v: [u8; REGISTER_COUNT],
    /// address register
    pub i: u16,
    pub pc: u16,
    /// delay timer
    pub dt: u8,
    /// sound timer
    pub st: u8,
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PC:{:03X} I:{:03X} DT:{:02X} ST:{:02X} V:", self.pc, self.i, self.dt, self.st)?;
        for (idx, v) in self.v.iter().enumerate() {
            let sep = if idx == 0 { "" } else { " " };
            write!(f, "{}{:02X}", sep, v)?;
        }
        Ok(())
    }
}

/// return addresses for CALL/RET
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack {
    slots: [u16; STACK_DEPTH],
    sp: usize,
}

impl Stack {
    /// `pc` is only used to report where an overflow happened
    pub fn push(&mut self, addr: u16, pc: u16) -> Result<(), VmError> {
        if self.sp >= STACK_DEPTH {
            return Err(VmError::StackOverflow { pc });
        }
        self.slots[self.sp] = addr;
        self.sp += 1;
        debug!("push 0x{:03X} (depth {})", addr, self.sp);
        Ok(())
    }

    pub fn pop(&mut self, pc: u16) -> Result<u16, VmError> {
        if self.sp == 0 {
            return Err(VmError::StackUnderflow { pc });
        }
        self.sp -= 1;
        debug!("pop 0x{:03X} (depth {})", self.slots[self.sp], self.sp);
        Ok(self.slots[self.sp])
    }

    pub fn depth(&self) -> usize {
        self.sp
    }
}

/// 32 rows of 64 pixels. bit 63 of a row is the leftmost pixel
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    rows: [u64; DISPLAY_HEIGHT],
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            rows: [0; DISPLAY_HEIGHT],
        }
    }

    pub fn clear(&mut self) {
        self.rows = [0; DISPLAY_HEIGHT];
    }

    pub fn rows(&self) -> &[u64] {
        &self.rows
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT && self.rows[y] & (1 << (63 - x)) != 0
    }

    /// XOR one sprite byte into row `y`, its leftmost bit landing on column
    /// `x`. bits pushed past column 63 are lost. returns true if a set pixel
    /// was cleared. rows beyond the bottom edge are ignored
    pub fn xor_sprite_row(&mut self, x: u8, y: usize, byte: u8) -> bool {
        if y >= DISPLAY_HEIGHT {
            return false;
        }
        let bits = ((byte as u64) << 56).checked_shr(x as u32).unwrap_or(0);
        let collided = self.rows[y] & bits != 0;
        self.rows[y] ^= bits;
        collided
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows.iter() {
            writeln!(f, "{:064b}", row)?;
        }
        Ok(())
    }
}

/// everything a running program can see
pub struct MachineState {
    pub registers: Registers,
    pub stack: Stack,
    pub framebuffer: Framebuffer,
    pub memory: Chip8MemoryMap,
}

impl MachineState {
    /// fresh machine with the font loaded and pc at the program start
    pub fn new() -> Self {
        MachineState {
            registers: Registers {
                pc: memory::PROGRAM_ADDR,
                ..Registers::default()
            },
            stack: Stack::default(),
            framebuffer: Framebuffer::new(),
            memory: Chip8MemoryMap::new(),
        }
    }

    /// one 60Hz tick: count both timers down towards zero
    pub fn tick_timers(&mut self) {
        self.registers.dt = self.registers.dt.saturating_sub(1);
        self.registers.st = self.registers.st.saturating_sub(1);
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let m = MachineState::new();
        assert_eq!(m.registers.pc, 0x200);
        assert_eq!(m.registers.v, [0; 16]);
        assert_eq!(m.stack.depth(), 0);
        assert!(m.framebuffer.rows().iter().all(|r| *r == 0));
    }

    #[test]
    fn test_stack_depth_limits() -> Result<(), VmError> {
        let mut s = Stack::default();
        for n in 0..16 {
            s.push(0x200 + n * 2, 0x300)?;
        }
        assert!(matches!(
            s.push(0x400, 0x300),
            Err(VmError::StackOverflow { pc: 0x300 })
        ));
        assert_eq!(s.depth(), 16);
        for n in (0..16).rev() {
            assert_eq!(s.pop(0x300)?, 0x200 + n * 2);
        }
        assert!(matches!(
            s.pop(0x300),
            Err(VmError::StackUnderflow { pc: 0x300 })
        ));
        Ok(())
    }

    #[test]
    fn test_timers_stop_at_zero() {
        let mut m = MachineState::new();
        m.registers.dt = 2;
        m.registers.st = 1;
        m.tick_timers();
        assert_eq!((m.registers.dt, m.registers.st), (1, 0));
        m.tick_timers();
        m.tick_timers();
        assert_eq!((m.registers.dt, m.registers.st), (0, 0));
    }

    #[test]
    fn test_sprite_row_placement() {
        let mut fb = Framebuffer::new();
        assert!(!fb.xor_sprite_row(0, 0, 0xF0));
        assert_eq!(fb.rows()[0], 0xF000_0000_0000_0000);
        assert!(fb.pixel(0, 0) && fb.pixel(3, 0) && !fb.pixel(4, 0));

        fb.xor_sprite_row(60, 1, 0xFF);
        assert_eq!(fb.rows()[1], 0x0F);

        fb.xor_sprite_row(200, 2, 0xFF);
        assert_eq!(fb.rows()[2], 0);
    }

    #[test]
    fn test_sprite_row_collision_and_clip() {
        let mut fb = Framebuffer::new();
        fb.xor_sprite_row(8, 5, 0x81);
        assert!(fb.xor_sprite_row(8, 5, 0x80));
        assert_eq!(fb.rows()[5], 0x0001_0000_0000_0000);
        assert!(!fb.xor_sprite_row(0, 32, 0xFF));
    }

    #[test]
    fn test_register_dump() {
        let mut r = Registers::default();
        r.pc = 0x202;
        r.v[0xF] = 1;
        let dump = format!("{:?}", r);
        assert!(dump.starts_with("PC:202 I:000 DT:00 ST:00 V:00 "));
        assert!(dump.ends_with(" 01"));
    }
}
