use crate::error::VmError;
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// how much RAM we have
pub const RAM_SIZE_BYTES: usize = 4096;

/// first address no access may touch. the last byte of RAM (0xfff) is never
/// addressable
pub const MEMORY_BOUND: u32 = 0x0FFF;

/// where the program is loaded, and where execution starts
pub const PROGRAM_ADDR: u16 = 0x0200;

/// where the hex digit sprites live
pub const FONT_ADDR: u16 = 0x0000;

/// bytes per digit sprite
pub const FONT_SPRITE_HEIGHT: u16 = 5;

/// Represents memory map, ROM, RAM etc.
pub trait MemoryMap {
    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<(), VmError> {
        self.get_rw_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// get a big-endian two-byte word
    fn get_word(&self, addr: u16) -> Result<u16, VmError> {
        let word = self.get_ro_slice(addr, 2)?;
        Ok(u16::from_be_bytes([word[0], word[1]]))
    }

    fn get_byte(&self, addr: u16) -> Result<u8, VmError> {
        Ok(self.get_ro_slice(addr, 1)?[0])
    }

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8], VmError>;

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8], VmError>;
}

/// fails unless every byte of `addr..addr + len` sits below MEMORY_BOUND
pub fn check_range(addr: u32, len: u32) -> Result<(), VmError> {
    if addr + len > MEMORY_BOUND {
        return Err(VmError::AddressFault { addr, len });
    }
    Ok(())
}

/// Defines the memory map used by the interpreter:
///   0x0000-0x004f  hex digit sprites
///   0x0050-0x01ff  reserved
///   0x0200-0x0ffe  program and its working data
///   0x0fff         out of bounds
///
/// the stack and display live outside addressable memory
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8MemoryMap {
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8], VmError> {
        check_range(addr as u32, len as u32)?;
        let a = addr as usize;
        Ok(&mut self.bytes[a..(a + len)])
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8], VmError> {
        check_range(addr as u32, len as u32)?;
        let a = addr as usize;
        Ok(&self.bytes[a..(a + len)])
    }
}

impl Chip8MemoryMap {
    /// zeroed memory with the digit sprites baked in
    pub fn new() -> Self {
        let mut bytes = vec![0u8; RAM_SIZE_BYTES].into_boxed_slice();
        let font = FONT_ADDR as usize;
        bytes[font..font + FONT.len()].copy_from_slice(&FONT);
        Chip8MemoryMap { bytes }
    }

    /// how many bytes a program may occupy
    pub fn program_capacity() -> usize {
        MEMORY_BOUND as usize - PROGRAM_ADDR as usize
    }

    /// load a program image at 0x200
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, VmError> {
        let mut image = Vec::new();
        reader.read_to_end(&mut image)?;
        if image.len() > Self::program_capacity() {
            return Err(VmError::ProgramTooLarge {
                len: image.len(),
                capacity: Self::program_capacity(),
            });
        }
        self.write(&image, PROGRAM_ADDR)?;
        Ok(image.len())
    }

    /// address of the sprite for hex digit `digit`
    pub fn digit_sprite_addr(digit: u8) -> Result<u16, VmError> {
        if digit >= 16 {
            return Err(VmError::InvalidDigit { value: digit });
        }
        Ok(FONT_ADDR + digit as u16 * FONT_SPRITE_HEIGHT)
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8MemoryMap::new();
        // NB. memory is zeroed from 0x50 because before that we bake in the font
        assert!(m.bytes[0x50..].iter().all(|b| *b == 0));
        assert_eq!(m.bytes.len(), RAM_SIZE_BYTES);
    }

    #[test]
    fn test_font_at_zero() -> Result<(), VmError> {
        let m = Chip8MemoryMap::new();
        assert_eq!(m.get_ro_slice(0, 5)?, &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        let f = Chip8MemoryMap::digit_sprite_addr(0xF)?;
        assert_eq!(f, 75);
        assert_eq!(m.get_ro_slice(f, 5)?, &[0xF0, 0x80, 0xF0, 0x80, 0x80]);
        Ok(())
    }

    #[test]
    fn test_digit_out_of_range() {
        assert!(matches!(
            Chip8MemoryMap::digit_sprite_addr(16),
            Err(VmError::InvalidDigit { value: 16 })
        ));
    }

    #[test]
    fn test_write_data_ok() -> Result<(), VmError> {
        let mut dst = Chip8MemoryMap::new();
        dst.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x300)?;
        assert_eq!(
            dst.bytes[0x2f8..0x308],
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7]
        );
        Ok(())
    }

    #[test]
    fn test_read_word() -> Result<(), VmError> {
        let mut m = Chip8MemoryMap::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x200)?;
        assert_eq!(m.get_word(0x204)?, 0x0405);
        assert_eq!(m.get_byte(0x207)?, 7);
        Ok(())
    }

    #[test]
    fn test_last_addressable_byte() -> Result<(), VmError> {
        let mut m = Chip8MemoryMap::new();
        m.write(&[0xAB], 0xFFE)?;
        assert_eq!(m.get_byte(0xFFE)?, 0xAB);
        assert!(matches!(
            m.get_byte(0xFFF),
            Err(VmError::AddressFault { addr: 0xFFF, len: 1 })
        ));
        assert!(m.get_word(0xFFE).is_err());
        Ok(())
    }

    #[test]
    fn test_write_too_much_faults() {
        let mut dst = Chip8MemoryMap::new();
        assert!(matches!(
            dst.write(&[0; 8], 4089),
            Err(VmError::AddressFault { addr: 4089, len: 8 })
        ));
        assert!(dst.bytes[4089..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_program_load_ok() -> Result<(), VmError> {
        let mut dst = Chip8MemoryMap::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(dst.load_program(&mut prog)?, 2);
        assert_eq!(dst.get_ro_slice(0x200, 2)?, &[0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_program_too_large() {
        let mut dst = Chip8MemoryMap::new();
        let image = vec![0u8; Chip8MemoryMap::program_capacity() + 1];
        let mut reader: &[u8] = &image;
        assert!(matches!(
            dst.load_program(&mut reader),
            Err(VmError::ProgramTooLarge { capacity: 3583, .. })
        ));
    }

    #[test]
    fn test_program_fills_capacity() -> Result<(), VmError> {
        let mut dst = Chip8MemoryMap::new();
        let image = vec![0x12u8; Chip8MemoryMap::program_capacity()];
        let mut reader: &[u8] = &image;
        dst.load_program(&mut reader)?;
        assert_eq!(dst.get_byte(0xFFE)?, 0x12);
        Ok(())
    }
}
