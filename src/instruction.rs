/// # instruction
///
/// Every instruction is one big-endian 16-bit word. The fields overlap:
///
/// ```text
///  15   12 11    8 7     4 3     0
/// +-------+-------+-------+-------+
/// |opcode |   x   |   y   |   n   |
/// +-------+-------+-------+-------+
///                 |      nn       |
///         |          nnn          |
/// ```
///
/// decoding never fails; whether a word means anything is decided when it's
/// executed
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Instruction(u16);

impl Instruction {
    /// reassemble a word from the two bytes as stored in memory
    pub fn from_bytes(hi: u8, lo: u8) -> Self {
        Instruction(u16::from_be_bytes([hi, lo]))
    }

    pub fn word(&self) -> u16 {
        self.0
    }

    /// instruction family
    pub fn opcode(&self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// first register index
    pub fn x(&self) -> usize {
        ((self.0 >> 8) & 0x0F) as usize
    }

    /// second register index
    pub fn y(&self) -> usize {
        ((self.0 >> 4) & 0x0F) as usize
    }

    /// 4-bit immediate; sub-opcode for the 0x8 family
    pub fn n(&self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    /// 8-bit immediate; sub-opcode for the 0xE and 0xF families
    pub fn nn(&self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// 12-bit address
    pub fn nnn(&self) -> u16 {
        self.0 & 0x0FFF
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Self {
        Instruction(word)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X} ({})", self.0, self)
    }
}

/// conventional mnemonics, for traces and listings
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, n, nn, nnn) = (self.x(), self.y(), self.n(), self.nn(), self.nnn());
        match (self.opcode(), nnn, n, nn) {
            (0x0, 0x0E0, _, _) => write!(f, "CLS"),
            (0x0, 0x0EE, _, _) => write!(f, "RET"),
            (0x1, ..) => write!(f, "JP 0x{:03X}", nnn),
            (0x2, ..) => write!(f, "CALL 0x{:03X}", nnn),
            (0x3, ..) => write!(f, "SE V{:X}, 0x{:02X}", x, nn),
            (0x4, ..) => write!(f, "SNE V{:X}, 0x{:02X}", x, nn),
            (0x5, _, 0x0, _) => write!(f, "SE V{:X}, V{:X}", x, y),
            (0x6, ..) => write!(f, "LD V{:X}, 0x{:02X}", x, nn),
            (0x7, ..) => write!(f, "ADD V{:X}, 0x{:02X}", x, nn),
            (0x8, _, 0x0, _) => write!(f, "LD V{:X}, V{:X}", x, y),
            (0x8, _, 0x1, _) => write!(f, "OR V{:X}, V{:X}", x, y),
            (0x8, _, 0x2, _) => write!(f, "AND V{:X}, V{:X}", x, y),
            (0x8, _, 0x3, _) => write!(f, "XOR V{:X}, V{:X}", x, y),
            (0x8, _, 0x4, _) => write!(f, "ADD V{:X}, V{:X}", x, y),
            (0x8, _, 0x5, _) => write!(f, "SUB V{:X}, V{:X}", x, y),
            (0x8, _, 0x6, _) => write!(f, "SHR V{:X}", x),
            (0x8, _, 0x7, _) => write!(f, "SUBN V{:X}, V{:X}", x, y),
            (0x8, _, 0xE, _) => write!(f, "SHL V{:X}", x),
            (0x9, _, 0x0, _) => write!(f, "SNE V{:X}, V{:X}", x, y),
            (0xA, ..) => write!(f, "LD I, 0x{:03X}", nnn),
            (0xB, ..) => write!(f, "JP V0, 0x{:03X}", nnn),
            (0xC, ..) => write!(f, "RND V{:X}, 0x{:02X}", x, nn),
            (0xD, ..) => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            (0xE, _, _, 0x9E) => write!(f, "SKP V{:X}", x),
            (0xE, _, _, 0xA1) => write!(f, "SKNP V{:X}", x),
            (0xF, _, _, 0x06) => write!(f, "LD V{:X}, DT", x),
            (0xF, _, _, 0x0A) => write!(f, "LD V{:X}, K", x),
            (0xF, _, _, 0x15) => write!(f, "LD DT, V{:X}", x),
            (0xF, _, _, 0x18) => write!(f, "LD ST, V{:X}", x),
            (0xF, _, _, 0x1E) => write!(f, "ADD I, V{:X}", x),
            (0xF, _, _, 0x29) => write!(f, "LD F, V{:X}", x),
            (0xF, _, _, 0x33) => write!(f, "LD B, V{:X}", x),
            (0xF, _, _, 0x55) => write!(f, "LD [I], V{:X}", x),
            (0xF, _, _, 0x65) => write!(f, "LD V{:X}, [I]", x),
            _ => write!(f, "DW 0x{:04X}", self.0),
        }
    }
}

/// disassemble a program image, one line per word, addressed from `origin`
pub fn disassemble(program: &[u8], origin: u16) -> Vec<String> {
    program
        .chunks(2)
        .enumerate()
        .map(|(idx, pair)| {
            let addr = origin as usize + idx * 2;
            match pair {
                [hi, lo] => format!("{:03X}: {}", addr, Instruction::from_bytes(*hi, *lo)),
                [odd] => format!("{:03X}: DB 0x{:02X}", addr, odd),
                _ => unreachable!("chunks(2) yields one or two bytes"),
            }
        })
        .collect()
}
