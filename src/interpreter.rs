/// # interpreter
///
/// Fetch, decode and execute, one instruction per `step`. The interpreter
/// owns the machine state and borrows the devices it talks to:
///
///  * display  -- told about every clear and every sprite draw
///  * input    -- keypad state, key waits and the random bytes for RND
///  * sound    -- switched on and off as the sound timer starts and runs out
///
/// timers aren't counted down by `step`; whoever drives the interpreter calls
/// `tick_timers` at 60Hz, independent of how fast instructions run.
use crate::error::VmError;
use crate::instruction::Instruction;
use crate::machine::{MachineState, DISPLAY_HEIGHT, FLAG};
use crate::memory::{check_range, Chip8MemoryMap, MemoryMap, MEMORY_BOUND};
use crate::{display, input, sound};
use log::{debug, info, trace, warn};
use std::io;

/// what a single step did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// instruction ran to completion
    Executed,
    /// waiting for a key press; the same instruction runs again next step
    WaitingForKey,
    /// a jump to its own address; nothing will change until a timer fires
    Idle,
}

pub struct Chip8Interpreter<'a> {
    state: MachineState,
    display: &'a mut dyn display::Display,
    input: &'a mut dyn input::Input,
    sound: &'a mut dyn sound::Sound,
    sounding: bool,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        display: &'a mut dyn display::Display,
        input: &'a mut dyn input::Input,
        sound: &'a mut dyn sound::Sound,
    ) -> Chip8Interpreter<'a> {
        Chip8Interpreter {
            state: MachineState::new(),
            display,
            input,
            sound,
            sounding: false,
        }
    }

    /// load a chip8 program at 0x200, returning its size
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, VmError> {
        let len = self.state.memory.load_program(reader)?;
        info!("loaded {} byte program", len);
        Ok(len)
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    /// one 60Hz timer tick. also starts and stops the buzzer
    pub fn tick_timers(&mut self) {
        let was_running = self.state.registers.dt > 0;
        self.state.tick_timers();
        if was_running && self.state.registers.dt == 0 {
            debug!("delay timer expired");
        }
        self.update_sound();
    }

    /// fetch, decode and execute the instruction at pc
    pub fn step(&mut self) -> Result<StepOutcome, VmError> {
        let pc = self.state.registers.pc;
        if pc as u32 + 2 >= MEMORY_BOUND {
            return Err(VmError::AddressFault {
                addr: pc as u32,
                len: 2,
            });
        }
        let instruction = Instruction::from(self.state.memory.get_word(pc)?);
        self.state.registers.pc = pc + 2;
        trace!("{:03X}: {:?}  {:?}", pc, instruction, self.state.registers);
        self.execute(instruction, pc)
    }

    /// run one decoded instruction, fetched from `at`. pc must already point
    /// past it
    fn execute(&mut self, instruction: Instruction, at: u16) -> Result<StepOutcome, VmError> {
        let regs = &mut self.state.registers;
        let x = instruction.x();
        let y = instruction.y();
        let nn = instruction.nn();
        let nnn = instruction.nnn();
        let unsupported = VmError::UnsupportedInstruction {
            word: instruction.word(),
            pc: at,
        };

        match instruction.opcode() {
            0x0 => match nnn {
                0x0E0 => {
                    self.state.framebuffer.clear();
                    self.display.clear()?;
                }
                0x0EE => regs.pc = self.state.stack.pop(at)?,
                _ => return Err(unsupported),
            },
            0x1 => {
                regs.pc = nnn;
                if nnn == at {
                    return Ok(StepOutcome::Idle);
                }
            }
            0x2 => {
                self.state.stack.push(regs.pc, at)?;
                regs.pc = nnn;
            }
            0x3 => {
                if regs.v[x] == nn {
                    regs.pc = regs.pc.wrapping_add(2);
                }
            }
            0x4 => {
                if regs.v[x] != nn {
                    regs.pc = regs.pc.wrapping_add(2);
                }
            }
            0x5 => {
                require_zero_n(instruction, at)?;
                if regs.v[x] == regs.v[y] {
                    regs.pc = regs.pc.wrapping_add(2);
                }
            }
            0x6 => regs.v[x] = nn,
            0x7 => regs.v[x] = regs.v[x].wrapping_add(nn),
            0x8 => self.register_op(instruction, at)?,
            0x9 => {
                require_zero_n(instruction, at)?;
                if regs.v[x] != regs.v[y] {
                    regs.pc = regs.pc.wrapping_add(2);
                }
            }
            0xA => regs.i = nnn,
            0xB => regs.pc = regs.v[0] as u16 + nnn,
            0xC => regs.v[x] = self.input.random_byte() & nn,
            0xD => self.draw(instruction)?,
            0xE => {
                let pressed = match nn {
                    0x9E => true,
                    0xA1 => false,
                    _ => return Err(unsupported),
                };
                let key = regs.v[x];
                if self.key_down(key)? == pressed {
                    let regs = &mut self.state.registers;
                    regs.pc = regs.pc.wrapping_add(2);
                }
            }
            0xF => return self.misc_op(instruction, at),
            _ => return Err(unsupported),
        }
        Ok(StepOutcome::Executed)
    }

    /// the 0x8 family. ADD works out its sum before touching VF, so with x = VF
    /// the sum wins. SUB, SHR, SUBN and SHL write VF first and then operate on
    /// whatever the registers hold, so with x = VF they act on the new flag
    fn register_op(&mut self, instruction: Instruction, at: u16) -> Result<(), VmError> {
        let v = &mut self.state.registers.v;
        let (x, y) = (instruction.x(), instruction.y());
        match instruction.n() {
            0x0 => v[x] = v[y],
            0x1 => v[x] |= v[y],
            0x2 => v[x] &= v[y],
            0x3 => v[x] ^= v[y],
            0x4 => {
                let (sum, carry) = v[x].overflowing_add(v[y]);
                v[FLAG] = carry as u8;
                v[x] = sum;
            }
            0x5 => {
                v[FLAG] = (v[x] > v[y]) as u8;
                v[x] = v[x].wrapping_sub(v[y]);
            }
            0x6 => {
                v[FLAG] = v[x] & 1;
                v[x] >>= 1;
            }
            0x7 => {
                v[FLAG] = (v[y] > v[x]) as u8;
                v[x] = v[y].wrapping_sub(v[x]);
            }
            0xE => {
                v[FLAG] = v[x] >> 7;
                v[x] <<= 1;
            }
            _ => {
                return Err(VmError::InvalidEncoding {
                    word: instruction.word(),
                    pc: at,
                })
            }
        }
        Ok(())
    }

    /// XOR an n-row sprite from I onto the screen at (VX, VY). rows falling
    /// off the bottom are dropped, pixels falling off the right are lost. VF
    /// ends up 1 if any lit pixel was switched off. the sprite rows that will
    /// be drawn are bounds checked before anything changes
    fn draw(&mut self, instruction: Instruction) -> Result<(), VmError> {
        let vx = self.state.registers.v[instruction.x()];
        let top = self.state.registers.v[instruction.y()] as usize;
        let i = self.state.registers.i;
        let drawn = (instruction.n() as usize).min(DISPLAY_HEIGHT.saturating_sub(top));
        if drawn > 0 {
            check_range(i as u32, drawn as u32)?;
        }

        let mut collided = false;
        for row in 0..drawn {
            let byte = self.state.memory.get_byte(i + row as u16)?;
            collided |= self.state.framebuffer.xor_sprite_row(vx, top + row, byte);
        }

        self.state.registers.v[FLAG] = collided as u8;
        if drawn > 0 {
            let rows = &self.state.framebuffer.rows()[top..top + drawn];
            self.display.update_region(top, rows)?;
        }
        Ok(())
    }

    fn key_down(&mut self, key: u8) -> Result<bool, VmError> {
        if key as usize >= input::KEY_COUNT {
            return Err(VmError::InvalidDigit { value: key });
        }
        Ok(self.input.is_key_down(key)?)
    }

    /// the 0xF family: timers, I arithmetic and memory block transfers
    fn misc_op(&mut self, instruction: Instruction, at: u16) -> Result<StepOutcome, VmError> {
        let x = instruction.x();
        let vx = self.state.registers.v[x];
        let i = self.state.registers.i;

        match instruction.nn() {
            0x06 => self.state.registers.v[x] = self.state.registers.dt,
            0x0A => match self.input.next_key_press()? {
                Some(key) => {
                    debug!("V{:X} <- key {:X}", x, key);
                    self.state.registers.v[x] = key & 0x0F;
                }
                None => {
                    self.state.registers.pc = at;
                    return Ok(StepOutcome::WaitingForKey);
                }
            },
            0x15 => self.state.registers.dt = vx,
            0x18 => {
                self.state.registers.st = vx;
                self.update_sound();
            }
            0x1E => self.state.registers.i = i.wrapping_add(vx as u16),
            0x29 => self.state.registers.i = Chip8MemoryMap::digit_sprite_addr(vx)?,
            0x33 => {
                let digits = [vx / 100 % 10, vx / 10 % 10, vx % 10];
                self.state.memory.write(&digits, i)?;
            }
            0x55 => {
                let regs = &self.state.registers.v[..=x];
                self.state.memory.write(regs, i)?;
            }
            0x65 => {
                let bytes = self.state.memory.get_ro_slice(i, x + 1)?;
                self.state.registers.v[..=x].copy_from_slice(bytes);
            }
            _ => {
                return Err(VmError::UnsupportedInstruction {
                    word: instruction.word(),
                    pc: at,
                })
            }
        }
        Ok(StepOutcome::Executed)
    }

    fn update_sound(&mut self) {
        let should_sound = self.state.registers.st > 0;
        if should_sound == self.sounding {
            return;
        }
        let result = if should_sound {
            self.sound.beep()
        } else {
            self.sound.stop()
        };
        if let Err(e) = result {
            warn!("sound device failed: {}", e);
        }
        self.sounding = should_sound;
    }
}

/// register-register skips only exist with a zero low nibble
fn require_zero_n(instruction: Instruction, at: u16) -> Result<(), VmError> {
    if instruction.n() != 0 {
        return Err(VmError::InvalidEncoding {
            word: instruction.word(),
            pc: at,
        });
    }
    Ok(())
}
