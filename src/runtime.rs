//! The fetch/decode/execute engine.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use crate::bits::sign_extend;
use crate::control::{Controller, RunLevel};
use crate::debugger::{Action, Debugger};
use crate::memory::Memory;

/// Condition codes. Exactly one is set once the machine has begun executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CondFlag {
    N = 0b100,
    Z = 0b010,
    P = 0b001,
}

/// Runtime knobs that change instruction semantics.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Pre-2009 LC-3 revisions update condition codes on LEA; the 2009 ISA
    /// revision does not. Defaults to the older behavior.
    pub lea_sets_cc: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { lea_sets_cc: true }
    }
}

/// Complete machine state: memory, register file, and the run controller
/// shared with the interrupt handler.
pub struct RunState {
    mem: Memory,
    /// R0..R7
    reg: [u16; 8],
    pc: u16,
    cc: CondFlag,
    control: Arc<Controller>,
    out: Box<dyn Write>,
    options: Options,
}

/// Second operand of ADD and AND.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Reg(u16),
    /// Already sign-extended.
    Imm(u16),
}

/// One instruction, decoded up front so execution is a single dispatch.
///
/// Register fields are masked to three bits by [`Instr::decode`]; offsets
/// and immediates are sign-extended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instr {
    Add { dr: u16, sr1: u16, src: Operand },
    And { dr: u16, sr1: u16, src: Operand },
    Not { dr: u16, sr: u16 },
    Br { selector: u16, pc_offset9: u16 },
    Jmp { base_r: u16 },
    Jsr { pc_offset11: u16 },
    Jsrr { base_r: u16 },
    Ld { dr: u16, pc_offset9: u16 },
    Ldi { dr: u16, pc_offset9: u16 },
    Ldr { dr: u16, base_r: u16, offset6: u16 },
    Lea { dr: u16, pc_offset9: u16 },
    St { sr: u16, pc_offset9: u16 },
    Sti { sr: u16, pc_offset9: u16 },
    Str { sr: u16, base_r: u16, offset6: u16 },
    Trap { vector: u8 },
}

impl Instr {
    /// Decode one word. `Err` carries the top nibble of an illegal
    /// instruction: RTI, the reserved opcode, or anything else outside the
    /// user-mode set.
    pub fn decode(word: u16) -> Result<Self, u16> {
        let opcode = word >> 12;
        let dr = (word >> 9) & 0b111;
        let sr1 = (word >> 6) & 0b111;

        let instr = match opcode {
            0x0 => Self::Br {
                selector: dr,
                pc_offset9: sign_extend(word, 9),
            },
            0x1 => Self::Add {
                dr,
                sr1,
                src: Operand::decode(word),
            },
            0x2 => Self::Ld {
                dr,
                pc_offset9: sign_extend(word, 9),
            },
            0x3 => Self::St {
                sr: dr,
                pc_offset9: sign_extend(word, 9),
            },
            0x4 => {
                if word & 0x800 != 0 {
                    Self::Jsr {
                        pc_offset11: sign_extend(word, 11),
                    }
                } else {
                    Self::Jsrr { base_r: sr1 }
                }
            }
            0x5 => Self::And {
                dr,
                sr1,
                src: Operand::decode(word),
            },
            0x6 => Self::Ldr {
                dr,
                base_r: sr1,
                offset6: sign_extend(word, 6),
            },
            0x7 => Self::Str {
                sr: dr,
                base_r: sr1,
                offset6: sign_extend(word, 6),
            },
            0x9 => Self::Not { dr, sr: sr1 },
            0xA => Self::Ldi {
                dr,
                pc_offset9: sign_extend(word, 9),
            },
            0xB => Self::Sti {
                sr: dr,
                pc_offset9: sign_extend(word, 9),
            },
            0xC => Self::Jmp { base_r: sr1 },
            0xE => Self::Lea {
                dr,
                pc_offset9: sign_extend(word, 9),
            },
            0xF => Self::Trap {
                vector: (word & 0xFF) as u8,
            },
            // RTI (0x8), RES (0xD), and any other pattern
            _ => return Err(opcode),
        };
        Ok(instr)
    }
}

impl Operand {
    fn decode(word: u16) -> Self {
        if word & 0b100000 == 0 {
            Self::Reg(word & 0b111)
        } else {
            Self::Imm(sign_extend(word, 5))
        }
    }
}

// trap vectors
const TRAP_GETC: u8 = 0x20;
const TRAP_OUT: u8 = 0x21;
const TRAP_PUTS: u8 = 0x22;
const TRAP_IN: u8 = 0x23;
const TRAP_PUTSP: u8 = 0x24;
const TRAP_HALT: u8 = 0x25;

impl RunState {
    /// A machine paused at the conventional user-program origin.
    pub fn new(mem: Memory, control: Arc<Controller>, options: Options) -> Self {
        Self {
            mem,
            reg: [0; 8],
            pc: 0x3000,
            cc: CondFlag::Z,
            control,
            out: Box::new(io::stdout()),
            options,
        }
    }

    /// Redirect TRAP output, mostly for tests.
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    #[inline]
    pub fn reg(&mut self, r: u16) -> &mut u16 {
        // SAFETY: the index is masked to the eight general registers
        unsafe { self.reg.get_unchecked_mut((r & 0b111) as usize) }
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Condition codes as the bit value a BR selector is matched against.
    pub fn cc(&self) -> u16 {
        self.cc as u16
    }

    pub fn mem(&mut self) -> &mut Memory {
        &mut self.mem
    }

    /// Run until the controller reads `Off`. While in `Step`, the debugger
    /// is consulted between fetch and decode of every instruction.
    pub fn run(&mut self, debugger: &mut Debugger) {
        while self.control.level() != RunLevel::Off {
            let (pc, word) = self.fetch();

            if self.control.level() == RunLevel::Step {
                match debugger.pause(self, pc, word) {
                    Action::Proceed => {}
                    Action::Quit => {
                        self.control.set(RunLevel::Off);
                        break;
                    }
                }
            }

            self.dispatch(word);
        }
    }

    /// Fetch and execute a single instruction, no debugger involved.
    pub fn step(&mut self) {
        let (_, word) = self.fetch();
        self.dispatch(word);
    }

    /// Read the word at PC (running the device hook, like any other memory
    /// read) and advance PC past it.
    fn fetch(&mut self) -> (u16, u16) {
        let pc = self.pc;
        let word = self.mem.read(pc);
        self.pc = pc.wrapping_add(1);
        (pc, word)
    }

    fn dispatch(&mut self, word: u16) {
        match Instr::decode(word) {
            Ok(instr) => self.execute(instr),
            Err(opcode) => {
                eprintln!("illegal opcode: 0x{:01X}", opcode);
                self.control.set(RunLevel::Off);
            }
        }
    }

    fn execute(&mut self, instr: Instr) {
        match instr {
            Instr::Add { dr, sr1, src } => {
                let lhs = *self.reg(sr1);
                let rhs = self.operand(src);
                let value = lhs.wrapping_add(rhs);
                *self.reg(dr) = value;
                self.set_cc(value);
                self.trace(format_args!(
                    "ADD: R0x{:X} <- R0x{:X} + 0x{:04X} = 0x{:04X}",
                    dr, sr1, rhs, value
                ));
            }
            Instr::And { dr, sr1, src } => {
                let lhs = *self.reg(sr1);
                let rhs = self.operand(src);
                let value = lhs & rhs;
                *self.reg(dr) = value;
                self.set_cc(value);
                self.trace(format_args!(
                    "AND: R0x{:X} <- R0x{:X} & 0x{:04X} = 0x{:04X}",
                    dr, sr1, rhs, value
                ));
            }
            Instr::Not { dr, sr } => {
                let value = !*self.reg(sr);
                *self.reg(dr) = value;
                self.set_cc(value);
                self.trace(format_args!(
                    "NOT: R0x{:X} <- ~R0x{:X} = 0x{:04X}",
                    dr, sr, value
                ));
            }
            Instr::Br {
                selector,
                pc_offset9,
            } => {
                if selector & self.cc() != 0 {
                    self.pc = self.pc.wrapping_add(pc_offset9);
                    self.trace(format_args!(
                        "BR: selector 0b{:03b} matched COND, PC <- 0x{:04X}",
                        selector, self.pc
                    ));
                } else {
                    self.trace(format_args!(
                        "BR: selector 0b{:03b} did not match COND 0b{:03b}",
                        selector,
                        self.cc()
                    ));
                }
            }
            Instr::Jmp { base_r } => {
                self.pc = *self.reg(base_r);
                self.trace(format_args!(
                    "JMP: PC <- R0x{:X} = 0x{:04X}",
                    base_r, self.pc
                ));
            }
            Instr::Jsr { pc_offset11 } => {
                let ret = self.pc;
                *self.reg(7) = ret;
                self.pc = ret.wrapping_add(pc_offset11);
                self.trace(format_args!(
                    "JSR: R0x7 <- 0x{:04X}, PC <- 0x{:04X}",
                    ret, self.pc
                ));
            }
            Instr::Jsrr { base_r } => {
                let ret = self.pc;
                *self.reg(7) = ret;
                self.pc = *self.reg(base_r);
                self.trace(format_args!(
                    "JSRR: R0x7 <- 0x{:04X}, PC <- R0x{:X} = 0x{:04X}",
                    ret, base_r, self.pc
                ));
            }
            Instr::Ld { dr, pc_offset9 } => {
                let addr = self.pc.wrapping_add(pc_offset9);
                let value = self.mem.read(addr);
                *self.reg(dr) = value;
                self.set_cc(value);
                self.trace(format_args!(
                    "LD: R0x{:X} <- mem[0x{:04X}] = 0x{:04X}",
                    dr, addr, value
                ));
            }
            Instr::Ldi { dr, pc_offset9 } => {
                let ptr = self.pc.wrapping_add(pc_offset9);
                let addr = self.mem.read(ptr);
                let value = self.mem.read(addr);
                *self.reg(dr) = value;
                self.set_cc(value);
                self.trace(format_args!(
                    "LDI: R0x{:X} <- mem[mem[0x{:04X}]] = 0x{:04X}",
                    dr, ptr, value
                ));
            }
            Instr::Ldr {
                dr,
                base_r,
                offset6,
            } => {
                let addr = self.reg(base_r).wrapping_add(offset6);
                let value = self.mem.read(addr);
                *self.reg(dr) = value;
                self.set_cc(value);
                self.trace(format_args!(
                    "LDR: R0x{:X} <- mem[R0x{:X} + 0x{:04X}] = 0x{:04X}",
                    dr, base_r, offset6, value
                ));
            }
            Instr::Lea { dr, pc_offset9 } => {
                let value = self.pc.wrapping_add(pc_offset9);
                *self.reg(dr) = value;
                if self.options.lea_sets_cc {
                    self.set_cc(value);
                }
                self.trace(format_args!("LEA: R0x{:X} <- 0x{:04X}", dr, value));
            }
            Instr::St { sr, pc_offset9 } => {
                let addr = self.pc.wrapping_add(pc_offset9);
                let value = *self.reg(sr);
                self.mem.write(addr, value);
                self.trace(format_args!(
                    "ST: mem[0x{:04X}] <- R0x{:X} = 0x{:04X}",
                    addr, sr, value
                ));
            }
            Instr::Sti { sr, pc_offset9 } => {
                let ptr = self.pc.wrapping_add(pc_offset9);
                let addr = self.mem.read(ptr);
                let value = *self.reg(sr);
                self.mem.write(addr, value);
                self.trace(format_args!(
                    "STI: mem[mem[0x{:04X}]] <- R0x{:X} = 0x{:04X}",
                    ptr, sr, value
                ));
            }
            Instr::Str {
                sr,
                base_r,
                offset6,
            } => {
                let addr = self.reg(base_r).wrapping_add(offset6);
                let value = *self.reg(sr);
                self.mem.write(addr, value);
                self.trace(format_args!(
                    "STR: mem[R0x{:X} + 0x{:04X}] <- R0x{:X} = 0x{:04X}",
                    base_r, offset6, sr, value
                ));
            }
            Instr::Trap { vector } => {
                self.trap(vector);
                self.trace(format_args!("TRAP: vector 0x{:02X}", vector));
            }
        }
    }

    fn operand(&mut self, src: Operand) -> u16 {
        match src {
            Operand::Reg(sr2) => *self.reg(sr2),
            Operand::Imm(value) => value,
        }
    }

    fn set_cc(&mut self, value: u16) {
        self.cc = if value == 0 {
            CondFlag::Z
        } else if value & 0x8000 != 0 {
            CondFlag::N
        } else {
            CondFlag::P
        };
        self.trace(format_args!("COND <- 0b{:03b}", self.cc()));
    }

    fn trap(&mut self, vector: u8) {
        // An unknown vector is a warning and must leave the register file
        // untouched, so R7 is saved only for recognized services.
        if !matches!(
            vector,
            TRAP_GETC | TRAP_OUT | TRAP_PUTS | TRAP_IN | TRAP_PUTSP | TRAP_HALT
        ) {
            eprintln!("invalid trap vector: 0x{:02X}", vector);
            return;
        }
        *self.reg(7) = self.pc;

        match vector {
            TRAP_GETC => {
                let value = self.mem.read_key();
                *self.reg(0) = value;
                self.set_cc(value);
            }
            TRAP_OUT => {
                let byte = (*self.reg(0) & 0xFF) as u8;
                let _ = self.out.write_all(&[byte]);
                let _ = self.out.flush();
            }
            TRAP_PUTS => self.puts(),
            TRAP_IN => {
                let _ = self.out.write_all(b"Enter a character: ");
                let _ = self.out.flush();
                let value = self.mem.read_key();
                let _ = self.out.write_all(&[(value & 0xFF) as u8]);
                let _ = self.out.flush();
                *self.reg(0) = value;
                self.set_cc(value);
            }
            TRAP_PUTSP => self.putsp(),
            TRAP_HALT => {
                let _ = self.out.write_all(b"HALT\n");
                let _ = self.out.flush();
                self.control.set(RunLevel::Off);
            }
            _ => unreachable!("checked above"),
        }
    }

    /// One character per word, low byte only, until a zero word.
    ///
    /// The scan stops at the end of memory instead of walking past it; a
    /// string without a terminator prints at most up to 0xFFFF.
    fn puts(&mut self) {
        let mut addr = *self.reg(0);
        loop {
            let word = self.mem.peek(addr);
            if word == 0 {
                break;
            }
            let _ = self.out.write_all(&[(word & 0xFF) as u8]);
            if addr == u16::MAX {
                break;
            }
            addr += 1;
        }
        let _ = self.out.flush();
    }

    /// Two characters per word, low byte first, high byte skipped when zero.
    /// Bounded at the end of memory like [`RunState::puts`].
    fn putsp(&mut self) {
        let mut addr = *self.reg(0);
        loop {
            let word = self.mem.peek(addr);
            if word == 0 {
                break;
            }
            let _ = self.out.write_all(&[(word & 0xFF) as u8]);
            let high = (word >> 8) as u8;
            if high != 0 {
                let _ = self.out.write_all(&[high]);
            }
            if addr == u16::MAX {
                break;
            }
            addr += 1;
        }
        let _ = self.out.flush();
    }

    /// Step-mode trace of what an instruction changed.
    fn trace(&self, args: fmt::Arguments) {
        if self.control.level() == RunLevel::Step {
            eprintln!("{}", args);
        }
    }
}
