//! The single-step debugger REPL.
//!
//! Runs between fetch and decode whenever the controller reads `Step`. The
//! debugger's own chatter goes to stderr so program output on stdout stays
//! clean.

macro_rules! dprintln {
    () => {{
        eprintln!();
    }};
    ( $fmt:literal $($tt:tt)* ) => {{
        eprintln!(concat!("\x1b[{}m", $fmt, "\x1b[0m"), DEBUGGER_COLOR $($tt)*);
    }};
}

mod command;
mod source;

use std::sync::Arc;

use crate::control::{Controller, RunLevel};
use crate::runtime::RunState;
use crate::tty;
use command::{Command, CommandError};
pub use source::SourceMode;
use source::SourceReader as _;

const DEBUGGER_COLOR: u8 = 34;

pub const PROMPT: &str = "(lc3vm) ";

/// What the fetch loop should do after a pause.
#[derive(Debug)]
pub enum Action {
    /// Execute the fetched instruction.
    Proceed,
    /// Operator asked to leave; the machine turns off.
    Quit,
}

pub struct Debugger {
    source: SourceMode,
    control: Arc<Controller>,
}

impl Debugger {
    pub fn new(source: SourceMode, control: Arc<Controller>) -> Self {
        Self { source, control }
    }

    /// Command loop for one paused instruction. `pc` is the address the
    /// word was fetched from, before the increment.
    ///
    /// The line editor needs the terminal back in canonical mode; raw mode
    /// is re-enabled before returning to the fetch loop.
    pub fn pause(&mut self, state: &mut RunState, pc: u16, word: u16) -> Action {
        tty::restore_input_buffering();
        dprintln!(
            "Fetched instruction from 0x{:04X}, containing 0x{:04X}.",
            pc,
            word
        );

        let action = loop {
            let parsed = match self.source.read() {
                None => break Action::Quit, // EOF
                Some(line) => Command::parse(line).map_err(|err| (err, line.to_string())),
            };

            match parsed {
                Ok(Command::Help) => Self::print_help(),
                Ok(Command::Continue) => {
                    self.control.set(RunLevel::Turbo);
                    break Action::Proceed;
                }
                Ok(Command::Step) => break Action::Proceed,
                Ok(Command::Registers) => Self::print_registers(state),
                Ok(Command::Memory { addr, count }) => Self::print_memory(state, addr, count),
                Err((CommandError::Empty, _)) => continue,
                Err((err, line)) => {
                    dprintln!("Unrecognized command: {} ({})", line, err);
                }
            }
        };

        tty::disable_input_buffering();
        action
    }

    fn print_help() {
        dprintln!("lc3vm commands:");
        dprintln!("  help              -- Print this help page.");
        dprintln!("  continue          -- Continue execution. Get back here with ^C.");
        dprintln!("  step              -- Step forward one instruction.");
        dprintln!("  memory <addr> [n] -- Display n words of memory starting from addr.");
        dprintln!("  reg               -- Display the contents of the registers.");
        dprintln!();
        dprintln!("Press ^C or ^D to exit. Commands abbreviate to their first letter.");
    }

    fn print_registers(state: &mut RunState) {
        for i in 0..8 {
            dprintln!("R{}   0x{:04X}", i, *state.reg(i));
        }
        dprintln!("PC   0x{:04X}", state.pc());
        dprintln!("COND 0x{:04X}", state.cc());
    }

    fn print_memory(state: &mut RunState, addr: u16, count: u16) {
        for i in 0..count {
            let addr = addr.wrapping_add(i);
            dprintln!("0x{:04X}: 0x{:04X}", addr, state.mem().peek(addr));
        }
    }
}
