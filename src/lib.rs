//! Emulator and interactive single-step debugger for the LC-3, a 16-bit
//! educational architecture. Loads big-endian object images and executes
//! them with a memory-mapped keyboard and the standard six TRAP services.

pub mod bits;
pub mod control;
pub mod debugger;
pub mod error;
pub mod loader;
pub mod memory;
pub mod runtime;
pub mod tty;

pub use control::{Controller, RunLevel};
pub use debugger::{Debugger, SourceMode};
pub use memory::{Memory, TtyKeyboard};
pub use runtime::{Options, RunState};
