//! Run-state lifecycle shared between the fetch loop and the interrupt
//! handler.

use std::sync::atomic::{AtomicU8, Ordering};

/// How fast the machine is allowed to go. `Off` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RunLevel {
    Off = 0,
    /// Debugger runs before every fetch.
    Step = 1,
    /// Full speed, no interaction.
    Turbo = 2,
}

impl RunLevel {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Off,
            1 => Self::Step,
            _ => Self::Turbo,
        }
    }
}

/// Holds the current [`RunLevel`] behind an atomic so the SIGINT handler and
/// the fetch loop observe it consistently. The handler only ever calls
/// [`Controller::interrupt`], which is a single integer update.
#[derive(Debug)]
pub struct Controller {
    level: AtomicU8,
}

impl Controller {
    /// Machines start paused, in single-step mode.
    pub fn new() -> Self {
        Self {
            level: AtomicU8::new(RunLevel::Step as u8),
        }
    }

    pub fn level(&self) -> RunLevel {
        RunLevel::from_u8(self.level.load(Ordering::Acquire))
    }

    pub fn set(&self, level: RunLevel) {
        self.level.store(level as u8, Ordering::Release);
    }

    /// Drop one level: `Turbo` -> `Step`, `Step` -> `Off`. `Off` stays put,
    /// so repeated interrupts while shutting down are harmless. Returns the
    /// level after the transition.
    pub fn interrupt(&self) -> RunLevel {
        let previous = self
            .level
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |level| {
                level.checked_sub(1)
            });
        match previous {
            Ok(previous) => RunLevel::from_u8(previous - 1),
            Err(_) => RunLevel::Off,
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}
