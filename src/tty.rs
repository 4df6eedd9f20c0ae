//! Terminal attributes and the non-blocking console input probe.
//!
//! Raw mode here clears only `ICANON` and `ECHO`. `ISIG` stays set so ^C is
//! still delivered as SIGINT while the machine runs, which is how the
//! operator drops from full speed back into single-step mode.

use std::cell::RefCell;
use std::io::{self, Read as _};
use std::os::fd::AsFd as _;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};

thread_local! {
    /// Attributes captured before raw mode was first enabled.
    static SAVED: RefCell<Option<Termios>> = const { RefCell::new(None) };
}

/// Put stdin into raw mode: no line buffering, no echo.
///
/// A no-op when stdin is not a terminal, so piped runs work unchanged.
pub fn disable_input_buffering() {
    let stdin = io::stdin();
    let Ok(original) = termios::tcgetattr(&stdin) else {
        return;
    };
    SAVED.with(|saved| {
        saved.borrow_mut().get_or_insert_with(|| original.clone());
    });
    let mut raw = original;
    raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
    let _ = termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw);
}

/// Restore the attributes captured by [`disable_input_buffering`].
pub fn restore_input_buffering() {
    let Some(original) = SAVED.with(|saved| saved.borrow().clone()) else {
        return;
    };
    let _ = termios::tcsetattr(&io::stdin(), SetArg::TCSANOW, &original);
}

/// Keeps the terminal raw for its lifetime; restores canonical mode when
/// dropped, which covers every return path out of `main`.
pub struct RawModeGuard(());

impl RawModeGuard {
    pub fn acquire() -> Self {
        disable_input_buffering();
        Self(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        restore_input_buffering();
    }
}

/// True iff at least one byte is readable from stdin right now.
///
/// Zero-timeout poll: never blocks, never consumes input.
pub fn key_pending() -> bool {
    let stdin = io::stdin();
    let mut fds = [PollFd::new(stdin.as_fd(), PollFlags::POLLIN)];
    match poll(&mut fds, PollTimeout::ZERO) {
        Ok(n) if n > 0 => fds[0]
            .revents()
            .is_some_and(|revents| revents.intersects(PollFlags::POLLIN | PollFlags::POLLHUP)),
        _ => false,
    }
}

/// Blocking single-byte read from stdin. Returns `0xFFFF` at end of input,
/// the `getchar` convention LC-3 programs already expect.
pub fn read_byte() -> u16 {
    let mut buffer = [0u8; 1];
    match io::stdin().read(&mut buffer) {
        Ok(1) => u16::from(buffer[0]),
        _ => 0xFFFF,
    }
}
