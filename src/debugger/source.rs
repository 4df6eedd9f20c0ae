//! Where debugger commands come from.
//!
//! The REPL reads through one narrow contract, [`SourceReader`], with three
//! providers behind it: an interactive terminal with line editing and
//! history, plain piped stdin, and a `--command` argument. The piped reader
//! consumes stdin one byte at a time so program input past the command
//! delimiter stays available to the GETC and IN traps.

use std::collections::TryReserveError;
use std::io::{self, IsTerminal, Read, Write};

use console::{Key, Term};

use super::{DEBUGGER_COLOR, PROMPT};

/// Upper bound on remembered commands, oldest dropped first.
const HISTORY_MAX: usize = 1024;

pub trait SourceReader {
    /// Next command. `None` indicates EOF. The returned slice may include
    /// surrounding whitespace.
    fn read(&mut self) -> Option<&str>;
}

pub enum SourceMode {
    Argument(Script),
    Stdin(Piped),
    Terminal(Terminal),
}

impl SourceMode {
    /// Pick the command source: an explicit `--command` string wins, then an
    /// interactive terminal, then piped stdin.
    pub fn new(argument: Option<String>) -> Result<Self, TryReserveError> {
        if let Some(argument) = argument {
            return Ok(Self::Argument(Script::from(argument)));
        }
        if io::stdin().is_terminal() {
            return Ok(Self::Terminal(Terminal::new()?));
        }
        Ok(Self::Stdin(Piped::new()))
    }
}

impl SourceReader for SourceMode {
    fn read(&mut self) -> Option<&str> {
        let command = match self {
            Self::Terminal(terminal) => return terminal.read(),
            Self::Argument(script) => script.read(),
            Self::Stdin(piped) => piped.read(),
        };
        // echo for non-interactive sources, so transcripts read like a session
        dprintln!("{}{}", PROMPT, command.unwrap_or("").trim());
        command
    }
}

/// Commands passed on the command line, split on newlines and semicolons.
pub struct Script {
    commands: Vec<String>,
    head: usize,
}

impl From<String> for Script {
    fn from(text: String) -> Self {
        Self {
            commands: text.split(['\n', ';']).map(str::to_string).collect(),
            head: 0,
        }
    }
}

impl SourceReader for Script {
    fn read(&mut self) -> Option<&str> {
        let command = self.commands.get(self.head)?;
        self.head += 1;
        Some(command.as_str())
    }
}

/// Stdin that is not attached to a terminal.
pub struct Piped {
    stdin: io::Stdin,
    buffer: String,
}

impl Piped {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            buffer: String::new(),
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut buffer = [0u8; 1];
        match self.stdin.read(&mut buffer) {
            Ok(1) => Some(buffer[0]),
            _ => None,
        }
    }
}

impl SourceReader for Piped {
    fn read(&mut self) -> Option<&str> {
        self.buffer.clear();
        loop {
            let Some(byte) = self.read_byte() else {
                if self.buffer.is_empty() {
                    return None; // EOF before any command
                }
                break;
            };
            match byte {
                b'\n' | b';' => break,
                _ => self.buffer.push(byte as char),
            }
        }
        Some(&self.buffer)
    }
}

/// Interactive unbuffered terminal with history.
pub struct Terminal {
    term: Term,
    /// Line being edited.
    draft: String,
    history: Vec<String>,
    /// Focused history entry; `history.len()` means the draft.
    index: usize,
    /// Byte cursor into the focused line. Only ASCII is accepted, so bytes
    /// and columns agree.
    cursor: usize,
    /// Pending `;`-separated commands from the last line, reversed.
    queue: Vec<String>,
    current: String,
}

impl Terminal {
    pub fn new() -> Result<Self, TryReserveError> {
        let mut history = Vec::new();
        history.try_reserve(HISTORY_MAX)?;
        Ok(Self {
            term: Term::stdout(),
            draft: String::new(),
            history,
            index: 0,
            cursor: 0,
            queue: Vec::new(),
            current: String::new(),
        })
    }

    fn current_line(&self) -> &str {
        if self.index < self.history.len() {
            &self.history[self.index]
        } else {
            &self.draft
        }
    }

    /// Run before editing: a focused history entry becomes the draft.
    fn make_draft(&mut self) {
        if self.index < self.history.len() {
            self.draft = self.history[self.index].clone();
            self.index = self.history.len();
        }
    }

    fn remember(&mut self, line: &str) {
        if line.is_empty() || self.history.last().is_some_and(|last| last == line) {
            return;
        }
        if self.history.len() == HISTORY_MAX {
            self.history.remove(0);
        }
        self.history.push(line.to_string());
    }

    fn draw(&mut self) {
        let line = self.current_line().to_string();
        let step_back = line.len().saturating_sub(self.cursor);
        let _ = self.term.clear_line();
        let _ = write!(self.term, "{}{}", PROMPT, line);
        let _ = self.term.move_cursor_left(step_back);
        let _ = self.term.flush();
    }

    /// Read one line of input. `None` on EOF or ^C at the prompt, which the
    /// REPL treats as quit.
    fn read_line(&mut self) -> Option<String> {
        self.draft.clear();
        self.cursor = 0;
        self.index = self.history.len();

        loop {
            self.draw();
            let Ok(key) = self.term.read_key() else {
                let _ = writeln!(self.term);
                return None;
            };
            match key {
                Key::Enter => {
                    if !self.current_line().is_empty() {
                        break;
                    }
                    let _ = writeln!(self.term);
                }
                Key::Char(ch) => {
                    if ch.is_ascii_graphic() || ch == ' ' {
                        self.make_draft();
                        self.draft.insert(self.cursor, ch);
                        self.cursor += 1;
                    }
                }
                Key::Backspace => {
                    self.make_draft();
                    if self.cursor > 0 {
                        self.cursor -= 1;
                        self.draft.remove(self.cursor);
                    }
                }
                Key::ArrowLeft => self.cursor = self.cursor.saturating_sub(1),
                Key::ArrowRight => {
                    if self.cursor < self.current_line().len() {
                        self.cursor += 1;
                    }
                }
                Key::ArrowUp => {
                    if self.index > 0 {
                        self.index -= 1;
                        self.cursor = self.current_line().len();
                    }
                }
                Key::ArrowDown => {
                    if self.index < self.history.len() {
                        self.index += 1;
                        self.cursor = self.current_line().len();
                    }
                }
                _ => (),
            }
        }

        let _ = writeln!(self.term);
        let line = self.current_line().to_string();
        self.remember(&line);
        Some(line)
    }
}

impl SourceReader for Terminal {
    fn read(&mut self) -> Option<&str> {
        loop {
            if let Some(next) = self.queue.pop() {
                self.current = next;
                return Some(&self.current);
            }
            let line = self.read_line()?;
            self.queue = line.split(';').rev().map(str::to_string).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_splits_on_newlines_and_semicolons() {
        let mut script = Script::from("reg; step\ncontinue".to_string());
        assert_eq!(script.read(), Some("reg"));
        assert_eq!(script.read(), Some(" step"));
        assert_eq!(script.read(), Some("continue"));
        assert_eq!(script.read(), None);
    }

    #[test]
    fn history_dedupes_and_caps() {
        let mut terminal = Terminal::new().unwrap();
        terminal.remember("reg");
        terminal.remember("reg");
        assert_eq!(terminal.history, ["reg"]);
        terminal.remember("step");
        assert_eq!(terminal.history, ["reg", "step"]);
        terminal.remember("");
        assert_eq!(terminal.history.len(), 2);

        for i in 0..(HISTORY_MAX * 2) {
            terminal.remember(&format!("m 0x{:X}", i));
        }
        assert_eq!(terminal.history.len(), HISTORY_MAX);
    }
}
