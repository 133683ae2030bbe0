//! Single-key input.

use anyhow::{Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, Write};

/// The operator pressed Ctrl-C at a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// A blocking source of single key presses.
pub trait KeySource {
    /// Wait for the next key.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read or the operator interrupts.
    fn next_key(&mut self) -> Result<char>;

    /// Wait for a key in `allowed`, asking again after anything else.
    ///
    /// The accepted key is echoed to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read or `out` cannot be written.
    fn read_key(&mut self, allowed: &str, out: &mut dyn Write) -> Result<char> {
        loop {
            out.flush()?;
            let key = self.next_key()?;
            if allowed.contains(key) {
                writeln!(out, "{key}")?;
                return Ok(key);
            }
            write!(out, "\nPlease press one of the keys [{allowed}] ")?;
        }
    }
}

/// Keys read from the terminal in raw mode, one press at a time.
#[derive(Debug, Default)]
pub struct TerminalKeys;

struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> Result<char> {
        let _raw = RawMode::enable()?;
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(Interrupted.into());
                }
                KeyCode::Char(c) => return Ok(c),
                _ => {}
            }
        }
    }
}

/// Keys taken from a non-terminal reader, e.g. `echo 1c | syncer check`.
///
/// Whitespace is skipped. Once the input is exhausted every request answers
/// `q`, so a short script always ends in a clean quit.
#[derive(Debug)]
pub struct PipedKeys<R> {
    reader: R,
    pending: VecDeque<char>,
}

impl<R: BufRead> PipedKeys<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
        }
    }
}

impl<R: BufRead> KeySource for PipedKeys<R> {
    fn next_key(&mut self) -> Result<char> {
        loop {
            if let Some(c) = self.pending.pop_front() {
                if !c.is_whitespace() {
                    return Ok(c);
                }
                continue;
            }
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok('q');
            }
            self.pending.extend(line.chars());
        }
    }
}

/// A fixed sequence of keys; running out is an error.
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<char>,
}

impl ScriptedKeys {
    #[must_use]
    pub fn new(keys: &str) -> Self {
        Self {
            keys: keys.chars().collect(),
        }
    }

    /// Keys not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self) -> Result<char> {
        match self.keys.pop_front() {
            Some(c) => Ok(c),
            None => bail!("Ran out of scripted keys"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_key_reprompts_on_invalid() {
        let mut keys = ScriptedKeys::new("xz2");
        let mut out = Vec::new();
        assert_eq!(keys.read_key("12aq", &mut out).unwrap(), '2');

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Please press one of the keys [12aq]").count(), 2);
        assert!(text.ends_with("2\n"));
    }

    #[test]
    fn test_scripted_keys_run_out() {
        let mut keys = ScriptedKeys::new("a");
        assert_eq!(keys.next_key().unwrap(), 'a');
        assert_eq!(keys.remaining(), 0);
        assert!(keys.next_key().is_err());
    }

    #[test]
    fn test_piped_keys_skip_whitespace_and_quit_at_eof() {
        let mut keys = PipedKeys::new(Cursor::new("1 c\n\ns"));
        let got: Vec<char> = (0..5).map(|_| keys.next_key().unwrap()).collect();
        assert_eq!(got, vec!['1', 'c', 's', 'q', 'q']);
    }

    #[test]
    fn test_interrupted_is_downcastable() {
        let err: anyhow::Error = Interrupted.into();
        assert!(err.downcast_ref::<Interrupted>().is_some());
        assert_eq!(err.to_string(), "interrupted");
    }
}
