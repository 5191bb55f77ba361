//! Where the vault password comes from
//!
//! The CLI reads it from the terminal without echo, or from stdin for
//! scripting. Tests use a fixed value. Raw bytes stay in zeroizing buffers
//! until [`read_password`] validates them into a [`Password`].

use std::io::{self, IsTerminal, Read, Write};

use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::kdf::Password;

const PROMPT: &[u8] = b"Password (sealnote): ";

pub trait PasswordReader {
    /// Produce the raw password bytes. Called once per unlock.
    fn read_raw(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Read from `reader` and check UTF-8 and the minimum length.
pub fn read_password(reader: &mut dyn PasswordReader) -> Result<Password> {
    let raw = reader.read_raw()?;
    Password::from_bytes(&raw)
}

/// Always yields the same bytes.
pub struct FixedPasswordReader {
    bytes: Zeroizing<Vec<u8>>,
}

impl FixedPasswordReader {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }
}

impl PasswordReader for FixedPasswordReader {
    fn read_raw(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(self.bytes.clone())
    }
}

/// Takes the whole of a stream, such as stdin, as the password.
///
/// One trailing `\n` or `\r\n` (as left by `echo`) is dropped.
pub struct StreamPasswordReader {
    source: Box<dyn Read>,
}

impl StreamPasswordReader {
    pub fn new(source: Box<dyn Read>) -> Self {
        Self { source }
    }
}

impl PasswordReader for StreamPasswordReader {
    fn read_raw(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut buf = Zeroizing::new(Vec::new());
        self.source.read_to_end(&mut buf).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        let ending = if buf.ends_with(b"\r\n") {
            2
        } else if buf.ends_with(b"\n") {
            1
        } else {
            0
        };
        let len = buf.len() - ending;
        buf.truncate(len);
        Ok(buf)
    }
}

/// Prompts on stderr and reads from the terminal with echo off.
#[derive(Debug, Default)]
pub struct TerminalPasswordReader;

impl PasswordReader for TerminalPasswordReader {
    fn read_raw(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(SealnoteError::with_kind(
                ErrorCategory::User,
                ErrorKind::PasswordUnavailable,
                "stdin is not a terminal; use --password-stdin to pipe the password in",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(PROMPT)
            .and_then(|()| stderr.flush())
            .map_err(|e| {
                SealnoteError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to write password prompt",
                    e,
                )
            })?;

        let typed = rpassword::read_password().map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PasswordUnavailable,
                format!("failed to read password from terminal: {}", e),
                e,
            )
        })?;
        Ok(Zeroizing::new(typed.into_bytes()))
    }
}
