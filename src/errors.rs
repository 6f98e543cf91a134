// swarjson
// A streaming JSON decoder built around a 64-byte SWAR sliding window.

//! The `errors` module defines the common error type returned by the window reader and the
//! token decoder.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;

/// Byte position within the logical input stream at which an error was detected.
pub type Pos = u64;

/// `JsonError` enumerates every way decoding can fail, grouped by kind rather than by exact
/// cause. Kinds 1 through 5 are recoverable at the caller's discretion by abandoning the
/// current token; `ContractViolation` is not.
#[derive(Debug)]
pub enum JsonError {
    /// The byte source reported a terminal error. Propagated verbatim.
    SourceError(io::Error),
    /// A token required more bytes than remained before the source's terminal signal.
    EndOfInput { pos: Pos },
    /// A byte sequence did not match the expected literal or grammar (e.g. `nul?`, `falsX`,
    /// a missing opening quote, or a non-terminator following a scalar).
    ShapeError { pos: Pos, msg: &'static str },
    /// An invalid `\` escape, invalid `\u` hex digits, or an unpaired/malformed UTF-16
    /// surrogate pair.
    EscapeError { pos: Pos, msg: &'static str },
    /// An invalid UTF-8 lead or continuation byte, or an oversize encoded sequence.
    EncodingError { pos: Pos, msg: &'static str },
    /// The byte source returned an impossible byte count, or the caller requested an
    /// out-of-range window operation. This is a bug in a collaborator, not a malformed input.
    ContractViolation(&'static str),
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonError::SourceError(err) => write!(f, "source error: {err}"),
            JsonError::EndOfInput { pos } => {
                write!(f, "unexpected end of input at byte {pos}")
            }
            JsonError::ShapeError { pos, msg } => {
                write!(f, "malformed token at byte {pos}: {msg}")
            }
            JsonError::EscapeError { pos, msg } => {
                write!(f, "invalid escape at byte {pos}: {msg}")
            }
            JsonError::EncodingError { pos, msg } => {
                write!(f, "invalid UTF-8 at byte {pos}: {msg}")
            }
            JsonError::ContractViolation(msg) => {
                write!(f, "contract violation: {msg}")
            }
        }
    }
}

impl StdError for JsonError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            JsonError::SourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for JsonError {
    fn from(err: io::Error) -> JsonError {
        JsonError::SourceError(err)
    }
}

pub type Result<T> = result::Result<T, JsonError>;

/// Convenience function to create an end-of-input error.
pub fn end_of_input_error<T>(pos: Pos) -> Result<T> {
    Err(JsonError::EndOfInput { pos })
}

/// Convenience function to create a shape error.
pub fn shape_error<T>(pos: Pos, msg: &'static str) -> Result<T> {
    Err(JsonError::ShapeError { pos, msg })
}

/// Convenience function to create an escape error.
pub fn escape_error<T>(pos: Pos, msg: &'static str) -> Result<T> {
    Err(JsonError::EscapeError { pos, msg })
}

/// Convenience function to create an encoding error.
pub fn encoding_error<T>(pos: Pos, msg: &'static str) -> Result<T> {
    Err(JsonError::EncodingError { pos, msg })
}

/// Convenience function to create a contract violation error. Callers implementing a `Source`
/// should prefer panicking directly (per the fatal failure model in the window reader), but
/// this helper exists for code paths that can still unwind cleanly.
pub fn contract_violation_error<T>(msg: &'static str) -> Result<T> {
    Err(JsonError::ContractViolation(msg))
}
