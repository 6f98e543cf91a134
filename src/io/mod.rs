// swarjson
// A streaming JSON decoder built around a 64-byte SWAR sliding window.

//! The `io` module implements the decoder's single I/O primitive: a 64-byte sliding window
//! maintained over an abstract byte [`Source`], with byte-class membership (whitespace, quote,
//! reverse solidus, digit) precomputed across the whole window on every refill via the SWAR
//! tricks in [`crate::util::swar`].
//!
//! Everything above this module (the token decoder) only ever asks the window reader
//! position-relative questions — "how far to the next quote", "how long is this digit run",
//! "skip any whitespace" — and never touches the byte source directly.

mod source;
mod window;

pub use source::Source;
pub use window::{ByteClass, WindowReader, WINDOW_LEN};
