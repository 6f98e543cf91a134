// swarjson
// A streaming JSON decoder built around a 64-byte SWAR sliding window.

//! `swarjson` is a streaming JSON decoder whose core is a fixed-size 64-byte sliding window,
//! materialized as eight 64-bit lanes, over which byte-class lookahead (whitespace, quote,
//! reverse-solidus, digit) is answered with SWAR (SIMD-within-a-register) bitmask arithmetic
//! instead of a byte-at-a-time scan.
//!
//! Two layers sit on top of each other:
//!
//! - [`io`] — the window reader ([`io::WindowReader`]), maintaining the 64-byte view over any
//!   [`io::Source`] and exposing random read plus the constant-time lookahead primitives the
//!   decoder relies on.
//! - [`decode`] — the token decoder ([`decode::TokenDecoder`]), consuming those primitives to
//!   recognize `null`, `true`/`false`, and quoted strings, escapes and `\uXXXX` surrogate pairs
//!   included.
//!
//! Array/object grammar driving, value binding, and full numeric parsing are layered on top by
//! callers of this crate; they are not part of its scope.

pub mod decode;
pub mod errors;
pub mod io;
pub mod util;
