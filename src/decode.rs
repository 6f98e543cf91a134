// swarjson
// A streaming JSON decoder built around a 64-byte SWAR sliding window.

//! The `decode` module implements the token-level decoder (L1) that sits on top of the window
//! reader (L0): recognizing `null`, `true`/`false`, and quoted strings (with `\` escapes and
//! `\uXXXX` surrogate pairs), byte-class lookahead supplied entirely by the window reader.

use log::debug;
use smallvec::SmallVec;

use crate::errors::{self, Pos, Result};
use crate::io::{Source, WindowReader};

/// Inline capacity of [`TokenDecoder::scratch`], matched to the common case of short JSON
/// strings; longer values spill onto the heap transparently via [`SmallVec`].
const INLINE_SCRATCH: usize = 2048;

// Thin, logging wrappers around `crate::errors`' convenience constructors. Every token
// rejection in this module goes through one of these, so every rejection is logged at `debug`
// with its kind and byte position without repeating a `debug!` call at each site.

fn end_of_input_error<T>(pos: Pos) -> Result<T> {
    debug!("token rejected: end of input at byte {pos}");
    errors::end_of_input_error(pos)
}

fn shape_error<T>(pos: Pos, msg: &'static str) -> Result<T> {
    debug!("token rejected: shape error at byte {pos}: {msg}");
    errors::shape_error(pos, msg)
}

fn escape_error<T>(pos: Pos, msg: &'static str) -> Result<T> {
    debug!("token rejected: escape error at byte {pos}: {msg}");
    errors::escape_error(pos, msg)
}

fn encoding_error<T>(pos: Pos, msg: &'static str) -> Result<T> {
    debug!("token rejected: encoding error at byte {pos}: {msg}");
    errors::encoding_error(pos, msg)
}

/// A reusable token-level decoder. A single instance decodes many tokens in sequence, reusing
/// its scratch buffer rather than reallocating per token.
pub struct TokenDecoder {
    scratch: SmallVec<[u8; INLINE_SCRATCH]>,
}

impl Default for TokenDecoder {
    fn default() -> TokenDecoder {
        TokenDecoder::new()
    }
}

impl TokenDecoder {
    /// Constructs a decoder with an empty, inline-capacity scratch buffer.
    pub fn new() -> TokenDecoder {
        TokenDecoder { scratch: SmallVec::new() }
    }

    /// Expects the stream to be positioned at the `n` of a `null` literal. On success, the
    /// stream is advanced past the literal and any trailing whitespace.
    pub fn expect_null<S: Source>(&mut self, reader: &mut WindowReader<S>) -> Result<()> {
        let start = reader.pos();
        let mut buf = [0u8; 4];
        read_exact(reader, &mut buf)?;
        if &buf != b"null" {
            return shape_error(start, "expected literal `null`");
        }
        check_terminator(reader)
    }

    /// Expects the stream to be positioned at the `t` or `f` of a `true`/`false` literal. On
    /// success, returns the decoded value with the stream advanced past the literal and any
    /// trailing whitespace.
    pub fn expect_bool<S: Source>(&mut self, reader: &mut WindowReader<S>) -> Result<bool> {
        let start = reader.pos();
        let mut lead = [0u8; 1];
        let (n, _) = reader.read(&mut lead)?;
        if n == 0 {
            return end_of_input_error(reader.pos());
        }

        let value = match lead[0] {
            b't' => {
                let mut tail = [0u8; 3];
                read_exact(reader, &mut tail)?;
                if &tail != b"rue" {
                    return shape_error(start, "expected literal `true`");
                }
                true
            }
            b'f' => {
                let mut tail = [0u8; 4];
                read_exact(reader, &mut tail)?;
                if &tail != b"alse" {
                    return shape_error(start, "expected literal `false`");
                }
                false
            }
            _ => return shape_error(start, "expected `true` or `false`"),
        };

        check_terminator(reader)?;
        Ok(value)
    }

    /// Expects the stream to be positioned at the opening `"` of a string. On success, returns
    /// the decoded UTF-8 contents (escapes resolved, surrogate pairs combined).
    ///
    /// Unlike [`Self::expect_null`] and [`Self::expect_bool`], a trailing terminator is *not*
    /// required after the closing quote — the caller is free to follow a string with a `:` in
    /// object-key position, which is not itself a terminator.
    pub fn expect_string<S: Source>(&mut self, reader: &mut WindowReader<S>) -> Result<&str> {
        self.scratch.clear();

        let start = reader.pos();
        let mut open = [0u8; 1];
        let (n, _) = reader.read(&mut open)?;
        if n == 0 {
            return end_of_input_error(reader.pos());
        }
        if open[0] != b'"' {
            return shape_error(start, "expected opening `\"`");
        }

        loop {
            if reader.scan_to_quote() == 0 {
                let mut close = [0u8; 1];
                reader.read(&mut close)?;
                break;
            }

            if reader.scan_to_reverse_solidus() == 0 {
                let mut esc = [0u8; 1];
                reader.read(&mut esc)?;
                decode_escape(reader, &mut self.scratch)?;
                continue;
            }

            decode_codepoint(reader, &mut self.scratch)?;
        }

        match std::str::from_utf8(&self.scratch) {
            Ok(s) => Ok(s),
            // Every pushed byte was already validated as it was assembled; unreachable in
            // practice, but the alternative is an unchecked cast.
            Err(_) => encoding_error(start, "assembled string was not valid UTF-8"),
        }
    }
}

/// A terminator is end-of-stream, or any of `, } ]`.
fn is_terminator(b: u8) -> bool {
    matches!(b, b',' | b'}' | b']')
}

/// Skips trailing whitespace and checks that the next byte, if any, is a terminator. `null`,
/// `true`, and `false` all require a terminator immediately following (after whitespace), so
/// this one check is shared by all three.
fn check_terminator<S: Source>(reader: &mut WindowReader<S>) -> Result<()> {
    reader.skip_whitespace()?;
    match reader.peek()? {
        None => Ok(()),
        Some(b) if is_terminator(b) => Ok(()),
        Some(_) => shape_error(reader.pos(), "expected terminator after scalar"),
    }
}

/// Reads exactly `buf.len()` bytes, or fails with [`crate::errors::JsonError::EndOfInput`] if
/// the source runs dry first.
fn read_exact<S: Source>(reader: &mut WindowReader<S>, buf: &mut [u8]) -> Result<()> {
    let want = buf.len();
    let (n, _) = reader.read(buf)?;
    if n < want {
        return end_of_input_error(reader.pos());
    }
    Ok(())
}

/// `true` for UTF-8 continuation bytes (`0b10xxxxxx`).
#[inline]
fn is_utf8_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// Reads one UTF-8 code point (assumed not to start with `"` or `\`, which the caller has
/// already ruled out via the window reader's scan primitives) and appends its bytes to
/// `scratch`.
///
/// Continuation bytes are consumed greedily until either a non-continuation byte is peeked (the
/// start of the next code point, or end-of-stream) or the 4-byte UTF-8 maximum is reached. The
/// assembled bytes are then validated as a whole; this catches both truncated leads (too few
/// continuation bytes collected before the next code point starts) and over-long runs.
fn decode_codepoint<S: Source>(
    reader: &mut WindowReader<S>,
    scratch: &mut SmallVec<[u8; INLINE_SCRATCH]>,
) -> Result<()> {
    let pos = reader.pos();
    let mut buf = [0u8; 4];

    let (n, _) = reader.read(&mut buf[..1])?;
    if n == 0 {
        return end_of_input_error(pos);
    }
    let mut len = 1usize;

    while len < 4 {
        match reader.peek()? {
            Some(b) if is_utf8_continuation(b) => {
                let (n, _) = reader.read(&mut buf[len..len + 1])?;
                debug_assert_eq!(n, 1);
                len += 1;
            }
            _ => break,
        }
    }

    match std::str::from_utf8(&buf[..len]) {
        Ok(_) => {
            scratch.extend_from_slice(&buf[..len]);
            Ok(())
        }
        Err(_) => encoding_error(pos, "invalid UTF-8 sequence"),
    }
}

/// Decodes the character following a `\` already consumed from the stream, appending the
/// emitted bytes to `scratch`.
fn decode_escape<S: Source>(
    reader: &mut WindowReader<S>,
    scratch: &mut SmallVec<[u8; INLINE_SCRATCH]>,
) -> Result<()> {
    let pos = reader.pos();
    let mut tag = [0u8; 1];
    let (n, _) = reader.read(&mut tag)?;
    if n == 0 {
        return end_of_input_error(pos);
    }

    match tag[0] {
        b'"' | b'\\' | b'/' => scratch.push(tag[0]),
        b'b' => scratch.push(0x08),
        b'f' => scratch.push(0x0C),
        b'n' => scratch.push(0x0A),
        b'r' => scratch.push(0x0D),
        b't' => scratch.push(0x09),
        b'u' => decode_unicode_escape(reader, scratch)?,
        _ => return escape_error(pos, "unrecognized escape sequence"),
    }

    Ok(())
}

/// Reads four hex digits (`[0-9A-Fa-f]`) and combines them into a 16-bit value.
fn read_hex4<S: Source>(reader: &mut WindowReader<S>) -> Result<u16> {
    let pos = reader.pos();
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf)?;

    let mut value: u16 = 0;
    for &c in &buf {
        let digit = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => return escape_error(pos, "invalid \\u hex digit"),
        };
        value = value * 16 + digit as u16;
    }
    Ok(value)
}

/// Decodes a `\uXXXX` escape already past the `u`, handling the UTF-16 surrogate-pair case.
fn decode_unicode_escape<S: Source>(
    reader: &mut WindowReader<S>,
    scratch: &mut SmallVec<[u8; INLINE_SCRATCH]>,
) -> Result<()> {
    let pos = reader.pos();
    let r1 = read_hex4(reader)?;

    let scalar = if (0xD800..=0xDBFF).contains(&r1) {
        let mut backslash = [0u8; 1];
        let (n, _) = reader.read(&mut backslash)?;
        if n == 0 {
            return end_of_input_error(reader.pos());
        }
        if backslash[0] != b'\\' {
            return escape_error(pos, "lone high surrogate");
        }

        let mut u = [0u8; 1];
        let (n, _) = reader.read(&mut u)?;
        if n == 0 {
            return end_of_input_error(reader.pos());
        }
        if u[0] != b'u' {
            return escape_error(pos, "expected \\u low surrogate escape");
        }

        let r2 = read_hex4(reader)?;
        if !(0xDC00..=0xDFFF).contains(&r2) {
            return escape_error(pos, "invalid low surrogate");
        }

        let high = (r1 - 0xD800) as u32;
        let low = (r2 - 0xDC00) as u32;
        0x1_0000 + (high << 10) + low
    }
    else if (0xDC00..=0xDFFF).contains(&r1) {
        return escape_error(pos, "lone low surrogate");
    }
    else {
        r1 as u32
    };

    match char::from_u32(scalar) {
        Some(c) => {
            let mut enc = [0u8; 4];
            let s = c.encode_utf8(&mut enc);
            scratch.extend_from_slice(s.as_bytes());
            Ok(())
        }
        None => escape_error(pos, "escape does not encode a valid scalar value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_over(bytes: &[u8]) -> WindowReader<Cursor<Vec<u8>>> {
        WindowReader::new(Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn null_literal_ok() {
        let mut reader = reader_over(b"null");
        let mut dec = TokenDecoder::new();
        dec.expect_null(&mut reader).unwrap();
        assert_eq!(reader.peek().unwrap(), None);
    }

    #[test]
    fn null_rejects_trailing_garbage() {
        let mut reader = reader_over(b"nullabc");
        let mut dec = TokenDecoder::new();
        let err = dec.expect_null(&mut reader).unwrap_err();
        assert!(matches!(err, crate::errors::JsonError::ShapeError { .. }));
    }

    #[test]
    fn truncated_null_is_end_of_input() {
        let mut reader = reader_over(b"nul");
        let mut dec = TokenDecoder::new();
        let err = dec.expect_null(&mut reader).unwrap_err();
        assert!(matches!(err, crate::errors::JsonError::EndOfInput { .. }));
    }

    #[test]
    fn true_literal_stops_before_comma() {
        let mut reader = reader_over(b"true,");
        let mut dec = TokenDecoder::new();
        let value = dec.expect_bool(&mut reader).unwrap();
        assert!(value);
        assert_eq!(reader.peek().unwrap(), Some(b','));
    }

    #[test]
    fn string_decodes_unicode_escape_to_utf8() {
        let mut reader = reader_over(b"\"\\u00e9\"");
        let mut dec = TokenDecoder::new();
        let s = dec.expect_string(&mut reader).unwrap();
        assert_eq!(s.as_bytes(), [0xC3, 0xA9]);
    }

    #[test]
    fn string_decodes_surrogate_pair_to_utf8() {
        let mut reader = reader_over(b"\"\\uD83D\\uDE00\"");
        let mut dec = TokenDecoder::new();
        let s = dec.expect_string(&mut reader).unwrap();
        assert_eq!(s.as_bytes(), [0xF0, 0x9F, 0x98, 0x80]);
    }

    #[test]
    fn string_rejects_lone_high_surrogate() {
        let mut reader = reader_over(b"\"\\uD83D\"");
        let mut dec = TokenDecoder::new();
        let err = dec.expect_string(&mut reader).unwrap_err();
        assert!(matches!(err, crate::errors::JsonError::EscapeError { .. }));
    }

    #[test]
    fn string_decodes_common_escapes() {
        let mut reader = reader_over(b"\"ab\\ncd\"");
        let mut dec = TokenDecoder::new();
        let s = dec.expect_string(&mut reader).unwrap();
        assert_eq!(s, "ab\ncd");
    }

    #[test]
    fn skip_whitespace_spans_a_full_window() {
        let mut input = vec![b' '; 64];
        input.push(b'1');
        let mut reader = reader_over(&input);
        let (n, end) = reader.skip_whitespace().unwrap();
        assert_eq!(n, 64);
        assert!(!end);
        assert_eq!(reader.peek().unwrap(), Some(b'1'));
    }

    #[test]
    fn string_rejects_truncated_utf8_lead() {
        let mut reader = reader_over(b"\"\xC2\"");
        let mut dec = TokenDecoder::new();
        let err = dec.expect_string(&mut reader).unwrap_err();
        assert!(matches!(err, crate::errors::JsonError::EncodingError { .. }));
    }

    #[test]
    fn boundary_token_straddles_window() {
        let mut input = vec![b' '; 62];
        input.extend_from_slice(b"true");
        let mut reader = reader_over(&input);
        let mut dec = TokenDecoder::new();
        let value = dec.expect_bool(&mut reader).unwrap();
        assert!(value);
    }

    #[test]
    fn boundary_string_spills_scratch_to_heap() {
        let mut input = vec![b'"'];
        input.extend(std::iter::repeat(b'a').take(INLINE_SCRATCH + 500));
        input.push(b'"');
        let mut reader = reader_over(&input);
        let mut dec = TokenDecoder::new();
        let s = dec.expect_string(&mut reader).unwrap();
        assert_eq!(s.len(), INLINE_SCRATCH + 500);
        assert!(dec.scratch.spilled());
    }

    #[test]
    fn expect_false_ok() {
        let mut reader = reader_over(b"false");
        let mut dec = TokenDecoder::new();
        let value = dec.expect_bool(&mut reader).unwrap();
        assert!(!value);
    }

    #[test]
    fn expect_bool_rejects_bad_lead() {
        let mut reader = reader_over(b"xrue");
        let mut dec = TokenDecoder::new();
        let err = dec.expect_bool(&mut reader).unwrap_err();
        assert!(matches!(err, crate::errors::JsonError::ShapeError { .. }));
    }

    #[test]
    fn expect_string_missing_opening_quote() {
        let mut reader = reader_over(b"abc\"");
        let mut dec = TokenDecoder::new();
        let err = dec.expect_string(&mut reader).unwrap_err();
        assert!(matches!(err, crate::errors::JsonError::ShapeError { .. }));
    }

    #[test]
    fn expect_string_rejects_unrecognized_escape() {
        let mut reader = reader_over(b"\"\\q\"");
        let mut dec = TokenDecoder::new();
        let err = dec.expect_string(&mut reader).unwrap_err();
        assert!(matches!(err, crate::errors::JsonError::EscapeError { .. }));
    }

    #[test]
    fn decoder_instance_is_reusable_across_tokens() {
        let mut dec = TokenDecoder::new();
        let mut reader1 = reader_over(b"\"first\"");
        assert_eq!(dec.expect_string(&mut reader1).unwrap(), "first");
        let mut reader2 = reader_over(b"\"second\"");
        assert_eq!(dec.expect_string(&mut reader2).unwrap(), "second");
    }
}
