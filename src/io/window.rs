// swarjson
// A streaming JSON decoder built around a 64-byte SWAR sliding window.

use std::io;

use log::{debug, trace};

use crate::errors::{JsonError, Result};
use crate::io::source::Source;
use crate::util::swar::{all8, compress8, digit_candidate, eq_lane, splat};

/// Size, in bytes, of the window reader's physical buffer and of each of its 8 packed lanes.
pub const WINDOW_LEN: usize = 64;

const LANE_COUNT: usize = 8;
const LANE_LEN: usize = WINDOW_LEN / LANE_COUNT;

/// A byte class the window reader can test window positions against. Each variant has a
/// precomputed 64-bit positional bitset (one bit per window byte) recomputed on every refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteClass {
    /// `{0x20, 0x09, 0x0A, 0x0D}`.
    Whitespace,
    /// `"`.
    Quote,
    /// `\`.
    ReverseSolidus,
    /// ASCII `'0'..='9'`.
    Digit,
    /// ASCII `'0'` exactly.
    ZeroDigit,
}

/// The sticky terminal state of the byte source. Once anything other than `Open` is observed,
/// the window reader never calls the source again; refills become no-ops that zero the buffer.
#[derive(Debug, Clone)]
enum SourceState {
    Open,
    Eof,
    Err { kind: io::ErrorKind, message: String },
}

impl SourceState {
    fn is_terminal(&self) -> bool {
        !matches!(self, SourceState::Open)
    }
}

/// Repacks a 64-byte buffer into 8 big-endian lanes, lane *i* holding bytes `[8i, 8i+8)`.
fn pack_chunks(buf: &[u8; WINDOW_LEN]) -> [u64; LANE_COUNT] {
    let mut chunks = [0u64; LANE_COUNT];
    for (i, lane) in chunks.iter_mut().enumerate() {
        let start = i * LANE_LEN;
        let mut bytes = [0u8; LANE_LEN];
        bytes.copy_from_slice(&buf[start..start + LANE_LEN]);
        *lane = u64::from_be_bytes(bytes);
    }
    chunks
}

/// Builds the positional bitset for `class` over all 8 lanes of `chunks`. Bit `63-k` of the
/// result is set iff window byte `k` belongs to `class`.
fn class_mask(chunks: &[u64; LANE_COUNT], class: ByteClass) -> u64 {
    let mut mask = 0u64;
    for (i, &lane) in chunks.iter().enumerate() {
        let candidate = match class {
            ByteClass::Whitespace => {
                all8(eq_lane(lane, splat(b' ')))
                    | all8(eq_lane(lane, splat(b'\t')))
                    | all8(eq_lane(lane, splat(b'\n')))
                    | all8(eq_lane(lane, splat(b'\r')))
            }
            ByteClass::Quote => all8(eq_lane(lane, splat(b'"'))),
            ByteClass::ReverseSolidus => all8(eq_lane(lane, splat(b'\\'))),
            ByteClass::Digit => all8(digit_candidate(lane)),
            ByteClass::ZeroDigit => all8(eq_lane(lane, splat(b'0'))),
        };
        let byte = compress8(candidate);
        mask |= byte << (56 - 8 * i);
    }
    mask
}

/// Precomputed positional bitsets for every byte class the token decoder queries, refreshed
/// together whenever the window is repacked.
#[derive(Debug, Clone, Copy, Default)]
struct Masks {
    whitespace: u64,
    quote: u64,
    reverse_solidus: u64,
    digit: u64,
    zero_digit: u64,
}

impl Masks {
    fn compute(chunks: &[u64; LANE_COUNT]) -> Masks {
        Masks {
            whitespace: class_mask(chunks, ByteClass::Whitespace),
            quote: class_mask(chunks, ByteClass::Quote),
            reverse_solidus: class_mask(chunks, ByteClass::ReverseSolidus),
            digit: class_mask(chunks, ByteClass::Digit),
            zero_digit: class_mask(chunks, ByteClass::ZeroDigit),
        }
    }
}

/// A `WindowReader` maintains a 64-byte circular view over a [`Source`], repacked into 8
/// big-endian lanes so that byte-class membership can be tested 8 bytes at a time via SWAR
/// bitmask arithmetic rather than one byte at a time.
///
/// The window is not a general-purpose ring buffer: it holds exactly 64 bytes and is refilled
/// wholesale whenever the logical position crosses a 64-byte boundary. There is no
/// producer/consumer gap to reason about.
pub struct WindowReader<S> {
    source: S,
    buf: [u8; WINDOW_LEN],
    chunks: [u64; LANE_COUNT],
    masks: Masks,
    rawcur: u64,
    bufend: usize,
    state: SourceState,
}

impl<S: Source> WindowReader<S> {
    /// Constructs a new reader over `source`, eagerly filling and packing the first window.
    pub fn new(source: S) -> WindowReader<S> {
        let mut reader = WindowReader {
            source,
            buf: [0u8; WINDOW_LEN],
            chunks: [0u64; LANE_COUNT],
            masks: Masks::default(),
            rawcur: 0,
            bufend: 0,
            state: SourceState::Open,
        };
        reader.refill();
        reader
    }

    /// Total number of bytes consumed from the logical stream so far.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.rawcur
    }

    #[inline]
    fn window_pos(&self) -> usize {
        (self.rawcur % WINDOW_LEN as u64) as usize
    }

    /// Number of valid (non-padding) bytes remaining in the current window from the current
    /// position.
    #[inline]
    fn avail(&self) -> usize {
        self.bufend.saturating_sub(self.window_pos())
    }

    /// Refills `buf`/`chunks`/`masks` for the window currently aligned on `rawcur`. Idempotent
    /// once the source has reached a terminal state: repeated refills after that just zero the
    /// buffer, matching the sticky end-of-stream contract.
    fn refill(&mut self) {
        debug_assert_eq!(self.rawcur % WINDOW_LEN as u64, 0, "refill only happens on a window boundary");

        if self.state.is_terminal() {
            self.buf = [0u8; WINDOW_LEN];
            self.bufend = 0;
        }
        else {
            let mut filled = 0;
            while filled < WINDOW_LEN {
                match self.source.fill(&mut self.buf[filled..]) {
                    Ok(0) => {
                        self.state = SourceState::Eof;
                        break;
                    }
                    Ok(n) => {
                        let remaining = WINDOW_LEN - filled;
                        if n > remaining {
                            panic!(
                                "source returned {n} bytes but only {remaining} were requested \
                                 (contract violation)"
                            );
                        }
                        filled += n;
                    }
                    Err(err) => {
                        self.state = SourceState::Err { kind: err.kind(), message: err.to_string() };
                        break;
                    }
                }
            }

            trace!("refilled window at pos {}: {filled}/{WINDOW_LEN} bytes", self.rawcur);

            for b in &mut self.buf[filled..] {
                *b = 0;
            }
            self.bufend = filled;

            if let SourceState::Err { message, .. } = &self.state {
                debug!("source reported a terminal error: {message}");
            }
        }

        self.chunks = pack_chunks(&self.buf);
        self.masks = Masks::compute(&self.chunks);
    }

    /// Advances the logical position by `n` bytes (`0..=WINDOW_LEN`), refilling the window first
    /// if this crosses into a new one. An out-of-range `n` is a contract violation on the
    /// caller's part and is fatal.
    fn advance(&mut self, n: usize) {
        assert!(n <= WINDOW_LEN, "advance of {n} bytes exceeds window size (contract violation)");
        self.rawcur += n as u64;
        if self.rawcur % WINDOW_LEN as u64 == 0 {
            self.refill();
        }
    }

    /// Returns `Err` if the source is in a genuine error state (as opposed to a clean
    /// end-of-stream), surfacing it to the caller.
    fn surface_terminal(&self) -> Result<()> {
        if let SourceState::Err { kind, message } = &self.state {
            Err(JsonError::SourceError(io::Error::new(*kind, message.clone())))
        }
        else {
            Ok(())
        }
    }

    /// Returns the current byte without advancing, or `None` at the end of the stream.
    pub fn peek(&self) -> Result<Option<u8>> {
        let wp = self.window_pos();
        if wp < self.bufend {
            Ok(Some(self.buf[wp]))
        }
        else {
            self.surface_terminal()?;
            Ok(None)
        }
    }

    /// Copies up to `min(dst.len(), WINDOW_LEN)` bytes starting at the current position into
    /// `dst`, advancing the window by however many bytes were actually copied. Returns the
    /// number of bytes copied and whether the stream has been exhausted.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<(usize, bool)> {
        let want = dst.len().min(WINDOW_LEN);
        let mut written = 0;

        while written < want {
            if self.avail() == 0 {
                self.surface_terminal()?;
                return Ok((written, true));
            }
            let wp = self.window_pos();
            let n = self.avail().min(want - written);
            dst[written..written + n].copy_from_slice(&self.buf[wp..wp + n]);
            written += n;
            self.advance(n);
        }

        Ok((written, self.avail() == 0))
    }

    /// Advances past any run of whitespace (`{0x20, 0x09, 0x0A, 0x0D}`), spanning as many window
    /// refills as necessary. Returns the number of bytes skipped and whether the stream ended.
    pub fn skip_whitespace(&mut self) -> Result<(usize, bool)> {
        let mut total = 0;
        loop {
            let avail = self.avail();
            if avail == 0 {
                self.surface_terminal()?;
                return Ok((total, true));
            }

            let run = matching_run(self.masks.whitespace, self.window_pos());
            if run == 0 {
                return Ok((total, false));
            }

            self.advance(run);
            total += run;

            if run < avail {
                return Ok((total, false));
            }
        }
    }

    /// Returns the number of bytes remaining in the current window until the next `"`: `0` if
    /// the current byte is a quote, up to `WINDOW_LEN` if none is found in the window.
    pub fn scan_to_quote(&self) -> usize {
        nonmatching_run(self.masks.quote, self.window_pos())
    }

    /// Returns the number of bytes remaining in the current window until the next `\`, on the
    /// same terms as [`Self::scan_to_quote`].
    pub fn scan_to_reverse_solidus(&self) -> usize {
        nonmatching_run(self.masks.reverse_solidus, self.window_pos())
    }

    /// Returns the length of the leading run of ASCII digit bytes (`'0'..='9'`) in the current
    /// window, without advancing.
    pub fn digit_run_length(&self) -> usize {
        matching_run(self.masks.digit, self.window_pos())
    }

    /// Returns `true` if the current byte is the digit `'0'`, without advancing. Exposed so a
    /// higher-layer number parser can reject a leading zero followed by further digits without
    /// re-deriving the test from [`Self::digit_run_length`].
    pub fn at_zero_digit(&self) -> bool {
        let wp = self.window_pos();
        wp < self.bufend && (self.masks.zero_digit >> (63 - wp)) & 1 == 1
    }
}

/// Length of the leading run of bytes matching `class_mask`, starting at window position `wp`.
/// Rotating left by `wp` aligns the current position to the most-significant bit, so a run of
/// leading one-bits (i.e. leading zeros of the bitwise complement) counts matching bytes ahead.
#[inline]
fn matching_run(class_mask: u64, wp: usize) -> usize {
    let rotated = class_mask.rotate_left(wp as u32);
    (!rotated).leading_zeros() as usize
}

/// Length of the leading run of bytes *not* matching `class_mask`, on the same rotation scheme
/// as [`matching_run`].
#[inline]
fn nonmatching_run(class_mask: u64, wp: usize) -> usize {
    let rotated = class_mask.rotate_left(wp as u32);
    rotated.leading_zeros() as usize
}
