// swarjson
// A streaming JSON decoder built around a 64-byte SWAR sliding window.

use std::io;

/// `Source` is the window reader's only contract with the outside world: fill as much of the
/// given buffer as is currently available, and say so.
///
/// A `fill` call may return fewer bytes than `buf.len()` (a partial fill) without that meaning
/// end-of-stream; the window reader loops on partial fills until the buffer is full or the
/// source reports it has nothing left. Returning `Ok(0)` is the source's end-of-stream signal
/// and is sticky: once observed, the window reader never calls `fill` again. Returning `Err`
/// is likewise sticky and terminal.
///
/// Any `std::io::Read` is a `Source` for free; there is no adapter to write.
pub trait Source {
    /// Fills as much of `buf` as is currently available, returning the number of bytes written
    /// (`0..=buf.len()`). `Ok(0)` signals end-of-stream.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<R: io::Read> Source for R {
    #[inline]
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}
