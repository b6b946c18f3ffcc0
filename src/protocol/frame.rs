//! CRLF frame reassembly
//!
//! Rebuilds protocol lines from arbitrarily fragmented socket reads. The
//! terminator is `\r\n`; chunk boundaries can fall anywhere, including
//! between the CR and the LF, so incoming bytes are buffered and scanned
//! for the pair. Bare `\r` or `\n` bytes that are not part of a
//! CRLF pair remain in the line content.

use bytes::BytesMut;

use crate::error::Result;

const INITIAL_BUFFER_SIZE: usize = 8192;

/// Incremental CRLF line reassembler.
///
/// The buffer grows as needed, so multi-kilobyte value lines are handled
/// without configuration.
#[derive(Debug)]
pub struct FrameReader {
    buf: BytesMut,
    /// Bytes already scanned for a terminator; avoids rescanning the
    /// buffered prefix on every chunk
    scanned: usize,
}

impl FrameReader {
    pub fn new() -> Self {
        FrameReader {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            scanned: 0,
        }
    }

    /// Append a chunk and invoke `on_line` for every completed line, with
    /// the CRLF stripped.
    ///
    /// An error from the sink (a fatal protocol error downstream) aborts
    /// the scan and propagates; remaining buffered bytes are left in place,
    /// which is fine because the connection is torn down on that path.
    pub fn feed<F>(&mut self, chunk: &[u8], mut on_line: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        self.buf.extend_from_slice(chunk);

        loop {
            // A terminator ends at index i >= 1 with buf[i-1] == '\r'
            let mut terminator = None;
            let mut i = self.scanned.max(1);
            while i < self.buf.len() {
                if self.buf[i] == b'\n' && self.buf[i - 1] == b'\r' {
                    terminator = Some(i);
                    break;
                }
                i += 1;
            }

            match terminator {
                Some(i) => {
                    let line = self.buf.split_to(i + 1);
                    self.scanned = 0;
                    on_line(&line[..i - 1])?;
                }
                None => {
                    self.scanned = self.buf.len();
                    return Ok(());
                }
            }
        }
    }

    /// Bytes currently buffered without a completed terminator
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}
