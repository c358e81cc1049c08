//! Byte source helpers built on [`std::io::Read`].
//!
//! A short read is the only truncation signal: a reader that returns fewer
//! bytes than asked for (including zero) simply has no more data right now.

use std::collections::VecDeque;
use std::io;

use crate::error::{DecodeError, Result};

/// Read into `buf` until it is full or the reader reports no more data.
///
/// Returns the number of bytes read. `Interrupted` is retried and
/// `WouldBlock` counts as "no more data".
pub fn read_up_to<R: io::Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read exactly `LEN` bytes for `record`, failing with
/// [`DecodeError::TruncatedInput`] on a short read.
pub(crate) fn read_record<R: io::Read + ?Sized, const LEN: usize>(
    reader: &mut R,
    record: &'static str,
) -> Result<[u8; LEN]> {
    let mut bytes = [0_u8; LEN];
    let got = read_up_to(reader, &mut bytes)?;
    if got != LEN {
        return Err(DecodeError::TruncatedInput {
            record,
            expected: LEN,
            got,
        });
    }
    Ok(bytes)
}

/// In-memory byte queue for sources that deliver data in chunks, such as a
/// network stream.
///
/// Reads drain the queue and return 0 once it is empty; more bytes can be
/// pushed at any time afterwards.
#[derive(Debug, Default, Clone)]
pub struct FeedBuffer {
    bytes: VecDeque<u8>,
}

impl FeedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `data` to the end of the queue.
    pub fn push(&mut self, data: &[u8]) {
        self.bytes.extend(data);
    }

    /// Number of bytes waiting to be read.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&[u8]> for FeedBuffer {
    fn from(data: &[u8]) -> Self {
        Self {
            bytes: data.iter().copied().collect(),
        }
    }
}

impl io::Read for FeedBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.bytes.len());
        for (dst, src) in buf.iter_mut().zip(self.bytes.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}
