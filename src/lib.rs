#![forbid(unsafe_code)]
//! # QOA - Quite OK Audio Format
//!
//! A library for decoding qoa files into interleaved 16-bit PCM.
//!
//! Two decoding paths share the same container records and slice decoder:
//!
//! - [`decode_all`] reads whole frames into memory and decodes them in one go.
//! - [`StreamDecoder`] decodes on demand into caller sized buffers and copes
//!   with input that arrives in arbitrary chunks (see [`FeedBuffer`]).
//!
//! ```no_run
//! let mut decoder = qoadec::StreamDecoder::open("song.qoa")?;
//! let mut buf = [0_i16; 1024];
//! loop {
//!     let n = decoder.decode(&mut buf);
//!     if n == 0 {
//!         break;
//!     }
//!     // play or store &buf[..n]
//! }
//! # Ok::<(), qoadec::DecodeError>(())
//! ```
use std::fs::File;
use std::io;
use std::path::Path;

use tracing::debug;

mod container;
mod error;
mod frame;
mod reader;
mod slice;
mod stream;

pub use container::{FrameHeader, PredictorState, Slice, StreamHeader};
pub use error::{DecodeError, Result};
pub use frame::Frame;
pub use reader::{read_up_to, FeedBuffer};
pub use slice::{dequantize, DEQUANT, SCALE_FACTORS};
pub use stream::StreamDecoder;

pub const QOA_SLICE_LEN: usize = 20;
pub const QOA_LMS_LEN: usize = 4;
pub const QOA_MAGIC: u32 = u32::from_be_bytes(*b"qoaf");
pub const QOA_SLICES_PER_FRAME: usize = 256;
pub const QOA_FRAME_LEN: usize = QOA_SLICES_PER_FRAME * QOA_SLICE_LEN;

/// A fully decoded QOA file.
#[derive(Debug, Clone)]
pub struct DecodedQoa {
    /// Number of channels in `samples`
    pub num_channels: u8,
    /// Sample rate in HZ of `samples`
    pub sample_rate: u32,
    /// Interleaved samples of all channels (e.g. L-R-L-R-L-R... if there are
    /// two channels)
    pub samples: Vec<i16>,
}

/// Decode all samples of a QOA file read from `reader`.
///
/// Frames are read whole and decoded with [`Frame::decode`]. Each frame is
/// cut to its stated sample count and the output to the stream's total
/// length, if known. If not all frames have the same number of channels and
/// the same sample rate [`DecodeError::IncompatibleFrame`] is returned;
/// [`StreamDecoder`] has no such restriction.
pub fn decode_all<R: io::Read>(mut reader: R) -> Result<DecodedQoa> {
    let header = StreamHeader::read(&mut reader)?;
    let first = Frame::read(&mut reader)?;
    let num_channels = first.header.num_channels;
    let sample_rate = first.header.sample_rate;

    let mut remaining =
        (!header.is_streaming()).then_some(header.total_samples_per_channel as usize);
    let mut samples = Vec::with_capacity(remaining.unwrap_or(0) * num_channels as usize);
    let mut next = Some(first);
    while let Some(frame) = next {
        if frame.header.num_channels != num_channels || frame.header.sample_rate != sample_rate {
            return Err(DecodeError::IncompatibleFrame);
        }
        let mut per_channel = frame.samples_per_channel();
        if let Some(remaining) = remaining.as_mut() {
            per_channel = per_channel.min(*remaining);
            *remaining -= per_channel;
        }
        samples.extend_from_slice(&frame.decode()[..per_channel * num_channels as usize]);

        next = match remaining {
            Some(0) => None,
            _ => Frame::read_next(&mut reader)?,
        };
    }

    debug!(
        channels = num_channels,
        sample_rate,
        samples = samples.len(),
        "decoded qoa file"
    );
    Ok(DecodedQoa {
        num_channels,
        sample_rate,
        samples,
    })
}

/// Same as [`decode_all`] but open the file and wrap in a BufReader first.
pub fn open_and_decode_all<P: AsRef<Path>>(path: P) -> Result<DecodedQoa> {
    let file = File::open(path.as_ref())?;
    let reader = io::BufReader::new(file);
    decode_all(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(total: u32, frames: &[(u8, u32, u16, usize)]) -> Vec<u8> {
        let mut bytes = QOA_MAGIC.to_be_bytes().to_vec();
        bytes.extend_from_slice(&total.to_be_bytes());
        for &(channels, sample_rate, frame_samples, slices) in frames {
            bytes.push(channels);
            bytes.extend_from_slice(&sample_rate.to_be_bytes()[1..]);
            bytes.extend_from_slice(&frame_samples.to_be_bytes());
            bytes.extend_from_slice(&1_u16.to_be_bytes());
            bytes.resize(bytes.len() + channels as usize * PredictorState::SIZE, 0);
            bytes.resize(bytes.len() + slices * Slice::SIZE, 0);
        }
        bytes
    }

    #[test]
    fn test_decode_all() {
        let bytes = stream(60, &[(2, 44100, 40, 4), (2, 44100, 20, 2)]);
        let decoded = decode_all(Cursor::new(bytes)).unwrap();
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.num_channels, 2);
        assert_eq!(decoded.samples.len(), 60 * 2);
        assert!(decoded.samples.iter().all(|&s| s == 1));
    }

    #[test]
    fn test_decode_all_trims_to_total() {
        let bytes = stream(30, &[(1, 8000, 25, 2), (1, 8000, 20, 1)]);
        let decoded = decode_all(Cursor::new(bytes)).unwrap();
        assert_eq!(decoded.samples.len(), 30);
    }

    #[test]
    fn test_decode_all_unknown_length() {
        let bytes = stream(0, &[(1, 8000, 25, 2), (1, 8000, 20, 1)]);
        let decoded = decode_all(Cursor::new(bytes)).unwrap();
        assert_eq!(decoded.samples.len(), 45);
    }

    #[test]
    fn test_incompatible_frames() {
        let bytes = stream(0, &[(1, 8000, 20, 1), (1, 16000, 20, 1)]);
        assert!(matches!(
            decode_all(Cursor::new(bytes)),
            Err(DecodeError::IncompatibleFrame)
        ));
    }

    #[test]
    fn test_dangling_frame_header_is_an_error() {
        let mut bytes = stream(0, &[(1, 8000, 40, 2)]);
        bytes.extend_from_slice(&[1, 0, 0x1f, 0x40, 0, 20, 0, 40]);
        assert!(matches!(
            decode_all(Cursor::new(bytes)),
            Err(DecodeError::TruncatedInput {
                record: "predictor state",
                got: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_no_frames() {
        let bytes = stream(10, &[]);
        assert!(matches!(
            decode_all(Cursor::new(bytes)),
            Err(DecodeError::TruncatedInput { got: 0, .. })
        ));
    }
}
