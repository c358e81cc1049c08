//! Records of the QOA container.
//!
//! Every record is big-endian and fixed size. Each type can be read straight
//! from a reader (all-or-nothing) or parsed from an already staged byte array,
//! which is what the streaming decoder does with records that arrive in
//! pieces.

use std::io;
use std::time::Duration;

use crate::error::{DecodeError, Result};
use crate::reader::read_record;
use crate::{QOA_LMS_LEN, QOA_MAGIC, QOA_SLICES_PER_FRAME, QOA_SLICE_LEN};

/// The file header: magic tag and the number of samples per channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Samples per channel in the whole stream. 0 means the length is unknown.
    pub total_samples_per_channel: u32,
}

impl StreamHeader {
    pub const SIZE: usize = 8;

    pub fn read<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Self::parse(&read_record(reader, "stream header")?)
    }

    pub fn parse(bytes: &[u8; Self::SIZE]) -> Result<Self> {
        let magic = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != QOA_MAGIC {
            return Err(DecodeError::MalformedHeader("missing qoaf magic"));
        }
        Ok(Self {
            total_samples_per_channel: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// True when the total length is not known (live or streamed source).
    pub fn is_streaming(&self) -> bool {
        self.total_samples_per_channel == 0
    }

    /// Total play time at `sample_rate`, if the length is known.
    pub fn duration(&self, sample_rate: u32) -> Option<Duration> {
        if self.is_streaming() || sample_rate == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(
            self.total_samples_per_channel as f64 / sample_rate as f64,
        ))
    }
}

/// The metadata at the beginning of each frame of slices.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameHeader {
    /// Number of channels in this frame
    pub num_channels: u8,
    /// Sample rate in HZ for this frame (24 bits on the wire)
    pub sample_rate: u32,
    /// Samples per channel in this frame
    pub frame_samples: u16,
    /// Encoded size of the frame in bytes, header included. Informational.
    pub frame_size: u16,
}

impl FrameHeader {
    pub const SIZE: usize = 8;

    pub fn read<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Self::parse(&read_record(reader, "frame header")?)
    }

    pub fn parse(bytes: &[u8; Self::SIZE]) -> Result<Self> {
        let header = Self {
            num_channels: bytes[0],
            sample_rate: u32::from_be_bytes([0, bytes[1], bytes[2], bytes[3]]),
            frame_samples: u16::from_be_bytes([bytes[4], bytes[5]]),
            frame_size: u16::from_be_bytes([bytes[6], bytes[7]]),
        };
        if header.num_channels == 0 {
            return Err(DecodeError::MalformedHeader("num_channels cannot be 0"));
        }
        if header.sample_rate == 0 {
            return Err(DecodeError::MalformedHeader("sample_rate cannot be 0"));
        }
        if header.frame_samples == 0 {
            return Err(DecodeError::MalformedHeader("frame_samples cannot be 0"));
        }
        if header.frame_size == 0 {
            return Err(DecodeError::MalformedHeader("frame_size cannot be 0"));
        }
        Ok(header)
    }

    /// Slices each channel carries in this frame, never more than 256.
    pub fn slices_per_channel(&self) -> usize {
        (self.frame_samples as usize)
            .div_ceil(QOA_SLICE_LEN)
            .min(QOA_SLICES_PER_FRAME)
    }
}

/// Per-channel LMS predictor: the last four samples and their weights.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PredictorState {
    pub history: [i16; QOA_LMS_LEN],
    pub weights: [i16; QOA_LMS_LEN],
}

impl PredictorState {
    pub const SIZE: usize = 16;

    pub fn read<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self::parse(&read_record(reader, "predictor state")?))
    }

    /// Any 16 bytes form a valid state; the u16 fields are reinterpreted as i16.
    pub fn parse(bytes: &[u8; Self::SIZE]) -> Self {
        let mut state = Self::default();
        for i in 0..QOA_LMS_LEN {
            state.history[i] = i16::from_be_bytes([bytes[2 * i], bytes[2 * i + 1]]);
            let w = 2 * (QOA_LMS_LEN + i);
            state.weights[i] = i16::from_be_bytes([bytes[w], bytes[w + 1]]);
        }
        state
    }
}

/// One channel's worth of 20 quantized residuals.
///
/// ```text
/// | 63..60   | 59..57 | 56..54 | ... | 2..0  |
/// | sf_quant | qr00   | qr01   | ... | qr19  |
/// ```
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Slice {
    /// Scale factor index, 0..16.
    pub quant: u8,
    /// Residual codes, each 0..8.
    pub residuals: [u8; QOA_SLICE_LEN],
}

impl Slice {
    pub const SIZE: usize = 8;

    pub fn read<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self::parse(&read_record(reader, "slice")?))
    }

    pub fn parse(bytes: &[u8; Self::SIZE]) -> Self {
        Self::from_word(u64::from_be_bytes(*bytes))
    }

    pub fn from_word(mut word: u64) -> Self {
        let quant = (word >> 60) as u8;
        let mut residuals = [0_u8; QOA_SLICE_LEN];
        for qr in residuals.iter_mut().rev() {
            *qr = (word & 0x7) as u8;
            word >>= 3;
        }
        Self { quant, residuals }
    }

    /// Pack back into the 64-bit wire word.
    pub fn to_word(&self) -> u64 {
        self.residuals
            .iter()
            .fold((self.quant & 0xf) as u64, |word, &qr| (word << 3) | (qr & 0x7) as u64)
    }
}
