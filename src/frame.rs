//! Whole-frame decoding for fully buffered input.

use std::io;

use tracing::trace;

use crate::container::{FrameHeader, PredictorState, Slice};
use crate::error::{DecodeError, Result};
use crate::reader::read_up_to;
use crate::QOA_SLICE_LEN;

/// A frame read completely into memory.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    /// One predictor per channel, as transmitted at the start of the frame.
    pub states: Vec<PredictorState>,
    /// Channel interleaved: slice `i` belongs to channel `i % num_channels`.
    pub slices: Vec<Slice>,
}

impl Frame {
    /// Read a frame header, its predictor states and its slices.
    ///
    /// Running out of input while reading slices is not an error: the frame
    /// keeps the complete slices read so far, as long as they form whole
    /// channel groups.
    pub fn read<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let header = FrameHeader::read(reader)?;
        Self::read_body(header, reader)
    }

    /// Like [`Frame::read`] but returns `Ok(None)` if the input ends before
    /// the first byte of the frame header. Running out anywhere later is
    /// still an error.
    pub fn read_next<R: io::Read + ?Sized>(reader: &mut R) -> Result<Option<Self>> {
        let header = match FrameHeader::read(reader) {
            Ok(header) => header,
            Err(e) if e.is_clean_eof() => return Ok(None),
            Err(e) => return Err(e),
        };
        Self::read_body(header, reader).map(Some)
    }

    /// Predictor states and slices following `header`.
    fn read_body<R: io::Read + ?Sized>(header: FrameHeader, reader: &mut R) -> Result<Self> {
        let channels = header.num_channels as usize;

        let states = (0..channels)
            .map(|_| PredictorState::read(reader))
            .collect::<Result<Vec<_>>>()?;

        let max_slices = header.slices_per_channel() * channels;
        let mut slices = Vec::with_capacity(max_slices);
        let mut bytes = [0_u8; Slice::SIZE];
        while slices.len() < max_slices {
            if read_up_to(reader, &mut bytes)? != Slice::SIZE {
                break;
            }
            slices.push(Slice::parse(&bytes));
        }
        if slices.len() % channels != 0 {
            return Err(DecodeError::InconsistentFrame {
                slices: slices.len(),
                channels: header.num_channels,
            });
        }

        trace!(
            channels,
            frame_samples = header.frame_samples,
            slices = slices.len(),
            "read frame"
        );
        Ok(Self {
            header,
            states,
            slices,
        })
    }

    /// Number of meaningful samples per channel: the header's count, limited
    /// by the slices actually present.
    pub fn samples_per_channel(&self) -> usize {
        let channels = self.header.num_channels as usize;
        let available = self.slices.len() / channels * QOA_SLICE_LEN;
        available.min(self.header.frame_samples as usize)
    }

    /// Decode every slice into interleaved PCM.
    ///
    /// The result holds `slices.len() * 20` samples, including any padding at
    /// the end of the last slice. The frame's own predictor states are left
    /// untouched.
    pub fn decode(&self) -> Vec<i16> {
        let channels = self.header.num_channels as usize;
        let mut states = self.states.clone();
        let mut samples = vec![0_i16; self.slices.len() * QOA_SLICE_LEN];

        for (i, slice) in self.slices.iter().enumerate() {
            let channel = i % channels;
            let occurrence = i / channels;
            let offset = occurrence * channels * QOA_SLICE_LEN + channel;
            slice.decode_into(&mut states[channel], &mut samples[offset..], channels);
        }
        samples
    }
}
