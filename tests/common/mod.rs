//! Synthetic QOA streams for tests.
#![allow(dead_code)]

use std::io::{self, Cursor};

use qoadec::{Frame, PredictorState, StreamDecoder, QOA_MAGIC, QOA_SLICE_LEN};

/// Small deterministic generator so tests do not need fixtures.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed ^ 0x9e37_79b9_7f4a_7c15)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let x = self.0;
        (x ^ (x >> 29)).wrapping_mul(0xbf58_476d_1ce4_e5b9) ^ (x >> 32)
    }

    pub fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    fn small_i16(&mut self, range: i16) -> i16 {
        (self.below(2 * range as u64 + 1) as i64 - range as i64) as i16
    }
}

#[derive(Debug, Clone)]
pub struct TestFrame {
    pub channels: u8,
    pub sample_rate: u32,
    pub frame_samples: u16,
    pub states: Vec<PredictorState>,
    /// Channel interleaved slice words.
    pub slices: Vec<u64>,
}

impl TestFrame {
    /// A frame with plausible predictor states and random slices.
    pub fn random(rng: &mut Lcg, channels: u8, frame_samples: u16) -> Self {
        let states = (0..channels)
            .map(|_| PredictorState {
                history: [
                    rng.small_i16(4000),
                    rng.small_i16(4000),
                    rng.small_i16(4000),
                    rng.small_i16(4000),
                ],
                weights: [
                    rng.small_i16(300),
                    rng.small_i16(300),
                    -(1 << 13) + rng.small_i16(300),
                    (1 << 14) + rng.small_i16(300),
                ],
            })
            .collect();
        let slices_per_channel = (frame_samples as usize).div_ceil(QOA_SLICE_LEN);
        let slices = (0..slices_per_channel * channels as usize)
            .map(|_| {
                let quant = rng.below(9);
                (rng.next_u64() & !(0xf << 60)) | (quant << 60)
            })
            .collect();
        Self {
            channels,
            sample_rate: 44100,
            frame_samples,
            states,
            slices,
        }
    }

    pub fn write(&self, bytes: &mut Vec<u8>) {
        let frame_size = 8 + self.states.len() * 16 + self.slices.len() * 8;
        bytes.push(self.channels);
        bytes.extend_from_slice(&self.sample_rate.to_be_bytes()[1..]);
        bytes.extend_from_slice(&self.frame_samples.to_be_bytes());
        bytes.extend_from_slice(&(frame_size as u16).to_be_bytes());
        for state in &self.states {
            for h in state.history {
                bytes.extend_from_slice(&h.to_be_bytes());
            }
            for w in state.weights {
                bytes.extend_from_slice(&w.to_be_bytes());
            }
        }
        for word in &self.slices {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
    }

    /// The same frame carrying only `channel`, as a mono frame.
    pub fn single_channel(&self, channel: usize) -> Self {
        let channels = self.channels as usize;
        Self {
            channels: 1,
            states: vec![self.states[channel]],
            slices: self
                .slices
                .iter()
                .skip(channel)
                .step_by(channels)
                .copied()
                .collect(),
            ..self.clone()
        }
    }
}

pub fn stream_bytes(total_samples_per_channel: u32, frames: &[TestFrame]) -> Vec<u8> {
    let mut bytes = QOA_MAGIC.to_be_bytes().to_vec();
    bytes.extend_from_slice(&total_samples_per_channel.to_be_bytes());
    for frame in frames {
        frame.write(&mut bytes);
    }
    bytes
}

/// Frames of `channels` channels adding up to `total` samples per channel.
pub fn random_frames(rng: &mut Lcg, channels: u8, total: usize) -> Vec<TestFrame> {
    let mut frames = Vec::new();
    let mut left = total;
    while left > 0 {
        let n = left.min(qoadec::QOA_FRAME_LEN);
        frames.push(TestFrame::random(rng, channels, n as u16));
        left -= n;
    }
    frames
}

/// Reference output: whole frames through [`Frame::decode`], each cut to its
/// sample count and the result cut to the stream's total.
pub fn bulk_decode(bytes: &[u8]) -> Vec<i16> {
    let mut reader = Cursor::new(bytes);
    let header = qoadec::StreamHeader::read(&mut reader).unwrap();
    let mut remaining = if header.is_streaming() {
        usize::MAX
    } else {
        header.total_samples_per_channel as usize
    };
    let mut out = Vec::new();
    while remaining > 0 {
        let Some(frame) = Frame::read_next(&mut reader).unwrap() else {
            break;
        };
        let per_channel = frame.samples_per_channel().min(remaining);
        remaining -= per_channel;
        let channels = frame.header.num_channels as usize;
        out.extend_from_slice(&frame.decode()[..per_channel * channels]);
    }
    out
}

/// Drain a decoder with a fixed buffer size.
pub fn stream_decode<R: io::Read>(decoder: &mut StreamDecoder<R>, buf_size: usize) -> Vec<i16> {
    let mut buf = vec![0_i16; buf_size];
    let mut out = Vec::new();
    loop {
        let n = decoder.decode(&mut buf);
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&buf[..n]);
    }
}
