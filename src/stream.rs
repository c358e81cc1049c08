//! Incremental decoder for arbitrarily chunked QOA input.
//!
//! [`StreamDecoder`] pulls records from its reader only as far as needed to
//! fill the caller's buffer. Records that arrive in pieces are staged until
//! complete, and decoded samples that do not fit are kept for the next call,
//! so decoding resumes exactly where it stopped.

use std::collections::VecDeque;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::container::{FrameHeader, PredictorState, Slice, StreamHeader};
use crate::error::{DecodeError, Result};
use crate::reader::read_up_to;
use crate::QOA_SLICE_LEN;

/// Which record the decoder expects next.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    ReadFrameHeader,
    /// `cursor` predictor states of the current frame are already read.
    ReadPredictorStates { cursor: usize },
    /// `cursor` slices of the current frame are already read.
    ReadSlices { cursor: usize },
    /// The sample budget is spent or the stream is broken.
    Finished,
}

/// Bytes of a record that has not fully arrived yet.
#[derive(Debug, Default)]
struct Staging {
    bytes: [u8; PredictorState::SIZE],
    filled: usize,
}

impl Staging {
    /// Top up the staged record to `N` bytes. Returns the record once complete.
    fn fill<R: io::Read, const N: usize>(
        &mut self,
        reader: &mut R,
    ) -> io::Result<Option<[u8; N]>> {
        let got = read_up_to(reader, &mut self.bytes[self.filled..N])?;
        self.filled += got;
        if self.filled < N {
            return Ok(None);
        }
        self.filled = 0;
        let mut record = [0_u8; N];
        record.copy_from_slice(&self.bytes[..N]);
        Ok(Some(record))
    }
}

/// Streaming decoder of QOA files.
///
/// Call [`StreamDecoder::decode`] with a buffer of any size to receive the
/// next interleaved samples. A return value of 0 means no more samples could
/// be produced: the input is exhausted (or, for a [`FeedBuffer`] source,
/// currently empty).
///
/// The predictor of every channel is re-seeded from each frame's own
/// transmitted state; nothing carries over between frames except the output
/// position.
///
/// [`FeedBuffer`]: crate::FeedBuffer
#[derive(Debug)]
pub struct StreamDecoder<R> {
    reader: R,
    stream_header: StreamHeader,
    frame_header: FrameHeader,
    states: Vec<PredictorState>,
    phase: Phase,
    staging: Staging,
    /// Samples per channel produced for the current frame.
    decoded_this_frame: usize,
    /// Samples per channel produced for the whole stream.
    decoded_total: u64,
    /// One slice per channel, interleaved.
    batch: Box<[i16]>,
    /// Decoded samples that did not fit into the caller's buffer.
    pending: VecDeque<i16>,
    error: Option<DecodeError>,
}

impl<R: io::Read> StreamDecoder<R> {
    /// Read the stream header and first frame header from `reader`.
    ///
    /// Fails if either cannot be read: without a first frame there is nothing
    /// to seed the decoder with. StreamDecoder makes many small reads so
    /// wrapping a `File` with a `BufReader` is recommended.
    pub fn new(mut reader: R) -> Result<Self> {
        let stream_header = StreamHeader::read(&mut reader)?;
        let frame_header = FrameHeader::read(&mut reader)?;
        debug!(
            total_samples_per_channel = stream_header.total_samples_per_channel,
            channels = frame_header.num_channels,
            sample_rate = frame_header.sample_rate,
            "opened qoa stream"
        );

        let channels = frame_header.num_channels as usize;
        Ok(Self {
            reader,
            stream_header,
            frame_header,
            states: vec![PredictorState::default(); channels],
            phase: Phase::ReadPredictorStates { cursor: 0 },
            staging: Staging::default(),
            decoded_this_frame: 0,
            decoded_total: 0,
            batch: vec![0_i16; channels * QOA_SLICE_LEN].into_boxed_slice(),
            pending: VecDeque::new(),
            error: None,
        })
    }

    /// Decode as many samples as fit into `dest` and return how many were
    /// written.
    ///
    /// Output is interleaved by channel. Unless `dest` is shorter than one
    /// sample per channel, a call never ends in the middle of a sample frame.
    /// Returns 0 once no further samples can be produced.
    pub fn decode(&mut self, dest: &mut [i16]) -> usize {
        let mut limit = aligned_limit(dest.len(), 0, self.channels());

        let mut written = self.pending.len().min(limit);
        for (slot, sample) in dest.iter_mut().zip(self.pending.drain(..written)) {
            *slot = sample;
        }

        while written < limit {
            match self.phase {
                Phase::Finished => break,
                Phase::ReadFrameHeader => {
                    let Some(bytes) = self.fill_record::<{ FrameHeader::SIZE }>() else {
                        break;
                    };
                    match FrameHeader::parse(&bytes) {
                        Ok(header) => {
                            self.start_frame(header);
                            limit = aligned_limit(dest.len(), written, self.channels());
                        }
                        Err(e) => {
                            self.fail(e);
                            break;
                        }
                    }
                }
                Phase::ReadPredictorStates { cursor } => {
                    let Some(bytes) = self.fill_record::<{ PredictorState::SIZE }>() else {
                        break;
                    };
                    self.states[cursor] = PredictorState::parse(&bytes);
                    self.phase = if cursor + 1 == self.states.len() {
                        self.decoded_this_frame = 0;
                        Phase::ReadSlices { cursor: 0 }
                    } else {
                        Phase::ReadPredictorStates { cursor: cursor + 1 }
                    };
                }
                Phase::ReadSlices { cursor } => {
                    let Some(bytes) = self.fill_record::<{ Slice::SIZE }>() else {
                        break;
                    };
                    let channels = self.channels();
                    let channel = cursor % channels;
                    Slice::parse(&bytes).decode_into(
                        &mut self.states[channel],
                        &mut self.batch[channel..],
                        channels,
                    );
                    let cursor = cursor + 1;
                    self.phase = Phase::ReadSlices { cursor };
                    if cursor % channels == 0 {
                        written += self.emit_batch(&mut dest[written..limit]);
                        self.finish_batch(cursor);
                    }
                }
            }
        }
        written
    }

    /// Decode up to `max_samples` interleaved samples into a new vector.
    pub fn decode_to_vec(&mut self, max_samples: usize) -> Vec<i16> {
        let mut samples = vec![0_i16; max_samples];
        let mut len = 0;
        while len < max_samples {
            let n = self.decode(&mut samples[len..]);
            if n == 0 {
                break;
            }
            len += n;
        }
        samples.truncate(len);
        samples
    }

    /// Read the rest of the current record. `None` if it has not fully
    /// arrived yet or the reader failed.
    fn fill_record<const N: usize>(&mut self) -> Option<[u8; N]> {
        match self.staging.fill::<R, N>(&mut self.reader) {
            Ok(Some(bytes)) => Some(bytes),
            Ok(None) => {
                trace!(
                    phase = ?self.phase,
                    staged = self.staging.filled,
                    "input exhausted"
                );
                None
            }
            Err(e) => {
                self.fail(e.into());
                None
            }
        }
    }

    fn start_frame(&mut self, header: FrameHeader) {
        debug!(
            channels = header.num_channels,
            sample_rate = header.sample_rate,
            frame_samples = header.frame_samples,
            frame_size = header.frame_size,
            "frame header"
        );
        let channels = header.num_channels as usize;
        if self.states.len() != channels {
            self.states.resize(channels, PredictorState::default());
            self.batch = vec![0_i16; channels * QOA_SLICE_LEN].into_boxed_slice();
        }
        self.frame_header = header;
        self.phase = Phase::ReadPredictorStates { cursor: 0 };
    }

    /// Move the completed batch, trimmed to the sample budget, into `dest`
    /// and queue whatever does not fit. Returns the samples written.
    fn emit_batch(&mut self, dest: &mut [i16]) -> usize {
        let channels = self.channels();
        let frame_remaining = self.frame_header.frame_samples as usize - self.decoded_this_frame;
        let mut len = QOA_SLICE_LEN.min(frame_remaining);
        if let Some(stream_remaining) = self.stream_remaining() {
            len = len.min(stream_remaining);
        }

        let valid = &self.batch[..len * channels];
        let n = valid.len().min(dest.len());
        dest[..n].copy_from_slice(&valid[..n]);
        self.pending.extend(&valid[n..]);

        self.decoded_this_frame += len;
        self.decoded_total += len as u64;
        trace!(
            samples_per_channel = len,
            written = n,
            pending = self.pending.len(),
            "decoded slice batch"
        );
        n
    }

    fn finish_batch(&mut self, cursor: usize) {
        if self.stream_remaining() == Some(0) {
            debug!(samples = self.decoded_total, "stream complete");
            self.phase = Phase::Finished;
        } else if cursor / self.channels() == self.frame_header.slices_per_channel()
            || self.decoded_this_frame >= self.frame_header.frame_samples as usize
        {
            self.phase = Phase::ReadFrameHeader;
        }
    }

    fn fail(&mut self, error: DecodeError) {
        warn!(%error, phase = ?self.phase, "stopping decode");
        self.error = Some(error);
        self.phase = Phase::Finished;
    }
}

/// End of the output region for a call that has already written `written`
/// samples: whole sample frames only, unless `dest_len` is below one.
fn aligned_limit(dest_len: usize, written: usize, channels: usize) -> usize {
    if dest_len < channels {
        return dest_len;
    }
    let room = dest_len - written;
    written + room - room % channels
}

impl<R> StreamDecoder<R> {
    /// Samples per channel left in the stream, `None` if the length is unknown.
    fn stream_remaining(&self) -> Option<usize> {
        if self.stream_header.is_streaming() {
            return None;
        }
        let total = self.stream_header.total_samples_per_channel as u64;
        Some(total.saturating_sub(self.decoded_total) as usize)
    }

    pub fn stream_header(&self) -> &StreamHeader {
        &self.stream_header
    }

    /// The header of the frame currently being decoded.
    pub fn frame_header(&self) -> &FrameHeader {
        &self.frame_header
    }

    pub fn channels(&self) -> usize {
        self.frame_header.num_channels as usize
    }

    pub fn sample_rate(&self) -> u32 {
        self.frame_header.sample_rate
    }

    /// True if the stream header does not state a total length.
    pub fn is_streaming(&self) -> bool {
        self.stream_header.is_streaming()
    }

    pub fn total_duration(&self) -> Option<Duration> {
        self.stream_header.duration(self.frame_header.sample_rate)
    }

    /// Samples per channel decoded so far, including those still pending.
    pub fn samples_decoded(&self) -> u64 {
        self.decoded_total
    }

    /// True once the sample budget is spent or decoding hit an error. Running
    /// out of input does not finish the decoder: more data may still arrive.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished && self.pending.is_empty()
    }

    /// The error that stopped decoding, if any.
    pub fn error(&self) -> Option<&DecodeError> {
        self.error.as_ref()
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Access the reader, e.g. to push more bytes into a [`FeedBuffer`].
    ///
    /// [`FeedBuffer`]: crate::FeedBuffer
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consume this `StreamDecoder` and return the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl StreamDecoder<io::BufReader<File>> {
    /// Open a file, wrap it with BufReader and create a new decoder.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        StreamDecoder::new(io::BufReader::new(file))
    }
}
