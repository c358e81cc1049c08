//! Slice decoding: dequantize residuals and run the LMS predictor.

use crate::container::{PredictorState, Slice};
use crate::{QOA_LMS_LEN, QOA_SLICE_LEN};

/// `round(s^2.75)` for `s` in 1..=16, indexed by the slice's quant nibble.
pub const SCALE_FACTORS: [i32; 16] = [
    1, 7, 21, 45, 84, 138, 211, 304, 421, 562, 731, 928, 1157, 1419, 1715, 2048,
];

/// Dequantized residual magnitude for each 3-bit code.
pub const DEQUANT: [f32; 8] = [0.75, -0.75, 2.5, -2.5, 4.5, -4.5, 7.0, -7.0];

/// Residual for `code` at scale factor index `quant`, rounded half away
/// from zero.
#[inline(always)]
pub fn dequantize(quant: u8, code: u8) -> i32 {
    let fr = SCALE_FACTORS[quant as usize & 0xf] as f32 * DEQUANT[code as usize & 0x7];
    if fr < 0.0 {
        (fr - 0.5).ceil() as i32
    } else {
        (fr + 0.5).floor() as i32
    }
}

impl PredictorState {
    #[inline(always)]
    pub fn predict(&self) -> i32 {
        let mut prediction: i32 = 0;
        for i in 0..QOA_LMS_LEN {
            // Malformed input can overflow the sum; wrap like the reference decoder.
            prediction = prediction
                .wrapping_add(self.history[i] as i32 * self.weights[i] as i32);
        }
        prediction >> 13
    }

    /// Adapt the weights to `residual` and push `sample` into the history.
    #[inline(always)]
    pub fn update(&mut self, sample: i16, residual: i32) {
        let delta = (residual >> 4) as i16;
        for i in 0..QOA_LMS_LEN {
            self.weights[i] = if self.history[i] < 0 {
                self.weights[i].wrapping_sub(delta)
            } else {
                self.weights[i].wrapping_add(delta)
            };
        }
        self.history.copy_within(1.., 0);
        self.history[QOA_LMS_LEN - 1] = sample;
    }
}

impl Slice {
    /// Decode the 20 samples of this slice into `out[0]`, `out[stride]`, ...
    ///
    /// `state` is updated in place. Panics if `out` is shorter than
    /// `19 * stride + 1`.
    pub fn decode_into(&self, state: &mut PredictorState, out: &mut [i16], stride: usize) {
        for (n, &code) in self.residuals.iter().enumerate() {
            let residual = dequantize(self.quant, code);
            let prediction = state.predict();
            let sample = residual
                .wrapping_add(prediction)
                .clamp(i16::MIN as i32, i16::MAX as i32) as i16;
            state.update(sample, residual);
            out[n * stride] = sample;
        }
    }

    /// Decode into a fresh buffer of 20 samples.
    pub fn decode(&self, state: &mut PredictorState) -> [i16; QOA_SLICE_LEN] {
        let mut samples = [0_i16; QOA_SLICE_LEN];
        self.decode_into(state, &mut samples, 1);
        samples
    }
}
