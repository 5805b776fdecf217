use crate::error::ResampleError;

/// The contract every resampling kernel fulfills.
///
/// A kernel converts a whole buffer at a time. The caller asks which input length produces a
/// wanted amount of output with [`Resampler::in_out_for`] and then hands exactly those lengths
/// to [`Resampler::resample`]. Filter state carries over between calls, so consecutive calls
/// on adjacent chunks of a stream produce a continuous output.
///
/// ## Example
///
/// ```rust
/// use pcm_resampler::{Resampler, ResamplerConstExpr};
///
/// let mut resampler = ResamplerConstExpr::new(16000, 8000).unwrap();
/// let (input_len, output_len) = resampler.in_out_for(100);
/// assert_eq!((input_len, output_len), (200, 100));
///
/// let input = vec![0i16; input_len];
/// let mut output = vec![0i16; output_len];
/// resampler.resample(&input, &mut output).unwrap();
/// ```
pub trait Resampler: Send {
    /// Consumes exactly `input` and fills exactly `output`.
    ///
    /// The lengths must be a pair returned by [`Resampler::in_out_for`]. Other lengths are
    /// rejected with [`ResampleError::IncorrectLength`] before any state is touched.
    fn resample(&mut self, input: &[i16], output: &mut [i16]) -> Result<(), ResampleError>;

    /// Minimum input length that yields at least `out_amt` output samples.
    ///
    /// Monotonic in `out_amt` and zero for zero.
    fn samples_needed_for(&self, out_amt: usize) -> usize;

    /// Exact output length the kernel produces for `in_amt` input samples.
    ///
    /// Only meaningful for input lengths returned by [`Resampler::samples_needed_for`].
    fn output_len_for(&self, in_amt: usize) -> usize;

    /// Returns the input length needed for `out_amt` output samples together with the output
    /// length that input really produces, which may be larger than `out_amt`.
    fn in_out_for(&self, out_amt: usize) -> (usize, usize) {
        let in_amt = self.samples_needed_for(out_amt);
        (in_amt, self.output_len_for(in_amt))
    }

    /// Restores the freshly constructed state.
    fn reset(&mut self);

    /// Input sample rate in Hz.
    fn input_rate(&self) -> u32;

    /// Output sample rate in Hz.
    fn output_rate(&self) -> u32;
}

/// A kernel producing two output rates from one input stream.
///
/// Both outputs are always rendered from the same input samples.
pub trait DualResampler: Send {
    /// Consumes exactly `input` and fills both outputs.
    fn resample(
        &mut self,
        input: &[i16],
        first: &mut [i16],
        second: &mut [i16],
    ) -> Result<(), ResampleError>;

    /// Minimum input length that yields at least `first_amt` and `second_amt` samples.
    fn samples_needed_for(&self, first_amt: usize, second_amt: usize) -> usize;

    /// Exact output lengths the kernel produces for `in_amt` input samples.
    fn output_lens_for(&self, in_amt: usize) -> (usize, usize);

    /// Returns the needed input length and the output lengths it really produces.
    fn in_out_for(&self, first_amt: usize, second_amt: usize) -> (usize, usize, usize) {
        let in_amt = self.samples_needed_for(first_amt, second_amt);
        let (first, second) = self.output_lens_for(in_amt);
        (in_amt, first, second)
    }

    /// Restores the freshly constructed state.
    fn reset(&mut self);

    /// Input sample rate in Hz.
    fn input_rate(&self) -> u32;

    /// Output sample rates in Hz.
    fn output_rates(&self) -> (u32, u32);
}

/// Identity kernel for equal input and output rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Passthrough {
    rate: u32,
}

impl Passthrough {
    /// Creates a pass-through for `rate`.
    pub fn new(rate: u32) -> Self {
        Self { rate }
    }
}

impl Resampler for Passthrough {
    fn resample(&mut self, input: &[i16], output: &mut [i16]) -> Result<(), ResampleError> {
        if input.len() != output.len() {
            return Err(ResampleError::IncorrectLength {
                input: input.len(),
                output: output.len(),
            });
        }
        output.copy_from_slice(input);
        Ok(())
    }

    fn samples_needed_for(&self, out_amt: usize) -> usize {
        out_amt
    }

    fn output_len_for(&self, in_amt: usize) -> usize {
        in_amt
    }

    fn reset(&mut self) {}

    fn input_rate(&self) -> u32 {
        self.rate
    }

    fn output_rate(&self) -> u32 {
        self.rate
    }
}
