use std::collections::HashMap;

use crate::{
    config::resolve_max_err_rate,
    error::ResampleError,
    fft::{Bluestein, Complex64, Inverse, Radix2Fft},
    pcm::{f64_to_s16, s16_to_f64},
    planner::{FFT_BATCH_SLOTS, FftBatchPlan, find_fft_batches},
    resampler::Resampler,
};

/// Band-limited downsampler working on whole blocks in the frequency domain.
///
/// Each block of input is transformed with an exact-length DFT. The spectrum is cut at the
/// output band, made hermitian again and transformed back with a power of two inverse FFT.
/// Everything above the output Nyquist frequency is dropped, so no aliasing folds back.
///
/// Block lengths come from [`find_fft_batches`]. A block producing `2^k` samples has the
/// input length closest to `2^k * input_rate / output_rate` that keeps the timing error
/// within budget. Buffers are split greedily into the largest blocks first.
///
/// Blocks are independent, the resampler keeps no signal state between calls.
///
/// ## Example
///
/// ```rust
/// use pcm_resampler::{Resampler, ResamplerFft};
///
/// let mut resampler = ResamplerFft::new(48000, 8000, Some(1e-2)).unwrap();
/// let (input_len, output_len) = resampler.in_out_for(1000);
/// assert_eq!((input_len, output_len), (6048, 1008));
///
/// let input = vec![0i16; input_len];
/// let mut output = vec![0i16; output_len];
/// resampler.resample(&input, &mut output).unwrap();
/// ```
pub struct ResamplerFft {
    input_rate: u32,
    output_rate: u32,
    plan: FftBatchPlan,
    dfts: HashMap<usize, Bluestein>,
    idfts: HashMap<usize, Radix2Fft<Inverse>>,
    block: Vec<Complex64>,
}

impl ResamplerFft {
    /// Create a new [`ResamplerFft`].
    ///
    /// ## Parameters
    /// - `input_rate`: Input sample rate in Hz.
    /// - `output_rate`: Output sample rate in Hz. Must be lower than the input rate.
    /// - `max_err_rate`: Maximal relative timing error, [`crate::DEFAULT_MAX_ERR_RATE`] if `None`.
    pub fn new(
        input_rate: u32,
        output_rate: u32,
        max_err_rate: Option<f64>,
    ) -> Result<Self, ResampleError> {
        if output_rate == 0 || input_rate <= output_rate {
            return Err(ResampleError::UnsupportedRatePair {
                input_rate,
                output_rate,
            });
        }

        let plan = find_fft_batches(input_rate, output_rate, resolve_max_err_rate(max_err_rate));

        Ok(Self {
            input_rate,
            output_rate,
            plan,
            dfts: HashMap::new(),
            idfts: HashMap::new(),
            block: Vec::new(),
        })
    }

    /// Returns `false` if the planner could not meet the error rate.
    pub fn tolerance_met(&self) -> bool {
        self.plan.tolerance_met
    }

    /// The block table the input is split by.
    pub fn plan(&self) -> &FftBatchPlan {
        &self.plan
    }

    /// Splits `in_amt` greedily into blocks, largest first.
    ///
    /// Returns the produced output length and the input left over.
    fn split_input(&self, in_amt: usize) -> (usize, usize) {
        self.plan
            .batches()
            .fold((0, in_amt), |(produced, rest), (log2, size)| {
                let count = rest / size;
                (produced + (count << log2), rest - count * size)
            })
    }
}

impl Resampler for ResamplerFft {
    fn resample(&mut self, input: &[i16], output: &mut [i16]) -> Result<(), ResampleError> {
        let (produced, rest) = self.split_input(input.len());
        if rest != 0 || produced != output.len() {
            return Err(ResampleError::IncorrectLength {
                input: input.len(),
                output: output.len(),
            });
        }

        let Self {
            plan,
            dfts,
            idfts,
            block,
            ..
        } = self;

        let mut input = input;
        let mut output = output;

        for (log2, size) in plan.batches() {
            let out_len = 1 << log2;
            while input.len() >= size {
                let (block_in, rest_in) = input.split_at(size);
                let (block_out, rest_out) = core::mem::take(&mut output).split_at_mut(out_len);

                resample_block(dfts, idfts, block, block_in, block_out);

                input = rest_in;
                output = rest_out;
            }
        }

        Ok(())
    }

    fn samples_needed_for(&self, out_amt: usize) -> usize {
        if out_amt == 0 {
            return 0;
        }

        let smallest = self.plan.smallest_log2().unwrap_or(FFT_BATCH_SLOTS - 1);
        let target = out_amt.next_multiple_of(1 << smallest);

        let mut need = 0;
        let mut rest = target;
        for (log2, size) in self.plan.batches() {
            let count = rest >> log2;
            need += count * size;
            rest -= count << log2;
        }

        // Block lengths are not exact multiples of each other, so the greedy split of `need`
        // can differ from the blocks it was summed from.
        loop {
            let (produced, rest) = self.split_input(need);
            if rest == 0 && produced >= out_amt {
                return need;
            }
            need += 1;
        }
    }

    fn output_len_for(&self, in_amt: usize) -> usize {
        self.split_input(in_amt).0
    }

    fn reset(&mut self) {}

    fn input_rate(&self) -> u32 {
        self.input_rate
    }

    fn output_rate(&self) -> u32 {
        self.output_rate
    }
}

/// Resamples one block: DFT of the input, band cut to the output length, inverse FFT.
fn resample_block(
    dfts: &mut HashMap<usize, Bluestein>,
    idfts: &mut HashMap<usize, Radix2Fft<Inverse>>,
    block: &mut Vec<Complex64>,
    input: &[i16],
    output: &mut [i16],
) {
    let in_len = input.len();
    let out_len = output.len();

    block.clear();
    block.extend(
        input
            .iter()
            .map(|&sample| Complex64::new(s16_to_f64(sample), 0.0)),
    );

    dfts.entry(in_len)
        .or_insert_with(|| {
            log::trace!("Planning DFT of length {in_len}");
            Bluestein::new(in_len)
        })
        .process(block);

    // Keep the bins of the output band and mirror the lower half to restore a real signal.
    block.resize(out_len, Complex64::zero());
    let half = out_len / 2;
    for i in 1..half {
        block[half + i] = block[half - i].conj();
    }

    idfts
        .entry(out_len)
        .or_insert_with(|| Radix2Fft::new(out_len))
        .process(block);

    let scale = out_len as f64 / in_len as f64;
    for (sample, value) in output.iter_mut().zip(block.iter()) {
        *sample = f64_to_s16(value.re * scale);
    }
}
