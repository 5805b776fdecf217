//! Fixed-point cascade resamplers for the telephony rate pairs.

mod primitives;

use primitives::{
    BLOCK_22_IN, BLOCK_22_TO_8_OUT, BLOCK_22_TO_16_OUT, BLOCK_48_TO_16_IN, BLOCK_48_TO_16_OUT,
    State22To8, State22To16, State48To16, downsample_by_2, resample_22_to_8_block,
    resample_22_to_16_block, resample_48_to_16_block, upsample_by_2,
};

use crate::{Resampler, error::ResampleError};

/// The filter pipeline of one rate pair together with its state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cascade {
    /// 16 kHz -> 8 kHz: halfband decimator.
    Down16To8 { halfband: [i32; 8] },
    /// 8 kHz -> 16 kHz: halfband interpolator.
    Up8To16 { halfband: [i32; 8] },
    /// 48 kHz -> 16 kHz: lowpass, 3:2 fractional stage, decimator.
    Down48To16 { block: State48To16 },
    /// 48 kHz -> 8 kHz: the 48 kHz -> 16 kHz pipeline followed by a halfband decimator.
    Down48To8 {
        block: State48To16,
        halfband: [i32; 8],
    },
    /// 11 kHz -> 8 kHz: interpolator, 11:8 fractional stage, decimator.
    Down11To8 { block: State22To16 },
    /// 11 kHz -> 16 kHz: halfband interpolator followed by the 11 kHz -> 8 kHz pipeline.
    Up11To16 {
        halfband: [i32; 8],
        block: State22To16,
    },
    /// 44 kHz -> 16 kHz: lowpass, 11:8 fractional stage, decimator.
    Down44To16 { block: State22To8 },
    /// 44 kHz -> 8 kHz: the 44 kHz -> 16 kHz pipeline followed by a halfband decimator.
    Down44To8 {
        block: State22To8,
        halfband: [i32; 8],
    },
}

impl Cascade {
    fn for_rates(input_rate: u32, output_rate: u32) -> Option<Self> {
        let cascade = match (input_rate, output_rate) {
            (16000, 8000) => Self::Down16To8 { halfband: [0; 8] },
            (8000, 16000) => Self::Up8To16 { halfband: [0; 8] },
            (48000, 16000) => Self::Down48To16 {
                block: State48To16::default(),
            },
            (48000, 8000) => Self::Down48To8 {
                block: State48To16::default(),
                halfband: [0; 8],
            },
            (11000, 8000) => Self::Down11To8 {
                block: State22To16::default(),
            },
            (11000, 16000) => Self::Up11To16 {
                halfband: [0; 8],
                block: State22To16::default(),
            },
            (44000, 16000) => Self::Down44To16 {
                block: State22To8::default(),
            },
            (44000, 8000) => Self::Down44To8 {
                block: State22To8::default(),
                halfband: [0; 8],
            },
            _ => return None,
        };
        Some(cascade)
    }

    /// Input samples the pipeline consumes at once.
    fn input_block(&self) -> usize {
        match self {
            Self::Down16To8 { .. } => 2,
            Self::Up8To16 { .. } => 1,
            Self::Down48To16 { .. } | Self::Down48To8 { .. } => BLOCK_48_TO_16_IN,
            Self::Down11To8 { .. } | Self::Down44To16 { .. } | Self::Down44To8 { .. } => {
                BLOCK_22_IN
            }
            Self::Up11To16 { .. } => BLOCK_22_IN / 2,
        }
    }

    fn samples_needed_for(&self, out_amt: usize) -> usize {
        let block = self.input_block();
        let needed = match self {
            Self::Down16To8 { .. } => out_amt * 2,
            Self::Up8To16 { .. } => out_amt.div_ceil(2),
            Self::Down48To16 { .. } => out_amt * 3,
            Self::Down48To8 { .. } => out_amt * 6,
            Self::Down11To8 { .. } => (out_amt * 11).div_ceil(8),
            Self::Up11To16 { .. } => (out_amt * 11).div_ceil(16),
            Self::Down44To16 { .. } => (out_amt * 11).div_ceil(4),
            Self::Down44To8 { .. } => (out_amt * 11).div_ceil(2),
        };
        needed.div_ceil(block) * block
    }

    fn output_len_for(&self, in_amt: usize) -> usize {
        match self {
            Self::Down16To8 { .. } => in_amt / 2,
            Self::Up8To16 { .. } => in_amt * 2,
            Self::Down48To16 { .. } => in_amt / 3,
            Self::Down48To8 { .. } => in_amt / 6,
            Self::Down11To8 { .. } => (in_amt / 11) * 8,
            Self::Up11To16 { .. } => in_amt * 16 / 11,
            Self::Down44To16 { .. } => in_amt * 4 / 11,
            Self::Down44To8 { .. } => in_amt * 2 / 11,
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Down16To8 { halfband } | Self::Up8To16 { halfband } => *halfband = [0; 8],
            Self::Down48To16 { block } => *block = State48To16::default(),
            Self::Down48To8 { block, halfband } => {
                *block = State48To16::default();
                *halfband = [0; 8];
            }
            Self::Down11To8 { block } => *block = State22To16::default(),
            Self::Up11To16 { halfband, block } => {
                *halfband = [0; 8];
                *block = State22To16::default();
            }
            Self::Down44To16 { block } => *block = State22To8::default(),
            Self::Down44To8 { block, halfband } => {
                *block = State22To8::default();
                *halfband = [0; 8];
            }
        }
    }
}

/// Bit-exact fixed-point resampler for the rate pairs of narrow- and wideband telephony.
///
/// Supported pairs are `{8000, 11000, 16000, 44000, 48000} -> {8000, 16000}` (except the
/// identities). The filters keep their state between calls, so a stream can be fed in
/// consecutive chunks. Every input length must be a multiple of the pipeline block size, which
/// [`Resampler::in_out_for`] takes care of.
///
/// ## Example
///
/// ```rust
/// use pcm_resampler::{Resampler, ResamplerConstExpr};
///
/// let mut resampler = ResamplerConstExpr::new(48000, 16000).unwrap();
/// let (input_len, output_len) = resampler.in_out_for(100);
/// assert_eq!((input_len, output_len), (480, 160));
///
/// let input = vec![0i16; input_len];
/// let mut output = vec![0i16; output_len];
/// resampler.resample(&input, &mut output).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ResamplerConstExpr {
    input_rate: u32,
    output_rate: u32,
    cascade: Cascade,
    intermediate: Vec<i16>,
}

impl ResamplerConstExpr {
    /// Create a new [`ResamplerConstExpr`].
    ///
    /// Returns [`ResampleError::UnsupportedRatePair`] for pairs without a cascade.
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self, ResampleError> {
        let cascade =
            Cascade::for_rates(input_rate, output_rate).ok_or(ResampleError::UnsupportedRatePair {
                input_rate,
                output_rate,
            })?;

        Ok(Self {
            input_rate,
            output_rate,
            cascade,
            intermediate: Vec::new(),
        })
    }

    /// Returns `true` if a cascade exists for the pair.
    pub fn supports(input_rate: u32, output_rate: u32) -> bool {
        Cascade::for_rates(input_rate, output_rate).is_some()
    }
}

impl Resampler for ResamplerConstExpr {
    fn resample(&mut self, input: &[i16], output: &mut [i16]) -> Result<(), ResampleError> {
        if !input.len().is_multiple_of(self.cascade.input_block())
            || output.len() != self.cascade.output_len_for(input.len())
        {
            return Err(ResampleError::IncorrectLength {
                input: input.len(),
                output: output.len(),
            });
        }

        let mut intermediate = std::mem::take(&mut self.intermediate);

        match &mut self.cascade {
            Cascade::Down16To8 { halfband } => downsample_by_2(input, output, halfband),
            Cascade::Up8To16 { halfband } => upsample_by_2(input, output, halfband),
            Cascade::Down48To16 { block } => {
                for (chunk, out) in input
                    .chunks_exact(BLOCK_48_TO_16_IN)
                    .zip(output.chunks_exact_mut(BLOCK_48_TO_16_OUT))
                {
                    resample_48_to_16_block(chunk, out, block);
                }
            }
            Cascade::Down48To8 { block, halfband } => {
                intermediate.resize(input.len() / 3, 0);
                for (chunk, out) in input
                    .chunks_exact(BLOCK_48_TO_16_IN)
                    .zip(intermediate.chunks_exact_mut(BLOCK_48_TO_16_OUT))
                {
                    resample_48_to_16_block(chunk, out, block);
                }
                downsample_by_2(&intermediate, output, halfband);
            }
            Cascade::Down11To8 { block } => {
                for (chunk, out) in input
                    .chunks_exact(BLOCK_22_IN)
                    .zip(output.chunks_exact_mut(BLOCK_22_TO_16_OUT))
                {
                    resample_22_to_16_block(chunk, out, block);
                }
            }
            Cascade::Up11To16 { halfband, block } => {
                intermediate.resize(input.len() * 2, 0);
                upsample_by_2(input, &mut intermediate, halfband);
                for (chunk, out) in intermediate
                    .chunks_exact(BLOCK_22_IN)
                    .zip(output.chunks_exact_mut(BLOCK_22_TO_16_OUT))
                {
                    resample_22_to_16_block(chunk, out, block);
                }
            }
            Cascade::Down44To16 { block } => {
                for (chunk, out) in input
                    .chunks_exact(BLOCK_22_IN)
                    .zip(output.chunks_exact_mut(BLOCK_22_TO_8_OUT))
                {
                    resample_22_to_8_block(chunk, out, block);
                }
            }
            Cascade::Down44To8 { block, halfband } => {
                intermediate.resize(input.len() * 4 / 11, 0);
                for (chunk, out) in input
                    .chunks_exact(BLOCK_22_IN)
                    .zip(intermediate.chunks_exact_mut(BLOCK_22_TO_8_OUT))
                {
                    resample_22_to_8_block(chunk, out, block);
                }
                downsample_by_2(&intermediate, output, halfband);
            }
        }

        self.intermediate = intermediate;
        Ok(())
    }

    fn samples_needed_for(&self, out_amt: usize) -> usize {
        self.cascade.samples_needed_for(out_amt)
    }

    fn output_len_for(&self, in_amt: usize) -> usize {
        self.cascade.output_len_for(in_amt)
    }

    fn reset(&mut self) {
        self.cascade.reset();
        self.intermediate.fill(0);
    }

    fn input_rate(&self) -> u32 {
        self.input_rate
    }

    fn output_rate(&self) -> u32 {
        self.output_rate
    }
}
