/// Errors the resamplers and the streaming batches can return.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResampleError {
    /// The rate pair is not supported by the requested resampler kind.
    UnsupportedRatePair {
        /// Input sample rate in Hz.
        input_rate: u32,
        /// Output sample rate in Hz.
        output_rate: u32,
    },
    /// Input and output lengths are not a pair the resampler can process.
    IncorrectLength {
        /// Length of the input buffer.
        input: usize,
        /// Length of the output buffer.
        output: usize,
    },
    /// The input backlog holds fewer samples than the requested output needs.
    NotEnoughSamples {
        /// Input samples the request needs.
        needed: usize,
        /// Input samples currently buffered.
        available: usize,
    },
}

impl core::fmt::Display for ResampleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedRatePair {
                input_rate,
                output_rate,
            } => write!(
                f,
                "Unsupported rate pair: {input_rate} Hz -> {output_rate} Hz"
            ),
            Self::IncorrectLength { input, output } => write!(
                f,
                "Incorrect buffer lengths: {input} input samples can't produce {output} output samples"
            ),
            Self::NotEnoughSamples { needed, available } => write!(
                f,
                "Not enough samples: {needed} needed, {available} available"
            ),
        }
    }
}

impl core::fmt::Debug for ResampleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self, f)
    }
}

impl std::error::Error for ResampleError {}
