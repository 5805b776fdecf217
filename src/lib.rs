//! Sample rate conversion of mono 16-bit PCM.
//!
//! Three kernels share the [`Resampler`] contract:
//!
//! - [`ResamplerConstExpr`]: bit-exact fixed-point filter cascades for the telephony rate pairs.
//! - [`ResamplerSpline`]: cubic spline interpolation for arbitrary pairs.
//! - [`ResamplerFft`]: band-limited block resampling in the frequency domain, downsampling only.
//!
//! [`select`] picks a kernel from a [`ResamplerConfig`], and [`ResampleBatch`] turns any kernel
//! into a push/pull stream.
//!
//! ## Example
//!
//! ```rust
//! use pcm_resampler::{ResampleBatch, ResamplerConfig};
//!
//! let selection = ResamplerConfig::new(44100, 16000).build().unwrap();
//! let mut stream = ResampleBatch::new(selection.resampler);
//!
//! stream.add(&vec![0i16; 4410]);
//! let output = stream.get_large(1000).unwrap();
//! assert_eq!(output.len(), 1000);
//! ```

mod auto;
mod batch;
mod cascade;
mod config;
mod error;
pub mod fft;
pub mod pcm;
pub mod planner;
mod resampler;
mod resampler_fft;
mod spline;

pub use auto::{KernelKind, ResamplerAuto, Selection, select, select_dual};
pub use batch::{ResampleBatch, ResampleBatchDual, Wave};
pub use cascade::ResamplerConstExpr;
pub use config::{ResamplerConfig, ResamplerKind};
pub use error::ResampleError;
pub use resampler::{DualResampler, Passthrough, Resampler};
pub use resampler_fft::ResamplerFft;
pub use spline::{BorderCondition, ResamplerSpline, ResamplerSplineDual, TridiagonalSolver};

/// Relative timing error the batch planners aim for unless told otherwise.
pub const DEFAULT_MAX_ERR_RATE: f64 = 1e-6;

/// The sample rates of the verified conversion table.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub enum SampleRate {
    /// 8 kHz
    _8000,
    /// 11 kHz
    _11000,
    /// 11.025 kHz
    _11025,
    /// 16 kHz
    _16000,
    /// 44 kHz
    _44000,
    /// 44.1 kHz
    _44100,
    /// 48 kHz
    _48000,
}

impl SampleRate {
    /// Inputs every kernel is verified for.
    pub(crate) fn is_safe_input(self) -> bool {
        matches!(
            self,
            SampleRate::_8000
                | SampleRate::_11025
                | SampleRate::_16000
                | SampleRate::_44100
                | SampleRate::_48000
        )
    }

    /// Inputs only the fixed-point cascades are verified for.
    pub(crate) fn is_cascade_only(self) -> bool {
        matches!(self, SampleRate::_11000 | SampleRate::_44000)
    }

    pub(crate) fn is_safe_output(self) -> bool {
        matches!(self, SampleRate::_8000 | SampleRate::_16000)
    }
}

impl From<SampleRate> for u32 {
    fn from(value: SampleRate) -> Self {
        match value {
            SampleRate::_8000 => 8000,
            SampleRate::_11000 => 11000,
            SampleRate::_11025 => 11025,
            SampleRate::_16000 => 16000,
            SampleRate::_44000 => 44000,
            SampleRate::_44100 => 44100,
            SampleRate::_48000 => 48000,
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            8000 => Ok(SampleRate::_8000),
            11000 => Ok(SampleRate::_11000),
            11025 => Ok(SampleRate::_11025),
            16000 => Ok(SampleRate::_16000),
            44000 => Ok(SampleRate::_44000),
            44100 => Ok(SampleRate::_44100),
            48000 => Ok(SampleRate::_48000),
            _ => Err(()),
        }
    }
}
