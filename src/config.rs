use crate::{DEFAULT_MAX_ERR_RATE, auto::Selection, error::ResampleError};

/// The resampler family the dispatcher should use.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResamplerKind {
    /// Bit-exact fixed-point cascades. Only the telephony rate pairs.
    ConstExpr,
    /// Cubic spline interpolation.
    Spline,
    /// Band-limited FFT resampling. Downsampling only.
    Fft,
    /// The cascade if it supports the pair, otherwise the spline.
    #[default]
    BestFit,
    /// Like [`ResamplerKind::BestFit`], but also accepts rate pairs outside the verified table.
    BestFitUnsafe,
}

impl core::fmt::Display for ResamplerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ConstExpr => "constexpr".fmt(f),
            Self::Spline => "spline".fmt(f),
            Self::Fft => "fft".fmt(f),
            Self::BestFit => "best fit".fmt(f),
            Self::BestFitUnsafe => "best fit (unsafe)".fmt(f),
        }
    }
}

/// Construction parameters of a resampler.
///
/// ## Example
///
/// ```rust
/// use pcm_resampler::{ResamplerConfig, ResamplerKind};
///
/// let selection = ResamplerConfig::new(44100, 16000)
///     .with_kind(ResamplerKind::Spline)
///     .with_max_err_rate(1e-4)
///     .build()
///     .unwrap();
/// assert!(selection.tolerance_met);
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ResamplerConfig {
    /// Input sample rate in Hz.
    pub input_rate: u32,
    /// Output sample rate in Hz.
    pub output_rate: u32,
    /// Requested resampler family.
    pub kind: ResamplerKind,
    /// Maximal relative timing error of the output, in `[0, 1]`.
    pub max_err_rate: f64,
}

impl ResamplerConfig {
    /// Creates a configuration with the default kind and error rate.
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        Self {
            input_rate,
            output_rate,
            kind: ResamplerKind::default(),
            max_err_rate: DEFAULT_MAX_ERR_RATE,
        }
    }

    /// Sets the resampler family.
    pub fn with_kind(mut self, kind: ResamplerKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the maximal relative timing error. Values outside `[0, 1]` are clamped.
    pub fn with_max_err_rate(mut self, max_err_rate: f64) -> Self {
        self.max_err_rate = resolve_max_err_rate(Some(max_err_rate));
        self
    }

    /// Selects and constructs the resampler.
    pub fn build(&self) -> Result<Selection, ResampleError> {
        crate::auto::select(self)
    }
}

/// Returns the error rate to use: the default for `None`, otherwise the value clamped to `[0, 1]`.
pub(crate) fn resolve_max_err_rate(max_err_rate: Option<f64>) -> f64 {
    match max_err_rate {
        None => DEFAULT_MAX_ERR_RATE,
        Some(rate) if rate.is_nan() => {
            log::warn!("Error rate is NaN, using the default {DEFAULT_MAX_ERR_RATE}");
            DEFAULT_MAX_ERR_RATE
        }
        Some(rate) if !(0.0..=1.0).contains(&rate) => {
            let clamped = rate.clamp(0.0, 1.0);
            log::warn!("Error rate {rate} is outside [0, 1], clamped to {clamped}");
            clamped
        }
        Some(rate) => rate,
    }
}
