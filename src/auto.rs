use crate::{
    SampleRate,
    cascade::ResamplerConstExpr,
    config::{ResamplerConfig, ResamplerKind},
    error::ResampleError,
    resampler::{Passthrough, Resampler},
    resampler_fft::ResamplerFft,
    spline::{ResamplerSpline, ResamplerSplineDual},
};

/// The kernel a [`ResamplerAuto`] runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// Input and output rate are equal, samples are copied.
    Passthrough,
    /// Fixed-point cascade.
    ConstExpr,
    /// Cubic spline.
    Spline,
    /// FFT block resampler.
    Fft,
}

enum Kernel {
    Passthrough(Passthrough),
    ConstExpr(ResamplerConstExpr),
    Spline(ResamplerSpline),
    Fft(Box<ResamplerFft>),
}

/// A resampler picked by [`select`] at runtime.
///
/// Delegates every call to the kernel it wraps.
pub struct ResamplerAuto {
    kernel: Kernel,
}

impl ResamplerAuto {
    /// The kernel doing the work.
    pub fn kernel(&self) -> KernelKind {
        match &self.kernel {
            Kernel::Passthrough(_) => KernelKind::Passthrough,
            Kernel::ConstExpr(_) => KernelKind::ConstExpr,
            Kernel::Spline(_) => KernelKind::Spline,
            Kernel::Fft(_) => KernelKind::Fft,
        }
    }

    fn inner(&self) -> &dyn Resampler {
        match &self.kernel {
            Kernel::Passthrough(kernel) => kernel,
            Kernel::ConstExpr(kernel) => kernel,
            Kernel::Spline(kernel) => kernel,
            Kernel::Fft(kernel) => kernel.as_ref(),
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Resampler {
        match &mut self.kernel {
            Kernel::Passthrough(kernel) => kernel,
            Kernel::ConstExpr(kernel) => kernel,
            Kernel::Spline(kernel) => kernel,
            Kernel::Fft(kernel) => kernel.as_mut(),
        }
    }
}

impl Resampler for ResamplerAuto {
    fn resample(&mut self, input: &[i16], output: &mut [i16]) -> Result<(), ResampleError> {
        self.inner_mut().resample(input, output)
    }

    fn samples_needed_for(&self, out_amt: usize) -> usize {
        self.inner().samples_needed_for(out_amt)
    }

    fn output_len_for(&self, in_amt: usize) -> usize {
        self.inner().output_len_for(in_amt)
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn input_rate(&self) -> u32 {
        self.inner().input_rate()
    }

    fn output_rate(&self) -> u32 {
        self.inner().output_rate()
    }
}

/// A constructed resampler and whether its batch planning met the requested error rate.
pub struct Selection<R = ResamplerAuto> {
    pub resampler: R,
    pub tolerance_met: bool,
}

fn unsupported(input_rate: u32, output_rate: u32) -> ResampleError {
    ResampleError::UnsupportedRatePair {
        input_rate,
        output_rate,
    }
}

/// Returns `true` if the pair is in the verified rate table for `kind`.
fn is_verified_pair(kind: ResamplerKind, input_rate: u32, output_rate: u32) -> bool {
    let Ok(input) = SampleRate::try_from(input_rate) else {
        return false;
    };
    let Ok(output) = SampleRate::try_from(output_rate) else {
        return false;
    };

    let input_allowed = input.is_safe_input()
        || (input.is_cascade_only() && kind == ResamplerKind::ConstExpr);

    input_allowed && output.is_safe_output()
}

/// Picks and constructs the resampler for a configuration.
///
/// Zero rates are rejected. Equal rates always yield a pass-through. Apart from
/// [`ResamplerKind::BestFitUnsafe`], only pairs of the verified [`SampleRate`] table are
/// accepted. The 11000 Hz and 44000 Hz inputs are verified for [`ResamplerKind::ConstExpr`] only.
///
/// ## Example
///
/// ```rust
/// use pcm_resampler::{KernelKind, ResamplerConfig, ResamplerKind, select};
///
/// let selection = select(&ResamplerConfig::new(48000, 16000)).unwrap();
/// assert_eq!(selection.resampler.kernel(), KernelKind::ConstExpr);
///
/// let config = ResamplerConfig::new(44100, 16000).with_kind(ResamplerKind::BestFit);
/// let selection = select(&config).unwrap();
/// assert_eq!(selection.resampler.kernel(), KernelKind::Spline);
/// ```
pub fn select(config: &ResamplerConfig) -> Result<Selection, ResampleError> {
    let ResamplerConfig {
        input_rate,
        output_rate,
        kind,
        max_err_rate,
    } = *config;

    if input_rate == 0 || output_rate == 0 {
        return Err(unsupported(input_rate, output_rate));
    }

    if input_rate == output_rate {
        log::debug!("{input_rate} Hz -> {output_rate} Hz: pass-through");
        return Ok(Selection {
            resampler: ResamplerAuto {
                kernel: Kernel::Passthrough(Passthrough::new(input_rate)),
            },
            tolerance_met: true,
        });
    }

    if kind != ResamplerKind::BestFitUnsafe && !is_verified_pair(kind, input_rate, output_rate) {
        return Err(unsupported(input_rate, output_rate));
    }

    let max_err_rate = Some(max_err_rate);
    let cascade_supported = ResamplerConstExpr::supports(input_rate, output_rate);

    let (kernel, tolerance_met) = match kind {
        ResamplerKind::ConstExpr => (
            Kernel::ConstExpr(ResamplerConstExpr::new(input_rate, output_rate)?),
            true,
        ),
        ResamplerKind::BestFit | ResamplerKind::BestFitUnsafe if cascade_supported => (
            Kernel::ConstExpr(ResamplerConstExpr::new(input_rate, output_rate)?),
            true,
        ),
        ResamplerKind::Spline | ResamplerKind::BestFit | ResamplerKind::BestFitUnsafe => {
            let spline = ResamplerSpline::new(input_rate, output_rate, max_err_rate)?;
            let tolerance_met = spline.tolerance_met();
            (Kernel::Spline(spline), tolerance_met)
        }
        ResamplerKind::Fft => {
            let fft = ResamplerFft::new(input_rate, output_rate, max_err_rate)?;
            let tolerance_met = fft.tolerance_met();
            (Kernel::Fft(Box::new(fft)), tolerance_met)
        }
    };

    let resampler = ResamplerAuto { kernel };
    log::debug!(
        "{input_rate} Hz -> {output_rate} Hz ({kind}): {:?} kernel, tolerance met: {tolerance_met}",
        resampler.kernel()
    );

    Ok(Selection {
        resampler,
        tolerance_met,
    })
}

/// Constructs a spline resampler rendering one input at two output rates.
///
/// Each output rate must equal the input rate or form a verified pair with it.
pub fn select_dual(
    input_rate: u32,
    output_rates: (u32, u32),
    max_err_rate: Option<f64>,
) -> Result<Selection<ResamplerSplineDual>, ResampleError> {
    for output_rate in [output_rates.0, output_rates.1] {
        let accepted = input_rate != 0
            && (output_rate == input_rate
                || is_verified_pair(ResamplerKind::Spline, input_rate, output_rate));
        if !accepted {
            return Err(unsupported(input_rate, output_rate));
        }
    }

    let resampler = ResamplerSplineDual::new(input_rate, output_rates, max_err_rate)?;
    let tolerance_met = resampler.tolerance_met();

    log::debug!(
        "{input_rate} Hz -> {} Hz / {} Hz: dual spline, tolerance met: {tolerance_met}",
        output_rates.0,
        output_rates.1
    );

    Ok(Selection {
        resampler,
        tolerance_met,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resampler::DualResampler;

    fn kernel_for(input_rate: u32, output_rate: u32, kind: ResamplerKind) -> Option<KernelKind> {
        let config = ResamplerConfig::new(input_rate, output_rate).with_kind(kind);
        select(&config).ok().map(|selection| selection.resampler.kernel())
    }

    #[test]
    fn test_best_fit_prefers_cascade() {
        let cases = [
            (16000, 8000, KernelKind::ConstExpr),
            (8000, 16000, KernelKind::ConstExpr),
            (48000, 8000, KernelKind::ConstExpr),
            (44100, 8000, KernelKind::Spline),
            (11025, 16000, KernelKind::Spline),
        ];

        for (input_rate, output_rate, expected) in cases {
            assert_eq!(
                kernel_for(input_rate, output_rate, ResamplerKind::BestFit),
                Some(expected),
                "{input_rate} -> {output_rate}"
            );
        }
    }

    #[test]
    fn test_equal_rates_pass_through() {
        for kind in [
            ResamplerKind::ConstExpr,
            ResamplerKind::Spline,
            ResamplerKind::Fft,
            ResamplerKind::BestFit,
            ResamplerKind::BestFitUnsafe,
        ] {
            let config = ResamplerConfig::new(12345, 12345).with_kind(kind);
            let selection = select(&config).unwrap();
            assert_eq!(selection.resampler.kernel(), KernelKind::Passthrough, "{kind}");
            assert!(selection.tolerance_met);
        }
    }

    #[test]
    fn test_rejected_pairs() {
        let cases = [
            (0, 8000, ResamplerKind::BestFitUnsafe),
            (8000, 0, ResamplerKind::BestFit),
            (22050, 8000, ResamplerKind::BestFit),
            (16000, 11025, ResamplerKind::Spline),
            (44100, 16000, ResamplerKind::ConstExpr),
            (11000, 8000, ResamplerKind::Spline),
            (11000, 16000, ResamplerKind::BestFit),
            (44000, 8000, ResamplerKind::BestFit),
            (44000, 16000, ResamplerKind::Fft),
            (8000, 16000, ResamplerKind::Fft),
        ];

        for (input_rate, output_rate, kind) in cases {
            let config = ResamplerConfig::new(input_rate, output_rate).with_kind(kind);
            assert_eq!(
                select(&config).err(),
                Some(ResampleError::UnsupportedRatePair {
                    input_rate,
                    output_rate
                }),
                "{input_rate} -> {output_rate} ({kind})"
            );
        }
    }

    #[test]
    fn test_unsafe_accepts_any_pair() {
        assert_eq!(
            kernel_for(22050, 12000, ResamplerKind::BestFitUnsafe),
            Some(KernelKind::Spline)
        );
        assert_eq!(
            kernel_for(48000, 16000, ResamplerKind::BestFitUnsafe),
            Some(KernelKind::ConstExpr)
        );
    }

    #[test]
    fn test_cascade_only_inputs() {
        let pairs = [(11000, 8000), (11000, 16000), (44000, 8000), (44000, 16000)];
        for (input_rate, output_rate) in pairs {
            assert_eq!(
                kernel_for(input_rate, output_rate, ResamplerKind::ConstExpr),
                Some(KernelKind::ConstExpr),
                "{input_rate} -> {output_rate}"
            );
            assert_eq!(
                kernel_for(input_rate, output_rate, ResamplerKind::BestFitUnsafe),
                Some(KernelKind::ConstExpr),
                "{input_rate} -> {output_rate}"
            );
            assert_eq!(kernel_for(input_rate, output_rate, ResamplerKind::BestFit), None);
        }
    }

    #[test]
    fn test_explicit_kinds() {
        assert_eq!(
            kernel_for(48000, 16000, ResamplerKind::Spline),
            Some(KernelKind::Spline)
        );

        let config = ResamplerConfig::new(48000, 8000)
            .with_kind(ResamplerKind::Fft)
            .with_max_err_rate(1e-2);
        let selection = select(&config).unwrap();
        assert_eq!(selection.resampler.kernel(), KernelKind::Fft);
        assert!(selection.tolerance_met);
    }

    #[test]
    fn test_auto_delegates() {
        let mut selection = select(&ResamplerConfig::new(16000, 8000)).unwrap();
        let resampler = &mut selection.resampler;

        assert_eq!(resampler.input_rate(), 16000);
        assert_eq!(resampler.output_rate(), 8000);
        assert_eq!(resampler.in_out_for(100), (200, 100));

        let input = vec![0; 200];
        let mut output = vec![1; 100];
        resampler.resample(&input, &mut output).unwrap();
        assert!(output.iter().all(|&sample| sample == 0));
    }

    #[test]
    fn test_select_dual() {
        let selection = select_dual(8000, (16000, 8000), None).unwrap();
        assert!(selection.tolerance_met);
        assert_eq!(selection.resampler.output_rates(), (16000, 8000));

        assert_eq!(
            select_dual(8000, (16000, 12000), None).err(),
            Some(ResampleError::UnsupportedRatePair {
                input_rate: 8000,
                output_rate: 12000
            })
        );
        assert!(select_dual(0, (0, 0), None).is_err());
    }
}
