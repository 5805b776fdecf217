//! Cubic spline resampling.
//!
//! Each input batch is interpolated by a cubic spline through its samples and evaluated at the
//! output sample times. The derivatives at the knots come from a tridiagonal system solved with
//! the Thomas algorithm.

use crate::{
    DualResampler, Resampler,
    config::resolve_max_err_rate,
    error::ResampleError,
    pcm::{f64_to_s16, s16_to_f64},
    planner::{SplineBatch, find_spline_batch},
};

/// Pivots smaller than this are replaced by it (keeping their sign) during elimination.
const PIVOT_EPSILON: f64 = 1e-5;

/// Weight of the left and right neighbour in the derivative equation of a uniform grid.
const NEIGHBOUR_WEIGHT: f64 = 0.5;
const DIAGONAL: f64 = 2.0;

/// First and last row of a tridiagonal system.
///
/// The first row reads `diag_0 * x_0 + mu_0 * x_1 = rhs_0`, the last row
/// `lambda_n * x_(n-2) + diag_n * x_(n-1) = rhs_(n-1)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BorderCondition {
    /// Coefficient of `x_1` in the first row.
    pub mu_0: f64,
    /// Coefficient of `x_0` in the first row.
    pub diag_0: f64,
    /// Coefficient of `x_(n-2)` in the last row.
    pub lambda_n: f64,
    /// Coefficient of `x_(n-1)` in the last row.
    pub diag_n: f64,
}

impl BorderCondition {
    /// Both end values are fixed by the right-hand side: `x_0 = rhs_0 / 2`, `x_(n-1) = rhs_(n-1) / 2`.
    pub const CLAMPED: Self = Self {
        mu_0: 0.0,
        diag_0: 2.0,
        lambda_n: 0.0,
        diag_n: 2.0,
    };
}

#[inline(always)]
fn floor_pivot(pivot: f64) -> f64 {
    if pivot.abs() < PIVOT_EPSILON {
        PIVOT_EPSILON.copysign(pivot)
    } else {
        pivot
    }
}

/// Thomas algorithm for tridiagonal systems with constant inner diagonals.
///
/// Keeps its sweep coefficients between calls.
#[derive(Debug, Default, Clone)]
pub struct TridiagonalSolver {
    alphas: Vec<f64>,
    betas: Vec<f64>,
}

impl TridiagonalSolver {
    /// Solves the system and writes the unknowns into `out`.
    ///
    /// ## Parameters
    /// - `lower`, `diag`, `upper`: Coefficients of the inner rows.
    /// - `rhs`: Right-hand side, one value per row.
    /// - `border`: First and last row.
    /// - `out`: Receives the solution. Must have the length of `rhs`.
    pub fn solve(
        &mut self,
        lower: f64,
        diag: f64,
        upper: f64,
        rhs: &[f64],
        border: &BorderCondition,
        out: &mut [f64],
    ) {
        let n = rhs.len();
        debug_assert_eq!(out.len(), n);

        match n {
            0 => return,
            1 => {
                out[0] = rhs[0] / floor_pivot(border.diag_0);
                return;
            }
            _ => {}
        }

        self.alphas.clear();
        self.alphas.resize(n, 0.0);
        self.betas.clear();
        self.betas.resize(n, 0.0);

        let diag_0 = floor_pivot(border.diag_0);
        self.alphas[1] = -border.mu_0 / diag_0;
        self.betas[1] = rhs[0] / diag_0;

        for i in 1..n - 1 {
            let pivot = floor_pivot(lower * self.alphas[i] + diag);
            self.alphas[i + 1] = -upper / pivot;
            self.betas[i + 1] = (rhs[i] - lower * self.betas[i]) / pivot;
        }

        let last = n - 1;
        let pivot = floor_pivot(border.lambda_n * self.alphas[last] + border.diag_n);
        out[last] = (rhs[last] - border.lambda_n * self.betas[last]) / pivot;

        for i in (1..n).rev() {
            out[i - 1] = self.alphas[i] * out[i] + self.betas[i];
        }
    }
}

/// A cubic spline through one batch of samples on a uniform grid.
#[derive(Debug, Default, Clone)]
pub(crate) struct SplineFit {
    samples: Vec<f64>,
    derivatives: Vec<f64>,
    rhs: Vec<f64>,
    solver: TridiagonalSolver,
}

impl SplineFit {
    /// Fits the spline through `input` sampled at `rate`.
    ///
    /// The end derivatives are clamped to the one-sided difference quotients.
    pub(crate) fn fit(&mut self, input: &[i16], rate: u32) {
        let n = input.len();
        let rate = rate as f64;

        self.samples.clear();
        self.samples.extend(input.iter().map(|&s| s16_to_f64(s)));
        self.derivatives.clear();
        self.derivatives.resize(n, 0.0);

        if n < 2 {
            return;
        }

        let y = &self.samples;
        self.rhs.clear();
        self.rhs.push(DIAGONAL * (y[1] - y[0]) * rate);
        self.rhs.extend(y.windows(3).map(|w| {
            3.0 * rate * (NEIGHBOUR_WEIGHT * (w[1] - w[0]) + NEIGHBOUR_WEIGHT * (w[2] - w[1]))
        }));
        self.rhs.push(DIAGONAL * (y[n - 1] - y[n - 2]) * rate);

        self.solver.solve(
            NEIGHBOUR_WEIGHT,
            DIAGONAL,
            NEIGHBOUR_WEIGHT,
            &self.rhs,
            &BorderCondition::CLAMPED,
            &mut self.derivatives,
        );
    }

    /// Evaluates the fitted spline at `k / output_rate` seconds for every output sample `k`.
    pub(crate) fn evaluate(&self, input_rate: u32, output_rate: u32, output: &mut [i16]) {
        let n = self.samples.len();
        if n < 2 {
            output.fill(self.samples.first().map_or(0, |&y| f64_to_s16(y)));
            return;
        }

        let step = input_rate as f64 / output_rate as f64;
        let h = 1.0 / input_rate as f64;

        for (k, out) in output.iter_mut().enumerate() {
            let position = k as f64 * step;
            let left = (position.floor() as usize).min(n - 2);
            let t = position - left as f64;

            let (y0, y1) = (self.samples[left], self.samples[left + 1]);
            let (m0, m1) = (self.derivatives[left], self.derivatives[left + 1]);

            let t2 = t * t;
            let t3 = t2 * t;
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = 3.0 * t2 - 2.0 * t3;
            let h11 = t3 - t2;

            *out = f64_to_s16(h00 * y0 + h10 * h * m0 + h01 * y1 + h11 * h * m1);
        }
    }
}

fn validate_rates(input_rate: u32, output_rate: u32) -> Result<(), ResampleError> {
    if input_rate == 0 || output_rate == 0 {
        return Err(ResampleError::UnsupportedRatePair {
            input_rate,
            output_rate,
        });
    }
    Ok(())
}

/// Cubic spline resampler for arbitrary rate pairs.
///
/// Input lengths are whole multiples of the batch found by [`find_spline_batch`]. Every call
/// fits one spline through its whole input, so the resampler keeps no state between calls.
///
/// ## Example
///
/// ```rust
/// use pcm_resampler::{Resampler, ResamplerSpline};
///
/// let resampler = ResamplerSpline::new(11025, 8000, None).unwrap();
/// assert!(resampler.tolerance_met());
///
/// let (input_len, output_len) = resampler.in_out_for(320);
/// assert_eq!((input_len, output_len), (441, 320));
/// ```
#[derive(Debug, Clone)]
pub struct ResamplerSpline {
    input_rate: u32,
    output_rate: u32,
    batch: SplineBatch,
    fit: SplineFit,
}

impl ResamplerSpline {
    /// Create a new [`ResamplerSpline`].
    ///
    /// ## Parameters
    /// - `input_rate`: Input sample rate in Hz.
    /// - `output_rate`: Output sample rate in Hz.
    /// - `max_err_rate`: Maximal relative timing error, [`crate::DEFAULT_MAX_ERR_RATE`] if `None`.
    pub fn new(
        input_rate: u32,
        output_rate: u32,
        max_err_rate: Option<f64>,
    ) -> Result<Self, ResampleError> {
        validate_rates(input_rate, output_rate)?;
        let batch = find_spline_batch(resolve_max_err_rate(max_err_rate), input_rate, output_rate);

        Ok(Self {
            input_rate,
            output_rate,
            batch,
            fit: SplineFit::default(),
        })
    }

    /// Returns `false` if the batch search could not meet the error rate.
    pub fn tolerance_met(&self) -> bool {
        self.batch.tolerance_met
    }

    /// The batch the input is processed in.
    pub fn batch(&self) -> SplineBatch {
        self.batch
    }
}

impl Resampler for ResamplerSpline {
    fn resample(&mut self, input: &[i16], output: &mut [i16]) -> Result<(), ResampleError> {
        if self.in_out_for(output.len()) != (input.len(), output.len()) {
            return Err(ResampleError::IncorrectLength {
                input: input.len(),
                output: output.len(),
            });
        }

        self.fit.fit(input, self.input_rate);
        self.fit.evaluate(self.input_rate, self.output_rate, output);
        Ok(())
    }

    fn samples_needed_for(&self, out_amt: usize) -> usize {
        out_amt.div_ceil(self.batch.out_amt) * self.batch.in_amt
    }

    fn output_len_for(&self, in_amt: usize) -> usize {
        in_amt * self.batch.out_amt / self.batch.in_amt
    }

    fn reset(&mut self) {}

    fn input_rate(&self) -> u32 {
        self.input_rate
    }

    fn output_rate(&self) -> u32 {
        self.output_rate
    }
}

/// Cubic spline resampler rendering one input at two output rates.
///
/// One spline fit per call serves both outputs. Input lengths are whole multiples of the least
/// common multiple of both batch inputs, so each output always covers its whole input.
#[derive(Debug, Clone)]
pub struct ResamplerSplineDual {
    input_rate: u32,
    output_rates: (u32, u32),
    batches: (SplineBatch, SplineBatch),
    quantum: usize,
    fit: SplineFit,
}

impl ResamplerSplineDual {
    /// Create a new [`ResamplerSplineDual`].
    ///
    /// ## Parameters
    /// - `input_rate`: Input sample rate in Hz.
    /// - `output_rates`: The two output sample rates in Hz.
    /// - `max_err_rate`: Maximal relative timing error, [`crate::DEFAULT_MAX_ERR_RATE`] if `None`.
    pub fn new(
        input_rate: u32,
        output_rates: (u32, u32),
        max_err_rate: Option<f64>,
    ) -> Result<Self, ResampleError> {
        validate_rates(input_rate, output_rates.0)?;
        validate_rates(input_rate, output_rates.1)?;

        let max_err_rate = resolve_max_err_rate(max_err_rate);
        let batches = (
            find_spline_batch(max_err_rate, input_rate, output_rates.0),
            find_spline_batch(max_err_rate, input_rate, output_rates.1),
        );

        Ok(Self {
            input_rate,
            output_rates,
            batches,
            quantum: lcm(batches.0.in_amt, batches.1.in_amt),
            fit: SplineFit::default(),
        })
    }

    /// Returns `false` if the batch search of either output could not meet the error rate.
    pub fn tolerance_met(&self) -> bool {
        self.batches.0.tolerance_met && self.batches.1.tolerance_met
    }
}

fn lcm(a: usize, b: usize) -> usize {
    let (mut x, mut y) = (a, b);
    while y != 0 {
        (x, y) = (y, x % y);
    }
    a / x * b
}

fn needed_for(batch: &SplineBatch, out_amt: usize) -> usize {
    out_amt.div_ceil(batch.out_amt) * batch.in_amt
}

fn produced_for(batch: &SplineBatch, in_amt: usize) -> usize {
    in_amt * batch.out_amt / batch.in_amt
}

impl DualResampler for ResamplerSplineDual {
    fn resample(
        &mut self,
        input: &[i16],
        first: &mut [i16],
        second: &mut [i16],
    ) -> Result<(), ResampleError> {
        let lens = (input.len(), first.len(), second.len());
        if self.in_out_for(first.len(), second.len()) != lens {
            // Report the output that disagrees with the input length.
            let expected = self.output_lens_for(input.len());
            let output = if first.len() == expected.0 && second.len() != expected.1 {
                second.len()
            } else {
                first.len()
            };
            return Err(ResampleError::IncorrectLength {
                input: input.len(),
                output,
            });
        }

        self.fit.fit(input, self.input_rate);
        self.fit.evaluate(self.input_rate, self.output_rates.0, first);
        self.fit.evaluate(self.input_rate, self.output_rates.1, second);
        Ok(())
    }

    fn samples_needed_for(&self, first_amt: usize, second_amt: usize) -> usize {
        let in_amt =
            needed_for(&self.batches.0, first_amt).max(needed_for(&self.batches.1, second_amt));
        in_amt.div_ceil(self.quantum) * self.quantum
    }

    fn output_lens_for(&self, in_amt: usize) -> (usize, usize) {
        (
            produced_for(&self.batches.0, in_amt),
            produced_for(&self.batches.1, in_amt),
        )
    }

    fn reset(&mut self) {}

    fn input_rate(&self) -> u32 {
        self.input_rate
    }

    fn output_rates(&self) -> (u32, u32) {
        self.output_rates
    }
}

#[cfg(test)]
mod tests {
    use core::f64::consts::PI;

    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn sine(rate: u32, frequency: f64, amplitude: f64, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * frequency * i as f64 / rate as f64).sin()).round() as i16)
            .collect()
    }

    #[test]
    fn test_thomas_matches_dense_solution() {
        // 2 1 0 0 | 4
        // 1 4 1 0 | 12
        // 0 1 4 1 | 18
        // 0 0 0 2 | 8    -> x = (1, 2, 3, 4)
        let border = BorderCondition {
            mu_0: 1.0,
            diag_0: 2.0,
            lambda_n: 0.0,
            diag_n: 2.0,
        };
        let rhs = [4.0, 12.0, 18.0, 8.0];
        let mut out = [0.0; 4];

        TridiagonalSolver::default().solve(1.0, 4.0, 1.0, &rhs, &border, &mut out);

        for (i, (&got, expected)) in out.iter().zip([1.0, 2.0, 3.0, 4.0]).enumerate() {
            assert!(approx_eq(got, expected, 1e-9), "x[{i}]: expected {expected}, got {got}");
        }
    }

    #[test]
    fn test_pivot_floor_keeps_sign() {
        assert_eq!(floor_pivot(0.0), PIVOT_EPSILON);
        assert_eq!(floor_pivot(-1e-9), -PIVOT_EPSILON);
        assert_eq!(floor_pivot(3.0), 3.0);
    }

    #[test]
    fn test_degenerate_pivot_does_not_produce_nan() {
        let border = BorderCondition {
            mu_0: 0.0,
            diag_0: 0.0,
            lambda_n: 0.0,
            diag_n: 0.0,
        };
        let mut out = [0.0; 5];
        TridiagonalSolver::default().solve(1.0, 0.0, 1.0, &[1.0; 5], &border, &mut out);
        assert!(out.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_spline_reproduces_knots() {
        let mut fit = SplineFit::default();
        let input = sine(8000, 440.0, 12000.0, 64);
        fit.fit(&input, 8000);

        let mut output = vec![0i16; 64];
        fit.evaluate(8000, 8000, &mut output);

        assert_eq!(input, output);
    }

    #[test]
    fn test_spline_follows_sine() {
        for (input_rate, output_rate) in [(8000, 16000), (16000, 8000), (44100, 16000), (11025, 8000)] {
            let mut resampler = ResamplerSpline::new(input_rate, output_rate, None).unwrap();
            let (input_len, output_len) = resampler.in_out_for(output_rate as usize / 10);
            let input = sine(input_rate, 200.0, 10000.0, input_len);
            let mut output = vec![0i16; output_len];

            resampler.resample(&input, &mut output).unwrap();

            // The last samples lie behind the last knot and are extrapolated.
            let expected = sine(output_rate, 200.0, 10000.0, output_len);
            let interior = output_len / 10..output_len * 9 / 10;
            for (i, (&got, &want)) in output[interior.clone()]
                .iter()
                .zip(&expected[interior])
                .enumerate()
            {
                assert!(
                    (got as i32 - want as i32).abs() <= 40,
                    "{input_rate}->{output_rate}: sample {i}: expected {want}, got {got}"
                );
            }
        }
    }

    #[test]
    fn test_constant_full_scale_is_preserved() {
        let mut resampler = ResamplerSpline::new(44100, 8000, None).unwrap();
        let (input_len, output_len) = resampler.in_out_for(1000);

        for value in [i16::MAX, i16::MIN] {
            let input = vec![value; input_len];
            let mut output = vec![0i16; output_len];
            resampler.resample(&input, &mut output).unwrap();
            assert!(output.iter().all(|&s| s == value), "constant {value} changed");
        }
    }

    #[test]
    fn test_incorrect_length_is_rejected() {
        let mut resampler = ResamplerSpline::new(16000, 8000, None).unwrap();
        let mut output = vec![0i16; 15];
        assert_eq!(
            resampler.resample(&[0; 31], &mut output),
            Err(ResampleError::IncorrectLength {
                input: 31,
                output: 15
            })
        );
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        assert!(ResamplerSpline::new(0, 8000, None).is_err());
        assert!(ResamplerSplineDual::new(8000, (16000, 0), None).is_err());
    }

    #[test]
    fn test_dual_incorrect_length_is_rejected() {
        let mut dual = ResamplerSplineDual::new(8000, (16000, 8000), None).unwrap();
        assert_eq!(dual.in_out_for(14, 7), (30, 60, 30));

        // Consistent with `output_lens_for`, but not a length `in_out_for` hands out.
        let (mut first, mut second) = (vec![0i16; 14], vec![0i16; 7]);
        assert_eq!(
            dual.resample(&[0; 7], &mut first, &mut second),
            Err(ResampleError::IncorrectLength {
                input: 7,
                output: 14
            })
        );

        let (mut first, mut second) = (vec![0i16; 60], vec![0i16; 29]);
        assert_eq!(
            dual.resample(&[0; 30], &mut first, &mut second),
            Err(ResampleError::IncorrectLength {
                input: 30,
                output: 29
            })
        );

        let (mut first, mut second) = (vec![0i16; 60], vec![0i16; 30]);
        assert!(dual.resample(&[0; 30], &mut first, &mut second).is_ok());
    }

    #[test]
    fn test_dual_input_covers_both_batches() {
        let dual = ResamplerSplineDual::new(11025, (11025, 8000), None).unwrap();
        let quantum = lcm(30, 441);
        assert_eq!(quantum, 4410);

        for (first_amt, second_amt) in [(1, 0), (30, 0), (0, 1), (0, 3201), (4411, 100)] {
            let (in_amt, first_len, second_len) = dual.in_out_for(first_amt, second_amt);
            assert_eq!(in_amt % quantum, 0, "({first_amt}, {second_amt})");
            assert!(first_len >= first_amt && second_len >= second_amt);
            assert_eq!(first_len, in_amt);
            assert_eq!(second_len * 11025, in_amt * 8000);
        }
        assert_eq!(dual.in_out_for(0, 0), (0, 0, 0));
    }

    #[test]
    fn test_dual_matches_single_outputs() {
        let mut dual = ResamplerSplineDual::new(44100, (16000, 8000), None).unwrap();
        let mut first = ResamplerSpline::new(44100, 16000, None).unwrap();
        let mut second = ResamplerSpline::new(44100, 8000, None).unwrap();

        let (input_len, first_len, second_len) = dual.in_out_for(320, 0);
        assert_eq!((input_len, first_len, second_len), (882, 320, 160));

        let input = sine(44100, 1000.0, 9000.0, input_len);
        let mut dual_first = vec![0i16; first_len];
        let mut dual_second = vec![0i16; second_len];
        dual.resample(&input, &mut dual_first, &mut dual_second).unwrap();

        let mut single_first = vec![0i16; first_len];
        let mut single_second = vec![0i16; second_len];
        first.resample(&input, &mut single_first).unwrap();
        second.resample(&input, &mut single_second).unwrap();

        assert_eq!(dual_first, single_first);
        assert_eq!(dual_second, single_second);
    }
}
