//! Batch size planning for the spline and FFT resamplers.
//!
//! Both kernels process the input in batches whose output length is a whole number of samples.
//! The ideal output length `in_amt * out_rate / in_rate` is rarely an integer, so the rounding
//! drifts the timing of the output. The planners search for batch lengths that keep that drift
//! below a relative error rate.
//!
//! Searches are memoised per `(input rate, output rate, error rate)`.

use std::{
    collections::HashMap,
    sync::{LazyLock, Mutex, PoisonError},
};

/// Smallest input batch the spline search considers. Shorter batches suffer from edge effects.
pub const MIN_SPLINE_BATCH: usize = 30;

/// The spline search gives up at this input batch length.
pub const MAX_SPLINE_BATCH: usize = 100_000;

/// Number of slots of an FFT batch table. Slot `k` holds the input length producing `2^k` samples.
pub const FFT_BATCH_SLOTS: usize = 30;

/// Smallest power of two the FFT planner fills.
pub const MIN_FFT_BATCH_LOG2: usize = 4;

/// Upper bound of the input length range the FFT planner searches.
const FFT_SEARCH_LIMIT: i64 = 1 << 35;

/// Batching roughly doubles the single batch error, so each FFT batch gets a tighter budget.
const FFT_ERROR_DIVISOR: f64 = 2.1;

type CacheKey = (u32, u32, u64);

static SPLINE_CACHE: LazyLock<Mutex<HashMap<CacheKey, SplineBatch>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

static FFT_CACHE: LazyLock<Mutex<HashMap<CacheKey, FftBatchPlan>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Input and output length of one spline batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SplineBatch {
    /// Input samples per batch.
    pub in_amt: usize,
    /// Output samples per batch.
    pub out_amt: usize,
    /// `false` if no batch met the requested error rate and the closest one was chosen.
    pub tolerance_met: bool,
}

/// Table of FFT batch lengths, indexed by the base two logarithm of the output length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FftBatchPlan {
    /// `sizes[k]` is the input length resampled into `2^k` output samples, if one was found.
    pub sizes: [Option<usize>; FFT_BATCH_SLOTS],
    /// `false` if no batch met the requested error rate.
    pub tolerance_met: bool,
}

impl FftBatchPlan {
    /// Returns the filled slots as `(log2 of output length, input length)`, largest first.
    pub fn batches(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.sizes
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(log2, size)| size.map(|size| (log2, size)))
    }

    /// Base two logarithm of the smallest output batch.
    pub fn smallest_log2(&self) -> Option<usize> {
        self.sizes.iter().position(Option::is_some)
    }
}

/// Ideal output length for `in_amt` input samples and its rounding, as `(min, max)`.
fn rounding_bounds(input_rate: u32, output_rate: u32, in_amt: u64) -> (f64, f64) {
    let expected = (in_amt * output_rate as u64) as f64 / input_rate as f64;
    let rounded = expected.round();
    (expected.min(rounded), expected.max(rounded))
}

/// Returns `true` if `max` exceeds `min` by at most the relative error rate.
fn fits(min: f64, max: f64, max_err_rate: f64) -> bool {
    max <= min * (1.0 + max_err_rate)
}

fn cache_key(input_rate: u32, output_rate: u32, max_err_rate: f64) -> CacheKey {
    (input_rate, output_rate, max_err_rate.to_bits())
}

/// Finds the shortest spline batch whose output length rounding stays within `max_err_rate`.
///
/// If no batch length up to [`MAX_SPLINE_BATCH`] fits, the one with the smallest relative
/// rounding error is returned and [`SplineBatch::tolerance_met`] is `false`.
///
/// ## Parameters
/// - `max_err_rate`: Relative timing error in `[0, 1]`.
/// - `input_rate`: Input sample rate in Hz. Must not be zero.
/// - `output_rate`: Output sample rate in Hz. Must not be zero.
pub fn find_spline_batch(max_err_rate: f64, input_rate: u32, output_rate: u32) -> SplineBatch {
    let key = cache_key(input_rate, output_rate, max_err_rate);

    *SPLINE_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert_with(|| search_spline_batch(max_err_rate, input_rate, output_rate))
}

fn search_spline_batch(max_err_rate: f64, input_rate: u32, output_rate: u32) -> SplineBatch {
    let out_amt_for =
        |in_amt: usize| (in_amt as u64 * output_rate as u64).div_ceil(input_rate as u64) as usize;

    let mut best_in_amt = MIN_SPLINE_BATCH;
    let mut best_error = f64::INFINITY;

    for in_amt in MIN_SPLINE_BATCH..MAX_SPLINE_BATCH {
        let (min, max) = rounding_bounds(input_rate, output_rate, in_amt as u64);
        if fits(min, max, max_err_rate) {
            let batch = SplineBatch {
                in_amt,
                out_amt: out_amt_for(in_amt),
                tolerance_met: true,
            };
            log::debug!(
                "Spline batch for {input_rate} Hz -> {output_rate} Hz: {} -> {}",
                batch.in_amt,
                batch.out_amt
            );
            return batch;
        }

        if min > 0.0 {
            let error = (max - min) / min;
            if error < best_error {
                best_error = error;
                best_in_amt = in_amt;
            }
        }
    }

    log::warn!(
        "No spline batch for {input_rate} Hz -> {output_rate} Hz meets the error rate {max_err_rate}, \
        using {best_in_amt} input samples with error rate {best_error}"
    );

    SplineBatch {
        in_amt: best_in_amt,
        out_amt: out_amt_for(best_in_amt),
        tolerance_met: false,
    }
}

/// Finds, for every power of two output length, the input length closest to it whose rounding
/// stays within the error budget.
///
/// The largest slot is always filled with its closest candidate so the table is never empty.
///
/// ## Parameters
/// - `input_rate`: Input sample rate in Hz. Must not be zero.
/// - `output_rate`: Output sample rate in Hz. Must not be zero.
/// - `max_err_rate`: Relative timing error in `[0, 1]`.
pub fn find_fft_batches(input_rate: u32, output_rate: u32, max_err_rate: f64) -> FftBatchPlan {
    let key = cache_key(input_rate, output_rate, max_err_rate);

    FFT_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert_with(|| search_fft_batches(input_rate, output_rate, max_err_rate))
        .clone()
}

fn search_fft_batches(input_rate: u32, output_rate: u32, max_err_rate: f64) -> FftBatchPlan {
    let distance = |size: i64, target: f64| {
        (size as f64 * output_rate as f64 / input_rate as f64 - target).abs()
    };

    let mut sizes = [None; FFT_BATCH_SLOTS];
    let mut tolerance_met = false;

    for log2 in MIN_FFT_BATCH_LOG2..FFT_BATCH_SLOTS {
        let target = (1u64 << log2) as f64;
        let is_last = log2 + 1 == FFT_BATCH_SLOTS;

        let (mut low, mut high) = (0i64, FFT_SEARCH_LIMIT);
        while low + 2 < high {
            let mid_low = low + (high - low) / 3;
            let mid_high = high - (high - low) / 3;
            if distance(mid_low, target) <= distance(mid_high, target) {
                high = mid_high;
            } else {
                low = mid_low;
            }
        }

        let mut best_distance = f64::INFINITY;
        for size in low..=high {
            let (min, max) = rounding_bounds(input_rate, output_rate, size as u64);
            if fits(min, max, max_err_rate / FFT_ERROR_DIVISOR) {
                tolerance_met = true;
            } else if !is_last {
                continue;
            }

            let current = distance(size, target);
            if current < best_distance && size > 0 {
                best_distance = current;
                sizes[log2] = Some(size as usize);
            }
        }
    }

    if tolerance_met {
        log::debug!("FFT batches for {input_rate} Hz -> {output_rate} Hz: {sizes:?}");
    } else {
        log::warn!(
            "No FFT batch for {input_rate} Hz -> {output_rate} Hz meets the error rate {max_err_rate}"
        );
    }

    FftBatchPlan {
        sizes,
        tolerance_met,
    }
}
