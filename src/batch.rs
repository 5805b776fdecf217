//! Push/pull streaming on top of whole-buffer kernels.
//!
//! Input is pushed with `add` and output pulled in arbitrary amounts with `get`. Only the input
//! a kernel asks for is resampled, everything else waits in the backlogs. A pull the buffered
//! input can't serve fails with [`ResampleError::NotEnoughSamples`] and changes nothing, so it
//! can be repeated after more input has been added.

use crate::{
    error::ResampleError,
    resampler::{DualResampler, Resampler},
};

/// A FIFO of samples. Consumed samples are dropped lazily, once they make up half the storage.
#[derive(Debug, Default, Clone)]
pub(crate) struct Backlog {
    data: Vec<i16>,
    start: usize,
}

impl Backlog {
    pub(crate) fn len(&self) -> usize {
        self.data.len() - self.start
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn as_slice(&self) -> &[i16] {
        &self.data[self.start..]
    }

    pub(crate) fn push_slice(&mut self, samples: &[i16]) {
        self.compact();
        self.data.extend_from_slice(samples);
    }

    /// Appends `amt` zeroed samples and returns them for writing.
    pub(crate) fn grow(&mut self, amt: usize) -> &mut [i16] {
        self.compact();
        let old_len = self.data.len();
        self.data.resize(old_len + amt, 0);
        &mut self.data[old_len..]
    }

    /// Keeps only the first `len` samples.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(self.start + len);
    }

    /// Drops `amt` samples from the front.
    pub(crate) fn consume(&mut self, amt: usize) {
        debug_assert!(amt <= self.len());
        self.start += amt;
        if self.start == self.data.len() {
            self.clear();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.start = 0;
    }

    /// Removes the first `amt` samples and returns them as an owned vector.
    ///
    /// If the backlog holds no consumed samples, the storage itself is handed over and only
    /// the remainder is copied.
    pub(crate) fn take_front(&mut self, amt: usize) -> Vec<i16> {
        debug_assert!(amt <= self.len());
        if self.start == 0 {
            let rest = self.data.split_off(amt);
            core::mem::replace(&mut self.data, rest)
        } else {
            let front = self.as_slice()[..amt].to_vec();
            self.consume(amt);
            front
        }
    }

    fn compact(&mut self) {
        if self.start > 0 && self.start * 2 >= self.data.len() {
            self.data.drain(..self.start);
            self.start = 0;
        }
    }
}

/// Output length of the tail flush: the whole samples `remaining` input samples correspond to.
fn flush_target(remaining: usize, input_rate: u32, output_rate: u32) -> usize {
    (remaining as u64 * output_rate as u64 / input_rate as u64) as usize
}

/// Streams through a [`Resampler`].
///
/// ## Example
///
/// ```rust
/// use pcm_resampler::{ResampleBatch, ResampleError, ResamplerConstExpr};
///
/// let resampler = ResamplerConstExpr::new(16000, 8000).unwrap();
/// let mut batch = ResampleBatch::new(resampler);
///
/// let mut output = vec![0i16; 480];
/// assert!(matches!(
///     batch.get(&mut output),
///     Err(ResampleError::NotEnoughSamples { .. })
/// ));
///
/// batch.add(&vec![0i16; 1000]);
/// batch.get(&mut output).unwrap();
/// assert_eq!(batch.backlog(), (40, 0));
/// ```
pub struct ResampleBatch<R> {
    resampler: R,
    input: Backlog,
    output: Backlog,
}

impl<R: Resampler> ResampleBatch<R> {
    /// Creates a stream with empty backlogs.
    pub fn new(resampler: R) -> Self {
        Self {
            resampler,
            input: Backlog::default(),
            output: Backlog::default(),
        }
    }

    /// Appends input samples.
    pub fn add(&mut self, samples: &[i16]) {
        self.input.push_slice(samples);
    }

    /// Fills `out` with the next output samples.
    ///
    /// Returns [`ResampleError::NotEnoughSamples`] without changing anything if the buffered
    /// input doesn't cover the pull.
    pub fn get(&mut self, out: &mut [i16]) -> Result<(), ResampleError> {
        self.resample_more(out.len())?;
        out.copy_from_slice(&self.output.as_slice()[..out.len()]);
        self.output.consume(out.len());
        Ok(())
    }

    /// Like [`ResampleBatch::get`], but returns the next `amt` samples as an owned vector.
    pub fn get_large(&mut self, amt: usize) -> Result<Vec<i16>, ResampleError> {
        self.resample_more(amt)?;
        Ok(self.output.take_front(amt))
    }

    /// Resamples all buffered input, zero-padding it up to the kernel's quantum.
    ///
    /// Only the output corresponding to real input is kept. Up to one output sample worth of
    /// signal at the very end is lost.
    pub fn resample_all_in_buf(&mut self) -> Result<(), ResampleError> {
        let remaining = self.input.len();
        let target = flush_target(
            remaining,
            self.resampler.input_rate(),
            self.resampler.output_rate(),
        );

        if target > 0 {
            let (in_amt, out_amt) = self.resampler.in_out_for(target);

            let mut padded = self.input.as_slice()[..remaining.min(in_amt)].to_vec();
            padded.resize(in_amt, 0);

            let buffered = self.output.len();
            let output = self.output.grow(out_amt);
            if let Err(err) = self.resampler.resample(&padded, output) {
                self.output.truncate(buffered);
                return Err(err);
            }
            self.output.truncate(buffered + target.min(out_amt));

            log::trace!("Flushed {remaining} input samples into {target} output samples");
        }

        self.input.clear();
        Ok(())
    }

    /// Returns `(unresampled input, undelivered output)` sample counts.
    pub fn backlog(&self) -> (usize, usize) {
        (self.input.len(), self.output.len())
    }

    /// Number of resampled samples waiting to be pulled.
    pub fn len(&self) -> usize {
        self.output.len()
    }

    /// Returns `true` if neither input nor output is buffered.
    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.output.is_empty()
    }

    /// Drops both backlogs and resets the kernel.
    pub fn reset(&mut self) {
        self.input.clear();
        self.output.clear();
        self.resampler.reset();
    }

    /// The wrapped kernel.
    pub fn resampler(&self) -> &R {
        &self.resampler
    }

    /// Makes sure at least `amt` output samples are buffered.
    fn resample_more(&mut self, amt: usize) -> Result<(), ResampleError> {
        let buffered = self.output.len();
        if buffered >= amt {
            return Ok(());
        }

        let (in_amt, out_amt) = self.resampler.in_out_for(amt - buffered);
        if in_amt > self.input.len() {
            return Err(ResampleError::NotEnoughSamples {
                needed: in_amt,
                available: self.input.len(),
            });
        }

        log::trace!("Resampling {in_amt} input samples into {out_amt} output samples");

        let input = &self.input.as_slice()[..in_amt];
        let output = self.output.grow(out_amt);
        if let Err(err) = self.resampler.resample(input, output) {
            self.output.truncate(buffered);
            return Err(err);
        }

        self.input.consume(in_amt);
        Ok(())
    }
}

/// Selects an output of a [`ResampleBatchDual`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Wave {
    First,
    Second,
}

/// Streams one input through a [`DualResampler`] into two outputs.
///
/// Both outputs are rendered from the same input prefix. A pull on one wave consumes as much
/// input as that wave needs and the other wave receives its image of the same input, so the
/// two output backlogs always cover identical stretches of the input.
pub struct ResampleBatchDual<R> {
    resampler: R,
    input: Backlog,
    outputs: [Backlog; 2],
}

impl<R: DualResampler> ResampleBatchDual<R> {
    /// Creates a stream with empty backlogs.
    pub fn new(resampler: R) -> Self {
        Self {
            resampler,
            input: Backlog::default(),
            outputs: Default::default(),
        }
    }

    /// Appends input samples.
    pub fn add(&mut self, samples: &[i16]) {
        self.input.push_slice(samples);
    }

    /// Fills `out` with the next samples of `wave`.
    pub fn get(&mut self, wave: Wave, out: &mut [i16]) -> Result<(), ResampleError> {
        self.resample_more(wave, out.len())?;
        let backlog = &mut self.outputs[wave as usize];
        out.copy_from_slice(&backlog.as_slice()[..out.len()]);
        backlog.consume(out.len());
        Ok(())
    }

    /// Like [`ResampleBatchDual::get`], but returns the next `amt` samples as an owned vector.
    pub fn get_large(&mut self, wave: Wave, amt: usize) -> Result<Vec<i16>, ResampleError> {
        self.resample_more(wave, amt)?;
        Ok(self.outputs[wave as usize].take_front(amt))
    }

    /// Resamples all buffered input into both outputs, zero-padding it up to the quantum.
    pub fn resample_all_in_buf(&mut self) -> Result<(), ResampleError> {
        let remaining = self.input.len();
        let input_rate = self.resampler.input_rate();
        let (first_rate, second_rate) = self.resampler.output_rates();
        let targets = [
            flush_target(remaining, input_rate, first_rate),
            flush_target(remaining, input_rate, second_rate),
        ];

        if targets.iter().any(|&target| target > 0) {
            let (in_amt, first_amt, second_amt) = self.resampler.in_out_for(targets[0], targets[1]);

            let mut padded = self.input.as_slice()[..remaining.min(in_amt)].to_vec();
            padded.resize(in_amt, 0);

            let produced = [first_amt, second_amt];
            self.resample_into(&padded, produced)?;

            let [first, second] = &mut self.outputs;
            first.truncate(first.len() - produced[0] + targets[0].min(produced[0]));
            second.truncate(second.len() - produced[1] + targets[1].min(produced[1]));

            log::trace!("Flushed {remaining} input samples into {targets:?} output samples");
        }

        self.input.clear();
        Ok(())
    }

    /// Returns `(unresampled input, undelivered output of wave)` sample counts.
    pub fn backlog(&self, wave: Wave) -> (usize, usize) {
        (self.input.len(), self.outputs[wave as usize].len())
    }

    /// Drops all backlogs and resets the kernel.
    pub fn reset(&mut self) {
        self.input.clear();
        self.outputs.iter_mut().for_each(Backlog::clear);
        self.resampler.reset();
    }

    /// The wrapped kernel.
    pub fn resampler(&self) -> &R {
        &self.resampler
    }

    fn resample_more(&mut self, wave: Wave, amt: usize) -> Result<(), ResampleError> {
        let buffered = self.outputs[wave as usize].len();
        if buffered >= amt {
            return Ok(());
        }

        let missing = amt - buffered;
        let (in_amt, first_amt, second_amt) = match wave {
            Wave::First => self.resampler.in_out_for(missing, 0),
            Wave::Second => self.resampler.in_out_for(0, missing),
        };
        if in_amt > self.input.len() {
            return Err(ResampleError::NotEnoughSamples {
                needed: in_amt,
                available: self.input.len(),
            });
        }

        log::trace!(
            "Resampling {in_amt} input samples into {first_amt} and {second_amt} output samples"
        );

        let Self {
            resampler,
            input,
            outputs,
        } = self;
        let input = &input.as_slice()[..in_amt];
        resample_dual(resampler, input, outputs, [first_amt, second_amt])?;

        self.input.consume(in_amt);
        Ok(())
    }

    fn resample_into(&mut self, input: &[i16], amts: [usize; 2]) -> Result<(), ResampleError> {
        resample_dual(&mut self.resampler, input, &mut self.outputs, amts)
    }
}

/// Appends the kernel output for `input` to both backlogs, rolling them back on error.
fn resample_dual<R: DualResampler>(
    resampler: &mut R,
    input: &[i16],
    outputs: &mut [Backlog; 2],
    amts: [usize; 2],
) -> Result<(), ResampleError> {
    let buffered = [outputs[0].len(), outputs[1].len()];

    let [first, second] = outputs;
    let result = resampler.resample(input, first.grow(amts[0]), second.grow(amts[1]));

    if result.is_err() {
        first.truncate(buffered[0]);
        second.truncate(buffered[1]);
    }
    result
}

#[cfg(test)]
mod tests {
    use core::f64::consts::PI;

    use super::*;
    use crate::{
        ResamplerConfig, cascade::ResamplerConstExpr, resampler::Passthrough,
        spline::ResamplerSplineDual,
    };

    fn sine(rate: u32, frequency: f64, amplitude: f64, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * frequency * i as f64 / rate as f64).sin()).round() as i16)
            .collect()
    }

    #[test]
    fn test_backlog_fifo() {
        let mut backlog = Backlog::default();
        backlog.push_slice(&[1, 2, 3, 4, 5]);
        backlog.consume(2);
        assert_eq!(backlog.as_slice(), &[3, 4, 5]);

        backlog.push_slice(&[6]);
        assert_eq!(backlog.as_slice(), &[3, 4, 5, 6]);

        backlog.grow(2).copy_from_slice(&[7, 8]);
        backlog.truncate(5);
        assert_eq!(backlog.as_slice(), &[3, 4, 5, 6, 7]);

        assert_eq!(backlog.take_front(2), vec![3, 4]);
        assert_eq!(backlog.as_slice(), &[5, 6, 7]);

        backlog.consume(3);
        assert!(backlog.is_empty());
        assert_eq!(backlog.start, 0);
    }

    #[test]
    fn test_take_front_hands_over_storage() {
        let mut backlog = Backlog::default();
        backlog.push_slice(&[1, 2, 3, 4]);
        assert_eq!(backlog.take_front(3), vec![1, 2, 3]);
        assert_eq!(backlog.as_slice(), &[4]);
        assert_eq!(backlog.take_front(1), vec![4]);
        assert!(backlog.is_empty());
    }

    #[test]
    fn test_upsampling_backlog_and_flush() {
        let selection = ResamplerConfig::new(8000, 16000).build().unwrap();
        let mut batch = ResampleBatch::new(selection.resampler);

        batch.add(&[0; 1000]);
        let mut output = vec![1; 481];
        batch.get(&mut output).unwrap();
        assert!(output.iter().all(|&sample| sample == 0));
        assert_eq!(batch.backlog(), (759, 1));

        batch.resample_all_in_buf().unwrap();
        assert_eq!(batch.backlog(), (0, 1519));
        assert_eq!(batch.len(), 1519);
    }

    #[test]
    fn test_downsampling_backlog() {
        let selection = ResamplerConfig::new(16000, 8000).build().unwrap();
        let mut batch = ResampleBatch::new(selection.resampler);

        batch.add(&[0; 1000]);
        let mut output = vec![0; 481];
        batch.get(&mut output).unwrap();
        assert_eq!(batch.backlog(), (38, 0));
    }

    #[test]
    fn test_not_enough_samples_changes_nothing() {
        let mut batch = ResampleBatch::new(ResamplerConstExpr::new(48000, 16000).unwrap());
        batch.add(&[100; 500]);

        let mut output = vec![0; 200];
        assert_eq!(
            batch.get(&mut output),
            Err(ResampleError::NotEnoughSamples {
                needed: 960,
                available: 500
            })
        );
        assert_eq!(batch.backlog(), (500, 0));
        assert!(batch.get_large(200).is_err());
        assert_eq!(batch.backlog(), (500, 0));

        batch.add(&[100; 460]);
        batch.get(&mut output).unwrap();
        assert_eq!(batch.backlog(), (0, 120));
    }

    #[test]
    fn test_pulls_match_whole_buffer() {
        let input = sine(48000, 440.0, 12000.0, 48000);
        let wanted = 7000;

        let mut whole = ResampleBatch::new(ResamplerConstExpr::new(48000, 8000).unwrap());
        whole.add(&input);
        let expected = whole.get_large(wanted).unwrap();

        let mut chunked = ResampleBatch::new(ResamplerConstExpr::new(48000, 8000).unwrap());
        let mut actual = Vec::new();
        let mut fed = 0;
        for pull in [1, 79, 80, 81, 999, 2520].iter().cycle() {
            if actual.len() >= wanted {
                break;
            }
            let pull = (*pull).min(wanted - actual.len());
            loop {
                match chunked.get_large(pull) {
                    Ok(samples) => {
                        actual.extend(samples);
                        break;
                    }
                    Err(ResampleError::NotEnoughSamples { .. }) => {
                        let next = (fed + 777).min(input.len());
                        chunked.add(&input[fed..next]);
                        fed = next;
                    }
                    Err(err) => panic!("unexpected error: {err}"),
                }
            }
        }

        assert_eq!(actual.len(), expected.len());
        let first_difference = actual.iter().zip(&expected).position(|(a, b)| a != b);
        assert_eq!(first_difference, None);
    }

    #[test]
    fn test_delivered_duration_matches_input() {
        for (input_rate, output_rate) in [(16000, 8000), (8000, 16000), (44100, 8000), (11025, 16000)] {
            let selection = ResamplerConfig::new(input_rate, output_rate).build().unwrap();
            let mut batch = ResampleBatch::new(selection.resampler);

            let seconds = 3;
            batch.add(&sine(input_rate, 300.0, 8000.0, input_rate as usize * seconds));

            let mut delivered = 0;
            let mut output = vec![0; 333];
            while batch.get(&mut output).is_ok() {
                delivered += output.len();
            }
            batch.resample_all_in_buf().unwrap();
            delivered += batch.len();

            let expected = output_rate as usize * seconds;
            assert!(
                delivered <= expected && expected - delivered <= 1,
                "{input_rate}->{output_rate}: delivered {delivered}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_reset_restarts_stream() {
        let input = sine(48000, 1000.0, 9000.0, 4800);

        let mut batch = ResampleBatch::new(ResamplerConstExpr::new(48000, 8000).unwrap());
        batch.add(&input);
        let first = batch.get_large(800).unwrap();

        batch.add(&input[..100]);
        batch.reset();
        assert!(batch.is_empty());

        batch.add(&input);
        let second = batch.get_large(800).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_passthrough_stream() {
        let mut batch = ResampleBatch::new(Passthrough::new(8000));
        batch.add(&[1, 2, 3]);
        batch.add(&[4, 5]);
        assert_eq!(batch.get_large(4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(batch.backlog(), (1, 0));
    }

    #[test]
    fn test_dual_backlogs() {
        let resampler = ResamplerSplineDual::new(8000, (16000, 8000), None).unwrap();
        let mut batch = ResampleBatchDual::new(resampler);

        batch.add(&[0; 1000]);
        let mut output = vec![0; 481];
        batch.get(Wave::First, &mut output).unwrap();

        assert_eq!(batch.backlog(Wave::First), (730, 59));
        assert_eq!(batch.backlog(Wave::Second), (730, 270));
    }

    #[test]
    fn test_dual_backlogs_before_pull() {
        let resampler = ResamplerSplineDual::new(16000, (8000, 16000), None).unwrap();
        let mut batch = ResampleBatchDual::new(resampler);

        batch.add(&[0; 200]);
        assert_eq!(batch.backlog(Wave::First), (200, 0));
        assert_eq!(batch.backlog(Wave::Second), (200, 0));
    }

    #[test]
    fn test_dual_waves_cover_same_input() {
        let input = sine(8000, 200.0, 10000.0, 8000);
        let resampler = ResamplerSplineDual::new(8000, (16000, 8000), None).unwrap();
        let mut batch = ResampleBatchDual::new(resampler);
        batch.add(&input);

        let mut first = Vec::new();
        let mut second = Vec::new();
        for round in 0..20 {
            let wave = if round % 3 == 0 { Wave::Second } else { Wave::First };
            let target = if wave == Wave::First { &mut first } else { &mut second };
            match batch.get_large(wave, 200) {
                Ok(samples) => target.extend(samples),
                Err(err) => panic!("round {round}: {err}"),
            }
        }

        // Undelivered plus delivered output of both waves spans the same consumed input.
        let consumed = input.len() - batch.backlog(Wave::First).0;
        let first_total = first.len() + batch.backlog(Wave::First).1;
        let second_total = second.len() + batch.backlog(Wave::Second).1;
        assert_eq!(first_total, consumed * 2);
        assert_eq!(second_total, consumed);
    }

    #[test]
    fn test_dual_unpulled_wave_keeps_timing() {
        let selection = crate::select_dual(11025, (11025, 8000), None).unwrap();
        let mut batch = ResampleBatchDual::new(selection.resampler);

        let input = sine(11025, 440.0, 8000.0, 3 * 11025);
        batch.add(&input);

        let mut first = Vec::new();
        let mut output = vec![0i16; 30];
        while batch.get(Wave::First, &mut output).is_ok() {
            first.extend_from_slice(&output);
        }

        let consumed = input.len() - batch.backlog(Wave::First).0;
        assert_eq!(consumed, 30870);
        assert_eq!(first.len() + batch.backlog(Wave::First).1, consumed);
        assert_eq!(first, input[..first.len()]);

        let second_total = batch.backlog(Wave::Second).1;
        assert_eq!(second_total * 11025, consumed * 8000);
    }

    #[test]
    fn test_dual_not_enough_samples_changes_nothing() {
        let resampler = ResamplerSplineDual::new(8000, (16000, 8000), None).unwrap();
        let mut batch = ResampleBatchDual::new(resampler);
        batch.add(&[0; 20]);

        assert_eq!(
            batch.get_large(Wave::Second, 10),
            Err(ResampleError::NotEnoughSamples {
                needed: 30,
                available: 20
            })
        );
        assert_eq!(batch.backlog(Wave::First), (20, 0));
        assert_eq!(batch.backlog(Wave::Second), (20, 0));
    }

    #[test]
    fn test_dual_flush_and_reset() {
        let resampler = ResamplerSplineDual::new(8000, (16000, 8000), None).unwrap();
        let mut batch = ResampleBatchDual::new(resampler);

        batch.add(&[0; 1000]);
        batch.resample_all_in_buf().unwrap();
        assert_eq!(batch.backlog(Wave::First), (0, 2000));
        assert_eq!(batch.backlog(Wave::Second), (0, 1000));

        batch.reset();
        assert_eq!(batch.backlog(Wave::First), (0, 0));
        assert_eq!(batch.backlog(Wave::Second), (0, 0));
    }
}
