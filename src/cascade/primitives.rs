//! Fixed-point filter primitives of the cascade resamplers.
//!
//! All arithmetic is 32-bit two's complement: sums and products wrap instead of overflowing,
//! shifts are arithmetic. Outputs are bit-exact with the WebRTC signal processing resamplers.

/// Halfband allpass coefficients (Q16) of the branch fed with odd samples.
const HALFBAND_ALLPASS_1: [u16; 3] = [3284, 24441, 49528];
/// Halfband allpass coefficients (Q16) of the branch fed with even samples.
const HALFBAND_ALLPASS_2: [u16; 3] = [12199, 37471, 60255];

/// Polyphase allpass coefficients (Q14), upper and lower branch.
const POLYPHASE_ALLPASS: [[i32; 3]; 2] = [[821, 6110, 12382], [3050, 9368, 15063]];

const COEFFICIENTS_48_TO_32: [[i32; 8]; 2] = [
    [778, -2050, 1087, 23285, 12903, -3783, 441, 222],
    [222, 441, -3783, 12903, 23285, 1087, -2050, 778],
];

const COEFFICIENTS_44_TO_32: [[i32; 9]; 4] = [
    [117, -669, 2245, -6183, 26267, 13529, -3245, 845, -138],
    [-101, 612, -2283, 8532, 29790, -5138, 1789, -524, 91],
    [50, -292, 1016, -3064, 32010, 3933, -1147, 315, -53],
    [-156, 974, -3863, 18603, 21691, -6246, 2353, -712, 126],
];

/// Offset added before the final `>> 15` of the fractional stages.
const HALF_Q15: i32 = 1 << 14;

/// Number of history samples the fractional stages keep between blocks.
pub(crate) const FRACTIONAL_HISTORY: usize = 8;

#[inline(always)]
fn saturate(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// `c + b * a` with `a` a Q16 coefficient, split into high and low halves of `b`.
#[inline(always)]
fn mul_accum(a: u16, b: i32, c: i32) -> i32 {
    let low = (((b & 0xFFFF) as u32).wrapping_mul(a as u32) >> 16) as i32;
    c.wrapping_add((b >> 16).wrapping_mul(a as i32))
        .wrapping_add(low)
}

#[inline(always)]
fn round_14(diff: i32) -> i32 {
    diff.wrapping_add(1 << 13) >> 14
}

#[inline(always)]
fn truncate_14(diff: i32) -> i32 {
    let diff = diff >> 14;
    if diff < 0 { diff + 1 } else { diff }
}

#[inline(always)]
fn scale_q15(sample: i16) -> i32 {
    ((sample as i32) << 15) + HALF_Q15
}

/// Three first-order allpass sections in series with Q16 coefficients.
///
/// `state` holds the four delay elements of the chain. Returns the chain output.
#[inline(always)]
fn halfband_section(input: i32, coefficients: &[u16; 3], state: &mut [i32]) -> i32 {
    let diff = input.wrapping_sub(state[1]);
    let tmp1 = mul_accum(coefficients[0], diff, state[0]);
    state[0] = input;

    let diff = tmp1.wrapping_sub(state[2]);
    let tmp2 = mul_accum(coefficients[1], diff, state[1]);
    state[1] = tmp1;

    let diff = tmp2.wrapping_sub(state[3]);
    state[3] = mul_accum(coefficients[2], diff, state[2]);
    state[2] = tmp2;

    state[3]
}

/// Three first-order allpass sections in series with Q14 coefficients.
///
/// The first difference is rounded, the following two are truncated toward zero.
#[inline(always)]
fn polyphase_section(input: i32, coefficients: &[i32; 3], state: &mut [i32]) -> i32 {
    let diff = round_14(input.wrapping_sub(state[1]));
    let tmp1 = state[0].wrapping_add(diff.wrapping_mul(coefficients[0]));
    state[0] = input;

    let diff = truncate_14(tmp1.wrapping_sub(state[2]));
    let tmp0 = state[1].wrapping_add(diff.wrapping_mul(coefficients[1]));
    state[1] = tmp1;

    let diff = truncate_14(tmp0.wrapping_sub(state[3]));
    state[3] = state[2].wrapping_add(diff.wrapping_mul(coefficients[2]));
    state[2] = tmp0;

    state[3]
}

/// Halves the sample rate with a pair of allpass branches.
///
/// Reads `2 * output.len()` samples of `input`.
pub(crate) fn downsample_by_2(input: &[i16], output: &mut [i16], state: &mut [i32; 8]) {
    let (lower, upper) = state.split_at_mut(4);

    for (pair, out) in input.chunks_exact(2).zip(output.iter_mut()) {
        let even = halfband_section((pair[0] as i32) << 10, &HALFBAND_ALLPASS_2, lower);
        let odd = halfband_section((pair[1] as i32) << 10, &HALFBAND_ALLPASS_1, upper);

        *out = saturate(even.wrapping_add(odd).wrapping_add(1024) >> 11);
    }
}

/// Doubles the sample rate with a pair of allpass branches.
///
/// Writes `2 * input.len()` samples of `output`.
pub(crate) fn upsample_by_2(input: &[i16], output: &mut [i16], state: &mut [i32; 8]) {
    let (lower, upper) = state.split_at_mut(4);

    for (&sample, pair) in input.iter().zip(output.chunks_exact_mut(2)) {
        let sample = (sample as i32) << 10;

        let even = halfband_section(sample, &HALFBAND_ALLPASS_1, lower);
        pair[0] = saturate(even.wrapping_add(512) >> 10);

        let odd = halfband_section(sample, &HALFBAND_ALLPASS_2, upper);
        pair[1] = saturate(odd.wrapping_add(512) >> 10);
    }
}

/// Polyphase lowpass at the input rate, producing unsaturated 32-bit samples.
///
/// `input.len()` must be even; `output` receives the same number of samples.
pub(crate) fn lowpass_by_2_short_to_int(input: &[i16], output: &mut [i32], state: &mut [i32; 16]) {
    let half = input.len() / 2;

    // Odd inputs feed the even outputs, delayed by one sample.
    let mut delayed = state[12];
    for i in 0..half {
        let out = polyphase_section(delayed, &POLYPHASE_ALLPASS[1], &mut state[0..4]);
        output[2 * i] = out >> 1;
        delayed = scale_q15(input[2 * i + 1]);
    }

    for i in 0..half {
        let sample = scale_q15(input[2 * i]);
        let out = polyphase_section(sample, &POLYPHASE_ALLPASS[0], &mut state[4..8]);
        output[2 * i] = output[2 * i].wrapping_add(out >> 1) >> 15;
    }

    for i in 0..half {
        let sample = scale_q15(input[2 * i]);
        let out = polyphase_section(sample, &POLYPHASE_ALLPASS[1], &mut state[8..12]);
        output[2 * i + 1] = out >> 1;
    }

    for i in 0..half {
        let sample = scale_q15(input[2 * i + 1]);
        let out = polyphase_section(sample, &POLYPHASE_ALLPASS[0], &mut state[12..16]);
        output[2 * i + 1] = output[2 * i + 1].wrapping_add(out >> 1) >> 15;
    }
}

/// Decimates Q15 samples by two into saturated 16-bit samples.
///
/// `buffer` is used as scratch and is overwritten. `output` receives `buffer.len() / 2` samples.
pub(crate) fn down_by_2_int_to_short(buffer: &mut [i32], output: &mut [i16], state: &mut [i32; 8]) {
    let half = buffer.len() / 2;

    for i in 0..half {
        let out = polyphase_section(buffer[2 * i], &POLYPHASE_ALLPASS[1], &mut state[0..4]);
        buffer[2 * i] = out >> 1;
    }

    for i in 0..half {
        let out = polyphase_section(buffer[2 * i + 1], &POLYPHASE_ALLPASS[0], &mut state[4..8]);
        buffer[2 * i + 1] = out >> 1;
    }

    for (pair, out) in buffer[..2 * half].chunks_exact(2).zip(output.iter_mut()) {
        *out = saturate(pair[0].wrapping_add(pair[1]) >> 15);
    }
}

/// Doubles the sample rate, producing unsaturated 32-bit samples.
///
/// Writes `2 * input.len()` samples of `output`.
pub(crate) fn upsample_by_2_short_to_int(input: &[i16], output: &mut [i32], state: &mut [i32; 8]) {
    for (i, &sample) in input.iter().enumerate() {
        let out = polyphase_section(scale_q15(sample), &POLYPHASE_ALLPASS[0], &mut state[4..8]);
        output[2 * i] = out >> 15;
    }

    for (i, &sample) in input.iter().enumerate() {
        let out = polyphase_section(scale_q15(sample), &POLYPHASE_ALLPASS[1], &mut state[0..4]);
        output[2 * i + 1] = out >> 15;
    }
}

#[inline(always)]
fn dot<const N: usize>(coefficients: &[i32; N], samples: impl Iterator<Item = i32>) -> i32 {
    coefficients
        .iter()
        .zip(samples)
        .fold(HALF_Q15, |acc, (&c, s)| acc.wrapping_add(c.wrapping_mul(s)))
}

/// Resamples by 2/3 in place.
///
/// Reads `3 * blocks + 5` samples starting at `input_offset` and writes `2 * blocks` samples
/// starting at index zero. Output is Q15.
pub(crate) fn resample_48_to_32(buffer: &mut [i32], input_offset: usize, blocks: usize) {
    for i in 0..blocks {
        let start = input_offset + 3 * i;
        let first = dot(&COEFFICIENTS_48_TO_32[0], buffer[start..start + 8].iter().copied());
        let second = dot(&COEFFICIENTS_48_TO_32[1], buffer[start + 1..start + 9].iter().copied());
        buffer[2 * i] = first;
        buffer[2 * i + 1] = second;
    }
}

/// Computes two mirrored inner products: forward from `forward_start` and backward from
/// `backward_end` (inclusive).
#[inline(always)]
fn mirrored_dot(
    buffer: &[i32],
    forward_start: usize,
    backward_end: usize,
    coefficients: &[i32; 9],
) -> (i32, i32) {
    let forward = dot(coefficients, buffer[forward_start..forward_start + 9].iter().copied());
    let backward = dot(
        coefficients,
        buffer[backward_end - 8..=backward_end].iter().rev().copied(),
    );
    (forward, backward)
}

/// Resamples by 8/11 in place.
///
/// Reads `11 * blocks + 7` samples starting at `input_offset` and writes `8 * blocks` samples
/// starting at index zero. Output is Q15.
pub(crate) fn resample_44_to_32(buffer: &mut [i32], input_offset: usize, blocks: usize) {
    for i in 0..blocks {
        let base = input_offset + 11 * i;
        let mut out = [0i32; 8];

        out[0] = (buffer[base + 3] << 15).wrapping_add(HALF_Q15);
        out[4] = dot(&COEFFICIENTS_44_TO_32[3], buffer[base + 5..base + 14].iter().copied());
        (out[1], out[7]) = mirrored_dot(buffer, base, base + 17, &COEFFICIENTS_44_TO_32[0]);
        (out[2], out[6]) = mirrored_dot(buffer, base + 2, base + 15, &COEFFICIENTS_44_TO_32[1]);
        (out[3], out[5]) = mirrored_dot(buffer, base + 3, base + 14, &COEFFICIENTS_44_TO_32[2]);

        buffer[8 * i..8 * i + 8].copy_from_slice(&out);
    }
}

/// Filter state of the 48 kHz to 16 kHz block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct State48To16 {
    lowpass: [i32; 16],
    fractional: [i32; 8],
    decimator: [i32; 8],
}

/// Filter state of the 22 kHz to 16 kHz block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct State22To16 {
    interpolator: [i32; 8],
    fractional: [i32; 8],
    decimator: [i32; 8],
}

/// Filter state of the 22 kHz to 8 kHz block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct State22To8 {
    lowpass: [i32; 16],
    fractional: [i32; 8],
    decimator: [i32; 8],
}

/// Swaps the fractional stage history into the scratch in front of `new_samples` fresh samples.
#[inline(always)]
fn exchange_history(scratch: &mut [i32], history: &mut [i32; 8], new_samples: usize) {
    scratch[FRACTIONAL_HISTORY..2 * FRACTIONAL_HISTORY].copy_from_slice(history);
    history.copy_from_slice(&scratch[new_samples + FRACTIONAL_HISTORY..new_samples + 16]);
}

pub(crate) const BLOCK_48_TO_16_IN: usize = 480;
pub(crate) const BLOCK_48_TO_16_OUT: usize = 160;

/// Resamples one block of 480 samples at 48 kHz into 160 samples at 16 kHz.
pub(crate) fn resample_48_to_16_block(input: &[i16], output: &mut [i16], state: &mut State48To16) {
    let mut scratch = [0i32; BLOCK_48_TO_16_IN + 16];

    lowpass_by_2_short_to_int(
        &input[..BLOCK_48_TO_16_IN],
        &mut scratch[16..],
        &mut state.lowpass,
    );
    exchange_history(&mut scratch, &mut state.fractional, BLOCK_48_TO_16_IN);
    resample_48_to_32(&mut scratch, FRACTIONAL_HISTORY, BLOCK_48_TO_16_OUT);
    down_by_2_int_to_short(
        &mut scratch[..2 * BLOCK_48_TO_16_OUT],
        &mut output[..BLOCK_48_TO_16_OUT],
        &mut state.decimator,
    );
}

pub(crate) const BLOCK_22_IN: usize = 220;
pub(crate) const BLOCK_22_TO_16_OUT: usize = 160;
pub(crate) const BLOCK_22_TO_8_OUT: usize = 80;

const SUB_BLOCKS_22_TO_16: usize = 5;
const SUB_BLOCKS_22_TO_8: usize = 2;

/// Resamples one block of 220 samples at 22 kHz into 160 samples at 16 kHz.
pub(crate) fn resample_22_to_16_block(input: &[i16], output: &mut [i16], state: &mut State22To16) {
    const SUB_IN: usize = BLOCK_22_IN / SUB_BLOCKS_22_TO_16;
    const SUB_OUT: usize = BLOCK_22_TO_16_OUT / SUB_BLOCKS_22_TO_16;
    let mut scratch = [0i32; 2 * SUB_IN + 16];

    for (chunk, out) in input
        .chunks_exact(SUB_IN)
        .zip(output.chunks_exact_mut(SUB_OUT))
        .take(SUB_BLOCKS_22_TO_16)
    {
        upsample_by_2_short_to_int(chunk, &mut scratch[16..], &mut state.interpolator);
        exchange_history(&mut scratch, &mut state.fractional, 2 * SUB_IN);
        resample_44_to_32(&mut scratch, FRACTIONAL_HISTORY, 2 * SUB_IN / 11);
        down_by_2_int_to_short(&mut scratch[..2 * SUB_OUT], out, &mut state.decimator);
    }
}

/// Resamples one block of 220 samples at 22 kHz into 80 samples at 8 kHz.
pub(crate) fn resample_22_to_8_block(input: &[i16], output: &mut [i16], state: &mut State22To8) {
    const SUB_IN: usize = BLOCK_22_IN / SUB_BLOCKS_22_TO_8;
    const SUB_OUT: usize = BLOCK_22_TO_8_OUT / SUB_BLOCKS_22_TO_8;
    let mut scratch = [0i32; SUB_IN + 16];

    for (chunk, out) in input
        .chunks_exact(SUB_IN)
        .zip(output.chunks_exact_mut(SUB_OUT))
        .take(SUB_BLOCKS_22_TO_8)
    {
        lowpass_by_2_short_to_int(chunk, &mut scratch[16..], &mut state.lowpass);
        exchange_history(&mut scratch, &mut state.fractional, SUB_IN);
        resample_44_to_32(&mut scratch, FRACTIONAL_HISTORY, SUB_IN / 11);
        down_by_2_int_to_short(&mut scratch[..2 * SUB_OUT], out, &mut state.decimator);
    }
}
