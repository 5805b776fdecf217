use std::{f64::consts::PI, marker::PhantomData};

use super::Complex64;

/// Marker type for forward FFT direction.
pub struct Forward;

/// Marker type for inverse FFT direction.
pub struct Inverse;

/// In-place radix-2 FFT using the Cooley-Tukey DIT algorithm.
///
/// Generic over direction type (`Forward` or `Inverse`).
///
/// Each stage starts its twiddle factor at one and rotates it by the stage root after every
/// butterfly column, so no sine or cosine is evaluated per butterfly.
///
/// # Normalization
///
/// The forward transform is not scaled. The inverse transform divides by the length, so a
/// forward+inverse round-trip returns the input.
pub struct Radix2Fft<D> {
    len: usize,
    _direction: PhantomData<D>,
}

impl<D> Radix2Fft<D> {
    /// Constructs a new [`Radix2Fft`] instance.
    ///
    /// # Panics
    /// If `len` is not a power of two.
    pub fn new(len: usize) -> Self {
        assert!(len.is_power_of_two(), "FFT length {len} is not a power of two");

        Self {
            len,
            _direction: PhantomData,
        }
    }

    /// Length of the transform.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`, the smallest transform has one point.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn forward(&self, data: &mut [Complex64]) {
        assert_eq!(data.len(), self.len, "buffer length must match the FFT length");

        let n = data.len();
        if n < 2 {
            return;
        }

        bit_reverse(data);

        let mut half_stage = 1;
        while half_stage < n {
            let stage_size = half_stage * 2;
            let root = Complex64::from_angle(-PI / half_stage as f64);
            let mut twiddle = Complex64::new(1.0, 0.0);

            for j in 0..half_stage {
                for group_start in (0..n).step_by(stage_size) {
                    let a = group_start + j;
                    let b = a + half_stage;
                    let t = data[b].mul(&twiddle);
                    data[b] = data[a].sub(&t);
                    data[a] = data[a].add(&t);
                }
                twiddle = twiddle.mul(&root);
            }

            half_stage = stage_size;
        }
    }
}

impl Radix2Fft<Forward> {
    /// Computes the unnormalized DFT of `data` in place.
    pub fn process(&self, data: &mut [Complex64]) {
        self.forward(data);
    }
}

impl Radix2Fft<Inverse> {
    /// Computes the inverse DFT of `data` in place, scaled by `1 / len`.
    pub fn process(&self, data: &mut [Complex64]) {
        data.iter_mut().for_each(|x| *x = x.conj());
        self.forward(data);

        let scale = 1.0 / self.len as f64;
        data.iter_mut().for_each(|x| *x = x.conj().scale(scale));
    }
}

/// Bit-reversal permutation. The reversed index is carried along incrementally.
fn bit_reverse(data: &mut [Complex64]) {
    let n = data.len();
    let mut j = 0;

    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;

        if i < j {
            data.swap(i, j);
        }
    }
}
