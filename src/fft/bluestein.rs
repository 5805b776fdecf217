use std::f64::consts::PI;

use super::{Complex64, Forward, Inverse, Radix2Fft};

/// DFT of arbitrary length using Bluestein's chirp-z algorithm.
///
/// The transform of length `L` is rewritten as a circular convolution with the chirp
/// `e^(-iπk²/L)`, evaluated with radix-2 FFTs of the next power of two `>= 2L - 1`.
/// The output is not normalized.
pub struct Bluestein {
    len: usize,
    chirp: Vec<Complex64>,
    kernel_spectrum: Vec<Complex64>,
    fft: Radix2Fft<Forward>,
    ifft: Radix2Fft<Inverse>,
    scratch: Vec<Complex64>,
}

impl Bluestein {
    /// Plans a transform of `len` points.
    ///
    /// # Panics
    /// If `len` is zero.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "DFT length must not be zero");

        let padded_len = (2 * len - 1).next_power_of_two();

        // k² grows quickly, reducing it modulo 2L keeps the angle exact.
        let modulus = 2 * len as u128;
        let chirp: Vec<Complex64> = (0..len)
            .map(|k| {
                let k = k as u128;
                let phase = (k * k) % modulus;
                Complex64::from_angle(-PI * phase as f64 / len as f64)
            })
            .collect();

        let fft = Radix2Fft::<Forward>::new(padded_len);
        let ifft = Radix2Fft::<Inverse>::new(padded_len);

        let mut kernel_spectrum = vec![Complex64::zero(); padded_len];
        kernel_spectrum[0] = chirp[0].conj();
        for k in 1..len {
            let value = chirp[k].conj();
            kernel_spectrum[k] = value;
            kernel_spectrum[padded_len - k] = value;
        }
        fft.process(&mut kernel_spectrum);

        Self {
            len,
            chirp,
            kernel_spectrum,
            fft,
            ifft,
            scratch: vec![Complex64::zero(); padded_len],
        }
    }

    /// Length of the transform.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`, zero length plans can't be created.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Computes the forward DFT of `data` in place.
    ///
    /// # Panics
    /// If `data.len()` differs from the planned length.
    pub fn process(&mut self, data: &mut [Complex64]) {
        assert_eq!(data.len(), self.len, "buffer length must match the DFT length");

        self.scratch.fill(Complex64::zero());
        for ((scratch, x), w) in self.scratch.iter_mut().zip(data.iter()).zip(&self.chirp) {
            *scratch = x.mul(w);
        }

        self.fft.process(&mut self.scratch);
        for (x, k) in self.scratch.iter_mut().zip(&self.kernel_spectrum) {
            *x = x.mul(k);
        }
        self.ifft.process(&mut self.scratch);

        for ((x, conv), w) in data.iter_mut().zip(&self.scratch).zip(&self.chirp) {
            *x = conv.mul(w);
        }
    }
}
