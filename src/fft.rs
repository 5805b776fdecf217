mod bluestein;
mod radix2;

pub use bluestein::Bluestein;
pub use radix2::{Forward, Inverse, Radix2Fft};

/// Simple complex number struct
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Complex64 {
    pub re: f64,
    pub im: f64,
}

impl Complex64 {
    #[inline(always)]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    #[inline(always)]
    pub const fn zero() -> Self {
        Self { re: 0.0, im: 0.0 }
    }

    /// Returns `e^(i * angle)`.
    #[inline(always)]
    pub fn from_angle(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { re: cos, im: sin }
    }

    #[inline(always)]
    pub const fn conj(&self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }

    #[inline(always)]
    pub const fn add(&self, o: &Self) -> Self {
        Self {
            re: self.re + o.re,
            im: self.im + o.im,
        }
    }

    #[inline(always)]
    pub const fn sub(&self, o: &Self) -> Self {
        Self {
            re: self.re - o.re,
            im: self.im - o.im,
        }
    }

    #[inline(always)]
    pub const fn mul(&self, o: &Self) -> Self {
        Self {
            re: self.re * o.re - self.im * o.im,
            im: self.re * o.im + self.im * o.re,
        }
    }

    #[inline(always)]
    pub const fn scale(&self, f: f64) -> Self {
        Self {
            re: self.re * f,
            im: self.im * f,
        }
    }

    #[inline(always)]
    pub fn abs(&self) -> f64 {
        self.re.hypot(self.im)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::f64::consts::PI;

    use super::*;

    /// Textbook O(n²) DFT.
    pub(crate) fn naive_dft(input: &[Complex64]) -> Vec<Complex64> {
        let n = input.len();
        (0..n)
            .map(|k| {
                input
                    .iter()
                    .enumerate()
                    .fold(Complex64::zero(), |acc, (j, x)| {
                        let angle = -2.0 * PI * ((j * k) % n) as f64 / n as f64;
                        acc.add(&x.mul(&Complex64::from_angle(angle)))
                    })
            })
            .collect()
    }

    pub(crate) fn test_signal(len: usize) -> Vec<Complex64> {
        (0..len)
            .map(|i| {
                let t = i as f64;
                Complex64::new((0.3 * t).sin() + 0.25 * (1.7 * t).cos(), (0.11 * t).cos() * 0.5)
            })
            .collect()
    }

    pub(crate) fn assert_spectra_eq(actual: &[Complex64], expected: &[Complex64], desc: &str) {
        assert_eq!(actual.len(), expected.len(), "{desc}: length mismatch");
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!(
                a.sub(e).abs() < 1e-9 * expected.len() as f64,
                "{desc}: bin {i} differs: {a:?} vs {e:?}"
            );
        }
    }

    #[test]
    fn test_complex_arithmetic() {
        let a = Complex64::new(1.0, 2.0);
        let b = Complex64::new(-3.0, 0.5);
        assert_eq!(a.mul(&b), Complex64::new(-4.0, -5.5));
        assert_eq!(a.add(&b), Complex64::new(-2.0, 2.5));
        assert_eq!(a.sub(&b), Complex64::new(4.0, 1.5));
        assert_eq!(a.conj(), Complex64::new(1.0, -2.0));
        assert_eq!(a.scale(2.0), Complex64::new(2.0, 4.0));

        let unit = Complex64::from_angle(PI / 2.0);
        assert!(unit.re.abs() < 1e-15);
        assert!((unit.im - 1.0).abs() < 1e-15);
    }
}
