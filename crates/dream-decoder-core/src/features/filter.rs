//! Butterworth band-pass design and zero-phase filtering.
//!
//! The design path follows the classic IIR recipe: analog Butterworth
//! low-pass prototype, low-pass→band-pass transform at the prewarped band
//! edges, bilinear transform to the digital plane, then pole/zero to
//! transfer-function expansion. All design math runs in `f64` with
//! [`num_complex::Complex64`]; the conjugate-symmetric products collapse to
//! real coefficients at the end.
//!
//! Application is forward-backward (`filtfilt` style): one pass in each
//! direction cancels phase distortion, with odd-reflection padding at both
//! ends to suppress startup transients.

use num_complex::Complex64;

use crate::error::{DecoderError, DecoderResult};

/// A designed digital band-pass filter as transfer-function coefficients.
///
/// `b` and `a` both have length `2 * order + 1`; `a` is normalized so that
/// `a[0] == 1`.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    b: Vec<f64>,
    a: Vec<f64>,
}

impl BandpassFilter {
    /// Design an order-`order` Butterworth band-pass filter.
    ///
    /// Cutoffs are given in Hz and normalized internally to the Nyquist
    /// frequency (`sampling_rate_hz / 2`).
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::Config`] if `order == 0`, the sampling rate
    /// is not positive, or the cutoffs do not satisfy
    /// `0 < low < high < nyquist`.
    pub fn design(
        order: usize,
        low_hz: f64,
        high_hz: f64,
        sampling_rate_hz: f64,
    ) -> DecoderResult<Self> {
        if order == 0 {
            return Err(DecoderError::Config("filter order must be > 0".into()));
        }
        if !(sampling_rate_hz > 0.0 && sampling_rate_hz.is_finite()) {
            return Err(DecoderError::Config(format!(
                "sampling rate must be positive and finite, got {sampling_rate_hz}"
            )));
        }
        let nyquist = sampling_rate_hz / 2.0;
        if !(low_hz > 0.0 && high_hz > low_hz && high_hz < nyquist) {
            return Err(DecoderError::Config(format!(
                "band edges must satisfy 0 < {low_hz} < {high_hz} < nyquist ({nyquist})"
            )));
        }

        // Normalized cutoffs in (0, 1), then prewarped analog frequencies.
        // The bilinear transform below uses fs = 2, so the warp is
        // 2 * fs * tan(pi * wn / fs).
        let fs = 2.0_f64;
        let warped_low = 2.0 * fs * (std::f64::consts::PI * (low_hz / nyquist) / fs).tan();
        let warped_high = 2.0 * fs * (std::f64::consts::PI * (high_hz / nyquist) / fs).tan();
        let bw = warped_high - warped_low;
        let wo = (warped_low * warped_high).sqrt();

        // Analog Butterworth low-pass prototype: unit-circle poles in the
        // left half plane, no zeros, unit gain.
        let proto_poles: Vec<Complex64> = (0..order)
            .map(|k| {
                let theta = std::f64::consts::PI * (2 * k + 1) as f64 / (2 * order) as f64
                    + std::f64::consts::FRAC_PI_2;
                Complex64::from_polar(1.0, theta)
            })
            .collect();

        // Low-pass → band-pass: each pole splits into a conjugate pair
        // around the center frequency; zeros appear at the origin.
        let mut poles = Vec::with_capacity(2 * order);
        for &p in &proto_poles {
            let scaled = p * (bw / 2.0);
            let disc = (scaled * scaled - Complex64::new(wo * wo, 0.0)).sqrt();
            poles.push(scaled + disc);
            poles.push(scaled - disc);
        }
        let zeros = vec![Complex64::new(0.0, 0.0); order];
        let mut gain = bw.powi(order as i32);

        // Bilinear transform to the z-plane.
        let fs2 = 2.0 * fs;
        let digital_poles: Vec<Complex64> = poles
            .iter()
            .map(|&p| (Complex64::new(fs2, 0.0) + p) / (Complex64::new(fs2, 0.0) - p))
            .collect();
        let mut digital_zeros: Vec<Complex64> = zeros
            .iter()
            .map(|&z| (Complex64::new(fs2, 0.0) + z) / (Complex64::new(fs2, 0.0) - z))
            .collect();
        // Analog zeros at infinity map to z = -1.
        digital_zeros.resize(digital_poles.len(), Complex64::new(-1.0, 0.0));

        let num: Complex64 = zeros
            .iter()
            .map(|&z| Complex64::new(fs2, 0.0) - z)
            .product();
        let den: Complex64 = poles
            .iter()
            .map(|&p| Complex64::new(fs2, 0.0) - p)
            .product();
        gain *= (num / den).re;

        // Expand pole/zero sets into polynomial coefficients.
        let b: Vec<f64> = poly_from_roots(&digital_zeros)
            .iter()
            .map(|c| c.re * gain)
            .collect();
        let a: Vec<f64> = poly_from_roots(&digital_poles).iter().map(|c| c.re).collect();

        Ok(Self { b, a })
    }

    /// Numerator coefficients.
    #[must_use]
    pub fn numerator(&self) -> &[f64] {
        &self.b
    }

    /// Denominator coefficients (`a[0] == 1`).
    #[must_use]
    pub fn denominator(&self) -> &[f64] {
        &self.a
    }

    /// Single forward pass (direct form II transposed), zero initial state.
    fn filter_forward(&self, signal: &[f64]) -> Vec<f64> {
        let n = self.b.len();
        let mut state = vec![0.0_f64; n - 1];
        let mut out = Vec::with_capacity(signal.len());
        for &x in signal {
            let y = self.b[0] * x + state[0];
            for i in 0..n - 2 {
                state[i] = self.b[i + 1] * x + state[i + 1] - self.a[i + 1] * y;
            }
            state[n - 2] = self.b[n - 1] * x - self.a[n - 1] * y;
            out.push(y);
        }
        out
    }

    /// Zero-phase filtering: forward pass, reverse, forward pass, reverse.
    ///
    /// The input is extended at both ends with an odd reflection of up to
    /// `3 * (len(b) - 1)` samples so the filter state settles before the
    /// real data begins.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidEpoch`] for an empty signal.
    pub fn apply_zero_phase(&self, signal: &[f64]) -> DecoderResult<Vec<f64>> {
        if signal.is_empty() {
            return Err(DecoderError::InvalidEpoch {
                reason: "cannot filter an empty signal".into(),
            });
        }

        let pad = (3 * (self.b.len() - 1)).min(signal.len() - 1);
        let mut extended = Vec::with_capacity(signal.len() + 2 * pad);
        let first = signal[0];
        let last = signal[signal.len() - 1];
        for i in (1..=pad).rev() {
            extended.push(2.0 * first - signal[i]);
        }
        extended.extend_from_slice(signal);
        for i in (signal.len() - 1 - pad..signal.len() - 1).rev() {
            extended.push(2.0 * last - signal[i]);
        }

        let mut filtered = self.filter_forward(&extended);
        filtered.reverse();
        let mut filtered = self.filter_forward(&filtered);
        filtered.reverse();

        Ok(filtered[pad..pad + signal.len()].to_vec())
    }
}

/// Expand `prod (x - r_i)` into monomial coefficients, highest order first.
fn poly_from_roots(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &r in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * r;
        }
        coeffs = next;
    }
    coeffs
}
