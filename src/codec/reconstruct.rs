//! Sparse spectrum rebuild and inverse transform
//!
//! Selected bins are copied into an otherwise zero spectrum together with
//! their conjugate images so the result stays Hermitian:
//!
//! ```text
//! F'[k]     = F[k]
//! F'[N - k] = conj(F[k])     for k != 0, k != N/2 (even N)
//! ```
//!
//! A mirror slot that was itself selected keeps its own value. The inverse
//! FFT of a Hermitian spectrum is real up to rounding; the imaginary residue
//! is measured and dropped. The output is peak-normalised to 1.0 unless it
//! is silent, in which case it stays all zero.

use super::analyzer::{nyquist_bin, Spectrum};
use crate::clip::ReconstructedClip;
use crate::error::{CodecError, Stage};
use rustfft::{num_complex::Complex, Fft, FftPlanner, Length};

/// Imaginary peak, relative to the real peak, that means the filtered
/// spectrum lost its Hermitian symmetry
const IMAG_RESIDUAL_WARN: f64 = 1e-6;

/// Build the filtered spectrum for `selected` bins.
pub fn filtered_spectrum(
    spectrum: &Spectrum,
    selected: &[usize],
) -> Result<Vec<Complex<f64>>, CodecError> {
    let n = spectrum.len();
    let bins = spectrum.bins();

    if let Some(&bad) = selected.iter().find(|&&k| k >= n) {
        return Err(CodecError::invalid(
            Stage::Reconstruct,
            format!("selected bin {} is out of range for {} bins", bad, n),
        ));
    }

    let mut explicit = vec![false; n];
    for &k in selected {
        explicit[k] = true;
    }

    let mut filtered = Vec::new();
    filtered.try_reserve_exact(n).map_err(|e| {
        CodecError::compute(
            Stage::Reconstruct,
            format!("cannot allocate filtered spectrum of {} bins: {}", n, e),
        )
    })?;
    filtered.resize(n, Complex::new(0.0, 0.0));

    let nyquist = nyquist_bin(n);
    for &k in selected {
        filtered[k] = bins[k];
        if k == 0 || Some(k) == nyquist {
            continue;
        }
        let mirror = n - k;
        if !explicit[mirror] {
            filtered[mirror] = bins[k].conj();
        }
    }

    Ok(filtered)
}

/// Inverse-transform `spectrum` in place (scaled by 1/N).
///
/// Returns the real part and the peak absolute imaginary component.
pub fn inverse_real(
    ifft: &dyn Fft<f64>,
    mut spectrum: Vec<Complex<f64>>,
) -> Result<(Vec<f64>, f64), CodecError> {
    let n = spectrum.len();
    if ifft.len() != n {
        return Err(CodecError::compute(
            Stage::Reconstruct,
            format!("inverse plan is for {} bins, spectrum has {}", ifft.len(), n),
        ));
    }

    ifft.process(&mut spectrum);

    let scale = 1.0 / n as f64;
    let mut imag_peak = 0.0f64;
    let real: Vec<f64> = spectrum
        .iter()
        .map(|c| {
            imag_peak = imag_peak.max((c.im * scale).abs());
            c.re * scale
        })
        .collect();

    if let Some(idx) = real.iter().position(|s| !s.is_finite()) {
        return Err(CodecError::compute(
            Stage::Reconstruct,
            format!("inverse transform produced a non-finite sample at {}", idx),
        ));
    }

    Ok((real, imag_peak))
}

/// Scale so the peak absolute sample is exactly 1.0; silence stays silent
pub fn normalize(samples: &mut [f64]) {
    let peak = samples.iter().fold(0.0f64, |acc, &s| acc.max(s.abs()));
    if peak > 0.0 {
        for s in samples.iter_mut() {
            *s /= peak;
        }
    }
}

/// Rebuild one level from an existing inverse plan
pub(crate) fn reconstruct_with(
    ifft: &dyn Fft<f64>,
    spectrum: &Spectrum,
    selected: &[usize],
    level: u32,
    sample_rate: u32,
) -> Result<ReconstructedClip, CodecError> {
    let filtered = filtered_spectrum(spectrum, selected)?;
    let (mut samples, imag_peak) = inverse_real(ifft, filtered)?;

    let real_peak = samples.iter().fold(0.0f64, |acc, &s| acc.max(s.abs()));
    if real_peak > 0.0 && imag_peak / real_peak > IMAG_RESIDUAL_WARN {
        log::warn!(
            "Level {}: imaginary residual {:.3e} relative to real peak {:.3e}",
            level,
            imag_peak,
            real_peak
        );
    }

    normalize(&mut samples);

    Ok(ReconstructedClip {
        level,
        samples,
        sample_rate,
    })
}

/// Rebuild a clip of `spectrum.len()` samples from the `selected` bins
pub fn reconstruct(
    spectrum: &Spectrum,
    selected: &[usize],
    level: u32,
    sample_rate: u32,
) -> Result<ReconstructedClip, CodecError> {
    if spectrum.is_empty() {
        return Err(CodecError::invalid(Stage::Reconstruct, "spectrum has no bins"));
    }
    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(spectrum.len());
    reconstruct_with(ifft.as_ref(), spectrum, selected, level, sample_rate)
}
