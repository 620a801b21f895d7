//! Band-power feature extraction from raw EEG epochs.
//!
//! One epoch (channels × samples) becomes one fixed-length feature vector:
//! for every configured frequency band, each channel is band-pass filtered
//! with zero phase and its mean squared amplitude recorded. The vector is
//! laid out band-major (band outer loop, channel inner loop), identically
//! for every epoch in a run.

use tracing::debug;

use crate::config::BandEdges;
use crate::error::{DecoderError, DecoderResult};

use super::filter::BandpassFilter;

/// One fixed-duration window of multi-channel raw signal samples.
///
/// Data is stored row-major: channel 0's samples first, then channel 1's,
/// and so on. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Epoch {
    channels: usize,
    samples_per_channel: usize,
    data: Vec<f32>,
}

impl Epoch {
    /// Create an epoch from row-major channel data.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidEpoch`] if either dimension is zero,
    /// the buffer length does not equal `channels * samples_per_channel`,
    /// or any sample is non-finite.
    pub fn new(channels: usize, samples_per_channel: usize, data: Vec<f32>) -> DecoderResult<Self> {
        if channels == 0 || samples_per_channel == 0 {
            return Err(DecoderError::InvalidEpoch {
                reason: format!(
                    "epoch shape must be non-empty, got {channels} x {samples_per_channel}"
                ),
            });
        }
        let expected = channels * samples_per_channel;
        if data.len() != expected {
            return Err(DecoderError::InvalidEpoch {
                reason: format!(
                    "expected {expected} samples for {channels} x {samples_per_channel}, got {}",
                    data.len()
                ),
            });
        }
        if let Some(idx) = data.iter().position(|v| !v.is_finite()) {
            return Err(DecoderError::InvalidEpoch {
                reason: format!("non-finite sample at index {idx}"),
            });
        }
        Ok(Self {
            channels,
            samples_per_channel,
            data,
        })
    }

    /// Number of channels.
    #[inline]
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Samples per channel.
    #[inline]
    #[must_use]
    pub fn samples_per_channel(&self) -> usize {
        self.samples_per_channel
    }

    /// Borrow one channel's samples.
    #[must_use]
    pub fn channel(&self, index: usize) -> &[f32] {
        let start = index * self.samples_per_channel;
        &self.data[start..start + self.samples_per_channel]
    }
}

/// Row-major stack of feature vectors, one row per epoch.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Create an empty matrix for vectors of length `dim`.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            rows: 0,
            dim,
            data: Vec::new(),
        }
    }

    /// Append one feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidDimension`] if the row length does
    /// not match the matrix dimension.
    pub fn push_row(&mut self, row: &[f32]) -> DecoderResult<()> {
        if row.len() != self.dim {
            return Err(DecoderError::InvalidDimension {
                expected: self.dim,
                actual: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    /// Number of rows (epochs).
    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Feature dimension.
    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Borrow one row.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dim;
        &self.data[start..start + self.dim]
    }

    /// Borrow the whole row-major buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Per-run feature extractor: filters are designed once and reused for
/// every epoch of the file pair.
#[derive(Debug)]
pub struct BandPowerExtractor {
    filters: Vec<(String, BandpassFilter)>,
    channel_count: usize,
}

impl BandPowerExtractor {
    /// Design one band-pass filter per configured band.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::Config`] if a band cannot be realized at
    /// the given sampling rate (e.g. an edge at or above Nyquist).
    pub fn new(
        bands: &[BandEdges],
        filter_order: usize,
        channel_count: usize,
        sampling_rate_hz: f32,
    ) -> DecoderResult<Self> {
        if channel_count == 0 {
            return Err(DecoderError::Config("channel_count must be > 0".into()));
        }
        let mut filters = Vec::with_capacity(bands.len());
        for band in bands {
            let filter = BandpassFilter::design(
                filter_order,
                f64::from(band.low_hz),
                f64::from(band.high_hz),
                f64::from(sampling_rate_hz),
            )?;
            filters.push((band.name.clone(), filter));
        }
        Ok(Self {
            filters,
            channel_count,
        })
    }

    /// Feature-vector length produced per epoch.
    #[inline]
    #[must_use]
    pub fn feature_dim(&self) -> usize {
        self.filters.len() * self.channel_count
    }

    /// Extract one feature vector from one epoch.
    ///
    /// Layout: band outer loop, channel inner loop. Every output value is
    /// a mean squared amplitude, therefore finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidEpoch`] if the epoch's channel count
    /// does not match the extractor.
    pub fn extract(&self, epoch: &Epoch) -> DecoderResult<Vec<f32>> {
        if epoch.channels() != self.channel_count {
            return Err(DecoderError::InvalidEpoch {
                reason: format!(
                    "expected {} channels, got {}",
                    self.channel_count,
                    epoch.channels()
                ),
            });
        }

        let mut features = Vec::with_capacity(self.feature_dim());
        for (name, filter) in &self.filters {
            for channel in 0..self.channel_count {
                let signal: Vec<f64> = epoch
                    .channel(channel)
                    .iter()
                    .map(|&v| f64::from(v))
                    .collect();
                let filtered = filter.apply_zero_phase(&signal)?;
                let power =
                    filtered.iter().map(|x| x * x).sum::<f64>() / filtered.len() as f64;
                debug!(band = %name, channel, power, "band power");
                features.push(power as f32);
            }
        }
        Ok(features)
    }

    /// Extract features for every epoch into a [`FeatureMatrix`].
    ///
    /// # Errors
    ///
    /// Propagates the first per-epoch extraction failure.
    pub fn extract_all(&self, epochs: &[Epoch]) -> DecoderResult<FeatureMatrix> {
        let mut matrix = FeatureMatrix::new(self.feature_dim());
        for epoch in epochs {
            let row = self.extract(epoch)?;
            matrix.push_row(&row)?;
        }
        Ok(matrix)
    }
}
