//! Pipeline configuration.
//!
//! `PipelineConfig` is the single configuration surface consumed by the
//! core: filter band edges, model dimensions, training hyperparameters,
//! and the run seed. Values can come from a TOML file or from defaults
//! that reproduce the reference recording setup.
//!
//! # TOML Structure
//!
//! ```toml
//! filter_order = 4
//! epoch_duration_secs = 30.0
//! channel_count = 2
//! latent_dim = 64
//! cluster_count = 4
//! training_epochs = 150
//! batch_size = 16
//! learning_rate = 1e-4
//! dropout = 0.2
//! seed = 42
//! stage_filter = "Sleep stage R"
//!
//! [[bands]]
//! name = "delta"
//! low_hz = 0.5
//! high_hz = 4.0
//! ```
//!
//! # Design Principles
//!
//! - Invalid config returns an error, never a silently clamped value
//! - File not found or parse error returns immediately

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DecoderError, DecoderResult};

/// One named frequency band for power extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandEdges {
    /// Band name, used only for logging.
    pub name: String,
    /// Lower cutoff in Hz (must be > 0).
    pub low_hz: f32,
    /// Upper cutoff in Hz (must be > low_hz).
    pub high_hz: f32,
}

impl BandEdges {
    pub fn new(name: impl Into<String>, low_hz: f32, high_hz: f32) -> Self {
        Self {
            name: name.into(),
            low_hz,
            high_hz,
        }
    }
}

/// The four standard EEG bands: delta, theta, alpha, beta.
fn default_bands() -> Vec<BandEdges> {
    vec![
        BandEdges::new("delta", 0.5, 4.0),
        BandEdges::new("theta", 4.0, 8.0),
        BandEdges::new("alpha", 8.0, 12.0),
        BandEdges::new("beta", 12.0, 30.0),
    ]
}

fn default_filter_order() -> usize {
    4
}

fn default_epoch_duration_secs() -> f32 {
    30.0
}

fn default_channel_count() -> usize {
    2
}

fn default_latent_dim() -> usize {
    64
}

fn default_cluster_count() -> usize {
    4
}

fn default_training_epochs() -> usize {
    150
}

fn default_batch_size() -> usize {
    16
}

fn default_learning_rate() -> f32 {
    1e-4
}

fn default_dropout() -> f32 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_stage_filter() -> String {
    "Sleep stage R".to_string()
}

/// Top-level configuration for a pipeline run.
///
/// All numeric parameters are validated as positive where applicable;
/// the pipeline fails fast with [`DecoderError::Config`] rather than
/// clamping out-of-range values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Frequency bands for power extraction, in extraction order.
    #[serde(default = "default_bands")]
    pub bands: Vec<BandEdges>,

    /// Butterworth filter order for the per-band band-pass.
    #[serde(default = "default_filter_order")]
    pub filter_order: usize,

    /// Epoch duration in seconds, forwarded to the epoch source.
    #[serde(default = "default_epoch_duration_secs")]
    pub epoch_duration_secs: f32,

    /// Expected number of EEG channels per epoch.
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,

    /// Bottleneck dimension of the autoencoder.
    #[serde(default = "default_latent_dim")]
    pub latent_dim: usize,

    /// Target number of latent clusters (shrunk to the epoch count when
    /// fewer epochs than clusters exist).
    #[serde(default = "default_cluster_count")]
    pub cluster_count: usize,

    /// Fixed number of training passes over the feature matrix.
    #[serde(default = "default_training_epochs")]
    pub training_epochs: usize,

    /// Mini-batch size for autoencoder training.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Adam learning rate.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Dropout probability after the first layer of each stack.
    #[serde(default = "default_dropout")]
    pub dropout: f32,

    /// Seed for every random stream in the run (weight init, shuffling,
    /// dropout masks, clustering).
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Sleep-stage annotation label forwarded to the epoch source.
    #[serde(default = "default_stage_filter")]
    pub stage_filter: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bands: default_bands(),
            filter_order: default_filter_order(),
            epoch_duration_secs: default_epoch_duration_secs(),
            channel_count: default_channel_count(),
            latent_dim: default_latent_dim(),
            cluster_count: default_cluster_count(),
            training_epochs: default_training_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            dropout: default_dropout(),
            seed: default_seed(),
            stage_filter: default_stage_filter(),
        }
    }
}

impl PipelineConfig {
    /// Feature-vector length produced by extraction: channels × bands.
    #[inline]
    #[must_use]
    pub fn feature_dim(&self) -> usize {
        self.channel_count * self.bands.len()
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::Io`] if the file cannot be read and
    /// [`DecoderError::Config`] if parsing or validation fails.
    pub fn from_file(path: impl AsRef<Path>) -> DecoderResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::Config`] on parse or validation failure.
    pub fn from_toml_str(toml: &str) -> DecoderResult<Self> {
        let config: Self = toml::from_str(toml)
            .map_err(|e| DecoderError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::Config`] naming the offending field.
    pub fn validate(&self) -> DecoderResult<()> {
        if self.bands.is_empty() {
            return Err(DecoderError::Config("bands must not be empty".into()));
        }
        for band in &self.bands {
            if band.low_hz <= 0.0 {
                return Err(DecoderError::Config(format!(
                    "band '{}': low_hz must be > 0, got {}",
                    band.name, band.low_hz
                )));
            }
            if band.high_hz <= band.low_hz {
                return Err(DecoderError::Config(format!(
                    "band '{}': high_hz ({}) must exceed low_hz ({})",
                    band.name, band.high_hz, band.low_hz
                )));
            }
        }
        if self.filter_order == 0 {
            return Err(DecoderError::Config("filter_order must be > 0".into()));
        }
        if self.epoch_duration_secs <= 0.0 {
            return Err(DecoderError::Config(format!(
                "epoch_duration_secs must be > 0, got {}",
                self.epoch_duration_secs
            )));
        }
        if self.channel_count == 0 {
            return Err(DecoderError::Config("channel_count must be > 0".into()));
        }
        if self.latent_dim == 0 {
            return Err(DecoderError::Config("latent_dim must be > 0".into()));
        }
        if self.cluster_count == 0 {
            return Err(DecoderError::Config("cluster_count must be > 0".into()));
        }
        if self.training_epochs == 0 {
            return Err(DecoderError::Config("training_epochs must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(DecoderError::Config("batch_size must be > 0".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(DecoderError::Config(format!(
                "learning_rate must be a positive finite value, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(DecoderError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}
