//! Per-file-pair pipeline orchestration.
//!
//! ```text
//! EpochSource ──> Epochs ──> FeatureMatrix ──> Autoencoder ──> latents
//!                                                               │
//!                                      ClusterOutcome <── cluster_latents
//!                                            │
//!                              prompts/insights per epoch (PairReport)
//! ```
//!
//! Each file pair gets a freshly constructed, freshly trained model and its
//! own clustering; nothing is shared or pooled across pairs. A multi-pair
//! run is strictly sequential, and a failed pair is logged and skipped so
//! later pairs still run.

use serde::Serialize;
use tracing::{error, info};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::clustering::{cluster_latents, ClusterOutcome};
use crate::config::PipelineConfig;
use crate::error::{DecoderError, DecoderResult};
use crate::features::{BandPowerExtractor, Epoch};
use crate::model::{train, Autoencoder, TrainingParams};
use crate::prompts::{assign_prompt, resolve_insight};

/// Epochs for one recording plus the rate they were sampled at.
#[derive(Debug, Clone)]
pub struct EpochSet {
    /// Stage-filtered epochs, each (channels × samples).
    pub epochs: Vec<Epoch>,
    /// Sampling rate of the underlying recording in Hz.
    pub sampling_rate_hz: f32,
}

/// Seam to the external recording/annotation loader.
///
/// Implementations own file formats, stage annotations, and alignment; the
/// core only ever sees epoch matrices and a sampling rate.
pub trait EpochSource {
    /// Load all epochs matching `stage_filter`, each `epoch_duration_secs`
    /// long.
    ///
    /// # Errors
    ///
    /// Implementations report load or alignment failures as
    /// [`DecoderError::Source`].
    fn load_epochs(&self, stage_filter: &str, epoch_duration_secs: f32) -> DecoderResult<EpochSet>;

    /// Human-readable identifier for logging (e.g. the file-pair paths).
    fn describe(&self) -> String {
        "epoch source".to_string()
    }
}

/// Archetype resolution for one epoch.
#[derive(Debug, Clone, Serialize)]
pub struct EpochArchetype {
    /// Index of the epoch within the pair.
    pub epoch_index: usize,
    /// Cluster id in `[0, effective_k)`.
    pub cluster_id: usize,
    /// Resolved prompt string.
    pub prompt: &'static str,
    /// Resolved insight string.
    pub insight: &'static str,
}

/// Everything the pipeline produced for one file pair.
#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    /// Number of epochs processed.
    pub epoch_count: usize,
    /// Feature-vector length (channels × bands).
    pub feature_dim: usize,
    /// Cluster count actually used.
    pub effective_k: usize,
    /// Whether the Gaussian-mixture fallback produced the assignment.
    pub used_fallback: bool,
    /// Mean reconstruction loss of the first training epoch.
    pub first_loss: f32,
    /// Mean reconstruction loss of the final training epoch.
    pub final_loss: f32,
    /// Per-epoch cluster ids.
    pub assignments: Vec<usize>,
    /// Per-epoch archetype prompts.
    pub prompts: Vec<&'static str>,
    /// Per-epoch insights.
    pub insights: Vec<&'static str>,
}

impl PairReport {
    /// Archetype resolution for one epoch, if in range.
    #[must_use]
    pub fn sample(&self, epoch_index: usize) -> Option<EpochArchetype> {
        if epoch_index >= self.epoch_count {
            return None;
        }
        Some(EpochArchetype {
            epoch_index,
            cluster_id: self.assignments[epoch_index],
            prompt: self.prompts[epoch_index],
            insight: self.insights[epoch_index],
        })
    }
}

/// The feature → latent → cluster → label pipeline.
#[derive(Debug, Clone)]
pub struct DreamDecoder {
    config: PipelineConfig,
}

impl DreamDecoder {
    /// Build a decoder after validating its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::Config`] for any invalid parameter.
    pub fn new(config: PipelineConfig) -> DecoderResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Borrow the validated configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one file pair end to end.
    ///
    /// All-or-nothing: no partial results are produced for a failing pair.
    ///
    /// # Errors
    ///
    /// - [`DecoderError::Source`] from the epoch source.
    /// - [`DecoderError::InsufficientData`] for zero epochs (nothing is
    ///   trained in that case).
    /// - [`DecoderError::InvalidEpoch`] / [`DecoderError::Config`] from
    ///   extraction if the epochs do not match the configuration.
    pub fn process_pair(&self, source: &dyn EpochSource) -> DecoderResult<PairReport> {
        let config = &self.config;
        let set = source.load_epochs(&config.stage_filter, config.epoch_duration_secs)?;
        if set.epochs.is_empty() {
            return Err(DecoderError::InsufficientData {
                needed: 1,
                actual: 0,
            });
        }
        info!(
            epochs = set.epochs.len(),
            sampling_rate_hz = set.sampling_rate_hz,
            "loaded stage-filtered epochs"
        );

        let extractor = BandPowerExtractor::new(
            &config.bands,
            config.filter_order,
            config.channel_count,
            set.sampling_rate_hz,
        )?;
        let features = extractor.extract_all(&set.epochs)?;
        info!(
            rows = features.rows(),
            dim = features.dim(),
            "extracted feature matrix"
        );

        // Independent seeded streams: weight init, training (shuffle +
        // dropout), clustering.
        let mut init_rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut train_rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(1));

        let mut model = Autoencoder::new(
            features.dim(),
            config.latent_dim,
            config.dropout,
            &mut init_rng,
        )?;
        let params = TrainingParams {
            epochs: config.training_epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
        };
        let report = train(&mut model, &features, &params, &mut train_rng)?;
        info!(
            first_loss = report.first_loss(),
            final_loss = report.final_loss(),
            "autoencoder trained"
        );

        let latents = model.encode(features.as_slice(), features.rows())?;
        let outcome = cluster_latents(
            &latents,
            features.rows(),
            config.latent_dim,
            config.cluster_count,
            config.seed,
        )?;

        Ok(self.build_report(&features_shape(&features), &report, &outcome))
    }

    /// Process several file pairs strictly in order.
    ///
    /// A failed pair is logged and skipped; its slot in the result keeps
    /// the error so callers can account for it.
    pub fn run<S: EpochSource>(&self, sources: &[S]) -> Vec<DecoderResult<PairReport>> {
        sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                info!(pair = index + 1, source = %source.describe(), "processing file pair");
                let result = self.process_pair(source);
                if let Err(err) = &result {
                    error!(pair = index + 1, %err, "file pair failed; skipping");
                }
                result
            })
            .collect()
    }

    fn build_report(
        &self,
        shape: &(usize, usize),
        training: &crate::model::TrainingReport,
        outcome: &ClusterOutcome,
    ) -> PairReport {
        let assignments = outcome.assignments().to_vec();
        let prompts: Vec<&'static str> = assignments.iter().map(|&id| assign_prompt(id)).collect();
        let insights: Vec<&'static str> = prompts.iter().map(|p| resolve_insight(p)).collect();
        PairReport {
            epoch_count: shape.0,
            feature_dim: shape.1,
            effective_k: outcome.effective_k(),
            used_fallback: outcome.is_fallback(),
            first_loss: training.first_loss(),
            final_loss: training.final_loss(),
            assignments,
            prompts,
            insights,
        }
    }
}

fn features_shape(features: &crate::features::FeatureMatrix) -> (usize, usize) {
    (features.rows(), features.dim())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthesizes epochs with per-epoch dominant tones, no files needed.
    struct SyntheticSource {
        epochs: usize,
        sampling_rate_hz: f32,
    }

    impl EpochSource for SyntheticSource {
        fn load_epochs(
            &self,
            _stage_filter: &str,
            epoch_duration_secs: f32,
        ) -> DecoderResult<EpochSet> {
            let samples = (self.sampling_rate_hz * epoch_duration_secs) as usize;
            let epochs = (0..self.epochs)
                .map(|e| {
                    // Rotate the dominant tone through the four bands.
                    let freq = [2.0_f32, 6.0, 10.0, 20.0][e % 4];
                    let mut data = Vec::with_capacity(2 * samples);
                    for channel in 0..2_usize {
                        let amp = 1.0 + channel as f32;
                        for i in 0..samples {
                            let t = i as f32 / self.sampling_rate_hz;
                            data.push(amp * (2.0 * std::f32::consts::PI * freq * t).sin());
                        }
                    }
                    Epoch::new(2, samples, data)
                })
                .collect::<DecoderResult<Vec<_>>>()?;
            Ok(EpochSet {
                epochs,
                sampling_rate_hz: self.sampling_rate_hz,
            })
        }

        fn describe(&self) -> String {
            format!("synthetic({} epochs)", self.epochs)
        }
    }

    struct EmptySource;

    impl EpochSource for EmptySource {
        fn load_epochs(&self, _: &str, _: f32) -> DecoderResult<EpochSet> {
            Ok(EpochSet {
                epochs: Vec::new(),
                sampling_rate_hz: 100.0,
            })
        }
    }

    struct BrokenSource;

    impl EpochSource for BrokenSource {
        fn load_epochs(&self, _: &str, _: f32) -> DecoderResult<EpochSet> {
            Err(DecoderError::Source("corrupt recording".into()))
        }
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            training_epochs: 8,
            latent_dim: 16,
            epoch_duration_secs: 4.0,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn zero_epochs_aborts_before_training() {
        let decoder = DreamDecoder::new(fast_config()).unwrap();
        assert!(matches!(
            decoder.process_pair(&EmptySource),
            Err(DecoderError::InsufficientData { .. })
        ));
    }

    #[test]
    fn failed_pair_does_not_stop_the_run() {
        let decoder = DreamDecoder::new(fast_config()).unwrap();
        let good = SyntheticSource {
            epochs: 6,
            sampling_rate_hz: 64.0,
        };
        let also_good = SyntheticSource {
            epochs: 5,
            sampling_rate_hz: 64.0,
        };
        // Heterogeneous sources need a common type; box the trait objects.
        let sources: Vec<Box<dyn EpochSource>> =
            vec![Box::new(good), Box::new(BrokenSource), Box::new(also_good)];

        impl EpochSource for Box<dyn EpochSource> {
            fn load_epochs(
                &self,
                stage_filter: &str,
                epoch_duration_secs: f32,
            ) -> DecoderResult<EpochSet> {
                self.as_ref().load_epochs(stage_filter, epoch_duration_secs)
            }

            fn describe(&self) -> String {
                self.as_ref().describe()
            }
        }

        let results = decoder.run(&sources);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(DecoderError::Source(_))));
        assert!(results[2].is_ok());
    }

    #[test]
    fn report_maps_every_epoch_to_a_prompt() {
        let decoder = DreamDecoder::new(fast_config()).unwrap();
        let source = SyntheticSource {
            epochs: 8,
            sampling_rate_hz: 64.0,
        };
        let report = decoder.process_pair(&source).unwrap();
        assert_eq!(report.epoch_count, 8);
        assert_eq!(report.feature_dim, 8);
        assert_eq!(report.prompts.len(), 8);
        assert_eq!(report.insights.len(), 8);
        assert!(report.assignments.iter().all(|&id| id < report.effective_k));

        let sample = report.sample(3).unwrap();
        assert_eq!(sample.prompt, crate::prompts::assign_prompt(sample.cluster_id));
        assert!(report.sample(99).is_none());
    }

    #[test]
    fn report_serializes_to_json() {
        let decoder = DreamDecoder::new(fast_config()).unwrap();
        let source = SyntheticSource {
            epochs: 4,
            sampling_rate_hz: 64.0,
        };
        let report = decoder.process_pair(&source).unwrap();
        let json = serde_json::to_string(&report).expect("report must serialize");
        assert!(json.contains("\"epoch_count\":4"));
        assert!(json.contains("\"assignments\""));
        assert!(json.contains("\"prompts\""));
    }
}
