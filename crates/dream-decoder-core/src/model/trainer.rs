//! Mini-batch training loop for the autoencoder.
//!
//! Runs a fixed number of passes over the feature matrix; each pass
//! shuffles the row order with the run RNG and steps Adam once per
//! contiguous chunk. There is no early stopping: runtime is deterministic,
//! at the cost of wasted passes when the model converges early.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::error::{DecoderError, DecoderResult};
use crate::features::FeatureMatrix;

use super::autoencoder::Autoencoder;
use super::optimizer::Adam;

/// How often (in epochs) progress is logged.
const LOG_EVERY: usize = 5;

/// Training hyperparameters.
#[derive(Debug, Clone)]
pub struct TrainingParams {
    /// Number of full passes over the dataset.
    pub epochs: usize,
    /// Rows per gradient step (clamped to the dataset size).
    pub batch_size: usize,
    /// Adam learning rate.
    pub learning_rate: f32,
}

/// Loss trace of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Size-weighted mean reconstruction loss per epoch.
    pub epoch_losses: Vec<f32>,
}

impl TrainingReport {
    /// Mean loss of the first epoch.
    #[must_use]
    pub fn first_loss(&self) -> f32 {
        self.epoch_losses.first().copied().unwrap_or(f32::NAN)
    }

    /// Mean loss of the final epoch.
    #[must_use]
    pub fn final_loss(&self) -> f32 {
        self.epoch_losses.last().copied().unwrap_or(f32::NAN)
    }
}

/// Train `model` in place over `features`.
///
/// Shuffling, dropout, and weight init all draw from caller-provided seeded
/// RNGs, so a fixed seed yields a fixed loss trace.
///
/// # Errors
///
/// - [`DecoderError::InsufficientData`] if the feature matrix has no rows.
/// - [`DecoderError::InvalidDimension`] if the feature dimension does not
///   match the model's input dimension.
/// - [`DecoderError::Config`] for zero epochs or batch size.
pub fn train(
    model: &mut Autoencoder,
    features: &FeatureMatrix,
    params: &TrainingParams,
    rng: &mut impl Rng,
) -> DecoderResult<TrainingReport> {
    if features.rows() == 0 {
        return Err(DecoderError::InsufficientData {
            needed: 1,
            actual: 0,
        });
    }
    if features.dim() != model.input_dim() {
        return Err(DecoderError::InvalidDimension {
            expected: model.input_dim(),
            actual: features.dim(),
        });
    }
    if params.epochs == 0 {
        return Err(DecoderError::Config("epochs must be > 0".into()));
    }
    if params.batch_size == 0 {
        return Err(DecoderError::Config("batch_size must be > 0".into()));
    }

    let rows = features.rows();
    let dim = features.dim();
    // Fewer rows than one batch: the whole matrix is a single batch.
    let batch_size = params.batch_size.min(rows);

    let optimizer = Adam::new(params.learning_rate);
    let mut states = model.optimizer_states();
    let mut indices: Vec<usize> = (0..rows).collect();
    let mut epoch_losses = Vec::with_capacity(params.epochs);

    for epoch in 0..params.epochs {
        indices.shuffle(rng);
        let mut epoch_loss = 0.0_f64;

        for chunk in indices.chunks(batch_size) {
            let mut batch = Vec::with_capacity(chunk.len() * dim);
            for &row in chunk {
                batch.extend_from_slice(features.row(row));
            }

            let fwd = model.forward_train(&batch, chunk.len(), rng)?;
            let n = batch.len() as f32;
            let mut loss = 0.0_f32;
            let grad_out: Vec<f32> = fwd
                .reconstruction
                .iter()
                .zip(batch.iter())
                .map(|(r, x)| {
                    let diff = r - x;
                    loss += diff * diff;
                    2.0 * diff / n
                })
                .collect();
            loss /= n;

            let grads = model.backward(&fwd, &grad_out);
            model.apply_gradients(&grads, &optimizer, &mut states)?;

            epoch_loss += f64::from(loss) * chunk.len() as f64;
        }

        let mean_loss = (epoch_loss / rows as f64) as f32;
        if epoch % LOG_EVERY == 0 {
            info!(epoch, loss = mean_loss, "autoencoder training");
        }
        epoch_losses.push(mean_loss);
    }

    Ok(TrainingReport { epoch_losses })
}
