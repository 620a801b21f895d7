//! Bottleneck autoencoder over band-power feature vectors.
//!
//! Encoder: input → 128 → 64 → latent, ReLU after the first two layers and
//! dropout after the first. Decoder mirrors it back to the input dimension.
//! Dropout only fires in the training-mode forward pass; `encode`, `decode`,
//! and `forward` are inference-mode and deterministic.
//!
//! Weights live in plain [`Dense`] structs; the training-mode forward pass
//! returns an explicit cache and [`Autoencoder::backward`] turns it into
//! per-layer gradients, so the whole parameter/optimizer state is visible
//! to the training loop.

use rand::Rng;

use crate::error::{DecoderError, DecoderResult};

use super::layers::{Dense, DenseGradient};
use super::optimizer::{Adam, AdamState};

/// Width of the first hidden layer on each side of the bottleneck.
const HIDDEN_WIDE: usize = 128;
/// Width of the second hidden layer on each side of the bottleneck.
const HIDDEN_NARROW: usize = 64;
/// Total dense layers: three encoding, three decoding.
const NUM_LAYERS: usize = 6;

/// ReLU after layer i? (final layer of each stack stays linear)
const RELU: [bool; NUM_LAYERS] = [true, true, false, true, true, false];
/// Dropout after layer i? (first layer of each stack only)
const DROPOUT: [bool; NUM_LAYERS] = [true, false, false, true, false, false];
/// Index of the layer whose output is the latent code.
const LATENT_LAYER: usize = 2;

/// Per-layer optimizer state: one [`AdamState`] for weights, one for bias.
#[derive(Debug, Clone)]
pub struct LayerOptState {
    pub weights: AdamState,
    pub bias: AdamState,
}

/// Cache produced by a training-mode forward pass, consumed by backward.
#[derive(Debug)]
pub struct TrainForward {
    /// Input fed to each dense layer (index 0 is the batch itself).
    layer_inputs: Vec<Vec<f32>>,
    /// Raw dense outputs before activation, per layer.
    pre_activations: Vec<Vec<f32>>,
    /// Inverted-dropout masks (scale or zero), for layers with dropout.
    dropout_masks: Vec<Option<Vec<f32>>>,
    /// Final reconstruction, `[batch * input_dim]`.
    pub reconstruction: Vec<f32>,
    /// Latent codes, `[batch * latent_dim]`.
    pub latent: Vec<f32>,
    batch_size: usize,
}

/// Symmetric encoder/decoder pair with a low-dimensional bottleneck.
#[derive(Debug, Clone)]
pub struct Autoencoder {
    layers: Vec<Dense>,
    input_dim: usize,
    latent_dim: usize,
    dropout: f32,
}

impl Autoencoder {
    /// Build an untrained autoencoder with Xavier-initialized weights.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidDimension`] if `input_dim` or
    /// `latent_dim` is zero, and [`DecoderError::Config`] if `dropout` is
    /// outside `[0, 1)`.
    pub fn new(
        input_dim: usize,
        latent_dim: usize,
        dropout: f32,
        rng: &mut impl Rng,
    ) -> DecoderResult<Self> {
        if input_dim == 0 || latent_dim == 0 {
            return Err(DecoderError::InvalidDimension {
                expected: 1,
                actual: 0,
            });
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(DecoderError::Config(format!(
                "dropout must be in [0, 1), got {dropout}"
            )));
        }

        let dims = [
            (input_dim, HIDDEN_WIDE),
            (HIDDEN_WIDE, HIDDEN_NARROW),
            (HIDDEN_NARROW, latent_dim),
            (latent_dim, HIDDEN_NARROW),
            (HIDDEN_NARROW, HIDDEN_WIDE),
            (HIDDEN_WIDE, input_dim),
        ];
        let mut layers = Vec::with_capacity(NUM_LAYERS);
        for (i, o) in dims {
            layers.push(Dense::new(i, o, rng)?);
        }

        Ok(Self {
            layers,
            input_dim,
            latent_dim,
            dropout,
        })
    }

    /// Input (and reconstruction) dimension.
    #[inline]
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Bottleneck dimension.
    #[inline]
    #[must_use]
    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    fn check_batch(&self, len: usize, batch_size: usize, dim: usize) -> DecoderResult<()> {
        let expected = batch_size * dim;
        if batch_size == 0 || len != expected {
            return Err(DecoderError::InvalidDimension {
                expected,
                actual: len,
            });
        }
        Ok(())
    }

    /// Inference-mode pass through layers `[from, to)`, dropout disabled.
    fn run_layers(
        &self,
        input: &[f32],
        batch_size: usize,
        from: usize,
        to: usize,
    ) -> DecoderResult<Vec<f32>> {
        let mut activation = input.to_vec();
        for i in from..to {
            let mut z = self.layers[i].forward(&activation, batch_size)?;
            if RELU[i] {
                for v in &mut z {
                    if *v < 0.0 {
                        *v = 0.0;
                    }
                }
            }
            activation = z;
        }
        Ok(activation)
    }

    /// Compress a batch of feature vectors to latent codes.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidDimension`] on a shape mismatch.
    pub fn encode(&self, input: &[f32], batch_size: usize) -> DecoderResult<Vec<f32>> {
        self.check_batch(input.len(), batch_size, self.input_dim)?;
        self.run_layers(input, batch_size, 0, LATENT_LAYER + 1)
    }

    /// Reconstruct feature vectors from latent codes.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidDimension`] on a shape mismatch.
    pub fn decode(&self, latent: &[f32], batch_size: usize) -> DecoderResult<Vec<f32>> {
        self.check_batch(latent.len(), batch_size, self.latent_dim)?;
        self.run_layers(latent, batch_size, LATENT_LAYER + 1, NUM_LAYERS)
    }

    /// Inference-mode forward pass: `(reconstruction, latent)`.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidDimension`] on a shape mismatch.
    pub fn forward(&self, input: &[f32], batch_size: usize) -> DecoderResult<(Vec<f32>, Vec<f32>)> {
        let latent = self.encode(input, batch_size)?;
        let reconstruction = self.decode(&latent, batch_size)?;
        Ok((reconstruction, latent))
    }

    /// Training-mode forward pass with dropout, caching everything the
    /// backward pass needs.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidDimension`] on a shape mismatch.
    pub fn forward_train(
        &self,
        input: &[f32],
        batch_size: usize,
        rng: &mut impl Rng,
    ) -> DecoderResult<TrainForward> {
        self.check_batch(input.len(), batch_size, self.input_dim)?;

        let keep = 1.0 - self.dropout;
        let mut layer_inputs = Vec::with_capacity(NUM_LAYERS);
        let mut pre_activations = Vec::with_capacity(NUM_LAYERS);
        let mut dropout_masks = Vec::with_capacity(NUM_LAYERS);
        let mut latent = Vec::new();

        let mut activation = input.to_vec();
        for i in 0..NUM_LAYERS {
            layer_inputs.push(activation.clone());
            let z = self.layers[i].forward(&activation, batch_size)?;
            pre_activations.push(z.clone());

            let mut a = z;
            if RELU[i] {
                for v in &mut a {
                    if *v < 0.0 {
                        *v = 0.0;
                    }
                }
            }
            if DROPOUT[i] && self.dropout > 0.0 {
                let mask: Vec<f32> = (0..a.len())
                    .map(|_| {
                        if rng.gen::<f32>() < self.dropout {
                            0.0
                        } else {
                            1.0 / keep
                        }
                    })
                    .collect();
                for (v, m) in a.iter_mut().zip(mask.iter()) {
                    *v *= m;
                }
                dropout_masks.push(Some(mask));
            } else {
                dropout_masks.push(None);
            }

            if i == LATENT_LAYER {
                latent = a.clone();
            }
            activation = a;
        }

        Ok(TrainForward {
            layer_inputs,
            pre_activations,
            dropout_masks,
            reconstruction: activation,
            latent,
            batch_size,
        })
    }

    /// Back-propagate a reconstruction-loss gradient through every layer.
    ///
    /// `grad_output` is the gradient of the loss w.r.t. the reconstruction,
    /// `[batch * input_dim]`. Returns one gradient per layer, encoder
    /// first.
    #[must_use]
    pub fn backward(&self, forward: &TrainForward, grad_output: &[f32]) -> Vec<DenseGradient> {
        let mut grads = Vec::with_capacity(NUM_LAYERS);
        let mut grad = grad_output.to_vec();

        for i in (0..NUM_LAYERS).rev() {
            if let Some(mask) = &forward.dropout_masks[i] {
                for (g, m) in grad.iter_mut().zip(mask.iter()) {
                    *g *= m;
                }
            }
            if RELU[i] {
                for (g, &z) in grad.iter_mut().zip(forward.pre_activations[i].iter()) {
                    if z <= 0.0 {
                        *g = 0.0;
                    }
                }
            }
            let (layer_grad, grad_input) =
                self.layers[i].backward(&forward.layer_inputs[i], &grad, forward.batch_size);
            grads.push(layer_grad);
            grad = grad_input;
        }

        grads.reverse();
        grads
    }

    /// Fresh zeroed optimizer state matching this model's parameters.
    #[must_use]
    pub fn optimizer_states(&self) -> Vec<LayerOptState> {
        self.layers
            .iter()
            .map(|layer| LayerOptState {
                weights: AdamState::new(layer.weights().len()),
                bias: AdamState::new(layer.out_features()),
            })
            .collect()
    }

    /// Apply one optimizer step per layer.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidDimension`] if the gradient or state
    /// count does not match the layer count.
    pub fn apply_gradients(
        &mut self,
        grads: &[DenseGradient],
        optimizer: &Adam,
        states: &mut [LayerOptState],
    ) -> DecoderResult<()> {
        if grads.len() != NUM_LAYERS || states.len() != NUM_LAYERS {
            return Err(DecoderError::InvalidDimension {
                expected: NUM_LAYERS,
                actual: grads.len().min(states.len()),
            });
        }
        for ((layer, grad), state) in self.layers.iter_mut().zip(grads).zip(states.iter_mut()) {
            optimizer.step(layer.weights_mut(), &grad.d_weights, &mut state.weights);
            optimizer.step(layer.bias_mut(), &grad.d_bias, &mut state.bias);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn model(input_dim: usize, latent_dim: usize, dropout: f32) -> Autoencoder {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        Autoencoder::new(input_dim, latent_dim, dropout, &mut rng).unwrap()
    }

    #[test]
    fn rejects_zero_dimensions() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            Autoencoder::new(0, 64, 0.2, &mut rng),
            Err(DecoderError::InvalidDimension { .. })
        ));
        assert!(matches!(
            Autoencoder::new(8, 0, 0.2, &mut rng),
            Err(DecoderError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn round_trip_preserves_shape() {
        let model = model(8, 4, 0.2);
        let input = vec![0.3_f32; 3 * 8];
        let (reconstruction, latent) = model.forward(&input, 3).unwrap();
        assert_eq!(reconstruction.len(), 3 * 8);
        assert_eq!(latent.len(), 3 * 4);
    }

    #[test]
    fn encode_rejects_shape_mismatch() {
        let model = model(8, 4, 0.2);
        assert!(model.encode(&[0.0; 7], 1).is_err());
        assert!(model.encode(&[0.0; 8], 0).is_err());
    }

    #[test]
    fn inference_is_deterministic_despite_dropout_config() {
        let model = model(8, 4, 0.5);
        let input = vec![0.7_f32; 8];
        let a = model.encode(&input, 1).unwrap();
        let b = model.encode(&input, 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn train_forward_latent_matches_cache_shapes() {
        let model = model(8, 4, 0.2);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let input = vec![0.1_f32; 2 * 8];
        let fwd = model.forward_train(&input, 2, &mut rng).unwrap();
        assert_eq!(fwd.reconstruction.len(), 2 * 8);
        assert_eq!(fwd.latent.len(), 2 * 4);
    }

    #[test]
    fn backward_produces_one_gradient_per_layer() {
        let model = model(8, 4, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let input = vec![0.25_f32; 8];
        let fwd = model.forward_train(&input, 1, &mut rng).unwrap();
        let grad_out = vec![1.0_f32; 8];
        let grads = model.backward(&fwd, &grad_out);
        assert_eq!(grads.len(), 6);
        // First encoder layer: input_dim * HIDDEN_WIDE weights.
        assert_eq!(grads[0].d_weights.len(), 8 * 128);
        assert_eq!(grads[5].d_bias.len(), 8);
    }

    #[test]
    fn gradient_step_reduces_reconstruction_error() {
        // Single sample, no dropout: a few Adam steps on the same batch
        // must reduce MSE.
        let mut model = model(8, 4, 0.0);
        let optimizer = Adam::new(1e-3);
        let mut states = model.optimizer_states();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let input = vec![0.5_f32, -0.2, 0.8, 0.1, -0.7, 0.3, 0.0, 0.9];

        let mse = |m: &Autoencoder| {
            let (rec, _) = m.forward(&input, 1).unwrap();
            rec.iter()
                .zip(input.iter())
                .map(|(r, x)| (r - x) * (r - x))
                .sum::<f32>()
                / input.len() as f32
        };

        let before = mse(&model);
        for _ in 0..200 {
            let fwd = model.forward_train(&input, 1, &mut rng).unwrap();
            let n = input.len() as f32;
            let grad_out: Vec<f32> = fwd
                .reconstruction
                .iter()
                .zip(input.iter())
                .map(|(r, x)| 2.0 * (r - x) / n)
                .collect();
            let grads = model.backward(&fwd, &grad_out);
            model.apply_gradients(&grads, &optimizer, &mut states).unwrap();
        }
        let after = mse(&model);
        assert!(after < before, "MSE did not improve: {before} -> {after}");
    }
}
