//! Dense (fully connected) layer over flat row-major batches.
//!
//! Weights are stored row-major as `[out_features, in_features]`, inputs
//! and outputs as `[batch_size * features]`. The backward pass returns
//! explicit gradient buffers; no layer holds optimizer state.

use rand::Rng;

use crate::error::{DecoderError, DecoderResult};

/// Gradients for one dense layer, same shapes as the parameters.
#[derive(Debug, Clone)]
pub struct DenseGradient {
    /// Gradient w.r.t. the weight matrix, row-major `[out, in]`.
    pub d_weights: Vec<f32>,
    /// Gradient w.r.t. the bias vector, `[out]`.
    pub d_bias: Vec<f32>,
}

/// Fully connected layer: `y = x @ W^T + b`.
#[derive(Debug, Clone)]
pub struct Dense {
    /// Weight matrix (row-major): [out_features, in_features]
    weights: Vec<f32>,
    /// Bias vector: [out_features]
    bias: Vec<f32>,
    in_features: usize,
    out_features: usize,
}

impl Dense {
    /// Create a layer with Xavier-uniform weights from the given RNG and
    /// zero bias.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidDimension`] if either dimension is 0.
    pub fn new(in_features: usize, out_features: usize, rng: &mut impl Rng) -> DecoderResult<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(DecoderError::InvalidDimension {
                expected: 1,
                actual: 0,
            });
        }

        let limit = (6.0 / (in_features + out_features) as f64).sqrt();
        let weights: Vec<f32> = (0..out_features * in_features)
            .map(|_| rng.gen_range(-limit..limit) as f32)
            .collect();

        Ok(Self {
            weights,
            bias: vec![0.0; out_features],
            in_features,
            out_features,
        })
    }

    /// Input dimension.
    #[inline]
    #[must_use]
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Output dimension.
    #[inline]
    #[must_use]
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Forward pass for a batch.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidDimension`] if the input length does
    /// not equal `batch_size * in_features`.
    pub fn forward(&self, input: &[f32], batch_size: usize) -> DecoderResult<Vec<f32>> {
        let expected = batch_size * self.in_features;
        if input.len() != expected {
            return Err(DecoderError::InvalidDimension {
                expected,
                actual: input.len(),
            });
        }

        let mut output = vec![0.0_f32; batch_size * self.out_features];
        for b in 0..batch_size {
            let x = &input[b * self.in_features..(b + 1) * self.in_features];
            let out_row = &mut output[b * self.out_features..(b + 1) * self.out_features];
            for (o, out_val) in out_row.iter_mut().enumerate() {
                let w_row = &self.weights[o * self.in_features..(o + 1) * self.in_features];
                let mut acc = self.bias[o];
                for (w, xi) in w_row.iter().zip(x.iter()) {
                    acc += w * xi;
                }
                *out_val = acc;
            }
        }
        Ok(output)
    }

    /// Backward pass: given the forward input and the gradient of the loss
    /// w.r.t. this layer's output, produce parameter gradients and the
    /// gradient w.r.t. the input.
    #[must_use]
    pub fn backward(
        &self,
        input: &[f32],
        grad_output: &[f32],
        batch_size: usize,
    ) -> (DenseGradient, Vec<f32>) {
        let mut d_weights = vec![0.0_f32; self.weights.len()];
        let mut d_bias = vec![0.0_f32; self.out_features];
        let mut grad_input = vec![0.0_f32; batch_size * self.in_features];

        for b in 0..batch_size {
            let x = &input[b * self.in_features..(b + 1) * self.in_features];
            let g = &grad_output[b * self.out_features..(b + 1) * self.out_features];
            let gx = &mut grad_input[b * self.in_features..(b + 1) * self.in_features];
            for (o, &go) in g.iter().enumerate() {
                d_bias[o] += go;
                let w_row = &self.weights[o * self.in_features..(o + 1) * self.in_features];
                let dw_row = &mut d_weights[o * self.in_features..(o + 1) * self.in_features];
                for i in 0..self.in_features {
                    dw_row[i] += go * x[i];
                    gx[i] += go * w_row[i];
                }
            }
        }

        (DenseGradient { d_weights, d_bias }, grad_input)
    }

    /// Mutable access to the weight buffer (for optimizer updates).
    pub(crate) fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    /// Mutable access to the bias buffer (for optimizer updates).
    pub(crate) fn bias_mut(&mut self) -> &mut [f32] {
        &mut self.bias
    }

    /// Immutable access to the weight buffer.
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn rejects_zero_dimensions() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(Dense::new(0, 4, &mut rng).is_err());
        assert!(Dense::new(4, 0, &mut rng).is_err());
    }

    #[test]
    fn forward_shape_and_bias() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut layer = Dense::new(3, 2, &mut rng).unwrap();
        layer.weights_mut().copy_from_slice(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        layer.bias_mut().copy_from_slice(&[0.5, -0.5]);

        let out = layer.forward(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2).unwrap();
        assert_eq!(out, vec![1.5, 1.5, 4.5, 4.5]);
    }

    #[test]
    fn forward_rejects_bad_input_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let layer = Dense::new(3, 2, &mut rng).unwrap();
        assert!(layer.forward(&[1.0, 2.0], 1).is_err());
    }

    #[test]
    fn backward_matches_hand_computed_gradients() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut layer = Dense::new(2, 1, &mut rng).unwrap();
        layer.weights_mut().copy_from_slice(&[2.0, -1.0]);
        layer.bias_mut().copy_from_slice(&[0.0]);

        // y = 2*x0 - x1; input (3, 1) -> y = 5; grad_output = 1
        let input = [3.0, 1.0];
        let (grad, grad_input) = layer.backward(&input, &[1.0], 1);
        assert_eq!(grad.d_weights, vec![3.0, 1.0]);
        assert_eq!(grad.d_bias, vec![1.0]);
        assert_eq!(grad_input, vec![2.0, -1.0]);
    }

    #[test]
    fn xavier_init_is_seed_deterministic() {
        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        let a = Dense::new(8, 4, &mut rng_a).unwrap();
        let b = Dense::new(8, 4, &mut rng_b).unwrap();
        assert_eq!(a.weights(), b.weights());
    }
}
