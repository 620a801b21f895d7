//! Adam optimizer with explicit, caller-owned moment state.
//!
//! The optimizer itself is a plain value holding hyperparameters; the
//! first/second moment estimates live in [`AdamState`] buffers that the
//! training loop threads through every step. Nothing is global.

/// Adam hyperparameters.
#[derive(Debug, Clone)]
pub struct Adam {
    /// Learning rate.
    pub learning_rate: f32,
    /// Exponential decay for the first moment (default 0.9).
    pub beta1: f32,
    /// Exponential decay for the second moment (default 0.999).
    pub beta2: f32,
    /// Denominator fuzz (default 1e-8).
    pub epsilon: f32,
}

impl Adam {
    /// Standard Adam with the given learning rate.
    #[must_use]
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }

    /// One bias-corrected update of `params` in place.
    ///
    /// `params`, `grads`, and `state` must all describe the same tensor;
    /// the lengths are asserted because a mismatch is an internal logic
    /// error, not a recoverable condition.
    pub fn step(&self, params: &mut [f32], grads: &[f32], state: &mut AdamState) {
        assert_eq!(params.len(), grads.len());
        assert_eq!(params.len(), state.m.len());

        state.t += 1;
        let bias1 = 1.0 - self.beta1.powi(state.t as i32);
        let bias2 = 1.0 - self.beta2.powi(state.t as i32);

        for i in 0..params.len() {
            let g = grads[i];
            state.m[i] = self.beta1 * state.m[i] + (1.0 - self.beta1) * g;
            state.v[i] = self.beta2 * state.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = state.m[i] / bias1;
            let v_hat = state.v[i] / bias2;
            params[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

/// Moment estimates for one parameter tensor.
#[derive(Debug, Clone)]
pub struct AdamState {
    m: Vec<f32>,
    v: Vec<f32>,
    t: u32,
}

impl AdamState {
    /// Zeroed state for a tensor of `len` parameters.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            m: vec![0.0; len],
            v: vec![0.0; len],
            t: 0,
        }
    }

    /// Number of update steps taken so far.
    #[inline]
    #[must_use]
    pub fn steps(&self) -> u32 {
        self.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_against_gradient_by_roughly_lr() {
        // With bias correction, the very first Adam step has magnitude
        // close to the learning rate for any non-zero gradient.
        let adam = Adam::new(0.01);
        let mut params = vec![1.0_f32];
        let mut state = AdamState::new(1);
        adam.step(&mut params, &[0.5], &mut state);
        assert!(params[0] < 1.0);
        assert!((1.0 - params[0] - 0.01).abs() < 1e-4);
    }

    #[test]
    fn repeated_steps_descend_a_quadratic() {
        // Minimize f(w) = (w - 3)^2 from w = 0.
        let adam = Adam::new(0.1);
        let mut w = vec![0.0_f32];
        let mut state = AdamState::new(1);
        for _ in 0..500 {
            let grad = 2.0 * (w[0] - 3.0);
            adam.step(&mut w, &[grad], &mut state);
        }
        assert!((w[0] - 3.0).abs() < 0.1, "converged to {}", w[0]);
    }

    #[test]
    fn step_counter_advances() {
        let adam = Adam::new(0.01);
        let mut params = vec![0.0_f32; 3];
        let mut state = AdamState::new(3);
        adam.step(&mut params, &[0.1, 0.2, 0.3], &mut state);
        adam.step(&mut params, &[0.1, 0.2, 0.3], &mut state);
        assert_eq!(state.steps(), 2);
    }
}
