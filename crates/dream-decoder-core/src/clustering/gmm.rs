//! Diagonal-covariance Gaussian mixture, fitted with EM.
//!
//! This is the fallback clusterer for latent sets where k-means collapses
//! into a single cluster. Means are initialized from distinct sampled
//! points (seeded, with a small jitter so coincident points still receive
//! distinct components), covariances start at the per-dimension data
//! variance, and responsibilities are computed in log space.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// EM iteration cap.
const MAX_ITERATIONS: usize = 100;
/// Convergence tolerance on the mean per-point log-likelihood.
const TOLERANCE: f64 = 1e-4;
/// Variance floor, keeps densities finite for coincident points.
const VARIANCE_FLOOR: f32 = 1e-6;

/// Fitted mixture model.
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    /// Component means, row-major `[k, dim]`.
    means: Vec<f32>,
    /// Per-dimension variances, row-major `[k, dim]`.
    variances: Vec<f32>,
    /// Mixing weights, `[k]`.
    weights: Vec<f32>,
    k: usize,
    dim: usize,
}

impl GaussianMixture {
    /// Fit `k` components over `count` points of dimension `dim` and
    /// return the model plus hard (argmax-responsibility) assignments.
    ///
    /// Deterministic for a fixed seed and input. Callers guarantee
    /// `1 <= k <= count` and `points.len() == count * dim`.
    #[must_use]
    pub fn fit(
        points: &[f32],
        count: usize,
        dim: usize,
        k: usize,
        seed: u64,
    ) -> (Self, Vec<usize>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        // Per-dimension spread, reused for jitter and initial variances.
        let mut mean = vec![0.0_f32; dim];
        for point in points.chunks(dim) {
            for (m, p) in mean.iter_mut().zip(point.iter()) {
                *m += p;
            }
        }
        for m in &mut mean {
            *m /= count as f32;
        }
        let mut variance = vec![0.0_f32; dim];
        for point in points.chunks(dim) {
            for (v, (p, m)) in variance.iter_mut().zip(point.iter().zip(mean.iter())) {
                *v += (p - m) * (p - m);
            }
        }
        for v in &mut variance {
            *v = (*v / count as f32).max(VARIANCE_FLOOR);
        }

        // Means: a seeded first point, then farthest-point spread so the
        // components start well separated, plus a small jitter so
        // coincident points still receive distinct components.
        let first = rng.gen_range(0..count);
        let mut chosen = vec![first];
        while chosen.len() < k {
            let mut best_idx = 0;
            let mut max_min_dist = -1.0_f32;
            for i in 0..count {
                let point = &points[i * dim..(i + 1) * dim];
                let min_dist = chosen
                    .iter()
                    .map(|&c| {
                        let other = &points[c * dim..(c + 1) * dim];
                        point
                            .iter()
                            .zip(other.iter())
                            .map(|(a, b)| (a - b) * (a - b))
                            .sum::<f32>()
                    })
                    .fold(f32::INFINITY, f32::min);
                if min_dist > max_min_dist {
                    max_min_dist = min_dist;
                    best_idx = i;
                }
            }
            chosen.push(best_idx);
        }
        let mut means = Vec::with_capacity(k * dim);
        for &idx in &chosen {
            let point = &points[idx * dim..(idx + 1) * dim];
            for (d, &value) in point.iter().enumerate() {
                let scale = variance[d].sqrt() + 1e-3;
                means.push(value + rng.gen_range(-1e-3..1e-3) * scale);
            }
        }

        let mut model = Self {
            means,
            variances: (0..k).flat_map(|_| variance.iter().copied()).collect(),
            weights: vec![1.0 / k as f32; k],
            k,
            dim,
        };

        let mut responsibilities = vec![0.0_f64; count * k];
        let mut previous_ll = f64::NEG_INFINITY;

        for iteration in 0..MAX_ITERATIONS {
            // E-step
            let mut log_likelihood = 0.0_f64;
            for i in 0..count {
                let point = &points[i * dim..(i + 1) * dim];
                let log_probs: Vec<f64> = (0..k)
                    .map(|c| model.log_component_density(point, c))
                    .collect();
                let max = log_probs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let lse = max + log_probs.iter().map(|lp| (lp - max).exp()).sum::<f64>().ln();
                log_likelihood += lse;
                for c in 0..k {
                    responsibilities[i * k + c] = (log_probs[c] - lse).exp();
                }
            }

            // M-step
            for c in 0..k {
                let total: f64 = (0..count).map(|i| responsibilities[i * k + c]).sum();
                let total = total.max(f64::from(VARIANCE_FLOOR));
                model.weights[c] = (total / count as f64) as f32;

                let mu = &mut model.means[c * dim..(c + 1) * dim];
                mu.iter_mut().for_each(|m| *m = 0.0);
                for i in 0..count {
                    let r = responsibilities[i * k + c];
                    let point = &points[i * dim..(i + 1) * dim];
                    for (m, &p) in mu.iter_mut().zip(point.iter()) {
                        *m += (r * f64::from(p) / total) as f32;
                    }
                }

                let mu: Vec<f32> = model.means[c * dim..(c + 1) * dim].to_vec();
                let var = &mut model.variances[c * dim..(c + 1) * dim];
                var.iter_mut().for_each(|v| *v = 0.0);
                for i in 0..count {
                    let r = responsibilities[i * k + c];
                    let point = &points[i * dim..(i + 1) * dim];
                    for (v, (&p, &m)) in var.iter_mut().zip(point.iter().zip(mu.iter())) {
                        let diff = f64::from(p) - f64::from(m);
                        *v += (r * diff * diff / total) as f32;
                    }
                }
                for v in var.iter_mut() {
                    *v = v.max(VARIANCE_FLOOR);
                }
            }

            let mean_ll = log_likelihood / count as f64;
            if (mean_ll - previous_ll).abs() < TOLERANCE {
                debug!(iteration, mean_log_likelihood = mean_ll, "EM converged");
                break;
            }
            previous_ll = mean_ll;
        }

        let assignments = (0..count)
            .map(|i| {
                let row = &responsibilities[i * k..(i + 1) * k];
                row.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(c, _)| c)
                    .unwrap_or(0)
            })
            .collect();

        (model, assignments)
    }

    /// Number of components.
    #[inline]
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Log of `weight_c * N(point | mean_c, diag(var_c))`.
    fn log_component_density(&self, point: &[f32], component: usize) -> f64 {
        let mu = &self.means[component * self.dim..(component + 1) * self.dim];
        let var = &self.variances[component * self.dim..(component + 1) * self.dim];
        let mut log_density = f64::from(self.weights[component].max(f32::MIN_POSITIVE)).ln();
        for d in 0..self.dim {
            let v = f64::from(var[d]);
            let diff = f64::from(point[d]) - f64::from(mu[d]);
            log_density -=
                0.5 * ((2.0 * std::f64::consts::PI * v).ln() + diff * diff / v);
        }
        log_density
    }

    /// Assign a point to the component with the highest responsibility.
    #[must_use]
    pub fn predict(&self, point: &[f32]) -> usize {
        (0..self.k)
            .map(|c| (c, self.log_component_density(point, c)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c)
            .unwrap_or(0)
    }
}
