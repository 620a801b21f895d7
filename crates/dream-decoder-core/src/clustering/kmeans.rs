//! Lloyd's k-means over flat latent vectors.
//!
//! Initialization is deterministic: the first point seeds the first
//! centroid, then each further centroid is the point with the maximum
//! minimum distance to those already chosen. Given the same input, the
//! fit is fully reproducible.

use tracing::debug;

/// Iteration cap for the Lloyd loop.
const MAX_ITERATIONS: usize = 100;

/// Fitted k-means model: centroids plus a nearest-centroid predictor.
#[derive(Debug, Clone)]
pub struct KMeansModel {
    /// Centroids, row-major `[k, dim]`.
    centroids: Vec<f32>,
    k: usize,
    dim: usize,
}

impl KMeansModel {
    /// Fit `k` clusters over `count` points of dimension `dim` and return
    /// the model plus per-point assignments.
    ///
    /// Callers guarantee `1 <= k <= count` and
    /// `points.len() == count * dim`; [`crate::clustering::cluster_latents`]
    /// enforces this.
    #[must_use]
    pub fn fit(points: &[f32], count: usize, dim: usize, k: usize) -> (Self, Vec<usize>) {
        let mut centroids = init_centroids(points, count, dim, k);
        let mut assignments = vec![0_usize; count];

        for iteration in 0..MAX_ITERATIONS {
            // Assignment step
            let mut changed = false;
            for (i, assignment) in assignments.iter_mut().enumerate() {
                let point = &points[i * dim..(i + 1) * dim];
                let nearest = nearest_centroid(point, &centroids, dim);
                if nearest != *assignment {
                    changed = true;
                    *assignment = nearest;
                }
            }

            if !changed && iteration > 0 {
                debug!(iteration, "k-means converged");
                break;
            }

            // Update step: recompute centroids, keeping the previous
            // centroid for any cluster that lost all members.
            let mut sums = vec![0.0_f32; k * dim];
            let mut counts = vec![0_usize; k];
            for (i, &assignment) in assignments.iter().enumerate() {
                counts[assignment] += 1;
                let point = &points[i * dim..(i + 1) * dim];
                let sum = &mut sums[assignment * dim..(assignment + 1) * dim];
                for (s, p) in sum.iter_mut().zip(point.iter()) {
                    *s += p;
                }
            }
            for cluster in 0..k {
                if counts[cluster] == 0 {
                    continue;
                }
                let inv = 1.0 / counts[cluster] as f32;
                for d in 0..dim {
                    centroids[cluster * dim + d] = sums[cluster * dim + d] * inv;
                }
            }
        }

        (
            Self {
                centroids,
                k,
                dim,
            },
            assignments,
        )
    }

    /// Number of clusters.
    #[inline]
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Assign a new point to its nearest centroid.
    #[must_use]
    pub fn predict(&self, point: &[f32]) -> usize {
        nearest_centroid(point, &self.centroids, self.dim)
    }

    /// Borrow the centroid matrix, row-major `[k, dim]`.
    #[must_use]
    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

fn nearest_centroid(point: &[f32], centroids: &[f32], dim: usize) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (idx, centroid) in centroids.chunks(dim).enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

/// Farthest-point initialization: first point, then repeatedly the point
/// with the maximum minimum distance to the chosen centroids.
fn init_centroids(points: &[f32], count: usize, dim: usize, k: usize) -> Vec<f32> {
    let mut centroids = Vec::with_capacity(k * dim);
    centroids.extend_from_slice(&points[0..dim]);

    for _ in 1..k {
        let mut best_idx = 0;
        let mut max_min_dist = -1.0_f32;
        for i in 0..count {
            let point = &points[i * dim..(i + 1) * dim];
            let min_dist = centroids
                .chunks(dim)
                .map(|c| squared_distance(point, c))
                .fold(f32::INFINITY, f32::min);
            if min_dist > max_min_dist {
                max_min_dist = min_dist;
                best_idx = i;
            }
        }
        let chosen = &points[best_idx * dim..(best_idx + 1) * dim];
        centroids.extend_from_slice(chosen);
    }

    centroids
}
