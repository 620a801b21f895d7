//! Latent-space clustering with a degenerate-solution fallback.
//!
//! The primary algorithm is k-means. When it collapses every vector into
//! one cluster (a known failure mode on poorly separated data), the set is
//! re-clustered with a Gaussian mixture and that assignment is used
//! instead. The caller sees which path ran through the tagged
//! [`ClusterOutcome`], never through an error.

pub mod gmm;
pub mod kmeans;

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::{DecoderError, DecoderResult};

pub use gmm::GaussianMixture;
pub use kmeans::KMeansModel;

/// Result of clustering one latent set, tagged by the path that produced it.
#[derive(Debug, Clone)]
pub enum ClusterOutcome {
    /// K-means produced a usable partition.
    Primary {
        assignments: Vec<usize>,
        model: KMeansModel,
        effective_k: usize,
    },
    /// K-means collapsed; the Gaussian-mixture fallback was used.
    Fallback {
        assignments: Vec<usize>,
        model: GaussianMixture,
        effective_k: usize,
    },
}

impl ClusterOutcome {
    /// Per-epoch cluster ids, all in `[0, effective_k)`.
    #[must_use]
    pub fn assignments(&self) -> &[usize] {
        match self {
            Self::Primary { assignments, .. } | Self::Fallback { assignments, .. } => assignments,
        }
    }

    /// The cluster count actually used (`min(configured k, n)`).
    #[must_use]
    pub fn effective_k(&self) -> usize {
        match self {
            Self::Primary { effective_k, .. } | Self::Fallback { effective_k, .. } => *effective_k,
        }
    }

    /// Whether the fallback path produced this outcome.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Assign a new latent vector to a cluster.
    ///
    /// The two paths predict differently: `Primary` uses nearest-centroid
    /// lookup, `Fallback` uses argmax mixture responsibility. Both are
    /// deterministic, but they are not interchangeable models and may
    /// disagree near cluster boundaries.
    #[must_use]
    pub fn predict(&self, latent: &[f32]) -> usize {
        match self {
            Self::Primary { model, .. } => model.predict(latent),
            Self::Fallback { model, .. } => model.predict(latent),
        }
    }
}

/// Count observations per cluster id, for logging.
fn distribution(assignments: &[usize]) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for &label in assignments {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Partition `count` latent vectors of dimension `dim` into at most
/// `cluster_count` groups.
///
/// `effective_k = min(cluster_count, count)`; both clustering passes use
/// it. A single vector legitimately forms one cluster and never triggers
/// the fallback.
///
/// # Errors
///
/// - [`DecoderError::InsufficientData`] if `count == 0`.
/// - [`DecoderError::Config`] if `cluster_count == 0`.
/// - [`DecoderError::InvalidDimension`] if the buffer length is not
///   `count * dim`.
pub fn cluster_latents(
    latents: &[f32],
    count: usize,
    dim: usize,
    cluster_count: usize,
    seed: u64,
) -> DecoderResult<ClusterOutcome> {
    if count == 0 {
        return Err(DecoderError::InsufficientData {
            needed: 1,
            actual: 0,
        });
    }
    if cluster_count == 0 {
        return Err(DecoderError::Config("cluster_count must be > 0".into()));
    }
    if latents.len() != count * dim || dim == 0 {
        return Err(DecoderError::InvalidDimension {
            expected: count * dim,
            actual: latents.len(),
        });
    }

    let effective_k = cluster_count.min(count);
    let (kmeans, assignments) = KMeansModel::fit(latents, count, dim, effective_k);
    let counts = distribution(&assignments);
    info!(?counts, effective_k, "k-means cluster distribution");

    if counts.len() == 1 && count > 1 {
        warn!("k-means collapsed into a single cluster; falling back to Gaussian mixture");
        let (gmm, assignments) = GaussianMixture::fit(latents, count, dim, effective_k, seed);
        let counts = distribution(&assignments);
        info!(?counts, effective_k, "Gaussian-mixture cluster distribution");
        return Ok(ClusterOutcome::Fallback {
            assignments,
            model: gmm,
            effective_k,
        });
    }

    Ok(ClusterOutcome::Primary {
        assignments,
        model: kmeans,
        effective_k,
    })
}
