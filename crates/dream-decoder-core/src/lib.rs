//! # dream-decoder-core
//!
//! Turns a physiological sleep recording into a small set of discrete
//! dream archetypes: band-power features are extracted from REM-stage EEG
//! epochs, compressed through a bottleneck autoencoder, clustered in
//! latent space, and mapped deterministically to symbolic prompts and
//! insights.
//!
//! # Architecture
//!
//! - [`features`]: Butterworth band-pass design and band-power extraction
//! - [`model`]: dense layers, Adam, the autoencoder, and its training loop
//! - [`clustering`]: k-means with a Gaussian-mixture fallback
//! - [`prompts`]: fixed cluster → prompt → insight tables
//! - [`pipeline`]: per-file-pair orchestration behind the [`EpochSource`]
//!   seam
//!
//! Loading recordings, querying stage annotations, and rendering prompts
//! into images are external collaborators; the core consumes epochs and
//! produces strings.
//!
//! # Example
//!
//! ```rust,ignore
//! use dream_decoder_core::{DreamDecoder, PipelineConfig};
//!
//! let decoder = DreamDecoder::new(PipelineConfig::default())?;
//! for result in decoder.run(&sources) {
//!     match result {
//!         Ok(report) => println!("{:?}", report.sample(0)),
//!         Err(err) => eprintln!("pair skipped: {err}"),
//!     }
//! }
//! ```

pub mod clustering;
pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod prompts;

pub use clustering::{cluster_latents, ClusterOutcome, GaussianMixture, KMeansModel};
pub use config::{BandEdges, PipelineConfig};
pub use error::{DecoderError, DecoderResult};
pub use features::{BandPowerExtractor, BandpassFilter, Epoch, FeatureMatrix};
pub use model::{train, Adam, AdamState, Autoencoder, TrainingParams, TrainingReport};
pub use pipeline::{DreamDecoder, EpochArchetype, EpochSet, EpochSource, PairReport};
pub use prompts::{assign_prompt, resolve_insight, DEFAULT_INSIGHT, DEFAULT_PROMPT};
