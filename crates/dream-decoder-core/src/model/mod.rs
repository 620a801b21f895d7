//! Latent autoencoder: layers, optimizer, model, and training loop.

pub mod autoencoder;
pub mod layers;
pub mod optimizer;
pub mod trainer;

pub use autoencoder::{Autoencoder, LayerOptState, TrainForward};
pub use layers::{Dense, DenseGradient};
pub use optimizer::{Adam, AdamState};
pub use trainer::{train, TrainingParams, TrainingReport};
