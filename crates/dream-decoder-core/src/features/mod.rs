//! Band-power feature extraction.
//!
//! Converts raw multi-channel epochs into fixed-length feature vectors:
//! zero-phase Butterworth band-pass per named frequency band, then mean
//! squared amplitude per channel.

pub mod bandpower;
pub mod filter;

pub use bandpower::{BandPowerExtractor, Epoch, FeatureMatrix};
pub use filter::BandpassFilter;
