//! # DAE (Denoising Autoencoder)
//!
//! A single-hidden-layer denoising autoencoder: it learns a compressed
//! middle-layer representation of fixed-size input vectors by training to
//! reconstruct a clean input from a corrupted copy of it.
//!
//! ## Overview
//!
//! One `DenoisingAutoencoder` is a single trainable stage of a stacked
//! pipeline: [`DenoisingAutoencoder::middle_output`] extracts the compressed
//! representation that feeds the next stage. Training is error-threshold
//! driven — each trial forwards the whole batch, checks the aggregate
//! reconstruction error against a tolerance, and applies one delta-rule
//! update pass per sample if unconverged.
//!
//! Per-neuron work inside every forward and update phase is fanned out
//! across OS worker threads in contiguous index ranges with a hard join
//! barrier between phases (see [`utils::parallel_for_each_mut`]).
//!
//! ## Structure
//!
//! - [`core`] — The autoencoder engine: layers, training loop, convergence
//! - [`neuron`] — Neuron capability: activations, delta-rule updates
//! - [`data`] — Input corruption and normalization helpers
//! - [`utils`] — Index partitioning, parallel-for, error metric
//! - [`checkpoint`] — JSON save/load of trained weights

pub mod checkpoint;
pub mod core;
pub mod data;
pub mod neuron;
pub mod utils;

pub use crate::core::{DaeError, DaeResult, DenoisingAutoencoder, LearnReport};
pub use crate::neuron::{
    Activation, ActivationKind, DenseNeuron, IdentityActivation, LearnSignal, Neuron,
    ReluActivation, SigmoidActivation, TanhActivation,
};
pub use crate::utils::mean_squared_error;

use std::num::NonZeroUsize;

/// Training configuration for the autoencoder.
///
/// All knobs have documented defaults matching the reference behavior;
/// tests typically tighten `max_trials` and pin `num_threads`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Trial budget for `learn` (default 300).
    pub max_trials: usize,
    /// Aggregate mean-squared-error below which training stops (default 0.1).
    pub tolerance: f64,
    /// Per-neuron learning rate for delta-rule updates.
    pub eta: f64,
    /// Worker threads per fan-out. `0` resolves to the host parallelism.
    pub num_threads: usize,
    /// Activation applied by the middle (compression) layer.
    pub middle_activation: ActivationKind,
    /// Seed for weight initialization; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_trials: 300,
            tolerance: 0.1,
            eta: 0.5,
            num_threads: host_threads(),
            middle_activation: ActivationKind::Sigmoid,
            seed: None,
        }
    }
}

/// Number of processing units the host reports, clamped to at least 1.
pub fn host_threads() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_trials, 300);
        assert!((config.tolerance - 0.1).abs() < 1e-12);
        assert!(config.num_threads >= 1);
        assert_eq!(config.middle_activation, ActivationKind::Sigmoid);
    }

    #[test]
    fn test_host_threads_nonzero() {
        assert!(host_threads() >= 1);
    }
}
