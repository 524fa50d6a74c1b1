//! Checkpoint save/load for trained autoencoders.
//!
//! Serializes both layers' weights and biases plus the middle activation
//! name to JSON, so a trained stage can be reloaded into a stacked
//! pipeline. Trainer hyperparameters are not persisted; loading takes a
//! [`Config`] and overrides its activation with the stored one.

use crate::core::OUTPUT_ACTIVATION;
use crate::neuron::{ActivationKind, DenseNeuron};
use crate::{Config, DenoisingAutoencoder};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable checkpoint data.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointData {
    /// Input (and output) dimensionality.
    pub input_neuron_num: usize,
    /// Middle-layer width.
    pub middle_neuron_num: usize,
    /// Name of the middle-layer activation function.
    pub middle_activation_name: String,
    /// Middle-layer weight rows, one per neuron.
    pub middle_weights: Vec<Vec<f64>>,
    /// Middle-layer biases, one per neuron.
    pub middle_biases: Vec<f64>,
    /// Output-layer weight rows, one per neuron.
    pub output_weights: Vec<Vec<f64>>,
    /// Output-layer biases, one per neuron.
    pub output_biases: Vec<f64>,
    /// Whether the last training run before saving had converged.
    pub converged: bool,
}

/// Save an autoencoder checkpoint to a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be written or the data cannot be
/// serialized.
pub fn save_checkpoint(dae: &DenoisingAutoencoder, path: &Path) -> Result<(), String> {
    let data = CheckpointData {
        input_neuron_num: dae.input_neuron_num(),
        middle_neuron_num: dae.middle_neuron_num(),
        middle_activation_name: dae.config().middle_activation.name().to_string(),
        middle_weights: dae
            .middle_neurons()
            .iter()
            .map(|n| n.weights().to_vec())
            .collect(),
        middle_biases: dae.middle_neurons().iter().map(|n| n.bias()).collect(),
        output_weights: dae
            .output_neurons()
            .iter()
            .map(|n| n.weights().to_vec())
            .collect(),
        output_biases: dae.output_neurons().iter().map(|n| n.bias()).collect(),
        converged: dae.converged(),
    };

    let json = serde_json::to_string_pretty(&data)
        .map_err(|e| format!("Failed to serialize checkpoint: {e}"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create checkpoint directory: {e}"))?;
    }

    std::fs::write(path, json)
        .map_err(|e| format!("Failed to write checkpoint to {}: {e}", path.display()))
}

/// Load an autoencoder checkpoint from a JSON file.
///
/// Rebuilds both layers from the stored weights. `config` supplies the
/// trainer knobs (trial budget, tolerance, learning rate, thread count);
/// its `middle_activation` is replaced by the one stored in the file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the stored
/// shapes are inconsistent.
pub fn load_checkpoint(
    path: &Path,
    config: Config,
) -> Result<(CheckpointData, DenoisingAutoencoder), String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read checkpoint from {}: {e}", path.display()))?;

    let data: CheckpointData =
        serde_json::from_str(&json).map_err(|e| format!("Failed to parse checkpoint: {e}"))?;

    let kind = ActivationKind::from_name(&data.middle_activation_name)
        .ok_or_else(|| format!("Unknown activation function: {}", data.middle_activation_name))?;
    let config = Config {
        middle_activation: kind,
        ..config
    };

    let middle_neurons = rebuild_layer(&data.middle_weights, &data.middle_biases, kind, config.eta)?;
    let output_neurons = rebuild_layer(
        &data.output_weights,
        &data.output_biases,
        OUTPUT_ACTIVATION,
        config.eta,
    )?;

    let dae = DenoisingAutoencoder::from_parts(middle_neurons, output_neurons, config)
        .map_err(|e| format!("Failed to reconstruct autoencoder: {e}"))?;

    Ok((data, dae))
}

fn rebuild_layer(
    weights: &[Vec<f64>],
    biases: &[f64],
    kind: ActivationKind,
    eta: f64,
) -> Result<Vec<DenseNeuron>, String> {
    if weights.len() != biases.len() {
        return Err(format!(
            "checkpoint stores {} weight rows but {} biases",
            weights.len(),
            biases.len()
        ));
    }
    Ok(weights
        .iter()
        .zip(biases.iter())
        .map(|(w, &b)| DenseNeuron::from_parts(Array1::from(w.clone()), b, kind, eta))
        .collect())
}
