//! The denoising-autoencoder engine: layer evaluation, the training loop,
//! and its convergence policy.
//!
//! ## Training
//!
//! `learn` repeats, up to the trial budget:
//!
//! ```text
//! forward every noisy sample → aggregate reconstruction error vs. clean
//!   → below tolerance? stop (converged)
//!   → otherwise one update pass: output layer, then middle layer
//! ```
//!
//! Propagation always uses the corrupted vector while the error is measured
//! against the clean target — that is the denoising property. The engine
//! computes no gradients of its own; it hands each neuron a learning input
//! and a target or error signal and delegates the step to
//! [`Neuron::update`].
//!
//! ## Concurrency
//!
//! Every layer phase partitions its neuron indices into contiguous ranges
//! across the configured worker threads and joins them before the next
//! phase starts. Workers write disjoint slots of the shared output buffer,
//! so the fan-out is race-free without locking. A single instance does not
//! support concurrent external calls; that is the caller's responsibility.

use ndarray::{aview1, Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::fmt;

use crate::neuron::{ActivationKind, DenseNeuron, LearnSignal, Neuron};
use crate::utils::{mean_squared_error, parallel_for_each_mut};
use crate::Config;

/// Fixed activation policy of the reconstruction layer.
///
/// Sigmoid keeps reconstructions in (0, 1), matching inputs normalized into
/// the unit interval.
pub const OUTPUT_ACTIVATION: ActivationKind = ActivationKind::Sigmoid;

/// Error type for autoencoder operations.
#[derive(Debug, Clone)]
pub enum DaeError {
    /// Invalid construction parameters
    InvalidConfig(String),
    /// Batch or vector dimensionality does not match the configured shape
    ShapeMismatch(String),
}

impl fmt::Display for DaeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaeError::InvalidConfig(msg) => write!(f, "Invalid config: {msg}"),
            DaeError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {msg}"),
        }
    }
}

impl Error for DaeError {}

pub type DaeResult<T> = Result<T, DaeError>;

/// Outcome of one `learn` run.
///
/// Non-convergence is a reported outcome, not an error: the caller decides
/// whether to retry, accept the weights as-is, or discard the model.
#[derive(Debug, Clone)]
pub struct LearnReport {
    /// Whether the aggregate error dropped below the tolerance in budget.
    pub converged: bool,
    /// Update trials actually executed.
    pub trials: usize,
    /// Aggregate mean-squared-error at the point training stopped.
    pub error: f64,
}

impl fmt::Display for LearnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.converged {
            write!(
                f,
                "converged after {} trials (mse {:.6})",
                self.trials, self.error
            )
        } else {
            write!(
                f,
                "did not converge within {} trials (mse {:.6})",
                self.trials, self.error
            )
        }
    }
}

/// Evaluate every neuron of a layer for one input vector, fanned out across
/// `workers` threads. Each worker writes only its own slice of `out`;
/// returning is the barrier.
fn layer_forward<N: Neuron>(
    neurons: &[N],
    input: ArrayView1<'_, f64>,
    out: &mut [f64],
    workers: usize,
) {
    debug_assert_eq!(neurons.len(), out.len());
    parallel_for_each_mut(out, workers, |index, slot| {
        *slot = neurons[index].evaluate(input);
    });
}

/// Update every neuron of a layer by one step, fanned out across `workers`
/// threads over disjoint neurons. `signal` maps a neuron index to the
/// target or error signal it should learn from.
fn layer_update<N, S>(neurons: &mut [N], input: ArrayView1<'_, f64>, signal: S, workers: usize)
where
    N: Neuron,
    S: Fn(usize) -> LearnSignal + Sync,
{
    parallel_for_each_mut(neurons, workers, |index, neuron| {
        neuron.update(input, signal(index));
    });
}

/// A single-hidden-layer denoising autoencoder.
///
/// Reconstructs its input: the output layer always has as many neurons as
/// there are input features, and the middle layer holds
/// `round(input × compression_rate)` neurons whose outputs form the learned
/// compressed representation.
pub struct DenoisingAutoencoder {
    input_neuron_num: usize,
    middle_neuron_num: usize,
    output_neuron_num: usize,
    num_threads: usize,
    config: Config,

    middle_neurons: Vec<DenseNeuron>,
    output_neurons: Vec<DenseNeuron>,

    // Scratch buffers, recomputed every forward pass. The learned_* pair
    // holds outputs produced from the noisy input during training, kept
    // apart from the clean-evaluation pair.
    h: Vec<f64>,
    o: Vec<f64>,
    learned_h: Vec<f64>,
    learned_o: Vec<f64>,

    success: bool,
}

impl fmt::Debug for DenoisingAutoencoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenoisingAutoencoder")
            .field("input_neuron_num", &self.input_neuron_num)
            .field("middle_neuron_num", &self.middle_neuron_num)
            .field("output_neuron_num", &self.output_neuron_num)
            .field("num_threads", &self.num_threads)
            .field("success", &self.success)
            .finish()
    }
}

impl DenoisingAutoencoder {
    /// Create an autoencoder with the default [`Config`].
    ///
    /// # Errors
    /// `InvalidConfig` if `num_input` is zero, `compression_rate` is outside
    /// `(0, 1)`, or the derived middle-layer width rounds to zero.
    pub fn new(num_input: usize, compression_rate: f64) -> DaeResult<Self> {
        Self::with_config(num_input, compression_rate, Config::default())
    }

    /// Create an autoencoder with an explicit configuration.
    ///
    /// Allocates `round(num_input × compression_rate)` middle neurons with
    /// fan-in `num_input` and the configured activation, and `num_input`
    /// output neurons with fan-in equal to the middle width and the fixed
    /// [`OUTPUT_ACTIVATION`] policy. No learning occurs at construction.
    pub fn with_config(num_input: usize, compression_rate: f64, config: Config) -> DaeResult<Self> {
        if num_input == 0 {
            return Err(DaeError::InvalidConfig(
                "input size must be positive".to_string(),
            ));
        }
        if !compression_rate.is_finite() || compression_rate <= 0.0 || compression_rate >= 1.0 {
            return Err(DaeError::InvalidConfig(format!(
                "compression rate must lie in (0, 1), got {compression_rate}"
            )));
        }

        let middle_neuron_num = (num_input as f64 * compression_rate).round() as usize;
        if middle_neuron_num == 0 {
            return Err(DaeError::InvalidConfig(format!(
                "compression rate {compression_rate} yields an empty middle layer for {num_input} inputs"
            )));
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let middle_neurons = (0..middle_neuron_num)
            .map(|_| DenseNeuron::new(num_input, config.middle_activation, config.eta, &mut rng))
            .collect();
        let output_neurons = (0..num_input)
            .map(|_| DenseNeuron::new(middle_neuron_num, OUTPUT_ACTIVATION, config.eta, &mut rng))
            .collect();

        Ok(Self::assemble(
            num_input,
            middle_neuron_num,
            middle_neurons,
            output_neurons,
            config,
        ))
    }

    /// Rebuild an autoencoder around existing neurons (checkpoint loading).
    ///
    /// Neuron counts and fan-ins must be mutually consistent.
    pub(crate) fn from_parts(
        middle_neurons: Vec<DenseNeuron>,
        output_neurons: Vec<DenseNeuron>,
        config: Config,
    ) -> DaeResult<Self> {
        let middle_neuron_num = middle_neurons.len();
        let input_neuron_num = output_neurons.len();
        if middle_neuron_num == 0 || input_neuron_num == 0 {
            return Err(DaeError::InvalidConfig(
                "both layers must be non-empty".to_string(),
            ));
        }
        if middle_neurons.iter().any(|n| n.fan_in() != input_neuron_num)
            || output_neurons.iter().any(|n| n.fan_in() != middle_neuron_num)
        {
            return Err(DaeError::InvalidConfig(
                "neuron fan-ins do not match the layer widths".to_string(),
            ));
        }

        Ok(Self::assemble(
            input_neuron_num,
            middle_neuron_num,
            middle_neurons,
            output_neurons,
            config,
        ))
    }

    fn assemble(
        input_neuron_num: usize,
        middle_neuron_num: usize,
        middle_neurons: Vec<DenseNeuron>,
        output_neurons: Vec<DenseNeuron>,
        config: Config,
    ) -> Self {
        let num_threads = config.num_threads.max(1);
        Self {
            input_neuron_num,
            middle_neuron_num,
            output_neuron_num: input_neuron_num,
            num_threads,
            config,
            middle_neurons,
            output_neurons,
            h: vec![0.0; middle_neuron_num],
            o: vec![0.0; input_neuron_num],
            learned_h: vec![0.0; middle_neuron_num],
            learned_o: vec![0.0; input_neuron_num],
            success: true,
        }
    }

    /// Train to reconstruct `input` from its corrupted counterpart.
    ///
    /// `input` and `noisy_input` are aligned by index: entry `i` of both is
    /// the same conceptual sample, clean and corrupted. Each trial forwards
    /// the whole batch through the noisy path, checks the aggregate error
    /// against the tolerance, and — if unconverged — runs one update pass
    /// per sample (output layer first, then middle layer).
    ///
    /// Neuron weights are mutated in place. Failure to converge within the
    /// trial budget is reported via the returned [`LearnReport`] and the
    /// [`converged`](Self::converged) flag, never as an error.
    ///
    /// # Errors
    /// `ShapeMismatch` if the batches are empty, differ in length, or any
    /// vector does not match the input dimensionality.
    pub fn learn(
        &mut self,
        input: &[Array1<f64>],
        noisy_input: &[Array1<f64>],
    ) -> DaeResult<LearnReport> {
        if input.is_empty() {
            return Err(DaeError::ShapeMismatch(
                "training batch is empty".to_string(),
            ));
        }
        if input.len() != noisy_input.len() {
            return Err(DaeError::ShapeMismatch(format!(
                "clean batch has {} samples but noisy batch has {}",
                input.len(),
                noisy_input.len()
            )));
        }
        for vector in input.iter().chain(noisy_input.iter()) {
            self.check_vector(vector)?;
        }

        self.success = false;
        let mut trials = 0;
        let mut error = f64::INFINITY;

        while trials < self.config.max_trials {
            error = self.batch_error(input, noisy_input);
            if error < self.config.tolerance {
                self.success = true;
                break;
            }

            for (clean, noisy) in input.iter().zip(noisy_input.iter()) {
                self.learn_sample(clean, noisy);
            }
            trials += 1;
        }

        if !self.success {
            // Budget exhausted between error checks; measure where the
            // final update pass actually left the weights.
            error = self.batch_error(input, noisy_input);
        }

        Ok(LearnReport {
            converged: self.success,
            trials,
            error,
        })
    }

    /// Full forward evaluation of one input vector.
    ///
    /// Deterministic for fixed weights: only the scratch buffers are
    /// touched, never the neurons. `show_result` prints the reconstruction
    /// for diagnostics and has no semantic effect.
    ///
    /// # Errors
    /// `ShapeMismatch` if `input` does not match the input dimensionality.
    pub fn out(&mut self, input: &Array1<f64>, show_result: bool) -> DaeResult<Array1<f64>> {
        self.check_vector(input)?;

        layer_forward(
            &self.middle_neurons,
            input.view(),
            &mut self.h,
            self.num_threads,
        );
        layer_forward(
            &self.output_neurons,
            aview1(&self.h),
            &mut self.o,
            self.num_threads,
        );

        if show_result {
            let rendered: Vec<String> = self.o.iter().map(|v| format!("{v:.6}")).collect();
            println!("out: [{}]", rendered.join(", "));
        }

        Ok(Array1::from(self.o.clone()))
    }

    /// Compressed (middle-layer) representation of a batch of noisy inputs.
    ///
    /// Runs only the middle half of the forward pass per vector. Batch order
    /// and length are preserved; each element has the middle-layer width.
    /// This is the handoff point to the next stage of a stacked pipeline.
    ///
    /// # Errors
    /// `ShapeMismatch` if any vector does not match the input dimensionality.
    pub fn middle_output(&mut self, noisy_input: &[Array1<f64>]) -> DaeResult<Vec<Array1<f64>>> {
        let mut batch = Vec::with_capacity(noisy_input.len());
        for vector in noisy_input {
            self.check_vector(vector)?;
            layer_forward(
                &self.middle_neurons,
                vector.view(),
                &mut self.h,
                self.num_threads,
            );
            batch.push(Array1::from(self.h.clone()));
        }
        Ok(batch)
    }

    /// Width of the middle (compression) layer.
    pub fn middle_neuron_num(&self) -> usize {
        self.middle_neuron_num
    }

    /// Input dimensionality, which equals the output dimensionality.
    pub fn input_neuron_num(&self) -> usize {
        self.input_neuron_num
    }

    /// Whether the last `learn` run reached the tolerance within budget.
    pub fn converged(&self) -> bool {
        self.success
    }

    /// Configuration this instance was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn middle_neurons(&self) -> &[DenseNeuron] {
        &self.middle_neurons
    }

    pub(crate) fn output_neurons(&self) -> &[DenseNeuron] {
        &self.output_neurons
    }

    /// Aggregate mean-squared-error of the noisy forward pass against the
    /// clean targets, averaged over all samples and output dimensions.
    fn batch_error(&mut self, input: &[Array1<f64>], noisy_input: &[Array1<f64>]) -> f64 {
        let mut sum = 0.0;
        for (clean, noisy) in input.iter().zip(noisy_input.iter()) {
            self.forward_learned(noisy);
            for (j, &output) in self.learned_o.iter().enumerate() {
                sum += mean_squared_error(output, clean[j]);
            }
        }
        sum / (input.len() * self.output_neuron_num) as f64
    }

    /// Forward the corrupted vector into the `learned_*` buffers.
    fn forward_learned(&mut self, noisy: &Array1<f64>) {
        layer_forward(
            &self.middle_neurons,
            noisy.view(),
            &mut self.learned_h,
            self.num_threads,
        );
        layer_forward(
            &self.output_neurons,
            aview1(&self.learned_h),
            &mut self.learned_o,
            self.num_threads,
        );
    }

    /// One update pass for a single sample pair.
    ///
    /// Output neurons learn toward the clean target with the current middle
    /// representation as input; middle neurons then learn from the noisy
    /// vector with the error signal fed back from the output-layer deltas.
    fn learn_sample(&mut self, clean: &Array1<f64>, noisy: &Array1<f64>) {
        self.forward_learned(noisy);

        layer_update(
            &mut self.output_neurons,
            aview1(&self.learned_h),
            |j| LearnSignal::Target(clean[j]),
            self.num_threads,
        );

        let output_neurons = &self.output_neurons;
        layer_update(
            &mut self.middle_neurons,
            noisy.view(),
            |j| {
                let mut error = 0.0;
                for neuron in output_neurons {
                    error += neuron.delta() * neuron.weight(j);
                }
                LearnSignal::Error(error)
            },
            self.num_threads,
        );
    }

    fn check_vector(&self, vector: &Array1<f64>) -> DaeResult<()> {
        if vector.len() != self.input_neuron_num {
            return Err(DaeError::ShapeMismatch(format!(
                "expected vector of length {}, got {}",
                self.input_neuron_num,
                vector.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinned_config(threads: usize) -> Config {
        Config {
            num_threads: threads,
            seed: Some(42),
            ..Config::default()
        }
    }

    #[test]
    fn test_layer_widths() {
        let dae = DenoisingAutoencoder::new(4, 0.5).unwrap();
        assert_eq!(dae.middle_neuron_num(), 2);
        assert_eq!(dae.input_neuron_num(), 4);
    }

    #[test]
    fn test_middle_width_rounds() {
        // round(10 * 0.55) = 6, round(10 * 0.34) = 3
        assert_eq!(
            DenoisingAutoencoder::new(10, 0.55).unwrap().middle_neuron_num(),
            6
        );
        assert_eq!(
            DenoisingAutoencoder::new(10, 0.34).unwrap().middle_neuron_num(),
            3
        );
    }

    #[test]
    fn test_invalid_construction() {
        assert!(DenoisingAutoencoder::new(0, 0.5).is_err());
        assert!(DenoisingAutoencoder::new(4, 0.0).is_err());
        assert!(DenoisingAutoencoder::new(4, -0.5).is_err());
        assert!(DenoisingAutoencoder::new(4, 1.0).is_err());
        assert!(DenoisingAutoencoder::new(4, 1.5).is_err());
        assert!(DenoisingAutoencoder::new(4, f64::NAN).is_err());
        // round(4 * 0.05) = 0: empty middle layer
        assert!(DenoisingAutoencoder::new(4, 0.05).is_err());
    }

    #[test]
    fn test_out_is_deterministic() {
        let mut dae = DenoisingAutoencoder::with_config(6, 0.5, pinned_config(2)).unwrap();
        let input = ndarray::array![0.1, 0.9, 0.0, 1.0, 0.4, 0.6];

        let first = dae.out(&input, false).unwrap();
        let second = dae.out(&input, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn test_out_matches_across_thread_counts() {
        let input = ndarray::array![0.2, 0.8, 0.5, 0.1, 0.9];
        let mut serial = DenoisingAutoencoder::with_config(5, 0.6, pinned_config(1)).unwrap();
        let mut parallel = DenoisingAutoencoder::with_config(5, 0.6, pinned_config(4)).unwrap();

        let a = serial.out(&input, false).unwrap();
        let b = parallel.out(&input, false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_out_rejects_wrong_length() {
        let mut dae = DenoisingAutoencoder::new(4, 0.5).unwrap();
        let short = ndarray::array![1.0, 0.0];
        assert!(matches!(
            dae.out(&short, false),
            Err(DaeError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_middle_output_preserves_order_and_shape() {
        let mut dae = DenoisingAutoencoder::with_config(4, 0.5, pinned_config(2)).unwrap();
        let batch = vec![
            ndarray::array![1.0, 0.0, 0.0, 1.0],
            ndarray::array![0.0, 1.0, 1.0, 0.0],
            ndarray::array![1.0, 1.0, 0.0, 0.0],
        ];

        let middle = dae.middle_output(&batch).unwrap();
        assert_eq!(middle.len(), batch.len());
        for representation in &middle {
            assert_eq!(representation.len(), dae.middle_neuron_num());
        }

        // order preserved: element i must equal a lone evaluation of sample i
        let lone = dae.middle_output(&batch[1..2]).unwrap();
        assert_eq!(middle[1], lone[0]);
    }

    #[test]
    fn test_middle_output_rejects_wrong_length() {
        let mut dae = DenoisingAutoencoder::new(4, 0.5).unwrap();
        let batch = vec![ndarray::array![1.0, 0.0, 0.0]];
        assert!(dae.middle_output(&batch).is_err());
    }

    #[test]
    fn test_learn_rejects_bad_batches() {
        let mut dae = DenoisingAutoencoder::new(4, 0.5).unwrap();
        let sample = ndarray::array![1.0, 0.0, 0.0, 1.0];

        assert!(dae.learn(&[], &[]).is_err());
        assert!(dae.learn(&[sample.clone()], &[]).is_err());
        let short = ndarray::array![1.0, 0.0];
        assert!(dae.learn(&[sample.clone()], &[short]).is_err());
    }

    #[test]
    fn test_trial_budget_is_exact() {
        // tolerance 0 can never be undercut, so the loop must run exactly
        // max_trials update passes and report failure
        let config = Config {
            max_trials: 5,
            tolerance: 0.0,
            ..pinned_config(1)
        };
        let mut dae = DenoisingAutoencoder::with_config(4, 0.5, config).unwrap();
        let batch = vec![ndarray::array![1.0, 0.0, 0.0, 1.0]];

        let report = dae.learn(&batch, &batch).unwrap();
        assert!(!report.converged);
        assert!(!dae.converged());
        assert_eq!(report.trials, 5);
    }

    #[test]
    fn test_report_display() {
        let converged = LearnReport {
            converged: true,
            trials: 12,
            error: 0.05,
        };
        assert_eq!(
            converged.to_string(),
            "converged after 12 trials (mse 0.050000)"
        );

        let failed = LearnReport {
            converged: false,
            trials: 300,
            error: 0.25,
        };
        assert!(failed.to_string().starts_with("did not converge within 300"));
    }
}
