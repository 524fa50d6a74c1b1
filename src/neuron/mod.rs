//! Neuron capability: activation functions and the per-neuron update rule.
//!
//! The engine in [`crate::core`] never computes gradients itself — it only
//! supplies each neuron with a learning input and a target or error signal.
//! Everything local to one computational unit lives here: activation
//! evaluation, weight storage, and the single-sample delta-rule step.

use ndarray::{Array1, ArrayView1};
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::Rng;

/// Activation function applied to a neuron's weighted net input.
///
/// Implementations provide both the activation and its derivative at the
/// same point, which the delta-rule update needs.
pub trait Activation: Send + Sync {
    /// Apply activation: f(x)
    fn apply(&self, x: f64) -> f64;

    /// Derivative of activation: f'(x)
    fn derivative(&self, x: f64) -> f64;

    /// Name for selection and checkpointing
    fn name(&self) -> &'static str;
}

/// Identity activation: f(x) = x, f'(x) = 1
#[derive(Debug, Clone, Copy)]
pub struct IdentityActivation;

impl Activation for IdentityActivation {
    fn apply(&self, x: f64) -> f64 {
        x
    }

    fn derivative(&self, _x: f64) -> f64 {
        1.0
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// Logistic sigmoid: f(x) = 1 / (1 + e^-x), f'(x) = f(x)(1 - f(x))
///
/// Output range (0, 1); the fixed activation policy of the output layer,
/// which reconstructs targets normalized into [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct SigmoidActivation;

impl Activation for SigmoidActivation {
    fn apply(&self, x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    fn derivative(&self, x: f64) -> f64 {
        let s = self.apply(x);
        s * (1.0 - s)
    }

    fn name(&self) -> &'static str {
        "sigmoid"
    }
}

/// Tanh activation: f(x) = tanh(x), f'(x) = 1 - tanh²(x)
#[derive(Debug, Clone, Copy)]
pub struct TanhActivation;

impl Activation for TanhActivation {
    fn apply(&self, x: f64) -> f64 {
        x.tanh()
    }

    fn derivative(&self, x: f64) -> f64 {
        let t = x.tanh();
        1.0 - t * t
    }

    fn name(&self) -> &'static str {
        "tanh"
    }
}

/// Rectified linear unit: f(x) = max(0, x); f'(x) = 1 for x > 0, else 0.
#[derive(Debug, Clone, Copy)]
pub struct ReluActivation;

impl Activation for ReluActivation {
    fn apply(&self, x: f64) -> f64 {
        if x > 0.0 {
            x
        } else {
            0.0
        }
    }

    fn derivative(&self, x: f64) -> f64 {
        if x > 0.0 {
            1.0
        } else {
            0.0
        }
    }

    fn name(&self) -> &'static str {
        "relu"
    }
}

/// Selector for the activation variants a layer can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    Identity,
    Sigmoid,
    Tanh,
    Relu,
}

impl ActivationKind {
    /// Build the boxed activation this selector names.
    pub fn build(self) -> Box<dyn Activation> {
        match self {
            ActivationKind::Identity => Box::new(IdentityActivation),
            ActivationKind::Sigmoid => Box::new(SigmoidActivation),
            ActivationKind::Tanh => Box::new(TanhActivation),
            ActivationKind::Relu => Box::new(ReluActivation),
        }
    }

    /// Stable name, matching [`Activation::name`] of the built variant.
    pub fn name(self) -> &'static str {
        match self {
            ActivationKind::Identity => "identity",
            ActivationKind::Sigmoid => "sigmoid",
            ActivationKind::Tanh => "tanh",
            ActivationKind::Relu => "relu",
        }
    }

    /// Parse a stable name back into a selector (checkpoint loading, CLI).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "identity" => Some(ActivationKind::Identity),
            "sigmoid" => Some(ActivationKind::Sigmoid),
            "tanh" => Some(ActivationKind::Tanh),
            "relu" => Some(ActivationKind::Relu),
            _ => None,
        }
    }
}

/// The signal handed to a neuron for one local update step.
///
/// Output-layer neurons get the clean target for their output index; the
/// neuron turns it into an error internally. Middle-layer neurons get an
/// already-derived error signal (the delta-weighted sum fed back from the
/// layer above).
#[derive(Debug, Clone, Copy)]
pub enum LearnSignal {
    /// Desired output value; error is computed against the current output.
    Target(f64),
    /// Pre-computed error term fed back from the layer above.
    Error(f64),
}

/// One computational unit owned exclusively by a layer.
///
/// `evaluate` is stateless given fixed weights; `update` mutates the weights
/// by one step. `delta` and `weight` expose just enough of the last update
/// for the engine to derive the error signal of the layer below.
pub trait Neuron: Send + Sync {
    /// Compute the scalar output for `input` (length = fan-in).
    fn evaluate(&self, input: ArrayView1<'_, f64>) -> f64;

    /// Perform one local weight-update step.
    fn update(&mut self, input: ArrayView1<'_, f64>, signal: LearnSignal);

    /// Error term computed by the most recent `update`.
    fn delta(&self) -> f64;

    /// Weight on input `index`, as of the most recent `update`.
    fn weight(&self, index: usize) -> f64;
}

/// Fully-connected neuron with a boxed activation and delta-rule updates.
///
/// # Weight Initialization
///
/// Weights are drawn uniformly from `[-1/sqrt(fan_in), 1/sqrt(fan_in)]` and
/// the bias starts at zero, keeping the initial net input at unit scale
/// regardless of fan-in.
pub struct DenseNeuron {
    weights: Array1<f64>,
    bias: f64,
    activation: Box<dyn Activation>,
    eta: f64,
    delta: f64,
}

impl std::fmt::Debug for DenseNeuron {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseNeuron")
            .field("fan_in", &self.weights.len())
            .field("bias", &self.bias)
            .field("activation", &self.activation.name())
            .field("eta", &self.eta)
            .field("delta", &self.delta)
            .finish()
    }
}

impl DenseNeuron {
    /// Create a neuron with `fan_in` randomly initialized weights.
    pub fn new<R: Rng>(fan_in: usize, kind: ActivationKind, eta: f64, rng: &mut R) -> Self {
        let limit = 1.0 / (fan_in as f64).sqrt();
        let weights = Array1::random_using(fan_in, Uniform::new(-limit, limit), rng);
        Self {
            weights,
            bias: 0.0,
            activation: kind.build(),
            eta,
            delta: 0.0,
        }
    }

    /// Rebuild a neuron from stored weights (checkpoint loading).
    pub fn from_parts(weights: Array1<f64>, bias: f64, kind: ActivationKind, eta: f64) -> Self {
        Self {
            weights,
            bias,
            activation: kind.build(),
            eta,
            delta: 0.0,
        }
    }

    /// Number of inputs this neuron was sized for.
    pub fn fan_in(&self) -> usize {
        self.weights.len()
    }

    /// Current weight vector.
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Current bias term.
    pub fn bias(&self) -> f64 {
        self.bias
    }

    fn net(&self, input: ArrayView1<'_, f64>) -> f64 {
        self.weights.dot(&input) + self.bias
    }
}

impl Neuron for DenseNeuron {
    fn evaluate(&self, input: ArrayView1<'_, f64>) -> f64 {
        self.activation.apply(self.net(input))
    }

    fn update(&mut self, input: ArrayView1<'_, f64>, signal: LearnSignal) {
        let net = self.net(input);
        let error = match signal {
            LearnSignal::Target(target) => self.activation.apply(net) - target,
            LearnSignal::Error(error) => error,
        };
        let delta = error * self.activation.derivative(net);

        self.weights.scaled_add(-self.eta * delta, &input);
        self.bias -= self.eta * delta;
        self.delta = delta;
    }

    fn delta(&self) -> f64 {
        self.delta
    }

    fn weight(&self, index: usize) -> f64 {
        self.weights[index]
    }
}
