//! Toy denoising-autoencoder training binary.
//!
//! Generates a random binary pattern set, corrupts it with masking noise,
//! trains one autoencoder stage, reports convergence and per-sample
//! reconstruction error, and optionally saves a checkpoint.

use clap::Parser;
use dae::checkpoint::save_checkpoint;
use dae::data::mask_noise;
use dae::{host_threads, mean_squared_error, ActivationKind, Config, DenoisingAutoencoder};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "dae-train",
    about = "Train a denoising autoencoder stage on a toy pattern set"
)]
struct Args {
    /// Input dimensionality
    #[arg(long, default_value_t = 8)]
    input_dim: usize,

    /// Middle-layer width as a fraction of the input width
    #[arg(long, default_value_t = 0.5)]
    compression_rate: f64,

    /// Number of training patterns to generate
    #[arg(long, default_value_t = 16)]
    samples: usize,

    /// Probability of zeroing each input element (masking noise)
    #[arg(long, default_value_t = 0.3)]
    noise_rate: f64,

    /// Trial budget
    #[arg(long, default_value_t = 300)]
    max_trials: usize,

    /// Convergence tolerance on the aggregate mean-squared-error
    #[arg(long, default_value_t = 0.1)]
    tolerance: f64,

    /// Learning rate for neuron updates
    #[arg(long, default_value_t = 0.5)]
    eta: f64,

    /// Worker threads per fan-out (0 = host parallelism)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Middle-layer activation: identity, sigmoid, tanh, or relu
    #[arg(long, default_value = "sigmoid")]
    middle_activation: String,

    /// Seed for pattern generation and weight initialization
    #[arg(long)]
    seed: Option<u64>,

    /// Save the trained stage to this JSON file
    #[arg(long)]
    checkpoint: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let kind = match ActivationKind::from_name(&args.middle_activation) {
        Some(kind) => kind,
        None => {
            eprintln!("Unknown activation function: {}", args.middle_activation);
            std::process::exit(1);
        }
    };

    let seed = args.seed.unwrap_or(0xDAE);
    let mut rng = StdRng::seed_from_u64(seed);

    // Random binary pattern set plus masked copies as the corrupted inputs.
    let clean: Vec<Array1<f64>> = (0..args.samples)
        .map(|_| {
            Array1::from(
                (0..args.input_dim)
                    .map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 })
                    .collect::<Vec<f64>>(),
            )
        })
        .collect();
    let noisy: Vec<Array1<f64>> = clean
        .iter()
        .map(|sample| mask_noise(sample, args.noise_rate, &mut rng))
        .collect();

    let config = Config {
        max_trials: args.max_trials,
        tolerance: args.tolerance,
        eta: args.eta,
        num_threads: if args.threads == 0 {
            host_threads()
        } else {
            args.threads
        },
        middle_activation: kind,
        seed: Some(seed),
    };
    let threads = config.num_threads;

    let mut dae = match DenoisingAutoencoder::with_config(args.input_dim, args.compression_rate, config)
    {
        Ok(dae) => dae,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    println!(
        "Training {}->{}->{} ({} samples, noise {:.0}%, {} threads)",
        args.input_dim,
        dae.middle_neuron_num(),
        args.input_dim,
        args.samples,
        args.noise_rate * 100.0,
        threads
    );

    let start = Instant::now();
    let report = dae
        .learn(&clean, &noisy)
        .expect("generated batches have matching shapes");
    println!("Training {report} in {:.2?}", start.elapsed());

    // Reconstruction quality per clean sample (forward passes are
    // sequential against the single instance; scoring fans out).
    let reconstructions: Vec<Array1<f64>> = clean
        .iter()
        .map(|sample| dae.out(sample, false).expect("sample shape was validated"))
        .collect();
    let per_sample: Vec<f64> = clean
        .par_iter()
        .zip(reconstructions.par_iter())
        .map(|(target, output)| {
            target
                .iter()
                .zip(output.iter())
                .map(|(&t, &o)| mean_squared_error(o, t))
                .sum::<f64>()
                / target.len() as f64
        })
        .collect();

    let avg = per_sample.iter().sum::<f64>() / per_sample.len() as f64;
    let worst = per_sample.iter().fold(0.0f64, |a, &b| a.max(b));
    println!("Reconstruction mse: avg {avg:.6}, worst {worst:.6}");

    if let Some(path) = args.checkpoint {
        match save_checkpoint(&dae, &path) {
            Ok(()) => println!("Checkpoint saved to {}", path.display()),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }
}
