//! CLI command handlers
//!
//! Two subcommands, both of which run the full train/validate loop and
//! persist the tracked run as JSON: `train` reads an IDX image dataset from
//! disk, `synth` generates a Gaussian-cluster dataset in memory.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{OptimizerKind, TrainConfig};
use crate::data::{get_dataloaders, synthetic_classification, DataLoader};
use crate::tracking::storage::JsonFileBackend;
use crate::tracking::Run;
use crate::train::Trainer;

/// Ensayar: instrumented MLP training with experiment tracking
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "ensayar")]
#[command(version)]
#[command(about = "Train a small image classifier and track every run")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Suppress per-step progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train on an IDX image dataset (e.g. Fashion-MNIST)
    Train(TrainArgs),

    /// Train on a synthetic Gaussian-cluster dataset
    Synth(SynthArgs),
}

/// Hyperparameters shared by every training command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct HyperArgs {
    /// Number of epochs
    #[arg(short, long, default_value = "5")]
    pub epochs: usize,

    /// Examples per training step
    #[arg(short, long, default_value = "128")]
    pub batch_size: usize,

    /// Learning rate
    #[arg(short, long, default_value = "0.001")]
    pub lr: f32,

    /// Dropout probability in the hidden layer
    #[arg(long, default_value = "0.2")]
    pub dropout: f32,

    /// Number of examples sliced from the dataset for this run
    #[arg(long, default_value = "10000")]
    pub slice_size: usize,

    /// Fraction of the slice held out for validation
    #[arg(long, default_value = "0.2")]
    pub valid_fraction: f32,

    /// Width of the hidden layer
    #[arg(long, default_value = "64")]
    pub hidden_dim: usize,

    /// Optimizer to train with
    #[arg(long, value_enum, default_value = "adam")]
    pub optimizer: OptimizerKind,

    /// Momentum for SGD (ignored by Adam)
    #[arg(long, default_value = "0.9")]
    pub momentum: f32,

    /// Random seed for weight init, dropout, and the data split
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Print a progress line every N steps
    #[arg(long, default_value = "100")]
    pub log_every: usize,

    /// Directory where finished runs are stored as JSON
    #[arg(long, default_value = "runs")]
    pub runs_dir: PathBuf,

    /// Project name recorded on the tracking run
    #[arg(long, default_value = "ensayar")]
    pub project: String,
}

impl HyperArgs {
    fn to_config(&self, input_dim: usize, n_classes: usize, quiet: bool) -> TrainConfig {
        TrainConfig::new()
            .with_epochs(self.epochs)
            .with_batch_size(self.batch_size)
            .with_learning_rate(self.lr)
            .with_dropout(self.dropout)
            .with_slice_size(self.slice_size)
            .with_valid_fraction(self.valid_fraction)
            .with_input_dim(input_dim)
            .with_hidden_dim(self.hidden_dim)
            .with_n_classes(n_classes)
            .with_optimizer(self.optimizer)
            .with_momentum(self.momentum)
            .with_seed(self.seed)
            .with_log_every(if quiet { 0 } else { self.log_every })
    }
}

/// Arguments for the train command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// Directory containing train-images-idx3-ubyte and train-labels-idx1-ubyte
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: PathBuf,

    #[command(flatten)]
    pub hyper: HyperArgs,
}

/// Arguments for the synth command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct SynthArgs {
    /// Number of examples to generate
    #[arg(long, default_value = "2000")]
    pub n_examples: usize,

    /// Number of features per example
    #[arg(long, default_value = "16")]
    pub n_features: usize,

    /// Number of cluster classes
    #[arg(long, default_value = "4")]
    pub n_classes: usize,

    #[command(flatten)]
    pub hyper: HyperArgs,
}

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Train(args) => run_train(args, cli.quiet),
        Command::Synth(args) => run_synth(args, cli.quiet),
    }
}

fn run_train(args: TrainArgs, quiet: bool) -> Result<(), Box<dyn Error>> {
    let (train, valid) = get_dataloaders(
        &args.data_dir,
        args.hyper.batch_size,
        args.hyper.slice_size,
        args.hyper.valid_fraction,
    )?;

    let n_classes = train.n_classes().max(valid.n_classes());
    let config = args.hyper.to_config(train.n_features(), n_classes, quiet);
    run_session(config, &args.hyper, &train, &valid)
}

fn run_synth(args: SynthArgs, quiet: bool) -> Result<(), Box<dyn Error>> {
    let dataset = synthetic_classification(
        args.n_examples,
        args.n_features,
        args.n_classes,
        args.hyper.seed,
    );
    // split clamps the slice to the generated size
    let (train, valid) = dataset.split(
        args.hyper.batch_size,
        args.hyper.slice_size,
        args.hyper.valid_fraction,
        args.hyper.seed,
    )?;

    let config = args.hyper.to_config(args.n_features, args.n_classes, quiet);
    run_session(config, &args.hyper, &train, &valid)
}

fn run_session(
    config: TrainConfig,
    hyper: &HyperArgs,
    train: &DataLoader,
    valid: &DataLoader,
) -> Result<(), Box<dyn Error>> {
    let backend = JsonFileBackend::new(&hyper.runs_dir);
    let mut run = Run::init(&hyper.project, &config, backend)?;
    let run_id = run.id().to_string();

    if config.log_every > 0 {
        println!(
            "run {run_id}: {} training examples, {} validation examples, {} steps/epoch",
            train.num_examples(),
            valid.num_examples(),
            train.num_batches()
        );
    }

    let mut trainer = Trainer::new(config)?;
    match trainer.fit(train, valid, &mut run) {
        Ok(result) => {
            run.finish()?;
            println!(
                "run {run_id} finished in {:.1}s | valid loss {:.4} | accuracy {:.2}%",
                result.elapsed_secs,
                result.final_valid_loss,
                result.final_accuracy * 100.0
            );
            println!("saved to {}", runs_path(hyper, &run_id).display());
            Ok(())
        }
        Err(e) => {
            run.fail()?;
            Err(e.into())
        }
    }
}

fn runs_path(hyper: &HyperArgs, run_id: &str) -> PathBuf {
    hyper.runs_dir.join(format!("{run_id}.json"))
}
