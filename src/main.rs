use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use digit_mlp::{
    Activation, FitConfig, Loader, Network, NetworkBuilder, NetworkConfig, SampleStore,
};

/// Train and score a digit-classifier MLP on label+pixel CSV files.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a network, train it, then test it.
    Train(TrainArgs),
}

#[derive(Debug, Args)]
struct TrainArgs {
    /// Training rows: label followed by 784 pixels in [0, 255].
    #[arg(long, env = "DIGIT_MLP_TRAIN_FILE")]
    train_file: PathBuf,

    /// Test rows, same format as the training file.
    #[arg(long, env = "DIGIT_MLP_TEST_FILE")]
    test_file: PathBuf,

    #[arg(long, default_value_t = 1)]
    epochs: usize,

    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    #[arg(long, default_value_t = NetworkConfig::default().learning_rate)]
    learning_rate: f64,

    /// Hidden ReLU layer width; repeat for more layers.
    #[arg(long = "hidden", default_values_t = [16])]
    hidden: Vec<usize>,

    /// Seed for weight init and shuffling; entropy when omitted.
    #[arg(long, env = "DIGIT_MLP_SEED")]
    seed: Option<u64>,

    /// Train on at most this many rows.
    #[arg(long)]
    train_limit: Option<usize>,

    /// Test on at most this many rows.
    #[arg(long, default_value_t = 100)]
    test_limit: usize,

    /// Print predictions for the first N test samples.
    #[arg(long, default_value_t = 0)]
    show: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Train(args) => run_train(&args),
    }
}

fn build_network(args: &TrainArgs) -> Result<Network> {
    let config = NetworkConfig {
        learning_rate: args.learning_rate,
        ..NetworkConfig::default()
    };

    let mut builder = NetworkBuilder::from_config(config)?;
    for &units in &args.hidden {
        builder = builder.add_layer(units, Activation::ReLU)?;
    }
    builder = builder.add_layer(config.class_count, Activation::Softmax)?;

    let net = match args.seed {
        Some(seed) => builder.build_with_seed(seed)?,
        None => builder.build()?,
    };
    Ok(net)
}

fn run_train(args: &TrainArgs) -> Result<()> {
    let mut net = build_network(args).context("failed to build network")?;

    let cfg = FitConfig {
        epochs: args.epochs,
        batch_size: args.batch_size,
        limit: args.train_limit,
    };
    let report = net
        .train_file(&args.train_file, &cfg)
        .with_context(|| format!("training on {} failed", args.train_file.display()))?;
    println!(
        "trained on {} samples for {} epoch(s), final loss {:.6}",
        report.samples,
        report.epochs.len(),
        report.final_loss().unwrap_or(f64::NAN)
    );

    let test = net
        .test(&args.test_file, Some(args.test_limit))
        .with_context(|| format!("testing on {} failed", args.test_file.display()))?;
    println!(
        "test accuracy {:.2}% ({}/{}), mean loss {:.6}",
        test.accuracy * 100.0,
        test.correct,
        test.total,
        test.mean_loss
    );

    if args.show > 0 {
        show_predictions(&net, args)?;
    }
    Ok(())
}

fn show_predictions(net: &Network, args: &TrainArgs) -> Result<()> {
    let loader = Loader::new(net.input_dim(), net.class_count());
    let mut store = SampleStore::empty(net.input_dim());
    store
        .load(&loader, &args.test_file, Some(args.show))
        .with_context(|| format!("failed to reload {}", args.test_file.display()))?;

    for _ in 0..store.len() {
        let activations = net.get_all_activations(&store.current_input())?;
        let outputs = activations.last().map_or(&[][..], Vec::as_slice);
        let predicted = Network::max_output_index(outputs);
        let confidence = outputs.get(predicted).copied().unwrap_or(0.0);
        let label = store
            .current_label()
            .map_or_else(|| "?".to_owned(), |l| l.to_string());

        println!(
            "sample {:>4}: label {label} predicted {predicted} ({:.1}%)",
            store.index(),
            confidence * 100.0
        );
        store.next();
    }
    Ok(())
}
