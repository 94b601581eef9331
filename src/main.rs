use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use dlnet::config::load_config;
use dlnet::{
    CheckpointSink, Hyperparams, InMemoryDataset, JsonCheckpointDir, LabeledSet, Network,
    NoCheckpoints, StandardInitializer, load_params,
};

#[derive(Parser)]
#[command(name = "dlnet", version)]
#[command(about = "Train and score sigmoid MLPs on labelled CSV data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a network described by a JSON config
    Train {
        /// Network and training configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Training split, one `label,x0,x1,...` row per sample
        #[arg(long)]
        train: PathBuf,

        /// Test split used for per-epoch evaluation
        #[arg(long)]
        test: PathBuf,

        /// Every feature is divided by this value
        #[arg(long, default_value = "1.0")]
        scale: f32,

        /// Directory for best-model checkpoints (needs `save_best` in the config)
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Write the final parameters here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score saved parameters on a labelled CSV
    Eval {
        /// Parameters written by `train` or a checkpoint
        #[arg(short, long)]
        params: PathBuf,

        #[arg(long)]
        test: PathBuf,

        #[arg(long, default_value = "1.0")]
        scale: f32,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train {
            config,
            train,
            test,
            scale,
            checkpoint_dir,
            output,
        } => run_train(config, train, test, scale, checkpoint_dir, output),
        Commands::Eval {
            params,
            test,
            scale,
        } => run_eval(params, test, scale),
    }
}

fn load_split(path: &Path, scale: f32) -> Result<LabeledSet> {
    LabeledSet::load_csv(path, scale).with_context(|| format!("loading {}", path.display()))
}

fn run_train(
    config: PathBuf,
    train: PathBuf,
    test: PathBuf,
    scale: f32,
    checkpoint_dir: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let cfg = load_config(&config)?;
    let topology = cfg.topology()?;

    let mut data = InMemoryDataset::new(load_split(&train, scale)?, load_split(&test, scale)?)?;
    info!(
        "loaded {} training and {} test samples",
        data.train().len(),
        data.test().len()
    );

    let mut init = StandardInitializer::new(cfg.init.clone(), cfg.seed);
    let mut net = Network::with_initializer(topology, &cfg.hyperparams(), &mut init)
        .context("building network")?;

    let mut sink: Box<dyn CheckpointSink> = match checkpoint_dir {
        Some(dir) => Box::new(JsonCheckpointDir::new(dir)),
        None => {
            if cfg.save_best.is_some() {
                warn!("`save_best` is set without --checkpoint-dir; nothing will be saved");
            }
            Box::new(NoCheckpoints)
        }
    };

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let report = net.train(&mut data, &cfg.train_config(), &mut rng, sink.as_mut())?;

    if let Some(best) = report.best_successes {
        info!("best score: {best}/{}", data.test().len());
    }
    if let Some(path) = output {
        dlnet::save_params(net.params(), &path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote parameters to {}", path.display());
    }
    Ok(())
}

fn run_eval(path: PathBuf, test: PathBuf, scale: f32) -> Result<()> {
    let params = load_params(&path).with_context(|| format!("loading {}", path.display()))?;
    let topology = params.topology()?;
    let net = Network::new(topology, params, &Hyperparams::default())?;

    let test = load_split(&test, scale)?;
    let data = InMemoryDataset::new(test.clone(), test)?;
    let report = net.accuracy_on(&data)?;
    println!(
        "{}/{} correct ({:.2}%)",
        report.successes,
        report.total,
        report.accuracy() * 100.0
    );
    Ok(())
}
