use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::prelude::*;

use threes_td::agent::{Agent, Player, RandomEnvironment};
use threes_td::engine as GameEngine;
use threes_td::episode::{play_episode, EpisodeOptions};
use threes_td::stats::Statistics;

#[derive(Debug, Parser)]
#[command(name = "threes-td", about = "Train and evaluate an n-tuple TD player for Threes")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Hide the progress bar
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Play episodes and learn from each one
    Train(RunArgs),
    /// Play episodes without touching the weights
    Eval(RunArgs),
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Episodes to play
    #[arg(long, default_value_t = 1000)]
    total: usize,

    /// Episodes per statistics block
    #[arg(long, default_value_t = 1000)]
    block: usize,

    /// Player arguments, e.g. "alpha=0.1 leda=1 seed=1 load=w.bin save=w.bin"
    #[arg(long, default_value = "")]
    play: String,

    /// Environment arguments, e.g. "seed=2"
    #[arg(long, default_value = "")]
    evil: String,

    /// Tiles placed before the first move
    #[arg(long, default_value_t = 9)]
    init_tiles: usize,

    /// Stop an episode after this many moves
    #[arg(long)]
    max_steps: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    GameEngine::new();

    let (run, learning) = match cli.cmd {
        Cmd::Train(run) => (run, true),
        Cmd::Eval(run) => (run, false),
    };

    let mut player = Player::from_args(&run.play).context("cannot create player")?;
    if let Some(td) = player.as_td_mut() {
        td.set_learning(learning);
    }
    let mut env = RandomEnvironment::from_args(&run.evil).context("cannot create environment")?;
    info!(player = %player.args(), env = %env.args(), learning, "starting");

    let opts = EpisodeOptions { init_tiles: run.init_tiles, max_steps: run.max_steps };
    let mut stats = Statistics::new(run.block);

    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(run.total as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} [{bar:40}] {pos}/{len} episodes | {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    for _ in 0..run.total {
        let record = play_episode(&mut player, &mut env, &opts);
        pb.set_message(format!("last: {} moves, reward {}", record.moves, record.reward));
        pb.suspend(|| stats.push(record));
        pb.inc(1);
    }
    pb.finish_and_clear();

    if stats.total() % run.block.max(1) != 0 {
        info!("{}", stats.summarize());
    }

    if learning {
        if let Some(td) = player.as_td() {
            if let Some(path) = td.save_weights().context("cannot save weights")? {
                info!(path = %path.display(), "training finished");
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();
}
