//! Command line interface of the benchmark suite. `sweep` and `run` drive
//! the benchmarks, `stats` distills the resulting logs into table rows and
//! `play` runs a single benchmark target by hand.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use uctbench::bench::launcher::{CommandLauncher, Launcher, SelfPlayLauncher};
use uctbench::bench::logbook::Logbook;
use uctbench::bench::{runner, sweep};
use uctbench::search::{available_parallelism, SearchOptions, Strategy, DEFAULT_ITERATIONS};
use uctbench::selfplay::{self, Game};
use uctbench::stats;

#[derive(Parser)]
#[command(about, version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sweep the iteration budget from 2^10 to 2^30, benchmarking every
    /// strategy at each step.
    Sweep {
        /// Shared status log, truncated once at the start of the sweep.
        #[arg(long, default_value = "testall.log")]
        log: PathBuf,
        /// External dispatcher command to launch targets with; targets run
        /// in-process when omitted.
        #[arg(long)]
        dispatcher: Option<PathBuf>,
        /// Game to benchmark when running in-process.
        #[arg(long, default_value_t = Game::Othello)]
        game: Game,
        /// Worker threads for the parallel strategies.
        #[arg(short = 'p', long)]
        parallel: Option<usize>,
    },
    /// Run all five strategy benchmarks once.
    Run {
        /// Iteration budget handed to every target; each target's default
        /// applies when omitted.
        iterations: Option<u64>,
        /// Shared status log, appended to.
        #[arg(long, default_value = "testall.log")]
        log: PathBuf,
        /// External dispatcher command to launch targets with; targets run
        /// in-process when omitted.
        #[arg(long)]
        dispatcher: Option<PathBuf>,
        /// Game to benchmark when running in-process.
        #[arg(long, default_value_t = Game::Othello)]
        game: Game,
        /// Worker threads for the parallel strategies.
        #[arg(short = 'p', long)]
        parallel: Option<usize>,
    },
    /// Summarize every *.log file in the current directory as LaTeX table
    /// rows on stdout.
    Stats {
        /// First cell of every row, naming the benchmarked algorithm.
        label: String,
        /// Second cell of every row, e.g. the runtime or machine tag.
        tag: String,
    },
    /// Play one full self-play game with the given strategy.
    Play {
        /// Search strategy steering both players.
        strategy: Strategy,
        /// Search iterations per move.
        #[arg(short = 'i', long = "itermax", default_value_t = DEFAULT_ITERATIONS)]
        iterations: u64,
        /// Worker threads for the parallel strategies.
        #[arg(short = 'p', long = "parallel")]
        parallel: Option<usize>,
        /// Game to play.
        #[arg(long, default_value_t = Game::Othello)]
        game: Game,
    },
}

fn make_launcher(
    dispatcher: Option<PathBuf>,
    game: Game,
    parallel: Option<usize>,
) -> Box<dyn Launcher> {
    match dispatcher {
        Some(command) => Box::new(CommandLauncher::new(command)),
        None => Box::new(SelfPlayLauncher::new(
            game,
            parallel.unwrap_or_else(available_parallelism),
            ".",
        )),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Sweep {
            log,
            dispatcher,
            game,
            parallel,
        } => {
            uctbench::print_build_info();
            let logbook = Logbook::create(log)?;
            let mut launcher = make_launcher(dispatcher, game, parallel);
            sweep::run(launcher.as_mut(), &logbook)
        }
        Command::Run {
            iterations,
            log,
            dispatcher,
            game,
            parallel,
        } => {
            uctbench::print_build_info();
            let logbook = Logbook::append(log)?;
            let mut launcher = make_launcher(dispatcher, game, parallel);
            runner::run_targets(launcher.as_mut(), &logbook, iterations)
        }
        Command::Stats { label, tag } => {
            let mut stdout = io::stdout().lock();
            stats::scan_dir(Path::new("."), &label, &tag, &mut stdout)
        }
        Command::Play {
            strategy,
            iterations,
            parallel,
            game,
        } => {
            let options = SearchOptions {
                iterations,
                parallelism: parallel.unwrap_or_else(available_parallelism),
                ..SearchOptions::default()
            };
            let mut stdout = io::stdout().lock();
            selfplay::play(game, strategy, &options, &mut stdout)
        }
    }
}
