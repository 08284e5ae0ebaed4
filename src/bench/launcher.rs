//! How benchmark targets get executed. The harness depends on the
//! [`Launcher`] capability rather than on a concrete invocation mechanism,
//! so tests can record launches instead of running anything and operators
//! can swap in an external dispatcher script.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use anyhow::{ensure, Context, Result};

use crate::search::{SearchOptions, Strategy, DEFAULT_ITERATIONS};
use crate::selfplay::{self, Game};

/// Launches one benchmark target with an optional iteration limit.
pub trait Launcher {
    /// Runs the target to completion. An `Err` means the target failed;
    /// callers decide whether that is fatal (for the harness it never is).
    fn launch(&mut self, target: Strategy, iterations: Option<u64>) -> Result<()>;
}

/// Delegates to an external dispatcher command, e.g. a `run.sh` that wraps
/// the target with GNU `time -v` and redirects its output into a log file.
/// The dispatcher is invoked as `<dispatcher> <target>`, with `-i <limit>`
/// appended when a limit was supplied.
pub struct CommandLauncher {
    dispatcher: PathBuf,
}

impl CommandLauncher {
    /// Launches targets through the given dispatcher program.
    #[must_use]
    pub fn new(dispatcher: impl Into<PathBuf>) -> Self {
        Self {
            dispatcher: dispatcher.into(),
        }
    }
}

impl Launcher for CommandLauncher {
    fn launch(&mut self, target: Strategy, iterations: Option<u64>) -> Result<()> {
        let mut command = Command::new(&self.dispatcher);
        command.arg(target.name());
        if let Some(limit) = iterations {
            command.arg("-i").arg(limit.to_string());
        }
        let status = command.status().with_context(|| {
            format!(
                "failed to launch {} for {target}",
                self.dispatcher.display()
            )
        })?;
        ensure!(status.success(), "dispatcher failed for {target}: {status}");
        Ok(())
    }
}

/// Runs the target in-process: one self-play game per launch, the whole
/// trace written to `<target>.log` in the output directory, followed by
/// timing summary lines in the same textual shape GNU `time -v` prints, so
/// the statistics extractor reads both kinds of log alike.
pub struct SelfPlayLauncher {
    game: Game,
    parallelism: usize,
    output_dir: PathBuf,
}

impl SelfPlayLauncher {
    /// Benchmarks the given game, writing one log per target into
    /// `output_dir`.
    #[must_use]
    pub fn new(game: Game, parallelism: usize, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            game,
            parallelism,
            output_dir: output_dir.into(),
        }
    }
}

impl Launcher for SelfPlayLauncher {
    fn launch(&mut self, target: Strategy, iterations: Option<u64>) -> Result<()> {
        let path = self.output_dir.join(format!("{target}.log"));
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut log = BufWriter::new(file);

        let options = SearchOptions {
            iterations: iterations.unwrap_or(DEFAULT_ITERATIONS),
            parallelism: self.parallelism,
            ..SearchOptions::default()
        };

        let wall = Instant::now();
        let (user_before, system_before) = cpu_times();
        selfplay::play(self.game, target, &options, &mut log)?;
        let (user_after, system_after) = cpu_times();
        let wall = wall.elapsed().as_secs_f64();

        let user = user_after - user_before;
        let system = system_after - system_before;
        let percent = if wall > 0.0 {
            ((user + system) / wall * 100.0).round()
        } else {
            0.0
        };
        writeln!(log, "User time (seconds): {user:.2}")?;
        writeln!(log, "System time (seconds): {system:.2}")?;
        writeln!(log, "Percent of CPU this job got: {percent:.0}%")?;
        log.flush()?;
        Ok(())
    }
}

/// Cumulative user and system CPU seconds of this process.
#[cfg(unix)]
#[allow(clippy::cast_precision_loss)]
fn cpu_times() -> (f64, f64) {
    fn seconds(time: libc::timeval) -> f64 {
        time.tv_sec as f64 + time.tv_usec as f64 / 1_000_000.0
    }
    let mut usage = unsafe { std::mem::zeroed::<libc::rusage>() };
    // SAFETY: getrusage only writes into the struct handed to it.
    let status = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if status == 0 {
        (seconds(usage.ru_utime), seconds(usage.ru_stime))
    } else {
        (0.0, 0.0)
    }
}

#[cfg(not(unix))]
fn cpu_times() -> (f64, f64) {
    (0.0, 0.0)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::stats;

    #[test]
    fn missing_dispatcher_is_an_error() {
        let mut launcher = CommandLauncher::new("/definitely/not/a/dispatcher");
        assert!(launcher.launch(Strategy::Plain, Some(16)).is_err());
    }

    #[test]
    fn self_play_log_is_summarizable() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = SelfPlayLauncher::new(Game::Nim, 1, dir.path());
        launcher.launch(Strategy::Plain, Some(10)).unwrap();

        let text = fs::read_to_string(dir.path().join("plain.log")).unwrap();
        assert!(text.starts_with("Max iterations: 10\n"));
        assert!(text.contains("User time (seconds): "));
        assert!(text.contains("Percent of CPU this job got: "));

        let fields = stats::scrape(&text);
        assert_eq!(fields.iterations.as_deref(), Some("10"));
        assert!(fields.cpu_percent.is_some());
        assert!(fields.mean_depth.is_some());
        assert!(stats::format_row("uct", "tag", &fields).is_some());
    }

    #[test]
    fn launch_without_a_limit_uses_the_default_budget() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = SelfPlayLauncher::new(Game::Nim, 1, dir.path());
        launcher.launch(Strategy::Plain, None).unwrap();
        let text = fs::read_to_string(dir.path().join("plain.log")).unwrap();
        assert!(text.starts_with(&format!("Max iterations: {DEFAULT_ITERATIONS}\n")));
    }
}
