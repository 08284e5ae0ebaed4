//! The test runner: one pass over the five benchmark targets in their fixed
//! order. The order matters only for log readability. No result of a
//! launched target is inspected, retried or aggregated here; scraping the
//! logs afterwards is the statistics extractor's job.

use anyhow::Result;
use log::warn;

use crate::bench::launcher::Launcher;
use crate::bench::logbook::Logbook;
use crate::search::Strategy;

/// Launches every target once, announcing each with a timestamped status
/// line. Passes the iteration limit through iff one was supplied. Target
/// failures are logged and skipped; only failing to write the status log is
/// fatal.
pub fn run_targets(
    launcher: &mut dyn Launcher,
    logbook: &Logbook,
    iterations: Option<u64>,
) -> Result<()> {
    for target in Strategy::ALL {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        logbook.record(&format!("[{timestamp}] Running {target}..."))?;
        if let Err(error) = launcher.launch(target, iterations) {
            warn!("target {target} failed: {error:#}");
        }
    }
    Ok(())
}
