//! The sweep driver: walks the iteration budget over powers of two and runs
//! the whole benchmark suite once per budget. A failed step never stops the
//! sweep; the shared status log accumulates one announcement per budget
//! either way.

use anyhow::Result;
use log::warn;

use crate::bench::launcher::Launcher;
use crate::bench::logbook::Logbook;
use crate::bench::runner;

/// Smallest swept budget exponent: 2^10 = 1024 iterations.
pub const MIN_EXPONENT: u32 = 10;
/// Largest swept budget exponent: 2^30, about a billion iterations.
pub const MAX_EXPONENT: u32 = 30;

/// Iterates the exponent range, announcing each budget on the status log and
/// handing it to `invoke`. A failing invocation is logged and the sweep
/// moves on to the next budget; the driver itself only fails when it cannot
/// write its own status lines.
pub fn run_with(logbook: &Logbook, mut invoke: impl FnMut(u64) -> Result<()>) -> Result<()> {
    for exponent in MIN_EXPONENT..=MAX_EXPONENT {
        let iterations = 1u64 << exponent;
        logbook.record(&format!("=== max iterations: {iterations} (2^{exponent}) ==="))?;
        if let Err(error) = invoke(iterations) {
            warn!("sweep step with {iterations} iterations failed: {error:#}");
        }
    }
    Ok(())
}

/// The standard sweep: every budget goes through the test runner.
pub fn run(launcher: &mut dyn Launcher, logbook: &Logbook) -> Result<()> {
    run_with(logbook, |iterations| {
        runner::run_targets(launcher, logbook, Some(iterations))
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::bail;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sweeps_every_power_of_two_once() {
        let dir = tempfile::tempdir().unwrap();
        let logbook = Logbook::create(dir.path().join("status.log")).unwrap();

        let mut budgets = Vec::new();
        run_with(&logbook, |iterations| {
            budgets.push(iterations);
            Ok(())
        })
        .unwrap();

        let expected: Vec<u64> = (MIN_EXPONENT..=MAX_EXPONENT).map(|i| 1 << i).collect();
        assert_eq!(budgets, expected);
        assert_eq!(budgets.len(), 21);
        assert_eq!(budgets.first(), Some(&1024));
        assert_eq!(budgets.last(), Some(&(1 << 30)));
    }

    #[test]
    fn failing_steps_do_not_stop_the_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let logbook = Logbook::create(dir.path().join("status.log")).unwrap();

        let mut calls = 0;
        run_with(&logbook, |_| {
            calls += 1;
            bail!("injected failure");
        })
        .unwrap();
        assert_eq!(calls, 21);

        // Every budget is still announced in the shared log.
        let status = fs::read_to_string(logbook.path()).unwrap();
        assert_eq!(status.matches("=== max iterations: ").count(), 21);
        assert!(status.contains("=== max iterations: 1073741824 (2^30) ==="));
    }
}
