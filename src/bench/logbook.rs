//! The shared status log. Both the sweep driver and the test runner announce
//! what they are about to do; every line goes to stdout for the operator and
//! to the log file for posterity.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Append-only status log. The file handle is opened, appended and closed
/// per line, so every line reaches the disk even when the process is
/// interrupted mid-sweep.
pub struct Logbook {
    path: PathBuf,
}

impl Logbook {
    /// Opens the log, truncating whatever an earlier sweep left behind. Only
    /// the start of a whole sweep truncates; everything after appends.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::write(&path, "").with_context(|| format!("failed to truncate {}", path.display()))?;
        Ok(Self { path })
    }

    /// Opens the log for appending, creating it when missing.
    pub fn append(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        // Probe writability up front instead of failing on the first line.
        drop(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?,
        );
        Ok(Self { path })
    }

    /// Where the lines go.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prints a status line and appends it to the log file.
    pub fn record(&self, line: &str) -> Result<()> {
        println!("{line}");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn create_truncates_and_record_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.log");
        fs::write(&path, "stale content from the last sweep\n").unwrap();

        let logbook = Logbook::create(&path).unwrap();
        logbook.record("first").unwrap();
        logbook.record("second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn append_preserves_earlier_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.log");
        fs::write(&path, "earlier\n").unwrap();

        let logbook = Logbook::append(&path).unwrap();
        logbook.record("later").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier\nlater\n");
    }
}
