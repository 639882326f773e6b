//! Append-only attempt ledger.
//!
//! Every evaluation is persisted in three views under one directory:
//! a per-attempt pretty JSON document, a JSONL stream, and a CSV table.
//! A failed write of any view is logged and swallowed so that a broken
//! ledger (full disk, yanked share) never interrupts a practice session.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use masklab_core::error::TrainerError;
use masklab_core::model::Attempt;

pub const JSONL_FILE: &str = "attempts.jsonl";
pub const CSV_FILE: &str = "attempts.csv";

/// An attempt ledger rooted at one directory.
#[derive(Debug, Clone)]
pub struct Ledger {
    root: PathBuf,
}

impl Ledger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn jsonl_path(&self) -> PathBuf {
        self.root.join(JSONL_FILE)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.root.join(CSV_FILE)
    }

    /// Persist one attempt into all three views.
    ///
    /// Returns the number of views that were written. Each view failure is
    /// logged with `tracing::warn!` and swallowed; only a zero return means
    /// the attempt left no trace at all.
    pub fn record(&self, attempt: &Attempt) -> usize {
        let mut written = 0;
        for result in [
            self.write_json(attempt),
            self.append_jsonl(attempt),
            self.append_csv(attempt),
        ] {
            match result {
                Ok(()) => written += 1,
                Err(e) => tracing::warn!("ledger write failed: {e}"),
            }
        }
        written
    }

    fn ensure_root(&self) -> Result<(), TrainerError> {
        fs::create_dir_all(&self.root).map_err(|e| TrainerError::LedgerWrite {
            path: self.root.clone(),
            source: e,
        })
    }

    fn write_json(&self, attempt: &Attempt) -> Result<(), TrainerError> {
        self.ensure_root()?;
        let path = self
            .root
            .join(format!("{}_{}.json", attempt.timestamp, attempt.attempt_id));
        let json = serde_json::to_string_pretty(attempt).map_err(|e| TrainerError::LedgerWrite {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;
        fs::write(&path, json).map_err(|e| TrainerError::LedgerWrite { path, source: e })
    }

    fn append_jsonl(&self, attempt: &Attempt) -> Result<(), TrainerError> {
        self.ensure_root()?;
        let path = self.jsonl_path();
        let line = serde_json::to_string(attempt).map_err(|e| TrainerError::LedgerWrite {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TrainerError::LedgerWrite {
                path: path.clone(),
                source: e,
            })?;
        writeln!(file, "{line}").map_err(|e| TrainerError::LedgerWrite { path, source: e })
    }

    fn append_csv(&self, attempt: &Attempt) -> Result<(), TrainerError> {
        self.ensure_root()?;
        let path = self.csv_path();
        let fresh = !path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TrainerError::LedgerWrite {
                path: path.clone(),
                source: e,
            })?;
        let write = (|| {
            if fresh {
                writeln!(file, "{}", Attempt::csv_header())?;
            }
            writeln!(file, "{}", attempt.csv_row())
        })();
        write.map_err(|e| TrainerError::LedgerWrite { path, source: e })
    }

    /// All attempts in the JSONL stream, oldest first. Malformed lines are
    /// counted, logged, and skipped. A missing stream reads as empty.
    pub fn read_all(&self) -> Vec<Attempt> {
        read_jsonl(&self.jsonl_path())
    }
}

/// Parse an attempts JSONL file, skipping malformed lines.
pub fn read_jsonl(path: &Path) -> Vec<Attempt> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    let mut attempts = Vec::new();
    let mut bad = 0usize;
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Attempt>(line) {
            Ok(a) => attempts.push(a),
            Err(_) => bad += 1,
        }
    }
    if bad > 0 {
        tracing::warn!("{bad} malformed line(s) in {}", path.display());
    }
    attempts
}
