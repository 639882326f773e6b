//! Change detection for the student mask.
//!
//! The external editor owns the file, so the only reliable signal is the
//! filesystem: poll the mask's modification time and report a change once
//! it has been stable for a debounce window. The first observation primes
//! the baseline without firing, so opening a case never scores stale work.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Writes within this window are treated as one save in progress.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Suggested polling cadence for interactive callers.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1200);

/// Polls one student mask file for settled modifications.
#[derive(Debug)]
pub struct MaskWatch {
    path: PathBuf,
    baseline: Option<SystemTime>,
    pending: Option<SystemTime>,
    debounce: Duration,
}

impl MaskWatch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            baseline: None,
            pending: None,
            debounce: DEBOUNCE,
        }
    }

    #[cfg(test)]
    fn with_debounce(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            path: path.into(),
            baseline: None,
            pending: None,
            debounce,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mtime(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
    }

    /// One poll tick. Returns true when a change has settled.
    ///
    /// A change is reported only after the modification time has stopped
    /// moving and the debounce window has elapsed since the observed write.
    /// An unreadable or missing file is treated as unchanged.
    pub fn poll(&mut self) -> bool {
        let Some(mtime) = self.mtime() else {
            return false;
        };
        let Some(baseline) = self.baseline else {
            self.baseline = Some(mtime);
            return false;
        };
        if mtime == baseline {
            self.pending = None;
            return false;
        }
        match self.pending {
            // mtime still moving, restart the window
            Some(pending) if pending != mtime => {
                self.pending = Some(mtime);
                false
            }
            Some(_) => {
                let settled = SystemTime::now()
                    .duration_since(mtime)
                    .map(|age| age >= self.debounce)
                    .unwrap_or(false);
                if settled {
                    self.baseline = Some(mtime);
                    self.pending = None;
                }
                settled
            }
            None => {
                self.pending = Some(mtime);
                false
            }
        }
    }

    /// Adopt the file's current state without reporting a change. Used
    /// after an explicit manual scoring pass.
    pub fn rearm(&mut self) {
        self.baseline = self.mtime().or(self.baseline);
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_primes_without_firing() {
        let dir = tempfile::tempdir().unwrap();
        let mask = dir.path().join("student.mvol");
        std::fs::write(&mask, "v1").unwrap();
        let mut watch = MaskWatch::with_debounce(&mask, Duration::ZERO);
        assert!(!watch.poll());
        assert!(!watch.poll());
    }

    #[test]
    fn settled_write_fires_once() {
        let dir = tempfile::tempdir().unwrap();
        let mask = dir.path().join("student.mvol");
        std::fs::write(&mask, "v1").unwrap();
        let mut watch = MaskWatch::with_debounce(&mask, Duration::ZERO);
        watch.poll();

        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&mask, "v2").unwrap();
        assert!(!watch.poll(), "first tick after a write only observes it");
        assert!(watch.poll(), "second tick sees it settled");
        assert!(!watch.poll(), "no repeat fire for the same write");
    }

    #[test]
    fn debounce_defers_until_window_elapses() {
        let dir = tempfile::tempdir().unwrap();
        let mask = dir.path().join("student.mvol");
        std::fs::write(&mask, "v1").unwrap();
        let mut watch = MaskWatch::with_debounce(&mask, Duration::from_millis(80));
        watch.poll();

        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&mask, "v2").unwrap();
        assert!(!watch.poll());
        assert!(!watch.poll(), "still inside the debounce window");
        std::thread::sleep(Duration::from_millis(100));
        assert!(watch.poll());
    }

    #[test]
    fn missing_file_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut watch = MaskWatch::new(dir.path().join("absent.mvol"));
        assert!(!watch.poll());
    }

    #[test]
    fn rearm_suppresses_pending_change() {
        let dir = tempfile::tempdir().unwrap();
        let mask = dir.path().join("student.mvol");
        std::fs::write(&mask, "v1").unwrap();
        let mut watch = MaskWatch::with_debounce(&mask, Duration::ZERO);
        watch.poll();

        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&mask, "v2").unwrap();
        watch.rearm();
        assert!(!watch.poll());
    }
}
