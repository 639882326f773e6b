//! Teacher PIN.
//!
//! A salted SHA-256 digest stored in plain sight at
//! `config/teacher_pin.json`. This gates the teacher UI against casual
//! misuse, nothing more; anyone with write access to the share can replace
//! the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use masklab_core::error::TrainerError;

pub const PIN_FILE: &str = "teacher_pin.json";
const MIN_PIN_LEN: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PinRecord {
    salt: String,
    hash: String,
}

pub fn pin_path(root: &Path) -> PathBuf {
    root.join("config").join(PIN_FILE)
}

pub fn pin_is_set(root: &Path) -> bool {
    pin_path(root).exists()
}

fn pin_hash(salt: &str, pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"|");
    hasher.update(pin.as_bytes());
    hex::encode(hasher.finalize())
}

/// Set or replace the teacher PIN.
pub fn set_pin(root: &Path, pin: &str) -> Result<(), TrainerError> {
    if pin.len() < MIN_PIN_LEN {
        return Err(TrainerError::Validation(format!(
            "PIN must be at least {MIN_PIN_LEN} characters"
        )));
    }
    let salt = uuid::Uuid::new_v4().simple().to_string();
    let record = PinRecord {
        hash: pin_hash(&salt, pin),
        salt,
    };
    let path = pin_path(root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TrainerError::storage(parent, e))?;
    }
    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| TrainerError::storage(&path, std::io::Error::other(e)))?;
    std::fs::write(&path, json).map_err(|e| TrainerError::storage(&path, e))
}

/// Check a PIN against the stored record. A missing or malformed record
/// verifies false rather than erroring.
pub fn verify_pin(root: &Path, pin: &str) -> bool {
    let Ok(raw) = std::fs::read_to_string(pin_path(root)) else {
        return false;
    };
    let Ok(record) = serde_json::from_str::<PinRecord>(&raw) else {
        return false;
    };
    !record.salt.is_empty()
        && !record.hash.is_empty()
        && pin_hash(&record.salt, pin) == record.hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        set_pin(dir.path(), "4321").unwrap();
        assert!(pin_is_set(dir.path()));
        assert!(verify_pin(dir.path(), "4321"));
        assert!(!verify_pin(dir.path(), "1234"));
    }

    #[test]
    fn short_pin_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = set_pin(dir.path(), "123").unwrap_err();
        assert!(matches!(err, TrainerError::Validation(_)));
        assert!(!pin_is_set(dir.path()));
    }

    #[test]
    fn replacing_pin_invalidates_old_one() {
        let dir = tempfile::tempdir().unwrap();
        set_pin(dir.path(), "first-pin").unwrap();
        set_pin(dir.path(), "second-pin").unwrap();
        assert!(!verify_pin(dir.path(), "first-pin"));
        assert!(verify_pin(dir.path(), "second-pin"));
    }

    #[test]
    fn missing_or_malformed_record_verifies_false() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!verify_pin(dir.path(), "anything"));
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(pin_path(dir.path()), "not json").unwrap();
        assert!(!verify_pin(dir.path(), "anything"));
    }

    #[test]
    fn stored_record_never_contains_the_pin() {
        let dir = tempfile::tempdir().unwrap();
        set_pin(dir.path(), "super-secret-pin").unwrap();
        let raw = std::fs::read_to_string(pin_path(dir.path())).unwrap();
        assert!(!raw.contains("super-secret-pin"));
    }
}
