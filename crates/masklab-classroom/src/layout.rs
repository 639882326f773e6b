//! The shared-tree layout.
//!
//! ```text
//! <share>/MaskLab/
//!   config/teacher_pin.json
//!   classrooms/<CODE>/
//!     cases/<case_id>/...
//!     config.json                 class policy
//!     progress/attempts/<user>/   per-student ledgers
//!     materials_protected/
//!   updates/
//! ```
//!
//! Every function takes the resolved root; [`resolve_share_root`] is the
//! only place that knows about the `MaskLab` marker directory.

use std::path::{Path, PathBuf};

use masklab_core::error::TrainerError;
use masklab_core::model::Policy;

pub const SHARE_DIR_NAME: &str = "MaskLab";
pub const POLICY_FILE: &str = "config.json";

/// Turn a user-selected folder into the classroom tree root, creating the
/// layout if needed. Selecting either the share itself or an existing
/// `MaskLab` subtree inside it lands on the same root.
pub fn resolve_share_root(selected: &Path) -> Result<PathBuf, TrainerError> {
    let root = if selected
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.eq_ignore_ascii_case(SHARE_DIR_NAME))
        .unwrap_or(false)
    {
        selected.to_path_buf()
    } else {
        selected.join(SHARE_DIR_NAME)
    };
    ensure_layout(&root)?;
    Ok(root)
}

/// Create the top-level subtree. Idempotent.
pub fn ensure_layout(root: &Path) -> Result<(), TrainerError> {
    for sub in ["config", "classrooms", "updates"] {
        let dir = root.join(sub);
        std::fs::create_dir_all(&dir).map_err(|e| TrainerError::storage(&dir, e))?;
    }
    Ok(())
}

/// Canonical class code: trimmed, uppercased, restricted to alphanumerics
/// plus `-` and `_`.
pub fn normalize_code(code: &str) -> String {
    code.trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

pub fn class_dir(root: &Path, code: &str) -> PathBuf {
    root.join("classrooms").join(normalize_code(code))
}

pub fn class_exists(root: &Path, code: &str) -> bool {
    class_dir(root, code).is_dir()
}

pub fn class_cases_dir(root: &Path, code: &str) -> PathBuf {
    class_dir(root, code).join("cases")
}

/// Where one student's attempts land inside the shared tree.
pub fn attempts_root(root: &Path, code: &str, user: &str) -> PathBuf {
    class_dir(root, code).join("progress").join("attempts").join(user)
}

/// All per-student attempt directories of a class.
pub fn list_attempt_dirs(root: &Path, code: &str) -> Vec<PathBuf> {
    let base = class_dir(root, code).join("progress").join("attempts");
    let Ok(entries) = std::fs::read_dir(&base) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

/// Provision a classroom, seeding the default policy only when absent so a
/// re-run never clobbers a teacher's edits.
pub fn ensure_classroom(root: &Path, code: &str) -> Result<PathBuf, TrainerError> {
    let cd = class_dir(root, code);
    for sub in ["cases", "progress/attempts", "materials_protected"] {
        let dir = cd.join(sub);
        std::fs::create_dir_all(&dir).map_err(|e| TrainerError::storage(&dir, e))?;
    }
    let policy_path = cd.join(POLICY_FILE);
    if !policy_path.exists() {
        save_policy(root, code, &Policy::default())?;
    }
    Ok(cd)
}

/// Load the class policy. Absent or malformed files yield `None` so a
/// half-written policy on a flaky share degrades instead of erroring.
pub fn load_policy(root: &Path, code: &str) -> Option<Policy> {
    let path = class_dir(root, code).join(POLICY_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(policy) => Some(policy),
        Err(e) => {
            tracing::warn!("unreadable policy at {}: {e}", path.display());
            None
        }
    }
}

pub fn save_policy(root: &Path, code: &str, policy: &Policy) -> Result<(), TrainerError> {
    let path = class_dir(root, code).join(POLICY_FILE);
    let json = serde_json::to_string_pretty(policy)
        .map_err(|e| TrainerError::storage(&path, std::io::Error::other(e)))?;
    std::fs::write(&path, json).map_err(|e| TrainerError::storage(&path, e))
}

/// Case directories of a class, sorted case-insensitively by name.
pub fn list_class_cases(root: &Path, code: &str) -> Vec<PathBuf> {
    let cases = class_cases_dir(root, code);
    let Ok(entries) = std::fs::read_dir(&cases) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort_by_key(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_lowercase())
            .unwrap_or_default()
    });
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_codes() {
        assert_eq!(normalize_code("  hummel 2026! "), "HUMMEL2026");
        assert_eq!(normalize_code("neuro-intro_b"), "NEURO-INTRO_B");
        assert_eq!(normalize_code(""), "");
    }

    #[test]
    fn resolve_is_idempotent_on_marker_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = resolve_share_root(dir.path()).unwrap();
        assert_eq!(root, dir.path().join(SHARE_DIR_NAME));
        assert!(root.join("config").is_dir());
        assert!(root.join("classrooms").is_dir());
        assert!(root.join("updates").is_dir());

        // selecting the marker directory itself resolves to the same root
        let again = resolve_share_root(&root).unwrap();
        assert_eq!(again, root);
    }

    #[test]
    fn ensure_classroom_seeds_policy_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = resolve_share_root(dir.path()).unwrap();
        ensure_classroom(&root, "hummel2026").unwrap();
        assert!(class_exists(&root, "HUMMEL2026"));

        let policy = load_policy(&root, "HUMMEL2026").unwrap();
        assert_eq!(policy.min_voxels, 10);

        let custom = Policy {
            min_voxels: 42,
            ..Policy::default()
        };
        save_policy(&root, "HUMMEL2026", &custom).unwrap();
        // reprovision must not reset the teacher's policy
        ensure_classroom(&root, "HUMMEL2026").unwrap();
        assert_eq!(load_policy(&root, "HUMMEL2026").unwrap().min_voxels, 42);
    }

    #[test]
    fn malformed_policy_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let root = resolve_share_root(dir.path()).unwrap();
        ensure_classroom(&root, "C1").unwrap();
        std::fs::write(class_dir(&root, "C1").join(POLICY_FILE), "{oops").unwrap();
        assert!(load_policy(&root, "C1").is_none());
    }

    #[test]
    fn attempts_root_is_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let root = resolve_share_root(dir.path()).unwrap();
        let ada = attempts_root(&root, "c1", "ada");
        assert!(ada.ends_with("classrooms/C1/progress/attempts/ada"));
    }
}
