//! The on-disk case store.
//!
//! A case directory holds `t1.<ext>` (reference volume), `gold.<ext>`
//! (read-only ground truth), `student.<ext>` (learner-writable), and a
//! `case.json` metadata record. Import validates the pair, copies it into a
//! fresh directory, write-protects the gold copy, and synthesizes a blank
//! student mask so the external editor always has a valid starting file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use masklab_core::error::TrainerError;
use masklab_core::model::{CaseMeta, CaseOrigin};
use masklab_core::traits::VolumeCodec;
use masklab_core::volume::Volume;

use crate::codec::{is_volume_path, strip_volume_ext, volume_ext, VOLUME_EXTS};

pub const META_FILE: &str = "case.json";

/// Which root a case was listed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSource {
    /// Synced classroom workspace.
    Workspace,
    /// Learner's own imports.
    Local,
}

impl fmt::Display for CaseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseSource::Workspace => write!(f, "WORK"),
            CaseSource::Local => write!(f, "LOCAL"),
        }
    }
}

/// One training exercise resolved to its on-disk paths.
#[derive(Debug, Clone)]
pub struct Case {
    pub case_id: String,
    pub source: CaseSource,
    pub case_dir: PathBuf,
    pub t1: PathBuf,
    pub gold: PathBuf,
    /// May not exist yet.
    pub student: PathBuf,
    pub meta: CaseMeta,
}

/// Outcome of validating a (reference, gold) pair before import.
#[derive(Debug, Clone, PartialEq)]
pub struct PairValidation {
    /// True when the volumes could not be introspected and only the
    /// extension check ran.
    pub limited: bool,
    pub t1_shape: Option<[usize; 3]>,
    pub gold_shape: Option<[usize; 3]>,
}

/// Outcome of a batch import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub imported: usize,
    pub skipped: usize,
}

/// Check that both paths look like supported volumes and, when decodable,
/// that their first three dimensions agree.
///
/// A volume the codec cannot introspect is accepted with `limited: true`
/// rather than rejected — external tooling may still read it later.
pub fn validate_pair(
    codec: &dyn VolumeCodec,
    t1: &Path,
    gold: &Path,
) -> Result<PairValidation, TrainerError> {
    for p in [t1, gold] {
        if !is_volume_path(p) {
            return Err(TrainerError::NotAVolume(p.to_path_buf()));
        }
        if !p.exists() {
            return Err(TrainerError::MissingInput(p.to_path_buf()));
        }
    }
    let t1_header = codec.read_header(t1);
    let gold_header = codec.read_header(gold);
    match (t1_header, gold_header) {
        (Ok(th), Ok(gh)) => {
            if th.shape != gh.shape {
                return Err(TrainerError::ShapeMismatch {
                    left: th.shape,
                    right: gh.shape,
                });
            }
            Ok(PairValidation {
                limited: false,
                t1_shape: Some(th.shape),
                gold_shape: Some(gh.shape),
            })
        }
        (t, g) => {
            for r in [&t, &g] {
                if let Err(e) = r {
                    if !e.is_skippable() {
                        return Err(TrainerError::Validation(e.to_string()));
                    }
                }
            }
            Ok(PairValidation {
                limited: true,
                t1_shape: t.ok().map(|h| h.shape),
                gold_shape: g.ok().map(|h| h.shape),
            })
        }
    }
}

/// Mark a file read-only. Best effort: the gold mask is tamper-resistant,
/// not tamper-proof, and a failure here must not abort an import.
pub fn set_readonly(path: &Path) {
    let result = fs::metadata(path).and_then(|meta| {
        let mut perms = meta.permissions();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            perms.set_mode(0o444);
        }
        #[cfg(not(unix))]
        perms.set_readonly(true);
        fs::set_permissions(path, perms)
    });
    if let Err(e) = result {
        tracing::warn!("could not write-protect {}: {e}", path.display());
    }
}

/// Generate a filesystem-safe case id from a reference file name.
pub fn make_case_id(reference_name: &str) -> String {
    let stem = strip_volume_ext(reference_name);
    let stem = strip_pair_token(stem, &REFERENCE_TOKENS);
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('_');
    let ts = chrono::Local::now().format("%Y-%m-%d_%H%M%S");
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..4];
    if stem.is_empty() {
        format!("case_{ts}_{suffix}")
    } else {
        format!("{stem}_{ts}_{suffix}")
    }
}

/// Strip a trailing `_token` / `-token` from a file stem, case-insensitive.
fn strip_pair_token<'a>(stem: &'a str, tokens: &[&str]) -> &'a str {
    let lower = stem.to_lowercase();
    for token in tokens {
        for sep in ['_', '-'] {
            let suffix = format!("{sep}{token}");
            if lower.ends_with(&suffix) {
                return &stem[..stem.len() - suffix.len()];
            }
        }
    }
    stem
}

const REFERENCE_TOKENS: [&str; 3] = ["t1", "img", "image"];
const ANNOTATION_TOKENS: [&str; 5] = ["gold", "mask", "lesion", "seg", "label"];

/// Copy a (reference, gold) pair into a fresh case directory under `root`.
///
/// Filesystem failures surface as the operation's error; a partial copy is
/// not rolled back — a later listing excludes the case for its missing
/// gold, effectively quarantining it.
pub fn import_case(
    codec: &dyn VolumeCodec,
    root: &Path,
    t1: &Path,
    gold: &Path,
    origin: CaseOrigin,
    pair_key: Option<&str>,
) -> Result<Case, TrainerError> {
    let validation = validate_pair(codec, t1, gold)?;

    let t1_name = t1.file_name().and_then(|n| n.to_str()).unwrap_or("case");
    let case_id = make_case_id(t1_name);
    let ext = volume_ext(t1_name).unwrap_or(crate::codec::NATIVE_EXT);
    let gold_ext = gold
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(volume_ext)
        .unwrap_or(ext);

    let case_dir = root.join(&case_id);
    fs::create_dir_all(&case_dir).map_err(|e| TrainerError::storage(&case_dir, e))?;

    let t1_dest = case_dir.join(format!("t1{ext}"));
    let gold_dest = case_dir.join(format!("gold{gold_ext}"));
    fs::copy(t1, &t1_dest).map_err(|e| TrainerError::storage(&t1_dest, e))?;
    fs::copy(gold, &gold_dest).map_err(|e| TrainerError::storage(&gold_dest, e))?;
    set_readonly(&gold_dest);

    let mut meta = CaseMeta::new(&case_id, origin);
    meta.pair_key = pair_key.map(str::to_string);
    meta.t1_shape = validation.t1_shape;
    meta.gold_shape = validation.gold_shape;
    meta.imported_at = Some(chrono::Local::now().format("%Y-%m-%d_%H%M%S").to_string());
    write_meta(&case_dir, &meta)?;

    let student_dest = case_dir.join(format!("student{ext}"));
    if !student_dest.exists() {
        ensure_blank_student_mask(codec, &t1_dest, &student_dest);
    }

    load_case(&case_dir, CaseSource::Local).ok_or_else(|| TrainerError::Malformed {
        path: case_dir.clone(),
        detail: "imported case did not list back".into(),
    })
}

/// Synthesize an all-background student mask shaped like the reference, so
/// the external editor always has a valid starting file. Skipped silently
/// when the reference cannot be introspected.
pub fn ensure_blank_student_mask(codec: &dyn VolumeCodec, reference: &Path, student: &Path) {
    if student.exists() {
        return;
    }
    match codec.read_header(reference) {
        Ok(header) => {
            if let Err(e) = codec.write(student, &Volume::blank(&header)) {
                tracing::warn!("could not create blank student mask: {e}");
            }
        }
        Err(e) if e.is_skippable() => {
            tracing::debug!("no blank mask for {}: {e}", reference.display());
        }
        Err(e) => tracing::warn!("could not read reference geometry: {e}"),
    }
}

/// Write the `case.json` record.
pub fn write_meta(case_dir: &Path, meta: &CaseMeta) -> Result<(), TrainerError> {
    let path = case_dir.join(META_FILE);
    let json = serde_json::to_string_pretty(meta)
        .map_err(|e| TrainerError::storage(&path, std::io::Error::other(e)))?;
    fs::write(&path, json).map_err(|e| TrainerError::storage(&path, e))
}

/// Scan a folder for volume files and import every (reference, annotation)
/// pair matched by the filename heuristic.
///
/// Reference key: stem minus a trailing `_t1`/`_img`/`_image` token;
/// annotation key: stem minus a trailing `_gold`/`_mask`/`_lesion`/`_seg`/
/// `_label` token. A pair exists when both keys match. Validation or copy
/// failure on one pair increments `skipped` without aborting the rest.
pub fn import_batch(
    codec: &dyn VolumeCodec,
    root: &Path,
    folder: &Path,
) -> Result<BatchOutcome, TrainerError> {
    if !folder.is_dir() {
        return Err(TrainerError::MissingInput(folder.to_path_buf()));
    }
    let mut references = std::collections::BTreeMap::new();
    let mut annotations = std::collections::BTreeMap::new();

    let entries = fs::read_dir(folder).map_err(|e| TrainerError::storage(folder, e))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || !is_volume_path(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let stem = strip_volume_ext(name);
        let ref_key = strip_pair_token(stem, &REFERENCE_TOKENS);
        let ann_key = strip_pair_token(stem, &ANNOTATION_TOKENS);
        if ref_key != stem {
            references.insert(ref_key.to_string(), path.clone());
        } else if ann_key != stem {
            annotations.insert(ann_key.to_string(), path.clone());
        }
    }

    let mut outcome = BatchOutcome::default();
    for (key, t1) in &references {
        let Some(gold) = annotations.get(key) else {
            continue; // unpaired reference, ignored rather than an error
        };
        match import_case(codec, root, t1, gold, CaseOrigin::BatchImport, Some(key)) {
            Ok(case) => {
                tracing::info!("imported case {}", case.case_id);
                outcome.imported += 1;
            }
            Err(e) => {
                tracing::warn!("skipping pair '{key}': {e}");
                outcome.skipped += 1;
            }
        }
    }
    Ok(outcome)
}

/// Find `<stem>.<ext>` in a case directory for any recognized extension.
fn find_volume_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    VOLUME_EXTS
        .iter()
        .map(|ext| dir.join(format!("{stem}{ext}")))
        .find(|p| p.exists())
}

/// Load one case directory, or `None` when it is incomplete or corrupt.
pub fn load_case(case_dir: &Path, source: CaseSource) -> Option<Case> {
    let meta_path = case_dir.join(META_FILE);
    let raw = fs::read_to_string(&meta_path).ok()?;
    let meta: CaseMeta = serde_json::from_str(&raw).ok()?;

    let t1 = find_volume_file(case_dir, "t1")?;
    let gold = find_volume_file(case_dir, "gold")?;
    let ext = t1
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(volume_ext)
        .unwrap_or(crate::codec::NATIVE_EXT);
    let student = find_volume_file(case_dir, "student")
        .unwrap_or_else(|| case_dir.join(format!("student{ext}")));

    let case_id = if meta.case_id.is_empty() {
        case_dir.file_name()?.to_str()?.to_string()
    } else {
        meta.case_id.clone()
    };

    Some(Case {
        case_id,
        source,
        case_dir: case_dir.to_path_buf(),
        t1,
        gold,
        student,
        meta,
    })
}

/// List the valid cases under one or more roots, each root's entries
/// sorted case-insensitively by directory name. Incomplete directories are
/// silently excluded.
pub fn list_cases(roots: &[(PathBuf, CaseSource)]) -> Vec<Case> {
    let mut out = Vec::new();
    for (root, source) in roots {
        let Ok(entries) = fs::read_dir(root) else {
            continue;
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
        out.extend(dirs.iter().filter_map(|d| load_case(d, *source)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonVolumeCodec;
    use masklab_core::volume::VolumeHeader;

    fn write_volume(path: &Path, shape: [usize; 3]) {
        let codec = JsonVolumeCodec;
        let v = Volume::blank(&VolumeHeader {
            shape,
            spacing_mm: [1.0; 3],
            affine: VolumeHeader::identity_affine([1.0; 3]),
        });
        codec.write(path, &v).unwrap();
    }

    #[test]
    fn validate_pair_detects_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let t1 = dir.path().join("a_t1.mvol");
        let gold = dir.path().join("a_gold.mvol");
        write_volume(&t1, [4, 4, 4]);
        write_volume(&gold, [4, 4, 5]);
        let err = validate_pair(&JsonVolumeCodec, &t1, &gold).unwrap_err();
        assert!(matches!(err, TrainerError::ShapeMismatch { .. }));
    }

    #[test]
    fn validate_pair_rejects_non_volumes() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "x").unwrap();
        let gold = dir.path().join("a_gold.mvol");
        write_volume(&gold, [4, 4, 4]);
        let err = validate_pair(&JsonVolumeCodec, &txt, &gold).unwrap_err();
        assert!(matches!(err, TrainerError::NotAVolume(_)));
    }

    #[test]
    fn validate_pair_degrades_for_opaque_formats() {
        let dir = tempfile::tempdir().unwrap();
        let t1 = dir.path().join("a_t1.nii.gz");
        let gold = dir.path().join("a_gold.nii.gz");
        std::fs::write(&t1, b"opaque").unwrap();
        std::fs::write(&gold, b"opaque").unwrap();
        let v = validate_pair(&JsonVolumeCodec, &t1, &gold).unwrap();
        assert!(v.limited);
        assert!(v.t1_shape.is_none());
    }

    #[test]
    fn import_case_lays_out_directory() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let t1 = src.path().join("case01_t1.mvol");
        let gold = src.path().join("case01_gold.mvol");
        write_volume(&t1, [4, 4, 4]);
        write_volume(&gold, [4, 4, 4]);

        let case = import_case(
            &JsonVolumeCodec,
            root.path(),
            &t1,
            &gold,
            CaseOrigin::LocalUpload,
            None,
        )
        .unwrap();

        assert!(case.case_id.starts_with("case01_"));
        assert!(case.t1.exists());
        assert!(case.gold.exists());
        assert!(case.student.exists(), "blank student mask synthesized");
        assert_eq!(case.meta.origin, Some(CaseOrigin::LocalUpload));
        assert_eq!(case.meta.t1_shape, Some([4, 4, 4]));

        let student = JsonVolumeCodec.read(&case.student).unwrap();
        assert_eq!(student.foreground_count(), 0);
        assert_eq!(student.shape, [4, 4, 4]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&case.gold).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o444);
        }
    }

    #[test]
    fn batch_import_pairs_by_filename() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        write_volume(&src.path().join("A_t1.mvol"), [4, 4, 4]);
        write_volume(&src.path().join("A_gold.mvol"), [4, 4, 4]);
        write_volume(&src.path().join("B_t1.mvol"), [4, 4, 4]); // unpaired

        let outcome = import_batch(&JsonVolumeCodec, root.path(), src.path()).unwrap();
        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.skipped, 0);

        let cases = list_cases(&[(root.path().to_path_buf(), CaseSource::Local)]);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].meta.pair_key.as_deref(), Some("A"));
    }

    #[test]
    fn batch_import_skips_invalid_pair_and_continues() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        write_volume(&src.path().join("ok_t1.mvol"), [4, 4, 4]);
        write_volume(&src.path().join("ok_mask.mvol"), [4, 4, 4]);
        write_volume(&src.path().join("bad_t1.mvol"), [4, 4, 4]);
        write_volume(&src.path().join("bad_seg.mvol"), [5, 5, 5]); // mismatched

        let outcome = import_batch(&JsonVolumeCodec, root.path(), src.path()).unwrap();
        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn listing_excludes_incomplete_cases() {
        let root = tempfile::tempdir().unwrap();
        // metadata but no volumes
        let broken = root.path().join("broken");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join(META_FILE), r#"{"case_id":"broken"}"#).unwrap();
        // no metadata at all
        std::fs::create_dir_all(root.path().join("empty")).unwrap();

        let cases = list_cases(&[(root.path().to_path_buf(), CaseSource::Local)]);
        assert!(cases.is_empty());
    }

    #[test]
    fn listing_is_sorted_case_insensitively() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        for name in ["zeta", "Alpha", "beta"] {
            let t1 = src.path().join(format!("{name}_t1.mvol"));
            let gold = src.path().join(format!("{name}_gold.mvol"));
            write_volume(&t1, [2, 2, 2]);
            write_volume(&gold, [2, 2, 2]);
            import_case(
                &JsonVolumeCodec,
                root.path(),
                &t1,
                &gold,
                CaseOrigin::LocalUpload,
                None,
            )
            .unwrap();
        }
        let cases = list_cases(&[(root.path().to_path_buf(), CaseSource::Local)]);
        let ids: Vec<&str> = cases.iter().map(|c| c.case_id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids[0].starts_with("Alpha"));
        assert!(ids[1].starts_with("beta"));
        assert!(ids[2].starts_with("zeta"));
    }

    #[test]
    fn pair_token_stripping() {
        assert_eq!(strip_pair_token("CASE01_t1", &REFERENCE_TOKENS), "CASE01");
        assert_eq!(strip_pair_token("CASE01-T1", &REFERENCE_TOKENS), "CASE01");
        assert_eq!(strip_pair_token("CASE01_gold", &ANNOTATION_TOKENS), "CASE01");
        assert_eq!(strip_pair_token("plain", &REFERENCE_TOKENS), "plain");
    }
}
