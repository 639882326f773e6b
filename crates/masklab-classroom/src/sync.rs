//! Case exchange between the shared tree and the learner's workspace.

use std::path::Path;

use masklab_core::error::TrainerError;
use masklab_core::model::CaseOrigin;
use masklab_core::traits::VolumeCodec;
use masklab_store::case::{self, Case, CaseSource};

use crate::layout;

/// Outcome of a one-way sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    pub synced: usize,
    /// Already present locally, or failed and skipped.
    pub skipped: usize,
}

/// Teacher upload: validate and import a (reference, gold) pair straight
/// into the class's shared cases directory.
pub fn upload_case(
    codec: &dyn VolumeCodec,
    root: &Path,
    code: &str,
    t1: &Path,
    gold: &Path,
) -> Result<Case, TrainerError> {
    layout::ensure_classroom(root, code)?;
    let cases_dir = layout::class_cases_dir(root, code);
    case::import_case(codec, &cases_dir, t1, gold, CaseOrigin::ClassroomUpload, None)
}

/// Student sync: copy every class case the workspace does not yet hold.
///
/// One-way and additive. Existing local copies are never touched, so a
/// re-uploaded case under the same id will not refresh a stale sync; the
/// teacher's recourse is uploading under a new id. A failure on one case
/// is logged and counted as skipped without aborting the rest.
pub fn sync_cases(root: &Path, code: &str, workspace: &Path) -> Result<SyncOutcome, TrainerError> {
    std::fs::create_dir_all(workspace).map_err(|e| TrainerError::storage(workspace, e))?;
    let mut outcome = SyncOutcome::default();
    for src in layout::list_class_cases(root, code) {
        let Some(name) = src.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let dest = workspace.join(&name);
        if dest.exists() {
            outcome.skipped += 1;
            continue;
        }
        match copy_case_dir(&src, &dest) {
            Ok(()) => {
                finalize_synced_case(&dest);
                tracing::info!("synced case {name}");
                outcome.synced += 1;
            }
            Err(e) => {
                tracing::warn!("could not sync case {name}: {e}");
                let _ = std::fs::remove_dir_all(&dest);
                outcome.skipped += 1;
            }
        }
    }
    Ok(outcome)
}

fn copy_case_dir(src: &Path, dest: &Path) -> Result<(), TrainerError> {
    std::fs::create_dir_all(dest).map_err(|e| TrainerError::storage(dest, e))?;
    let entries = std::fs::read_dir(src).map_err(|e| TrainerError::storage(src, e))?;
    for entry in entries.flatten() {
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if from.is_dir() {
            copy_case_dir(&from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(|e| TrainerError::storage(&to, e))?;
        }
    }
    Ok(())
}

/// After copying: re-protect the gold mask (copy does not preserve the
/// read-only bit everywhere) and restamp the metadata origin.
fn finalize_synced_case(dest: &Path) {
    if let Some(case) = case::load_case(dest, CaseSource::Workspace) {
        case::set_readonly(&case.gold);
        let mut meta = case.meta;
        meta.origin = Some(CaseOrigin::ClassroomSync);
        if let Err(e) = case::write_meta(dest, &meta) {
            tracing::warn!("could not restamp {}: {e}", dest.display());
        }
    } else {
        // still protect a gold file even when the metadata is unreadable
        for name in ["gold.mvol", "gold.nii.gz", "gold.nii"] {
            let gold = dest.join(name);
            if gold.exists() {
                case::set_readonly(&gold);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use masklab_core::volume::{Volume, VolumeHeader};
    use masklab_store::codec::JsonVolumeCodec;

    fn write_volume(path: &Path, shape: [usize; 3]) {
        let v = Volume::blank(&VolumeHeader {
            shape,
            spacing_mm: [1.0; 3],
            affine: VolumeHeader::identity_affine([1.0; 3]),
        });
        JsonVolumeCodec.write(path, &v).unwrap();
    }

    fn provisioned_root(dir: &Path) -> std::path::PathBuf {
        let root = layout::resolve_share_root(dir).unwrap();
        layout::ensure_classroom(&root, "C1").unwrap();
        root
    }

    fn upload_one(root: &Path, src: &Path, stem: &str) -> Case {
        let t1 = src.join(format!("{stem}_t1.mvol"));
        let gold = src.join(format!("{stem}_gold.mvol"));
        write_volume(&t1, [4, 4, 4]);
        write_volume(&gold, [4, 4, 4]);
        upload_case(&JsonVolumeCodec, root, "C1", &t1, &gold).unwrap()
    }

    #[test]
    fn upload_lands_in_shared_cases() {
        let share = tempfile::tempdir().unwrap();
        let src = tempfile::tempdir().unwrap();
        let root = provisioned_root(share.path());

        let case = upload_one(&root, src.path(), "caseA");
        assert!(case.case_dir.starts_with(layout::class_cases_dir(&root, "C1")));
        assert_eq!(case.meta.origin, Some(CaseOrigin::ClassroomUpload));
        assert_eq!(layout::list_class_cases(&root, "C1").len(), 1);
    }

    #[test]
    fn sync_copies_new_cases_and_skips_existing() {
        let share = tempfile::tempdir().unwrap();
        let src = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let root = provisioned_root(share.path());
        let workspace = local.path().join("workspace");

        upload_one(&root, src.path(), "caseA");
        let first = sync_cases(&root, "C1", &workspace).unwrap();
        assert_eq!(first, SyncOutcome { synced: 1, skipped: 0 });

        upload_one(&root, src.path(), "caseB");
        let second = sync_cases(&root, "C1", &workspace).unwrap();
        assert_eq!(second, SyncOutcome { synced: 1, skipped: 1 });

        let cases = case::list_cases(&[(workspace, CaseSource::Workspace)]);
        assert_eq!(cases.len(), 2);
        for c in &cases {
            assert_eq!(c.meta.origin, Some(CaseOrigin::ClassroomSync));
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mode = std::fs::metadata(&c.gold).unwrap().permissions().mode();
                assert_eq!(mode & 0o222, 0, "gold stays write-protected");
            }
        }
    }

    #[test]
    fn sync_never_overwrites_local_work() {
        let share = tempfile::tempdir().unwrap();
        let src = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let root = provisioned_root(share.path());
        let workspace = local.path().join("workspace");

        let uploaded = upload_one(&root, src.path(), "caseA");
        sync_cases(&root, "C1", &workspace).unwrap();

        // the student works on the case, then syncs again
        let local_case = workspace.join(uploaded.case_dir.file_name().unwrap());
        let marker = local_case.join("student.mvol");
        write_volume(&marker, [4, 4, 4]);
        let before = std::fs::read_to_string(&marker).unwrap();

        let outcome = sync_cases(&root, "C1", &workspace).unwrap();
        assert_eq!(outcome.synced, 0);
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), before);
    }

    #[test]
    fn sync_of_empty_class_is_a_noop() {
        let share = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let root = provisioned_root(share.path());
        let outcome = sync_cases(&root, "C1", &local.path().join("ws")).unwrap();
        assert_eq!(outcome, SyncOutcome::default());
    }
}
