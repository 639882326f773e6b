//! Built-in JSON volume codec.
//!
//! `.mvol` is the workspace's native interchange format: a JSON document
//! carrying shape, spacing, affine, and samples. NIfTI files (`.nii`,
//! `.nii.gz`) are recognized as volumes so they flow through import and the
//! external editor, but this codec cannot introspect them — those reads
//! surface `Unsupported` and callers degrade to limited validation.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use masklab_core::error::TrainerError;
use masklab_core::traits::VolumeCodec;
use masklab_core::volume::{Volume, VolumeHeader};

/// Extension of the native volume format.
pub const NATIVE_EXT: &str = ".mvol";

/// Volume extensions accepted anywhere a volume file is expected.
pub const VOLUME_EXTS: [&str; 3] = [NATIVE_EXT, ".nii.gz", ".nii"];

/// Whether the file name carries a recognized volume extension.
pub fn is_volume_path(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n.to_lowercase(),
        None => return false,
    };
    VOLUME_EXTS.iter().any(|ext| name.ends_with(ext))
}

/// File name with its volume extension removed (handles `.nii.gz`).
pub fn strip_volume_ext(name: &str) -> &str {
    let lower = name.to_lowercase();
    for ext in VOLUME_EXTS {
        if lower.ends_with(ext) {
            return &name[..name.len() - ext.len()];
        }
    }
    name
}

/// The volume extension of a file name, if recognized.
pub fn volume_ext(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    VOLUME_EXTS.iter().find(|ext| lower.ends_with(*ext)).copied()
}

/// Reads and writes `.mvol` JSON volumes.
#[derive(Debug, Default, Clone)]
pub struct JsonVolumeCodec;

impl JsonVolumeCodec {
    fn is_native(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_lowercase().ends_with(NATIVE_EXT))
            .unwrap_or(false)
    }

    fn open(path: &Path) -> Result<File, TrainerError> {
        if !path.exists() {
            return Err(TrainerError::MissingInput(path.to_path_buf()));
        }
        File::open(path).map_err(|e| TrainerError::storage(path, e))
    }
}

impl VolumeCodec for JsonVolumeCodec {
    fn supports(&self, path: &Path) -> bool {
        is_volume_path(path)
    }

    fn read_header(&self, path: &Path) -> Result<VolumeHeader, TrainerError> {
        Ok(self.read(path)?.header())
    }

    fn read(&self, path: &Path) -> Result<Volume, TrainerError> {
        if !self.supports(path) {
            return Err(TrainerError::NotAVolume(path.to_path_buf()));
        }
        if !Self::is_native(path) {
            return Err(TrainerError::Unsupported(path.to_path_buf()));
        }
        let file = Self::open(path)?;
        let volume: Volume =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| TrainerError::Malformed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        // re-validate the shape/data relation on the way in
        Volume::new(volume.shape, volume.spacing_mm, volume.affine, volume.data)
    }

    fn write(&self, path: &Path, volume: &Volume) -> Result<(), TrainerError> {
        if !Self::is_native(path) {
            return Err(TrainerError::Unsupported(path.to_path_buf()));
        }
        let file = File::create(path).map_err(|e| TrainerError::storage(path, e))?;
        serde_json::to_writer(BufWriter::new(file), volume).map_err(|e| {
            TrainerError::storage(path, std::io::Error::other(e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_volume() -> Volume {
        let mut v = Volume::blank(&VolumeHeader {
            shape: [2, 3, 4],
            spacing_mm: [1.0, 1.0, 2.0],
            affine: VolumeHeader::identity_affine([1.0, 1.0, 2.0]),
        });
        v.set(1, 2, 3, 1.0);
        v
    }

    #[test]
    fn recognizes_volume_extensions() {
        assert!(is_volume_path(Path::new("a/t1.mvol")));
        assert!(is_volume_path(Path::new("CASE01_T1.NII.GZ")));
        assert!(is_volume_path(Path::new("mask.nii")));
        assert!(!is_volume_path(Path::new("notes.txt")));
    }

    #[test]
    fn strips_double_extension() {
        assert_eq!(strip_volume_ext("case01_t1.nii.gz"), "case01_t1");
        assert_eq!(strip_volume_ext("gold.mvol"), "gold");
        assert_eq!(strip_volume_ext("readme.md"), "readme.md");
    }

    #[test]
    fn roundtrip_native_volume() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol.mvol");
        let codec = JsonVolumeCodec;
        let v = small_volume();
        codec.write(&path, &v).unwrap();
        let back = codec.read(&path).unwrap();
        assert_eq!(back, v);
        assert_eq!(codec.read_header(&path).unwrap(), v.header());
    }

    #[test]
    fn nifti_is_supported_but_not_introspectable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t1.nii.gz");
        std::fs::write(&path, b"opaque").unwrap();
        let codec = JsonVolumeCodec;
        assert!(codec.supports(&path));
        assert!(matches!(
            codec.read_header(&path),
            Err(TrainerError::Unsupported(_))
        ));
    }

    #[test]
    fn missing_file_is_missing_input() {
        let codec = JsonVolumeCodec;
        assert!(matches!(
            codec.read(Path::new("/nonexistent/x.mvol")),
            Err(TrainerError::MissingInput(_))
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mvol");
        std::fs::write(&path, b"{not json").unwrap();
        let codec = JsonVolumeCodec;
        assert!(matches!(
            codec.read(&path),
            Err(TrainerError::Malformed { .. })
        ));
    }
}
