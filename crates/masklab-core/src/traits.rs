//! Capability traits for external collaborators.
//!
//! The core never depends on a concrete image-format library or annotation
//! tool. Decoding and editor launch live behind these narrow traits; the
//! `masklab-store` crate ships concrete implementations and tests
//! substitute fakes.

use std::path::Path;

use crate::error::TrainerError;
use crate::volume::{Volume, VolumeHeader};

/// Reads and writes 3-D volumes in some on-disk format.
///
/// A codec may recognize a file (`supports`) without being able to
/// introspect it; `read_header`/`read` then return
/// [`TrainerError::Unsupported`] and callers degrade to limited validation
/// instead of rejecting the file outright.
pub trait VolumeCodec: Send + Sync {
    /// Whether the path looks like a volume file this workflow accepts.
    fn supports(&self, path: &Path) -> bool;

    /// Read geometry only.
    fn read_header(&self, path: &Path) -> Result<VolumeHeader, TrainerError>;

    /// Read the full volume.
    fn read(&self, path: &Path) -> Result<Volume, TrainerError>;

    /// Write a volume.
    fn write(&self, path: &Path, volume: &Volume) -> Result<(), TrainerError>;
}

/// Launches the external annotation tool on a (reference, student mask)
/// pair.
///
/// The tool runs as an independent process; this subsystem has no
/// visibility into it and only observes the student mask file's
/// modification time afterward.
pub trait EditorLauncher: Send + Sync {
    fn launch(&self, reference: &Path, student_mask: &Path) -> Result<(), TrainerError>;
}
