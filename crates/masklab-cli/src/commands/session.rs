//! Shared session setup for all commands.
//!
//! Resolves settings into a [`TrainerContext`] exactly once, so commands
//! never touch the config file or the share layout themselves.

use anyhow::{bail, Context, Result};

use masklab_core::model::{Mode, Policy};
use masklab_store::context::{ClassroomLink, TrainerContext};
use masklab_store::editor::CommandEditor;
use masklab_store::settings::Settings;
use masklab_classroom::layout;

/// Build the active context from the saved settings. Joined classrooms
/// that have gone unreachable degrade to solo with a warning instead of
/// blocking local practice.
pub fn load_context() -> Result<(Settings, TrainerContext)> {
    let settings = Settings::load()?;
    let ctx = context_from(&settings)?;
    Ok((settings, ctx))
}

pub fn context_from(settings: &Settings) -> Result<TrainerContext> {
    let mut policy = Policy {
        min_voxels: settings.solo_min_voxels,
        tolerance: settings.solo_tolerance,
        ..Policy::default()
    };
    let mut mode = Mode::Solo;
    let mut classroom = None;

    if let (Some(share), Some(code)) = (&settings.share_root, &settings.class_code) {
        if layout::class_exists(share, code) {
            if let Some(class_policy) = layout::load_policy(share, code) {
                policy = class_policy;
            }
            mode = Mode::Student;
            classroom = Some(ClassroomLink {
                share_root: share.clone(),
                class_code: layout::normalize_code(code),
                attempts_root: layout::attempts_root(share, code, &settings.username),
            });
        } else {
            tracing::warn!(
                "classroom {code} not reachable under {}; running solo",
                share.display()
            );
        }
    }

    let editor = CommandEditor::new(&settings.editor_cmd);
    let ctx = TrainerContext {
        user: settings.username.clone(),
        mode,
        data_dir: settings.data_dir(),
        classroom,
        policy,
        editor_label: editor.label(),
    };
    ctx.ensure_dirs()?;
    Ok(ctx)
}

/// Gate a teacher operation behind the share's PIN when one is set.
pub fn require_teacher(share_root: &std::path::Path, pin: Option<&str>) -> Result<()> {
    if !masklab_classroom::pin::pin_is_set(share_root) {
        return Ok(());
    }
    let pin = pin.context("this share has a teacher PIN; pass --pin")?;
    if !masklab_classroom::pin::verify_pin(share_root, pin) {
        bail!("teacher PIN does not match");
    }
    Ok(())
}
