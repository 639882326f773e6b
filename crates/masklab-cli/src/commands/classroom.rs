//! The `masklab classroom` subcommands.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use masklab_classroom::{layout, pin, sync};
use masklab_core::model::Policy;
use masklab_store::codec::JsonVolumeCodec;
use masklab_store::settings::Settings;

use super::session;

pub fn create(share: PathBuf, code: String, teacher_pin: Option<String>) -> Result<()> {
    let root = layout::resolve_share_root(&share)?;
    session::require_teacher(&root, teacher_pin.as_deref())?;
    let dir = layout::ensure_classroom(&root, &code)?;
    println!(
        "Classroom {} ready at {}",
        layout::normalize_code(&code),
        dir.display()
    );
    Ok(())
}

pub fn set_pin(share: PathBuf, new_pin: String) -> Result<()> {
    let root = layout::resolve_share_root(&share)?;
    pin::set_pin(&root, &new_pin)?;
    println!("Teacher PIN set.");
    Ok(())
}

pub fn login(share: PathBuf, teacher_pin: String) -> Result<()> {
    let root = layout::resolve_share_root(&share)?;
    if !pin::pin_is_set(&root) {
        println!("No teacher PIN set on this share; teacher tools are open.");
        return Ok(());
    }
    if !pin::verify_pin(&root, &teacher_pin) {
        bail!("teacher PIN does not match");
    }
    println!("PIN accepted.");
    Ok(())
}

pub fn policy(
    share: PathBuf,
    code: String,
    teacher_pin: Option<String>,
    min_voxels: Option<u64>,
    tolerance: Option<u64>,
    session_label: Option<String>,
) -> Result<()> {
    let root = layout::resolve_share_root(&share)?;
    if !layout::class_exists(&root, &code) {
        bail!("no classroom '{}' on this share", layout::normalize_code(&code));
    }

    let current = layout::load_policy(&root, &code).unwrap_or_default();
    let changing = min_voxels.is_some() || tolerance.is_some() || session_label.is_some();
    if !changing {
        println!(
            "min_voxels = {}\ntolerance = {}\nsession = {}",
            current.min_voxels, current.tolerance, current.session
        );
        return Ok(());
    }

    session::require_teacher(&root, teacher_pin.as_deref())?;
    let updated = Policy {
        min_voxels: min_voxels.unwrap_or(current.min_voxels),
        tolerance: tolerance.unwrap_or(current.tolerance),
        session: session_label.unwrap_or(current.session),
    };
    layout::save_policy(&root, &code, &updated)?;
    println!(
        "Policy updated: min_voxels {}, tolerance {}, session '{}'.",
        updated.min_voxels, updated.tolerance, updated.session
    );
    Ok(())
}

pub fn upload(
    share: PathBuf,
    code: String,
    teacher_pin: Option<String>,
    t1: PathBuf,
    gold: PathBuf,
) -> Result<()> {
    let root = layout::resolve_share_root(&share)?;
    session::require_teacher(&root, teacher_pin.as_deref())?;
    let case = sync::upload_case(&JsonVolumeCodec, &root, &code, &t1, &gold)?;
    println!("Uploaded case {} to {}.", case.case_id, layout::normalize_code(&code));
    Ok(())
}

/// Join as a student: remember the share and class, then pull the cases.
pub fn join(share: PathBuf, code: String) -> Result<()> {
    let root = layout::resolve_share_root(&share)?;
    if !layout::class_exists(&root, &code) {
        bail!(
            "no classroom '{}' on this share; ask your teacher for the exact code",
            layout::normalize_code(&code)
        );
    }

    let mut settings = Settings::load()?;
    settings.share_root = Some(root);
    settings.class_code = Some(layout::normalize_code(&code));
    settings.save()?;
    println!("Joined classroom {}.", layout::normalize_code(&code));

    sync_joined(&settings)
}

pub fn sync() -> Result<()> {
    let settings = Settings::load()?;
    sync_joined(&settings)
}

fn sync_joined(settings: &Settings) -> Result<()> {
    let share = settings
        .share_root
        .as_ref()
        .context("no classroom joined; run `masklab classroom join` first")?;
    let code = settings
        .class_code
        .as_ref()
        .context("no classroom joined; run `masklab classroom join` first")?;

    let ctx = session::context_from(settings)?;
    let outcome = sync::sync_cases(share, code, &ctx.workspace())?;
    println!(
        "Synced {} new case(s), {} already present.",
        outcome.synced, outcome.skipped
    );
    Ok(())
}
