//! The `masklab import` command.

use std::path::PathBuf;

use anyhow::Result;

use masklab_core::model::CaseOrigin;
use masklab_store::case;
use masklab_store::codec::JsonVolumeCodec;

use super::session;

pub fn execute(t1: PathBuf, gold: PathBuf) -> Result<()> {
    let (_settings, ctx) = session::load_context()?;
    let imported = case::import_case(
        &JsonVolumeCodec,
        &ctx.local_cases(),
        &t1,
        &gold,
        CaseOrigin::LocalUpload,
        None,
    )?;

    match imported.meta.t1_shape {
        Some([x, y, z]) => println!("Imported case {} ({x}x{y}x{z})", imported.case_id),
        None => println!(
            "Imported case {} (limited validation, format not introspectable)",
            imported.case_id
        ),
    }
    Ok(())
}
