//! The `masklab batch-import` command.

use std::path::PathBuf;

use anyhow::Result;

use masklab_store::case;
use masklab_store::codec::JsonVolumeCodec;

use super::session;

pub fn execute(folder: PathBuf) -> Result<()> {
    let (_settings, ctx) = session::load_context()?;
    let outcome = case::import_batch(&JsonVolumeCodec, &ctx.local_cases(), &folder)?;
    println!(
        "Imported {} case(s), skipped {}.",
        outcome.imported, outcome.skipped
    );
    Ok(())
}
