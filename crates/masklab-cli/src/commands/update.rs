//! The `masklab update` subcommands.

use anyhow::Result;

use masklab_classroom::update::{check_for_update, download_update};
use masklab_store::settings;

const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn check(feed: String) -> Result<()> {
    match check_for_update(&feed, CURRENT_VERSION).await? {
        Some(info) => {
            println!("Update available: {} (current {CURRENT_VERSION})", info.version);
            if !info.notes.is_empty() {
                println!("{}", info.notes);
            }
            println!("Run `masklab update download --feed {feed}` to stage it.");
        }
        None => println!("Up to date ({CURRENT_VERSION})."),
    }
    Ok(())
}

pub async fn download(feed: String) -> Result<()> {
    let Some(info) = check_for_update(&feed, CURRENT_VERSION).await? else {
        println!("Up to date ({CURRENT_VERSION}), nothing to download.");
        return Ok(());
    };
    let updates_dir = settings::config_home().join("updates");
    let staged = download_update(&info, &updates_dir).await?;
    println!("Update {} verified and staged at {}", info.version, staged.display());
    Ok(())
}
