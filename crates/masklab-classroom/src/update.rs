//! Update feed: check a hosted `latest.json`, download, verify, stage.
//!
//! The feed is a single JSON document with the latest version, release
//! notes, and one `{url, sha256}` entry per platform key (`mac`, `win`,
//! `linux`). Downloads are staged into a local `updates/` directory after
//! the digest checks out; applying the archive is out of scope here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use masklab_core::error::TrainerError;

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("masklab-updater/", env!("CARGO_PKG_VERSION"));

/// An available, newer release for this platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub version: String,
    pub notes: String,
    pub url: String,
    pub sha256: String,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    version: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    mac: Option<FeedEntry>,
    #[serde(default)]
    win: Option<FeedEntry>,
    #[serde(default)]
    linux: Option<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(default)]
    url: String,
    #[serde(default)]
    sha256: String,
}

fn platform_key() -> &'static str {
    match std::env::consts::OS {
        "macos" => "mac",
        "windows" => "win",
        _ => "linux",
    }
}

/// Dotted-numeric version comparison. Non-numeric segments fall back to a
/// conservative string check where only an exact match means "no update".
fn is_newer(latest: &str, current: &str) -> bool {
    let parse = |s: &str| -> Option<Vec<u64>> {
        s.trim()
            .trim_start_matches('v')
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect()
    };
    match (parse(latest), parse(current)) {
        (Some(l), Some(c)) => l > c,
        _ => latest != current,
    }
}

/// Fetch the feed and decide whether an update applies to this platform.
///
/// `Ok(None)` means up to date. A feed entry missing its URL or carrying a
/// digest that is too short to be a SHA-256 is malformed and surfaces as
/// an error rather than an unverifiable download.
pub async fn check_for_update(
    feed_url: &str,
    current_version: &str,
) -> Result<Option<UpdateInfo>, TrainerError> {
    let client = reqwest::Client::builder()
        .timeout(CHECK_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| TrainerError::Network(e.to_string()))?;
    let feed: Feed = client
        .get(feed_url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| TrainerError::Network(e.to_string()))?
        .json()
        .await
        .map_err(|e| TrainerError::Network(format!("unreadable update feed: {e}")))?;

    let latest = feed.version.trim().to_string();
    if latest.is_empty() || !is_newer(&latest, current_version) {
        return Ok(None);
    }

    let key = platform_key();
    let entry = match key {
        "mac" => feed.mac,
        "win" => feed.win,
        _ => feed.linux,
    }
    .unwrap_or(FeedEntry {
        url: String::new(),
        sha256: String::new(),
    });

    let url = entry.url.trim().to_string();
    let sha = entry.sha256.trim().to_lowercase();
    if url.is_empty() {
        return Err(TrainerError::Network(format!(
            "update feed has no download URL for platform '{key}'"
        )));
    }
    if sha.len() < 32 {
        return Err(TrainerError::Network(
            "update feed is missing a sha256 for the download".into(),
        ));
    }

    Ok(Some(UpdateInfo {
        version: latest,
        notes: feed.notes.trim().to_string(),
        url,
        sha256: sha,
    }))
}

/// Download, verify the SHA-256, and stage under `updates_dir` as
/// `masklab_<version>.zip`. A digest mismatch removes the temp file and
/// fails; nothing partially verified ever lands in the staging directory.
pub async fn download_update(info: &UpdateInfo, updates_dir: &Path) -> Result<PathBuf, TrainerError> {
    std::fs::create_dir_all(updates_dir).map_err(|e| TrainerError::storage(updates_dir, e))?;

    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| TrainerError::Network(e.to_string()))?;
    let bytes = client
        .get(&info.url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| TrainerError::Network(e.to_string()))?
        .bytes()
        .await
        .map_err(|e| TrainerError::Network(e.to_string()))?;

    let got = hex::encode(Sha256::digest(&bytes));
    if got != info.sha256.to_lowercase() {
        return Err(TrainerError::Integrity {
            expected: info.sha256.clone(),
            actual: got,
        });
    }

    let staged = updates_dir.join(format!("masklab_{}.zip", info.version));
    std::fs::write(&staged, &bytes).map_err(|e| TrainerError::storage(&staged, e))?;
    tracing::info!("staged update {}", staged.display());
    Ok(staged)
}
