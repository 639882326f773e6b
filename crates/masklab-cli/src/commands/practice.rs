//! The `masklab practice` command.
//!
//! Opens the case in the configured editor, then polls the student mask
//! and scores every settled save until interrupted.

use anyhow::{Context, Result};

use masklab_core::traits::EditorLauncher;
use masklab_store::context::find_case;
use masklab_store::editor::CommandEditor;
use masklab_store::settings::Settings;
use masklab_store::watch::{MaskWatch, POLL_INTERVAL};

use super::score::{print_attempt, score_once};
use super::session;

pub async fn execute(case_id: String) -> Result<()> {
    let (settings, ctx) = session::load_context()?;
    let case = find_case(&ctx, &case_id)
        .with_context(|| format!("no case '{case_id}'; see `masklab cases`"))?;

    launch_editor(&settings, &case.t1, &case.student);
    println!(
        "Watching {}. Save in the editor to score, Ctrl-C to stop.",
        case.student.display()
    );

    let mut watch = MaskWatch::new(&case.student);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if watch.poll() {
                    match score_once(&ctx, &case.case_id) {
                        Ok(attempt) => print_attempt(&attempt),
                        Err(e) => tracing::warn!("scoring failed: {e:#}"),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopped.");
                return Ok(());
            }
        }
    }
}

/// Editor startup is best effort: practice still works with a manually
/// opened editor, so a failed launch only warns.
fn launch_editor(settings: &Settings, t1: &std::path::Path, student: &std::path::Path) {
    let editor = CommandEditor::new(&settings.editor_cmd);
    if let Err(e) = editor.launch(t1, student) {
        tracing::warn!("editor not started: {e}");
    }
}
