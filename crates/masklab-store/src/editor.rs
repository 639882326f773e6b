//! External editor launcher.
//!
//! The editor is a user-configured command template with `{t1}` and
//! `{mask}` placeholders. The process is spawned detached and never
//! awaited; the watcher picks up whatever it saves.

use std::path::Path;
use std::process::Command;

use masklab_core::error::TrainerError;
use masklab_core::traits::EditorLauncher;

/// Default template, ITK-SNAP's CLI: reference as the grey image, the
/// student mask as the segmentation.
pub const DEFAULT_EDITOR_CMD: &str = "itksnap -g {t1} -s {mask}";

/// Launches an editor from a command template.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    template: String,
}

impl CommandEditor {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// A short label for the ledger's `editor` column: the command name
    /// without arguments.
    pub fn label(&self) -> String {
        self.template
            .split_whitespace()
            .next()
            .unwrap_or("external")
            .to_string()
    }

    /// Substitute the placeholders and split into argv.
    fn render(&self, reference: &Path, student_mask: &Path) -> Result<Vec<String>, TrainerError> {
        let rendered = self
            .template
            .replace("{t1}", &reference.display().to_string())
            .replace("{mask}", &student_mask.display().to_string());
        let argv: Vec<String> = rendered.split_whitespace().map(str::to_string).collect();
        if argv.is_empty() {
            return Err(TrainerError::Validation(
                "editor command template is empty".into(),
            ));
        }
        Ok(argv)
    }
}

impl Default for CommandEditor {
    fn default() -> Self {
        Self::new(DEFAULT_EDITOR_CMD)
    }
}

impl EditorLauncher for CommandEditor {
    fn launch(&self, reference: &Path, student_mask: &Path) -> Result<(), TrainerError> {
        let argv = self.render(reference, student_mask)?;
        tracing::info!("launching editor: {}", argv.join(" "));
        Command::new(&argv[0])
            .args(&argv[1..])
            .spawn()
            .map_err(|e| TrainerError::Validation(format!("could not start '{}': {e}", argv[0])))?;
        Ok(())
    }
}
