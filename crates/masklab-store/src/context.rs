//! The resolved session context.
//!
//! Commands never consult settings or the environment directly; they
//! receive a [`TrainerContext`] that already answers who the user is,
//! which mode they are in, where cases live, and where attempts go.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use masklab_core::model::{Attempt, EvaluationRecord, Mode, Policy};

use crate::case::CaseSource;
use crate::ledger::Ledger;

/// An active classroom membership.
#[derive(Debug, Clone)]
pub struct ClassroomLink {
    pub share_root: PathBuf,
    pub class_code: String,
    /// Where this user's attempts land inside the shared tree. Computed by
    /// the caller so this crate stays ignorant of the share layout.
    pub attempts_root: PathBuf,
}

/// Everything a command needs to run one session.
#[derive(Debug, Clone)]
pub struct TrainerContext {
    pub user: String,
    pub mode: Mode,
    pub data_dir: PathBuf,
    pub classroom: Option<ClassroomLink>,
    pub policy: Policy,
    /// Short editor name recorded with each attempt.
    pub editor_label: String,
}

impl TrainerContext {
    /// A standalone context with no classroom attached.
    pub fn solo(user: impl Into<String>, data_dir: impl Into<PathBuf>, policy: Policy) -> Self {
        Self {
            user: user.into(),
            mode: Mode::Solo,
            data_dir: data_dir.into(),
            classroom: None,
            policy,
            editor_label: String::new(),
        }
    }

    /// Cases the learner imported themselves.
    pub fn local_cases(&self) -> PathBuf {
        self.data_dir.join("cases")
    }

    /// Cases synced down from the classroom.
    pub fn workspace(&self) -> PathBuf {
        self.data_dir.join("workspace")
    }

    /// The local attempt ledger directory.
    pub fn local_progress(&self) -> PathBuf {
        self.data_dir.join("progress")
    }

    /// All case roots visible in this session, workspace first.
    pub fn case_roots(&self) -> Vec<(PathBuf, CaseSource)> {
        let mut roots = Vec::new();
        if self.classroom.is_some() {
            roots.push((self.workspace(), CaseSource::Workspace));
        }
        roots.push((self.local_cases(), CaseSource::Local));
        roots
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.local_cases(), self.workspace(), self.local_progress()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    /// The ledgers an attempt is recorded into. The local ledger always;
    /// the classroom ledger too when a membership is active.
    pub fn ledgers(&self) -> Vec<Ledger> {
        let mut out = vec![Ledger::new(self.local_progress())];
        if let Some(link) = &self.classroom {
            out.push(Ledger::new(&link.attempts_root));
        }
        out
    }

    pub fn class_code(&self) -> &str {
        self.classroom
            .as_ref()
            .map(|l| l.class_code.as_str())
            .unwrap_or("")
    }

    /// Stamp a scored record into a full attempt for this session.
    pub fn make_attempt(&self, case_id: &str, metrics: EvaluationRecord) -> Attempt {
        let passed = self.policy.grade(&metrics);
        Attempt {
            timestamp: Attempt::now_timestamp(),
            attempt_id: Attempt::new_attempt_id(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: platform_tag(),
            user: self.user.clone(),
            mode: self.mode,
            class_code: self.class_code().to_string(),
            case_id: case_id.to_string(),
            session: self.policy.session.clone(),
            min_voxels: self.policy.min_voxels,
            tolerance: self.policy.tolerance,
            passed,
            editor: self.editor_label.clone(),
            metrics,
        }
    }

    /// Record an attempt into every active ledger. Returns the total view
    /// count written; failures are logged inside the ledgers.
    pub fn record_attempt(&self, attempt: &Attempt) -> usize {
        self.ledgers().iter().map(|l| l.record(attempt)).sum()
    }
}

fn platform_tag() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Find one case by id across the context's roots, workspace first.
pub fn find_case(ctx: &TrainerContext, case_id: &str) -> Option<crate::case::Case> {
    for (root, source) in ctx.case_roots() {
        let dir = root.join(case_id);
        if let Some(case) = crate::case::load_case(&dir, source) {
            return Some(case);
        }
    }
    // fall back to a full listing for ids stored under a different dir name
    crate::case::list_cases(&ctx.case_roots())
        .into_iter()
        .find(|c| c.case_id == case_id)
}
