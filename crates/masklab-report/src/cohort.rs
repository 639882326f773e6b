//! Cohort rollups for the teacher dashboard.
//!
//! Reads every student's JSONL ledger under a class's shared attempts
//! directory and aggregates per-user and per-case. Sort orders are
//! attention-driven: users best-first (who to praise), cases worst-first
//! (what to reteach).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use masklab_core::model::Attempt;
use masklab_store::ledger;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRollup {
    pub user: String,
    pub attempts: usize,
    pub mean_dice: f64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRollup {
    pub case_id: String,
    pub attempts: usize,
    pub mean_dice: f64,
    pub mean_mismatch: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortReport {
    pub generated_at: String,
    pub class_code: String,
    pub total_attempts: usize,
    pub users: Vec<UserRollup>,
    pub cases: Vec<CaseRollup>,
}

/// Aggregate a whole class from its shared tree.
pub fn aggregate_class(share_root: &Path, class_code: &str) -> CohortReport {
    let mut attempts = Vec::new();
    for dir in masklab_classroom::layout::list_attempt_dirs(share_root, class_code) {
        attempts.extend(ledger::Ledger::new(&dir).read_all());
    }
    aggregate(class_code, &attempts)
}

/// Aggregate a flat list of attempts into the report.
pub fn aggregate(class_code: &str, attempts: &[Attempt]) -> CohortReport {
    let mut by_user: HashMap<&str, Vec<&Attempt>> = HashMap::new();
    let mut by_case: HashMap<&str, Vec<&Attempt>> = HashMap::new();
    for a in attempts {
        by_user.entry(a.user.as_str()).or_default().push(a);
        by_case.entry(a.case_id.as_str()).or_default().push(a);
    }

    let mut users: Vec<UserRollup> = by_user
        .into_iter()
        .map(|(user, group)| {
            let n = group.len();
            let passed = group.iter().filter(|a| a.passed).count();
            UserRollup {
                user: user.to_string(),
                attempts: n,
                mean_dice: mean(group.iter().map(|a| a.metrics.dice)),
                pass_rate: passed as f64 / n as f64,
            }
        })
        .collect();
    // best performers first
    users.sort_by(|a, b| {
        b.mean_dice
            .total_cmp(&a.mean_dice)
            .then(b.attempts.cmp(&a.attempts))
            .then(a.user.cmp(&b.user))
    });

    let mut cases: Vec<CaseRollup> = by_case
        .into_iter()
        .map(|(case_id, group)| CaseRollup {
            case_id: case_id.to_string(),
            attempts: group.len(),
            mean_dice: mean(group.iter().map(|a| a.metrics.dice)),
            mean_mismatch: mean(group.iter().map(|a| a.metrics.mismatch_voxels as f64)),
        })
        .collect();
    // hardest cases first
    cases.sort_by(|a, b| {
        a.mean_dice
            .total_cmp(&b.mean_dice)
            .then(b.attempts.cmp(&a.attempts))
            .then(a.case_id.cmp(&b.case_id))
    });

    CohortReport {
        generated_at: Attempt::now_timestamp(),
        class_code: class_code.to_string(),
        total_attempts: attempts.len(),
        users,
        cases,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

impl CohortReport {
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse report at {}", path.display()))
    }
}
