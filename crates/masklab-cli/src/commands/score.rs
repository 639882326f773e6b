//! The `masklab score` command.

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};

use masklab_core::metrics::evaluate;
use masklab_core::model::Attempt;
use masklab_core::traits::VolumeCodec;
use masklab_store::codec::JsonVolumeCodec;
use masklab_store::context::{find_case, TrainerContext};

use super::session;

pub fn execute(case_id: String) -> Result<()> {
    let (_settings, ctx) = session::load_context()?;
    let attempt = score_once(&ctx, &case_id)?;
    print_attempt(&attempt);
    Ok(())
}

/// Score a case's current student mask and record the attempt into every
/// active ledger.
pub fn score_once(ctx: &TrainerContext, case_id: &str) -> Result<Attempt> {
    let case = find_case(ctx, case_id)
        .with_context(|| format!("no case '{case_id}'; see `masklab cases`"))?;
    if !case.student.exists() {
        bail!(
            "case '{case_id}' has no student mask yet at {}",
            case.student.display()
        );
    }

    let codec = JsonVolumeCodec;
    let gold = codec
        .read(&case.gold)
        .with_context(|| format!("cannot read gold mask {}", case.gold.display()))?;
    let student = codec
        .read(&case.student)
        .with_context(|| format!("cannot read student mask {}", case.student.display()))?;

    let metrics = evaluate(&gold, &student)?;
    let attempt = ctx.make_attempt(&case.case_id, metrics);
    if ctx.record_attempt(&attempt) == 0 {
        tracing::warn!("attempt could not be persisted to any ledger");
    }
    Ok(attempt)
}

pub fn print_attempt(attempt: &Attempt) {
    let m = &attempt.metrics;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["dice".to_string(), format!("{:.4}", m.dice)]);
    table.add_row(vec!["jaccard".to_string(), format!("{:.4}", m.jaccard)]);
    table.add_row(vec!["precision".to_string(), format!("{:.4}", m.precision)]);
    table.add_row(vec!["recall".to_string(), format!("{:.4}", m.recall)]);
    table.add_row(vec![
        "mismatch voxels".to_string(),
        m.mismatch_voxels.to_string(),
    ]);
    table.add_row(vec![
        "student volume (ml)".to_string(),
        format!("{:.3}", m.student_ml),
    ]);
    table.add_row(vec![
        "volume error".to_string(),
        format!("{:+.1}%", m.vol_rel_err * 100.0),
    ]);
    table.add_row(vec![
        "centroid distance (mm)".to_string(),
        m.centroid_dist_mm
            .map(|d| format!("{d:.2}"))
            .unwrap_or_else(|| "-".to_string()),
    ]);
    println!("{table}");

    let verdict = if attempt.passed { "PASS" } else { "FAIL" };
    println!(
        "{verdict} (min voxels {}, tolerance {})",
        attempt.min_voxels, attempt.tolerance
    );
}
