//! The `masklab dashboard` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};

use masklab_report::cohort;
use masklab_store::settings::Settings;

pub fn execute(code: Option<String>, output: Option<PathBuf>) -> Result<()> {
    let settings = Settings::load()?;
    let share = settings
        .share_root
        .as_ref()
        .context("no share configured; join or create a classroom first")?;
    let code = code
        .or_else(|| settings.class_code.clone())
        .context("no class code; pass --code or join a classroom")?;

    let report = cohort::aggregate_class(share, &code);

    let mut users = Table::new();
    users.load_preset(UTF8_FULL);
    users.set_header(vec!["Student", "Attempts", "Mean dice", "Pass rate"]);
    for u in &report.users {
        users.add_row(vec![
            u.user.clone(),
            u.attempts.to_string(),
            format!("{:.3}", u.mean_dice),
            format!("{:.0}%", u.pass_rate * 100.0),
        ]);
    }

    let mut cases = Table::new();
    cases.load_preset(UTF8_FULL);
    cases.set_header(vec!["Case", "Attempts", "Mean dice", "Mean mismatch"]);
    for c in &report.cases {
        cases.add_row(vec![
            c.case_id.clone(),
            c.attempts.to_string(),
            format!("{:.3}", c.mean_dice),
            format!("{:.0}", c.mean_mismatch),
        ]);
    }

    println!("Class {}: {} attempt(s)", report.class_code, report.total_attempts);
    println!("{users}");
    println!("Cases, hardest first:");
    println!("{cases}");

    if let Some(path) = output {
        report.save_json(&path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}
