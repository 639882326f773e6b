//! The `masklab cases` command.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Table};

use masklab_store::case;

use super::session;

pub fn execute() -> Result<()> {
    let (_settings, ctx) = session::load_context()?;
    let cases = case::list_cases(&ctx.case_roots());

    if cases.is_empty() {
        println!("No cases yet. Use `masklab import` or `masklab classroom sync`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Case", "Source", "Shape", "Origin"]);
    for c in &cases {
        let shape = c
            .meta
            .t1_shape
            .map(|[x, y, z]| format!("{x}x{y}x{z}"))
            .unwrap_or_else(|| "-".to_string());
        let origin = match c.meta.origin {
            Some(masklab_core::model::CaseOrigin::LocalUpload) => "local upload",
            Some(masklab_core::model::CaseOrigin::BatchImport) => "batch import",
            Some(masklab_core::model::CaseOrigin::ClassroomUpload) => "classroom upload",
            Some(masklab_core::model::CaseOrigin::ClassroomSync) => "classroom sync",
            None => "-",
        };
        table.add_row(vec![
            Cell::new(&c.case_id),
            Cell::new(c.source),
            Cell::new(shape),
            Cell::new(origin),
        ]);
    }
    println!("{table}");
    println!("{} case(s).", cases.len());
    Ok(())
}
