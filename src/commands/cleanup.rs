use std::path::Path;

use crate::error::Result;
use crate::output::Format;
use crate::store::Workspace;

pub fn run(project_root: &Path, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let report = ws.update(|store| Ok(store.cleanup_expired()))?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&report)?),
        Format::Pretty => println!(
            "Removed {} claims and {} hints; {} agents now inactive, {} gone",
            report.claims_removed, report.hints_removed, report.marked_inactive, report.marked_gone
        ),
        Format::Minimal => println!(
            "{} {} {} {}",
            report.claims_removed, report.hints_removed, report.marked_inactive, report.marked_gone
        ),
    }
    Ok(())
}
