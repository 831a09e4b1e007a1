use std::path::Path;

use chrono::Utc;
use colored::Colorize;

use crate::error::Result;
use crate::output::{self, Format};
use crate::store::Workspace;

/// Per-agent summary plus current file conflicts. Agents that missed their
/// heartbeat interval are listed as overdue.
pub fn run(project_root: &Path, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let (summaries, conflicts) =
        ws.read(|store| Ok((store.summary(), store.get_file_conflicts())))?;

    let now = Utc::now();
    let interval = ws.config().coordination.policy().heartbeat_interval;
    let overdue: Vec<&str> = summaries
        .iter()
        .filter(|s| now - s.last_seen > interval)
        .map(|s| s.name.as_str())
        .collect();

    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({
                "agents": summaries,
                "conflicts": conflicts,
                "overdue": overdue,
            })
        ),
        Format::Pretty => {
            output::print_summaries(&summaries, Format::Pretty)?;
            if !overdue.is_empty() {
                println!(
                    "{} {}",
                    "heartbeat overdue:".yellow(),
                    overdue.join(", ")
                );
            }
            if !conflicts.is_empty() {
                println!();
                println!("{}", "File conflicts".yellow().bold());
                output::print_conflicts(&conflicts, Format::Pretty)?;
            }
        }
        Format::Minimal => output::print_summaries(&summaries, Format::Minimal)?,
    }
    Ok(())
}
