use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::model::{FileHint, normalize_pattern, secs};
use crate::output::{self, Format};
use crate::store::Workspace;

pub fn add(
    project_root: &Path,
    agent: &str,
    pattern: &str,
    work_id: Option<String>,
    ttl_secs: Option<u64>,
    format: Format,
) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let ttl = ttl_secs
        .map(secs)
        .unwrap_or(ws.config().coordination.policy().hint_ttl);
    let mut hint = FileHint::with_ttl(pattern, agent, work_id, ttl);
    hint.pattern = normalize_pattern(&hint.pattern);

    // Surface overlaps right away so the caller can decide to back off.
    let conflicts = ws.update(|store| {
        store.add_file_hint(agent, hint.clone())?;
        Ok(store
            .get_file_conflicts()
            .into_iter()
            .filter(|c| c.pattern == hint.pattern)
            .collect::<Vec<_>>())
    })?;

    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({ "hint": hint, "conflicts": conflicts })
        ),
        Format::Pretty => {
            println!("Hinted {} for '{}'", hint.pattern.bold(), agent.cyan());
            for c in &conflicts {
                println!(
                    "  {} also hinted by {}",
                    "warning:".yellow().bold(),
                    c.agents
                        .iter()
                        .filter(|a| a.as_str() != agent)
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        Format::Minimal => println!("{}", hint.pattern),
    }
    Ok(())
}

pub fn remove(project_root: &Path, agent: &str, pattern: &str, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    ws.update(|store| store.remove_file_hint(agent, pattern))?;
    let pattern = normalize_pattern(pattern);
    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({ "removed": pattern, "agent": agent })
        ),
        Format::Pretty => println!("Removed hint {} from '{}'", pattern.bold(), agent.cyan()),
        Format::Minimal => println!("{pattern}"),
    }
    Ok(())
}

pub fn conflicts(project_root: &Path, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let conflicts = ws.read(|store| Ok(store.get_file_conflicts()))?;
    output::print_conflicts(&conflicts, format)
}
