use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::model::{ClaimReason, WorkClaim, secs};
use crate::output::{self, Format, format_remaining};
use crate::store::Workspace;

pub fn claim(
    project_root: &Path,
    agent: &str,
    work_id: &str,
    reason: ClaimReason,
    note: Option<String>,
    ttl_secs: Option<u64>,
    format: Format,
) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let ttl = ttl_secs
        .map(secs)
        .unwrap_or(ws.config().coordination.policy().claim_ttl);

    let mut claim = WorkClaim::with_ttl(work_id, agent, reason, ttl);
    claim.note = note.filter(|n| !n.trim().is_empty());

    ws.update(|store| store.claim(agent, claim.clone()))?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&claim)?),
        Format::Pretty => println!(
            "Claimed {} for '{}' ({}, {})",
            claim.work_id.bold(),
            agent.cyan(),
            claim.reason,
            format_remaining(claim.expires_at - claim.claimed_at)
        ),
        Format::Minimal => println!("{}", claim.work_id),
    }
    Ok(())
}

pub fn release(project_root: &Path, agent: &str, work_id: &str, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    ws.update(|store| store.release(agent, work_id))?;
    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({ "released": work_id, "agent": agent })
        ),
        Format::Pretty => println!("Released {} from '{}'", work_id.bold(), agent.cyan()),
        Format::Minimal => println!("{work_id}"),
    }
    Ok(())
}

pub fn holder(project_root: &Path, work_id: &str, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let holder = ws.read(|store| Ok(store.get_claim_holder(work_id)))?;
    let name = holder.as_ref().map(|a| a.name.as_str());
    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({ "work_id": work_id, "holder": name })
        ),
        Format::Pretty => match name {
            Some(name) => println!("{} is held by '{}'", work_id.bold(), name.cyan()),
            None => println!("{} is {}", work_id.bold(), "unclaimed".dimmed()),
        },
        Format::Minimal => println!("{}", name.unwrap_or("-")),
    }
    Ok(())
}

pub fn list(project_root: &Path, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let claims = ws.read(|store| Ok(store.get_all_claims()))?;
    output::print_claims(&claims, format)
}
