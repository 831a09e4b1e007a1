use chrono::{Duration, Utc};
use clap::ValueEnum;
use colored::{ColoredString, Colorize};

use crate::error::Result;
use crate::model::{AgentRegistration, AgentStatus, WorkClaim};
use crate::report::{AgentSummary, FileConflict, humanize_since};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

fn status_label(status: AgentStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        AgentStatus::Active => text.green(),
        AgentStatus::Idle => text.yellow(),
        AgentStatus::Inactive => text.dimmed(),
        AgentStatus::Gone => text.red(),
    }
}

/// "12m left", "1h05m left", or "expired".
pub fn format_remaining(remaining: Duration) -> String {
    if remaining <= Duration::zero() {
        return "expired".into();
    }
    let minutes = remaining.num_minutes();
    if minutes < 1 {
        format!("{}s left", remaining.num_seconds())
    } else if minutes < 60 {
        format!("{minutes}m left")
    } else {
        format!("{}h{:02}m left", minutes / 60, minutes % 60)
    }
}

pub fn print_agent(agent: &AgentRegistration, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(agent)?),
        Format::Pretty => {
            let now = Utc::now();
            println!(
                "{} {} ({})",
                format!("[{}]", agent.name).cyan().bold(),
                agent.program,
                status_label(agent.status)
            );
            if !agent.model.is_empty() {
                println!("  {} {}", "model:".dimmed(), agent.model);
            }
            println!(
                "  {} {}",
                "last seen:".dimmed(),
                humanize_since(now - agent.last_seen)
            );
            if let Some(ref session) = agent.metadata.session_id {
                println!("  {} {}", "session:".dimmed(), session);
            }
            if !agent.metadata.tags.is_empty() {
                println!("  {} {}", "tags:".dimmed(), agent.metadata.tags.join(", "));
            }
            for claim in &agent.claimed_work {
                println!(
                    "  {} {} ({}, {})",
                    "claim:".dimmed(),
                    claim.work_id.bold(),
                    claim.reason,
                    format_remaining(claim.time_to_expiry(now))
                );
            }
            for hint in agent.active_hints(now) {
                match hint.work_id {
                    Some(ref id) => println!("  {} {} ({})", "hint:".dimmed(), hint.pattern, id),
                    None => println!("  {} {}", "hint:".dimmed(), hint.pattern),
                }
            }
        }
        Format::Minimal => println!("{} {} {}", agent.name, agent.status, agent.program),
    }
    Ok(())
}

pub fn print_agents(agents: &[AgentRegistration], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(agents)?),
        Format::Pretty => {
            if agents.is_empty() {
                println!("{}", "No agents registered.".dimmed());
            }
            for agent in agents {
                print_agent(agent, Format::Pretty)?;
            }
        }
        Format::Minimal => {
            for agent in agents {
                print_agent(agent, Format::Minimal)?;
            }
        }
    }
    Ok(())
}

pub fn print_claims(claims: &[WorkClaim], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(claims)?),
        Format::Pretty => {
            if claims.is_empty() {
                println!("{}", "No active claims.".dimmed());
            }
            let now = Utc::now();
            for c in claims {
                println!(
                    "{} {} {} ({})",
                    c.work_id.bold(),
                    format!("<- {}", c.agent).cyan(),
                    c.reason,
                    format_remaining(c.time_to_expiry(now)).dimmed()
                );
                if let Some(ref note) = c.note {
                    println!("  {}", note);
                }
            }
        }
        Format::Minimal => {
            for c in claims {
                println!("{} {}", c.work_id, c.agent);
            }
        }
    }
    Ok(())
}

pub fn print_conflicts(conflicts: &[FileConflict], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(conflicts)?),
        Format::Pretty => {
            if conflicts.is_empty() {
                println!("{}", "No file conflicts.".dimmed());
            }
            for c in conflicts {
                println!(
                    "{} {}",
                    "!".yellow().bold(),
                    c.pattern.bold()
                );
                println!("  {} {}", "agents:".dimmed(), c.agents.join(", "));
                if !c.work_ids.is_empty() {
                    println!("  {} {}", "work:".dimmed(), c.work_ids.join(", "));
                }
            }
        }
        Format::Minimal => {
            for c in conflicts {
                println!("{} {}", c.pattern, c.agents.join(","));
            }
        }
    }
    Ok(())
}

pub fn print_summaries(summaries: &[AgentSummary], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(summaries)?),
        Format::Pretty => {
            if summaries.is_empty() {
                println!("{}", "No agents registered.".dimmed());
            }
            for s in summaries {
                let claims = if s.active_claims.is_empty() {
                    "-".to_string()
                } else {
                    s.active_claims.join(", ")
                };
                println!(
                    "{:<20} {:<10} {:<12} {}",
                    s.name.cyan(),
                    status_label(s.status),
                    s.last_seen_ago.dimmed(),
                    claims
                );
            }
        }
        Format::Minimal => {
            for s in summaries {
                println!("{} {} {}", s.name, s.status, s.claim_count);
            }
        }
    }
    Ok(())
}
