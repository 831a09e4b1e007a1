//! Read-only projections of registry state for human-facing consumers.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AgentRegistration, AgentStatus};

/// Display record for one agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSummary {
    pub name: String,
    pub program: String,
    pub status: AgentStatus,
    pub claim_count: usize,
    pub active_claims: Vec<String>,
    pub last_seen: DateTime<Utc>,
    pub last_seen_ago: String,
}

/// A pattern hinted by two or more distinct active agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileConflict {
    pub pattern: String,
    pub agents: Vec<String>,
    /// Work items tied to the overlapping hints. May repeat.
    pub work_ids: Vec<String>,
}

/// Project agents into summaries, sorted by name.
pub fn summarize<'a>(
    agents: impl IntoIterator<Item = &'a AgentRegistration>,
    now: DateTime<Utc>,
) -> Vec<AgentSummary> {
    let mut summaries: Vec<AgentSummary> = agents
        .into_iter()
        .map(|agent| {
            let active_claims: Vec<String> = agent
                .active_claims(now)
                .into_iter()
                .map(|c| c.work_id)
                .collect();
            AgentSummary {
                name: agent.name.clone(),
                program: agent.program.clone(),
                status: agent.status,
                claim_count: active_claims.len(),
                active_claims,
                last_seen: agent.last_seen,
                last_seen_ago: humanize_since(now - agent.last_seen),
            }
        })
        .collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    summaries
}

/// Group unexpired hints of agents active within `inactivity` by pattern and
/// report every pattern touched by at least two distinct agents.
pub fn file_conflicts<'a>(
    agents: impl IntoIterator<Item = &'a AgentRegistration>,
    now: DateTime<Utc>,
    inactivity: Duration,
) -> Vec<FileConflict> {
    let mut by_pattern: BTreeMap<&str, (Vec<&str>, Vec<&str>)> = BTreeMap::new();

    for agent in agents {
        if !agent.is_active(now, inactivity) {
            continue;
        }
        for hint in agent.file_hints.iter().filter(|h| !h.is_expired(now)) {
            let (names, work_ids) = by_pattern.entry(hint.pattern.as_str()).or_default();
            if !names.contains(&agent.name.as_str()) {
                names.push(agent.name.as_str());
            }
            if let Some(ref id) = hint.work_id {
                work_ids.push(id.as_str());
            }
        }
    }

    by_pattern
        .into_iter()
        .filter(|(_, (names, _))| names.len() > 1)
        .map(|(pattern, (mut names, work_ids))| {
            names.sort_unstable();
            FileConflict {
                pattern: pattern.to_string(),
                agents: names.into_iter().map(String::from).collect(),
                work_ids: work_ids.into_iter().map(String::from).collect(),
            }
        })
        .collect()
}

/// Render elapsed time the way a status line reads it ("3 minutes ago").
pub fn humanize_since(elapsed: Duration) -> String {
    if elapsed < Duration::minutes(1) {
        return "just now".into();
    }
    if elapsed < Duration::hours(1) {
        return plural(elapsed.num_minutes(), "minute");
    }
    if elapsed < Duration::days(1) {
        return plural(elapsed.num_hours(), "hour");
    }
    plural(elapsed.num_days(), "day")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClaimReason, FileHint, WorkClaim};

    fn agent(name: &str, hints: &[(&str, Option<&str>)]) -> AgentRegistration {
        let mut reg = AgentRegistration::new(name, "model", "cli");
        for (pattern, work_id) in hints {
            reg.file_hints
                .push(FileHint::new(*pattern, name, work_id.map(String::from)));
        }
        reg
    }

    #[test]
    fn humanize_since_table() {
        let cases = [
            (Duration::seconds(30), "just now"),
            (Duration::minutes(1), "1 minute ago"),
            (Duration::minutes(5), "5 minutes ago"),
            (Duration::hours(1), "1 hour ago"),
            (Duration::hours(3), "3 hours ago"),
            (Duration::hours(24), "1 day ago"),
            (Duration::hours(72), "3 days ago"),
        ];
        for (elapsed, want) in cases {
            assert_eq!(humanize_since(elapsed), want, "elapsed {elapsed:?}");
        }
    }

    #[test]
    fn summarize_counts_only_live_claims() {
        let now = Utc::now();
        let mut reg = AgentRegistration::new("a", "model", "cli");
        reg.claimed_work
            .push(WorkClaim::new("bd-1", "a", ClaimReason::Implementing));
        let mut expired = WorkClaim::new("bd-2", "a", ClaimReason::Testing);
        expired.claimed_at = now - Duration::hours(2);
        expired.expires_at = now - Duration::hours(1);
        reg.claimed_work.push(expired);

        let summaries = summarize([&reg], now);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].claim_count, 1);
        assert_eq!(summaries[0].active_claims, vec!["bd-1"]);
        assert_eq!(summaries[0].last_seen_ago, "just now");
    }

    #[test]
    fn conflicts_need_two_distinct_agents() {
        let now = Utc::now();
        let a = agent("a", &[("main.go", Some("bd-1")), ("main.go", None)]);
        let b = agent("b", &[("main.go", Some("bd-2")), ("lib.go", None)]);

        let only_a = file_conflicts([&a], now, Duration::minutes(30));
        assert!(only_a.is_empty(), "one agent hinting twice is not a conflict");

        let conflicts = file_conflicts([&b, &a], now, Duration::minutes(30));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].pattern, "main.go");
        assert_eq!(conflicts[0].agents, vec!["a", "b"]);
        let mut ids = conflicts[0].work_ids.clone();
        ids.sort();
        assert_eq!(ids, vec!["bd-1", "bd-2"]);
    }

    #[test]
    fn conflicts_ignore_inactive_agents_and_expired_hints() {
        let now = Utc::now();
        let a = agent("a", &[("main.go", None)]);
        let mut idle = agent("b", &[("main.go", None)]);
        idle.last_seen = now - Duration::minutes(45);
        assert!(file_conflicts([&a, &idle], now, Duration::minutes(30)).is_empty());

        let mut expired = agent("c", &[("main.go", None)]);
        expired.file_hints[0].expires_at = now - Duration::seconds(1);
        assert!(file_conflicts([&a, &expired], now, Duration::minutes(30)).is_empty());
    }
}
