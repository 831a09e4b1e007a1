use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::config::LeasePolicy;
use crate::error::{HiveError, Result};
use crate::model::{AgentRegistration, AgentStatus, FileHint, WorkClaim, normalize_pattern};
use crate::report::{self, AgentSummary, FileConflict};
use crate::store::snapshot;

/// File name of the registry snapshot inside the coordination directory.
pub const AGENTS_FILE: &str = "agents.jsonl";

/// What a cleanup sweep changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub claims_removed: usize,
    pub hints_removed: usize,
    pub marked_inactive: usize,
    pub marked_gone: usize,
}

/// In-process registry of agents, their claims, and their file hints.
///
/// One reader/writer lock guards the whole map. Every read hands back an
/// owned copy, so the store stays the only mutator of its records. The
/// claim conflict scan and the insert that follows run under the same write
/// guard, which is what makes `claim` first-come-first-served.
///
/// Expiry is evaluated on read; nothing fires on a timer. Expired entries
/// stay visible through `get`/`list` until `cleanup_expired` runs, so an
/// embedding application should sweep about once per heartbeat interval.
///
/// `load`/`save` take no file lock. Two stores in different processes
/// pointed at the same directory will overwrite each other (last save wins).
pub struct CoordinationStore {
    dir: PathBuf,
    policy: LeasePolicy,
    agents: RwLock<HashMap<String, AgentRegistration>>,
}

impl CoordinationStore {
    /// Create an empty store backed by `dir/agents.jsonl`. Nothing is read
    /// until `load` is called.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_policy(dir, LeasePolicy::default())
    }

    pub fn with_policy(dir: impl Into<PathBuf>, policy: LeasePolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
            agents: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn policy(&self) -> &LeasePolicy {
        &self.policy
    }

    pub fn agents_file_path(&self) -> PathBuf {
        self.dir.join(AGENTS_FILE)
    }

    // -- persistence --------------------------------------------------------

    /// Replace the in-memory registry with the snapshot on disk. A missing
    /// file yields an empty registry. On a parse failure the previous
    /// in-memory state is kept, but the caller should not keep using the
    /// store.
    pub fn load(&self) -> Result<()> {
        let path = self.agents_file_path();
        let mut agents = self.agents.write();

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        *agents = snapshot::decode_registry(&content, &path, Utc::now())?;
        debug!(path = %path.display(), agents = agents.len(), "loaded registry");
        Ok(())
    }

    /// Atomically rewrite the snapshot with the full registry, sorted by name.
    pub fn save(&self) -> Result<()> {
        let path = self.agents_file_path();
        let agents = self.agents.read();

        let mut records: Vec<&AgentRegistration> = agents.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        let encoded = snapshot::encode_records(records)?;
        snapshot::write_atomic(&path, encoded.as_bytes())?;

        debug!(path = %path.display(), agents = agents.len(), "saved registry");
        Ok(())
    }

    // -- registration -------------------------------------------------------

    /// Insert or update an agent. A re-registration keeps the original
    /// `started_at`, and carries forward existing claims/hints when the
    /// incoming record has none. Returns a copy of the stored record.
    pub fn register(&self, mut reg: AgentRegistration) -> Result<AgentRegistration> {
        for hint in &mut reg.file_hints {
            hint.pattern = normalize_pattern(&hint.pattern);
        }
        // Repeats collapse to the last entry, as a renewal would.
        keep_last_by(&mut reg.claimed_work, |c| c.work_id.as_str());
        keep_last_by(&mut reg.file_hints, |h| h.pattern.as_str());
        reg.metadata.normalize();
        reg.validate()?;

        let mut agents = self.agents.write();
        let now = Utc::now();

        // Incoming leases must not collide with anyone else's live claim.
        for claim in reg.claimed_work.iter().filter(|c| !c.is_expired(now)) {
            if let Some(holder) = live_holder(&agents, &claim.work_id, now, Some(&reg.name)) {
                return Err(HiveError::ClaimConflict {
                    work_id: claim.work_id.clone(),
                    holder: holder.to_string(),
                });
            }
        }

        if let Some(existing) = agents.remove(&reg.name) {
            reg.started_at = existing.started_at;
            if reg.claimed_work.is_empty() {
                reg.claimed_work = existing.claimed_work;
            }
            if reg.file_hints.is_empty() {
                reg.file_hints = existing.file_hints;
            }
        }
        reg.last_seen = now;

        debug!(agent = %reg.name, program = %reg.program, "registered agent");
        agents.insert(reg.name.clone(), reg.clone());
        Ok(reg)
    }

    /// Remove an agent along with every claim and hint it holds.
    pub fn unregister(&self, name: &str) -> Result<()> {
        let mut agents = self.agents.write();
        if agents.remove(name).is_none() {
            return Err(HiveError::AgentNotFound(name.into()));
        }
        debug!(agent = %name, "unregistered agent");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<AgentRegistration> {
        self.agents.read().get(name).cloned()
    }

    /// All registered agents, sorted by name.
    pub fn list(&self) -> Vec<AgentRegistration> {
        let mut agents: Vec<AgentRegistration> = self.agents.read().values().cloned().collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        agents
    }

    /// Agents seen within `timeout`, sorted by name.
    pub fn active_agents(&self, timeout: Duration) -> Vec<AgentRegistration> {
        let now = Utc::now();
        let mut agents: Vec<AgentRegistration> = self
            .agents
            .read()
            .values()
            .filter(|a| a.is_active(now, timeout))
            .cloned()
            .collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        agents
    }

    pub fn heartbeat(&self, name: &str) -> Result<()> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(name)
            .ok_or_else(|| HiveError::AgentNotFound(name.into()))?;
        agent.last_seen = Utc::now();
        agent.status = AgentStatus::Active;
        debug!(agent = %name, "heartbeat");
        Ok(())
    }

    // -- claims -------------------------------------------------------------

    /// Take a lease on `claim.work_id` for `agent_name`.
    ///
    /// Fails with `ClaimConflict` if any other agent holds an unexpired claim
    /// on the same id. A claim the agent already holds on that id is replaced
    /// (renewal), whatever its reason.
    pub fn claim(&self, agent_name: &str, claim: WorkClaim) -> Result<()> {
        claim.validate()?;
        claim.ensure_held_by(agent_name)?;

        let mut agents = self.agents.write();
        if !agents.contains_key(agent_name) {
            return Err(HiveError::AgentNotFound(agent_name.into()));
        }

        let now = Utc::now();
        if let Some(holder) = live_holder(&agents, &claim.work_id, now, Some(agent_name)) {
            return Err(HiveError::ClaimConflict {
                work_id: claim.work_id,
                holder: holder.to_string(),
            });
        }

        let agent = agents
            .get_mut(agent_name)
            .ok_or_else(|| HiveError::AgentNotFound(agent_name.into()))?;
        agent.claimed_work.retain(|c| c.work_id != claim.work_id);
        debug!(agent = %agent_name, work_id = %claim.work_id, reason = %claim.reason, "claimed work item");
        agent.claimed_work.push(claim);
        agent.last_seen = now;
        Ok(())
    }

    pub fn release(&self, agent_name: &str, work_id: &str) -> Result<()> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_name)
            .ok_or_else(|| HiveError::AgentNotFound(agent_name.into()))?;

        let before = agent.claimed_work.len();
        agent.claimed_work.retain(|c| c.work_id != work_id);
        if agent.claimed_work.len() == before {
            return Err(HiveError::ClaimNotFound {
                agent: agent_name.into(),
                work_id: work_id.into(),
            });
        }
        agent.last_seen = Utc::now();
        debug!(agent = %agent_name, work_id = %work_id, "released work item");
        Ok(())
    }

    /// The agent holding an unexpired claim on `work_id`, if any.
    pub fn get_claim_holder(&self, work_id: &str) -> Option<AgentRegistration> {
        let agents = self.agents.read();
        let holder = live_holder(&agents, work_id, Utc::now(), None)?;
        agents.get(holder).cloned()
    }

    /// Every unexpired claim in the registry, sorted by work item id.
    pub fn get_all_claims(&self) -> Vec<WorkClaim> {
        let now = Utc::now();
        let mut claims: Vec<WorkClaim> = self
            .agents
            .read()
            .values()
            .flat_map(|a| a.active_claims(now))
            .collect();
        claims.sort_by(|a, b| a.work_id.cmp(&b.work_id));
        claims
    }

    // -- file hints ---------------------------------------------------------

    /// Record that `agent_name` is editing `hint.pattern`. Never rejected for
    /// overlap; a hint the agent already holds on the same pattern is
    /// replaced.
    pub fn add_file_hint(&self, agent_name: &str, mut hint: FileHint) -> Result<()> {
        hint.pattern = normalize_pattern(&hint.pattern);
        hint.validate()?;
        hint.ensure_held_by(agent_name)?;

        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_name)
            .ok_or_else(|| HiveError::AgentNotFound(agent_name.into()))?;
        agent.file_hints.retain(|h| h.pattern != hint.pattern);
        debug!(agent = %agent_name, pattern = %hint.pattern, "added file hint");
        agent.file_hints.push(hint);
        agent.last_seen = Utc::now();
        Ok(())
    }

    pub fn remove_file_hint(&self, agent_name: &str, pattern: &str) -> Result<()> {
        let pattern = normalize_pattern(pattern);
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_name)
            .ok_or_else(|| HiveError::AgentNotFound(agent_name.into()))?;

        let before = agent.file_hints.len();
        agent.file_hints.retain(|h| h.pattern != pattern);
        if agent.file_hints.len() == before {
            return Err(HiveError::HintNotFound {
                agent: agent_name.into(),
                pattern,
            });
        }
        agent.last_seen = Utc::now();
        debug!(agent = %agent_name, pattern = %pattern, "removed file hint");
        Ok(())
    }

    /// Patterns hinted by two or more distinct active agents. Recomputed on
    /// every call.
    pub fn get_file_conflicts(&self) -> Vec<FileConflict> {
        self.get_file_conflicts_at(Utc::now())
    }

    pub fn get_file_conflicts_at(&self, now: DateTime<Utc>) -> Vec<FileConflict> {
        let agents = self.agents.read();
        report::file_conflicts(agents.values(), now, self.policy.inactivity_threshold)
    }

    // -- sweeping and reporting ---------------------------------------------

    /// Drop expired claims and hints, then reclassify idle agents as
    /// Inactive or Gone. Agents are never deleted here.
    pub fn cleanup_expired(&self) -> CleanupReport {
        self.cleanup_expired_at(Utc::now())
    }

    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> CleanupReport {
        let mut agents = self.agents.write();
        let mut report = CleanupReport::default();

        for agent in agents.values_mut() {
            let claims_before = agent.claimed_work.len();
            agent.claimed_work.retain(|c| !c.is_expired(now));
            report.claims_removed += claims_before - agent.claimed_work.len();

            let hints_before = agent.file_hints.len();
            agent.file_hints.retain(|h| !h.is_expired(now));
            report.hints_removed += hints_before - agent.file_hints.len();

            if agent.is_stale(now, self.policy.stale_threshold) {
                if agent.status != AgentStatus::Gone {
                    agent.status = AgentStatus::Gone;
                    report.marked_gone += 1;
                }
            } else if !agent.is_active(now, self.policy.inactivity_threshold)
                && agent.status != AgentStatus::Inactive
            {
                agent.status = AgentStatus::Inactive;
                report.marked_inactive += 1;
            }
        }

        if report != CleanupReport::default() {
            debug!(?report, "swept expired coordination state");
        }
        report
    }

    pub fn summary(&self) -> Vec<AgentSummary> {
        self.summary_at(Utc::now())
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> Vec<AgentSummary> {
        report::summarize(self.agents.read().values(), now)
    }
}

/// Drop all but the last item for each key, keeping the survivors in order.
fn keep_last_by<T>(items: &mut Vec<T>, key: impl Fn(&T) -> &str) {
    let mut seen = HashSet::new();
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items.drain(..).rev() {
        if seen.insert(key(&item).to_string()) {
            kept.push(item);
        }
    }
    kept.reverse();
    *items = kept;
}

/// Name of the agent (other than `skip`) holding a live claim on `work_id`.
fn live_holder<'a>(
    agents: &'a HashMap<String, AgentRegistration>,
    work_id: &str,
    now: DateTime<Utc>,
    skip: Option<&str>,
) -> Option<&'a str> {
    agents
        .values()
        .filter(|a| skip != Some(a.name.as_str()))
        .find(|a| {
            a.claimed_work
                .iter()
                .any(|c| c.work_id == work_id && !c.is_expired(now))
        })
        .map(|a| a.name.as_str())
}
