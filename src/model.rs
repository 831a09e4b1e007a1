use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{HiveError, Result};

/// Default lease length of a work claim.
pub const DEFAULT_CLAIM_TTL_SECS: u64 = 30 * 60;
/// Default lifetime of a file hint.
pub const DEFAULT_HINT_TTL_SECS: u64 = 30 * 60;
/// Recommended cadence for agent heartbeats (and for the cleanup sweep).
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 5 * 60;
/// Idle time after which an agent counts as inactive.
pub const DEFAULT_INACTIVITY_THRESHOLD_SECS: u64 = 30 * 60;
/// Idle time after which an agent counts as gone.
pub const DEFAULT_STALE_THRESHOLD_SECS: u64 = 60 * 60;

// Keeps `now + ttl` far away from chrono's representable range.
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Convert a whole number of seconds into a `chrono::Duration`, saturating
/// at one hundred years.
pub fn secs(n: u64) -> Duration {
    Duration::seconds(n.min(MAX_TTL_SECS) as i64)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Active,
    Idle,
    Inactive,
    Gone,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum ClaimReason {
    #[default]
    Implementing,
    Reviewing,
    Testing,
    Debugging,
    Planning,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Idle => write!(f, "idle"),
            Self::Inactive => write!(f, "inactive"),
            Self::Gone => write!(f, "gone"),
        }
    }
}

impl FromStr for AgentStatus {
    type Err = HiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "idle" => Ok(Self::Idle),
            "inactive" => Ok(Self::Inactive),
            "gone" => Ok(Self::Gone),
            other => Err(HiveError::Validation(format!(
                "invalid agent status: {other}"
            ))),
        }
    }
}

impl fmt::Display for ClaimReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Implementing => write!(f, "implementing"),
            Self::Reviewing => write!(f, "reviewing"),
            Self::Testing => write!(f, "testing"),
            Self::Debugging => write!(f, "debugging"),
            Self::Planning => write!(f, "planning"),
        }
    }
}

impl FromStr for ClaimReason {
    type Err = HiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "implementing" => Ok(Self::Implementing),
            "reviewing" => Ok(Self::Reviewing),
            "testing" => Ok(Self::Testing),
            "debugging" => Ok(Self::Debugging),
            "planning" => Ok(Self::Planning),
            other => Err(HiveError::Validation(format!(
                "invalid claim reason: {other}"
            ))),
        }
    }
}

/// Optional descriptive metadata attached to a registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl AgentMeta {
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.session_id.is_none() && self.tags.is_empty()
    }

    /// Trim whitespace, drop empty tags, then deduplicate and sort.
    pub fn normalize(&mut self) {
        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        self.tags = tags;
    }
}

/// One agent identity working against the shared project. `name` is the
/// registry key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentRegistration {
    pub name: String,
    #[serde(default)]
    pub model: String,
    pub program: String,
    pub started_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub claimed_work: Vec<WorkClaim>,
    #[serde(default)]
    pub file_hints: Vec<FileHint>,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "AgentMeta::is_empty")]
    pub metadata: AgentMeta,
}

impl AgentRegistration {
    pub fn new(name: impl Into<String>, model: impl Into<String>, program: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            model: model.into(),
            program: program.into(),
            started_at: now,
            last_seen: now,
            claimed_work: Vec::new(),
            file_hints: Vec::new(),
            status: AgentStatus::Active,
            metadata: AgentMeta::default(),
        }
    }

    /// Check required fields, then every embedded claim and hint. Embedded
    /// records must name this agent as their holder.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(HiveError::Validation("agent name cannot be empty".into()));
        }
        if self.program.trim().is_empty() {
            return Err(HiveError::Validation("agent program cannot be empty".into()));
        }
        for claim in &self.claimed_work {
            claim.validate()?;
            claim.ensure_held_by(&self.name)?;
        }
        for hint in &self.file_hints {
            hint.validate()?;
            hint.ensure_held_by(&self.name)?;
        }
        Ok(())
    }

    /// Seen within `timeout` of `now`.
    pub fn is_active(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_seen < timeout
    }

    /// Not seen for longer than `threshold`.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now - self.last_seen > threshold
    }

    pub fn has_claim(&self, work_id: &str) -> bool {
        self.claimed_work.iter().any(|c| c.work_id == work_id)
    }

    pub fn active_claims(&self, now: DateTime<Utc>) -> Vec<WorkClaim> {
        self.claimed_work
            .iter()
            .filter(|c| !c.is_expired(now))
            .cloned()
            .collect()
    }

    pub fn active_hints(&self, now: DateTime<Utc>) -> Vec<FileHint> {
        self.file_hints
            .iter()
            .filter(|h| !h.is_expired(now))
            .cloned()
            .collect()
    }
}

/// A time-bounded lease on one work item, held by one agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkClaim {
    pub work_id: String,
    pub agent: String,
    pub claimed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reason: ClaimReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl WorkClaim {
    pub fn new(work_id: impl Into<String>, agent: impl Into<String>, reason: ClaimReason) -> Self {
        Self::with_ttl(work_id, agent, reason, secs(DEFAULT_CLAIM_TTL_SECS))
    }

    pub fn with_ttl(
        work_id: impl Into<String>,
        agent: impl Into<String>,
        reason: ClaimReason,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            work_id: work_id.into(),
            agent: agent.into(),
            claimed_at: now,
            expires_at: expiry_after(now, ttl),
            reason,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.work_id.trim().is_empty() {
            return Err(HiveError::Validation("work item id cannot be empty".into()));
        }
        if self.agent.trim().is_empty() {
            return Err(HiveError::Validation("claim agent cannot be empty".into()));
        }
        if self.claimed_at > self.expires_at {
            return Err(HiveError::Validation(format!(
                "claim on '{}' expires before it was made",
                self.work_id
            )));
        }
        Ok(())
    }

    pub(crate) fn ensure_held_by(&self, agent: &str) -> Result<()> {
        if self.agent != agent {
            return Err(HiveError::Validation(format!(
                "claim on '{}' names '{}' but is filed under '{}'",
                self.work_id, self.agent, agent
            )));
        }
        Ok(())
    }

    /// Expiry is strict: a claim is still live at exactly `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Negative once the claim has expired.
    pub fn time_to_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }
}

/// An advisory, non-exclusive marker that an agent is editing a path or glob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileHint {
    pub pattern: String,
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FileHint {
    pub fn new(pattern: impl Into<String>, agent: impl Into<String>, work_id: Option<String>) -> Self {
        Self::with_ttl(pattern, agent, work_id, secs(DEFAULT_HINT_TTL_SECS))
    }

    pub fn with_ttl(
        pattern: impl Into<String>,
        agent: impl Into<String>,
        work_id: Option<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            pattern: pattern.into(),
            agent: agent.into(),
            work_id: work_id.filter(|id| !id.trim().is_empty()),
            created_at: now,
            expires_at: expiry_after(now, ttl),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if normalize_pattern(&self.pattern).is_empty() {
            return Err(HiveError::Validation("file hint pattern cannot be empty".into()));
        }
        if self.agent.trim().is_empty() {
            return Err(HiveError::Validation("file hint agent cannot be empty".into()));
        }
        if self.created_at > self.expires_at {
            return Err(HiveError::Validation(format!(
                "file hint on '{}' expires before it was created",
                self.pattern
            )));
        }
        Ok(())
    }

    pub(crate) fn ensure_held_by(&self, agent: &str) -> Result<()> {
        if self.agent != agent {
            return Err(HiveError::Validation(format!(
                "file hint on '{}' names '{}' but is filed under '{}'",
                self.pattern, self.agent, agent
            )));
        }
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Lexically normalize a path or glob: resolve `.`/`..` components and
/// collapse duplicate separators. Preserves a trailing slash.
pub fn normalize_pattern(pattern: &str) -> String {
    let mut components: Vec<&str> = Vec::new();
    for component in pattern.trim().split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            c => components.push(c),
        }
    }
    let normalized = components.join("/");
    if pattern.trim().ends_with('/') && !normalized.is_empty() {
        format!("{normalized}/")
    } else {
        normalized
    }
}
