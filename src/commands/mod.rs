pub mod agent;
pub mod claim;
pub mod cleanup;
pub mod hint;
pub mod init;
pub mod status;

use crate::error::{HiveError, Result};

/// Explicit name first, then `$HIVE_AGENT`.
pub fn require_agent(explicit: Option<String>) -> Result<String> {
    explicit
        .filter(|s| !s.trim().is_empty())
        .or_else(crate::agent::resolve_agent)
        .ok_or_else(|| {
            HiveError::Validation("no agent name given; pass --agent or set HIVE_AGENT".into())
        })
}
