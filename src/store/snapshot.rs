//! Line-oriented snapshot encoding: one JSON registration per line.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::{HiveError, Result};
use crate::model::AgentRegistration;

/// Encode registrations as newline-terminated JSON records, in the given order.
pub fn encode_records<'a>(
    agents: impl IntoIterator<Item = &'a AgentRegistration>,
) -> Result<String> {
    let mut out = String::new();
    for agent in agents {
        out.push_str(&serde_json::to_string(agent)?);
        out.push('\n');
    }
    Ok(out)
}

/// Decode a snapshot. Blank lines are skipped; any other line that is not a
/// valid registration fails with `HiveError::Parse` naming its 1-based line.
pub fn decode_records(content: &[u8], path: &Path) -> Result<Vec<AgentRegistration>> {
    Ok(decode_lines(content, path)?
        .into_iter()
        .map(|(_, agent)| agent)
        .collect())
}

/// Decode a snapshot into a registry keyed by agent name. A later line
/// replaces an earlier one with the same name. Fails with `HiveError::Parse`
/// if two live claims on one work item survive, naming the later line.
pub fn decode_registry(
    content: &[u8],
    path: &Path,
    now: DateTime<Utc>,
) -> Result<HashMap<String, AgentRegistration>> {
    let mut latest: HashMap<String, (usize, AgentRegistration)> = HashMap::new();
    for (line, agent) in decode_lines(content, path)? {
        latest.insert(agent.name.clone(), (line, agent));
    }

    {
        let mut ordered: Vec<&(usize, AgentRegistration)> = latest.values().collect();
        ordered.sort_by_key(|(line, _)| *line);

        let mut holders: HashMap<&str, &str> = HashMap::new();
        for (line, agent) in ordered {
            for claim in agent.claimed_work.iter().filter(|c| !c.is_expired(now)) {
                if let Some(prev) = holders.insert(claim.work_id.as_str(), agent.name.as_str()) {
                    return Err(parse_error(
                        path,
                        *line,
                        format!(
                            "work item '{}' has a second live claim (already held by '{}')",
                            claim.work_id, prev
                        ),
                    ));
                }
            }
        }
    }

    Ok(latest
        .into_iter()
        .map(|(name, (_, agent))| (name, agent))
        .collect())
}

fn decode_lines(content: &[u8], path: &Path) -> Result<Vec<(usize, AgentRegistration)>> {
    let mut agents = Vec::new();
    for (idx, raw) in content.split(|b| *b == b'\n').enumerate() {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let line = idx + 1;
        let text = std::str::from_utf8(raw).map_err(|e| parse_error(path, line, e.to_string()))?;
        let agent: AgentRegistration =
            serde_json::from_str(text).map_err(|e| parse_error(path, line, e.to_string()))?;
        agent
            .validate()
            .map_err(|e| parse_error(path, line, e.to_string()))?;
        agents.push((line, agent));
    }
    Ok(agents)
}

fn parse_error(path: &Path, line: usize, message: String) -> HiveError {
    HiveError::Parse {
        path: path.display().to_string(),
        line,
        message,
    }
}

/// Write `data` to a temp file beside `path`, then rename it into place.
/// On failure the temp file is removed and `path` is left untouched.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| HiveError::Io(e.error))?;
    Ok(())
}
