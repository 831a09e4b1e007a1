/// Resolve the agent identity from the environment.
///
/// Checks `HIVE_AGENT`. Returns `None` if unset or empty, letting callers
/// decide whether to fall back or fail.
pub fn resolve_agent() -> Option<String> {
    non_empty_env("HIVE_AGENT")
}

/// Auto-generated name for `register` when none was given.
pub fn generated_fallback() -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!("agent-{}", &token[..8])
}

/// Session id from `HIVE_SESSION_ID`, else a fresh UUID.
pub fn resolve_session_id() -> String {
    non_empty_env("HIVE_SESSION_ID").unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
