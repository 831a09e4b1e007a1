use thiserror::Error;

#[derive(Debug, Error)]
pub enum HiveError {
    #[error("not a hive project (run `hive init` first)")]
    NotInitialized,

    #[error("hive already initialized in this directory")]
    AlreadyInitialized,

    #[error("invalid record: {0}")]
    Validation(String),

    #[error("agent '{0}' not found")]
    AgentNotFound(String),

    #[error("agent '{agent}' holds no claim on '{work_id}'")]
    ClaimNotFound { agent: String, work_id: String },

    #[error("agent '{agent}' holds no file hint on '{pattern}'")]
    HintNotFound { agent: String, pattern: String },

    #[error("work item '{work_id}' is already claimed by '{holder}'")]
    ClaimConflict { work_id: String, holder: String },

    #[error("corrupt snapshot '{path}' at line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HiveError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::AlreadyInitialized => "already_initialized",
            Self::Validation(_) => "validation_error",
            Self::AgentNotFound(_) => "agent_not_found",
            Self::ClaimNotFound { .. } => "claim_not_found",
            Self::HintNotFound { .. } => "hint_not_found",
            Self::ClaimConflict { .. } => "claim_conflict",
            Self::Parse { .. } => "parse_error",
            Self::Locked(_) => "locked",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }

    /// True for operations that referenced an unknown agent, claim, or hint.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AgentNotFound(_) | Self::ClaimNotFound { .. } | Self::HintNotFound { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ClaimConflict { .. })
    }

    /// True for I/O or decoding failures while reading or writing the snapshot.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Json(_) | Self::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, HiveError>;
