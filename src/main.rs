use clap::{Parser, Subcommand};
use hive::commands::{self, agent::RegisterRequest, require_agent};
use hive::model::ClaimReason;
use hive::output::Format;

#[derive(Parser)]
#[command(
    name = "hive",
    version,
    about = "Work claims and file hints for agents sharing one codebase"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    /// Emit debug logs to stderr (overridden by HIVE_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new .hive/ directory in the current project
    Init,
    /// Register (or re-register) an agent
    Register {
        /// Agent name (default: $HIVE_AGENT, then auto-generated)
        #[arg(long)]
        name: Option<String>,
        /// Model identifier
        #[arg(long, default_value = "")]
        model: String,
        /// Client program driving the agent
        #[arg(long)]
        program: String,
        /// Session ID (default: $HIVE_SESSION_ID, then auto-generated)
        #[arg(long)]
        session_id: Option<String>,
        /// Client version recorded in metadata
        #[arg(long)]
        client_version: Option<String>,
        /// Tag to attach (repeatable)
        #[arg(long)]
        tag: Vec<String>,
    },
    /// Remove an agent and everything it holds
    Unregister {
        /// Agent name (default: $HIVE_AGENT)
        #[arg(long)]
        name: Option<String>,
    },
    /// Mark an agent as alive
    Heartbeat {
        /// Agent name (default: $HIVE_AGENT)
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered agents
    List {
        /// Only agents seen within the inactivity threshold
        #[arg(long)]
        active: bool,
    },
    /// Display one agent
    Show {
        /// Agent name
        name: String,
    },
    /// Claim a work item
    Claim {
        /// Work item ID
        work_id: String,
        /// Claiming agent (default: $HIVE_AGENT)
        #[arg(long)]
        agent: Option<String>,
        /// Why the item is claimed
        #[arg(long, value_enum, default_value = "implementing")]
        reason: ClaimReason,
        /// Free-form note
        #[arg(long)]
        note: Option<String>,
        /// Lease length in seconds (default from config)
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Release a claimed work item
    Release {
        /// Work item ID
        work_id: String,
        /// Releasing agent (default: $HIVE_AGENT)
        #[arg(long)]
        agent: Option<String>,
    },
    /// Show which agent holds a work item
    Holder {
        /// Work item ID
        work_id: String,
    },
    /// List every unexpired claim
    Claims,
    /// Advisory file hints
    Hint {
        #[command(subcommand)]
        action: HintAction,
    },
    /// Show patterns hinted by more than one active agent
    Conflicts,
    /// Per-agent summary and file conflicts
    Status,
    /// Drop expired claims and hints and reclassify idle agents
    Cleanup,
}

#[derive(Subcommand)]
enum HintAction {
    /// Declare that an agent is editing a file or glob
    Add {
        /// Path or glob pattern
        pattern: String,
        /// Agent name (default: $HIVE_AGENT)
        #[arg(long)]
        agent: Option<String>,
        /// Work item the edit belongs to
        #[arg(long)]
        work_id: Option<String>,
        /// Hint lifetime in seconds (default from config)
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Withdraw a hint
    Remove {
        /// Path or glob pattern
        pattern: String,
        /// Agent name (default: $HIVE_AGENT)
        #[arg(long)]
        agent: Option<String>,
    },
}

fn run(cli: Cli, format: Format) -> hive::error::Result<()> {
    let root = hive::store::workspace::find_project_root;

    match cli.command {
        Commands::Init => commands::init::run(&std::env::current_dir()?),
        Commands::Register {
            name,
            model,
            program,
            session_id,
            client_version,
            tag,
        } => {
            let name = name
                .filter(|n| !n.trim().is_empty())
                .or_else(hive::agent::resolve_agent)
                .unwrap_or_else(hive::agent::generated_fallback);
            let session_id = session_id
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(hive::agent::resolve_session_id);
            let req = RegisterRequest {
                name,
                model,
                program,
                session_id,
                client_version,
                tags: tag,
            };
            commands::agent::register(&root()?, req, format)
        }
        Commands::Unregister { name } => {
            commands::agent::unregister(&root()?, &require_agent(name)?, format)
        }
        Commands::Heartbeat { name } => {
            commands::agent::heartbeat(&root()?, &require_agent(name)?, format)
        }
        Commands::List { active } => commands::agent::list(&root()?, active, format),
        Commands::Show { name } => commands::agent::show(&root()?, &name, format),
        Commands::Claim {
            work_id,
            agent,
            reason,
            note,
            ttl_secs,
        } => commands::claim::claim(
            &root()?,
            &require_agent(agent)?,
            &work_id,
            reason,
            note,
            ttl_secs,
            format,
        ),
        Commands::Release { work_id, agent } => {
            commands::claim::release(&root()?, &require_agent(agent)?, &work_id, format)
        }
        Commands::Holder { work_id } => commands::claim::holder(&root()?, &work_id, format),
        Commands::Claims => commands::claim::list(&root()?, format),
        Commands::Hint { action } => match action {
            HintAction::Add {
                pattern,
                agent,
                work_id,
                ttl_secs,
            } => commands::hint::add(
                &root()?,
                &require_agent(agent)?,
                &pattern,
                work_id,
                ttl_secs,
                format,
            ),
            HintAction::Remove { pattern, agent } => {
                commands::hint::remove(&root()?, &require_agent(agent)?, &pattern, format)
            }
        },
        Commands::Conflicts => commands::hint::conflicts(&root()?, format),
        Commands::Status => commands::status::run(&root()?, format),
        Commands::Cleanup => commands::cleanup::run(&root()?, format),
    }
}

fn main() {
    let cli = Cli::parse();
    hive::logging::init(cli.verbose);
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };
    if let Err(e) = run(cli, format) {
        tracing::debug!(code = e.code(), "command failed");
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
