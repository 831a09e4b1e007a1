use std::path::Path;

use colored::Colorize;

use crate::error::{HiveError, Result};
use crate::model::{AgentMeta, AgentRegistration};
use crate::output::{self, Format};
use crate::store::Workspace;

/// Fields accepted by `hive register`.
#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub name: String,
    pub model: String,
    pub program: String,
    pub session_id: String,
    pub client_version: Option<String>,
    pub tags: Vec<String>,
}

pub fn register(project_root: &Path, req: RegisterRequest, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let mut reg = AgentRegistration::new(req.name, req.model, req.program);
    reg.metadata = AgentMeta {
        version: req.client_version,
        session_id: Some(req.session_id),
        tags: req.tags,
    };

    let stored = ws.update(|store| store.register(reg))?;
    match format {
        Format::Pretty => {
            println!("Registered '{}'", stored.name.cyan().bold());
            output::print_agent(&stored, Format::Pretty)?;
        }
        _ => output::print_agent(&stored, format)?,
    }
    Ok(())
}

pub fn unregister(project_root: &Path, name: &str, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    ws.update(|store| store.unregister(name))?;
    match format {
        Format::Json => println!("{}", serde_json::json!({ "unregistered": name })),
        Format::Pretty => println!("Unregistered '{}'", name.cyan()),
        Format::Minimal => println!("{name}"),
    }
    Ok(())
}

pub fn heartbeat(project_root: &Path, name: &str, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let agent = ws.update(|store| {
        store.heartbeat(name)?;
        store
            .get(name)
            .ok_or_else(|| HiveError::AgentNotFound(name.into()))
    })?;
    output::print_agent(&agent, format)
}

pub fn list(project_root: &Path, active_only: bool, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let agents = ws.read(|store| {
        Ok(if active_only {
            store.active_agents(store.policy().inactivity_threshold)
        } else {
            store.list()
        })
    })?;
    output::print_agents(&agents, format)
}

pub fn show(project_root: &Path, name: &str, format: Format) -> Result<()> {
    let ws = Workspace::open(project_root)?;
    let agent = ws.read(|store| {
        store
            .get(name)
            .ok_or_else(|| HiveError::AgentNotFound(name.into()))
    })?;
    output::print_agent(&agent, format)
}
