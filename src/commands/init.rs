use std::path::Path;

use crate::error::Result;
use crate::store::Workspace;

pub fn run(project_root: &Path) -> Result<()> {
    let ws = Workspace::init(project_root)?;
    ws.store().save()?;

    eprintln!("Initialized .hive/ in {}", project_root.display());
    Ok(())
}
