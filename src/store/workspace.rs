use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{HiveError, Result};
use crate::store::lock::acquire_lock;
use crate::store::registry::CoordinationStore;

pub const HIVE_DIR: &str = ".hive";
const CONFIG_FILE: &str = "config.json";
const LOCK_FILE: &str = "agents.lock";

/// A project's `.hive/` directory and its configuration.
///
/// The in-memory store is unlocked across processes; `read` and `update`
/// wrap each load/operate/save cycle in an exclusive file lock so separate
/// CLI invocations never interleave.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    pub fn open(project_root: &Path) -> Result<Self> {
        let root = project_root.join(HIVE_DIR);
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(HiveError::NotInitialized);
        }
        let config = Config::load(&config_path)?;
        Ok(Self { root, config })
    }

    /// Create `.hive/` with a default config.
    pub fn init(project_root: &Path) -> Result<Self> {
        let root = project_root.join(HIVE_DIR);
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            return Err(HiveError::AlreadyInitialized);
        }

        fs::create_dir_all(&root)?;
        let config = Config::default();
        config.save(&config_path)?;
        Ok(Self { root, config })
    }

    /// Path of the `.hive/` directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A fresh, unloaded store using this workspace's lease policy.
    pub fn store(&self) -> CoordinationStore {
        CoordinationStore::with_policy(&self.root, self.config.coordination.policy())
    }

    /// Run `f` against a freshly loaded store. Nothing is written back.
    pub fn read<T>(&self, f: impl FnOnce(&CoordinationStore) -> Result<T>) -> Result<T> {
        let _lock = acquire_lock(&self.root.join(LOCK_FILE))?;
        let store = self.store();
        store.load()?;
        f(&store)
    }

    /// Load, run `f`, sweep expired state, and save. If `f` fails the
    /// snapshot is left as it was.
    pub fn update<T>(&self, f: impl FnOnce(&CoordinationStore) -> Result<T>) -> Result<T> {
        let _lock = acquire_lock(&self.root.join(LOCK_FILE))?;
        let store = self.store();
        store.load()?;
        let out = f(&store)?;
        store.cleanup_expired();
        store.save()?;
        Ok(out)
    }
}

/// Walk up from the current directory to the nearest one containing `.hive/`.
pub fn find_project_root() -> Result<PathBuf> {
    find_project_root_from(&std::env::current_dir()?)
}

pub fn find_project_root_from(start: &Path) -> Result<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(HIVE_DIR).exists() {
            return Ok(dir);
        }
        if !dir.pop() {
            return Err(HiveError::NotInitialized);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentRegistration, ClaimReason, WorkClaim};
    use tempfile::tempdir;

    #[test]
    fn init_then_open() {
        let dir = tempdir().unwrap();
        let ws = Workspace::init(dir.path()).unwrap();
        assert!(ws.root().join("config.json").exists());

        let opened = Workspace::open(dir.path()).unwrap();
        assert_eq!(opened.config(), ws.config());

        assert!(matches!(
            Workspace::init(dir.path()),
            Err(HiveError::AlreadyInitialized)
        ));
    }

    #[test]
    fn open_uninitialized_fails() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Workspace::open(dir.path()),
            Err(HiveError::NotInitialized)
        ));
    }

    #[test]
    fn find_root_walks_up() {
        let dir = tempdir().unwrap();
        Workspace::init(dir.path()).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = find_project_root_from(&nested).unwrap();
        assert_eq!(found, dir.path());
    }

    #[test]
    fn update_persists_and_failed_update_does_not() {
        let dir = tempdir().unwrap();
        let ws = Workspace::init(dir.path()).unwrap();

        ws.update(|store| {
            store.register(AgentRegistration::new("a", "opus", "cli"))?;
            store.claim("a", WorkClaim::new("bd-1", "a", ClaimReason::Implementing))
        })
        .unwrap();

        let err = ws
            .update(|store| {
                store.release("a", "bd-1")?;
                store.release("a", "bd-1")
            })
            .unwrap_err();
        assert!(matches!(err, HiveError::ClaimNotFound { .. }));

        let holder = ws.read(|store| Ok(store.get_claim_holder("bd-1"))).unwrap();
        assert_eq!(holder.unwrap().name, "a");
    }

    #[test]
    fn store_uses_configured_policy() {
        let dir = tempdir().unwrap();
        let mut ws = Workspace::init(dir.path()).unwrap();
        ws.config.coordination.claim_ttl_secs = 90;
        assert_eq!(ws.store().policy().claim_ttl, chrono::Duration::seconds(90));
    }
}
