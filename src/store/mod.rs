pub mod lock;
pub mod registry;
pub mod snapshot;
pub mod workspace;

pub use registry::{CleanupReport, CoordinationStore};
pub use workspace::Workspace;
