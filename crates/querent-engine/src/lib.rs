pub mod error;
pub mod executor;
pub mod log;
pub mod node;
pub mod pipeline;
pub mod prompts;
pub mod registry;
pub mod sql;

use std::sync::Arc;

use querent_db::{ListTablesTool, SchemaTool, SqlDatabase};

pub use error::EngineError;
pub use executor::ToolExecutor;
pub use log::ConversationLog;
pub use node::{next_transition, Node, Transition};
pub use pipeline::{Pipeline, PipelineRun, Snapshot};
pub use registry::ToolRegistry;

/// Registry holding the two introspection tools over `db`.
pub fn introspection_registry(db: Arc<dyn SqlDatabase>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ListTablesTool::new(Arc::clone(&db))));
    registry.register(Arc::new(SchemaTool::new(db)));
    registry
}
