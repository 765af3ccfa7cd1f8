#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("required tool not registered: {0}")]
    MissingTool(String),
}
