use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("tool not registered: {0}")]
    UnknownTool(String),

    #[error("tool not installed: {0}")]
    ToolNotInstalled(String),

    #[error("no registered tools are installed")]
    NoToolsInstalled,

    #[error("no compatible command format for tool '{tool}'")]
    NoCompatibleFormat { tool: String },

    #[error("all candidates exhausted: {reason}")]
    Exhausted { reason: String },

    #[error("pattern store error: {0}")]
    Store(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RouterError>;
