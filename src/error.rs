use std::path::PathBuf;

use heap_walker::HeapError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}. {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration. {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid heap geometry. {0}")]
    InvalidGeometry(String),
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Heap(#[from] HeapError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Unknown command `{0}`. Try `help`")]
    UnknownCommand(String),
    #[error("Usage: {0}")]
    Usage(String),
    #[error("Failed to attach to process {pid}. {source}")]
    Attach { pid: u32, source: std::io::Error },
    #[error("Failed to write output. {0}")]
    Output(#[from] std::io::Error),
}

impl CommandError {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::Heap(e) => e.kind(),
            CommandError::Config(_) => "ConfigError",
            CommandError::UnknownCommand(_) => "UnknownCommand",
            CommandError::Usage(_) => "UsageError",
            CommandError::Attach { .. } => "AttachError",
            CommandError::Output(_) => "OutputError",
        }
    }
}
