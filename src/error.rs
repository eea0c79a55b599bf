use thiserror::Error;

/// Errors raised while loading level or engine data. The frame loop itself
/// never fails.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("map has no cells")]
    EmptyMap,

    #[error("map row {row} has {found} cells, expected {expected}")]
    RaggedMap {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid map cell {ch:?} at row {row}, column {col}")]
    InvalidCell { row: usize, col: usize, ch: char },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
