use thiserror::Error;

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("training corpus is empty")]
    EmptyCorpus,

    #[error("palette {palette}, entry {entry}: {reason}")]
    InvalidRecord {
        palette: usize,
        entry: usize,
        reason: String,
    },

    #[error("entry {entry}: {reason}")]
    InvalidEntry { entry: usize, reason: String },

    #[error("palette has no colors")]
    EmptyPalette,

    #[error("feature vector has {actual} slots, map was trained on {expected}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("cannot synthesize a palette from an empty bucket")]
    EmptyBucket,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("corpus is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
