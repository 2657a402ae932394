use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackForgeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML Error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    #[error("Malformed result file '{path}': {reason}")]
    MalformedArtifact { path: PathBuf, reason: String },

    #[error("Checkpoint '{path}' is unreadable: {reason}")]
    Checkpoint { path: PathBuf, reason: String },

    #[error("Checkpoint schema version {found} is not supported (expected {expected})")]
    CheckpointVersion { found: u32, expected: u32 },

    #[error("Could not find an untested weight set after {attempts} draws")]
    CandidateSpaceExhausted { attempts: usize },

    #[error("Optimization halted (last checkpointed iteration: {}): {source}", fmt_iteration(.last_checkpoint))]
    Halted {
        last_checkpoint: Option<usize>,
        #[source]
        source: Box<TrackForgeError>,
    },
}

fn fmt_iteration(it: &Option<usize>) -> String {
    match it {
        Some(i) => i.to_string(),
        None => "none".to_string(),
    }
}

pub type TfResult<T> = Result<T, TrackForgeError>;
