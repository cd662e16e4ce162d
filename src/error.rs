use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SeqDedupError {
    #[error("malformed FASTA in {file} at record {record}: {message}")]
    Decode {
        file: String,
        record: usize,
        message: String,
    },

    #[error("failed to write FASTA output: {0}")]
    Encode(String),

    #[error("invalid sequence digest: {0}")]
    InvalidDigest(String),

    #[error("invalid type marker: {0:?}")]
    InvalidTypeMarker(String),

    #[error("missing config file seqdedup.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("no input files given")]
    MissingInput,
}

impl SeqDedupError {
    /// `record` is the 1-based index of the record being read when the
    /// error occurred.
    pub fn decode(file: impl Into<String>, record: usize, message: impl Into<String>) -> Self {
        SeqDedupError::Decode {
            file: file.into(),
            record,
            message: message.into(),
        }
    }

    /// Process exit status: 2 for bad input or usage, 3 for output failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            SeqDedupError::Decode { .. }
            | SeqDedupError::MissingInput
            | SeqDedupError::MissingConfig
            | SeqDedupError::ConfigRead(_)
            | SeqDedupError::ConfigParse(_)
            | SeqDedupError::InvalidTypeMarker(_) => 2,
            SeqDedupError::Filesystem(_) | SeqDedupError::Encode(_) => 3,
            SeqDedupError::InvalidDigest(_) => 1,
        }
    }
}
