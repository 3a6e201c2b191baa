use std::{io, path::PathBuf};

use thiserror::Error;

/// A routing-table text record that could not be turned into a path record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("record has no announced prefix")]
    MissingPrefix,

    #[error("record has an empty AS path")]
    EmptyPath,

    #[error("no upstream AS distinct from origin {origin}")]
    DegeneratePath { origin: String },
}

/// An `asn` allocation row that was recognised but cannot be applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    /// The country field is the `*` wildcard or empty.
    #[error("allocation of AS {asn} carries no country code")]
    NoCountry { asn: String },

    /// The country field holds something other than ASCII letters and digits.
    #[error("allocation of AS {asn} carries invalid country code {cc:?}")]
    InvalidCountry { asn: String, cc: String },
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph i/o: {0}")]
    Io(#[from] io::Error),

    #[error("graph document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid graph document: {0}")]
    InvalidDocument(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("required artifact {0} does not exist")]
    MissingArtifact(PathBuf),

    #[error("artifact name {0} must end with .json")]
    InvalidArtifactName(PathBuf),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
