use docunion_pdf_composer::ComposerError;
use thiserror::Error;

/// Errors raised while configuring or running a merge job.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Merge failed: {0}")]
    Merge(#[from] ComposerError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job file is not valid JSON: {0}")]
    JobFile(#[from] serde_json::Error),

    #[error("Job is not configured: {0}")]
    Config(String),
}
