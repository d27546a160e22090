use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposerError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Target document has no /{dictionary} dictionary to merge into")]
    PreconditionMissing { dictionary: &'static str },

    #[error("ID tree key '{key}' does not follow the 'node' + 8 digit scheme")]
    IncompatibleIdScheme { key: String },

    #[error("/{tree} has more than one leaf; only single-leaf name trees are supported")]
    MultiLevelIdTreeUnsupported { tree: &'static str },

    #[error("ID tree cannot hold {requested} more keys ({available} left in the 8 digit range)")]
    IdSpaceExhausted { requested: usize, available: u64 },

    #[error("Malformed object graph: {0}")]
    Malformed(String),
}
