use thiserror::Error;

/// Errors produced by the archive catalog and retrieval functions.
///
/// Per-file transfer failures during a download are never raised through
/// this type; they are collected into a [`crate::download::DownloadReport`]
/// so partial success is always possible.
#[derive(Debug, Error)]
pub enum ArchError {
    /// A caller-supplied value failed validation. The message names the
    /// offending value and the accepted canonical keys. Always raised
    /// before any I/O happens.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal template/table lookup failed for a combination the
    /// validation layer accepted. Signals a gap in the static tables,
    /// not bad caller input.
    #[error("configuration gap: {0}")]
    Configuration(String),

    /// A listed filename does not match the template for its context.
    #[error("cannot decode filename '{fname}': {reason}")]
    Decode { fname: String, reason: String },

    /// A search produced zero matching acquisition times.
    #[error("no data found: {0}")]
    NotFound(String),

    /// A search produced fewer acquisition times than requested.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A consistency check detected an irregular timestep sequence or a
    /// mixture of acquisition modes.
    #[error("irregular interval: {0}")]
    IrregularInterval(String),

    /// The storage collaborator failed (listing, stat or transfer).
    #[error("storage error: {0}")]
    Storage(String),
}

impl ArchError {
    pub(crate) fn invalid(value: &str, kind: &str, valid: &[&str]) -> Self {
        ArchError::InvalidArgument(format!(
            "'{}' is not a valid {}. Available {}: {:?}",
            value, kind, kind, valid
        ))
    }

    pub(crate) fn decode(fname: &str, reason: impl Into<String>) -> Self {
        ArchError::Decode {
            fname: fname.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for ArchError {
    fn from(err: std::io::Error) -> Self {
        ArchError::Storage(err.to_string())
    }
}
