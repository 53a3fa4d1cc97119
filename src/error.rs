use thiserror::Error;

/// Errors raised by the training engine and the dataset loader.
///
/// Every variant is raised before the failing call mutates any state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A vector length disagrees with the width the callee was built for.
    #[error("size mismatch in {context}: expected {expected}, got {got}")]
    SizeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// Forward, predict or train was attempted before any layer was added.
    #[error("network has no layers")]
    EmptyNetwork,

    /// The dataset could not be opened, read, or yielded no usable rows.
    #[error("unreadable dataset {origin}: {reason}")]
    UnreadableDataset { origin: String, reason: String },

    /// A single dataset row could not be parsed (strict loading only).
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn size_mismatch(context: &'static str, expected: usize, got: usize) -> Self {
        Error::SizeMismatch {
            context,
            expected,
            got,
        }
    }
}
