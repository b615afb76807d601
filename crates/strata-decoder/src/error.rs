use std::error::Error as StdError;
use std::sync::Arc;

use strata_sync::Abandoned;
use strata_types::FileFormat;

/// Errors a parser can fail with while decoding a run of chunks.
///
/// Concrete parsers return these from `Parser::run`. The worker
/// protocol does not tell the variants apart: whatever the parser
/// returns is wrapped into a [`Failure`] and delivered to the consumer
/// through the header result and the output queue.
///
/// ```text
///   DecodeError
///   ├── Malformed          ← input violates the format at some offset
///   ├── Truncated          ← input ended in the middle of a structure
///   ├── Io(io::Error)      ← the chunk source failed to read
///   ├── Protocol           ← a pipeline contract was broken
///   ├── Panicked           ← the parser panicked; the message is kept
///   └── Format(Box<dyn>)   ← decoder-specific detail
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The input does not follow the format's rules.
    #[error("malformed input at offset {offset}: {reason}")]
    Malformed { offset: u64, reason: String },

    /// End of input reached while a structure was still open.
    #[error("input ended before {expected}")]
    Truncated { expected: &'static str },

    /// Reading the input failed. Surfaced by the chunk source.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// The parser panicked. Caught at the worker boundary so the panic
    /// never unwinds past the worker thread.
    #[error("parser panicked: {0}")]
    Panicked(String),

    /// Anything a concrete parser wants to report in its own terms.
    #[error("{0}")]
    Format(#[source] Box<dyn StdError + Send + Sync>),
}

impl DecodeError {
    pub fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    /// Wrap a decoder-specific error.
    pub fn format(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Format(err.into())
    }
}

/// A component broke one of the single-write / single-read contracts
/// of the pipeline.
///
/// These indicate programming errors in a parser (or in the pipeline),
/// not bad input. They still travel as data so the consumer is never
/// left blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// `ParserContext::set_header` called a second time.
    #[error("header was already resolved")]
    HeaderAlreadySet,

    /// The parser returned successfully without resolving the header.
    #[error("parser finished without resolving the header")]
    HeaderNotSet,

    /// A result slot was dropped without being written.
    #[error(transparent)]
    Abandoned(#[from] Abandoned),
}

/// The failure value that crosses the thread boundary.
///
/// One decode error may have to reach the consumer twice, through the
/// header result and through the output queue, so it is shared rather
/// than copied. Cloning is cheap.
#[derive(Clone, Debug, thiserror::Error)]
#[error(transparent)]
pub struct Failure(Arc<DecodeError>);

impl Failure {
    /// The underlying decode error.
    #[must_use]
    pub fn error(&self) -> &DecodeError {
        &self.0
    }

    /// Whether `self` and `other` carry the very same error instance.
    #[must_use]
    pub fn same_as(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<DecodeError> for Failure {
    fn from(err: DecodeError) -> Self {
        Self(Arc::new(err))
    }
}

impl From<ProtocolViolation> for Failure {
    fn from(violation: ProtocolViolation) -> Self {
        DecodeError::Protocol(violation).into()
    }
}

impl From<Abandoned> for Failure {
    fn from(abandoned: Abandoned) -> Self {
        ProtocolViolation::Abandoned(abandoned).into()
    }
}

/// Errors that stop a reader from being opened at all.
///
/// ```text
/// ┌───────────────────┬────────────────────────────────────────────────┐
/// │ Variant           │ Cause                                          │
/// ├───────────────────┼────────────────────────────────────────────────┤
/// │ UnsupportedFormat │ No parser registered for the file's format     │
/// │ Io                │ The input file could not be opened             │
/// │ Spawn             │ A worker thread could not be started           │
/// └───────────────────┴────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("unsupported format: {filename} ({format})")]
    UnsupportedFormat { filename: String, format: FileFormat },

    #[error("cannot open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },
}
