//! Error types and result definitions for the deletion pipeline.
//!
//! Provides an error system with classification and aggregation. The
//! [`DeleterError`] type supports single errors, errors with additional
//! detail, and multiple aggregated errors for multi-worker failure scenarios.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::sync::Arc;

/// Convenient result type for pipeline operations using [`DeleterError`] as
/// the error type.
pub type DeleterResult<T> = Result<T, DeleterError>;

/// Detailed payload stored for single [`DeleterError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
}

/// Main error type for deletion pipeline operations.
#[derive(Debug, Clone)]
pub struct DeleterError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload.
    Single(ErrorPayload),
    /// Multiple aggregated errors.
    ///
    /// This variant is mainly useful to capture multiple worker failures.
    Many { errors: Vec<DeleterError> },
}

/// Specific categories of errors that can occur in the pipeline.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Pipeline configuration failed validation.
    ConfigError,
    /// An operation was attempted in a state that does not allow it.
    InvalidState,
    /// The deletion store rejected or failed a bulk delete.
    StoreQueryFailed,
    /// The batcher task panicked.
    BatcherPanic,
    /// A delete worker task panicked.
    DeleteWorkerPanic,
    /// The result consumer task panicked.
    ResultConsumerPanic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ConfigError => "config error",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::StoreQueryFailed => "store query failed",
            ErrorKind::BatcherPanic => "batcher panic",
            ErrorKind::DeleteWorkerPanic => "delete worker panic",
            ErrorKind::ResultConsumerPanic => "result consumer panic",
        };

        f.write_str(name)
    }
}

impl DeleterError {
    /// Returns the kind of this error.
    ///
    /// For aggregated errors, the kind of the first contained error is
    /// returned; use [`DeleterError::kinds`] to inspect all of them.
    pub fn kind(&self) -> ErrorKind {
        match &self.repr {
            ErrorRepr::Single(payload) => payload.kind,
            ErrorRepr::Many { errors } => errors
                .first()
                .map(DeleterError::kind)
                .unwrap_or(ErrorKind::InvalidState),
        }
    }

    /// Returns the kinds of all errors contained in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match &self.repr {
            ErrorRepr::Single(payload) => vec![payload.kind],
            ErrorRepr::Many { errors } => {
                errors.iter().flat_map(DeleterError::kinds).collect()
            }
        }
    }

    /// Returns the additional detail of a single error, if any.
    pub fn detail(&self) -> Option<&str> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload.detail.as_deref(),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Attaches a source error to a single error.
    ///
    /// Aggregated errors are returned unchanged.
    pub fn with_source(mut self, source: impl error::Error + Send + Sync + 'static) -> Self {
        if let ErrorRepr::Single(payload) = &mut self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }
}

impl fmt::Display for DeleterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                write!(f, "{}: {}", payload.kind, payload.description)?;

                if let Some(detail) = &payload.detail {
                    write!(f, " ({detail})")?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors } => {
                write!(f, "{} errors occurred: [", errors.len())?;

                for (index, error) in errors.iter().enumerate() {
                    if index > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{error}")?;
                }

                write!(f, "]")
            }
        }
    }
}

impl error::Error for DeleterError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| &**source as &(dyn error::Error + 'static)),
            ErrorRepr::Many { .. } => None,
        }
    }
}

impl From<(ErrorKind, &'static str)> for DeleterError {
    fn from((kind, description): (ErrorKind, &'static str)) -> Self {
        Self {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description: Cow::Borrowed(description),
                detail: None,
                source: None,
            }),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for DeleterError {
    fn from((kind, description, detail): (ErrorKind, &'static str, String)) -> Self {
        Self {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description: Cow::Borrowed(description),
                detail: Some(Cow::Owned(detail)),
                source: None,
            }),
        }
    }
}

impl From<Vec<DeleterError>> for DeleterError {
    fn from(errors: Vec<DeleterError>) -> Self {
        Self {
            repr: ErrorRepr::Many { errors },
        }
    }
}
