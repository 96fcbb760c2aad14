//! Error types for the reactive core.
//!
//! Errors are modeled as a tree, the same shape the rest of this codebase's
//! lineage uses to translate errors across layers: a root `Error` holding an
//! `ErrorKind` plus an optional boxed `source`. `via-web` matches on
//! `ErrorKind` to pick an HTTP status code; nothing below the request
//! boundary is allowed to swallow one of these (see spec.md §7).

use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub kind: ErrorKind,
    pub detail: Option<String>,
}

/// Categories of failure a caller outside this crate needs to distinguish.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// Malformed or missing request data (unknown context id, bad scope string).
    Request(RequestErrorKind),
    /// An action handler raised.
    Action,
    /// A view render panicked or returned an error.
    Render,
    /// Route registered but handler reflection failed.
    Router,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RequestErrorKind {
    UnknownContext,
    InvalidScope,
    MissingSessionId,
    NotFound,
    ActionNotFound,
    ActionNameRequired,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            source: None,
            kind,
            detail: None,
        }
    }

    pub fn with_source(kind: ErrorKind, source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            kind,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn unknown_context() -> Self {
        Self::new(ErrorKind::Request(RequestErrorKind::UnknownContext))
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::Request(RequestErrorKind::NotFound))
    }

    pub fn invalid_scope(scope: impl Into<String>) -> Self {
        Self::new(ErrorKind::Request(RequestErrorKind::InvalidScope)).with_detail(scope.into())
    }

    pub fn missing_session_id() -> Self {
        Self::new(ErrorKind::Request(RequestErrorKind::MissingSessionId))
    }

    pub fn action_not_found(id: impl Into<String>) -> Self {
        Self::new(ErrorKind::Request(RequestErrorKind::ActionNotFound)).with_detail(id.into())
    }

    pub fn action_name_required() -> Self {
        Self::new(ErrorKind::Request(RequestErrorKind::ActionNameRequired))
    }

    pub fn action(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::with_source(ErrorKind::Action, source)
    }

    pub fn render(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Render).with_detail(detail.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "via error: {:?}: {detail}", self.kind),
            None => write!(f, "via error: {:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
