//! Error types.
//!
//! Typed errors cover structural misuse of a request description and
//! rendering failures. Orchestration entry points return `anyhow::Result`
//! so collaborator errors reach the caller untouched.

use thiserror::Error;

/// Structural misuse of a request description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Limit or offset configured while the sort list is empty.
    #[error("pagination requires sorting parameters (error code: U007)")]
    PaginationWithoutOrdering,

    /// A custom parameter tried to use a key owned by
    /// [`StandardParam`](crate::params::StandardParam).
    #[error("cannot use system key '{0}' as a custom parameter: it is reserved")]
    ReservedKey(String),
}

/// Loader orchestration errors.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("no exporter registered for extension '{0}'")]
    NoExporter(String),

    #[error("no loader registered for extension '{0}'")]
    NoLoader(String),

    #[error("input file is missing")]
    MissingInputFile,

    #[error(transparent)]
    Param(#[from] ParamError),
}

/// Errors raised while rendering criteria into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("unbalanced brackets in criteria")]
    UnbalancedBrackets,

    #[error("criterion {0} has no connector to the next criterion")]
    MissingConnector(usize),

    #[error("BETWEEN on '{0}' requires an upper bound")]
    MissingUpperBound(String),

    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),

    #[error("unsafe identifier '{0}'")]
    UnsafeIdentifier(String),

    #[error("no table name given")]
    MissingTable,
}
