//! Error types for the provider manager.

use std::fmt;
use thiserror::Error;

/// The two plugin registries the manager keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PluginKind {
    Provider,
    Suggester,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKind::Provider => f.write_str("provider"),
            PluginKind::Suggester => f.write_str("suggester"),
        }
    }
}

/// Errors that can occur in the provider manager.
#[derive(Error, Debug)]
pub enum ManagerError {
    /// The argument doesn't refer to a registered, active plugin.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation other than registration was called before `initialize`.
    #[error("Provider manager is not initialized")]
    NotInitialized,

    /// `initialize` was called twice, or registration after `initialize`.
    #[error("Provider manager is already initialized")]
    AlreadyInitialized,

    /// The manager was closed and can't be used anymore.
    #[error("Provider manager is closed")]
    Closed,

    /// A plugin with the same ID is already registered.
    #[error("Duplicate {kind} ID: {id}")]
    DuplicateId { kind: PluginKind, id: String },
}

/// Result type for manager operations.
pub type ManagerResult<T> = std::result::Result<T, ManagerError>;
