//! Error types for the asset registry.

use std::fmt;
use std::path::PathBuf;

use crate::header::AssetType;

/// Errors that can occur during asset operations.
#[derive(Debug)]
pub enum AssetError {
    /// No entry (or no stored bytes) exists for this name or path.
    NotFound {
        /// The name or path that was looked up.
        name: String,
    },

    /// Failed to read or write asset bytes.
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// No loader registered for this asset type.
    NoLoader {
        /// The type tag of the entry.
        asset_type: AssetType,
        /// Human-readable type name if known.
        type_name: Option<String>,
    },

    /// The container header is missing or malformed.
    InvalidHeader {
        /// The asset being read.
        name: String,
        /// Description of the problem.
        message: String,
    },

    /// The loader failed to decode, finalize or encode the asset.
    LoaderError {
        /// The asset being processed.
        name: String,
        /// Description of the error.
        message: String,
    },

    /// The requested payload type does not match the entry's declared type.
    TypeMismatch {
        /// The asset being accessed.
        name: String,
        /// Expected type name.
        expected: &'static str,
        /// The entry's actual type tag.
        found: AssetType,
    },

    /// A second registration for a name with a different source.
    DuplicateName {
        /// The contested name.
        name: String,
        /// Display form of the source already registered.
        existing: String,
    },

    /// A dependency of this asset failed to load.
    DependencyFailed {
        /// The dependent asset.
        name: String,
        /// The dependency that failed.
        dependency: String,
    },

    /// The job was deferred too many times waiting on dependencies.
    RequeueLimit {
        /// The asset that gave up.
        name: String,
        /// How many times it was deferred.
        attempts: u32,
    },

    /// Internal bookkeeping was found in an impossible state.
    InvariantViolation {
        /// Description of the violated invariant.
        message: String,
    },

    /// The background loader thread is not running.
    WorkerUnavailable {
        /// Description of the failure.
        message: String,
    },
}

impl AssetError {
    pub(crate) fn loader(name: impl Into<String>, message: impl Into<String>) -> Self {
        AssetError::LoaderError {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        AssetError::InvariantViolation {
            message: message.into(),
        }
    }

    /// Whether this error means "nothing there" rather than a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::NotFound { .. })
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound { name } => {
                write!(f, "Asset not found: {}", name)
            }
            AssetError::Io { path, source } => {
                write!(f, "IO error on '{}': {}", path.display(), source)
            }
            AssetError::NoLoader {
                asset_type,
                type_name,
            } => match type_name {
                Some(name) => write!(f, "No loader registered for asset type: {}", name),
                None => write!(f, "No loader registered for asset type {}", asset_type),
            },
            AssetError::InvalidHeader { name, message } => {
                write!(f, "Invalid asset header in '{}': {}", name, message)
            }
            AssetError::LoaderError { name, message } => {
                write!(f, "Failed to load '{}': {}", name, message)
            }
            AssetError::TypeMismatch {
                name,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Type mismatch for '{}': expected {}, entry holds {}",
                    name, expected, found
                )
            }
            AssetError::DuplicateName { name, existing } => {
                write!(f, "Asset '{}' is already registered from {}", name, existing)
            }
            AssetError::DependencyFailed { name, dependency } => {
                write!(f, "Asset '{}' depends on '{}', which failed to load", name, dependency)
            }
            AssetError::RequeueLimit { name, attempts } => {
                write!(
                    f,
                    "Asset '{}' gave up after {} requeues, possible dependency cycle",
                    name, attempts
                )
            }
            AssetError::InvariantViolation { message } => {
                write!(f, "Asset registry invariant violated: {}", message)
            }
            AssetError::WorkerUnavailable { message } => {
                write!(f, "Asset loader thread unavailable: {}", message)
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
