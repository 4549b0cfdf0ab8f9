//! Error taxonomy for the provider. Callers usually only need `kind()`:
//! malformed identifiers and bad payloads are the caller's fault, everything
//! else comes from SQLite.

use std::fmt;

use thiserror::Error;

use crate::contract::{BookUri, Column};
use crate::models::ValidationError;

/// Provider operations, named in "not supported" errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Query,
    Insert,
    Update,
    Delete,
    GetType,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Query => "query",
            Operation::Insert => "insertion",
            Operation::Update => "update",
            Operation::Delete => "deletion",
            Operation::GetType => "type lookup",
        };
        f.write_str(name)
    }
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The identifier or the payload was rejected before touching storage.
    InvalidArgument,
    /// SQLite could not complete the statement.
    StorageFailure,
}

/// Errors raised by the book provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown URI {0}")]
    UnknownUri(String),
    #[error("{operation} is not supported for {uri}")]
    UnsupportedUri { operation: Operation, uri: BookUri },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("column {0} is not part of the query projection")]
    MissingColumn(Column),
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::UnknownUri(_)
            | ProviderError::UnsupportedUri { .. }
            | ProviderError::Invalid(_)
            | ProviderError::MissingColumn(_) => ErrorKind::InvalidArgument,
            ProviderError::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_split_validation_from_storage() {
        let unsupported = ProviderError::UnsupportedUri {
            operation: Operation::Insert,
            uri: BookUri::Item(3),
        };
        assert_eq!(unsupported.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            unsupported.to_string(),
            "insertion is not supported for content://com.example.android.project9inventoryappstage2/books/3"
        );

        let invalid: ProviderError = ValidationError::Missing(Column::Title).into();
        assert_eq!(invalid.kind(), ErrorKind::InvalidArgument);
        assert_eq!(invalid.to_string(), "title is required");

        let storage: ProviderError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(storage.kind(), ErrorKind::StorageFailure);
    }
}
