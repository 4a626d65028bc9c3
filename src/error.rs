//! Error types for the sharded cache

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cache operations
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Entry Errors
    // =========================================================================
    /// Add on a key that is present and unexpired
    #[error("Item {key} already exists")]
    AlreadyExists { key: String },

    /// Replace or arithmetic on a key that is absent or expired
    #[error("Item {key} not found")]
    NotFound { key: String },

    /// Arithmetic on a value that does not hold a matching number
    #[error("The value for {key} is not {expected}")]
    WrongType { key: String, expected: &'static str },

    // =========================================================================
    // Construction Errors
    // =========================================================================
    /// Shard count outside `1..=u32::MAX`
    #[error("Invalid shard count {0}: must be between 1 and 4294967295")]
    InvalidShardCount(usize),

    /// Failed to start the janitor thread or its runtime
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the key the error refers to, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Error::AlreadyExists { key }
            | Error::NotFound { key }
            | Error::WrongType { key, .. } => Some(key),
            Error::InvalidShardCount(_) | Error::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::AlreadyExists {
            key: "a".to_string(),
        };
        assert_eq!(err.to_string(), "Item a already exists");

        let err = Error::WrongType {
            key: "n".to_string(),
            expected: "an integer",
        };
        assert_eq!(err.to_string(), "The value for n is not an integer");
        assert_eq!(err.key(), Some("n"));

        assert_eq!(Error::InvalidShardCount(0).key(), None);
    }
}
