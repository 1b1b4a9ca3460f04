//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for shelf operations
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Main error type for failures that are not specific to one collaborator
#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Invalid book id: {0}")]
    InvalidBookId(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_book_id_message() {
        let err = ShelfError::InvalidBookId("-4".to_string());
        assert_eq!(err.to_string(), "Invalid book id: -4");
    }
}
