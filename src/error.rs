//! Error types for key access that must not miss.

use thiserror::Error;

/// Result type alias using KeyError.
pub type Result<T> = std::result::Result<T, KeyError>;

/// Raised by the strict accessors when the requested key is not in the tree.
///
/// Tolerant operations such as `get` or `remove` report a miss with `None`
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("key not found")]
pub struct KeyError;

#[cfg(test)]
mod tests {
    use super::KeyError;

    #[test]
    fn test_display() {
        assert_eq!(KeyError.to_string(), "key not found");
    }
}
