use std::fmt;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while maintaining the rate-limit ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// No ledger entry is registered under the given limit id
    UnknownLimit(i64),

    /// Invalid limit configuration
    InvalidConfig(&'static str),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::UnknownLimit(id) => write!(f, "Unknown rate limit id {}", id),
            LedgerError::InvalidConfig(msg) => write!(f, "Invalid limit configuration: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}
