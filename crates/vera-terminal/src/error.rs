//! Error types for the vera-terminal crate.
//!
//! None of these reach the caller of `Executor::run`: the executor folds
//! every variant into an `ExecutionOutcome`. They surface only from rule
//! loading and from the internal spawn path.

use thiserror::Error;

/// All errors that can originate from rule loading or process execution.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// Child-process spawn failed (executable missing, permission, OS error).
    #[error("{0}")]
    Spawn(String),

    /// Underlying I/O failure while waiting on the child or writing the audit log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation exceeded its time budget.
    #[error("Operation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The firewall rule file could not be parsed.
    #[error("Invalid rule set: {0}")]
    RuleSet(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, TerminalError>;
