//! Error types.
//!
//! Only configuration mistakes are errors. Duplicate keys are warnings and
//! panicking subscribers are contained by the scheduler, so neither shows up
//! here as a returned value.

/// Errors surfaced to callers of the reactive core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The key function produced no key for the item at `index`.
    ///
    /// Aborts the reconciliation pass before any output is touched.
    #[error("missing key for item at index {index}")]
    MissingKey { index: usize },

    /// `select_branch` was given a different number of conditions and branches.
    #[error("branch arity mismatch: {conditions} conditions, {branches} branches")]
    BranchArity { conditions: usize, branches: usize },

    /// A subscriber or recompute job panicked during a flush.
    #[error("scheduled job {job} panicked")]
    JobPanicked { job: usize },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
