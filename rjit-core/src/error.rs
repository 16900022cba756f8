//! Error Handling
//!
//! This module provides the error types for the CFG core using `thiserror`.
//! Both error kinds are fatal to the current function build: the caller is
//! expected to drop the `FunctionBuilder`, which releases all blocks, edges
//! and label storage at once.

use crate::label::Label;
use thiserror::Error;

/// CFG core error types.
///
/// Uses `thiserror` for zero-cost error handling with detailed error messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CfgError {
    /// Checked allocation failure.
    ///
    /// Raised when growing any of the builder-owned stores fails: instruction
    /// buffers, label registry, predecessor/successor vectors, the edge pool,
    /// or the post-order arrays.
    #[error("out of memory while growing CFG storage")]
    OutOfMemory,

    /// A branch or call terminator names a label with no bound block.
    ///
    /// Detected at CFG build time, before any edge for the offending block is
    /// allocated.
    #[error("branch target references undefined label {0}")]
    UndefinedLabel(Label),
}

impl From<std::collections::TryReserveError> for CfgError {
    #[cold] // Error paths are cold
    fn from(_err: std::collections::TryReserveError) -> Self {
        CfgError::OutOfMemory
    }
}

impl From<smallvec::CollectionAllocErr> for CfgError {
    #[cold] // Error paths are cold
    fn from(_err: smallvec::CollectionAllocErr) -> Self {
        CfgError::OutOfMemory
    }
}
