// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the simulation core.
//!
//! Errors are raised synchronously at the call that triggered them and are
//! never swallowed on the way up. Each variant carries a stable numeric code
//! for embedding front-ends; `0` is reserved for success.

/// Errors raised by construction and simulation operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NemoError {
    /// An argument was out of range, referenced a non-existent entity, or
    /// violated a construction invariant.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A fixed-capacity runtime buffer filled up. For the incoming spike
    /// queue this means network activity exceeded the sizing multiplier
    /// chosen at finalization.
    #[error("buffer overflow: {0}")]
    BufferOverflow(String),

    /// A consumer ran ahead of its producer.
    #[error("buffer underflow: {0}")]
    BufferUnderflow(String),

    /// An internal invariant was violated. Not recoverable.
    #[error("logic error: {0}")]
    Logic(String),

    /// A memory allocation failed.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// The operation is not supported by the selected backend.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Catch-all for errors with no better classification.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl NemoError {
    /// Stable status number for foreign-language and CLI front-ends.
    /// `0` means success; a front-end maps every non-zero code to a non-zero
    /// exit status.
    pub fn error_number(&self) -> u32 {
        match self {
            NemoError::Unsupported(_) => 5,
            NemoError::InvalidInput(_) => 6,
            NemoError::BufferOverflow(_) => 7,
            NemoError::BufferUnderflow(_) => 8,
            NemoError::Logic(_) => 9,
            NemoError::Allocation(_) => 10,
            NemoError::Unknown(_) => 13,
        }
    }
}

/// Result type used throughout the simulation core.
pub type Result<T> = core::result::Result<T, NemoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_numbers_are_stable_and_nonzero() {
        let all = [
            NemoError::Unsupported("x".into()),
            NemoError::InvalidInput("x".into()),
            NemoError::BufferOverflow("x".into()),
            NemoError::BufferUnderflow("x".into()),
            NemoError::Logic("x".into()),
            NemoError::Allocation("x".into()),
            NemoError::Unknown("x".into()),
        ];
        let numbers: Vec<u32> = all.iter().map(|e| e.error_number()).collect();
        assert_eq!(numbers, vec![5, 6, 7, 8, 9, 10, 13]);
        assert!(numbers.iter().all(|&n| n != 0));
    }

    #[test]
    fn errors_render_their_message() {
        let err = NemoError::InvalidInput("delay 0 out of range".into());
        assert_eq!(err.to_string(), "invalid input: delay 0 out of range");
    }
}
