//! Verification helpers for testing port lifecycles
//!
//! Provides assertion helpers over a [`CallLog`]

use thiserror::Error;

use crate::fixtures::{CallLog, PortCall};

/// Verification error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Expected {expected} occurrences of {call:?}, found {actual}")]
    CountMismatch {
        call: PortCall,
        expected: usize,
        actual: usize,
    },

    #[error("Expected {first:?} before {second:?} in {calls:?}")]
    OrderViolation {
        first: PortCall,
        second: PortCall,
        calls: Vec<PortCall>,
    },

    #[error("Expected calls {expected:?}, got {actual:?}")]
    SequenceMismatch {
        expected: Vec<PortCall>,
        actual: Vec<PortCall>,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Call log verification helper
pub struct CallVerifier<'a> {
    log: &'a CallLog,
}

impl<'a> CallVerifier<'a> {
    /// Create a new verifier over `log`
    pub fn new(log: &'a CallLog) -> Self {
        Self { log }
    }

    /// Verify that `call` happened exactly `expected` times
    pub fn assert_count(&self, call: PortCall, expected: usize) -> VerifyResult<()> {
        let actual = self.log.count(call);
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                call,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify that the first `first` precedes the first `second`
    pub fn assert_before(&self, first: PortCall, second: PortCall) -> VerifyResult<()> {
        let calls = self.log.calls();
        let a = calls.iter().position(|c| *c == first);
        let b = calls.iter().position(|c| *c == second);
        match (a, b) {
            (Some(a), Some(b)) if a < b => Ok(()),
            _ => Err(VerificationError::OrderViolation {
                first,
                second,
                calls,
            }),
        }
    }

    /// Verify the full call sequence
    pub fn assert_sequence(&self, expected: &[PortCall]) -> VerifyResult<()> {
        let actual = self.log.calls();
        if actual != expected {
            return Err(VerificationError::SequenceMismatch {
                expected: expected.to_vec(),
                actual,
            });
        }
        Ok(())
    }

    /// Verify that no periodic task reached any transport
    pub fn assert_no_tasks(&self) -> VerifyResult<()> {
        let tasks = self.log.tasks();
        if !tasks.is_empty() {
            return Err(VerificationError::SequenceMismatch {
                expected: Vec::new(),
                actual: tasks,
            });
        }
        Ok(())
    }
}
