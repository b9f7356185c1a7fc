// crates/ticket-id-core/src/runtime/allocator.rs
// ============================================================================
// Module: Ticket ID Sequence Allocator
// Description: Computes the next sequence for an allocation scope.
// Purpose: Derive per-scope sequences from existing schedule records.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! The allocator reads the schedules sharing a target id and scheduled date,
//! keeps those issued against the same target generation, and returns
//! `count + 1`. The read is only meaningful inside the transaction that also
//! performs the insert; the count is stale the moment that transaction ends.
//! Stores back this with a uniqueness constraint, and a lost race surfaces as
//! a retryable [`StoreError::Conflict`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AllocationScope;
use crate::core::CodecError;
use crate::core::Sequence;
use crate::interfaces::ScheduleTransaction;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Sequence allocation and ticket issuing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Codec and exhaustion errors are deterministic and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The scope already holds the maximum number of tickets.
    #[error("sequence exhausted: scope already holds {existing} tickets (max {max})")]
    SequenceExhausted {
        /// Number of tickets already issued in the scope.
        existing: usize,
        /// Maximum tickets per scope.
        max: u32,
    },
    /// Concurrent allocations kept winning the same sequence.
    #[error("allocation conflict after {attempts} attempts: {message}")]
    Conflict {
        /// Attempts made before giving up.
        attempts: u32,
        /// Last store conflict message.
        message: String,
    },
    /// Store locks stayed contended until the retry budget elapsed.
    #[error("allocation contended after {attempts} attempts ({elapsed_ms} ms): {message}")]
    Contended {
        /// Attempts made before the deadline.
        attempts: u32,
        /// Elapsed time in milliseconds.
        elapsed_ms: u64,
        /// Last store contention message.
        message: String,
    },
    /// The retry budget elapsed before an allocation committed.
    #[error("allocation timed out after {attempts} attempts ({elapsed_ms} ms)")]
    TimedOut {
        /// Attempts made before the deadline.
        attempts: u32,
        /// Elapsed time in milliseconds.
        elapsed_ms: u64,
    },
    /// A field failed validation.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AllocationError {
    /// Returns true when repeating the full read-compute-insert cycle may help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Store(error) => error.is_retryable(),
            _ => false,
        }
    }

    /// Returns true when the caller may retry the request later.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Conflict {
                ..
            }
            | Self::Contended {
                ..
            }
            | Self::TimedOut {
                ..
            } => true,
            Self::Store(error) => error.is_retryable(),
            _ => false,
        }
    }
}

// ============================================================================
// SECTION: Allocation
// ============================================================================

/// Returns the next unused sequence for `scope`.
///
/// Must run inside the transaction that inserts the resulting ticket.
///
/// # Errors
///
/// Returns [`AllocationError::SequenceExhausted`] when the scope already holds
/// 99 tickets, or [`AllocationError::Store`] when the read fails.
pub fn allocate_sequence(
    tx: &mut dyn ScheduleTransaction,
    scope: &AllocationScope,
) -> Result<Sequence, AllocationError> {
    let records = tx.schedules_for(scope.target_id(), scope.scheduled_date())?;
    let existing = records.iter().filter(|record| scope.contains(record)).count();
    let next = u32::try_from(existing).ok().and_then(|count| count.checked_add(1));
    match next {
        Some(value) if value <= Sequence::MAX => Ok(Sequence::new(value)?),
        _ => Err(AllocationError::SequenceExhausted {
            existing,
            max: Sequence::MAX,
        }),
    }
}
