// crates/ticket-id-core/src/interfaces/mod.rs
// ============================================================================
// Module: Ticket ID Interfaces
// Description: Backend-agnostic interfaces for the persisted schedule store.
// Purpose: Define the transaction surface used by the sequence allocator.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The allocator never talks to a database directly. It reads and writes
//! through a [`ScheduleTransaction`] opened by a [`TicketStore`]. Stores must
//! enforce uniqueness of (target id, target-created date, scheduled date,
//! sequence) and report violations as [`StoreError::Conflict`] so the whole
//! read-compute-insert cycle can be retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AllocationScope;
use crate::core::ScheduleRecord;
use crate::core::ScheduledDate;
use crate::core::TargetId;
use crate::core::TicketId;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Schedule store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Only [`StoreError::Conflict`] and [`StoreError::Contention`] are retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store backend error.
    #[error("store error: {0}")]
    Store(String),
    /// Stored data failed integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is not supported.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid data rejected by the store.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// A concurrent writer already holds this scope and sequence.
    #[error("store conflict: {0}")]
    Conflict(String),
    /// The ticket identifier already exists under a different scope.
    #[error("duplicate ticket id: {0}")]
    Duplicate(String),
    /// The store was busy or locked by another writer.
    #[error("store contention: {0}")]
    Contention(String),
}

impl StoreError {
    /// Returns true when retrying the whole transaction may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Contention(_))
    }
}

// ============================================================================
// SECTION: Schedule Store
// ============================================================================

/// View of one open store transaction.
pub trait ScheduleTransaction {
    /// Returns every schedule record for `target_id` on `scheduled_date`,
    /// across all target generations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn schedules_for(
        &mut self,
        target_id: TargetId,
        scheduled_date: &ScheduledDate,
    ) -> Result<Vec<ScheduleRecord>, StoreError>;

    /// Inserts a schedule record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the scope already holds the
    /// record's sequence, or [`StoreError::Duplicate`] when the identifier
    /// exists under another scope.
    fn insert_schedule(&mut self, record: &ScheduleRecord) -> Result<(), StoreError>;
}

/// Persisted store of ticket schedules.
pub trait TicketStore {
    /// Runs `work` inside one transaction.
    ///
    /// The transaction commits when `work` returns `Ok` and rolls back
    /// otherwise. No partial writes survive a failed unit of work.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a [`StoreError`] (converted
    /// into `E`) when the transaction cannot begin or commit.
    fn transact<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScheduleTransaction) -> Result<T, E>;

    /// Loads the schedule record for a ticket identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn load_schedule(&self, ticket_id: &TicketId) -> Result<Option<ScheduleRecord>, StoreError>;

    /// Lists the records of one scope, ordered by sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn list_scope(&self, scope: &AllocationScope) -> Result<Vec<ScheduleRecord>, StoreError>;

    /// Checks store readiness for allocation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError>;
}
