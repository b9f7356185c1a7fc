// crates/ticket-id-core/src/runtime/store.rs
// ============================================================================
// Module: Ticket ID In-Memory Store
// Description: Mutex-guarded schedule store for tests and embedding.
// Purpose: Provide a TicketStore with the same uniqueness rules as durable stores.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryTicketStore`] keeps schedules in a `BTreeMap` keyed by ticket
//! identifier. A transaction holds the map lock for its whole unit of work
//! and stages inserts until `work` succeeds, so a failed unit of work leaves
//! no trace.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::AllocationScope;
use crate::core::ScheduleRecord;
use crate::core::ScheduledDate;
use crate::core::TargetId;
use crate::core::TicketId;
use crate::interfaces::ScheduleTransaction;
use crate::interfaces::StoreError;
use crate::interfaces::TicketStore;

// ============================================================================
// SECTION: Store
// ============================================================================

/// In-memory ticket store.
///
/// # Invariants
/// - At most one record per ticket identifier.
/// - At most one record per (scope, sequence).
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    /// Schedule map protected by a mutex.
    records: Arc<Mutex<BTreeMap<String, ScheduleRecord>>>,
}

impl InMemoryTicketStore {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored schedules.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the mutex is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// Returns true when no schedules are stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the mutex is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    /// Acquires the map lock.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, ScheduleRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Store("ticket store mutex poisoned".to_string()))
    }
}

impl TicketStore for InMemoryTicketStore {
    fn transact<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScheduleTransaction) -> Result<T, E>,
    {
        let mut guard = self.lock()?;
        let mut tx = InMemoryTransaction {
            committed: &guard,
            staged: Vec::new(),
        };
        let outcome = work(&mut tx)?;
        let staged = tx.staged;
        for record in staged {
            guard.insert(record.ticket_id.as_str().to_string(), record);
        }
        Ok(outcome)
    }

    fn load_schedule(&self, ticket_id: &TicketId) -> Result<Option<ScheduleRecord>, StoreError> {
        Ok(self.lock()?.get(ticket_id.as_str()).cloned())
    }

    fn list_scope(&self, scope: &AllocationScope) -> Result<Vec<ScheduleRecord>, StoreError> {
        let guard = self.lock()?;
        let mut records: Vec<ScheduleRecord> =
            guard.values().filter(|record| scope.contains(record)).cloned().collect();
        records.sort_by_key(ScheduleRecord::sequence);
        Ok(records)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Transaction view over the locked map with staged inserts.
struct InMemoryTransaction<'a> {
    /// Records committed before this transaction began.
    committed: &'a BTreeMap<String, ScheduleRecord>,
    /// Records inserted by this transaction, applied on success.
    staged: Vec<ScheduleRecord>,
}

impl InMemoryTransaction<'_> {
    /// Iterates committed and staged records.
    fn visible(&self) -> impl Iterator<Item = &ScheduleRecord> {
        self.committed.values().chain(self.staged.iter())
    }
}

impl ScheduleTransaction for InMemoryTransaction<'_> {
    fn schedules_for(
        &mut self,
        target_id: TargetId,
        scheduled_date: &ScheduledDate,
    ) -> Result<Vec<ScheduleRecord>, StoreError> {
        Ok(self
            .visible()
            .filter(|record| {
                record.target_id == target_id && record.scheduled_date() == scheduled_date
            })
            .cloned()
            .collect())
    }

    fn insert_schedule(&mut self, record: &ScheduleRecord) -> Result<(), StoreError> {
        let scope = record.scope();
        let sequence = record.sequence();
        if self.visible().any(|existing| scope.contains(existing) && existing.sequence() == sequence)
        {
            return Err(StoreError::Conflict(format!(
                "sequence {sequence} already issued for target {} on {}",
                record.target_id,
                record.scheduled_date()
            )));
        }
        if self.visible().any(|existing| existing.ticket_id == record.ticket_id) {
            return Err(StoreError::Duplicate(record.ticket_id.to_string()));
        }
        self.staged.push(record.clone());
        Ok(())
    }
}
