// crates/ticket-id-core/src/core/scope.rs
// ============================================================================
// Module: Ticket ID Allocation Scope
// Description: Scope triple bounding sequence uniqueness, and schedule records.
// Purpose: Describe which existing tickets compete for a sequence number.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An allocation scope is the triple (target id, target-created date,
//! scheduled date). Within one scope, issued sequences form the contiguous set
//! `{1, ..., k}` with `k <= 99`. The scope has no persisted lifecycle of its
//! own; it is derived from schedule records on every request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::codec::CodecError;
use crate::core::codec::format_date;
use crate::core::codec::format_scheduled_date;
use crate::core::dates::DateInput;
use crate::core::fields::CompactDate;
use crate::core::fields::IdentityCode;
use crate::core::fields::ScheduledDate;
use crate::core::fields::Sequence;
use crate::core::identifiers::TargetId;
use crate::core::identifiers::TicketId;

// ============================================================================
// SECTION: Allocation Scope
// ============================================================================

/// Scope within which ticket sequences must be unique.
///
/// # Invariants
/// - `target_created` is the reference date string, formatted once at
///   construction.
/// - Two target generations sharing an id but created on different days are
///   different scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllocationScope {
    /// Production target identifier.
    target_id: TargetId,
    /// Target creation date (`YYYYMMDD`).
    target_created: CompactDate,
    /// Scheduled date (`YYYYMMDD`).
    scheduled_date: ScheduledDate,
}

impl AllocationScope {
    /// Builds a scope from raw caller inputs.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidDate`] when either date fails to format.
    pub fn new(
        target_id: TargetId,
        target_created_at: &DateInput,
        scheduled_date: &str,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            target_id,
            target_created: format_date(target_created_at)?,
            scheduled_date: format_scheduled_date(scheduled_date)?,
        })
    }

    /// Builds a scope from already formatted fields.
    #[must_use]
    pub const fn from_parts(
        target_id: TargetId,
        target_created: CompactDate,
        scheduled_date: ScheduledDate,
    ) -> Self {
        Self {
            target_id,
            target_created,
            scheduled_date,
        }
    }

    /// Returns the target identifier.
    #[must_use]
    pub const fn target_id(&self) -> TargetId {
        self.target_id
    }

    /// Returns the reference target-created date.
    #[must_use]
    pub const fn target_created(&self) -> CompactDate {
        self.target_created
    }

    /// Returns the scheduled date.
    #[must_use]
    pub const fn scheduled_date(&self) -> &ScheduledDate {
        &self.scheduled_date
    }

    /// Returns true when `record` belongs to this scope.
    #[must_use]
    pub fn contains(&self, record: &ScheduleRecord) -> bool {
        record.target_id == self.target_id
            && record.scheduled_date() == &self.scheduled_date
            && record.target_created() == self.target_created
    }
}

// ============================================================================
// SECTION: Schedule Record
// ============================================================================

/// A persisted ticket schedule.
///
/// Scope dimensions other than the target id are read from the ticket
/// identifier itself, so a record can never disagree with its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleRecord {
    /// Issued ticket identifier.
    pub ticket_id: TicketId,
    /// Production target the ticket was issued against.
    pub target_id: TargetId,
}

impl ScheduleRecord {
    /// Creates a schedule record.
    #[must_use]
    pub const fn new(target_id: TargetId, ticket_id: TicketId) -> Self {
        Self {
            ticket_id,
            target_id,
        }
    }

    /// Returns the target generation (creation date) the ticket belongs to.
    #[must_use]
    pub const fn target_created(&self) -> CompactDate {
        self.ticket_id.fields().target_created
    }

    /// Returns the scheduled date.
    #[must_use]
    pub const fn scheduled_date(&self) -> &ScheduledDate {
        &self.ticket_id.fields().scheduled_date
    }

    /// Returns the sequence within the scope.
    #[must_use]
    pub const fn sequence(&self) -> Sequence {
        self.ticket_id.fields().sequence
    }

    /// Returns the identity code.
    #[must_use]
    pub const fn identity_code(&self) -> &IdentityCode {
        &self.ticket_id.fields().identity_code
    }

    /// Returns the scope this record was allocated in.
    #[must_use]
    pub fn scope(&self) -> AllocationScope {
        AllocationScope::from_parts(
            self.target_id,
            self.target_created(),
            self.scheduled_date().clone(),
        )
    }
}
