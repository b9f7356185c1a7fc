// crates/ticket-id-core/tests/allocator.rs
// ============================================================================
// Module: Sequence Allocator Tests
// Description: Tests for per-scope sequence allocation.
// Purpose: Validate count-plus-one allocation, scope filtering, and exhaustion.
// Dependencies: ticket-id-core
// ============================================================================
//! ## Overview
//! Drives [`allocate_sequence`] through a scripted transaction so the scope
//! filter and the exhaustion boundary can be checked without a real store.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use ticket_id_core::AllocationError;
use ticket_id_core::AllocationScope;
use ticket_id_core::DateInput;
use ticket_id_core::ScheduleRecord;
use ticket_id_core::ScheduleTransaction;
use ticket_id_core::ScheduledDate;
use ticket_id_core::StoreError;
use ticket_id_core::TargetId;
use ticket_id_core::TicketId;
use ticket_id_core::allocate_sequence;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Transaction returning a fixed record set for any query.
struct ScriptedTransaction {
    records: Vec<ScheduleRecord>,
    fail_reads: bool,
}

impl ScheduleTransaction for ScriptedTransaction {
    fn schedules_for(
        &mut self,
        target_id: TargetId,
        scheduled_date: &ScheduledDate,
    ) -> Result<Vec<ScheduleRecord>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Io("disk unavailable".to_string()));
        }
        Ok(self
            .records
            .iter()
            .filter(|record| {
                record.target_id == target_id && record.scheduled_date() == scheduled_date
            })
            .cloned()
            .collect())
    }

    fn insert_schedule(&mut self, record: &ScheduleRecord) -> Result<(), StoreError> {
        self.records.push(record.clone());
        Ok(())
    }
}

fn target(raw: u64) -> TargetId {
    TargetId::from_raw(raw).unwrap()
}

fn scope() -> AllocationScope {
    AllocationScope::new(target(7), &DateInput::from("2025-01-15"), "2025-01-20").unwrap()
}

fn record(target_raw: u64, created: &str, scheduled: &str, sequence: u32) -> ScheduleRecord {
    let text = format!("A00000{created}DS82{scheduled}{sequence:02}");
    ScheduleRecord::new(target(target_raw), TicketId::parse(&text).unwrap())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn empty_scope_allocates_one() {
    let mut tx = ScriptedTransaction {
        records: Vec::new(),
        fail_reads: false,
    };
    assert_eq!(allocate_sequence(&mut tx, &scope()).unwrap().get(), 1);
}

#[test]
fn allocation_counts_existing_records() {
    let mut tx = ScriptedTransaction {
        records: (1 ..= 3).map(|seq| record(7, "20250115", "20250120", seq)).collect(),
        fail_reads: false,
    };
    assert_eq!(allocate_sequence(&mut tx, &scope()).unwrap().get(), 4);
}

#[test]
fn allocation_ignores_other_target_generations() {
    let mut records: Vec<ScheduleRecord> =
        (1 ..= 2).map(|seq| record(7, "20250115", "20250120", seq)).collect();
    records.push(record(7, "20240101", "20250120", 1));
    records.push(record(8, "20250115", "20250120", 1));
    records.push(record(7, "20250115", "20250121", 1));
    let mut tx = ScriptedTransaction {
        records,
        fail_reads: false,
    };
    assert_eq!(allocate_sequence(&mut tx, &scope()).unwrap().get(), 3);
}

#[test]
fn allocation_fills_last_slot() {
    let mut tx = ScriptedTransaction {
        records: (1 ..= 98).map(|seq| record(7, "20250115", "20250120", seq)).collect(),
        fail_reads: false,
    };
    assert_eq!(allocate_sequence(&mut tx, &scope()).unwrap().get(), 99);
}

#[test]
fn full_scope_is_exhausted() {
    let mut tx = ScriptedTransaction {
        records: (1 ..= 99).map(|seq| record(7, "20250115", "20250120", seq)).collect(),
        fail_reads: false,
    };
    let err = allocate_sequence(&mut tx, &scope()).unwrap_err();
    assert_eq!(
        err,
        AllocationError::SequenceExhausted {
            existing: 99,
            max: 99
        }
    );
    assert!(!err.is_retryable());
    assert!(!err.is_transient());
}

#[test]
fn read_failures_propagate_as_store_errors() {
    let mut tx = ScriptedTransaction {
        records: Vec::new(),
        fail_reads: true,
    };
    let err = allocate_sequence(&mut tx, &scope()).unwrap_err();
    assert!(matches!(err, AllocationError::Store(StoreError::Io(_))));
}

#[test]
fn scope_contains_checks_every_dimension() {
    let scope = scope();
    assert!(scope.contains(&record(7, "20250115", "20250120", 5)));
    assert!(!scope.contains(&record(7, "20250116", "20250120", 5)));
    assert!(!scope.contains(&record(9, "20250115", "20250120", 5)));
    assert!(!scope.contains(&record(7, "20250115", "20250119", 5)));
    assert_eq!(record(7, "20250115", "20250120", 5).scope(), scope);
}
