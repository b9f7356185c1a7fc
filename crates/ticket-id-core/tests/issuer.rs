// crates/ticket-id-core/tests/issuer.rs
// ============================================================================
// Module: Ticket Issuer Tests
// Description: Tests for transactional issuing and conflict retry.
// Purpose: Validate retry bounds, fail-fast paths, and concurrent uniqueness.
// Dependencies: ticket-id-core
// ============================================================================
//! ## Overview
//! Wraps [`InMemoryTicketStore`] in fault-injecting stores to force lost
//! races and contention, then checks that [`TicketIssuer`] retries only the
//! retryable failures and stops at its configured bounds.

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

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::thread;

use ticket_id_core::AllocationError;
use ticket_id_core::AllocationPolicy;
use ticket_id_core::AllocationScope;
use ticket_id_core::CodecError;
use ticket_id_core::DateInput;
use ticket_id_core::InMemoryTicketStore;
use ticket_id_core::IssueRequest;
use ticket_id_core::ScheduleRecord;
use ticket_id_core::ScheduleTransaction;
use ticket_id_core::ScheduledDate;
use ticket_id_core::StoreError;
use ticket_id_core::TargetId;
use ticket_id_core::TicketId;
use ticket_id_core::TicketIssuer;
use ticket_id_core::TicketStore;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn request(target_raw: u64, created: &str) -> IssueRequest {
    IssueRequest {
        identity_code: Some("a00000".to_string()),
        target_id: TargetId::from_raw(target_raw).unwrap(),
        target_name: "DS8-2".to_string(),
        target_created_at: DateInput::from(created),
        scheduled_date: "2025-01-20".to_string(),
    }
}

fn fast_policy(max_attempts: u32) -> AllocationPolicy {
    AllocationPolicy {
        max_attempts,
        retry_backoff_ms: 0,
        timeout_ms: 5_000,
    }
}

/// Decrements `counter` if positive; returns true when it did.
fn take_one(counter: &AtomicU32) -> bool {
    counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

/// Store that fails the first `failures` transactions with `error`.
struct FailingStore {
    inner: InMemoryTicketStore,
    failures: AtomicU32,
    error: StoreError,
    transactions: AtomicU32,
}

impl FailingStore {
    fn new(failures: u32, error: StoreError) -> Self {
        Self {
            inner: InMemoryTicketStore::new(),
            failures: AtomicU32::new(failures),
            error,
            transactions: AtomicU32::new(0),
        }
    }
}

impl TicketStore for FailingStore {
    fn transact<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScheduleTransaction) -> Result<T, E>,
    {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.failures) {
            return Err(E::from(self.error.clone()));
        }
        self.inner.transact(work)
    }

    fn load_schedule(&self, ticket_id: &TicketId) -> Result<Option<ScheduleRecord>, StoreError> {
        self.inner.load_schedule(ticket_id)
    }

    fn list_scope(&self, scope: &AllocationScope) -> Result<Vec<ScheduleRecord>, StoreError> {
        self.inner.list_scope(scope)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }
}

/// Store whose first `stale` transactions read an empty scope, simulating a
/// writer that committed between the read and the insert.
struct StaleReadStore {
    inner: InMemoryTicketStore,
    stale: AtomicU32,
}

/// Transaction view that hides committed schedules from reads.
struct StaleTransaction<'a> {
    inner: &'a mut dyn ScheduleTransaction,
    stale: bool,
}

impl ScheduleTransaction for StaleTransaction<'_> {
    fn schedules_for(
        &mut self,
        target_id: TargetId,
        scheduled_date: &ScheduledDate,
    ) -> Result<Vec<ScheduleRecord>, StoreError> {
        if self.stale {
            return Ok(Vec::new());
        }
        self.inner.schedules_for(target_id, scheduled_date)
    }

    fn insert_schedule(&mut self, record: &ScheduleRecord) -> Result<(), StoreError> {
        self.inner.insert_schedule(record)
    }
}

impl TicketStore for StaleReadStore {
    fn transact<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScheduleTransaction) -> Result<T, E>,
    {
        let stale = take_one(&self.stale);
        self.inner.transact(|tx| {
            let mut view = StaleTransaction {
                inner: tx,
                stale,
            };
            work(&mut view)
        })
    }

    fn load_schedule(&self, ticket_id: &TicketId) -> Result<Option<ScheduleRecord>, StoreError> {
        self.inner.load_schedule(ticket_id)
    }

    fn list_scope(&self, scope: &AllocationScope) -> Result<Vec<ScheduleRecord>, StoreError> {
        self.inner.list_scope(scope)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }
}

// ============================================================================
// SECTION: Happy Path
// ============================================================================

#[test]
fn first_ticket_in_scope_gets_sequence_one() {
    let issuer = TicketIssuer::new(InMemoryTicketStore::new(), AllocationPolicy::default());
    let issued = issuer.issue(&request(7, "2025-01-15")).unwrap();
    assert_eq!(issued.ticket_id.as_str(), "A0000020250115DS822025012001");
    assert_eq!(issued.sequence.get(), 1);
    assert_eq!(issued.attempts, 1);
    let stored = issuer.store().load_schedule(&issued.ticket_id).unwrap().unwrap();
    assert_eq!(stored.target_id, issued.scope.target_id());
}

#[test]
fn sequential_issues_increment_within_scope() {
    let issuer = TicketIssuer::new(InMemoryTicketStore::new(), AllocationPolicy::default());
    let sequences: Vec<u32> = (0 .. 3)
        .map(|_| issuer.issue(&request(7, "2025-01-15")).unwrap().sequence.get())
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    let scope = issuer.issue(&request(7, "2025-01-15")).unwrap().scope;
    let listed = issuer.store().list_scope(&scope).unwrap();
    let listed: Vec<u32> = listed.iter().map(|record| record.sequence().get()).collect();
    assert_eq!(listed, vec![1, 2, 3, 4]);
}

#[test]
fn new_target_generation_restarts_sequence() {
    let issuer = TicketIssuer::new(InMemoryTicketStore::new(), AllocationPolicy::default());
    issuer.issue(&request(7, "2025-01-15")).unwrap();
    issuer.issue(&request(7, "2025-01-15")).unwrap();
    let recreated = issuer.issue(&request(7, "2025-01-18")).unwrap();
    assert_eq!(recreated.sequence.get(), 1);
    assert_eq!(recreated.ticket_id.as_str(), "A0000020250118DS822025012001");
}

// ============================================================================
// SECTION: Fail-Fast Paths
// ============================================================================

#[test]
fn codec_errors_never_touch_the_store() {
    let store = FailingStore::new(0, StoreError::Conflict("unused".to_string()));
    let issuer = TicketIssuer::new(store, AllocationPolicy::default());
    let mut bad_target = request(7, "2025-01-15");
    bad_target.target_name = "AB".to_string();
    assert!(matches!(
        issuer.issue(&bad_target),
        Err(AllocationError::Codec(CodecError::InvalidTargetCode(_)))
    ));
    assert!(matches!(
        issuer.issue(&request(7, "not-a-date")),
        Err(AllocationError::Codec(CodecError::InvalidDate(_)))
    ));
    assert_eq!(issuer.store().transactions.load(Ordering::SeqCst), 0);
}

#[test]
fn exhausted_scope_is_not_retried() {
    let store = FailingStore::new(0, StoreError::Conflict("unused".to_string()));
    let issuer = TicketIssuer::new(store, fast_policy(5));
    for expected in 1 ..= 99 {
        assert_eq!(issuer.issue(&request(7, "2025-01-15")).unwrap().sequence.get(), expected);
    }
    let before = issuer.store().transactions.load(Ordering::SeqCst);
    let err = issuer.issue(&request(7, "2025-01-15")).unwrap_err();
    assert_eq!(
        err,
        AllocationError::SequenceExhausted {
            existing: 99,
            max: 99
        }
    );
    assert_eq!(issuer.store().transactions.load(Ordering::SeqCst), before + 1);
    assert_eq!(issuer.store().inner.len().unwrap(), 99);
}

#[test]
fn duplicate_ticket_id_across_targets_is_not_retried() {
    let store = FailingStore::new(0, StoreError::Conflict("unused".to_string()));
    let issuer = TicketIssuer::new(store, fast_policy(5));
    issuer.issue(&request(7, "2025-01-15")).unwrap();
    let err = issuer.issue(&request(8, "2025-01-15")).unwrap_err();
    assert!(matches!(err, AllocationError::Store(StoreError::Duplicate(_))));
    assert!(!err.is_transient());
    assert_eq!(issuer.store().transactions.load(Ordering::SeqCst), 2);
}

#[test]
fn non_retryable_store_errors_surface_immediately() {
    let store = FailingStore::new(3, StoreError::Io("disk gone".to_string()));
    let issuer = TicketIssuer::new(store, fast_policy(5));
    let err = issuer.issue(&request(7, "2025-01-15")).unwrap_err();
    assert_eq!(err, AllocationError::Store(StoreError::Io("disk gone".to_string())));
    assert_eq!(issuer.store().transactions.load(Ordering::SeqCst), 1);
}

// ============================================================================
// SECTION: Retry
// ============================================================================

#[test]
fn lost_race_is_retried_with_fresh_read() {
    let store = StaleReadStore {
        inner: InMemoryTicketStore::new(),
        stale: AtomicU32::new(0),
    };
    let issuer = TicketIssuer::new(store, fast_policy(3));
    issuer.issue(&request(7, "2025-01-15")).unwrap();
    issuer.store().stale.store(1, Ordering::SeqCst);
    let issued = issuer.issue(&request(7, "2025-01-15")).unwrap();
    assert_eq!(issued.sequence.get(), 2);
    assert_eq!(issued.attempts, 2);
    assert_eq!(issuer.store().inner.len().unwrap(), 2);
}

#[test]
fn contention_is_retried_until_success() {
    let store = FailingStore::new(2, StoreError::Contention("database is locked".to_string()));
    let issuer = TicketIssuer::new(store, fast_policy(3));
    let issued = issuer.issue(&request(7, "2025-01-15")).unwrap();
    assert_eq!(issued.attempts, 3);
    assert_eq!(issued.sequence.get(), 1);
}

#[test]
fn contention_does_not_consume_conflict_attempts() {
    let store = FailingStore::new(6, StoreError::Contention("database is locked".to_string()));
    let issuer = TicketIssuer::new(store, fast_policy(2));
    let issued = issuer.issue(&request(7, "2025-01-15")).unwrap();
    assert_eq!(issued.attempts, 7);
    assert_eq!(issued.sequence.get(), 1);
}

#[test]
fn persistent_contention_surfaces_when_budget_expires() {
    let store = FailingStore::new(u32::MAX, StoreError::Contention("database is locked".to_string()));
    let policy = AllocationPolicy {
        max_attempts: 1,
        retry_backoff_ms: 1,
        timeout_ms: 200,
    };
    let issuer = TicketIssuer::new(store, policy);
    let err = issuer.issue(&request(7, "2025-01-15")).unwrap_err();
    match &err {
        AllocationError::Contended {
            attempts,
            elapsed_ms,
            message,
        } => {
            assert!(*attempts >= 2, "only {attempts} attempts before giving up");
            assert!(*elapsed_ms >= 200);
            assert!(message.contains("database is locked"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_transient());
    assert!(issuer.store().inner.is_empty().unwrap());
}

#[test]
fn persistent_conflict_surfaces_after_max_attempts() {
    let store = FailingStore::new(u32::MAX, StoreError::Conflict("sequence taken".to_string()));
    let issuer = TicketIssuer::new(store, fast_policy(4));
    let err = issuer.issue(&request(7, "2025-01-15")).unwrap_err();
    match &err {
        AllocationError::Conflict {
            attempts,
            message,
        } => {
            assert_eq!(*attempts, 4);
            assert!(message.contains("sequence taken"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_transient());
    assert!(!err.is_retryable());
    assert_eq!(issuer.store().transactions.load(Ordering::SeqCst), 4);
    assert!(issuer.store().inner.is_empty().unwrap());
}

#[test]
fn zero_budget_times_out_without_attempting() {
    let policy = AllocationPolicy {
        timeout_ms: 0,
        ..AllocationPolicy::default()
    };
    let issuer = TicketIssuer::new(InMemoryTicketStore::new(), policy);
    let err = issuer.issue(&request(7, "2025-01-15")).unwrap_err();
    assert!(matches!(
        err,
        AllocationError::TimedOut {
            attempts: 0,
            ..
        }
    ));
    assert!(issuer.store().is_empty().unwrap());
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn concurrent_issuers_assign_each_sequence_once() {
    const THREADS: u32 = 8;
    const PER_THREAD: u32 = 5;
    let issuer = Arc::new(TicketIssuer::new(InMemoryTicketStore::new(), fast_policy(10)));
    let handles: Vec<_> = (0 .. THREADS)
        .map(|_| {
            let issuer = Arc::clone(&issuer);
            thread::spawn(move || {
                (0 .. PER_THREAD)
                    .map(|_| issuer.issue(&request(7, "2025-01-15")).unwrap().sequence.get())
                    .collect::<Vec<u32>>()
            })
        })
        .collect();
    let mut seen = BTreeSet::new();
    for handle in handles {
        for sequence in handle.join().unwrap() {
            assert!(seen.insert(sequence), "sequence {sequence} issued twice");
        }
    }
    let expected: BTreeSet<u32> = (1 ..= THREADS * PER_THREAD).collect();
    assert_eq!(seen, expected);
}
