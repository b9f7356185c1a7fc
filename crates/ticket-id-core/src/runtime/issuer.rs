// crates/ticket-id-core/src/runtime/issuer.rs
// ============================================================================
// Module: Ticket ID Issuer
// Description: Transactional ticket issuing with bounded conflict retry.
// Purpose: Allocate, compose, and persist one ticket identifier atomically.
// Dependencies: crate::{core, interfaces, runtime::allocator}, rand, serde, tracing
// ============================================================================

//! ## Overview
//! [`TicketIssuer`] validates every codec field up front, then runs
//! allocate, compose, and insert as a single store transaction. When a
//! concurrent writer commits the same scope and sequence first, the store
//! reports a retryable conflict and the whole cycle runs again, bounded by
//! [`AllocationPolicy::max_attempts`]. Lock contention is retried with
//! jittered exponential backoff until [`AllocationPolicy::timeout_ms`] runs
//! out. Codec errors and sequence exhaustion are returned immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;
use std::time::Instant;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

use crate::core::AllocationScope;
use crate::core::DateInput;
use crate::core::IdentityCode;
use crate::core::ScheduleRecord;
use crate::core::Sequence;
use crate::core::TargetCode;
use crate::core::TargetId;
use crate::core::TicketId;
use crate::core::TicketIdFields;
use crate::core::compose_identifier;
use crate::core::extract_target_code;
use crate::core::format_identity_code;
use crate::interfaces::ScheduleTransaction;
use crate::interfaces::StoreError;
use crate::interfaces::TicketStore;
use crate::runtime::allocator::AllocationError;
use crate::runtime::allocator::allocate_sequence;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Default number of allocation attempts per request.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default base backoff between attempts (ms).
const DEFAULT_RETRY_BACKOFF_MS: u64 = 10;
/// Default retry budget per request (ms).
const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Largest doubling applied to the contention backoff.
const MAX_CONTENTION_SHIFT: u32 = 6;

/// Retry policy for the read-compute-insert cycle.
///
/// # Invariants
/// - `max_attempts` bounds attempts that end in a sequence conflict.
///   Contended attempts are bounded by `timeout_ms` alone.
/// - Conflict backoff grows linearly, contention backoff doubles with
///   jitter, and neither sleeps past the remaining budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocationPolicy {
    /// Maximum conflicting attempts before surfacing a conflict.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff between attempts in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Total retry budget in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Returns the default attempt limit.
const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Returns the default retry backoff.
const fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

/// Returns the default retry budget.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Request to issue one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    /// Identity code; `None` formats as `000000`.
    pub identity_code: Option<String>,
    /// Production target identifier.
    pub target_id: TargetId,
    /// Production target name (source of the target code).
    pub target_name: String,
    /// Production target creation timestamp.
    pub target_created_at: DateInput,
    /// Scheduled date (`YYYY-MM-DD` or `YYYYMMDD`).
    pub scheduled_date: String,
}

/// A committed ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedTicket {
    /// Issued identifier.
    pub ticket_id: TicketId,
    /// Sequence assigned within the scope.
    pub sequence: Sequence,
    /// Scope the sequence was allocated in.
    pub scope: AllocationScope,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

// ============================================================================
// SECTION: Issuer
// ============================================================================

/// Issues ticket identifiers against a [`TicketStore`].
#[derive(Debug, Clone)]
pub struct TicketIssuer<S> {
    /// Backing schedule store.
    store: S,
    /// Retry policy.
    policy: AllocationPolicy,
}

impl<S: TicketStore> TicketIssuer<S> {
    /// Creates an issuer over `store`.
    #[must_use]
    pub const fn new(store: S, policy: AllocationPolicy) -> Self {
        Self {
            store,
            policy,
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// Allocates a sequence and persists a new ticket for `request`.
    ///
    /// Two targets that share a target code and creation date compose the
    /// same identifier for the same scheduled date and sequence. The second
    /// such target cannot be issued a ticket for that date and fails with a
    /// non-retryable [`StoreError::Duplicate`].
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Codec`] for invalid fields,
    /// [`AllocationError::SequenceExhausted`] when the scope is full,
    /// [`AllocationError::Conflict`] when sequence races exceed the attempt
    /// limit, [`AllocationError::Contended`] or [`AllocationError::TimedOut`]
    /// when the time budget runs out, and [`AllocationError::Store`] for other
    /// store failures.
    pub fn issue(&self, request: &IssueRequest) -> Result<IssuedTicket, AllocationError> {
        let identity_code = format_identity_code(request.identity_code.as_deref().unwrap_or_default());
        let target_code = extract_target_code(&request.target_name)?;
        let scope = AllocationScope::new(
            request.target_id,
            &request.target_created_at,
            &request.scheduled_date,
        )?;
        let started = Instant::now();
        let budget = Duration::from_millis(self.policy.timeout_ms);
        let mut attempts = 0u32;
        let mut conflicts = 0u32;
        let mut contended = 0u32;
        let mut last_contention: Option<String> = None;
        loop {
            let elapsed = started.elapsed();
            if elapsed >= budget {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(
                    target_id = %scope.target_id(),
                    scheduled_date = %scope.scheduled_date(),
                    attempts,
                    contended,
                    elapsed_ms,
                    "ticket allocation timed out"
                );
                return Err(match last_contention {
                    Some(message) => AllocationError::Contended {
                        attempts,
                        elapsed_ms,
                        message,
                    },
                    None => AllocationError::TimedOut {
                        attempts,
                        elapsed_ms,
                    },
                });
            }
            attempts = attempts.saturating_add(1);
            let outcome = self.store.transact(|tx| {
                issue_in_transaction(tx, &scope, &identity_code, &target_code)
            });
            match outcome {
                Ok((ticket_id, sequence)) => {
                    tracing::info!(
                        ticket_id = %ticket_id,
                        target_id = %scope.target_id(),
                        sequence = sequence.get(),
                        attempts,
                        "ticket issued"
                    );
                    return Ok(IssuedTicket {
                        ticket_id,
                        sequence,
                        scope,
                        attempts,
                    });
                }
                Err(AllocationError::Store(error @ StoreError::Contention(_))) => {
                    contended = contended.saturating_add(1);
                    tracing::debug!(
                        target_id = %scope.target_id(),
                        scheduled_date = %scope.scheduled_date(),
                        attempt = attempts,
                        error = %error,
                        "ticket allocation hit store contention; retrying"
                    );
                    last_contention = Some(error.to_string());
                    self.contention_backoff(contended, budget.saturating_sub(started.elapsed()));
                }
                Err(error) if error.is_retryable() => {
                    conflicts = conflicts.saturating_add(1);
                    last_contention = None;
                    if conflicts >= self.policy.max_attempts {
                        tracing::warn!(
                            target_id = %scope.target_id(),
                            scheduled_date = %scope.scheduled_date(),
                            attempts,
                            error = %error,
                            "ticket allocation gave up after repeated conflicts"
                        );
                        return Err(AllocationError::Conflict {
                            attempts,
                            message: error.to_string(),
                        });
                    }
                    tracing::debug!(
                        target_id = %scope.target_id(),
                        scheduled_date = %scope.scheduled_date(),
                        attempt = attempts,
                        error = %error,
                        "ticket allocation lost a race; retrying"
                    );
                    self.conflict_backoff(conflicts, budget.saturating_sub(started.elapsed()));
                }
                Err(error @ AllocationError::SequenceExhausted {
                    ..
                }) => {
                    tracing::warn!(
                        target_id = %scope.target_id(),
                        target_created = %scope.target_created(),
                        scheduled_date = %scope.scheduled_date(),
                        "ticket sequence exhausted for scope"
                    );
                    return Err(error);
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Sleeps after a lost sequence race, growing linearly with `conflicts`.
    fn conflict_backoff(&self, conflicts: u32, remaining: Duration) {
        let delay_ms = self.policy.retry_backoff_ms.saturating_mul(u64::from(conflicts));
        sleep_within(Duration::from_millis(delay_ms), remaining);
    }

    /// Sleeps after lock contention. The window doubles with each contended
    /// attempt and the delay is drawn from its upper half.
    fn contention_backoff(&self, streak: u32, remaining: Duration) {
        let ceiling_ms = self
            .policy
            .retry_backoff_ms
            .saturating_mul(1u64 << streak.min(MAX_CONTENTION_SHIFT));
        if ceiling_ms == 0 {
            return;
        }
        let delay_ms = rand::thread_rng().gen_range(ceiling_ms / 2 ..= ceiling_ms);
        sleep_within(Duration::from_millis(delay_ms), remaining);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Allocates, composes, and inserts one ticket inside an open transaction.
fn issue_in_transaction(
    tx: &mut dyn ScheduleTransaction,
    scope: &AllocationScope,
    identity_code: &IdentityCode,
    target_code: &TargetCode,
) -> Result<(TicketId, Sequence), AllocationError> {
    let sequence = allocate_sequence(tx, scope)?;
    let ticket_id = compose_identifier(&TicketIdFields {
        identity_code: identity_code.clone(),
        target_created: scope.target_created(),
        target_code: target_code.clone(),
        scheduled_date: scope.scheduled_date().clone(),
        sequence,
    });
    tx.insert_schedule(&ScheduleRecord::new(scope.target_id(), ticket_id.clone()))?;
    Ok((ticket_id, sequence))
}

/// Sleeps for `delay`, never past `remaining`.
fn sleep_within(delay: Duration, remaining: Duration) {
    let delay = delay.min(remaining);
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
