// crates/ticket-id-core/src/core/codec.rs
// ============================================================================
// Module: Ticket ID Field Codec
// Description: Pure formatting and composition of ticket identifier fields.
// Purpose: Produce bit-exact 28-character identifiers from raw inputs.
// Dependencies: thiserror, time
// ============================================================================

//! ## Overview
//! The codec validates and formats each identifier field and concatenates
//! them in fixed order with no separators:
//!
//! | Field               | Width |
//! |---------------------|-------|
//! | Identity code       | 6     |
//! | Target-created date | 8     |
//! | Target code         | 4     |
//! | Scheduled date      | 8     |
//! | Sequence            | 2     |
//!
//! Every function here is deterministic and performs no I/O. Codec errors
//! must never be retried; retrying cannot change the outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::dates::DateInput;
use crate::core::fields::CompactDate;
use crate::core::fields::IDENTITY_CODE_WIDTH;
use crate::core::fields::IDENTITY_PAD;
use crate::core::fields::IdentityCode;
use crate::core::fields::ScheduledDate;
use crate::core::fields::Sequence;
use crate::core::fields::TARGET_CODE_WIDTH;
use crate::core::fields::TargetCode;
use crate::core::identifiers::TicketId;
use crate::core::identifiers::TicketIdFields;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Deterministic field validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - None of these errors are retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A date value could not be parsed into a calendar date.
    #[error("invalid date: {0}")]
    InvalidDate(String),
    /// A target name did not reduce to exactly four alphanumeric characters.
    #[error("invalid target code: {0}")]
    InvalidTargetCode(String),
    /// A sequence value fell outside `1..=99`.
    #[error("sequence out of range: {value} (expected 1..=99)")]
    SequenceRange {
        /// Rejected sequence value.
        value: u32,
    },
    /// A stored identifier did not decode into fixed-width fields.
    #[error("malformed ticket identifier: {0}")]
    MalformedIdentifier(String),
}

// ============================================================================
// SECTION: Field Operations
// ============================================================================

/// Formats an identity code: ASCII letters and digits only, upper-cased,
/// truncated or right-padded with `0` to six characters.
///
/// Every other character is discarded, as in [`extract_target_code`], so the
/// composed identifier stays pure ASCII.
#[must_use]
pub fn format_identity_code(raw: &str) -> IdentityCode {
    let mut code: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(IDENTITY_CODE_WIDTH)
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    let width = code.len();
    code.extend(std::iter::repeat_n(IDENTITY_PAD, IDENTITY_CODE_WIDTH - width));
    IdentityCode::from_formatted(code)
}

/// Formats a date-like value as `YYYYMMDD`.
///
/// # Errors
///
/// Returns [`CodecError::InvalidDate`] when the value does not resolve to a
/// valid calendar date.
pub fn format_date(value: &DateInput) -> Result<CompactDate, CodecError> {
    CompactDate::from_date(value.calendar_date()?)
}

/// Extracts the four-character target code from a target name.
///
/// Every character that is not an ASCII letter or digit is discarded, so
/// `"DS8-2"` yields `"DS82"`.
///
/// # Errors
///
/// Returns [`CodecError::InvalidTargetCode`] unless exactly four alphanumeric
/// characters remain.
pub fn extract_target_code(name: &str) -> Result<TargetCode, CodecError> {
    let stripped: String = name.chars().filter(char::is_ascii_alphanumeric).collect();
    if stripped.len() != TARGET_CODE_WIDTH {
        return Err(CodecError::InvalidTargetCode(format!(
            "'{name}' reduces to {} alphanumeric characters, expected {TARGET_CODE_WIDTH}",
            stripped.len()
        )));
    }
    Ok(TargetCode::from_formatted(stripped.to_ascii_uppercase()))
}

/// Formats a scheduled date by stripping every `-`.
///
/// Only the shape is checked here. Calendar validity is the scheduling
/// component's responsibility.
///
/// # Errors
///
/// Returns [`CodecError::InvalidDate`] when the stripped value is not eight
/// digits.
pub fn format_scheduled_date(raw: &str) -> Result<ScheduledDate, CodecError> {
    let stripped: String = raw.chars().filter(|ch| *ch != '-').collect();
    ScheduledDate::parse(&stripped)
}

/// Formats a sequence ordinal as two zero-padded digits.
///
/// # Errors
///
/// Returns [`CodecError::SequenceRange`] unless `1 <= value <= 99`.
pub fn format_sequence(value: u32) -> Result<Sequence, CodecError> {
    Sequence::new(value)
}

/// Concatenates formatted fields into a ticket identifier.
#[must_use]
pub fn compose_identifier(fields: &TicketIdFields) -> TicketId {
    let value = format!(
        "{}{}{}{}{}",
        fields.identity_code,
        fields.target_created,
        fields.target_code,
        fields.scheduled_date,
        fields.sequence
    );
    TicketId::from_parts(value, fields.clone())
}

// ============================================================================
// SECTION: Identifier Consumer
// ============================================================================

/// Raw inputs for generating one ticket identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketIdRequest {
    /// Identity code; `None` formats as `000000`.
    pub identity_code: Option<String>,
    /// Creation timestamp of the production target.
    pub target_created_at: DateInput,
    /// Production target name.
    pub target_name: String,
    /// Scheduled date (`YYYY-MM-DD` or `YYYYMMDD`).
    pub scheduled_date: String,
    /// Allocated sequence.
    pub sequence: u32,
}

/// Formats every field of `request` and composes the identifier.
///
/// # Errors
///
/// Returns the first [`CodecError`] raised by a field operation.
pub fn generate_ticket_id(request: &TicketIdRequest) -> Result<TicketId, CodecError> {
    let fields = TicketIdFields {
        identity_code: format_identity_code(request.identity_code.as_deref().unwrap_or_default()),
        target_created: format_date(&request.target_created_at)?,
        target_code: extract_target_code(&request.target_name)?,
        scheduled_date: format_scheduled_date(&request.scheduled_date)?,
        sequence: format_sequence(request.sequence)?,
    };
    Ok(compose_identifier(&fields))
}
