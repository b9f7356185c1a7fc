// crates/ticket-id-core/src/core/identifiers.rs
// ============================================================================
// Module: Ticket ID Identifiers
// Description: Target identifiers and the composed ticket identifier.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`TargetId`] names a production target in the store. [`TicketId`] is the
//! composed 28-character identifier; it always carries its decoded fields so
//! consumers never re-slice the string by hand.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;

use crate::core::codec::CodecError;
use crate::core::fields::CompactDate;
use crate::core::fields::DATE_WIDTH;
use crate::core::fields::IDENTITY_CODE_WIDTH;
use crate::core::fields::IdentityCode;
use crate::core::fields::SEQUENCE_WIDTH;
use crate::core::fields::ScheduledDate;
use crate::core::fields::Sequence;
use crate::core::fields::TARGET_CODE_WIDTH;
use crate::core::fields::TICKET_ID_WIDTH;
use crate::core::fields::TargetCode;
use crate::core::fields::is_digits;

// ============================================================================
// SECTION: Target Identifier
// ============================================================================

/// Production target identifier.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(NonZeroU64);

impl TargetId {
    /// Creates a new target identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    /// Creates a target identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

// ============================================================================
// SECTION: Ticket Identifier
// ============================================================================

/// The five formatted fields of a ticket identifier, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketIdFields {
    /// Identity code (characters 0..6).
    pub identity_code: IdentityCode,
    /// Target-created date (characters 6..14).
    pub target_created: CompactDate,
    /// Target code (characters 14..18).
    pub target_code: TargetCode,
    /// Scheduled date (characters 18..26).
    pub scheduled_date: ScheduledDate,
    /// Sequence (characters 26..28).
    pub sequence: Sequence,
}

/// Composed fixed-width ticket identifier.
///
/// # Invariants
/// - Exactly [`TICKET_ID_WIDTH`] characters, no separators.
/// - `fields` always matches the text it was decoded from or composed into.
/// - Immutable once issued; never recomputed or reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketId {
    /// Identifier text.
    value: String,
    /// Decoded fields.
    fields: TicketIdFields,
}

impl TicketId {
    /// Pairs composed text with the fields it was built from.
    pub(crate) const fn from_parts(value: String, fields: TicketIdFields) -> Self {
        Self {
            value,
            fields,
        }
    }

    /// Decodes an identifier by fixed-width slicing.
    ///
    /// Each slice is re-validated for shape (digit fields, sequence range,
    /// target code alphabet). Business meaning is not recovered; target codes
    /// are lossy by design.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedIdentifier`] when the width is wrong, or
    /// the field error for the first slice that fails validation.
    pub fn parse(value: &str) -> Result<Self, CodecError> {
        let chars: Vec<char> = value.chars().collect();
        if chars.len() != TICKET_ID_WIDTH {
            return Err(CodecError::MalformedIdentifier(format!(
                "expected {TICKET_ID_WIDTH} characters, found {}",
                chars.len()
            )));
        }
        let mut cursor = 0usize;
        let mut take = |width: usize| -> String {
            let slice: String = chars[cursor .. cursor + width].iter().collect();
            cursor += width;
            slice
        };
        let identity = take(IDENTITY_CODE_WIDTH);
        let created = take(DATE_WIDTH);
        let target = take(TARGET_CODE_WIDTH);
        let scheduled = take(DATE_WIDTH);
        let sequence = take(SEQUENCE_WIDTH);
        if !is_digits(&sequence, SEQUENCE_WIDTH) {
            return Err(CodecError::MalformedIdentifier(format!(
                "sequence field '{sequence}' is not numeric"
            )));
        }
        let sequence = sequence
            .parse::<u32>()
            .map_err(|err| CodecError::MalformedIdentifier(err.to_string()))?;
        let fields = TicketIdFields {
            identity_code: IdentityCode::parse(&identity)?,
            target_created: CompactDate::parse(&created)?,
            target_code: TargetCode::parse(&target)?,
            scheduled_date: ScheduledDate::parse(&scheduled)?,
            sequence: Sequence::new(sequence)?,
        };
        Ok(Self::from_parts(value.to_string(), fields))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the decoded fields.
    #[must_use]
    pub const fn fields(&self) -> &TicketIdFields {
        &self.fields
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl TryFrom<String> for TicketId {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TicketId> for String {
    fn from(value: TicketId) -> Self {
        value.value
    }
}
