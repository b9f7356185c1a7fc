// crates/ticket-id-core/src/core/dates.rs
// ============================================================================
// Module: Ticket ID Date Inputs
// Description: Closed set of date-like values accepted by the codec.
// Purpose: Resolve heterogeneous date inputs into one calendar date.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Target creation timestamps reach the codec in several shapes. Rather than
//! inspecting values at runtime, callers wrap them in [`DateInput`], whose
//! variants enumerate every accepted shape. [`DateInput::calendar_date`] is the
//! single parsing function.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Date;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::well_known::Iso8601;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::core::codec::CodecError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Nanoseconds per millisecond.
const NANOS_PER_MILLI: i128 = 1_000_000;

// ============================================================================
// SECTION: Date Input
// ============================================================================

/// A date-like value accepted by [`crate::format_date`].
///
/// # Invariants
/// - Timestamps resolve to the calendar date in their own offset; no
///   timezone conversion is applied.
/// - [`DateInput::UnixMillis`] is interpreted in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    /// Calendar date.
    Date(Date),
    /// Timestamp with a UTC offset.
    DateTime(OffsetDateTime),
    /// Timestamp without an offset.
    Local(PrimitiveDateTime),
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// RFC 3339 / ISO-8601 timestamp or bare `YYYY-MM-DD` text.
    Text(String),
}

impl DateInput {
    /// Resolves the input into a calendar date.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidDate`] when the value cannot be parsed
    /// into a valid calendar date.
    pub fn calendar_date(&self) -> Result<Date, CodecError> {
        match self {
            Self::Date(date) => Ok(*date),
            Self::DateTime(value) => Ok(value.date()),
            Self::Local(value) => Ok(value.date()),
            Self::UnixMillis(millis) => date_from_unix_millis(*millis),
            Self::Text(text) => parse_date_text(text),
        }
    }
}

impl From<Date> for DateInput {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

impl From<OffsetDateTime> for DateInput {
    fn from(value: OffsetDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<PrimitiveDateTime> for DateInput {
    fn from(value: PrimitiveDateTime) -> Self {
        Self::Local(value)
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DateInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts epoch milliseconds into a UTC calendar date.
fn date_from_unix_millis(millis: i64) -> Result<Date, CodecError> {
    let nanos = i128::from(millis) * NANOS_PER_MILLI;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map(OffsetDateTime::date)
        .map_err(|_| CodecError::InvalidDate(format!("unix millis {millis} out of range")))
}

/// Parses date text in the accepted textual shapes, most specific first.
fn parse_date_text(text: &str) -> Result<Date, CodecError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CodecError::InvalidDate("date text is empty".to_string()));
    }
    if let Ok(value) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(value.date());
    }
    if let Ok(value) = OffsetDateTime::parse(trimmed, &Iso8601::DEFAULT) {
        return Ok(value.date());
    }
    if let Ok(value) = PrimitiveDateTime::parse(trimmed, &Iso8601::DEFAULT) {
        return Ok(value.date());
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map_err(|_| CodecError::InvalidDate(format!("'{trimmed}' is not a recognized date")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::DateInput;

    #[test]
    fn rfc3339_keeps_written_calendar_day() -> Result<(), super::CodecError> {
        let input = DateInput::from("2025-01-15T23:30:00+09:00");
        assert_eq!(input.calendar_date()?, date!(2025 - 01 - 15));
        Ok(())
    }

    #[test]
    fn offsetless_timestamp_is_accepted() -> Result<(), super::CodecError> {
        let input = DateInput::from("2025-01-15T08:00:00");
        assert_eq!(input.calendar_date()?, date!(2025 - 01 - 15));
        Ok(())
    }

    #[test]
    fn unix_millis_resolve_in_utc() -> Result<(), super::CodecError> {
        // 2025-01-15T00:00:00Z
        let input = DateInput::UnixMillis(1_736_899_200_000);
        assert_eq!(input.calendar_date()?, date!(2025 - 01 - 15));
        Ok(())
    }

    #[test]
    fn out_of_range_millis_are_rejected() {
        assert!(DateInput::UnixMillis(i64::MAX).calendar_date().is_err());
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(DateInput::from("   ").calendar_date().is_err());
    }
}
