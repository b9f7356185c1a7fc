// crates/ticket-id-core/src/core/fields.rs
// ============================================================================
// Module: Ticket ID Fields
// Description: Fixed-width field types composing a ticket identifier.
// Purpose: Make every formatted field unrepresentable unless it validated.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Each identifier field has a fixed character width. The types here can only
//! be built through the codec (or by re-validating a previously formatted
//! value), so a composed identifier is always exactly
//! [`TICKET_ID_WIDTH`] characters long.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::Month;

use crate::core::codec::CodecError;

// ============================================================================
// SECTION: Widths
// ============================================================================

/// Width of the identity code field.
pub const IDENTITY_CODE_WIDTH: usize = 6;
/// Width of a `YYYYMMDD` date field.
pub const DATE_WIDTH: usize = 8;
/// Width of the target code field.
pub const TARGET_CODE_WIDTH: usize = 4;
/// Width of the sequence field.
pub const SEQUENCE_WIDTH: usize = 2;
/// Total width of a composed ticket identifier.
pub const TICKET_ID_WIDTH: usize =
    IDENTITY_CODE_WIDTH + DATE_WIDTH + TARGET_CODE_WIDTH + DATE_WIDTH + SEQUENCE_WIDTH;
/// Padding character appended to short identity codes.
pub const IDENTITY_PAD: char = '0';
/// Largest year representable in four digits.
const MAX_YEAR: i32 = 9_999;

// ============================================================================
// SECTION: Identity Code
// ============================================================================

/// Six-character identity code (right-padded with `0`, upper-cased).
///
/// # Invariants
/// - Exactly [`IDENTITY_CODE_WIDTH`] characters, each an ASCII digit or
///   upper-case ASCII letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityCode(String);

impl IdentityCode {
    /// Wraps an already padded code.
    pub(crate) const fn from_formatted(code: String) -> Self {
        Self(code)
    }

    /// Re-validates a previously formatted identity code.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedIdentifier`] when the width or the
    /// alphabet is wrong.
    pub fn parse(value: &str) -> Result<Self, CodecError> {
        if value.len() != IDENTITY_CODE_WIDTH {
            return Err(CodecError::MalformedIdentifier(format!(
                "identity code must be {IDENTITY_CODE_WIDTH} characters"
            )));
        }
        if !value.bytes().all(|byte| byte.is_ascii_digit() || byte.is_ascii_uppercase()) {
            return Err(CodecError::MalformedIdentifier(format!(
                "identity code '{value}' must be upper-case ASCII letters and digits"
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for IdentityCode {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IdentityCode> for String {
    fn from(value: IdentityCode) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Compact Date
// ============================================================================

/// Calendar date rendered as eight digits (`YYYYMMDD`).
///
/// # Invariants
/// - The wrapped date is a valid calendar date with a year in `0..=9999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompactDate(Date);

impl CompactDate {
    /// Wraps a calendar date.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidDate`] when the year does not fit four digits.
    pub fn from_date(date: Date) -> Result<Self, CodecError> {
        if !(0 ..= MAX_YEAR).contains(&date.year()) {
            return Err(CodecError::InvalidDate(format!(
                "year {} does not fit a YYYYMMDD field",
                date.year()
            )));
        }
        Ok(Self(date))
    }

    /// Parses a `YYYYMMDD` string back into a calendar date.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidDate`] when the value is not eight digits
    /// or does not name a real calendar day.
    pub fn parse(value: &str) -> Result<Self, CodecError> {
        if !is_digits(value, DATE_WIDTH) {
            return Err(CodecError::InvalidDate(format!("'{value}' is not a YYYYMMDD value")));
        }
        let year = parse_component::<i32>(&value[0 .. 4])?;
        let month = parse_component::<u8>(&value[4 .. 6])?;
        let day = parse_component::<u8>(&value[6 .. 8])?;
        let month = Month::try_from(month)
            .map_err(|_| CodecError::InvalidDate(format!("'{value}' has no month {month}")))?;
        let date = Date::from_calendar_date(year, month, day)
            .map_err(|err| CodecError::InvalidDate(format!("'{value}': {err}")))?;
        Self::from_date(date)
    }

    /// Returns the wrapped calendar date.
    #[must_use]
    pub const fn date(self) -> Date {
        self.0
    }
}

impl fmt::Display for CompactDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.0.year(), u8::from(self.0.month()), self.0.day())
    }
}

impl TryFrom<String> for CompactDate {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CompactDate> for String {
    fn from(value: CompactDate) -> Self {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Target Code
// ============================================================================

/// Four-character upper-case alphanumeric code derived from a target name.
///
/// # Invariants
/// - Exactly [`TARGET_CODE_WIDTH`] ASCII characters, digits or upper-case letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetCode(String);

impl TargetCode {
    /// Wraps an already extracted code.
    pub(crate) const fn from_formatted(code: String) -> Self {
        Self(code)
    }

    /// Re-validates a previously extracted target code.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidTargetCode`] when the value is not four
    /// upper-case alphanumeric characters.
    pub fn parse(value: &str) -> Result<Self, CodecError> {
        let valid = value.len() == TARGET_CODE_WIDTH
            && value.bytes().all(|byte| byte.is_ascii_digit() || byte.is_ascii_uppercase());
        if !valid {
            return Err(CodecError::InvalidTargetCode(format!(
                "'{value}' is not a {TARGET_CODE_WIDTH}-character target code"
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for TargetCode {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TargetCode> for String {
    fn from(value: TargetCode) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Scheduled Date
// ============================================================================

/// Scheduled date as eight digits with separators removed.
///
/// # Invariants
/// - Exactly [`DATE_WIDTH`] ASCII digits.
/// - Calendar validity is not checked; scheduling validates dates upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduledDate(String);

impl ScheduledDate {
    /// Validates an eight-digit scheduled date.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidDate`] when the value is not eight digits.
    pub fn parse(value: &str) -> Result<Self, CodecError> {
        if !is_digits(value, DATE_WIDTH) {
            return Err(CodecError::InvalidDate(format!(
                "scheduled date '{value}' must be {DATE_WIDTH} digits"
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the date digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduledDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for ScheduledDate {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ScheduledDate> for String {
    fn from(value: ScheduledDate) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Sequence
// ============================================================================

/// Per-scope ticket ordinal rendered as two zero-padded digits.
///
/// # Invariants
/// - Always within [`Sequence::MIN`]`..=`[`Sequence::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Sequence(u8);

impl Sequence {
    /// Smallest sequence in a scope.
    pub const MIN: u32 = 1;
    /// Largest sequence in a scope.
    pub const MAX: u32 = 99;

    /// Creates a sequence from an ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::SequenceRange`] when `value` is outside `1..=99`.
    pub fn new(value: u32) -> Result<Self, CodecError> {
        if !(Self::MIN ..= Self::MAX).contains(&value) {
            return Err(CodecError::SequenceRange {
                value,
            });
        }
        u8::try_from(value).map(Self).map_err(|_| CodecError::SequenceRange {
            value,
        })
    }

    /// Returns the ordinal value.
    #[must_use]
    pub fn get(self) -> u32 {
        u32::from(self.0)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = SEQUENCE_WIDTH)
    }
}

impl TryFrom<u32> for Sequence {
    type Error = CodecError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Sequence> for u32 {
    fn from(value: Sequence) -> Self {
        value.get()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when `value` is exactly `width` ASCII digits.
pub(crate) fn is_digits(value: &str, width: usize) -> bool {
    value.len() == width && value.bytes().all(|byte| byte.is_ascii_digit())
}

/// Parses an ASCII digit run that was already length-checked.
fn parse_component<T: std::str::FromStr>(digits: &str) -> Result<T, CodecError> {
    digits
        .parse::<T>()
        .map_err(|_| CodecError::InvalidDate(format!("'{digits}' is not numeric")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
