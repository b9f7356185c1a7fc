// crates/ticket-id-core/src/core/mod.rs
// ============================================================================
// Module: Ticket ID Core Types
// Description: Identifier fields, codec operations, and allocation scopes.
// Purpose: Provide validated, serializable types for the ticket identifier.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Core types define the five fixed-width identifier fields, the pure codec
//! that formats and composes them, and the allocation scope that bounds
//! sequence uniqueness. Nothing in this module touches a store.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod codec;
pub mod dates;
pub mod fields;
pub mod identifiers;
pub mod scope;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use codec::CodecError;
pub use codec::TicketIdRequest;
pub use codec::compose_identifier;
pub use codec::extract_target_code;
pub use codec::format_date;
pub use codec::format_identity_code;
pub use codec::format_scheduled_date;
pub use codec::format_sequence;
pub use codec::generate_ticket_id;
pub use dates::DateInput;
pub use fields::CompactDate;
pub use fields::IdentityCode;
pub use fields::ScheduledDate;
pub use fields::Sequence;
pub use fields::TargetCode;
pub use identifiers::TargetId;
pub use identifiers::TicketId;
pub use identifiers::TicketIdFields;
pub use scope::AllocationScope;
pub use scope::ScheduleRecord;
