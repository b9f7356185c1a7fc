// crates/ticket-id-core/src/lib.rs
// ============================================================================
// Module: Ticket ID Core Library
// Description: Public API surface for the Ticket ID core.
// Purpose: Expose the field codec, store interfaces, and allocation runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Ticket ID core encodes five semantic fields into a fixed-width 28-character
//! ticket identifier and allocates the per-scope sequence number that keeps
//! identifiers unique when tickets are issued concurrently. Persistence is
//! reached only through the [`TicketStore`] interface; the codec performs no
//! I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::ScheduleTransaction;
pub use interfaces::StoreError;
pub use interfaces::TicketStore;
pub use runtime::AllocationError;
pub use runtime::AllocationPolicy;
pub use runtime::InMemoryTicketStore;
pub use runtime::IssueRequest;
pub use runtime::IssuedTicket;
pub use runtime::TicketIssuer;
pub use runtime::allocate_sequence;
