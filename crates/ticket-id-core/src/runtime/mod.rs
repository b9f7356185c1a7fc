// crates/ticket-id-core/src/runtime/mod.rs
// ============================================================================
// Module: Ticket ID Runtime
// Description: Sequence allocation, ticket issuing, and an in-memory store.
// Purpose: Turn a scope into a committed, unique ticket identifier.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Runtime modules run the allocator inside store transactions and retry the
//! read-compute-insert cycle when a concurrent writer wins the same sequence.
//! Every surface that issues tickets must go through [`TicketIssuer`] so the
//! retry policy is applied uniformly.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod allocator;
pub mod issuer;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use allocator::AllocationError;
pub use allocator::allocate_sequence;
pub use issuer::AllocationPolicy;
pub use issuer::IssueRequest;
pub use issuer::IssuedTicket;
pub use issuer::TicketIssuer;
pub use store::InMemoryTicketStore;
