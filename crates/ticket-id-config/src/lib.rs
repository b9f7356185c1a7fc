// crates/ticket-id-config/src/lib.rs
// ============================================================================
// Module: Ticket ID Config Library
// Description: Canonical config model and validation for ticket issuing.
// Purpose: Single source of truth for ticket-id.toml semantics.
// Dependencies: ticket-id-core, ticket-id-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `ticket-id-config` loads `ticket-id.toml`, validates it fail-closed, and
//! builds a ready [`TicketIssuer`] over the configured `SQLite` store.
//!
//! [`TicketIssuer`]: ticket_id_core::TicketIssuer

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
