// crates/ticket-id-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Ticket Store
// Description: Durable TicketStore backend using SQLite.
// Purpose: Persist issued ticket schedules with database-enforced uniqueness.
// Dependencies: ticket-id-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`TicketStore`] implementation. Each
//! issue runs in one database transaction and the `ticket_schedules` table
//! carries a uniqueness constraint over scope plus sequence, so several
//! processes sharing one database file can never commit the same sequence
//! twice.
//!
//! [`TicketStore`]: ticket_id_core::TicketStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteTicketStore;
pub use store::SqliteTransactionMode;
