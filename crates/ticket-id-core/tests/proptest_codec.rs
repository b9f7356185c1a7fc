//! Ticket identifier codec property-based tests.
//!
//! ## Purpose
//! These tests exercise the codec with randomized field values to show that
//! every accepted input produces a fixed-width identifier whose fields can be
//! recovered by position, and that arbitrary text never panics the parser.
//!
//! ## What is covered
//! - Composed identifiers are always 28 ASCII characters.
//! - Parsing a composed identifier recovers every field.
//! - Identity codes are always six characters.
//! - Arbitrary strings fed to the parser fail closed without panics.
// crates/ticket-id-core/tests/proptest_codec.rs
// ============================================================================
// Module: Codec Property-Based Tests
// Description: Randomized checks for identifier width and field recovery.
// Purpose: Ensure positional decoding holds for every valid field combination.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use ticket_id_core::DateInput;
use ticket_id_core::TicketId;
use ticket_id_core::TicketIdRequest;
use ticket_id_core::format_identity_code;
use ticket_id_core::generate_ticket_id;

prop_compose! {
    fn valid_request()(
        identity in proptest::option::of("[A-Za-z0-9]{0,10}"),
        year in 1900i32..2100,
        month in 1u8..=12,
        day in 1u8..=28,
        target in "[A-Z0-9]{2}-?[A-Z0-9]{2}",
        scheduled in "[0-9]{8}",
        sequence in 1u32..=99,
    ) -> TicketIdRequest {
        TicketIdRequest {
            identity_code: identity,
            target_created_at: DateInput::from(format!("{year:04}-{month:02}-{day:02}")),
            target_name: target,
            scheduled_date: scheduled,
            sequence,
        }
    }
}

proptest! {
    #[test]
    fn composed_identifier_is_fixed_width(request in valid_request()) {
        let ticket_id = generate_ticket_id(&request).unwrap();
        prop_assert_eq!(ticket_id.as_str().len(), 28);
        prop_assert!(ticket_id.as_str().is_ascii());
    }

    #[test]
    fn parsing_recovers_every_field(request in valid_request()) {
        let ticket_id = generate_ticket_id(&request).unwrap();
        let parsed = TicketId::parse(ticket_id.as_str()).unwrap();
        prop_assert_eq!(parsed.fields(), ticket_id.fields());
        prop_assert_eq!(parsed.fields().sequence.get(), request.sequence);
        prop_assert_eq!(parsed.fields().scheduled_date.as_str(), request.scheduled_date.as_str());
    }

    #[test]
    fn identity_code_is_six_upper_ascii_alphanumerics(raw in "\\PC{0,16}") {
        let code = format_identity_code(&raw);
        prop_assert_eq!(code.as_str().len(), 6);
        prop_assert!(
            code.as_str().bytes().all(|byte| byte.is_ascii_digit() || byte.is_ascii_uppercase())
        );
    }

    #[test]
    fn parser_fails_closed_on_arbitrary_text(raw in "\\PC{0,40}") {
        if let Ok(parsed) = TicketId::parse(&raw) {
            prop_assert_eq!(parsed.as_str(), raw.as_str());
        }
    }
}
