//! Property-based tests for session logic
//!
//! Guest naming and the keepalive handshake are pure, so their invariants are
//! checked directly over generated inputs.

use std::collections::HashSet;

use metalobby_core::{Keepalive, PingOutcome, resolve_guest_name};
use proptest::prelude::*;

/// Events observed by a keepalive between ping cycles
#[derive(Debug, Clone, Copy)]
enum Event {
    Packet,
    PingCycle,
}

fn arbitrary_event() -> impl Strategy<Value = Event> {
    prop_oneof![Just(Event::Packet), Just(Event::PingCycle)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: resolution terminates with a name that is not taken
    #[test]
    fn prop_guest_name_is_free(
        base in "[a-z]{1,8}",
        suffixes in prop::collection::vec(0u32..40, 0..40),
        base_taken in any::<bool>(),
    ) {
        let mut taken: HashSet<String> =
            suffixes.iter().map(|s| format!("{base}{s}")).collect();
        if base_taken {
            taken.insert(base.clone());
        }

        let name = resolve_guest_name(&base, |n| taken.contains(n));

        prop_assert!(!taken.contains(&name));
        prop_assert!(name.starts_with(&base));
    }

    /// Property: logging in guests one after another never repeats a name
    #[test]
    fn prop_sequential_guests_get_distinct_names(
        bases in prop::collection::vec(
            prop_oneof![Just("alice"), Just("bob"), Just("alice1")],
            1..30,
        ),
    ) {
        let mut online: HashSet<String> = HashSet::new();

        for base in bases {
            let name = resolve_guest_name(base, |n| online.contains(n));
            prop_assert!(online.insert(name));
        }
    }

    /// Property: `Expired` happens exactly when two cycles pass with no packet
    /// in between
    #[test]
    fn prop_keepalive_double_miss(events in prop::collection::vec(arbitrary_event(), 0..64)) {
        let mut keepalive = Keepalive::new();
        let mut cycles_since_packet = 0u32;

        for event in events {
            match event {
                Event::Packet => {
                    keepalive.on_packet();
                    cycles_since_packet = 0;
                },
                Event::PingCycle => {
                    cycles_since_packet += 1;
                    let outcome = keepalive.on_ping_cycle();
                    if cycles_since_packet >= 2 {
                        prop_assert_eq!(outcome, PingOutcome::Expired);
                        // The session is gone after the first expiry.
                        break;
                    }
                    prop_assert_eq!(outcome, PingOutcome::SendPing);
                },
            }
        }
    }
}
