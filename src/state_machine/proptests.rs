//! Property-based tests for state registration

use super::name::{is_well_formed, RESERVED};
use super::*;
use crate::store::MemoryStore;
use proptest::prelude::*;

fn arb_state_name() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{0,15}".prop_filter("reserved", |name| !RESERVED.contains(&name.as_str()))
}

proptest! {
    #[test]
    fn prop_register_then_lookup(names in proptest::collection::hash_set(arb_state_name(), 1..8)) {
        let mut machine = StateMachine::new(MemoryStore::new(), MachineConfig::default());
        for name in &names {
            prop_assert!(machine.register(State::new(name.clone())).is_ok());
        }
        for name in &names {
            prop_assert_eq!(machine.state(name).map(State::name), Some(name.as_str()));
        }
    }

    #[test]
    fn prop_lowercase_names_rejected(name in "[a-z][a-z0-9_]{0,10}") {
        let mut machine = StateMachine::new(MemoryStore::new(), MachineConfig::default());
        prop_assert!(machine.register(State::new(name.clone())).is_err());
        prop_assert!(machine.state(&name).is_none());
    }

    #[test]
    fn prop_validation_matches_pattern(name in "\\PC{0,12}") {
        let accepted = name::validate(&name).is_ok();
        let expected = is_well_formed(&name) && !RESERVED.contains(&name.as_str());
        prop_assert_eq!(accepted, expected);
    }
}
