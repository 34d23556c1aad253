//! Property-based tests for the callback codec

use super::*;
use proptest::prelude::*;

fn arb_kind() -> impl Strategy<Value = CallbackType> {
    prop_oneof![
        Just(CallbackType::Goto),
        Just(CallbackType::Back),
        Just(CallbackType::Done),
        Just(CallbackType::Cancel),
        Just(CallbackType::Pagination),
        Just(CallbackType::Checkbox),
        Just(CallbackType::Radiobutton),
    ]
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9_ äö]{0,40}".prop_map(Value::from),
    ]
}

proptest! {
    #[test]
    fn prop_round_trip_within_limit(kind in arb_kind(), id in arb_scalar(), value in arb_scalar()) {
        match encode(kind, &id, &value) {
            Ok(token) => {
                prop_assert!(token.len() <= MAX_CALLBACK_BYTES);
                let decoded = decode(&token).unwrap();
                prop_assert_eq!(decoded, CallbackData { kind, id, value });
            }
            Err(CallbackError::Encoding { len, .. }) => {
                prop_assert!(len > MAX_CALLBACK_BYTES);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    #[test]
    fn prop_decode_never_panics(token in ".{0,80}") {
        let _ = decode(&token);
    }
}
