//! Property-based tests for selection and paging

use super::*;
use crate::config::MachineConfig;
use crate::session::{Data, SessionKey};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn arb_options() -> impl Strategy<Value = BTreeMap<String, bool>> {
    proptest::collection::btree_map("[a-z]{1,8}", any::<bool>(), 1..12)
}

fn arb_checkbox_tmp() -> impl Strategy<Value = (Value, String)> {
    arb_options().prop_flat_map(|options| {
        let keys: Vec<String> = options.keys().cloned().collect();
        let tmp = Value::Object(options.into_iter().map(|(k, v)| (k, Value::Bool(v))).collect());
        (Just(tmp), proptest::sample::select(keys))
    })
}

proptest! {
    #[test]
    fn prop_toggle_is_involution((tmp, key) in arb_checkbox_tmp()) {
        let button = SelectableButton::new("Option", key);
        let mut toggled = tmp.clone();
        toggle_checkbox(&mut toggled, &button);
        prop_assert_ne!(&toggled, &tmp);
        toggle_checkbox(&mut toggled, &button);
        prop_assert_eq!(toggled, tmp);
    }

    #[test]
    fn prop_pagination_clamps(count in 0usize..200, requested in any::<i64>(), page_size in 1usize..20) {
        let window = paginate(count, requested, page_size);
        prop_assert!(window.pages >= 1);
        prop_assert!(window.page < window.pages);
        prop_assert_eq!(window.pages as usize, count / page_size + 1);
        prop_assert!(window.range(count, page_size).len() <= page_size);
    }

    #[test]
    fn prop_pagination_callback_stays_in_range(requested in -50i64..50) {
        let mut registry = MenuRegistry::new();
        let buttons: Vec<SelectableButton> = (0..25)
            .map(|i| SelectableButton::new(format!("Option {i}"), format!("o{i}")))
            .collect();
        registry.add(MenuDefinition::checkbox("MANY", buttons)).unwrap();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = Turn::new(SessionKey::private(1), DEFAULT, Data::new(), &config);
        nav.show(&mut turn, "MANY").unwrap();

        let query = CallbackQuery {
            query_id: "q".to_string(),
            data: callback::encode(CallbackType::Pagination, &Value::Null, &Value::from(requested)).unwrap(),
            message_id: None,
        };
        prop_assert_eq!(nav.handle_callback(&mut turn, "MANY", &query).unwrap(), Flow::abort());
        let page = turn.data.menu("MANY").unwrap().page;
        prop_assert!(page <= 2);
        prop_assert_eq!(i64::from(page), requested.clamp(0, 2));
    }
}
