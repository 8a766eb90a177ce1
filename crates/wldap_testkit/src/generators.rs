//! Property-based test generators using proptest.
//!
//! Generated names and values never contain NUL, which the native layer
//! cannot carry.

use crate::script::{MockAttribute, MockEntry, MockMessage, MockValue};
use proptest::prelude::*;

/// Strategy for attribute names.
pub fn attribute_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9-]{0,15}").expect("Invalid regex")
}

/// Strategy for text values (printable, possibly non-ASCII).
pub fn text_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("\\PC{0,24}").expect("Invalid regex")
}

/// Strategy for binary values.
pub fn binary_value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for values whose buffer may extend past the declared length.
pub fn mock_value_strategy() -> impl Strategy<Value = MockValue> {
    (binary_value_strategy(), 0usize..8).prop_flat_map(|(visible, slack)| {
        let declared = visible.len();
        prop::collection::vec(any::<u8>(), slack..=slack).prop_map(move |tail| {
            let mut bytes = visible.clone();
            bytes.extend(tail);
            MockValue::truncated(bytes, declared)
        })
    })
}

/// Strategy for one attribute with up to four values.
pub fn mock_attribute_strategy() -> impl Strategy<Value = MockAttribute> {
    (
        attribute_name_strategy(),
        prop::collection::vec(mock_value_strategy(), 0..4),
    )
        .prop_map(|(name, values)| MockAttribute { name, values })
}

/// Strategy for one entry with up to `max_attributes` attributes.
pub fn mock_entry_strategy(max_attributes: usize) -> impl Strategy<Value = MockEntry> {
    (
        "[a-z]{1,8}",
        prop::collection::vec(mock_attribute_strategy(), 0..=max_attributes),
    )
        .prop_map(|(cn, attributes)| MockEntry {
            dn: format!("cn={cn},dc=example,dc=com"),
            attributes,
        })
}

/// Strategy for a message with up to `max_entries` entries.
pub fn mock_message_strategy(max_entries: usize) -> impl Strategy<Value = MockMessage> {
    prop::collection::vec(mock_entry_strategy(4), 0..=max_entries).prop_map(MockMessage::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn generated_values_keep_declared_prefix() {
        let mut runner = TestRunner::default();
        for _ in 0..32 {
            let value = mock_value_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(value.declared_len <= value.bytes.len());
        }
    }

    proptest! {
        #[test]
        fn text_values_have_no_nul(s in text_value_strategy()) {
            prop_assert!(!s.contains('\0'));
        }

        #[test]
        fn attribute_names_are_non_empty(name in attribute_name_strategy()) {
            prop_assert!(!name.is_empty());
        }
    }
}
