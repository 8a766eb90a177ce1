//! Canned directory content for tests.

use crate::mock::MockWldap32;
use crate::script::{MockAttribute, MockEntry, MockMessage, MockValue};
use std::rc::Rc;

/// A mock shared the way the bindings share their gateway.
///
/// Tests keep one clone to inspect the mock after handing the other to the
/// code under test.
pub fn shared_mock() -> Rc<MockWldap32> {
    Rc::new(MockWldap32::new())
}

/// A person entry with `cn`, `sn` and two `mail` values.
pub fn person(cn: &str) -> MockEntry {
    MockEntry::new(format!("cn={cn},ou=people,dc=example,dc=com"))
        .with("cn", [cn])
        .with("sn", ["Example"])
        .with("mail", ["first@example.com", "second@example.com"])
}

/// Three entries with no attributes, `cn=1`, `cn=2` and `cn=3`.
pub fn three_entries() -> MockMessage {
    MockMessage::new((1..=3).map(|i| MockEntry::new(format!("cn={i}"))))
}

/// One entry carrying `attr` with values `v1` and `val2`, whose buffers run
/// past their declared lengths 2 and 4.
pub fn truncated_binary_entry() -> MockEntry {
    MockEntry::new("cn=binary").with_attribute(MockAttribute::new(
        "attr",
        [
            MockValue::truncated(b"v1___".to_vec(), 2),
            MockValue::truncated(b"val2___".to_vec(), 4),
        ],
    ))
}

/// A search result of two people.
pub fn people() -> MockMessage {
    MockMessage::new([person("alice"), person("bob")])
}
