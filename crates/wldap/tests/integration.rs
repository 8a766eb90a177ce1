//! Integration tests for the bindings against the scripted gateway.

use std::rc::Rc;
use std::time::Duration;
use wldap::{parse_binary_message, Changeset, Ldap, LdapConfig, LdapError, ModOp, Modification};
use wldap_sys::{
    LdapTimeval, LDAP_ALREADY_EXISTS, LDAP_MOD_ADD, LDAP_MOD_DELETE, LDAP_MOD_REPLACE,
    LDAP_MSG_ALL, LDAP_NO_SUCH_ATTRIBUTE, LDAP_NO_SUCH_OBJECT, LDAP_OPT_ON,
    LDAP_OPT_PROTOCOL_VERSION, LDAP_OPT_REFERRALS, LDAP_OPT_SIZELIMIT, LDAP_PORT,
    LDAP_SCOPE_BASE, LDAP_SCOPE_SUBTREE, LDAP_SERVER_DOWN, LDAP_UNWILLING_TO_PERFORM,
};
use wldap_testkit::prelude::*;

fn connect(mock: &Rc<MockWldap32>) -> Ldap {
    Ldap::init(mock.clone(), Some("dc01.example.com"), LDAP_PORT).unwrap()
}

#[test]
fn open_applies_config_then_connects() {
    let mock = shared_mock();
    let config = LdapConfig::new()
        .host("dc01.example.com")
        .port(636)
        .size_limit(100)
        .referrals(true)
        .connect_timeout(Duration::from_secs(3));

    let _ldap = Ldap::open(mock.clone(), &config).unwrap();

    let calls = mock.calls();
    assert_eq!(
        calls[0],
        MockCall::Init {
            host: Some("dc01.example.com".into()),
            port: 636
        }
    );
    assert_eq!(
        calls[1],
        MockCall::SetOption {
            option: LDAP_OPT_PROTOCOL_VERSION,
            value: 3
        }
    );
    assert_eq!(
        calls[2],
        MockCall::SetOption {
            option: LDAP_OPT_SIZELIMIT,
            value: 100
        }
    );
    assert_eq!(
        calls[3],
        MockCall::SetOption {
            option: LDAP_OPT_REFERRALS,
            value: LDAP_OPT_ON
        }
    );
    assert_eq!(
        calls[4],
        MockCall::Connect {
            timeout: Some(LdapTimeval {
                tv_sec: 3,
                tv_usec: 0
            })
        }
    );
    assert_eq!(calls.len(), 5);
}

#[test]
fn open_releases_handle_when_connect_fails() {
    let mock = shared_mock();
    mock.fail_next_connect(LDAP_SERVER_DOWN);
    let config = LdapConfig::new().host("dc01.example.com").size_limit(10);
    let err = Ldap::open(mock.clone(), &config).unwrap_err();
    assert_eq!(err.code(), Some(LDAP_SERVER_DOWN));
    assert!(matches!(
        mock.calls().as_slice(),
        [
            MockCall::Init { .. },
            MockCall::SetOption { .. },
            MockCall::SetOption { .. },
            MockCall::Connect { .. },
            MockCall::Unbind,
        ]
    ));
    assert_eq!(mock.releases().unbind, 1);
    assert!(!mock.is_connected());
}

#[test]
fn search_walk_releases_everything() {
    let mock = shared_mock();
    let ldap = connect(&mock);
    mock.push_search_result(people());

    let message = ldap
        .search_s(
            "ou=people,dc=example,dc=com",
            LDAP_SCOPE_SUBTREE,
            "(cn=*)",
            Vec::<String>::new(),
            false,
        )
        .unwrap();
    assert_eq!(message.len().unwrap(), 2);

    let mut dns = Vec::new();
    for entry in message.entries().unwrap() {
        let entry = entry.unwrap();
        dns.push(entry.dn().unwrap());
        let mut names = Vec::new();
        for attribute in entry.attributes().unwrap() {
            let attribute = attribute.unwrap();
            let values: Vec<String> = attribute.values().unwrap().collect();
            assert!(!values.is_empty());
            names.push(attribute.name().to_owned());
        }
        assert_eq!(names, ["cn", "sn", "mail"]);
    }
    assert_eq!(
        dns,
        [
            "cn=alice,ou=people,dc=example,dc=com",
            "cn=bob,ou=people,dc=example,dc=com"
        ]
    );

    drop(message);
    drop(ldap);
    let releases = mock.releases();
    assert_eq!(releases.msgfree, 1);
    assert_eq!(releases.ber_free, 2);
    assert_eq!(releases.value_free, 6);
    assert_eq!(releases.unbind, 1);
    assert_eq!(mock.live_allocations(), 0);
    assert_eq!(mock.invalid_releases(), 0);
}

#[test]
fn abandoned_walks_still_release() {
    let mock = shared_mock();
    let ldap = connect(&mock);
    mock.push_search_result(people());
    let message = ldap
        .search_s("dc=example,dc=com", LDAP_SCOPE_SUBTREE, "(cn=*)", ["mail"], false)
        .unwrap();

    {
        let entry = message.entries().unwrap().next().unwrap().unwrap();
        let mut attributes = entry.attributes().unwrap();
        let first = attributes.next().unwrap().unwrap();
        let mut values = first.values().unwrap();
        assert!(values.next().is_some());
    }

    drop(message);
    assert_eq!(mock.live_allocations(), 0);
    assert_eq!(mock.invalid_releases(), 0);
    assert_eq!(mock.releases().ber_free, 1);
    assert_eq!(mock.releases().value_free, 1);
}

#[test]
fn parse_binary_honours_declared_lengths() {
    let mock = shared_mock();
    let ldap = connect(&mock);
    mock.push_search_result(MockMessage::new([truncated_binary_entry()]));
    let message = ldap
        .search_s("cn=binary", LDAP_SCOPE_BASE, "(objectClass=*)", ["attr"], false)
        .unwrap();

    let parsed = parse_binary_message(&message).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0]["attr"], [b"v1".to_vec(), b"val2".to_vec()]);
    drop(message);
    assert_eq!(mock.releases().value_free_len, 1);
    assert_eq!(mock.live_allocations(), 0);
}

#[test]
fn missing_attribute_is_an_error() {
    let mock = shared_mock();
    let ldap = connect(&mock);
    mock.push_search_result(MockMessage::new([person("alice")]));
    let message = ldap
        .search_s("dc=example,dc=com", LDAP_SCOPE_SUBTREE, "(cn=alice)", ["cn"], false)
        .unwrap();

    let entry = message.entries().unwrap().next().unwrap().unwrap();
    let err = entry.attribute("telephoneNumber").values().unwrap_err();
    assert_eq!(err.code(), Some(LDAP_NO_SUCH_ATTRIBUTE));
    let mail: Vec<String> = entry.attribute("mail").values().unwrap().collect();
    assert_eq!(mail, ["first@example.com", "second@example.com"]);
}

#[test]
fn modify_renders_every_operation_kind() {
    let mock = shared_mock();
    let ldap = connect(&mock);

    let mut changes = Changeset::new();
    changes
        .add("mail", ["third@example.com"])
        .delete("mail", ["first@example.com"])
        .delete_attribute("description")
        .replace_binary("jpegPhoto", [vec![1u8, 2, 3]]);
    ldap.modify_s("cn=alice,ou=people,dc=example,dc=com", &changes).unwrap();

    let Some(MockCall::Modify { sync: true, mods: Some(mods), .. }) = mock.last_call() else {
        panic!("expected a synchronous modify");
    };
    let ops: Vec<u32> = mods.iter().map(|m| m.op).collect();
    assert_eq!(
        ops,
        [LDAP_MOD_ADD, LDAP_MOD_DELETE, LDAP_MOD_DELETE, LDAP_MOD_REPLACE]
    );
    let binary: Vec<bool> = mods.iter().map(|m| m.binary).collect();
    assert_eq!(binary, [false, false, false, true]);
    assert_eq!(mods[2].attribute, "description");
    assert_eq!(mods[2].values, Some(RecordedValues::Text(vec![])));
}

#[test]
fn conflicting_value_kinds_never_reach_native_layer() {
    let mock = shared_mock();
    let ldap = connect(&mock);
    let err = Modification::from_parts(
        ModOp::Add,
        "cn",
        Some(vec!["x".into()]),
        Some(vec![b"x".to_vec()]),
    )
    .unwrap_err();
    assert!(matches!(err, LdapError::InvalidArgument { .. }));

    let before = mock.calls().len();
    let mut changes = Changeset::new();
    let replace = Modification::from_parts(ModOp::Replace, "cn", Some(vec!["y".into()]), None);
    changes.push(replace.unwrap());
    ldap.modify_s("cn=x", &changes).unwrap();
    assert_eq!(mock.calls().len(), before + 1);
}

#[test]
fn async_add_rejection_surfaces_through_future() {
    let mock = shared_mock();
    let ldap = connect(&mock);
    let mut future = ldap
        .add_attributes("cn=dup,dc=example,dc=com", [("cn", ["dup"])])
        .unwrap();
    mock.queue_result(
        future.msgid(),
        MockResult::Message(MockMessage::empty().with_result_code(LDAP_ALREADY_EXISTS)),
    );

    assert!(future.done());
    let err = future.result(Some(Duration::from_secs(5))).unwrap_err();
    assert_eq!(err.code(), Some(LDAP_ALREADY_EXISTS));
    assert_eq!(future.exception(None).unwrap(), Some(err));
    assert_eq!(mock.result_calls(), 1);
    assert_eq!(mock.releases().msgfree, 1);
    assert_eq!(mock.live_allocations(), 0);
}

#[test]
fn sync_result_leaves_status_to_the_caller() {
    let mock = shared_mock();
    let ldap = connect(&mock);
    let future = ldap.delete("cn=gone,dc=example,dc=com").unwrap();
    mock.queue_result(
        future.msgid(),
        MockResult::Message(MockMessage::empty().with_result_code(LDAP_NO_SUCH_OBJECT)),
    );

    let message = ldap
        .result(future.msgid(), LDAP_MSG_ALL, None)
        .unwrap()
        .unwrap();
    assert_eq!(message.result_code(), LDAP_NO_SUCH_OBJECT);
    assert_eq!(message.check().unwrap_err().code(), Some(LDAP_NO_SUCH_OBJECT));
}

#[test]
fn async_compare_and_delete_are_independent() {
    let mock = shared_mock();
    let ldap = connect(&mock);
    let mut compare = ldap.compare("cn=alice", "cn", "alice").unwrap();
    let mut delete = ldap.delete("cn=bob").unwrap();

    mock.queue_result(delete.msgid(), MockResult::Failure(LDAP_UNWILLING_TO_PERFORM));
    assert!(!compare.done());
    assert!(delete.done());
    assert_eq!(
        delete.exception(None).unwrap().and_then(|e| e.code()),
        Some(LDAP_UNWILLING_TO_PERFORM)
    );

    assert!(compare.cancel());
    assert!(compare.result(Some(Duration::ZERO)).unwrap_err().is_timeout());
}

#[test]
fn connection_outlives_handle_until_last_message() {
    let mock = shared_mock();
    let ldap = connect(&mock);
    let mut future = ldap.delete("cn=x").unwrap();
    drop(ldap);
    assert!(mock.is_connected());

    mock.queue_result(future.msgid(), MockResult::Message(MockMessage::empty()));
    let message = future.result(None).unwrap();
    drop(future);
    assert!(mock.is_connected());
    drop(message);
    assert!(!mock.is_connected());
    assert_eq!(mock.releases().unbind, 1);
}
