//! Result set walking.
//!
//! A [`Message`] owns a result handle. Entries, attributes and values are
//! borrowed views into it; the borrow checker keeps every view from
//! outliving the handle. Native cursors and value arrays obtained along the
//! way are released exactly once, whether iteration finishes or not.
//!
//! Entry and attribute iteration follow the library's first/next protocol
//! with a priming read: the first item is fetched when the iterator is
//! created, and each `next()` returns the item fetched previously before
//! fetching the following one.

use crate::check;
use crate::codec::{bytes_from_native_buffer, from_wide_ptr, WideString};
use crate::connection::Session;
use crate::error::{LdapError, LdapResult};
use std::collections::HashMap;
use std::fmt;
use std::ptr::{self, NonNull};
use std::rc::Rc;
use tracing::{trace, warn};
use wldap_sys::{BerElement, LdapBerval, LdapMessage, WChar, LDAP_SUCCESS};

/// Attribute values of one entry, as text.
pub type TextEntry = HashMap<String, Vec<String>>;

/// Attribute values of one entry, as bytes.
pub type BinaryEntry = HashMap<String, Vec<Vec<u8>>>;

/// A result handle returned by a search or by polling an operation.
///
/// Dropping the message releases the handle.
pub struct Message {
    session: Rc<Session>,
    raw: NonNull<LdapMessage>,
}

impl Message {
    pub(crate) fn new(session: Rc<Session>, raw: NonNull<LdapMessage>) -> Self {
        Self { session, raw }
    }

    /// Raw result handle, valid while the message lives.
    pub fn as_ptr(&self) -> *mut LdapMessage {
        self.raw.as_ptr()
    }

    /// Number of entries (`ldap_count_entries`).
    pub fn len(&self) -> LdapResult<usize> {
        let api = self.session.api();
        // Safety: both handles are live.
        let count = unsafe { api.count_entries(self.session.handle(), self.as_ptr()) };
        check::sentinel(api, count).map(|n| n as usize)
    }

    /// Iterates over entries.
    ///
    /// Fetches the first entry immediately. Every call starts a fresh walk.
    pub fn entries(&self) -> LdapResult<Entries<'_>> {
        let api = self.session.api();
        // Safety: both handles are live.
        let first = unsafe { api.first_entry(self.session.handle(), self.as_ptr()) };
        let cursor = match check::pointer(api, first)? {
            Some(entry) => Cursor::Primed(entry),
            None => Cursor::Exhausted,
        };
        Ok(Entries {
            message: self,
            cursor,
        })
    }

    /// Result code of the operation this message answers
    /// (`ldap_result2error`, without freeing).
    pub fn result_code(&self) -> u32 {
        // Safety: both handles are live; free_it is zero.
        unsafe {
            self.session
                .api()
                .result2error(self.session.handle(), self.as_ptr(), 0)
        }
    }

    /// Fails with the operation's result code unless it is `LDAP_SUCCESS`.
    pub fn check(&self) -> LdapResult<()> {
        check::retcode(self.session.api(), self.result_code())
    }

    /// Collects every entry, with text values.
    pub fn parse(&self) -> LdapResult<Vec<TextEntry>> {
        parse_message(self)
    }

    /// Collects every entry, with binary values.
    pub fn parse_binary(&self) -> LdapResult<Vec<BinaryEntry>> {
        parse_binary_message(self)
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        // Safety: the handle is owned by this message and released once.
        let rc = unsafe { self.session.api().msgfree(self.as_ptr()) };
        trace!(message = ?self.raw, "released result");
        if rc != LDAP_SUCCESS {
            warn!(code = rc, "ldap_msgfree failed");
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message").field("raw", &self.raw).finish()
    }
}

enum Cursor<T> {
    Primed(T),
    Failed(LdapError),
    Exhausted,
}

impl<T> Cursor<T> {
    fn from_fetch(fetched: LdapResult<Option<T>>) -> Self {
        match fetched {
            Ok(Some(item)) => Self::Primed(item),
            Ok(None) => Self::Exhausted,
            Err(err) => Self::Failed(err),
        }
    }

    // Hands out the primed item, leaving the cursor exhausted until the
    // caller primes it again.
    fn take(&mut self) -> Option<LdapResult<T>> {
        match std::mem::replace(self, Self::Exhausted) {
            Self::Primed(item) => Some(Ok(item)),
            Self::Failed(err) => Some(Err(err)),
            Self::Exhausted => None,
        }
    }
}

/// Entries of a [`Message`], in first/next order.
///
/// A failure while fetching ahead is reported by the `next()` after the one
/// that returned the last good entry; iteration ends after it.
pub struct Entries<'m> {
    message: &'m Message,
    cursor: Cursor<NonNull<LdapMessage>>,
}

impl<'m> Iterator for Entries<'m> {
    type Item = LdapResult<Entry<'m>>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = match self.cursor.take()? {
            Ok(entry) => entry,
            Err(err) => return Some(Err(err)),
        };
        let message = self.message;
        let session = &message.session;
        let api = session.api();
        // Safety: the entry belongs to the live result handle.
        let next = unsafe { api.next_entry(session.handle(), current.as_ptr()) };
        self.cursor = Cursor::from_fetch(check::pointer(api, next));
        Some(Ok(Entry {
            message,
            raw: current,
        }))
    }
}

impl fmt::Debug for Entries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entries")
            .field("exhausted", &matches!(self.cursor, Cursor::Exhausted))
            .finish()
    }
}

/// One entry of a [`Message`].
///
/// Entry cursors are owned by the result handle and never released on their
/// own.
#[derive(Clone, Copy)]
pub struct Entry<'m> {
    message: &'m Message,
    raw: NonNull<LdapMessage>,
}

impl<'m> Entry<'m> {
    /// Raw entry handle.
    pub fn as_ptr(&self) -> *mut LdapMessage {
        self.raw.as_ptr()
    }

    /// Distinguished name (`ldap_get_dnW`).
    pub fn dn(&self) -> LdapResult<String> {
        let session = &self.message.session;
        let api = session.api();
        // Safety: the entry belongs to the live result handle.
        let raw = unsafe { api.get_dn(session.handle(), self.as_ptr()) };
        let raw = check::pointer(api, raw)?.ok_or_else(|| check::last_error(api))?;
        Ok(session.take_string(raw))
    }

    /// The attribute named `name`. No native call is made until its values
    /// are requested.
    pub fn attribute(&self, name: &str) -> Attribute<'m> {
        Attribute {
            message: self.message,
            entry: self.raw,
            name: name.to_string(),
        }
    }

    /// Iterates over the entry's attributes.
    ///
    /// Fetches the first attribute name immediately.
    pub fn attributes(&self) -> LdapResult<Attributes<'m>> {
        let session = &self.message.session;
        let api = session.api();
        let mut ber: *mut BerElement = ptr::null_mut();
        // Safety: the entry belongs to the live result handle; ber receives
        // a cursor owned by the returned iterator.
        let first = unsafe { api.first_attribute(session.handle(), self.as_ptr(), &mut ber) };
        let mut attributes = Attributes {
            message: self.message,
            entry: self.raw,
            ber: NonNull::new(ber),
            cursor: Cursor::Exhausted,
        };
        // On failure the iterator is dropped here and releases the cursor.
        let first = check::pointer(api, first)?.map(|name| session.take_string(name));
        attributes.prime(first);
        Ok(attributes)
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry").field("raw", &self.raw).finish()
    }
}

/// Attributes of an [`Entry`], in the order the library reports them.
///
/// Owns the attribute cursor, released once the sequence is exhausted or the
/// iterator is dropped.
pub struct Attributes<'m> {
    message: &'m Message,
    entry: NonNull<LdapMessage>,
    ber: Option<NonNull<BerElement>>,
    cursor: Cursor<String>,
}

impl<'m> Attributes<'m> {
    fn prime(&mut self, name: Option<String>) {
        match name {
            Some(name) => self.cursor = Cursor::Primed(name),
            None => {
                self.cursor = Cursor::Exhausted;
                self.release();
            }
        }
    }

    fn fetch_next(&mut self) {
        let Some(ber) = self.ber else {
            self.cursor = Cursor::Exhausted;
            return;
        };
        let message = self.message;
        let session = &message.session;
        let api = session.api();
        // Safety: entry and cursor are live.
        let next =
            unsafe { api.next_attribute(session.handle(), self.entry.as_ptr(), ber.as_ptr()) };
        match check::pointer(api, next) {
            Ok(name) => {
                let name = name.map(|n| session.take_string(n));
                self.prime(name);
            }
            Err(err) => {
                self.cursor = Cursor::Failed(err);
                self.release();
            }
        }
    }

    fn release(&mut self) {
        if let Some(ber) = self.ber.take() {
            // Safety: the cursor is owned here; fbuf must be zero.
            unsafe { self.message.session.api().ber_free(ber.as_ptr(), 0) };
            trace!(ber = ?ber, "released attribute cursor");
        }
    }
}

impl<'m> Iterator for Attributes<'m> {
    type Item = LdapResult<Attribute<'m>>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = match self.cursor.take()? {
            Ok(name) => name,
            Err(err) => return Some(Err(err)),
        };
        self.fetch_next();
        Some(Ok(Attribute {
            message: self.message,
            entry: self.entry,
            name,
        }))
    }
}

impl Drop for Attributes<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Attributes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attributes")
            .field("entry", &self.entry)
            .field("ber", &self.ber)
            .finish()
    }
}

/// A named attribute of an [`Entry`].
#[derive(Clone)]
pub struct Attribute<'m> {
    message: &'m Message,
    entry: NonNull<LdapMessage>,
    name: String,
}

impl<'m> Attribute<'m> {
    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text values (`ldap_get_valuesW`).
    ///
    /// An attribute the library reports no values for yields an empty
    /// sequence.
    pub fn values(&self) -> LdapResult<Values<'m>> {
        let session = &self.message.session;
        let api = session.api();
        let name = WideString::new(&self.name)?;
        // Safety: the entry is live, the name nul-terminated.
        let array = unsafe { api.get_values(session.handle(), self.entry.as_ptr(), name.as_ptr()) };
        Ok(Values {
            message: self.message,
            array: check::pointer(api, array)?,
            index: 0,
        })
    }

    /// Binary values (`ldap_get_values_lenW`), copied out of the library's
    /// buffers according to their declared lengths.
    pub fn binary_values(&self) -> LdapResult<BinaryValues<'m>> {
        let session = &self.message.session;
        let api = session.api();
        let name = WideString::new(&self.name)?;
        // Safety: the entry is live, the name nul-terminated.
        let array =
            unsafe { api.get_values_len(session.handle(), self.entry.as_ptr(), name.as_ptr()) };
        Ok(BinaryValues {
            message: self.message,
            array: check::pointer(api, array)?,
            index: 0,
        })
    }
}

impl fmt::Debug for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute").field("name", &self.name).finish()
    }
}

/// Text values of an [`Attribute`].
///
/// The native array is released on exhaustion, or on drop.
pub struct Values<'m> {
    message: &'m Message,
    array: Option<NonNull<*mut WChar>>,
    index: usize,
}

impl Values<'_> {
    fn release(&mut self) {
        if let Some(array) = self.array.take() {
            // Safety: the array came from ldap_get_valuesW and is released once.
            let rc = unsafe { self.message.session.api().value_free(array.as_ptr()) };
            trace!(values = self.index, "released text values");
            if rc != LDAP_SUCCESS {
                warn!(code = rc, "ldap_value_free failed");
            }
        }
    }
}

impl Iterator for Values<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let array = self.array?;
        // Safety: the array is nul-terminated and still owned here.
        let item = unsafe { *array.as_ptr().add(self.index) };
        // Safety: non-null items are nul-terminated strings.
        match unsafe { from_wide_ptr(item) } {
            Some(value) => {
                self.index += 1;
                Some(value)
            }
            None => {
                self.release();
                None
            }
        }
    }
}

impl Drop for Values<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Values<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Values")
            .field("array", &self.array)
            .field("index", &self.index)
            .finish()
    }
}

/// Binary values of an [`Attribute`].
///
/// The native array is released on exhaustion, or on drop.
pub struct BinaryValues<'m> {
    message: &'m Message,
    array: Option<NonNull<*mut LdapBerval>>,
    index: usize,
}

impl BinaryValues<'_> {
    fn release(&mut self) {
        if let Some(array) = self.array.take() {
            // Safety: the array came from ldap_get_values_lenW and is
            // released once.
            let rc = unsafe { self.message.session.api().value_free_len(array.as_ptr()) };
            trace!(values = self.index, "released binary values");
            if rc != LDAP_SUCCESS {
                warn!(code = rc, "ldap_value_free_len failed");
            }
        }
    }
}

impl Iterator for BinaryValues<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        let array = self.array?;
        // Safety: the array is nul-terminated and still owned here.
        let item = unsafe { *array.as_ptr().add(self.index) };
        // Safety: non-null items point to bervals valid until release; the
        // bytes are copied out before that.
        match unsafe { item.as_ref() } {
            Some(berval) => {
                self.index += 1;
                Some(unsafe { bytes_from_native_buffer(berval.bv_val, berval.bv_len as usize) })
            }
            None => {
                self.release();
                None
            }
        }
    }
}

impl Drop for BinaryValues<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for BinaryValues<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryValues")
            .field("array", &self.array)
            .field("index", &self.index)
            .finish()
    }
}

fn collect_entries<V, F>(message: &Message, mut values: F) -> LdapResult<Vec<HashMap<String, V>>>
where
    F: FnMut(&Attribute<'_>) -> LdapResult<V>,
{
    let mut out = Vec::new();
    for entry in message.entries()? {
        let entry = entry?;
        let mut map = HashMap::new();
        for attribute in entry.attributes()? {
            let attribute = attribute?;
            let collected = values(&attribute)?;
            map.insert(attribute.name, collected);
        }
        out.push(map);
    }
    Ok(out)
}

/// One mapping per entry, attribute name to text values.
///
/// An entry without attributes yields an empty mapping.
pub fn parse_message(message: &Message) -> LdapResult<Vec<TextEntry>> {
    collect_entries(message, |a| Ok(a.values()?.collect()))
}

/// One mapping per entry, attribute name to binary values.
pub fn parse_binary_message(message: &Message) -> LdapResult<Vec<BinaryEntry>> {
    collect_entries(message, |a| Ok(a.binary_values()?.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Ldap;
    use std::rc::Rc;
    use wldap_sys::{Wldap32Api, LDAP_PARAM_ERROR, LDAP_PORT, LDAP_SERVER_DOWN};
    use wldap_testkit::prelude::*;

    fn setup(message: MockMessage) -> (Rc<MockWldap32>, Ldap, Message) {
        let mock = shared_mock();
        let ldap = Ldap::init(mock.clone(), None, LDAP_PORT).unwrap();
        let raw = mock.create_message(message);
        let message = unsafe { ldap.message_from_raw(raw) }.unwrap();
        (mock, ldap, message)
    }

    #[test]
    fn three_entries_then_exhausted() {
        let (mock, _ldap, message) = setup(three_entries());
        assert_eq!(message.len().unwrap(), 3);

        let mut entries = message.entries().unwrap();
        let dns: Vec<String> = entries
            .by_ref()
            .take(3)
            .map(|e| e.unwrap().dn().unwrap())
            .collect();
        assert_eq!(dns, ["cn=1", "cn=2", "cn=3"]);
        assert!(entries.next().is_none());
        assert!(entries.next().is_none());

        drop(entries);
        drop(message);
        assert_eq!(mock.releases().msgfree, 1);
        assert_eq!(mock.invalid_releases(), 0);
    }

    #[test]
    fn empty_message_is_immediately_exhausted() {
        let (mock, _ldap, message) = setup(MockMessage::empty());
        assert_eq!(message.len().unwrap(), 0);
        assert!(message.entries().unwrap().next().is_none());
        drop(message);
        assert_eq!(mock.live_allocations(), 0);
    }

    #[test]
    fn message_released_once_without_iteration() {
        let (mock, _ldap, message) = setup(people());
        drop(message);
        assert_eq!(mock.releases().msgfree, 1);
        assert_eq!(mock.live_allocations(), 0);
    }

    #[test]
    fn priming_reads_one_ahead() {
        let (mock, _ldap, message) = setup(three_entries());
        let mut entries = message.entries().unwrap();
        let first = entries.next().unwrap().unwrap();
        // The iterator already holds the second entry, so the first it
        // returned must still be the first native entry.
        assert_eq!(first.dn().unwrap(), "cn=1");
        assert_eq!(entries.next().unwrap().unwrap().dn().unwrap(), "cn=2");
        drop(entries);
        drop(message);
        assert_eq!(mock.releases().memfree, 2);
    }

    #[test]
    fn attributes_release_cursor_on_exhaustion() {
        let (mock, _ldap, message) = setup(MockMessage::new([person("alice")]));
        let entry = message.entries().unwrap().next().unwrap().unwrap();
        let names: Vec<String> = entry
            .attributes()
            .unwrap()
            .map(|a| a.unwrap().name().to_string())
            .collect();
        assert_eq!(names, ["cn", "sn", "mail"]);
        assert_eq!(mock.releases().ber_free, 1);
        assert_eq!(mock.releases().memfree, 3);
    }

    #[test]
    fn attributes_release_cursor_when_abandoned() {
        let (mock, _ldap, message) = setup(MockMessage::new([person("alice")]));
        let entry = message.entries().unwrap().next().unwrap().unwrap();
        let mut attributes = entry.attributes().unwrap();
        assert_eq!(attributes.next().unwrap().unwrap().name(), "cn");
        assert_eq!(mock.releases().ber_free, 0);
        drop(attributes);
        assert_eq!(mock.releases().ber_free, 1);
        assert_eq!(mock.invalid_releases(), 0);
    }

    #[test]
    fn entry_without_attributes() {
        let (mock, _ldap, message) = setup(MockMessage::new([MockEntry::new("cn=empty")]));
        let entry = message.entries().unwrap().next().unwrap().unwrap();
        assert!(entry.attributes().unwrap().next().is_none());
        assert_eq!(mock.releases().ber_free, 1);
        assert_eq!(message.parse().unwrap(), vec![TextEntry::new()]);
    }

    #[test]
    fn values_release_array_once() {
        let (mock, _ldap, message) = setup(MockMessage::new([person("alice")]));
        let entry = message.entries().unwrap().next().unwrap().unwrap();
        let mail: Vec<String> = entry.attribute("mail").values().unwrap().collect();
        assert_eq!(mail, ["first@example.com", "second@example.com"]);
        assert_eq!(mock.releases().value_free, 1);

        let mut values = entry.attribute("cn").values().unwrap();
        assert_eq!(values.next().as_deref(), Some("alice"));
        drop(values);
        assert_eq!(mock.releases().value_free, 2);
        assert_eq!(mock.invalid_releases(), 0);
    }

    #[test]
    fn binary_values_honour_declared_length() {
        let (mock, _ldap, message) = setup(MockMessage::new([truncated_binary_entry()]));
        let entry = message.entries().unwrap().next().unwrap().unwrap();
        let values: Vec<Vec<u8>> = entry.attribute("attr").binary_values().unwrap().collect();
        assert_eq!(values, vec![b"v1".to_vec(), b"val2".to_vec()]);
        assert_eq!(mock.releases().value_free_len, 1);
    }

    #[test]
    fn missing_attribute_is_an_error() {
        let (_mock, _ldap, message) = setup(MockMessage::new([person("alice")]));
        let entry = message.entries().unwrap().next().unwrap().unwrap();
        let err = entry.attribute("missing").values().unwrap_err();
        assert_eq!(err.code(), Some(wldap_sys::LDAP_NO_SUCH_ATTRIBUTE));
    }

    #[test]
    fn parse_collects_every_entry() {
        let (mock, _ldap, message) = setup(people());
        let parsed = parse_message(&message).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["cn"], ["alice"]);
        assert_eq!(parsed[1]["cn"], ["bob"]);
        assert_eq!(parsed[1]["mail"].len(), 2);

        let binary = parse_binary_message(&message).unwrap();
        assert_eq!(binary[0]["sn"], vec![b"Example".to_vec()]);

        drop(message);
        assert_eq!(mock.live_allocations(), 0);
        assert_eq!(mock.invalid_releases(), 0);
    }

    #[test]
    fn result_code_reads_without_freeing() {
        let (mock, _ldap, message) =
            setup(MockMessage::empty().with_result_code(wldap_sys::LDAP_ALREADY_EXISTS));
        assert_eq!(message.result_code(), wldap_sys::LDAP_ALREADY_EXISTS);
        let err = message.check().unwrap_err();
        assert_eq!(err.code(), Some(wldap_sys::LDAP_ALREADY_EXISTS));
        assert_eq!(mock.releases().msgfree, 0);
    }

    #[test]
    fn len_of_released_handle_fails() {
        let (mock, _ldap, message) = setup(MockMessage::empty());
        unsafe {
            mock.msgfree(message.as_ptr());
        }
        let err = message.len().unwrap_err();
        assert_eq!(err.code(), Some(LDAP_PARAM_ERROR));
        // The handle is gone, so the drop below is reported as invalid.
        drop(message);
        assert_eq!(mock.invalid_releases(), 1);
    }

    #[test]
    fn entry_fetch_failure_follows_last_good_entry() {
        let (mock, _ldap, message) = setup(three_entries());
        let mut entries = message.entries().unwrap();
        mock.fail_next_entry(LDAP_SERVER_DOWN);

        assert_eq!(entries.next().unwrap().unwrap().dn().unwrap(), "cn=1");
        let err = entries.next().unwrap().unwrap_err();
        assert_eq!(err.code(), Some(LDAP_SERVER_DOWN));
        assert!(entries.next().is_none());
        assert!(entries.next().is_none());

        drop(entries);
        drop(message);
        assert_eq!(mock.releases().msgfree, 1);
        assert_eq!(mock.live_allocations(), 0);
    }

    #[test]
    fn attribute_fetch_failure_releases_cursor_once() {
        let (mock, _ldap, message) = setup(MockMessage::new([person("alice")]));
        let entry = message.entries().unwrap().next().unwrap().unwrap();
        let mut attributes = entry.attributes().unwrap();
        mock.fail_next_attribute(LDAP_SERVER_DOWN);

        assert_eq!(attributes.next().unwrap().unwrap().name(), "cn");
        assert_eq!(mock.releases().ber_free, 1);
        let err = attributes.next().unwrap().unwrap_err();
        assert_eq!(err.code(), Some(LDAP_SERVER_DOWN));
        assert!(attributes.next().is_none());

        drop(attributes);
        assert_eq!(mock.releases().ber_free, 1);
        assert_eq!(mock.invalid_releases(), 0);
        drop(message);
        assert_eq!(mock.live_allocations(), 0);
    }

    #[test]
    fn parse_stops_at_walk_failure() {
        let (mock, _ldap, message) = setup(people());
        mock.fail_next_attribute(LDAP_SERVER_DOWN);
        let err = message.parse().unwrap_err();
        assert_eq!(err.code(), Some(LDAP_SERVER_DOWN));
        drop(message);
        assert_eq!(mock.live_allocations(), 0);
        assert_eq!(mock.invalid_releases(), 0);
    }

    proptest::proptest! {
        #[test]
        fn walk_matches_script(script in mock_message_strategy(6)) {
            let (mock, _ldap, message) = setup(script.clone());
            proptest::prop_assert_eq!(message.len().unwrap(), script.entries.len());

            let mut seen = 0;
            for (entry, expected) in message.entries().unwrap().zip(&script.entries) {
                let entry = entry.unwrap();
                proptest::prop_assert_eq!(entry.dn().unwrap(), expected.dn.clone());
                let names: Vec<String> = entry
                    .attributes()
                    .unwrap()
                    .map(|a| a.unwrap().name().to_string())
                    .collect();
                let expected_names: Vec<String> =
                    expected.attributes.iter().map(|a| a.name.clone()).collect();
                proptest::prop_assert_eq!(names, expected_names);
                seen += 1;
            }
            proptest::prop_assert_eq!(seen, script.entries.len());

            let binary = message.parse_binary().unwrap();
            proptest::prop_assert_eq!(binary.len(), script.entries.len());
            for (parsed, expected) in binary.iter().zip(&script.entries) {
                for attribute in &expected.attributes {
                    proptest::prop_assert!(parsed.contains_key(&attribute.name));
                    let homonyms = expected
                        .attributes
                        .iter()
                        .filter(|a| a.name.eq_ignore_ascii_case(&attribute.name))
                        .count();
                    if homonyms == 1 {
                        let visible: Vec<Vec<u8>> =
                            attribute.values.iter().map(|v| v.visible().to_vec()).collect();
                        proptest::prop_assert_eq!(&parsed[&attribute.name], &visible);
                    }
                }
            }

            drop(message);
            let releases = mock.releases();
            proptest::prop_assert_eq!(releases.msgfree, 1);
            proptest::prop_assert_eq!(mock.live_allocations(), 0);
            proptest::prop_assert_eq!(mock.invalid_releases(), 0);
        }
    }
}
