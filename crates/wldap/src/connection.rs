//! The connection object.
//!
//! [`Ldap`] owns a connection handle and issues operations on it.
//! Synchronous operations classify the native return code on the spot.
//! Asynchronous ones only fail here if the library refuses to enqueue them;
//! anything later surfaces through the returned [`Future`].

use crate::changeset::Changeset;
use crate::check;
use crate::codec::{from_wide_ptr, opt_ptr, opt_wide, to_native_string_array, WideString};
use crate::config::LdapConfig;
use crate::error::{LdapError, LdapResult};
use crate::future::{Future, COMPARE_SUCCESS, OPERATION_SUCCESS};
use crate::message::Message;
use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use wldap_sys as sys;
use wldap_sys::{
    LdapMessage, LdapTimeval, Wldap32Api, WChar, LDAP_OPT_OFF, LDAP_OPT_ON, LDAP_SUCCESS,
};

/// Gateway plus connection handle, shared by everything that makes native
/// calls on the connection.
///
/// The handle is released when the last holder goes away, unless
/// [`Ldap::unbind`] released it first.
pub(crate) struct Session {
    api: Rc<dyn Wldap32Api>,
    handle: Option<NonNull<sys::Ldap>>,
}

impl Session {
    pub(crate) fn api(&self) -> &dyn Wldap32Api {
        &*self.api
    }

    pub(crate) fn handle(&self) -> *mut sys::Ldap {
        self.handle.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Copies a library-allocated string and releases it with
    /// `ldap_memfree`.
    pub(crate) fn take_string(&self, raw: NonNull<WChar>) -> String {
        // Safety: the library returned a nul-terminated string owned by the
        // caller, released exactly once here after copying.
        unsafe {
            let copied = from_wide_ptr(raw.as_ptr()).unwrap_or_default();
            self.api.memfree(raw.as_ptr());
            copied
        }
    }

    pub(crate) fn abandon(&self, msgid: u32) -> LdapResult<()> {
        // Safety: the handle is live.
        let rc = unsafe { self.api.abandon(self.handle(), msgid) };
        check::retcode(self.api(), rc)
    }

    fn close(mut self) -> LdapResult<()> {
        match self.handle.take() {
            Some(handle) => {
                // Safety: the handle is released exactly once.
                let rc = unsafe { self.api.unbind(handle.as_ptr()) };
                debug!(handle = ?handle, "connection unbound");
                check::retcode(self.api(), rc)
            }
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            // Safety: the handle is released exactly once.
            let rc = unsafe { self.api.unbind(handle.as_ptr()) };
            trace!(handle = ?handle, "released connection");
            if rc != LDAP_SUCCESS {
                warn!(code = rc, "ldap_unbind failed");
            }
        }
    }
}

/// Waits for the result of `msgid` (`ldap_result`).
///
/// `Ok(None)` means the timeout elapsed first.
pub(crate) fn fetch_result(
    session: &Rc<Session>,
    msgid: u32,
    all: u32,
    timeout: Option<Duration>,
) -> LdapResult<Option<Message>> {
    let api = session.api();
    let mut timeval = timeout.map(LdapTimeval::from_duration);
    let timeval_ptr = timeval
        .as_mut()
        .map_or(ptr::null_mut(), |tv| tv as *mut LdapTimeval);
    let mut res: *mut LdapMessage = ptr::null_mut();
    // Safety: the handle is live; timeval and res outlive the call.
    let kind = unsafe { api.result(session.handle(), msgid, all, timeval_ptr, &mut res) };
    match kind {
        0 => Ok(None),
        _ => {
            let kind = check::sentinel(api, kind)?;
            let raw = NonNull::new(res).ok_or_else(|| check::last_error(api))?;
            trace!(msgid, kind, "result received");
            Ok(Some(Message::new(Rc::clone(session), raw)))
        }
    }
}

/// A connection to a directory server.
///
/// ```no_run
/// use wldap::{Changeset, Ldap, LdapConfig};
/// use wldap_sys::LDAP_SCOPE_SUBTREE;
///
/// # fn main() -> wldap::LdapResult<()> {
/// let api = wldap::initialize()?;
/// let ldap = Ldap::open(api, &LdapConfig::new().host("dc01.example.com"))?;
/// ldap.simple_bind_s(Some("cn=admin,dc=example,dc=com"), Some("secret"))?;
///
/// let base = "dc=example,dc=com";
/// let message = ldap.search_s(base, LDAP_SCOPE_SUBTREE, "(cn=*)", ["mail"], false)?;
/// for entry in message.entries()? {
///     let entry = entry?;
///     println!("{}", entry.dn()?);
/// }
///
/// let mut changes = Changeset::new();
/// changes.replace("description", ["updated"]);
/// ldap.modify_s("cn=alice,dc=example,dc=com", &changes)?;
/// # Ok(())
/// # }
/// ```
pub struct Ldap {
    session: Rc<Session>,
}

impl Ldap {
    /// Allocates a connection handle (`ldap_initW`) without connecting.
    ///
    /// `host` is `None` for the default server.
    pub fn init(api: Rc<dyn Wldap32Api>, host: Option<&str>, port: u32) -> LdapResult<Self> {
        let host_w = opt_wide(host)?;
        // Safety: host is null or nul-terminated.
        let raw = unsafe { api.init(opt_ptr(&host_w), port) };
        let handle = check::pointer(&*api, raw)?.ok_or_else(|| check::last_error(&*api))?;
        debug!(host = host.unwrap_or("<default>"), port, "connection initialized");
        Ok(Self {
            session: Rc::new(Session {
                api,
                handle: Some(handle),
            }),
        })
    }

    /// Initializes, applies `config` and connects.
    pub fn open(api: Rc<dyn Wldap32Api>, config: &LdapConfig) -> LdapResult<Self> {
        let ldap = Self::init(api, config.host.as_deref(), config.port)?;
        if let Some(version) = config.protocol_version {
            ldap.set_option(sys::LDAP_OPT_PROTOCOL_VERSION, version)?;
        }
        if let Some(limit) = config.size_limit {
            ldap.set_option(sys::LDAP_OPT_SIZELIMIT, limit)?;
        }
        if let Some(limit) = config.time_limit {
            ldap.set_option(sys::LDAP_OPT_TIMELIMIT, limit)?;
        }
        if let Some(referrals) = config.referrals {
            ldap.set_flag_option(sys::LDAP_OPT_REFERRALS, referrals)?;
        }
        ldap.connect(config.connect_timeout)?;
        Ok(ldap)
    }

    /// Takes ownership of an existing connection handle.
    ///
    /// # Safety
    ///
    /// `handle` must be a live handle obtained from `api`, not owned by
    /// anything else.
    pub unsafe fn from_handle(api: Rc<dyn Wldap32Api>, handle: *mut sys::Ldap) -> LdapResult<Self> {
        let handle = NonNull::new(handle)
            .ok_or_else(|| LdapError::invalid_argument("null connection handle"))?;
        Ok(Self {
            session: Rc::new(Session {
                api,
                handle: Some(handle),
            }),
        })
    }

    /// Wraps a result handle obtained on this connection, taking ownership.
    ///
    /// # Safety
    ///
    /// `raw` must be null or a live result handle from this connection, not
    /// owned by anything else.
    pub unsafe fn message_from_raw(&self, raw: *mut LdapMessage) -> Option<Message> {
        NonNull::new(raw).map(|raw| Message::new(Rc::clone(&self.session), raw))
    }

    /// Raw connection handle.
    pub fn as_ptr(&self) -> *mut sys::Ldap {
        self.session.handle()
    }

    fn api(&self) -> &dyn Wldap32Api {
        self.session.api()
    }

    fn retcode(&self, rc: u32) -> LdapResult<()> {
        check::retcode(self.api(), rc)
    }

    fn issue(&self, operation: &'static str, msgid: u32) -> LdapResult<Future> {
        self.issue_accepting(operation, msgid, OPERATION_SUCCESS)
    }

    fn issue_accepting(
        &self,
        operation: &'static str,
        msgid: u32,
        accepted: &'static [u32],
    ) -> LdapResult<Future> {
        let msgid = check::sentinel(self.api(), msgid)?;
        debug!(operation, msgid, "operation issued");
        Ok(Future::new(Rc::clone(&self.session), msgid, accepted))
    }

    /// Requests abandonment of an outstanding operation (`ldap_abandon`).
    pub fn abandon(&self, msgid: u32) -> LdapResult<()> {
        self.session.abandon(msgid)
    }

    /// Asynchronous bind (`ldap_bindW`).
    pub fn bind(&self, dn: Option<&str>, cred: Option<&str>, method: u32) -> LdapResult<Future> {
        let (dn, cred) = (opt_wide(dn)?, opt_wide(cred)?);
        // Safety: strings are null or nul-terminated; the handle is live.
        let msgid = unsafe { self.api().bind(self.as_ptr(), opt_ptr(&dn), opt_ptr(&cred), method) };
        self.issue("bind", msgid)
    }

    /// Synchronous bind (`ldap_bind_sW`).
    pub fn bind_s(&self, dn: Option<&str>, cred: Option<&str>, method: u32) -> LdapResult<()> {
        let (dn, cred) = (opt_wide(dn)?, opt_wide(cred)?);
        // Safety: strings are null or nul-terminated; the handle is live.
        let rc = unsafe { self.api().bind_s(self.as_ptr(), opt_ptr(&dn), opt_ptr(&cred), method) };
        self.retcode(rc)
    }

    /// Asynchronous simple bind (`ldap_simple_bindW`).
    pub fn simple_bind(&self, dn: Option<&str>, passwd: Option<&str>) -> LdapResult<Future> {
        let (dn, passwd) = (opt_wide(dn)?, opt_wide(passwd)?);
        // Safety: strings are null or nul-terminated; the handle is live.
        let msgid =
            unsafe { self.api().simple_bind(self.as_ptr(), opt_ptr(&dn), opt_ptr(&passwd)) };
        self.issue("simple_bind", msgid)
    }

    /// Synchronous simple bind (`ldap_simple_bind_sW`).
    pub fn simple_bind_s(&self, dn: Option<&str>, passwd: Option<&str>) -> LdapResult<()> {
        let (dn, passwd) = (opt_wide(dn)?, opt_wide(passwd)?);
        // Safety: strings are null or nul-terminated; the handle is live.
        let rc =
            unsafe { self.api().simple_bind_s(self.as_ptr(), opt_ptr(&dn), opt_ptr(&passwd)) };
        self.retcode(rc)
    }

    /// Connects to the server (`ldap_connect`); `None` uses the library's
    /// default timeout.
    pub fn connect(&self, timeout: Option<Duration>) -> LdapResult<()> {
        let mut timeval = timeout.map(LdapTimeval::from_duration);
        let timeval_ptr = timeval
            .as_mut()
            .map_or(ptr::null_mut(), |tv| tv as *mut LdapTimeval);
        // Safety: the handle is live; timeval outlives the call.
        let rc = unsafe { self.api().connect(self.as_ptr(), timeval_ptr) };
        self.retcode(rc)?;
        debug!(?timeout, "connected");
        Ok(())
    }

    /// Validates a search filter locally (`ldap_check_filterW`).
    pub fn check_filter(&self, filter: &str) -> LdapResult<()> {
        let filter = WideString::new(filter)?;
        // Safety: the filter is nul-terminated; the handle is live.
        let rc = unsafe { self.api().check_filter(self.as_ptr(), filter.as_ptr()) };
        self.retcode(rc)
    }

    /// Sets a numeric option (`ldap_set_optionW`).
    pub fn set_option(&self, option: i32, value: u32) -> LdapResult<()> {
        // Safety: numeric options read a ULONG through the pointer.
        let rc = unsafe {
            self.api()
                .set_option(self.as_ptr(), option, &value as *const u32 as *const c_void)
        };
        self.retcode(rc)
    }

    /// Sets an on/off option, whose value is passed as the pointer itself.
    pub fn set_flag_option(&self, option: i32, on: bool) -> LdapResult<()> {
        let value = if on { LDAP_OPT_ON } else { LDAP_OPT_OFF };
        // Safety: flag options never dereference the pointer.
        let rc = unsafe { self.api().set_option(self.as_ptr(), option, value as *const c_void) };
        self.retcode(rc)
    }

    /// Reads a numeric option (`ldap_get_optionW`).
    pub fn get_option(&self, option: i32) -> LdapResult<u32> {
        let mut value: u32 = 0;
        // Safety: the library writes one ULONG for numeric options.
        let rc = unsafe {
            self.api()
                .get_option(self.as_ptr(), option, &mut value as *mut u32 as *mut c_void)
        };
        self.retcode(rc)?;
        Ok(value)
    }

    /// Synchronous search (`ldap_search_sW`).
    ///
    /// An empty `attrs` requests every attribute.
    pub fn search_s<I, S>(
        &self,
        base: &str,
        scope: u32,
        filter: &str,
        attrs: I,
        attrs_only: bool,
    ) -> LdapResult<Message>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = WideString::new(base)?;
        let filter = WideString::new(filter)?;
        let mut attrs = to_native_string_array(attrs)?;
        let mut res: *mut LdapMessage = ptr::null_mut();
        // Safety: strings and the attribute array are nul-terminated and
        // outlive the call; the handle is live.
        let rc = unsafe {
            self.api().search_s(
                self.as_ptr(),
                base.as_ptr(),
                scope,
                filter.as_ptr(),
                attrs.as_mut_ptr(),
                u32::from(attrs_only),
                &mut res,
            )
        };
        // A result handle may come back even on failure; wrap it so it is
        // released either way.
        // Safety: res is null or a fresh result handle owned by the caller.
        let message = unsafe { self.message_from_raw(res) };
        self.retcode(rc)?;
        message.ok_or_else(|| check::last_error(self.api()))
    }

    /// Asynchronous search (`ldap_searchW`).
    pub fn search<I, S>(
        &self,
        base: &str,
        scope: u32,
        filter: &str,
        attrs: I,
        attrs_only: bool,
    ) -> LdapResult<Future>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = WideString::new(base)?;
        let filter = WideString::new(filter)?;
        let mut attrs = to_native_string_array(attrs)?;
        // Safety: strings and the attribute array are nul-terminated and
        // outlive the call; the handle is live.
        let msgid = unsafe {
            self.api().search(
                self.as_ptr(),
                base.as_ptr(),
                scope,
                filter.as_ptr(),
                attrs.as_mut_ptr(),
                u32::from(attrs_only),
            )
        };
        self.issue("search", msgid)
    }

    /// Synchronous add (`ldap_add_sW`).
    pub fn add_s(&self, dn: &str, attributes: &Changeset) -> LdapResult<()> {
        let dn = WideString::new(dn)?;
        let mut mods = attributes.render()?;
        // Safety: the rendered array outlives the call; the handle is live.
        let rc = unsafe { self.api().add_s(self.as_ptr(), dn.as_ptr(), mods.as_mut_ptr()) };
        self.retcode(rc)
    }

    /// Asynchronous add (`ldap_addW`).
    pub fn add(&self, dn: &str, attributes: &Changeset) -> LdapResult<Future> {
        let dn = WideString::new(dn)?;
        let mut mods = attributes.render()?;
        // Safety: the library copies the request before returning.
        let msgid = unsafe { self.api().add(self.as_ptr(), dn.as_ptr(), mods.as_mut_ptr()) };
        self.issue("add", msgid)
    }

    /// Synchronous add from `(attribute, values)` pairs.
    pub fn add_attributes_s<'a, I, V>(&self, dn: &str, attributes: I) -> LdapResult<()>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        self.add_s(dn, &changeset_from_pairs(attributes))
    }

    /// Asynchronous add from `(attribute, values)` pairs.
    pub fn add_attributes<'a, I, V>(&self, dn: &str, attributes: I) -> LdapResult<Future>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        self.add(dn, &changeset_from_pairs(attributes))
    }

    /// Synchronous modify (`ldap_modify_sW`).
    pub fn modify_s(&self, dn: &str, changeset: &Changeset) -> LdapResult<()> {
        let dn = WideString::new(dn)?;
        let mut mods = changeset.render()?;
        // Safety: the rendered array outlives the call; the handle is live.
        let rc = unsafe { self.api().modify_s(self.as_ptr(), dn.as_ptr(), mods.as_mut_ptr()) };
        self.retcode(rc)
    }

    /// Asynchronous modify (`ldap_modifyW`).
    pub fn modify(&self, dn: &str, changeset: &Changeset) -> LdapResult<Future> {
        let dn = WideString::new(dn)?;
        let mut mods = changeset.render()?;
        // Safety: the library copies the request before returning.
        let msgid = unsafe { self.api().modify(self.as_ptr(), dn.as_ptr(), mods.as_mut_ptr()) };
        self.issue("modify", msgid)
    }

    /// Synchronous delete (`ldap_delete_sW`).
    pub fn delete_s(&self, dn: &str) -> LdapResult<()> {
        let dn = WideString::new(dn)?;
        // Safety: the DN is nul-terminated; the handle is live.
        let rc = unsafe { self.api().delete_s(self.as_ptr(), dn.as_ptr()) };
        self.retcode(rc)
    }

    /// Asynchronous delete (`ldap_deleteW`).
    pub fn delete(&self, dn: &str) -> LdapResult<Future> {
        let dn = WideString::new(dn)?;
        // Safety: the DN is nul-terminated; the handle is live.
        let msgid = unsafe { self.api().delete(self.as_ptr(), dn.as_ptr()) };
        self.issue("delete", msgid)
    }

    /// Synchronous compare (`ldap_compare_sW`): whether `attr` of `dn` holds
    /// `value`.
    pub fn compare_s(&self, dn: &str, attr: &str, value: &str) -> LdapResult<bool> {
        let (dn, attr, value) = (
            WideString::new(dn)?,
            WideString::new(attr)?,
            WideString::new(value)?,
        );
        // Safety: strings are nul-terminated; the handle is live.
        let rc = unsafe {
            self.api()
                .compare_s(self.as_ptr(), dn.as_ptr(), attr.as_ptr(), value.as_ptr())
        };
        check::compare(self.api(), rc)
    }

    /// Asynchronous compare (`ldap_compareW`).
    ///
    /// The future completes with `LDAP_COMPARE_TRUE` or `LDAP_COMPARE_FALSE`
    /// as the message's [`Message::result_code`]; any other code fails it.
    pub fn compare(&self, dn: &str, attr: &str, value: &str) -> LdapResult<Future> {
        let (dn, attr, value) = (
            WideString::new(dn)?,
            WideString::new(attr)?,
            WideString::new(value)?,
        );
        // Safety: strings are nul-terminated; the handle is live.
        let msgid = unsafe {
            self.api()
                .compare(self.as_ptr(), dn.as_ptr(), attr.as_ptr(), value.as_ptr())
        };
        self.issue_accepting("compare", msgid, COMPARE_SUCCESS)
    }

    /// Waits for a result of `msgid` (`ldap_result`).
    ///
    /// `all` is one of `LDAP_MSG_ONE`, `LDAP_MSG_ALL`, `LDAP_MSG_RECEIVED`.
    /// Returns `None` if `timeout` elapsed first; `None` as timeout blocks.
    pub fn result(
        &self,
        msgid: u32,
        all: u32,
        timeout: Option<Duration>,
    ) -> LdapResult<Option<Message>> {
        fetch_result(&self.session, msgid, all, timeout)
    }

    /// Releases the connection handle (`ldap_unbind`).
    ///
    /// If messages or futures still share the connection, the release is
    /// deferred until the last of them is dropped.
    pub fn unbind(self) -> LdapResult<()> {
        match Rc::try_unwrap(self.session) {
            Ok(session) => session.close(),
            Err(_) => {
                debug!("unbind deferred to last outstanding message or future");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Ldap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ldap")
            .field("handle", &self.session.handle)
            .field("shared", &Rc::strong_count(&self.session))
            .finish()
    }
}

fn changeset_from_pairs<'a, I, V>(attributes: I) -> Changeset
where
    I: IntoIterator<Item = (&'a str, V)>,
    V: IntoIterator,
    V::Item: Into<String>,
{
    let mut changeset = Changeset::new();
    for (attr, values) in attributes {
        changeset.add(attr, values);
    }
    changeset
}

#[cfg(test)]
mod tests {
    use super::*;
    use wldap_sys::{
        LDAP_AUTH_SIMPLE, LDAP_COMPARE_FALSE, LDAP_FILTER_ERROR, LDAP_INVALID_CREDENTIALS,
        LDAP_MOD_ADD, LDAP_MSG_ONE, LDAP_NO_SUCH_OBJECT, LDAP_OPT_PROTOCOL_VERSION, LDAP_PORT,
        LDAP_SCOPE_SUBTREE, LDAP_SERVER_DOWN,
    };
    use wldap_testkit::prelude::*;

    fn connect() -> (Rc<MockWldap32>, Ldap) {
        let mock = shared_mock();
        let ldap = Ldap::init(mock.clone(), Some("dc01.example.com"), LDAP_PORT).unwrap();
        (mock, ldap)
    }

    #[test]
    fn init_records_host_and_port() {
        let (mock, _ldap) = connect();
        assert_eq!(
            mock.calls()[0],
            MockCall::Init {
                host: Some("dc01.example.com".into()),
                port: LDAP_PORT
            }
        );
    }

    #[test]
    fn init_default_host_is_null() {
        let mock = shared_mock();
        let _ldap = Ldap::init(mock.clone(), None, 3268).unwrap();
        assert_eq!(mock.calls()[0], MockCall::Init { host: None, port: 3268 });
    }

    #[test]
    fn init_failure_uses_last_error() {
        let mock = shared_mock();
        mock.fail_next(LDAP_SERVER_DOWN);
        let err = Ldap::init(mock.clone(), None, LDAP_PORT).unwrap_err();
        assert_eq!(err.code(), Some(LDAP_SERVER_DOWN));
    }

    #[test]
    fn drop_unbinds_once() {
        let (mock, ldap) = connect();
        drop(ldap);
        assert_eq!(mock.releases().unbind, 1);
        assert!(!mock.is_connected());
        assert_eq!(mock.invalid_releases(), 0);
    }

    #[test]
    fn explicit_unbind_is_not_repeated_on_drop() {
        let (mock, ldap) = connect();
        ldap.unbind().unwrap();
        assert_eq!(mock.releases().unbind, 1);
        assert_eq!(mock.invalid_releases(), 0);
    }

    #[test]
    fn unbind_waits_for_outstanding_messages() {
        let (mock, ldap) = connect();
        let message = ldap
            .search_s("dc=example", LDAP_SCOPE_SUBTREE, "(cn=*)", ["cn"], false)
            .unwrap();
        ldap.unbind().unwrap();
        assert_eq!(mock.releases().unbind, 0);
        drop(message);
        assert_eq!(mock.releases().msgfree, 1);
        assert_eq!(mock.releases().unbind, 1);
    }

    #[test]
    fn bind_s_classifies_retcode() {
        let (mock, ldap) = connect();
        ldap.bind_s(Some("cn=admin"), Some("pw"), LDAP_AUTH_SIMPLE).unwrap();
        assert_eq!(
            mock.last_call(),
            Some(MockCall::Bind {
                sync: true,
                dn: Some("cn=admin".into()),
                cred: Some("pw".into()),
                method: LDAP_AUTH_SIMPLE,
            })
        );

        mock.fail_next(LDAP_INVALID_CREDENTIALS);
        let err = ldap.simple_bind_s(Some("cn=admin"), Some("bad")).unwrap_err();
        assert_eq!(err.code(), Some(LDAP_INVALID_CREDENTIALS));
    }

    #[test]
    fn async_bind_returns_future() {
        let (mock, ldap) = connect();
        let expected = mock.peek_msgid();
        let future = ldap.simple_bind(None, None).unwrap();
        assert_eq!(future.msgid(), expected);
        let bind = ldap.bind(Some("cn=admin"), None, LDAP_AUTH_SIMPLE).unwrap();
        assert_eq!(bind.msgid(), expected + 1);
    }

    #[test]
    fn async_enqueue_failure_raises() {
        let (mock, ldap) = connect();
        mock.fail_next(LDAP_SERVER_DOWN);
        let err = ldap.delete("cn=x").unwrap_err();
        assert_eq!(err.code(), Some(LDAP_SERVER_DOWN));
    }

    #[test]
    fn connect_passes_timeout() {
        let (mock, ldap) = connect();
        ldap.connect(None).unwrap();
        assert_eq!(mock.last_call(), Some(MockCall::Connect { timeout: None }));
        ldap.connect(Some(Duration::from_millis(2500))).unwrap();
        assert_eq!(
            mock.last_call(),
            Some(MockCall::Connect {
                timeout: Some(LdapTimeval {
                    tv_sec: 2,
                    tv_usec: 500_000
                })
            })
        );
    }

    #[test]
    fn check_filter_failure() {
        let (mock, ldap) = connect();
        ldap.check_filter("(cn=*)").unwrap();
        mock.fail_next(LDAP_FILTER_ERROR);
        let err = ldap.check_filter("(cn=").unwrap_err();
        assert_eq!(err.code(), Some(LDAP_FILTER_ERROR));
    }

    #[test]
    fn options_round_trip() {
        let (mock, ldap) = connect();
        ldap.set_option(LDAP_OPT_PROTOCOL_VERSION, 3).unwrap();
        ldap.set_flag_option(sys::LDAP_OPT_REFERRALS, false).unwrap();
        assert_eq!(mock.option(LDAP_OPT_PROTOCOL_VERSION), Some(3));
        assert_eq!(mock.option(sys::LDAP_OPT_REFERRALS), Some(LDAP_OPT_OFF));
        assert_eq!(ldap.get_option(LDAP_OPT_PROTOCOL_VERSION).unwrap(), 3);
    }

    #[test]
    fn search_s_with_empty_attribute_list() {
        let (mock, ldap) = connect();
        mock.push_search_result(people());
        let message = ldap
            .search_s(
                "dc=example,dc=com",
                LDAP_SCOPE_SUBTREE,
                "(objectClass=person)",
                Vec::<String>::new(),
                false,
            )
            .unwrap();
        assert_eq!(message.len().unwrap(), 2);
        assert_eq!(
            mock.last_call(),
            Some(MockCall::Search {
                sync: true,
                base: Some("dc=example,dc=com".into()),
                scope: LDAP_SCOPE_SUBTREE,
                filter: Some("(objectClass=person)".into()),
                attrs: Some(vec![]),
                attrs_only: 0,
            })
        );
    }

    #[test]
    fn search_s_failure() {
        let (mock, ldap) = connect();
        mock.fail_next(LDAP_NO_SUCH_OBJECT);
        let err = ldap
            .search_s("dc=missing", LDAP_SCOPE_SUBTREE, "(cn=*)", ["cn"], true)
            .unwrap_err();
        assert_eq!(err.code(), Some(LDAP_NO_SUCH_OBJECT));
        assert_eq!(mock.live_allocations(), 0);
    }

    #[test]
    fn async_search_completes_through_future() {
        let (mock, ldap) = connect();
        let mut future = ldap
            .search("dc=example,dc=com", LDAP_SCOPE_SUBTREE, "(cn=alice)", ["cn", "mail"], false)
            .unwrap();
        assert!(matches!(
            mock.last_call(),
            Some(MockCall::Search { sync: false, attrs: Some(ref a), .. }) if a == &["cn", "mail"]
        ));
        mock.queue_result(future.msgid(), MockResult::Message(MockMessage::new([person("alice")])));
        let parsed = future.result(None).unwrap().parse().unwrap();
        assert_eq!(parsed[0]["cn"], ["alice"]);
    }

    #[test]
    fn add_attributes_renders_pairs() {
        let (mock, ldap) = connect();
        ldap.add_attributes_s(
            "cn=carol,dc=example,dc=com",
            [("cn", vec!["carol"]), ("objectClass", vec!["top", "person"])],
        )
        .unwrap();
        let Some(MockCall::Add { sync: true, dn, mods: Some(mods) }) = mock.last_call() else {
            panic!("expected a synchronous add");
        };
        assert_eq!(dn.as_deref(), Some("cn=carol,dc=example,dc=com"));
        assert_eq!(mods.len(), 2);
        assert_eq!(mods[1].op, LDAP_MOD_ADD);
        assert_eq!(
            mods[1].values,
            Some(RecordedValues::Text(vec!["top".into(), "person".into()]))
        );
    }

    #[test]
    fn modify_with_empty_changeset_passes_null() {
        let (mock, ldap) = connect();
        ldap.modify_s("cn=x", &Changeset::new()).unwrap();
        assert_eq!(
            mock.last_call(),
            Some(MockCall::Modify {
                sync: true,
                dn: Some("cn=x".into()),
                mods: None
            })
        );
    }

    #[test]
    fn modify_async_binary() {
        let (mock, ldap) = connect();
        let mut changes = Changeset::new();
        changes.replace_binary("jpegPhoto", [vec![0xffu8, 0xd8, 0x00]]);
        let future = ldap.modify("cn=x", &changes).unwrap();
        let Some(MockCall::Modify { sync: false, mods: Some(mods), .. }) = mock.last_call() else {
            panic!("expected an asynchronous modify");
        };
        assert!(mods[0].binary);
        assert_eq!(
            mods[0].values,
            Some(RecordedValues::Binary(vec![vec![0xff, 0xd8, 0x00]]))
        );
        assert_eq!(future.msgid(), 1);
    }

    #[test]
    fn compare_s_maps_to_bool() {
        let (mock, ldap) = connect();
        assert!(ldap.compare_s("cn=x", "cn", "x").unwrap());
        mock.set_compare_result(LDAP_COMPARE_FALSE);
        assert!(!ldap.compare_s("cn=x", "cn", "y").unwrap());
        mock.set_compare_result(LDAP_NO_SUCH_OBJECT);
        let err = ldap.compare_s("cn=gone", "cn", "y").unwrap_err();
        assert_eq!(err.code(), Some(LDAP_NO_SUCH_OBJECT));
    }

    #[test]
    fn result_timeout_is_none() {
        let (mock, ldap) = connect();
        let future = ldap.compare("cn=x", "cn", "x").unwrap();
        assert!(ldap
            .result(future.msgid(), LDAP_MSG_ONE, Some(Duration::ZERO))
            .unwrap()
            .is_none());
        mock.queue_result(future.msgid(), MockResult::Failure(LDAP_SERVER_DOWN));
        let err = ldap.result(future.msgid(), LDAP_MSG_ONE, None).unwrap_err();
        assert_eq!(err.code(), Some(LDAP_SERVER_DOWN));
    }

    #[test]
    fn interior_nul_is_rejected_before_native_call() {
        let (mock, ldap) = connect();
        let calls = mock.calls().len();
        assert!(matches!(
            ldap.delete_s("cn=a\0b"),
            Err(LdapError::InvalidArgument { .. })
        ));
        assert_eq!(mock.calls().len(), calls);
    }
}
