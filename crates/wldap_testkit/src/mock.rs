//! An in-memory stand-in for `Wldap32.dll`.
//!
//! Handles are fake addresses that are never dereferenced. Strings and value
//! arrays are real allocations laid out like the library's, so the safe layer
//! reads them exactly as it would read native memory. Every release call is
//! counted and checked against the live allocations.

use crate::script::{MockEntry, MockMessage, MockResult};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::ffi::{c_char, c_void};
use std::fmt;
use std::ptr;
use wldap_sys::{
    BerElement, Ldap, LdapBerval, LdapMessage, LdapModW, LdapTimeval, Wldap32Api, WChar,
    LDAP_COMPARE_TRUE, LDAP_MOD_BVALUES, LDAP_NO_SUCH_ATTRIBUTE, LDAP_OPT_AUTO_RECONNECT,
    LDAP_OPT_ENCRYPT, LDAP_OPT_REFERRALS, LDAP_OPT_SIGN, LDAP_PARAM_ERROR, LDAP_RES_SEARCH_RESULT,
    LDAP_SENTINEL, LDAP_SUCCESS,
};

const HANDLE_STRIDE: usize = 0x10;

// Options whose value is passed as the pointer itself.
const FLAG_OPTIONS: [i32; 4] = [
    LDAP_OPT_REFERRALS,
    LDAP_OPT_AUTO_RECONNECT,
    LDAP_OPT_SIGN,
    LDAP_OPT_ENCRYPT,
];

fn handle<T>(id: usize) -> *mut T {
    (id * HANDLE_STRIDE) as *mut T
}

fn handle_id<T>(ptr: *mut T) -> usize {
    ptr as usize / HANDLE_STRIDE
}

fn wide(s: &str) -> Vec<WChar> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

unsafe fn read_wide(ptr: *const WChar) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    Some(String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len)))
}

unsafe fn read_wide_array(array: *const *mut WChar) -> Option<Vec<String>> {
    if array.is_null() {
        return None;
    }
    let mut out = Vec::new();
    let mut idx = 0;
    while let Some(s) = read_wide(*array.add(idx)) {
        out.push(s);
        idx += 1;
    }
    Some(out)
}

unsafe fn read_berval_array(array: *const *mut LdapBerval) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    if array.is_null() {
        return out;
    }
    let mut idx = 0;
    loop {
        let item = *array.add(idx);
        if item.is_null() {
            break;
        }
        let berval = &*item;
        let bytes = if berval.bv_len == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(berval.bv_val as *const u8, berval.bv_len as usize)
                .to_vec()
        };
        out.push(bytes);
        idx += 1;
    }
    out
}

/// Human-readable description the mock reports for `code`.
pub fn describe(code: u32) -> String {
    match code {
        0x00 => "Success".to_string(),
        0x04 => "Sizelimit Exceeded".to_string(),
        0x05 => "Compare False".to_string(),
        0x06 => "Compare True".to_string(),
        0x10 => "No Such Attribute".to_string(),
        0x20 => "No Such Object".to_string(),
        0x31 => "Invalid Credentials".to_string(),
        0x44 => "Already Exists".to_string(),
        0x51 => "Server Down".to_string(),
        0x55 => "Timeout".to_string(),
        0x57 => "Bad Search Filter".to_string(),
        0x59 => "Bad Parameter to an ldap routine".to_string(),
        other => format!("Error {other:#x}"),
    }
}

/// Values of one recorded modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedValues {
    /// `modv_strvals`.
    Text(Vec<String>),
    /// `modv_bvals`.
    Binary(Vec<Vec<u8>>),
}

/// One `LDAPModW` as the library received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMod {
    /// `mod_op` without the binary flag.
    pub op: u32,
    /// Whether `LDAP_MOD_BVALUES` was set.
    pub binary: bool,
    /// Attribute name.
    pub attribute: String,
    /// Decoded values; `None` when the value array was null.
    pub values: Option<RecordedValues>,
}

/// A gateway call, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `ldap_initW`.
    Init {
        /// Host, `None` for the default server.
        host: Option<String>,
        /// Port.
        port: u32,
    },
    /// `ldap_unbind` or `ldap_unbind_s`.
    Unbind,
    /// `ldap_bindW` or `ldap_bind_sW`.
    Bind {
        /// Synchronous variant.
        sync: bool,
        /// Bind DN.
        dn: Option<String>,
        /// Credentials.
        cred: Option<String>,
        /// Authentication method.
        method: u32,
    },
    /// `ldap_simple_bindW` or `ldap_simple_bind_sW`.
    SimpleBind {
        /// Synchronous variant.
        sync: bool,
        /// Bind DN.
        dn: Option<String>,
        /// Password.
        passwd: Option<String>,
    },
    /// `ldap_connect`.
    Connect {
        /// Timeout, `None` when null.
        timeout: Option<LdapTimeval>,
    },
    /// `ldap_check_filterW`.
    CheckFilter {
        /// Filter.
        filter: Option<String>,
    },
    /// `ldap_searchW` or `ldap_search_sW`.
    Search {
        /// Synchronous variant.
        sync: bool,
        /// Search base.
        base: Option<String>,
        /// Scope.
        scope: u32,
        /// Filter.
        filter: Option<String>,
        /// Requested attributes; `None` when the array was null.
        attrs: Option<Vec<String>>,
        /// Attributes-only flag.
        attrs_only: u32,
    },
    /// `ldap_addW` or `ldap_add_sW`.
    Add {
        /// Synchronous variant.
        sync: bool,
        /// Entry DN.
        dn: Option<String>,
        /// Modifications; `None` when the array was null.
        mods: Option<Vec<RecordedMod>>,
    },
    /// `ldap_modifyW` or `ldap_modify_sW`.
    Modify {
        /// Synchronous variant.
        sync: bool,
        /// Entry DN.
        dn: Option<String>,
        /// Modifications; `None` when the array was null.
        mods: Option<Vec<RecordedMod>>,
    },
    /// `ldap_deleteW` or `ldap_delete_sW`.
    Delete {
        /// Synchronous variant.
        sync: bool,
        /// Entry DN.
        dn: Option<String>,
    },
    /// `ldap_compareW` or `ldap_compare_sW`.
    Compare {
        /// Synchronous variant.
        sync: bool,
        /// Entry DN.
        dn: Option<String>,
        /// Attribute.
        attr: Option<String>,
        /// Asserted value.
        value: Option<String>,
    },
    /// `ldap_abandon`.
    Abandon {
        /// Message id.
        msgid: u32,
    },
    /// `ldap_result`.
    Result {
        /// Message id.
        msgid: u32,
        /// `all` argument.
        all: u32,
        /// Timeout, `None` when null (block).
        timeout: Option<LdapTimeval>,
    },
    /// `ldap_set_optionW`.
    SetOption {
        /// Option id.
        option: i32,
        /// Decoded value.
        value: usize,
    },
}

/// Release calls observed so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseCounts {
    /// `ldap_msgfree`, plus `ldap_result2error` with `free_it` set.
    pub msgfree: usize,
    /// `ber_free`.
    pub ber_free: usize,
    /// `ldap_value_freeW`.
    pub value_free: usize,
    /// `ldap_value_free_len`.
    pub value_free_len: usize,
    /// `ldap_memfreeW`.
    pub memfree: usize,
    /// `ldap_unbind` and `ldap_unbind_s`.
    pub unbind: usize,
}

struct LiveMessage {
    entries: Vec<usize>,
    result_code: u32,
}

struct LiveEntry {
    message: usize,
    index: usize,
    entry: MockEntry,
}

struct LiveCursor {
    entry: usize,
    next: usize,
}

struct StringArray {
    _strings: Vec<Vec<WChar>>,
    ptrs: Vec<*mut WChar>,
}

struct BervalArray {
    _buffers: Vec<Vec<u8>>,
    _bervals: Vec<LdapBerval>,
    ptrs: Vec<*mut LdapBerval>,
}

struct State {
    next_handle: usize,
    next_msgid: u32,
    connection: Option<usize>,
    messages: HashMap<usize, LiveMessage>,
    entries: HashMap<usize, LiveEntry>,
    cursors: HashMap<usize, LiveCursor>,
    strings: HashMap<usize, Vec<WChar>>,
    string_arrays: HashMap<usize, StringArray>,
    berval_arrays: HashMap<usize, BervalArray>,
    descriptions: HashMap<u32, Vec<WChar>>,
    last_error: u32,
    failures: VecDeque<u32>,
    connect_failures: VecDeque<u32>,
    entry_failures: VecDeque<u32>,
    attribute_failures: VecDeque<u32>,
    search_results: VecDeque<MockMessage>,
    results: HashMap<u32, VecDeque<MockResult>>,
    compare_result: u32,
    abandon_result: u32,
    options: HashMap<i32, usize>,
    calls: Vec<MockCall>,
    releases: ReleaseCounts,
    result_calls: usize,
    invalid_releases: usize,
}

impl State {
    fn new() -> Self {
        Self {
            next_handle: 1,
            next_msgid: 1,
            connection: None,
            messages: HashMap::new(),
            entries: HashMap::new(),
            cursors: HashMap::new(),
            strings: HashMap::new(),
            string_arrays: HashMap::new(),
            berval_arrays: HashMap::new(),
            descriptions: HashMap::new(),
            last_error: LDAP_SUCCESS,
            failures: VecDeque::new(),
            connect_failures: VecDeque::new(),
            entry_failures: VecDeque::new(),
            attribute_failures: VecDeque::new(),
            search_results: VecDeque::new(),
            results: HashMap::new(),
            compare_result: LDAP_COMPARE_TRUE,
            abandon_result: LDAP_SUCCESS,
            options: HashMap::new(),
            calls: Vec::new(),
            releases: ReleaseCounts::default(),
            result_calls: 0,
            invalid_releases: 0,
        }
    }

    fn alloc_handle(&mut self) -> usize {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    fn alloc_message(&mut self, message: MockMessage) -> *mut LdapMessage {
        let id = self.alloc_handle();
        let mut entries = Vec::with_capacity(message.entries.len());
        for (index, entry) in message.entries.into_iter().enumerate() {
            let entry_id = self.alloc_handle();
            self.entries.insert(
                entry_id,
                LiveEntry {
                    message: id,
                    index,
                    entry,
                },
            );
            entries.push(entry_id);
        }
        self.messages.insert(
            id,
            LiveMessage {
                entries,
                result_code: message.result_code,
            },
        );
        handle(id)
    }

    fn free_message(&mut self, id: usize) -> u32 {
        match self.messages.remove(&id) {
            Some(message) => {
                for entry in message.entries {
                    self.entries.remove(&entry);
                }
                self.releases.msgfree += 1;
                LDAP_SUCCESS
            }
            None => {
                self.invalid_releases += 1;
                LDAP_PARAM_ERROR
            }
        }
    }

    fn alloc_string(&mut self, s: &str) -> *mut WChar {
        let mut buf = wide(s);
        let ptr = buf.as_mut_ptr();
        self.strings.insert(ptr as usize, buf);
        ptr
    }

    // Sync calls return the failure code directly.
    fn sync_outcome(&mut self) -> u32 {
        self.failures.pop_front().unwrap_or(LDAP_SUCCESS)
    }

    // Async calls return a message id, or -1 with the code as last error.
    fn async_outcome(&mut self) -> u32 {
        match self.failures.pop_front() {
            Some(code) => {
                self.last_error = code;
                LDAP_SENTINEL
            }
            None => {
                let msgid = self.next_msgid;
                self.next_msgid += 1;
                self.last_error = LDAP_SUCCESS;
                msgid
            }
        }
    }

    fn end_of_sequence<T>(&mut self) -> *mut T {
        self.last_error = LDAP_SUCCESS;
        ptr::null_mut()
    }

    fn bad_parameter<T>(&mut self) -> *mut T {
        self.last_error = LDAP_PARAM_ERROR;
        ptr::null_mut()
    }

    fn entry_at(&mut self, message: usize, index: usize) -> *mut LdapMessage {
        match self.messages.get(&message) {
            Some(live) => match live.entries.get(index) {
                Some(&entry) => {
                    self.last_error = LDAP_SUCCESS;
                    handle(entry)
                }
                None => self.end_of_sequence(),
            },
            None => self.bad_parameter(),
        }
    }

    fn next_attribute_name(&mut self, cursor: usize) -> *mut WChar {
        let Some(live) = self.cursors.get_mut(&cursor) else {
            return self.bad_parameter();
        };
        let name = self
            .entries
            .get(&live.entry)
            .and_then(|e| e.entry.attributes.get(live.next))
            .map(|a| a.name.clone());
        match name {
            Some(name) => {
                live.next += 1;
                self.last_error = LDAP_SUCCESS;
                self.alloc_string(&name)
            }
            None => self.end_of_sequence(),
        }
    }

    fn find_attribute(
        &mut self,
        entry: usize,
        attr: *const WChar,
    ) -> Option<Vec<crate::script::MockValue>> {
        // Safety: the caller passes a nul-terminated attribute name.
        let name = unsafe { read_wide(attr) }?;
        let found = self.entries.get(&entry).and_then(|e| {
            e.entry
                .attributes
                .iter()
                .find(|a| a.name.eq_ignore_ascii_case(&name))
                .map(|a| a.values.clone())
        });
        if found.is_none() {
            self.last_error = LDAP_NO_SUCH_ATTRIBUTE;
        }
        found
    }
}

unsafe fn decode_mods(mods: *mut *mut LdapModW) -> Option<Vec<RecordedMod>> {
    if mods.is_null() {
        return None;
    }
    let mut out = Vec::new();
    let mut idx = 0;
    loop {
        let item = *mods.add(idx);
        if item.is_null() {
            break;
        }
        let m = &*item;
        let binary = m.mod_op & LDAP_MOD_BVALUES != 0;
        let values = if binary {
            let array = m.mod_vals.modv_bvals;
            (!array.is_null()).then(|| RecordedValues::Binary(read_berval_array(array)))
        } else {
            read_wide_array(m.mod_vals.modv_strvals).map(RecordedValues::Text)
        };
        out.push(RecordedMod {
            op: m.mod_op & !LDAP_MOD_BVALUES,
            binary,
            attribute: read_wide(m.mod_type).unwrap_or_default(),
            values,
        });
        idx += 1;
    }
    Some(out)
}

unsafe fn read_timeval(timeout: *const LdapTimeval) -> Option<LdapTimeval> {
    if timeout.is_null() {
        None
    } else {
        Some(*timeout)
    }
}

/// A scripted [`Wldap32Api`] implementation.
///
/// Operations succeed unless a failure is queued with
/// [`MockWldap32::fail_next`]. Asynchronous operations hand out message ids
/// 1, 2, 3... and `ldap_result` serves whatever was queued for that id with
/// [`MockWldap32::queue_result`], reporting a timeout when nothing was.
pub struct MockWldap32 {
    state: Mutex<State>,
}

impl Default for MockWldap32 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockWldap32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockWldap32")
            .field("calls", &state.calls.len())
            .field("releases", &state.releases)
            .field("live_messages", &state.messages.len())
            .finish_non_exhaustive()
    }
}

impl MockWldap32 {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::new()),
        }
    }

    /// Makes the next operation call fail with `code`.
    ///
    /// Synchronous calls return the code; asynchronous ones return `-1` and
    /// publish the code through `LdapGetLastError`. Failures queue up.
    pub fn fail_next(&self, code: u32) {
        self.state.lock().failures.push_back(code);
    }

    /// Makes the next `ldap_connect` fail with `code`, leaving other calls
    /// alone.
    pub fn fail_next_connect(&self, code: u32) {
        self.state.lock().connect_failures.push_back(code);
    }

    /// Makes the next `ldap_next_entry` return null with `code` as the last
    /// error.
    pub fn fail_next_entry(&self, code: u32) {
        self.state.lock().entry_failures.push_back(code);
    }

    /// Makes the next `ldap_next_attributeW` return null with `code` as the
    /// last error. The attribute cursor stays live.
    pub fn fail_next_attribute(&self, code: u32) {
        self.state.lock().attribute_failures.push_back(code);
    }

    /// Sets the value `LdapGetLastError` reports.
    pub fn set_last_error(&self, code: u32) {
        self.state.lock().last_error = code;
    }

    /// Sets what `ldap_compare_sW` returns.
    pub fn set_compare_result(&self, code: u32) {
        self.state.lock().compare_result = code;
    }

    /// Sets what `ldap_abandon` returns.
    pub fn set_abandon_result(&self, code: u32) {
        self.state.lock().abandon_result = code;
    }

    /// Queues the message the next successful `ldap_search_sW` returns.
    pub fn push_search_result(&self, message: MockMessage) {
        self.state.lock().search_results.push_back(message);
    }

    /// Queues what `ldap_result` reports for `msgid`.
    pub fn queue_result(&self, msgid: u32, result: MockResult) {
        self.state
            .lock()
            .results
            .entry(msgid)
            .or_default()
            .push_back(result);
    }

    /// The message id the next asynchronous call will receive.
    pub fn peek_msgid(&self) -> u32 {
        self.state.lock().next_msgid
    }

    /// Allocates a result handle directly, bypassing any operation.
    pub fn create_message(&self, message: MockMessage) -> *mut LdapMessage {
        self.state.lock().alloc_message(message)
    }

    /// Allocates a connection handle directly.
    pub fn create_connection(&self) -> *mut Ldap {
        let mut state = self.state.lock();
        let id = state.alloc_handle();
        state.connection = Some(id);
        handle(id)
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// The most recent recorded call.
    pub fn last_call(&self) -> Option<MockCall> {
        self.state.lock().calls.last().cloned()
    }

    /// Release counters.
    pub fn releases(&self) -> ReleaseCounts {
        self.state.lock().releases
    }

    /// Number of `ldap_result` invocations.
    pub fn result_calls(&self) -> usize {
        self.state.lock().result_calls
    }

    /// Releases of handles that were never handed out or already released,
    /// plus `ber_free` calls with a non-zero flag.
    pub fn invalid_releases(&self) -> usize {
        self.state.lock().invalid_releases
    }

    /// Native allocations currently outstanding (messages, attribute
    /// cursors, strings and value arrays).
    pub fn live_allocations(&self) -> usize {
        let state = self.state.lock();
        state.messages.len()
            + state.cursors.len()
            + state.strings.len()
            + state.string_arrays.len()
            + state.berval_arrays.len()
    }

    /// Whether a connection handle is live.
    pub fn is_connected(&self) -> bool {
        self.state.lock().connection.is_some()
    }

    /// Value last stored for `option`.
    pub fn option(&self, option: i32) -> Option<usize> {
        self.state.lock().options.get(&option).copied()
    }

    fn unbind_impl(&self, ld: *mut Ldap) -> u32 {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Unbind);
        if state.connection == Some(handle_id(ld)) {
            state.connection = None;
            state.releases.unbind += 1;
            LDAP_SUCCESS
        } else {
            state.invalid_releases += 1;
            LDAP_PARAM_ERROR
        }
    }

    fn record(&self, call: MockCall, sync: bool) -> u32 {
        let mut state = self.state.lock();
        state.calls.push(call);
        if sync {
            state.sync_outcome()
        } else {
            state.async_outcome()
        }
    }
}

impl Wldap32Api for MockWldap32 {
    unsafe fn init(&self, host: *const WChar, port: u32) -> *mut Ldap {
        let host = read_wide(host);
        let mut state = self.state.lock();
        state.calls.push(MockCall::Init { host, port });
        if let Some(code) = state.failures.pop_front() {
            state.last_error = code;
            return ptr::null_mut();
        }
        let id = state.alloc_handle();
        state.connection = Some(id);
        handle(id)
    }

    unsafe fn unbind(&self, ld: *mut Ldap) -> u32 {
        self.unbind_impl(ld)
    }

    unsafe fn unbind_s(&self, ld: *mut Ldap) -> u32 {
        self.unbind_impl(ld)
    }

    unsafe fn bind(
        &self,
        _ld: *mut Ldap,
        dn: *const WChar,
        cred: *const WChar,
        method: u32,
    ) -> u32 {
        let call = MockCall::Bind {
            sync: false,
            dn: read_wide(dn),
            cred: read_wide(cred),
            method,
        };
        self.record(call, false)
    }

    unsafe fn bind_s(
        &self,
        _ld: *mut Ldap,
        dn: *const WChar,
        cred: *const WChar,
        method: u32,
    ) -> u32 {
        let call = MockCall::Bind {
            sync: true,
            dn: read_wide(dn),
            cred: read_wide(cred),
            method,
        };
        self.record(call, true)
    }

    unsafe fn simple_bind(&self, _ld: *mut Ldap, dn: *const WChar, passwd: *const WChar) -> u32 {
        let call = MockCall::SimpleBind {
            sync: false,
            dn: read_wide(dn),
            passwd: read_wide(passwd),
        };
        self.record(call, false)
    }

    unsafe fn simple_bind_s(&self, _ld: *mut Ldap, dn: *const WChar, passwd: *const WChar) -> u32 {
        let call = MockCall::SimpleBind {
            sync: true,
            dn: read_wide(dn),
            passwd: read_wide(passwd),
        };
        self.record(call, true)
    }

    unsafe fn connect(&self, _ld: *mut Ldap, timeout: *mut LdapTimeval) -> u32 {
        let call = MockCall::Connect {
            timeout: read_timeval(timeout),
        };
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.connect_failures.pop_front() {
            Some(code) => code,
            None => state.sync_outcome(),
        }
    }

    unsafe fn check_filter(&self, _ld: *mut Ldap, filter: *const WChar) -> u32 {
        let call = MockCall::CheckFilter {
            filter: read_wide(filter),
        };
        self.record(call, true)
    }

    unsafe fn search(
        &self,
        _ld: *mut Ldap,
        base: *const WChar,
        scope: u32,
        filter: *const WChar,
        attrs: *mut *mut WChar,
        attrs_only: u32,
    ) -> u32 {
        let call = MockCall::Search {
            sync: false,
            base: read_wide(base),
            scope,
            filter: read_wide(filter),
            attrs: read_wide_array(attrs),
            attrs_only,
        };
        self.record(call, false)
    }

    unsafe fn search_s(
        &self,
        _ld: *mut Ldap,
        base: *const WChar,
        scope: u32,
        filter: *const WChar,
        attrs: *mut *mut WChar,
        attrs_only: u32,
        res: *mut *mut LdapMessage,
    ) -> u32 {
        let call = MockCall::Search {
            sync: true,
            base: read_wide(base),
            scope,
            filter: read_wide(filter),
            attrs: read_wide_array(attrs),
            attrs_only,
        };
        let code = self.record(call, true);
        if code == LDAP_SUCCESS {
            let mut state = self.state.lock();
            let message = state
                .search_results
                .pop_front()
                .unwrap_or_else(MockMessage::empty);
            *res = state.alloc_message(message);
        } else {
            *res = ptr::null_mut();
        }
        code
    }

    unsafe fn add(&self, _ld: *mut Ldap, dn: *const WChar, attrs: *mut *mut LdapModW) -> u32 {
        let call = MockCall::Add {
            sync: false,
            dn: read_wide(dn),
            mods: decode_mods(attrs),
        };
        self.record(call, false)
    }

    unsafe fn add_s(&self, _ld: *mut Ldap, dn: *const WChar, attrs: *mut *mut LdapModW) -> u32 {
        let call = MockCall::Add {
            sync: true,
            dn: read_wide(dn),
            mods: decode_mods(attrs),
        };
        self.record(call, true)
    }

    unsafe fn modify(&self, _ld: *mut Ldap, dn: *const WChar, mods: *mut *mut LdapModW) -> u32 {
        let call = MockCall::Modify {
            sync: false,
            dn: read_wide(dn),
            mods: decode_mods(mods),
        };
        self.record(call, false)
    }

    unsafe fn modify_s(&self, _ld: *mut Ldap, dn: *const WChar, mods: *mut *mut LdapModW) -> u32 {
        let call = MockCall::Modify {
            sync: true,
            dn: read_wide(dn),
            mods: decode_mods(mods),
        };
        self.record(call, true)
    }

    unsafe fn delete(&self, _ld: *mut Ldap, dn: *const WChar) -> u32 {
        let call = MockCall::Delete {
            sync: false,
            dn: read_wide(dn),
        };
        self.record(call, false)
    }

    unsafe fn delete_s(&self, _ld: *mut Ldap, dn: *const WChar) -> u32 {
        let call = MockCall::Delete {
            sync: true,
            dn: read_wide(dn),
        };
        self.record(call, true)
    }

    unsafe fn compare(
        &self,
        _ld: *mut Ldap,
        dn: *const WChar,
        attr: *const WChar,
        value: *const WChar,
    ) -> u32 {
        let call = MockCall::Compare {
            sync: false,
            dn: read_wide(dn),
            attr: read_wide(attr),
            value: read_wide(value),
        };
        self.record(call, false)
    }

    unsafe fn compare_s(
        &self,
        _ld: *mut Ldap,
        dn: *const WChar,
        attr: *const WChar,
        value: *const WChar,
    ) -> u32 {
        let call = MockCall::Compare {
            sync: true,
            dn: read_wide(dn),
            attr: read_wide(attr),
            value: read_wide(value),
        };
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(code) => code,
            None => state.compare_result,
        }
    }

    unsafe fn abandon(&self, _ld: *mut Ldap, msgid: u32) -> u32 {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Abandon { msgid });
        state.abandon_result
    }

    unsafe fn result(
        &self,
        _ld: *mut Ldap,
        msgid: u32,
        all: u32,
        timeout: *mut LdapTimeval,
        res: *mut *mut LdapMessage,
    ) -> u32 {
        let mut state = self.state.lock();
        state.result_calls += 1;
        state.calls.push(MockCall::Result {
            msgid,
            all,
            timeout: read_timeval(timeout),
        });
        *res = ptr::null_mut();
        let next = state.results.get_mut(&msgid).and_then(VecDeque::pop_front);
        match next {
            None | Some(MockResult::Timeout) => {
                state.last_error = LDAP_SUCCESS;
                0
            }
            Some(MockResult::Failure(code)) => {
                state.last_error = code;
                LDAP_SENTINEL
            }
            Some(MockResult::Message(message)) => {
                *res = state.alloc_message(message);
                LDAP_RES_SEARCH_RESULT
            }
        }
    }

    unsafe fn result2error(&self, _ld: *mut Ldap, res: *mut LdapMessage, free_it: u32) -> u32 {
        let mut state = self.state.lock();
        let id = handle_id(res);
        let code = match state.messages.get(&id) {
            Some(message) => message.result_code,
            None => LDAP_PARAM_ERROR,
        };
        if free_it != 0 {
            state.free_message(id);
        }
        code
    }

    unsafe fn msgfree(&self, res: *mut LdapMessage) -> u32 {
        self.state.lock().free_message(handle_id(res))
    }

    unsafe fn count_entries(&self, _ld: *mut Ldap, res: *mut LdapMessage) -> u32 {
        let mut state = self.state.lock();
        match state.messages.get(&handle_id(res)) {
            Some(message) => message.entries.len() as u32,
            None => {
                state.last_error = LDAP_PARAM_ERROR;
                LDAP_SENTINEL
            }
        }
    }

    unsafe fn first_entry(&self, _ld: *mut Ldap, res: *mut LdapMessage) -> *mut LdapMessage {
        self.state.lock().entry_at(handle_id(res), 0)
    }

    unsafe fn next_entry(&self, _ld: *mut Ldap, entry: *mut LdapMessage) -> *mut LdapMessage {
        let mut state = self.state.lock();
        if let Some(code) = state.entry_failures.pop_front() {
            state.last_error = code;
            return ptr::null_mut();
        }
        let position = state
            .entries
            .get(&handle_id(entry))
            .map(|e| (e.message, e.index));
        match position {
            Some((message, index)) => state.entry_at(message, index + 1),
            None => state.bad_parameter(),
        }
    }

    unsafe fn get_dn(&self, _ld: *mut Ldap, entry: *mut LdapMessage) -> *mut WChar {
        let mut state = self.state.lock();
        let dn = state
            .entries
            .get(&handle_id(entry))
            .map(|e| e.entry.dn.clone());
        match dn {
            Some(dn) => {
                state.last_error = LDAP_SUCCESS;
                state.alloc_string(&dn)
            }
            None => state.bad_parameter(),
        }
    }

    unsafe fn first_attribute(
        &self,
        _ld: *mut Ldap,
        entry: *mut LdapMessage,
        ber: *mut *mut BerElement,
    ) -> *mut WChar {
        let mut state = self.state.lock();
        let entry = handle_id(entry);
        if !state.entries.contains_key(&entry) {
            *ber = ptr::null_mut();
            return state.bad_parameter();
        }
        let cursor = state.alloc_handle();
        state.cursors.insert(cursor, LiveCursor { entry, next: 0 });
        *ber = handle(cursor);
        state.next_attribute_name(cursor)
    }

    unsafe fn next_attribute(
        &self,
        _ld: *mut Ldap,
        _entry: *mut LdapMessage,
        ber: *mut BerElement,
    ) -> *mut WChar {
        let mut state = self.state.lock();
        if let Some(code) = state.attribute_failures.pop_front() {
            state.last_error = code;
            return ptr::null_mut();
        }
        state.next_attribute_name(handle_id(ber))
    }

    unsafe fn memfree(&self, block: *mut WChar) {
        let mut state = self.state.lock();
        if state.strings.remove(&(block as usize)).is_some() {
            state.releases.memfree += 1;
        } else {
            state.invalid_releases += 1;
        }
    }

    unsafe fn ber_free(&self, ber: *mut BerElement, fbuf: i32) {
        let mut state = self.state.lock();
        if fbuf != 0 {
            state.invalid_releases += 1;
        }
        if state.cursors.remove(&handle_id(ber)).is_some() {
            state.releases.ber_free += 1;
        } else {
            state.invalid_releases += 1;
        }
    }

    unsafe fn get_values(
        &self,
        _ld: *mut Ldap,
        entry: *mut LdapMessage,
        attr: *const WChar,
    ) -> *mut *mut WChar {
        let mut state = self.state.lock();
        let Some(values) = state.find_attribute(handle_id(entry), attr) else {
            return ptr::null_mut();
        };
        let mut strings: Vec<Vec<WChar>> = values.iter().map(|v| wide(&v.text())).collect();
        let mut ptrs: Vec<*mut WChar> = strings.iter_mut().map(|s| s.as_mut_ptr()).collect();
        ptrs.push(ptr::null_mut());
        let array = ptrs.as_mut_ptr();
        state.string_arrays.insert(
            array as usize,
            StringArray {
                _strings: strings,
                ptrs,
            },
        );
        state.last_error = LDAP_SUCCESS;
        array
    }

    unsafe fn get_values_len(
        &self,
        _ld: *mut Ldap,
        entry: *mut LdapMessage,
        attr: *const WChar,
    ) -> *mut *mut LdapBerval {
        let mut state = self.state.lock();
        let Some(values) = state.find_attribute(handle_id(entry), attr) else {
            return ptr::null_mut();
        };
        let mut buffers: Vec<Vec<u8>> = values.iter().map(|v| v.bytes.clone()).collect();
        let mut bervals: Vec<LdapBerval> = buffers
            .iter_mut()
            .zip(&values)
            .map(|(buf, v)| LdapBerval {
                bv_len: v.declared_len as u32,
                bv_val: buf.as_mut_ptr() as *mut c_char,
            })
            .collect();
        let mut ptrs: Vec<*mut LdapBerval> =
            bervals.iter_mut().map(|b| b as *mut LdapBerval).collect();
        ptrs.push(ptr::null_mut());
        let array = ptrs.as_mut_ptr();
        state.berval_arrays.insert(
            array as usize,
            BervalArray {
                _buffers: buffers,
                _bervals: bervals,
                ptrs,
            },
        );
        state.last_error = LDAP_SUCCESS;
        array
    }

    unsafe fn value_free(&self, values: *mut *mut WChar) -> u32 {
        let mut state = self.state.lock();
        match state.string_arrays.remove(&(values as usize)) {
            Some(array) => {
                debug_assert!(array.ptrs.last().is_some_and(|p| p.is_null()));
                state.releases.value_free += 1;
                LDAP_SUCCESS
            }
            None => {
                state.invalid_releases += 1;
                LDAP_PARAM_ERROR
            }
        }
    }

    unsafe fn value_free_len(&self, values: *mut *mut LdapBerval) -> u32 {
        let mut state = self.state.lock();
        match state.berval_arrays.remove(&(values as usize)) {
            Some(array) => {
                debug_assert!(array.ptrs.last().is_some_and(|p| p.is_null()));
                state.releases.value_free_len += 1;
                LDAP_SUCCESS
            }
            None => {
                state.invalid_releases += 1;
                LDAP_PARAM_ERROR
            }
        }
    }

    unsafe fn err2string(&self, code: u32) -> *const WChar {
        let mut state = self.state.lock();
        state
            .descriptions
            .entry(code)
            .or_insert_with(|| wide(&describe(code)))
            .as_ptr()
    }

    unsafe fn get_last_error(&self) -> u32 {
        self.state.lock().last_error
    }

    unsafe fn set_option(&self, _ld: *mut Ldap, option: i32, value: *const c_void) -> u32 {
        let decoded = if FLAG_OPTIONS.contains(&option) {
            value as usize
        } else if value.is_null() {
            0
        } else {
            *(value as *const u32) as usize
        };
        let code = self.record(
            MockCall::SetOption {
                option,
                value: decoded,
            },
            true,
        );
        if code == LDAP_SUCCESS {
            self.state.lock().options.insert(option, decoded);
        }
        code
    }

    unsafe fn get_option(&self, _ld: *mut Ldap, option: i32, value: *mut c_void) -> u32 {
        let mut state = self.state.lock();
        if let Some(code) = state.failures.pop_front() {
            return code;
        }
        let stored = state.options.get(&option).copied().unwrap_or(0);
        *(value as *mut u32) = stored as u32;
        LDAP_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{MockAttribute, MockValue};

    fn three_entries() -> MockMessage {
        MockMessage::new([
            MockEntry::new("cn=1"),
            MockEntry::new("cn=2"),
            MockEntry::new("cn=3"),
        ])
    }

    #[test]
    fn entries_follow_first_next_order() {
        let mock = MockWldap32::new();
        let ld = mock.create_connection();
        let msg = mock.create_message(three_entries());
        unsafe {
            assert_eq!(mock.count_entries(ld, msg), 3);
            let first = mock.first_entry(ld, msg);
            let second = mock.next_entry(ld, first);
            let third = mock.next_entry(ld, second);
            assert!(!third.is_null());
            assert!(mock.next_entry(ld, third).is_null());
            assert_eq!(mock.get_last_error(), LDAP_SUCCESS);
            assert_eq!(mock.msgfree(msg), LDAP_SUCCESS);
        }
        assert_eq!(mock.releases().msgfree, 1);
        assert_eq!(mock.live_allocations(), 0);
    }

    #[test]
    fn double_msgfree_is_flagged() {
        let mock = MockWldap32::new();
        let msg = mock.create_message(MockMessage::empty());
        unsafe {
            mock.msgfree(msg);
            mock.msgfree(msg);
        }
        assert_eq!(mock.releases().msgfree, 1);
        assert_eq!(mock.invalid_releases(), 1);
    }

    #[test]
    fn berval_reports_declared_length() {
        let mock = MockWldap32::new();
        let ld = mock.create_connection();
        let entry = MockEntry::new("cn=x").with_attribute(MockAttribute::new(
            "attr",
            [MockValue::truncated(b"v1___".to_vec(), 2)],
        ));
        let msg = mock.create_message(MockMessage::new([entry]));
        let name = wide("attr");
        unsafe {
            let entry = mock.first_entry(ld, msg);
            let values = mock.get_values_len(ld, entry, name.as_ptr());
            let berval = &**values;
            assert_eq!(berval.bv_len, 2);
            assert!((*values.add(1)).is_null());
            assert_eq!(mock.value_free_len(values), LDAP_SUCCESS);
            mock.msgfree(msg);
        }
        assert_eq!(mock.live_allocations(), 0);
    }

    #[test]
    fn walk_failures_hit_only_their_primitive() {
        let mock = MockWldap32::new();
        let ld = mock.create_connection();
        let msg = mock.create_message(three_entries());
        mock.fail_next_entry(LDAP_PARAM_ERROR);
        mock.fail_next_connect(LDAP_PARAM_ERROR);
        unsafe {
            let first = mock.first_entry(ld, msg);
            assert!(!first.is_null());
            assert!(mock.next_entry(ld, first).is_null());
            assert_eq!(mock.get_last_error(), LDAP_PARAM_ERROR);
            assert!(!mock.next_entry(ld, first).is_null());
            assert_eq!(mock.check_filter(ld, wide("(cn=*)").as_ptr()), LDAP_SUCCESS);
            assert_eq!(mock.connect(ld, ptr::null_mut()), LDAP_PARAM_ERROR);
            mock.msgfree(msg);
        }
    }

    #[test]
    fn async_failure_publishes_last_error() {
        let mock = MockWldap32::new();
        let ld = mock.create_connection();
        mock.fail_next(LDAP_PARAM_ERROR);
        let dn = wide("cn=x");
        unsafe {
            assert_eq!(mock.delete(ld, dn.as_ptr()), LDAP_SENTINEL);
            assert_eq!(mock.get_last_error(), LDAP_PARAM_ERROR);
            assert_eq!(mock.delete(ld, dn.as_ptr()), 1);
        }
    }
}
