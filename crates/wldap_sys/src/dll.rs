//! Dynamic binding of `Wldap32.dll`.

use crate::api::Wldap32Api;
use crate::error::{LoadError, LoadResult};
use crate::types::{BerElement, Ldap, LdapBerval, LdapMessage, LdapModW, LdapTimeval, WChar};
use libloading::Library;
use once_cell::sync::OnceCell;
use std::ffi::c_void;
use std::fmt;

/// File name of the native library.
pub const LIBRARY_NAME: &str = "Wldap32.dll";

macro_rules! symbol_table {
    ($( $field:ident = $symbol:literal : fn($($arg:ty),*) $(-> $ret:ty)?; )*) => {
        /// Function table resolved from `Wldap32.dll`.
        ///
        /// Copies are cheap; the library stays loaded for the life of the
        /// process once [`initialize`] succeeded.
        #[derive(Clone, Copy)]
        pub struct Wldap32Dll {
            $( $field: unsafe extern "C" fn($($arg),*) $(-> $ret)?, )*
        }

        impl Wldap32Dll {
            unsafe fn resolve(library: &Library) -> LoadResult<Self> {
                Ok(Self {
                    $(
                        $field: *library
                            .get::<unsafe extern "C" fn($($arg),*) $(-> $ret)?>(
                                concat!($symbol, "\0").as_bytes(),
                            )
                            .map_err(|source| LoadError::Symbol { symbol: $symbol, source })?,
                    )*
                })
            }
        }
    };
}

symbol_table! {
    init = "ldap_initW": fn(*const WChar, u32) -> *mut Ldap;
    unbind = "ldap_unbind": fn(*mut Ldap) -> u32;
    unbind_s = "ldap_unbind_s": fn(*mut Ldap) -> u32;
    bind = "ldap_bindW": fn(*mut Ldap, *const WChar, *const WChar, u32) -> u32;
    bind_s = "ldap_bind_sW": fn(*mut Ldap, *const WChar, *const WChar, u32) -> u32;
    simple_bind = "ldap_simple_bindW": fn(*mut Ldap, *const WChar, *const WChar) -> u32;
    simple_bind_s = "ldap_simple_bind_sW": fn(*mut Ldap, *const WChar, *const WChar) -> u32;
    connect = "ldap_connect": fn(*mut Ldap, *mut LdapTimeval) -> u32;
    check_filter = "ldap_check_filterW": fn(*mut Ldap, *const WChar) -> u32;
    search = "ldap_searchW":
        fn(*mut Ldap, *const WChar, u32, *const WChar, *mut *mut WChar, u32) -> u32;
    search_s = "ldap_search_sW": fn(
        *mut Ldap,
        *const WChar,
        u32,
        *const WChar,
        *mut *mut WChar,
        u32,
        *mut *mut LdapMessage
    ) -> u32;
    add = "ldap_addW": fn(*mut Ldap, *const WChar, *mut *mut LdapModW) -> u32;
    add_s = "ldap_add_sW": fn(*mut Ldap, *const WChar, *mut *mut LdapModW) -> u32;
    modify = "ldap_modifyW": fn(*mut Ldap, *const WChar, *mut *mut LdapModW) -> u32;
    modify_s = "ldap_modify_sW": fn(*mut Ldap, *const WChar, *mut *mut LdapModW) -> u32;
    delete = "ldap_deleteW": fn(*mut Ldap, *const WChar) -> u32;
    delete_s = "ldap_delete_sW": fn(*mut Ldap, *const WChar) -> u32;
    compare = "ldap_compareW": fn(*mut Ldap, *const WChar, *const WChar, *const WChar) -> u32;
    compare_s = "ldap_compare_sW":
        fn(*mut Ldap, *const WChar, *const WChar, *const WChar) -> u32;
    abandon = "ldap_abandon": fn(*mut Ldap, u32) -> u32;
    result = "ldap_result":
        fn(*mut Ldap, u32, u32, *mut LdapTimeval, *mut *mut LdapMessage) -> u32;
    result2error = "ldap_result2error": fn(*mut Ldap, *mut LdapMessage, u32) -> u32;
    msgfree = "ldap_msgfree": fn(*mut LdapMessage) -> u32;
    count_entries = "ldap_count_entries": fn(*mut Ldap, *mut LdapMessage) -> u32;
    first_entry = "ldap_first_entry": fn(*mut Ldap, *mut LdapMessage) -> *mut LdapMessage;
    next_entry = "ldap_next_entry": fn(*mut Ldap, *mut LdapMessage) -> *mut LdapMessage;
    get_dn = "ldap_get_dnW": fn(*mut Ldap, *mut LdapMessage) -> *mut WChar;
    first_attribute = "ldap_first_attributeW":
        fn(*mut Ldap, *mut LdapMessage, *mut *mut BerElement) -> *mut WChar;
    next_attribute = "ldap_next_attributeW":
        fn(*mut Ldap, *mut LdapMessage, *mut BerElement) -> *mut WChar;
    memfree = "ldap_memfreeW": fn(*mut WChar);
    ber_free = "ber_free": fn(*mut BerElement, i32);
    get_values = "ldap_get_valuesW":
        fn(*mut Ldap, *mut LdapMessage, *const WChar) -> *mut *mut WChar;
    get_values_len = "ldap_get_values_lenW":
        fn(*mut Ldap, *mut LdapMessage, *const WChar) -> *mut *mut LdapBerval;
    value_free = "ldap_value_freeW": fn(*mut *mut WChar) -> u32;
    value_free_len = "ldap_value_free_len": fn(*mut *mut LdapBerval) -> u32;
    err2string = "ldap_err2stringW": fn(u32) -> *const WChar;
    get_last_error = "LdapGetLastError": fn() -> u32;
    set_option = "ldap_set_optionW": fn(*mut Ldap, i32, *const c_void) -> u32;
    get_option = "ldap_get_optionW": fn(*mut Ldap, i32, *mut c_void) -> u32;
}

struct Loaded {
    // Keeps every resolved function pointer valid.
    _library: Library,
    table: Wldap32Dll,
}

static WLDAP32: OnceCell<Loaded> = OnceCell::new();

/// Loads `Wldap32.dll` and resolves every entry point.
///
/// The scan happens once per process; subsequent calls return a copy of the
/// same table. A failed attempt is not cached, so a later call may retry.
pub fn initialize() -> LoadResult<Wldap32Dll> {
    let loaded = WLDAP32.get_or_try_init(|| {
        tracing::debug!(library = LIBRARY_NAME, "binding native LDAP library");
        // Safety: Wldap32 runs no initialisation routine with preconditions.
        let library = unsafe { Library::new(LIBRARY_NAME) }.map_err(|source| {
            LoadError::Library {
                library: LIBRARY_NAME,
                source,
            }
        })?;
        // Safety: every signature matches Winldap.h.
        let table = unsafe { Wldap32Dll::resolve(&library) }?;
        Ok::<_, LoadError>(Loaded {
            _library: library,
            table,
        })
    })?;
    Ok(loaded.table)
}

/// Returns true once [`initialize`] has succeeded.
pub fn is_initialized() -> bool {
    WLDAP32.get().is_some()
}

impl fmt::Debug for Wldap32Dll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wldap32Dll").finish_non_exhaustive()
    }
}

impl Wldap32Api for Wldap32Dll {
    unsafe fn init(&self, host: *const WChar, port: u32) -> *mut Ldap {
        (self.init)(host, port)
    }

    unsafe fn unbind(&self, ld: *mut Ldap) -> u32 {
        (self.unbind)(ld)
    }

    unsafe fn unbind_s(&self, ld: *mut Ldap) -> u32 {
        (self.unbind_s)(ld)
    }

    unsafe fn bind(&self, ld: *mut Ldap, dn: *const WChar, cred: *const WChar, method: u32) -> u32 {
        (self.bind)(ld, dn, cred, method)
    }

    unsafe fn bind_s(
        &self,
        ld: *mut Ldap,
        dn: *const WChar,
        cred: *const WChar,
        method: u32,
    ) -> u32 {
        (self.bind_s)(ld, dn, cred, method)
    }

    unsafe fn simple_bind(&self, ld: *mut Ldap, dn: *const WChar, passwd: *const WChar) -> u32 {
        (self.simple_bind)(ld, dn, passwd)
    }

    unsafe fn simple_bind_s(&self, ld: *mut Ldap, dn: *const WChar, passwd: *const WChar) -> u32 {
        (self.simple_bind_s)(ld, dn, passwd)
    }

    unsafe fn connect(&self, ld: *mut Ldap, timeout: *mut LdapTimeval) -> u32 {
        (self.connect)(ld, timeout)
    }

    unsafe fn check_filter(&self, ld: *mut Ldap, filter: *const WChar) -> u32 {
        (self.check_filter)(ld, filter)
    }

    unsafe fn search(
        &self,
        ld: *mut Ldap,
        base: *const WChar,
        scope: u32,
        filter: *const WChar,
        attrs: *mut *mut WChar,
        attrs_only: u32,
    ) -> u32 {
        (self.search)(ld, base, scope, filter, attrs, attrs_only)
    }

    unsafe fn search_s(
        &self,
        ld: *mut Ldap,
        base: *const WChar,
        scope: u32,
        filter: *const WChar,
        attrs: *mut *mut WChar,
        attrs_only: u32,
        res: *mut *mut LdapMessage,
    ) -> u32 {
        (self.search_s)(ld, base, scope, filter, attrs, attrs_only, res)
    }

    unsafe fn add(&self, ld: *mut Ldap, dn: *const WChar, attrs: *mut *mut LdapModW) -> u32 {
        (self.add)(ld, dn, attrs)
    }

    unsafe fn add_s(&self, ld: *mut Ldap, dn: *const WChar, attrs: *mut *mut LdapModW) -> u32 {
        (self.add_s)(ld, dn, attrs)
    }

    unsafe fn modify(&self, ld: *mut Ldap, dn: *const WChar, mods: *mut *mut LdapModW) -> u32 {
        (self.modify)(ld, dn, mods)
    }

    unsafe fn modify_s(&self, ld: *mut Ldap, dn: *const WChar, mods: *mut *mut LdapModW) -> u32 {
        (self.modify_s)(ld, dn, mods)
    }

    unsafe fn delete(&self, ld: *mut Ldap, dn: *const WChar) -> u32 {
        (self.delete)(ld, dn)
    }

    unsafe fn delete_s(&self, ld: *mut Ldap, dn: *const WChar) -> u32 {
        (self.delete_s)(ld, dn)
    }

    unsafe fn compare(
        &self,
        ld: *mut Ldap,
        dn: *const WChar,
        attr: *const WChar,
        value: *const WChar,
    ) -> u32 {
        (self.compare)(ld, dn, attr, value)
    }

    unsafe fn compare_s(
        &self,
        ld: *mut Ldap,
        dn: *const WChar,
        attr: *const WChar,
        value: *const WChar,
    ) -> u32 {
        (self.compare_s)(ld, dn, attr, value)
    }

    unsafe fn abandon(&self, ld: *mut Ldap, msgid: u32) -> u32 {
        (self.abandon)(ld, msgid)
    }

    unsafe fn result(
        &self,
        ld: *mut Ldap,
        msgid: u32,
        all: u32,
        timeout: *mut LdapTimeval,
        res: *mut *mut LdapMessage,
    ) -> u32 {
        (self.result)(ld, msgid, all, timeout, res)
    }

    unsafe fn result2error(&self, ld: *mut Ldap, res: *mut LdapMessage, free_it: u32) -> u32 {
        (self.result2error)(ld, res, free_it)
    }

    unsafe fn msgfree(&self, res: *mut LdapMessage) -> u32 {
        (self.msgfree)(res)
    }

    unsafe fn count_entries(&self, ld: *mut Ldap, res: *mut LdapMessage) -> u32 {
        (self.count_entries)(ld, res)
    }

    unsafe fn first_entry(&self, ld: *mut Ldap, res: *mut LdapMessage) -> *mut LdapMessage {
        (self.first_entry)(ld, res)
    }

    unsafe fn next_entry(&self, ld: *mut Ldap, entry: *mut LdapMessage) -> *mut LdapMessage {
        (self.next_entry)(ld, entry)
    }

    unsafe fn get_dn(&self, ld: *mut Ldap, entry: *mut LdapMessage) -> *mut WChar {
        (self.get_dn)(ld, entry)
    }

    unsafe fn first_attribute(
        &self,
        ld: *mut Ldap,
        entry: *mut LdapMessage,
        ber: *mut *mut BerElement,
    ) -> *mut WChar {
        (self.first_attribute)(ld, entry, ber)
    }

    unsafe fn next_attribute(
        &self,
        ld: *mut Ldap,
        entry: *mut LdapMessage,
        ber: *mut BerElement,
    ) -> *mut WChar {
        (self.next_attribute)(ld, entry, ber)
    }

    unsafe fn memfree(&self, block: *mut WChar) {
        (self.memfree)(block)
    }

    unsafe fn ber_free(&self, ber: *mut BerElement, fbuf: i32) {
        (self.ber_free)(ber, fbuf)
    }

    unsafe fn get_values(
        &self,
        ld: *mut Ldap,
        entry: *mut LdapMessage,
        attr: *const WChar,
    ) -> *mut *mut WChar {
        (self.get_values)(ld, entry, attr)
    }

    unsafe fn get_values_len(
        &self,
        ld: *mut Ldap,
        entry: *mut LdapMessage,
        attr: *const WChar,
    ) -> *mut *mut LdapBerval {
        (self.get_values_len)(ld, entry, attr)
    }

    unsafe fn value_free(&self, values: *mut *mut WChar) -> u32 {
        (self.value_free)(values)
    }

    unsafe fn value_free_len(&self, values: *mut *mut LdapBerval) -> u32 {
        (self.value_free_len)(values)
    }

    unsafe fn err2string(&self, code: u32) -> *const WChar {
        (self.err2string)(code)
    }

    unsafe fn get_last_error(&self) -> u32 {
        (self.get_last_error)()
    }

    unsafe fn set_option(&self, ld: *mut Ldap, option: i32, value: *const c_void) -> u32 {
        (self.set_option)(ld, option, value)
    }

    unsafe fn get_option(&self, ld: *mut Ldap, option: i32, value: *mut c_void) -> u32 {
        (self.get_option)(ld, option, value)
    }
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn initialize_reports_missing_library() {
        let err = initialize().unwrap_err();
        assert!(matches!(err, LoadError::Library { library, .. } if library == LIBRARY_NAME));
        assert!(!is_initialized());
    }
}
