//! The native call gateway.

use crate::types::{BerElement, Ldap, LdapBerval, LdapMessage, LdapModW, LdapTimeval, WChar};
use std::ffi::c_void;

/// One method per Wldap32 primitive used by the binding.
///
/// [`crate::Wldap32Dll`] forwards to the real library. Test doubles implement
/// the same trait and hand out memory shaped like the library's, so the safe
/// layer above cannot tell the two apart.
///
/// Every method mirrors the native signature; strings are nul-terminated
/// UTF-16. Callers uphold the native contract: handles passed in must be live
/// and of the right kind, arrays must be nul-terminated.
///
/// Return values are raw. Success/failure classification is done by the
/// caller, per call family.
pub trait Wldap32Api {
    /// `ldap_initW`: allocates a connection handle without connecting.
    unsafe fn init(&self, host: *const WChar, port: u32) -> *mut Ldap;

    /// `ldap_unbind`: releases the connection handle.
    unsafe fn unbind(&self, ld: *mut Ldap) -> u32;

    /// `ldap_unbind_s`: releases the connection handle.
    unsafe fn unbind_s(&self, ld: *mut Ldap) -> u32;

    /// `ldap_bindW`: asynchronous bind, returns a message id or -1.
    unsafe fn bind(&self, ld: *mut Ldap, dn: *const WChar, cred: *const WChar, method: u32)
        -> u32;

    /// `ldap_bind_sW`: synchronous bind, returns a result code.
    unsafe fn bind_s(
        &self,
        ld: *mut Ldap,
        dn: *const WChar,
        cred: *const WChar,
        method: u32,
    ) -> u32;

    /// `ldap_simple_bindW`: asynchronous simple bind.
    unsafe fn simple_bind(&self, ld: *mut Ldap, dn: *const WChar, passwd: *const WChar) -> u32;

    /// `ldap_simple_bind_sW`: synchronous simple bind.
    unsafe fn simple_bind_s(&self, ld: *mut Ldap, dn: *const WChar, passwd: *const WChar)
        -> u32;

    /// `ldap_connect`: establishes the connection; a null timeout uses the
    /// library default.
    unsafe fn connect(&self, ld: *mut Ldap, timeout: *mut LdapTimeval) -> u32;

    /// `ldap_check_filterW`: validates a search filter locally.
    unsafe fn check_filter(&self, ld: *mut Ldap, filter: *const WChar) -> u32;

    /// `ldap_searchW`: asynchronous search.
    unsafe fn search(
        &self,
        ld: *mut Ldap,
        base: *const WChar,
        scope: u32,
        filter: *const WChar,
        attrs: *mut *mut WChar,
        attrs_only: u32,
    ) -> u32;

    /// `ldap_search_sW`: synchronous search, stores the result handle in `res`.
    unsafe fn search_s(
        &self,
        ld: *mut Ldap,
        base: *const WChar,
        scope: u32,
        filter: *const WChar,
        attrs: *mut *mut WChar,
        attrs_only: u32,
        res: *mut *mut LdapMessage,
    ) -> u32;

    /// `ldap_addW`: asynchronous add.
    unsafe fn add(&self, ld: *mut Ldap, dn: *const WChar, attrs: *mut *mut LdapModW) -> u32;

    /// `ldap_add_sW`: synchronous add.
    unsafe fn add_s(&self, ld: *mut Ldap, dn: *const WChar, attrs: *mut *mut LdapModW) -> u32;

    /// `ldap_modifyW`: asynchronous modify.
    unsafe fn modify(&self, ld: *mut Ldap, dn: *const WChar, mods: *mut *mut LdapModW) -> u32;

    /// `ldap_modify_sW`: synchronous modify.
    unsafe fn modify_s(&self, ld: *mut Ldap, dn: *const WChar, mods: *mut *mut LdapModW)
        -> u32;

    /// `ldap_deleteW`: asynchronous delete.
    unsafe fn delete(&self, ld: *mut Ldap, dn: *const WChar) -> u32;

    /// `ldap_delete_sW`: synchronous delete.
    unsafe fn delete_s(&self, ld: *mut Ldap, dn: *const WChar) -> u32;

    /// `ldap_compareW`: asynchronous compare.
    unsafe fn compare(
        &self,
        ld: *mut Ldap,
        dn: *const WChar,
        attr: *const WChar,
        value: *const WChar,
    ) -> u32;

    /// `ldap_compare_sW`: synchronous compare, returns `LDAP_COMPARE_TRUE`,
    /// `LDAP_COMPARE_FALSE` or an error code.
    unsafe fn compare_s(
        &self,
        ld: *mut Ldap,
        dn: *const WChar,
        attr: *const WChar,
        value: *const WChar,
    ) -> u32;

    /// `ldap_abandon`: requests abandonment of an outstanding operation.
    unsafe fn abandon(&self, ld: *mut Ldap, msgid: u32) -> u32;

    /// `ldap_result`: waits for the result of an asynchronous operation.
    ///
    /// Returns the message type, `0` on timeout or `-1` on failure.
    unsafe fn result(
        &self,
        ld: *mut Ldap,
        msgid: u32,
        all: u32,
        timeout: *mut LdapTimeval,
        res: *mut *mut LdapMessage,
    ) -> u32;

    /// `ldap_result2error`: extracts the result code of a result message.
    unsafe fn result2error(&self, ld: *mut Ldap, res: *mut LdapMessage, free_it: u32) -> u32;

    /// `ldap_msgfree`: releases a result handle.
    unsafe fn msgfree(&self, res: *mut LdapMessage) -> u32;

    /// `ldap_count_entries`: number of entries in a result, `-1` on failure.
    unsafe fn count_entries(&self, ld: *mut Ldap, res: *mut LdapMessage) -> u32;

    /// `ldap_first_entry`.
    unsafe fn first_entry(&self, ld: *mut Ldap, res: *mut LdapMessage) -> *mut LdapMessage;

    /// `ldap_next_entry`.
    unsafe fn next_entry(&self, ld: *mut Ldap, entry: *mut LdapMessage) -> *mut LdapMessage;

    /// `ldap_get_dnW`: the returned string is released with [`Self::memfree`].
    unsafe fn get_dn(&self, ld: *mut Ldap, entry: *mut LdapMessage) -> *mut WChar;

    /// `ldap_first_attributeW`: allocates the attribute cursor into `ber`.
    unsafe fn first_attribute(
        &self,
        ld: *mut Ldap,
        entry: *mut LdapMessage,
        ber: *mut *mut BerElement,
    ) -> *mut WChar;

    /// `ldap_next_attributeW`.
    unsafe fn next_attribute(
        &self,
        ld: *mut Ldap,
        entry: *mut LdapMessage,
        ber: *mut BerElement,
    ) -> *mut WChar;

    /// `ldap_memfreeW`.
    unsafe fn memfree(&self, block: *mut WChar);

    /// `ber_free`: `fbuf` must be zero for attribute cursors.
    unsafe fn ber_free(&self, ber: *mut BerElement, fbuf: i32);

    /// `ldap_get_valuesW`: nul-terminated array, released with
    /// [`Self::value_free`].
    unsafe fn get_values(
        &self,
        ld: *mut Ldap,
        entry: *mut LdapMessage,
        attr: *const WChar,
    ) -> *mut *mut WChar;

    /// `ldap_get_values_lenW`: nul-terminated array, released with
    /// [`Self::value_free_len`].
    unsafe fn get_values_len(
        &self,
        ld: *mut Ldap,
        entry: *mut LdapMessage,
        attr: *const WChar,
    ) -> *mut *mut LdapBerval;

    /// `ldap_value_freeW`.
    unsafe fn value_free(&self, values: *mut *mut WChar) -> u32;

    /// `ldap_value_free_len`.
    unsafe fn value_free_len(&self, values: *mut *mut LdapBerval) -> u32;

    /// `ldap_err2stringW`: static description, must not be freed.
    unsafe fn err2string(&self, code: u32) -> *const WChar;

    /// `LdapGetLastError`.
    unsafe fn get_last_error(&self) -> u32;

    /// `ldap_set_optionW`.
    unsafe fn set_option(&self, ld: *mut Ldap, option: i32, value: *const c_void) -> u32;

    /// `ldap_get_optionW`.
    unsafe fn get_option(&self, ld: *mut Ldap, option: i32, value: *mut c_void) -> u32;
}
