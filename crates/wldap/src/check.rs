//! Classification of raw native return values.
//!
//! Each Wldap32 primitive reports failure in one of four ways. The call site
//! picks the matching strategy; none of them retries.

use crate::codec::from_wide_ptr;
use crate::error::{LdapError, LdapResult};
use std::ptr::NonNull;
use wldap_sys::{Wldap32Api, LDAP_COMPARE_FALSE, LDAP_COMPARE_TRUE, LDAP_SENTINEL, LDAP_SUCCESS};

/// Builds a directory error for `code`, described by `ldap_err2string`.
pub fn describe_error(api: &dyn Wldap32Api, code: u32) -> LdapError {
    // Safety: err2string accepts any code and returns a static string.
    let description = unsafe { from_wide_ptr(api.err2string(code)) }
        .unwrap_or_else(|| format!("unknown LDAP error {code}"));
    LdapError::directory(code, description)
}

/// Builds a directory error from `LdapGetLastError`.
pub fn last_error(api: &dyn Wldap32Api) -> LdapError {
    // Safety: no preconditions.
    let code = unsafe { api.get_last_error() };
    describe_error(api, code)
}

/// Retcode family: `LDAP_SUCCESS` or the failure code itself.
pub fn retcode(api: &dyn Wldap32Api, code: u32) -> LdapResult<()> {
    if code == LDAP_SUCCESS {
        Ok(())
    } else {
        Err(describe_error(api, code))
    }
}

/// Sentinel family: anything but `-1` is a value; `-1` carries no code and
/// the last error is reported instead.
pub fn sentinel(api: &dyn Wldap32Api, value: u32) -> LdapResult<u32> {
    if value == LDAP_SENTINEL {
        Err(last_error(api))
    } else {
        Ok(value)
    }
}

/// Pointer family: null is only a failure when the last error says so.
///
/// Iteration primitives return null to signal the end of a sequence, which
/// comes back as `Ok(None)`.
pub fn pointer<T>(api: &dyn Wldap32Api, ptr: *mut T) -> LdapResult<Option<NonNull<T>>> {
    if let Some(ptr) = NonNull::new(ptr) {
        return Ok(Some(ptr));
    }
    // Safety: no preconditions.
    let code = unsafe { api.get_last_error() };
    if code == LDAP_SUCCESS {
        Ok(None)
    } else {
        Err(describe_error(api, code))
    }
}

/// Compare family: `LDAP_COMPARE_TRUE`/`LDAP_COMPARE_FALSE` map to a boolean,
/// anything else is a failure code.
pub fn compare(api: &dyn Wldap32Api, code: u32) -> LdapResult<bool> {
    match code {
        LDAP_COMPARE_TRUE => Ok(true),
        LDAP_COMPARE_FALSE => Ok(false),
        other => Err(describe_error(api, other)),
    }
}
