//! Type definitions mirroring `Winldap.h`.

use std::ffi::c_char;
use std::time::Duration;

/// An opaque connection handle (`LDAP*`).
///
/// Never dereferenced; only passed back to the library.
#[repr(C)]
pub struct Ldap {
    _private: [u8; 0],
}

/// An opaque result or entry handle (`LDAPMessage*`).
#[repr(C)]
pub struct LdapMessage {
    _private: [u8; 0],
}

/// An opaque attribute iteration cursor (`BerElement*`).
#[repr(C)]
pub struct BerElement {
    _private: [u8; 0],
}

/// Native wide character (`WCHAR`, UTF-16 code unit).
pub type WChar = u16;

/// A length-prefixed binary value (`LDAP_BERVAL`).
///
/// `bv_val` is not nul-terminated: `bv_len` alone governs its extent.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LdapBerval {
    /// Length of the value in bytes.
    pub bv_len: u32,
    /// Pointer to the value bytes.
    pub bv_val: *mut c_char,
}

impl LdapBerval {
    /// Creates a descriptor referencing `bytes`.
    ///
    /// The descriptor borrows nothing at the type level: the caller keeps
    /// `bytes` alive for as long as the descriptor is handed to the library.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bv_len: bytes.len() as u32,
            bv_val: bytes.as_ptr() as *mut c_char,
        }
    }
}

/// Values of an `LDAPModW`, text or binary depending on `mod_op`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union LdapModValues {
    /// Nul-terminated array of nul-terminated wide strings.
    pub modv_strvals: *mut *mut WChar,
    /// Nul-terminated array of berval pointers (requires `LDAP_MOD_BVALUES`).
    pub modv_bvals: *mut *mut LdapBerval,
}

/// One modification descriptor (`LDAPModW`).
#[repr(C)]
pub struct LdapModW {
    /// `LDAP_MOD_ADD`, `LDAP_MOD_DELETE` or `LDAP_MOD_REPLACE`, optionally
    /// or'ed with `LDAP_MOD_BVALUES`.
    pub mod_op: u32,
    /// Attribute name.
    pub mod_type: *mut WChar,
    /// Attribute values.
    pub mod_vals: LdapModValues,
}

/// Timeout structure (`LDAP_TIMEVAL`, also `l_timeval`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LdapTimeval {
    /// Seconds.
    pub tv_sec: i32,
    /// Microseconds.
    pub tv_usec: i32,
}

impl LdapTimeval {
    /// Converts a duration, saturating the seconds part at `i32::MAX`.
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            tv_sec: i32::try_from(duration.as_secs()).unwrap_or(i32::MAX),
            tv_usec: duration.subsec_micros() as i32,
        }
    }
}
