//! Conversions between Rust values and native buffers.
//!
//! Strings cross the boundary as nul-terminated UTF-16. Arrays of strings or
//! bervals cross as nul-terminated pointer arrays. Every builder here owns (or
//! borrows, for binary data) the memory its pointers reference, so a native
//! call receiving them is safe for as long as the builder is alive.

use crate::error::{LdapError, LdapResult};
use std::ffi::c_char;
use std::marker::PhantomData;
use std::ptr;
use wldap_sys::{LdapBerval, WChar};

/// A nul-terminated UTF-16 string owned on the Rust side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideString {
    buf: Vec<WChar>,
}

impl WideString {
    /// Encodes `s`, rejecting interior NUL characters the library would
    /// silently truncate at.
    pub fn new(s: &str) -> LdapResult<Self> {
        if s.contains('\0') {
            return Err(LdapError::invalid_argument(format!(
                "string contains an interior NUL: {s:?}"
            )));
        }
        let mut buf: Vec<WChar> = s.encode_utf16().collect();
        buf.push(0);
        Ok(Self { buf })
    }

    /// Pointer to the first code unit.
    pub fn as_ptr(&self) -> *const WChar {
        self.buf.as_ptr()
    }

    /// Mutable pointer, for native signatures declared without `const`.
    pub fn as_mut_ptr(&mut self) -> *mut WChar {
        self.buf.as_mut_ptr()
    }

    /// Code units, terminator included.
    pub fn as_units(&self) -> &[WChar] {
        &self.buf
    }
}

/// Encodes an optional string; `None` becomes a null pointer at the call
/// site through [`opt_ptr`].
pub fn opt_wide(s: Option<&str>) -> LdapResult<Option<WideString>> {
    s.map(WideString::new).transpose()
}

/// Pointer to an optional wide string, null when absent.
pub fn opt_ptr(s: &Option<WideString>) -> *const WChar {
    s.as_ref().map_or(ptr::null(), WideString::as_ptr)
}

/// Decodes a nul-terminated UTF-16 string.
///
/// Unpaired surrogates are replaced rather than rejected.
///
/// # Safety
///
/// `ptr` must be null or point to a nul-terminated UTF-16 string.
pub unsafe fn from_wide_ptr(ptr: *const WChar) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let units = std::slice::from_raw_parts(ptr, len);
    Some(String::from_utf16_lossy(units))
}

/// A nul-terminated array of wide strings (`PWCHAR[]`).
#[derive(Debug)]
pub struct NativeStringArray {
    strings: Vec<WideString>,
    ptrs: Vec<*mut WChar>,
}

impl NativeStringArray {
    /// Number of elements, terminator included.
    pub fn len(&self) -> usize {
        self.ptrs.len()
    }

    /// Number of strings, terminator excluded.
    pub fn value_count(&self) -> usize {
        self.strings.len()
    }

    /// Pointer to the first element, for the native call.
    pub fn as_mut_ptr(&mut self) -> *mut *mut WChar {
        self.ptrs.as_mut_ptr()
    }

    /// Raw elements, terminator included.
    pub fn as_slice(&self) -> &[*mut WChar] {
        &self.ptrs
    }
}

/// Builds a native string array: one element per value plus a null
/// terminator. An empty input yields the terminator alone.
pub fn to_native_string_array<I, S>(values: I) -> LdapResult<NativeStringArray>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut strings = values
        .into_iter()
        .map(|s| WideString::new(s.as_ref()))
        .collect::<LdapResult<Vec<_>>>()?;

    let mut ptrs: Vec<*mut WChar> = strings.iter_mut().map(WideString::as_mut_ptr).collect();
    ptrs.push(ptr::null_mut());

    Ok(NativeStringArray { strings, ptrs })
}

/// Decodes a nul-terminated native string array.
///
/// # Safety
///
/// `array` must be null or a nul-terminated array of nul-terminated UTF-16
/// strings.
pub unsafe fn strings_from_native_array(array: *const *mut WChar) -> Vec<String> {
    let mut out = Vec::new();
    if array.is_null() {
        return out;
    }
    let mut idx = 0;
    loop {
        let item = *array.add(idx);
        match from_wide_ptr(item) {
            Some(s) => out.push(s),
            None => break,
        }
        idx += 1;
    }
    out
}

/// Copies exactly `len` bytes out of a native buffer.
///
/// Must run before the buffer's owner is released.
///
/// # Safety
///
/// `ptr` must be valid for `len` bytes unless `len` is zero.
pub unsafe fn bytes_from_native_buffer(ptr: *const c_char, len: usize) -> Vec<u8> {
    if len == 0 || ptr.is_null() {
        return Vec::new();
    }
    std::slice::from_raw_parts(ptr as *const u8, len).to_vec()
}

/// Builds a berval referencing `bytes`.
///
/// The caller keeps `bytes` alive while the descriptor is in use.
pub fn berval_from_bytes(bytes: &[u8]) -> LdapBerval {
    LdapBerval::from_bytes(bytes)
}

/// A nul-terminated array of berval pointers (`LDAP_BERVAL*[]`).
///
/// The descriptors reference the caller's byte buffers, which the lifetime
/// keeps alive.
#[derive(Debug)]
pub struct NativeBervalArray<'a> {
    bervals: Vec<LdapBerval>,
    ptrs: Vec<*mut LdapBerval>,
    _values: PhantomData<&'a [u8]>,
}

impl<'a> NativeBervalArray<'a> {
    /// Builds one descriptor per value plus a null terminator.
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut bervals: Vec<LdapBerval> = values.into_iter().map(berval_from_bytes).collect();
        let mut ptrs: Vec<*mut LdapBerval> =
            bervals.iter_mut().map(|b| b as *mut LdapBerval).collect();
        ptrs.push(ptr::null_mut());
        Self {
            bervals,
            ptrs,
            _values: PhantomData,
        }
    }

    /// Number of elements, terminator included.
    pub fn len(&self) -> usize {
        self.ptrs.len()
    }

    /// Number of descriptors, terminator excluded.
    pub fn value_count(&self) -> usize {
        self.bervals.len()
    }

    /// Pointer to the first element, for the native call.
    pub fn as_mut_ptr(&mut self) -> *mut *mut LdapBerval {
        self.ptrs.as_mut_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wide_string_is_terminated() {
        let s = WideString::new("dc=example").unwrap();
        let units = s.as_units();
        assert_eq!(units.len(), "dc=example".len() + 1);
        assert_eq!(*units.last().unwrap(), 0);
    }

    #[test]
    fn wide_string_rejects_interior_nul() {
        let err = WideString::new("cn=a\0b").unwrap_err();
        assert!(matches!(err, LdapError::InvalidArgument { .. }));
    }

    #[test]
    fn wide_string_round_trips_non_ascii() {
        let s = WideString::new("cn=Jürgen,ou=☃").unwrap();
        let back = unsafe { from_wide_ptr(s.as_ptr()) };
        assert_eq!(back.as_deref(), Some("cn=Jürgen,ou=☃"));
    }

    #[test]
    fn from_wide_ptr_null() {
        assert_eq!(unsafe { from_wide_ptr(ptr::null()) }, None);
    }

    #[test]
    fn empty_string_array_is_terminator_only() {
        let array = to_native_string_array(Vec::<String>::new()).unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array.value_count(), 0);
        assert!(array.as_slice()[0].is_null());
    }

    #[test]
    fn string_array_rejects_interior_nul() {
        assert!(to_native_string_array(["ok", "bad\0"]).is_err());
    }

    #[test]
    fn declared_length_governs_copy() {
        let buffer = b"v1___";
        let bytes = unsafe { bytes_from_native_buffer(buffer.as_ptr() as *const c_char, 2) };
        assert_eq!(bytes, b"v1");

        let buffer = b"val2___";
        let bytes = unsafe { bytes_from_native_buffer(buffer.as_ptr() as *const c_char, 4) };
        assert_eq!(bytes, b"val2");
    }

    #[test]
    fn zero_length_copy_ignores_pointer() {
        let bytes = unsafe { bytes_from_native_buffer(ptr::null(), 0) };
        assert!(bytes.is_empty());
    }

    #[test]
    fn berval_array_references_values() {
        let values: Vec<Vec<u8>> = vec![b"val1".to_vec(), b"val22".to_vec()];
        let mut array = NativeBervalArray::new(values.iter().map(Vec::as_slice));
        assert_eq!(array.len(), 3);
        assert_eq!(array.value_count(), 2);

        let raw = array.as_mut_ptr();
        unsafe {
            for (idx, value) in values.iter().enumerate() {
                let berval = &**raw.add(idx);
                let copied = bytes_from_native_buffer(berval.bv_val, berval.bv_len as usize);
                assert_eq!(&copied, value);
            }
            assert!((*raw.add(2)).is_null());
        }
    }

    proptest! {
        #[test]
        fn string_array_has_terminator(values in prop::collection::vec("\\PC{0,16}", 0..16)) {
            let array = to_native_string_array(&values).unwrap();
            prop_assert_eq!(array.len(), values.len() + 1);
            prop_assert!(array.as_slice()[values.len()].is_null());
        }

        #[test]
        fn string_array_round_trips(values in prop::collection::vec("\\PC{0,16}", 0..16)) {
            let array = to_native_string_array(&values).unwrap();
            let decoded = unsafe { strings_from_native_array(array.as_slice().as_ptr()) };
            prop_assert_eq!(decoded, values);
        }

        #[test]
        fn buffer_copy_respects_length(
            data in prop::collection::vec(any::<u8>(), 0..64),
            cut in 0usize..64,
        ) {
            let len = cut.min(data.len());
            let copied = unsafe { bytes_from_native_buffer(data.as_ptr() as *const c_char, len) };
            prop_assert_eq!(&copied[..], &data[..len]);
        }
    }
}
