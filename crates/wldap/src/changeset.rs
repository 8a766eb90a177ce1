//! Modification lists for add and modify operations.
//!
//! A [`Changeset`] records add/delete/replace operations in call order, each
//! carrying either text or binary values. [`Changeset::render`] lays them out
//! as the nul-terminated `LDAPModW*` array `ldap_add*`/`ldap_modify*` expect.

use crate::codec::{to_native_string_array, NativeBervalArray, NativeStringArray, WideString};
use crate::error::{LdapError, LdapResult};
use std::ptr;
use wldap_sys::{
    LdapModValues, LdapModW, LDAP_MOD_ADD, LDAP_MOD_BVALUES, LDAP_MOD_DELETE, LDAP_MOD_REPLACE,
};

/// Kind of modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModOp {
    /// Add values to the attribute.
    Add,
    /// Remove values, or the whole attribute when no values are given.
    Delete,
    /// Replace all values of the attribute.
    Replace,
}

impl ModOp {
    /// Native `mod_op` value, without the binary flag.
    pub fn to_native(self) -> u32 {
        match self {
            Self::Add => LDAP_MOD_ADD,
            Self::Delete => LDAP_MOD_DELETE,
            Self::Replace => LDAP_MOD_REPLACE,
        }
    }
}

/// Values carried by a modification: text or binary, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModValues {
    /// Sent as wide strings.
    Text(Vec<String>),
    /// Sent as bervals, with `LDAP_MOD_BVALUES` set.
    Binary(Vec<Vec<u8>>),
}

impl ModValues {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(v) => v.len(),
            Self::Binary(v) => v.len(),
        }
    }

    /// Whether values are binary.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

/// One modification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    op: ModOp,
    attribute: String,
    values: ModValues,
}

impl Modification {
    /// Creates a modification.
    pub fn new(op: ModOp, attribute: impl Into<String>, values: ModValues) -> Self {
        Self {
            op,
            attribute: attribute.into(),
            values,
        }
    }

    /// Creates a modification from separately supplied text and binary
    /// values, as dynamic callers provide them.
    ///
    /// Exactly one of `text` and `binary` must be present.
    pub fn from_parts(
        op: ModOp,
        attribute: impl Into<String>,
        text: Option<Vec<String>>,
        binary: Option<Vec<Vec<u8>>>,
    ) -> LdapResult<Self> {
        let attribute = attribute.into();
        let values = match (text, binary) {
            (Some(text), None) => ModValues::Text(text),
            (None, Some(binary)) => ModValues::Binary(binary),
            (Some(_), Some(_)) => {
                return Err(LdapError::invalid_argument(format!(
                    "modification of {attribute:?} has both text and binary values"
                )))
            }
            (None, None) => {
                return Err(LdapError::invalid_argument(format!(
                    "modification of {attribute:?} has neither text nor binary values"
                )))
            }
        };
        Ok(Self::new(op, attribute, values))
    }

    /// Operation.
    pub fn op(&self) -> ModOp {
        self.op
    }

    /// Attribute name.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Values.
    pub fn values(&self) -> &ModValues {
        &self.values
    }

    /// Native `mod_op`, including `LDAP_MOD_BVALUES` for binary values.
    pub fn native_op(&self) -> u32 {
        if self.values.is_binary() {
            self.op.to_native() | LDAP_MOD_BVALUES
        } else {
            self.op.to_native()
        }
    }
}

/// An ordered list of modifications.
///
/// ```
/// use wldap::Changeset;
///
/// let mut changeset = Changeset::new();
/// changeset
///     .add("mail", ["a@example.com", "b@example.com"])
///     .add_binary("jpegPhoto", [vec![0xffu8, 0xd8]])
///     .delete_attribute("description");
/// assert_eq!(changeset.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    changes: Vec<Modification>,
}

impl Changeset {
    /// Creates an empty changeset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a modification.
    pub fn push(&mut self, modification: Modification) -> &mut Self {
        self.changes.push(modification);
        self
    }

    fn text<I, S>(&mut self, op: ModOp, attr: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(Modification::new(op, attr, ModValues::Text(values)))
    }

    fn binary<I, B>(&mut self, op: ModOp, attr: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(Modification::new(op, attr, ModValues::Binary(values)))
    }

    /// Adds text values to `attr`.
    pub fn add<I, S>(&mut self, attr: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text(ModOp::Add, attr, values)
    }

    /// Adds binary values to `attr`.
    pub fn add_binary<I, B>(&mut self, attr: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        self.binary(ModOp::Add, attr, values)
    }

    /// Removes text values from `attr`.
    pub fn delete<I, S>(&mut self, attr: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text(ModOp::Delete, attr, values)
    }

    /// Removes binary values from `attr`.
    pub fn delete_binary<I, B>(&mut self, attr: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        self.binary(ModOp::Delete, attr, values)
    }

    /// Removes `attr` entirely (a delete with an empty value list).
    pub fn delete_attribute(&mut self, attr: &str) -> &mut Self {
        self.text(ModOp::Delete, attr, Vec::<String>::new())
    }

    /// Replaces the values of `attr` with text values.
    pub fn replace<I, S>(&mut self, attr: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text(ModOp::Replace, attr, values)
    }

    /// Replaces the values of `attr` with binary values.
    pub fn replace_binary<I, B>(&mut self, attr: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        self.binary(ModOp::Replace, attr, values)
    }

    /// Number of modifications.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether no modification was recorded.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Modifications, in call order.
    pub fn iter(&self) -> std::slice::Iter<'_, Modification> {
        self.changes.iter()
    }

    /// Lays the changeset out in native form.
    ///
    /// Fails with [`LdapError::InvalidArgument`] if an attribute name or text
    /// value contains NUL. Binary values are referenced, not copied, hence the
    /// borrow.
    pub fn render(&self) -> LdapResult<RenderedChangeset<'_>> {
        let mut rendered = RenderedChangeset {
            names: Vec::with_capacity(self.changes.len()),
            text: Vec::new(),
            binary: Vec::new(),
            mods: Vec::with_capacity(self.changes.len()),
            ptrs: None,
        };
        if self.changes.is_empty() {
            return Ok(rendered);
        }

        for change in &self.changes {
            let mut name = WideString::new(&change.attribute)?;
            let mod_type = name.as_mut_ptr();
            rendered.names.push(name);

            let mod_vals = match &change.values {
                ModValues::Text(values) => {
                    let mut array = to_native_string_array(values)?;
                    let modv_strvals = array.as_mut_ptr();
                    rendered.text.push(array);
                    LdapModValues { modv_strvals }
                }
                ModValues::Binary(values) => {
                    let mut array = NativeBervalArray::new(values.iter().map(Vec::as_slice));
                    let modv_bvals = array.as_mut_ptr();
                    rendered.binary.push(array);
                    LdapModValues { modv_bvals }
                }
            };

            rendered.mods.push(Box::new(LdapModW {
                mod_op: change.native_op(),
                mod_type,
                mod_vals,
            }));
        }

        let mut ptrs: Vec<*mut LdapModW> = rendered
            .mods
            .iter_mut()
            .map(|m| &mut **m as *mut LdapModW)
            .collect();
        ptrs.push(ptr::null_mut());
        rendered.ptrs = Some(ptrs);
        Ok(rendered)
    }
}

impl<'a> IntoIterator for &'a Changeset {
    type Item = &'a Modification;
    type IntoIter = std::slice::Iter<'a, Modification>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Modification> for Changeset {
    fn from_iter<T: IntoIterator<Item = Modification>>(iter: T) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

/// A changeset in native form.
///
/// Owns every buffer the descriptors point into; keep it alive until the
/// native call using [`RenderedChangeset::as_mut_ptr`] returns.
pub struct RenderedChangeset<'c> {
    names: Vec<WideString>,
    text: Vec<NativeStringArray>,
    binary: Vec<NativeBervalArray<'c>>,
    mods: Vec<Box<LdapModW>>,
    ptrs: Option<Vec<*mut LdapModW>>,
}

impl RenderedChangeset<'_> {
    /// Whether this is the null marker of an empty changeset.
    pub fn is_null(&self) -> bool {
        self.ptrs.is_none()
    }

    /// Number of array elements, terminator included; zero for the null
    /// marker.
    pub fn len(&self) -> usize {
        self.ptrs.as_ref().map_or(0, Vec::len)
    }

    /// Pointer to the descriptor array, null for an empty changeset.
    pub fn as_mut_ptr(&mut self) -> *mut *mut LdapModW {
        match &mut self.ptrs {
            Some(ptrs) => ptrs.as_mut_ptr(),
            None => ptr::null_mut(),
        }
    }

    /// Descriptor array, terminator included.
    pub fn as_slice(&self) -> &[*mut LdapModW] {
        self.ptrs.as_deref().unwrap_or(&[])
    }

    /// Total number of values across all descriptors.
    pub fn value_count(&self) -> usize {
        self.text.iter().map(NativeStringArray::value_count).sum::<usize>()
            + self
                .binary
                .iter()
                .map(NativeBervalArray::value_count)
                .sum::<usize>()
    }
}

impl std::fmt::Debug for RenderedChangeset<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ops: Vec<u32> = self.mods.iter().map(|m| m.mod_op).collect();
        f.debug_struct("RenderedChangeset")
            .field("null", &self.is_null())
            .field("attributes", &self.names.len())
            .field("ops", &ops)
            .field("values", &self.value_count())
            .finish()
    }
}
