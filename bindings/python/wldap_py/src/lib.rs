//! Python bindings for wldap.
//!
//! This crate provides Python bindings using PyO3. Every object here wraps
//! native handles owned by the calling thread, so the classes are
//! `unsendable`.

use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict, PyTuple};
use std::rc::Rc;
use std::time::Duration;
use wldap_core::{
    Attribute as CoreAttribute, Attributes, Changeset as CoreChangeset, Entries,
    Entry as CoreEntry, Future as CoreFuture, Ldap as CoreLdap, LdapError as CoreError,
    Message as CoreMessage, TextEntry,
};
use wldap_sys as sys;

/// Library version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

create_exception!(wldap, Error, PyException, "Base exception type for the wldap package.");
create_exception!(wldap, LdapError, Error, "A Wldap32 call failed; args are (description, code).");
create_exception!(wldap, TimeoutError, Error, "No outcome arrived within the requested timeout.");

fn to_py_err(err: CoreError) -> PyErr {
    match err {
        CoreError::Directory { code, description } => LdapError::new_err((description, code)),
        CoreError::Timeout => TimeoutError::new_err("operation timed out"),
        CoreError::InvalidArgument { message } => PyValueError::new_err(message),
        CoreError::Load { message } => Error::new_err(message),
    }
}

fn to_timeout(seconds: Option<f64>) -> PyResult<Option<Duration>> {
    seconds
        .map(|s| {
            Duration::try_from_secs_f64(s)
                .map_err(|e| PyValueError::new_err(format!("invalid timeout {s}: {e}")))
        })
        .transpose()
}

/// An ordered list of modifications for `add` and `modify`.
///
/// Every mutator returns the changeset, so calls chain:
/// `Changeset().add("cn", ["x"]).replace_binary("jpegPhoto", [b"..."])`.
#[pyclass(name = "Changeset")]
#[derive(Clone, Default)]
pub struct Changeset {
    inner: CoreChangeset,
}

#[pymethods]
impl Changeset {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    /// Adds text values to an attribute.
    fn add<'py>(
        mut slf: PyRefMut<'py, Self>,
        attr: &str,
        values: Vec<String>,
    ) -> PyRefMut<'py, Self> {
        slf.inner.add(attr, values);
        slf
    }

    /// Adds binary values to an attribute.
    fn add_binary<'py>(
        mut slf: PyRefMut<'py, Self>,
        attr: &str,
        values: Vec<Vec<u8>>,
    ) -> PyRefMut<'py, Self> {
        slf.inner.add_binary(attr, values);
        slf
    }

    /// Deletes text values from an attribute.
    fn delete<'py>(
        mut slf: PyRefMut<'py, Self>,
        attr: &str,
        values: Vec<String>,
    ) -> PyRefMut<'py, Self> {
        slf.inner.delete(attr, values);
        slf
    }

    /// Deletes binary values from an attribute.
    fn delete_binary<'py>(
        mut slf: PyRefMut<'py, Self>,
        attr: &str,
        values: Vec<Vec<u8>>,
    ) -> PyRefMut<'py, Self> {
        slf.inner.delete_binary(attr, values);
        slf
    }

    /// Deletes an attribute with all its values.
    fn delete_attribute<'py>(mut slf: PyRefMut<'py, Self>, attr: &str) -> PyRefMut<'py, Self> {
        slf.inner.delete_attribute(attr);
        slf
    }

    /// Replaces an attribute's values with text values.
    fn replace<'py>(
        mut slf: PyRefMut<'py, Self>,
        attr: &str,
        values: Vec<String>,
    ) -> PyRefMut<'py, Self> {
        slf.inner.replace(attr, values);
        slf
    }

    /// Replaces an attribute's values with binary values.
    fn replace_binary<'py>(
        mut slf: PyRefMut<'py, Self>,
        attr: &str,
        values: Vec<Vec<u8>>,
    ) -> PyRefMut<'py, Self> {
        slf.inner.replace_binary(attr, values);
        slf
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!("Changeset({} modifications)", self.inner.len())
    }
}

// The walker views below borrow from a `CoreMessage`. Each one stores the
// borrow with its lifetime extended to `'static` next to an `Rc` of that
// message; the borrow is declared first so it is dropped first, and the heap
// address behind the `Rc` never moves.

/// Lazy iterator over the entries of a `Message`.
#[pyclass(unsendable)]
pub struct EntryIterator {
    inner: Entries<'static>,
    message: Rc<CoreMessage>,
}

impl EntryIterator {
    fn new(message: &Rc<CoreMessage>) -> PyResult<Self> {
        let entries = message.entries().map_err(to_py_err)?;
        // Safety: `message` is kept alive in the same struct and outlives
        // `inner`.
        let inner = unsafe { std::mem::transmute::<Entries<'_>, Entries<'static>>(entries) };
        Ok(Self {
            inner,
            message: Rc::clone(message),
        })
    }
}

#[pymethods]
impl EntryIterator {
    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(&mut self) -> PyResult<Option<Entry>> {
        match self.inner.next() {
            Some(entry) => Ok(Some(Entry {
                inner: entry.map_err(to_py_err)?,
                message: Rc::clone(&self.message),
            })),
            None => Ok(None),
        }
    }
}

/// One entry of a `Message`.
///
/// `entry[name]` looks an attribute up without a native call; iterating
/// walks the attributes the server returned.
#[pyclass(unsendable)]
pub struct Entry {
    inner: CoreEntry<'static>,
    message: Rc<CoreMessage>,
}

#[pymethods]
impl Entry {
    /// Distinguished name.
    #[getter]
    fn dn(&self) -> PyResult<String> {
        self.inner.dn().map_err(to_py_err)
    }

    fn __getitem__(&self, name: &str) -> Attribute {
        Attribute {
            inner: self.inner.attribute(name),
            _message: Rc::clone(&self.message),
        }
    }

    fn __iter__(&self) -> PyResult<AttributeIterator> {
        let attributes = self.inner.attributes().map_err(to_py_err)?;
        Ok(AttributeIterator {
            inner: attributes,
            message: Rc::clone(&self.message),
        })
    }

    /// Text values of every attribute.
    fn to_dict(&self) -> PyResult<TextEntry> {
        let mut out = TextEntry::new();
        for attribute in self.inner.attributes().map_err(to_py_err)? {
            let attribute = attribute.map_err(to_py_err)?;
            let values = attribute.values().map_err(to_py_err)?.collect();
            out.insert(attribute.name().to_owned(), values);
        }
        Ok(out)
    }

    fn __repr__(&self) -> String {
        match self.inner.dn() {
            Ok(dn) => format!("Entry({dn:?})"),
            Err(_) => "Entry(<unknown dn>)".to_owned(),
        }
    }
}

/// Lazy iterator over the attributes of an `Entry`.
///
/// The native attribute cursor is released when the walk ends or the
/// iterator is collected.
#[pyclass(unsendable)]
pub struct AttributeIterator {
    inner: Attributes<'static>,
    message: Rc<CoreMessage>,
}

#[pymethods]
impl AttributeIterator {
    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(&mut self) -> PyResult<Option<Attribute>> {
        match self.inner.next() {
            Some(attribute) => Ok(Some(Attribute {
                inner: attribute.map_err(to_py_err)?,
                _message: Rc::clone(&self.message),
            })),
            None => Ok(None),
        }
    }
}

/// A named attribute of an `Entry`.
#[pyclass(unsendable)]
pub struct Attribute {
    inner: CoreAttribute<'static>,
    _message: Rc<CoreMessage>,
}

#[pymethods]
impl Attribute {
    #[getter]
    fn name(&self) -> &str {
        self.inner.name()
    }

    /// Text values. Raises `LdapError` if the entry lacks the attribute.
    fn values(&self) -> PyResult<Vec<String>> {
        Ok(self.inner.values().map_err(to_py_err)?.collect())
    }

    /// Values as `bytes`, cut to their declared lengths.
    fn binary_values<'py>(&self, py: Python<'py>) -> PyResult<Vec<Bound<'py, PyBytes>>> {
        let values = self.inner.binary_values().map_err(to_py_err)?;
        Ok(values.map(|v| PyBytes::new(py, &v)).collect())
    }

    fn __repr__(&self) -> String {
        format!("Attribute({:?})", self.inner.name())
    }
}

/// A search result, or the answer to an asynchronous operation.
///
/// Iterating yields `Entry` views, fetched one at a time.
#[pyclass(unsendable)]
pub struct Message {
    inner: Rc<CoreMessage>,
}

#[pymethods]
impl Message {
    fn __len__(&self) -> PyResult<usize> {
        self.inner.len().map_err(to_py_err)
    }

    fn __iter__(&self) -> PyResult<EntryIterator> {
        EntryIterator::new(&self.inner)
    }

    /// Distinguished names of every entry, in order.
    fn dns(&self) -> PyResult<Vec<String>> {
        let mut dns = Vec::new();
        for entry in self.inner.entries().map_err(to_py_err)? {
            dns.push(entry.and_then(|e| e.dn()).map_err(to_py_err)?);
        }
        Ok(dns)
    }

    /// Result code of the operation this message answers.
    #[getter]
    fn result_code(&self) -> u32 {
        self.inner.result_code()
    }

    /// Raises `LdapError` unless the operation succeeded.
    fn check(&self) -> PyResult<()> {
        self.inner.check().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!("Message(result_code={:#04x})", self.inner.result_code())
    }
}

/// A pending asynchronous operation, loosely following PEP 3148.
///
/// Timeouts are in seconds; `None` blocks until an outcome arrives.
#[pyclass(unsendable)]
pub struct Future {
    inner: CoreFuture,
}

#[pymethods]
impl Future {
    /// Message id of the operation.
    #[getter]
    fn msgid(&self) -> u32 {
        self.inner.msgid()
    }

    /// Requests abandonment; returns whether the library accepted it.
    fn cancel(&mut self) -> bool {
        self.inner.cancel()
    }

    /// Outcome of the last `cancel()`.
    fn cancelled(&self) -> bool {
        self.inner.cancelled()
    }

    /// The result message. Raises `TimeoutError` or the operation's failure.
    #[pyo3(signature = (timeout_seconds=None))]
    fn result(&mut self, timeout_seconds: Option<f64>) -> PyResult<Message> {
        let timeout = to_timeout(timeout_seconds)?;
        let inner = self.inner.result(timeout).map_err(to_py_err)?;
        Ok(Message { inner })
    }

    /// The operation's failure, or `None` if it completed.
    #[pyo3(signature = (timeout_seconds=None))]
    fn exception(
        &mut self,
        py: Python<'_>,
        timeout_seconds: Option<f64>,
    ) -> PyResult<Option<PyObject>> {
        let timeout = to_timeout(timeout_seconds)?;
        let failure = self.inner.exception(timeout).map_err(to_py_err)?;
        Ok(failure.map(|err| to_py_err(err).value(py).clone().into_any().unbind()))
    }

    /// Whether an outcome is known.
    fn done(&mut self) -> bool {
        self.inner.done()
    }

    /// Always `False`.
    fn running(&self) -> bool {
        self.inner.running()
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.inner)
    }
}

/// A connection to a directory server.
#[pyclass(unsendable, name = "Ldap")]
pub struct Ldap {
    inner: Option<CoreLdap>,
}

impl Ldap {
    fn conn(&self) -> PyResult<&CoreLdap> {
        self.inner
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("connection already unbound"))
    }
}

#[pymethods]
impl Ldap {
    /// Allocates a connection handle. `host=None` selects the default server.
    #[new]
    #[pyo3(signature = (host=None, port=sys::LDAP_PORT))]
    fn new(host: Option<&str>, port: u32) -> PyResult<Self> {
        let api = wldap_core::initialize().map_err(to_py_err)?;
        let inner = CoreLdap::init(api, host, port).map_err(to_py_err)?;
        Ok(Self { inner: Some(inner) })
    }

    fn abandon(&self, msgid: u32) -> PyResult<()> {
        self.conn()?.abandon(msgid).map_err(to_py_err)
    }

    /// Synchronous add; `attributes` are `(attribute, values)` pairs.
    #[pyo3(signature = (dn, *attributes))]
    fn add_s(&self, dn: &str, attributes: &Bound<'_, PyTuple>) -> PyResult<()> {
        let pairs: Vec<(String, Vec<String>)> = attributes.extract()?;
        self.conn()?
            .add_attributes_s(dn, pairs.iter().map(|(a, v)| (a.as_str(), v.clone())))
            .map_err(to_py_err)
    }

    /// Asynchronous add; `attributes` are `(attribute, values)` pairs.
    #[pyo3(signature = (dn, *attributes))]
    fn add(&self, dn: &str, attributes: &Bound<'_, PyTuple>) -> PyResult<Future> {
        let pairs: Vec<(String, Vec<String>)> = attributes.extract()?;
        let inner = self
            .conn()?
            .add_attributes(dn, pairs.iter().map(|(a, v)| (a.as_str(), v.clone())))
            .map_err(to_py_err)?;
        Ok(Future { inner })
    }

    #[pyo3(signature = (dn, cred, method=sys::LDAP_AUTH_SIMPLE))]
    fn bind_s(&self, dn: Option<&str>, cred: Option<&str>, method: u32) -> PyResult<()> {
        self.conn()?.bind_s(dn, cred, method).map_err(to_py_err)
    }

    #[pyo3(signature = (dn, cred, method=sys::LDAP_AUTH_SIMPLE))]
    fn bind(&self, dn: Option<&str>, cred: Option<&str>, method: u32) -> PyResult<Future> {
        let inner = self.conn()?.bind(dn, cred, method).map_err(to_py_err)?;
        Ok(Future { inner })
    }

    fn check_filter(&self, search_filter: &str) -> PyResult<()> {
        self.conn()?.check_filter(search_filter).map_err(to_py_err)
    }

    #[pyo3(signature = (timeout_seconds=None))]
    fn connect(&self, timeout_seconds: Option<f64>) -> PyResult<()> {
        let timeout = to_timeout(timeout_seconds)?;
        self.conn()?.connect(timeout).map_err(to_py_err)
    }

    fn set_option(&self, option: i32, value: u32) -> PyResult<()> {
        self.conn()?.set_option(option, value).map_err(to_py_err)
    }

    fn get_option(&self, option: i32) -> PyResult<u32> {
        self.conn()?.get_option(option).map_err(to_py_err)
    }

    fn delete_s(&self, dn: &str) -> PyResult<()> {
        self.conn()?.delete_s(dn).map_err(to_py_err)
    }

    fn delete(&self, dn: &str) -> PyResult<Future> {
        let inner = self.conn()?.delete(dn).map_err(to_py_err)?;
        Ok(Future { inner })
    }

    fn modify_s(&self, dn: &str, changeset: &Changeset) -> PyResult<()> {
        self.conn()?.modify_s(dn, &changeset.inner).map_err(to_py_err)
    }

    fn modify(&self, dn: &str, changeset: &Changeset) -> PyResult<Future> {
        let inner = self
            .conn()?
            .modify(dn, &changeset.inner)
            .map_err(to_py_err)?;
        Ok(Future { inner })
    }

    fn compare_s(&self, dn: &str, attr: &str, value: &str) -> PyResult<bool> {
        self.conn()?.compare_s(dn, attr, value).map_err(to_py_err)
    }

    fn compare(&self, dn: &str, attr: &str, value: &str) -> PyResult<Future> {
        let inner = self.conn()?.compare(dn, attr, value).map_err(to_py_err)?;
        Ok(Future { inner })
    }

    #[pyo3(signature = (base, scope, filt, attr=Vec::new(), attronly=false))]
    fn search_s(
        &self,
        base: &str,
        scope: u32,
        filt: &str,
        attr: Vec<String>,
        attronly: bool,
    ) -> PyResult<Message> {
        let message = self
            .conn()?
            .search_s(base, scope, filt, attr, attronly)
            .map_err(to_py_err)?;
        Ok(Message {
            inner: Rc::new(message),
        })
    }

    #[pyo3(signature = (base, scope, filt, attr=Vec::new(), attronly=false))]
    fn search(
        &self,
        base: &str,
        scope: u32,
        filt: &str,
        attr: Vec<String>,
        attronly: bool,
    ) -> PyResult<Future> {
        let inner = self
            .conn()?
            .search(base, scope, filt, attr, attronly)
            .map_err(to_py_err)?;
        Ok(Future { inner })
    }

    fn simple_bind_s(&self, dn: Option<&str>, passwd: Option<&str>) -> PyResult<()> {
        self.conn()?.simple_bind_s(dn, passwd).map_err(to_py_err)
    }

    fn simple_bind(&self, dn: Option<&str>, passwd: Option<&str>) -> PyResult<Future> {
        let inner = self.conn()?.simple_bind(dn, passwd).map_err(to_py_err)?;
        Ok(Future { inner })
    }

    /// Waits for a result of `msgid`; `None` if the timeout elapsed.
    #[pyo3(signature = (msgid, all=sys::LDAP_MSG_ALL, timeout_seconds=None))]
    fn result(
        &self,
        msgid: u32,
        all: u32,
        timeout_seconds: Option<f64>,
    ) -> PyResult<Option<Message>> {
        let timeout = to_timeout(timeout_seconds)?;
        let message = self
            .conn()?
            .result(msgid, all, timeout)
            .map_err(to_py_err)?;
        Ok(message.map(|m| Message { inner: Rc::new(m) }))
    }

    /// Releases the connection. Outstanding messages and futures keep the
    /// handle alive until they are collected.
    fn unbind(&mut self) -> PyResult<()> {
        match self.inner.take() {
            Some(inner) => inner.unbind().map_err(to_py_err),
            None => Ok(()),
        }
    }

    fn unbind_s(&mut self) -> PyResult<()> {
        self.unbind()
    }

    /// Whether the connection has not been unbound.
    #[getter]
    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    #[pyo3(signature = (_exc_type=None, _exc_val=None, _exc_tb=None))]
    fn __exit__(
        &mut self,
        _exc_type: Option<PyObject>,
        _exc_val: Option<PyObject>,
        _exc_tb: Option<PyObject>,
    ) -> PyResult<bool> {
        self.unbind()?;
        Ok(false)
    }
}

/// One `dict` per entry, attribute name to text values.
#[pyfunction]
fn parse_message(message: &Message) -> PyResult<Vec<TextEntry>> {
    message.inner.parse().map_err(to_py_err)
}

/// One `dict` per entry, attribute name to `bytes` values.
#[pyfunction]
fn parse_binary_message<'py>(
    py: Python<'py>,
    message: &Message,
) -> PyResult<Vec<Bound<'py, PyDict>>> {
    let entries = message.inner.parse_binary().map_err(to_py_err)?;
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let dict = PyDict::new(py);
        for (name, values) in entry {
            let values: Vec<Bound<'py, PyBytes>> =
                values.iter().map(|v| PyBytes::new(py, v)).collect();
            dict.set_item(name, values)?;
        }
        out.push(dict);
    }
    Ok(out)
}

/// Returns the wldap library version.
#[pyfunction]
fn version() -> &'static str {
    VERSION
}

const U32_CONSTANTS: &[(&str, u32)] = &[
    ("LDAP_PORT", sys::LDAP_PORT),
    ("LDAP_SSL_PORT", sys::LDAP_SSL_PORT),
    ("LDAP_SCOPE_BASE", sys::LDAP_SCOPE_BASE),
    ("LDAP_SCOPE_ONELEVEL", sys::LDAP_SCOPE_ONELEVEL),
    ("LDAP_SCOPE_SUBTREE", sys::LDAP_SCOPE_SUBTREE),
    ("LDAP_AUTH_SIMPLE", sys::LDAP_AUTH_SIMPLE),
    ("LDAP_AUTH_SASL", sys::LDAP_AUTH_SASL),
    ("LDAP_AUTH_NTLM", sys::LDAP_AUTH_NTLM),
    ("LDAP_AUTH_NEGOTIATE", sys::LDAP_AUTH_NEGOTIATE),
    ("LDAP_AUTH_DIGEST", sys::LDAP_AUTH_DIGEST),
    ("LDAP_MSG_ONE", sys::LDAP_MSG_ONE),
    ("LDAP_MSG_ALL", sys::LDAP_MSG_ALL),
    ("LDAP_MSG_RECEIVED", sys::LDAP_MSG_RECEIVED),
    ("LDAP_SUCCESS", sys::LDAP_SUCCESS),
    ("LDAP_COMPARE_FALSE", sys::LDAP_COMPARE_FALSE),
    ("LDAP_COMPARE_TRUE", sys::LDAP_COMPARE_TRUE),
    ("LDAP_NO_SUCH_ATTRIBUTE", sys::LDAP_NO_SUCH_ATTRIBUTE),
    ("LDAP_NO_SUCH_OBJECT", sys::LDAP_NO_SUCH_OBJECT),
    ("LDAP_INVALID_CREDENTIALS", sys::LDAP_INVALID_CREDENTIALS),
    ("LDAP_INSUFFICIENT_RIGHTS", sys::LDAP_INSUFFICIENT_RIGHTS),
    ("LDAP_ALREADY_EXISTS", sys::LDAP_ALREADY_EXISTS),
    ("LDAP_SERVER_DOWN", sys::LDAP_SERVER_DOWN),
    ("LDAP_TIMEOUT", sys::LDAP_TIMEOUT),
    ("LDAP_FILTER_ERROR", sys::LDAP_FILTER_ERROR),
    ("LDAP_PARAM_ERROR", sys::LDAP_PARAM_ERROR),
    ("LDAP_CONNECT_ERROR", sys::LDAP_CONNECT_ERROR),
];

const OPTION_CONSTANTS: &[(&str, i32)] = &[
    ("LDAP_OPT_DEREF", sys::LDAP_OPT_DEREF),
    ("LDAP_OPT_SIZELIMIT", sys::LDAP_OPT_SIZELIMIT),
    ("LDAP_OPT_TIMELIMIT", sys::LDAP_OPT_TIMELIMIT),
    ("LDAP_OPT_REFERRALS", sys::LDAP_OPT_REFERRALS),
    ("LDAP_OPT_PROTOCOL_VERSION", sys::LDAP_OPT_PROTOCOL_VERSION),
    ("LDAP_OPT_SIGN", sys::LDAP_OPT_SIGN),
    ("LDAP_OPT_ENCRYPT", sys::LDAP_OPT_ENCRYPT),
];

/// Python module initialization.
#[pymodule]
fn wldap(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add_class::<Ldap>()?;
    m.add_class::<Changeset>()?;
    m.add_class::<Message>()?;
    m.add_class::<Future>()?;
    m.add_class::<EntryIterator>()?;
    m.add_class::<Entry>()?;
    m.add_class::<AttributeIterator>()?;
    m.add_class::<Attribute>()?;
    m.add("Error", py.get_type::<Error>())?;
    m.add("LdapError", py.get_type::<LdapError>())?;
    m.add("TimeoutError", py.get_type::<TimeoutError>())?;
    m.add_function(wrap_pyfunction!(parse_message, m)?)?;
    m.add_function(wrap_pyfunction!(parse_binary_message, m)?)?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    for (name, value) in U32_CONSTANTS {
        m.add(*name, *value)?;
    }
    for (name, value) in OPTION_CONSTANTS {
        m.add(*name, *value)?;
    }
    Ok(())
}
