//! # wldap
//!
//! Safe bindings to the Windows LDAP client library.
//!
//! This crate provides:
//! - Error classification of native return values into [`LdapError`]
//! - Marshaling of strings, string arrays and binary values to and from the
//!   native layouts ([`codec`])
//! - [`Changeset`], a modification list rendered to a native `LDAPModW` array
//! - [`Message`], a walker over search results that releases every native
//!   object it obtains exactly once
//! - [`Future`], a pollable handle on an asynchronous operation
//! - [`Ldap`], the connection object tying them together
//!
//! Every native call goes through a [`Wldap32Api`] gateway. Production code
//! binds `Wldap32.dll` with [`initialize`]; tests substitute the scripted
//! gateway from `wldap_testkit`.
//!
//! ## Example
//!
//! ```rust
//! use wldap::Ldap;
//! use wldap_sys::{LDAP_PORT, LDAP_SCOPE_SUBTREE};
//! use wldap_testkit::prelude::*;
//!
//! let mock = shared_mock();
//! mock.push_search_result(people());
//!
//! let ldap = Ldap::init(mock.clone(), None, LDAP_PORT).unwrap();
//! let message = ldap
//!     .search_s("dc=example,dc=com", LDAP_SCOPE_SUBTREE, "(objectClass=person)", ["cn"], false)
//!     .unwrap();
//! let entries = message.parse().unwrap();
//! assert_eq!(entries[0]["cn"], ["alice"]);
//! assert_eq!(entries[1]["cn"], ["bob"]);
//! ```

#![warn(missing_docs)]

mod changeset;
pub mod check;
pub mod codec;
mod config;
mod connection;
mod error;
mod future;
mod message;

pub use changeset::{Changeset, ModOp, ModValues, Modification, RenderedChangeset};
pub use config::LdapConfig;
pub use connection::Ldap;
pub use error::{LdapError, LdapResult};
pub use future::Future;
pub use message::{
    parse_binary_message, parse_message, Attribute, Attributes, BinaryEntry, BinaryValues, Entries,
    Entry, Message, TextEntry, Values,
};
pub use wldap_sys::Wldap32Api;

use std::rc::Rc;

/// Binds `Wldap32.dll` and returns it as a gateway for [`Ldap`].
///
/// The library is loaded once per process; later calls share it.
pub fn initialize() -> LdapResult<Rc<dyn Wldap32Api>> {
    let dll = wldap_sys::initialize()?;
    Ok(Rc::new(dll))
}
