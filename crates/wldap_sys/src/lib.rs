//! # wldap-sys
//!
//! Raw boundary with the Windows LDAP client library (`Wldap32.dll`).
//!
//! This crate provides:
//! - Opaque handle types and `#[repr(C)]` structures from `Winldap.h`
//! - The protocol constant catalogue
//! - [`Wldap32Api`], one method per native primitive
//! - [`Wldap32Dll`], the dynamically bound implementation, and its one-time
//!   [`initialize`]
//!
//! Nothing here classifies errors or manages native memory; the `wldap`
//! crate does that on top of [`Wldap32Api`].

#![warn(missing_docs)]

mod api;
pub mod constants;
mod dll;
mod error;
mod types;

pub use api::Wldap32Api;
pub use constants::*;
pub use dll::{initialize, is_initialized, Wldap32Dll, LIBRARY_NAME};
pub use error::{LoadError, LoadResult};
pub use types::{
    BerElement, Ldap, LdapBerval, LdapMessage, LdapModValues, LdapModW, LdapTimeval, WChar,
};
