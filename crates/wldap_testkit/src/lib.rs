//! # wldap testkit
//!
//! Test utilities for the Wldap32 bindings.
//!
//! This crate provides:
//! - [`MockWldap32`], a scripted in-memory gateway that hands out
//!   native-shaped memory and counts every release
//! - Scripted directory content ([`MockMessage`], [`MockEntry`], ...)
//! - Property-based test generators using proptest
//! - Fixtures for common scenarios
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wldap_testkit::prelude::*;
//!
//! let mock = shared_mock();
//! mock.push_search_result(people());
//! let ldap = Ldap::init(mock.clone(), None, LDAP_PORT)?;
//! let message = ldap.search_s("dc=example,dc=com", LDAP_SCOPE_SUBTREE, "(cn=*)", ["cn"], false)?;
//! assert_eq!(message.len()?, 2);
//! ```

#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mock;
pub mod script;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::mock::*;
    pub use crate::script::*;
}

pub use fixtures::*;
pub use generators::*;
pub use mock::{describe, MockCall, MockWldap32, RecordedMod, RecordedValues, ReleaseCounts};
pub use script::{MockAttribute, MockEntry, MockMessage, MockResult, MockValue};
