//! Protocol constants from `Winldap.h`.

/// Default LDAP port.
pub const LDAP_PORT: u32 = 389;
/// Default LDAP over SSL port.
pub const LDAP_SSL_PORT: u32 = 636;

// Search scopes.

/// Search the base object only.
pub const LDAP_SCOPE_BASE: u32 = 0x00;
/// Search the immediate children of the base object.
pub const LDAP_SCOPE_ONELEVEL: u32 = 0x01;
/// Search the base object and its whole subtree.
pub const LDAP_SCOPE_SUBTREE: u32 = 0x02;

// Authentication methods.

/// Simple (clear text) bind.
pub const LDAP_AUTH_SIMPLE: u32 = 0x80;
/// SASL bind.
pub const LDAP_AUTH_SASL: u32 = 0x83;
/// Base of the Microsoft specific methods.
pub const LDAP_AUTH_OTHERKIND: u32 = 0x86;
/// Sicily.
pub const LDAP_AUTH_SICILY: u32 = LDAP_AUTH_OTHERKIND | 0x0200;
/// MSN.
pub const LDAP_AUTH_MSN: u32 = LDAP_AUTH_OTHERKIND | 0x0800;
/// NTLM.
pub const LDAP_AUTH_NTLM: u32 = LDAP_AUTH_OTHERKIND | 0x1000;
/// DPA.
pub const LDAP_AUTH_DPA: u32 = LDAP_AUTH_OTHERKIND | 0x2000;
/// Negotiate (Kerberos or NTLM).
pub const LDAP_AUTH_NEGOTIATE: u32 = LDAP_AUTH_OTHERKIND | 0x0400;
/// Alias of [`LDAP_AUTH_NEGOTIATE`].
pub const LDAP_AUTH_SSPI: u32 = LDAP_AUTH_NEGOTIATE;
/// Digest.
pub const LDAP_AUTH_DIGEST: u32 = LDAP_AUTH_OTHERKIND | 0x4000;
/// External.
pub const LDAP_AUTH_EXTERNAL: u32 = LDAP_AUTH_OTHERKIND | 0x0020;

// Modification operations.

/// Add values to an attribute.
pub const LDAP_MOD_ADD: u32 = 0x00;
/// Delete values (or the whole attribute when no values are given).
pub const LDAP_MOD_DELETE: u32 = 0x01;
/// Replace all values of an attribute.
pub const LDAP_MOD_REPLACE: u32 = 0x02;
/// Flag: `mod_vals` holds bervals rather than strings.
pub const LDAP_MOD_BVALUES: u32 = 0x80;

// ldap_result `all` argument.

/// Retrieve a single message.
pub const LDAP_MSG_ONE: u32 = 0x00;
/// Retrieve all messages of the operation.
pub const LDAP_MSG_ALL: u32 = 0x01;
/// Retrieve all messages received so far.
pub const LDAP_MSG_RECEIVED: u32 = 0x02;

// Message types returned by ldap_result.

/// Bind response.
pub const LDAP_RES_BIND: u32 = 0x61;
/// Search entry.
pub const LDAP_RES_SEARCH_ENTRY: u32 = 0x64;
/// Search reference.
pub const LDAP_RES_REFERRAL: u32 = 0x73;
/// Search done.
pub const LDAP_RES_SEARCH_RESULT: u32 = 0x65;
/// Modify response.
pub const LDAP_RES_MODIFY: u32 = 0x67;
/// Add response.
pub const LDAP_RES_ADD: u32 = 0x69;
/// Delete response.
pub const LDAP_RES_DELETE: u32 = 0x6b;
/// Modify DN response.
pub const LDAP_RES_MODRDN: u32 = 0x6d;
/// Compare response.
pub const LDAP_RES_COMPARE: u32 = 0x6f;
/// Extended operation response.
pub const LDAP_RES_EXTENDED: u32 = 0x78;

// Options.

/// Turn a boolean option on.
pub const LDAP_OPT_ON: usize = 1;
/// Turn a boolean option off.
pub const LDAP_OPT_OFF: usize = 0;

/// API information.
pub const LDAP_OPT_API_INFO: i32 = 0x00;
/// Alias dereferencing.
pub const LDAP_OPT_DEREF: i32 = 0x02;
/// Size limit for searches.
pub const LDAP_OPT_SIZELIMIT: i32 = 0x03;
/// Time limit for searches.
pub const LDAP_OPT_TIMELIMIT: i32 = 0x04;
/// Referral chasing.
pub const LDAP_OPT_REFERRALS: i32 = 0x08;
/// SSL.
pub const LDAP_OPT_SSL: i32 = 0x0A;
/// Referral hop limit.
pub const LDAP_OPT_REFERRAL_HOP_LIMIT: i32 = 0x10;
/// Protocol version.
pub const LDAP_OPT_PROTOCOL_VERSION: i32 = 0x11;
/// Alias of [`LDAP_OPT_PROTOCOL_VERSION`].
pub const LDAP_OPT_VERSION: i32 = 0x11;
/// Host name.
pub const LDAP_OPT_HOST_NAME: i32 = 0x30;
/// Last error number.
pub const LDAP_OPT_ERROR_NUMBER: i32 = 0x31;
/// Last error string.
pub const LDAP_OPT_ERROR_STRING: i32 = 0x32;
/// Server error string.
pub const LDAP_OPT_SERVER_ERROR: i32 = 0x33;
/// Server extended error.
pub const LDAP_OPT_SERVER_EXT_ERROR: i32 = 0x34;
/// Keep-alive ping interval.
pub const LDAP_OPT_PING_KEEP_ALIVE: i32 = 0x36;
/// Keep-alive ping wait time.
pub const LDAP_OPT_PING_WAIT_TIME: i32 = 0x37;
/// Keep-alive ping limit.
pub const LDAP_OPT_PING_LIMIT: i32 = 0x38;
/// DNS domain name.
pub const LDAP_OPT_DNSDOMAIN_NAME: i32 = 0x3B;
/// Host reachability.
pub const LDAP_OPT_HOST_REACHABLE: i32 = 0x3E;
/// Credentials prompt.
pub const LDAP_OPT_PROMPT_CREDENTIALS: i32 = 0x3F;
/// TCP keep-alive.
pub const LDAP_OPT_TCP_KEEPALIVE: i32 = 0x40;
/// Fast concurrent bind.
pub const LDAP_OPT_FAST_CONCURRENT_BIND: i32 = 0x41;
/// Send timeout.
pub const LDAP_OPT_SEND_TIMEOUT: i32 = 0x42;
/// Automatic reconnection.
pub const LDAP_OPT_AUTO_RECONNECT: i32 = 0x91;
/// SSPI flags.
pub const LDAP_OPT_SSPI_FLAGS: i32 = 0x92;
/// Signing.
pub const LDAP_OPT_SIGN: i32 = 0x95;
/// Encryption (sealing).
pub const LDAP_OPT_ENCRYPT: i32 = 0x96;

// Return codes.

/// Success.
pub const LDAP_SUCCESS: u32 = 0x00;
/// Operations error.
pub const LDAP_OPERATIONS_ERROR: u32 = 0x01;
/// Protocol error.
pub const LDAP_PROTOCOL_ERROR: u32 = 0x02;
/// Time limit exceeded.
pub const LDAP_TIMELIMIT_EXCEEDED: u32 = 0x03;
/// Size limit exceeded.
pub const LDAP_SIZELIMIT_EXCEEDED: u32 = 0x04;
/// Compare evaluated to false.
pub const LDAP_COMPARE_FALSE: u32 = 0x05;
/// Compare evaluated to true.
pub const LDAP_COMPARE_TRUE: u32 = 0x06;
/// Authentication method not supported.
pub const LDAP_AUTH_METHOD_NOT_SUPPORTED: u32 = 0x07;
/// Strong authentication required.
pub const LDAP_STRONG_AUTH_REQUIRED: u32 = 0x08;
/// Partial results (LDAPv2 referral).
pub const LDAP_PARTIAL_RESULTS: u32 = 0x09;
/// Alias of [`LDAP_PARTIAL_RESULTS`].
pub const LDAP_REFERRAL_V2: u32 = 0x09;
/// Referral.
pub const LDAP_REFERRAL: u32 = 0x0a;
/// Administrative limit exceeded.
pub const LDAP_ADMIN_LIMIT_EXCEEDED: u32 = 0x0b;
/// Critical extension unavailable.
pub const LDAP_UNAVAILABLE_CRIT_EXTENSION: u32 = 0x0c;
/// Confidentiality required.
pub const LDAP_CONFIDENTIALITY_REQUIRED: u32 = 0x0d;
/// No such attribute.
pub const LDAP_NO_SUCH_ATTRIBUTE: u32 = 0x10;
/// Undefined attribute type.
pub const LDAP_UNDEFINED_TYPE: u32 = 0x11;
/// Inappropriate matching.
pub const LDAP_INAPPROPRIATE_MATCHING: u32 = 0x12;
/// Constraint violation.
pub const LDAP_CONSTRAINT_VIOLATION: u32 = 0x13;
/// Attribute or value already exists.
pub const LDAP_ATTRIBUTE_OR_VALUE_EXISTS: u32 = 0x14;
/// Invalid attribute syntax.
pub const LDAP_INVALID_SYNTAX: u32 = 0x15;
/// No such object.
pub const LDAP_NO_SUCH_OBJECT: u32 = 0x20;
/// Alias problem.
pub const LDAP_ALIAS_PROBLEM: u32 = 0x21;
/// Invalid DN syntax.
pub const LDAP_INVALID_DN_SYNTAX: u32 = 0x22;
/// Object is a leaf.
pub const LDAP_IS_LEAF: u32 = 0x23;
/// Alias dereferencing problem.
pub const LDAP_ALIAS_DEREF_PROBLEM: u32 = 0x24;
/// Inappropriate authentication.
pub const LDAP_INAPPROPRIATE_AUTH: u32 = 0x30;
/// Invalid credentials.
pub const LDAP_INVALID_CREDENTIALS: u32 = 0x31;
/// Insufficient access rights.
pub const LDAP_INSUFFICIENT_RIGHTS: u32 = 0x32;
/// Server busy.
pub const LDAP_BUSY: u32 = 0x33;
/// Server unavailable.
pub const LDAP_UNAVAILABLE: u32 = 0x34;
/// Server unwilling to perform.
pub const LDAP_UNWILLING_TO_PERFORM: u32 = 0x35;
/// Loop detected.
pub const LDAP_LOOP_DETECT: u32 = 0x36;
/// Naming violation.
pub const LDAP_NAMING_VIOLATION: u32 = 0x40;
/// Object class violation.
pub const LDAP_OBJECT_CLASS_VIOLATION: u32 = 0x41;
/// Operation not allowed on a non-leaf.
pub const LDAP_NOT_ALLOWED_ON_NONLEAF: u32 = 0x42;
/// Operation not allowed on an RDN.
pub const LDAP_NOT_ALLOWED_ON_RDN: u32 = 0x43;
/// Entry already exists.
pub const LDAP_ALREADY_EXISTS: u32 = 0x44;
/// Object class modifications prohibited.
pub const LDAP_NO_OBJECT_CLASS_MODS: u32 = 0x45;
/// Results too large.
pub const LDAP_RESULTS_TOO_LARGE: u32 = 0x46;
/// Affects multiple DSAs.
pub const LDAP_AFFECTS_MULTIPLE_DSAS: u32 = 0x47;
/// Virtual list view error.
pub const LDAP_VIRTUAL_LIST_VIEW_ERROR: u32 = 0x4c;
/// Other.
pub const LDAP_OTHER: u32 = 0x50;
/// Server down.
pub const LDAP_SERVER_DOWN: u32 = 0x51;
/// Local error.
pub const LDAP_LOCAL_ERROR: u32 = 0x52;
/// Encoding error.
pub const LDAP_ENCODING_ERROR: u32 = 0x53;
/// Decoding error.
pub const LDAP_DECODING_ERROR: u32 = 0x54;
/// Timeout.
pub const LDAP_TIMEOUT: u32 = 0x55;
/// Unknown authentication method.
pub const LDAP_AUTH_UNKNOWN: u32 = 0x56;
/// Filter error.
pub const LDAP_FILTER_ERROR: u32 = 0x57;
/// Cancelled by user.
pub const LDAP_USER_CANCELLED: u32 = 0x58;
/// Bad parameter.
pub const LDAP_PARAM_ERROR: u32 = 0x59;
/// Out of memory.
pub const LDAP_NO_MEMORY: u32 = 0x5a;
/// Connection error.
pub const LDAP_CONNECT_ERROR: u32 = 0x5b;
/// Not supported.
pub const LDAP_NOT_SUPPORTED: u32 = 0x5c;
/// Control not found.
pub const LDAP_CONTROL_NOT_FOUND: u32 = 0x5d;
/// No results returned.
pub const LDAP_NO_RESULTS_RETURNED: u32 = 0x5e;
/// More results to return.
pub const LDAP_MORE_RESULTS_TO_RETURN: u32 = 0x5f;
/// Client loop.
pub const LDAP_CLIENT_LOOP: u32 = 0x60;
/// Referral limit exceeded.
pub const LDAP_REFERRAL_LIMIT_EXCEEDED: u32 = 0x61;

/// `(ULONG)-1`, the failure sentinel of asynchronous calls and `ldap_result`.
pub const LDAP_SENTINEL: u32 = u32::MAX;
