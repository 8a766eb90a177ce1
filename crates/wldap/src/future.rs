//! Asynchronous operations.
//!
//! The library has no completion notification: an issued operation is only
//! observed by polling `ldap_result` for its message id. [`Future`] does that
//! polling on demand and memoizes the first outcome it sees.
//!
//! A result message whose code is not a success code for the operation is a
//! failure: the message is released and its code is kept as the outcome.

use crate::check;
use crate::connection::{fetch_result, Session};
use crate::error::{LdapError, LdapResult};
use crate::message::Message;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;
use wldap_sys::{LDAP_COMPARE_FALSE, LDAP_COMPARE_TRUE, LDAP_MSG_ALL, LDAP_SUCCESS};

/// Result codes that complete an ordinary operation.
pub(crate) const OPERATION_SUCCESS: &[u32] = &[LDAP_SUCCESS];

/// Result codes that complete a compare.
pub(crate) const COMPARE_SUCCESS: &[u32] = &[LDAP_COMPARE_TRUE, LDAP_COMPARE_FALSE];

enum Outcome {
    Pending,
    Completed(Rc<Message>),
    Failed(LdapError),
}

/// A pending asynchronous operation.
///
/// Timeouts are `None` to block until an outcome arrives, `Some(ZERO)` for a
/// non-blocking peek, or a bounded wait.
///
/// Once an outcome (a result message or a failure) is observed it is kept and
/// returned by every later call without polling again. A timeout is not an
/// outcome; the future stays pending.
pub struct Future {
    session: Rc<Session>,
    msgid: u32,
    accepted: &'static [u32],
    cancelled: bool,
    outcome: Outcome,
}

impl Future {
    pub(crate) fn new(session: Rc<Session>, msgid: u32, accepted: &'static [u32]) -> Self {
        Self {
            session,
            msgid,
            accepted,
            cancelled: false,
            outcome: Outcome::Pending,
        }
    }

    /// Message id of the operation.
    pub fn msgid(&self) -> u32 {
        self.msgid
    }

    /// Requests abandonment of the operation.
    ///
    /// Returns whether the library accepted the request. Abandonment is best
    /// effort: a result may still arrive afterwards, and a memoized outcome
    /// is left as is.
    pub fn cancel(&mut self) -> bool {
        self.cancelled = self.session.abandon(self.msgid).is_ok();
        debug!(msgid = self.msgid, cancelled = self.cancelled, "cancel requested");
        self.cancelled
    }

    /// Outcome of the last [`Future::cancel`].
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// Polls for the outcome.
    ///
    /// Returns `Ok(None)` if nothing arrived within `timeout`, the result
    /// message once completed, or the failure once failed.
    pub fn poll(&mut self, timeout: Option<Duration>) -> LdapResult<Option<Rc<Message>>> {
        if let Outcome::Pending = self.outcome {
            match fetch_result(&self.session, self.msgid, LDAP_MSG_ALL, timeout) {
                Ok(Some(message)) => self.settle(message),
                Ok(None) => {
                    debug!(msgid = self.msgid, ?timeout, "operation still pending");
                    return Ok(None);
                }
                Err(err) => {
                    debug!(msgid = self.msgid, error = %err, "operation failed");
                    self.outcome = Outcome::Failed(err);
                }
            }
        }
        match &self.outcome {
            Outcome::Completed(message) => Ok(Some(Rc::clone(message))),
            Outcome::Failed(err) => Err(err.clone()),
            Outcome::Pending => Ok(None),
        }
    }

    fn settle(&mut self, message: Message) {
        let code = message.result_code();
        if self.accepted.contains(&code) {
            debug!(msgid = self.msgid, code, "operation completed");
            self.outcome = Outcome::Completed(Rc::new(message));
        } else {
            drop(message);
            let err = check::describe_error(self.session.api(), code);
            debug!(msgid = self.msgid, error = %err, "operation rejected");
            self.outcome = Outcome::Failed(err);
        }
    }

    /// The result message.
    ///
    /// Fails with [`LdapError::Timeout`] if nothing arrived within
    /// `timeout`, or with the operation's failure.
    pub fn result(&mut self, timeout: Option<Duration>) -> LdapResult<Rc<Message>> {
        self.poll(timeout)?.ok_or(LdapError::Timeout)
    }

    /// The operation's failure, `None` if it completed.
    ///
    /// Covers both a failed `ldap_result` and a result message carrying a
    /// failure code.
    ///
    /// Fails with [`LdapError::Timeout`] if nothing arrived within `timeout`.
    pub fn exception(&mut self, timeout: Option<Duration>) -> LdapResult<Option<LdapError>> {
        match self.poll(timeout) {
            Ok(Some(_)) => Ok(None),
            Ok(None) => Err(LdapError::Timeout),
            Err(err) => Ok(Some(err)),
        }
    }

    /// Whether an outcome is known, peeking without blocking if necessary.
    pub fn done(&mut self) -> bool {
        if !matches!(self.outcome, Outcome::Pending) {
            return true;
        }
        !matches!(self.poll(Some(Duration::ZERO)), Ok(None))
    }

    /// Always false: an operation is either pending or finished, the library
    /// reports nothing in between.
    pub fn running(&self) -> bool {
        false
    }
}

impl fmt::Debug for Future {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.outcome {
            Outcome::Pending => "pending",
            Outcome::Completed(_) => "completed",
            Outcome::Failed(_) => "failed",
        };
        f.debug_struct("Future")
            .field("msgid", &self.msgid)
            .field("cancelled", &self.cancelled)
            .field("state", &state)
            .finish()
    }
}
