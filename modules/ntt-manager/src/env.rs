//! The execution environment the runtime is embedded in.
//!
//! Components never read the wall clock or move the fee currency themselves;
//! the host hands them an [`Environment`]. Each operation reads `now` exactly
//! once and threads the snapshot through everything it calls, so a single
//! operation can never observe two different times.

use ntt_messages::UniversalAddress;

use crate::event::NttEvent;

/// A fee-currency payment attached to an operation, or issued by one.
/// Attached payments are validated by the receiving component (receiver and
/// amount); issued payments go out through [`Environment::pay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payment {
    pub sender: UniversalAddress,
    pub receiver: UniversalAddress,
    pub amount: u64,
}

pub trait Environment {
    /// Wall-clock time in seconds.
    fn now(&self) -> u64;

    /// Pay `amount` of the fee currency out of the calling component's
    /// account. Used for refunds and deposit returns.
    fn pay(&mut self, receiver: UniversalAddress, amount: u64);

    /// Record a contract event.
    fn emit(&mut self, event: NttEvent);
}
