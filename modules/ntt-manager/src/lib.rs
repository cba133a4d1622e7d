//! Core runtime for native token transfers between a local chain and a set of
//! registered peer chains.
//!
//! The runtime is made up of four subsystems:
//!
//! - [`rate_limiter`]: dual-bucket continuous-refill capacity accounting with
//!   deferred-execution queues for transfers that exceed the current limit.
//! - [`transceiver_manager`]: the attestation aggregator. Fans outbound
//!   messages out to the configured transceivers and counts inbound
//!   attestations until a handler's threshold is met.
//! - [`manager`]: the user-facing transfer manager. Validates grouped
//!   actions, trims amounts, drives the rate limiter and hands messages to
//!   the transceiver manager.
//! - the wire codec, which lives in the `ntt-messages` crate.
//!
//! Everything the chain substrate normally provides is injected: the clock,
//! payments and events through [`env::Environment`], the token authority
//! through [`token::NttToken`], role storage through [`role::RoleStore`], and
//! transport verification through pre-verified inputs (see
//! [`transceivers::wormhole`]).

use ntt_messages::UniversalAddress;

pub mod bitmap;
pub mod env;
pub mod error;
pub mod event;
pub mod manager;
pub mod peer;
pub mod queue;
pub mod rate_limiter;
pub mod role;
pub mod sequence;
pub mod token;
pub mod transceiver;
pub mod transceiver_manager;
pub mod transceivers;

/// Applications on the local chain are identified by a numeric id, the way
/// the underlying chain identifies deployed applications.
pub type HandlerId = u64;

/// The universal-address form of a local application id: the id in big-endian
/// bytes, right-aligned in 32 bytes.
pub fn universal_address(id: u64) -> UniversalAddress {
    let mut address = [0u8; 32];
    address[24..].copy_from_slice(&id.to_be_bytes());
    address
}

/// The inverse of [`universal_address`]. `None` if the address cannot be a
/// local application id.
pub fn try_handler_id(address: &UniversalAddress) -> Option<HandlerId> {
    if address[..24].iter().any(|b| *b != 0) {
        return None;
    }
    Some(u64::from_be_bytes(address[24..].try_into().unwrap()))
}
