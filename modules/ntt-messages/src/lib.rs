//! Wire types for native token transfer messages.
//!
//! Everything that crosses the chain boundary is defined here: the trimmed
//! amount representation, the NTT token-transfer payload, the handler message
//! envelope and the transceiver wrapping around it. Serialization goes
//! through the [`wormhole_io`] traits so that the byte layout is identical on
//! every chain the protocol is deployed on.

use sha3::{Digest, Keccak256};

pub mod chain_id;
pub mod errors;
pub mod message;
pub mod ntt;
pub mod transceiver;
pub mod transceivers;
pub mod trimmed_amount;

/// A 32-byte address in the universal (Wormhole) format.
pub type UniversalAddress = [u8; 32];

/// Identifier assigned by the sending message handler. Groups the copies of
/// a message delivered through different transceivers.
pub type MessageId = [u8; 32];

/// keccak-256 of a received message; see [`message::MessageReceived::digest`].
pub type MessageDigest = [u8; 32];

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}
