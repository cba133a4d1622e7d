//! The token authority boundary.
//!
//! The NTT token contract owns the asset: it mints on inbound transfers and
//! its account is the custody every outbound deposit must be sent to (which
//! is what burns the supply on this side). The manager only talks to it
//! through this trait.

use ntt_messages::UniversalAddress;

use crate::error::NttError;

pub trait NttToken {
    /// The asset managed by this token contract.
    fn asset_id(&self) -> u64;

    /// Decimals of the managed asset on the local chain.
    fn decimals(&self) -> u8;

    /// The custody account outbound deposits must name as receiver.
    fn custody_address(&self) -> UniversalAddress;

    /// Mint `amount` of the asset to `receiver`.
    fn mint(&mut self, receiver: UniversalAddress, amount: u64) -> Result<(), NttError>;
}
