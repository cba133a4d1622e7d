use ntt_messages::UniversalAddress;

/// A peer manager on another chain, keyed in the registry by its chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NttManagerPeer {
    pub address: UniversalAddress,
    pub token_decimals: u8,
}
