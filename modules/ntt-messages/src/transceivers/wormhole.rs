use crate::transceiver::{Transceiver, TransceiverMessage};

/// The Wormhole transceiver protocol marker.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct WormholeTransceiver {}

impl Transceiver for WormholeTransceiver {
    const PREFIX: [u8; 4] = [0x99, 0x45, 0xFF, 0x10];
}

/// Messages published to and parsed from the Wormhole guardian network.
pub type WormholeMessage = TransceiverMessage<WormholeTransceiver>;
