//! The Wormhole transceiver.
//!
//! Sends NTT messages through the Wormhole guardian network and receives
//! them as VAAs. Signature verification is not done here: the host verifies
//! VAAs against the guardian set and hands this transceiver a
//! [`VerifiedVaa`]. What remains on this side is peer validation, replay
//! protection and the wire wrapping.

use std::collections::{HashMap, HashSet};

use ntt_messages::{
    chain_id::ChainId,
    message::MessageToSend,
    transceivers::wormhole::WormholeMessage,
    UniversalAddress,
};
use tracing::debug;
use wormhole_io::TypePrefixedPayload;

use crate::{
    env::{Environment, Payment},
    error::NttError,
    event::NttEvent,
    role::{self, RoleStore},
    transceiver::{Transceiver, TransceiverId},
    transceiver_manager::TransceiverManager,
    universal_address,
};

/// The Wormhole core contract boundary: fee lookup and message publication.
pub trait WormholeCore {
    fn message_fee(&self) -> u64;

    /// Publish `payload` to the guardian network, paying
    /// [`WormholeCore::message_fee`]. Returns the emitter sequence.
    fn publish_message(&mut self, payload: Vec<u8>) -> u64;
}

/// A VAA whose guardian signatures have already been verified by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedVaa {
    pub emitter_chain: ChainId,
    pub emitter_address: UniversalAddress,
    /// `keccak256(keccak256(vaa_body))`, the network-wide identity of the
    /// VAA. Used for replay protection.
    pub digest: [u8; 32],
    pub payload: Vec<u8>,
}

pub struct WormholeTransceiver<C: WormholeCore> {
    id: TransceiverId,
    address: UniversalAddress,
    wormhole_core: C,
    /// Peer wormhole transceivers by chain. Only their messages are
    /// accepted.
    wormhole_peers: HashMap<ChainId, UniversalAddress>,
    vaas_consumed: HashSet<[u8; 32]>,
}

impl<C: WormholeCore> WormholeTransceiver<C> {
    pub fn new(id: TransceiverId, wormhole_core: C) -> Self {
        Self {
            id,
            address: universal_address(id),
            wormhole_core,
            wormhole_peers: HashMap::new(),
            vaas_consumed: HashSet::new(),
        }
    }

    pub fn initialise(&mut self, roles: &mut dyn RoleStore, admin: UniversalAddress) {
        roles.grant_role(role::DEFAULT_ADMIN_ROLE, admin);
        roles.grant_role(role::manager_role(), admin);
    }

    /// Set the peer wormhole transceiver on a chain, overriding if needed.
    pub fn set_wormhole_peer(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        peer_chain: ChainId,
        peer_contract: UniversalAddress,
    ) -> Result<(), NttError> {
        role::check_sender_role(roles, role::manager_role(), &caller)?;
        if peer_contract == [0u8; 32] {
            return Err(NttError::InvalidPeerAddress);
        }
        self.wormhole_peers.insert(peer_chain, peer_contract);
        env.emit(NttEvent::WormholePeerSet {
            peer_chain,
            peer_contract,
        });
        Ok(())
    }

    pub fn get_wormhole_peer(&self, peer_chain: ChainId) -> Result<UniversalAddress, NttError> {
        self.wormhole_peers
            .get(&peer_chain)
            .copied()
            .ok_or(NttError::UnknownWormholePeer)
    }

    /// Receive a verified Wormhole message: unwrap it, check it comes from
    /// the registered peer transceiver, burn its VAA digest and deliver the
    /// attestation to the transceiver manager.
    pub fn receive_message(
        &mut self,
        env: &mut dyn Environment,
        transceiver_manager: &mut TransceiverManager,
        vaa: VerifiedVaa,
    ) -> Result<(), NttError> {
        let parsed: WormholeMessage = TypePrefixedPayload::read_payload(&mut &vaa.payload[..])
            .map_err(|_| NttError::IncorrectPrefix)?;

        if vaa.emitter_address != self.get_wormhole_peer(vaa.emitter_chain)? {
            return Err(NttError::EmitterAddressMismatch);
        }
        if self.vaas_consumed.contains(&vaa.digest) {
            return Err(NttError::VaaAlreadySeen);
        }

        let message = parsed
            .message_data
            .into_message_received(vaa.emitter_chain);
        let message_id = message.id;
        self.deliver_message(env, transceiver_manager, message)?;
        self.vaas_consumed.insert(vaa.digest);

        debug!(vaa_digest = ?vaa.digest, ?message_id, "received wormhole message");
        env.emit(NttEvent::ReceivedMessage {
            vaa_digest: vaa.digest,
            message_id,
        });
        Ok(())
    }
}

impl<C: WormholeCore> Transceiver for WormholeTransceiver<C> {
    fn id(&self) -> TransceiverId {
        self.id
    }

    fn quote_delivery_price(
        &self,
        message: &MessageToSend,
        _transceiver_instruction: &[u8],
    ) -> Result<u64, NttError> {
        // check the destination is reachable before quoting
        self.get_wormhole_peer(message.destination_chain)?;
        Ok(self.wormhole_core.message_fee())
    }

    fn send_message(
        &mut self,
        _env: &mut dyn Environment,
        fee_payment: Payment,
        message: &MessageToSend,
        transceiver_instruction: &[u8],
    ) -> Result<(), NttError> {
        self.get_wormhole_peer(message.destination_chain)?;

        if fee_payment.receiver != self.address {
            return Err(NttError::UnknownFeePaymentReceiver);
        }
        if fee_payment.amount != self.quote_delivery_price(message, transceiver_instruction)? {
            return Err(NttError::IncorrectFeePayment);
        }

        // the instruction is ignored for now; with automatic relaying it
        // would select the relay approach
        let wrapped = WormholeMessage::from_message(message, Vec::new());
        let sequence = self
            .wormhole_core
            .publish_message(TypePrefixedPayload::to_vec_payload(&wrapped));

        debug!(message_id = ?message.id, sequence, "published wormhole message");
        Ok(())
    }
}
