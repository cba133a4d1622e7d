//! Contract events. These are part of the external contract: their names and
//! argument types are stable, and integrators index them. They are delivered
//! through [`crate::env::Environment::emit`], never through the log.

use ntt_messages::{chain_id::ChainId, MessageDigest, MessageId, UniversalAddress};
use primitive_types::U256;

use crate::{queue::rate_limit::BucketId, transceiver::TransceiverId, HandlerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NttEvent {
    BucketAdded {
        bucket_id: BucketId,
        capacity: U256,
        last_updated: u64,
    },
    BucketConsumed {
        bucket_id: BucketId,
        amount: U256,
    },
    BucketFilled {
        bucket_id: BucketId,
        amount_requested: U256,
        amount_filled: U256,
    },
    BucketRateLimitUpdated {
        bucket_id: BucketId,
        new_limit: U256,
    },
    BucketRateDurationUpdated {
        bucket_id: BucketId,
        new_duration: u64,
    },
    OutboundTransferRateLimited {
        sender: UniversalAddress,
        message_id: MessageId,
        current_capacity: U256,
        amount: u64,
    },
    InboundTransferRateLimited {
        recipient: UniversalAddress,
        message_digest: MessageDigest,
        current_capacity: U256,
        amount: u64,
    },
    OutboundTransferDeleted {
        message_id: MessageId,
    },
    InboundTransferDeleted {
        message_digest: MessageDigest,
    },
    TransferSent {
        message_id: MessageId,
        recipient: UniversalAddress,
        recipient_chain: ChainId,
        amount: u64,
        fee: u64,
    },
    Minted {
        recipient: UniversalAddress,
        amount: u64,
    },
    NttManagerPeerSet {
        peer_chain: ChainId,
        peer_contract: UniversalAddress,
        peer_decimals: u8,
        is_new: bool,
    },
    ThresholdUpdated {
        threshold: u64,
    },
    Paused {
        is_paused: bool,
    },
    MessageHandlerAdded {
        message_handler: HandlerId,
        admin: UniversalAddress,
    },
    MessageHandlerPaused {
        message_handler: HandlerId,
        is_paused: bool,
    },
    TransceiverAdded {
        message_handler: HandlerId,
        transceiver: TransceiverId,
    },
    TransceiverRemoved {
        message_handler: HandlerId,
        transceiver: TransceiverId,
    },
    MessageSent {
        message_handler: HandlerId,
        transceiver: TransceiverId,
        message_id: MessageId,
    },
    AttestationReceived {
        message_id: MessageId,
        source_chain: ChainId,
        source_address: UniversalAddress,
        message_handler: HandlerId,
        message_digest: MessageDigest,
        num_attestations: u64,
    },
    WormholePeerSet {
        peer_chain: ChainId,
        peer_contract: UniversalAddress,
    },
    ReceivedMessage {
        vaa_digest: [u8; 32],
        message_id: MessageId,
    },
}
