//! The transceiver seam.
//!
//! Transceivers are responsible for sending and receiving messages between
//! chains. The transceiver manager treats them as interchangeable: it quotes,
//! pays and dispatches through this trait and never sees their internals.
//! Receiving is not part of the trait contract; each implementation has its
//! own receive entry point shaped by its transport's verification model, and
//! forwards verified messages through [`Transceiver::deliver_message`].

use ntt_messages::message::{MessageReceived, MessageToSend};

use crate::{
    env::{Environment, Payment},
    error::NttError,
    transceiver_manager::TransceiverManager,
};

/// Transceivers are identified by their application id on the local chain.
pub type TransceiverId = u64;

/// A per-transceiver instruction attached to an outbound transfer. The
/// instruction array handed to the transceiver manager must list entries in
/// the same relative order as the handler's configured transceivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransceiverInstruction {
    pub transceiver: TransceiverId,
    pub instruction: Vec<u8>,
}

pub trait Transceiver {
    fn id(&self) -> TransceiverId;

    /// The delivery price for `message`. Must be deterministic for the
    /// duration of an operation: the transceiver manager quotes while
    /// planning and again when paying out the fee slices.
    fn quote_delivery_price(
        &self,
        message: &MessageToSend,
        transceiver_instruction: &[u8],
    ) -> Result<u64, NttError>;

    /// Send `message` to its destination chain. `fee_payment` is the exact
    /// delivery price, already quoted by the caller.
    fn send_message(
        &mut self,
        env: &mut dyn Environment,
        fee_payment: Payment,
        message: &MessageToSend,
        transceiver_instruction: &[u8],
    ) -> Result<(), NttError>;

    /// Forward a received, transport-verified message to the transceiver
    /// manager as this transceiver's attestation.
    fn deliver_message(
        &self,
        env: &mut dyn Environment,
        transceiver_manager: &mut TransceiverManager,
        message: MessageReceived,
    ) -> Result<(), NttError> {
        transceiver_manager.attestation_received(env, self.id(), message)
    }
}
