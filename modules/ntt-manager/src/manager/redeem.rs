//! Inbound transfers.
//!
//! Once enough transceivers have attested to a message, anyone may execute
//! it. Execution is single-shot per message digest; the mint either happens
//! immediately or the transfer waits in the inbound queue for its chain's
//! rate duration.

use ntt_messages::{
    message::MessageReceived, ntt::NativeTokenTransfer, MessageDigest, UniversalAddress,
};
use tracing::debug;
use wormhole_io::TypePrefixedPayload;

use crate::{
    env::Environment, error::NttError, event::NttEvent, token::NttToken,
    transceiver_manager::TransceiverManager,
};

use super::NttManager;

impl NttManager {
    /// Execute an approved message: mint to the recipient, or queue the
    /// transfer if the source chain's inbound bucket lacks capacity.
    pub fn execute_message(
        &mut self,
        env: &mut dyn Environment,
        token: &mut dyn NttToken,
        transceiver_manager: &TransceiverManager,
        message: MessageReceived,
    ) -> Result<(), NttError> {
        let now = env.now();
        self.only_initialised()?;
        self.check_not_paused()?;

        let message_digest = transceiver_manager.calculate_message_digest(&message);

        if message.handler_address != self.address {
            return Err(NttError::HandlerAddressMismatch);
        }
        if !self.is_message_approved(transceiver_manager, message_digest) {
            return Err(NttError::MessageNotApproved);
        }
        if self.is_message_executed(message_digest) {
            return Err(NttError::AlreadyExecuted);
        }

        // the peer registry is authoritative: the claimed source must be the
        // registered peer contract, attestations notwithstanding
        let peer = self.get_ntt_manager_peer(message.source_chain)?;
        if message.source_address != peer.address {
            return Err(NttError::UnknownPeerAddress);
        }

        // trailing bytes beyond the token transfer payload are ignored
        let payload: NativeTokenTransfer =
            TypePrefixedPayload::read_payload(&mut &message.payload[..])
                .map_err(|_| NttError::IncorrectPrefix)?;
        if payload.to_chain != self.chain_id {
            return Err(NttError::InvalidTargetChain);
        }
        let recipient = payload.to;
        let untrimmed_amount = self.untrim_transfer_amount(token, payload.amount)?;

        // every check passed; the digest is burned from here on
        self.messages_executed.insert(message_digest);

        let is_enqueued = self.rate_limiter.enqueue_or_consume_inbound_transfer(
            env,
            now,
            untrimmed_amount,
            message.source_chain,
            payload.amount,
            recipient,
            message_digest,
        )?;
        if !is_enqueued {
            token.mint(recipient, untrimmed_amount)?;
            env.emit(NttEvent::Minted {
                recipient,
                amount: untrimmed_amount,
            });
        }

        debug!(
            ?message_digest,
            source_chain = message.source_chain.id,
            amount = untrimmed_amount,
            queued = is_enqueued,
            "executed inbound message"
        );
        Ok(())
    }

    /// Complete a rate-limited inbound transfer once the source chain's rate
    /// duration has passed. Anyone may complete; the entry's storage deposit
    /// goes to the completer.
    pub fn complete_inbound_queued_transfer(
        &mut self,
        env: &mut dyn Environment,
        token: &mut dyn NttToken,
        caller: UniversalAddress,
        message_digest: MessageDigest,
    ) -> Result<(), NttError> {
        let now = env.now();
        self.only_initialised()?;
        self.check_not_paused()?;

        let (can_complete, transfer) = self
            .rate_limiter
            .get_inbound_queued_transfer(now, &message_digest)?;
        if !can_complete {
            return Err(NttError::StillQueued);
        }
        let recipient = transfer.recipient;
        let untrimmed_amount = self.untrim_transfer_amount(token, transfer.amount)?;

        let transfer = self
            .rate_limiter
            .delete_inbound_transfer(env, &message_digest)?;

        token.mint(recipient, untrimmed_amount)?;
        env.emit(NttEvent::Minted {
            recipient,
            amount: untrimmed_amount,
        });
        env.pay(caller, transfer.deposit);
        Ok(())
    }
}
