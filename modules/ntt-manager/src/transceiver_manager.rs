//! The attestation aggregator.
//!
//! Message handlers register here, configure an ordered set of transceivers,
//! and route their outbound messages through
//! [`TransceiverManager::send_message_to_transceivers`]. On the inbound side,
//! each transceiver independently reports a verified message through
//! [`TransceiverManager::attestation_received`]; the aggregator records one
//! vote per `(message digest, transceiver)` pair and exposes the running
//! count. Whether a count approves a message is the handler's decision (its
//! threshold), not the aggregator's.

use std::collections::HashMap;

use ntt_messages::{
    message::{MessageReceived, MessageToSend},
    MessageDigest, UniversalAddress,
};
use tracing::debug;

use crate::{
    bitmap::Bitmap,
    env::{Environment, Payment},
    error::NttError,
    event::NttEvent,
    role::{self, RoleStore},
    transceiver::{Transceiver, TransceiverId, TransceiverInstruction},
    try_handler_id, universal_address, HandlerId,
};

/// Upper bound on the number of live transceivers per handler.
pub const MAX_TRANSCEIVERS: usize = 32;

#[derive(Debug, Default)]
struct HandlerRecord {
    paused: bool,
    /// Live transceivers in registration order. The order is part of the
    /// contract: instruction arrays are validated against it.
    transceivers: Vec<TransceiverId>,
    /// Stable vote index for every transceiver ever registered for this
    /// handler. Indices are never reused, so a removed and re-added
    /// transceiver keeps its previous votes and cannot attest twice.
    vote_indices: HashMap<TransceiverId, u8>,
}

#[derive(Debug)]
struct AttestationRecord {
    message_handler: HandlerId,
    votes: Bitmap,
}

/// One step of a fan-out: which caller-provided channel to invoke, as which
/// transceiver, with which instruction.
struct DeliveryStep {
    channel: usize,
    transceiver: TransceiverId,
    instruction: Vec<u8>,
}

pub struct TransceiverManager {
    address: UniversalAddress,
    handlers: HashMap<HandlerId, HandlerRecord>,
    attestations: HashMap<MessageDigest, AttestationRecord>,
}

impl TransceiverManager {
    pub fn new(id: u64) -> Self {
        Self {
            address: universal_address(id),
            handlers: HashMap::new(),
            attestations: HashMap::new(),
        }
    }

    /// The account delivery fees must be paid to.
    pub fn address(&self) -> UniversalAddress {
        self.address
    }

    /// Register `message_handler` and grant its admin role to `admin`. The
    /// admin role administers itself and the handler's pauser/unpauser
    /// roles. Idempotent; returns whether the handler was new.
    pub fn add_message_handler(
        &mut self,
        env: &mut dyn Environment,
        roles: &mut dyn RoleStore,
        message_handler: HandlerId,
        admin: UniversalAddress,
    ) -> bool {
        if self.handlers.contains_key(&message_handler) {
            return false;
        }

        let admin_role = role::message_handler_admin_role(message_handler);
        roles.grant_role(admin_role, admin);
        roles.set_role_admin(admin_role, admin_role);
        roles.set_role_admin(role::message_handler_pauser_role(message_handler), admin_role);
        roles.set_role_admin(
            role::message_handler_unpauser_role(message_handler),
            admin_role,
        );

        self.handlers.insert(message_handler, HandlerRecord::default());
        env.emit(NttEvent::MessageHandlerAdded {
            message_handler,
            admin,
        });
        true
    }

    /// Pause outgoing messages and received attestations for a handler.
    pub fn pause(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        message_handler: HandlerId,
    ) -> Result<(), NttError> {
        role::check_sender_role(
            roles,
            role::message_handler_pauser_role(message_handler),
            &caller,
        )?;
        let record = self.handler_mut(message_handler)?;
        if record.paused {
            return Err(NttError::MessageHandlerPaused);
        }
        record.paused = true;
        env.emit(NttEvent::MessageHandlerPaused {
            message_handler,
            is_paused: true,
        });
        Ok(())
    }

    /// Resume a previously paused handler.
    pub fn unpause(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        message_handler: HandlerId,
    ) -> Result<(), NttError> {
        role::check_sender_role(
            roles,
            role::message_handler_unpauser_role(message_handler),
            &caller,
        )?;
        let record = self.handler_mut(message_handler)?;
        if !record.paused {
            return Err(NttError::MessageHandlerNotPaused);
        }
        record.paused = false;
        env.emit(NttEvent::MessageHandlerPaused {
            message_handler,
            is_paused: false,
        });
        Ok(())
    }

    /// Append a transceiver to the handler's set.
    pub fn add_transceiver(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        message_handler: HandlerId,
        transceiver: TransceiverId,
    ) -> Result<(), NttError> {
        if !self.handlers.contains_key(&message_handler) {
            return Err(NttError::MessageHandlerUnknown);
        }
        role::check_sender_role(
            roles,
            role::message_handler_admin_role(message_handler),
            &caller,
        )?;
        let record = self.handler_mut(message_handler)?;

        if record.transceivers.len() >= MAX_TRANSCEIVERS {
            return Err(NttError::MaxTransceiversExceeded);
        }
        if record.transceivers.contains(&transceiver) {
            return Err(NttError::TransceiverAlreadyAdded);
        }

        if !record.vote_indices.contains_key(&transceiver) {
            let next_index = record.vote_indices.len();
            if next_index >= Bitmap::BITS as usize {
                return Err(NttError::MaxTransceiversExceeded);
            }
            record.vote_indices.insert(transceiver, next_index as u8);
        }
        record.transceivers.push(transceiver);

        env.emit(NttEvent::TransceiverAdded {
            message_handler,
            transceiver,
        });
        Ok(())
    }

    /// Remove a transceiver, preserving the order of the surviving entries.
    pub fn remove_transceiver(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        message_handler: HandlerId,
        transceiver: TransceiverId,
    ) -> Result<(), NttError> {
        if !self.handlers.contains_key(&message_handler) {
            return Err(NttError::MessageHandlerUnknown);
        }
        role::check_sender_role(
            roles,
            role::message_handler_admin_role(message_handler),
            &caller,
        )?;
        let record = self.handler_mut(message_handler)?;

        let position = record
            .transceivers
            .iter()
            .position(|id| *id == transceiver)
            .ok_or(NttError::TransceiverUnknown)?;
        record.transceivers.remove(position);

        env.emit(NttEvent::TransceiverRemoved {
            message_handler,
            transceiver,
        });
        Ok(())
    }

    pub fn handler_transceivers(
        &self,
        message_handler: HandlerId,
    ) -> Result<&[TransceiverId], NttError> {
        Ok(&self.handler(message_handler)?.transceivers)
    }

    pub fn is_message_handler_known(&self, message_handler: HandlerId) -> bool {
        self.handlers.contains_key(&message_handler)
    }

    pub fn is_message_handler_paused(&self, message_handler: HandlerId) -> bool {
        self.handlers
            .get(&message_handler)
            .is_some_and(|record| record.paused)
    }

    pub fn is_transceiver_configured(
        &self,
        message_handler: HandlerId,
        transceiver: TransceiverId,
    ) -> Result<bool, NttError> {
        Ok(self
            .handler(message_handler)?
            .transceivers
            .contains(&transceiver))
    }

    /// Sum of the delivery prices each configured transceiver quotes for
    /// `message`. The instruction array must follow the configured order.
    pub fn quote_delivery_prices(
        &self,
        message_handler: HandlerId,
        message: &MessageToSend,
        transceiver_instructions: &[TransceiverInstruction],
        channels: &[&dyn Transceiver],
    ) -> Result<u64, NttError> {
        let ids: Vec<TransceiverId> = channels.iter().map(|channel| channel.id()).collect();
        let plan = self.delivery_plan(message_handler, transceiver_instructions, &ids)?;

        let mut total_delivery_price = 0u64;
        for step in &plan {
            total_delivery_price +=
                channels[step.channel].quote_delivery_price(message, &step.instruction)?;
        }
        Ok(total_delivery_price)
    }

    /// Send `message` through every configured transceiver. The fee payment
    /// must name this aggregator as receiver and match the re-quoted total
    /// exactly; each transceiver is forwarded its own slice.
    pub fn send_message_to_transceivers(
        &mut self,
        env: &mut dyn Environment,
        message_handler: HandlerId,
        fee_payment: Payment,
        message: &MessageToSend,
        transceiver_instructions: &[TransceiverInstruction],
        channels: &mut [&mut dyn Transceiver],
    ) -> Result<(), NttError> {
        let record = self.handler(message_handler)?;
        if record.paused {
            return Err(NttError::MessageHandlerPaused);
        }
        // a handler can only send messages as itself
        if message.source_address != universal_address(message_handler) {
            return Err(NttError::MessageSourceMismatch);
        }

        let ids: Vec<TransceiverId> = channels.iter().map(|channel| channel.id()).collect();
        let plan = self.delivery_plan(message_handler, transceiver_instructions, &ids)?;

        let mut total_delivery_price = 0u64;
        let mut prices = Vec::with_capacity(plan.len());
        for step in &plan {
            let price = channels[step.channel].quote_delivery_price(message, &step.instruction)?;
            prices.push(price);
            total_delivery_price += price;
        }

        if fee_payment.receiver != self.address {
            return Err(NttError::UnknownFeePaymentReceiver);
        }
        if fee_payment.amount != total_delivery_price {
            return Err(NttError::IncorrectFeePayment);
        }

        for (step, price) in plan.iter().zip(prices) {
            let slice = Payment {
                sender: self.address,
                receiver: universal_address(step.transceiver),
                amount: price,
            };
            channels[step.channel].send_message(env, slice, message, &step.instruction)?;
            env.emit(NttEvent::MessageSent {
                message_handler,
                transceiver: step.transceiver,
                message_id: message.id,
            });
        }
        Ok(())
    }

    /// Record one transceiver's attestation for a received message. Fails on
    /// a second attestation from the same transceiver for the same digest.
    pub fn attestation_received(
        &mut self,
        env: &mut dyn Environment,
        transceiver: TransceiverId,
        message: MessageReceived,
    ) -> Result<(), NttError> {
        let message_handler =
            try_handler_id(&message.handler_address).ok_or(NttError::MessageHandlerUnknown)?;
        let record = self
            .handlers
            .get(&message_handler)
            .ok_or(NttError::MessageHandlerUnknown)?;
        if !record.transceivers.contains(&transceiver) {
            return Err(NttError::TransceiverNotConfigured);
        }
        if record.paused {
            return Err(NttError::MessageHandlerPaused);
        }
        let vote_index = *record
            .vote_indices
            .get(&transceiver)
            .ok_or(NttError::TransceiverNotConfigured)?;

        let message_digest = message.digest();
        let attestation = self
            .attestations
            .entry(message_digest)
            .or_insert_with(|| AttestationRecord {
                message_handler,
                votes: Bitmap::new(),
            });
        if attestation.votes.get(vote_index) {
            return Err(NttError::DuplicateAttestation);
        }
        attestation.votes.set(vote_index, true);
        let num_attestations = u64::from(attestation.votes.count_ones());

        debug!(
            ?message_digest,
            transceiver, num_attestations, "attestation received"
        );
        env.emit(NttEvent::AttestationReceived {
            message_id: message.id,
            source_chain: message.source_chain,
            source_address: message.source_address,
            message_handler,
            message_digest,
            num_attestations,
        });
        Ok(())
    }

    /// The number of distinct transceivers that have attested to a digest.
    pub fn message_attestations(&self, message_digest: MessageDigest) -> u64 {
        self.attestations
            .get(&message_digest)
            .map_or(0, |record| u64::from(record.votes.count_ones()))
    }

    pub fn has_transceiver_attested(
        &self,
        message_digest: MessageDigest,
        transceiver: TransceiverId,
    ) -> bool {
        let Some(attestation) = self.attestations.get(&message_digest) else {
            return false;
        };
        let Some(record) = self.handlers.get(&attestation.message_handler) else {
            return false;
        };
        record
            .vote_indices
            .get(&transceiver)
            .is_some_and(|index| attestation.votes.get(*index))
    }

    pub fn calculate_message_digest(&self, message: &MessageReceived) -> MessageDigest {
        message.digest()
    }

    /// All recorded attestation counts for a handler. Used by handlers to
    /// veto threshold decreases that would retroactively approve a pending
    /// message.
    pub fn attestation_counts(
        &self,
        message_handler: HandlerId,
    ) -> impl Iterator<Item = (MessageDigest, u64)> + '_ {
        self.attestations
            .iter()
            .filter(move |(_, record)| record.message_handler == message_handler)
            .map(|(digest, record)| (*digest, u64::from(record.votes.count_ones())))
    }

    fn handler(&self, message_handler: HandlerId) -> Result<&HandlerRecord, NttError> {
        self.handlers
            .get(&message_handler)
            .ok_or(NttError::MessageHandlerUnknown)
    }

    fn handler_mut(&mut self, message_handler: HandlerId) -> Result<&mut HandlerRecord, NttError> {
        self.handlers
            .get_mut(&message_handler)
            .ok_or(NttError::MessageHandlerUnknown)
    }

    /// Resolve the handler's configured transceivers against the channels the
    /// caller provided, consuming the instruction array along the way. The
    /// instructions must appear in the same relative order as the configured
    /// transceivers, with no unknown entries.
    fn delivery_plan(
        &self,
        message_handler: HandlerId,
        transceiver_instructions: &[TransceiverInstruction],
        channel_ids: &[TransceiverId],
    ) -> Result<Vec<DeliveryStep>, NttError> {
        let record = self.handler(message_handler)?;
        if record.transceivers.is_empty() {
            return Err(NttError::NoRegisteredTransceivers);
        }

        let mut steps = Vec::with_capacity(record.transceivers.len());
        let mut instruction_index = 0;
        for &transceiver in &record.transceivers {
            let mut instruction = Vec::new();
            if let Some(entry) = transceiver_instructions.get(instruction_index) {
                if entry.transceiver == transceiver {
                    instruction = entry.instruction.clone();
                    instruction_index += 1;
                }
            }

            let channel = channel_ids
                .iter()
                .position(|id| *id == transceiver)
                .ok_or(NttError::TransceiverUnknown)?;
            steps.push(DeliveryStep {
                channel,
                transceiver,
                instruction,
            });
        }

        // any leftover entry is out of order or names an unknown transceiver
        if instruction_index != transceiver_instructions.len() {
            return Err(NttError::InvalidInstructions);
        }
        Ok(steps)
    }
}
