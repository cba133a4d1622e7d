//! The transfer manager: the user-facing entry point of the runtime.
//!
//! Outbound, the manager validates the grouped action (fee payment + asset
//! deposit + call), trims the amount to the peer's precision, asks the rate
//! limiter for capacity and either routes the message through the
//! transceiver manager or parks it in the outbound queue. Inbound, it is the
//! message handler behind [`NttManager::execute_message`]: it checks the
//! attestation threshold, guards against replays and mints to the recipient
//! (or parks the transfer in the inbound queue).

mod redeem;
mod transfer;

use std::collections::{HashMap, HashSet};

pub use transfer::{AssetDeposit, TransferArgs};

use ntt_messages::{
    chain_id::ChainId, keccak256, trimmed_amount::TrimmedAmount, MessageDigest, MessageId,
    UniversalAddress,
};
use primitive_types::U256;

use crate::{
    env::Environment,
    error::NttError,
    event::NttEvent,
    peer::NttManagerPeer,
    queue::{inbox::InboundQueuedTransfer, outbox::OutboundQueuedTransfer},
    rate_limiter::{inbound_bucket_id, outbound_bucket_id, NttRateLimiter},
    role::{self, RoleStore},
    sequence::Sequence,
    token::NttToken,
    transceiver_manager::TransceiverManager,
    universal_address, HandlerId,
};

pub struct NttManager {
    id: HandlerId,
    address: UniversalAddress,
    chain_id: ChainId,
    asset_id: u64,
    /// Attestations required before an inbound message may execute.
    threshold: u64,
    initialised: bool,
    paused: bool,
    message_sequence: Sequence,
    ntt_manager_peers: HashMap<ChainId, NttManagerPeer>,
    rate_limiter: NttRateLimiter,
    messages_executed: HashSet<MessageDigest>,
}

impl NttManager {
    /// Create the manager for `token`'s asset. [`NttManager::initialise`]
    /// must run before any other operation.
    pub fn new(
        id: HandlerId,
        chain_id: ChainId,
        threshold: u64,
        token: &dyn NttToken,
    ) -> Result<Self, NttError> {
        if threshold == 0 {
            return Err(NttError::ZeroThreshold);
        }
        Ok(Self {
            id,
            address: universal_address(id),
            chain_id,
            asset_id: token.asset_id(),
            threshold,
            initialised: false,
            paused: false,
            message_sequence: Sequence::new(),
            ntt_manager_peers: HashMap::new(),
            rate_limiter: NttRateLimiter::new(),
            messages_executed: HashSet::new(),
        })
    }

    /// Create the unlimited outbound bucket, register with the transceiver
    /// manager and grant the admin roles.
    pub fn initialise(
        &mut self,
        env: &mut dyn Environment,
        roles: &mut dyn RoleStore,
        transceiver_manager: &mut TransceiverManager,
        admin: UniversalAddress,
    ) -> Result<(), NttError> {
        if self.initialised {
            return Err(NttError::AlreadyInitialised);
        }
        let now = env.now();

        self.rate_limiter
            .add_bucket(env, now, outbound_bucket_id(), U256::MAX, 0);
        transceiver_manager.add_message_handler(env, roles, self.id, admin);

        roles.grant_role(role::DEFAULT_ADMIN_ROLE, admin);
        roles.grant_role(role::rate_limiter_manager_role(), admin);
        roles.grant_role(role::ntt_manager_admin_role(), admin);

        self.initialised = true;
        Ok(())
    }

    /// Pause incoming and outgoing transfers in case of emergency. Admin
    /// reconfiguration stays available while paused.
    pub fn pause(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
    ) -> Result<(), NttError> {
        self.only_initialised()?;
        role::check_sender_role(roles, role::pauser_role(), &caller)?;
        if self.paused {
            return Err(NttError::Paused);
        }
        self.paused = true;
        env.emit(NttEvent::Paused { is_paused: true });
        Ok(())
    }

    /// Resume incoming and outgoing transfers after a previous pause.
    pub fn unpause(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
    ) -> Result<(), NttError> {
        self.only_initialised()?;
        role::check_sender_role(roles, role::unpauser_role(), &caller)?;
        if !self.paused {
            return Err(NttError::NotPaused);
        }
        self.paused = false;
        env.emit(NttEvent::Paused { is_paused: false });
        Ok(())
    }

    /// Set the attestation threshold.
    ///
    /// A decrease is rejected if it would retroactively approve a message
    /// that is pending with fewer attestations than the current threshold:
    /// attestations accumulated under a stricter policy must not become
    /// sufficient by reconfiguration.
    pub fn set_threshold(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        transceiver_manager: &TransceiverManager,
        new_threshold: u64,
    ) -> Result<(), NttError> {
        self.only_initialised()?;
        role::check_sender_role(roles, role::ntt_manager_admin_role(), &caller)?;
        if new_threshold == 0 {
            return Err(NttError::ZeroThreshold);
        }

        if new_threshold < self.threshold {
            for (digest, count) in transceiver_manager.attestation_counts(self.id) {
                if self.messages_executed.contains(&digest) {
                    continue;
                }
                if count >= new_threshold && count < self.threshold {
                    return Err(NttError::ThresholdTooLow);
                }
            }
        }

        self.threshold = new_threshold;
        env.emit(NttEvent::ThresholdUpdated {
            threshold: new_threshold,
        });
        Ok(())
    }

    /// Register or replace the peer manager for a chain. The first
    /// registration creates that chain's (initially unlimited) inbound
    /// bucket.
    pub fn set_ntt_manager_peer(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        peer_chain: ChainId,
        peer_contract: UniversalAddress,
        peer_decimals: u8,
    ) -> Result<(), NttError> {
        self.only_initialised()?;
        role::check_sender_role(roles, role::ntt_manager_admin_role(), &caller)?;

        if peer_chain == self.chain_id {
            return Err(NttError::PeerCannotBeItself);
        }
        if !(1..=18).contains(&peer_decimals) {
            return Err(NttError::InvalidPeerDecimals);
        }
        // an all-zero peer would make the zero-recipient check ambiguous
        if peer_contract == [0u8; 32] {
            return Err(NttError::InvalidPeerAddress);
        }

        let now = env.now();
        let is_new = !self.ntt_manager_peers.contains_key(&peer_chain);
        if is_new {
            self.rate_limiter
                .add_bucket(env, now, inbound_bucket_id(peer_chain), U256::MAX, 0);
        }

        self.ntt_manager_peers.insert(
            peer_chain,
            NttManagerPeer {
                address: peer_contract,
                token_decimals: peer_decimals,
            },
        );
        env.emit(NttEvent::NttManagerPeerSet {
            peer_chain,
            peer_contract,
            peer_decimals,
            is_new,
        });
        Ok(())
    }

    pub fn get_ntt_manager_peer(&self, chain: ChainId) -> Result<&NttManagerPeer, NttError> {
        self.ntt_manager_peers
            .get(&chain)
            .ok_or(NttError::UnknownPeerChain)
    }

    pub fn set_outbound_rate_limit(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        new_limit: U256,
    ) -> Result<(), NttError> {
        self.only_initialised()?;
        role::check_sender_role(roles, role::rate_limiter_manager_role(), &caller)?;
        let now = env.now();
        self.rate_limiter
            .update_rate_limit(env, now, outbound_bucket_id(), new_limit)
    }

    pub fn set_outbound_rate_duration(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        new_duration: u64,
    ) -> Result<(), NttError> {
        self.only_initialised()?;
        role::check_sender_role(roles, role::rate_limiter_manager_role(), &caller)?;
        let now = env.now();
        self.rate_limiter
            .update_rate_duration(env, now, outbound_bucket_id(), new_duration)
    }

    /// Fails if the chain has no registered peer (and hence no bucket).
    pub fn set_inbound_rate_limit(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        chain: ChainId,
        new_limit: U256,
    ) -> Result<(), NttError> {
        self.only_initialised()?;
        role::check_sender_role(roles, role::rate_limiter_manager_role(), &caller)?;
        let now = env.now();
        self.rate_limiter
            .update_rate_limit(env, now, inbound_bucket_id(chain), new_limit)
    }

    /// Fails if the chain has no registered peer (and hence no bucket).
    pub fn set_inbound_rate_duration(
        &mut self,
        env: &mut dyn Environment,
        roles: &dyn RoleStore,
        caller: UniversalAddress,
        chain: ChainId,
        new_duration: u64,
    ) -> Result<(), NttError> {
        self.only_initialised()?;
        role::check_sender_role(roles, role::rate_limiter_manager_role(), &caller)?;
        let now = env.now();
        self.rate_limiter
            .update_rate_duration(env, now, inbound_bucket_id(chain), new_duration)
    }

    pub fn get_current_outbound_capacity(&self, env: &dyn Environment) -> Result<U256, NttError> {
        self.rate_limiter
            .get_current_capacity(env.now(), outbound_bucket_id())
    }

    pub fn get_current_inbound_capacity(
        &self,
        env: &dyn Environment,
        chain: ChainId,
    ) -> Result<U256, NttError> {
        self.rate_limiter
            .get_current_capacity(env.now(), inbound_bucket_id(chain))
    }

    pub fn get_outbound_queued_transfer(
        &self,
        env: &dyn Environment,
        message_id: &MessageId,
    ) -> Result<(bool, &OutboundQueuedTransfer), NttError> {
        self.rate_limiter
            .get_outbound_queued_transfer(env.now(), message_id)
    }

    pub fn get_inbound_queued_transfer(
        &self,
        env: &dyn Environment,
        message_digest: &MessageDigest,
    ) -> Result<(bool, &InboundQueuedTransfer), NttError> {
        self.rate_limiter
            .get_inbound_queued_transfer(env.now(), message_digest)
    }

    /// Whether `message_digest` has collected enough attestations. Evaluated
    /// against the current threshold.
    pub fn is_message_approved(
        &self,
        transceiver_manager: &TransceiverManager,
        message_digest: MessageDigest,
    ) -> bool {
        let attestations = transceiver_manager.message_attestations(message_digest);
        attestations > 0 && attestations >= self.threshold
    }

    pub fn is_message_executed(&self, message_digest: MessageDigest) -> bool {
        self.messages_executed.contains(&message_digest)
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn address(&self) -> UniversalAddress {
        self.address
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn only_initialised(&self) -> Result<(), NttError> {
        if !self.initialised {
            return Err(NttError::Uninitialised);
        }
        Ok(())
    }

    fn check_not_paused(&self) -> Result<(), NttError> {
        if self.paused {
            return Err(NttError::Paused);
        }
        Ok(())
    }

    /// The message id for a given sequence number:
    /// `keccak256(manager address || sequence)`. Collision-resistant and
    /// unique across the manager's lifetime.
    fn message_id_for(&self, sequence: u64) -> MessageId {
        let mut bytes = [0u8; 40];
        bytes[..32].copy_from_slice(&self.address);
        bytes[32..].copy_from_slice(&sequence.to_be_bytes());
        keccak256(&bytes)
    }

    /// Trim to the common precision, rejecting amounts that would lose dust.
    fn trim_transfer_amount(
        &self,
        token: &dyn NttToken,
        amount: u64,
        peer_decimals: u8,
    ) -> Result<TrimmedAmount, NttError> {
        let from_decimals = token.decimals();
        let trimmed = TrimmedAmount::trim(amount, from_decimals, peer_decimals)?;
        if trimmed.untrim(from_decimals)? != amount {
            return Err(NttError::DustNotAllowed);
        }
        Ok(trimmed)
    }

    fn untrim_transfer_amount(
        &self,
        token: &dyn NttToken,
        trimmed: TrimmedAmount,
    ) -> Result<u64, NttError> {
        Ok(trimmed.untrim(token.decimals())?)
    }
}
