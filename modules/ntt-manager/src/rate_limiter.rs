//! Rate limiting for the transfer manager.
//!
//! One outbound bucket bounds all outgoing flow; one inbound bucket per peer
//! chain bounds incoming flow. Consuming from one direction refills the
//! opposite direction ("backflow"), so round-trips do not starve a bucket.
//! Transfers that do not fit are parked in a queue and become completable
//! once the bucket's rate duration has passed.
//!
//! Every operation takes the caller's clock snapshot; the limiter never reads
//! the clock itself, so a single manager operation observes one time.

use std::collections::HashMap;

use ntt_messages::{
    chain_id::ChainId, keccak256, trimmed_amount::TrimmedAmount, MessageDigest, MessageId,
    UniversalAddress,
};
use primitive_types::U256;
use tracing::debug;

use crate::{
    env::Environment,
    error::NttError,
    event::NttEvent,
    queue::{
        inbox::InboundQueuedTransfer,
        outbox::OutboundQueuedTransfer,
        rate_limit::{BucketId, RateLimitBucket},
    },
    transceiver::TransceiverInstruction,
};

/// Storage deposit collected per queue entry and returned on deletion.
pub const QUEUED_TRANSFER_DEPOSIT: u64 = 100_000;

pub fn outbound_bucket_id() -> BucketId {
    keccak256(b"OUTBOUND")
}

pub fn inbound_bucket_id(chain: ChainId) -> BucketId {
    let mut name = b"INBOUND_".to_vec();
    name.extend_from_slice(&chain.id.to_be_bytes());
    keccak256(&name)
}

#[derive(Debug, Default)]
pub struct NttRateLimiter {
    buckets: HashMap<BucketId, RateLimitBucket>,
    outbound_queued_transfers: HashMap<MessageId, OutboundQueuedTransfer>,
    inbound_queued_transfers: HashMap<MessageDigest, InboundQueuedTransfer>,
}

impl NttRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bucket at full capacity. No-op if the bucket already exists.
    pub fn add_bucket(
        &mut self,
        env: &mut dyn Environment,
        now: u64,
        bucket_id: BucketId,
        rate_limit: U256,
        rate_duration: u64,
    ) {
        if self.buckets.contains_key(&bucket_id) {
            return;
        }
        let bucket = RateLimitBucket::new(now, rate_limit, rate_duration);
        env.emit(NttEvent::BucketAdded {
            bucket_id,
            capacity: bucket.capacity_at(now),
            last_updated: now,
        });
        self.buckets.insert(bucket_id, bucket);
    }

    fn bucket(&self, bucket_id: &BucketId) -> Result<&RateLimitBucket, NttError> {
        self.buckets.get(bucket_id).ok_or(NttError::UnknownBucket)
    }

    fn bucket_mut(&mut self, bucket_id: &BucketId) -> Result<&mut RateLimitBucket, NttError> {
        self.buckets
            .get_mut(bucket_id)
            .ok_or(NttError::UnknownBucket)
    }

    pub fn has_capacity(
        &self,
        now: u64,
        bucket_id: BucketId,
        amount: U256,
    ) -> Result<bool, NttError> {
        Ok(self.bucket(&bucket_id)?.has_capacity(now, amount))
    }

    pub fn get_current_capacity(&self, now: u64, bucket_id: BucketId) -> Result<U256, NttError> {
        Ok(self.bucket(&bucket_id)?.capacity_at(now))
    }

    pub fn get_rate_duration(&self, bucket_id: BucketId) -> Result<u64, NttError> {
        Ok(self.bucket(&bucket_id)?.rate_duration())
    }

    pub fn update_rate_limit(
        &mut self,
        env: &mut dyn Environment,
        now: u64,
        bucket_id: BucketId,
        new_limit: U256,
    ) -> Result<(), NttError> {
        self.bucket_mut(&bucket_id)?.set_rate_limit(now, new_limit);
        env.emit(NttEvent::BucketRateLimitUpdated {
            bucket_id,
            new_limit,
        });
        Ok(())
    }

    pub fn update_rate_duration(
        &mut self,
        env: &mut dyn Environment,
        now: u64,
        bucket_id: BucketId,
        new_duration: u64,
    ) -> Result<(), NttError> {
        self.bucket_mut(&bucket_id)?
            .set_rate_duration(now, new_duration);
        env.emit(NttEvent::BucketRateDurationUpdated {
            bucket_id,
            new_duration,
        });
        Ok(())
    }

    fn consume_amount(
        &mut self,
        env: &mut dyn Environment,
        now: u64,
        bucket_id: BucketId,
        amount: U256,
    ) -> Result<(), NttError> {
        self.bucket_mut(&bucket_id)?.consume(now, amount)?;
        env.emit(NttEvent::BucketConsumed { bucket_id, amount });
        Ok(())
    }

    fn fill_amount(
        &mut self,
        env: &mut dyn Environment,
        now: u64,
        bucket_id: BucketId,
        amount: U256,
    ) -> Result<(), NttError> {
        let filled = self.bucket_mut(&bucket_id)?.fill(now, amount);
        env.emit(NttEvent::BucketFilled {
            bucket_id,
            amount_requested: amount,
            amount_filled: filled,
        });
        Ok(())
    }

    /// Outbound admission. Consumes from the outbound bucket and backfills
    /// the recipient chain's inbound bucket, or — on a shortfall — queues the
    /// transfer if `should_queue` allows it. Returns whether it was queued.
    #[allow(clippy::too_many_arguments)]
    pub fn enqueue_or_consume_outbound_transfer(
        &mut self,
        env: &mut dyn Environment,
        now: u64,
        untrimmed_amount: u64,
        recipient_chain: ChainId,
        recipient: UniversalAddress,
        should_queue: bool,
        transceiver_instructions: Vec<TransceiverInstruction>,
        trimmed_amount: TrimmedAmount,
        message_id: MessageId,
        sender: UniversalAddress,
    ) -> Result<bool, NttError> {
        let outbound = outbound_bucket_id();
        let has_capacity = self.has_capacity(now, outbound, U256::from(untrimmed_amount))?;
        if !should_queue && !has_capacity {
            return Err(NttError::InsufficientCapacity);
        }

        if should_queue && !has_capacity {
            self.outbound_queued_transfers.insert(
                message_id,
                OutboundQueuedTransfer {
                    queued_at: now,
                    amount: trimmed_amount,
                    recipient_chain,
                    recipient,
                    sender,
                    transceiver_instructions,
                    deposit: QUEUED_TRANSFER_DEPOSIT,
                },
            );

            let current_capacity = self.get_current_capacity(now, outbound)?;
            debug!(
                ?message_id,
                amount = untrimmed_amount,
                "outbound transfer rate limited"
            );
            env.emit(NttEvent::OutboundTransferRateLimited {
                sender,
                message_id,
                current_capacity,
                amount: untrimmed_amount,
            });
            return Ok(true);
        }

        self.consume_amount(env, now, outbound, U256::from(untrimmed_amount))?;
        self.fill_amount(
            env,
            now,
            inbound_bucket_id(recipient_chain),
            U256::from(untrimmed_amount),
        )?;
        Ok(false)
    }

    /// Inbound admission. Symmetric to the outbound side, except a shortfall
    /// always queues; inbound transfers never fail on capacity.
    pub fn enqueue_or_consume_inbound_transfer(
        &mut self,
        env: &mut dyn Environment,
        now: u64,
        untrimmed_amount: u64,
        source_chain: ChainId,
        trimmed_amount: TrimmedAmount,
        recipient: UniversalAddress,
        message_digest: MessageDigest,
    ) -> Result<bool, NttError> {
        let inbound = inbound_bucket_id(source_chain);
        let has_capacity = self.has_capacity(now, inbound, U256::from(untrimmed_amount))?;

        if !has_capacity {
            self.inbound_queued_transfers.insert(
                message_digest,
                InboundQueuedTransfer {
                    queued_at: now,
                    amount: trimmed_amount,
                    source_chain,
                    recipient,
                    deposit: QUEUED_TRANSFER_DEPOSIT,
                },
            );

            let current_capacity = self.get_current_capacity(now, inbound)?;
            debug!(
                ?message_digest,
                amount = untrimmed_amount,
                "inbound transfer rate limited"
            );
            env.emit(NttEvent::InboundTransferRateLimited {
                recipient,
                message_digest,
                current_capacity,
                amount: untrimmed_amount,
            });
            return Ok(true);
        }

        self.consume_amount(env, now, inbound, U256::from(untrimmed_amount))?;
        self.fill_amount(env, now, outbound_bucket_id(), U256::from(untrimmed_amount))?;
        Ok(false)
    }

    /// Look up a queued outbound transfer, reporting whether enough time has
    /// passed for it to be completed.
    pub fn get_outbound_queued_transfer(
        &self,
        now: u64,
        message_id: &MessageId,
    ) -> Result<(bool, &OutboundQueuedTransfer), NttError> {
        let transfer = self
            .outbound_queued_transfers
            .get(message_id)
            .ok_or(NttError::UnknownOutboundTransfer)?;
        let delta = now.saturating_sub(transfer.queued_at);
        let can_complete = delta >= self.get_rate_duration(outbound_bucket_id())?;
        Ok((can_complete, transfer))
    }

    /// Look up a queued inbound transfer, reporting whether enough time has
    /// passed for it to be completed.
    pub fn get_inbound_queued_transfer(
        &self,
        now: u64,
        message_digest: &MessageDigest,
    ) -> Result<(bool, &InboundQueuedTransfer), NttError> {
        let transfer = self
            .inbound_queued_transfers
            .get(message_digest)
            .ok_or(NttError::UnknownInboundTransfer)?;
        let delta = now.saturating_sub(transfer.queued_at);
        let can_complete = delta >= self.get_rate_duration(inbound_bucket_id(transfer.source_chain))?;
        Ok((can_complete, transfer))
    }

    pub fn delete_outbound_transfer(
        &mut self,
        env: &mut dyn Environment,
        message_id: &MessageId,
    ) -> Result<OutboundQueuedTransfer, NttError> {
        let transfer = self
            .outbound_queued_transfers
            .remove(message_id)
            .ok_or(NttError::UnknownOutboundTransfer)?;
        env.emit(NttEvent::OutboundTransferDeleted {
            message_id: *message_id,
        });
        Ok(transfer)
    }

    pub fn delete_inbound_transfer(
        &mut self,
        env: &mut dyn Environment,
        message_digest: &MessageDigest,
    ) -> Result<InboundQueuedTransfer, NttError> {
        let transfer = self
            .inbound_queued_transfers
            .remove(message_digest)
            .ok_or(NttError::UnknownInboundTransfer)?;
        env.emit(NttEvent::InboundTransferDeleted {
            message_digest: *message_digest,
        });
        Ok(transfer)
    }
}
