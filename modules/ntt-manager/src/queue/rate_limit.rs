use primitive_types::{U256, U512};

use crate::error::NttError;

/// Buckets are addressed by a 32-byte id; see
/// [`crate::rate_limiter::outbound_bucket_id`] and
/// [`crate::rate_limiter::inbound_bucket_id`] for the derivations.
pub type BucketId = [u8; 32];

/// A continuous-refill credit accumulator bounding a directional flow.
///
/// The capacity at wall-time `t` is not stored; it is computed from the
/// capacity at the last transaction and the time passed since:
///
/// ```text
/// capacity(t) = min(rate_limit, capacity_stored + rate_limit * (t - last_updated) / rate_duration)
/// ```
///
/// A zero `rate_duration` freezes the capacity at its stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitBucket {
    /// The maximum capacity of the bucket.
    rate_limit: U256,
    /// The capacity at `last_updated`. The current capacity is calculated in
    /// [`RateLimitBucket::capacity_at`] by accounting for the time that has
    /// passed since and the refill rate.
    capacity_at_last_tx: U256,
    /// Seconds over which a fully drained bucket refills to `rate_limit`.
    rate_duration: u64,
    /// The timestamp of the last transaction that counted towards the
    /// current capacity. Transactions that exceeded the capacity do not
    /// count, they are just delayed.
    last_updated: u64,
}

impl RateLimitBucket {
    /// A new bucket starts at full capacity.
    pub fn new(now: u64, rate_limit: U256, rate_duration: u64) -> Self {
        Self {
            rate_limit,
            capacity_at_last_tx: rate_limit,
            rate_duration,
            last_updated: now,
        }
    }

    pub fn rate_limit(&self) -> U256 {
        self.rate_limit
    }

    pub fn rate_duration(&self) -> u64 {
        self.rate_duration
    }

    /// Returns the capacity of the bucket at the given timestamp.
    pub fn capacity_at(&self, now: u64) -> U256 {
        if self.rate_duration == 0 {
            return self.capacity_at_last_tx.min(self.rate_limit);
        }

        let elapsed = now.saturating_sub(self.last_updated);
        // rate_limit * elapsed can exceed 256 bits; go through a 512-bit
        // intermediate and clamp, the result is bounded by rate_limit anyway.
        let refill = self.rate_limit.full_mul(U256::from(elapsed)) / U512::from(self.rate_duration);
        let refill = U256::try_from(refill).unwrap_or(U256::MAX);

        self.capacity_at_last_tx
            .saturating_add(refill)
            .min(self.rate_limit)
    }

    pub fn has_capacity(&self, now: u64, amount: U256) -> bool {
        self.capacity_at(now) >= amount
    }

    /// Spend `amount` of the capacity.
    pub fn consume(&mut self, now: u64, amount: U256) -> Result<(), NttError> {
        let capacity = self.capacity_at(now);
        if capacity < amount {
            return Err(NttError::InsufficientCapacity);
        }
        self.capacity_at_last_tx = capacity - amount;
        self.last_updated = now;
        Ok(())
    }

    /// Credit `amount` back, capped at the rate limit. Returns how much was
    /// actually credited; the excess is discarded.
    pub fn fill(&mut self, now: u64, amount: U256) -> U256 {
        let capacity = self.capacity_at(now);
        let new_capacity = capacity.saturating_add(amount).min(self.rate_limit);
        self.capacity_at_last_tx = new_capacity;
        self.last_updated = now;
        new_capacity - capacity
    }

    /// Change the rate limit, preserving how much has already been consumed:
    /// raising the limit grows the current capacity by the difference,
    /// lowering it caps the current capacity at the new limit.
    pub fn set_rate_limit(&mut self, now: u64, new_limit: U256) {
        let capacity = self.capacity_at(now);
        let old_limit = self.rate_limit;

        self.capacity_at_last_tx = if new_limit > old_limit {
            capacity.saturating_add(new_limit - old_limit)
        } else {
            capacity.min(new_limit)
        };
        self.rate_limit = new_limit;
        self.last_updated = now;
    }

    /// Change the refill duration. The capacity is settled at `now` first so
    /// that already-earned refill is not recomputed under the new rate.
    pub fn set_rate_duration(&mut self, now: u64, new_duration: u64) {
        self.capacity_at_last_tx = self.capacity_at(now);
        self.rate_duration = new_duration;
        self.last_updated = now;
    }
}
