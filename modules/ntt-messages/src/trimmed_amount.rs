//! Amounts that cross the chain boundary are capped at 8 decimals. This
//! means that any amount that's given as having more decimals is truncated to
//! 8 decimals. On the way out, these amounts have to be scaled back to the
//! original decimal amount. This module defines [`TrimmedAmount`], which
//! represents amounts that have been capped at 8 decimals.
//!
//! The functions [`TrimmedAmount::trim`] and [`TrimmedAmount::untrim`] take
//! care of conversion to/from this type given the original amount's decimals.
//!
//! Trimming is lossy. Senders that cannot tolerate the loss must compare the
//! round-tripped amount against the original and reject on mismatch (dust).

use std::io;

use wormhole_io::{Readable, Writeable};

use crate::errors::ScalingError;

pub const TRIMMED_DECIMALS: u8 = 8;

#[derive(Debug, Clone, Copy)]
pub struct TrimmedAmount {
    pub amount: u64,
    pub decimals: u8,
}

impl PartialEq for TrimmedAmount {
    fn eq(&self, other: &Self) -> bool {
        assert_eq!(self.decimals, other.decimals);
        self.amount == other.amount
    }
}

impl Eq for TrimmedAmount {}

impl TrimmedAmount {
    pub fn new(amount: u64, decimals: u8) -> Self {
        Self { amount, decimals }
    }

    fn scale(amount: u64, from_decimals: u8, to_decimals: u8) -> Result<u64, ScalingError> {
        if from_decimals == to_decimals {
            return Ok(amount);
        }
        if from_decimals > to_decimals {
            let power: u32 = (from_decimals - to_decimals).into();
            let scaling_factor: u64 = 10u64
                .checked_pow(power)
                .ok_or(ScalingError::OverflowExponent)?;
            Ok(amount / scaling_factor)
        } else {
            let power: u32 = (to_decimals - from_decimals).into();
            let scaling_factor: u64 = 10u64
                .checked_pow(power)
                .ok_or(ScalingError::OverflowExponent)?;
            amount
                .checked_mul(scaling_factor)
                .ok_or(ScalingError::OverflowScaledAmount)
        }
    }

    /// Scale `amount` down to the common precision of the sending and the
    /// receiving side. The resulting decimals are the minimum of
    /// `from_decimals`, `to_decimals`, and [`TRIMMED_DECIMALS`].
    pub fn trim(
        amount: u64,
        from_decimals: u8,
        to_decimals: u8,
    ) -> Result<TrimmedAmount, ScalingError> {
        let to_decimals = TRIMMED_DECIMALS.min(from_decimals).min(to_decimals);
        Ok(Self {
            amount: Self::scale(amount, from_decimals, to_decimals)?,
            decimals: to_decimals,
        })
    }

    /// Scale the trimmed amount back up to `to_decimals`.
    pub fn untrim(&self, to_decimals: u8) -> Result<u64, ScalingError> {
        Self::scale(self.amount, self.decimals, to_decimals)
    }
}

impl Readable for TrimmedAmount {
    const SIZE: Option<usize> = Some(1 + 8);

    fn read<R>(reader: &mut R) -> io::Result<Self>
    where
        Self: Sized,
        R: io::Read,
    {
        // The fields of this struct are intentionally read in reverse order compared to how they
        // are declared in the `TrimmedAmount` struct. This is consistent with the equivalent code
        // in the EVM NTT implementation.
        let decimals = Readable::read(reader)?;
        let amount = Readable::read(reader)?;
        Ok(Self { amount, decimals })
    }
}

impl Writeable for TrimmedAmount {
    fn write<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        let TrimmedAmount { amount, decimals } = self;
        // The fields of this struct are intentionally written in reverse order compared to how
        // they are declared in the `TrimmedAmount` struct. This is consistent with the equivalent
        // code in the EVM NTT implementation.
        decimals.write(writer)?;
        amount.write(writer)?;

        Ok(())
    }

    fn written_size(&self) -> usize {
        Self::SIZE.unwrap()
    }
}
