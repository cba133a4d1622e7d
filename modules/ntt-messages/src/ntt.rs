use std::io;

use wormhole_io::{Readable, TypePrefixedPayload, Writeable};

use crate::{chain_id::ChainId, trimmed_amount::TrimmedAmount, UniversalAddress};

/// The token-transfer payload carried inside a handler message. Fixed layout,
/// big-endian, 79 bytes:
///
/// ```text
/// offset  size   field
/// 0       4      prefix = 0x994E5454 ("NTT")
/// 4       1      decimals (trimmed)
/// 5       8      amount (trimmed, u64)
/// 13      32     source token address
/// 45      32     recipient
/// 77      2      recipient chain
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTokenTransfer {
    pub amount: TrimmedAmount,
    pub source_token: UniversalAddress,
    pub to_chain: ChainId,
    pub to: UniversalAddress,
}

impl NativeTokenTransfer {
    pub const PREFIX: [u8; 4] = [0x99, 0x4E, 0x54, 0x54];
}

impl TypePrefixedPayload for NativeTokenTransfer {
    const TYPE: Option<u8> = None;
}

impl Readable for NativeTokenTransfer {
    const SIZE: Option<usize> = None;

    fn read<R>(reader: &mut R) -> io::Result<Self>
    where
        Self: Sized,
        R: io::Read,
    {
        let prefix: [u8; 4] = Readable::read(reader)?;
        if prefix != Self::PREFIX {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid prefix for NativeTokenTransfer",
            ));
        }

        let amount = Readable::read(reader)?;
        let source_token = Readable::read(reader)?;
        let to = Readable::read(reader)?;
        let to_chain = Readable::read(reader)?;

        Ok(Self {
            amount,
            source_token,
            to,
            to_chain,
        })
    }
}

impl Writeable for NativeTokenTransfer {
    fn written_size(&self) -> usize {
        Self::PREFIX.len()
            + TrimmedAmount::SIZE.unwrap()
            + self.source_token.len()
            + self.to.len()
            + ChainId::SIZE.unwrap()
    }

    fn write<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        let NativeTokenTransfer {
            amount,
            source_token,
            to,
            to_chain,
        } = self;

        Self::PREFIX.write(writer)?;
        amount.write(writer)?;
        source_token.write(writer)?;
        to.write(writer)?;
        to_chain.write(writer)?;

        Ok(())
    }
}
