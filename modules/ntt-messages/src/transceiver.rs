use core::fmt;
use std::{io, marker::PhantomData};

use wormhole_io::{Readable, TypePrefixedPayload, Writeable};

use crate::{
    chain_id::ChainId,
    message::{MessageReceived, MessageToSend},
    MessageId, UniversalAddress,
};

/// A transceiver protocol. Implementations only pick the wire prefix that
/// identifies messages wrapped for that protocol.
pub trait Transceiver {
    const PREFIX: [u8; 4];
}

/// The handler message as it appears inside a transceiver wrapping:
/// `id (32) || sender (32) || payload`. The payload length is carried by the
/// wrapping, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NttManagerMessage {
    pub id: MessageId,
    pub sender: UniversalAddress,
    pub payload: Vec<u8>,
}

impl NttManagerMessage {
    fn read_from_slice(span: &[u8]) -> io::Result<Self> {
        if span.len() < 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Handler payload shorter than its header",
            ));
        }
        let id = span[..32].try_into().unwrap();
        let sender = span[32..64].try_into().unwrap();
        Ok(Self {
            id,
            sender,
            payload: span[64..].to_vec(),
        })
    }
}

impl Writeable for NttManagerMessage {
    fn written_size(&self) -> usize {
        self.id.len() + self.sender.len() + self.payload.len()
    }

    fn write<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        let NttManagerMessage {
            id,
            sender,
            payload,
        } = self;

        id.write(writer)?;
        writer.write_all(sender)?;
        writer.write_all(payload)?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TransceiverMessageData {
    /// The handler that sent the message on the source chain.
    pub source_address: UniversalAddress,
    /// The handler that consumes the message on the destination chain.
    pub handler_address: UniversalAddress,
    pub ntt_manager_payload: NttManagerMessage,
}

impl TransceiverMessageData {
    /// Reconstruct the handler-level envelope. The source chain is known to
    /// the transport (e.g. the VAA emitter chain), not to the wire format.
    pub fn into_message_received(self, source_chain: ChainId) -> MessageReceived {
        MessageReceived {
            id: self.ntt_manager_payload.id,
            user_address: self.ntt_manager_payload.sender,
            source_chain,
            source_address: self.source_address,
            handler_address: self.handler_address,
            payload: self.ntt_manager_payload.payload,
        }
    }
}

/// The full transceiver wire format:
///
/// ```text
/// offset  size   field
/// 0       4      protocol prefix
/// 4       32     source handler address
/// 36      32     destination handler address
/// 68      2      handler payload length
/// 70      ?      handler payload = id (32) || sender (32) || payload
/// ?       2      transceiver-specific payload length
/// ?       ?      transceiver-specific payload
/// ```
#[derive(Eq, PartialEq, Clone, Debug)]
pub struct TransceiverMessage<E: Transceiver> {
    _phantom: PhantomData<E>,
    pub message_data: TransceiverMessageData,
    pub transceiver_payload: Vec<u8>,
}

impl<E: Transceiver> std::ops::Deref for TransceiverMessage<E> {
    type Target = TransceiverMessageData;

    fn deref(&self) -> &Self::Target {
        &self.message_data
    }
}

impl<E: Transceiver> std::ops::DerefMut for TransceiverMessage<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.message_data
    }
}

impl<E: Transceiver> TransceiverMessage<E> {
    pub fn new(
        source_address: UniversalAddress,
        handler_address: UniversalAddress,
        ntt_manager_payload: NttManagerMessage,
        transceiver_payload: Vec<u8>,
    ) -> Self {
        Self {
            _phantom: PhantomData,
            message_data: TransceiverMessageData {
                source_address,
                handler_address,
                ntt_manager_payload,
            },
            transceiver_payload,
        }
    }

    /// Wrap an outgoing handler envelope for this transceiver protocol.
    pub fn from_message(message: &MessageToSend, transceiver_payload: Vec<u8>) -> Self {
        Self::new(
            message.source_address,
            message.handler_address,
            NttManagerMessage {
                id: message.id,
                sender: message.user_address,
                payload: message.payload.clone(),
            },
            transceiver_payload,
        )
    }
}

impl<E: Transceiver + Clone + fmt::Debug> TypePrefixedPayload for TransceiverMessage<E> {
    const TYPE: Option<u8> = None;
}

impl<E: Transceiver> Readable for TransceiverMessage<E> {
    const SIZE: Option<usize> = None;

    fn read<R>(reader: &mut R) -> io::Result<Self>
    where
        Self: Sized,
        R: io::Read,
    {
        let prefix: [u8; 4] = Readable::read(reader)?;
        if prefix != E::PREFIX {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid prefix for TransceiverMessage",
            ));
        }

        let source_address = Readable::read(reader)?;
        let handler_address = Readable::read(reader)?;
        let ntt_manager_payload_len: u16 = Readable::read(reader)?;
        let mut ntt_manager_payload = vec![0; ntt_manager_payload_len as usize];
        reader.read_exact(&mut ntt_manager_payload)?;
        let ntt_manager_payload = NttManagerMessage::read_from_slice(&ntt_manager_payload)?;
        let transceiver_payload_len: u16 = Readable::read(reader)?;
        let mut transceiver_payload = vec![0; transceiver_payload_len as usize];
        reader.read_exact(&mut transceiver_payload)?;

        Ok(TransceiverMessage::new(
            source_address,
            handler_address,
            ntt_manager_payload,
            transceiver_payload,
        ))
    }
}

impl<E: Transceiver> Writeable for TransceiverMessage<E> {
    fn written_size(&self) -> usize {
        4 // prefix
        + self.source_address.len()
        + self.handler_address.len()
        + u16::SIZE.unwrap()
        + self.ntt_manager_payload.written_size()
        + u16::SIZE.unwrap()
        + self.transceiver_payload.len()
    }

    fn write<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        let TransceiverMessage {
            _phantom,
            message_data:
                TransceiverMessageData {
                    source_address,
                    handler_address,
                    ntt_manager_payload,
                },
            transceiver_payload,
        } = self;

        E::PREFIX.write(writer)?;
        source_address.write(writer)?;
        handler_address.write(writer)?;
        let len: u16 = u16::try_from(ntt_manager_payload.written_size()).expect("u16 overflow");
        len.write(writer)?;
        ntt_manager_payload.write(writer)?;
        let len: u16 = u16::try_from(transceiver_payload.len()).expect("u16 overflow");
        len.write(writer)?;
        writer.write_all(transceiver_payload)?;
        Ok(())
    }
}
