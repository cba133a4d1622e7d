use ntt_messages::{chain_id::ChainId, trimmed_amount::TrimmedAmount, UniversalAddress};

use crate::transceiver::TransceiverInstruction;

/// An outbound transfer that exceeded the outbound bucket and was parked for
/// later completion. Keyed by its message id; owned by the manager, which
/// alone creates and deletes entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundQueuedTransfer {
    pub queued_at: u64,
    pub amount: TrimmedAmount,
    pub recipient_chain: ChainId,
    pub recipient: UniversalAddress,
    /// The transfer's initiator. Only this account may cancel the entry.
    pub sender: UniversalAddress,
    pub transceiver_instructions: Vec<TransceiverInstruction>,
    /// Storage deposit collected for holding this entry, returned to whoever
    /// deletes it.
    pub deposit: u64,
}
