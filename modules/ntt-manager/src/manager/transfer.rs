//! Outbound transfers.
//!
//! A transfer is a grouped action: a fee payment to the manager, an asset
//! deposit to the token custody, and the manager call itself. The group is
//! validated as a whole; the runtime has no transactional rollback, so the
//! whole validation ladder (including the delivery quote and the fee check)
//! runs before the sequence or any bucket is touched.

#![allow(clippy::too_many_arguments)]

use ntt_messages::{
    chain_id::ChainId, message::MessageToSend, ntt::NativeTokenTransfer,
    trimmed_amount::TrimmedAmount, MessageId, UniversalAddress,
};
use tracing::debug;
use wormhole_io::TypePrefixedPayload;

use crate::{
    env::{Environment, Payment},
    error::NttError,
    event::NttEvent,
    rate_limiter::outbound_bucket_id,
    token::NttToken,
    transceiver::{Transceiver, TransceiverInstruction},
    transceiver_manager::TransceiverManager,
    universal_address,
};

use super::NttManager;

/// The asset-deposit action co-submitted with a transfer. Its sender must be
/// the caller of the manager invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetDeposit {
    pub sender: UniversalAddress,
    pub receiver: UniversalAddress,
    pub asset: u64,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferArgs {
    pub amount: u64,
    pub recipient_chain: ChainId,
    pub recipient_address: UniversalAddress,
    pub should_queue: bool,
}

/// A validated outbound send, ready to dispatch. Constructed before any
/// state mutation so that a failing quote or fee check leaves the manager
/// untouched.
struct PreparedSend {
    message: MessageToSend,
    recipient: UniversalAddress,
    total_delivery_price: u64,
    untrimmed_amount: u64,
}

impl NttManager {
    /// Transfer with the default options: no queueing on a rate-limit
    /// shortfall, no transceiver instructions.
    pub fn transfer(
        &mut self,
        env: &mut dyn Environment,
        token: &dyn NttToken,
        transceiver_manager: &mut TransceiverManager,
        channels: &mut [&mut dyn Transceiver],
        caller: UniversalAddress,
        fee_payment: Payment,
        asset_deposit: AssetDeposit,
        amount: u64,
        recipient_chain: ChainId,
        recipient_address: UniversalAddress,
    ) -> Result<MessageId, NttError> {
        self.transfer_full(
            env,
            token,
            transceiver_manager,
            channels,
            caller,
            fee_payment,
            asset_deposit,
            TransferArgs {
                amount,
                recipient_chain,
                recipient_address,
                should_queue: false,
            },
            Vec::new(),
        )
    }

    /// Transfer the deposited amount to `recipient_address` on the
    /// destination chain. Returns the message id identifying the transfer
    /// whether it was sent or queued.
    pub fn transfer_full(
        &mut self,
        env: &mut dyn Environment,
        token: &dyn NttToken,
        transceiver_manager: &mut TransceiverManager,
        channels: &mut [&mut dyn Transceiver],
        caller: UniversalAddress,
        fee_payment: Payment,
        asset_deposit: AssetDeposit,
        args: TransferArgs,
        transceiver_instructions: Vec<TransceiverInstruction>,
    ) -> Result<MessageId, NttError> {
        let now = env.now();
        self.only_initialised()?;
        self.check_not_paused()?;

        if fee_payment.receiver != self.address {
            return Err(NttError::UnknownFeePaymentReceiver);
        }
        if asset_deposit.asset != self.asset_id {
            return Err(NttError::UnknownAsset);
        }
        if asset_deposit.receiver != token.custody_address() {
            return Err(NttError::UnknownAssetReceiver);
        }
        if asset_deposit.sender != caller {
            return Err(NttError::UnauthorizedAssetSender);
        }
        if asset_deposit.amount != args.amount {
            return Err(NttError::IncorrectAssetAmount);
        }
        if args.amount == 0 {
            return Err(NttError::ZeroAmount);
        }
        if args.recipient_address == [0u8; 32] {
            return Err(NttError::InvalidRecipientAddress);
        }

        // also checks the recipient chain is known
        let peer = *self.get_ntt_manager_peer(args.recipient_chain)?;
        let trimmed_amount = self.trim_transfer_amount(token, args.amount, peer.token_decimals)?;

        let message_id = self.message_id_for(self.message_sequence.peek());

        let has_capacity = self.rate_limiter.has_capacity(
            now,
            outbound_bucket_id(),
            args.amount.into(),
        )?;
        if !has_capacity && !args.should_queue {
            return Err(NttError::InsufficientCapacity);
        }

        if has_capacity {
            let prepared = self.prepare_send(
                token,
                transceiver_manager,
                channels,
                message_id,
                trimmed_amount,
                args.recipient_chain,
                args.recipient_address,
                caller,
                &transceiver_instructions,
                fee_payment,
            )?;

            self.message_sequence.next();
            self.rate_limiter.enqueue_or_consume_outbound_transfer(
                env,
                now,
                args.amount,
                args.recipient_chain,
                args.recipient_address,
                args.should_queue,
                transceiver_instructions.clone(),
                trimmed_amount,
                message_id,
                caller,
            )?;
            self.dispatch_send(
                env,
                transceiver_manager,
                channels,
                fee_payment,
                &transceiver_instructions,
                prepared,
            )?;
        } else {
            self.message_sequence.next();
            self.rate_limiter.enqueue_or_consume_outbound_transfer(
                env,
                now,
                args.amount,
                args.recipient_chain,
                args.recipient_address,
                args.should_queue,
                transceiver_instructions,
                trimmed_amount,
                message_id,
                caller,
            )?;
            // the transfer waits in the queue; the fee is refunded in full
            env.pay(fee_payment.sender, fee_payment.amount);
        }

        Ok(message_id)
    }

    /// Complete a rate-limited outbound transfer once the outbound rate
    /// duration has passed. Anyone may complete, providing the delivery fee;
    /// the entry's storage deposit goes to the completer.
    pub fn complete_outbound_queued_transfer(
        &mut self,
        env: &mut dyn Environment,
        token: &dyn NttToken,
        transceiver_manager: &mut TransceiverManager,
        channels: &mut [&mut dyn Transceiver],
        caller: UniversalAddress,
        fee_payment: Payment,
        message_id: MessageId,
    ) -> Result<MessageId, NttError> {
        let now = env.now();
        self.only_initialised()?;
        self.check_not_paused()?;

        let (can_complete, transfer) = self
            .rate_limiter
            .get_outbound_queued_transfer(now, &message_id)?;
        if !can_complete {
            return Err(NttError::StillQueued);
        }
        let transfer = transfer.clone();

        let prepared = self.prepare_send(
            token,
            transceiver_manager,
            channels,
            message_id,
            transfer.amount,
            transfer.recipient_chain,
            transfer.recipient,
            transfer.sender,
            &transfer.transceiver_instructions,
            fee_payment,
        )?;

        // skip the rate limit and carry out the transfer
        let transfer = self
            .rate_limiter
            .delete_outbound_transfer(env, &message_id)?;
        self.dispatch_send(
            env,
            transceiver_manager,
            channels,
            fee_payment,
            &transfer.transceiver_instructions,
            prepared,
        )?;
        env.pay(caller, transfer.deposit);

        Ok(message_id)
    }

    /// Cancel a queued outbound transfer, minting the deposited amount back.
    /// Only the initiator may cancel; there is no deadline.
    pub fn cancel_outbound_queued_transfer(
        &mut self,
        env: &mut dyn Environment,
        token: &mut dyn NttToken,
        caller: UniversalAddress,
        message_id: MessageId,
    ) -> Result<(), NttError> {
        let now = env.now();
        self.only_initialised()?;
        self.check_not_paused()?;

        let (_, transfer) = self
            .rate_limiter
            .get_outbound_queued_transfer(now, &message_id)?;
        if caller != transfer.sender {
            return Err(NttError::OnlyOriginalSenderCanCancel);
        }
        let untrimmed_amount = self.untrim_transfer_amount(token, transfer.amount)?;

        let transfer = self
            .rate_limiter
            .delete_outbound_transfer(env, &message_id)?;

        // return the queued funds to the user
        token.mint(caller, untrimmed_amount)?;
        env.pay(caller, transfer.deposit);

        debug!(?message_id, "cancelled queued outbound transfer");
        Ok(())
    }

    fn prepare_send(
        &self,
        token: &dyn NttToken,
        transceiver_manager: &TransceiverManager,
        channels: &[&mut dyn Transceiver],
        message_id: MessageId,
        trimmed_amount: TrimmedAmount,
        recipient_chain: ChainId,
        recipient: UniversalAddress,
        sender: UniversalAddress,
        transceiver_instructions: &[TransceiverInstruction],
        fee_payment: Payment,
    ) -> Result<PreparedSend, NttError> {
        // also checks the recipient chain is known
        let peer = self.get_ntt_manager_peer(recipient_chain)?;

        let payload = TypePrefixedPayload::to_vec_payload(&NativeTokenTransfer {
            amount: trimmed_amount,
            source_token: universal_address(self.asset_id),
            to_chain: recipient_chain,
            to: recipient,
        });
        let message = MessageToSend {
            id: message_id,
            user_address: sender,
            source_address: self.address,
            destination_chain: recipient_chain,
            handler_address: peer.address,
            payload,
        };

        let views: Vec<&dyn Transceiver> = channels
            .iter()
            .map(|channel| &**channel as &dyn Transceiver)
            .collect();
        let total_delivery_price = transceiver_manager.quote_delivery_prices(
            self.id,
            &message,
            transceiver_instructions,
            &views,
        )?;

        if fee_payment.receiver != self.address {
            return Err(NttError::UnknownFeePaymentReceiver);
        }
        if fee_payment.amount < total_delivery_price {
            return Err(NttError::InsufficientFeePayment);
        }

        Ok(PreparedSend {
            message,
            recipient,
            total_delivery_price,
            untrimmed_amount: self.untrim_transfer_amount(token, trimmed_amount)?,
        })
    }

    fn dispatch_send(
        &self,
        env: &mut dyn Environment,
        transceiver_manager: &mut TransceiverManager,
        channels: &mut [&mut dyn Transceiver],
        fee_payment: Payment,
        transceiver_instructions: &[TransceiverInstruction],
        prepared: PreparedSend,
    ) -> Result<(), NttError> {
        let PreparedSend {
            message,
            recipient,
            total_delivery_price,
            untrimmed_amount,
        } = prepared;

        transceiver_manager.send_message_to_transceivers(
            env,
            self.id,
            Payment {
                sender: self.address,
                receiver: transceiver_manager.address(),
                amount: total_delivery_price,
            },
            &message,
            transceiver_instructions,
            channels,
        )?;

        let excess_fee_payment = fee_payment.amount - total_delivery_price;
        if excess_fee_payment > 0 {
            env.pay(fee_payment.sender, excess_fee_payment);
        }

        debug!(
            message_id = ?message.id,
            recipient_chain = message.destination_chain.id,
            amount = untrimmed_amount,
            fee = total_delivery_price,
            "transfer sent"
        );
        env.emit(NttEvent::TransferSent {
            message_id: message.id,
            recipient,
            recipient_chain: message.destination_chain,
            amount: untrimmed_amount,
            fee: total_delivery_price,
        });
        Ok(())
    }
}
