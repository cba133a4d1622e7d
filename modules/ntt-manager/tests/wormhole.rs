//! The Wormhole transceiver: outbound publication, inbound delivery with
//! peer validation and VAA replay protection.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;

use ntt_manager::{
    error::NttError,
    event::NttEvent,
    transceiver::Transceiver,
    transceivers::wormhole::{VerifiedVaa, WormholeCore, WormholeTransceiver},
    universal_address,
};
use ntt_messages::{
    keccak256,
    message::MessageToSend,
    ntt::NativeTokenTransfer,
    transceivers::wormhole::WormholeMessage,
    trimmed_amount::TrimmedAmount,
};
use wormhole_io::TypePrefixedPayload;

const WORMHOLE_FEE: u64 = 500;

/// The peer wormhole transceiver on [`PEER_CHAIN`].
fn wormhole_peer() -> [u8; 32] {
    [0x99; 32]
}

#[derive(Clone, Default)]
struct MockWormholeCore {
    published: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl WormholeCore for MockWormholeCore {
    fn message_fee(&self) -> u64 {
        WORMHOLE_FEE
    }

    fn publish_message(&mut self, payload: Vec<u8>) -> u64 {
        let mut published = self.published.borrow_mut();
        published.push(payload);
        published.len() as u64 - 1
    }
}

struct WormholeSetup {
    setup: Setup,
    transceiver: WormholeTransceiver<MockWormholeCore>,
    published: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl WormholeSetup {
    fn new() -> Self {
        let mut setup = Setup::new();
        let core = MockWormholeCore::default();
        let published = core.published.clone();

        let mut transceiver = WormholeTransceiver::new(TRANSCEIVER_A, core);
        transceiver.initialise(&mut setup.roles, admin());
        transceiver
            .set_wormhole_peer(
                &mut setup.env,
                &setup.roles,
                admin(),
                PEER_CHAIN,
                wormhole_peer(),
            )
            .unwrap();

        Self {
            setup,
            transceiver,
            published,
        }
    }

    /// A wormhole-wrapped inbound VAA carrying `untrimmed_amount` to
    /// `recipient`, as the peer manager would emit it.
    fn inbound_vaa(&self, id_byte: u8, untrimmed_amount: u64, recipient: [u8; 32]) -> VerifiedVaa {
        let amount =
            TrimmedAmount::trim(untrimmed_amount, LOCAL_DECIMALS, PEER_DECIMALS).unwrap();
        let message = MessageToSend {
            id: [id_byte; 32],
            user_address: [0x11; 32],
            source_address: peer_contract(),
            destination_chain: LOCAL_CHAIN,
            handler_address: self.setup.manager.address(),
            payload: TypePrefixedPayload::to_vec_payload(&NativeTokenTransfer {
                amount,
                source_token: [0u8; 32],
                to_chain: LOCAL_CHAIN,
                to: recipient,
            }),
        };
        let payload =
            TypePrefixedPayload::to_vec_payload(&WormholeMessage::from_message(&message, vec![]));
        VerifiedVaa {
            emitter_chain: PEER_CHAIN,
            emitter_address: wormhole_peer(),
            digest: keccak256(&payload),
            payload,
        }
    }
}

#[test]
fn test_outbound_transfer_publishes_wrapped_message() {
    let mut ws = WormholeSetup::new();

    let fee_payment = ws.setup.fee_payment(WORMHOLE_FEE);
    let asset_deposit = ws.setup.asset_deposit(100_000);
    let mut channels: Vec<&mut dyn Transceiver> = vec![&mut ws.transceiver];
    let message_id = ws
        .setup
        .manager
        .transfer(
            &mut ws.setup.env,
            &ws.setup.token,
            &mut ws.setup.transceiver_manager,
            &mut channels,
            user(),
            fee_payment,
            asset_deposit,
            100_000,
            PEER_CHAIN,
            [0xFE; 32],
        )
        .unwrap();

    let published = ws.published.borrow();
    assert_eq!(published.len(), 1);

    let wrapped: WormholeMessage =
        TypePrefixedPayload::read_payload(&mut &published[0][..]).unwrap();
    assert_eq!(wrapped.source_address, ws.setup.manager.address());
    assert_eq!(wrapped.handler_address, peer_contract());
    assert_eq!(wrapped.ntt_manager_payload.id, message_id);
    assert_eq!(wrapped.ntt_manager_payload.sender, user());
    assert!(wrapped.transceiver_payload.is_empty());

    let payload: NativeTokenTransfer =
        TypePrefixedPayload::read_payload(&mut &wrapped.ntt_manager_payload.payload[..]).unwrap();
    assert_eq!(payload.amount, TrimmedAmount::new(10, PEER_DECIMALS));
}

#[test]
fn test_quote_requires_registered_peer() {
    let ws = WormholeSetup::new();

    let message = MessageToSend {
        id: [0u8; 32],
        user_address: user(),
        source_address: ws.setup.manager.address(),
        destination_chain: OTHER_CHAIN,
        handler_address: peer_contract(),
        payload: vec![],
    };
    let result = ws.transceiver.quote_delivery_price(&message, &[]);
    assert_eq!(result.unwrap_err(), NttError::UnknownWormholePeer);

    let mut message = message;
    message.destination_chain = PEER_CHAIN;
    assert_eq!(
        ws.transceiver.quote_delivery_price(&message, &[]).unwrap(),
        WORMHOLE_FEE
    );
}

#[test]
fn test_receive_message_delivers_attestation() {
    let mut ws = WormholeSetup::new();
    let recipient = [0xFE; 32];

    let vaa = ws.inbound_vaa(1, 300_000, recipient);
    ws.transceiver
        .receive_message(
            &mut ws.setup.env,
            &mut ws.setup.transceiver_manager,
            vaa.clone(),
        )
        .unwrap();

    assert!(ws.setup.env.has_event(|event| matches!(
        event,
        NttEvent::ReceivedMessage { vaa_digest, .. } if *vaa_digest == vaa.digest
    )));

    // the attestation reached the aggregator and the transfer executes
    let wrapped: WormholeMessage =
        TypePrefixedPayload::read_payload(&mut &vaa.payload[..]).unwrap();
    let message = wrapped.message_data.into_message_received(PEER_CHAIN);
    assert_eq!(
        ws.setup.transceiver_manager.message_attestations(message.digest()),
        1
    );

    ws.setup
        .manager
        .execute_message(
            &mut ws.setup.env,
            &mut ws.setup.token,
            &ws.setup.transceiver_manager,
            message,
        )
        .unwrap();
    assert_eq!(ws.setup.token.minted, vec![(recipient, 300_000)]);
}

#[test]
fn test_receive_message_replay_is_rejected() {
    let mut ws = WormholeSetup::new();

    let vaa = ws.inbound_vaa(1, 300_000, [0xFE; 32]);
    ws.transceiver
        .receive_message(
            &mut ws.setup.env,
            &mut ws.setup.transceiver_manager,
            vaa.clone(),
        )
        .unwrap();

    let result = ws.transceiver.receive_message(
        &mut ws.setup.env,
        &mut ws.setup.transceiver_manager,
        vaa,
    );
    assert_eq!(result.unwrap_err(), NttError::VaaAlreadySeen);
}

#[test]
fn test_receive_message_validates_emitter() {
    let mut ws = WormholeSetup::new();

    // wrong emitter address
    let mut vaa = ws.inbound_vaa(1, 300_000, [0xFE; 32]);
    vaa.emitter_address = [0x55; 32];
    let result = ws.transceiver.receive_message(
        &mut ws.setup.env,
        &mut ws.setup.transceiver_manager,
        vaa,
    );
    assert_eq!(result.unwrap_err(), NttError::EmitterAddressMismatch);

    // unregistered emitter chain
    let mut vaa = ws.inbound_vaa(2, 300_000, [0xFE; 32]);
    vaa.emitter_chain = OTHER_CHAIN;
    let result = ws.transceiver.receive_message(
        &mut ws.setup.env,
        &mut ws.setup.transceiver_manager,
        vaa,
    );
    assert_eq!(result.unwrap_err(), NttError::UnknownWormholePeer);

    // garbage payload
    let mut vaa = ws.inbound_vaa(3, 300_000, [0xFE; 32]);
    vaa.payload[0] ^= 0xFF;
    let result = ws.transceiver.receive_message(
        &mut ws.setup.env,
        &mut ws.setup.transceiver_manager,
        vaa,
    );
    assert_eq!(result.unwrap_err(), NttError::IncorrectPrefix);
}

#[test]
fn test_send_message_validates_fee_slice() {
    let mut ws = WormholeSetup::new();

    let message = MessageToSend {
        id: [0u8; 32],
        user_address: user(),
        source_address: ws.setup.manager.address(),
        destination_chain: PEER_CHAIN,
        handler_address: peer_contract(),
        payload: vec![],
    };

    let fee_payment = ntt_manager::env::Payment {
        sender: ws.setup.transceiver_manager.address(),
        receiver: universal_address(TRANSCEIVER_A),
        amount: WORMHOLE_FEE + 1,
    };
    let result = ws
        .transceiver
        .send_message(&mut ws.setup.env, fee_payment, &message, &[]);
    assert_eq!(result.unwrap_err(), NttError::IncorrectFeePayment);

    let fee_payment = ntt_manager::env::Payment {
        sender: ws.setup.transceiver_manager.address(),
        receiver: universal_address(TRANSCEIVER_A),
        amount: WORMHOLE_FEE,
    };
    ws.transceiver
        .send_message(&mut ws.setup.env, fee_payment, &message, &[])
        .unwrap();
    assert_eq!(ws.published.borrow().len(), 1);
}

#[test]
fn test_set_wormhole_peer_requires_manager_role() {
    let mut ws = WormholeSetup::new();

    let result = ws.transceiver.set_wormhole_peer(
        &mut ws.setup.env,
        &ws.setup.roles,
        other_user(),
        OTHER_CHAIN,
        [0x44; 32],
    );
    assert_eq!(result.unwrap_err(), NttError::Unauthorized);

    let result = ws.transceiver.set_wormhole_peer(
        &mut ws.setup.env,
        &ws.setup.roles,
        admin(),
        OTHER_CHAIN,
        [0u8; 32],
    );
    assert_eq!(result.unwrap_err(), NttError::InvalidPeerAddress);
}
