//! Shared fixtures: a mock chain environment, role store, token and
//! transceiver, and a fully initialised manager/transceiver-manager pair.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use ntt_manager::{
    env::{Environment, Payment},
    error::NttError,
    event::NttEvent,
    manager::{AssetDeposit, NttManager},
    role::{self, Role, RoleStore},
    token::NttToken,
    transceiver::{Transceiver, TransceiverId},
    transceiver_manager::TransceiverManager,
};
use ntt_messages::{
    chain_id::ChainId, message::MessageReceived, message::MessageToSend,
    ntt::NativeTokenTransfer, trimmed_amount::TrimmedAmount, UniversalAddress,
};
use primitive_types::U256;
use wormhole_io::TypePrefixedPayload;

pub const LOCAL_CHAIN: ChainId = ChainId { id: 8 };
pub const PEER_CHAIN: ChainId = ChainId { id: 2 };
pub const OTHER_CHAIN: ChainId = ChainId { id: 42 };

pub const MANAGER_ID: u64 = 100;
pub const TRANSCEIVER_MANAGER_ID: u64 = 200;
pub const TRANSCEIVER_A: TransceiverId = 301;
pub const TRANSCEIVER_B: TransceiverId = 302;

pub const ASSET_ID: u64 = 1;
pub const LOCAL_DECIMALS: u8 = 6;
pub const PEER_DECIMALS: u8 = 2;

pub const OUTBOUND_LIMIT: u64 = 5_000_000;
pub const OUTBOUND_DURATION: u64 = 7 * 24 * 60 * 60;
pub const INBOUND_LIMIT: u64 = 1_000_000;
pub const INBOUND_DURATION: u64 = 24 * 60 * 60;

pub const DELIVERY_PRICE: u64 = 1_000;

pub fn admin() -> UniversalAddress {
    [0xAD; 32]
}

pub fn user() -> UniversalAddress {
    [0x01; 32]
}

pub fn other_user() -> UniversalAddress {
    [0x02; 32]
}

pub fn custody() -> UniversalAddress {
    [0xCC; 32]
}

pub fn peer_contract() -> UniversalAddress {
    [0xEE; 32]
}

#[derive(Debug)]
pub struct MockEnvironment {
    now: u64,
    pub payments: Vec<(UniversalAddress, u64)>,
    pub events: Vec<NttEvent>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            now: 1_700_000_000,
            payments: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn advance(&mut self, seconds: u64) {
        self.now += seconds;
    }

    pub fn has_event(&self, matches: impl Fn(&NttEvent) -> bool) -> bool {
        self.events.iter().any(matches)
    }
}

impl Environment for MockEnvironment {
    fn now(&self) -> u64 {
        self.now
    }

    fn pay(&mut self, receiver: UniversalAddress, amount: u64) {
        self.payments.push((receiver, amount));
    }

    fn emit(&mut self, event: NttEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Default)]
pub struct MockRoles {
    granted: HashSet<(Role, UniversalAddress)>,
    admins: HashMap<Role, Role>,
}

impl MockRoles {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleStore for MockRoles {
    fn has_role(&self, role: Role, account: &UniversalAddress) -> bool {
        self.granted.contains(&(role, *account))
    }

    fn grant_role(&mut self, role: Role, account: UniversalAddress) {
        self.granted.insert((role, account));
    }

    fn set_role_admin(&mut self, role: Role, admin_role: Role) {
        self.admins.insert(role, admin_role);
    }
}

#[derive(Debug)]
pub struct MockNttToken {
    pub minted: Vec<(UniversalAddress, u64)>,
}

impl MockNttToken {
    pub fn new() -> Self {
        Self { minted: Vec::new() }
    }
}

impl NttToken for MockNttToken {
    fn asset_id(&self) -> u64 {
        ASSET_ID
    }

    fn decimals(&self) -> u8 {
        LOCAL_DECIMALS
    }

    fn custody_address(&self) -> UniversalAddress {
        custody()
    }

    fn mint(&mut self, receiver: UniversalAddress, amount: u64) -> Result<(), NttError> {
        self.minted.push((receiver, amount));
        Ok(())
    }
}

pub struct MockTransceiver {
    pub id: TransceiverId,
    pub price: u64,
    pub sent: Vec<(Payment, MessageToSend, Vec<u8>)>,
}

impl MockTransceiver {
    pub fn new(id: TransceiverId) -> Self {
        Self {
            id,
            price: DELIVERY_PRICE,
            sent: Vec::new(),
        }
    }
}

impl Transceiver for MockTransceiver {
    fn id(&self) -> TransceiverId {
        self.id
    }

    fn quote_delivery_price(
        &self,
        _message: &MessageToSend,
        _transceiver_instruction: &[u8],
    ) -> Result<u64, NttError> {
        Ok(self.price)
    }

    fn send_message(
        &mut self,
        _env: &mut dyn Environment,
        fee_payment: Payment,
        message: &MessageToSend,
        transceiver_instruction: &[u8],
    ) -> Result<(), NttError> {
        self.sent
            .push((fee_payment, message.clone(), transceiver_instruction.to_vec()));
        Ok(())
    }
}

/// A manager wired to one transceiver with threshold 1, a registered peer on
/// [`PEER_CHAIN`] and finite rate limits in both directions.
pub struct Setup {
    pub env: MockEnvironment,
    pub roles: MockRoles,
    pub token: MockNttToken,
    pub transceiver_manager: TransceiverManager,
    pub manager: NttManager,
    pub transceiver: MockTransceiver,
}

impl Setup {
    pub fn new() -> Self {
        Self::with_threshold(1)
    }

    pub fn with_threshold(threshold: u64) -> Self {
        let mut env = MockEnvironment::new();
        let mut roles = MockRoles::new();
        let token = MockNttToken::new();
        let mut transceiver_manager = TransceiverManager::new(TRANSCEIVER_MANAGER_ID);

        let mut manager = NttManager::new(MANAGER_ID, LOCAL_CHAIN, threshold, &token).unwrap();
        manager
            .initialise(&mut env, &mut roles, &mut transceiver_manager, admin())
            .unwrap();

        // the pauser roles are assigned separately from initialisation
        roles.grant_role(role::pauser_role(), admin());
        roles.grant_role(role::unpauser_role(), admin());
        roles.grant_role(role::message_handler_pauser_role(MANAGER_ID), admin());
        roles.grant_role(role::message_handler_unpauser_role(MANAGER_ID), admin());

        transceiver_manager
            .add_transceiver(&mut env, &roles, admin(), MANAGER_ID, TRANSCEIVER_A)
            .unwrap();

        manager
            .set_ntt_manager_peer(
                &mut env,
                &roles,
                admin(),
                PEER_CHAIN,
                peer_contract(),
                PEER_DECIMALS,
            )
            .unwrap();

        manager
            .set_outbound_rate_limit(&mut env, &roles, admin(), U256::from(OUTBOUND_LIMIT))
            .unwrap();
        manager
            .set_outbound_rate_duration(&mut env, &roles, admin(), OUTBOUND_DURATION)
            .unwrap();
        manager
            .set_inbound_rate_limit(&mut env, &roles, admin(), PEER_CHAIN, U256::from(INBOUND_LIMIT))
            .unwrap();
        manager
            .set_inbound_rate_duration(&mut env, &roles, admin(), PEER_CHAIN, INBOUND_DURATION)
            .unwrap();

        Self {
            env,
            roles,
            token,
            transceiver_manager,
            manager,
            transceiver: MockTransceiver::new(TRANSCEIVER_A),
        }
    }

    pub fn fee_payment(&self, amount: u64) -> Payment {
        Payment {
            sender: user(),
            receiver: self.manager.address(),
            amount,
        }
    }

    pub fn asset_deposit(&self, amount: u64) -> AssetDeposit {
        AssetDeposit {
            sender: user(),
            receiver: custody(),
            asset: ASSET_ID,
            amount,
        }
    }

    /// An inbound message as the registered peer manager would send it:
    /// `untrimmed_amount` is expressed in local decimals and trimmed to the
    /// wire precision here.
    pub fn inbound_message(
        &self,
        id_byte: u8,
        untrimmed_amount: u64,
        recipient: UniversalAddress,
    ) -> MessageReceived {
        let amount = TrimmedAmount::trim(untrimmed_amount, LOCAL_DECIMALS, PEER_DECIMALS).unwrap();
        let payload = TypePrefixedPayload::to_vec_payload(&NativeTokenTransfer {
            amount,
            source_token: [0u8; 32],
            to_chain: LOCAL_CHAIN,
            to: recipient,
        });
        MessageReceived {
            id: [id_byte; 32],
            user_address: [0x11; 32],
            source_chain: PEER_CHAIN,
            source_address: peer_contract(),
            handler_address: self.manager.address(),
            payload,
        }
    }

    /// Record `transceiver`'s attestation for `message`.
    pub fn attest(
        &mut self,
        transceiver: TransceiverId,
        message: &MessageReceived,
    ) -> Result<(), NttError> {
        self.transceiver_manager
            .attestation_received(&mut self.env, transceiver, message.clone())
    }
}
