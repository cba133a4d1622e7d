//! Role identifiers and the role-store boundary.
//!
//! The access-control store itself lives outside the core; components only
//! derive role ids, check the caller against them, and grant roles during
//! initialisation.

use ntt_messages::{keccak256, UniversalAddress};

use crate::{error::NttError, HandlerId};

/// A 16-byte role identifier, the leading half of a keccak-256 of the role
/// name.
pub type Role = [u8; 16];

pub const DEFAULT_ADMIN_ROLE: Role = [0u8; 16];

pub trait RoleStore {
    fn has_role(&self, role: Role, account: &UniversalAddress) -> bool;
    fn grant_role(&mut self, role: Role, account: UniversalAddress);
    /// Declare which role administers `role` (may grant/revoke it).
    fn set_role_admin(&mut self, role: Role, admin_role: Role);
}

pub fn check_sender_role(
    roles: &dyn RoleStore,
    role: Role,
    sender: &UniversalAddress,
) -> Result<(), NttError> {
    if !roles.has_role(role, sender) {
        return Err(NttError::Unauthorized);
    }
    Ok(())
}

fn role(name: &[u8]) -> Role {
    keccak256(name)[..16].try_into().unwrap()
}

pub fn ntt_manager_admin_role() -> Role {
    role(b"NTT_MANAGER_ADMIN")
}

pub fn rate_limiter_manager_role() -> Role {
    role(b"RATE_LIMITER_MANAGER")
}

pub fn pauser_role() -> Role {
    role(b"PAUSER")
}

pub fn unpauser_role() -> Role {
    role(b"UNPAUSER")
}

/// Admin role of the Wormhole transceiver's peer registry.
pub fn manager_role() -> Role {
    role(b"MANAGER")
}

fn handler_scoped_role(prefix: &[u8], message_handler: HandlerId) -> Role {
    let mut name = prefix.to_vec();
    name.extend_from_slice(&message_handler.to_be_bytes());
    role(&name)
}

pub fn message_handler_admin_role(message_handler: HandlerId) -> Role {
    handler_scoped_role(b"MESSAGE_HANDLER_ADMIN_", message_handler)
}

pub fn message_handler_pauser_role(message_handler: HandlerId) -> Role {
    handler_scoped_role(b"MESSAGE_HANDLER_PAUSER_", message_handler)
}

pub fn message_handler_unpauser_role(message_handler: HandlerId) -> Role {
    handler_scoped_role(b"MESSAGE_HANDLER_UNPAUSER_", message_handler)
}
