//! Well-known proxy storage slots
//!
//! Each standard reserves a deterministic 32-byte slot holding the
//! implementation (or beacon) address right-aligned in the word, so the
//! proxy's own variables can never collide with it.

use alloy_primitives::{b256, B256};

/// EIP-1967 logic slot
///
/// Calculated as: keccak256("eip1967.proxy.implementation") - 1
pub const EIP1967_LOGIC_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// EIP-1967 beacon slot
///
/// Calculated as: keccak256("eip1967.proxy.beacon") - 1
pub const EIP1967_BEACON_SLOT: B256 =
    b256!("a3f0ad74e5423aebfd80d3ef4346578335a9a72aeaee59ff6cb3582b35133d50");

/// Legacy OpenZeppelin upgradeable-proxy implementation slot
///
/// Calculated as: keccak256("org.zeppelinos.proxy.implementation")
pub const OZ_IMPLEMENTATION_SLOT: B256 =
    b256!("7050c9e0f4ca769c69bd3a8ef740bc37934f8e2c036e5a723fd8ee048ed3f8c3");

/// EIP-1822 (UUPS) PROXIABLE slot
///
/// Calculated as: keccak256("PROXIABLE")
pub const EIP1822_PROXIABLE_SLOT: B256 =
    b256!("c5f16f0fcc639fa48a6947836d9850f504798523bf8c9a3a87d5876cf622bcf7");
