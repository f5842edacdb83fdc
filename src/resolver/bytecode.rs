//! Minimal-proxy bytecode matching
//!
//! A minimal proxy is a fixed runtime bytecode template with the target
//! address hard-coded between a known prefix and suffix. Matching is exact
//! on length and on both flanks, so a lookalike contract with extra code
//! can never false-positive here.

use alloy_primitives::Address;

/// One fixed template; the 20-byte target sits between prefix and suffix.
struct MinimalProxyTemplate {
    prefix: &'static [u8],
    suffix: &'static [u8],
}

/// Canonical EIP-1167 runtime code:
/// `363d3d373d3d3d363d73 <address> 5af43d82803e903d91602b57fd5bf3`
const EIP1167: MinimalProxyTemplate = MinimalProxyTemplate {
    prefix: &[0x36, 0x3d, 0x3d, 0x37, 0x3d, 0x3d, 0x3d, 0x36, 0x3d, 0x73],
    suffix: &[
        0x5a, 0xf4, 0x3d, 0x82, 0x80, 0x3e, 0x90, 0x3d, 0x91, 0x60, 0x2b, 0x57, 0xfd, 0x5b, 0xf3,
    ],
};

/// Push-optimized variant (0age):
/// `3d3d3d3d363d3d37363d73 <address> 5af43d3d93803e602a57fd5bf3`
const EIP1167_OPTIMIZED: MinimalProxyTemplate = MinimalProxyTemplate {
    prefix: &[0x3d, 0x3d, 0x3d, 0x3d, 0x36, 0x3d, 0x3d, 0x37, 0x36, 0x3d, 0x73],
    suffix: &[
        0x5a, 0xf4, 0x3d, 0x3d, 0x93, 0x80, 0x3e, 0x60, 0x2a, 0x57, 0xfd, 0x5b, 0xf3,
    ],
};

const TEMPLATES: &[MinimalProxyTemplate] = &[EIP1167, EIP1167_OPTIMIZED];

/// Match deployed bytecode against the known minimal-proxy templates and
/// extract the embedded target address.
pub fn match_minimal_proxy(code: &[u8]) -> Option<Address> {
    for template in TEMPLATES {
        let expected_len = template.prefix.len() + 20 + template.suffix.len();
        if code.len() != expected_len {
            continue;
        }
        if !code.starts_with(template.prefix) || !code.ends_with(template.suffix) {
            continue;
        }
        let embedded = &code[template.prefix.len()..template.prefix.len() + 20];
        let address = Address::from_slice(embedded);
        if address != Address::ZERO {
            return Some(address);
        }
    }
    None
}
