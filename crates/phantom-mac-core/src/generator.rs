//! Random address synthesis
//!
//! Generated addresses reuse a well-known vendor prefix so they look like
//! real adapters, followed by three random octets.

use rand::{Rng, RngCore};
use rand::seq::SliceRandom;

use crate::address::MacAddress;

/// Vendor prefixes used for generated addresses (VMware, Xen, Hyper-V, Intel, ...)
pub const VENDOR_OUIS: [[u8; 3]; 10] = [
    [0x00, 0x0C, 0x29],
    [0x00, 0x50, 0x56],
    [0x00, 0x1A, 0xA0],
    [0x00, 0x16, 0x3E],
    [0x00, 0x15, 0x5D],
    [0x00, 0x1B, 0x21],
    [0x00, 0x25, 0x90],
    [0x00, 0x60, 0x08],
    [0x00, 0x0D, 0x3A],
    [0x00, 0x1C, 0x14],
];

/// Generate an address using the thread-local RNG
pub fn random_address() -> MacAddress {
    random_address_with(&mut rand::thread_rng())
}

/// Generate an address from the given RNG
pub fn random_address_with<R: Rng + ?Sized>(rng: &mut R) -> MacAddress {
    let oui = VENDOR_OUIS
        .choose(&mut *rng)
        .copied()
        .unwrap_or(VENDOR_OUIS[0]);

    let mut nic = [0u8; 3];
    rng.fill_bytes(&mut nic);

    MacAddress::new([oui[0], oui[1], oui[2], nic[0], nic[1], nic[2]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::is_assignable;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generated_addresses_are_assignable() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let mac = random_address_with(&mut rng);
            assert!(VENDOR_OUIS.contains(&mac.oui()));
            assert!(is_assignable(&mac.to_string()));
        }
    }

    #[test]
    fn test_pool_is_used() {
        let mut rng = StdRng::seed_from_u64(42);
        let seen: std::collections::HashSet<[u8; 3]> =
            (0..1000).map(|_| random_address_with(&mut rng).oui()).collect();
        assert_eq!(seen.len(), VENDOR_OUIS.len());
    }
}
