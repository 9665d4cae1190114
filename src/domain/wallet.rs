//! Payout address validation.
//!
//! Addresses are checked in two independent steps: a structural check
//! (prefix, length, hexadecimal body) that always runs, and a mixed-case
//! checksum check provided by a [`ChecksumCapability`]. When the crate is
//! built without the `checksum` feature the capability is a pass-through.

use thiserror::Error;

/// Required address prefix.
pub const ADDRESS_PREFIX: &str = "0x";
/// Total address length including the prefix.
pub const ADDRESS_LENGTH: usize = 42;

/// Reason an address was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("address must start with 0x")]
    WrongPrefix,
    #[error("address must be 42 characters long")]
    WrongLength,
    #[error("address may only contain hexadecimal characters after 0x")]
    InvalidCharacters,
    #[error("invalid address")]
    Invalid,
}

/// Verifies the mixed-case checksum of a structurally valid address.
pub trait ChecksumCapability: Send + Sync {
    fn verify(&self, address: &str) -> bool;
}

/// Used when no checksum implementation is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughChecksum;

impl ChecksumCapability for PassThroughChecksum {
    fn verify(&self, _address: &str) -> bool {
        true
    }
}

/// EIP-55: each letter of the hex body is upper case iff the matching nibble
/// of `keccak256(lowercase body)` is >= 8.
#[cfg(feature = "checksum")]
#[derive(Debug, Default, Clone, Copy)]
pub struct Eip55Checksum;

#[cfg(feature = "checksum")]
impl Eip55Checksum {
    pub fn checksummed(body: &str) -> String {
        use sha3::{Digest, Keccak256};

        let lower = body.to_ascii_lowercase();
        let hash = Keccak256::digest(lower.as_bytes());
        lower
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let byte = hash[i / 2];
                let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
                if c.is_ascii_alphabetic() && nibble >= 8 {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            })
            .collect()
    }
}

#[cfg(feature = "checksum")]
impl ChecksumCapability for Eip55Checksum {
    fn verify(&self, address: &str) -> bool {
        match address.strip_prefix(ADDRESS_PREFIX) {
            Some(body) => Self::checksummed(body) == body,
            None => false,
        }
    }
}

pub struct WalletValidator {
    checksum: Box<dyn ChecksumCapability>,
}

impl Default for WalletValidator {
    fn default() -> Self {
        #[cfg(feature = "checksum")]
        let checksum: Box<dyn ChecksumCapability> = Box::new(Eip55Checksum);
        #[cfg(not(feature = "checksum"))]
        let checksum: Box<dyn ChecksumCapability> = Box::new(PassThroughChecksum);
        Self { checksum }
    }
}

impl WalletValidator {
    pub fn new(checksum: Box<dyn ChecksumCapability>) -> Self {
        Self { checksum }
    }

    pub fn validate(&self, address: &str) -> Result<(), WalletError> {
        check_structure(address)?;
        if self.checksum.verify(address) {
            Ok(())
        } else {
            Err(WalletError::Invalid)
        }
    }

    pub fn is_valid(&self, address: &str) -> bool {
        self.validate(address).is_ok()
    }
}

fn check_structure(address: &str) -> Result<(), WalletError> {
    let body = address
        .strip_prefix(ADDRESS_PREFIX)
        .ok_or(WalletError::WrongPrefix)?;
    if address.chars().count() != ADDRESS_LENGTH {
        return Err(WalletError::WrongLength);
    }
    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WalletError::InvalidCharacters);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectAll;

    impl ChecksumCapability for RejectAll {
        fn verify(&self, _address: &str) -> bool {
            false
        }
    }

    fn pass_through() -> WalletValidator {
        WalletValidator::new(Box::new(PassThroughChecksum))
    }

    #[test]
    fn test_structural_rejections() {
        let v = pass_through();
        assert_eq!(
            v.validate("1x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            Err(WalletError::WrongPrefix)
        );
        assert_eq!(v.validate("0x5aaeb605"), Err(WalletError::WrongLength));
        assert_eq!(
            v.validate("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaez"),
            Err(WalletError::InvalidCharacters)
        );
        assert_eq!(v.validate(""), Err(WalletError::WrongPrefix));
    }

    #[test]
    fn test_structure_checked_before_checksum() {
        let v = WalletValidator::new(Box::new(RejectAll));
        assert_eq!(v.validate("0x123"), Err(WalletError::WrongLength));
        assert_eq!(
            v.validate("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            Err(WalletError::Invalid)
        );
    }

    #[test]
    fn test_pass_through_accepts_any_case() {
        let v = pass_through();
        assert!(v.is_valid("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(v.is_valid("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED"));
    }

    #[cfg(feature = "checksum")]
    #[test]
    fn test_eip55_vectors() {
        let v = WalletValidator::new(Box::new(Eip55Checksum));
        for addr in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            assert!(v.is_valid(addr), "{addr} should pass");
        }
        assert_eq!(
            v.validate("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD"),
            Err(WalletError::Invalid)
        );
    }
}
