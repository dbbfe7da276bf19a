//! P-256 keys, accounts and the signer capability consumed by the signing flow.

use std::fmt;

use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use ring::rand::{SecureRandom, SystemRandom};

use crate::contract::Contract;
use crate::error::SdkError;
use crate::types::ProgramHash;

/// Length of a SEC1 compressed P-256 point.
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Length of a fixed-size (r || s) ECDSA signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// Compressed P-256 public key.
///
/// Keys order by their compressed bytes, which is the order multi-signature scripts list them
/// in and the order their signatures are pushed in.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// Parse a SEC1 encoded point (compressed or uncompressed) and store it compressed.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, SdkError> {
        let key = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| SdkError::InvalidPublicKey(e.to_string()))?;
        Ok(Self::from_verifying_key(&key))
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(true);
        let mut compressed = [0u8; PUBLIC_KEY_LENGTH];
        compressed.copy_from_slice(point.as_bytes());
        Self(compressed)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Check a fixed-size signature over `data` against this key.
    #[must_use]
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_sec1_bytes(&self.0) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(data, &signature).is_ok()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

/// Produces signatures over transaction signing data.
pub trait Signer {
    fn public_key(&self) -> PublicKey;

    /// Sign `data`; the digest is computed by the implementation.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SdkError>;
}

impl<T: Signer + ?Sized> Signer for &T {
    fn public_key(&self) -> PublicKey {
        (**self).public_key()
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SdkError> {
        (**self).sign(data)
    }
}

/// In-memory P-256 key pair.
#[derive(Clone)]
pub struct Account {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl Account {
    /// Generate a fresh key from the system random source.
    pub fn generate() -> Result<Self, SdkError> {
        let rng = SystemRandom::new();
        let mut secret = [0u8; 32];

        // Rejection sampling: zero or >= curve order is not a valid scalar.
        loop {
            rng.fill(&mut secret)
                .map_err(|_| SdkError::Crypto("system random source failed".to_string()))?;
            if let Ok(account) = Self::from_secret_bytes(&secret) {
                return Ok(account);
            }
        }
    }

    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self, SdkError> {
        let signing_key =
            SigningKey::from_slice(secret).map_err(|e| SdkError::Crypto(e.to_string()))?;
        let public_key = PublicKey::from_verifying_key(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            public_key,
        })
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, SdkError> {
        Self::from_secret_bytes(&hex::decode(secret_hex.trim())?)
    }

    #[must_use]
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Program hash of this account's single-signature contract.
    #[must_use]
    pub fn program_hash(&self) -> ProgramHash {
        Contract::signature(self.public_key).program_hash()
    }
}

impl Signer for Account {
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SdkError> {
        let signature: Signature = self
            .signing_key
            .try_sign(data)
            .map_err(|e| SdkError::Crypto(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Fill a non-negative random `i64` from the system random source.
pub(crate) fn random_i63() -> Result<i64, SdkError> {
    let mut bytes = [0u8; 8];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| SdkError::Crypto("system random source failed".to_string()))?;
    Ok(i64::from_le_bytes(bytes) & i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify_against_the_account_key() {
        let account = Account::generate().expect("generates");
        let signature = account.sign(b"payload").expect("signs");

        assert_eq!(signature.len(), SIGNATURE_LENGTH);
        assert!(account.public_key().verify(b"payload", &signature));
        assert!(!account.public_key().verify(b"other", &signature));
    }

    #[test]
    fn secret_bytes_derive_a_stable_key() {
        let first = Account::from_secret_bytes(&[7u8; 32]).expect("valid scalar");
        let second = Account::from_secret_hex(&first.secret_hex()).expect("valid hex");

        assert_eq!(first.public_key(), second.public_key());
        assert_eq!(first.public_key().as_bytes().len(), PUBLIC_KEY_LENGTH);
    }

    #[test]
    fn zero_secret_is_rejected() {
        assert!(Account::from_secret_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn public_keys_round_trip_through_sec1() {
        let account = Account::from_secret_bytes(&[9u8; 32]).expect("valid scalar");
        let parsed = PublicKey::from_sec1_bytes(account.public_key().as_bytes()).expect("parses");
        assert_eq!(parsed, account.public_key());
        assert!(PublicKey::from_sec1_bytes(&[2u8; 10]).is_err());
    }
}
