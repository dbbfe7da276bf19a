use anyhow::{Context, Result, ensure};
use dna_sdk::Account;

use crate::modules::settings::Settings;

/// Derive the account at `index` from a 32-byte hex seed.
///
/// The big-endian index is folded into bytes 24..28 of the seed.
pub fn derive_account_from_index(seed_hex: &str, index: u32) -> Result<Account> {
    let seed_vec = hex::decode(seed_hex.trim()).context("SEED_HEX must be hex")?;
    ensure!(seed_vec.len() == 32, "SEED_HEX must be 32 bytes hex");

    let mut seed_bytes = [0u8; 32];
    seed_bytes.copy_from_slice(&seed_vec);

    for (i, b) in index.to_be_bytes().iter().enumerate() {
        seed_bytes[24 + i] ^= *b;
    }

    Account::from_secret_bytes(&seed_bytes)
        .with_context(|| format!("seed does not yield a valid key at index {index}"))
}

/// Derive the account at `index` using the configured seed.
pub fn account_from_settings(settings: &Settings, index: u32) -> Result<Account> {
    derive_account_from_index(&settings.seed_hex, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dna_sdk::Signer;

    const SEED: &str = "0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20";

    #[test]
    fn indices_yield_distinct_stable_keys() {
        let first = derive_account_from_index(SEED, 0).expect("index 0");
        let again = derive_account_from_index(SEED, 0).expect("index 0 again");
        let second = derive_account_from_index(SEED, 1).expect("index 1");

        assert_eq!(first.public_key(), again.public_key());
        assert_ne!(first.public_key(), second.public_key());
    }

    #[test]
    fn short_seed_is_rejected() {
        let err = derive_account_from_index("0102", 0).expect_err("too short");
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn non_hex_seed_is_rejected() {
        assert!(derive_account_from_index("zz", 0).is_err());
    }
}
