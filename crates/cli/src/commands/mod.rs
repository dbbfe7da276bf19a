use anyhow::Result;
use dna_sdk::Account;

use crate::modules::keys::account_from_settings;
use crate::modules::settings::Settings;

pub mod ledger;
pub mod offline;

/// Derive the account at `index` from `--seed-hex` or `SEED_HEX`.
fn derived_account(seed_hex: Option<&str>, index: u32) -> Result<Account> {
    account_from_settings(&Settings::load(seed_hex)?, index)
}
