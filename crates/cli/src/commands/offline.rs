use anyhow::Result;
use clap::Subcommand;

use dna_sdk::{Contract, Fixed64, PublicKey, Signer};

use super::derived_account;

/// Commands that never contact a node.
#[derive(Subcommand, Debug)]
pub enum Offline {
    /// Convert a decimal asset amount to its fixed-point ledger value
    Amount {
        /// Amount in whole asset units, e.g. 20000 or 0.5
        value: f64,
    },
    /// Print the public key and single-signature program hash of a derived account
    ProgramHash {
        /// Account index (0-based)
        #[arg(long = "index", default_value_t = 0)]
        index: u32,
    },
    /// Print the program hash of an m-of-n multi-signature contract over derived accounts
    MultisigHash {
        /// Index of the account creating the shared ownership
        #[arg(long = "owner-index", default_value_t = 0)]
        owner_index: u32,
        /// Signatures required to spend
        #[arg(long = "threshold")]
        threshold: usize,
        /// Comma-separated member account indices
        #[arg(long = "indices", value_delimiter = ',', required = true)]
        indices: Vec<u32>,
    },
}

impl Offline {
    pub fn handle(&self, seed_hex: Option<&str>) -> Result<()> {
        match self {
            Self::Amount { value } => {
                let amount = Fixed64::from_raw_amount(*value);
                println!("amount: {amount}");
                println!("fixed64: {}", amount.value());
            }
            Self::ProgramHash { index } => {
                let account = derived_account(seed_hex, *index)?;
                println!("public_key: {}", account.public_key());
                println!("program_hash: {}", account.program_hash());
            }
            Self::MultisigHash {
                owner_index,
                threshold,
                indices,
            } => {
                let owner = derived_account(seed_hex, *owner_index)?;
                let public_keys = indices
                    .iter()
                    .map(|index| derived_account(seed_hex, *index).map(|account| account.public_key()))
                    .collect::<Result<Vec<PublicKey>>>()?;

                let contract = Contract::multi_sig(owner.program_hash(), *threshold, &public_keys)?;
                println!("threshold: {threshold}/{}", public_keys.len());
                println!("program_hash: {}", contract.program_hash());
            }
        }

        Ok(())
    }
}
