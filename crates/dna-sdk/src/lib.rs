#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![cfg_attr(
    test,
    allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::needless_pass_by_value,
        clippy::too_many_lines
    )
)]

//! Client SDK for building, signing and submitting transactions on the DNA ledger.

pub mod client;
pub mod coin_selection;
pub mod config;
pub mod context;
pub mod contract;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod ledger;
pub mod resolver;
pub mod rpc;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod test_setup;

pub use client::DnaClient;
pub use coin_selection::{CoinSelection, select_coins};
pub use config::RpcConfig;
pub use context::ContractContext;
pub use contract::{Contract, ContractKind};
pub use crypto::{Account, PublicKey, Signer};
pub use error::{EncodingError, SdkError};
pub use ledger::{Submission, TransactionLookup, UnspentOutput, UnspentOutputQuery};
pub use resolver::ProgramHashResolver;
pub use rpc::RpcClient;
pub use transaction::{
    Asset, AssetRecordType, AssetType, AttributeUsage, Payload, Program, Transaction, TxAttribute,
    TxOutput, TxType, UtxoInput,
};
pub use types::{AssetId, Fixed64, ProgramHash, Uint256};
