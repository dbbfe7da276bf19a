//! Capabilities the signing core needs from a ledger node.

use std::time::Duration;

use crate::error::SdkError;
use crate::transaction::{Transaction, UtxoInput};
use crate::types::{AssetId, Fixed64, ProgramHash, Uint256};

/// Snapshot of one spendable output as reported by the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnspentOutput {
    pub asset_id: AssetId,
    pub value: Fixed64,
    pub program_hash: ProgramHash,
    pub refer_tx_id: Uint256,
    pub refer_tx_output_index: u16,
}

impl UnspentOutput {
    #[must_use]
    pub const fn outpoint(&self) -> UtxoInput {
        UtxoInput {
            refer_tx_id: self.refer_tx_id,
            refer_tx_output_index: self.refer_tx_output_index,
        }
    }
}

pub trait TransactionLookup {
    /// Fetch a confirmed transaction by hash.
    fn get_transaction(&self, hash: &Uint256) -> Result<Transaction, SdkError>;
}

pub trait UnspentOutputQuery {
    /// Unspent outputs of `asset_id` owned by `owner`; empty when there are none.
    fn get_unspent_outputs(
        &self,
        asset_id: &AssetId,
        owner: &ProgramHash,
    ) -> Result<Vec<UnspentOutput>, SdkError>;
}

pub trait Submission {
    /// Submit a serialized transaction and return the hash the node accepted it under.
    fn send_raw_transaction(&self, tx: &Transaction) -> Result<Uint256, SdkError>;

    /// Wait until `blocks` new blocks are produced or `timeout` elapses.
    fn wait_for_blocks(&self, timeout: Duration, blocks: u32) -> Result<bool, SdkError>;
}
