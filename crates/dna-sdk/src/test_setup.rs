//! In-memory fixtures shared by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use crate::crypto::{Account, Signer};
use crate::error::SdkError;
use crate::ledger::{Submission, TransactionLookup, UnspentOutput, UnspentOutputQuery};
use crate::transaction::builders::{new_register_asset_transaction, new_transfer_asset_transaction};
use crate::transaction::{Asset, AssetRecordType, AssetType, Transaction, TxOutput};
use crate::types::{AssetId, Fixed64, ProgramHash, Uint256};

pub fn account(seed: u8) -> Account {
    Account::from_secret_bytes(&[seed; 32]).expect("seed is a valid scalar")
}

pub fn asset_id() -> AssetId {
    Uint256([0xaa; 32])
}

pub fn register_tx(issuer: &Account, controller: ProgramHash) -> Transaction {
    new_register_asset_transaction(
        Asset::new("TS01", 4, AssetType::Token, AssetRecordType::Utxo),
        Fixed64::from_raw_amount(20000.0),
        issuer.public_key(),
        controller,
    )
}

/// A transfer with no inputs whose outputs credit the given owners.
pub fn funding_tx(outputs: &[(ProgramHash, i64)]) -> Transaction {
    new_transfer_asset_transaction(
        vec![],
        outputs
            .iter()
            .map(|(owner, value)| TxOutput {
                asset_id: asset_id(),
                value: Fixed64(*value),
                program_hash: *owner,
            })
            .collect(),
    )
}

pub fn unspent(owner: ProgramHash, value: i64, index: u16) -> UnspentOutput {
    UnspentOutput {
        asset_id: asset_id(),
        value: Fixed64(value),
        program_hash: owner,
        refer_tx_id: Uint256([index as u8 + 1; 32]),
        refer_tx_output_index: index,
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    transactions: HashMap<Uint256, Transaction>,
    unspents: Vec<UnspentOutput>,
    submitted: RefCell<Vec<Transaction>>,
    last_wait_blocks: Cell<Option<u32>>,
}

impl MemoryLedger {
    pub fn insert(&mut self, tx: Transaction) -> Uint256 {
        let hash = tx.hash();
        self.transactions.insert(hash, tx);
        hash
    }

    pub fn add_unspent(&mut self, unspent: UnspentOutput) {
        self.unspents.push(unspent);
    }

    pub fn submitted(&self) -> Vec<Transaction> {
        self.submitted.borrow().clone()
    }

    pub fn last_wait_blocks(&self) -> Option<u32> {
        self.last_wait_blocks.get()
    }
}

impl TransactionLookup for MemoryLedger {
    fn get_transaction(&self, hash: &Uint256) -> Result<Transaction, SdkError> {
        self.transactions
            .get(hash)
            .cloned()
            .ok_or_else(|| SdkError::InvalidRequest(format!("unknown transaction {hash}")))
    }
}

impl UnspentOutputQuery for MemoryLedger {
    fn get_unspent_outputs(
        &self,
        asset_id: &AssetId,
        owner: &ProgramHash,
    ) -> Result<Vec<UnspentOutput>, SdkError> {
        Ok(self
            .unspents
            .iter()
            .filter(|unspent| unspent.asset_id == *asset_id && unspent.program_hash == *owner)
            .cloned()
            .collect())
    }
}

impl Submission for MemoryLedger {
    fn send_raw_transaction(&self, tx: &Transaction) -> Result<Uint256, SdkError> {
        let decoded = Transaction::deserialize(&tx.serialize())?;
        self.submitted.borrow_mut().push(decoded);
        Ok(tx.hash())
    }

    fn wait_for_blocks(&self, _timeout: Duration, blocks: u32) -> Result<bool, SdkError> {
        self.last_wait_blocks.set(Some(blocks));
        Ok(true)
    }
}
