//! High-level client tying the builders, the signing core and a ledger node together.

use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::coin_selection::select_coins;
use crate::config::RpcConfig;
use crate::context::ContractContext;
use crate::contract::Contract;
use crate::crypto::{PublicKey, Signer};
use crate::error::SdkError;
use crate::ledger::{Submission, TransactionLookup, UnspentOutput, UnspentOutputQuery};
use crate::resolver::ProgramHashResolver;
use crate::rpc::{DEFAULT_WAIT_BLOCKS, RpcClient};
use crate::transaction::builders::{self, attach_nonce};
use crate::transaction::{Asset, Transaction, TxOutput, UtxoInput};
use crate::types::{AssetId, Fixed64, ProgramHash, Uint256};

#[derive(Debug)]
pub struct DnaClient<L = RpcClient> {
    ledger: L,
}

impl DnaClient<RpcClient> {
    pub fn connect(config: RpcConfig) -> Result<Self, SdkError> {
        Ok(Self::new(RpcClient::new(config)?))
    }

    pub fn from_env() -> Result<Self, SdkError> {
        Ok(Self::new(RpcClient::from_env()?))
    }

    pub fn get_version(&self) -> Result<String, SdkError> {
        self.ledger.get_version()
    }

    pub fn get_block_count(&self) -> Result<u32, SdkError> {
        self.ledger.get_block_count()
    }

    pub fn get_block_hash(&self, height: u32) -> Result<Uint256, SdkError> {
        self.ledger.get_block_hash(height)
    }

    pub fn get_current_block_hash(&self) -> Result<Uint256, SdkError> {
        self.ledger.get_current_block_hash()
    }

    pub fn get_identity_update(&self, method: &str, id: &str) -> Result<Value, SdkError> {
        self.ledger.get_identity_update(method, id)
    }
}

#[allow(clippy::unused_self)]
impl<L> DnaClient<L>
where
    L: TransactionLookup + UnspentOutputQuery + Submission,
{
    pub const fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn get_transaction(&self, hash: &Uint256) -> Result<Transaction, SdkError> {
        self.ledger.get_transaction(hash)
    }

    pub fn get_unspent_outputs(
        &self,
        asset_id: &AssetId,
        owner: &ProgramHash,
    ) -> Result<Vec<UnspentOutput>, SdkError> {
        self.ledger.get_unspent_outputs(asset_id, owner)
    }

    /// Sorted program hashes that must sign `tx`.
    pub fn transaction_program_hashes(&self, tx: &Transaction) -> Result<Vec<ProgramHash>, SdkError> {
        ProgramHashResolver::new(&self.ledger).resolve(tx)
    }

    #[must_use]
    pub fn make_asset_amount(&self, raw_amount: f64) -> Fixed64 {
        Fixed64::from_raw_amount(raw_amount)
    }

    #[must_use]
    pub fn get_raw_asset_amount(&self, amount: Fixed64) -> f64 {
        amount.to_raw_amount()
    }

    #[must_use]
    pub fn account_program_hash(&self, account: &impl Signer) -> ProgramHash {
        single_sig_hash(account)
    }

    /// Program hash of the `threshold`-of-`accounts.len()` contract created by `owner`.
    pub fn accounts_program_hash<S: Signer>(
        &self,
        owner: &impl Signer,
        threshold: usize,
        accounts: &[S],
    ) -> Result<ProgramHash, SdkError> {
        let public_keys: Vec<PublicKey> = accounts.iter().map(Signer::public_key).collect();
        Ok(self.multi_sig_contract(owner, threshold, &public_keys)?.program_hash())
    }

    /// The `threshold`-of-`members.len()` contract created by `owner`.
    ///
    /// Pass the result to [`Self::multi_sign_transaction`] together with any subset of the
    /// members that should sign.
    pub fn multi_sig_contract(
        &self,
        owner: &impl Signer,
        threshold: usize,
        members: &[PublicKey],
    ) -> Result<Contract, SdkError> {
        if threshold > members.len() {
            return Err(SdkError::InvalidContract(format!(
                "threshold {threshold} should not be larger than the number of accounts {}",
                members.len()
            )));
        }
        Contract::multi_sig(single_sig_hash(owner), threshold, members)
    }

    pub fn new_register_asset_transaction(
        &self,
        asset: Asset,
        amount: Fixed64,
        issuer: PublicKey,
        controller: ProgramHash,
    ) -> Result<Transaction, SdkError> {
        let mut tx = builders::new_register_asset_transaction(asset, amount, issuer, controller);
        attach_nonce(&mut tx)?;
        Ok(tx)
    }

    pub fn new_issue_asset_transaction(&self, outputs: Vec<TxOutput>) -> Result<Transaction, SdkError> {
        let mut tx = builders::new_issue_asset_transaction(outputs);
        attach_nonce(&mut tx)?;
        Ok(tx)
    }

    pub fn new_transfer_asset_transaction(
        &self,
        inputs: Vec<UtxoInput>,
        outputs: Vec<TxOutput>,
    ) -> Result<Transaction, SdkError> {
        let mut tx = builders::new_transfer_asset_transaction(inputs, outputs);
        attach_nonce(&mut tx)?;
        Ok(tx)
    }

    pub fn new_record_transaction(
        &self,
        record_type: impl Into<String>,
        record_data: Vec<u8>,
    ) -> Result<Transaction, SdkError> {
        let mut tx = builders::new_record_transaction(record_type, record_data);
        attach_nonce(&mut tx)?;
        Ok(tx)
    }

    /// Identity updates carry no nonce.
    #[must_use]
    pub fn new_identity_update_transaction(
        &self,
        updater: PublicKey,
        did: Vec<u8>,
        ddo: Vec<u8>,
    ) -> Transaction {
        builders::new_identity_update_transaction(updater, did, ddo)
    }

    /// Unsigned transfer of `amount` from the single-signature account of `from` to `to`.
    pub fn transfer(
        &self,
        from: &impl Signer,
        asset_id: AssetId,
        amount: Fixed64,
        to: ProgramHash,
    ) -> Result<Transaction, SdkError> {
        let owner = single_sig_hash(from);
        let unspents = self.ledger.get_unspent_outputs(&asset_id, &owner)?;
        let selection = select_coins(&unspents, amount, to)?;
        self.new_transfer_asset_transaction(selection.inputs, selection.outputs)
    }

    /// Sign `tx` with the single-signature contract of `signer` and attach the programs.
    pub fn sign_transaction(&self, signer: &impl Signer, tx: &mut Transaction) -> Result<(), SdkError> {
        self.sign_transaction_inner(signer, tx).map(|_| ())
    }

    /// Sign `tx` under `contract` with each of `signers`, which must all be contract members.
    ///
    /// Returns whether the collected signatures satisfy every required slot.
    pub fn multi_sign_transaction<S: Signer>(
        &self,
        contract: &Contract,
        signers: &[S],
        tx: &mut Transaction,
    ) -> Result<bool, SdkError> {
        if signers.is_empty() {
            return Err(SdkError::InvalidRequest(
                "multi-signature signing needs at least one signer".to_string(),
            ));
        }
        self.sign_with(contract, signers, tx)
    }

    pub fn send_transaction(
        &self,
        signer: &impl Signer,
        tx: &mut Transaction,
    ) -> Result<Uint256, SdkError> {
        let complete = self.sign_transaction_inner(signer, tx)?;
        self.submit(tx, complete)
    }

    pub fn send_multi_sig_transaction<S: Signer>(
        &self,
        contract: &Contract,
        signers: &[S],
        tx: &mut Transaction,
    ) -> Result<Uint256, SdkError> {
        let complete = self.multi_sign_transaction(contract, signers, tx)?;
        self.submit(tx, complete)
    }

    /// Wait for `blocks` new blocks (2 when `None`) for at most `timeout`.
    pub fn wait_for_generate_block(
        &self,
        timeout: Duration,
        blocks: Option<u32>,
    ) -> Result<bool, SdkError> {
        self.ledger
            .wait_for_blocks(timeout, blocks.unwrap_or(DEFAULT_WAIT_BLOCKS))
    }

    fn sign_transaction_inner(
        &self,
        signer: &impl Signer,
        tx: &mut Transaction,
    ) -> Result<bool, SdkError> {
        let contract = Contract::signature(signer.public_key());
        self.sign_with(&contract, std::slice::from_ref(signer), tx)
    }

    /// Returns whether every required slot ended up satisfied.
    fn sign_with<S: Signer>(
        &self,
        contract: &Contract,
        signers: &[S],
        tx: &mut Transaction,
    ) -> Result<bool, SdkError> {
        let program_hashes = self.transaction_program_hashes(tx)?;

        let (complete, programs) = {
            let mut context = ContractContext::new(tx, program_hashes);
            let signing_data = context.signing_data();
            for signer in signers {
                let signature = signer.sign(&signing_data)?;
                context.add_contract(contract, &signer.public_key(), signature)?;
            }
            (context.is_complete(), context.into_programs())
        };

        tx.set_programs(programs);
        Ok(complete)
    }

    fn submit(&self, tx: &Transaction, complete: bool) -> Result<Uint256, SdkError> {
        if !complete {
            warn!(
                tx = %tx.hash(),
                "submitting transaction whose signatures do not satisfy every required contract"
            );
        }
        let hash = self.ledger.send_raw_transaction(tx)?;
        info!(tx = %hash, tx_type = ?tx.tx_type(), "transaction submitted");
        Ok(hash)
    }
}

fn single_sig_hash(account: &impl Signer) -> ProgramHash {
    Contract::signature(account.public_key()).program_hash()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Account;
    use crate::test_setup::{MemoryLedger, account, asset_id, funding_tx, unspent};
    use crate::transaction::AttributeUsage;

    fn funded(owner: ProgramHash, values: &[i64]) -> (MemoryLedger, Vec<UtxoInput>) {
        let mut ledger = MemoryLedger::default();
        let outputs: Vec<(ProgramHash, i64)> = values.iter().map(|value| (owner, *value)).collect();
        let hash = ledger.insert(funding_tx(&outputs));
        let inputs = (0..values.len())
            .map(|index| UtxoInput {
                refer_tx_id: hash,
                refer_tx_output_index: u16::try_from(index).expect("small index"),
            })
            .collect();
        (ledger, inputs)
    }

    #[test]
    fn sign_transaction_attaches_a_verifying_program() {
        let alice = account(1);
        let (ledger, inputs) = funded(alice.program_hash(), &[50]);
        let client = DnaClient::new(ledger);

        let mut tx = client
            .new_transfer_asset_transaction(inputs, vec![])
            .expect("builds");
        client.sign_transaction(&alice, &mut tx).expect("signs");

        assert_eq!(tx.programs.len(), 1);
        let program = &tx.programs[0];
        assert_eq!(program.code, Contract::signature(alice.public_key()).code());
        assert!(
            alice
                .public_key()
                .verify(&tx.serialize_unsigned(), &program.parameter[1..])
        );
    }

    #[test]
    fn signing_with_an_unrelated_account_fails() {
        let (ledger, inputs) = funded(account(1).program_hash(), &[50]);
        let client = DnaClient::new(ledger);

        let mut tx = client
            .new_transfer_asset_transaction(inputs, vec![])
            .expect("builds");
        let err = client
            .sign_transaction(&account(2), &mut tx)
            .expect_err("not an owner");
        assert!(matches!(err, SdkError::UnknownSigner(_)));
        assert!(tx.programs.is_empty());
    }

    fn multi_sig_funded(
        members: &[Account],
        threshold: usize,
    ) -> (DnaClient<MemoryLedger>, Contract, Transaction) {
        let keys: Vec<PublicKey> = members.iter().map(Signer::public_key).collect();
        let contract = DnaClient::new(MemoryLedger::default())
            .multi_sig_contract(&members[0], threshold, &keys)
            .expect("valid contract");

        let (ledger, inputs) = funded(contract.program_hash(), &[10]);
        let client = DnaClient::new(ledger);
        let tx = client
            .new_transfer_asset_transaction(inputs, vec![])
            .expect("builds");
        (client, contract, tx)
    }

    #[test]
    fn two_of_three_members_satisfy_the_contract() {
        let members = [account(1), account(2), account(3)];
        let (client, contract, mut tx) = multi_sig_funded(&members, 2);

        let complete = client
            .multi_sign_transaction(&contract, &[&members[2], &members[0]], &mut tx)
            .expect("members sign");

        assert!(complete);
        assert_eq!(tx.programs.len(), 1);
        assert_eq!(tx.programs[0].code, contract.code());
        assert_eq!(tx.programs[0].parameter.len(), 2 * 65);
    }

    #[test]
    fn one_of_two_required_signatures_is_incomplete() {
        let members = [account(1), account(2), account(3)];
        let (client, contract, mut tx) = multi_sig_funded(&members, 2);

        let complete = client
            .multi_sign_transaction(&contract, &[&members[1]], &mut tx)
            .expect("member signs");

        assert!(!complete);
        assert_eq!(tx.programs[0].parameter.len(), 65);
    }

    #[test]
    fn multi_sign_rejects_non_members() {
        let members = [account(1), account(2), account(3)];
        let (client, contract, mut tx) = multi_sig_funded(&members, 2);

        let err = client
            .multi_sign_transaction(&contract, &[&members[0], &account(9)], &mut tx)
            .expect_err("outsider");
        assert!(matches!(err, SdkError::SignerNotInContract { .. }));
        assert!(tx.programs.is_empty());
    }

    #[test]
    fn send_multi_sig_submits_with_a_subset_of_members() {
        let members = [account(1), account(2), account(3)];
        let (client, contract, mut tx) = multi_sig_funded(&members, 2);

        let hash = client
            .send_multi_sig_transaction(&contract, &[&members[0], &members[1]], &mut tx)
            .expect("submits");

        assert_eq!(hash, tx.hash());
        assert_eq!(client.ledger().submitted().len(), 1);
    }

    #[test]
    fn multi_sign_rejects_empty_signer_list() {
        let client = DnaClient::new(MemoryLedger::default());
        let mut tx = client.new_record_transaction("note", vec![]).expect("builds");
        let contract = client
            .multi_sig_contract(&account(1), 1, &[account(1).public_key()])
            .expect("valid contract");
        let none: [&Account; 0] = [];

        let err = client
            .multi_sign_transaction(&contract, &none, &mut tx)
            .expect_err("empty");
        assert!(matches!(err, SdkError::InvalidRequest(_)));
    }

    #[test]
    fn accounts_program_hash_rejects_threshold_above_count() {
        let client = DnaClient::new(MemoryLedger::default());
        let members = [account(1), account(2)];

        let err = client
            .accounts_program_hash(&members[0], 3, &members)
            .expect_err("threshold too large");
        assert!(matches!(err, SdkError::InvalidContract(_)));

        let keys: Vec<PublicKey> = members.iter().map(Signer::public_key).collect();
        let expected = Contract::multi_sig(members[0].program_hash(), 2, &keys)
            .expect("valid")
            .program_hash();
        assert_eq!(
            client
                .accounts_program_hash(&members[0], 2, &members)
                .expect("valid"),
            expected
        );
    }

    #[test]
    fn send_transaction_submits_signed_tx() {
        let alice = account(1);
        let (ledger, inputs) = funded(alice.program_hash(), &[50]);
        let client = DnaClient::new(ledger);

        let mut tx = client
            .new_transfer_asset_transaction(inputs, vec![])
            .expect("builds");
        let hash = client.send_transaction(&alice, &mut tx).expect("submits");

        assert_eq!(hash, tx.hash());
        let submitted = client.ledger().submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].programs.len(), 1);
    }

    #[test]
    fn incomplete_signing_is_still_submitted() {
        let alice = account(1);
        let bob = account(2);
        let mut ledger = MemoryLedger::default();
        let funding = ledger.insert(funding_tx(&[(alice.program_hash(), 5), (bob.program_hash(), 5)]));
        let client = DnaClient::new(ledger);

        let inputs = (0..2)
            .map(|index| UtxoInput {
                refer_tx_id: funding,
                refer_tx_output_index: index,
            })
            .collect();
        let mut tx = client
            .new_transfer_asset_transaction(inputs, vec![])
            .expect("builds");
        let hash = client.send_transaction(&alice, &mut tx).expect("submits");

        assert_eq!(hash, tx.hash());
        assert_eq!(tx.programs.len(), 2);
        assert_eq!(
            tx.programs
                .iter()
                .filter(|program| program.code.is_empty())
                .count(),
            1
        );
        assert_eq!(client.ledger().submitted().len(), 1);
    }

    #[test]
    fn transfer_selects_coins_and_adds_a_nonce() {
        let alice = account(1);
        let bob = account(2);
        let mut ledger = MemoryLedger::default();
        ledger.add_unspent(unspent(alice.program_hash(), 30, 0));
        ledger.add_unspent(unspent(alice.program_hash(), 80, 1));
        let client = DnaClient::new(ledger);

        let tx = client
            .transfer(&alice, asset_id(), Fixed64(100), bob.program_hash())
            .expect("covers");

        assert_eq!(tx.utxo_inputs.len(), 2);
        assert_eq!(tx.outputs.len(), 3);
        assert_eq!(tx.outputs[2].program_hash, alice.program_hash());
        assert_eq!(tx.outputs[2].value, Fixed64(10));
        assert_eq!(tx.attributes.len(), 1);
        assert_eq!(tx.attributes[0].usage, AttributeUsage::Nonce);
    }

    #[test]
    fn transfer_without_funds_fails() {
        let client = DnaClient::new(MemoryLedger::default());
        let err = client
            .transfer(&account(1), asset_id(), Fixed64(1), account(2).program_hash())
            .expect_err("no unspents");
        assert!(matches!(err, SdkError::InsufficientFunds { .. }));
    }

    #[test]
    fn asset_amount_helpers() {
        let client = DnaClient::new(MemoryLedger::default());
        assert_eq!(client.make_asset_amount(20000.0), Fixed64(2_000_000_000_000));
        assert!((client.get_raw_asset_amount(Fixed64(150_000_000)) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn identity_update_has_no_nonce() {
        let client = DnaClient::new(MemoryLedger::default());
        let tx = client.new_identity_update_transaction(
            account(1).public_key(),
            b"did:poc:1".to_vec(),
            b"ddo".to_vec(),
        );
        assert!(tx.attributes.is_empty());
    }

    #[test]
    fn wait_defaults_to_two_blocks() {
        let client = DnaClient::new(MemoryLedger::default());
        assert!(
            client
                .wait_for_generate_block(Duration::from_secs(1), None)
                .expect("waits")
        );
        assert_eq!(client.ledger().last_wait_blocks(), Some(DEFAULT_WAIT_BLOCKS));
    }
}
