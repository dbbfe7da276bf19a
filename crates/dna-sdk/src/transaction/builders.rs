use crate::crypto::{PublicKey, random_i63};
use crate::error::SdkError;
use crate::transaction::{
    Asset, AttributeUsage, IdentityUpdate, Payload, Record, RegisterAsset, Transaction,
    TxAttribute, TxOutput, UtxoInput,
};
use crate::types::{Fixed64, ProgramHash};

#[must_use]
pub fn new_register_asset_transaction(
    asset: Asset,
    amount: Fixed64,
    issuer: PublicKey,
    controller: ProgramHash,
) -> Transaction {
    Transaction::new(Payload::RegisterAsset(RegisterAsset {
        asset,
        amount,
        issuer,
        controller,
    }))
}

#[must_use]
pub fn new_issue_asset_transaction(outputs: Vec<TxOutput>) -> Transaction {
    let mut tx = Transaction::new(Payload::IssueAsset);
    tx.outputs = outputs;
    tx
}

#[must_use]
pub fn new_transfer_asset_transaction(
    inputs: Vec<UtxoInput>,
    outputs: Vec<TxOutput>,
) -> Transaction {
    let mut tx = Transaction::new(Payload::TransferAsset);
    tx.utxo_inputs = inputs;
    tx.outputs = outputs;
    tx
}

#[must_use]
pub fn new_record_transaction(record_type: impl Into<String>, record_data: Vec<u8>) -> Transaction {
    Transaction::new(Payload::Record(Record {
        record_type: record_type.into(),
        record_data,
    }))
}

#[must_use]
pub fn new_identity_update_transaction(updater: PublicKey, did: Vec<u8>, ddo: Vec<u8>) -> Transaction {
    Transaction::new(Payload::IdentityUpdate(IdentityUpdate { did, ddo, updater }))
}

/// Nonce attribute carrying the decimal form of `value`.
#[must_use]
pub fn nonce_attribute(value: i64) -> TxAttribute {
    TxAttribute::new(AttributeUsage::Nonce, value.to_string().into_bytes())
}

/// Append a random nonce so otherwise identical transactions hash differently.
pub fn attach_nonce(tx: &mut Transaction) -> Result<(), SdkError> {
    tx.attributes.push(nonce_attribute(random_i63()?));
    Ok(())
}

/// Require an extra signer by adding its program hash as a script attribute.
pub fn attach_script_hash(tx: &mut Transaction, program_hash: ProgramHash) {
    tx.attributes.push(TxAttribute::new(
        AttributeUsage::Script,
        program_hash.as_bytes().to_vec(),
    ));
}
