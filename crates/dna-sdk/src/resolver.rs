//! Program-hash resolution: which identities must sign a transaction.
//!
//! The result is a sorted, de-duplicated list. Co-signers resolving the same transaction
//! independently obtain the same list, so slot indices in their signing contexts line up.
//!
//! Sources, in order:
//! 1. owners of the outputs spent by each UTXO input (requires a lookup per input),
//! 2. attributes with [`AttributeUsage::Script`] carrying a raw program hash,
//! 3. payload rules: the issuer of a registration, the controller of every issued asset,
//!    the updater of an identity.
//!
//! Any lookup failure aborts the whole resolution; no partial set is returned.

use std::collections::BTreeSet;

use tracing::debug;

use crate::contract::Contract;
use crate::error::SdkError;
use crate::ledger::TransactionLookup;
use crate::transaction::{AttributeUsage, Payload, Transaction, TxType};
use crate::types::ProgramHash;

pub struct ProgramHashResolver<'a, L: ?Sized> {
    lookup: &'a L,
}

impl<'a, L> ProgramHashResolver<'a, L>
where
    L: TransactionLookup + ?Sized,
{
    pub const fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    pub fn resolve(&self, tx: &Transaction) -> Result<Vec<ProgramHash>, SdkError> {
        let mut hashes = BTreeSet::new();

        self.collect_input_owners(tx, &mut hashes)?;
        Self::collect_script_attributes(tx, &mut hashes)?;
        self.collect_payload_signers(tx, &mut hashes)?;

        debug!(
            tx_type = ?tx.tx_type(),
            inputs = tx.utxo_inputs.len(),
            required = hashes.len(),
            "resolved program hashes"
        );

        Ok(hashes.into_iter().collect())
    }

    fn collect_input_owners(
        &self,
        tx: &Transaction,
        hashes: &mut BTreeSet<ProgramHash>,
    ) -> Result<(), SdkError> {
        for input in &tx.utxo_inputs {
            let referenced = self
                .lookup
                .get_transaction(&input.refer_tx_id)
                .map_err(|e| SdkError::Resolution {
                    step: "utxo input",
                    hash: input.refer_tx_id.to_string(),
                    reason: e.to_string(),
                })?;

            let output = referenced
                .outputs
                .get(usize::from(input.refer_tx_output_index))
                .ok_or_else(|| SdkError::Resolution {
                    step: "utxo input",
                    hash: input.refer_tx_id.to_string(),
                    reason: format!(
                        "output index {} out of range ({} outputs)",
                        input.refer_tx_output_index,
                        referenced.outputs.len()
                    ),
                })?;

            hashes.insert(output.program_hash);
        }

        Ok(())
    }

    fn collect_script_attributes(
        tx: &Transaction,
        hashes: &mut BTreeSet<ProgramHash>,
    ) -> Result<(), SdkError> {
        for attribute in tx
            .attributes
            .iter()
            .filter(|attribute| attribute.usage == AttributeUsage::Script)
        {
            let hash =
                ProgramHash::from_slice(&attribute.data).map_err(|e| SdkError::Resolution {
                    step: "script attribute",
                    hash: hex::encode(&attribute.data),
                    reason: e.to_string(),
                })?;
            hashes.insert(hash);
        }

        Ok(())
    }

    fn collect_payload_signers(
        &self,
        tx: &Transaction,
        hashes: &mut BTreeSet<ProgramHash>,
    ) -> Result<(), SdkError> {
        match &tx.payload {
            Payload::RegisterAsset(register) => {
                hashes.insert(Contract::signature(register.issuer).program_hash());
            }
            Payload::IssueAsset => {
                for asset_id in tx.output_asset_ids() {
                    let registration = self.lookup.get_transaction(&asset_id).map_err(|e| {
                        SdkError::Resolution {
                            step: "asset registration",
                            hash: asset_id.to_string(),
                            reason: e.to_string(),
                        }
                    })?;

                    let Payload::RegisterAsset(register) = &registration.payload else {
                        return Err(SdkError::InvalidPayloadType {
                            hash: asset_id,
                            expected: TxType::RegisterAsset,
                            found: registration.tx_type(),
                        });
                    };
                    hashes.insert(register.controller);
                }
            }
            Payload::IdentityUpdate(update) => {
                hashes.insert(Contract::signature(update.updater).program_hash());
            }
            Payload::TransferAsset | Payload::Record(_) | Payload::BookKeeper(_) => {}
        }

        Ok(())
    }
}
