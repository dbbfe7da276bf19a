//! Per-slot accumulation of scripts and signatures for one transaction.
//!
//! A context is created from the sorted program hashes the resolver returned. Every hash owns
//! one slot; signers add their contract and signature to the slot matching the contract's
//! program hash. Once enough signatures are present the slots are emitted as verification
//! programs, in slot order, and attached to the transaction by the caller.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::contract::{Contract, ContractKind, ProgramBuilder};
use crate::crypto::PublicKey;
use crate::error::SdkError;
use crate::transaction::{Program, Transaction};
use crate::types::ProgramHash;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Slot {
    #[default]
    Empty,
    Single {
        code: Vec<u8>,
        signature: Vec<u8>,
    },
    Multi {
        code: Vec<u8>,
        threshold: usize,
        signatures: BTreeMap<PublicKey, Vec<u8>>,
    },
}

impl Slot {
    fn is_complete(&self) -> bool {
        match self {
            Self::Empty => false,
            Self::Single { .. } => true,
            Self::Multi {
                threshold,
                signatures,
                ..
            } => signatures.len() >= *threshold,
        }
    }

    fn to_program(&self) -> Program {
        match self {
            Self::Empty => Program::default(),
            Self::Single { code, signature } => {
                let mut parameter = ProgramBuilder::new();
                parameter.push_data(signature);
                Program {
                    code: code.clone(),
                    parameter: parameter.into_bytes(),
                }
            }
            Self::Multi {
                code, signatures, ..
            } => {
                // BTreeMap iteration yields ascending public keys, the order the script lists them.
                let mut parameter = ProgramBuilder::new();
                for signature in signatures.values() {
                    parameter.push_data(signature);
                }
                Program {
                    code: code.clone(),
                    parameter: parameter.into_bytes(),
                }
            }
        }
    }
}

/// Signature accumulator bound to one unsigned transaction.
pub struct ContractContext<'a> {
    tx: &'a Transaction,
    program_hashes: Vec<ProgramHash>,
    slots: Vec<Slot>,
}

impl<'a> ContractContext<'a> {
    /// One empty slot per hash. `program_hashes` is expected in resolver order.
    #[must_use]
    pub fn new(tx: &'a Transaction, program_hashes: Vec<ProgramHash>) -> Self {
        let slots = vec![Slot::Empty; program_hashes.len()];
        Self {
            tx,
            program_hashes,
            slots,
        }
    }

    #[must_use]
    pub const fn transaction(&self) -> &'a Transaction {
        self.tx
    }

    #[must_use]
    pub fn program_hashes(&self) -> &[ProgramHash] {
        &self.program_hashes
    }

    /// The bytes every signer signs: the unsigned serialization of the transaction.
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        self.tx.serialize_unsigned()
    }

    fn slot_index(&self, program_hash: &ProgramHash) -> Option<usize> {
        self.program_hashes.iter().position(|hash| hash == program_hash)
    }

    /// Record `signature` made by `signer` for the slot owned by `contract`.
    ///
    /// Single-signature slots keep the latest signature. Multi-signature slots keep one
    /// signature per member key and reject a second signature from the same key.
    pub fn add_contract(
        &mut self,
        contract: &Contract,
        signer: &PublicKey,
        signature: Vec<u8>,
    ) -> Result<(), SdkError> {
        let program_hash = contract.program_hash();
        let index = self
            .slot_index(&program_hash)
            .ok_or(SdkError::UnknownSigner(program_hash))?;

        if !contract.has_member(signer) {
            return Err(SdkError::SignerNotInContract {
                program_hash,
                public_key: signer.to_string(),
            });
        }

        let slot = &mut self.slots[index];
        match contract.kind() {
            ContractKind::Signature { .. } => {
                if matches!(slot, Slot::Single { .. }) {
                    trace!(slot = index, "replacing single signature");
                }
                *slot = Slot::Single {
                    code: contract.code().to_vec(),
                    signature,
                };
            }
            ContractKind::MultiSig { threshold, .. } => {
                if !matches!(slot, Slot::Multi { .. }) {
                    *slot = Slot::Multi {
                        code: contract.code().to_vec(),
                        threshold: *threshold,
                        signatures: BTreeMap::new(),
                    };
                }
                if let Slot::Multi { signatures, .. } = slot {
                    if signatures.contains_key(signer) {
                        return Err(SdkError::DuplicateSigner {
                            program_hash,
                            public_key: signer.to_string(),
                        });
                    }
                    signatures.insert(*signer, signature);
                }
            }
        }

        debug!(
            slot = index,
            program_hash = %program_hash,
            complete = self.slots[index].is_complete(),
            "added contract signature"
        );
        Ok(())
    }

    /// Whether slot `index` holds enough signatures; out-of-range indices are never complete.
    #[must_use]
    pub fn is_slot_complete(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Slot::is_complete)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Slot::is_complete)
    }

    /// Verification programs in slot order. Thresholds are not enforced here.
    #[must_use]
    pub fn programs(&self) -> Vec<Program> {
        self.slots.iter().map(Slot::to_program).collect()
    }

    #[must_use]
    pub fn into_programs(self) -> Vec<Program> {
        self.programs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Account, Signer};
    use crate::test_setup::account;
    use crate::transaction::builders::new_record_transaction;

    fn sign(context: &ContractContext<'_>, signer: &Account) -> Vec<u8> {
        signer.sign(&context.signing_data()).expect("signs")
    }

    fn multi_sig(owner: &Account, threshold: usize, members: &[&Account]) -> Contract {
        let keys: Vec<PublicKey> = members.iter().map(|member| member.public_key()).collect();
        Contract::multi_sig(owner.program_hash(), threshold, &keys).expect("valid contract")
    }

    #[test]
    fn single_signature_last_write_wins() {
        let tx = new_record_transaction("note", b"hello".to_vec());
        let signer = account(1);
        let contract = Contract::signature(signer.public_key());
        let mut context = ContractContext::new(&tx, vec![contract.program_hash()]);

        context
            .add_contract(&contract, &signer.public_key(), vec![1; 64])
            .expect("first");
        context
            .add_contract(&contract, &signer.public_key(), vec![2; 64])
            .expect("second");

        let programs = context.into_programs();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].code, contract.code());
        assert_eq!(programs[0].parameter[0], 64);
        assert_eq!(&programs[0].parameter[1..], &[2u8; 64]);
    }

    #[test]
    fn multi_sig_completeness_progresses_with_distinct_signers() {
        let tx = new_record_transaction("note", b"hello".to_vec());
        let members = [account(1), account(2), account(3)];
        let contract = multi_sig(&members[0], 2, &[&members[0], &members[1], &members[2]]);
        let mut context = ContractContext::new(&tx, vec![contract.program_hash()]);

        assert!(!context.is_complete());

        let signature = sign(&context, &members[0]);
        context
            .add_contract(&contract, &members[0].public_key(), signature)
            .expect("first signer");
        assert!(!context.is_slot_complete(0));

        let signature = sign(&context, &members[2]);
        context
            .add_contract(&contract, &members[2].public_key(), signature)
            .expect("second signer");
        assert!(context.is_slot_complete(0));

        let signature = sign(&context, &members[1]);
        context
            .add_contract(&contract, &members[1].public_key(), signature)
            .expect("third signer");
        assert!(context.is_complete());
    }

    #[test]
    fn multi_sig_below_threshold_still_emits_a_program() {
        let tx = new_record_transaction("note", b"hello".to_vec());
        let members = [account(1), account(2), account(3)];
        let contract = multi_sig(&members[0], 2, &[&members[0], &members[1], &members[2]]);
        let mut context = ContractContext::new(&tx, vec![contract.program_hash()]);

        let signature = sign(&context, &members[1]);
        context
            .add_contract(&contract, &members[1].public_key(), signature.clone())
            .expect("one signer");

        assert!(!context.is_complete());
        let programs = context.programs();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].code, contract.code());
        assert_eq!(programs[0].parameter.len(), 65);
        assert_eq!(programs[0].parameter[0], 64);
        assert_eq!(&programs[0].parameter[1..], signature.as_slice());
    }

    #[test]
    fn multi_sig_rejects_second_signature_from_same_key() {
        let tx = new_record_transaction("note", vec![]);
        let members = [account(1), account(2)];
        let contract = multi_sig(&members[0], 1, &[&members[0], &members[1]]);
        let mut context = ContractContext::new(&tx, vec![contract.program_hash()]);

        context
            .add_contract(&contract, &members[1].public_key(), vec![1; 64])
            .expect("first");
        let err = context
            .add_contract(&contract, &members[1].public_key(), vec![2; 64])
            .expect_err("duplicate");
        assert!(matches!(err, SdkError::DuplicateSigner { .. }));
    }

    #[test]
    fn unknown_program_hash_is_rejected() {
        let tx = new_record_transaction("note", vec![]);
        let signer = account(1);
        let stranger = Contract::signature(account(2).public_key());
        let mut context =
            ContractContext::new(&tx, vec![Contract::signature(signer.public_key()).program_hash()]);

        let err = context
            .add_contract(&stranger, &account(2).public_key(), vec![0; 64])
            .expect_err("unknown");
        assert!(matches!(err, SdkError::UnknownSigner(hash) if hash == stranger.program_hash()));
    }

    #[test]
    fn signer_outside_contract_is_rejected() {
        let tx = new_record_transaction("note", vec![]);
        let owner = account(1);
        let contract = Contract::signature(owner.public_key());
        let mut context = ContractContext::new(&tx, vec![contract.program_hash()]);

        let err = context
            .add_contract(&contract, &account(9).public_key(), vec![0; 64])
            .expect_err("not a member");
        assert!(matches!(err, SdkError::SignerNotInContract { .. }));
        assert!(!context.is_complete());
    }

    #[test]
    fn multi_sig_parameters_follow_public_key_order() {
        let tx = new_record_transaction("note", vec![]);
        let members = [account(4), account(5), account(6)];
        let contract = multi_sig(&members[0], 3, &[&members[0], &members[1], &members[2]]);
        let mut context = ContractContext::new(&tx, vec![contract.program_hash()]);

        for (marker, member) in members.iter().enumerate().rev() {
            let marker = u8::try_from(marker).expect("small index");
            context
                .add_contract(&contract, &member.public_key(), vec![marker; 64])
                .expect("member");
        }

        let mut by_key: Vec<(PublicKey, u8)> = members
            .iter()
            .enumerate()
            .map(|(marker, member)| (member.public_key(), u8::try_from(marker).expect("small")))
            .collect();
        by_key.sort();

        let programs = context.programs();
        let parameter = &programs[0].parameter;
        assert_eq!(parameter.len(), 3 * 65);
        for (position, (_, marker)) in by_key.iter().enumerate() {
            assert_eq!(parameter[position * 65], 64);
            assert_eq!(parameter[position * 65 + 1], *marker);
        }
    }

    #[test]
    fn untouched_slots_emit_empty_programs_and_tx_is_unchanged() {
        let tx = new_record_transaction("note", vec![]);
        let before = tx.clone();
        let first = account(1);
        let second = account(2);
        let mut hashes = vec![first.program_hash(), second.program_hash()];
        hashes.sort();
        let mut context = ContractContext::new(&tx, hashes.clone());

        let contract = Contract::signature(first.public_key());
        let signature = sign(&context, &first);
        context
            .add_contract(&contract, &first.public_key(), signature)
            .expect("signs");

        let programs = context.into_programs();
        let empty = hashes
            .iter()
            .position(|hash| *hash == second.program_hash())
            .expect("present");
        assert_eq!(programs[empty], Program::default());
        assert_eq!(programs[1 - empty].code, contract.code());
        assert_eq!(tx, before);
    }

    #[test]
    fn emitted_signature_verifies_over_signing_data() {
        let tx = new_record_transaction("note", b"payload".to_vec());
        let signer = account(3);
        let contract = Contract::signature(signer.public_key());
        let mut context = ContractContext::new(&tx, vec![contract.program_hash()]);

        let signature = sign(&context, &signer);
        context
            .add_contract(&contract, &signer.public_key(), signature)
            .expect("signs");

        let programs = context.programs();
        assert!(
            signer
                .public_key()
                .verify(&tx.serialize_unsigned(), &programs[0].parameter[1..])
        );
    }
}
