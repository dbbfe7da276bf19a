//! Redeem script derivation for single- and multi-signature ownership.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::crypto::PublicKey;
use crate::error::SdkError;
use crate::types::ProgramHash;

pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
/// `OP_1`; `OP_1..=OP_16` push the numbers 1 to 16.
pub const OP_1: u8 = 0x51;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Upper bound on multi-signature participants.
pub const MAX_MULTISIG_KEYS: usize = 1024;

/// RIPEMD-160 of SHA-256 of a script.
#[must_use]
pub fn to_code_hash(code: &[u8]) -> ProgramHash {
    let sha = Sha256::digest(code);
    let ripemd = Ripemd160::digest(sha);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&ripemd);
    ProgramHash(bytes)
}

/// Incremental script writer.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    buffer: Vec<u8>,
}

impl ProgramBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_op(&mut self, op: u8) -> &mut Self {
        self.buffer.push(op);
        self
    }

    /// Push data with the shortest length prefix that fits.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_data(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len < usize::from(OP_PUSHDATA1) {
            self.buffer.push(len as u8);
        } else if len <= 0xff {
            self.buffer.push(OP_PUSHDATA1);
            self.buffer.push(len as u8);
        } else if len <= 0xffff {
            self.buffer.push(OP_PUSHDATA2);
            self.buffer.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.buffer.push(OP_PUSHDATA4);
            self.buffer.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.buffer.extend_from_slice(data);
        self
    }

    /// Push a small integer as `OP_n`, or as little-endian data beyond 16.
    pub fn push_number(&mut self, number: usize) -> &mut Self {
        match u8::try_from(number) {
            Ok(n @ 1..=16) => self.push_op(OP_1 + n - 1),
            _ => {
                let bytes = (number as u64).to_le_bytes();
                let used = bytes.iter().rposition(|b| *b != 0).map_or(1, |i| i + 1);
                self.push_data(&bytes[..used])
            }
        }
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// The ownership shape a contract encodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractKind {
    Signature {
        public_key: PublicKey,
    },
    MultiSig {
        owner: ProgramHash,
        threshold: usize,
        public_keys: Vec<PublicKey>,
    },
}

/// A redeem script together with the ownership information it was derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contract {
    code: Vec<u8>,
    program_hash: ProgramHash,
    kind: ContractKind,
}

impl Contract {
    /// `<pubkey> CHECKSIG`.
    #[must_use]
    pub fn signature(public_key: PublicKey) -> Self {
        let mut builder = ProgramBuilder::new();
        builder.push_data(public_key.as_bytes()).push_op(OP_CHECKSIG);
        let code = builder.into_bytes();

        Self {
            program_hash: to_code_hash(&code),
            code,
            kind: ContractKind::Signature { public_key },
        }
    }

    /// `<m> <pubkey>... <n> CHECKMULTISIG` with the keys in ascending byte order.
    ///
    /// The owner hash records who created the shared ownership; it is not part of the script.
    pub fn multi_sig(
        owner: ProgramHash,
        threshold: usize,
        public_keys: &[PublicKey],
    ) -> Result<Self, SdkError> {
        let n = public_keys.len();
        if n == 0 || n > MAX_MULTISIG_KEYS {
            return Err(SdkError::InvalidContract(format!(
                "multi-signature contract needs 1..={MAX_MULTISIG_KEYS} keys, got {n}"
            )));
        }
        if threshold == 0 || threshold > n {
            return Err(SdkError::InvalidContract(format!(
                "threshold {threshold} must be within 1..={n}"
            )));
        }

        let mut sorted = public_keys.to_vec();
        sorted.sort();
        if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(SdkError::InvalidContract(
                "multi-signature contract lists a public key twice".to_string(),
            ));
        }

        let mut builder = ProgramBuilder::new();
        builder.push_number(threshold);
        for key in &sorted {
            builder.push_data(key.as_bytes());
        }
        builder.push_number(n).push_op(OP_CHECKMULTISIG);
        let code = builder.into_bytes();

        Ok(Self {
            program_hash: to_code_hash(&code),
            code,
            kind: ContractKind::MultiSig {
                owner,
                threshold,
                public_keys: sorted,
            },
        })
    }

    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    #[must_use]
    pub const fn program_hash(&self) -> ProgramHash {
        self.program_hash
    }

    #[must_use]
    pub const fn kind(&self) -> &ContractKind {
        &self.kind
    }

    /// Signatures needed before the contract is satisfied.
    #[must_use]
    pub const fn threshold(&self) -> usize {
        match &self.kind {
            ContractKind::Signature { .. } => 1,
            ContractKind::MultiSig { threshold, .. } => *threshold,
        }
    }

    #[must_use]
    pub fn has_member(&self, public_key: &PublicKey) -> bool {
        match &self.kind {
            ContractKind::Signature { public_key: own } => own == public_key,
            ContractKind::MultiSig { public_keys, .. } => public_keys.binary_search(public_key).is_ok(),
        }
    }
}
