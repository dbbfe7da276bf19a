//! Transaction model: payload variants, attributes, inputs, outputs and programs.

pub mod builders;

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use crate::crypto::PublicKey;
use crate::encoding::{self, Decoder, Encoder};
use crate::error::{EncodingError, SdkError};
use crate::types::{AssetId, Fixed64, ProgramHash, Uint256};

/// Wire tag of a transaction kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxType {
    IssueAsset,
    BookKeeper,
    RegisterAsset,
    TransferAsset,
    Record,
    IdentityUpdate,
}

impl TxType {
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::IssueAsset => 0x01,
            Self::BookKeeper => 0x02,
            Self::RegisterAsset => 0x40,
            Self::TransferAsset => 0x80,
            Self::Record => 0x81,
            Self::IdentityUpdate => 0x90,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, EncodingError> {
        Ok(match tag {
            0x01 => Self::IssueAsset,
            0x02 => Self::BookKeeper,
            0x40 => Self::RegisterAsset,
            0x80 => Self::TransferAsset,
            0x81 => Self::Record,
            0x90 => Self::IdentityUpdate,
            other => return Err(EncodingError::UnknownTxType(other)),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetType {
    Currency,
    Share,
    Invoice,
    Token,
}

impl AssetType {
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Currency => 0x00,
            Self::Share => 0x01,
            Self::Invoice => 0x10,
            Self::Token => 0x11,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, EncodingError> {
        Ok(match tag {
            0x00 => Self::Currency,
            0x01 => Self::Share,
            0x10 => Self::Invoice,
            0x11 => Self::Token,
            other => return Err(EncodingError::UnknownAssetType(other)),
        })
    }
}

/// How balances of an asset are tracked by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetRecordType {
    Utxo,
    Balance,
}

impl AssetRecordType {
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Utxo => 0x00,
            Self::Balance => 0x01,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, EncodingError> {
        Ok(match tag {
            0x00 => Self::Utxo,
            0x01 => Self::Balance,
            other => return Err(EncodingError::UnknownRecordType(other)),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub description: String,
    pub precision: u8,
    pub asset_type: AssetType,
    pub record_type: AssetRecordType,
}

impl Asset {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        precision: u8,
        asset_type: AssetType,
        record_type: AssetRecordType,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            precision,
            asset_type,
            record_type,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterAsset {
    pub asset: Asset,
    pub amount: Fixed64,
    pub issuer: PublicKey,
    pub controller: ProgramHash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub record_type: String,
    pub record_data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityUpdate {
    pub did: Vec<u8>,
    pub ddo: Vec<u8>,
    pub updater: PublicKey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookKeeperAction {
    Add,
    Sub,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookKeeper {
    pub public_key: PublicKey,
    pub action: BookKeeperAction,
    pub cert: Vec<u8>,
    pub issuer: PublicKey,
}

/// Type-specific body of a transaction; the variant determines the wire tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    RegisterAsset(RegisterAsset),
    IssueAsset,
    TransferAsset,
    Record(Record),
    IdentityUpdate(IdentityUpdate),
    BookKeeper(BookKeeper),
}

impl Payload {
    #[must_use]
    pub const fn tx_type(&self) -> TxType {
        match self {
            Self::RegisterAsset(_) => TxType::RegisterAsset,
            Self::IssueAsset => TxType::IssueAsset,
            Self::TransferAsset => TxType::TransferAsset,
            Self::Record(_) => TxType::Record,
            Self::IdentityUpdate(_) => TxType::IdentityUpdate,
            Self::BookKeeper(_) => TxType::BookKeeper,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeUsage {
    Nonce,
    /// Data is a program hash that must additionally sign the transaction.
    Script,
    DescriptionUrl,
    Description,
}

impl AttributeUsage {
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Nonce => 0x00,
            Self::Script => 0x20,
            Self::DescriptionUrl => 0x81,
            Self::Description => 0x90,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, EncodingError> {
        Ok(match tag {
            0x00 => Self::Nonce,
            0x20 => Self::Script,
            0x81 => Self::DescriptionUrl,
            0x90 => Self::Description,
            other => return Err(EncodingError::UnknownAttributeUsage(other)),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxAttribute {
    pub usage: AttributeUsage,
    pub data: Vec<u8>,
}

impl TxAttribute {
    #[must_use]
    pub fn new(usage: AttributeUsage, data: Vec<u8>) -> Self {
        Self { usage, data }
    }
}

/// Reference to an output of an earlier transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtxoInput {
    pub refer_tx_id: Uint256,
    pub refer_tx_output_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub asset_id: AssetId,
    pub value: Fixed64,
    pub program_hash: ProgramHash,
}

/// Redeem script plus the pushed signature arguments that satisfy it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub code: Vec<u8>,
    pub parameter: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub payload_version: u8,
    pub payload: Payload,
    pub attributes: Vec<TxAttribute>,
    pub utxo_inputs: Vec<UtxoInput>,
    pub outputs: Vec<TxOutput>,
    pub programs: Vec<Program>,
}

impl Transaction {
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        Self {
            payload_version: 0,
            payload,
            attributes: Vec::new(),
            utxo_inputs: Vec::new(),
            outputs: Vec::new(),
            programs: Vec::new(),
        }
    }

    #[must_use]
    pub const fn tx_type(&self) -> TxType {
        self.payload.tx_type()
    }

    /// Bytes covered by signatures: everything except the programs.
    #[must_use]
    pub fn serialize_unsigned(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        encoding::write_unsigned(&mut encoder, self);
        encoder.into_bytes()
    }

    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        encoding::write_unsigned(&mut encoder, self);
        encoding::write_programs(&mut encoder, &self.programs);
        encoder.into_bytes()
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Decode a signed transaction and fail if trailing bytes remain.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, EncodingError> {
        let mut decoder = Decoder::new(bytes);
        let tx = encoding::read_transaction(&mut decoder)?;
        decoder.finish()?;
        Ok(tx)
    }

    pub fn from_hex(tx_hex: &str) -> Result<Self, SdkError> {
        Ok(Self::deserialize(&hex::decode(tx_hex.trim())?)?)
    }

    /// Double SHA-256 of the unsigned serialization.
    #[must_use]
    pub fn hash(&self) -> Uint256 {
        let first = Sha256::digest(self.serialize_unsigned());
        Uint256(Sha256::digest(first).into())
    }

    /// Distinct asset ids referenced by the outputs, ascending.
    #[must_use]
    pub fn output_asset_ids(&self) -> BTreeSet<AssetId> {
        self.outputs.iter().map(|output| output.asset_id).collect()
    }

    pub fn set_programs(&mut self, programs: Vec<Program>) {
        self.programs = programs;
    }
}
