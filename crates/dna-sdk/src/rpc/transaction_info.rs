//! Transactions as the node renders them in JSON.
//!
//! `getrawtransaction` answers with an object whose byte fields are hex strings: hashes of
//! transactions and assets in reversed byte order, program hashes, attribute data, scripts and
//! parameters in natural order. Issuer and updater keys are `{"X", "Y"}` objects holding the
//! affine coordinates as decimal integers.

use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use super::{METHOD_GET_TRANSACTION, parse_hash, parse_value};
use crate::crypto::PublicKey;
use crate::error::SdkError;
use crate::transaction::{
    Asset, AssetRecordType, AssetType, AttributeUsage, BookKeeper, BookKeeperAction,
    IdentityUpdate, Payload, Program, Record, RegisterAsset, Transaction, TxAttribute, TxOutput,
    TxType, UtxoInput,
};
use crate::types::{Fixed64, ProgramHash};

const COORDINATE_LENGTH: usize = 32;

/// The node renders empty lists as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn invalid(message: String) -> SdkError {
    SdkError::InvalidResponse {
        method: METHOD_GET_TRANSACTION.to_string(),
        message,
    }
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, SdkError> {
    hex::decode(value.trim()).map_err(|e| invalid(format!("{field} is not hex: {e}")))
}

#[derive(Debug, Deserialize)]
pub(super) struct OutputInfo {
    #[serde(rename = "AssetID")]
    asset_id: String,
    #[serde(rename = "Value")]
    value: Value,
    #[serde(rename = "ProgramHash")]
    program_hash: String,
}

impl OutputInfo {
    pub(super) fn into_output(self, method: &str) -> Result<TxOutput, SdkError> {
        Ok(TxOutput {
            asset_id: parse_hash(method, &self.asset_id)?,
            value: parse_value(method, &self.value)?,
            program_hash: ProgramHash::from_str(&self.program_hash)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeInfo {
    usage: u8,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UtxoInputInfo {
    #[serde(rename = "ReferTxID")]
    refer_tx_id: String,
    refer_tx_output_index: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProgramInfo {
    #[serde(default)]
    code: String,
    #[serde(default)]
    parameter: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssetInfo {
    name: String,
    #[serde(default)]
    description: String,
    precision: u8,
    asset_type: u8,
    record_type: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RegisterAssetInfo {
    asset: AssetInfo,
    amount: Value,
    issuer: Value,
    controller: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordInfo {
    record_type: String,
    record_data: String,
}

#[derive(Debug, Deserialize)]
struct IdentityUpdateInfo {
    #[serde(rename = "DID")]
    did: String,
    #[serde(rename = "DDO")]
    ddo: String,
    #[serde(rename = "Updater")]
    updater: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BookKeeperInfo {
    #[serde(rename = "PubKey")]
    public_key: Value,
    action: u8,
    cert: String,
    issuer: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct TransactionInfo {
    tx_type: u8,
    #[serde(default)]
    payload_version: u8,
    #[serde(default)]
    payload: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    attributes: Vec<AttributeInfo>,
    #[serde(default, rename = "UTXOInputs", deserialize_with = "null_as_default")]
    utxo_inputs: Vec<UtxoInputInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    outputs: Vec<OutputInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    programs: Vec<ProgramInfo>,
    #[serde(default)]
    hash: Option<String>,
}

impl TransactionInfo {
    pub(super) fn into_transaction(self) -> Result<Transaction, SdkError> {
        let tx_type = TxType::from_tag(self.tx_type).map_err(|e| invalid(e.to_string()))?;

        let attributes = self
            .attributes
            .into_iter()
            .map(|attribute| {
                let usage =
                    AttributeUsage::from_tag(attribute.usage).map_err(|e| invalid(e.to_string()))?;
                Ok(TxAttribute::new(usage, decode_hex("attribute data", &attribute.data)?))
            })
            .collect::<Result<Vec<_>, SdkError>>()?;

        let utxo_inputs = self
            .utxo_inputs
            .into_iter()
            .map(|input| {
                Ok(UtxoInput {
                    refer_tx_id: parse_hash(METHOD_GET_TRANSACTION, &input.refer_tx_id)?,
                    refer_tx_output_index: input.refer_tx_output_index,
                })
            })
            .collect::<Result<Vec<_>, SdkError>>()?;

        let outputs = self
            .outputs
            .into_iter()
            .map(|output| output.into_output(METHOD_GET_TRANSACTION))
            .collect::<Result<Vec<_>, SdkError>>()?;

        let programs = self
            .programs
            .into_iter()
            .map(|program| {
                Ok(Program {
                    code: decode_hex("program code", &program.code)?,
                    parameter: decode_hex("program parameter", &program.parameter)?,
                })
            })
            .collect::<Result<Vec<_>, SdkError>>()?;

        let tx = Transaction {
            payload_version: self.payload_version,
            payload: parse_payload(tx_type, self.payload)?,
            attributes,
            utxo_inputs,
            outputs,
            programs,
        };

        if let Some(reported) = self.hash.filter(|hash| !hash.is_empty()) {
            let reported = parse_hash(METHOD_GET_TRANSACTION, &reported)?;
            if reported != tx.hash() {
                warn!(%reported, local = %tx.hash(), "decoded transaction hashes differently");
            }
        }

        Ok(tx)
    }
}

/// Decode a `getrawtransaction` result, either a JSON transaction or a serialized hex string.
pub(super) fn transaction_from_result(result: Value) -> Result<Transaction, SdkError> {
    match result {
        Value::String(tx_hex) => Transaction::from_hex(&tx_hex),
        Value::Object(_) => TransactionInfo::deserialize(result)
            .map_err(|e| invalid(format!("malformed transaction: {e}")))?
            .into_transaction(),
        other => Err(invalid(format!("expected a transaction object, got {other}"))),
    }
}

fn parse_payload(tx_type: TxType, payload: Value) -> Result<Payload, SdkError> {
    let malformed = |e: serde_json::Error| invalid(format!("malformed {tx_type:?} payload: {e}"));

    Ok(match tx_type {
        TxType::IssueAsset => Payload::IssueAsset,
        TxType::TransferAsset => Payload::TransferAsset,
        TxType::RegisterAsset => {
            let info = RegisterAssetInfo::deserialize(payload).map_err(malformed)?;
            let asset = Asset {
                name: info.asset.name,
                description: info.asset.description,
                precision: info.asset.precision,
                asset_type: AssetType::from_tag(info.asset.asset_type)
                    .map_err(|e| invalid(e.to_string()))?,
                record_type: AssetRecordType::from_tag(info.asset.record_type)
                    .map_err(|e| invalid(e.to_string()))?,
            };
            Payload::RegisterAsset(RegisterAsset {
                asset,
                amount: parse_fixed64(&info.amount)?,
                issuer: parse_public_key("issuer", &info.issuer)?,
                controller: ProgramHash::from_str(&info.controller)?,
            })
        }
        TxType::Record => {
            let info = RecordInfo::deserialize(payload).map_err(malformed)?;
            Payload::Record(Record {
                record_type: info.record_type,
                record_data: decode_hex("record data", &info.record_data)?,
            })
        }
        TxType::IdentityUpdate => {
            let info = IdentityUpdateInfo::deserialize(payload).map_err(malformed)?;
            Payload::IdentityUpdate(IdentityUpdate {
                did: decode_hex("DID", &info.did)?,
                ddo: decode_hex("DDO", &info.ddo)?,
                updater: parse_public_key("updater", &info.updater)?,
            })
        }
        TxType::BookKeeper => {
            let info = BookKeeperInfo::deserialize(payload).map_err(malformed)?;
            let action = match info.action {
                0x00 => BookKeeperAction::Add,
                0x01 => BookKeeperAction::Sub,
                other => return Err(invalid(format!("unknown bookkeeper action {other}"))),
            };
            Payload::BookKeeper(BookKeeper {
                public_key: parse_public_key("bookkeeper key", &info.public_key)?,
                action,
                cert: decode_hex("cert", &info.cert)?,
                issuer: parse_public_key("issuer", &info.issuer)?,
            })
        }
    })
}

/// Payload amounts are integers in `Fixed64` units; decimal strings are accepted as well.
fn parse_fixed64(value: &Value) -> Result<Fixed64, SdkError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .map(Fixed64)
            .ok_or_else(|| invalid(format!("amount {number} is not an integer"))),
        Value::String(text) => Fixed64::from_str(text),
        other => Err(invalid(format!("invalid amount {other}"))),
    }
}

/// Accept `{"X", "Y"}` decimal coordinates or a hex SEC1 encoding.
fn parse_public_key(field: &str, value: &Value) -> Result<PublicKey, SdkError> {
    match value {
        Value::String(sec1_hex) => PublicKey::from_sec1_bytes(&decode_hex(field, sec1_hex)?),
        Value::Object(point) => {
            let coordinate = |name: &str| {
                point
                    .get(name)
                    .and_then(Value::as_str)
                    .and_then(decimal_to_be_bytes)
                    .ok_or_else(|| invalid(format!("{field} has no valid {name} coordinate")))
            };

            let mut uncompressed = Vec::with_capacity(1 + 2 * COORDINATE_LENGTH);
            uncompressed.push(0x04);
            uncompressed.extend_from_slice(&coordinate("X")?);
            uncompressed.extend_from_slice(&coordinate("Y")?);
            PublicKey::from_sec1_bytes(&uncompressed)
        }
        other => Err(invalid(format!("invalid {field} key {other}"))),
    }
}

/// Big-endian bytes of a non-negative decimal integer below 2^256.
fn decimal_to_be_bytes(digits: &str) -> Option<[u8; COORDINATE_LENGTH]> {
    let digits = digits.trim();
    if digits.is_empty() {
        return None;
    }

    let mut bytes = [0u8; COORDINATE_LENGTH];
    for digit in digits.chars() {
        let mut carry = digit.to_digit(10)?;
        for byte in bytes.iter_mut().rev() {
            let acc = u32::from(*byte) * 10 + carry;
            *byte = acc.to_le_bytes()[0];
            carry = acc >> 8;
        }
        if carry != 0 {
            return None;
        }
    }
    Some(bytes)
}
