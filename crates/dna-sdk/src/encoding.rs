//! Binary transaction codec.
//!
//! Integers are little-endian; collection and byte-string lengths use the ledger's var-int
//! (`< 0xfd` inline, then `0xfd`/`0xfe`/`0xff` followed by u16/u32/u64).

use crate::crypto::PublicKey;
use crate::error::EncodingError;
use crate::transaction::{
    Asset, AssetRecordType, AssetType, AttributeUsage, BookKeeper, BookKeeperAction,
    IdentityUpdate, Payload, Program, Record, RegisterAsset, Transaction, TxAttribute, TxOutput,
    TxType, UtxoInput,
};
use crate::types::{Fixed64, ProgramHash, Uint256};

#[derive(Debug, Default)]
pub struct Encoder {
    buffer: Vec<u8>,
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn write_var_uint(&mut self, value: u64) {
        if value < 0xfd {
            self.buffer.push(value as u8);
        } else if value <= 0xffff {
            self.buffer.push(0xfd);
            self.buffer.extend_from_slice(&(value as u16).to_le_bytes());
        } else if value <= 0xffff_ffff {
            self.buffer.push(0xfe);
            self.buffer.extend_from_slice(&(value as u32).to_le_bytes());
        } else {
            self.buffer.push(0xff);
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_var_uint(bytes.len() as u64);
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_var_string(&mut self, value: &str) {
        self.write_var_bytes(value.as_bytes());
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

pub struct Decoder<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], EncodingError> {
        let end = self
            .offset
            .checked_add(needed)
            .filter(|end| *end <= self.buf.len())
            .ok_or(EncodingError::UnexpectedEof {
                offset: self.offset,
                needed,
            })?;
        let slice = &self.buf[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], EncodingError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, EncodingError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, EncodingError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, EncodingError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_var_uint(&mut self) -> Result<u64, EncodingError> {
        Ok(match self.read_u8()? {
            0xfd => u64::from(u16::from_le_bytes(self.take_array()?)),
            0xfe => u64::from(u32::from_le_bytes(self.take_array()?)),
            0xff => u64::from_le_bytes(self.take_array()?),
            small => u64::from(small),
        })
    }

    fn read_len(&mut self) -> Result<usize, EncodingError> {
        let len = self.read_var_uint()?;
        usize::try_from(len).map_err(|_| EncodingError::LengthOverflow(len))
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, EncodingError> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_var_string(&mut self) -> Result<String, EncodingError> {
        Ok(String::from_utf8(self.read_var_bytes()?)?)
    }

    /// Fail if any input remains unread.
    pub fn finish(&self) -> Result<(), EncodingError> {
        if self.offset != self.buf.len() {
            return Err(EncodingError::TrailingBytes {
                consumed: self.offset,
                total: self.buf.len(),
            });
        }
        Ok(())
    }

    fn read_uint256(&mut self) -> Result<Uint256, EncodingError> {
        Ok(Uint256(self.take_array()?))
    }

    fn read_program_hash(&mut self) -> Result<ProgramHash, EncodingError> {
        Ok(ProgramHash(self.take_array()?))
    }

    fn read_public_key(&mut self) -> Result<PublicKey, EncodingError> {
        let bytes = self.read_var_bytes()?;
        PublicKey::from_sec1_bytes(&bytes).map_err(|e| EncodingError::PublicKey(e.to_string()))
    }

    /// Read a collection length, bounded by the bytes left so hostile counts fail fast.
    fn read_count(&mut self) -> Result<usize, EncodingError> {
        let count = self.read_len()?;
        let remaining = self.buf.len() - self.offset;
        if count > remaining {
            return Err(EncodingError::UnexpectedEof {
                offset: self.offset,
                needed: count,
            });
        }
        Ok(count)
    }
}

pub(crate) fn write_unsigned(encoder: &mut Encoder, tx: &Transaction) {
    encoder.write_u8(tx.tx_type().tag());
    encoder.write_u8(tx.payload_version);
    write_payload(encoder, &tx.payload);

    encoder.write_var_uint(tx.attributes.len() as u64);
    for attribute in &tx.attributes {
        encoder.write_u8(attribute.usage.tag());
        encoder.write_var_bytes(&attribute.data);
    }

    encoder.write_var_uint(tx.utxo_inputs.len() as u64);
    for input in &tx.utxo_inputs {
        encoder.write_bytes(input.refer_tx_id.as_bytes());
        encoder.write_u16(input.refer_tx_output_index);
    }

    // Balance inputs are part of the layout but never produced by this SDK.
    encoder.write_var_uint(0);

    encoder.write_var_uint(tx.outputs.len() as u64);
    for output in &tx.outputs {
        encoder.write_bytes(output.asset_id.as_bytes());
        encoder.write_i64(output.value.value());
        encoder.write_bytes(output.program_hash.as_bytes());
    }
}

pub(crate) fn write_programs(encoder: &mut Encoder, programs: &[Program]) {
    encoder.write_var_uint(programs.len() as u64);
    for program in programs {
        encoder.write_var_bytes(&program.parameter);
        encoder.write_var_bytes(&program.code);
    }
}

fn write_payload(encoder: &mut Encoder, payload: &Payload) {
    match payload {
        Payload::RegisterAsset(register) => {
            write_asset(encoder, &register.asset);
            encoder.write_i64(register.amount.value());
            encoder.write_var_bytes(register.issuer.as_bytes());
            encoder.write_bytes(register.controller.as_bytes());
        }
        Payload::IssueAsset | Payload::TransferAsset => {}
        Payload::Record(record) => {
            encoder.write_var_string(&record.record_type);
            encoder.write_var_bytes(&record.record_data);
        }
        Payload::IdentityUpdate(update) => {
            encoder.write_var_bytes(&update.did);
            encoder.write_var_bytes(&update.ddo);
            encoder.write_var_bytes(update.updater.as_bytes());
        }
        Payload::BookKeeper(book_keeper) => {
            encoder.write_var_bytes(book_keeper.public_key.as_bytes());
            encoder.write_u8(match book_keeper.action {
                BookKeeperAction::Add => 0x00,
                BookKeeperAction::Sub => 0x01,
            });
            encoder.write_var_bytes(&book_keeper.cert);
            encoder.write_var_bytes(book_keeper.issuer.as_bytes());
        }
    }
}

fn write_asset(encoder: &mut Encoder, asset: &Asset) {
    encoder.write_var_string(&asset.name);
    encoder.write_var_string(&asset.description);
    encoder.write_u8(asset.precision);
    encoder.write_u8(asset.asset_type.tag());
    encoder.write_u8(asset.record_type.tag());
}

pub(crate) fn read_transaction(decoder: &mut Decoder<'_>) -> Result<Transaction, EncodingError> {
    let tx_type = TxType::from_tag(decoder.read_u8()?)?;
    let payload_version = decoder.read_u8()?;
    let payload = read_payload(decoder, tx_type)?;

    let attribute_count = decoder.read_count()?;
    let mut attributes = Vec::with_capacity(attribute_count);
    for _ in 0..attribute_count {
        let usage = AttributeUsage::from_tag(decoder.read_u8()?)?;
        attributes.push(TxAttribute::new(usage, decoder.read_var_bytes()?));
    }

    let input_count = decoder.read_count()?;
    let mut utxo_inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        utxo_inputs.push(UtxoInput {
            refer_tx_id: decoder.read_uint256()?,
            refer_tx_output_index: decoder.read_u16()?,
        });
    }

    let balance_inputs = decoder.read_var_uint()?;
    if balance_inputs != 0 {
        return Err(EncodingError::UnsupportedBalanceInputs(balance_inputs));
    }

    let output_count = decoder.read_count()?;
    let mut outputs = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        outputs.push(TxOutput {
            asset_id: decoder.read_uint256()?,
            value: Fixed64(decoder.read_i64()?),
            program_hash: decoder.read_program_hash()?,
        });
    }

    let program_count = decoder.read_count()?;
    let mut programs = Vec::with_capacity(program_count);
    for _ in 0..program_count {
        let parameter = decoder.read_var_bytes()?;
        let code = decoder.read_var_bytes()?;
        programs.push(Program { code, parameter });
    }

    Ok(Transaction {
        payload_version,
        payload,
        attributes,
        utxo_inputs,
        outputs,
        programs,
    })
}

fn read_payload(decoder: &mut Decoder<'_>, tx_type: TxType) -> Result<Payload, EncodingError> {
    Ok(match tx_type {
        TxType::RegisterAsset => {
            let asset = Asset {
                name: decoder.read_var_string()?,
                description: decoder.read_var_string()?,
                precision: decoder.read_u8()?,
                asset_type: AssetType::from_tag(decoder.read_u8()?)?,
                record_type: AssetRecordType::from_tag(decoder.read_u8()?)?,
            };
            Payload::RegisterAsset(RegisterAsset {
                asset,
                amount: Fixed64(decoder.read_i64()?),
                issuer: decoder.read_public_key()?,
                controller: decoder.read_program_hash()?,
            })
        }
        TxType::IssueAsset => Payload::IssueAsset,
        TxType::TransferAsset => Payload::TransferAsset,
        TxType::Record => Payload::Record(Record {
            record_type: decoder.read_var_string()?,
            record_data: decoder.read_var_bytes()?,
        }),
        TxType::IdentityUpdate => Payload::IdentityUpdate(IdentityUpdate {
            did: decoder.read_var_bytes()?,
            ddo: decoder.read_var_bytes()?,
            updater: decoder.read_public_key()?,
        }),
        TxType::BookKeeper => {
            let public_key = decoder.read_public_key()?;
            let action = match decoder.read_u8()? {
                0x00 => BookKeeperAction::Add,
                0x01 => BookKeeperAction::Sub,
                other => return Err(EncodingError::UnknownBookKeeperAction(other)),
            };
            Payload::BookKeeper(BookKeeper {
                public_key,
                action,
                cert: decoder.read_var_bytes()?,
                issuer: decoder.read_public_key()?,
            })
        }
    })
}
