use crate::types::{Fixed64, ProgramHash, Uint256};
use crate::transaction::TxType;

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("Program hash resolution failed at {step} for {hash}: {reason}")]
    Resolution {
        step: &'static str,
        hash: String,
        reason: String,
    },

    #[error("Transaction {hash} has payload type {found:?}, expected {expected:?}")]
    InvalidPayloadType {
        hash: Uint256,
        expected: TxType,
        found: TxType,
    },

    /// Returned when a signature is offered for a hash the transaction does not require.
    #[error("No slot requires program hash {0}")]
    UnknownSigner(ProgramHash),

    #[error("Public key {public_key} is not a member of contract {program_hash}")]
    SignerNotInContract {
        program_hash: ProgramHash,
        public_key: String,
    },

    #[error("Public key {public_key} already signed slot {program_hash}")]
    DuplicateSigner {
        program_hash: ProgramHash,
        public_key: String,
    },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Fixed64,
        available: Fixed64,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid contract: {0}")]
    InvalidContract(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Signing failed: {0}")]
    Crypto(String),

    #[error("RPC call {method} failed with code {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Invalid RPC response for {method}: {message}")]
    InvalidResponse { method: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] minreq::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Errors raised by the binary transaction codec.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("Unexpected end of input: needed {needed} bytes at offset {offset}")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("Trailing bytes after decode: consumed {consumed} of {total}")]
    TrailingBytes { consumed: usize, total: usize },

    #[error("Unknown transaction type tag: {0:#04x}")]
    UnknownTxType(u8),

    #[error("Unknown attribute usage: {0:#04x}")]
    UnknownAttributeUsage(u8),

    #[error("Unknown asset type: {0:#04x}")]
    UnknownAssetType(u8),

    #[error("Unknown asset record type: {0:#04x}")]
    UnknownRecordType(u8),

    #[error("Balance inputs are not supported (found {0})")]
    UnsupportedBalanceInputs(u64),

    #[error("Unknown book keeper action: {0:#04x}")]
    UnknownBookKeeperAction(u8),

    #[error("Length {0} does not fit the target platform")]
    LengthOverflow(u64),

    #[error("Invalid UTF-8 string: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid public key bytes: {0}")]
    PublicKey(String),
}
