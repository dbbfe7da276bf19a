//! Blocking JSON-RPC transport to a DNA node.
//!
//! Requests are `{"method", "id", "params"}` objects posted to the configured addresses, the
//! next one being tried when the transport fails.
//! Responses carry `error` (0 on success), `desc` and `result`.

mod transaction_info;

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::RpcConfig;
use crate::error::SdkError;
use crate::ledger::{Submission, TransactionLookup, UnspentOutput, UnspentOutputQuery};
use crate::transaction::Transaction;
use crate::types::{AssetId, Fixed64, ProgramHash, Uint256};

use self::transaction_info::{OutputInfo, transaction_from_result};

pub const METHOD_GET_VERSION: &str = "getversion";
pub const METHOD_GET_BLOCK_COUNT: &str = "getblockcount";
pub const METHOD_GET_BLOCK_HASH: &str = "getblockhash";
pub const METHOD_GET_CURRENT_BLOCK_HASH: &str = "getbestblockhash";
pub const METHOD_GET_TRANSACTION: &str = "getrawtransaction";
pub const METHOD_SEND_TRANSACTION: &str = "sendrawtransaction";
pub const METHOD_GET_UNSPENT_OUTPUT: &str = "getunspendoutput";
pub const METHOD_GET_IDENTITY_UPDATE: &str = "getidentityupdate";

/// Blocks [`Submission::wait_for_blocks`] waits for when asked for zero.
pub const DEFAULT_WAIT_BLOCKS: u32 = 2;

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    result: Value,
}

#[derive(Debug)]
pub struct RpcClient {
    config: RpcConfig,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(config: RpcConfig) -> Result<Self, SdkError> {
        config.validate()?;
        Ok(Self {
            config,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn from_env() -> Result<Self, SdkError> {
        Self::new(RpcConfig::from_env()?)
    }

    #[must_use]
    pub const fn config(&self) -> &RpcConfig {
        &self.config
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Send one request and decode its `result` into `T`.
    ///
    /// Addresses are tried in configured order; only transport failures move on to the next
    /// one. Node-level errors are returned as they are.
    pub fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T, SdkError> {
        let id = self.next_request_id();
        let body = request_body(method, id, params).to_string();

        let mut last_error = None;
        for address in &self.config.addresses {
            match self.post(address, method, id, &body) {
                Err(SdkError::Http(e)) => {
                    warn!(method, address = %address, error = %e, "rpc transport failed");
                    last_error = Some(SdkError::Http(e));
                }
                other => return other,
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SdkError::Config("no rpc address configured".to_string())
        }))
    }

    fn post<T: DeserializeOwned>(
        &self,
        address: &str,
        method: &str,
        id: u64,
        body: &str,
    ) -> Result<T, SdkError> {
        debug!(method, id, address, "rpc request");

        let response = minreq::post(address)
            .with_timeout(self.config.timeout_secs)
            .with_header("Content-Type", "application/json")
            .with_body(body)
            .send()?;

        let status = response.status_code;
        let text = response.as_str()?.trim();

        if !(200..300).contains(&status) {
            return Err(SdkError::InvalidResponse {
                method: method.to_string(),
                message: format!("HTTP status {status}: {text}"),
            });
        }

        decode_response(method, text)
    }

    pub fn get_version(&self) -> Result<String, SdkError> {
        let version: Value = self.call(METHOD_GET_VERSION, vec![])?;
        Ok(match version {
            Value::String(version) => version,
            other => other.to_string(),
        })
    }

    pub fn get_block_count(&self) -> Result<u32, SdkError> {
        self.call(METHOD_GET_BLOCK_COUNT, vec![])
    }

    pub fn get_block_hash(&self, height: u32) -> Result<Uint256, SdkError> {
        let hash: String = self.call(METHOD_GET_BLOCK_HASH, vec![json!(height)])?;
        parse_hash(METHOD_GET_BLOCK_HASH, &hash)
    }

    pub fn get_current_block_hash(&self) -> Result<Uint256, SdkError> {
        let hash: String = self.call(METHOD_GET_CURRENT_BLOCK_HASH, vec![])?;
        parse_hash(METHOD_GET_CURRENT_BLOCK_HASH, &hash)
    }

    /// Raw identity record for `(method, id)`, as the node returns it.
    pub fn get_identity_update(&self, method: &str, id: &str) -> Result<Value, SdkError> {
        self.call(METHOD_GET_IDENTITY_UPDATE, vec![json!(method), json!(id)])
    }
}

impl TransactionLookup for RpcClient {
    fn get_transaction(&self, hash: &Uint256) -> Result<Transaction, SdkError> {
        let result: Value = self.call(METHOD_GET_TRANSACTION, vec![json!(hash.to_string())])?;
        transaction_from_result(result)
    }
}

impl UnspentOutputQuery for RpcClient {
    fn get_unspent_outputs(
        &self,
        asset_id: &AssetId,
        owner: &ProgramHash,
    ) -> Result<Vec<UnspentOutput>, SdkError> {
        let result: Value = self.call(
            METHOD_GET_UNSPENT_OUTPUT,
            vec![json!(owner.to_string()), json!(asset_id.to_string())],
        )?;
        parse_unspent_outputs(&result)
    }
}

impl Submission for RpcClient {
    fn send_raw_transaction(&self, tx: &Transaction) -> Result<Uint256, SdkError> {
        let hash: String = self.call(METHOD_SEND_TRANSACTION, vec![json!(tx.to_hex())])?;
        let accepted = parse_hash(METHOD_SEND_TRANSACTION, &hash)?;
        if accepted != tx.hash() {
            warn!(%accepted, local = %tx.hash(), "node returned a different transaction hash");
        }
        Ok(accepted)
    }

    fn wait_for_blocks(&self, timeout: Duration, blocks: u32) -> Result<bool, SdkError> {
        let blocks = if blocks == 0 { DEFAULT_WAIT_BLOCKS } else { blocks };
        let start = self.get_block_count()?;
        let interval = self.config.poll_interval();
        let attempts = poll_attempts(timeout, interval);

        for _ in 0..attempts {
            thread::sleep(interval);
            match self.get_block_count() {
                Ok(current) if current.saturating_sub(start) >= blocks => {
                    debug!(start, current, "blocks generated");
                    return Ok(true);
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "block count poll failed"),
            }
        }

        Ok(false)
    }
}

fn request_body(method: &str, id: u64, params: Vec<Value>) -> Value {
    json!({
        "method": method,
        "id": id.to_string(),
        "params": params,
    })
}

/// Number of polls that fit into `timeout`; always at least one.
fn poll_attempts(timeout: Duration, interval: Duration) -> u128 {
    (timeout.as_millis() / interval.as_millis().max(1)).max(1)
}

fn decode_response<T: DeserializeOwned>(method: &str, body: &str) -> Result<T, SdkError> {
    let envelope: RpcEnvelope = serde_json::from_str(body).map_err(|e| SdkError::InvalidResponse {
        method: method.to_string(),
        message: format!("malformed envelope: {e}"),
    })?;

    let rpc_error = |code: i64, message: String| SdkError::Rpc {
        method: method.to_string(),
        code,
        message,
    };

    match envelope.error {
        None | Some(Value::Null) => {}
        Some(Value::Number(code)) => match code.as_i64() {
            Some(0) => {}
            Some(code) => return Err(rpc_error(code, envelope.desc)),
            None => return Err(rpc_error(-1, envelope.desc)),
        },
        Some(Value::Object(object)) => {
            let code = object.get("code").and_then(Value::as_i64).unwrap_or(-1);
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| envelope.desc.clone(), ToString::to_string);
            return Err(rpc_error(code, message));
        }
        Some(other) => return Err(rpc_error(-1, other.to_string())),
    }

    serde_json::from_value(envelope.result).map_err(|e| SdkError::InvalidResponse {
        method: method.to_string(),
        message: format!("unexpected result: {e}"),
    })
}

fn parse_hash(method: &str, hash: &str) -> Result<Uint256, SdkError> {
    Uint256::from_str(hash.trim()).map_err(|e| SdkError::InvalidResponse {
        method: method.to_string(),
        message: format!("invalid hash '{hash}': {e}"),
    })
}

fn parse_value(method: &str, value: &Value) -> Result<Fixed64, SdkError> {
    match value {
        Value::String(text) => Fixed64::from_str(text),
        Value::Number(number) => number
            .as_f64()
            .map(Fixed64::from_raw_amount)
            .ok_or_else(|| SdkError::InvalidAmount(number.to_string())),
        other => Err(SdkError::InvalidResponse {
            method: method.to_string(),
            message: format!("invalid output value {other}"),
        }),
    }
}

/// Decode the `"txid:index"` keyed map the node returns, sorted by outpoint.
fn parse_unspent_outputs(result: &Value) -> Result<Vec<UnspentOutput>, SdkError> {
    let invalid = |message: String| SdkError::InvalidResponse {
        method: METHOD_GET_UNSPENT_OUTPUT.to_string(),
        message,
    };

    let map = match result {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        other => return Err(invalid(format!("expected an object, got {other}"))),
    };

    let mut unspents = Vec::with_capacity(map.len());
    for (key, output) in map {
        let (tx_id, index) = key
            .split_once(':')
            .ok_or_else(|| invalid(format!("unspent output key '{key}' is not txid:index")))?;
        let refer_tx_id = parse_hash(METHOD_GET_UNSPENT_OUTPUT, tx_id)?;
        let refer_tx_output_index = index
            .parse::<u16>()
            .map_err(|e| invalid(format!("unspent output key '{key}': {e}")))?;

        let output = OutputInfo::deserialize(output)?.into_output(METHOD_GET_UNSPENT_OUTPUT)?;
        unspents.push(UnspentOutput {
            asset_id: output.asset_id,
            value: output.value,
            program_hash: output.program_hash,
            refer_tx_id,
            refer_tx_output_index,
        });
    }

    unspents.sort_by_key(UnspentOutput::outpoint);
    Ok(unspents)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use super::*;
    use crate::test_setup::{account, funding_tx};

    /// Answer a single HTTP request with `body` and return the server address.
    fn serve_once(body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let address = format!("http://{}", listener.local_addr().expect("local addr"));
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = [0u8; 8192];
            let _ = stream.read(&mut request);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write");
        });
        address
    }

    fn closed_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        format!("http://{}", listener.local_addr().expect("local addr"))
    }

    fn client_for(addresses: &[String]) -> RpcClient {
        let mut config = RpcConfig::default().with_addresses(&addresses.join(";"));
        config.timeout_secs = 5;
        RpcClient::new(config).expect("valid config")
    }

    #[test]
    fn unreachable_address_falls_over_to_the_next() {
        let served = serve_once(r#"{"error":0,"desc":"SUCCESS","result":42}"#.to_string());
        let client = client_for(&[closed_address(), served]);

        assert_eq!(client.get_block_count().expect("second address answers"), 42);
    }

    #[test]
    fn every_address_unreachable_is_a_transport_error() {
        let client = client_for(&[closed_address(), closed_address()]);
        assert!(matches!(client.get_block_count(), Err(SdkError::Http(_))));
    }

    #[test]
    fn get_transaction_reads_the_node_json_object() {
        let owner = account(1).program_hash();
        let tx = funding_tx(&[(owner, 150_000_000)]);
        let output = &tx.outputs[0];
        let body = json!({
            "error": 0,
            "desc": "SUCCESS",
            "result": {
                "TxType": tx.tx_type().tag(),
                "PayloadVersion": 0,
                "Payload": null,
                "Attributes": [],
                "UTXOInputs": [],
                "Outputs": [{
                    "AssetID": output.asset_id.to_string(),
                    "Value": "1.5",
                    "ProgramHash": owner.to_string(),
                }],
                "Programs": [],
                "Hash": tx.hash().to_string(),
            },
        });
        let client = client_for(&[serve_once(body.to_string())]);

        let fetched = client.get_transaction(&tx.hash()).expect("decodes");
        assert_eq!(fetched, tx);
    }

    #[test]
    fn request_body_shape() {
        let body = request_body("getblockcount", 7, vec![json!(1)]);
        assert_eq!(body["method"], "getblockcount");
        assert_eq!(body["id"], "7");
        assert_eq!(body["params"], json!([1]));
    }

    #[test]
    fn request_ids_increase() {
        let client = RpcClient::new(RpcConfig::default()).expect("valid config");
        assert_eq!(client.next_request_id(), 1);
        assert_eq!(client.next_request_id(), 2);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = RpcConfig::default().with_addresses("ftp://node");
        assert!(matches!(RpcClient::new(config), Err(SdkError::Config(_))));
    }

    #[test]
    fn decodes_successful_result() {
        let count: u32 =
            decode_response("getblockcount", r#"{"error":0,"desc":"SUCCESS","result":42}"#)
                .expect("decodes");
        assert_eq!(count, 42);
    }

    #[test]
    fn numeric_error_code_becomes_rpc_error() {
        let err = decode_response::<u32>(
            "sendrawtransaction",
            r#"{"error":-42002,"desc":"INVALID TRANSACTION","result":null}"#,
        )
        .expect_err("must fail");
        assert!(matches!(
            err,
            SdkError::Rpc { code: -42002, ref message, .. } if message == "INVALID TRANSACTION"
        ));
    }

    #[test]
    fn object_error_becomes_rpc_error() {
        let err = decode_response::<u32>(
            "getblockcount",
            r#"{"error":{"code":-32601,"message":"method not found"}}"#,
        )
        .expect_err("must fail");
        assert!(matches!(err, SdkError::Rpc { code: -32601, .. }));
    }

    #[test]
    fn malformed_envelope_is_invalid_response() {
        let err = decode_response::<u32>("getblockcount", "not json").expect_err("must fail");
        assert!(matches!(err, SdkError::InvalidResponse { .. }));
    }

    #[test]
    fn empty_unspent_map_is_empty() {
        assert!(parse_unspent_outputs(&json!({})).expect("parses").is_empty());
        assert!(parse_unspent_outputs(&Value::Null).expect("parses").is_empty());
    }

    #[test]
    fn unspent_map_is_keyed_by_outpoint() {
        let tx_id = Uint256([3u8; 32]);
        let asset = Uint256([0xaa; 32]);
        let owner = ProgramHash([7u8; 20]);
        let result = json!({
            format!("{tx_id}:1"): {
                "AssetID": asset.to_string(),
                "Value": "1.50000000",
                "ProgramHash": owner.to_string(),
            },
            format!("{tx_id}:0"): {
                "AssetID": asset.to_string(),
                "Value": 2,
                "ProgramHash": owner.to_string(),
            },
        });

        let unspents = parse_unspent_outputs(&result).expect("parses");
        assert_eq!(unspents.len(), 2);
        assert_eq!(unspents[0].refer_tx_output_index, 0);
        assert_eq!(unspents[0].value, Fixed64(200_000_000));
        assert_eq!(unspents[1].value, Fixed64(150_000_000));
        assert!(unspents.iter().all(|unspent| unspent.refer_tx_id == tx_id));
        assert!(unspents.iter().all(|unspent| unspent.asset_id == asset));
        assert!(unspents.iter().all(|unspent| unspent.program_hash == owner));
    }

    #[test]
    fn malformed_unspent_key_is_rejected() {
        let result = json!({ "abc": { "AssetID": "", "Value": "1", "ProgramHash": "" } });
        assert!(matches!(
            parse_unspent_outputs(&result),
            Err(SdkError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn poll_attempts_cover_timeout() {
        let second = Duration::from_secs(1);
        assert_eq!(poll_attempts(Duration::from_secs(10), second), 10);
        assert_eq!(poll_attempts(Duration::from_millis(200), second), 1);
    }
}
