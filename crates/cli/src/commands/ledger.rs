use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Subcommand, ValueEnum};
use serde_json::Value;
use tracing::{info, warn};

use dna_sdk::{
    Account, Asset, AssetId, AssetRecordType, AssetType, DnaClient, Fixed64, Signer, TxOutput,
    Uint256,
};

use super::derived_account;

const DEFAULT_WAIT_SECS: u64 = 30;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AssetTypeArg {
    Currency,
    Share,
    Invoice,
    Token,
}

impl From<AssetTypeArg> for AssetType {
    fn from(value: AssetTypeArg) -> Self {
        match value {
            AssetTypeArg::Currency => Self::Currency,
            AssetTypeArg::Share => Self::Share,
            AssetTypeArg::Invoice => Self::Invoice,
            AssetTypeArg::Token => Self::Token,
        }
    }
}

/// Commands that talk to a DNA node over JSON-RPC.
#[derive(Subcommand, Debug)]
pub enum Ledger {
    /// Print the node version
    Version,
    /// Register a new UTXO asset signed by the issuer
    Register {
        /// Account index of the issuer
        #[arg(long = "issuer-index", default_value_t = 0)]
        issuer_index: u32,
        /// Account index of the controller allowed to issue the asset
        #[arg(long = "controller-index", default_value_t = 2)]
        controller_index: u32,
        #[arg(long = "name", default_value = "TS01")]
        name: String,
        #[arg(long = "precision", default_value_t = 4)]
        precision: u8,
        #[arg(long = "asset-type", value_enum, default_value_t = AssetTypeArg::Token)]
        asset_type: AssetTypeArg,
        /// Registered amount in whole units
        #[arg(long = "amount", default_value_t = 20000.0)]
        amount: f64,
        /// Seconds to wait for a block after submitting; 0 skips waiting
        #[arg(long = "wait-secs", default_value_t = DEFAULT_WAIT_SECS)]
        wait_secs: u64,
    },
    /// Issue units of a registered asset, signed by its controller
    Issue {
        /// Asset id (registration transaction hash)
        #[arg(long = "asset-id")]
        asset_id: String,
        #[arg(long = "controller-index", default_value_t = 2)]
        controller_index: u32,
        /// Account index receiving the issued units
        #[arg(long = "to-index", default_value_t = 0)]
        to_index: u32,
        #[arg(long = "amount")]
        amount: f64,
        #[arg(long = "wait-secs", default_value_t = DEFAULT_WAIT_SECS)]
        wait_secs: u64,
    },
    /// Transfer units between two derived accounts
    Transfer {
        #[arg(long = "asset-id")]
        asset_id: String,
        #[arg(long = "from-index", default_value_t = 0)]
        from_index: u32,
        #[arg(long = "to-index", default_value_t = 1)]
        to_index: u32,
        #[arg(long = "amount")]
        amount: f64,
        #[arg(long = "wait-secs", default_value_t = DEFAULT_WAIT_SECS)]
        wait_secs: u64,
    },
    /// Publish a DDO for `did:<method>:<id>`, signed by the updater
    IdentityUpdate {
        #[arg(long = "index", default_value_t = 0)]
        index: u32,
        #[arg(long = "method", default_value = "poc")]
        method: String,
        #[arg(long = "id")]
        id: String,
        #[arg(long = "ddo")]
        ddo: String,
        #[arg(long = "wait-secs", default_value_t = DEFAULT_WAIT_SECS)]
        wait_secs: u64,
    },
    /// Look up the DDO published for `did:<method>:<id>`
    Identity {
        #[arg(long = "method", default_value = "poc")]
        method: String,
        #[arg(long = "id")]
        id: String,
    },
    /// Register, issue, transfer and publish an identity with freshly generated accounts
    Demo {
        #[arg(long = "wait-secs", default_value_t = DEFAULT_WAIT_SECS)]
        wait_secs: u64,
    },
}

impl Ledger {
    pub fn handle(&self, client: &DnaClient, seed_hex: Option<&str>) -> Result<()> {
        match self {
            Self::Version => {
                println!("version: {}", client.get_version()?);
            }
            Self::Register {
                issuer_index,
                controller_index,
                name,
                precision,
                asset_type,
                amount,
                wait_secs,
            } => {
                let issuer = derived_account(seed_hex, *issuer_index)?;
                let controller = derived_account(seed_hex, *controller_index)?;
                let asset = Asset::new(
                    name.clone(),
                    *precision,
                    (*asset_type).into(),
                    AssetRecordType::Utxo,
                );
                let asset_id = register(client, asset, *amount, &issuer, &controller, *wait_secs)?;
                println!("asset_id: {asset_id}");
                println!("controller: {}", controller.program_hash());
            }
            Self::Issue {
                asset_id,
                controller_index,
                to_index,
                amount,
                wait_secs,
            } => {
                let controller = derived_account(seed_hex, *controller_index)?;
                let to = derived_account(seed_hex, *to_index)?;
                let tx_hash = issue(
                    client,
                    parse_asset_id(asset_id)?,
                    *amount,
                    &controller,
                    &to,
                    *wait_secs,
                )?;
                println!("txid: {tx_hash}");
            }
            Self::Transfer {
                asset_id,
                from_index,
                to_index,
                amount,
                wait_secs,
            } => {
                let from = derived_account(seed_hex, *from_index)?;
                let to = derived_account(seed_hex, *to_index)?;
                let tx_hash = transfer(
                    client,
                    parse_asset_id(asset_id)?,
                    *amount,
                    &from,
                    &to,
                    *wait_secs,
                )?;
                println!("txid: {tx_hash}");
            }
            Self::IdentityUpdate {
                index,
                method,
                id,
                ddo,
                wait_secs,
            } => {
                let updater = derived_account(seed_hex, *index)?;
                let did = format!("did:{method}:{id}");
                let tx_hash = identity_update(client, &updater, &did, ddo, *wait_secs)?;
                println!("did: {did}");
                println!("txid: {tx_hash}");
            }
            Self::Identity { method, id } => {
                println!("ddo: {}", ddo_text(&client.get_identity_update(method, id)?));
            }
            Self::Demo { wait_secs } => demo(client, *wait_secs)?,
        }

        Ok(())
    }
}

fn parse_asset_id(asset_id: &str) -> Result<AssetId> {
    Uint256::from_str(asset_id).with_context(|| format!("invalid asset id '{asset_id}'"))
}

fn ddo_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn wait_for_block(client: &DnaClient, wait_secs: u64) -> Result<()> {
    if wait_secs == 0 {
        return Ok(());
    }
    if !client.wait_for_generate_block(Duration::from_secs(wait_secs), Some(1))? {
        warn!(wait_secs, "no new block observed before timeout");
    }
    Ok(())
}

fn register(
    client: &DnaClient,
    asset: Asset,
    amount: f64,
    issuer: &Account,
    controller: &Account,
    wait_secs: u64,
) -> Result<Uint256> {
    let amount = client.make_asset_amount(amount);
    let mut tx = client.new_register_asset_transaction(
        asset,
        amount,
        issuer.public_key(),
        client.account_program_hash(controller),
    )?;

    let asset_id = client
        .send_transaction(issuer, &mut tx)
        .context("register transaction rejected")?;
    wait_for_block(client, wait_secs)?;

    info!(%asset_id, %amount, "asset registered");
    Ok(asset_id)
}

fn issue(
    client: &DnaClient,
    asset_id: AssetId,
    amount: f64,
    controller: &Account,
    to: &Account,
    wait_secs: u64,
) -> Result<Uint256> {
    let amount = client.make_asset_amount(amount);
    let mut tx = client.new_issue_asset_transaction(vec![TxOutput {
        asset_id,
        value: amount,
        program_hash: client.account_program_hash(to),
    }])?;

    let tx_hash = client
        .send_transaction(controller, &mut tx)
        .context("issue transaction rejected")?;
    wait_for_block(client, wait_secs)?;

    info!(%asset_id, %amount, "asset issued");
    Ok(tx_hash)
}

fn transfer(
    client: &DnaClient,
    asset_id: AssetId,
    amount: f64,
    from: &Account,
    to: &Account,
    wait_secs: u64,
) -> Result<Uint256> {
    let amount: Fixed64 = client.make_asset_amount(amount);
    let mut tx = client.transfer(from, asset_id, amount, client.account_program_hash(to))?;

    let tx_hash = client
        .send_transaction(from, &mut tx)
        .context("transfer transaction rejected")?;
    wait_for_block(client, wait_secs)?;

    info!(%asset_id, %amount, "asset transferred");
    Ok(tx_hash)
}

fn identity_update(
    client: &DnaClient,
    updater: &Account,
    did: &str,
    ddo: &str,
    wait_secs: u64,
) -> Result<Uint256> {
    let mut tx = client.new_identity_update_transaction(
        updater.public_key(),
        did.as_bytes().to_vec(),
        ddo.as_bytes().to_vec(),
    );

    let tx_hash = client
        .send_transaction(updater, &mut tx)
        .context("identity update rejected")?;
    wait_for_block(client, wait_secs)?;
    Ok(tx_hash)
}

fn demo(client: &DnaClient, wait_secs: u64) -> Result<()> {
    let issuer = Account::generate()?;
    let receiver = Account::generate()?;
    let controller = Account::generate()?;

    let asset = Asset::new("TS01", 4, AssetType::Token, AssetRecordType::Utxo);
    let asset_id = register(client, asset, 20000.0, &issuer, &controller, wait_secs)?;
    println!(
        "register: asset_id={asset_id} amount=20000 controller={}",
        controller.program_hash()
    );

    issue(client, asset_id, 100.0, &controller, &issuer, wait_secs)?;
    println!("issue: to={} amount=100", issuer.program_hash());

    transfer(client, asset_id, 10.0, &issuer, &receiver, wait_secs)?;
    println!(
        "transfer: from={} to={} amount=10",
        issuer.program_hash(),
        receiver.program_hash()
    );

    let (method, id, ddo) = ("poc", "123456", "Hello world");
    let did = format!("did:{method}:{id}");
    identity_update(client, &issuer, &did, ddo, wait_secs)?;

    let published = ddo_text(&client.get_identity_update(method, id)?);
    if published != ddo {
        bail!("published DDO '{published}' does not match '{ddo}'");
    }
    println!("identity: did={did} ddo={ddo}");

    Ok(())
}
