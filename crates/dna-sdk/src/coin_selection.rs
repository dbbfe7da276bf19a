//! Greedy coin selection over unspent outputs of a single asset.
//!
//! Candidates are consumed in the order given. Each consumed candidate becomes one input, one
//! payment output to the destination, and a change output back to its owner when it carries
//! more than what is still owed. Selection stops as soon as the target is paid in full.
//! Running out of candidates fails with `InsufficientFunds` and returns nothing partial.

use tracing::debug;

use crate::error::SdkError;
use crate::ledger::UnspentOutput;
use crate::transaction::{TxOutput, UtxoInput};
use crate::types::{Fixed64, ProgramHash};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoinSelection {
    pub inputs: Vec<UtxoInput>,
    pub outputs: Vec<TxOutput>,
}

impl CoinSelection {
    /// Total value of outputs paying `destination`.
    #[must_use]
    pub fn paid_to(&self, destination: &ProgramHash) -> Fixed64 {
        Fixed64(
            self.outputs
                .iter()
                .filter(|output| output.program_hash == *destination)
                .map(|output| output.value.value())
                .sum(),
        )
    }
}

/// Sum of the spendable candidates, saturating at `i64::MAX`.
fn available_value(candidates: &[UnspentOutput]) -> Fixed64 {
    Fixed64(
        candidates
            .iter()
            .filter(|candidate| candidate.value.is_positive())
            .fold(0i64, |sum, candidate| sum.saturating_add(candidate.value.value())),
    )
}

pub fn select_coins(
    candidates: &[UnspentOutput],
    target: Fixed64,
    destination: ProgramHash,
) -> Result<CoinSelection, SdkError> {
    if !target.is_positive() {
        return Err(SdkError::InvalidAmount(format!(
            "transfer amount must be positive, got {target}"
        )));
    }

    let mut selection = CoinSelection::default();
    let mut remaining = target;

    for candidate in candidates {
        if !remaining.is_positive() {
            break;
        }
        if !candidate.value.is_positive() {
            continue;
        }

        selection.inputs.push(candidate.outpoint());

        let pay = remaining.min(candidate.value);
        selection.outputs.push(TxOutput {
            asset_id: candidate.asset_id,
            value: pay,
            program_hash: destination,
        });

        let change = Fixed64(candidate.value.value() - pay.value());
        if change.is_positive() {
            selection.outputs.push(TxOutput {
                asset_id: candidate.asset_id,
                value: change,
                program_hash: candidate.program_hash,
            });
        }

        remaining = Fixed64(remaining.value() - pay.value());
    }

    if remaining.is_positive() {
        return Err(SdkError::InsufficientFunds {
            required: target,
            available: available_value(candidates),
        });
    }

    debug!(
        target = %target,
        inputs = selection.inputs.len(),
        outputs = selection.outputs.len(),
        "selected coins"
    );
    Ok(selection)
}
