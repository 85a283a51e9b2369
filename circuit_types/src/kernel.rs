//! Public inputs shared by the private and public kernels, and the final
//! kernel output handed to the rollup.

use l2_common::constants::{
    MAX_ENCRYPTED_LOGS_PER_TX, MAX_NEW_NOTE_HASHES_PER_TX, MAX_NEW_NULLIFIERS_PER_TX,
    MAX_NOTE_ENCRYPTED_LOGS_PER_TX, MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX,
    MAX_UNENCRYPTED_LOGS_PER_TX,
};
use l2_common::{add_fees, BoundedVec, ContractAddress, FeeOverflow, Fr, Gas, GasFees, GasSettings};
use serde::{Deserialize, Serialize};

use crate::side_effects::{LogHash, PublicDataUpdateRequest};

/// Chain-level context a user signs over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxContext {
    pub chain_id: Fr,
    pub version: Fr,
    pub gas_settings: GasSettings,
}

/// Block-level values fixed by the sequencer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalVariables {
    pub chain_id: Fr,
    pub version: Fr,
    pub block_number: u64,
    pub timestamp: u64,
    pub coinbase: Fr,
    pub fee_recipient: ContractAddress,
    pub gas_fees: GasFees,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombinedConstantData {
    pub tx_context: TxContext,
    /// Empty until the transaction reaches a sequencer.
    pub global_variables: GlobalVariables,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RollupValidationRequests {
    /// Last block the transaction may be included in.
    pub max_block_number: Option<u64>,
}

impl RollupValidationRequests {
    /// Combines two constraints, keeping the tighter one.
    pub fn merge(self, other: Self) -> Self {
        let max_block_number = match (self.max_block_number, other.max_block_number) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self { max_block_number }
    }
}

/// Which phases of a transaction reverted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[repr(u8)]
pub enum RevertCode {
    #[default]
    Ok = 0,
    AppLogicReverted = 1,
    TeardownReverted = 2,
    BothReverted = 3,
}

impl RevertCode {
    pub fn is_ok(self) -> bool {
        self == RevertCode::Ok
    }

    /// Code after an app-logic revert on top of `self`.
    pub fn with_app_logic_revert(self) -> Self {
        match self {
            RevertCode::Ok | RevertCode::AppLogicReverted => RevertCode::AppLogicReverted,
            RevertCode::TeardownReverted | RevertCode::BothReverted => RevertCode::BothReverted,
        }
    }

    /// Code after a teardown revert on top of `self`.
    pub fn with_teardown_revert(self) -> Self {
        match self {
            RevertCode::Ok | RevertCode::TeardownReverted => RevertCode::TeardownReverted,
            RevertCode::AppLogicReverted | RevertCode::BothReverted => RevertCode::BothReverted,
        }
    }
}

/// Side effects of a transaction in their final, siloed and sorted form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedAccumulatedData {
    pub note_hashes: BoundedVec<Fr, MAX_NEW_NOTE_HASHES_PER_TX>,
    pub nullifiers: BoundedVec<Fr, MAX_NEW_NULLIFIERS_PER_TX>,
    pub note_encrypted_logs_hashes: BoundedVec<LogHash, MAX_NOTE_ENCRYPTED_LOGS_PER_TX>,
    pub encrypted_logs_hashes: BoundedVec<LogHash, MAX_ENCRYPTED_LOGS_PER_TX>,
    pub unencrypted_logs_hashes: BoundedVec<LogHash, MAX_UNENCRYPTED_LOGS_PER_TX>,
    pub note_encrypted_log_preimages_length: u64,
    pub encrypted_log_preimages_length: u64,
    pub unencrypted_log_preimages_length: u64,
    pub public_data_update_requests:
        BoundedVec<PublicDataUpdateRequest, MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX>,
    pub gas_used: Gas,
}

/// Output of the last kernel circuit of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelCircuitPublicInputs {
    pub rollup_validation_requests: RollupValidationRequests,
    pub end: CombinedAccumulatedData,
    pub constants: CombinedConstantData,
    pub revert_code: RevertCode,
    pub fee_payer: ContractAddress,
}

impl KernelCircuitPublicInputs {
    /// Inclusion fee plus the price of all gas used at `gas_fees`.
    pub fn get_transaction_fee(&self, gas_fees: &GasFees) -> Result<Fr, FeeOverflow> {
        add_fees(
            self.end.gas_used.compute_fee(gas_fees)?,
            self.constants.tx_context.gas_settings.inclusion_fee,
        )
    }
}
