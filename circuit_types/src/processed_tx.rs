//! Transactions after the sequencer ran their public part.

use std::collections::BTreeMap;

use anyhow::{ensure, Context as _};
use enum_as_inner::EnumAsInner;
use l2_common::constants::MAX_TOTAL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX;
use l2_common::{non_empty_items, pad_array_end, FeeOverflow, Fr, Gas, GasFees};
use serde::{Deserialize, Serialize};

use crate::kernel::{KernelCircuitPublicInputs, RevertCode};
use crate::logs::TxL2Logs;
use crate::proof::ClientIvcProof;
use crate::public_kernel::{PublicKernelCircuitPrivateInputs, PublicKernelTailCircuitPrivateInputs};
use crate::side_effects::{PublicDataUpdateRequest, PublicDataWrite};
use crate::simulation_error::SimulationError;
use crate::tx::{Tx, TxHash};

/// The public kernel circuits, in the order a transaction runs through them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum PublicKernelType {
    NonPublic,
    Setup,
    AppLogic,
    Teardown,
    Tail,
}

/// Inputs of a public kernel run by the sequencer, kept for the prover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumAsInner)]
pub enum PublicKernelRequest {
    NonTail {
        kernel_type: PublicKernelType,
        inputs: PublicKernelCircuitPrivateInputs,
    },
    Tail(PublicKernelTailCircuitPrivateInputs),
}

impl PublicKernelRequest {
    pub fn kernel_type(&self) -> PublicKernelType {
        match self {
            PublicKernelRequest::NonTail { kernel_type, .. } => *kernel_type,
            PublicKernelRequest::Tail(_) => PublicKernelType::Tail,
        }
    }
}

impl From<PublicKernelTailCircuitPrivateInputs> for PublicKernelRequest {
    fn from(inputs: PublicKernelTailCircuitPrivateInputs) -> Self {
        Self::Tail(inputs)
    }
}

/// A transaction whose public part has been executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTx {
    pub hash: TxHash,
    pub data: KernelCircuitPublicInputs,
    pub client_ivc_proof: ClientIvcProof,
    pub note_encrypted_logs: TxL2Logs,
    pub encrypted_logs: TxL2Logs,
    pub unencrypted_logs: TxL2Logs,
    /// Padding transaction used to fill a block.
    pub is_empty: bool,
    pub revert_reason: Option<SimulationError>,
    pub public_kernel_requests: Vec<PublicKernelRequest>,
    /// Gas used by each public phase that ran.
    pub gas_used: BTreeMap<PublicKernelType, Gas>,
    /// Public data writes plus the protocol slots, padded to
    /// [`MAX_TOTAL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX`].
    pub final_public_data_update_requests: Vec<PublicDataUpdateRequest>,
}

/// Builds the processed form of `tx` from its final kernel output.
pub fn make_processed_tx(
    tx: &Tx,
    kernel_output: KernelCircuitPublicInputs,
    public_kernel_requests: Vec<PublicKernelRequest>,
    revert_reason: Option<SimulationError>,
    gas_used: BTreeMap<PublicKernelType, Gas>,
) -> anyhow::Result<ProcessedTx> {
    let final_public_data_update_requests = pad_array_end(
        kernel_output.end.public_data_update_requests.to_vec(),
        PublicDataUpdateRequest::empty(),
        MAX_TOTAL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX,
    )?;
    Ok(ProcessedTx {
        hash: tx.tx_hash()?,
        data: kernel_output,
        client_ivc_proof: tx.client_ivc_proof().clone(),
        note_encrypted_logs: tx.note_encrypted_logs().clone(),
        encrypted_logs: tx.encrypted_logs().clone(),
        unencrypted_logs: tx.unencrypted_logs().clone(),
        is_empty: false,
        revert_reason,
        public_kernel_requests,
        gas_used,
        final_public_data_update_requests,
    })
}

/// Effects of a transaction as they are published in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEffect {
    pub revert_code: RevertCode,
    pub transaction_fee: Fr,
    pub note_hashes: Vec<Fr>,
    pub nullifiers: Vec<Fr>,
    pub public_data_writes: Vec<PublicDataWrite>,
    pub note_encrypted_logs: TxL2Logs,
    pub encrypted_logs: TxL2Logs,
    pub unencrypted_logs: TxL2Logs,
}

impl ProcessedTx {
    pub fn revert_code(&self) -> RevertCode {
        self.data.revert_code
    }

    /// Fee charged to the fee payer at the block's gas prices.
    pub fn transaction_fee(&self) -> Result<Fr, FeeOverflow> {
        self.data.get_transaction_fee(&self.gas_fees())
    }

    fn gas_fees(&self) -> GasFees {
        self.data.constants.global_variables.gas_fees
    }

    pub fn to_tx_effect(&self) -> Result<TxEffect, FeeOverflow> {
        Ok(TxEffect {
            revert_code: self.data.revert_code,
            transaction_fee: self.transaction_fee()?,
            note_hashes: self.data.end.note_hashes.to_vec(),
            nullifiers: self.data.end.nullifiers.to_vec(),
            public_data_writes: non_empty_items(&self.final_public_data_update_requests)
                .map(PublicDataWrite::from)
                .collect(),
            note_encrypted_logs: self.note_encrypted_logs.clone(),
            encrypted_logs: self.encrypted_logs.clone(),
            unencrypted_logs: self.unencrypted_logs.clone(),
        })
    }
}

/// Structural checks a block builder runs before accepting a processed tx.
pub fn validate_processed_tx(tx: &ProcessedTx) -> anyhow::Result<()> {
    ensure!(
        tx.final_public_data_update_requests.len() == MAX_TOTAL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX,
        "expected {} final public data update requests, got {}",
        MAX_TOTAL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX,
        tx.final_public_data_update_requests.len()
    );
    if tx.is_empty {
        return Ok(());
    }
    let first_nullifier = tx
        .data
        .end
        .nullifiers
        .first()
        .context("processed tx has no nullifiers")?;
    ensure!(
        *first_nullifier == tx.hash.0,
        "tx hash {} does not match first nullifier {:#x}",
        tx.hash,
        first_nullifier
    );
    ensure!(
        tx.revert_reason.is_none() || !tx.data.revert_code.is_ok(),
        "tx {} has a revert reason but revert code {}",
        tx.hash,
        tx.data.revert_code
    );
    Ok(())
}
