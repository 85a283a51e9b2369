//! Execution of enqueued public calls.

use std::future::Future;

use circuit_types::{
    compute_args_hash, ContractStorageRead, ContractStorageUpdateRequest, FunctionData,
    FunctionL2Logs, GlobalVariables, LogHash, NoteHash, Nullifier, Proof, PublicCallData,
    PublicCallRequest, PublicCallStackItem, PublicCircuitPublicInputs, ReadRequest, RevertCode,
    SimulationError, TxContext,
};
use l2_common::constants::RECURSIVE_PROOF_LENGTH;
use l2_common::{ContractAddress, Fr, Gas};
use serde::{Deserialize, Serialize};

/// Runs a public call and every call it makes.
///
/// A revert inside the call is reported through
/// [`PublicExecutionResult::revert_reason`]. An `Err` means the call could
/// not be simulated at all and fails the whole transaction.
pub trait PublicExecutor {
    #[allow(clippy::too_many_arguments)]
    fn simulate(
        &self,
        request: &PublicCallRequest,
        global_variables: &GlobalVariables,
        available_gas: Gas,
        tx_context: &TxContext,
        pending_nullifiers: &[Nullifier],
        transaction_fee: Fr,
        side_effect_counter: u32,
    ) -> impl Future<Output = anyhow::Result<PublicExecutionResult>> + Send;
}

/// Everything one public call did, including its nested calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicExecutionResult {
    pub execution_request: PublicCallRequest,
    pub start_side_effect_counter: u32,
    pub end_side_effect_counter: u32,
    pub start_gas_left: Gas,
    pub end_gas_left: Gas,
    pub transaction_fee: Fr,
    pub return_values: Vec<Fr>,
    pub note_hashes: Vec<NoteHash>,
    pub nullifiers: Vec<Nullifier>,
    pub nullifier_read_requests: Vec<ReadRequest>,
    pub contract_storage_reads: Vec<ContractStorageRead>,
    pub contract_storage_update_requests: Vec<ContractStorageUpdateRequest>,
    pub unencrypted_logs_hashes: Vec<LogHash>,
    pub unencrypted_logs: FunctionL2Logs,
    pub nested_executions: Vec<PublicExecutionResult>,
    /// Set when this call itself reverted.
    pub revert_reason: Option<SimulationError>,
}

impl PublicExecutionResult {
    /// A result for `request` that did nothing.
    pub fn empty_for(request: PublicCallRequest) -> Self {
        Self {
            start_side_effect_counter: request.side_effect_counter,
            end_side_effect_counter: request.side_effect_counter,
            execution_request: request,
            ..Default::default()
        }
    }

    pub fn contract_address(&self) -> ContractAddress {
        self.execution_request.contract_address
    }

    /// Contract whose storage this call touches.
    pub fn storage_contract_address(&self) -> ContractAddress {
        let storage = self.execution_request.call_context.storage_contract_address;
        if storage.is_zero() {
            self.contract_address()
        } else {
            storage
        }
    }

    pub fn gas_used(&self) -> Gas {
        self.start_gas_left - self.end_gas_left
    }

    /// This call and all nested ones, callers before callees.
    pub fn iter(&self) -> impl Iterator<Item = &PublicExecutionResult> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.nested_executions.iter().rev());
            Some(next)
        })
    }

    /// The first revert anywhere in the call tree.
    pub fn find_revert_reason(&self) -> Option<&SimulationError> {
        self.iter().find_map(|result| result.revert_reason.as_ref())
    }

    pub fn reverted(&self) -> bool {
        self.find_revert_reason().is_some()
    }

    /// Non-empty unencrypted logs of the whole call tree, in call order.
    pub fn all_unencrypted_logs(&self) -> Vec<FunctionL2Logs> {
        self.iter()
            .filter(|result| !result.unencrypted_logs.logs.is_empty())
            .map(|result| result.unencrypted_logs.clone())
            .collect()
    }

    /// Public kernel input for this call, without its nested calls.
    ///
    /// `reverted` marks the call as reverted, which the kernel uses to drop
    /// the side effects of the phase.
    pub fn to_public_call_data(
        &self,
        global_variables: &GlobalVariables,
        is_execution_request: bool,
        reverted: bool,
    ) -> PublicCallData {
        let nested_requests: Vec<_> = self
            .nested_executions
            .iter()
            .map(|nested| nested.execution_request.to_call_request())
            .collect();
        let public_inputs = PublicCircuitPublicInputs {
            call_context: self.execution_request.call_context,
            args_hash: self.execution_request.args_hash(),
            returns_hash: compute_args_hash(&self.return_values),
            note_hashes: self.note_hashes.clone(),
            nullifiers: self.nullifiers.clone(),
            nullifier_read_requests: self.nullifier_read_requests.clone(),
            contract_storage_reads: self.contract_storage_reads.clone(),
            contract_storage_update_requests: self.contract_storage_update_requests.clone(),
            public_call_stack_hashes: nested_requests.iter().map(|r| r.hash).collect(),
            unencrypted_logs_hashes: self.unencrypted_logs_hashes.clone(),
            start_side_effect_counter: self.start_side_effect_counter,
            end_side_effect_counter: self.end_side_effect_counter,
            start_gas_left: self.start_gas_left,
            end_gas_left: self.end_gas_left,
            transaction_fee: self.transaction_fee,
            // Public functions only report whether they reverted.
            revert_code: if reverted {
                RevertCode::AppLogicReverted
            } else {
                RevertCode::Ok
            },
            global_variables: *global_variables,
        };
        PublicCallData {
            call_stack_item: PublicCallStackItem {
                contract_address: self.contract_address(),
                function_data: FunctionData {
                    selector: self.execution_request.function_selector(),
                    is_private: false,
                },
                public_inputs,
                is_execution_request,
            },
            call_request: if is_execution_request {
                self.execution_request.to_call_request()
            } else {
                Default::default()
            },
            public_call_stack: nested_requests,
            proof: Proof::empty(RECURSIVE_PROOF_LENGTH),
            bytecode_hash: Fr::zero(),
        }
    }
}
