//! Public inputs of public functions and of the public kernel circuits.

use l2_common::constants::{
    MAX_ENCRYPTED_LOGS_PER_TX, MAX_NEW_NOTE_HASHES_PER_TX, MAX_NEW_NULLIFIERS_PER_TX,
    MAX_NOTE_ENCRYPTED_LOGS_PER_TX, MAX_NULLIFIER_READ_REQUESTS_PER_TX,
    MAX_PUBLIC_CALL_STACK_LENGTH_PER_TX, MAX_PUBLIC_DATA_READS_PER_TX,
    MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX, MAX_UNENCRYPTED_LOGS_PER_TX,
};
use l2_common::{BoundedVec, ContractAddress, Fr, Gas, IsEmpty};
use serde::{Deserialize, Serialize};

use crate::call_request::{CallContext, CallRequest, FunctionData};
use crate::kernel::{CombinedConstantData, GlobalVariables, RevertCode, RollupValidationRequests};
use crate::proof::{Proof, VerificationKey};
use crate::side_effects::{
    ContractStorageRead, ContractStorageUpdateRequest, LogHash, NoteHash, Nullifier,
    PublicDataRead, PublicDataUpdateRequest, ReadRequest, ScopedReadRequest,
};

/// Side effects of one half (non-revertible or revertible) of a transaction
/// while it runs through the public kernels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccumulatedData {
    pub note_hashes: BoundedVec<NoteHash, MAX_NEW_NOTE_HASHES_PER_TX>,
    pub nullifiers: BoundedVec<Nullifier, MAX_NEW_NULLIFIERS_PER_TX>,
    pub note_encrypted_logs_hashes: BoundedVec<LogHash, MAX_NOTE_ENCRYPTED_LOGS_PER_TX>,
    pub encrypted_logs_hashes: BoundedVec<LogHash, MAX_ENCRYPTED_LOGS_PER_TX>,
    pub unencrypted_logs_hashes: BoundedVec<LogHash, MAX_UNENCRYPTED_LOGS_PER_TX>,
    pub public_data_update_requests:
        BoundedVec<PublicDataUpdateRequest, MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX>,
    /// Enqueued calls not yet executed, in execution order.
    pub public_call_stack: BoundedVec<CallRequest, MAX_PUBLIC_CALL_STACK_LENGTH_PER_TX>,
    pub gas_used: Gas,
}

impl PublicAccumulatedData {
    /// Drops every side effect, keeping only the gas used so far.
    pub fn discard_side_effects(&mut self) {
        *self = Self {
            gas_used: self.gas_used,
            ..Self::default()
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicValidationRequests {
    pub for_rollup: RollupValidationRequests,
    pub nullifier_read_requests: BoundedVec<ScopedReadRequest, MAX_NULLIFIER_READ_REQUESTS_PER_TX>,
    pub public_data_reads: BoundedVec<PublicDataRead, MAX_PUBLIC_DATA_READS_PER_TX>,
}

/// Output of the setup, app-logic and teardown public kernels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKernelCircuitPublicInputs {
    pub validation_requests: PublicValidationRequests,
    pub end_non_revertible_data: PublicAccumulatedData,
    pub end: PublicAccumulatedData,
    pub constants: CombinedConstantData,
    pub revert_code: RevertCode,
    pub public_teardown_call_request: CallRequest,
    pub fee_payer: ContractAddress,
}

impl PublicKernelCircuitPublicInputs {
    pub fn needs_setup(&self) -> bool {
        !self.end_non_revertible_data.public_call_stack.is_empty()
    }

    pub fn needs_app_logic(&self) -> bool {
        !self.end.public_call_stack.is_empty()
    }

    pub fn needs_teardown(&self) -> bool {
        !self.public_teardown_call_request.is_empty()
    }
}

/// Public inputs of one public function execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCircuitPublicInputs {
    pub call_context: CallContext,
    pub args_hash: Fr,
    pub returns_hash: Fr,
    pub note_hashes: Vec<NoteHash>,
    pub nullifiers: Vec<Nullifier>,
    pub nullifier_read_requests: Vec<ReadRequest>,
    pub contract_storage_reads: Vec<ContractStorageRead>,
    pub contract_storage_update_requests: Vec<ContractStorageUpdateRequest>,
    pub public_call_stack_hashes: Vec<Fr>,
    pub unencrypted_logs_hashes: Vec<LogHash>,
    pub start_side_effect_counter: u32,
    pub end_side_effect_counter: u32,
    pub start_gas_left: Gas,
    pub end_gas_left: Gas,
    pub transaction_fee: Fr,
    pub revert_code: RevertCode,
    pub global_variables: GlobalVariables,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCallStackItem {
    pub contract_address: ContractAddress,
    pub function_data: FunctionData,
    pub public_inputs: PublicCircuitPublicInputs,
    /// Set for enqueued calls, unset for calls nested inside them.
    pub is_execution_request: bool,
}

impl PublicCallStackItem {
    pub fn gas_used(&self) -> Gas {
        self.public_inputs.start_gas_left - self.public_inputs.end_gas_left
    }

    pub fn reverted(&self) -> bool {
        !self.public_inputs.revert_code.is_ok()
    }
}

/// One public call as the public kernel consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCallData {
    pub call_stack_item: PublicCallStackItem,
    /// The enqueued request this call answers. Empty for nested calls.
    pub call_request: CallRequest,
    /// Requests for the calls this one made.
    pub public_call_stack: Vec<CallRequest>,
    pub proof: Proof,
    pub bytecode_hash: Fr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKernelData {
    pub public_inputs: PublicKernelCircuitPublicInputs,
    pub proof: Proof,
    pub vk: VerificationKey,
}

/// Inputs of the setup, app-logic and teardown kernels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKernelCircuitPrivateInputs {
    pub previous_kernel: PublicKernelData,
    pub public_call: PublicCallData,
}

/// Inputs of the public kernel tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKernelTailCircuitPrivateInputs {
    pub previous_kernel: PublicKernelData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discarding_keeps_gas() {
        let mut data = PublicAccumulatedData {
            gas_used: Gas::new(4, 5),
            ..Default::default()
        };
        data.nullifiers
            .push(Nullifier::new(Fr::one(), 1, Fr::zero()))
            .unwrap();
        data.discard_side_effects();
        assert!(data.nullifiers.is_empty());
        assert_eq!(data.gas_used, Gas::new(4, 5));
    }

    #[test]
    fn phase_predicates() {
        let mut pi = PublicKernelCircuitPublicInputs::default();
        assert!(!pi.needs_setup() && !pi.needs_app_logic() && !pi.needs_teardown());
        pi.public_teardown_call_request.hash = Fr::one();
        assert!(pi.needs_teardown());
    }
}
