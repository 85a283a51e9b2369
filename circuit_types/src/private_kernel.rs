//! Public inputs of private functions and of the private kernel circuits.

use l2_common::constants::{
    MAX_ENCRYPTED_LOGS_PER_TX, MAX_KEY_VALIDATION_REQUESTS_PER_TX, MAX_NEW_NOTE_HASHES_PER_TX,
    MAX_NEW_NULLIFIERS_PER_TX, MAX_NOTE_ENCRYPTED_LOGS_PER_TX, MAX_NOTE_HASH_READ_REQUESTS_PER_TX,
    MAX_NULLIFIER_READ_REQUESTS_PER_TX, MAX_PRIVATE_CALL_STACK_LENGTH_PER_TX,
    MAX_PUBLIC_CALL_STACK_LENGTH_PER_TX, MAX_UNENCRYPTED_LOGS_PER_TX,
};
use l2_common::hash::{hash_fields, GeneratorIndex};
use l2_common::{non_empty_items, BoundedVec, ContractAddress, Fr, IsEmpty};
use serde::{Deserialize, Serialize};

use crate::call_request::{CallContext, CallRequest, FunctionData, PrivateCallRequest};
use crate::kernel::{
    CombinedAccumulatedData, CombinedConstantData, KernelCircuitPublicInputs,
    RollupValidationRequests, TxContext,
};
use crate::public_kernel::{
    PublicAccumulatedData, PublicKernelCircuitPublicInputs, PublicValidationRequests,
};
use crate::side_effects::{
    KeyValidationRequestAndGenerator, LogHash, NoteHash, NoteLogHash, Nullifier, ReadRequest,
    ScopedKeyValidationRequestAndGenerator, ScopedLogHash, ScopedNoteHash, ScopedNullifier,
    ScopedReadRequest,
};
use crate::RevertCode;

/// The signed request a user submits to start a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRequest {
    pub origin: ContractAddress,
    pub function_data: FunctionData,
    pub args_hash: Fr,
    pub tx_context: TxContext,
}

impl TxRequest {
    pub fn hash(&self) -> Fr {
        let gas = &self.tx_context.gas_settings;
        hash_fields(
            &[
                self.origin.to_field(),
                self.function_data.selector.to_field(),
                Fr::from(self.function_data.is_private as u64),
                self.args_hash,
                self.tx_context.chain_id,
                self.tx_context.version,
                Fr::from(gas.gas_limits.da_gas),
                Fr::from(gas.gas_limits.l2_gas),
                Fr::from(gas.teardown_gas_limits.da_gas),
                Fr::from(gas.teardown_gas_limits.l2_gas),
                gas.max_fees_per_gas.fee_per_da_gas,
                gas.max_fees_per_gas.fee_per_l2_gas,
                gas.inclusion_fee,
            ],
            GeneratorIndex::TxRequest,
        )
    }
}

/// Public inputs of one private function execution.
///
/// Arrays are circuit arrays: they may carry empty padding items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateCircuitPublicInputs {
    pub call_context: CallContext,
    pub args_hash: Fr,
    pub returns_hash: Fr,
    /// Side effects with a lower counter are non-revertible. Zero if this call
    /// does not set the split.
    pub min_revertible_side_effect_counter: u32,
    pub is_fee_payer: bool,
    pub max_block_number: Option<u64>,
    pub note_hash_read_requests: Vec<ReadRequest>,
    pub nullifier_read_requests: Vec<ReadRequest>,
    pub key_validation_requests_and_generators: Vec<KeyValidationRequestAndGenerator>,
    pub note_hashes: Vec<NoteHash>,
    pub nullifiers: Vec<Nullifier>,
    pub private_call_requests: Vec<PrivateCallRequest>,
    pub public_call_stack_hashes: Vec<Fr>,
    pub public_teardown_function_hash: Fr,
    pub note_encrypted_logs_hashes: Vec<NoteLogHash>,
    pub encrypted_logs_hashes: Vec<LogHash>,
    pub unencrypted_logs_hashes: Vec<LogHash>,
    pub start_side_effect_counter: u32,
    pub end_side_effect_counter: u32,
    pub tx_context: TxContext,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateCallStackItem {
    pub contract_address: ContractAddress,
    pub function_data: FunctionData,
    pub public_inputs: PrivateCircuitPublicInputs,
}

impl PrivateCallStackItem {
    pub fn hash(&self) -> Fr {
        let pi = &self.public_inputs;
        hash_fields(
            &[
                self.contract_address.to_field(),
                self.function_data.selector.to_field(),
                Fr::from(self.function_data.is_private as u64),
                pi.call_context.msg_sender.to_field(),
                pi.args_hash,
                pi.returns_hash,
                Fr::from(pi.start_side_effect_counter),
                Fr::from(pi.end_side_effect_counter),
            ],
            GeneratorIndex::PrivateCallStackItem,
        )
    }

    /// The request a caller records when it calls into this item.
    pub fn to_private_call_request(&self) -> PrivateCallRequest {
        PrivateCallRequest {
            hash: self.hash(),
            start_side_effect_counter: self.public_inputs.start_side_effect_counter,
            end_side_effect_counter: self.public_inputs.end_side_effect_counter,
        }
    }
}

/// Requests the kernel must prove before the tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateValidationRequests {
    pub for_rollup: RollupValidationRequests,
    pub note_hash_read_requests: BoundedVec<ScopedReadRequest, MAX_NOTE_HASH_READ_REQUESTS_PER_TX>,
    pub nullifier_read_requests: BoundedVec<ScopedReadRequest, MAX_NULLIFIER_READ_REQUESTS_PER_TX>,
    pub scoped_key_validation_requests_and_generators:
        BoundedVec<ScopedKeyValidationRequestAndGenerator, MAX_KEY_VALIDATION_REQUESTS_PER_TX>,
}

impl PrivateValidationRequests {
    pub fn is_empty(&self) -> bool {
        self.note_hash_read_requests.is_empty()
            && self.nullifier_read_requests.is_empty()
            && self.scoped_key_validation_requests_and_generators.is_empty()
    }
}

/// Side effects accumulated by the private kernel so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateAccumulatedData {
    pub note_hashes: BoundedVec<ScopedNoteHash, MAX_NEW_NOTE_HASHES_PER_TX>,
    pub nullifiers: BoundedVec<ScopedNullifier, MAX_NEW_NULLIFIERS_PER_TX>,
    pub note_encrypted_logs_hashes: BoundedVec<NoteLogHash, MAX_NOTE_ENCRYPTED_LOGS_PER_TX>,
    pub encrypted_logs_hashes: BoundedVec<ScopedLogHash, MAX_ENCRYPTED_LOGS_PER_TX>,
    pub unencrypted_logs_hashes: BoundedVec<ScopedLogHash, MAX_UNENCRYPTED_LOGS_PER_TX>,
    /// Private calls still to be folded. The last entry is the next one.
    pub private_call_stack: BoundedVec<PrivateCallRequest, MAX_PRIVATE_CALL_STACK_LENGTH_PER_TX>,
    pub public_call_stack: BoundedVec<CallRequest, MAX_PUBLIC_CALL_STACK_LENGTH_PER_TX>,
}

/// Output of the init, inner and reset private kernels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelCircuitPublicInputs {
    pub min_revertible_side_effect_counter: u32,
    pub validation_requests: PrivateValidationRequests,
    pub end: PrivateAccumulatedData,
    pub constants: CombinedConstantData,
    pub public_teardown_call_request: CallRequest,
    pub fee_payer: ContractAddress,
}

impl PrivateKernelCircuitPublicInputs {
    /// Whether a reset must run before the tail can: any unproven request or
    /// any note hash and nullifier still linked to each other.
    pub fn something_to_reset(&self) -> bool {
        !self.validation_requests.is_empty()
            || self.end.note_hashes.iter().any(|n| n.nullifier_counter != 0)
            || self
                .end
                .nullifiers
                .iter()
                .any(|n| !n.nullified_note_hash().is_zero())
    }
}

/// The part of the tail output consumed by the public kernels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPrivateTailPublicInputsForPublic {
    pub validation_requests: PublicValidationRequests,
    pub end_non_revertible_data: PublicAccumulatedData,
    pub end: PublicAccumulatedData,
    pub public_teardown_call_request: CallRequest,
}

/// The part of the tail output consumed directly by the rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPrivateTailPublicInputsForRollup {
    pub end: CombinedAccumulatedData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TailOutputError {
    #[error("private tail output carries no data for public execution")]
    NotForPublic,
    #[error("private tail output carries no data for the rollup")]
    NotForRollup,
}

/// Output of the private kernel tail: exactly one of `for_public` and
/// `for_rollup` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelTailCircuitPublicInputs {
    pub constants: CombinedConstantData,
    pub rollup_validation_requests: RollupValidationRequests,
    pub fee_payer: ContractAddress,
    pub for_public: Option<PartialPrivateTailPublicInputsForPublic>,
    pub for_rollup: Option<PartialPrivateTailPublicInputsForRollup>,
}

impl PrivateKernelTailCircuitPublicInputs {
    /// Number of enqueued public calls, excluding teardown.
    pub fn number_of_public_call_requests(&self) -> usize {
        self.for_public.as_ref().map_or(0, |p| {
            non_empty_items(&p.end_non_revertible_data.public_call_stack).count()
                + non_empty_items(&p.end.public_call_stack).count()
        })
    }

    pub fn has_public_teardown_call(&self) -> bool {
        self.for_public
            .as_ref()
            .is_some_and(|p| !p.public_teardown_call_request.is_empty())
    }

    /// All nullifiers, non-revertible first.
    pub fn get_non_empty_nullifiers(&self) -> Vec<Fr> {
        match (&self.for_public, &self.for_rollup) {
            (Some(public), _) => public
                .end_non_revertible_data
                .nullifiers
                .iter()
                .chain(public.end.nullifiers.iter())
                .map(|n| n.value)
                .filter(|v| !v.is_zero())
                .collect(),
            (None, Some(rollup)) => non_empty_items(&rollup.end.nullifiers).copied().collect(),
            (None, None) => Vec::new(),
        }
    }

    /// All note hashes, non-revertible first.
    pub fn get_non_empty_note_hashes(&self) -> Vec<Fr> {
        match (&self.for_public, &self.for_rollup) {
            (Some(public), _) => public
                .end_non_revertible_data
                .note_hashes
                .iter()
                .chain(public.end.note_hashes.iter())
                .map(|n| n.value)
                .filter(|v| !v.is_zero())
                .collect(),
            (None, Some(rollup)) => non_empty_items(&rollup.end.note_hashes).copied().collect(),
            (None, None) => Vec::new(),
        }
    }

    /// Starting point of the public kernels.
    pub fn to_public_kernel_circuit_public_inputs(
        &self,
    ) -> Result<PublicKernelCircuitPublicInputs, TailOutputError> {
        let public = self.for_public.as_ref().ok_or(TailOutputError::NotForPublic)?;
        let mut validation_requests = public.validation_requests.clone();
        validation_requests.for_rollup = self.rollup_validation_requests;
        Ok(PublicKernelCircuitPublicInputs {
            validation_requests,
            end_non_revertible_data: public.end_non_revertible_data.clone(),
            end: public.end.clone(),
            constants: self.constants,
            revert_code: RevertCode::Ok,
            public_teardown_call_request: public.public_teardown_call_request,
            fee_payer: self.fee_payer,
        })
    }

    /// Final kernel output of a transaction without public calls.
    pub fn to_kernel_circuit_public_inputs(
        &self,
    ) -> Result<KernelCircuitPublicInputs, TailOutputError> {
        let rollup = self.for_rollup.as_ref().ok_or(TailOutputError::NotForRollup)?;
        Ok(KernelCircuitPublicInputs {
            rollup_validation_requests: self.rollup_validation_requests,
            end: rollup.end.clone(),
            constants: self.constants,
            revert_code: RevertCode::Ok,
            fee_payer: self.fee_payer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_is_needed_for_linked_side_effects() {
        let contract = ContractAddress::from(1);
        let mut pi = PrivateKernelCircuitPublicInputs::default();
        assert!(!pi.something_to_reset());

        pi.end
            .note_hashes
            .push(NoteHash::new(Fr::from(5u64), 1).scope(0, contract))
            .unwrap();
        assert!(!pi.something_to_reset());

        pi.end.note_hashes[0].nullifier_counter = 2;
        assert!(pi.something_to_reset());

        pi.end.note_hashes[0].nullifier_counter = 0;
        pi.end
            .nullifiers
            .push(Nullifier::new(Fr::from(6u64), 2, Fr::from(5u64)).scope(contract))
            .unwrap();
        assert!(pi.something_to_reset());
    }

    #[test]
    fn tail_output_conversions_require_matching_half() {
        let tail = PrivateKernelTailCircuitPublicInputs::default();
        assert_eq!(
            tail.to_public_kernel_circuit_public_inputs().unwrap_err(),
            TailOutputError::NotForPublic
        );
        assert_eq!(
            tail.to_kernel_circuit_public_inputs().unwrap_err(),
            TailOutputError::NotForRollup
        );
        assert_eq!(tail.number_of_public_call_requests(), 0);
    }
}
