//! Private inputs of the private kernel circuits.

use std::fmt;

use circuit_types::{
    CallRequest, MembershipWitness, NullifierMembershipWitness, PrivateCallStackItem,
    PrivateKernelCircuitPublicInputs, Proof, TxRequest, VerificationKey,
};
use l2_common::Fr;
use serde::{Deserialize, Serialize};

/// A private call as the kernel folds it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateCallData {
    pub call_stack_item: PrivateCallStackItem,
    /// Requests for the public calls this call enqueued, padded to the
    /// per-call capacity.
    pub public_call_stack: Vec<CallRequest>,
    pub public_teardown_call_request: CallRequest,
    pub proof: Proof,
    pub vk: VerificationKey,
    pub public_keys_hash: Fr,
    pub contract_class_artifact_hash: Fr,
    pub contract_class_public_bytecode_commitment: Fr,
    pub salted_initialization_hash: Fr,
    pub function_leaf_membership_witness: MembershipWitness,
    pub acir_hash: Fr,
}

/// The previous kernel step, as the next one verifies it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelData {
    pub public_inputs: PrivateKernelCircuitPublicInputs,
    pub proof: Proof,
    pub vk: VerificationKey,
    pub vk_index: u64,
    pub vk_path: Vec<Fr>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelInitHints {
    /// For every note hash of the call, the counter of the nullifier that
    /// consumes it in this transaction, or zero.
    pub note_hash_nullifier_counters: Vec<u32>,
    /// Index of the first nested call at or past the revertible counter.
    pub first_revertible_private_call_request_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelInnerHints {
    pub note_hash_nullifier_counters: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelInitCircuitPrivateInputs {
    pub tx_request: TxRequest,
    pub private_call: PrivateCallData,
    pub hints: PrivateKernelInitHints,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelInnerCircuitPrivateInputs {
    pub previous_kernel: PrivateKernelData,
    pub private_call: PrivateCallData,
    pub hints: PrivateKernelInnerHints,
}

/// A read request satisfied by a value emitted earlier in the transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReadHint {
    pub read_request_index: usize,
    pub pending_value_index: usize,
}

/// A note hash read request satisfied by a note hash already in the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteHashSettledReadHint {
    pub read_request_index: usize,
    pub membership_witness: MembershipWitness,
    pub leaf_preimage: Fr,
}

/// A nullifier read request satisfied by a nullifier already in the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierSettledReadHint {
    pub read_request_index: usize,
    pub membership_witness: NullifierMembershipWitness,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteHashReadRequestHints {
    pub pending_read_hints: Vec<PendingReadHint>,
    pub settled_read_hints: Vec<NoteHashSettledReadHint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierReadRequestHints {
    pub pending_read_hints: Vec<PendingReadHint>,
    pub settled_read_hints: Vec<NullifierSettledReadHint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValidationHint {
    pub sk_m: Fr,
    pub request_index: usize,
}

/// A note hash and the nullifier consuming it in the same transaction. Both
/// are dropped by the reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransientDataHint {
    pub note_hash_index: usize,
    pub nullifier_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelResetHints {
    pub transient_data: Vec<TransientDataHint>,
    pub note_hash_read_request_hints: NoteHashReadRequestHints,
    pub nullifier_read_request_hints: NullifierReadRequestHints,
    pub key_validation_hints: Vec<KeyValidationHint>,
}

/// How many hints of each kind a reset circuit variant accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetDimensions {
    pub note_hash_pending_amount: usize,
    pub note_hash_settled_amount: usize,
    pub nullifier_pending_amount: usize,
    pub nullifier_settled_amount: usize,
    pub key_validation_amount: usize,
}

impl ResetDimensions {
    pub fn of(hints: &PrivateKernelResetHints) -> Self {
        Self {
            note_hash_pending_amount: hints.note_hash_read_request_hints.pending_read_hints.len(),
            note_hash_settled_amount: hints.note_hash_read_request_hints.settled_read_hints.len(),
            nullifier_pending_amount: hints.nullifier_read_request_hints.pending_read_hints.len(),
            nullifier_settled_amount: hints.nullifier_read_request_hints.settled_read_hints.len(),
            key_validation_amount: hints.key_validation_hints.len(),
        }
    }

    /// Whether every amount of `self` is at most the one of `other`.
    pub fn fits_in(&self, other: &Self) -> bool {
        self.note_hash_pending_amount <= other.note_hash_pending_amount
            && self.note_hash_settled_amount <= other.note_hash_settled_amount
            && self.nullifier_pending_amount <= other.nullifier_pending_amount
            && self.nullifier_settled_amount <= other.nullifier_settled_amount
            && self.key_validation_amount <= other.key_validation_amount
    }
}

/// Reset circuit variants, smallest first.
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
pub enum ResetSizeTag {
    Tiny,
    Small,
    Medium,
    Big,
}

impl ResetSizeTag {
    pub fn dimensions(self) -> ResetDimensions {
        let (nh_pending, nh_settled, n_pending, n_settled, keys) = match self {
            ResetSizeTag::Tiny => (4, 4, 2, 2, 4),
            ResetSizeTag::Small => (16, 16, 4, 4, 16),
            ResetSizeTag::Medium => (64, 64, 8, 8, 32),
            ResetSizeTag::Big => (128, 128, 8, 8, 64),
        };
        ResetDimensions {
            note_hash_pending_amount: nh_pending,
            note_hash_settled_amount: nh_settled,
            nullifier_pending_amount: n_pending,
            nullifier_settled_amount: n_settled,
            key_validation_amount: keys,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelResetCircuitPrivateInputs {
    pub previous_kernel: PrivateKernelData,
    pub hints: PrivateKernelResetHints,
    pub size_tag: ResetSizeTag,
}

/// Positions every accumulated side effect takes once sorted by counter:
/// `sorted_*_indexes[i]` is where item `i` lands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelTailHints {
    pub sorted_note_hashes_indexes: Vec<usize>,
    pub sorted_nullifiers_indexes: Vec<usize>,
    pub sorted_note_encrypted_log_hashes_indexes: Vec<usize>,
    pub sorted_encrypted_log_hashes_indexes: Vec<usize>,
    pub sorted_unencrypted_log_hashes_indexes: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKernelTailCircuitPrivateInputs {
    pub previous_kernel: PrivateKernelData,
    pub hints: PrivateKernelTailHints,
}

/// Circuits whose bytecode is pushed onto the folding stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientCircuitArtifact {
    PrivateKernelInit,
    PrivateKernelInner,
    PrivateKernelReset(ResetSizeTag),
    PrivateKernelTail,
}

impl fmt::Display for ClientCircuitArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCircuitArtifact::PrivateKernelInit => write!(f, "PrivateKernelInitArtifact"),
            ClientCircuitArtifact::PrivateKernelInner => write!(f, "PrivateKernelInnerArtifact"),
            ClientCircuitArtifact::PrivateKernelReset(tag) => {
                write!(f, "PrivateKernelReset{tag}Artifact")
            }
            ClientCircuitArtifact::PrivateKernelTail => write!(f, "PrivateKernelTailArtifact"),
        }
    }
}
