use std::collections::{BTreeMap, HashSet};

use anyhow::Context as _;
use l2_common::hash::silo_nullifier;
use l2_common::{non_empty_items, ContractAddress, Fr, Ordered};
use strum::IntoEnumIterator;

use super::HintsError;
use crate::execution::{ExecutionId, ExecutionTree};
use crate::inputs::{
    KeyValidationHint, NoteHashReadRequestHints, NoteHashSettledReadHint,
    NullifierReadRequestHints, NullifierSettledReadHint, PendingReadHint, PrivateKernelData,
    PrivateKernelResetCircuitPrivateInputs, PrivateKernelResetHints, ResetDimensions,
    ResetSizeTag, TransientDataHint,
};
use crate::oracle::ProvingDataOracle;

/// Side effects and read requests of the calls still to be folded, by
/// contract and value.
#[derive(Debug, Default)]
struct FutureSideEffects {
    note_hashes: HashSet<(ContractAddress, Fr)>,
    nullifiers: HashSet<(ContractAddress, Fr)>,
    note_hash_reads: HashSet<(ContractAddress, Fr)>,
    nullifier_reads: HashSet<(ContractAddress, Fr)>,
}

impl FutureSideEffects {
    fn collect(tree: &ExecutionTree, execution_stack: &[ExecutionId]) -> Self {
        let mut future = Self::default();
        for (_, node) in tree.iter_from(execution_stack) {
            let contract = node.contract_address();
            let public_inputs = &node.call_stack_item.public_inputs;
            future.note_hashes.extend(
                non_empty_items(&public_inputs.note_hashes).map(|n| (contract, n.value)),
            );
            future.nullifiers.extend(
                non_empty_items(&public_inputs.nullifiers).map(|n| (contract, n.value)),
            );
            future.note_hash_reads.extend(
                non_empty_items(&public_inputs.note_hash_read_requests).map(|r| (contract, r.value)),
            );
            future.nullifier_reads.extend(
                non_empty_items(&public_inputs.nullifier_read_requests).map(|r| (contract, r.value)),
            );
        }
        future
    }
}

/// Builds the inputs of a reset of `previous_kernel`.
///
/// Every validation request gets a hint, except reads of values a call still
/// on `execution_stack` emits: those stay pending until that call is folded.
/// Transient note hash and nullifier pairs are squashed unless a call still on
/// the stack reads one of them.
pub async fn build_private_kernel_reset_inputs(
    tree: &ExecutionTree,
    execution_stack: &[ExecutionId],
    previous_kernel: PrivateKernelData,
    note_hash_leaf_index_map: &BTreeMap<Fr, u64>,
    oracle: &impl ProvingDataOracle,
) -> anyhow::Result<PrivateKernelResetCircuitPrivateInputs> {
    let future = FutureSideEffects::collect(tree, execution_stack);
    let public_inputs = &previous_kernel.public_inputs;
    let requests = &public_inputs.validation_requests;
    let end = &public_inputs.end;

    let mut note_hash_read_request_hints = NoteHashReadRequestHints::default();
    for (read_request_index, read) in requests.note_hash_read_requests.iter().enumerate() {
        let pending = end.note_hashes.iter().position(|n| {
            n.value() == read.value()
                && n.contract_address == read.contract_address
                && n.counter() < read.counter()
        });
        if let Some(pending_value_index) = pending {
            note_hash_read_request_hints
                .pending_read_hints
                .push(PendingReadHint {
                    read_request_index,
                    pending_value_index,
                });
            continue;
        }
        if future
            .note_hashes
            .contains(&(read.contract_address, read.value()))
        {
            continue;
        }
        let leaf_index = *note_hash_leaf_index_map.get(&read.value()).ok_or(
            HintsError::UnknownNoteHashRead {
                contract: read.contract_address,
                value: read.value(),
            },
        )?;
        let membership_witness = oracle
            .get_note_hash_membership_witness(leaf_index)
            .await
            .context("failed to fetch note hash membership witness")?
            .ok_or(HintsError::MissingNoteHashWitness { leaf_index })?;
        note_hash_read_request_hints
            .settled_read_hints
            .push(NoteHashSettledReadHint {
                read_request_index,
                membership_witness,
                leaf_preimage: read.value(),
            });
    }

    let mut nullifier_read_request_hints = NullifierReadRequestHints::default();
    for (read_request_index, read) in requests.nullifier_read_requests.iter().enumerate() {
        let pending = end.nullifiers.iter().position(|n| {
            n.value() == read.value()
                && n.contract_address == read.contract_address
                && n.counter() < read.counter()
        });
        if let Some(pending_value_index) = pending {
            nullifier_read_request_hints
                .pending_read_hints
                .push(PendingReadHint {
                    read_request_index,
                    pending_value_index,
                });
            continue;
        }
        if future
            .nullifiers
            .contains(&(read.contract_address, read.value()))
        {
            continue;
        }
        let siloed = silo_nullifier(read.contract_address, read.value());
        let membership_witness = oracle
            .get_nullifier_membership_witness(siloed)
            .await
            .context("failed to fetch nullifier membership witness")?
            .ok_or(HintsError::UnknownNullifierRead {
                contract: read.contract_address,
                value: read.value(),
            })?;
        nullifier_read_request_hints
            .settled_read_hints
            .push(NullifierSettledReadHint {
                read_request_index,
                membership_witness,
            });
    }

    let mut key_validation_hints = Vec::new();
    for (request_index, request) in requests
        .scoped_key_validation_requests_and_generators
        .iter()
        .enumerate()
    {
        let sk_m = oracle
            .get_master_secret_key(request.request.request.pk_m)
            .await
            .context("failed to fetch master secret key")?;
        key_validation_hints.push(KeyValidationHint {
            sk_m,
            request_index,
        });
    }

    let mut transient_data = Vec::new();
    for (nullifier_index, nullifier) in end.nullifiers.iter().enumerate() {
        let note_hash = nullifier.nullified_note_hash();
        if note_hash.is_zero() {
            continue;
        }
        let Some(note_hash_index) = end.note_hashes.iter().position(|n| {
            n.value() == note_hash
                && n.contract_address == nullifier.contract_address
                && n.nullifier_counter == nullifier.counter()
        }) else {
            // The note may come from a call folded later.
            if execution_stack.is_empty() {
                return Err(HintsError::MissingNullifiedNoteHash {
                    counter: nullifier.counter(),
                    note_hash,
                }
                .into());
            }
            continue;
        };
        let contract = nullifier.contract_address;
        if future.note_hash_reads.contains(&(contract, note_hash))
            || future.nullifier_reads.contains(&(contract, nullifier.value()))
        {
            continue;
        }
        transient_data.push(TransientDataHint {
            note_hash_index,
            nullifier_index,
        });
    }

    let hints = PrivateKernelResetHints {
        transient_data,
        note_hash_read_request_hints,
        nullifier_read_request_hints,
        key_validation_hints,
    };
    let dimensions = ResetDimensions::of(&hints);
    let size_tag = ResetSizeTag::iter()
        .find(|tag| dimensions.fits_in(&tag.dimensions()))
        .ok_or(HintsError::ResetTooLarge(dimensions))?;

    Ok(PrivateKernelResetCircuitPrivateInputs {
        previous_kernel,
        hints,
        size_tag,
    })
}
