//! Native execution of the private kernel circuits.
//!
//! Every function here checks what the matching circuit constrains and
//! computes the same public inputs, so a transaction can go through the
//! whole kernel pipeline without a proving backend.

use std::collections::HashSet;

use circuit_types::{
    CombinedAccumulatedData, LogHash, NoteHash, Nullifier, PartialPrivateTailPublicInputsForPublic,
    PartialPrivateTailPublicInputsForRollup, PrivateCallRequest, PrivateKernelCircuitPublicInputs,
    PrivateKernelTailCircuitPublicInputs, PublicAccumulatedData, PublicValidationRequests,
    RollupValidationRequests,
};
use l2_common::constants::{NOTE_HASH_TREE_HEIGHT, NULLIFIER_TREE_HEIGHT, VK_TREE_HEIGHT};
use l2_common::hash::{
    compute_app_secret_key, compute_note_hash_nonce, compute_unique_note_hash, derive_public_key,
    silo_note_hash, silo_nullifier,
};
use l2_common::{
    non_empty_items, BoundedVec, CollectionError, ContractAddress, Fr, IsEmpty, Ordered,
};

use crate::inputs::{
    PendingReadHint, PrivateCallData, PrivateKernelInitCircuitPrivateInputs,
    PrivateKernelInnerCircuitPrivateInputs, PrivateKernelResetCircuitPrivateInputs,
    PrivateKernelTailCircuitPrivateInputs, ResetDimensions, ResetSizeTag,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelCircuitError {
    #[error(transparent)]
    Overflow(#[from] CollectionError),
    #[error("tx request does not match the entrypoint call: {0} differs")]
    TxRequestMismatch(&'static str),
    #[error("private call {actual:#x} does not match the requested call {expected:#x}")]
    CallRequestMismatch { expected: Fr, actual: Fr },
    #[error("no private call left to fold")]
    EmptyPrivateCallStack,
    #[error("public call request {index} does not match the hash committed by the call")]
    PublicCallStackMismatch { index: usize },
    #[error("public teardown call request does not match the hash committed by the call")]
    TeardownCallMismatch,
    #[error("public teardown call set more than once")]
    DuplicateTeardownCall,
    #[error("min revertible side effect counter set more than once")]
    DuplicateMinRevertibleCounter,
    #[error("invalid hint: {0}")]
    InvalidHint(String),
    #[error("reset hints {dimensions:?} exceed the {size_tag} reset circuit")]
    ResetTooSmall {
        size_tag: ResetSizeTag,
        dimensions: ResetDimensions,
    },
    #[error("invalid sorted {0} hints")]
    InvalidSortedHints(&'static str),
    #[error("validation requests or transient side effects left unresolved")]
    ResetRequired,
    #[error("{0} private calls left to fold")]
    PendingPrivateCalls(usize),
    #[error("transactions with public calls must set a min revertible side effect counter")]
    MissingRevertibleCounter,
    #[error("transaction emitted no nullifier")]
    MissingFirstNullifier,
}

fn invalid_hint(what: impl Into<String>) -> KernelCircuitError {
    KernelCircuitError::InvalidHint(what.into())
}

/// First kernel step: checks the entrypoint against the tx request and folds
/// it into fresh accumulators.
pub fn simulate_init(
    inputs: &PrivateKernelInitCircuitPrivateInputs,
) -> Result<PrivateKernelCircuitPublicInputs, KernelCircuitError> {
    let tx_request = &inputs.tx_request;
    let item = &inputs.private_call.call_stack_item;
    let call_inputs = &item.public_inputs;

    if tx_request.origin != item.contract_address {
        return Err(KernelCircuitError::TxRequestMismatch("origin"));
    }
    if tx_request.function_data != item.function_data {
        return Err(KernelCircuitError::TxRequestMismatch("function data"));
    }
    if tx_request.args_hash != call_inputs.args_hash {
        return Err(KernelCircuitError::TxRequestMismatch("args hash"));
    }
    if tx_request.tx_context != call_inputs.tx_context {
        return Err(KernelCircuitError::TxRequestMismatch("tx context"));
    }

    let requests = &call_inputs.private_call_requests;
    let first_revertible = inputs.hints.first_revertible_private_call_request_index;
    let min_revertible = call_inputs.min_revertible_side_effect_counter;
    let before_ok = requests
        .iter()
        .take(first_revertible)
        .all(|r| r.is_empty() || r.start_side_effect_counter < min_revertible);
    let at_ok = requests
        .get(first_revertible)
        .map_or(first_revertible == requests.len(), |r| {
            r.is_empty() || r.start_side_effect_counter >= min_revertible
        });
    if !before_ok || !at_ok {
        return Err(invalid_hint("first revertible private call request index"));
    }

    let mut output = PrivateKernelCircuitPublicInputs::default();
    output.constants.tx_context = tx_request.tx_context;
    // The tx request hash doubles as the first nullifier, which makes every
    // transaction unique.
    output
        .end
        .nullifiers
        .push(Nullifier::new(tx_request.hash(), 0, Fr::zero()).scope(ContractAddress::ZERO))?;

    fold_private_call(
        &mut output,
        &inputs.private_call,
        &inputs.hints.note_hash_nullifier_counters,
    )?;
    Ok(output)
}

/// Folds the next nested private call onto the previous kernel output.
pub fn simulate_inner(
    inputs: &PrivateKernelInnerCircuitPrivateInputs,
) -> Result<PrivateKernelCircuitPublicInputs, KernelCircuitError> {
    let previous_kernel = &inputs.previous_kernel;
    if previous_kernel.vk_path.len() != VK_TREE_HEIGHT {
        return Err(invalid_hint("previous kernel vk path length"));
    }

    let mut output = previous_kernel.public_inputs.clone();
    let expected = output
        .end
        .private_call_stack
        .pop()
        .ok_or(KernelCircuitError::EmptyPrivateCallStack)?;
    let actual = inputs.private_call.call_stack_item.to_private_call_request();
    if expected != actual {
        return Err(KernelCircuitError::CallRequestMismatch {
            expected: expected.hash,
            actual: actual.hash,
        });
    }

    fold_private_call(
        &mut output,
        &inputs.private_call,
        &inputs.hints.note_hash_nullifier_counters,
    )?;
    Ok(output)
}

fn fold_private_call(
    output: &mut PrivateKernelCircuitPublicInputs,
    private_call: &PrivateCallData,
    note_hash_nullifier_counters: &[u32],
) -> Result<(), KernelCircuitError> {
    let item = &private_call.call_stack_item;
    let call_inputs = &item.public_inputs;
    let contract = item.contract_address;

    for (index, hash) in call_inputs.public_call_stack_hashes.iter().enumerate() {
        let request = private_call
            .public_call_stack
            .get(index)
            .copied()
            .unwrap_or_default();
        if request.hash != *hash {
            return Err(KernelCircuitError::PublicCallStackMismatch { index });
        }
    }
    if let Some(index) = private_call
        .public_call_stack
        .iter()
        .enumerate()
        .skip(call_inputs.public_call_stack_hashes.len())
        .find_map(|(i, r)| (!r.is_empty()).then_some(i))
    {
        return Err(KernelCircuitError::PublicCallStackMismatch { index });
    }
    output
        .end
        .public_call_stack
        .try_extend(non_empty_items(&private_call.public_call_stack).copied())?;

    if call_inputs.public_teardown_function_hash != private_call.public_teardown_call_request.hash
    {
        return Err(KernelCircuitError::TeardownCallMismatch);
    }
    if !private_call.public_teardown_call_request.is_empty() {
        if !output.public_teardown_call_request.is_empty() {
            return Err(KernelCircuitError::DuplicateTeardownCall);
        }
        output.public_teardown_call_request = private_call.public_teardown_call_request;
    }

    if call_inputs.min_revertible_side_effect_counter != 0 {
        if output.min_revertible_side_effect_counter != 0 {
            return Err(KernelCircuitError::DuplicateMinRevertibleCounter);
        }
        output.min_revertible_side_effect_counter = call_inputs.min_revertible_side_effect_counter;
    }
    if call_inputs.is_fee_payer {
        output.fee_payer = contract;
    }

    let requests = &mut output.validation_requests;
    requests.for_rollup = requests.for_rollup.merge(RollupValidationRequests {
        max_block_number: call_inputs.max_block_number,
    });
    requests.note_hash_read_requests.try_extend(
        non_empty_items(&call_inputs.note_hash_read_requests).map(|r| r.scope(contract)),
    )?;
    requests.nullifier_read_requests.try_extend(
        non_empty_items(&call_inputs.nullifier_read_requests).map(|r| r.scope(contract)),
    )?;
    requests
        .scoped_key_validation_requests_and_generators
        .try_extend(
            non_empty_items(&call_inputs.key_validation_requests_and_generators)
                .map(|r| r.scope(contract)),
        )?;

    if note_hash_nullifier_counters.len() != call_inputs.note_hashes.len() {
        return Err(invalid_hint("note hash nullifier counters length"));
    }
    let end = &mut output.end;
    for (note_hash, &nullifier_counter) in call_inputs
        .note_hashes
        .iter()
        .zip(note_hash_nullifier_counters)
    {
        if note_hash.is_empty() {
            continue;
        }
        if nullifier_counter != 0 && nullifier_counter <= note_hash.counter {
            return Err(invalid_hint(format!(
                "note hash at counter {} nullified at counter {nullifier_counter}",
                note_hash.counter
            )));
        }
        end.note_hashes
            .push(note_hash.scope(nullifier_counter, contract))?;
    }
    end.nullifiers
        .try_extend(non_empty_items(&call_inputs.nullifiers).map(|n| n.scope(contract)))?;
    end.note_encrypted_logs_hashes
        .try_extend(non_empty_items(&call_inputs.note_encrypted_logs_hashes).copied())?;
    end.encrypted_logs_hashes
        .try_extend(non_empty_items(&call_inputs.encrypted_logs_hashes).map(|l| l.scope(contract)))?;
    end.unencrypted_logs_hashes.try_extend(
        non_empty_items(&call_inputs.unencrypted_logs_hashes).map(|l| l.scope(contract)),
    )?;

    // The last entry of the stack is the next call to fold.
    end.private_call_stack.try_extend(
        call_inputs
            .private_call_requests
            .iter()
            .rev()
            .filter(|r| !r.is_empty())
            .copied(),
    )?;
    Ok(())
}

/// Keeps the items whose index is not in `verified`.
fn retain_unverified<T, const N: usize>(items: &mut BoundedVec<T, N>, verified: &HashSet<usize>) {
    let mut index = 0;
    items.retain(|_| {
        let keep = !verified.contains(&index);
        index += 1;
        keep
    });
}

fn check_pending_read<R: Ordered, V: Ordered>(
    hint: &PendingReadHint,
    reads: &[R],
    values: &[V],
    matches: impl Fn(&R, &V) -> bool,
) -> Result<(), KernelCircuitError> {
    let read = reads
        .get(hint.read_request_index)
        .ok_or_else(|| invalid_hint("pending read request index"))?;
    let value = values
        .get(hint.pending_value_index)
        .ok_or_else(|| invalid_hint("pending value index"))?;
    if !matches(read, value) || value.counter() >= read.counter() {
        return Err(invalid_hint(format!(
            "pending read {} does not match value {}",
            hint.read_request_index, hint.pending_value_index
        )));
    }
    Ok(())
}

/// Proves the validation requests the hints cover and squashes transient
/// note hash and nullifier pairs.
pub fn simulate_reset(
    inputs: &PrivateKernelResetCircuitPrivateInputs,
) -> Result<PrivateKernelCircuitPublicInputs, KernelCircuitError> {
    let hints = &inputs.hints;
    let dimensions = ResetDimensions::of(hints);
    if !dimensions.fits_in(&inputs.size_tag.dimensions()) {
        return Err(KernelCircuitError::ResetTooSmall {
            size_tag: inputs.size_tag,
            dimensions,
        });
    }

    let mut output = inputs.previous_kernel.public_inputs.clone();
    let requests = &output.validation_requests;
    let end = &output.end;

    let mut verified_note_hash_reads = HashSet::new();
    for hint in &hints.note_hash_read_request_hints.pending_read_hints {
        check_pending_read(hint, &requests.note_hash_read_requests, &end.note_hashes, |r, v| {
            r.value() == v.value() && r.contract_address == v.contract_address
        })?;
        verified_note_hash_reads.insert(hint.read_request_index);
    }
    for hint in &hints.note_hash_read_request_hints.settled_read_hints {
        let read = requests
            .note_hash_read_requests
            .get(hint.read_request_index)
            .ok_or_else(|| invalid_hint("settled note hash read request index"))?;
        if hint.membership_witness.height() != NOTE_HASH_TREE_HEIGHT
            || hint.leaf_preimage != read.value()
        {
            return Err(invalid_hint(format!(
                "settled note hash read {}",
                hint.read_request_index
            )));
        }
        verified_note_hash_reads.insert(hint.read_request_index);
    }

    let mut verified_nullifier_reads = HashSet::new();
    for hint in &hints.nullifier_read_request_hints.pending_read_hints {
        check_pending_read(hint, &requests.nullifier_read_requests, &end.nullifiers, |r, v| {
            r.value() == v.value() && r.contract_address == v.contract_address
        })?;
        verified_nullifier_reads.insert(hint.read_request_index);
    }
    for hint in &hints.nullifier_read_request_hints.settled_read_hints {
        let read = requests
            .nullifier_read_requests
            .get(hint.read_request_index)
            .ok_or_else(|| invalid_hint("settled nullifier read request index"))?;
        let witness = &hint.membership_witness;
        if witness.witness.height() != NULLIFIER_TREE_HEIGHT
            || witness.leaf_preimage.nullifier != silo_nullifier(read.contract_address, read.value())
        {
            return Err(invalid_hint(format!(
                "settled nullifier read {}",
                hint.read_request_index
            )));
        }
        verified_nullifier_reads.insert(hint.read_request_index);
    }

    let mut verified_keys = HashSet::new();
    for hint in &hints.key_validation_hints {
        let scoped = requests
            .scoped_key_validation_requests_and_generators
            .get(hint.request_index)
            .ok_or_else(|| invalid_hint("key validation request index"))?;
        let request = &scoped.request.request;
        let sk_app = compute_app_secret_key(
            hint.sk_m,
            scoped.contract_address,
            scoped.request.sk_app_generator,
        );
        if derive_public_key(hint.sk_m) != request.pk_m || sk_app != request.sk_app {
            return Err(invalid_hint(format!(
                "key validation request {}",
                hint.request_index
            )));
        }
        verified_keys.insert(hint.request_index);
    }

    let mut squashed_note_hashes = HashSet::new();
    let mut squashed_nullifiers = HashSet::new();
    let mut squashed_note_hash_counters = HashSet::new();
    for hint in &hints.transient_data {
        let note_hash = end
            .note_hashes
            .get(hint.note_hash_index)
            .ok_or_else(|| invalid_hint("transient note hash index"))?;
        let nullifier = end
            .nullifiers
            .get(hint.nullifier_index)
            .ok_or_else(|| invalid_hint("transient nullifier index"))?;
        if nullifier.nullified_note_hash() != note_hash.value()
            || nullifier.contract_address != note_hash.contract_address
            || note_hash.nullifier_counter != nullifier.counter()
        {
            return Err(invalid_hint(format!(
                "note hash {} is not consumed by nullifier {}",
                hint.note_hash_index, hint.nullifier_index
            )));
        }
        if !squashed_note_hashes.insert(hint.note_hash_index)
            || !squashed_nullifiers.insert(hint.nullifier_index)
        {
            return Err(invalid_hint("duplicate transient data hint"));
        }
        squashed_note_hash_counters.insert(note_hash.counter());
    }

    let requests = &mut output.validation_requests;
    retain_unverified(&mut requests.note_hash_read_requests, &verified_note_hash_reads);
    retain_unverified(&mut requests.nullifier_read_requests, &verified_nullifier_reads);
    retain_unverified(
        &mut requests.scoped_key_validation_requests_and_generators,
        &verified_keys,
    );

    let end = &mut output.end;
    retain_unverified(&mut end.note_hashes, &squashed_note_hashes);
    retain_unverified(&mut end.nullifiers, &squashed_nullifiers);
    end.note_encrypted_logs_hashes
        .retain(|log| !squashed_note_hash_counters.contains(&log.note_hash_counter));

    Ok(output)
}

/// Reorders `items` so that item `i` lands at `hints[i]`, and checks the
/// result is sorted by counter.
fn apply_sorted_hints<T: Ordered + Clone>(
    items: &[T],
    hints: &[usize],
    what: &'static str,
) -> Result<Vec<T>, KernelCircuitError> {
    if items.len() != hints.len() {
        return Err(KernelCircuitError::InvalidSortedHints(what));
    }
    let mut sorted: Vec<Option<T>> = vec![None; items.len()];
    for (item, &target) in items.iter().zip(hints) {
        let slot = sorted
            .get_mut(target)
            .ok_or(KernelCircuitError::InvalidSortedHints(what))?;
        if slot.is_some() {
            return Err(KernelCircuitError::InvalidSortedHints(what));
        }
        *slot = Some(item.clone());
    }
    let sorted: Vec<T> = sorted.into_iter().flatten().collect();
    if sorted.windows(2).any(|w| w[0].counter() > w[1].counter()) {
        return Err(KernelCircuitError::InvalidSortedHints(what));
    }
    Ok(sorted)
}

fn silo_scoped_note_hash(contract: ContractAddress, value: Fr) -> Fr {
    if contract.is_zero() {
        value
    } else {
        silo_note_hash(contract, value)
    }
}

fn silo_scoped_nullifier(contract: ContractAddress, value: Fr) -> Fr {
    if contract.is_zero() {
        value
    } else {
        silo_nullifier(contract, value)
    }
}

/// Last private kernel: sorts and silos the side effects, then shapes them
/// for the public kernels or, without public calls, for the rollup.
pub fn simulate_tail(
    inputs: &PrivateKernelTailCircuitPrivateInputs,
) -> Result<PrivateKernelTailCircuitPublicInputs, KernelCircuitError> {
    let previous = &inputs.previous_kernel.public_inputs;
    let hints = &inputs.hints;
    if previous.something_to_reset() {
        return Err(KernelCircuitError::ResetRequired);
    }
    if !previous.end.private_call_stack.is_empty() {
        return Err(KernelCircuitError::PendingPrivateCalls(
            previous.end.private_call_stack.len(),
        ));
    }

    let end = &previous.end;
    let note_hashes: Vec<NoteHash> =
        apply_sorted_hints(&end.note_hashes, &hints.sorted_note_hashes_indexes, "note hash")?
            .into_iter()
            .map(|n| NoteHash::new(silo_scoped_note_hash(n.contract_address, n.value()), n.counter()))
            .collect();
    let nullifiers: Vec<Nullifier> =
        apply_sorted_hints(&end.nullifiers, &hints.sorted_nullifiers_indexes, "nullifier")?
            .into_iter()
            .map(|n| {
                Nullifier::new(
                    silo_scoped_nullifier(n.contract_address, n.value()),
                    n.counter(),
                    Fr::zero(),
                )
            })
            .collect();
    let first_nullifier = nullifiers
        .first()
        .map(|n| n.value)
        .ok_or(KernelCircuitError::MissingFirstNullifier)?;
    let note_encrypted_logs_hashes: Vec<LogHash> = apply_sorted_hints(
        &end.note_encrypted_logs_hashes,
        &hints.sorted_note_encrypted_log_hashes_indexes,
        "note encrypted log hash",
    )?
    .into_iter()
    .map(|l| LogHash::new(l.value, l.counter, l.length))
    .collect();
    let encrypted_logs_hashes: Vec<LogHash> = apply_sorted_hints(
        &end.encrypted_logs_hashes,
        &hints.sorted_encrypted_log_hashes_indexes,
        "encrypted log hash",
    )?
    .into_iter()
    .map(|l| l.log_hash)
    .collect();
    let unencrypted_logs_hashes: Vec<LogHash> = apply_sorted_hints(
        &end.unencrypted_logs_hashes,
        &hints.sorted_unencrypted_log_hashes_indexes,
        "unencrypted log hash",
    )?
    .into_iter()
    .map(|l| l.log_hash)
    .collect();

    let mut output = PrivateKernelTailCircuitPublicInputs {
        constants: previous.constants,
        rollup_validation_requests: previous.validation_requests.for_rollup,
        fee_payer: previous.fee_payer,
        for_public: None,
        for_rollup: None,
    };

    let is_for_public =
        !end.public_call_stack.is_empty() || !previous.public_teardown_call_request.is_empty();
    if !is_for_public {
        let mut data = CombinedAccumulatedData {
            note_encrypted_log_preimages_length: note_encrypted_logs_hashes
                .iter()
                .map(|l| l.length)
                .sum(),
            encrypted_log_preimages_length: encrypted_logs_hashes.iter().map(|l| l.length).sum(),
            unencrypted_log_preimages_length: unencrypted_logs_hashes
                .iter()
                .map(|l| l.length)
                .sum(),
            ..Default::default()
        };
        data.note_hashes
            .try_extend(note_hashes.iter().enumerate().map(|(index, n)| {
                compute_unique_note_hash(compute_note_hash_nonce(first_nullifier, index), n.value)
            }))?;
        data.nullifiers.try_extend(nullifiers.iter().map(|n| n.value))?;
        data.note_encrypted_logs_hashes
            .try_extend(note_encrypted_logs_hashes)?;
        data.encrypted_logs_hashes.try_extend(encrypted_logs_hashes)?;
        data.unencrypted_logs_hashes
            .try_extend(unencrypted_logs_hashes)?;
        output.for_rollup = Some(PartialPrivateTailPublicInputsForRollup { end: data });
        return Ok(output);
    }

    let min_revertible = previous.min_revertible_side_effect_counter;
    if min_revertible == 0 {
        return Err(KernelCircuitError::MissingRevertibleCounter);
    }
    let mut non_revertible = PublicAccumulatedData::default();
    let mut revertible = PublicAccumulatedData::default();
    let split = |counter: u32| counter < min_revertible;

    for note_hash in note_hashes {
        let target = if split(note_hash.counter) { &mut non_revertible } else { &mut revertible };
        target.note_hashes.push(note_hash)?;
    }
    for nullifier in nullifiers {
        let target = if split(nullifier.counter) { &mut non_revertible } else { &mut revertible };
        target.nullifiers.push(nullifier)?;
    }
    for log in note_encrypted_logs_hashes {
        let target = if split(log.counter) { &mut non_revertible } else { &mut revertible };
        target.note_encrypted_logs_hashes.push(log)?;
    }
    for log in encrypted_logs_hashes {
        let target = if split(log.counter) { &mut non_revertible } else { &mut revertible };
        target.encrypted_logs_hashes.push(log)?;
    }
    for log in unencrypted_logs_hashes {
        let target = if split(log.counter) { &mut non_revertible } else { &mut revertible };
        target.unencrypted_logs_hashes.push(log)?;
    }

    let mut public_calls: Vec<_> = non_empty_items(&end.public_call_stack).copied().collect();
    public_calls.sort_by_key(|c| c.counter());
    for call in public_calls {
        let target = if split(call.counter()) { &mut non_revertible } else { &mut revertible };
        target.public_call_stack.push(call)?;
    }

    // Teardown is paid for up front, out of the revertible half.
    revertible.gas_used = previous
        .constants
        .tx_context
        .gas_settings
        .get_teardown_limits();

    output.for_public = Some(PartialPrivateTailPublicInputsForPublic {
        validation_requests: PublicValidationRequests {
            for_rollup: previous.validation_requests.for_rollup,
            ..Default::default()
        },
        end_non_revertible_data: non_revertible,
        end: revertible,
        public_teardown_call_request: previous.public_teardown_call_request,
    });
    Ok(output)
}

/// Request for the next private call to fold, if any.
pub fn next_private_call(public_inputs: &PrivateKernelCircuitPublicInputs) -> Option<PrivateCallRequest> {
    public_inputs.end.private_call_stack.last().copied()
}

#[cfg(test)]
mod tests {
    use circuit_types::{
        CallRequest, FunctionData, NoteHash, PrivateCallStackItem, ReadRequest, TxContext,
        TxRequest,
    };
    use l2_common::{FunctionSelector, Gas, GasSettings};

    use super::*;
    use crate::hints::build_private_kernel_tail_hints;
    use crate::inputs::{
        NoteHashReadRequestHints, PrivateKernelData, PrivateKernelInitHints,
        PrivateKernelInnerHints, PrivateKernelResetHints, PrivateKernelTailCircuitPrivateInputs,
        TransientDataHint,
    };

    const CONTRACT: u64 = 7;

    fn tx_context() -> TxContext {
        TxContext {
            chain_id: Fr::one(),
            version: Fr::one(),
            gas_settings: GasSettings {
                teardown_gas_limits: Gas::new(10, 20),
                ..Default::default()
            },
        }
    }

    fn entrypoint() -> (TxRequest, PrivateCallData) {
        let mut item = PrivateCallStackItem {
            contract_address: ContractAddress::from(CONTRACT),
            function_data: FunctionData {
                selector: FunctionSelector(1),
                is_private: true,
            },
            ..Default::default()
        };
        item.public_inputs.args_hash = Fr::from(99u64);
        item.public_inputs.tx_context = tx_context();
        item.public_inputs.start_side_effect_counter = 1;
        item.public_inputs.end_side_effect_counter = 10;
        let tx_request = TxRequest {
            origin: item.contract_address,
            function_data: item.function_data,
            args_hash: item.public_inputs.args_hash,
            tx_context: tx_context(),
        };
        let call = PrivateCallData {
            call_stack_item: item,
            ..Default::default()
        };
        (tx_request, call)
    }

    fn init(tx_request: TxRequest, private_call: PrivateCallData) -> PrivateKernelCircuitPublicInputs {
        let note_hash_nullifier_counters =
            vec![0; private_call.call_stack_item.public_inputs.note_hashes.len()];
        simulate_init(&PrivateKernelInitCircuitPrivateInputs {
            tx_request,
            private_call,
            hints: PrivateKernelInitHints {
                note_hash_nullifier_counters,
                first_revertible_private_call_request_index: 0,
            },
        })
        .unwrap()
    }

    fn kernel_data(public_inputs: PrivateKernelCircuitPublicInputs) -> PrivateKernelData {
        PrivateKernelData {
            public_inputs,
            vk_path: vec![Fr::zero(); VK_TREE_HEIGHT],
            ..Default::default()
        }
    }

    #[test]
    fn init_emits_the_tx_request_hash_as_first_nullifier() {
        let (tx_request, call) = entrypoint();
        let output = init(tx_request, call);
        assert_eq!(output.end.nullifiers.len(), 1);
        assert_eq!(output.end.nullifiers[0].value(), tx_request.hash());
        assert_eq!(output.constants.tx_context, tx_context());
    }

    #[test]
    fn init_rejects_mismatched_tx_request() {
        let (mut tx_request, call) = entrypoint();
        tx_request.args_hash = Fr::from(1u64);
        let err = simulate_init(&PrivateKernelInitCircuitPrivateInputs {
            tx_request,
            private_call: call,
            hints: PrivateKernelInitHints::default(),
        })
        .unwrap_err();
        assert_eq!(err, KernelCircuitError::TxRequestMismatch("args hash"));
    }

    #[test]
    fn inner_checks_the_popped_call_request() {
        let (tx_request, mut call) = entrypoint();
        let mut nested = PrivateCallStackItem {
            contract_address: ContractAddress::from(8),
            ..Default::default()
        };
        nested.public_inputs.start_side_effect_counter = 2;
        nested.public_inputs.end_side_effect_counter = 4;
        call.call_stack_item
            .public_inputs
            .private_call_requests
            .push(nested.to_private_call_request());
        let output = init(tx_request, call);
        assert_eq!(next_private_call(&output), Some(nested.to_private_call_request()));

        let mut wrong = nested.clone();
        wrong.public_inputs.end_side_effect_counter = 5;
        let err = simulate_inner(&PrivateKernelInnerCircuitPrivateInputs {
            previous_kernel: kernel_data(output.clone()),
            private_call: PrivateCallData {
                call_stack_item: wrong,
                ..Default::default()
            },
            hints: PrivateKernelInnerHints::default(),
        })
        .unwrap_err();
        assert!(matches!(err, KernelCircuitError::CallRequestMismatch { .. }));

        let folded = simulate_inner(&PrivateKernelInnerCircuitPrivateInputs {
            previous_kernel: kernel_data(output),
            private_call: PrivateCallData {
                call_stack_item: nested,
                ..Default::default()
            },
            hints: PrivateKernelInnerHints::default(),
        })
        .unwrap();
        assert!(folded.end.private_call_stack.is_empty());
    }

    #[test]
    fn public_call_requests_must_match_committed_hashes() {
        let (tx_request, mut call) = entrypoint();
        call.call_stack_item.public_inputs.public_call_stack_hashes = vec![Fr::from(5u64)];
        call.public_call_stack = vec![CallRequest {
            hash: Fr::from(6u64),
            ..Default::default()
        }];
        let err = simulate_init(&PrivateKernelInitCircuitPrivateInputs {
            tx_request,
            private_call: call,
            hints: PrivateKernelInitHints::default(),
        })
        .unwrap_err();
        assert_eq!(err, KernelCircuitError::PublicCallStackMismatch { index: 0 });
    }

    #[test]
    fn reset_verifies_pending_reads_and_squashes_transient_pairs() {
        let (tx_request, mut call) = entrypoint();
        let inputs = &mut call.call_stack_item.public_inputs;
        inputs.note_hashes = vec![NoteHash::new(Fr::from(11u64), 2)];
        inputs.note_hash_read_requests = vec![ReadRequest::new(Fr::from(11u64), 3)];
        inputs.nullifiers = vec![Nullifier::new(Fr::from(12u64), 4, Fr::from(11u64))];
        let output = simulate_init(&PrivateKernelInitCircuitPrivateInputs {
            tx_request,
            private_call: call,
            hints: PrivateKernelInitHints {
                note_hash_nullifier_counters: vec![4],
                first_revertible_private_call_request_index: 0,
            },
        })
        .unwrap();
        assert!(output.something_to_reset());

        let hints = PrivateKernelResetHints {
            transient_data: vec![TransientDataHint {
                note_hash_index: 0,
                nullifier_index: 1,
            }],
            note_hash_read_request_hints: NoteHashReadRequestHints {
                pending_read_hints: vec![PendingReadHint {
                    read_request_index: 0,
                    pending_value_index: 0,
                }],
                settled_read_hints: Vec::new(),
            },
            ..Default::default()
        };
        let reset = simulate_reset(&PrivateKernelResetCircuitPrivateInputs {
            previous_kernel: kernel_data(output.clone()),
            hints: hints.clone(),
            size_tag: ResetSizeTag::Tiny,
        })
        .unwrap();
        assert!(!reset.something_to_reset());
        assert!(reset.end.note_hashes.is_empty());
        assert_eq!(reset.end.nullifiers.len(), 1);

        let mut bad = hints;
        bad.transient_data[0].nullifier_index = 0;
        assert!(matches!(
            simulate_reset(&PrivateKernelResetCircuitPrivateInputs {
                previous_kernel: kernel_data(output),
                hints: bad,
                size_tag: ResetSizeTag::Tiny,
            }),
            Err(KernelCircuitError::InvalidHint(_))
        ));
    }

    #[test]
    fn tail_for_rollup_makes_note_hashes_unique() {
        let (tx_request, mut call) = entrypoint();
        call.call_stack_item.public_inputs.note_hashes = vec![
            NoteHash::new(Fr::from(21u64), 5),
            NoteHash::new(Fr::from(20u64), 3),
        ];
        let output = init(tx_request, call);
        let tail = simulate_tail(&PrivateKernelTailCircuitPrivateInputs {
            hints: build_private_kernel_tail_hints(&output),
            previous_kernel: kernel_data(output),
        })
        .unwrap();
        let rollup = tail.for_rollup.unwrap();
        let first_nullifier = tx_request.hash();
        let contract = ContractAddress::from(CONTRACT);
        let expected = compute_unique_note_hash(
            compute_note_hash_nonce(first_nullifier, 0),
            silo_note_hash(contract, Fr::from(20u64)),
        );
        assert_eq!(rollup.end.note_hashes[0], expected);
        assert_eq!(rollup.end.nullifiers[0], first_nullifier);
    }

    #[test]
    fn tail_for_public_splits_on_min_revertible_counter() {
        let (tx_request, mut call) = entrypoint();
        let inputs = &mut call.call_stack_item.public_inputs;
        inputs.min_revertible_side_effect_counter = 5;
        inputs.note_hashes = vec![NoteHash::new(Fr::from(1u64), 2), NoteHash::new(Fr::from(2u64), 6)];
        inputs.public_call_stack_hashes = vec![Fr::from(40u64), Fr::from(30u64)];
        call.public_call_stack = vec![
            CallRequest {
                hash: Fr::from(40u64),
                start_side_effect_counter: 8,
                ..Default::default()
            },
            CallRequest {
                hash: Fr::from(30u64),
                start_side_effect_counter: 3,
                ..Default::default()
            },
        ];
        let output = init(tx_request, call);
        let tail = simulate_tail(&PrivateKernelTailCircuitPrivateInputs {
            hints: build_private_kernel_tail_hints(&output),
            previous_kernel: kernel_data(output),
        })
        .unwrap();
        let public = tail.for_public.unwrap();
        assert_eq!(public.end_non_revertible_data.note_hashes.len(), 1);
        assert_eq!(public.end.note_hashes.len(), 1);
        assert_eq!(public.end_non_revertible_data.nullifiers.len(), 1);
        assert_eq!(public.end_non_revertible_data.public_call_stack[0].hash, Fr::from(30u64));
        assert_eq!(public.end.public_call_stack[0].hash, Fr::from(40u64));
        assert_eq!(public.end.gas_used, Gas::new(10, 20));
    }

    #[test]
    fn tail_requires_a_revertible_counter_for_public_calls() {
        let (tx_request, mut call) = entrypoint();
        call.call_stack_item.public_inputs.public_call_stack_hashes = vec![Fr::from(40u64)];
        call.public_call_stack = vec![CallRequest {
            hash: Fr::from(40u64),
            start_side_effect_counter: 8,
            ..Default::default()
        }];
        let output = init(tx_request, call);
        let err = simulate_tail(&PrivateKernelTailCircuitPrivateInputs {
            hints: build_private_kernel_tail_hints(&output),
            previous_kernel: kernel_data(output),
        })
        .unwrap_err();
        assert_eq!(err, KernelCircuitError::MissingRevertibleCounter);
    }

    #[test]
    fn tail_refuses_unresolved_requests() {
        let (tx_request, mut call) = entrypoint();
        call.call_stack_item.public_inputs.nullifier_read_requests =
            vec![ReadRequest::new(Fr::from(3u64), 4)];
        let output = init(tx_request, call);
        let err = simulate_tail(&PrivateKernelTailCircuitPrivateInputs {
            hints: build_private_kernel_tail_hints(&output),
            previous_kernel: kernel_data(output),
        })
        .unwrap_err();
        assert_eq!(err, KernelCircuitError::ResetRequired);
    }

    #[test]
    fn sorted_hints_must_be_a_permutation() {
        let items = [NoteHash::new(Fr::one(), 3), NoteHash::new(Fr::one(), 1)];
        assert!(apply_sorted_hints(&items, &[1, 0], "note hash").is_ok());
        assert!(apply_sorted_hints(&items, &[0, 0], "note hash").is_err());
        assert!(apply_sorted_hints(&items, &[0, 1], "note hash").is_err());
    }
}
