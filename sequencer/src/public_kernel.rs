//! The public kernel circuits the sequencer runs after every public call.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;

use circuit_types::{
    CombinedAccumulatedData, KernelCircuitPublicInputs, LogHash, NoteHash, Nullifier,
    PublicAccumulatedData, PublicCallStackItem, PublicDataRead, PublicDataUpdateRequest,
    PublicKernelCircuitPrivateInputs, PublicKernelCircuitPublicInputs,
    PublicKernelTailCircuitPrivateInputs, PublicKernelType, SimulationError,
};
use itertools::Itertools as _;
use l2_common::constants::MAX_PUBLIC_CALL_STACK_LENGTH_PER_CALL;
use l2_common::hash::{compute_public_data_tree_leaf_slot, silo_note_hash, silo_nullifier};
use l2_common::{CollectionError, ContractAddress, Fr, IsEmpty};
use tracing::trace;

use crate::phase_manager::PhaseError;

/// Simulates (or proves) the public kernel circuits.
pub trait PublicKernelCircuitSimulator {
    fn public_kernel_circuit_setup(
        &self,
        inputs: &PublicKernelCircuitPrivateInputs,
    ) -> impl Future<Output = anyhow::Result<PublicKernelCircuitPublicInputs>> + Send;

    fn public_kernel_circuit_app_logic(
        &self,
        inputs: &PublicKernelCircuitPrivateInputs,
    ) -> impl Future<Output = anyhow::Result<PublicKernelCircuitPublicInputs>> + Send;

    fn public_kernel_circuit_teardown(
        &self,
        inputs: &PublicKernelCircuitPrivateInputs,
    ) -> impl Future<Output = anyhow::Result<PublicKernelCircuitPublicInputs>> + Send;

    fn public_kernel_circuit_tail(
        &self,
        inputs: &PublicKernelTailCircuitPrivateInputs,
    ) -> impl Future<Output = anyhow::Result<KernelCircuitPublicInputs>> + Send;
}

/// Runs the public kernel logic natively, without proving.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePublicKernel;

impl NativePublicKernel {
    pub fn new() -> Self {
        Self
    }
}

impl PublicKernelCircuitSimulator for NativePublicKernel {
    async fn public_kernel_circuit_setup(
        &self,
        inputs: &PublicKernelCircuitPrivateInputs,
    ) -> anyhow::Result<PublicKernelCircuitPublicInputs> {
        Ok(process_call(PublicKernelType::Setup, inputs)?)
    }

    async fn public_kernel_circuit_app_logic(
        &self,
        inputs: &PublicKernelCircuitPrivateInputs,
    ) -> anyhow::Result<PublicKernelCircuitPublicInputs> {
        Ok(process_call(PublicKernelType::AppLogic, inputs)?)
    }

    async fn public_kernel_circuit_teardown(
        &self,
        inputs: &PublicKernelCircuitPrivateInputs,
    ) -> anyhow::Result<PublicKernelCircuitPublicInputs> {
        Ok(process_call(PublicKernelType::Teardown, inputs)?)
    }

    async fn public_kernel_circuit_tail(
        &self,
        inputs: &PublicKernelTailCircuitPrivateInputs,
    ) -> anyhow::Result<KernelCircuitPublicInputs> {
        Ok(finalize(&inputs.previous_kernel.public_inputs)?)
    }
}

/// Folds one executed call into the previous kernel output.
fn process_call(
    phase: PublicKernelType,
    inputs: &PublicKernelCircuitPrivateInputs,
) -> Result<PublicKernelCircuitPublicInputs, PhaseError> {
    let mut output = inputs.previous_kernel.public_inputs.clone();
    let call = &inputs.public_call;
    let item = &call.call_stack_item;
    trace!(%phase, contract = %item.contract_address, "public kernel");

    if call.public_call_stack.len() > MAX_PUBLIC_CALL_STACK_LENGTH_PER_CALL {
        return Err(CollectionError::Overflow {
            capacity: MAX_PUBLIC_CALL_STACK_LENGTH_PER_CALL,
            len: call.public_call_stack.len(),
        }
        .into());
    }

    if item.is_execution_request {
        pop_call_request(phase, &mut output, call.call_request.hash)?;
        // Teardown was charged its full allocation by the private tail.
        if phase != PublicKernelType::Teardown {
            accumulated_data(phase, &mut output)?.gas_used += item.gas_used();
        }
    }

    if item.reverted() {
        match phase {
            PublicKernelType::Setup => {
                return Err(PhaseError::SetupReverted(SimulationError::new(
                    format!("call to {} reverted", item.contract_address),
                    Vec::new(),
                )))
            }
            PublicKernelType::AppLogic => {
                output.end.discard_side_effects();
                output.revert_code = output.revert_code.with_app_logic_revert();
            }
            PublicKernelType::Teardown => {
                output.revert_code = output.revert_code.with_teardown_revert();
            }
            PublicKernelType::NonPublic | PublicKernelType::Tail => {
                return Err(PhaseError::UnexpectedPhase(phase))
            }
        }
        return Ok(output);
    }

    accumulate_side_effects(phase, item, &mut output)?;
    Ok(output)
}

fn accumulated_data(
    phase: PublicKernelType,
    output: &mut PublicKernelCircuitPublicInputs,
) -> Result<&mut PublicAccumulatedData, PhaseError> {
    match phase {
        PublicKernelType::Setup => Ok(&mut output.end_non_revertible_data),
        PublicKernelType::AppLogic | PublicKernelType::Teardown => Ok(&mut output.end),
        PublicKernelType::NonPublic | PublicKernelType::Tail => {
            Err(PhaseError::UnexpectedPhase(phase))
        }
    }
}

/// Removes the request of the enqueued call being executed from its phase's
/// call stack. Calls run in the order they were enqueued.
fn pop_call_request(
    phase: PublicKernelType,
    output: &mut PublicKernelCircuitPublicInputs,
    executed: Fr,
) -> Result<(), PhaseError> {
    let expected = match phase {
        PublicKernelType::Teardown => {
            let expected = output.public_teardown_call_request.hash;
            if !output.public_teardown_call_request.is_empty() {
                output.public_teardown_call_request = Default::default();
            }
            expected
        }
        _ => {
            let stack = &mut accumulated_data(phase, output)?.public_call_stack;
            if stack.is_empty() {
                return Err(PhaseError::EmptyCallStack { phase });
            }
            stack.remove(0).hash
        }
    };
    if expected.is_zero() {
        return Err(PhaseError::EmptyCallStack { phase });
    }
    if expected != executed {
        return Err(PhaseError::CallRequestMismatch {
            phase,
            expected,
            found: executed,
        });
    }
    Ok(())
}

fn accumulate_side_effects(
    phase: PublicKernelType,
    item: &PublicCallStackItem,
    output: &mut PublicKernelCircuitPublicInputs,
) -> Result<(), PhaseError> {
    let contract = item.contract_address;
    let public_inputs = &item.public_inputs;
    let storage_contract = match public_inputs.call_context.storage_contract_address {
        address if address.is_zero() => contract,
        address => address,
    };
    let leaf_slot = |target: ContractAddress, slot: Fr| {
        let target = if target.is_zero() {
            storage_contract
        } else {
            target
        };
        compute_public_data_tree_leaf_slot(target, slot)
    };

    let requests = &mut output.validation_requests;
    for read in public_inputs.nullifier_read_requests.iter().filter(|r| !r.is_empty()) {
        requests.nullifier_read_requests.push(read.scope(contract))?;
    }
    for read in public_inputs.contract_storage_reads.iter().filter(|r| !r.is_empty()) {
        requests.public_data_reads.push(PublicDataRead {
            leaf_slot: leaf_slot(read.contract_address, read.storage_slot),
            value: read.current_value,
            counter: read.counter,
        })?;
    }

    let data = accumulated_data(phase, output)?;
    for note_hash in public_inputs.note_hashes.iter().filter(|n| !n.is_empty()) {
        data.note_hashes.push(NoteHash::new(
            silo_note_hash(contract, note_hash.value),
            note_hash.counter,
        ))?;
    }
    for nullifier in public_inputs.nullifiers.iter().filter(|n| !n.is_empty()) {
        data.nullifiers.push(Nullifier::new(
            silo_nullifier(contract, nullifier.value),
            nullifier.counter,
            nullifier.note_hash,
        ))?;
    }
    for log in public_inputs.unencrypted_logs_hashes.iter().filter(|l| !l.is_empty()) {
        data.unencrypted_logs_hashes.push(*log)?;
    }
    for write in public_inputs
        .contract_storage_update_requests
        .iter()
        .filter(|w| !w.is_empty())
    {
        data.public_data_update_requests.push(PublicDataUpdateRequest::new(
            leaf_slot(write.contract_address, write.storage_slot),
            write.new_value,
            write.counter,
        ))?;
    }
    Ok(())
}

/// The public kernel tail: merges both halves of the transaction, sorted by
/// counter, keeping only the last write to each public data leaf.
fn finalize(
    previous: &PublicKernelCircuitPublicInputs,
) -> Result<KernelCircuitPublicInputs, PhaseError> {
    if previous.needs_setup() || previous.needs_app_logic() || previous.needs_teardown() {
        return Err(PhaseError::UnprocessedCalls);
    }
    let non_revertible = &previous.end_non_revertible_data;
    let revertible = &previous.end;
    let mut end = CombinedAccumulatedData::default();

    end.note_hashes.try_extend(
        non_revertible
            .note_hashes
            .iter()
            .chain(revertible.note_hashes.iter())
            .sorted_by_key(|n| n.counter)
            .map(|n| n.value),
    )?;
    end.nullifiers.try_extend(
        non_revertible
            .nullifiers
            .iter()
            .chain(revertible.nullifiers.iter())
            .sorted_by_key(|n| n.counter)
            .map(|n| n.value),
    )?;
    end.note_encrypted_logs_hashes.try_extend(sorted_logs(
        &non_revertible.note_encrypted_logs_hashes,
        &revertible.note_encrypted_logs_hashes,
    ))?;
    end.encrypted_logs_hashes.try_extend(sorted_logs(
        &non_revertible.encrypted_logs_hashes,
        &revertible.encrypted_logs_hashes,
    ))?;
    end.unencrypted_logs_hashes.try_extend(sorted_logs(
        &non_revertible.unencrypted_logs_hashes,
        &revertible.unencrypted_logs_hashes,
    ))?;
    end.note_encrypted_log_preimages_length = total_length(&end.note_encrypted_logs_hashes);
    end.encrypted_log_preimages_length = total_length(&end.encrypted_logs_hashes);
    end.unencrypted_log_preimages_length = total_length(&end.unencrypted_logs_hashes);
    end.public_data_update_requests
        .try_extend(squash_public_data_writes(
            non_revertible
                .public_data_update_requests
                .iter()
                .chain(revertible.public_data_update_requests.iter())
                .copied(),
        ))?;
    end.gas_used = non_revertible.gas_used + revertible.gas_used;

    Ok(KernelCircuitPublicInputs {
        rollup_validation_requests: previous.validation_requests.for_rollup,
        end,
        constants: previous.constants,
        revert_code: previous.revert_code,
        fee_payer: previous.fee_payer,
    })
}

fn sorted_logs<'a>(
    non_revertible: &'a [LogHash],
    revertible: &'a [LogHash],
) -> impl Iterator<Item = LogHash> + 'a {
    non_revertible
        .iter()
        .chain(revertible)
        .filter(|l| !l.is_empty())
        .sorted_by_key(|l| l.counter)
        .copied()
}

fn total_length(logs: &[LogHash]) -> u64 {
    logs.iter().map(|l| l.length).sum()
}

/// Keeps the latest write to every leaf slot, ordered by counter.
pub fn squash_public_data_writes(
    writes: impl IntoIterator<Item = PublicDataUpdateRequest>,
) -> Vec<PublicDataUpdateRequest> {
    let mut latest: HashMap<Fr, PublicDataUpdateRequest> = HashMap::new();
    for write in writes.into_iter().filter(|w| !w.is_empty()) {
        match latest.entry(write.leaf_slot) {
            Entry::Occupied(mut entry) => {
                if write.counter >= entry.get().counter {
                    entry.insert(write);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(write);
            }
        }
    }
    latest.into_values().sorted_by_key(|w| w.counter).collect()
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use circuit_types::{
        CallRequest, ContractStorageUpdateRequest, PublicCallData, PublicKernelData, RevertCode,
    };
    use l2_common::{fr, Gas};

    use super::*;

    fn call_request(hash: u64) -> CallRequest {
        CallRequest {
            hash: fr(hash),
            ..Default::default()
        }
    }

    fn inputs(
        previous: PublicKernelCircuitPublicInputs,
        request: u64,
        item: PublicCallStackItem,
    ) -> PublicKernelCircuitPrivateInputs {
        PublicKernelCircuitPrivateInputs {
            previous_kernel: PublicKernelData {
                public_inputs: previous,
                ..Default::default()
            },
            public_call: PublicCallData {
                call_stack_item: item,
                call_request: call_request(request),
                ..Default::default()
            },
        }
    }

    fn item(contract: u64, writes: &[(u64, u64, u32)]) -> PublicCallStackItem {
        let mut item = PublicCallStackItem {
            contract_address: ContractAddress::from(contract),
            is_execution_request: true,
            ..Default::default()
        };
        item.public_inputs.start_gas_left = Gas::new(100, 100);
        item.public_inputs.end_gas_left = Gas::new(90, 80);
        item.public_inputs.contract_storage_update_requests = writes
            .iter()
            .map(|&(slot, value, counter)| ContractStorageUpdateRequest {
                storage_slot: fr(slot),
                new_value: fr(value),
                counter,
                contract_address: ContractAddress::ZERO,
            })
            .collect();
        item
    }

    #[test]
    fn setup_accumulates_into_the_non_revertible_half() {
        let mut previous = PublicKernelCircuitPublicInputs::default();
        previous
            .end_non_revertible_data
            .public_call_stack
            .push(call_request(7))
            .unwrap();

        let output = process_call(
            PublicKernelType::Setup,
            &inputs(previous, 7, item(3, &[(1, 2, 11)])),
        )
        .unwrap();

        let non_revertible = &output.end_non_revertible_data;
        check!(non_revertible.public_call_stack.is_empty());
        check!(non_revertible.gas_used == Gas::new(10, 20));
        check!(
            non_revertible.public_data_update_requests[0].leaf_slot
                == compute_public_data_tree_leaf_slot(ContractAddress::from(3), fr(1))
        );
        check!(output.end.public_data_update_requests.is_empty());
    }

    #[test]
    fn enqueued_calls_must_run_in_order() {
        let mut previous = PublicKernelCircuitPublicInputs::default();
        previous.end.public_call_stack.push(call_request(1)).unwrap();
        previous.end.public_call_stack.push(call_request(2)).unwrap();

        let err = process_call(
            PublicKernelType::AppLogic,
            &inputs(previous, 2, item(3, &[])),
        )
        .unwrap_err();
        let_assert!(PhaseError::CallRequestMismatch { expected, .. } = err);
        check!(expected == fr(1));
    }

    #[test]
    fn app_logic_revert_discards_revertible_side_effects() {
        let mut previous = PublicKernelCircuitPublicInputs::default();
        previous.end.public_call_stack.push(call_request(1)).unwrap();
        previous.end.public_call_stack.push(call_request(2)).unwrap();
        previous
            .end
            .nullifiers
            .push(Nullifier::new(fr(5), 101, Fr::zero()))
            .unwrap();
        let mut reverted = item(3, &[(1, 2, 11)]);
        reverted.public_inputs.revert_code = RevertCode::AppLogicReverted;

        let output = process_call(
            PublicKernelType::AppLogic,
            &inputs(previous, 1, reverted),
        )
        .unwrap();

        check!(output.revert_code == RevertCode::AppLogicReverted);
        check!(output.end.nullifiers.is_empty());
        check!(output.end.public_call_stack.is_empty());
        check!(output.end.gas_used == Gas::new(10, 20));
    }

    #[test]
    fn teardown_gas_is_not_metered_again() {
        let mut previous = PublicKernelCircuitPublicInputs::default();
        previous.public_teardown_call_request = call_request(9);
        previous.end.gas_used = Gas::new(50, 50);

        let output = process_call(
            PublicKernelType::Teardown,
            &inputs(previous, 9, item(3, &[])),
        )
        .unwrap();

        check!(!output.needs_teardown());
        check!(output.end.gas_used == Gas::new(50, 50));
    }

    #[test]
    fn tail_keeps_the_last_write_per_slot() {
        let mut previous = PublicKernelCircuitPublicInputs::default();
        let writes = [
            PublicDataUpdateRequest::new(fr(1), fr(10), 3),
            PublicDataUpdateRequest::new(fr(2), fr(20), 4),
            PublicDataUpdateRequest::new(fr(1), fr(11), 5),
        ];
        previous
            .end_non_revertible_data
            .public_data_update_requests
            .push(writes[0])
            .unwrap();
        for write in &writes[1..] {
            previous.end.public_data_update_requests.push(*write).unwrap();
        }
        previous.end_non_revertible_data.gas_used = Gas::new(1, 2);
        previous.end.gas_used = Gas::new(3, 4);

        let output = finalize(&previous).unwrap();

        check!(output.end.public_data_update_requests.to_vec() == vec![writes[1], writes[2]]);
        check!(output.end.gas_used == Gas::new(4, 6));
    }

    #[test]
    fn tail_refuses_pending_calls() {
        let mut previous = PublicKernelCircuitPublicInputs::default();
        previous.end.public_call_stack.push(call_request(1)).unwrap();
        let_assert!(Err(PhaseError::UnprocessedCalls) = finalize(&previous));
    }
}
