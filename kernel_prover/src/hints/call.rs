use std::collections::BTreeMap;

use circuit_types::PrivateCircuitPublicInputs;
use l2_common::{IsEmpty, Ordered};

use crate::inputs::{PrivateKernelInitHints, PrivateKernelInnerHints};

fn note_hash_nullifier_counters(
    public_inputs: &PrivateCircuitPublicInputs,
    note_hash_nullifier_counter_map: &BTreeMap<u32, u32>,
) -> Vec<u32> {
    public_inputs
        .note_hashes
        .iter()
        .map(|note_hash| {
            if note_hash.is_empty() {
                0
            } else {
                note_hash_nullifier_counter_map
                    .get(&note_hash.counter())
                    .copied()
                    .unwrap_or(0)
            }
        })
        .collect()
}

pub fn build_private_kernel_init_hints(
    public_inputs: &PrivateCircuitPublicInputs,
    note_hash_nullifier_counter_map: &BTreeMap<u32, u32>,
) -> PrivateKernelInitHints {
    let min_revertible_counter = public_inputs.min_revertible_side_effect_counter;
    let requests = &public_inputs.private_call_requests;
    let first_revertible_private_call_request_index = requests
        .iter()
        .position(|r| !r.is_empty() && r.start_side_effect_counter >= min_revertible_counter)
        .unwrap_or(requests.len());

    PrivateKernelInitHints {
        note_hash_nullifier_counters: note_hash_nullifier_counters(
            public_inputs,
            note_hash_nullifier_counter_map,
        ),
        first_revertible_private_call_request_index,
    }
}

pub fn build_private_kernel_inner_hints(
    public_inputs: &PrivateCircuitPublicInputs,
    note_hash_nullifier_counter_map: &BTreeMap<u32, u32>,
) -> PrivateKernelInnerHints {
    PrivateKernelInnerHints {
        note_hash_nullifier_counters: note_hash_nullifier_counters(
            public_inputs,
            note_hash_nullifier_counter_map,
        ),
    }
}

#[cfg(test)]
mod tests {
    use circuit_types::{NoteHash, PrivateCallRequest};
    use l2_common::Fr;

    use super::*;

    #[test]
    fn nullifier_counters_follow_note_hash_counters() {
        let public_inputs = PrivateCircuitPublicInputs {
            note_hashes: vec![
                NoteHash::new(Fr::from(1u64), 3),
                NoteHash::new(Fr::from(2u64), 4),
                NoteHash::default(),
            ],
            min_revertible_side_effect_counter: 10,
            private_call_requests: vec![
                PrivateCallRequest {
                    hash: Fr::one(),
                    start_side_effect_counter: 5,
                    end_side_effect_counter: 8,
                },
                PrivateCallRequest {
                    hash: Fr::from(2u64),
                    start_side_effect_counter: 11,
                    end_side_effect_counter: 12,
                },
            ],
            ..Default::default()
        };
        let map = BTreeMap::from([(4, 9), (3, 0)]);
        let hints = build_private_kernel_init_hints(&public_inputs, &map);
        assert_eq!(hints.note_hash_nullifier_counters, vec![0, 9, 0]);
        assert_eq!(hints.first_revertible_private_call_request_index, 1);

        let inner = build_private_kernel_inner_hints(&public_inputs, &map);
        assert_eq!(inner.note_hash_nullifier_counters, hints.note_hash_nullifier_counters);
    }
}
