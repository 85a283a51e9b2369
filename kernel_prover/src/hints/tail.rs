use circuit_types::PrivateKernelCircuitPublicInputs;
use l2_common::sort_by_counter_get_sorted_hints;

use crate::inputs::PrivateKernelTailHints;

pub fn build_private_kernel_tail_hints(
    public_inputs: &PrivateKernelCircuitPublicInputs,
) -> PrivateKernelTailHints {
    let end = &public_inputs.end;
    PrivateKernelTailHints {
        sorted_note_hashes_indexes: sort_by_counter_get_sorted_hints(&end.note_hashes).1,
        sorted_nullifiers_indexes: sort_by_counter_get_sorted_hints(&end.nullifiers).1,
        sorted_note_encrypted_log_hashes_indexes: sort_by_counter_get_sorted_hints(
            &end.note_encrypted_logs_hashes,
        )
        .1,
        sorted_encrypted_log_hashes_indexes: sort_by_counter_get_sorted_hints(
            &end.encrypted_logs_hashes,
        )
        .1,
        sorted_unencrypted_log_hashes_indexes: sort_by_counter_get_sorted_hints(
            &end.unencrypted_logs_hashes,
        )
        .1,
    }
}

#[cfg(test)]
mod tests {
    use circuit_types::NoteHash;
    use l2_common::{ContractAddress, Fr};

    use super::*;

    #[test]
    fn note_hashes_sorted_by_counter() {
        let mut public_inputs = PrivateKernelCircuitPublicInputs::default();
        let contract = ContractAddress::from(1);
        for counter in [7, 2, 5] {
            public_inputs
                .end
                .note_hashes
                .push(NoteHash::new(Fr::from(counter as u64), counter).scope(0, contract))
                .unwrap();
        }
        let hints = build_private_kernel_tail_hints(&public_inputs);
        assert_eq!(hints.sorted_note_hashes_indexes, vec![2, 0, 1]);
        assert!(hints.sorted_nullifiers_indexes.is_empty());
    }
}
