use anyhow::Context as _;
use circuit_types::{KernelProofOutput, PrivateKernelTailCircuitPublicInputs, Tx};
use tracing::info;

use crate::execution::ExecutionTree;

/// Assembles the transaction a user submits from its private execution and
/// the output of the private kernel tail.
pub fn build_tx(
    tree: &ExecutionTree,
    tail_output: KernelProofOutput<PrivateKernelTailCircuitPublicInputs>,
) -> anyhow::Result<Tx> {
    let enqueued_public_function_calls = tree.collect_enqueued_public_function_calls();
    let public_teardown_function_call = tree.collect_public_teardown_function_call()?;
    let tx = Tx::new(
        tail_output.public_inputs,
        tail_output.client_ivc_proof.unwrap_or_default(),
        tree.collect_sorted_note_encrypted_logs(),
        tree.collect_sorted_encrypted_logs(),
        tree.collect_sorted_unencrypted_logs(),
        enqueued_public_function_calls,
        public_teardown_function_call,
    )
    .context("private execution does not match the kernel output")?;
    let tx_hash = tx.tx_hash()?;
    info!(
        %tx_hash,
        public_calls = tx.enqueued_public_function_calls().len(),
        "built private transaction"
    );
    Ok(tx)
}
