//! The private kernel proving loop.
//!
//! [`KernelProver::prove`] walks the execution tree depth first and folds
//! every call into the kernel accumulators: the entrypoint through the init
//! circuit, every nested call through the inner circuit. A reset runs before
//! a fold that would overflow a per-transaction array, and once more before
//! the tail if anything is left to prove or squash.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;

use anyhow::Context as _;
use circuit_types::{
    AppCircuitProofOutput, CallRequest, KernelProofOutput, PrivateKernelCircuitPublicInputs,
    PrivateKernelTailCircuitPublicInputs, TxRequest, WitnessMap,
};
use l2_common::constants::{
    MAX_KEY_VALIDATION_REQUESTS_PER_TX, MAX_NEW_NOTE_HASHES_PER_TX, MAX_NEW_NULLIFIERS_PER_TX,
    MAX_NOTE_ENCRYPTED_LOGS_PER_TX, MAX_NOTE_HASH_READ_REQUESTS_PER_TX,
    MAX_NULLIFIER_READ_REQUESTS_PER_TX, MAX_PUBLIC_CALL_STACK_LENGTH_PER_CALL, VK_TREE_HEIGHT,
};
use l2_common::{array_non_empty_length, assert_length, pad_array_end, Fr, IsEmpty};
use serde::Serialize;
use tracing::{debug, error};

use crate::debug_utils::save_inputs_to_disk;
use crate::execution::{ExecutionId, ExecutionNode, ExecutionTree};
use crate::hints::{
    build_private_kernel_init_hints, build_private_kernel_inner_hints,
    build_private_kernel_reset_inputs, build_private_kernel_tail_hints,
};
use crate::inputs::{
    ClientCircuitArtifact, PrivateCallData, PrivateKernelData,
    PrivateKernelInitCircuitPrivateInputs, PrivateKernelInnerCircuitPrivateInputs,
    PrivateKernelTailCircuitPrivateInputs,
};
use crate::observer::{KernelObserver, KernelStep};
use crate::oracle::ProvingDataOracle;
use crate::proof_creator::ProofCreator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelProverConfig {
    /// Save the inputs of a failing kernel step to `debug_dir`.
    pub save_inputs_on_error: bool,
    pub debug_dir: PathBuf,
}

// If not provided, default debug path is `./debug/`.
pub(crate) fn get_default_debug_path() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("debug");
    path
}

impl Default for KernelProverConfig {
    fn default() -> Self {
        Self {
            save_inputs_on_error: false,
            debug_dir: get_default_debug_path(),
        }
    }
}

/// Circuits and witnesses of every step, in execution order, for the client
/// IVC fold.
#[derive(Debug, Default)]
struct FoldingStack {
    acirs: Vec<Vec<u8>>,
    witnesses: Vec<WitnessMap>,
}

impl FoldingStack {
    fn push(&mut self, acir: Vec<u8>, witness: WitnessMap) {
        self.acirs.push(acir);
        self.witnesses.push(witness);
    }
}

/// Whether folding `next` onto `output` could overflow any per-transaction
/// array. Each category is checked on its own.
fn needs_reset(next: &ExecutionNode, output: &PrivateKernelCircuitPublicInputs) -> bool {
    let call = &next.call_stack_item.public_inputs;
    let end = &output.end;
    let requests = &output.validation_requests;
    array_non_empty_length(&call.note_hashes) + array_non_empty_length(&end.note_hashes)
        > MAX_NEW_NOTE_HASHES_PER_TX
        || array_non_empty_length(&call.nullifiers) + array_non_empty_length(&end.nullifiers)
            > MAX_NEW_NULLIFIERS_PER_TX
        || array_non_empty_length(&call.note_encrypted_logs_hashes)
            + array_non_empty_length(&end.note_encrypted_logs_hashes)
            > MAX_NOTE_ENCRYPTED_LOGS_PER_TX
        || array_non_empty_length(&call.note_hash_read_requests)
            + array_non_empty_length(&requests.note_hash_read_requests)
            > MAX_NOTE_HASH_READ_REQUESTS_PER_TX
        || array_non_empty_length(&call.nullifier_read_requests)
            + array_non_empty_length(&requests.nullifier_read_requests)
            > MAX_NULLIFIER_READ_REQUESTS_PER_TX
        || array_non_empty_length(&call.key_validation_requests_and_generators)
            + array_non_empty_length(&requests.scoped_key_validation_requests_and_generators)
            > MAX_KEY_VALIDATION_REQUESTS_PER_TX
}

/// Drives the private kernel circuits over the execution of one transaction.
#[derive(Debug)]
pub struct KernelProver<O, P> {
    oracle: O,
    proof_creator: P,
    config: KernelProverConfig,
}

impl<O: ProvingDataOracle, P: ProofCreator> KernelProver<O, P> {
    pub fn new(oracle: O, proof_creator: P) -> Self {
        Self::with_config(oracle, proof_creator, KernelProverConfig::default())
    }

    pub fn with_config(oracle: O, proof_creator: P, config: KernelProverConfig) -> Self {
        Self {
            oracle,
            proof_creator,
            config,
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn proof_creator(&self) -> &P {
        &self.proof_creator
    }

    pub fn config(&self) -> &KernelProverConfig {
        &self.config
    }

    /// Proves the private execution `tree` of `tx_request`.
    ///
    /// With `is_private` set, every circuit run along the way is folded into a
    /// client IVC proof attached to the tail output. Any failure aborts the
    /// whole session.
    pub async fn prove(
        &self,
        tx_request: &TxRequest,
        tree: &ExecutionTree,
        is_private: bool,
        observer: &mut impl KernelObserver,
    ) -> anyhow::Result<KernelProofOutput<PrivateKernelTailCircuitPublicInputs>> {
        let note_hash_leaf_index_map = tree.collect_note_hash_leaf_index_map();
        let note_hash_nullifier_counter_map = tree.collect_nullified_note_hash_counters();
        let mut folding = FoldingStack::default();
        let mut execution_stack = vec![tree.root()];
        let mut output = KernelProofOutput::<PrivateKernelCircuitPublicInputs>::empty();
        let mut first_iteration = true;

        while let Some(&next) = execution_stack.last() {
            if !first_iteration && needs_reset(tree.node(next), &output.public_inputs) {
                output = self
                    .reset(
                        tree,
                        &execution_stack,
                        output,
                        &note_hash_leaf_index_map,
                        &mut folding,
                        &mut *observer,
                    )
                    .await?;
            }
            execution_stack.pop();
            let current = tree.node(next);
            execution_stack.extend(current.nested().iter().rev());

            let item = &current.call_stack_item;
            let public_call_requests = current
                .enqueued_public_function_calls
                .iter()
                .map(|call| call.to_call_request())
                .collect();
            let public_teardown_call_request = if current.public_teardown_function_call.is_empty()
            {
                CallRequest::empty()
            } else {
                current.public_teardown_function_call.to_call_request()
            };

            let function_name = self
                .oracle
                .get_debug_function_name(item.contract_address, item.function_data.selector)
                .await
                .context("failed to fetch debug function name")?;
            let app_proof = self
                .proof_creator
                .create_app_circuit_proof(
                    &current.partial_witness,
                    &current.acir,
                    function_name.as_deref(),
                )
                .await
                .with_context(|| {
                    format!(
                        "app circuit proof failed for {}:{}",
                        item.contract_address, item.function_data.selector
                    )
                })?;
            folding.push(current.acir.clone(), current.partial_witness.clone());

            let private_call = self
                .create_private_call_data(
                    current,
                    public_call_requests,
                    public_teardown_call_request,
                    app_proof,
                )
                .await?;

            let (step, artifact) = if first_iteration {
                let hints = build_private_kernel_init_hints(
                    &item.public_inputs,
                    &note_hash_nullifier_counter_map,
                );
                let inputs = PrivateKernelInitCircuitPrivateInputs {
                    tx_request: *tx_request,
                    private_call,
                    hints,
                };
                output = self
                    .prove_step(
                        KernelStep::Init,
                        &inputs,
                        self.proof_creator.create_proof_init(&inputs),
                    )
                    .await?;
                (KernelStep::Init, ClientCircuitArtifact::PrivateKernelInit)
            } else {
                let hints = build_private_kernel_inner_hints(
                    &item.public_inputs,
                    &note_hash_nullifier_counter_map,
                );
                let inputs = PrivateKernelInnerCircuitPrivateInputs {
                    previous_kernel: self.previous_kernel_data(output).await?,
                    private_call,
                    hints,
                };
                output = self
                    .prove_step(
                        KernelStep::Inner,
                        &inputs,
                        self.proof_creator.create_proof_inner(&inputs),
                    )
                    .await?;
                (KernelStep::Inner, ClientCircuitArtifact::PrivateKernelInner)
            };
            folding.push(
                self.proof_creator.artifact_bytecode(artifact),
                output.output_witness.clone(),
            );
            observer.collect_step(step, &output.public_inputs);
            first_iteration = false;
        }

        if output.public_inputs.something_to_reset() {
            output = self
                .reset(
                    tree,
                    &execution_stack,
                    output,
                    &note_hash_leaf_index_map,
                    &mut folding,
                    &mut *observer,
                )
                .await?;
        }

        let previous_kernel = self.previous_kernel_data(output).await?;
        debug!(
            "Calling private kernel tail with hwm {}",
            previous_kernel.public_inputs.min_revertible_side_effect_counter
        );
        let hints = build_private_kernel_tail_hints(&previous_kernel.public_inputs);
        let inputs = PrivateKernelTailCircuitPrivateInputs {
            previous_kernel,
            hints,
        };
        let mut tail_output = self
            .prove_step("tail", &inputs, self.proof_creator.create_proof_tail(&inputs))
            .await?;
        folding.push(
            self.proof_creator
                .artifact_bytecode(ClientCircuitArtifact::PrivateKernelTail),
            tail_output.output_witness.clone(),
        );

        if is_private {
            debug!(circuits = folding.acirs.len(), "folding client IVC proof");
            let ivc_proof = self
                .proof_creator
                .create_client_ivc_proof(&folding.acirs, &folding.witnesses)
                .await
                .context("client IVC proof failed")?;
            tail_output.client_ivc_proof = Some(ivc_proof);
        }
        Ok(tail_output)
    }

    async fn reset(
        &self,
        tree: &ExecutionTree,
        execution_stack: &[ExecutionId],
        output: KernelProofOutput<PrivateKernelCircuitPublicInputs>,
        note_hash_leaf_index_map: &BTreeMap<Fr, u64>,
        folding: &mut FoldingStack,
        observer: &mut impl KernelObserver,
    ) -> anyhow::Result<KernelProofOutput<PrivateKernelCircuitPublicInputs>> {
        let previous_kernel = self.previous_kernel_data(output).await?;
        let inputs = build_private_kernel_reset_inputs(
            tree,
            execution_stack,
            previous_kernel,
            note_hash_leaf_index_map,
            &self.oracle,
        )
        .await
        .context("failed to build private kernel reset inputs")?;
        let step = KernelStep::Reset(inputs.size_tag);
        let output = self
            .prove_step(step, &inputs, self.proof_creator.create_proof_reset(&inputs))
            .await?;
        folding.push(
            self.proof_creator
                .artifact_bytecode(ClientCircuitArtifact::PrivateKernelReset(inputs.size_tag)),
            output.output_witness.clone(),
        );
        observer.collect_step(step, &output.public_inputs);
        Ok(output)
    }

    /// Runs one kernel proof, saving its inputs to disk if it fails and the
    /// config asks for it.
    async fn prove_step<I: Serialize, T>(
        &self,
        step: impl Display,
        inputs: &I,
        proof: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        debug!(%step, "proving private kernel step");
        match proof.await {
            Ok(output) => Ok(output),
            Err(err) => {
                if self.config.save_inputs_on_error {
                    let file_name = format!("private_kernel_{}_input.json", step)
                        .replace([' ', '(', ')'], "");
                    if let Err(write_err) =
                        save_inputs_to_disk(&self.config.debug_dir, file_name, inputs)
                    {
                        error!("Failed to save private kernel inputs to disk: {:?}", write_err);
                    }
                }
                Err(err.context(format!("private kernel {step} proof failed")))
            }
        }
    }

    async fn previous_kernel_data(
        &self,
        output: KernelProofOutput<PrivateKernelCircuitPublicInputs>,
    ) -> anyhow::Result<PrivateKernelData> {
        let vk_witness = self
            .oracle
            .get_vk_membership_witness(&output.verification_key)
            .await
            .context("failed to fetch vk membership witness")?;
        Ok(PrivateKernelData {
            public_inputs: output.public_inputs,
            proof: output.proof,
            vk: output.verification_key,
            vk_index: vk_witness.leaf_index,
            vk_path: assert_length(vk_witness.sibling_path, VK_TREE_HEIGHT)?,
        })
    }

    async fn create_private_call_data(
        &self,
        node: &ExecutionNode,
        public_call_requests: Vec<CallRequest>,
        public_teardown_call_request: CallRequest,
        app_proof: AppCircuitProofOutput,
    ) -> anyhow::Result<PrivateCallData> {
        let item = &node.call_stack_item;
        let address = item.contract_address;
        let public_call_stack = pad_array_end(
            public_call_requests,
            CallRequest::empty(),
            MAX_PUBLIC_CALL_STACK_LENGTH_PER_CALL,
        )?;

        let function_leaf_membership_witness = self
            .oracle
            .get_function_membership_witness(address, item.function_data.selector)
            .await
            .context("failed to fetch function membership witness")?;
        let address_preimage = self
            .oracle
            .get_contract_address_preimage(address)
            .await
            .context("failed to fetch contract address preimage")?;
        let class_preimage = self
            .oracle
            .get_contract_class_id_preimage(address_preimage.contract_class_id)
            .await
            .context("failed to fetch contract class preimage")?;

        // The kernels do not constrain the acir hash yet; it stays zero.
        let acir_hash = Fr::zero();

        Ok(PrivateCallData {
            call_stack_item: item.clone(),
            public_call_stack,
            public_teardown_call_request,
            proof: app_proof.proof,
            vk: app_proof.verification_key,
            public_keys_hash: address_preimage.public_keys_hash,
            contract_class_artifact_hash: class_preimage.artifact_hash,
            contract_class_public_bytecode_commitment: class_preimage.public_bytecode_commitment,
            salted_initialization_hash: address_preimage.salted_initialization_hash,
            function_leaf_membership_witness,
            acir_hash,
        })
    }
}
