use std::future::Future;

use circuit_types::{
    AppCircuitProofOutput, ClientIvcProof, KernelProofOutput, PrivateKernelCircuitPublicInputs,
    PrivateKernelTailCircuitPublicInputs, WitnessMap,
};

use crate::inputs::{
    ClientCircuitArtifact, PrivateKernelInitCircuitPrivateInputs,
    PrivateKernelInnerCircuitPrivateInputs, PrivateKernelResetCircuitPrivateInputs,
    PrivateKernelTailCircuitPrivateInputs,
};

/// The proving backend of the private kernel circuits.
pub trait ProofCreator {
    fn create_proof_init(
        &self,
        inputs: &PrivateKernelInitCircuitPrivateInputs,
    ) -> impl Future<Output = anyhow::Result<KernelProofOutput<PrivateKernelCircuitPublicInputs>>> + Send;

    fn create_proof_inner(
        &self,
        inputs: &PrivateKernelInnerCircuitPrivateInputs,
    ) -> impl Future<Output = anyhow::Result<KernelProofOutput<PrivateKernelCircuitPublicInputs>>> + Send;

    fn create_proof_reset(
        &self,
        inputs: &PrivateKernelResetCircuitPrivateInputs,
    ) -> impl Future<Output = anyhow::Result<KernelProofOutput<PrivateKernelCircuitPublicInputs>>> + Send;

    fn create_proof_tail(
        &self,
        inputs: &PrivateKernelTailCircuitPrivateInputs,
    ) -> impl Future<Output = anyhow::Result<KernelProofOutput<PrivateKernelTailCircuitPublicInputs>>>
           + Send;

    /// Proves one application function from its solved witness.
    fn create_app_circuit_proof(
        &self,
        partial_witness: &WitnessMap,
        bytecode: &[u8],
        function_name: Option<&str>,
    ) -> impl Future<Output = anyhow::Result<AppCircuitProofOutput>> + Send;

    /// Folds every circuit executed for a transaction, in execution order.
    fn create_client_ivc_proof(
        &self,
        acirs: &[Vec<u8>],
        witness_stack: &[WitnessMap],
    ) -> impl Future<Output = anyhow::Result<ClientIvcProof>> + Send;

    /// Bytecode of a kernel circuit.
    fn artifact_bytecode(&self, artifact: ClientCircuitArtifact) -> Vec<u8>;
}
