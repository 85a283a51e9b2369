//! A [`ProofCreator`] that runs the kernels natively and emits fake proofs.

use anyhow::ensure;
use circuit_types::{
    AppCircuitProofOutput, ClientIvcProof, KernelProofOutput, PrivateKernelCircuitPublicInputs,
    PrivateKernelTailCircuitPublicInputs, Proof, VerificationKey, WitnessMap,
};
use l2_common::constants::{NESTED_RECURSIVE_PROOF_LENGTH, RECURSIVE_PROOF_LENGTH};
use l2_common::Fr;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::circuits;
use crate::inputs::{
    ClientCircuitArtifact, PrivateKernelInitCircuitPrivateInputs,
    PrivateKernelInnerCircuitPrivateInputs, PrivateKernelResetCircuitPrivateInputs,
    PrivateKernelTailCircuitPrivateInputs,
};
use crate::proof_creator::ProofCreator;

/// Size of each part of a fake client IVC proof, per folded circuit.
const FAKE_IVC_BYTES_PER_CIRCUIT: usize = 32;

/// Proves nothing, but computes the same public inputs a real backend would.
///
/// Fake proofs are drawn from a seeded generator so runs are reproducible.
#[derive(Debug)]
pub struct SimulatedProofCreator {
    rng: Mutex<ChaCha8Rng>,
}

impl SimulatedProofCreator {
    pub fn new(seed: u64) -> Self {
        Self::from_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: ChaCha8Rng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn make_output<PI>(&self, public_inputs: PI) -> KernelProofOutput<PI> {
        let mut rng = self.rng.lock();
        KernelProofOutput {
            public_inputs,
            proof: Proof::make_fake(&mut *rng, NESTED_RECURSIVE_PROOF_LENGTH),
            verification_key: VerificationKey::make_fake(&mut *rng),
            output_witness: WitnessMap::from([(0, Fr::from(rng.gen::<u64>()))]),
            client_ivc_proof: None,
        }
    }

    fn fake_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.rng.lock().fill(&mut bytes[..]);
        bytes
    }
}

impl ProofCreator for SimulatedProofCreator {
    async fn create_proof_init(
        &self,
        inputs: &PrivateKernelInitCircuitPrivateInputs,
    ) -> anyhow::Result<KernelProofOutput<PrivateKernelCircuitPublicInputs>> {
        let public_inputs = circuits::simulate_init(inputs)?;
        Ok(self.make_output(public_inputs))
    }

    async fn create_proof_inner(
        &self,
        inputs: &PrivateKernelInnerCircuitPrivateInputs,
    ) -> anyhow::Result<KernelProofOutput<PrivateKernelCircuitPublicInputs>> {
        let public_inputs = circuits::simulate_inner(inputs)?;
        Ok(self.make_output(public_inputs))
    }

    async fn create_proof_reset(
        &self,
        inputs: &PrivateKernelResetCircuitPrivateInputs,
    ) -> anyhow::Result<KernelProofOutput<PrivateKernelCircuitPublicInputs>> {
        let public_inputs = circuits::simulate_reset(inputs)?;
        Ok(self.make_output(public_inputs))
    }

    async fn create_proof_tail(
        &self,
        inputs: &PrivateKernelTailCircuitPrivateInputs,
    ) -> anyhow::Result<KernelProofOutput<PrivateKernelTailCircuitPublicInputs>> {
        let public_inputs = circuits::simulate_tail(inputs)?;
        Ok(self.make_output(public_inputs))
    }

    async fn create_app_circuit_proof(
        &self,
        partial_witness: &WitnessMap,
        bytecode: &[u8],
        function_name: Option<&str>,
    ) -> anyhow::Result<AppCircuitProofOutput> {
        debug!(
            function = function_name.unwrap_or("unknown"),
            witness_len = partial_witness.len(),
            bytecode_len = bytecode.len(),
            "simulating app circuit proof"
        );
        let mut rng = self.rng.lock();
        Ok(AppCircuitProofOutput {
            proof: Proof::make_fake(&mut *rng, RECURSIVE_PROOF_LENGTH),
            verification_key: VerificationKey::make_fake(&mut *rng),
        })
    }

    async fn create_client_ivc_proof(
        &self,
        acirs: &[Vec<u8>],
        witness_stack: &[WitnessMap],
    ) -> anyhow::Result<ClientIvcProof> {
        ensure!(!acirs.is_empty(), "nothing to fold");
        ensure!(
            acirs.len() == witness_stack.len(),
            "{} circuits but {} witnesses",
            acirs.len(),
            witness_stack.len()
        );
        let len = FAKE_IVC_BYTES_PER_CIRCUIT * acirs.len();
        Ok(ClientIvcProof {
            inst_vk: self.fake_bytes(FAKE_IVC_BYTES_PER_CIRCUIT),
            pg_acc: self.fake_bytes(len),
            proof: self.fake_bytes(len),
            translator_vk: self.fake_bytes(FAKE_IVC_BYTES_PER_CIRCUIT),
            ecc_vk: self.fake_bytes(FAKE_IVC_BYTES_PER_CIRCUIT),
            num_public_inputs: u32::try_from(witness_stack.len())?,
        })
    }

    fn artifact_bytecode(&self, artifact: ClientCircuitArtifact) -> Vec<u8> {
        artifact.to_string().into_bytes()
    }
}
