use std::fmt;

use l2_common::{Fr, IsEmpty};
use serde::{Deserialize, Serialize};

use crate::call_request::PublicCallRequest;
use crate::logs::{FunctionL2Logs, TxL2Logs};
use crate::private_kernel::PrivateKernelTailCircuitPublicInputs;
use crate::proof::ClientIvcProof;
use crate::public_kernel::PublicKernelCircuitPublicInputs;

/// A transaction is identified by its first nullifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub Fr);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error(
        "kernel declares {declared} public call requests but the transaction carries {enqueued}"
    )]
    PublicCallCountMismatch { declared: usize, enqueued: usize },
    #[error("kernel declares a teardown call but the transaction carries none")]
    MissingTeardownCall,
    #[error("transaction has no nullifiers to derive its hash from")]
    MissingTxHash,
}

/// A proven private transaction ready for a sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    data: PrivateKernelTailCircuitPublicInputs,
    client_ivc_proof: ClientIvcProof,
    note_encrypted_logs: TxL2Logs,
    encrypted_logs: TxL2Logs,
    unencrypted_logs: TxL2Logs,
    enqueued_public_function_calls: Vec<PublicCallRequest>,
    public_teardown_function_call: PublicCallRequest,
}

impl Tx {
    /// Fails unless the enqueued calls match what the kernel declares.
    pub fn new(
        data: PrivateKernelTailCircuitPublicInputs,
        client_ivc_proof: ClientIvcProof,
        note_encrypted_logs: TxL2Logs,
        encrypted_logs: TxL2Logs,
        unencrypted_logs: TxL2Logs,
        enqueued_public_function_calls: Vec<PublicCallRequest>,
        public_teardown_function_call: PublicCallRequest,
    ) -> Result<Self, TxError> {
        let declared = data.number_of_public_call_requests();
        if declared != enqueued_public_function_calls.len() {
            return Err(TxError::PublicCallCountMismatch {
                declared,
                enqueued: enqueued_public_function_calls.len(),
            });
        }
        if data.has_public_teardown_call() && public_teardown_function_call.is_empty() {
            return Err(TxError::MissingTeardownCall);
        }
        Ok(Self {
            data,
            client_ivc_proof,
            note_encrypted_logs,
            encrypted_logs,
            unencrypted_logs,
            enqueued_public_function_calls,
            public_teardown_function_call,
        })
    }

    pub fn data(&self) -> &PrivateKernelTailCircuitPublicInputs {
        &self.data
    }

    pub fn client_ivc_proof(&self) -> &ClientIvcProof {
        &self.client_ivc_proof
    }

    pub fn note_encrypted_logs(&self) -> &TxL2Logs {
        &self.note_encrypted_logs
    }

    pub fn encrypted_logs(&self) -> &TxL2Logs {
        &self.encrypted_logs
    }

    pub fn unencrypted_logs(&self) -> &TxL2Logs {
        &self.unencrypted_logs
    }

    pub fn enqueued_public_function_calls(&self) -> &[PublicCallRequest] {
        &self.enqueued_public_function_calls
    }

    pub fn public_teardown_function_call(&self) -> &PublicCallRequest {
        &self.public_teardown_function_call
    }

    pub fn tx_hash(&self) -> Result<TxHash, TxError> {
        self.data
            .get_non_empty_nullifiers()
            .first()
            .copied()
            .map(TxHash)
            .ok_or(TxError::MissingTxHash)
    }

    pub fn has_public_calls(&self) -> bool {
        self.data.number_of_public_call_requests() > 0 || self.data.has_public_teardown_call()
    }

    /// Appends logs emitted by public calls.
    pub fn add_unencrypted_logs(&mut self, logs: impl IntoIterator<Item = FunctionL2Logs>) {
        self.unencrypted_logs.add_function_logs(logs)
    }

    /// Drops the logs of the revertible half of the transaction, keeping
    /// those whose hashes the non-revertible side effects of `kernel_output`
    /// still carry, including the ones emitted during setup.
    pub fn filter_reverted_logs(&mut self, kernel_output: &PublicKernelCircuitPublicInputs) {
        let non_revertible = &kernel_output.end_non_revertible_data;
        self.note_encrypted_logs = self
            .note_encrypted_logs
            .filter(non_revertible.note_encrypted_logs_hashes.iter().map(|l| l.value));
        self.encrypted_logs = self
            .encrypted_logs
            .filter(non_revertible.encrypted_logs_hashes.iter().map(|l| l.value));
        self.unencrypted_logs = self
            .unencrypted_logs
            .filter(non_revertible.unencrypted_logs_hashes.iter().map(|l| l.value));
    }
}
