//! Data exchanged between the private kernel prover, the public processor and
//! the block prover.
//!
//! The private side produces a [`Tx`] from the output of the private kernel
//! tail. The sequencer turns it into a [`ProcessedTx`] by running its public
//! calls through the public kernels.

#![deny(rustdoc::broken_intra_doc_links)]
#![warn(missing_debug_implementations)]

mod call_request;
mod kernel;
mod logs;
pub mod mocks;
mod private_kernel;
mod processed_tx;
mod proof;
mod public_kernel;
mod side_effects;
mod simulation_error;
mod tx;

pub use call_request::{
    compute_args_hash, CallContext, CallRequest, FunctionData, PrivateCallRequest,
    PublicCallRequest,
};
pub use kernel::{
    CombinedAccumulatedData, CombinedConstantData, GlobalVariables, KernelCircuitPublicInputs,
    RevertCode, RollupValidationRequests, TxContext,
};
pub use logs::{FunctionL2Logs, L2Log, TxL2Logs};
pub use private_kernel::{
    PartialPrivateTailPublicInputsForPublic, PartialPrivateTailPublicInputsForRollup,
    PrivateAccumulatedData, PrivateCallStackItem, PrivateCircuitPublicInputs,
    PrivateKernelCircuitPublicInputs, PrivateKernelTailCircuitPublicInputs,
    PrivateValidationRequests, TailOutputError, TxRequest,
};
pub use processed_tx::{
    make_processed_tx, validate_processed_tx, ProcessedTx, PublicKernelRequest,
    PublicKernelType, TxEffect,
};
pub use proof::{
    AppCircuitProofOutput, ClientIvcProof, KernelProofOutput, MembershipWitness,
    NullifierLeafPreimage, NullifierMembershipWitness, Proof, VerificationKey, WitnessMap,
};
pub use public_kernel::{
    PublicAccumulatedData, PublicCallData, PublicCallStackItem, PublicCircuitPublicInputs,
    PublicKernelCircuitPrivateInputs, PublicKernelCircuitPublicInputs, PublicKernelData,
    PublicKernelTailCircuitPrivateInputs, PublicValidationRequests,
};
pub use side_effects::{
    ContractStorageRead, ContractStorageUpdateRequest, KeyValidationRequest,
    KeyValidationRequestAndGenerator, LogHash, NoteHash, NoteLogHash, Nullifier, PublicDataRead,
    PublicDataUpdateRequest, PublicDataWrite, ReadRequest, ScopedKeyValidationRequestAndGenerator,
    ScopedLogHash, ScopedNoteHash, ScopedNullifier, ScopedReadRequest,
};
pub use simulation_error::{FailingFunction, SimulationError};
pub use tx::{Tx, TxError, TxHash};
