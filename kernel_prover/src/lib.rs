//! Client-side proving of private transactions.
//!
//! A private transaction executes as a tree of private function calls. Each
//! call yields an application proof, and the private kernel circuits fold
//! these into a single transaction proof:
//!
//! 1. the init kernel checks the entrypoint against the signed [`TxRequest`],
//! 2. the inner kernel folds every nested call, in execution order,
//! 3. reset kernels prove pending read requests and squash notes created and
//!    nullified within the transaction whenever an accumulator would
//!    overflow, and once more before the tail,
//! 4. the tail sorts and silos everything, splitting the output for the
//!    public processor or for the rollup.
//!
//! [`KernelProver`] drives this loop over an [`ExecutionTree`] against a
//! [`ProvingDataOracle`] and a [`ProofCreator`] backend. [`build_tx`] turns the
//! result into a [`Tx`](circuit_types::Tx).
//!
//! [`ExecutionNoteCache`] tracks the notes created and nullified while the
//! private functions of a transaction are being simulated.
//!
//! [`TxRequest`]: circuit_types::TxRequest

#![deny(rustdoc::broken_intra_doc_links)]
#![warn(missing_debug_implementations)]

pub mod circuits;
pub mod cli;
mod debug_utils;
mod execution;
mod hints;
pub mod inputs;
mod note_cache;
pub mod observer;
mod oracle;
mod proof_creator;
mod prover;
mod simulated;
mod tx_builder;

pub use debug_utils::save_inputs_to_disk;
pub use execution::{CountedLog, ExecutionId, ExecutionNode, ExecutionTree, NoteAndSlot};
pub use hints::HintsError;
pub use note_cache::{ExecutionNoteCache, NoteCacheError, NoteData, PendingNote};
pub use oracle::{
    ContractAddressPreimage, ContractClassIdPreimage, InMemoryProvingDataOracle,
    ProvingDataOracle,
};
pub use proof_creator::ProofCreator;
pub use prover::{KernelProver, KernelProverConfig};
pub use simulated::SimulatedProofCreator;
pub use tx_builder::build_tx;
