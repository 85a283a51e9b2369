//! The sequencer side of transaction processing.
//!
//! A [`PublicProcessor`] takes proven private transactions and runs their
//! enqueued public calls in three phases: setup, app logic and teardown. Each
//! executed call is folded into the transaction's public kernel output. A
//! revert in app logic or teardown rolls back that phase only, while a setup
//! revert drops the whole transaction. The public kernel tail then produces
//! the final output, the fee is charged to the fee payer, and the
//! [`ProcessedTx`](circuit_types::ProcessedTx) is committed and handed to the
//! [`BlockProver`].

#![deny(rustdoc::broken_intra_doc_links)]
#![warn(missing_debug_implementations)]

pub mod cli;
mod config;
mod db;
mod executor;
mod fee_payment;
mod interfaces;
pub mod phase_manager;
mod processor;
mod public_kernel;
pub mod tracing;

pub use config::{ProcessorConfig, DEFAULT_MAX_TRANSACTIONS_PER_BLOCK};
pub use db::{InMemoryPublicStateDb, PublicStateDb};
pub use executor::{PublicExecutionResult, PublicExecutor};
pub use fee_payment::{
    compute_fee_payer_balance_leaf_slot, compute_fee_payer_balance_storage_slot,
    compute_fee_payment_update_request, merge_fee_payment_update_request, FeePaymentError,
};
pub use interfaces::{AcceptAllTxValidator, BlockProver, TxValidator};
pub use phase_manager::{PhaseError, PhaseManager, PublicExecutionOutcome};
pub use processor::{FailedTx, PublicProcessor, ValidationError};
pub use public_kernel::{squash_public_data_writes, NativePublicKernel, PublicKernelCircuitSimulator};
