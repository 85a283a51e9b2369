//! Collaborators the public processor hands its results to.

use std::future::Future;

use circuit_types::ProcessedTx;

/// Receives processed transactions for proving as they are produced.
pub trait BlockProver {
    fn add_new_tx(&self, tx: ProcessedTx) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Policy checks run on processed transactions before they are committed.
pub trait TxValidator {
    /// Splits `txs` into accepted and rejected transactions.
    fn validate_txs(
        &self,
        txs: Vec<ProcessedTx>,
    ) -> impl Future<Output = anyhow::Result<(Vec<ProcessedTx>, Vec<ProcessedTx>)>> + Send;
}

/// Accepts every transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllTxValidator;

impl TxValidator for AcceptAllTxValidator {
    async fn validate_txs(
        &self,
        txs: Vec<ProcessedTx>,
    ) -> anyhow::Result<(Vec<ProcessedTx>, Vec<ProcessedTx>)> {
        Ok((txs, Vec::new()))
    }
}
