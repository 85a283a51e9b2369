use std::collections::BTreeMap;

use anyhow::{ensure, Context as _};
use circuit_types::{make_processed_tx, validate_processed_tx, GlobalVariables, ProcessedTx, Tx, TxHash};
use tracing::{debug, error, info, warn};

use crate::config::ProcessorConfig;
use crate::db::PublicStateDb;
use crate::executor::PublicExecutor;
use crate::fee_payment::{compute_fee_payment_update_request, merge_fee_payment_update_request};
use crate::interfaces::{BlockProver, TxValidator};
use crate::phase_manager::PhaseManager;
use crate::public_kernel::PublicKernelCircuitSimulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("tx {0} rejected by the tx validator")]
    Rejected(TxHash),
}

/// A transaction left out of the block, with the reason.
#[derive(Debug)]
pub struct FailedTx {
    pub tx: Tx,
    pub error: anyhow::Error,
}

/// Turns transactions into [`ProcessedTx`]s for one block, one at a time,
/// against a shared state view.
///
/// Every transaction either commits all of its effects or none of them.
#[derive(Debug)]
pub struct PublicProcessor<S, E, K> {
    state_db: S,
    executor: E,
    kernel: K,
    global_variables: GlobalVariables,
    config: ProcessorConfig,
}

impl<S, E, K> PublicProcessor<S, E, K>
where
    S: PublicStateDb,
    E: PublicExecutor,
    K: PublicKernelCircuitSimulator,
{
    pub fn new(
        state_db: S,
        executor: E,
        kernel: K,
        global_variables: GlobalVariables,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            state_db,
            executor,
            kernel,
            global_variables,
            config,
        }
    }

    pub fn state_db(&self) -> &S {
        &self.state_db
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// [`process`](Self::process) with the configured block size.
    pub async fn process_block(
        &mut self,
        txs: impl IntoIterator<Item = Tx>,
        block_prover: &impl BlockProver,
        validator: &impl TxValidator,
    ) -> anyhow::Result<(Vec<ProcessedTx>, Vec<FailedTx>)> {
        let max_transactions = self.config.max_transactions_per_block;
        self.process(txs, max_transactions, block_prover, validator)
            .await
    }

    /// Processes up to `max_transactions` of `txs` in order. The rest are
    /// not looked at.
    ///
    /// Processed transactions are committed and handed to `block_prover`.
    /// Transactions that fail are returned with their error and leave no
    /// trace in the state view. Pass
    /// [`AcceptAllTxValidator`](crate::AcceptAllTxValidator) to skip
    /// validation.
    pub async fn process(
        &mut self,
        txs: impl IntoIterator<Item = Tx>,
        max_transactions: usize,
        block_prover: &impl BlockProver,
        validator: &impl TxValidator,
    ) -> anyhow::Result<(Vec<ProcessedTx>, Vec<FailedTx>)> {
        ensure!(max_transactions > 0, "max_transactions must be positive");

        let mut processed = Vec::new();
        let mut failed = Vec::new();
        let mut txs = txs.into_iter();
        for tx in txs.by_ref().take(max_transactions) {
            let tx_hash = tx.tx_hash().unwrap_or_default();
            match self.process_tx(&tx, validator).await {
                Ok(processed_tx) => {
                    info!(
                        %tx_hash,
                        revert_code = %processed_tx.revert_code(),
                        gas_used = ?processed_tx.gas_used,
                        "processed transaction"
                    );
                    block_prover
                        .add_new_tx(processed_tx.clone())
                        .await
                        .with_context(|| format!("block prover refused tx {tx_hash}"))?;
                    processed.push(processed_tx);
                }
                Err(error) => {
                    warn!(%tx_hash, "failed to process transaction: {error:#}");
                    failed.push(FailedTx { tx, error });
                }
            }
        }
        let skipped = txs.count();
        if skipped > 0 {
            debug!(skipped, max_transactions, "transaction limit reached");
        }
        Ok((processed, failed))
    }

    async fn process_tx(
        &mut self,
        tx: &Tx,
        validator: &impl TxValidator,
    ) -> anyhow::Result<ProcessedTx> {
        let mut touched_state = tx.has_public_calls();
        match self.execute_tx(tx, validator, &mut touched_state).await {
            Ok(processed) => {
                self.state_db.commit().await?;
                Ok(processed)
            }
            Err(err) => {
                if touched_state {
                    if let Err(rollback_err) = self.state_db.rollback_to_commit().await {
                        error!("Failed to roll back public state: {rollback_err:?}");
                    }
                }
                Err(err)
            }
        }
    }

    async fn execute_tx(
        &mut self,
        tx: &Tx,
        validator: &impl TxValidator,
        touched_state: &mut bool,
    ) -> anyhow::Result<ProcessedTx> {
        let mut tx = tx.clone();
        let mut processed = if tx.has_public_calls() {
            let outcome = PhaseManager::new(
                &mut self.state_db,
                &self.executor,
                &self.kernel,
                self.global_variables,
            )
            .run(&mut tx)
            .await?;
            make_processed_tx(
                &tx,
                outcome.kernel_output,
                outcome.kernel_requests,
                outcome.revert_reason,
                outcome.gas_used,
            )?
        } else {
            let mut kernel_output = tx.data().to_kernel_circuit_public_inputs()?;
            kernel_output.constants.global_variables = self.global_variables;
            make_processed_tx(&tx, kernel_output, Vec::new(), None, BTreeMap::new())?
        };

        if self.config.enforce_fee_payment {
            let writes = &processed.data.end.public_data_update_requests;
            let payment = compute_fee_payment_update_request(
                &mut self.state_db,
                self.config.gas_token_address,
                processed.data.fee_payer,
                processed.transaction_fee()?,
                writes,
            )
            .await?;
            *touched_state |= payment.is_some();
            processed.final_public_data_update_requests =
                merge_fee_payment_update_request(writes, payment)?;
        }

        validate_processed_tx(&processed)?;
        let tx_hash = processed.hash;
        let (mut accepted, _) = validator.validate_txs(vec![processed]).await?;
        accepted
            .pop()
            .ok_or_else(|| ValidationError::Rejected(tx_hash).into())
    }
}
