//! Runs transactions through the public processor against recording test
//! doubles for the state view, the public executor and the block prover.

use std::collections::{HashMap, HashSet};

use anyhow::bail;
use assert2::{check, let_assert};
use circuit_types::mocks::{mock_public_call_request, mock_tx, MockTxOptions};
use circuit_types::{
    ContractStorageUpdateRequest, FunctionL2Logs, GlobalVariables, LogHash, Nullifier, ProcessedTx,
    PublicCallRequest, PublicDataUpdateRequest, PublicKernelType, RevertCode, SimulationError,
    Tx, TxContext,
};
use l2_common::constants::{GAS_TOKEN_ADDRESS, MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX};
use l2_common::{fr, ContractAddress, FeeOverflow, Fr, Gas, GasFees, GasSettings};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sequencer::{
    compute_fee_payer_balance_leaf_slot, compute_fee_payer_balance_storage_slot,
    AcceptAllTxValidator, BlockProver, FeePaymentError, InMemoryPublicStateDb,
    NativePublicKernel, PhaseError, ProcessorConfig, PublicExecutionResult, PublicExecutor,
    PublicProcessor, PublicStateDb, TxValidator, ValidationError,
};

#[derive(Debug, Default)]
struct RecordingStateDb {
    inner: InMemoryPublicStateDb,
    writes: usize,
    checkpoints: usize,
    rollbacks_to_checkpoint: usize,
    commits: usize,
    rollbacks_to_commit: usize,
}

impl RecordingStateDb {
    fn committed(&self, contract: ContractAddress, slot: u64) -> Fr {
        self.inner.committed_value(contract, fr(slot))
    }
}

impl PublicStateDb for RecordingStateDb {
    async fn storage_read(&self, contract: ContractAddress, slot: Fr) -> anyhow::Result<Fr> {
        self.inner.storage_read(contract, slot).await
    }

    async fn storage_write(
        &mut self,
        contract: ContractAddress,
        slot: Fr,
        value: Fr,
    ) -> anyhow::Result<Fr> {
        self.writes += 1;
        self.inner.storage_write(contract, slot, value).await
    }

    async fn checkpoint(&mut self) -> anyhow::Result<()> {
        self.checkpoints += 1;
        self.inner.checkpoint().await
    }

    async fn rollback_to_checkpoint(&mut self) -> anyhow::Result<()> {
        self.rollbacks_to_checkpoint += 1;
        self.inner.rollback_to_checkpoint().await
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        self.commits += 1;
        self.inner.commit().await
    }

    async fn rollback_to_commit(&mut self) -> anyhow::Result<()> {
        self.rollbacks_to_commit += 1;
        self.inner.rollback_to_commit().await
    }
}

#[derive(Debug, Clone)]
struct SimulateCall {
    request: PublicCallRequest,
    available_gas: Gas,
    transaction_fee: Fr,
}

/// Answers each call with a scripted result, or an empty one.
#[derive(Debug, Default)]
struct ScriptedExecutor {
    results: HashMap<Fr, PublicExecutionResult>,
    crashes: HashSet<Fr>,
    calls: Mutex<Vec<SimulateCall>>,
}

impl ScriptedExecutor {
    fn with_result(mut self, result: PublicExecutionResult) -> Self {
        self.results.insert(result.execution_request.hash(), result);
        self
    }

    fn crashing_on(mut self, request: &PublicCallRequest) -> Self {
        self.crashes.insert(request.hash());
        self
    }

    fn calls(&self) -> Vec<SimulateCall> {
        self.calls.lock().clone()
    }
}

impl PublicExecutor for ScriptedExecutor {
    async fn simulate(
        &self,
        request: &PublicCallRequest,
        _global_variables: &GlobalVariables,
        available_gas: Gas,
        _tx_context: &TxContext,
        _pending_nullifiers: &[Nullifier],
        transaction_fee: Fr,
        _side_effect_counter: u32,
    ) -> anyhow::Result<PublicExecutionResult> {
        self.calls.lock().push(SimulateCall {
            request: request.clone(),
            available_gas,
            transaction_fee,
        });
        if self.crashes.contains(&request.hash()) {
            bail!("simulator crashed");
        }
        Ok(self
            .results
            .get(&request.hash())
            .cloned()
            .unwrap_or_else(|| PublicExecutionResult::empty_for(request.clone())))
    }
}

#[derive(Debug, Default)]
struct RecordingBlockProver {
    txs: Mutex<Vec<ProcessedTx>>,
}

impl BlockProver for RecordingBlockProver {
    async fn add_new_tx(&self, tx: ProcessedTx) -> anyhow::Result<()> {
        self.txs.lock().push(tx);
        Ok(())
    }
}

#[derive(Debug)]
struct RejectingValidator;

impl TxValidator for RejectingValidator {
    async fn validate_txs(
        &self,
        txs: Vec<ProcessedTx>,
    ) -> anyhow::Result<(Vec<ProcessedTx>, Vec<ProcessedTx>)> {
        Ok((Vec::new(), txs))
    }
}

type Processor = PublicProcessor<RecordingStateDb, ScriptedExecutor, NativePublicKernel>;

fn global_variables() -> GlobalVariables {
    GlobalVariables {
        chain_id: Fr::one(),
        version: Fr::one(),
        block_number: 3,
        gas_fees: GasFees::new(1u64, 2u64),
        ..Default::default()
    }
}

fn processor(state_db: RecordingStateDb, executor: ScriptedExecutor) -> Processor {
    sequencer::tracing::init("sequencer=debug");
    PublicProcessor::new(
        state_db,
        executor,
        NativePublicKernel::new(),
        global_variables(),
        ProcessorConfig::default(),
    )
}

/// A successful run of `request` that used `gas` and wrote `writes` as
/// (slot, value) pairs to its own storage.
fn result(request: &PublicCallRequest, gas: Gas, writes: &[(u64, u64)]) -> PublicExecutionResult {
    let mut result = PublicExecutionResult::empty_for(request.clone());
    result.start_gas_left = Gas::new(1_000, 1_000);
    result.end_gas_left = result.start_gas_left - gas;
    result.contract_storage_update_requests = writes
        .iter()
        .enumerate()
        .map(|(i, &(slot, value))| ContractStorageUpdateRequest {
            storage_slot: fr(slot),
            new_value: fr(value),
            counter: request.side_effect_counter + 1 + i as u32,
            contract_address: ContractAddress::ZERO,
        })
        .collect();
    result.end_side_effect_counter = request.side_effect_counter + 1 + writes.len() as u32;
    result
}

fn reverted(mut result: PublicExecutionResult, message: &str) -> PublicExecutionResult {
    result.revert_reason = Some(SimulationError::new(message, Vec::new()));
    result
}

fn tx(rng: &mut ChaCha8Rng, options: MockTxOptions) -> Tx {
    mock_tx(rng, options).unwrap()
}

fn setup_call(tx: &Tx) -> PublicCallRequest {
    tx.enqueued_public_function_calls()[0].clone()
}

fn app_logic_call(tx: &Tx, index: usize) -> PublicCallRequest {
    let calls = tx.enqueued_public_function_calls();
    calls[calls.len() - 1 - index].clone()
}

fn kernel_types(tx: &ProcessedTx) -> Vec<PublicKernelType> {
    tx.public_kernel_requests
        .iter()
        .map(|r| r.kernel_type())
        .collect()
}

#[tokio::test]
async fn private_only_tx_is_committed_without_simulation() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let tx = tx(&mut rng, MockTxOptions::default());
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), ScriptedExecutor::default());

    let (processed, failed) = processor
        .process([tx.clone()], 1, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    check!(failed.is_empty());
    let_assert!([processed] = processed.as_slice());
    check!(processed.hash == tx.tx_hash().unwrap());
    check!(processed.revert_code() == RevertCode::Ok);
    check!(processed.public_kernel_requests.is_empty());
    check!(processed.data.constants.global_variables == global_variables());
    check!(processor.executor().calls().is_empty());
    check!(processor.state_db().commits == 1);
    check!(processor.state_db().writes == 0);
    check!(*prover.txs.lock() == vec![processed.clone()]);
}

#[tokio::test]
async fn app_logic_revert_keeps_setup_writes() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let tx = tx(
        &mut rng,
        MockTxOptions {
            number_of_non_revertible_public_call_requests: 1,
            number_of_revertible_public_call_requests: 1,
            has_logs: true,
            ..Default::default()
        },
    );
    let setup = setup_call(&tx);
    let app_logic = app_logic_call(&tx, 0);
    let nested_request = mock_public_call_request(&mut rng, app_logic.side_effect_counter + 2);
    let mut app_logic_result = result(&app_logic, Gas::new(5, 5), &[(2, 20)]);
    app_logic_result
        .nested_executions
        .push(reverted(result(&nested_request, Gas::new(1, 1), &[]), "nested assertion failed"));
    let executor = ScriptedExecutor::default()
        .with_result(result(&setup, Gas::new(3, 4), &[(1, 10)]))
        .with_result(app_logic_result);
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), executor);

    let (processed, failed) = processor
        .process([tx], 1, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    check!(failed.is_empty());
    let_assert!([processed] = processed.as_slice());
    check!(processed.revert_code() == RevertCode::AppLogicReverted);
    let_assert!(Some(reason) = &processed.revert_reason);
    check!(reason.message == "nested assertion failed");
    check!(
        kernel_types(processed)
            == vec![
                PublicKernelType::Setup,
                PublicKernelType::AppLogic,
                PublicKernelType::Tail
            ]
    );
    check!(processed.gas_used[&PublicKernelType::Setup] == Gas::new(3, 4));
    check!(processed.gas_used[&PublicKernelType::AppLogic] == Gas::new(5, 5));
    check!(processed.data.end.gas_used == Gas::new(8, 9));
    check!(processed.data.end.public_data_update_requests.len() == 1);
    check!(processed.unencrypted_logs.total_log_count() == 1);

    let db = processor.state_db();
    check!(db.committed(setup.contract_address, 1) == fr(10));
    check!(db.committed(app_logic.contract_address, 2) == Fr::zero());
    check!(db.checkpoints == 1);
    check!(db.rollbacks_to_checkpoint == 1);
    check!(db.commits == 1);
    check!(db.rollbacks_to_commit == 0);
}

#[tokio::test]
async fn teardown_is_charged_its_full_allocation() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let teardown_limits = Gas::new(100, 200);
    let tx = tx(
        &mut rng,
        MockTxOptions {
            has_public_teardown_call_request: true,
            gas_settings: GasSettings {
                teardown_gas_limits: teardown_limits,
                inclusion_fee: fr(7),
                ..Default::default()
            },
            ..Default::default()
        },
    );
    let teardown = tx.public_teardown_function_call().clone();
    let executor = ScriptedExecutor::default().with_result(result(&teardown, Gas::new(30, 40), &[]));
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), executor);

    let (processed, failed) = processor
        .process([tx], 1, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    check!(failed.is_empty());
    let_assert!([processed] = processed.as_slice());
    check!(processed.revert_code() == RevertCode::Ok);
    check!(processed.gas_used[&PublicKernelType::Teardown] == Gas::new(30, 40));
    check!(processed.data.end.gas_used == teardown_limits);
    // 7 + 100 * 1 + 200 * 2
    check!(processed.transaction_fee() == Ok(fr(507)));

    let calls = processor.executor().calls();
    let_assert!([call] = calls.as_slice());
    check!(call.request == teardown);
    check!(call.available_gas == teardown_limits);
    check!(call.transaction_fee == fr(507));
    check!(processor.state_db().checkpoints == 1);
}

#[tokio::test]
async fn overflowing_teardown_fee_fails_only_that_tx() {
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let greedy = tx(
        &mut rng,
        MockTxOptions {
            has_public_teardown_call_request: true,
            gas_settings: GasSettings {
                teardown_gas_limits: Gas::new(100, 200),
                inclusion_fee: Fr::MAX,
                ..Default::default()
            },
            ..Default::default()
        },
    );
    let honest = tx(&mut rng, MockTxOptions::default());
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), ScriptedExecutor::default());

    let (processed, failed) = processor
        .process([greedy.clone(), honest.clone()], 2, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    let_assert!([processed] = processed.as_slice());
    check!(processed.hash == honest.tx_hash().unwrap());
    let_assert!([failed] = failed.as_slice());
    check!(failed.tx == greedy);
    check!(failed.error.downcast_ref::<FeeOverflow>() == Some(&FeeOverflow));
    check!(processor.executor().calls().is_empty());
    let db = processor.state_db();
    check!(db.rollbacks_to_commit == 1);
    check!(db.commits == 1);
}

#[tokio::test]
async fn fee_payer_without_enough_balance_is_rejected() {
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let fee_payer = ContractAddress::from(0xfee);
    let tx = tx(
        &mut rng,
        MockTxOptions {
            fee_payer,
            gas_settings: GasSettings {
                inclusion_fee: fr(100),
                ..Default::default()
            },
            ..Default::default()
        },
    );
    let state_db = RecordingStateDb {
        inner: InMemoryPublicStateDb::new().with_storage(
            GAS_TOKEN_ADDRESS,
            compute_fee_payer_balance_storage_slot(fee_payer),
            fr(1),
        ),
        ..Default::default()
    };
    let prover = RecordingBlockProver::default();
    let mut processor = processor(state_db, ScriptedExecutor::default());

    let (processed, failed) = processor
        .process([tx], 1, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    check!(processed.is_empty());
    let_assert!([failed] = failed.as_slice());
    check!(failed.error.to_string().contains("Not enough balance"));
    let_assert!(
        Some(FeePaymentError::InsufficientBalance { balance, fee, .. }) = failed.error.downcast_ref::<FeePaymentError>()
    );
    check!((*balance, *fee) == (fr(1), fr(100)));

    let db = processor.state_db();
    check!(db.writes == 0);
    check!(db.commits == 0);
    check!(db.rollbacks_to_commit == 0);
    check!(prover.txs.lock().is_empty());
}

#[tokio::test]
async fn fee_is_deducted_from_the_fee_payer() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let fee_payer = ContractAddress::from(0xfee);
    let tx = tx(
        &mut rng,
        MockTxOptions {
            number_of_revertible_public_call_requests: 1,
            fee_payer,
            gas_settings: GasSettings {
                inclusion_fee: fr(100),
                ..Default::default()
            },
            ..Default::default()
        },
    );
    let app_logic = app_logic_call(&tx, 0);
    let mut app_logic_result = result(&app_logic, Gas::new(5, 10), &[(4, 40)]);
    app_logic_result.unencrypted_logs = FunctionL2Logs::random(&mut rng, 1);
    let balance_slot = compute_fee_payer_balance_storage_slot(fee_payer);
    let state_db = RecordingStateDb {
        inner: InMemoryPublicStateDb::new().with_storage(GAS_TOKEN_ADDRESS, balance_slot, fr(1_000_000)),
        ..Default::default()
    };
    let prover = RecordingBlockProver::default();
    let mut processor = processor(state_db, ScriptedExecutor::default().with_result(app_logic_result));

    let (processed, failed) = processor
        .process([tx], 1, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    check!(failed.is_empty());
    let_assert!([processed] = processed.as_slice());
    // 100 + 5 * 1 + 10 * 2
    check!(processed.transaction_fee() == Ok(fr(125)));
    check!(processed.data.fee_payer == fee_payer);
    check!(
        processed.final_public_data_update_requests[MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX]
            == PublicDataUpdateRequest::new(
                compute_fee_payer_balance_leaf_slot(GAS_TOKEN_ADDRESS, fee_payer),
                fr(1_000_000 - 125),
                0
            )
    );
    check!(processed.to_tx_effect().unwrap().public_data_writes.len() == 2);
    check!(processed.unencrypted_logs.total_log_count() == 1);

    let db = processor.state_db();
    check!(db.inner.committed_value(GAS_TOKEN_ADDRESS, balance_slot) == fr(1_000_000 - 125));
    check!(db.committed(app_logic.contract_address, 4) == fr(40));
    check!(db.writes == 2);
    check!(db.commits == 1);
}

#[tokio::test]
async fn app_logic_revert_keeps_setup_logs() {
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let tx = tx(
        &mut rng,
        MockTxOptions {
            number_of_non_revertible_public_call_requests: 1,
            number_of_revertible_public_call_requests: 1,
            ..Default::default()
        },
    );
    let setup = setup_call(&tx);
    let app_logic = app_logic_call(&tx, 0);
    let mut setup_result = result(&setup, Gas::new(1, 1), &[]);
    setup_result.unencrypted_logs = FunctionL2Logs::random(&mut rng, 1);
    let setup_log = setup_result.unencrypted_logs.logs[0].clone();
    setup_result.unencrypted_logs_hashes = vec![LogHash::new(
        setup_log.hash(),
        setup.side_effect_counter + 1,
        setup_log.data.len() as u64,
    )];
    setup_result.end_side_effect_counter = setup.side_effect_counter + 2;
    let mut app_logic_result = reverted(result(&app_logic, Gas::new(2, 2), &[]), "out of funds");
    app_logic_result.unencrypted_logs = FunctionL2Logs::random(&mut rng, 1);
    let executor = ScriptedExecutor::default()
        .with_result(setup_result)
        .with_result(app_logic_result);
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), executor);

    let (processed, failed) = processor
        .process([tx], 1, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    check!(failed.is_empty());
    let_assert!([processed] = processed.as_slice());
    check!(processed.revert_code() == RevertCode::AppLogicReverted);
    let logs: Vec<_> = processed.unencrypted_logs.unroll_logs().collect();
    check!(logs == vec![&setup_log]);
    let hashes: Vec<_> = processed
        .data
        .end
        .unencrypted_logs_hashes
        .iter()
        .filter(|l| !l.value.is_zero())
        .map(|l| l.value)
        .collect();
    check!(hashes == vec![setup_log.hash()]);
}

#[tokio::test]
async fn setup_revert_fails_the_whole_tx() {
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    let tx = tx(
        &mut rng,
        MockTxOptions {
            number_of_non_revertible_public_call_requests: 1,
            number_of_revertible_public_call_requests: 1,
            ..Default::default()
        },
    );
    let setup = setup_call(&tx);
    let executor = ScriptedExecutor::default().with_result(reverted(
        result(&setup, Gas::new(1, 1), &[(1, 10)]),
        "not authorized",
    ));
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), executor);

    let (processed, failed) = processor
        .process([tx.clone()], 1, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    check!(processed.is_empty());
    let_assert!([failed] = failed.as_slice());
    check!(failed.tx == tx);
    let_assert!(Some(PhaseError::SetupReverted(reason)) = failed.error.downcast_ref::<PhaseError>());
    check!(reason.message == "not authorized");
    check!(processor.executor().calls().len() == 1);

    let db = processor.state_db();
    check!(db.committed(setup.contract_address, 1) == Fr::zero());
    check!(db.checkpoints == 0);
    check!(db.rollbacks_to_commit == 1);
    check!(db.commits == 0);
    check!(prover.txs.lock().is_empty());
}

#[tokio::test]
async fn txs_past_the_limit_are_left_untouched() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let txs: Vec<_> = (0..3)
        .map(|_| {
            tx(
                &mut rng,
                MockTxOptions {
                    number_of_revertible_public_call_requests: 1,
                    ..Default::default()
                },
            )
        })
        .collect();
    let executor = txs.iter().fold(ScriptedExecutor::default(), |executor, tx| {
        executor.with_result(result(&app_logic_call(tx, 0), Gas::new(1, 1), &[(9, 90)]))
    });
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), executor);

    let (processed, failed) = processor
        .process(txs.clone(), 2, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    check!(processed.len() == 2);
    check!(failed.is_empty());
    check!(processor.executor().calls().len() == 2);
    let db = processor.state_db();
    check!(db.commits == 2);
    check!(db.committed(app_logic_call(&txs[1], 0).contract_address, 9) == fr(90));
    check!(db.committed(app_logic_call(&txs[2], 0).contract_address, 9) == Fr::zero());
    check!(prover.txs.lock().len() == 2);
}

#[tokio::test]
async fn teardown_revert_keeps_app_logic_writes() {
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let tx = tx(
        &mut rng,
        MockTxOptions {
            number_of_revertible_public_call_requests: 1,
            has_public_teardown_call_request: true,
            ..Default::default()
        },
    );
    let app_logic = app_logic_call(&tx, 0);
    let teardown = tx.public_teardown_function_call().clone();
    let executor = ScriptedExecutor::default()
        .with_result(result(&app_logic, Gas::new(2, 2), &[(1, 11)]))
        .with_result(reverted(
            result(&teardown, Gas::new(3, 3), &[(2, 22)]),
            "refund failed",
        ));
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), executor);

    let (processed, failed) = processor
        .process([tx], 1, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    check!(failed.is_empty());
    let_assert!([processed] = processed.as_slice());
    check!(processed.revert_code() == RevertCode::TeardownReverted);
    check!(processed.data.end.public_data_update_requests.len() == 1);
    check!(processed.gas_used[&PublicKernelType::Teardown] == Gas::new(3, 3));

    let db = processor.state_db();
    check!(db.committed(app_logic.contract_address, 1) == fr(11));
    check!(db.committed(teardown.contract_address, 2) == Fr::zero());
    check!(db.checkpoints == 2);
    check!(db.rollbacks_to_checkpoint == 1);
}

#[tokio::test]
async fn both_phases_reverting_keeps_the_first_reason() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let tx = tx(
        &mut rng,
        MockTxOptions {
            number_of_revertible_public_call_requests: 2,
            has_public_teardown_call_request: true,
            ..Default::default()
        },
    );
    let first = app_logic_call(&tx, 1);
    let teardown = tx.public_teardown_function_call().clone();
    let executor = ScriptedExecutor::default()
        .with_result(reverted(result(&first, Gas::new(1, 1), &[]), "app logic failed"))
        .with_result(reverted(result(&teardown, Gas::new(1, 1), &[]), "teardown failed"));
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), executor);

    let (processed, _) = processor
        .process([tx], 1, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    let_assert!([processed] = processed.as_slice());
    check!(processed.revert_code() == RevertCode::BothReverted);
    let_assert!(Some(reason) = &processed.revert_reason);
    check!(reason.message == "app logic failed");
    // The second app-logic call never runs once the phase reverted.
    let simulated: Vec<_> = processor.executor().calls().into_iter().map(|c| c.request).collect();
    check!(simulated == vec![first, teardown]);
}

#[tokio::test]
async fn simulator_failure_rolls_back_the_tx() {
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    let tx = tx(
        &mut rng,
        MockTxOptions {
            number_of_non_revertible_public_call_requests: 1,
            number_of_revertible_public_call_requests: 1,
            ..Default::default()
        },
    );
    let setup = setup_call(&tx);
    let app_logic = app_logic_call(&tx, 0);
    let executor = ScriptedExecutor::default()
        .with_result(result(&setup, Gas::new(1, 1), &[(1, 10)]))
        .crashing_on(&app_logic);
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), executor);

    let (processed, failed) = processor
        .process([tx], 1, &prover, &AcceptAllTxValidator)
        .await
        .unwrap();

    check!(processed.is_empty());
    let_assert!([failed] = failed.as_slice());
    check!(format!("{:#}", failed.error).contains("simulator crashed"));
    let db = processor.state_db();
    check!(db.committed(setup.contract_address, 1) == Fr::zero());
    check!(db.rollbacks_to_commit == 1);
    check!(db.commits == 0);
}

#[tokio::test]
async fn validator_rejection_discards_the_tx() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let tx = tx(
        &mut rng,
        MockTxOptions {
            number_of_revertible_public_call_requests: 1,
            ..Default::default()
        },
    );
    let app_logic = app_logic_call(&tx, 0);
    let executor =
        ScriptedExecutor::default().with_result(result(&app_logic, Gas::new(1, 1), &[(3, 30)]));
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), executor);

    let (processed, failed) = processor
        .process([tx.clone()], 1, &prover, &RejectingValidator)
        .await
        .unwrap();

    check!(processed.is_empty());
    let_assert!([failed] = failed.as_slice());
    let_assert!(Some(ValidationError::Rejected(hash)) = failed.error.downcast_ref::<ValidationError>());
    check!(*hash == tx.tx_hash().unwrap());
    let db = processor.state_db();
    check!(db.committed(app_logic.contract_address, 3) == Fr::zero());
    check!(db.rollbacks_to_commit == 1);
    check!(db.commits == 0);
    check!(prover.txs.lock().is_empty());
}

#[tokio::test]
async fn zero_limit_is_refused() {
    let prover = RecordingBlockProver::default();
    let mut processor = processor(RecordingStateDb::default(), ScriptedExecutor::default());
    let txs: Vec<Tx> = Vec::new();
    check!(processor
        .process(txs, 0, &prover, &AcceptAllTxValidator)
        .await
        .is_err());
}
