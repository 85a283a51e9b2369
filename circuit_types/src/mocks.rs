//! Deterministic transaction fixtures.
//!
//! Every builder takes the RNG explicitly so callers control the seed.

use l2_common::{ContractAddress, Fr, FunctionSelector, GasSettings};
use rand::Rng;

use crate::call_request::{CallContext, CallRequest, PublicCallRequest};
use crate::kernel::{CombinedAccumulatedData, CombinedConstantData, TxContext};
use crate::logs::{FunctionL2Logs, TxL2Logs};
use crate::private_kernel::{
    PartialPrivateTailPublicInputsForPublic, PartialPrivateTailPublicInputsForRollup,
    PrivateKernelTailCircuitPublicInputs,
};
use crate::proof::ClientIvcProof;
use crate::public_kernel::PublicAccumulatedData;
use crate::side_effects::{LogHash, Nullifier};
use crate::tx::Tx;

/// Shape of a mock transaction.
#[derive(Debug, Clone)]
pub struct MockTxOptions {
    pub number_of_non_revertible_public_call_requests: usize,
    pub number_of_revertible_public_call_requests: usize,
    pub has_public_teardown_call_request: bool,
    /// One non-revertible and one revertible unencrypted log.
    pub has_logs: bool,
    pub fee_payer: ContractAddress,
    pub gas_settings: GasSettings,
}

impl Default for MockTxOptions {
    fn default() -> Self {
        Self {
            number_of_non_revertible_public_call_requests: 0,
            number_of_revertible_public_call_requests: 0,
            has_public_teardown_call_request: false,
            has_logs: false,
            fee_payer: ContractAddress::ZERO,
            gas_settings: GasSettings::default(),
        }
    }
}

impl MockTxOptions {
    pub fn has_public_calls(&self) -> bool {
        self.number_of_non_revertible_public_call_requests > 0
            || self.number_of_revertible_public_call_requests > 0
            || self.has_public_teardown_call_request
    }
}

/// A random enqueued public call issued at `side_effect_counter`.
pub fn mock_public_call_request(rng: &mut impl Rng, side_effect_counter: u32) -> PublicCallRequest {
    let contract_address = ContractAddress::from(rng.gen_range(1_000..u64::MAX));
    PublicCallRequest {
        contract_address,
        call_context: CallContext {
            msg_sender: ContractAddress::from(rng.gen_range(1_000..u64::MAX)),
            storage_contract_address: contract_address,
            function_selector: FunctionSelector(rng.gen()),
            is_delegate_call: false,
            is_static_call: false,
        },
        args: vec![Fr::from(rng.gen::<u64>())],
        side_effect_counter,
    }
}

/// Counter at which revertible side effects start in mock transactions.
pub const MOCK_MIN_REVERTIBLE_COUNTER: u32 = 100;

/// Builds a transaction that passed the private kernel tail.
///
/// Setup calls are enqueued at counters from 10, app-logic calls after
/// [`MOCK_MIN_REVERTIBLE_COUNTER`], and the teardown call after both.
pub fn mock_tx(rng: &mut impl Rng, options: MockTxOptions) -> anyhow::Result<Tx> {
    let constants = CombinedConstantData {
        tx_context: TxContext {
            chain_id: Fr::one(),
            version: Fr::one(),
            gas_settings: options.gas_settings,
        },
        ..Default::default()
    };
    let first_nullifier = Nullifier::new(Fr::from(rng.gen::<u64>()) + Fr::one(), 0, Fr::zero());

    let mut unencrypted_logs = TxL2Logs::empty();
    let mut log_hashes = Vec::new();
    if options.has_logs {
        for counter in [2, MOCK_MIN_REVERTIBLE_COUNTER + 2] {
            let logs = FunctionL2Logs::random(rng, 1);
            let log = &logs.logs[0];
            log_hashes.push(LogHash::new(log.hash(), counter, log.data.len() as u64));
            unencrypted_logs.add_function_logs([logs]);
        }
    }

    let mut data = PrivateKernelTailCircuitPublicInputs {
        constants,
        fee_payer: options.fee_payer,
        ..Default::default()
    };
    let mut enqueued = Vec::new();
    let mut teardown = PublicCallRequest::empty();

    if options.has_public_calls() {
        let mut non_revertible = PublicAccumulatedData::default();
        let mut revertible = PublicAccumulatedData::default();
        non_revertible.nullifiers.push(first_nullifier)?;
        if let [nr, r] = log_hashes.as_slice() {
            non_revertible.unencrypted_logs_hashes.push(*nr)?;
            revertible.unencrypted_logs_hashes.push(*r)?;
        }
        for i in 0..options.number_of_non_revertible_public_call_requests {
            let request = mock_public_call_request(rng, 10 + i as u32);
            non_revertible.public_call_stack.push(request.to_call_request())?;
            enqueued.push(request);
        }
        for i in 0..options.number_of_revertible_public_call_requests {
            let request = mock_public_call_request(rng, MOCK_MIN_REVERTIBLE_COUNTER + 10 + i as u32);
            revertible.public_call_stack.push(request.to_call_request())?;
            enqueued.push(request);
        }
        let mut teardown_call_request = CallRequest::empty();
        if options.has_public_teardown_call_request {
            teardown = mock_public_call_request(rng, 2 * MOCK_MIN_REVERTIBLE_COUNTER);
            teardown_call_request = teardown.to_call_request();
            // The private tail charges the teardown allocation up front.
            revertible.gas_used = options.gas_settings.get_teardown_limits();
        }
        data.for_public = Some(PartialPrivateTailPublicInputsForPublic {
            end_non_revertible_data: non_revertible,
            end: revertible,
            public_teardown_call_request: teardown_call_request,
            ..Default::default()
        });
    } else {
        let mut end = CombinedAccumulatedData::default();
        end.nullifiers.push(first_nullifier.value)?;
        for log in &log_hashes {
            end.unencrypted_logs_hashes.push(*log)?;
        }
        data.for_rollup = Some(PartialPrivateTailPublicInputsForRollup { end });
    }

    Ok(Tx::new(
        data,
        ClientIvcProof::empty(),
        TxL2Logs::empty(),
        TxL2Logs::empty(),
        unencrypted_logs,
        enqueued,
        teardown,
    )?)
}
