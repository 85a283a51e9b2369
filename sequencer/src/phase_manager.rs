//! Runs the public phases of a transaction: setup, app logic and teardown,
//! each followed by its public kernel, and finally the public kernel tail.

use std::collections::{BTreeMap, HashMap};

use anyhow::Context as _;
use circuit_types::{
    GlobalVariables, KernelCircuitPublicInputs, Nullifier, Proof, PublicCallData,
    PublicCallRequest, PublicKernelCircuitPrivateInputs, PublicKernelCircuitPublicInputs,
    PublicKernelData, PublicKernelRequest, PublicKernelTailCircuitPrivateInputs,
    PublicKernelType, SimulationError, Tx, VerificationKey,
};
use l2_common::constants::NESTED_RECURSIVE_PROOF_LENGTH;
use l2_common::{add_fees, CollectionError, Fr, Gas};
use tracing::{debug, info};

use crate::db::PublicStateDb;
use crate::executor::PublicExecutor;
use crate::public_kernel::PublicKernelCircuitSimulator;

#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    #[error("setup phase reverted")]
    SetupReverted(#[source] SimulationError),
    #[error("{phase} kernel expected call request {expected:#x} but {found:#x} was executed")]
    CallRequestMismatch {
        phase: PublicKernelType,
        expected: Fr,
        found: Fr,
    },
    #[error("{phase} kernel has no call request left")]
    EmptyCallStack { phase: PublicKernelType },
    #[error("{phase} kernel declares call request {hash:#x} that the transaction does not enqueue")]
    MissingEnqueuedCall { phase: PublicKernelType, hash: Fr },
    #[error("{0} kernel does not execute public calls")]
    UnexpectedPhase(PublicKernelType),
    #[error("public kernel tail reached with calls left to execute")]
    UnprocessedCalls,
    #[error("final public kernel was not executed")]
    FinalKernelNotExecuted,
    #[error(transparent)]
    Collection(#[from] CollectionError),
}

/// First phase a transaction has to go through.
pub fn phase_from_tx(inputs: &PublicKernelCircuitPublicInputs) -> PublicKernelType {
    if inputs.needs_setup() {
        PublicKernelType::Setup
    } else if inputs.needs_app_logic() {
        PublicKernelType::AppLogic
    } else if inputs.needs_teardown() {
        PublicKernelType::Teardown
    } else {
        PublicKernelType::Tail
    }
}

/// Phase after `current`, skipping phases without calls. `None` after the tail.
pub fn next_phase(
    current: PublicKernelType,
    inputs: &PublicKernelCircuitPublicInputs,
) -> Option<PublicKernelType> {
    match current {
        PublicKernelType::Setup if inputs.needs_app_logic() => Some(PublicKernelType::AppLogic),
        PublicKernelType::Setup | PublicKernelType::AppLogic if inputs.needs_teardown() => {
            Some(PublicKernelType::Teardown)
        }
        PublicKernelType::Setup | PublicKernelType::AppLogic | PublicKernelType::Teardown => {
            Some(PublicKernelType::Tail)
        }
        PublicKernelType::NonPublic | PublicKernelType::Tail => None,
    }
}

/// Outcome of the public part of a transaction.
#[derive(Debug)]
pub struct PublicExecutionOutcome {
    pub kernel_output: KernelCircuitPublicInputs,
    pub kernel_requests: Vec<PublicKernelRequest>,
    /// First revert that rolled back a phase.
    pub revert_reason: Option<SimulationError>,
    pub gas_used: BTreeMap<PublicKernelType, Gas>,
}

struct PhaseOutcome {
    output: PublicKernelCircuitPublicInputs,
    gas_used: Gas,
    revert_reason: Option<SimulationError>,
}

/// Drives one transaction through its public phases against a state view.
///
/// Setup writes are never checkpointed: a setup revert fails the whole
/// transaction and the caller rolls back to the last commit. App logic and
/// teardown each run after a checkpoint, so a revert in either only undoes
/// that phase.
#[derive(Debug)]
pub struct PhaseManager<'a, S, E, K> {
    state_db: &'a mut S,
    executor: &'a E,
    kernel: &'a K,
    global_variables: GlobalVariables,
}

impl<'a, S, E, K> PhaseManager<'a, S, E, K>
where
    S: PublicStateDb,
    E: PublicExecutor,
    K: PublicKernelCircuitSimulator,
{
    pub fn new(
        state_db: &'a mut S,
        executor: &'a E,
        kernel: &'a K,
        global_variables: GlobalVariables,
    ) -> Self {
        Self {
            state_db,
            executor,
            kernel,
            global_variables,
        }
    }

    /// Runs every phase of `tx`, adding the logs of its public calls.
    pub async fn run(&mut self, tx: &mut Tx) -> anyhow::Result<PublicExecutionOutcome> {
        let mut output = tx.data().to_public_kernel_circuit_public_inputs()?;
        output.constants.global_variables = self.global_variables;

        let mut kernel_requests = Vec::new();
        let mut revert_reason = None;
        let mut gas_used = BTreeMap::new();
        let mut final_output = None;

        let mut phase = Some(phase_from_tx(&output));
        while let Some(current) = phase {
            if current == PublicKernelType::Tail {
                let inputs = PublicKernelTailCircuitPrivateInputs {
                    previous_kernel: kernel_data(output.clone()),
                };
                final_output = Some(
                    self.kernel
                        .public_kernel_circuit_tail(&inputs)
                        .await
                        .context("public kernel tail failed")?,
                );
                kernel_requests.push(inputs.into());
            } else {
                let outcome = self
                    .run_phase(current, tx, output, &mut kernel_requests)
                    .await?;
                output = outcome.output;
                gas_used.insert(current, outcome.gas_used);
                if revert_reason.is_none() {
                    revert_reason = outcome.revert_reason;
                }
            }
            phase = next_phase(current, &output);
        }

        Ok(PublicExecutionOutcome {
            kernel_output: final_output.ok_or(PhaseError::FinalKernelNotExecuted)?,
            kernel_requests,
            revert_reason,
            gas_used,
        })
    }

    async fn run_phase(
        &mut self,
        phase: PublicKernelType,
        tx: &mut Tx,
        mut output: PublicKernelCircuitPublicInputs,
        kernel_requests: &mut Vec<PublicKernelRequest>,
    ) -> anyhow::Result<PhaseOutcome> {
        let calls = enqueued_calls_for_phase(tx, phase, &output)?;
        debug!(%phase, calls = calls.len(), "running public phase");
        if phase != PublicKernelType::Setup {
            self.state_db.checkpoint().await?;
        }

        let mut gas_used = Gas::empty();
        let mut revert_reason = None;
        for call in calls {
            let tx_context = output.constants.tx_context;
            let gas_so_far =
                output.end_non_revertible_data.gas_used + output.end.gas_used;
            let (available_gas, transaction_fee) = if phase == PublicKernelType::Teardown {
                let fee = add_fees(
                    gas_so_far.compute_fee(&self.global_variables.gas_fees)?,
                    tx_context.gas_settings.inclusion_fee,
                )?;
                (tx_context.gas_settings.get_teardown_limits(), fee)
            } else {
                (tx_context.gas_settings.get_limits() - gas_so_far, Fr::zero())
            };
            let pending_nullifiers: Vec<Nullifier> = output
                .end_non_revertible_data
                .nullifiers
                .iter()
                .chain(output.end.nullifiers.iter())
                .copied()
                .collect();

            let result = self
                .executor
                .simulate(
                    &call,
                    &self.global_variables,
                    available_gas,
                    &tx_context,
                    &pending_nullifiers,
                    transaction_fee,
                    call.side_effect_counter,
                )
                .await
                .with_context(|| {
                    format!("failed to simulate {phase} call to {}", call.contract_address)
                })?;
            gas_used += result.gas_used();

            for execution in result.iter() {
                for write in &execution.contract_storage_update_requests {
                    let contract = if write.contract_address.is_zero() {
                        execution.storage_contract_address()
                    } else {
                        write.contract_address
                    };
                    self.state_db
                        .storage_write(contract, write.storage_slot, write.new_value)
                        .await?;
                }
            }

            if let Some(reason) = result.find_revert_reason().cloned() {
                if phase == PublicKernelType::Setup {
                    return Err(PhaseError::SetupReverted(reason).into());
                }
                info!(%phase, contract = %call.contract_address, %reason, "public call reverted");
                self.state_db.rollback_to_checkpoint().await?;
                let public_call = result.to_public_call_data(&self.global_variables, true, true);
                output = self
                    .run_kernel(phase, output, public_call, kernel_requests)
                    .await?;
                if phase == PublicKernelType::AppLogic {
                    tx.filter_reverted_logs(&output);
                }
                revert_reason = Some(reason);
                break;
            }

            for (i, execution) in result.iter().enumerate() {
                let public_call = execution.to_public_call_data(&self.global_variables, i == 0, false);
                output = self
                    .run_kernel(phase, output, public_call, kernel_requests)
                    .await?;
            }
            tx.add_unencrypted_logs(result.all_unencrypted_logs());
        }

        Ok(PhaseOutcome {
            output,
            gas_used,
            revert_reason,
        })
    }

    async fn run_kernel(
        &self,
        phase: PublicKernelType,
        previous: PublicKernelCircuitPublicInputs,
        public_call: PublicCallData,
        kernel_requests: &mut Vec<PublicKernelRequest>,
    ) -> anyhow::Result<PublicKernelCircuitPublicInputs> {
        let inputs = PublicKernelCircuitPrivateInputs {
            previous_kernel: kernel_data(previous),
            public_call,
        };
        let output = match phase {
            PublicKernelType::Setup => self.kernel.public_kernel_circuit_setup(&inputs).await,
            PublicKernelType::AppLogic => {
                self.kernel.public_kernel_circuit_app_logic(&inputs).await
            }
            PublicKernelType::Teardown => {
                self.kernel.public_kernel_circuit_teardown(&inputs).await
            }
            PublicKernelType::NonPublic | PublicKernelType::Tail => {
                return Err(PhaseError::UnexpectedPhase(phase).into())
            }
        }
        .with_context(|| format!("public kernel {phase} failed"))?;
        kernel_requests.push(PublicKernelRequest::NonTail {
            kernel_type: phase,
            inputs,
        });
        Ok(output)
    }
}

fn kernel_data(public_inputs: PublicKernelCircuitPublicInputs) -> PublicKernelData {
    PublicKernelData {
        public_inputs,
        proof: Proof::empty(NESTED_RECURSIVE_PROOF_LENGTH),
        vk: VerificationKey::empty(),
    }
}

/// Enqueued calls of `phase`, in the order the kernel expects them.
fn enqueued_calls_for_phase(
    tx: &Tx,
    phase: PublicKernelType,
    inputs: &PublicKernelCircuitPublicInputs,
) -> Result<Vec<PublicCallRequest>, PhaseError> {
    let stack = match phase {
        PublicKernelType::Setup => &inputs.end_non_revertible_data.public_call_stack,
        PublicKernelType::AppLogic => &inputs.end.public_call_stack,
        PublicKernelType::Teardown => return Ok(vec![tx.public_teardown_function_call().clone()]),
        PublicKernelType::NonPublic | PublicKernelType::Tail => {
            return Err(PhaseError::UnexpectedPhase(phase))
        }
    };
    let by_hash: HashMap<Fr, &PublicCallRequest> = tx
        .enqueued_public_function_calls()
        .iter()
        .map(|call| (call.hash(), call))
        .collect();
    stack
        .iter()
        .map(|request| {
            by_hash
                .get(&request.hash)
                .map(|call| (*call).clone())
                .ok_or(PhaseError::MissingEnqueuedCall {
                    phase,
                    hash: request.hash,
                })
        })
        .collect()
}
