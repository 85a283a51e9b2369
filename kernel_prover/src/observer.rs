use std::fmt;

use circuit_types::PrivateKernelCircuitPublicInputs;

use crate::inputs::ResetSizeTag;

/// A kernel step whose output can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelStep {
    Init,
    Inner,
    Reset(ResetSizeTag),
}

impl fmt::Display for KernelStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelStep::Init => write!(f, "init"),
            KernelStep::Inner => write!(f, "inner"),
            KernelStep::Reset(tag) => write!(f, "reset ({tag})"),
        }
    }
}

/// Observer API for the kernel prover.
/// Observer is used to collect debugging info about the intermediate kernel
/// outputs of a proving session.
pub trait KernelObserver {
    /// Collect the public inputs produced by a kernel step.
    ///
    /// The public inputs are passed by reference so observers that do not
    /// keep them pay no clone.
    fn collect_step(&mut self, step: KernelStep, public_inputs: &PrivateKernelCircuitPublicInputs);
}

/// One observed kernel step.
#[derive(Debug)]
pub struct KernelObserverElement {
    pub step: KernelStep,
    pub public_inputs: PrivateKernelCircuitPublicInputs,
}

/// Observer keeping the output of every kernel step.
#[derive(Debug)]
pub struct KernelStepsObserver {
    /// Collected data in the observer pass
    pub data: Vec<KernelObserverElement>,
}

impl KernelStepsObserver {
    pub fn new() -> Self {
        KernelStepsObserver { data: Vec::new() }
    }

    /// Steps in the order they ran.
    pub fn steps(&self) -> impl Iterator<Item = KernelStep> + '_ {
        self.data.iter().map(|e| e.step)
    }
}

impl KernelObserver for KernelStepsObserver {
    fn collect_step(&mut self, step: KernelStep, public_inputs: &PrivateKernelCircuitPublicInputs) {
        self.data.push(KernelObserverElement {
            step,
            public_inputs: public_inputs.clone(),
        });
    }
}

impl Default for KernelStepsObserver {
    fn default() -> Self {
        Self::new()
    }
}

/// Dummy observer which does not collect any data.
#[derive(Default, Debug)]
pub struct DummyObserver;

impl DummyObserver {
    pub fn new() -> Self {
        Self
    }
}

impl KernelObserver for DummyObserver {
    fn collect_step(&mut self, _step: KernelStep, _public_inputs: &PrivateKernelCircuitPublicInputs) {}
}
