use std::fmt;

use l2_common::{ContractAddress, Fr, FunctionSelector};
use serde::{Deserialize, Serialize};

/// A frame of the call stack that led to a simulation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailingFunction {
    pub contract_address: ContractAddress,
    pub function_selector: Option<FunctionSelector>,
    pub function_name: Option<String>,
}

impl fmt::Display for FailingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.function_name, self.function_selector) {
            (Some(name), _) => write!(f, "{}:{name}", self.contract_address),
            (None, Some(selector)) => write!(f, "{}:{selector}", self.contract_address),
            (None, None) => write!(f, "{}", self.contract_address),
        }
    }
}

/// A revert raised while simulating a function, with the call stack that
/// reached it, innermost frame last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct SimulationError {
    pub message: String,
    pub function_errors: Vec<FailingFunction>,
    pub revert_data: Vec<Fr>,
}

impl SimulationError {
    pub fn new(message: impl Into<String>, function_errors: Vec<FailingFunction>) -> Self {
        Self {
            message: message.into(),
            function_errors,
            revert_data: Vec::new(),
        }
    }

    /// The innermost failing function, if known.
    pub fn origin(&self) -> Option<&FailingFunction> {
        self.function_errors.last()
    }

    /// Renders the failing call stack, outermost frame first.
    pub fn call_stack(&self) -> String {
        self.function_errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_stack() {
        let err = SimulationError::new(
            "assertion failed",
            vec![
                FailingFunction {
                    contract_address: ContractAddress::from(1),
                    function_selector: None,
                    function_name: Some("entrypoint".into()),
                },
                FailingFunction {
                    contract_address: ContractAddress::from(2),
                    function_selector: Some(FunctionSelector(0x1234)),
                    function_name: None,
                },
            ],
        );
        assert_eq!(err.to_string(), "assertion failed");
        assert_eq!(err.call_stack(), "0x1:entrypoint -> 0x2:0x00001234");
        assert_eq!(err.origin().map(|f| f.contract_address), Some(ContractAddress::from(2)));
    }
}
