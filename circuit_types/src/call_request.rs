use l2_common::hash::{hash_fields, GeneratorIndex};
use l2_common::{ContractAddress, Fr, FunctionSelector, IsEmpty, Ordered};
use serde::{Deserialize, Serialize};

/// Identity of the current call frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallContext {
    pub msg_sender: ContractAddress,
    pub storage_contract_address: ContractAddress,
    pub function_selector: FunctionSelector,
    pub is_delegate_call: bool,
    pub is_static_call: bool,
}

impl CallContext {
    fn to_fields(self) -> [Fr; 5] {
        [
            self.msg_sender.to_field(),
            self.storage_contract_address.to_field(),
            self.function_selector.to_field(),
            Fr::from(self.is_delegate_call as u64),
            Fr::from(self.is_static_call as u64),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionData {
    pub selector: FunctionSelector,
    pub is_private: bool,
}

/// A call as the kernel tracks it on its call stacks: the hash of the callee's
/// stack item and the counter range it executed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallRequest {
    pub hash: Fr,
    pub caller_contract_address: ContractAddress,
    pub start_side_effect_counter: u32,
    pub end_side_effect_counter: u32,
}

impl CallRequest {
    pub fn empty() -> Self {
        Self::default()
    }
}

impl IsEmpty for CallRequest {
    fn is_empty(&self) -> bool {
        self.hash.is_zero()
    }
}

impl Ordered for CallRequest {
    fn counter(&self) -> u32 {
        self.start_side_effect_counter
    }
}

/// Hash of a list of function arguments.
pub fn compute_args_hash(args: &[Fr]) -> Fr {
    if args.is_empty() {
        return Fr::zero();
    }
    hash_fields(args, GeneratorIndex::FunctionArgs)
}

/// Everything needed to execute an enqueued public call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicCallRequest {
    pub contract_address: ContractAddress,
    pub call_context: CallContext,
    pub args: Vec<Fr>,
    /// Counter at which the call was enqueued.
    pub side_effect_counter: u32,
}

impl PublicCallRequest {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn function_selector(&self) -> FunctionSelector {
        self.call_context.function_selector
    }

    pub fn args_hash(&self) -> Fr {
        compute_args_hash(&self.args)
    }

    /// Hash committed to by the enqueuing private function.
    pub fn hash(&self) -> Fr {
        let mut fields = vec![self.contract_address.to_field()];
        fields.extend(self.call_context.to_fields());
        fields.push(self.args_hash());
        fields.push(Fr::from(self.side_effect_counter));
        hash_fields(&fields, GeneratorIndex::PublicCallStackItem)
    }

    pub fn to_call_request(&self) -> CallRequest {
        CallRequest {
            hash: self.hash(),
            caller_contract_address: self.call_context.msg_sender,
            start_side_effect_counter: self.side_effect_counter,
            end_side_effect_counter: 0,
        }
    }
}

impl IsEmpty for PublicCallRequest {
    fn is_empty(&self) -> bool {
        self.contract_address.is_zero() && self.args.is_empty() && self.side_effect_counter == 0
    }
}

/// A nested private call issued by a private function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrivateCallRequest {
    pub hash: Fr,
    pub start_side_effect_counter: u32,
    pub end_side_effect_counter: u32,
}

impl IsEmpty for PrivateCallRequest {
    fn is_empty(&self) -> bool {
        self.hash.is_zero()
    }
}

impl Ordered for PrivateCallRequest {
    fn counter(&self) -> u32 {
        self.start_side_effect_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_request_hash_commits_to_args_and_counter() {
        let request = PublicCallRequest {
            contract_address: ContractAddress::from(3),
            call_context: CallContext {
                msg_sender: ContractAddress::from(1),
                storage_contract_address: ContractAddress::from(3),
                function_selector: FunctionSelector(0xdead),
                ..Default::default()
            },
            args: vec![Fr::from(1u64)],
            side_effect_counter: 4,
        };
        let mut other = request.clone();
        other.side_effect_counter = 5;
        assert_ne!(request.hash(), other.hash());
        other = request.clone();
        other.args.push(Fr::from(2u64));
        assert_ne!(request.hash(), other.hash());

        let call = request.to_call_request();
        assert_eq!(call.hash, request.hash());
        assert_eq!(call.caller_contract_address, ContractAddress::from(1));
        assert!(!call.is_empty());
        assert!(PublicCallRequest::empty().is_empty());
    }
}
