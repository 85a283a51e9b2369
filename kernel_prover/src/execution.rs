//! Results of executing the private functions of a transaction.
//!
//! A transaction's private execution forms a tree: the entrypoint and the
//! calls it made, recursively. The tree is stored as an arena of
//! [`ExecutionNode`]s addressed by [`ExecutionId`], and walked with an
//! explicit stack so that deep call chains never recurse.

use std::collections::BTreeMap;

use anyhow::bail;
use circuit_types::{
    FunctionL2Logs, L2Log, PrivateCallStackItem, PublicCallRequest, TxL2Logs, WitnessMap,
};
use l2_common::{ContractAddress, Fr, IsEmpty};
use serde::{Deserialize, Serialize};

/// Handle of a node in an [`ExecutionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExecutionId(usize);

/// A note created by a private function, before it is hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteAndSlot {
    pub contract_address: ContractAddress,
    pub storage_slot: Fr,
    pub note_type_id: Fr,
    pub note: Vec<Fr>,
}

/// A log together with the side-effect counter it was emitted at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedLog {
    pub log: L2Log,
    pub counter: u32,
}

impl CountedLog {
    pub fn new(log: L2Log, counter: u32) -> Self {
        Self { log, counter }
    }
}

/// One private function invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionNode {
    /// Bytecode of the function's circuit.
    pub acir: Vec<u8>,
    /// Witness solved while executing the function.
    pub partial_witness: WitnessMap,
    pub call_stack_item: PrivateCallStackItem,
    /// Leaf index of every settled note hash this call read, keyed by the
    /// note hash.
    pub note_hash_leaf_index_map: BTreeMap<Fr, u64>,
    pub new_notes: Vec<NoteAndSlot>,
    /// Counter of the nullifier consuming each transient note, keyed by the
    /// note hash counter.
    pub note_hash_nullifier_counter_map: BTreeMap<u32, u32>,
    pub return_values: Vec<Fr>,
    pub enqueued_public_function_calls: Vec<PublicCallRequest>,
    pub public_teardown_function_call: PublicCallRequest,
    pub note_encrypted_logs: Vec<CountedLog>,
    pub encrypted_logs: Vec<CountedLog>,
    pub unencrypted_logs: Vec<CountedLog>,
    nested: Vec<ExecutionId>,
}

impl ExecutionNode {
    pub fn new(acir: Vec<u8>, partial_witness: WitnessMap, call_stack_item: PrivateCallStackItem) -> Self {
        Self {
            acir,
            partial_witness,
            call_stack_item,
            ..Default::default()
        }
    }

    pub fn contract_address(&self) -> ContractAddress {
        self.call_stack_item.contract_address
    }

    /// Nested calls, in the order they were made.
    pub fn nested(&self) -> &[ExecutionId] {
        &self.nested
    }
}

/// Arena holding the private execution of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTree {
    nodes: Vec<ExecutionNode>,
}

impl ExecutionTree {
    /// A tree made of the entrypoint call only.
    pub fn new(root: ExecutionNode) -> Self {
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> ExecutionId {
        ExecutionId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records `child` as the next nested call of `parent`.
    ///
    /// The parent's public inputs get the matching private call request, so
    /// the kernel can check the child against it when folding.
    pub fn add_child(
        &mut self,
        parent: ExecutionId,
        child: ExecutionNode,
    ) -> anyhow::Result<ExecutionId> {
        if parent.0 >= self.nodes.len() {
            bail!("unknown parent execution {}", parent.0);
        }
        let request = child.call_stack_item.to_private_call_request();
        let id = ExecutionId(self.nodes.len());
        self.nodes.push(child);
        let parent = &mut self.nodes[parent.0];
        parent.call_stack_item.public_inputs.private_call_requests.push(request);
        parent.nested.push(id);
        Ok(id)
    }

    pub fn node(&self, id: ExecutionId) -> &ExecutionNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: ExecutionId) -> &mut ExecutionNode {
        &mut self.nodes[id.0]
    }

    /// Nodes in the order the kernel folds them: depth first, nested calls
    /// left to right.
    pub fn iter(&self) -> PreOrder<'_> {
        self.iter_from(&[self.root()])
    }

    /// Pre-order walk of every subtree rooted in `stack`, where the last
    /// entry of `stack` is visited first.
    pub fn iter_from(&self, stack: &[ExecutionId]) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: stack.to_vec(),
        }
    }

    /// Leaf indexes of every settled note hash read in the transaction.
    pub fn collect_note_hash_leaf_index_map(&self) -> BTreeMap<Fr, u64> {
        self.iter()
            .flat_map(|(_, node)| node.note_hash_leaf_index_map.iter().map(|(k, v)| (*k, *v)))
            .collect()
    }

    /// Nullifier counter of every note created and consumed in the
    /// transaction, keyed by the note hash counter.
    pub fn collect_nullified_note_hash_counters(&self) -> BTreeMap<u32, u32> {
        self.iter()
            .flat_map(|(_, node)| {
                node.note_hash_nullifier_counter_map
                    .iter()
                    .map(|(k, v)| (*k, *v))
            })
            .collect()
    }

    /// Every enqueued public call, in the order they must execute.
    pub fn collect_enqueued_public_function_calls(&self) -> Vec<PublicCallRequest> {
        let mut calls: Vec<_> = self
            .iter()
            .flat_map(|(_, node)| node.enqueued_public_function_calls.iter().cloned())
            .collect();
        calls.sort_by_key(|c| c.side_effect_counter);
        calls
    }

    /// The teardown call of the transaction, or an empty request. At most one
    /// call may set it.
    pub fn collect_public_teardown_function_call(&self) -> anyhow::Result<PublicCallRequest> {
        let mut teardown = self
            .iter()
            .map(|(_, node)| &node.public_teardown_function_call)
            .filter(|call| !call.is_empty());
        match (teardown.next(), teardown.next()) {
            (None, _) => Ok(PublicCallRequest::empty()),
            (Some(call), None) => Ok(call.clone()),
            (Some(_), Some(_)) => bail!("public teardown function call can only be set once"),
        }
    }

    pub fn collect_sorted_note_encrypted_logs(&self) -> TxL2Logs {
        self.collect_sorted_logs(|node| &node.note_encrypted_logs)
    }

    pub fn collect_sorted_encrypted_logs(&self) -> TxL2Logs {
        self.collect_sorted_logs(|node| &node.encrypted_logs)
    }

    pub fn collect_sorted_unencrypted_logs(&self) -> TxL2Logs {
        self.collect_sorted_logs(|node| &node.unencrypted_logs)
    }

    fn collect_sorted_logs(&self, logs: impl Fn(&ExecutionNode) -> &Vec<CountedLog>) -> TxL2Logs {
        let mut all: Vec<&CountedLog> = self.iter().flat_map(|(_, node)| logs(node)).collect();
        if all.is_empty() {
            return TxL2Logs::empty();
        }
        all.sort_by_key(|l| l.counter);
        TxL2Logs::new(vec![FunctionL2Logs::new(
            all.into_iter().map(|l| l.log.clone()).collect(),
        )])
    }
}

/// Depth-first walk over an [`ExecutionTree`].
#[derive(Debug)]
pub struct PreOrder<'a> {
    tree: &'a ExecutionTree,
    stack: Vec<ExecutionId>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (ExecutionId, &'a ExecutionNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        self.stack.extend(node.nested.iter().rev());
        Some((id, node))
    }
}
