//! Lookups the kernel prover needs from the node and the key store.

use std::collections::BTreeMap;
use std::future::Future;

use anyhow::Context as _;
use circuit_types::{
    MembershipWitness, NullifierLeafPreimage, NullifierMembershipWitness, VerificationKey,
};
use l2_common::constants::{
    FUNCTION_TREE_HEIGHT, NOTE_HASH_TREE_HEIGHT, NULLIFIER_TREE_HEIGHT, VK_TREE_HEIGHT,
};
use l2_common::hash::derive_public_key;
use l2_common::{ContractAddress, Fr, FunctionSelector, Point};
use serde::{Deserialize, Serialize};

/// What a contract address commits to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddressPreimage {
    pub contract_class_id: Fr,
    pub public_keys_hash: Fr,
    pub salted_initialization_hash: Fr,
}

/// What a contract class id commits to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractClassIdPreimage {
    pub artifact_hash: Fr,
    pub private_functions_root: Fr,
    pub public_bytecode_commitment: Fr,
}

/// Source of the membership witnesses and keys the private kernels consume.
///
/// Every lookup is fatal to the proving session when it fails.
pub trait ProvingDataOracle {
    fn get_contract_address_preimage(
        &self,
        address: ContractAddress,
    ) -> impl Future<Output = anyhow::Result<ContractAddressPreimage>> + Send;

    fn get_contract_class_id_preimage(
        &self,
        contract_class_id: Fr,
    ) -> impl Future<Output = anyhow::Result<ContractClassIdPreimage>> + Send;

    /// Membership of a private function in its contract class.
    fn get_function_membership_witness(
        &self,
        address: ContractAddress,
        selector: FunctionSelector,
    ) -> impl Future<Output = anyhow::Result<MembershipWitness>> + Send;

    /// Membership of a kernel verification key in the protocol's vk tree.
    fn get_vk_membership_witness(
        &self,
        vk: &VerificationKey,
    ) -> impl Future<Output = anyhow::Result<MembershipWitness>> + Send;

    fn get_note_hash_membership_witness(
        &self,
        leaf_index: u64,
    ) -> impl Future<Output = anyhow::Result<Option<MembershipWitness>>> + Send;

    fn get_nullifier_membership_witness(
        &self,
        siloed_nullifier: Fr,
    ) -> impl Future<Output = anyhow::Result<Option<NullifierMembershipWitness>>> + Send;

    /// Master secret key behind the master public key `pk_m`.
    fn get_master_secret_key(&self, pk_m: Point) -> impl Future<Output = anyhow::Result<Fr>> + Send;

    fn get_debug_function_name(
        &self,
        address: ContractAddress,
        selector: FunctionSelector,
    ) -> impl Future<Output = anyhow::Result<Option<String>>> + Send;
}

#[derive(Debug, Clone, Default)]
struct ContractEntry {
    address_preimage: ContractAddressPreimage,
    functions: BTreeMap<FunctionSelector, (String, MembershipWitness)>,
}

/// A [`ProvingDataOracle`] over data registered up front.
///
/// Lookups of unregistered data fail, except for verification keys, which
/// all sit at leaf zero of an empty vk tree.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvingDataOracle {
    contracts: BTreeMap<ContractAddress, ContractEntry>,
    classes: BTreeMap<Fr, ContractClassIdPreimage>,
    note_hash_leaves: BTreeMap<u64, Fr>,
    nullifiers: BTreeMap<Fr, u64>,
    secret_keys: Vec<(Point, Fr)>,
}

impl InMemoryProvingDataOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_contract(
        &mut self,
        address: ContractAddress,
        address_preimage: ContractAddressPreimage,
        class_preimage: ContractClassIdPreimage,
    ) -> &mut Self {
        self.classes
            .insert(address_preimage.contract_class_id, class_preimage);
        self.contracts.entry(address).or_default().address_preimage = address_preimage;
        self
    }

    /// Registers a private function of a registered contract at `leaf_index`
    /// of its function tree.
    pub fn add_function(
        &mut self,
        address: ContractAddress,
        selector: FunctionSelector,
        name: impl Into<String>,
        leaf_index: u64,
    ) -> anyhow::Result<&mut Self> {
        let contract = self
            .contracts
            .get_mut(&address)
            .with_context(|| format!("contract {address} is not registered"))?;
        contract.functions.insert(
            selector,
            (
                name.into(),
                MembershipWitness::new(leaf_index, vec![Fr::zero(); FUNCTION_TREE_HEIGHT], FUNCTION_TREE_HEIGHT)?,
            ),
        );
        Ok(self)
    }

    pub fn add_settled_note_hash(&mut self, leaf_index: u64, note_hash: Fr) -> &mut Self {
        self.note_hash_leaves.insert(leaf_index, note_hash);
        self
    }

    pub fn add_settled_nullifier(&mut self, siloed_nullifier: Fr) -> &mut Self {
        let index = self.nullifiers.len() as u64;
        self.nullifiers.entry(siloed_nullifier).or_insert(index);
        self
    }

    /// Registers a master secret key; its public key is derived.
    pub fn add_master_secret_key(&mut self, sk_m: Fr) -> &mut Self {
        self.secret_keys.push((derive_public_key(sk_m), sk_m));
        self
    }

    fn contract(&self, address: ContractAddress) -> anyhow::Result<&ContractEntry> {
        self.contracts
            .get(&address)
            .with_context(|| format!("unknown contract {address}"))
    }
}

impl ProvingDataOracle for InMemoryProvingDataOracle {
    async fn get_contract_address_preimage(
        &self,
        address: ContractAddress,
    ) -> anyhow::Result<ContractAddressPreimage> {
        Ok(self.contract(address)?.address_preimage)
    }

    async fn get_contract_class_id_preimage(
        &self,
        contract_class_id: Fr,
    ) -> anyhow::Result<ContractClassIdPreimage> {
        self.classes
            .get(&contract_class_id)
            .copied()
            .with_context(|| format!("unknown contract class {contract_class_id:#x}"))
    }

    async fn get_function_membership_witness(
        &self,
        address: ContractAddress,
        selector: FunctionSelector,
    ) -> anyhow::Result<MembershipWitness> {
        self.contract(address)?
            .functions
            .get(&selector)
            .map(|(_, witness)| witness.clone())
            .with_context(|| format!("unknown function {address}:{selector}"))
    }

    async fn get_vk_membership_witness(
        &self,
        _vk: &VerificationKey,
    ) -> anyhow::Result<MembershipWitness> {
        Ok(MembershipWitness::empty(VK_TREE_HEIGHT))
    }

    async fn get_note_hash_membership_witness(
        &self,
        leaf_index: u64,
    ) -> anyhow::Result<Option<MembershipWitness>> {
        Ok(self.note_hash_leaves.get(&leaf_index).map(|_| MembershipWitness {
            leaf_index,
            sibling_path: vec![Fr::zero(); NOTE_HASH_TREE_HEIGHT],
        }))
    }

    async fn get_nullifier_membership_witness(
        &self,
        siloed_nullifier: Fr,
    ) -> anyhow::Result<Option<NullifierMembershipWitness>> {
        Ok(self
            .nullifiers
            .get(&siloed_nullifier)
            .map(|&leaf_index| NullifierMembershipWitness {
                leaf_preimage: NullifierLeafPreimage {
                    nullifier: siloed_nullifier,
                    next_nullifier: Fr::zero(),
                    next_index: 0,
                },
                witness: MembershipWitness {
                    leaf_index,
                    sibling_path: vec![Fr::zero(); NULLIFIER_TREE_HEIGHT],
                },
            }))
    }

    async fn get_master_secret_key(&self, pk_m: Point) -> anyhow::Result<Fr> {
        self.secret_keys
            .iter()
            .find(|(pk, _)| *pk == pk_m)
            .map(|(_, sk)| *sk)
            .with_context(|| format!("no secret key for master public key {:#x}", pk_m.x))
    }

    async fn get_debug_function_name(
        &self,
        address: ContractAddress,
        selector: FunctionSelector,
    ) -> anyhow::Result<Option<String>> {
        Ok(self
            .contracts
            .get(&address)
            .and_then(|c| c.functions.get(&selector))
            .map(|(name, _)| name.clone()))
    }
}
