//! Proof containers passed between kernel steps.
//!
//! The proving backend treats all of these as opaque; the only structure this
//! workspace relies on is their shape (lengths, emptiness) and the pairing of
//! a proof with the public inputs it attests to.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context as _;
use l2_common::constants::{NESTED_RECURSIVE_PROOF_LENGTH, VERIFICATION_KEY_LENGTH_IN_FIELDS};
use l2_common::hash::{hash_fields, GeneratorIndex};
use l2_common::{assert_length, CollectionError, Fr};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Solved witness of a circuit, by witness index.
pub type WitnessMap = BTreeMap<u32, Fr>;

/// A proof in field-element form, as consumed by a recursive verifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub fields: Vec<Fr>,
}

impl Proof {
    pub fn empty(len: usize) -> Self {
        Self {
            fields: vec![Fr::zero(); len],
        }
    }

    /// A well-shaped proof that verifies nothing.
    pub fn make_fake(rng: &mut impl Rng, len: usize) -> Self {
        Self {
            fields: (0..len).map(|_| Fr::from(rng.gen::<u64>())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.iter().all(Fr::is_zero)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    pub key: Vec<Fr>,
}

impl VerificationKey {
    pub fn empty() -> Self {
        Self {
            key: vec![Fr::zero(); VERIFICATION_KEY_LENGTH_IN_FIELDS],
        }
    }

    pub fn make_fake(rng: &mut impl Rng) -> Self {
        Self {
            key: (0..VERIFICATION_KEY_LENGTH_IN_FIELDS)
                .map(|_| Fr::from(rng.gen::<u64>()))
                .collect(),
        }
    }

    /// Leaf value of this key in the verification key tree.
    pub fn hash(&self) -> Fr {
        hash_fields(&self.key, GeneratorIndex::VerificationKey)
    }
}

/// Folded proof over every circuit executed on the client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIvcProof {
    pub inst_vk: Vec<u8>,
    pub pg_acc: Vec<u8>,
    pub proof: Vec<u8>,
    pub translator_vk: Vec<u8>,
    pub ecc_vk: Vec<u8>,
    pub num_public_inputs: u32,
}

const IVC_FILES: [&str; 5] = ["inst_vk", "pg_acc", "client_ivc_proof", "translator_vk", "ecc_vk"];

impl ClientIvcProof {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.proof.is_empty()
    }

    /// Reads the files a backend writes after folding.
    pub fn read_from_output_directory(dir: &Path) -> anyhow::Result<Self> {
        let mut parts = Vec::with_capacity(IVC_FILES.len());
        for name in IVC_FILES {
            let path = dir.join(name);
            parts.push(fs::read(&path).with_context(|| format!("reading {}", path.display()))?);
        }
        let [inst_vk, pg_acc, proof, translator_vk, ecc_vk]: [Vec<u8>; 5] = parts
            .try_into()
            .map_err(|_| anyhow::anyhow!("unexpected number of client IVC files"))?;
        Ok(Self {
            inst_vk,
            pg_acc,
            proof,
            translator_vk,
            ecc_vk,
            num_public_inputs: 0,
        })
    }

    /// Writes the files a backend expects when wrapping this proof.
    pub fn write_to_output_directory(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let parts = [
            &self.inst_vk,
            &self.pg_acc,
            &self.proof,
            &self.translator_vk,
            &self.ecc_vk,
        ];
        for (name, bytes) in IVC_FILES.iter().zip(parts) {
            let path = dir.join(name);
            fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        }
        Ok(())
    }
}

/// Output of one kernel proving step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelProofOutput<PI> {
    pub public_inputs: PI,
    pub proof: Proof,
    pub verification_key: VerificationKey,
    /// Witness of the kernel circuit, pushed onto the folding stack.
    pub output_witness: WitnessMap,
    /// Only set on the tail output of a folded transaction.
    pub client_ivc_proof: Option<ClientIvcProof>,
}

impl<PI: Default> KernelProofOutput<PI> {
    /// The output the first kernel step folds onto.
    pub fn empty() -> Self {
        Self {
            public_inputs: PI::default(),
            proof: Proof::empty(NESTED_RECURSIVE_PROOF_LENGTH),
            verification_key: VerificationKey::empty(),
            output_witness: WitnessMap::new(),
            client_ivc_proof: None,
        }
    }
}

/// Proof of a single application circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCircuitProofOutput {
    pub proof: Proof,
    pub verification_key: VerificationKey,
}

/// Sibling path and leaf index of a leaf in a fixed-height tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipWitness {
    pub leaf_index: u64,
    pub sibling_path: Vec<Fr>,
}

impl MembershipWitness {
    /// Fails unless the path has exactly `height` siblings.
    pub fn new(leaf_index: u64, sibling_path: Vec<Fr>, height: usize) -> Result<Self, CollectionError> {
        Ok(Self {
            leaf_index,
            sibling_path: assert_length(sibling_path, height)?,
        })
    }

    pub fn empty(height: usize) -> Self {
        Self {
            leaf_index: 0,
            sibling_path: vec![Fr::zero(); height],
        }
    }

    pub fn height(&self) -> usize {
        self.sibling_path.len()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierLeafPreimage {
    pub nullifier: Fr,
    pub next_nullifier: Fr,
    pub next_index: u64,
}

/// Membership of a settled nullifier in the nullifier tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierMembershipWitness {
    pub leaf_preimage: NullifierLeafPreimage,
    pub witness: MembershipWitness,
}
