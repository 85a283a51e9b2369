//! Hash functions with fixed contracts.
//!
//! Every hash is keccak over the big-endian encoding of its field inputs,
//! prefixed by a [`GeneratorIndex`] so that different uses never collide.
//! The proving backend pins the real primitives; these only need to be
//! deterministic and domain separated.

use ethereum_types::U256;
use keccak_hash::keccak;

use crate::{ContractAddress, Fr, Point};

/// Domain separators for [`hash_fields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum GeneratorIndex {
    NoteHashNonce = 2,
    UniqueNoteHash = 3,
    SiloedNoteHash = 4,
    OuterNullifier = 7,
    PublicCallStackItem = 12,
    TxRequest = 19,
    PublicLeafIndex = 23,
    MapSlot = 26,
    FunctionArgs = 44,
    NskM = 48,
    PrivateCallStackItem = 57,
    VerificationKey = 58,
    PublicKeyX = 60,
    PublicKeyY = 61,
}

fn to_bytes(value: Fr) -> [u8; 32] {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    buf
}

/// Hashes `inputs` under the domain separator `index`.
pub fn hash_fields(inputs: &[Fr], index: GeneratorIndex) -> Fr {
    let mut buf = Vec::with_capacity(32 * (inputs.len() + 1));
    buf.extend_from_slice(&to_bytes(U256::from(index as u32)));
    for input in inputs {
        buf.extend_from_slice(&to_bytes(*input));
    }
    U256::from_big_endian(keccak(&buf).as_bytes())
}

pub fn silo_note_hash(contract: ContractAddress, inner_note_hash: Fr) -> Fr {
    hash_fields(
        &[contract.to_field(), inner_note_hash],
        GeneratorIndex::SiloedNoteHash,
    )
}

/// Nonce of the `index`-th note hash of a transaction whose first nullifier is
/// `first_nullifier`.
pub fn compute_note_hash_nonce(first_nullifier: Fr, index: usize) -> Fr {
    hash_fields(
        &[first_nullifier, Fr::from(index as u64)],
        GeneratorIndex::NoteHashNonce,
    )
}

pub fn compute_unique_note_hash(nonce: Fr, siloed_note_hash: Fr) -> Fr {
    hash_fields(&[nonce, siloed_note_hash], GeneratorIndex::UniqueNoteHash)
}

pub fn silo_nullifier(contract: ContractAddress, inner_nullifier: Fr) -> Fr {
    hash_fields(
        &[contract.to_field(), inner_nullifier],
        GeneratorIndex::OuterNullifier,
    )
}

/// Leaf slot of `storage_slot` of `contract` in the public data tree.
pub fn compute_public_data_tree_leaf_slot(contract: ContractAddress, storage_slot: Fr) -> Fr {
    hash_fields(
        &[contract.to_field(), storage_slot],
        GeneratorIndex::PublicLeafIndex,
    )
}

/// Storage slot of `key` inside the map rooted at `map_slot`.
pub fn derive_storage_slot_in_map(map_slot: Fr, key: Fr) -> Fr {
    hash_fields(&[map_slot, key], GeneratorIndex::MapSlot)
}

/// Hash of a log preimage, truncated to 31 bytes so it always fits a field.
pub fn compute_log_hash(data: &[u8]) -> Fr {
    let hash = keccak(data);
    U256::from_big_endian(&hash.as_bytes()[1..])
}

/// Public key of the master secret key `secret`.
pub fn derive_public_key(secret: Fr) -> Point {
    Point {
        x: hash_fields(&[secret], GeneratorIndex::PublicKeyX),
        y: hash_fields(&[secret], GeneratorIndex::PublicKeyY),
        is_infinite: false,
    }
}

/// App-siloed secret key handed to `app` for master key `master_secret`.
pub fn compute_app_secret_key(master_secret: Fr, app: ContractAddress, generator: Fr) -> Fr {
    hash_fields(
        &[master_secret, app.to_field(), generator],
        GeneratorIndex::NskM,
    )
}
