//! Notes created and nullified while a transaction's private functions run.

use std::collections::{HashMap, HashSet};

use l2_common::hash::silo_nullifier;
use l2_common::{ContractAddress, Fr};
use serde::{Deserialize, Serialize};

/// A note as the simulator sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteData {
    pub contract_address: ContractAddress,
    pub storage_slot: Fr,
    /// Zero for notes created in the current transaction.
    pub nonce: Fr,
    pub note: Vec<Fr>,
    pub inner_note_hash: Fr,
    pub siloed_nullifier: Fr,
}

/// A note created in the current transaction, with the counter of its note
/// hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNote {
    pub note: NoteData,
    pub counter: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteCacheError {
    #[error("attempt to remove a pending note that does not exist: contract {contract}, note hash {inner_note_hash:#x}")]
    PendingNoteNotFound {
        contract: ContractAddress,
        inner_note_hash: Fr,
    },
}

/// Scratch state shared by all calls of one transaction's execution.
#[derive(Debug, Default)]
pub struct ExecutionNoteCache {
    new_notes: HashMap<ContractAddress, Vec<PendingNote>>,
    /// Siloed nullifiers emitted by each contract, for new and settled notes
    /// alike.
    nullifiers: HashMap<ContractAddress, HashSet<Fr>>,
}

impl ExecutionNoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a note created at `counter`. Equal notes are kept side by side.
    pub fn add_new_note(&mut self, note: NoteData, counter: u32) {
        self.new_notes
            .entry(note.contract_address)
            .or_default()
            .push(PendingNote { note, counter });
    }

    /// Records the nullifier of a note.
    ///
    /// A zero `inner_note_hash` marks a note from an earlier transaction: only
    /// the nullifier is recorded. Otherwise the pending note with that hash is
    /// removed and the counter it was created at is returned.
    pub fn nullify_note(
        &mut self,
        contract: ContractAddress,
        inner_nullifier: Fr,
        inner_note_hash: Fr,
    ) -> Result<Option<u32>, NoteCacheError> {
        self.nullifiers
            .entry(contract)
            .or_default()
            .insert(silo_nullifier(contract, inner_nullifier));

        if inner_note_hash.is_zero() {
            return Ok(None);
        }
        let notes = self.new_notes.entry(contract).or_default();
        let index = notes
            .iter()
            .position(|n| n.note.inner_note_hash == inner_note_hash)
            .ok_or(NoteCacheError::PendingNoteNotFound {
                contract,
                inner_note_hash,
            })?;
        Ok(Some(notes.remove(index).counter))
    }

    /// Pending notes of `contract` at `storage_slot`, as of now.
    pub fn get_notes(&self, contract: ContractAddress, storage_slot: Fr) -> Vec<NoteData> {
        self.new_notes
            .get(&contract)
            .into_iter()
            .flatten()
            .filter(|n| n.note.storage_slot == storage_slot)
            .map(|n| n.note.clone())
            .collect()
    }

    pub fn check_note_exists(&self, contract: ContractAddress, inner_note_hash: Fr) -> bool {
        self.new_notes
            .get(&contract)
            .is_some_and(|notes| notes.iter().any(|n| n.note.inner_note_hash == inner_note_hash))
    }

    /// Siloed nullifiers emitted by `contract` so far.
    pub fn get_nullifiers(&self, contract: ContractAddress) -> HashSet<Fr> {
        self.nullifiers.get(&contract).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use assert2::{assert, let_assert};

    use super::*;

    fn note(contract: u64, slot: u64, hash: u64) -> NoteData {
        NoteData {
            contract_address: ContractAddress::from(contract),
            storage_slot: Fr::from(slot),
            note: vec![Fr::from(hash)],
            inner_note_hash: Fr::from(hash),
            ..Default::default()
        }
    }

    #[test]
    fn nullifying_a_new_note_returns_its_counter() {
        let contract = ContractAddress::from(1);
        let mut cache = ExecutionNoteCache::new();
        cache.add_new_note(note(1, 7, 100), 3);
        cache.add_new_note(note(1, 7, 100), 5);
        cache.add_new_note(note(1, 8, 200), 6);

        let notes_before = cache.get_notes(contract, Fr::from(7u64));
        assert!(notes_before.len() == 2);

        let counter = cache.nullify_note(contract, Fr::from(9u64), Fr::from(100u64)).unwrap();
        assert!(counter == Some(3));
        assert!(cache.get_notes(contract, Fr::from(7u64)).len() == 1);
        // Earlier reads are snapshots.
        assert!(notes_before.len() == 2);
        assert!(cache.check_note_exists(contract, Fr::from(100u64)));
        assert!(cache
            .get_nullifiers(contract)
            .contains(&silo_nullifier(contract, Fr::from(9u64))));
    }

    #[test]
    fn settled_notes_skip_the_pending_set() {
        let contract = ContractAddress::from(1);
        let mut cache = ExecutionNoteCache::new();
        cache.add_new_note(note(1, 7, 100), 3);
        let counter = cache.nullify_note(contract, Fr::from(9u64), Fr::zero()).unwrap();
        assert!(counter.is_none());
        assert!(cache.get_notes(contract, Fr::from(7u64)).len() == 1);
        assert!(cache.get_nullifiers(contract).len() == 1);
    }

    #[test]
    fn missing_pending_note_is_an_error() {
        let contract = ContractAddress::from(2);
        let mut cache = ExecutionNoteCache::new();
        cache.add_new_note(note(1, 7, 100), 3);
        let_assert!(
            Err(NoteCacheError::PendingNoteNotFound { .. }) =
                cache.nullify_note(contract, Fr::from(9u64), Fr::from(100u64))
        );
        assert!(!cache.check_note_exists(contract, Fr::from(100u64)));
    }
}
