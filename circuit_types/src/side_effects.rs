//! Side effects emitted by private and public functions, in the shapes the
//! kernel circuits accumulate them.
//!
//! "Scoped" variants carry the address of the contract that emitted the
//! effect; the kernel adds the scope when it folds a call into its
//! accumulators.

use l2_common::{ContractAddress, Fr, IsEmpty, Ordered, Point};
use serde::{Deserialize, Serialize};

macro_rules! ordered_by {
    ($ty:ty, |$this:ident| $counter:expr) => {
        impl Ordered for $ty {
            fn counter(&self) -> u32 {
                let $this = self;
                $counter
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteHash {
    pub value: Fr,
    pub counter: u32,
}

impl NoteHash {
    pub fn new(value: Fr, counter: u32) -> Self {
        Self { value, counter }
    }

    pub fn scope(self, nullifier_counter: u32, contract_address: ContractAddress) -> ScopedNoteHash {
        ScopedNoteHash {
            note_hash: self,
            nullifier_counter,
            contract_address,
        }
    }
}

impl IsEmpty for NoteHash {
    fn is_empty(&self) -> bool {
        self.value.is_zero() && self.counter == 0
    }
}
ordered_by!(NoteHash, |n| n.counter);

/// A note hash together with the counter of the nullifier that consumes it in
/// the same transaction, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopedNoteHash {
    pub note_hash: NoteHash,
    /// Zero if the note is not nullified within this transaction.
    pub nullifier_counter: u32,
    pub contract_address: ContractAddress,
}

impl ScopedNoteHash {
    pub fn value(&self) -> Fr {
        self.note_hash.value
    }
}

impl IsEmpty for ScopedNoteHash {
    fn is_empty(&self) -> bool {
        self.note_hash.is_empty() && self.contract_address.is_zero()
    }
}
ordered_by!(ScopedNoteHash, |n| n.note_hash.counter);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nullifier {
    pub value: Fr,
    pub counter: u32,
    /// Inner hash of the note this nullifier consumes when that note was
    /// created in the same transaction, zero otherwise.
    pub note_hash: Fr,
}

impl Nullifier {
    pub fn new(value: Fr, counter: u32, note_hash: Fr) -> Self {
        Self {
            value,
            counter,
            note_hash,
        }
    }

    pub fn scope(self, contract_address: ContractAddress) -> ScopedNullifier {
        ScopedNullifier {
            nullifier: self,
            contract_address,
        }
    }
}

impl IsEmpty for Nullifier {
    fn is_empty(&self) -> bool {
        self.value.is_zero() && self.counter == 0 && self.note_hash.is_zero()
    }
}
ordered_by!(Nullifier, |n| n.counter);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopedNullifier {
    pub nullifier: Nullifier,
    pub contract_address: ContractAddress,
}

impl ScopedNullifier {
    pub fn value(&self) -> Fr {
        self.nullifier.value
    }

    pub fn nullified_note_hash(&self) -> Fr {
        self.nullifier.note_hash
    }
}

impl IsEmpty for ScopedNullifier {
    fn is_empty(&self) -> bool {
        self.nullifier.is_empty() && self.contract_address.is_zero()
    }
}
ordered_by!(ScopedNullifier, |n| n.nullifier.counter);

/// A request to prove that a note hash or nullifier exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadRequest {
    pub value: Fr,
    pub counter: u32,
}

impl ReadRequest {
    pub fn new(value: Fr, counter: u32) -> Self {
        Self { value, counter }
    }

    pub fn scope(self, contract_address: ContractAddress) -> ScopedReadRequest {
        ScopedReadRequest {
            read_request: self,
            contract_address,
        }
    }
}

impl IsEmpty for ReadRequest {
    fn is_empty(&self) -> bool {
        self.value.is_zero() && self.counter == 0
    }
}
ordered_by!(ReadRequest, |r| r.counter);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopedReadRequest {
    pub read_request: ReadRequest,
    pub contract_address: ContractAddress,
}

impl ScopedReadRequest {
    pub fn value(&self) -> Fr {
        self.read_request.value
    }
}

impl IsEmpty for ScopedReadRequest {
    fn is_empty(&self) -> bool {
        self.read_request.is_empty() && self.contract_address.is_zero()
    }
}
ordered_by!(ScopedReadRequest, |r| r.read_request.counter);

/// A request to prove that `sk_app` was derived from the secret key behind
/// `pk_m`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValidationRequest {
    pub pk_m: Point,
    pub sk_app: Fr,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValidationRequestAndGenerator {
    pub request: KeyValidationRequest,
    pub sk_app_generator: Fr,
}

impl KeyValidationRequestAndGenerator {
    pub fn scope(
        self,
        contract_address: ContractAddress,
    ) -> ScopedKeyValidationRequestAndGenerator {
        ScopedKeyValidationRequestAndGenerator {
            request: self,
            contract_address,
        }
    }
}

impl IsEmpty for KeyValidationRequestAndGenerator {
    fn is_empty(&self) -> bool {
        self.request.pk_m.is_empty()
            && self.request.sk_app.is_zero()
            && self.sk_app_generator.is_zero()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopedKeyValidationRequestAndGenerator {
    pub request: KeyValidationRequestAndGenerator,
    pub contract_address: ContractAddress,
}

impl IsEmpty for ScopedKeyValidationRequestAndGenerator {
    fn is_empty(&self) -> bool {
        self.request.is_empty() && self.contract_address.is_zero()
    }
}

/// Hash of an encrypted note log, linked to the note it carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteLogHash {
    pub value: Fr,
    pub counter: u32,
    pub length: u64,
    pub note_hash_counter: u32,
}

impl IsEmpty for NoteLogHash {
    fn is_empty(&self) -> bool {
        self.value.is_zero() && self.counter == 0 && self.note_hash_counter == 0
    }
}
ordered_by!(NoteLogHash, |l| l.counter);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogHash {
    pub value: Fr,
    pub counter: u32,
    pub length: u64,
}

impl LogHash {
    pub fn new(value: Fr, counter: u32, length: u64) -> Self {
        Self {
            value,
            counter,
            length,
        }
    }

    pub fn scope(self, contract_address: ContractAddress) -> ScopedLogHash {
        ScopedLogHash {
            log_hash: self,
            contract_address,
        }
    }
}

impl IsEmpty for LogHash {
    fn is_empty(&self) -> bool {
        self.value.is_zero() && self.counter == 0
    }
}
ordered_by!(LogHash, |l| l.counter);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopedLogHash {
    pub log_hash: LogHash,
    pub contract_address: ContractAddress,
}

impl IsEmpty for ScopedLogHash {
    fn is_empty(&self) -> bool {
        self.log_hash.is_empty() && self.contract_address.is_zero()
    }
}
ordered_by!(ScopedLogHash, |l| l.log_hash.counter);

/// A storage read performed by a public function, in contract-slot terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractStorageRead {
    pub storage_slot: Fr,
    pub current_value: Fr,
    pub counter: u32,
    /// Contract whose storage was read. Zero means the executing contract.
    pub contract_address: ContractAddress,
}

impl IsEmpty for ContractStorageRead {
    fn is_empty(&self) -> bool {
        self.storage_slot.is_zero() && self.current_value.is_zero() && self.counter == 0
    }
}
ordered_by!(ContractStorageRead, |r| r.counter);

/// A storage write performed by a public function, in contract-slot terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractStorageUpdateRequest {
    pub storage_slot: Fr,
    pub new_value: Fr,
    pub counter: u32,
    /// Contract whose storage was written. Zero means the executing contract.
    pub contract_address: ContractAddress,
}

impl IsEmpty for ContractStorageUpdateRequest {
    fn is_empty(&self) -> bool {
        self.storage_slot.is_zero() && self.new_value.is_zero() && self.counter == 0
    }
}
ordered_by!(ContractStorageUpdateRequest, |w| w.counter);

/// A read of the public data tree, keyed by leaf slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicDataRead {
    pub leaf_slot: Fr,
    pub value: Fr,
    pub counter: u32,
}

impl IsEmpty for PublicDataRead {
    fn is_empty(&self) -> bool {
        self.leaf_slot.is_zero() && self.value.is_zero() && self.counter == 0
    }
}
ordered_by!(PublicDataRead, |r| r.counter);

/// A write to the public data tree, keyed by leaf slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicDataUpdateRequest {
    pub leaf_slot: Fr,
    pub new_value: Fr,
    pub counter: u32,
}

impl PublicDataUpdateRequest {
    pub fn new(leaf_slot: Fr, new_value: Fr, counter: u32) -> Self {
        Self {
            leaf_slot,
            new_value,
            counter,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl IsEmpty for PublicDataUpdateRequest {
    fn is_empty(&self) -> bool {
        self.leaf_slot.is_zero() && self.new_value.is_zero() && self.counter == 0
    }
}
ordered_by!(PublicDataUpdateRequest, |w| w.counter);

/// A finalized public data write as it lands in a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicDataWrite {
    pub leaf_slot: Fr,
    pub value: Fr,
}

impl From<&PublicDataUpdateRequest> for PublicDataWrite {
    fn from(request: &PublicDataUpdateRequest) -> Self {
        Self {
            leaf_slot: request.leaf_slot,
            value: request.new_value,
        }
    }
}
