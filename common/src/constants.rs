//! Protocol-wide array capacities, tree heights and gas defaults.

use ethereum_types::U256;

use crate::{ContractAddress, Fr};

// Per-call capacities of the private and public circuit public inputs.
pub const MAX_NEW_NOTE_HASHES_PER_CALL: usize = 16;
pub const MAX_NEW_NULLIFIERS_PER_CALL: usize = 16;
pub const MAX_NOTE_HASH_READ_REQUESTS_PER_CALL: usize = 32;
pub const MAX_NULLIFIER_READ_REQUESTS_PER_CALL: usize = 2;
pub const MAX_KEY_VALIDATION_REQUESTS_PER_CALL: usize = 16;
pub const MAX_NOTE_ENCRYPTED_LOGS_PER_CALL: usize = 16;
pub const MAX_ENCRYPTED_LOGS_PER_CALL: usize = 4;
pub const MAX_UNENCRYPTED_LOGS_PER_CALL: usize = 4;
pub const MAX_PRIVATE_CALL_STACK_LENGTH_PER_CALL: usize = 4;
pub const MAX_PUBLIC_CALL_STACK_LENGTH_PER_CALL: usize = 16;
pub const MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_CALL: usize = 16;
pub const MAX_PUBLIC_DATA_READS_PER_CALL: usize = 16;

// Per-transaction capacities of the kernel accumulators.
pub const MAX_NEW_NOTE_HASHES_PER_TX: usize = 64;
pub const MAX_NEW_NULLIFIERS_PER_TX: usize = 64;
pub const MAX_NOTE_HASH_READ_REQUESTS_PER_TX: usize = 128;
pub const MAX_NULLIFIER_READ_REQUESTS_PER_TX: usize = 8;
pub const MAX_KEY_VALIDATION_REQUESTS_PER_TX: usize = 64;
pub const MAX_NOTE_ENCRYPTED_LOGS_PER_TX: usize = 64;
pub const MAX_ENCRYPTED_LOGS_PER_TX: usize = 8;
pub const MAX_UNENCRYPTED_LOGS_PER_TX: usize = 8;
pub const MAX_PRIVATE_CALL_STACK_LENGTH_PER_TX: usize = 32;
pub const MAX_PUBLIC_CALL_STACK_LENGTH_PER_TX: usize = 32;
pub const MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX: usize = 32;
pub const MAX_PUBLIC_DATA_READS_PER_TX: usize = 32;

/// Slots reserved after the public data writes for protocol-level writes,
/// currently only the fee payer's balance.
pub const PROTOCOL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX: usize = 1;
pub const MAX_TOTAL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX: usize =
    MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX + PROTOCOL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX;

// Tree heights.
pub const VK_TREE_HEIGHT: usize = 3;
pub const FUNCTION_TREE_HEIGHT: usize = 5;
pub const NOTE_HASH_TREE_HEIGHT: usize = 32;
pub const NULLIFIER_TREE_HEIGHT: usize = 20;
pub const PUBLIC_DATA_TREE_HEIGHT: usize = 40;

// Proof shapes.
pub const RECURSIVE_PROOF_LENGTH: usize = 93;
pub const NESTED_RECURSIVE_PROOF_LENGTH: usize = 109;
pub const VERIFICATION_KEY_LENGTH_IN_FIELDS: usize = 114;

// Gas defaults.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000_000;
pub const DEFAULT_TEARDOWN_GAS_LIMIT: u64 = 100_000_000;
pub const DEFAULT_MAX_FEE_PER_GAS: u64 = 10;
pub const DEFAULT_INCLUSION_FEE: u64 = 0;

/// Canonical address of the gas token contract.
pub const GAS_TOKEN_ADDRESS: ContractAddress = ContractAddress(U256([5, 0, 0, 0]));

/// Base slot of the `balances` map in the gas token's public storage.
pub const GAS_TOKEN_BALANCES_SLOT: Fr = U256([1, 0, 0, 0]);
