use l2_common::constants::GAS_TOKEN_ADDRESS;
use l2_common::ContractAddress;

/// Default number of transactions a block takes.
pub const DEFAULT_MAX_TRANSACTIONS_PER_BLOCK: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Transactions past this count are left out of the block.
    pub max_transactions_per_block: usize,
    /// Contract holding fee payer balances.
    pub gas_token_address: ContractAddress,
    /// Deduct transaction fees from fee payers. Disabled on fee-less
    /// development chains.
    pub enforce_fee_payment: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_transactions_per_block: DEFAULT_MAX_TRANSACTIONS_PER_BLOCK,
            gas_token_address: GAS_TOKEN_ADDRESS,
            enforce_fee_payment: true,
        }
    }
}
