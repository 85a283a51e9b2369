//! Charging the transaction fee to the fee payer's gas token balance.

use circuit_types::PublicDataUpdateRequest;
use l2_common::constants::{
    GAS_TOKEN_BALANCES_SLOT, MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX,
    MAX_TOTAL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX,
};
use l2_common::hash::{compute_public_data_tree_leaf_slot, derive_storage_slot_in_map};
use l2_common::{pad_array_end, CollectionError, ContractAddress, Fr, IsEmpty};
use tracing::debug;

use crate::db::PublicStateDb;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeePaymentError {
    #[error("Not enough balance for fee payer to pay for transaction (fee payer {fee_payer}, balance {balance}, fee {fee})")]
    InsufficientBalance {
        fee_payer: ContractAddress,
        balance: Fr,
        fee: Fr,
    },
}

/// Slot of the fee payer's balance in the gas token's storage.
pub fn compute_fee_payer_balance_storage_slot(fee_payer: ContractAddress) -> Fr {
    derive_storage_slot_in_map(GAS_TOKEN_BALANCES_SLOT, fee_payer.to_field())
}

/// Public data tree leaf holding the fee payer's balance, zero when there is
/// no fee payer.
pub fn compute_fee_payer_balance_leaf_slot(gas_token: ContractAddress, fee_payer: ContractAddress) -> Fr {
    if fee_payer.is_zero() {
        return Fr::zero();
    }
    compute_public_data_tree_leaf_slot(gas_token, compute_fee_payer_balance_storage_slot(fee_payer))
}

/// Deducts `fee` from the fee payer's balance and returns the resulting
/// balance write, or `None` when the transaction has no fee payer.
///
/// If `writes` already updates the balance (a claim made during the
/// transaction), the fee is taken from that value instead of from storage.
pub async fn compute_fee_payment_update_request<S: PublicStateDb>(
    state_db: &mut S,
    gas_token: ContractAddress,
    fee_payer: ContractAddress,
    fee: Fr,
    writes: &[PublicDataUpdateRequest],
) -> anyhow::Result<Option<PublicDataUpdateRequest>> {
    let leaf_slot = compute_fee_payer_balance_leaf_slot(gas_token, fee_payer);
    if leaf_slot.is_zero() {
        return Ok(None);
    }
    let storage_slot = compute_fee_payer_balance_storage_slot(fee_payer);
    let balance = match writes.iter().find(|w| !w.is_empty() && w.leaf_slot == leaf_slot) {
        Some(claim) => claim.new_value,
        None => state_db.storage_read(gas_token, storage_slot).await?,
    };
    if balance < fee {
        return Err(FeePaymentError::InsufficientBalance {
            fee_payer,
            balance,
            fee,
        }
        .into());
    }
    let new_balance = balance - fee;
    debug!(%fee_payer, %balance, %fee, "charging transaction fee");
    state_db
        .storage_write(gas_token, storage_slot, new_balance)
        .await?;
    Ok(Some(PublicDataUpdateRequest::new(leaf_slot, new_balance, 0)))
}

/// Pads the kernel's public data writes to
/// [`MAX_TOTAL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX`] and places the fee
/// payment: over an existing write to the same leaf, else in the slot reserved
/// after the regular writes.
pub fn merge_fee_payment_update_request(
    writes: &[PublicDataUpdateRequest],
    payment: Option<PublicDataUpdateRequest>,
) -> Result<Vec<PublicDataUpdateRequest>, CollectionError> {
    let mut merged = pad_array_end(
        writes.to_vec(),
        PublicDataUpdateRequest::empty(),
        MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX,
    )?;
    merged.resize(
        MAX_TOTAL_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX,
        PublicDataUpdateRequest::empty(),
    );
    if let Some(payment) = payment {
        let index = merged
            .iter()
            .position(|w| !w.is_empty() && w.leaf_slot == payment.leaf_slot)
            .unwrap_or(MAX_PUBLIC_DATA_UPDATE_REQUESTS_PER_TX);
        merged[index] = payment;
    }
    Ok(merged)
}
