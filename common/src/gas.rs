use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_GAS_LIMIT, DEFAULT_INCLUSION_FEE, DEFAULT_MAX_FEE_PER_GAS, DEFAULT_TEARDOWN_GAS_LIMIT,
};
use crate::Fr;

/// Gas along the two metered dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gas {
    pub da_gas: u64,
    pub l2_gas: u64,
}

impl Gas {
    pub const fn new(da_gas: u64, l2_gas: u64) -> Self {
        Self { da_gas, l2_gas }
    }

    pub const fn empty() -> Self {
        Self::new(0, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.da_gas == 0 && self.l2_gas == 0
    }

    /// Price of this much gas at `fees`.
    pub fn compute_fee(&self, fees: &GasFees) -> Result<Fr, FeeOverflow> {
        let da = Fr::from(self.da_gas)
            .checked_mul(fees.fee_per_da_gas)
            .ok_or(FeeOverflow)?;
        let l2 = Fr::from(self.l2_gas)
            .checked_mul(fees.fee_per_l2_gas)
            .ok_or(FeeOverflow)?;
        da.checked_add(l2).ok_or(FeeOverflow)
    }
}

/// A fee that does not fit in a field element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("transaction fee overflows a field element")]
pub struct FeeOverflow;

/// Adds an inclusion fee to a gas fee.
pub fn add_fees(gas_fee: Fr, inclusion_fee: Fr) -> Result<Fr, FeeOverflow> {
    gas_fee.checked_add(inclusion_fee).ok_or(FeeOverflow)
}

/// Saturates at `u64::MAX` in each dimension.
impl Add for Gas {
    type Output = Gas;

    fn add(self, rhs: Gas) -> Gas {
        Gas::new(
            self.da_gas.saturating_add(rhs.da_gas),
            self.l2_gas.saturating_add(rhs.l2_gas),
        )
    }
}

impl AddAssign for Gas {
    fn add_assign(&mut self, rhs: Gas) {
        *self = *self + rhs;
    }
}

/// Saturates at zero in each dimension.
impl Sub for Gas {
    type Output = Gas;

    fn sub(self, rhs: Gas) -> Gas {
        Gas::new(
            self.da_gas.saturating_sub(rhs.da_gas),
            self.l2_gas.saturating_sub(rhs.l2_gas),
        )
    }
}

impl Sum for Gas {
    fn sum<I: Iterator<Item = Gas>>(iter: I) -> Gas {
        iter.fold(Gas::empty(), Add::add)
    }
}

/// Price per unit of gas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GasFees {
    pub fee_per_da_gas: Fr,
    pub fee_per_l2_gas: Fr,
}

impl GasFees {
    pub fn new(fee_per_da_gas: impl Into<Fr>, fee_per_l2_gas: impl Into<Fr>) -> Self {
        Self {
            fee_per_da_gas: fee_per_da_gas.into(),
            fee_per_l2_gas: fee_per_l2_gas.into(),
        }
    }
}

/// Gas budget a user signs over in the transaction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GasSettings {
    /// Limits for setup and app logic combined, excluding teardown.
    pub gas_limits: Gas,
    /// Gas set aside for teardown, charged in full.
    pub teardown_gas_limits: Gas,
    pub max_fees_per_gas: GasFees,
    pub inclusion_fee: Fr,
}

impl GasSettings {
    pub fn empty() -> Self {
        Self {
            gas_limits: Gas::empty(),
            teardown_gas_limits: Gas::empty(),
            max_fees_per_gas: GasFees::default(),
            inclusion_fee: Fr::zero(),
        }
    }

    pub fn get_limits(&self) -> Gas {
        self.gas_limits
    }

    pub fn get_teardown_limits(&self) -> Gas {
        self.teardown_gas_limits
    }
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            gas_limits: Gas::new(DEFAULT_GAS_LIMIT, DEFAULT_GAS_LIMIT),
            teardown_gas_limits: Gas::new(DEFAULT_TEARDOWN_GAS_LIMIT, DEFAULT_TEARDOWN_GAS_LIMIT),
            max_fees_per_gas: GasFees::new(DEFAULT_MAX_FEE_PER_GAS, DEFAULT_MAX_FEE_PER_GAS),
            inclusion_fee: Fr::from(DEFAULT_INCLUSION_FEE),
        }
    }
}
