use std::fmt;

use ethereum_types::U256;
use serde::{Deserialize, Serialize};

use crate::IsEmpty;

/// A field element.
///
/// Values are carried as 256-bit integers; reduction modulo the circuit field
/// is the proving backend's concern.
pub type Fr = U256;

impl IsEmpty for Fr {
    fn is_empty(&self) -> bool {
        self.is_zero()
    }
}

/// Address of a deployed contract.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContractAddress(pub Fr);

impl ContractAddress {
    /// The zero address, used as "no contract".
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));

    /// Returns `true` for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The address as a field element.
    pub fn to_field(self) -> Fr {
        self.0
    }
}

impl From<u64> for ContractAddress {
    fn from(value: u64) -> Self {
        Self(Fr::from(value))
    }
}

impl From<Fr> for ContractAddress {
    fn from(value: Fr) -> Self {
        Self(value)
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl IsEmpty for ContractAddress {
    fn is_empty(&self) -> bool {
        self.is_zero()
    }
}

/// First four bytes of a function signature hash.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FunctionSelector(pub u32);

impl FunctionSelector {
    /// The selector as a field element.
    pub fn to_field(self) -> Fr {
        Fr::from(self.0)
    }
}

impl fmt::Display for FunctionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A point on the Grumpkin curve, used for master public keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Fr,
    pub y: Fr,
    pub is_infinite: bool,
}

impl IsEmpty for Point {
    fn is_empty(&self) -> bool {
        self.x.is_zero() && self.y.is_zero() && !self.is_infinite
    }
}
