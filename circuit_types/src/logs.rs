//! Log preimages carried alongside a transaction.
//!
//! The kernels only see log hashes; the preimages travel with the
//! transaction and are filtered against the surviving hashes when part of a
//! transaction reverts.

use std::collections::HashSet;

use l2_common::hash::compute_log_hash;
use l2_common::{ContractAddress, Fr};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One emitted log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct L2Log {
    pub contract_address: ContractAddress,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl L2Log {
    pub fn new(contract_address: ContractAddress, data: Vec<u8>) -> Self {
        Self {
            contract_address,
            data,
        }
    }

    pub fn hash(&self) -> Fr {
        compute_log_hash(&self.data)
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        let len = rng.gen_range(8..64);
        Self {
            contract_address: ContractAddress::from(rng.gen::<u64>()),
            data: (0..len).map(|_| rng.gen()).collect(),
        }
    }
}

/// Logs emitted by a single function call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionL2Logs {
    pub logs: Vec<L2Log>,
}

impl FunctionL2Logs {
    pub fn new(logs: Vec<L2Log>) -> Self {
        Self { logs }
    }

    pub fn random(rng: &mut impl Rng, num_logs: usize) -> Self {
        Self {
            logs: (0..num_logs).map(|_| L2Log::random(rng)).collect(),
        }
    }

    /// Total preimage length in bytes.
    pub fn serialized_length(&self) -> u64 {
        self.logs.iter().map(|l| l.data.len() as u64).sum()
    }
}

/// All logs of one kind emitted by a transaction, grouped per call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxL2Logs {
    pub function_logs: Vec<FunctionL2Logs>,
}

impl TxL2Logs {
    pub fn new(function_logs: Vec<FunctionL2Logs>) -> Self {
        Self { function_logs }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn random(rng: &mut impl Rng, num_calls: usize, logs_per_call: usize) -> Self {
        Self {
            function_logs: (0..num_calls)
                .map(|_| FunctionL2Logs::random(rng, logs_per_call))
                .collect(),
        }
    }

    pub fn total_log_count(&self) -> usize {
        self.function_logs.iter().map(|f| f.logs.len()).sum()
    }

    pub fn serialized_length(&self) -> u64 {
        self.function_logs.iter().map(FunctionL2Logs::serialized_length).sum()
    }

    pub fn unroll_logs(&self) -> impl Iterator<Item = &L2Log> {
        self.function_logs.iter().flat_map(|f| f.logs.iter())
    }

    pub fn add_function_logs(&mut self, logs: impl IntoIterator<Item = FunctionL2Logs>) {
        self.function_logs.extend(logs)
    }

    /// Keeps only logs whose hash is in `hashes`. Calls left without logs are
    /// dropped.
    pub fn filter(&self, hashes: impl IntoIterator<Item = Fr>) -> Self {
        let keep: HashSet<Fr> = hashes.into_iter().collect();
        let function_logs = self
            .function_logs
            .iter()
            .map(|f| FunctionL2Logs {
                logs: f.logs.iter().filter(|l| keep.contains(&l.hash())).cloned().collect(),
            })
            .filter(|f| !f.logs.is_empty())
            .collect();
        Self { function_logs }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn filter_keeps_listed_hashes() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let logs = TxL2Logs::random(&mut rng, 3, 2);
        assert_eq!(logs.total_log_count(), 6);

        let keep = logs.function_logs[1].logs[0].hash();
        let filtered = logs.filter([keep]);
        assert_eq!(filtered.total_log_count(), 1);
        assert_eq!(filtered.function_logs.len(), 1);
        assert_eq!(filtered.function_logs[0].logs[0], logs.function_logs[1].logs[0]);

        assert_eq!(logs.filter(Vec::<Fr>::new()).total_log_count(), 0);
    }

    #[test]
    fn logs_serialize_as_hex() {
        let log = L2Log::new(ContractAddress::from(1), vec![0xde, 0xad]);
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"dead\""));
        let back: L2Log = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
