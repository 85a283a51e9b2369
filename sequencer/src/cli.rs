use clap::Args;
use l2_common::{ContractAddress, Fr};

use crate::config::{ProcessorConfig, DEFAULT_MAX_TRANSACTIONS_PER_BLOCK};

const HELP_HEADING: &str = "Public processor options";

/// Command line configuration of the public processor.
#[derive(Args, Clone, PartialEq, Eq, Debug)]
pub struct CliProcessorConfig {
    /// Maximum number of transactions to process into one block.
    #[arg(short='m', long, env="L2_MAX_TXS_PER_BLOCK", help_heading = HELP_HEADING, default_value_t = DEFAULT_MAX_TRANSACTIONS_PER_BLOCK)]
    max_transactions_per_block: usize,
    /// Address of the gas token contract, in hex.
    #[arg(long, env="L2_GAS_TOKEN_ADDRESS", help_heading = HELP_HEADING, value_parser = parse_address, default_value = "0x5")]
    gas_token_address: ContractAddress,
    /// Charge transaction fees to fee payers.
    #[arg(long, env="L2_ENFORCE_FEES", help_heading = HELP_HEADING, default_value_t = true, action = clap::ArgAction::Set)]
    enforce_fee_payment: bool,
}

fn parse_address(s: &str) -> Result<ContractAddress, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    Fr::from_str_radix(digits, 16)
        .map(ContractAddress::from)
        .map_err(|e| format!("invalid contract address {s:?}: {e}"))
}

impl From<CliProcessorConfig> for ProcessorConfig {
    fn from(cli: CliProcessorConfig) -> Self {
        Self {
            max_transactions_per_block: cli.max_transactions_per_block,
            gas_token_address: cli.gas_token_address,
            enforce_fee_payment: cli.enforce_fee_payment,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        processor: CliProcessorConfig,
    }

    #[test]
    fn defaults_match_the_config_defaults() {
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(ProcessorConfig::from(cli.processor), ProcessorConfig::default());
    }

    #[test]
    fn parses_flags_into_config() {
        let cli = TestCli::parse_from([
            "test",
            "-m",
            "4",
            "--gas-token-address",
            "0xff",
            "--enforce-fee-payment",
            "false",
        ]);
        let config = ProcessorConfig::from(cli.processor);
        assert_eq!(config.max_transactions_per_block, 4);
        assert_eq!(config.gas_token_address, ContractAddress::from(255));
        assert!(!config.enforce_fee_payment);
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(parse_address("0xzz").is_err());
    }
}
