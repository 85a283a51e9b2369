use std::path::PathBuf;

use clap::{Args, ValueHint};

use crate::prover::{get_default_debug_path, KernelProverConfig};

const HELP_HEADING: &str = "Kernel prover options";

/// Command line configuration of the kernel prover.
#[derive(Args, Clone, PartialEq, Eq, Debug)]
pub struct CliKernelProverConfig {
    /// If true, save the inputs of a failing kernel step to disk.
    #[arg(short='i', long, env="L2_SAVE_KERNEL_INPUTS_ON_ERROR", help_heading = HELP_HEADING, default_value_t = false)]
    save_inputs_on_error: bool,
    /// Directory where the inputs of failing kernel steps are written.
    #[arg(long, env="L2_KERNEL_DEBUG_DIR", help_heading = HELP_HEADING, value_hint = ValueHint::DirPath, default_value = get_default_debug_path().into_os_string())]
    debug_dir: PathBuf,
}

impl From<CliKernelProverConfig> for KernelProverConfig {
    fn from(cli: CliKernelProverConfig) -> Self {
        Self {
            save_inputs_on_error: cli.save_inputs_on_error,
            debug_dir: cli.debug_dir,
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
        prover: CliKernelProverConfig,
    }

    #[test]
    fn parses_flags_into_config() {
        let cli = TestCli::parse_from(["test", "-i", "--debug-dir", "/tmp/kernel-debug"]);
        let config = KernelProverConfig::from(cli.prover);
        assert!(config.save_inputs_on_error);
        assert_eq!(config.debug_dir, PathBuf::from("/tmp/kernel-debug"));
    }

    #[test]
    fn default_debug_dir_matches_the_config_default() {
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(KernelProverConfig::from(cli.prover), KernelProverConfig::default());
    }
}
