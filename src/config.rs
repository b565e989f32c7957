//! Runtime configuration for the wallet session manager.

use crate::wallet::WalletError;

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Public Solana devnet endpoint used when nothing else is configured.
pub const DEFAULT_SOLANA_RPC_URL: &str = "https://api.devnet.solana.com";

const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LINKS_DIR: &str = "data/linked_wallets";

/// Configuration shared by the adapters, the RPC client and the identity linker.
#[derive(Debug, Clone)]
pub struct WalletConfig {
	/// JSON-RPC endpoint used for Solana balance and cluster lookups.
	pub solana_rpc_url: String,
	/// Request timeout for the Solana RPC client.
	pub rpc_timeout: Duration,
	/// Upper bound on a single connect attempt.
	///
	/// `None` leaves an unanswered wallet prompt pending indefinitely, which
	/// blocks further connect attempts until the wallet responds.
	pub connect_timeout: Option<Duration>,
	/// Directory holding linked-wallet records for the file repository.
	pub linked_wallets_dir: PathBuf,
}

impl Default for WalletConfig {
	fn default() -> Self {
		Self {
			solana_rpc_url: DEFAULT_SOLANA_RPC_URL.to_string(),
			rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
			connect_timeout: None,
			linked_wallets_dir: PathBuf::from(DEFAULT_LINKS_DIR),
		}
	}
}

/// Command-line flags for [`WalletConfig`], each with a `WALLET_*` variable
/// as fallback.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
	/// Solana JSON-RPC endpoint.
	#[arg(long, env = "WALLET_SOLANA_RPC_URL", default_value = DEFAULT_SOLANA_RPC_URL, value_name = "URL")]
	pub solana_rpc_url: String,

	/// Solana RPC request timeout.
	#[arg(long, env = "WALLET_RPC_TIMEOUT_SECS", default_value_t = DEFAULT_RPC_TIMEOUT_SECS, value_name = "SECS")]
	pub rpc_timeout_secs: u64,

	/// Connect attempt timeout; 0 waits for the wallet indefinitely.
	#[arg(long, env = "WALLET_CONNECT_TIMEOUT_SECS", default_value_t = 0, value_name = "SECS")]
	pub connect_timeout_secs: u64,

	/// Directory for linked-wallet records.
	#[arg(long = "links-dir", env = "WALLET_LINKS_DIR", default_value = DEFAULT_LINKS_DIR, value_name = "DIR")]
	pub linked_wallets_dir: PathBuf,
}

impl TryFrom<ConfigArgs> for WalletConfig {
	type Error = WalletError;

	fn try_from(args: ConfigArgs) -> Result<Self, Self::Error> {
		if args.solana_rpc_url.trim().is_empty() {
			return Err(WalletError::Config(
				"Solana RPC URL must not be empty".to_string(),
			));
		}
		if args.rpc_timeout_secs == 0 {
			return Err(WalletError::Config(
				"RPC timeout must be at least one second".to_string(),
			));
		}

		Ok(Self {
			solana_rpc_url: args.solana_rpc_url,
			rpc_timeout: Duration::from_secs(args.rpc_timeout_secs),
			// Zero disables the timeout.
			connect_timeout: (args.connect_timeout_secs > 0)
				.then(|| Duration::from_secs(args.connect_timeout_secs)),
			linked_wallets_dir: args.linked_wallets_dir,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	#[derive(Parser, Debug)]
	struct TestCli {
		#[command(flatten)]
		config: ConfigArgs,
	}

	fn parse(args: &[&str]) -> Result<WalletConfig, WalletError> {
		let cli = TestCli::try_parse_from(std::iter::once("wallet").chain(args.iter().copied()))
			.unwrap();
		WalletConfig::try_from(cli.config)
	}

	#[test]
	fn defaults_apply_when_nothing_is_set() {
		let config = parse(&[]).unwrap();
		assert_eq!(config.solana_rpc_url, DEFAULT_SOLANA_RPC_URL);
		assert_eq!(config.rpc_timeout, Duration::from_secs(30));
		assert!(config.connect_timeout.is_none());
		assert_eq!(config.linked_wallets_dir, PathBuf::from(DEFAULT_LINKS_DIR));
	}

	#[test]
	fn reads_overrides() {
		let config = parse(&[
			"--solana-rpc-url",
			"http://localhost:8899",
			"--connect-timeout-secs",
			"45",
			"--links-dir",
			"/tmp/links",
		])
		.unwrap();
		assert_eq!(config.solana_rpc_url, "http://localhost:8899");
		assert_eq!(config.connect_timeout, Some(Duration::from_secs(45)));
		assert_eq!(config.linked_wallets_dir, PathBuf::from("/tmp/links"));
	}

	#[test]
	fn zero_connect_timeout_disables_it() {
		let config = parse(&["--connect-timeout-secs", "0"]).unwrap();
		assert!(config.connect_timeout.is_none());
	}

	#[test]
	fn rejects_empty_rpc_url() {
		let result = parse(&["--solana-rpc-url", " "]);
		assert!(matches!(result, Err(WalletError::Config(_))));
	}

	#[test]
	fn rejects_zero_rpc_timeout() {
		let result = parse(&["--rpc-timeout-secs", "0"]);
		assert!(matches!(result, Err(WalletError::Config(_))));
	}

	#[test]
	fn rejects_malformed_timeout() {
		let result = TestCli::try_parse_from(["wallet", "--rpc-timeout-secs", "soon"]);
		assert!(result.is_err());
	}
}
