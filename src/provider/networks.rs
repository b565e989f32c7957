//! Static network tables for resolving chain identifiers to display networks.

use super::types::NetworkInfo;
use crate::utils::parse_hex_quantity;

/// Known EVM chains: (chain id, name, is_testnet).
const EVM_CHAINS: &[(u64, &str, bool)] = &[
	(1, "Ethereum Mainnet", false),
	(5, "Goerli", true),
	(10, "Optimism", false),
	(56, "BNB Smart Chain", false),
	(97, "BNB Smart Chain Testnet", true),
	(137, "Polygon", false),
	(1337, "Localhost", true),
	(8453, "Base", false),
	(42161, "Arbitrum One", false),
	(80001, "Polygon Mumbai", true),
	(84532, "Base Sepolia", true),
	(11155111, "Sepolia", true),
];

/// Known Solana clusters keyed by genesis hash.
const SOLANA_CLUSTERS: &[(&str, &str, bool)] = &[
	("5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d", "mainnet-beta", false),
	("EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG", "devnet", true),
	("4uhcVJyU9pJkvQyS88uRDiswHXSCkY3zQawwpjk2NsNY", "testnet", true),
];

/// Resolve an EIP-1193 `chainId` (hex quantity) to a network.
///
/// Returns `None` only when the value is not a hex quantity; unknown chains
/// resolve to a generic entry.
pub fn evm_network(chain_id: &str) -> Option<NetworkInfo> {
	let id = u64::try_from(parse_hex_quantity(chain_id)?).ok()?;
	let normalized = format!("{:#x}", id);

	let info = match EVM_CHAINS.iter().find(|(known, _, _)| *known == id) {
		Some((_, name, is_testnet)) => NetworkInfo {
			name: (*name).to_string(),
			chain_id: normalized,
			is_testnet: *is_testnet,
		},
		None => NetworkInfo {
			name: format!("Unknown network (chain id {})", id),
			chain_id: normalized,
			is_testnet: false,
		},
	};
	Some(info)
}

/// Resolve a Solana cluster from its genesis hash.
pub fn solana_network(genesis_hash: &str) -> NetworkInfo {
	match SOLANA_CLUSTERS
		.iter()
		.find(|(hash, _, _)| *hash == genesis_hash)
	{
		Some((hash, name, is_testnet)) => NetworkInfo {
			name: (*name).to_string(),
			chain_id: (*hash).to_string(),
			is_testnet: *is_testnet,
		},
		// Local validators get a fresh genesis on every start.
		None => NetworkInfo {
			name: "localnet".to_string(),
			chain_id: genesis_hash.to_string(),
			is_testnet: true,
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolves_known_evm_chains() {
		let mainnet = evm_network("0x1").unwrap();
		assert_eq!(mainnet.name, "Ethereum Mainnet");
		assert!(!mainnet.is_testnet);

		let sepolia = evm_network("0xAA36A7").unwrap();
		assert_eq!(sepolia.name, "Sepolia");
		assert_eq!(sepolia.chain_id, "0xaa36a7");
		assert!(sepolia.is_testnet);
	}

	#[test]
	fn unknown_evm_chain_gets_generic_entry() {
		let network = evm_network("0x7a69").unwrap();
		assert_eq!(network.name, "Unknown network (chain id 31337)");
		assert!(evm_network("mainnet").is_none());
	}

	#[test]
	fn resolves_solana_clusters() {
		assert_eq!(
			solana_network("EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG").name,
			"devnet"
		);
		assert_eq!(solana_network("abc").name, "localnet");
	}
}
