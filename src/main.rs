use clap::{Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use wallet_session_sync::provider::memory::{
	MemoryEip1193Provider, MemoryEnvironment, MemorySolanaProvider, MemorySolanaRpc,
};
use wallet_session_sync::provider::{ProviderKind, SolanaRpc, SolanaRpcClient, networks};
use wallet_session_sync::utils::format_token_amount;
use wallet_session_sync::wallet::adapters::SOL_DECIMALS;
use wallet_session_sync::wallet::identity::InMemoryLinkedWalletRepository;
use wallet_session_sync::{
	ConfigArgs, ConnectOutcome, ConnectionOrchestrator, IdentityLinker, WalletConfig, WalletError,
};

#[derive(Parser, Debug)]
#[command(
	name = "wallet-session-sync",
	about = "Wallet connection manager for MetaMask, Phantom and Solflare"
)]
struct Cli {
	#[command(flatten)]
	config: ConfigArgs,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the SOL balance of an address and the cluster it was read from.
	Balance {
		/// Base58 Solana public key.
		address: String,
	},
	/// Run a scripted session against in-memory wallets.
	Simulate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	let cli = Cli::parse();

	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let config = match WalletConfig::try_from(cli.config) {
		Ok(config) => config,
		Err(e) => {
			error!("{}", e);
			std::process::exit(2);
		}
	};

	let result = match cli.command {
		Command::Balance { address } => balance(&config, &address).await,
		Command::Simulate => simulate(&config).await,
	};

	if let Err(e) = result {
		error!("{}", e);
		std::process::exit(1);
	}
}

/// Print the SOL balance of `address` and the cluster behind the RPC endpoint.
async fn balance(config: &WalletConfig, address: &str) -> Result<(), WalletError> {
	let rpc = SolanaRpcClient::new(config.solana_rpc_url.clone(), config.rpc_timeout)?;
	info!("Querying {}", rpc.rpc_url());

	let lamports = rpc.get_balance(address).await?;
	let network = networks::solana_network(&rpc.get_genesis_hash().await?);

	println!(
		"{} SOL ({})",
		format_token_amount(u128::from(lamports), SOL_DECIMALS),
		network.name
	);
	Ok(())
}

/// Drive a scripted session against in-memory wallets and log each transition.
async fn simulate(config: &WalletConfig) -> Result<(), WalletError> {
	let environment = Arc::new(MemoryEnvironment::new());
	let metamask = Arc::new(MemoryEip1193Provider::metamask());
	let phantom = Arc::new(MemorySolanaProvider::phantom());
	environment.install_eip1193("ethereum", metamask.clone());
	environment.install_solana("solana", phantom.clone());

	let rpc = Arc::new(MemorySolanaRpc::new());
	let phantom_key = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
	rpc.set_balance(phantom_key, 1_250_000_000);

	let orchestrator = ConnectionOrchestrator::new(environment.clone(), rpc.clone(), config);
	let mut events = orchestrator.subscribe_events();
	let logger = tokio::spawn(async move {
		while let Ok(event) = events.recv().await {
			info!("event: {:?}", event);
		}
	});

	for availability in orchestrator.availability() {
		info!(
			"{}: {}",
			availability.kind,
			if availability.installed {
				"installed".to_string()
			} else {
				format!("not installed, get it at {}", availability.kind.install_url())
			}
		);
	}

	if let Err(e) = orchestrator.connect(ProviderKind::SolanaB).await {
		warn!("{}", e);
	}

	match orchestrator.connect(ProviderKind::SolanaA).await {
		Ok(ConnectOutcome::Connected(session)) => info!(
			"Connected {} with {} SOL",
			session.address(),
			session.balance()
		),
		Ok(ConnectOutcome::Cancelled) => info!("Connection cancelled"),
		Err(e) => warn!("{}", e),
	}

	let linker = IdentityLinker::new(Arc::new(InMemoryLinkedWalletRepository::new()));
	linker
		.link("demo-user", ProviderKind::SolanaA, phantom_key)
		.await?;
	info!(
		"Session linked to demo-user: {}",
		linker
			.is_session_linked("demo-user", &orchestrator.session())
			.await
	);

	phantom.emit("accountChanged", serde_json::Value::Null);
	info!("After account removal: {:?}", orchestrator.session());

	match orchestrator.connect(ProviderKind::EvmA).await {
		Ok(ConnectOutcome::Connected(session)) => info!(
			"Connected {} on {}",
			session.address(),
			session.network().map_or("unknown network", |n| n.name.as_str())
		),
		Ok(ConnectOutcome::Cancelled) => info!("Connection cancelled"),
		Err(e) => warn!("{}", e),
	}
	metamask.emit("accountsChanged", json!([format!("0x{}", "b".repeat(40))]));
	orchestrator.refresh().await;
	metamask.emit("chainChanged", json!("0xaa36a7"));
	info!("Page reloads requested: {}", environment.reload_count());

	orchestrator.disconnect().await;
	drop(orchestrator);
	logger.abort();
	Ok(())
}
