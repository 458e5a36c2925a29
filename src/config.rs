use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::c32;
use crate::clarity::Principal;

pub const DEFAULT_CONTRACT: &str = "SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWY.tip-jar-v3";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn default_node_url(self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.mainnet.hiro.so",
            Network::Testnet => "https://api.testnet.hiro.so",
        }
    }

    /// Whether an address version byte belongs to this network.
    pub fn accepts_version(self, version: u8) -> bool {
        match self {
            Network::Mainnet => c32::is_mainnet_version(version),
            Network::Testnet => {
                version == c32::TESTNET_SINGLESIG || version == c32::TESTNET_MULTISIG
            }
        }
    }

    pub fn explorer_tx_url(self, txid: &str) -> String {
        let txid = if txid.starts_with("0x") {
            txid.to_string()
        } else {
            format!("0x{txid}")
        };
        format!("https://explorer.hiro.so/txid/{txid}?chain={self}")
    }
}

impl std::str::FromStr for Network {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            _ => Err(anyhow!("Invalid network '{s}'. Valid options: mainnet, testnet")),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

/// The deployed contract, `ADDRESS.NAME`. Fixed for the life of the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractId {
    pub address: String,
    pub name: String,
}

impl std::str::FromStr for ContractId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        let (address, name) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| anyhow!("contract must be ADDRESS.NAME, got '{s}'"))?;
        if name.is_empty()
            || name.len() > 128
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(anyhow!("invalid contract name '{name}'"));
        }
        let address = Principal::parse(address)
            .map_err(|e| anyhow!("invalid contract address: {e}"))?
            .to_string();
        Ok(ContractId {
            address,
            name: name.to_string(),
        })
    }
}

impl ContractId {
    /// Whether the deploying address belongs to `network`.
    pub fn is_on(&self, network: Network) -> bool {
        c32::decode_address(&self.address)
            .map(|(version, _)| network.accepts_version(version))
            .unwrap_or(false)
    }
}

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.address, self.name)
    }
}

/// STX Tip Jar - tip a Stacks contract from the terminal
///
/// Configuration priority: CLI args > Environment variables > Config file > Defaults
#[derive(Parser, Debug, Default)]
#[command(name = "tipjar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stacks tip jar client", long_about = None)]
pub struct CliArgs {
    /// Network: mainnet or testnet
    #[arg(long, global = true, env = "TIPJAR_NETWORK", value_parser = clap::value_parser!(Network))]
    pub network: Option<Network>,

    /// Stacks node API URL
    #[arg(long, global = true, env = "STACKS_NODE_URL")]
    pub node_url: Option<String>,

    /// Tip jar contract as ADDRESS.NAME
    #[arg(long, global = true, env = "TIPJAR_CONTRACT")]
    pub contract: Option<String>,

    /// Read-only call timeout in milliseconds (1000-60000)
    #[arg(long, global = true, env = "RPC_TIMEOUT_MS")]
    pub rpc_timeout_ms: Option<u64>,

    /// Delay before re-reading stats after a tip, in milliseconds (0-60000)
    #[arg(long, global = true, env = "REFRESH_DELAY_MS")]
    pub refresh_delay_ms: Option<u64>,

    /// How long to wait for the wallet to answer, in milliseconds (1000-600000)
    #[arg(long, global = true, env = "WALLET_TIMEOUT_MS")]
    pub wallet_timeout_ms: Option<u64>,

    /// Smallest tip accepted, in µSTX
    #[arg(long, global = true, env = "MIN_TIP_MICRO")]
    pub min_tip_micro: Option<u128>,

    /// Path to the SQLite session database
    #[arg(long, global = true, env = "TIPJAR_SESSION_DB")]
    pub session_db: Option<String>,

    /// Directory shared with the wallet for connect/sign requests
    #[arg(long, global = true, env = "TIPJAR_HANDOFF_DIR")]
    pub handoff_dir: Option<PathBuf>,

    /// Application name shown by the wallet (also the session key)
    #[arg(long, global = true, env = "TIPJAR_APP_NAME")]
    pub app_name: Option<String>,

    /// Log file used while the terminal UI owns the screen
    #[arg(long, global = true, env = "TIPJAR_LOG_FILE")]
    pub log_file: Option<String>,

    /// TOML config file
    #[arg(long = "config", global = true, env = "TIPJAR_CONFIG")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Interactive terminal UI (default)
    Ui,
    /// Print tip count, total and owner
    Stats,
    /// Print the most recent tips, newest first
    Recent,
    /// Print the session state
    Status,
    /// Connect a wallet identity
    Connect {
        /// Skip the wallet and use this address directly
        #[arg(long)]
        address: Option<String>,
    },
    /// Sign out and forget the stored session
    Disconnect,
    /// Send a tip
    Tip {
        /// Amount in STX, e.g. 1.5
        amount: String,
        /// Message attached to the tip
        #[arg(short, long, default_value = "")]
        message: String,
    },
}

/// Optional TOML layer. Every key mirrors a CLI flag.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub network: Option<String>,
    pub node_url: Option<String>,
    pub contract: Option<String>,
    pub rpc_timeout_ms: Option<u64>,
    pub refresh_delay_ms: Option<u64>,
    pub wallet_timeout_ms: Option<u64>,
    pub min_tip_micro: Option<u128>,
    pub session_db: Option<String>,
    pub handoff_dir: Option<PathBuf>,
    pub app_name: Option<String>,
    pub log_file: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub network: Network,
    pub node_url: String,
    pub contract: ContractId,
    pub rpc_timeout_ms: u64,
    pub refresh_delay_ms: u64,
    pub wallet_timeout_ms: u64,
    pub min_tip_micro: u128,
    pub session_db: String,
    pub handoff_dir: PathBuf,
    pub app_name: String,
    pub log_file: String,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

fn load_file(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
}

fn default_handoff_dir() -> PathBuf {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".tipjar").join("handoff"))
        .unwrap_or_else(|| PathBuf::from(".tipjar/handoff"))
}

impl Config {
    /// Resolve parsed CLI/env values against the optional file and defaults.
    pub fn from_args(args: &CliArgs) -> Result<Config> {
        let file = match &args.config_file {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                load_file(path)?
            }
            None => ConfigFile::default(),
        };
        Self::resolve(args, file)
    }

    pub fn resolve(args: &CliArgs, file: ConfigFile) -> Result<Config> {
        let network = match args.network {
            Some(n) => n,
            None => match file.network.as_deref() {
                Some(s) => s.parse()?,
                None => Network::Mainnet,
            },
        };

        let node_url = args
            .node_url
            .clone()
            .or(file.node_url)
            .unwrap_or_else(|| network.default_node_url().to_string());
        validate_url(&node_url, "STACKS_NODE_URL")?;
        let node_url = node_url.trim_end_matches('/').to_string();

        let contract: ContractId = args
            .contract
            .clone()
            .or(file.contract)
            .unwrap_or_else(|| DEFAULT_CONTRACT.to_string())
            .parse()
            .context("TIPJAR_CONTRACT")?;
        if !contract.is_on(network) {
            return Err(anyhow!(
                "TIPJAR_CONTRACT {contract} is not deployed from a {network} address"
            ));
        }

        let rpc_timeout_ms = args.rpc_timeout_ms.or(file.rpc_timeout_ms).unwrap_or(8000);
        let rpc_timeout_ms = validate_in_range(rpc_timeout_ms, 1000, 60000, "RPC_TIMEOUT_MS")?;

        let refresh_delay_ms = args
            .refresh_delay_ms
            .or(file.refresh_delay_ms)
            .unwrap_or(3000);
        let refresh_delay_ms = validate_in_range(refresh_delay_ms, 0, 60000, "REFRESH_DELAY_MS")?;

        let wallet_timeout_ms = args
            .wallet_timeout_ms
            .or(file.wallet_timeout_ms)
            .unwrap_or(120_000);
        let wallet_timeout_ms =
            validate_in_range(wallet_timeout_ms, 1000, 600_000, "WALLET_TIMEOUT_MS")?;

        let min_tip_micro = args.min_tip_micro.or(file.min_tip_micro).unwrap_or(1);
        if min_tip_micro == 0 {
            return Err(anyhow!("MIN_TIP_MICRO must be at least 1"));
        }

        let app_name = args
            .app_name
            .clone()
            .or(file.app_name)
            .unwrap_or_else(|| "STX Tip Jar".to_string());
        if app_name.trim().is_empty() {
            return Err(anyhow!("TIPJAR_APP_NAME cannot be empty"));
        }

        Ok(Config {
            network,
            node_url,
            contract,
            rpc_timeout_ms,
            refresh_delay_ms,
            wallet_timeout_ms,
            min_tip_micro,
            session_db: args
                .session_db
                .clone()
                .or(file.session_db)
                .unwrap_or_else(|| "./tipjar_session.db".to_string()),
            handoff_dir: args
                .handoff_dir
                .clone()
                .or(file.handoff_dir)
                .unwrap_or_else(default_handoff_dir),
            app_name,
            log_file: args
                .log_file
                .clone()
                .or(file.log_file)
                .unwrap_or_else(|| "tipjar.log".to_string()),
        })
    }

    /// Print current configuration (useful for debugging)
    pub fn print_summary(&self) {
        eprintln!("Tip Jar Configuration:");
        eprintln!("  Network: {}", self.network);
        eprintln!("  Node URL: {}", self.node_url);
        eprintln!("  Contract: {}", self.contract);
        eprintln!("  RPC Timeout: {}ms", self.rpc_timeout_ms);
        eprintln!("  Refresh Delay: {}ms", self.refresh_delay_ms);
        eprintln!("  Wallet Timeout: {}ms", self.wallet_timeout_ms);
        eprintln!("  Session DB: {}", self.session_db);
        eprintln!("  Handoff Dir: {}", self.handoff_dir.display());
    }
}

/// Parse CLI args (with env fallbacks) and build the configuration.
pub fn load() -> Result<(Config, Option<CliCommand>)> {
    let args = CliArgs::parse();
    let cfg = Config::from_args(&args)?;
    Ok((cfg, args.command))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TESTNET_CONTRACT: &str = "ST000000000000000000002AMW42H.tip-jar";

    #[test]
    fn defaults_are_mainnet_v3() {
        let cfg = Config::resolve(&CliArgs::default(), ConfigFile::default()).unwrap();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.node_url, "https://api.mainnet.hiro.so");
        assert_eq!(cfg.contract.to_string(), DEFAULT_CONTRACT);
        assert_eq!(cfg.refresh_delay_ms, 3000);
        assert_eq!(cfg.min_tip_micro, 1);
    }

    #[test]
    fn cli_beats_file_beats_default() {
        let args = CliArgs {
            rpc_timeout_ms: Some(2000),
            ..Default::default()
        };
        let file = ConfigFile {
            network: Some("testnet".into()),
            contract: Some(TESTNET_CONTRACT.into()),
            rpc_timeout_ms: Some(5000),
            refresh_delay_ms: Some(100),
            ..Default::default()
        };
        let cfg = Config::resolve(&args, file).unwrap();
        assert_eq!(cfg.rpc_timeout_ms, 2000);
        assert_eq!(cfg.refresh_delay_ms, 100);
        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.node_url, "https://api.testnet.hiro.so");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let args = CliArgs {
            rpc_timeout_ms: Some(10),
            ..Default::default()
        };
        assert!(Config::resolve(&args, ConfigFile::default()).is_err());

        let args = CliArgs {
            node_url: Some("ftp://node".into()),
            ..Default::default()
        };
        assert!(Config::resolve(&args, ConfigFile::default()).is_err());
    }

    #[test]
    fn parses_contract_ids() {
        let c: ContractId = "SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWY.tip-jar".parse().unwrap();
        assert_eq!(c.name, "tip-jar");
        assert!("SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWY".parse::<ContractId>().is_err());
        assert!("SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWY.".parse::<ContractId>().is_err());
        assert!("SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWX.tip-jar"
            .parse::<ContractId>()
            .is_err());
    }

    #[test]
    fn file_layer_parses_toml() {
        let file: ConfigFile = toml::from_str(
            r#"
            network = "testnet"
            contract = "ST000000000000000000002AMW42H.tip-jar"
            wallet_timeout_ms = 5000
            "#,
        )
        .unwrap();
        let cfg = Config::resolve(&CliArgs::default(), file).unwrap();
        assert_eq!(cfg.contract.name, "tip-jar");
        assert_eq!(cfg.wallet_timeout_ms, 5000);
    }

    #[test]
    fn contract_must_match_network() {
        let args = CliArgs {
            network: Some(Network::Testnet),
            ..Default::default()
        };
        let err = Config::resolve(&args, ConfigFile::default()).unwrap_err();
        assert!(err.to_string().contains("testnet"), "{err}");

        let args = CliArgs {
            contract: Some(TESTNET_CONTRACT.into()),
            ..Default::default()
        };
        assert!(Config::resolve(&args, ConfigFile::default()).is_err());

        let c: ContractId = TESTNET_CONTRACT.parse().unwrap();
        assert!(c.is_on(Network::Testnet));
        assert!(!c.is_on(Network::Mainnet));
    }

    #[test]
    fn contract_address_is_canonicalized() {
        let c: ContractId = "sp3e0dqahtxjhh5yt9tzcsbw013yxzb25qfdvxxwy.tip-jar".parse().unwrap();
        assert_eq!(c.to_string(), "SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWY.tip-jar");
    }

    #[test]
    fn explorer_link() {
        assert_eq!(
            Network::Mainnet.explorer_tx_url("abc"),
            "https://explorer.hiro.so/txid/0xabc?chain=mainnet"
        );
    }
}
