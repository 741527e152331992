use crate::{
    error::Error,
    ethereum::{parse_address, Address},
    process::OperatingMode,
};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Deserialize;
use std::{collections::HashMap, fs, time::Duration};

/// Default delay between idle ticks
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Default port of the health endpoint
pub const DEFAULT_HEALTH_PORT: u16 = 9966;

/// Supported networks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chain {
    /// Sepolia testnet
    Sepolia,
    /// Local anvil node
    Foundry,
}

impl Chain {
    /// Parse the `CHAIN` value
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name.trim().to_lowercase().as_str() {
            "sepolia" => Ok(Chain::Sepolia),
            "foundry" => Ok(Chain::Foundry),
            other => Err(Error::Config(format!("unsupported chain: {}", other))),
        }
    }

    /// EIP-155 chain ID
    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Sepolia => 11155111,
            Chain::Foundry => 31337,
        }
    }

    /// Key in `deployments.json`, foundry reuses the sepolia layout
    pub fn deployments_key(&self) -> &'static str {
        "sepolia"
    }
}

#[derive(Deserialize, Debug, Clone)]
struct RawDeployments {
    #[serde(rename = "GAME_SETUP")]
    game_setup: String,
    #[serde(rename = "GAME_QUEUE")]
    game_queue: String,
    #[serde(rename = "HEXPLORATION_CONTROLLER")]
    hexploration_controller: String,
    #[serde(rename = "GAMEPLAY")]
    gameplay: String,
}

/// Addresses of the managed contracts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployments {
    /// Game setup, always on mock randomness
    pub game_setup: Address,
    /// Player action queue
    pub game_queue: Address,
    /// Hexploration controller loop
    pub hexploration_controller: Address,
    /// Gameplay loop
    pub gameplay: Address,
}

impl TryFrom<RawDeployments> for Deployments {
    type Error = Error;

    fn try_from(raw: RawDeployments) -> Result<Self, Self::Error> {
        Ok(Deployments {
            game_setup: parse_address(&raw.game_setup)?,
            game_queue: parse_address(&raw.game_queue)?,
            hexploration_controller: parse_address(&raw.hexploration_controller)?,
            gameplay: parse_address(&raw.gameplay)?,
        })
    }
}

impl Deployments {
    /// Addresses given directly, the `DEPLOYMENTS_JSON` form
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let raw: RawDeployments = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid DEPLOYMENTS_JSON: {}", e)))?;
        raw.try_into()
    }

    /// Addresses keyed by network, the `deployments.json` form
    pub fn from_file_content(content: &str, chain: Chain) -> Result<Self, Error> {
        let mut networks: HashMap<String, serde_json::Value> = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("invalid deployments file: {}", e)))?;
        let network = networks.remove(chain.deployments_key()).ok_or_else(|| {
            Error::Config(format!(
                "deployments file has no {} entry",
                chain.deployments_key()
            ))
        })?;
        let raw: RawDeployments = serde_json::from_value(network)
            .map_err(|e| Error::Config(format!("invalid deployments entry: {}", e)))?;
        raw.try_into()
    }
}

/// Worker configuration, fixed for the lifetime of the process
#[derive(Clone)]
pub struct Config {
    /// JSON RPC endpoint
    pub rpc_url: String,
    /// Hex secret key of the worker wallet, also the VRF key
    pub private_key: String,
    /// Delay between idle ticks
    pub poll_interval: Duration,
    /// Debug logging
    pub verbose: bool,
    /// Randomness mode
    pub mode: OperatingMode,
    /// Health endpoint port
    pub health_port: u16,
    /// Target network
    pub chain: Chain,
    /// Managed contracts
    pub deployments: Deployments,
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("poll_interval", &self.poll_interval)
            .field("verbose", &self.verbose)
            .field("mode", &self.mode)
            .field("health_port", &self.health_port)
            .field("chain", &self.chain)
            .field("deployments", &self.deployments)
            .finish()
    }
}

/// Shared arguments, each one falls back to its environment variable
pub fn config_args() -> Vec<Arg> {
    vec![
        Arg::new("rpc-url")
            .long("rpc-url")
            .env("RPC_URL")
            .required(true)
            .help("JSON RPC endpoint"),
        Arg::new("private-key")
            .long("private-key")
            .env("PRIVATE_KEY")
            .hide_env_values(true)
            .required(true)
            .help("Worker secret key, hex"),
        Arg::new("poll-interval-ms")
            .long("poll-interval-ms")
            .env("POLL_INTERVAL_MS")
            .value_parser(clap::value_parser!(u64).range(1..))
            .default_value("5000")
            .help("Delay between idle ticks in milliseconds"),
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .env("VERBOSE")
            .action(ArgAction::SetTrue)
            .help("Log no-op ticks and pacing decisions"),
        Arg::new("use-autoloop-vrf")
            .long("use-autoloop-vrf")
            .env("USE_AUTOLOOP_VRF")
            .action(ArgAction::SetTrue)
            .help("Progress Gameplay with ECVRF envelopes"),
        Arg::new("health-port")
            .long("health-port")
            .env("HEALTH_PORT")
            .value_parser(clap::value_parser!(u16))
            .default_value("9966")
            .help("Port of the health endpoint"),
        Arg::new("chain")
            .long("chain")
            .env("CHAIN")
            .value_parser(["sepolia", "foundry"])
            .default_value("sepolia")
            .help("Target network"),
        Arg::new("deployments-json")
            .long("deployments-json")
            .env("DEPLOYMENTS_JSON")
            .help("Contract addresses as a JSON object, overrides the deployments file"),
        Arg::new("deployments-file")
            .long("deployments-file")
            .env("DEPLOYMENTS_FILE")
            .default_value("deployments.json")
            .help("Deployments file keyed by network"),
    ]
}

/// Command line of the worker
pub fn command() -> Command {
    Command::new("hexploration-worker")
        .about("Fulfills mock randomness and progresses Hexploration game loops")
        .args(config_args())
}

fn required(matches: &ArgMatches, id: &str) -> Result<String, Error> {
    matches
        .get_one::<String>(id)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("missing {}", id)))
}

/// Target network and its contracts, `DEPLOYMENTS_JSON` wins over the file
pub fn deployments_from_matches(matches: &ArgMatches) -> Result<(Chain, Deployments), Error> {
    let chain = Chain::from_name(&required(matches, "chain")?)?;
    let deployments = match matches.get_one::<String>("deployments-json") {
        Some(json) if !json.trim().is_empty() => Deployments::from_json(json)?,
        _ => {
            let path = required(matches, "deployments-file")?;
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("unable to read {}: {}", path, e)))?;
            Deployments::from_file_content(&content, chain)?
        }
    };
    Ok((chain, deployments))
}

impl Config {
    /// Build the configuration from parsed arguments
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, Error> {
        let (chain, deployments) = deployments_from_matches(matches)?;
        Ok(Config {
            rpc_url: required(matches, "rpc-url")?,
            private_key: required(matches, "private-key")?,
            poll_interval: Duration::from_millis(
                matches
                    .get_one::<u64>("poll-interval-ms")
                    .copied()
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            verbose: matches.get_flag("verbose"),
            mode: OperatingMode::from_flag(matches.get_flag("use-autoloop-vrf")),
            health_port: matches
                .get_one::<u16>("health-port")
                .copied()
                .unwrap_or(DEFAULT_HEALTH_PORT),
            chain,
            deployments,
        })
    }
}
