//! Operator tooling for the worker VRF key
#![deny(
    unused,
    warnings,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    missing_docs,
    unused_imports
)]
#![forbid(unsafe_code)]

use clap::{arg, ArgMatches, Command};
use dotenv::dotenv;
use ethnum::U256;
use tai_vrf::{
    compute_fast_verify_params, envelope::encode_vrf_envelope, extends::AffineExtend,
    helper::compute_seed, KeyPair, ECVRF,
};
use worker::{
    abi,
    chain::{ChainClient, EvmChain},
    config::{config_args, deployments_from_matches, Config},
    ethereum::{format_address, parse_address, Address},
    rpc::{from_hex, to_hex, RpcClient},
    Error,
};

fn cli() -> Command {
    let state = arg!(state: <STATE> "on or off")
        .value_parser(["on", "off"]);
    Command::new("vrf-cli")
        .about("Hexploration VRF key and proof tooling")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args(config_args().into_iter().map(|arg| arg.required(false)))
        .subcommand(Command::new("public-key").about("Print the VRF public key and address"))
        .subcommand(
            Command::new("register-key")
                .about("Register the VRF public key of the worker on Gameplay"),
        )
        .subcommand(
            Command::new("prove")
                .about("Prove the seed of a loop and print the envelope")
                .arg(arg!(address: <ADDRESS> "Loop contract address"))
                .arg(arg!(loop_id: <LOOP_ID> "Loop ID, decimal or 0x prefixed hex"))
                .arg(arg!(payload: [PAYLOAD] "Loop payload, 0x prefixed hex"))
                .arg_required_else_help(true),
        )
        .subcommand(
            Command::new("autoloop-vrf")
                .about("Toggle AutoLoop VRF on Queue and Gameplay")
                .arg(state)
                .arg_required_else_help(true),
        )
        .subcommand(
            Command::new("enable-mock-vrf")
                .about("Switch GameSetup and Queue to mock VRF, needs the admin key"),
        )
        .subcommand(Command::new("status").about("Read only report of the game contracts"))
}

fn argument<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a String, Error> {
    matches
        .get_one::<String>(id)
        .ok_or_else(|| Error::Config(format!("missing {}", id)))
}

fn key_pair(matches: &ArgMatches) -> Result<KeyPair, Error> {
    Ok(KeyPair::from_hex(argument(matches, "private-key")?)?)
}

async fn connect(config: &Config, key_pair: &KeyPair) -> Result<EvmChain, Error> {
    EvmChain::connect(&config.rpc_url, key_pair, config.chain.chain_id()).await
}

fn public_key(key_pair: &KeyPair) {
    let ecvrf = ECVRF::new(key_pair.secret_key);
    let [x, y] = ecvrf.public_key().to_words();
    println!("Worker address: {}", format_address(&key_pair.address()));
    println!("Public key:");
    println!("  x: 0x{:064x}", x);
    println!("  y: 0x{:064x}", y);
}

async fn register_key(config: &Config, key_pair: &KeyPair) -> Result<(), Error> {
    let chain = connect(config, key_pair).await?;
    let gameplay = config.deployments.gameplay;
    let worker = chain.sender();
    println!("Gameplay contract: {}", format_address(&gameplay));
    public_key(key_pair);

    if chain.controller_key_registered(&gameplay, &worker).await? {
        println!("Key already registered for this controller. Done.");
        return Ok(());
    }

    println!("Registering key...");
    let [x, y] = ECVRF::new(key_pair.secret_key).public_key().to_words();
    let receipt = chain
        .register_controller_key(&gameplay, &worker, x, y)
        .await?;
    println!(
        "Key registered (block {}, tx {})",
        receipt.block_number, receipt.transaction_hash
    );
    Ok(())
}

fn prove(matches: &ArgMatches, key_pair: &KeyPair) -> Result<(), Error> {
    let address = parse_address(argument(matches, "address")?)?;
    let loop_id = U256::from_str_prefixed(argument(matches, "loop_id")?.trim())
        .map_err(|_| Error::Config("invalid loop ID".to_string()))?;
    let payload = match matches.get_one::<String>("payload") {
        Some(payload) => from_hex(payload.trim())?,
        None => Vec::new(),
    };

    let seed = compute_seed(&address, loop_id);
    let ecvrf = ECVRF::new(key_pair.secret_key);
    let proof = ecvrf.prove(&seed)?;
    let params = compute_fast_verify_params(&proof.pk, &proof, &seed)?;
    let [gamma_x, gamma_y, c, s] = proof.to_words();
    let [u_x, u_y] = params.u_point.to_words();
    let [sh_x, sh_y] = params.v_components.0.to_words();
    let [cg_x, cg_y] = params.v_components.1.to_words();
    let envelope = encode_vrf_envelope(&proof, &params, &payload);

    println!("seed:       {}", to_hex(&seed));
    println!("gamma:      0x{:064x} 0x{:064x}", gamma_x, gamma_y);
    println!("c:          0x{:064x}", c);
    println!("s:          0x{:064x}", s);
    println!("u:          0x{:064x} 0x{:064x}", u_x, u_y);
    println!("s * H:      0x{:064x} 0x{:064x}", sh_x, sh_y);
    println!("c * gamma:  0x{:064x} 0x{:064x}", cg_x, cg_y);
    println!("randomness: {}", to_hex(&proof.randomness()));
    println!("verified:   {}", ecvrf.verify(&seed, &proof));
    println!("envelope:   {}", to_hex(&envelope));
    Ok(())
}

async fn autoloop_vrf(config: &Config, key_pair: &KeyPair, enabled: bool) -> Result<(), Error> {
    let chain = connect(config, key_pair).await?;
    let queue = config.deployments.game_queue;
    let gameplay = config.deployments.gameplay;
    println!("Caller: {}", format_address(&chain.sender()));

    if enabled {
        if !chain
            .controller_key_registered(&gameplay, &chain.sender())
            .await?
        {
            return Err(Error::MissingKeyRegistration);
        }
        println!("VRF key registered: yes");
    }

    for (label, address) in [("Queue", queue), ("Gameplay", gameplay)] {
        println!(
            "Setting useAutoLoopVRF={} on {} ({})...",
            enabled,
            label,
            format_address(&address)
        );
        let receipt = chain.set_use_autoloop_vrf(&address, enabled).await?;
        println!("  Done (tx {})", receipt.transaction_hash);
    }

    println!("Status:");
    let queue_flag = chain.use_autoloop_vrf(&queue).await?;
    let gameplay_flag = chain.use_autoloop_vrf(&gameplay).await?;
    println!("  Queue.useAutoLoopVRF = {}", queue_flag);
    println!("  Gameplay.useAutoLoopVRF = {}", gameplay_flag);
    Ok(())
}

async fn enable_mock_vrf(config: &Config, key_pair: &KeyPair) -> Result<(), Error> {
    let chain = connect(config, key_pair).await?;
    println!("Admin: {}", format_address(&chain.sender()));

    for (label, address) in [
        ("GAME_SETUP", config.deployments.game_setup),
        ("GAME_QUEUE", config.deployments.game_queue),
    ] {
        println!("{} ({}):", label, format_address(&address));
        if chain.use_mock_vrf(&address).await? {
            println!("  Already using mock VRF, skipping");
            continue;
        }
        println!("  Sending setVRFSubscriptionID(0)...");
        let receipt = chain.set_vrf_subscription_id(&address, 0).await?;
        println!(
            "  Confirmed in block {} (tx {})",
            receipt.block_number, receipt.transaction_hash
        );
        println!("  useMockVRF = {}", chain.use_mock_vrf(&address).await?);
    }
    println!("Done, vrf-cli status shows the new state");
    Ok(())
}

async fn read(rpc: &RpcClient, address: &Address, signature: &str) -> Result<Vec<u8>, Error> {
    rpc.call(address, &abi::encode_call(signature, &[])).await
}

/// Failed reads are reported inline, the report goes on
fn shown(value: Result<String, Error>) -> String {
    value.unwrap_or_else(|err| format!("ERROR: {}", err))
}

fn flag(data: Result<Vec<u8>, Error>) -> String {
    let value = data.and_then(|d| abi::decode_bool(&d));
    shown(value.map(|b| b.to_string()))
}

fn list(values: &[U256]) -> String {
    if values.is_empty() {
        return "[0] (none)".to_string();
    }
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}] {}", values.len(), items.join(", "))
}

fn loop_state(ready: bool, data: &[u8]) -> String {
    let data = match data.len() {
        0 => "(empty)".to_string(),
        1..=8 => to_hex(data),
        _ => format!("{}...", to_hex(&data[..8])),
    };
    format!("ready: {}, data: {}", ready, data)
}

async fn status(matches: &ArgMatches) -> Result<(), Error> {
    let rpc = RpcClient::new(argument(matches, "rpc-url")?)?;
    let (chain, deployments) = deployments_from_matches(matches)?;
    println!(
        "=== Hexploration contract status ({:?}, chain ID {}) ===",
        chain,
        rpc.chain_id().await?
    );

    for (label, address) in [
        ("GAME_SETUP", deployments.game_setup),
        ("GAME_QUEUE", deployments.game_queue),
    ] {
        let mock = read(&rpc, &address, abi::USE_MOCK_VRF).await;
        let chainlink = read(&rpc, &address, abi::USE_CHAINLINK_VRF).await;
        let requests = read(&rpc, &address, abi::GET_MOCK_REQUESTS).await;
        println!("{} ({}):", label, format_address(&address));
        let requests = requests.and_then(|d| abi::decode_uint_array(&d));
        println!("  useMockVRF      = {}", flag(mock));
        println!("  useChainlinkVRF = {}", flag(chainlink));
        println!("  mockRequests    = {}", shown(requests.map(|r| list(&r))));
    }

    for (label, address) in [
        ("GAME_SETUP", deployments.game_setup),
        ("HEXPLORATION_CONTROLLER", deployments.hexploration_controller),
        ("GAMEPLAY", deployments.gameplay),
    ] {
        let progress = read(&rpc, &address, abi::SHOULD_PROGRESS_LOOP).await;
        let progress = progress.and_then(|d| abi::decode_bool_bytes(&d));
        println!("{} ({}):", label, format_address(&address));
        println!(
            "  shouldProgressLoop = {}",
            shown(progress.map(|(ready, data)| loop_state(ready, &data)))
        );
        if address == deployments.hexploration_controller {
            let games = read(&rpc, &address, abi::GET_ACTIVE_GAMES).await;
            let games = games.and_then(|d| abi::decode_uint_array(&d));
            println!("  activeGames        = {}", shown(games.map(|g| list(&g))));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("public-key", _)) => public_key(&key_pair(&matches)?),
        Some(("register-key", _)) => {
            register_key(&Config::from_matches(&matches)?, &key_pair(&matches)?).await?
        }
        Some(("prove", sub_matches)) => prove(sub_matches, &key_pair(&matches)?)?,
        Some(("autoloop-vrf", sub_matches)) => {
            let enabled = argument(sub_matches, "state")? == "on";
            let config = Config::from_matches(&matches)?;
            autoloop_vrf(&config, &key_pair(&matches)?, enabled).await?
        }
        Some(("enable-mock-vrf", _)) => {
            enable_mock_vrf(&Config::from_matches(&matches)?, &key_pair(&matches)?).await?
        }
        Some(("status", _)) => status(&matches).await?,
        _ => unreachable!(), // subcommand_required
    }

    Ok(())
}
