use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use lucky_beacon::{
    BeaconChain, BeaconRound, BeaconSource, DrandHttpClient, DEFAULT_BASE_URL, QUICKNET_CHAIN_HASH,
};
use lucky_config::{ServiceConfig, ADMIN_KEY_ENV};
use lucky_orchestrator::SelectionRecord;
use lucky_rpc::LuckyApiClient;
use lucky_selection::{
    assign_prizes, derive_seed, select_winners_with_limit, verify_assignment, Address, MinterPool,
    PrizeTable, SelectionSeed, WinnerAssignment, MAX_REGULAR_WINNERS,
};

/// Lucky Mint CLI
#[derive(Parser)]
#[command(name = "lucky", version, about = "Lucky Mint winner selection: verify and administer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the selection seed from (randomness, contract, round)
    Seed {
        /// Beacon randomness, hex as published
        #[arg(long)]
        randomness: String,

        /// Mint contract address
        #[arg(long)]
        contract: String,

        /// Beacon round
        #[arg(long)]
        round: u64,
    },

    /// Run the selection over a pool file
    Select {
        /// Pool file: one address per line, or a JSON array, in first-mint order
        #[arg(long)]
        pool: PathBuf,

        #[arg(long)]
        contract: String,

        #[arg(long)]
        round: u64,

        #[arg(long)]
        randomness: String,

        /// Regular winner cap
        #[arg(long, default_value_t = MAX_REGULAR_WINNERS)]
        max_regular: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Re-derive a published selection and compare
    Verify {
        /// Pool file in first-mint order
        #[arg(long)]
        pool: PathBuf,

        /// Published selection: a selection record (from `lucky selection`)
        /// or a bare assignment JSON
        #[arg(long)]
        expected: PathBuf,

        /// Required when `expected` is a bare assignment
        #[arg(long)]
        contract: Option<String>,

        #[arg(long)]
        round: Option<u64>,

        /// Fetched from the beacon when omitted
        #[arg(long)]
        randomness: Option<String>,

        #[arg(long, default_value = DEFAULT_BASE_URL)]
        beacon_url: String,
    },

    /// Fetch a beacon round and check its randomness
    Beacon {
        /// Round number (latest when omitted)
        #[arg(long)]
        round: Option<u64>,

        #[arg(long, default_value = DEFAULT_BASE_URL)]
        beacon_url: String,

        #[arg(long, default_value = QUICKNET_CHAIN_HASH)]
        chain_hash: String,
    },

    /// Ask a running server for the current winners
    Winners {
        #[arg(long, default_value = "http://127.0.0.1:8645")]
        url: String,

        /// Label shown in the server's logs
        #[arg(long)]
        client: Option<String>,
    },

    /// Download the stored selection record from a running server
    Selection {
        #[arg(long, default_value = "http://127.0.0.1:8645")]
        url: String,
    },

    /// Admin: clear the selection on a running server
    Reset {
        #[arg(long, default_value = "http://127.0.0.1:8645")]
        url: String,

        #[arg(long, env = ADMIN_KEY_ENV)]
        api_key: String,
    },

    /// Admin: audit a beacon round through a running server
    VerifyRound {
        #[arg(long, default_value = "http://127.0.0.1:8645")]
        url: String,

        #[arg(long, env = ADMIN_KEY_ENV)]
        api_key: String,

        #[arg(long)]
        round: u64,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default config file
    Init {
        #[arg(long, default_value = "lucky.toml")]
        output: PathBuf,
    },

    /// Load and validate a config file
    Check {
        #[arg(long, default_value = "lucky.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Seed {
            randomness,
            contract,
            round,
        } => cmd_seed(&randomness, &contract, round),
        Commands::Select {
            pool,
            contract,
            round,
            randomness,
            max_regular,
            json,
        } => cmd_select(&pool, &contract, round, &randomness, max_regular, json),
        Commands::Verify {
            pool,
            expected,
            contract,
            round,
            randomness,
            beacon_url,
        } => cmd_verify(&pool, &expected, contract, round, randomness, &beacon_url).await,
        Commands::Beacon {
            round,
            beacon_url,
            chain_hash,
        } => cmd_beacon(round, &beacon_url, &chain_hash).await,
        Commands::Winners { url, client } => cmd_winners(&url, client).await,
        Commands::Selection { url } => cmd_selection(&url).await,
        Commands::Reset { url, api_key } => cmd_reset(&url, api_key).await,
        Commands::VerifyRound {
            url,
            api_key,
            round,
        } => cmd_verify_round(&url, api_key, round).await,
        Commands::Config { command } => match command {
            ConfigCommands::Init { output } => cmd_config_init(output),
            ConfigCommands::Check { path } => cmd_config_check(&path),
        },
    }
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn parse_address(s: &str) -> Address {
    s.parse().unwrap_or_else(|e| fail(e))
}

/// Parse a pool: a JSON array of addresses, or one address per line
/// (blank lines and `#` comments ignored). Order is preserved; repeats keep
/// their first position.
fn parse_pool(contents: &str) -> Result<(MinterPool, usize), String> {
    let raw: Vec<Address> = if contents.trim_start().starts_with('[') {
        let strings: Vec<String> = serde_json::from_str(contents).map_err(|e| e.to_string())?;
        strings
            .iter()
            .map(|s| s.parse().map_err(|e| format!("{e}")))
            .collect::<Result<_, _>>()?
    } else {
        contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .enumerate()
            .map(|(i, l)| l.parse().map_err(|e| format!("entry {}: {e}", i + 1)))
            .collect::<Result<_, _>>()?
    };
    let total = raw.len();
    let pool = MinterPool::from_addresses(raw);
    let duplicates = total - pool.len();
    Ok((pool, duplicates))
}

fn load_pool(path: &Path) -> MinterPool {
    let contents = std::fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("reading {}: {e}", path.display())));
    let (pool, duplicates) = parse_pool(&contents).unwrap_or_else(|e| fail(e));
    if duplicates > 0 {
        eprintln!("Note: dropped {duplicates} repeated address(es) from the pool");
    }
    pool
}

/// A published selection: a full record or a bare assignment.
fn parse_expected(contents: &str) -> Result<(WinnerAssignment, Option<SelectionRecord>), String> {
    if let Ok(record) = serde_json::from_str::<SelectionRecord>(contents) {
        return Ok((record.assignment.clone(), Some(record)));
    }
    serde_json::from_str::<WinnerAssignment>(contents)
        .map(|a| (a, None))
        .map_err(|e| format!("not a selection record or assignment: {e}"))
}

/// Same text as the `seed` field of a stored selection record.
fn seed_line(seed: &SelectionSeed) -> String {
    format!("Seed: {}", seed.to_hex())
}

fn rpc_client(url: &str) -> HttpClient {
    HttpClientBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .build(url)
        .unwrap_or_else(|e| fail(e))
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => fail(e),
    }
}

fn cmd_seed(randomness: &str, contract: &str, round: u64) {
    let seed = derive_seed(randomness, &parse_address(contract), round);
    println!("{}", seed_line(&seed));
    println!("Shuffle state (low 32 bits): {}", seed.low_u32());
}

fn cmd_select(
    pool_path: &Path,
    contract: &str,
    round: u64,
    randomness: &str,
    max_regular: usize,
    json: bool,
) {
    let pool = load_pool(pool_path);
    let seed = derive_seed(randomness, &parse_address(contract), round);
    let assignment = select_winners_with_limit(pool.as_slice(), &seed, max_regular);

    if json {
        print_json(&assignment);
        return;
    }

    println!("Pool: {} addresses", pool.len());
    println!("{}", seed_line(&seed));
    for (i, w) in assign_prizes(&assignment, &PrizeTable::default(), round)
        .iter()
        .enumerate()
    {
        println!(
            "  {:>2}. {} {:<7} {} DEGEN + {} MYU",
            i + 1,
            w.address,
            w.tier.to_string(),
            w.prize.degen,
            w.prize.myu
        );
    }
}

async fn cmd_verify(
    pool_path: &Path,
    expected_path: &Path,
    contract: Option<String>,
    round: Option<u64>,
    randomness: Option<String>,
    beacon_url: &str,
) {
    let pool = load_pool(pool_path);
    let contents = std::fs::read_to_string(expected_path)
        .unwrap_or_else(|e| fail(format!("reading {}: {e}", expected_path.display())));
    let (published, record) = parse_expected(&contents).unwrap_or_else(|e| fail(e));

    let contract = contract
        .map(|c| parse_address(&c))
        .or(record.as_ref().map(|r| r.contract))
        .unwrap_or_else(|| fail("--contract is required for a bare assignment"));
    let round = round
        .or(record.as_ref().map(|r| r.round))
        .unwrap_or_else(|| fail("--round is required for a bare assignment"));
    let max_regular = record
        .as_ref()
        .map(|r| r.max_regular_winners)
        .unwrap_or(MAX_REGULAR_WINNERS);

    if let Some(r) = &record {
        let digest = hex::encode(pool.digest());
        if r.pool_size != pool.len() || r.pool_digest != digest {
            println!("WARNING: pool differs from the published snapshot");
            println!("  published: {} addresses, digest {}", r.pool_size, r.pool_digest);
            println!("  local:     {} addresses, digest {}", pool.len(), digest);
        }
    }

    let randomness = match randomness {
        Some(r) => r,
        None => {
            let chain = BeaconChain {
                base_url: beacon_url.to_string(),
                ..BeaconChain::default()
            };
            let client = DrandHttpClient::new(chain, Duration::from_secs(10))
                .unwrap_or_else(|e| fail(e));
            tracing::debug!(round, "fetching beacon round");
            let beacon = client
                .fetch(BeaconRound::Number(round))
                .await
                .unwrap_or_else(|e| fail(format!("fetching round {round}: {e}")));
            if let Some(r) = &record {
                if r.randomness != beacon.randomness {
                    println!("WARNING: published randomness differs from the beacon's");
                }
            }
            beacon.randomness
        }
    };

    match verify_assignment(pool.as_slice(), &contract, round, &randomness, max_regular, &published) {
        Ok(seed) => {
            println!("MATCH: selection reproduced from round {round}");
            println!("  {}", seed_line(&seed));
            println!("  Winners: {}", published.len());
        }
        Err(e) => {
            println!("MISMATCH: {e}");
            std::process::exit(2);
        }
    }
}

async fn cmd_beacon(round: Option<u64>, beacon_url: &str, chain_hash: &str) {
    let chain = BeaconChain {
        base_url: beacon_url.to_string(),
        chain_hash: chain_hash.to_string(),
        ..BeaconChain::default()
    };
    let client = DrandHttpClient::new(chain, Duration::from_secs(10)).unwrap_or_else(|e| fail(e));
    let beacon = client
        .fetch(BeaconRound::from(round))
        .await
        .unwrap_or_else(|e| fail(e));

    println!("Round:      {}", beacon.round);
    println!("Randomness: {}", beacon.randomness);
    println!("Signature:  {}", beacon.signature);
    println!("Published:  {}", client.chain().round_time(beacon.round));
    println!("Randomness check: ok (sha256(signature))");
}

async fn cmd_winners(url: &str, client_id: Option<String>) {
    let client = rpc_client(url);
    let resp = client.get_winners(client_id).await.unwrap_or_else(|e| fail(e));
    print_json(&resp);
}

async fn cmd_selection(url: &str) {
    let client = rpc_client(url);
    match client.get_selection().await.unwrap_or_else(|e| fail(e)) {
        Some(record) => print_json(&record),
        None => fail("no selection stored"),
    }
}

async fn cmd_reset(url: &str, api_key: String) {
    let client = rpc_client(url);
    let resp = client.reset_selection(api_key).await.unwrap_or_else(|e| fail(e));
    println!(
        "Selection reset (cache cleared: {}, marker cleared: {})",
        resp.cache_cleared, resp.marker_cleared
    );
}

async fn cmd_verify_round(url: &str, api_key: String, round: u64) {
    let client = rpc_client(url);
    let resp = client
        .verify_round(api_key, round)
        .await
        .unwrap_or_else(|e| fail(e));
    print_json(&resp);
}

fn cmd_config_init(output: PathBuf) {
    ServiceConfig::default()
        .to_file(&output)
        .unwrap_or_else(|e| fail(format!("writing config: {e}")));
    println!("Default config written to {}", output.display());
}

fn cmd_config_check(path: &Path) {
    let config = ServiceConfig::load(Some(path)).unwrap_or_else(|e| fail(e));
    println!("Config OK");
    println!("  Contract: {}", config.contract.address);
    println!("  Listen:   {}", config.listen_addr());
    println!(
        "  Admin:    {}",
        if config.admin.api_key.is_some() { "enabled" } else { "disabled" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn seed_line_matches_record_field() {
        let contract: Address = "0xC80577C2C0e860fC2935c809609Fa46456cECC51".parse().unwrap();
        let seed = derive_seed(&"deadbeef".repeat(8), &contract, 100);
        assert_eq!(
            seed_line(&seed),
            "Seed: 0xe689e3c1c91e33c0ca4f3c049f0b48c559c885a3eb88f47534657e0c66bb9ea2"
        );
    }

    #[test]
    fn pool_from_lines() {
        let contents = format!(
            "# minters\n{}\n\n{}\n{}\n",
            addr(1).to_lower_hex(),
            addr(2),
            addr(1).to_lower_hex()
        );
        let (pool, dups) = parse_pool(&contents).unwrap();
        assert_eq!(pool.as_slice(), &[addr(1), addr(2)]);
        assert_eq!(dups, 1);
    }

    #[test]
    fn pool_from_json() {
        let contents = serde_json::to_string(&vec![addr(3), addr(4)]).unwrap();
        let (pool, dups) = parse_pool(&contents).unwrap();
        assert_eq!(pool.as_slice(), &[addr(3), addr(4)]);
        assert_eq!(dups, 0);
    }

    #[test]
    fn bad_pool_entry_is_reported() {
        let err = parse_pool("0x1234\n").unwrap_err();
        assert!(err.contains("entry 1"));
    }

    #[test]
    fn expected_as_bare_assignment() {
        let assignment = WinnerAssignment {
            super_winner: Some(addr(1)),
            regular_winners: vec![addr(2)],
        };
        let json = serde_json::to_string(&assignment).unwrap();
        let (parsed, record) = parse_expected(&json).unwrap();
        assert_eq!(parsed, assignment);
        assert!(record.is_none());
        assert!(parse_expected("{}").is_err());
    }

    #[test]
    fn cli_parses_verify() {
        let cli = Cli::try_parse_from([
            "lucky", "verify", "--pool", "pool.txt", "--expected", "record.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Verify {
                contract,
                randomness,
                beacon_url,
                ..
            } => {
                assert!(contract.is_none());
                assert!(randomness.is_none());
                assert_eq!(beacon_url, DEFAULT_BASE_URL);
            }
            _ => panic!("wrong subcommand"),
        }
    }
}
