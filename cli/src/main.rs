mod ffi;
mod position;

use std::env;
use std::path::Path;

use zklend_config::ZkLendConfig;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = &args[1];
    let config = ZkLendConfig::global();

    match cmd.as_str() {
        "commitment" => {
            if let Err(e) = ffi::commitment(config, &args[2..]) {
                eprintln!("❌ Error generating commitment: {:#}", e);
                std::process::exit(1);
            }
        }
        "witness" => {
            if let Err(e) = ffi::witness(config, &args[2..]) {
                eprintln!("❌ Error generating witness: {:#}", e);
                std::process::exit(1);
            }
        }
        "transition" => {
            let Some(request) = args.get(2) else {
                println!("Usage: transition <request.json>");
                return;
            };
            if let Err(e) = position::transition(config, Path::new(request)) {
                eprintln!("❌ Error assembling transition: {:#}", e);
                std::process::exit(1);
            }
        }
        "calldata" => {
            if args.len() < 5 {
                println!("Usage: calldata <transition.json> <proof-hex> <token>");
                println!("  token - configured token name (usdc, weth) or 0x address");
                return;
            }
            if let Err(e) = position::calldata(config, Path::new(&args[2]), &args[3], &args[4]) {
                eprintln!("❌ Error encoding calldata: {:#}", e);
                std::process::exit(1);
            }
        }
        "zeros" => {
            if args.len() < 4 {
                println!("Usage: zeros <z0> <height>");
                return;
            }
            if let Err(e) = position::zeros(config, &args[2], &args[3]) {
                eprintln!("❌ Error deriving zero values: {:#}", e);
                std::process::exit(1);
            }
        }
        "check-zeros" => {
            if let Err(e) = position::check_zeros(config) {
                eprintln!("❌ {:#}", e);
                std::process::exit(1);
            }
        }
        "config" => {
            print!("{}", ZkLendConfig::generate_sample());
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("zklend - confidential lending position tool");
    println!();
    println!("USAGE:");
    println!("  zklend <command> [args]");
    println!();
    println!("POSITION COMMANDS:");
    println!("  transition <request.json>              Assemble note, commitment and prover input");
    println!("  calldata <transition.json> <proof> <token>");
    println!("                                         Encode the ledger call for a proved transition");
    println!();
    println!("CONTRACT TEST COMMANDS:");
    println!("  commitment <lend> <borrow> <liq> <ts>  abi.encode(commitment, nullifier, secret)");
    println!("  witness <lend> <borrow> <liq> <ts> <nullifier> <secret> [leaves...]");
    println!("                                         abi.encode(0, root, nullifierHash)");
    println!();
    println!("TREE COMMANDS:");
    println!("  zeros <z0> <height>                    Derive a zero value table");
    println!("  check-zeros                            Verify the configured zero table");
    println!();
    println!("OTHER COMMANDS:");
    println!("  config                                 Print a sample config.toml");
    println!("  help                                   Show this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  ZK_CONFIG            Path to config.toml");
    println!("  ZK_TREE_HEIGHT       Tree height (needs a matching ZK_ZERO_VALUES)");
    println!("  ZK_ZERO_VALUES       Comma separated hex zero values, leaf level first");
    println!("  ZK_COMMITMENT_HASHER poseidon | poseidon-sponge | packed-keccak | keccak");
    println!("  ZK_NODE_HASHER       poseidon | poseidon-sponge | keccak");
    println!("  ZK_LEDGER_ADDRESS    Lending contract address");
    println!("  RUST_LOG             Log level (debug/info/warn/error)");
}
