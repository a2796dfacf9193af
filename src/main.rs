//! fraud-ring-engine CLI
//!
//! Run fraud ring detection from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a batch of transactions
//! fraud-ring-engine analyze --input transactions.json
//!
//! # Only run the cycle detector, emit JSON
//! fraud-ring-engine analyze --input transactions.json --mode cycles --format json
//!
//! # Generate a random batch for testing
//! fraud-ring-engine generate --accounts 50 --transactions 400
//! ```

use fraud_ring_engine::core::transaction::TransactionBatch;
use fraud_ring_engine::pipeline::{analyze, DetectionMode};
use fraud_ring_engine::simulation::generator::{generate_random_batch, BatchConfig};
use std::fs;
use std::process;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!(
        r#"fraud-ring-engine — deterministic fraud ring detection over transaction graphs

USAGE:
    fraud-ring-engine <COMMAND> [OPTIONS]

COMMANDS:
    analyze     Run the detection pipeline on a transaction batch
    generate    Generate a random transaction batch (for testing)
    help        Show this message

OPTIONS (analyze):
    --input <FILE>      Path to JSON transactions file
    --mode <MODE>       Detectors to run: all (default), cycles, fan-in, fan-out, shell
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (generate):
    --accounts <N>      Number of accounts (default: 20)
    --transactions <N>  Number of transactions (default: 100)
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    fraud-ring-engine analyze --input transactions.json
    fraud-ring-engine analyze --input transactions.json --mode fan-in --format json
    fraud-ring-engine generate --accounts 50 --transactions 400 --output test.json"#
    );
}

fn load_batch(path: &str) -> TransactionBatch {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "transactions": [
    {{
      "transaction_id": "TX-0001",
      "sender_id": "ACC-A",
      "receiver_id": "ACC-B",
      "amount": "5000",
      "timestamp": "2024-03-01 09:30:00"
    }}
  ]
}}"#
        );
        process::exit(1);
    })
}

fn cmd_analyze(args: &[String]) {
    let mut input_path = None;
    let mut mode = DetectionMode::All;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--mode" => {
                i += 1;
                let raw = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--mode requires a detection mode");
                    process::exit(1);
                });
                mode = raw.parse().unwrap_or_else(|e| {
                    eprintln!("{}", e);
                    process::exit(1);
                });
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let batch = load_batch(&path);
    let result = analyze(batch, mode);

    if format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                eprintln!("Error serializing result: {}", e);
                process::exit(1);
            })
        );
    } else {
        println!("{}", result);
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = BatchConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--accounts" => {
                i += 1;
                config.account_count =
                    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                        eprintln!("--accounts requires a number");
                        process::exit(1);
                    });
            }
            "--transactions" => {
                i += 1;
                config.transaction_count =
                    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                        eprintln!("--transactions requires a number");
                        process::exit(1);
                    });
            }
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let batch = generate_random_batch(&config);
    let json = serde_json::to_string_pretty(&batch).unwrap_or_else(|e| {
        eprintln!("Error serializing batch: {}", e);
        process::exit(1);
    });

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} transactions across {} accounts → {}",
            batch.len(),
            config.account_count,
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "analyze" => cmd_analyze(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
