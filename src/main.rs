use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, error};

use etcd_v2_client::{Client, ClientConfig, KeysResult, WatchOptions};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "etcdv2")]
#[command(about = "Command line client for the etcd v2 keyspace API")]
struct Args {
    /// etcd endpoint. Defaults to ETCD_ENDPOINT or http://127.0.0.1:4001.
    #[arg(short, long)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the value of a key
    Get { key: String },
    /// Set a key
    Set {
        key: String,
        value: String,
        /// Time to live in seconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Delete a key
    Rm { key: String },
    /// Create a directory
    Mkdir { key: String },
    /// Delete an empty directory
    Rmdir { key: String },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        key: String,
    },
    /// Set a key only if its current value matches
    Cas {
        key: String,
        prev_value: String,
        value: String,
    },
    /// Wait for the next change at or below a key
    Watch {
        key: String,
        /// Wait for a change at or after this index
        #[arg(long)]
        index: Option<u64>,
        /// Watch the whole subtree
        #[arg(short, long)]
        recursive: bool,
    },
    /// Print the server version
    Version,
}

/// Runs one command. Missing keys exit with failure but are not errors.
async fn run(client: &Client, command: Command) -> etcd_v2_client::Result<ExitCode> {
    match command {
        Command::Get { key } => match client.get(&key).await? {
            Some(result) => print_node_value(&result),
            None => {
                eprintln!("Key not found: {}", key);
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Set { key, value, ttl } => {
            let result = client.set_with_ttl(&key, &value, ttl).await?;
            print_node_value(&result);
        }
        Command::Rm { key } => println!("{}", client.delete(&key).await?),
        Command::Mkdir { key } => println!("{}", client.create_directory(&key).await?),
        Command::Rmdir { key } => println!("{}", client.delete_directory(&key).await?),
        Command::Ls { key } => match client.list_directory(&key).await? {
            Some(nodes) => {
                for node in nodes {
                    println!("{}{}", node.key, if node.dir { "/" } else { "" });
                }
            }
            None => {
                eprintln!("Directory not found: {}", key);
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Cas { key, prev_value, value } => {
            let result = client.cas(&key, &prev_value, &value).await?;
            if result.is_error() {
                eprintln!(
                    "Compare failed: {}",
                    result.cause.as_deref().or(result.message.as_deref()).unwrap_or("")
                );
            }
            println!("{}", result);
        }
        Command::Watch { key, index, recursive } => {
            let options = WatchOptions {
                wait_index: index,
                recursive,
            };
            println!("{}", client.watch(&key, options).await?);
        }
        Command::Version => println!("{}", client.version().await?),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_node_value(result: &KeysResult) {
    match result.value() {
        Some(value) => println!("{}", value),
        None => println!("{}", result),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = ClientConfig::from_env();
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    debug!("Using endpoint {}", config.endpoint);

    let client = match Client::with_config(config) {
        Ok(client) => client,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&client, args.command).await;
    client.close();

    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
