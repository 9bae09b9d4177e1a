//! Command line access to a JSON-backed configuration.
//!
//!   arbor config.json keys server
//!   arbor config.json set "servers.server(1).port" 8081

use arbor::{ConfigurationBuilder, ConfigurationError, HierarchicalConfiguration};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Query and edit hierarchical configurations stored as JSON")]
struct Args {
    /// The JSON document to load
    file: PathBuf,

    /// Split string values at this character when setting or adding
    #[arg(short, long)]
    list_delimiter: Option<char>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the defined keys, optionally only those below a prefix
    Keys { prefix: Option<String> },
    /// Print the value(s) of a key
    Get { key: String },
    /// Assign a value to a key and print the resulting document
    Set { key: String, value: String },
    /// Add a value below a key and print the resulting document
    Add { key: String, value: String },
    /// Remove a key with everything below it and print the resulting document
    ClearTree { key: String },
    /// Print the loaded document
    Dump,
}

/// Values that parse as JSON are taken as such, anything else as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_document(config: &HierarchicalConfiguration) -> Result<(), ConfigurationError> {
    println!("{}", serde_json::to_string_pretty(&config.to_json())?);
    Ok(())
}

fn main() -> Result<(), ConfigurationError> {
    env_logger::init();
    let args = Args::parse();

    let mut builder = ConfigurationBuilder::new().with_json_file(&args.file)?;
    if let Some(delimiter) = args.list_delimiter {
        builder = builder.with_list_delimiter(delimiter);
    }
    let config = builder.build()?;
    log::info!("Loaded '{}' from {}", config.root_element_name(), args.file.display());

    match args.command {
        Command::Keys { prefix } => {
            let keys = match prefix {
                Some(prefix) => config.get_keys_with_prefix(&prefix)?,
                None => config.get_keys(),
            };
            for key in keys {
                println!("{key}");
            }
        }
        Command::Get { key } => match config.get_property(&key)? {
            Some(Value::String(s)) => println!("{s}"),
            Some(value) => println!("{value}"),
            None => {
                eprintln!("Key '{}' is not defined.", key);
                std::process::exit(1);
            }
        },
        Command::Set { key, value } => {
            config.set_property(&key, parse_value(&value))?;
            print_document(&config)?;
        }
        Command::Add { key, value } => {
            config.add_property(&key, parse_value(&value))?;
            print_document(&config)?;
        }
        Command::ClearTree { key } => {
            config.clear_tree(&key)?;
            print_document(&config)?;
        }
        Command::Dump => print_document(&config)?,
    }
    Ok(())
}
