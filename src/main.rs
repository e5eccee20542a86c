//! # Judgment Archive CLI Driver
//!
//! ## Purpose
//! Command line entry point for the judgment retrieval system. Resolves cases,
//! fetches judgment documents out of the remote shard archives, and reports on
//! the combined dataset.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, command line arguments, environment variables
//! - **Output**: Document bytes to a file, resolved records as JSON, dataset stats
//! - **Exit code**: non-zero when the requested item could not be retrieved
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Construct the retrieval service (caches, client, resolvers)
//! 4. Run the requested subcommand

use clap::{Arg, ArgMatches, Command};
use std::collections::HashSet;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use judgment_archive::{Config, Result, RetrievalError, RetrievalService};

#[tokio::main]
async fn main() -> ExitCode {
    let matches = Command::new("judgment-archive-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resolve and retrieve court judgments from the remote archive store")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (defaults apply when absent)"),
        )
        .subcommand(
            Command::new("fetch")
                .about("Fetch one judgment document and write it to a file")
                .arg(Arg::new("year").required(true).value_parser(clap::value_parser!(u16)))
                .arg(Arg::new("case-id").required(true))
                .arg(
                    Arg::new("language")
                        .short('l')
                        .long("language")
                        .default_value("english"),
                )
                .arg(
                    Arg::new("path")
                        .long("path")
                        .value_name("REMOTE_PATH")
                        .help("Known document path; skips case resolution"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Output file (defaults to the document filename)"),
                ),
        )
        .subcommand(
            Command::new("resolve")
                .about("Resolve a case identifier and print the record as JSON")
                .arg(Arg::new("year").required(true).value_parser(clap::value_parser!(u16)))
                .arg(Arg::new("case-id").required(true)),
        )
        .subcommand(
            Command::new("dataset")
                .about("Build the combined dataset and print summary statistics")
                .arg(
                    Arg::new("years")
                        .long("years")
                        .value_name("YEARS")
                        .help("Comma-separated year filter, e.g. 1975,2020,2021"),
                ),
        )
        .subcommand_required(true)
        .get_matches();

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("Logging error: {}", e);
        return ExitCode::FAILURE;
    }

    let service = match RetrievalService::new(config) {
        Ok(service) => service,
        Err(e) => {
            error!(category = e.category(), error = %e, "Service initialization failed");
            return ExitCode::FAILURE;
        }
    };

    let ok = match matches.subcommand() {
        Some(("fetch", sub)) => run_fetch(&service, sub).await,
        Some(("resolve", sub)) => run_resolve(&service, sub).await,
        Some(("dataset", sub)) => run_dataset(&service, sub).await,
        _ => unreachable!("subcommand is required"),
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.logging.level))
        .map_err(|_| RetrievalError::Config {
            message: format!("Invalid log level: {}", config.logging.level),
        })?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .init();

    Ok(())
}

async fn run_fetch(service: &RetrievalService, matches: &ArgMatches) -> bool {
    let year = *matches.get_one::<u16>("year").unwrap();
    let case_id = matches.get_one::<String>("case-id").unwrap();
    let language = matches.get_one::<String>("language").unwrap();
    let path = matches.get_one::<String>("path").map(String::as_str);

    let bytes = match service.fetch_document(year, case_id, language, path).await {
        Some(bytes) => bytes,
        None => {
            error!(year, case_id, "Document could not be retrieved");
            return false;
        }
    };

    let output = match matches.get_one::<String>("output") {
        Some(output) => output.clone(),
        None => default_output_name(case_id, path),
    };

    if let Err(e) = std::fs::write(&output, &bytes) {
        error!(output, error = %e, "Failed to write document");
        return false;
    }

    info!(output, size = bytes.len(), "Document written");
    println!("{}", output);
    true
}

async fn run_resolve(service: &RetrievalService, matches: &ArgMatches) -> bool {
    let year = *matches.get_one::<u16>("year").unwrap();
    let case_id = matches.get_one::<String>("case-id").unwrap();

    match service.resolve_case(year, case_id).await {
        Some(record) => match serde_json::to_string_pretty(record.as_ref()) {
            Ok(json) => {
                println!("{}", json);
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize record");
                false
            }
        },
        None => {
            error!(year, case_id, "Case could not be resolved");
            false
        }
    }
}

async fn run_dataset(service: &RetrievalService, matches: &ArgMatches) -> bool {
    let years = match matches.get_one::<String>("years").map(|s| parse_years(s)) {
        Some(Ok(years)) => Some(years),
        Some(Err(e)) => {
            eprintln!("Invalid --years value: {}", e);
            return false;
        }
        None => None,
    };

    let dataset = match service.get_combined_dataset(years.as_ref()).await {
        Some(dataset) => dataset,
        None => {
            error!("Combined dataset could not be built");
            return false;
        }
    };

    println!("rows: {}", dataset.len());
    if let Some((first, last)) = dataset.year_span() {
        println!("years: {}-{}", first, last);
    }
    true
}

fn parse_years(raw: &str) -> std::result::Result<HashSet<u16>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u16>().map_err(|e| format!("{}: {}", s, e)))
        .collect()
}

fn default_output_name(case_id: &str, path: Option<&str>) -> String {
    match path {
        Some(path) => path
            .rsplit('/')
            .next()
            .unwrap_or(path)
            .to_string(),
        None => format!("{}.pdf", case_id.replace([' ', '/'], "_")),
    }
}
