//! SOAP datasource command line client.
//!
//! Run with: `soap-datasource --config config.yaml call listarClientes --params '{"filtro":"A"}'`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use soap_datasource::{ConfigPatch, Params, SoapSource, SoapSourceConfig};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Call operations of a SOAP web service configured as a datasource.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the configured service name
    #[arg(short, long)]
    service: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the operations advertised by the service
    Operations,

    /// Call an operation and print its result as JSON
    Call {
        /// Operation name; defaults to `function` from the configuration
        function: Option<String>,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Load the WSDL and report whether the connection succeeds
    Check,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays valid JSON
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Config file: {}", args.config.display());

    let config = if args.config.exists() {
        let content =
            std::fs::read_to_string(&args.config).context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")?
    } else {
        info!("Config file not found, using defaults");
        SoapSourceConfig::default()
    };

    let mut source = SoapSource::new(config);
    if let Some(service) = args.service {
        source.set_config(ConfigPatch::service(service));
    }

    info!(
        wsdl = %source.debug_info().resolved_wsdl_url,
        cache = source.config().cache,
        function_match = ?source.config().function_match,
        "Configuration loaded"
    );

    match args.command {
        Command::Operations => {
            let operations = source.operations()?;
            println!("{}", serde_json::to_string_pretty(&operations)?);
        }
        Command::Call { function, params } => {
            let function = match function {
                Some(function) => function,
                None if !source.config().function.is_empty() => source.config().function.clone(),
                None => anyhow::bail!("No function given and none configured"),
            };
            let params: Params =
                serde_json::from_str(&params).context("--params must be a JSON object")?;
            let result = source.query(&function, params)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Check => {
            let session = source.connect()?;
            info!(
                wsdl = %session.wsdl_url(),
                operations = session.operations().len(),
                connected = source.is_connected(),
                "Connection established"
            );
        }
    }

    Ok(())
}
