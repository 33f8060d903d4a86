use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use beacon_runtime::tracing_init::init_tracing;
use beacon_runtime::{wait_for_signal, JsonFileAdapter, Reactor};
use pulsar_config::BeaconConfig;
use pulsar_core::layer_rules;
use pulsar_lang::{parse_rule_set, validate_rule_set, Diagnostic, DocumentFormat};

#[derive(Parser)]
#[command(name = "beacon", about = "Pulsar/Beacon sensor rules engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, validate and layer a rule-set document without running it.
    Compile {
        /// Path to the rule-set document (YAML or JSON, by extension).
        rule_set: PathBuf,
        /// Optional beacon.toml to validate against its sensor namespace.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Start the Beacon runtime.
    Run {
        /// Path to beacon.toml.
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn print_diag(diag: &Diagnostic, color: bool) {
    let context = match &diag.rule_name {
        Some(name) => format!(": rule `{name}`"),
        None => String::new(),
    };
    if color {
        eprintln!("\x1b[1;31merror\x1b[0m{context}: {}", diag.kind);
    } else {
        eprintln!("error{context}: {}", diag.kind);
    }
}

fn run_compile(rule_set: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let color = std::io::stderr().is_terminal();

    let valid_sensors: HashSet<String> = match &config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: BeaconConfig = raw.parse()?;
            config.system.valid_sensors.into_iter().collect()
        }
        None => HashSet::new(),
    };

    let content = std::fs::read_to_string(&rule_set)
        .with_context(|| format!("reading {}", rule_set.display()))?;
    let format = DocumentFormat::from_path(&rule_set);
    let (rules, mut diagnostics) =
        parse_rule_set(&content, format).map_err(|e| anyhow::anyhow!("parse error: {e}"))?;

    diagnostics.extend(validate_rule_set(&rules, &valid_sensors));
    for diag in &diagnostics {
        print_diag(diag, color);
    }
    if !diagnostics.is_empty() {
        eprintln!("\n{} error(s)", diagnostics.len());
        process::exit(1);
    }

    let rule_count = rules.len();
    let compiled = layer_rules(rules).map_err(|e| anyhow::anyhow!("{e}"))?;
    if color {
        eprintln!(
            "\x1b[1;32mOK\x1b[0m: {rule_count} rule(s) compiled into {} layer(s)",
            compiled.layer_count()
        );
    } else {
        eprintln!(
            "OK: {rule_count} rule(s) compiled into {} layer(s)",
            compiled.layer_count()
        );
    }

    Ok(())
}

async fn run_runtime(config_path: PathBuf) -> Result<()> {
    let config_path = config_path
        .canonicalize()
        .with_context(|| format!("config path '{}'", config_path.display()))?;
    let config = BeaconConfig::load(&config_path)?;
    let base_dir = config_path
        .parent()
        .expect("config path must have a parent directory")
        .to_path_buf();

    let _guard = init_tracing(&config.logging, &base_dir)?;

    let adapter = Arc::new(
        JsonFileAdapter::from_config(&config.adapter, &base_dir)
            .map_err(|e| anyhow::anyhow!("{e}"))?,
    );
    let reactor = Reactor::start(config, &base_dir, adapter)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    tracing::info!(domain = "sys", "beacon runtime started");

    wait_for_signal(reactor.cancel_token()).await;
    reactor.shutdown();
    reactor.wait().await.map_err(|e| anyhow::anyhow!("{e}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Compile { rule_set, config } => run_compile(rule_set, config),
        Commands::Run { config } => run_runtime(config).await,
    }
}
