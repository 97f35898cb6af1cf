use anyhow::Context;
use clap::Parser;
use printscope::{
    create_hardware, forward_acks, init_logging, list_ports, CommandDispatcher, CommandRequest,
    Config, HardwareMode, BUILD_DATE, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "printscope")]
#[command(version, about, long_about = None)]
struct Args {
    /// Backend: simulated (alias local), test or connected
    #[arg(short, long, default_value = "simulated")]
    mode: HardwareMode,

    /// Configuration file (TOML or JSON); defaults to the per-user config if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log as JSON lines instead of pretty console output
    #[arg(long)]
    json_logs: bool,

    /// List candidate printer serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Read JSON command requests from stdin, one per line, and print acks
    #[arg(long)]
    stdin: bool,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => match Config::default_path().filter(|p| p.exists()) {
            Some(path) => Config::load_from_file(&path)
                .with_context(|| format!("loading configuration from {}", path.display())),
            None => {
                tracing::info!("No configuration file, using defaults");
                Ok(Config::default())
            }
        },
    }
}

/// Enqueue one JSON request per stdin line until EOF
async fn feed_stdin(dispatcher: Arc<CommandDispatcher>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<CommandRequest>(line) {
            Ok(request) => {
                dispatcher.submit(request);
            }
            Err(e) => tracing::warn!("Ignoring malformed request: {}", e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs)?;

    if args.list_ports {
        for port in list_ports()? {
            println!("{}\t{}", port.port_name, port.description);
        }
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;

    if let Some(path) = &args.write_config {
        config
            .save_to_file(path)
            .with_context(|| format!("writing configuration to {}", path.display()))?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    tracing::info!(version = VERSION, built = BUILD_DATE, mode = %args.mode, "Printscope starting");

    let hardware = Arc::new(create_hardware(args.mode, &config)?);
    let report = hardware.initialize().await;
    if !report.ready {
        tracing::warn!(warnings = ?report.warnings, "Starting degraded");
    }

    let dispatcher = Arc::new(CommandDispatcher::from_config(hardware.clone(), &config));

    if args.stdin {
        let events = hardware.machine().events().subscribe();
        tokio::spawn(forward_acks(events, |ack| match serde_json::to_string(ack) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!("Failed to encode ack: {}", e),
        }));

        let feeder = dispatcher.clone();
        tokio::spawn(async move {
            if let Err(e) = feed_stdin(feeder).await {
                tracing::error!("Reading stdin failed: {}", e);
            }
        });
    }

    dispatcher
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Shutdown requested");
        })
        .await;

    hardware.shutdown().await?;
    Ok(())
}
