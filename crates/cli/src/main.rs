use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "echobot")]
#[command(about = "Echobot: chat webhook that greets new spaces and echoes messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a default config file if one does not exist.
    Init {
        /// Config file path (default: ECHOBOT_CONFIG_PATH or ~/.echobot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the webhook server. PORT env overrides the configured port; --port overrides both.
    Serve {
        /// Config file path (default: ECHOBOT_CONFIG_PATH or ~/.echobot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from PORT, config, or 8080)
        #[arg(long, short)]
        port: Option<u16>,

        /// Bind address (default from config or 127.0.0.1)
        #[arg(long, short, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Run one event through the handler and print the response. Reads FILE, or stdin when omitted.
    Handle {
        /// Event JSON file
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Config file path (default: ECHOBOT_CONFIG_PATH or ~/.echobot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("echobot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            init_logger(None);
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port, bind }) => {
            if let Err(e) = run_serve(config, port, bind).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Handle { file, config }) => {
            if let Err(e) = run_handle(file, config) {
                log::error!("handle failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

/// Initialize env_logger once. RUST_LOG wins over the configured level.
fn init_logger(level: Option<&str>) {
    let default = level.unwrap_or("warn");
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .try_init();
}

/// Load config, then initialize logging from it. On load failure the logger
/// is initialized with defaults so the error is still reported.
fn load_config_and_logger(
    config_path: Option<PathBuf>,
) -> anyhow::Result<(echobot::config::Config, PathBuf)> {
    match echobot::config::load_config(config_path) {
        Ok((config, path)) => {
            init_logger(Some(&config.logging.level));
            log::debug!("loaded config from {}", path.display());
            Ok((config, path))
        }
        Err(e) => {
            init_logger(None);
            Err(e)
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(echobot::config::default_config_path);
    if echobot::config::write_default_config(&path)? {
        println!("wrote default config to {}", path.display());
    } else {
        println!("config already exists at {}", path.display());
    }
    Ok(())
}

async fn run_serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    bind: Option<String>,
) -> anyhow::Result<()> {
    let (mut config, _) = load_config_and_logger(config_path)?;
    config.server.port = port.unwrap_or_else(|| echobot::config::resolve_port(&config));
    if let Some(b) = bind {
        config.server.bind = b;
    }
    log::info!("starting webhook on {}:{}", config.server.bind, config.server.port);
    echobot::webhook::run_server(config).await
}

fn run_handle(file: Option<PathBuf>, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    use anyhow::Context;

    let (config, _) = load_config_and_logger(config_path)?;
    let body = match file {
        Some(path) => {
            std::fs::read(&path).with_context(|| format!("reading event from {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading event from stdin")?;
            buf
        }
    };

    let handler = echobot::EventHandler::from_config(&config);
    let res = handler.handle(&body);
    println!("{}", res.status);
    for (name, value) in res.headers().iter() {
        println!("{}: {}", name, value.to_str().unwrap_or(""));
    }
    println!();
    println!("{}", res.body);
    Ok(())
}
