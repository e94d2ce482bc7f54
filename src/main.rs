use std::env;
use std::process::ExitCode;

use promtail_client::{Config, Level};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "PROMTAIL_CONFIG";

struct Args {
    config_path: String,
    level: Level,
}

fn parse_args() -> Result<Args, String> {
    let mut config_path = env::var(CONFIG_ENV).ok();
    let mut level = Level::Info;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config_path = Some(args.next().ok_or("--config requires a path")?);
            }
            "--level" | "-l" => {
                let value = args.next().ok_or("--level requires a value")?;
                level = value.parse().map_err(|e| format!("{}", e))?;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    let config_path = config_path
        .ok_or_else(|| format!("Missing --config <path> (or {} env var)", CONFIG_ENV))?;

    Ok(Args { config_path, level })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            error!("{}", e);
            eprintln!("usage: promtail-pipe --config <file> [--level <LEVEL>]");
            return ExitCode::from(2);
        }
    };

    let config = match Config::from_file(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config_path, "Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    config.print_config();

    let client = match config.client_builder().and_then(|builder| builder.build()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match client.ping().await {
        Ok(pong) if pong.is_ready => info!("Loki is ready"),
        Ok(_) => warn!("Loki is not ready yet, lines will be shipped anyway"),
        Err(e) => warn!("Loki readiness probe failed: {}", e),
    }

    info!(level = %args.level, "Shipping stdin lines");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut shipped: u64 = 0;
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        continue;
                    }
                    client.logf(args.level, "{}", &[&line]).await;
                    shipped += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            },
            _ = &mut shutdown => break,
        }
    }

    client.close().await;
    info!(lines = shipped, "Shutdown complete");

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, closing client");
}
