use bridge::cli::{Cli, Command};
use bridge::config::Config;
use bridge::service::{run_opcua, Service};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(version = bridge::version::VERSION_STRING, "starting glowplug");

    let result = match cli.command {
        Command::Start(args) => run_service(args.into()).await,
        Command::Listen(args) => run_service(args.into()).await,
        Command::Opcua(args) => {
            let cancel = CancellationToken::new();
            let watcher = cancel.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                watcher.cancel();
            });
            run_opcua(args, cancel).await
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "glowplug exited with an error");
        std::process::exit(1);
    }
}

async fn run_service(config: Config) -> bridge::Result<()> {
    let service = Service::start(config).await?;
    shutdown_signal().await;
    info!("shutdown signal received, draining");
    service.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
