use std::{future::IntoFuture, net::SocketAddr, sync::Arc, time::Duration};

use {
    clap::Parser,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    chatspout_config::{ChatspoutConfig, apply_env_overrides, discover_and_load, load_config},
    chatspout_extract::ExtractEngine,
    chatspout_gateway::{AppState, BrowserlessSource, ProfileSource, build_app},
    chatspout_relay::source::ChatSource,
};

/// How long open connections get to finish after a shutdown signal.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "chatspout", about = "chatspout — live chat relay")]
struct Cli {
    /// Address to bind to (overrides config value).
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Explicit config file (overrides discovery).
    #[arg(long, env = "CHATSPOUT_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Serve without launching a browser. Chat and profile routes fail, the
    /// health routes stay up.
    #[arg(long, default_value_t = false)]
    no_browser: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<ChatspoutConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut cfg = load_config(path)?;
            apply_env_overrides(&mut cfg);
            cfg
        },
        None => discover_and_load(),
    };
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = Arc::new(resolve_config(&cli)?);

    let engine = if cli.no_browser {
        None
    } else {
        Some(ExtractEngine::launch(&config.extract).await?)
    };

    let state = match &engine {
        Some(engine) => AppState::new(
            Arc::clone(engine) as Arc<dyn ChatSource>,
            Arc::clone(engine) as Arc<dyn ProfileSource>,
            Arc::clone(&config),
        ),
        None => {
            warn!("running without a browser; chat and profile routes will fail");
            let stub = Arc::new(BrowserlessSource);
            AppState::new(
                Arc::clone(&stub) as Arc<dyn ChatSource>,
                stub as Arc<dyn ProfileSource>,
                Arc::clone(&config),
            )
        },
    };

    let app = build_app(state);
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "chatspout listening");

    // Subscriber sockets stay open indefinitely, so a purely graceful drain
    // would never finish. After the signal, give in-flight connections a
    // short window, then drop the server so the browser is always released.
    let (signal_tx, signal_rx) = tokio::sync::oneshot::channel::<()>();
    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = signal_tx.send(());
    });
    let mut serve = std::pin::pin!(serve.into_future());

    let result = tokio::select! {
        res = &mut serve => res,
        _ = async {
            let _ = signal_rx.await;
            tokio::time::sleep(SHUTDOWN_DRAIN).await;
        } => {
            info!("drain window elapsed, closing remaining connections");
            Ok(())
        },
    };

    // Runs on every exit path, serve errors included.
    if let Some(engine) = engine {
        engine.shutdown().await;
    }
    result?;
    Ok(())
}
