use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::info;

use runboard_data::{authenticate, hash_token, CacheStore, HttpRunClient, RunClient, RunRepository};
use runboard_monitor::config::Config;
use runboard_monitor::logging;
use runboard_monitor::tui::{self, event::Event, App, AppContext, NavigationIntent, Navigator};

#[derive(Parser)]
#[command(name = "runboard")]
#[command(about = "Create and watch remote runs from the terminal")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/runboard/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// API base URL (overrides config and RUNBOARD_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Open the details screen for this run on startup
    #[arg(long)]
    run: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    if let Err(e) = logging::init(&config.log_file(), &config.logging.filter) {
        eprintln!("Warning: file logging disabled: {:#}", e);
    }
    info!(endpoint = %config.api.base_url, "starting runboard");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let cache = Arc::new(CacheStore::new(config.cache_config()));
    cache.load_from_disk();

    let client: Arc<dyn RunClient> = Arc::new(
        HttpRunClient::new(&config.api.base_url, &config.api.api_key)
            .context("failed to create API client")?,
    );
    let token_hash = hash_token(&config.api.api_key);
    let session = runtime.block_on(authenticate(
        client.as_ref(),
        &cache,
        &token_hash,
        config.auth_timeout(),
    ));

    let (tx, rx) = mpsc::unbounded_channel();
    let ctx = AppContext::new(
        RunRepository::new(client, cache.clone()),
        session,
        tx.clone(),
        config.poll_config(),
        config.tui.page_size,
    );
    runtime.spawn(watch_signals(ctx.shutdown.clone(), tx));

    let navigator = Navigator::new(ctx.clone());
    let mut app = App::new(navigator, rx, runtime.handle().clone(), config.tick_rate());
    let initial = cli.run.map(|run_id| NavigationIntent::ToDetails {
        run_id,
        snapshot: None,
    });

    let result = tui::run(&mut app, initial);
    app.shutdown();
    runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    result
}

/// Cancel all polls and ask the event loop to stop on SIGINT or SIGTERM.
async fn watch_signals(shutdown: CancellationToken, events: UnboundedSender<Event>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
                shutdown.cancel();
                let _ = events.send(Event::Shutdown);
                return;
            }
        };
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::signal::ctrl_c() => info!("interrupt received"),
            _ = terminate.recv() => info!("terminate signal received"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        }
    }
    shutdown.cancel();
    let _ = events.send(Event::Shutdown);
}
