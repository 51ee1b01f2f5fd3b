use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use vanity::{
    adapters::{FileConfigProvider, VanityHttpHandler, build_store, router},
    config::{ServerConfigValidator, loader::load_config, models::ServerConfig},
    core::{VanityService, listing::fetch_all_keys},
    ports::config_provider::ConfigProvider,
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "vanity.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "vanity.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "vanity.toml")]
        config: String,
    },
    /// List every key in the configured store
    Keys {
        /// Configuration file naming the store
        #[clap(short, long, default_value = "vanity.toml")]
        config: String,
    },
    /// Start the vanity import server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "vanity.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config).await,
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Keys { config }) => list_keys_command(&config).await,
        Some(Commands::Serve { config }) => serve(&config).await,
        None => serve(&args.config).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config_provider: Arc<dyn ConfigProvider> = Arc::new(
        FileConfigProvider::new(config_path).context("Failed to create config provider")?,
    );

    let initial_config: ServerConfig = config_provider
        .load_config()
        .await
        .with_context(|| format!("Failed to load initial config from {config_path}"))?;

    tracing_setup::init_tracing(&initial_config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    vanity::metrics::init_metrics().map_err(|e| eyre!("Failed to initialize metrics: {}", e))?;

    ServerConfigValidator::validate(&initial_config)
        .map_err(|e| eyre!("Invalid configuration in {config_path}: {e}"))?;

    tracing::info!("Loaded initial configuration from {config_path}");

    let store = build_store(&initial_config.store).context("Failed to build key-value store")?;
    let service = VanityService::from_config(&initial_config, store);
    let handler = VanityHttpHandler::new(Arc::new(ArcSwap::from_pointee(service)));

    // Config Watcher Task
    let handler_for_watcher = handler.clone();
    let initial_listen_addr = initial_config.listen_addr.clone();
    let debounce_duration = Duration::from_secs(2);
    let mut notify_rx = config_provider.watch();
    let config_provider_for_watcher = config_provider.clone();
    let config_path_for_watcher = config_path.to_string();

    tokio::spawn(async move {
        tracing::info!("Config watcher task started.");
        let mut last_reload_attempt_time = tokio::time::Instant::now();
        last_reload_attempt_time = last_reload_attempt_time
            .checked_sub(debounce_duration)
            .unwrap_or(last_reload_attempt_time);

        while notify_rx.recv().await.is_some() {
            // Debounce
            if last_reload_attempt_time.elapsed() < debounce_duration {
                tracing::info!("Debouncing config reload event. Still within cooldown period.");
                while notify_rx.try_recv().is_ok() {}
                continue;
            }
            last_reload_attempt_time = tokio::time::Instant::now();

            tracing::info!(
                "Attempting to reload configuration from {}",
                config_path_for_watcher
            );

            match reload_service(config_provider_for_watcher.as_ref()).await {
                Ok((new_config, new_service)) => {
                    handler_for_watcher.replace_service(new_service);
                    if new_config.listen_addr != initial_listen_addr {
                        tracing::warn!(
                            "listen_addr changed to {}; restart to apply it",
                            new_config.listen_addr
                        );
                    }
                    tracing::info!(
                        "Configuration reloaded. Store kind: {}",
                        new_config.store.kind()
                    );
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to reload configuration: {:#}. Keeping old configuration.",
                        e
                    );
                }
            }
            while notify_rx.try_recv().is_ok() {}
        }
        tracing::info!("Config watcher task is shutting down.");
    });

    // Create graceful shutdown manager
    let graceful_shutdown = Arc::new(GracefulShutdown::new());

    // Start signal handler for graceful shutdown
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    let addr: SocketAddr = initial_config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!(
        "Vanity import server starting on {} (store: {}, docs: {})",
        addr,
        initial_config.store.kind(),
        initial_config.render.documentation_base_url
    );
    println!("Vanity import server listening on {addr}");

    let app = router(handler);
    let shutdown = graceful_shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason = shutdown.wait_for_shutdown_signal().await;
            tracing::info!("Shutdown signal received: {:?}", reason);
        })
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

/// Load, validate and build a fresh service from the current config file.
async fn reload_service(provider: &dyn ConfigProvider) -> Result<(ServerConfig, VanityService)> {
    let config = provider.load_config().await?;
    ServerConfigValidator::validate(&config).map_err(|e| eyre!("{e}"))?;
    let store = build_store(&config.store)?;
    let service = VanityService::from_config(&config, store);
    Ok((config, service))
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    // First check if file exists and is readable
    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    // Try to parse the configuration
    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    // Validate the configuration
    match ServerConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Store: {}", config.store.kind());
            println!(
                "   • Documentation: {}",
                config.render.documentation_base_url
            );
            println!(
                "   • Refresh Delay: {}s",
                config.render.refresh_delay_secs
            );
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Record sources are written without a scheme (github.com/acme/foo)");
            println!("   • Record keys look like host/segment or host/segment/segment");
            println!("   • Verify listen address format (e.g., '127.0.0.1:8080')");
            println!("   • Ensure timeouts use valid units (ms, s, m)");
            std::process::exit(1);
        }
    }
}

/// Print every key held by the configured store
async fn list_keys_command(config_path: &str) -> Result<()> {
    tracing_setup::init_console_tracing()?;

    let config = load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    let store = build_store(&config.store).context("Failed to build key-value store")?;

    let keys = fetch_all_keys(store.as_ref())
        .await
        .context("Failed to list store keys")?;
    for key in &keys {
        println!("{key}");
    }
    eprintln!("{} keys", keys.len());
    Ok(())
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Vanity import server configuration

# The address to listen on
listen_addr = "127.0.0.1:8080"

[logging]
level = "info"
json = false

[render]
documentation_base_url = "https://pkg.go.dev"
refresh_delay_secs = 3

# Records inlined in this file
[store]
kind = "memory"

[[store.records]]
key = "example.com/foo"
value = "github.com/acme/foo"

[[store.records]]
key = "example.com/tools"
value = { source = "hg.example.org/tools", vcs = "hg", default_branch = "default" }

# Records kept in a JSON file, reloaded on change
# [store]
# kind = "file"
# path = "records.json"
# watch = true

# Records served by a Workers KV style HTTP API
# [store]
# kind = "http"
# base_url = "https://api.cloudflare.com/client/v4/accounts/ACCOUNT/storage/kv/namespaces/NAMESPACE"
# api_token_env = "VANITY_KV_TOKEN"
# timeout = "10s"
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'vanity serve --config {config_path}' to start the server");
    Ok(())
}
