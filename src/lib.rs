pub mod api;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod entities;
pub mod scheduler;
pub mod services;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use config::Config;
use db::NewAdminUser;
use db::repositories::admin_user::generate_token;
use scheduler::MaintenanceScheduler;
use services::{AuthService, SeaOrmAuthService};
use state::SharedState;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key, value)?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" | "daemon" | "-d" | "--daemon" => run_daemon(config, prometheus_handle).await,

        "init" => cmd_init(config).await,

        "create-admin" => {
            if args.len() < 4 {
                println!("Usage: telegan create-admin <name> <email> [password]");
                return Ok(());
            }
            cmd_create_admin(config, &args[2], &args[3], args.get(4).map(String::as_str)).await
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        other => {
            println!("Unknown command: {other}");
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Telegan admin backend v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: telegan <command>");
    println!();
    println!("Commands:");
    println!("  serve                               Run the API server and maintenance jobs");
    println!("  init                                Create a default config and initialize the database");
    println!("  create-admin <name> <email> [pw]    Create a SUPER_ADMIN account");
    println!("  help                                Show this help");
}

async fn cmd_init(config: Config) -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created default config.toml");
    }

    // Connecting runs the migrations and seeds the default admin.
    let shared = SharedState::new(config).await?;
    shared.store.ping().await?;
    println!("Database initialized");

    Ok(())
}

async fn cmd_create_admin(
    config: Config,
    name: &str,
    email: &str,
    password: Option<&str>,
) -> anyhow::Result<()> {
    let security = config.security.clone();
    let session_ttl = config.server.session_token_ttl_minutes;
    let shared = SharedState::new(config).await?;

    let generated;
    let password = match password {
        Some(p) => p,
        None => {
            generated = generate_token().chars().take(16).collect::<String>();
            &generated
        }
    };

    let auth = SeaOrmAuthService::new(shared.store.clone(), security, session_ttl);
    let admin = auth
        .create_admin(
            NewAdminUser {
                name: name.to_string(),
                email: email.to_string(),
                phone: None,
                role: constants::roles::SUPER_ADMIN.to_string(),
                active: true,
                email_verified: true,
            },
            password,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create admin: {e}"))?;

    println!("Created admin {} <{}>", admin.name, admin.email);
    println!("Password: {password}");

    Ok(())
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "Telegan v{} starting in server mode...",
        env!("CARGO_PKG_VERSION")
    );

    let shared = Arc::new(SharedState::new(config.clone()).await?);
    let api_state = api::create_app_state_with_metrics(Arc::clone(&shared), prometheus_handle).await?;

    let scheduler = MaintenanceScheduler::new(Arc::clone(&shared), config.maintenance.clone());
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Scheduler error: {}", e);
        }
    });

    let port = config.server.port;
    let app = api::router(api_state).await;
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("API listening at http://0.0.0.0:{port}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    info!("Server running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler_handle.abort();
    server_handle.abort();
    info!("Server stopped");

    Ok(())
}
