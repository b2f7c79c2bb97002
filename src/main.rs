//! Scribe - portfolio management backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribe::{
    config::Args,
    db::MongoClient,
    notify::{LogNotifier, Notifier, SmtpNotifier},
    portfolio::scoring,
    server,
    store::{EntityStore, MemoryStore, MongoStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("scribe={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Scribe - Portfolio Backend");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!(
        "SMTP: {}",
        args.smtp_host.as_deref().unwrap_or("not configured (log-only)")
    );
    info!("======================================");

    // Connect to MongoDB (in-memory fallback in dev mode)
    let store: Arc<dyn EntityStore> = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db)
        .await
    {
        Ok(client) => match MongoStore::new(&client).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to open collections: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "MongoDB connection failed (dev mode, using in-memory store): {}",
                    e
                );
                Arc::new(MemoryStore::new())
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Credential email delivery; log-only when SMTP is not configured
    let notifier: Arc<dyn Notifier> = match (&args.smtp_host, &args.smtp_user, &args.smtp_pass) {
        (Some(host), Some(user), Some(pass)) => match SmtpNotifier::new(host, user, pass) {
            Ok(smtp) => {
                info!("SMTP notifier configured for {}", host);
                Arc::new(smtp)
            }
            Err(e) => {
                error!("SMTP configuration error: {}", e);
                std::process::exit(1);
            }
        },
        _ => Arc::new(LogNotifier),
    };

    // Create application state
    let state = match server::AppState::new(args.clone(), Arc::clone(&store), notifier) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    // Seed the first Super Admin when configured
    if let (Some(email), Some(password)) = (&args.seed_admin_email, &args.seed_admin_password) {
        if let Err(e) = state.accounts.ensure_super_admin(email, password).await {
            error!("Super admin seeding failed: {}", e);
            std::process::exit(1);
        }
    }

    // Points reconciliation backstop
    if args.reconcile_interval_seconds > 0 {
        let _reconcile_handle =
            scoring::spawn_reconcile_task(Arc::clone(&store), args.reconcile_interval_seconds);
        info!(
            "Points reconciliation task started (every {}s)",
            args.reconcile_interval_seconds
        );
    } else {
        info!("Points reconciliation task disabled");
    }

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
