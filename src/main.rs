use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod catalog;
mod config;
mod handlers;
mod importer;
mod models;
mod readiness;
mod router;
mod store;
mod uploads;

use catalog::Catalog;
use config::{Config, StorageBackend};
use importer::{start_import_task, Importer};
use models::AppState;
use readiness::Readiness;
use router::build_router;
use store::{JsonFileStore, MemoryStore, VideoStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "video_catalog_backend={},tower_http=debug",
            config.log_level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Ensure directories exist
    tokio::fs::create_dir_all(config.images_dir()).await?;
    tokio::fs::create_dir_all(config.videos_dir()).await?;

    print_startup_info(&config);

    let store: Arc<dyn VideoStore> = match config.storage {
        StorageBackend::File => {
            let store = JsonFileStore::new(&config.data_file);
            info!("[store] Using data file {:?}", store.path());
            Arc::new(store)
        }
        StorageBackend::Memory => {
            warn!("[store] Using in-memory storage, changes are lost on exit");
            Arc::new(MemoryStore::default())
        }
    };
    let catalog = Arc::new(Catalog::new(store, config.catalog));

    let readiness = Readiness::new();
    match Importer::from_settings(&config.importer, catalog.clone()) {
        Ok(Some(importer)) => {
            let refresh = (config.importer.refresh_interval_seconds > 0)
                .then(|| Duration::from_secs(config.importer.refresh_interval_seconds));
            start_import_task(Arc::new(importer), readiness.clone(), refresh);
        }
        Ok(None) => {
            info!("[import] No upstream API configured, serving stored catalog");
            readiness.mark_ready();
        }
        Err(e) => {
            warn!("[import] ❌ Importer disabled: {}", e);
            readiness.mark_ready();
        }
    }

    let app_state = Arc::new(AppState {
        catalog,
        readiness,
        config: config.clone(),
    });
    let app = build_router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("✅ Server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_startup_info(config: &Config) {
    println!("{}", "=".repeat(60));
    println!("🚀 Video Catalog Backend Starting...");
    println!("{}", "=".repeat(60));
    println!("  Version: {}", env!("CARGO_PKG_VERSION"));
    println!("  Port: {}", config.port);
    match config.storage {
        StorageBackend::File => println!("  Data File: {:?}", config.data_file),
        StorageBackend::Memory => println!("  Storage: in-memory"),
    }
    println!("  Public Dir: {:?}", config.public_dir);
    println!("  Max Upload: {} MB", config.max_file_size / 1024 / 1024);
    println!("  List Projection: {:?}", config.catalog.list_projection);
    println!("  Uploads Enabled: {}", config.catalog.uploads_enabled);
    println!("  Require Description: {}", config.catalog.require_description);
    match &config.importer.api_url {
        Some(url) => println!(
            "  Importer: {} (api key {})",
            url,
            if config.importer.api_key.is_some() { "set" } else { "not set" }
        ),
        None => println!("  Importer: disabled"),
    }
    println!("{}", "=".repeat(60));
}
