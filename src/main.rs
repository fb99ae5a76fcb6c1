use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_gallery::{
    api,
    auth::AdminAuth,
    config::{Backend, Config},
    object_store as obj,
    storage::{self, Database, ImageTable},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "image-gallery starting");

    let config = Config::load()?;

    // Object store backend
    let object_store: Arc<dyn obj::ObjectStore> = match config.storage.backend {
        Backend::Local => {
            let store = obj::LocalStore::new(
                &config.storage.local_storage_path,
                &config.node.public_base_url,
            )?;
            info!(
                "Using local storage backend at: {}",
                config.storage.local_storage_path
            );
            Arc::new(store)
        }
        Backend::Supabase => {
            let supabase = config
                .supabase
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Supabase credentials missing"))?;
            let store = obj::SupabaseStore::new(
                &supabase.url,
                &supabase.service_key,
                &config.storage.bucket,
                config.storage.list_page_size,
            )?;
            info!("Using Supabase storage backend, bucket: {}", config.storage.bucket);
            Arc::new(store)
        }
    };

    // Metadata table backend
    let images: Arc<dyn ImageTable> = match config.metadata.backend {
        Backend::Local => {
            let db = Database::open(&config.node.data_dir)?;
            info!("Database opened at: {}", config.node.data_dir);
            Arc::new(db)
        }
        Backend::Supabase => {
            let supabase = config
                .supabase
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Supabase credentials missing"))?;
            let table = storage::PostgrestTable::new(
                &supabase.url,
                &supabase.service_key,
                &config.metadata.table,
            )?;
            info!("Using Supabase metadata table: {}", config.metadata.table);
            Arc::new(table)
        }
    };

    let auth = match config.admin.token_secret.as_deref() {
        Some(secret) => AdminAuth::new(
            &config.admin.username,
            &config.admin.password,
            secret.as_bytes(),
            config.admin.token_ttl_secs,
        ),
        None => {
            tracing::warn!("ADMIN_TOKEN_SECRET not set, admin tokens will not survive a restart");
            AdminAuth::with_random_secret(
                &config.admin.username,
                &config.admin.password,
                config.admin.token_ttl_secs,
            )?
        }
    };

    let state = Arc::new(AppState {
        auth,
        config: config.clone(),
        images,
        object_store,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!("Listening on: {}", config.node.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
