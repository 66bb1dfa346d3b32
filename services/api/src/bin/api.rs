//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, InMemoryStore, LocalFileStorage},
    config::{Config, ConfigError, StoreBackend},
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        orders::{
            admin_list_orders_handler, admin_update_order_handler, my_orders_handler,
            place_order_handler, upload_order_files_handler,
        },
        require_admin, require_auth,
        rest::{
            create_note_handler, delete_note_handler, download_note_handler, estimate_handler,
            get_profile_handler, list_notes_handler, list_payment_methods_handler,
            list_plans_handler, my_notes_handler, my_purchases_handler, my_wishlist_handler,
            note_filters_handler, note_stats_handler, purchase_note_handler, serve_file_handler,
            toggle_wishlist_handler, update_profile_handler,
        },
        ApiDoc, AppState,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use study_market_core::ports::MarketplaceStore;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// How often expired download tokens and sessions are swept.
const TOKEN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Select the Persistence Backend ---
    // Sessions of the memory store are purged by the sweeper below.
    let (store, memory_store): (Arc<dyn MarketplaceStore>, Option<Arc<InMemoryStore>>) =
        match &config.store {
            StoreBackend::Postgres { database_url } => {
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(database_url)
                    .await?;
                let db_adapter = DbAdapter::new(db_pool);
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");
                let store: Arc<dyn MarketplaceStore> = Arc::new(db_adapter);
                (store, None)
            }
            StoreBackend::Memory => {
                info!("Using the in-memory store; data is lost on shutdown.");
                let memory = Arc::new(InMemoryStore::new());
                let store: Arc<dyn MarketplaceStore> = memory.clone();
                (store, Some(memory))
            }
        };

    // --- 3. File Storage & the Token Sweeper ---
    tokio::fs::create_dir_all(&config.storage_root).await?;
    let storage = Arc::new(LocalFileStorage::new(
        config.storage_root.clone(),
        config.public_base_url.clone(),
    ));

    let shutdown = CancellationToken::new();
    let sweeper = {
        let storage = storage.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TOKEN_SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let now = Utc::now();
                        storage.purge_expired(now).await;
                        if let Some(memory) = &memory_store {
                            let purged = memory.purge_expired_sessions(now).await;
                            if purged > 0 {
                                debug!("Purged {} expired auth sessions", purged);
                            }
                        }
                    }
                }
            }
            info!("Expiry sweeper stopped.");
        })
    };

    // --- 4. Build the Shared AppState ---
    let bind_address = config.bind_address;
    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let max_upload_bytes = config.max_upload_bytes;
    let app_state = Arc::new(AppState::new(store, storage, config));

    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/plans", get(list_plans_handler))
        .route("/estimate", post(estimate_handler))
        .route("/payment-methods", get(list_payment_methods_handler))
        .route("/notes", get(list_notes_handler))
        .route("/notes/filters", get(note_filters_handler))
        .route("/notes/stats", get(note_stats_handler))
        .route("/files/{token}", get(serve_file_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/notes", post(create_note_handler))
        .route("/notes/{id}", delete(delete_note_handler))
        .route("/notes/{id}/purchase", post(purchase_note_handler))
        .route("/notes/{id}/wishlist", post(toggle_wishlist_handler))
        .route("/notes/{id}/download", get(download_note_handler))
        .route("/me/profile", get(get_profile_handler).put(update_profile_handler))
        .route("/me/notes", get(my_notes_handler))
        .route("/me/purchases", get(my_purchases_handler))
        .route("/me/wishlist", get(my_wishlist_handler))
        .route("/me/orders", get(my_orders_handler))
        .route("/orders", post(place_order_handler))
        .route("/orders/{id}/files", post(upload_order_files_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Admin routes (auth + admin flag required); the auth layer is outermost.
    let admin_routes = Router::new()
        .route("/admin/orders", get(admin_list_orders_handler))
        .route("/admin/orders/{id}", patch(admin_update_order_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_admin,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // Make sure the sweeper has observed the cancellation before exiting.
    shutdown.cancel();
    if let Err(e) = sweeper.await {
        error!("Expiry sweeper task failed: {}", e);
    }
    info!("Server stopped.");
    Ok(())
}

/// Resolves on Ctrl-C and cancels the background tasks.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {}", e);
    }
    info!("Shutdown signal received.");
    shutdown.cancel();
}
