use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{body::Body, routing::get, Router};
use http::{HeaderValue, StatusCode};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::{GovernorError, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod middleware;
mod routes;
mod services;

use config::Config;
use services::{google::GoogleApi, init};

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub google: Arc<dyn GoogleApi>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pantry_pal=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting PantryPal API");

    let pool = init::init_db(&config).await?;
    let google = init::init_google(&config)?;

    let app_state = Arc::new(AppState {
        db: pool,
        config: config.clone(),
        google,
    });

    let thread_shutdown = Arc::new(AtomicBool::new(false));

    // Auth rate limiter; rejections use the same JSON shape as `AppError`.
    let mut auth_builder = GovernorConfigBuilder::default();
    auth_builder.per_second(config.rate_limit.auth_per_second.into());
    auth_builder.burst_size(config.rate_limit.auth_burst);
    auth_builder.key_extractor(SmartIpKeyExtractor);
    auth_builder.error_handler(rate_limit_response);

    let auth_gov_conf = Arc::new(
        auth_builder
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Failed to build auth governor config"))?,
    );

    // Background cleanup for auth limiter storage
    let auth_cleaner = {
        let limiter = auth_gov_conf.limiter().clone();
        let interval = Duration::from_secs(60);
        let flag = thread_shutdown.clone();
        std::thread::spawn(move || {
            let tick = Duration::from_secs(1);
            loop {
                for _ in 0..interval.as_secs() {
                    if flag.load(Ordering::SeqCst) {
                        tracing::info!("Auth rate limiter cleanup thread exiting");
                        return;
                    }
                    std::thread::sleep(tick);
                }
                tracing::debug!("auth rate limiter size: {}", limiter.len());
                limiter.retain_recent();
            }
        })
    };

    let auth_rate_layer = GovernorLayer {
        config: auth_gov_conf.clone(),
    };

    let frontend_origin = config
        .server
        .frontend_url
        .parse::<HeaderValue>()
        .map_err(|e| anyhow::anyhow!("Invalid FRONTEND_URL for CORS: {}", e))?;

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/auth", routes::auth::router().layer(auth_rate_layer))
        .merge(routes::api_router())
        .with_state(app_state.clone())
        .layer(axum::middleware::from_fn(middleware::csp::csp_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(frontend_origin)
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::PUT,
                    http::Method::DELETE,
                    http::Method::OPTIONS,
                ])
                .allow_headers([
                    http::header::CONTENT_TYPE,
                    http::header::AUTHORIZATION,
                    http::header::ACCEPT,
                ])
                .allow_credentials(true),
        );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!("Server error: {}", e);
    }

    thread_shutdown.store(true, Ordering::SeqCst);
    if let Err(e) = auth_cleaner.join() {
        tracing::warn!("Auth cleanup thread join failed: {:?}", e);
    }

    app_state.db.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn rate_limit_response(error: GovernorError) -> http::Response<Body> {
    let (status, body, headers, retry_after) = match error {
        GovernorError::TooManyRequests { wait_time, headers } => (
            StatusCode::TOO_MANY_REQUESTS,
            serde_json::json!({
                "error": {
                    "code": "RATE_LIMITED",
                    "message": "Rate limit exceeded",
                    "details": { "retry_after_seconds": wait_time }
                }
            }),
            headers,
            Some(wait_time),
        ),
        GovernorError::UnableToExtractKey => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": {
                    "code": "BAD_REQUEST",
                    "message": "Unable to determine client IP for rate limiting"
                }
            }),
            None,
            None,
        ),
        GovernorError::Other { code, msg, headers } => (
            StatusCode::from_u16(code.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            serde_json::json!({
                "error": {
                    "code": "INTERNAL_ERROR",
                    "message": msg.unwrap_or_else(|| "Rate limiting error".to_string())
                }
            }),
            headers,
            None,
        ),
    };

    let mut resp = http::Response::new(Body::from(body.to_string()));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Some(hmap) = headers {
        for (name, value) in hmap.iter() {
            resp.headers_mut().append(name.clone(), value.clone());
        }
    }
    if let Some(seconds) = retry_after {
        resp.headers_mut()
            .insert(http::header::RETRY_AFTER, HeaderValue::from(seconds));
    }
    resp
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to bind SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
