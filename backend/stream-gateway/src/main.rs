use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use crypto_core::SignatureCodec;
use std::sync::Arc;
use stream_gateway::config::Config;
use stream_gateway::handlers;
use stream_gateway::observability;
use stream_gateway::services::{
    BackendRouter, EmbyClient, OverrideResolver, StreamOrchestrator, UrlCache,
};
use stream_gateway::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GATEWAY_CONFIG").ok());
    let config = Config::load(config_path.as_deref())?;

    observability::init_tracing(&config);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = config_path.as_deref().unwrap_or("<defaults+env>"),
        "Starting stream-gateway"
    );

    let codec = SignatureCodec::new(&config.encipher).context("invalid encipher secret")?;
    tracing::info!(key = codec.fingerprint(), "Signature codec ready");

    if config.cache_shorter_than_tokens() {
        tracing::warn!(
            cache_ttl_secs = config.cache.ttl_secs,
            token_lifetime_secs = config.play_url_max_alive_time,
            "Cache TTL is shorter than the token lifetime; URLs will be re-minted early"
        );
    }

    let cache = Arc::new(UrlCache::new(config.cache_ttl(), config.cache.max_entry_size));
    cache.start_sweeper();

    let overrides = Arc::new(OverrideResolver::from_config(
        &config.special_medias,
        &config.calendar,
    ));
    let origin = EmbyClient::new(&config.emby_base_url(), config.origin_timeout())
        .context("failed to create Emby client")?;
    let backends = BackendRouter::new(&config.resolved_backends());

    let orchestrator = Arc::new(StreamOrchestrator::new(
        cache.clone(),
        overrides,
        Arc::new(origin),
        Arc::new(codec),
        backends,
        config.max_alive_time(),
        config.emby.api_key.clone(),
    ));
    let state = web::Data::new(AppState::new(orchestrator));

    let host = config.server.host.clone();
    let port = config.server.port;
    tracing::info!("stream-gateway HTTP listening on {}:{}", host, port);

    let result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure_routes)
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("failed to bind {}:{}", host, port))?
    .run()
    .await;

    cache.shutdown();
    tracing::info!("stream-gateway stopped");
    result.context("HTTP server error")
}
