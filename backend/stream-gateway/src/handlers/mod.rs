/// HTTP handlers for stream-gateway
///
/// - Stream: playback requests answered with a signed redirect
/// - Health: liveness probe
pub mod health;
pub mod stream;

use actix_web::web;

use crate::error::AppError;

pub use health::health_check;
pub use stream::stream_redirect;

/// Playback paths the media clients request, all served by [`stream_redirect`]
pub const STREAM_ROUTES: [&str; 5] = [
    "/emby/videos/{item_id}/original.{ext}",
    "/videos/{item_id}/original.{ext}",
    "/emby/videos/{item_id}/stream.{ext}",
    "/emby/Videos/{item_id}/stream.{ext}",
    "/Videos/{item_id}/stream",
];

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Unreadable query strings get the same JSON error body as every other failure
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("invalid query string: {}", err)).into()
    }));

    for path in STREAM_ROUTES {
        cfg.route(path, web::get().to(stream_redirect));
    }
    cfg.route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics));
}
