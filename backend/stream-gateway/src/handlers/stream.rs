/// Stream redirect handler
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use std::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::metrics;
use crate::services::StreamParams;
use crate::AppState;

/// Query parameter carrying the media source id, preferred spelling first
pub const MEDIA_SOURCE_ID_PARAMS: [&str; 2] = ["MediaSourceId", "mediaSourceId"];
pub const API_KEY_PARAM: &str = "api_key";

/// First value of the first listed name present in the query.
///
/// Repeated keys are not an error: `?a=1&a=2` reads as `1`.
pub fn first_param(pairs: &[(String, String)], names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    })
}

/// Answer a playback request with `302 Found` to a signed backend URL
pub async fn stream_redirect(
    req: HttpRequest,
    query: web::Query<Vec<(String, String)>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let started = Instant::now();
    debug!(
        method = %req.method(),
        uri = %req.uri(),
        headers = ?req.headers(),
        "Stream request"
    );

    let query = query.into_inner();
    let params = StreamParams {
        item_id: req.match_info().get("item_id").map(str::to_string),
        media_source_id: first_param(&query, &MEDIA_SOURCE_ID_PARAMS),
        api_key: first_param(&query, &[API_KEY_PARAM]),
    };

    let result = state.orchestrator.handle(params).await;
    let outcome = match &result {
        Ok(redirect) => redirect.source.as_str(),
        Err(e) => e.kind(),
    };
    metrics::observe_stream_request(outcome, started.elapsed());

    let redirect = result?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, redirect.location))
        .finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &str) -> Vec<(String, String)> {
        web::Query::<Vec<(String, String)>>::from_query(raw)
            .unwrap()
            .into_inner()
    }

    #[test]
    fn test_query_accepts_both_spellings() {
        let upper = pairs("MediaSourceId=200&api_key=k");
        assert_eq!(first_param(&upper, &MEDIA_SOURCE_ID_PARAMS).as_deref(), Some("200"));
        assert_eq!(first_param(&upper, &[API_KEY_PARAM]).as_deref(), Some("k"));

        let lower = pairs("mediaSourceId=201");
        assert_eq!(first_param(&lower, &MEDIA_SOURCE_ID_PARAMS).as_deref(), Some("201"));
        assert_eq!(first_param(&lower, &[API_KEY_PARAM]), None);
    }

    #[test]
    fn test_repeated_keys_take_first_value() {
        let query = pairs("MediaSourceId=2&MediaSourceId=3&api_key=a&api_key=b");
        assert_eq!(first_param(&query, &MEDIA_SOURCE_ID_PARAMS).as_deref(), Some("2"));
        assert_eq!(first_param(&query, &[API_KEY_PARAM]).as_deref(), Some("a"));
    }

    #[test]
    fn test_preferred_spelling_wins_regardless_of_order() {
        let query = pairs("mediaSourceId=lower&MediaSourceId=upper");
        assert_eq!(
            first_param(&query, &MEDIA_SOURCE_ID_PARAMS).as_deref(),
            Some("upper")
        );
    }

    #[test]
    fn test_query_ignores_unknown_params() {
        let query = pairs("MediaSourceId=200&Static=true&DeviceId=x");
        assert_eq!(first_param(&query, &MEDIA_SOURCE_ID_PARAMS).as_deref(), Some("200"));
    }
}
