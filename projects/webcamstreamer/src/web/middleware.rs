use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{app_state::AppState, config::settings::API_KEY_HEADER, core::errors::AppError};

fn api_key(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(value) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.to_owned());
    }

    query?.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name == "apikey" {
            Some(value.to_owned())
        } else {
            None
        }
    })
}

pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorized = api_key(request.headers(), request.uri().query())
        .map(|key| key == state.api_key)
        .unwrap_or(false);

    if authorized {
        return Ok(next.run(request).await);
    }

    warn!("rejected {} {}: bad api key", request.method(), request.uri().path());
    Err(AppError::forbidden())
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};

    use super::api_key;
    use crate::config::settings::API_KEY_HEADER;

    #[test]
    fn header_takes_precedence_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(
            api_key(&headers, Some("apikey=from-query")).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn falls_back_to_apikey_query_parameter() {
        let headers = HeaderMap::new();
        assert_eq!(
            api_key(&headers, Some("foo=1&apikey=secret")).as_deref(),
            Some("secret")
        );
        assert_eq!(api_key(&headers, Some("foo=1")), None);
        assert_eq!(api_key(&headers, None), None);
    }
}
