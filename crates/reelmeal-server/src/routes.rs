use axum::Json;
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use reelmeal_core::{NullSink, ProgressState, RecipeRequest, RecipeSummary};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::sse::stream_run;

const EVENT_STREAM: &str = "text/event-stream";

#[derive(Debug, Deserialize)]
struct FromUrlBody {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct SyncSuccess {
    result: RecipeSummary,
    progress: ProgressState,
}

#[derive(Debug, Serialize)]
struct SyncFailure {
    error: String,
    progress: ProgressState,
}

pub(crate) async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /recipes/from-url`
///
/// The body is JSON regardless of `Content-Type`; that header only picks
/// between a single JSON answer and an event stream.
pub(crate) async fn from_url_body(
    State(pipeline): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: FromUrlBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => return bad_request(format!("Invalid JSON body: {e}")),
    };

    let request = match recipe_request(body.url, body.tags.unwrap_or_default()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    if wants_event_stream(&headers) {
        stream_run(pipeline, request)
    } else {
        run_sync(&pipeline, request).await
    }
}

/// `GET /recipes/from-url?url=...&tags=a&tags=b`
pub(crate) async fn from_url_query(
    State(pipeline): State<AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    let mut url = None;
    let mut tags = Vec::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "url" if url.is_none() => url = Some(value.into_owned()),
            "tags" => tags.push(value.into_owned()),
            _ => {}
        }
    }

    match recipe_request(url, tags) {
        Ok(request) => run_sync(&pipeline, request).await,
        Err(response) => response,
    }
}

/// Run to completion and answer once.
///
/// The run gets its own task so a client that hangs up mid-request does not
/// cancel it between creating the recipe and attaching its image.
async fn run_sync(pipeline: &AppState, request: RecipeRequest) -> Response {
    let pipeline = pipeline.clone();
    let run = tokio::spawn(async move { pipeline.run(&request, &NullSink).await });

    let outcome = match run.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("recipe import task failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Recipe import task failed".to_string(),
                }),
            )
                .into_response();
        }
    };

    match outcome.result {
        Ok(result) => (
            StatusCode::OK,
            Json(SyncSuccess {
                result,
                progress: outcome.progress,
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SyncFailure {
                error: e.to_string(),
                progress: outcome.progress,
            }),
        )
            .into_response(),
    }
}

fn recipe_request(url: Option<String>, tags: Vec<String>) -> Result<RecipeRequest, Response> {
    let url = url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| bad_request("Missing required field: url".to_string()))?;
    Ok(RecipeRequest { url, tags })
}

fn bad_request(error: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case(EVENT_STREAM))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type).unwrap(),
        );
        headers
    }

    #[test]
    fn test_wants_event_stream() {
        assert!(wants_event_stream(&headers("text/event-stream")));
        assert!(wants_event_stream(&headers("Text/Event-Stream; charset=utf-8")));
        assert!(!wants_event_stream(&headers("application/json")));
        assert!(!wants_event_stream(&HeaderMap::new()));
    }

    #[test]
    fn test_recipe_request_rejects_blank_url() {
        assert!(recipe_request(None, Vec::new()).is_err());
        assert!(recipe_request(Some("   ".to_string()), Vec::new()).is_err());

        let request = recipe_request(Some(" https://example.com/p ".to_string()), vec![]).unwrap();
        assert_eq!(request.url, "https://example.com/p");
    }
}
