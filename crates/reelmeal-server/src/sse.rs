//! Streaming delivery: one SSE `data:` frame per progress update.

use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use reelmeal_core::{ChannelSink, RecipeRequest};
use tokio_stream::wrappers::ReceiverStream;

use crate::AppState;

/// Frames buffered ahead of a slow client before the run waits on it
const FRAME_BUFFER: usize = 16;

/// Start the run in its own task and stream its frames.
///
/// The run is not tied to the response: if the client goes away the task
/// keeps going and its frames are discarded.
pub(crate) fn stream_run(pipeline: AppState, request: RecipeRequest) -> Response {
    let (sink, rx) = ChannelSink::new(FRAME_BUFFER);

    tokio::spawn(async move {
        pipeline.run(&request, &sink).await;
    });

    let events = ReceiverStream::new(rx).map(|frame| Event::default().json_data(&frame));

    // Sse sets `Content-Type: text/event-stream` and `Cache-Control: no-cache`
    Sse::new(events).into_response()
}
