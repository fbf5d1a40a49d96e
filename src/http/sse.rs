use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::engine::core::GesturePipeline;

pub type EventStream = Sse<Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

/// Server-Sent Events stream of every published output (templated and enhanced).
pub fn outputs(pipeline: &GesturePipeline) -> EventStream {
    json_events(pipeline.dispatcher().subscribe(), "output")
}

/// Server-Sent Events stream of pipeline telemetry.
pub fn pipeline_events(pipeline: &GesturePipeline) -> EventStream {
    json_events(pipeline.telemetry().subscribe(), "pipeline")
}

// Lagged receivers skip the missed items instead of closing the stream
fn json_events<T>(receiver: broadcast::Receiver<T>, name: &'static str) -> EventStream
where
    T: Serialize + Clone + Send + 'static,
{
    let stream = BroadcastStream::new(receiver).filter_map(move |result| async move {
        match result {
            Ok(item) => match serde_json::to_string(&item) {
                Ok(payload) => Some(Ok(Event::default().event(name).data(payload))),
                Err(_) => None,
            },
            Err(_) => None,
        }
    });

    Sse::new(Box::pin(stream) as Pin<Box<_>>).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(5))
            .text("signspeak-keepalive"),
    )
}
