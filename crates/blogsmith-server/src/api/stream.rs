// ABOUTME: SSE event streaming handler delivering raw session events as JSON.
// ABOUTME: Subscribes to a session actor's broadcast channel and converts events to SSE format.

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use blogsmith_core::Event;
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use super::sessions::find_session;
use crate::app_state::SharedState;

/// Convert a broadcast receiver into an SSE-compatible stream. Lagged receivers skip ahead.
fn event_stream_from_receiver(
    rx: tokio::sync::broadcast::Receiver<Event>,
) -> impl Stream<Item = Result<SseEvent, axum::Error>> {
    BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(SseEvent::default()
                    .event(event.payload.type_name())
                    .id(event.event_id.to_string())
                    .data(data)))
            }
            Err(_) => None,
        }
    })
}

/// GET /api/sessions/{id}/events/stream - SSE endpoint for live session events.
pub async fn event_stream(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return *resp,
    };

    let stream = event_stream_from_receiver(handle.subscribe());
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogsmith_core::{Command, RunState, Topic, spawn};
    use ulid::Ulid;

    #[tokio::test]
    async fn sse_stream_receives_events() {
        let handle = spawn(Ulid::new(), RunState::new());

        // Subscribe before sending the command
        let rx = handle.subscribe();
        let mut stream = Box::pin(event_stream_from_receiver(rx));

        handle
            .send_command(Command::StartRun {
                topic: Topic::new("SSE Test").unwrap(),
            })
            .await
            .unwrap();

        let sse_event = tokio::time::timeout(std::time::Duration::from_secs(2), stream.next())
            .await
            .expect("should receive event within timeout")
            .expect("stream should have an item");
        assert!(sse_event.is_ok());
    }

    #[tokio::test]
    async fn sse_stream_yields_one_item_per_event() {
        let handle = spawn(Ulid::new(), RunState::new());
        let rx = handle.subscribe();
        let mut stream = Box::pin(event_stream_from_receiver(rx));

        handle
            .send_command(Command::StartRun {
                topic: Topic::new("Two events").unwrap(),
            })
            .await
            .unwrap();
        handle
            .send_command(Command::FinishRun {
                blog: "# Done".to_string(),
            })
            .await
            .unwrap();

        for _ in 0..2 {
            let item = tokio::time::timeout(std::time::Duration::from_secs(2), stream.next())
                .await
                .expect("event within timeout")
                .expect("stream item");
            assert!(item.is_ok());
        }
    }
}
