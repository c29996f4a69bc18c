//! Server-sent event stream of timer notifications

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{info, warn};

use crate::{
    state::AppState,
    sync::{TimerEvent, Topic},
};

/// Handle GET /events - Stream every published notification, named by topic
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New event stream connection");
    let stream = BroadcastStream::new(state.sync.hub().receiver())
        .filter_map(|received| async move { to_sse_event(received) })
        .map(Ok::<Event, Infallible>);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_sse_event(received: Result<TimerEvent, BroadcastStreamRecvError>) -> Option<Event> {
    frame(received).map(|(topic, data)| Event::default().event(topic.as_str()).data(data))
}

/// Event name and JSON data for one received notification
fn frame(received: Result<TimerEvent, BroadcastStreamRecvError>) -> Option<(Topic, String)> {
    match received {
        Ok(event) => match event.payload_json() {
            Ok(data) => Some((event.topic(), data)),
            Err(e) => {
                warn!("Failed to serialize {} event: {}", event.topic(), e);
                None
            }
        },
        // subscribers re-derive state from the calculator, skipped events are harmless
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!("Event stream lagged, skipped {} notifications", skipped);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use chrono::DateTime;
    use clap::Parser;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        api::create_router,
        config::Config,
        sync::{events::BatchTimerUpdate, TimerUpdate},
    };

    #[test]
    fn batch_frame_is_named_by_topic() {
        let batch = TimerEvent::Batch(BatchTimerUpdate {
            updates: vec![TimerUpdate {
                table_id: 2,
                remaining_time_ms: -1000.0,
                initial_time_ms: 3_600_000.0,
            }],
            timestamp: DateTime::from_timestamp(1_715_000_000, 0).unwrap(),
        });

        let (topic, data) = frame(Ok(batch.clone())).unwrap();
        assert_eq!(topic.as_str(), "batch-timer-update");
        let json: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(json["updates"][0]["table_id"], 2);
        assert_eq!(json["updates"][0]["remaining_time_ms"], -1000.0);

        assert!(to_sse_event(Ok(batch)).is_some());
    }

    #[test]
    fn lagged_receivers_skip_silently() {
        assert!(frame(Err(BroadcastStreamRecvError::Lagged(7))).is_none());
        assert!(to_sse_event(Err(BroadcastStreamRecvError::Lagged(1))).is_none());
    }

    #[tokio::test]
    async fn stream_delivers_published_timer_updates() {
        let config = Config::parse_from(["cue-clock", "--tables", "1"]);
        let state = Arc::new(AppState::new(&config));
        let router = create_router(Arc::clone(&state));

        let response = router
            .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        state.sync.broadcaster().broadcast_timer_update(1, 42_000.0, 60_000.0);

        let mut body = response.into_body().into_data_stream();
        let chunk = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.contains("event: timer-update"), "{text}");
        assert!(text.contains(r#""remaining_time_ms":42000.0"#), "{text}");
    }
}
