//! WebSocket variants of the query endpoints
//!
//! One reader task per connection serves its requests sequentially, so
//! responses go out in request order by construction — exclusive ownership
//! of the socket plays the role a per-connection write lock plays elsewhere.
//! Each request frame is answered by one response frame and then one frame
//! echoing the client's opaque tag; the next request is not read until both
//! are flushed.
//!
//! A read error (including an oversized message) or an invalid token
//! terminates the connection.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tracing::debug;

use plotter_dispatch::BufferSink;

use crate::handlers::bracket::filter_permitted;
use crate::handlers::resolve_session;
use crate::protocol::{parse_bracket_request, parse_data_request, ERROR_INVALID_TOKEN};
use crate::state::AppState;

/// What one request frame produced.
enum FrameOutcome {
    /// Send the response frame, then the echo frame.
    Reply { body: String, echo: String },
    /// Send one final frame and close the connection.
    Terminate(String),
}

/// `GET /dataws` — WebSocket variant of `/data`.
pub async fn data_ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(state.max_request_bytes)
        .on_upgrade(move |socket| data_connection(socket, state))
}

/// `GET /bracketws` — WebSocket variant of `/bracket`.
pub async fn bracket_ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(state.max_request_bytes)
        .on_upgrade(move |socket| bracket_connection(socket, state))
}

async fn data_connection(mut socket: WebSocket, state: AppState) {
    while let Some(message) = socket.recv().await {
        let Ok(message) = message else {
            return; // read error or oversized message
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return,
            _ => continue,
        };

        let outcome = serve_data_frame(&state, text.as_str()).await;
        if !deliver(&mut socket, outcome).await {
            return;
        }
    }
}

async fn bracket_connection(mut socket: WebSocket, state: AppState) {
    while let Some(message) = socket.recv().await {
        let Ok(message) = message else {
            return;
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return,
            _ => continue,
        };

        let outcome = serve_bracket_frame(&state, text.as_str()).await;
        if !deliver(&mut socket, outcome).await {
            return;
        }
    }
}

/// Send the frames for one outcome. Returns whether the connection should
/// keep serving.
async fn deliver(socket: &mut WebSocket, outcome: FrameOutcome) -> bool {
    match outcome {
        FrameOutcome::Reply { body, echo } => {
            if socket.send(Message::Text(body.into())).await.is_err() {
                return false;
            }
            if let Err(err) = socket.send(Message::Text(echo.into())).await {
                debug!(error = %err, "could not echo tag to client");
                return false;
            }
            true
        }
        FrameOutcome::Terminate(body) => {
            let _ = socket.send(Message::Text(body.into())).await;
            false
        }
    }
}

async fn serve_data_frame(state: &AppState, frame: &str) -> FrameOutcome {
    let request = match parse_data_request(frame) {
        Ok(request) => request,
        Err(diagnostic) => {
            return FrameOutcome::Reply {
                body: diagnostic,
                echo: String::new(),
            }
        }
    };

    let Ok(session) = resolve_session(state, &request.token) else {
        return FrameOutcome::Terminate(ERROR_INVALID_TOKEN.to_string());
    };

    if !state
        .permissions
        .has_permission(session.as_ref(), request.uuid)
        .await
    {
        return FrameOutcome::Reply {
            body: "[]".to_string(),
            echo: request.echo_tag,
        };
    }

    let mut sink = BufferSink::new();
    // BufferSink writes cannot fail; the frame is sent whole afterwards.
    let _ = state
        .data
        .data_request(
            request.uuid,
            request.start,
            request.end,
            request.pw,
            &mut sink,
        )
        .await;

    FrameOutcome::Reply {
        body: String::from_utf8_lossy(sink.as_bytes()).into_owned(),
        echo: request.echo_tag,
    }
}

async fn serve_bracket_frame(state: &AppState, frame: &str) -> FrameOutcome {
    let request = match parse_bracket_request(frame, true) {
        Ok(request) => request,
        Err(diagnostic) => {
            return FrameOutcome::Reply {
                body: diagnostic,
                echo: String::new(),
            }
        }
    };

    let Ok(session) = resolve_session(state, &request.token) else {
        return FrameOutcome::Terminate(ERROR_INVALID_TOKEN.to_string());
    };

    let permitted = filter_permitted(state, session.as_ref(), &request.uuids).await;

    let mut sink = BufferSink::new();
    let _ = state.brackets.bracket_request(&permitted, &mut sink).await;

    FrameOutcome::Reply {
        body: String::from_utf8_lossy(sink.as_bytes()).into_owned(),
        echo: request.echo_tag,
    }
}
