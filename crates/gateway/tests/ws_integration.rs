//! Integration tests for the WebSocket endpoints
//!
//! Runs a real listener and drives it with a WebSocket client so framing
//! and ordering are observed on the wire.

mod common;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

use plotter_gateway::build_router;

use common::fixture;

type WsClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn serve(router: axum::Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn connect(addr: std::net::SocketAddr, path: &str) -> WsClient {
    let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{}{}", addr, path))
        .await
        .unwrap();
    socket
}

async fn next_text(socket: &mut WsClient) -> String {
    loop {
        match socket.next().await.expect("connection closed early").unwrap() {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_response_then_echo_frame() {
    let f = fixture().await;
    let addr = serve(build_router(f.state)).await;
    let mut socket = connect(addr, "/dataws").await;

    let request = format!("{},0,1000000000,0,,tag-1", f.public_stream);
    socket.send(Message::Text(request.into())).await.unwrap();

    let body = next_text(&mut socket).await;
    let parsed: Vec<Vec<Value>> = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed.len(), 3);

    let echo = next_text(&mut socket).await;
    assert_eq!(echo, "tag-1");
}

#[tokio::test]
async fn test_pipelined_requests_answered_in_order() {
    let f = fixture().await;
    let addr = serve(build_router(f.state)).await;
    let mut socket = connect(addr, "/dataws").await;

    // Two requests pushed back-to-back before reading anything
    let a = format!("{},0,1000000000,0,,tag-A", f.public_stream);
    let b = format!("{},0,1000000000,0,,tag-B", f.public_stream);
    socket.send(Message::Text(a.into())).await.unwrap();
    socket.send(Message::Text(b.into())).await.unwrap();

    // Strict order: A-body, A-echo, B-body, B-echo
    let a_body = next_text(&mut socket).await;
    assert!(a_body.starts_with('['), "A body: {}", a_body);
    assert_eq!(next_text(&mut socket).await, "tag-A");
    let b_body = next_text(&mut socket).await;
    assert!(b_body.starts_with('['), "B body: {}", b_body);
    assert_eq!(next_text(&mut socket).await, "tag-B");
}

#[tokio::test]
async fn test_permission_denied_is_empty_array_frame() {
    let f = fixture().await;
    let addr = serve(build_router(f.state)).await;
    let mut socket = connect(addr, "/dataws").await;

    let request = format!("{},0,1000000000,0,,tag-2", f.campus_stream);
    socket.send(Message::Text(request.into())).await.unwrap();

    assert_eq!(next_text(&mut socket).await, "[]");
    assert_eq!(next_text(&mut socket).await, "tag-2");
}

#[tokio::test]
async fn test_parse_failure_gets_diagnostic_and_empty_echo() {
    let f = fixture().await;
    let addr = serve(build_router(f.state)).await;
    let mut socket = connect(addr, "/dataws").await;

    socket
        .send(Message::Text("one,two".to_string().into()))
        .await
        .unwrap();

    let diagnostic = next_text(&mut socket).await;
    assert!(diagnostic.contains("arguments"));
    assert_eq!(next_text(&mut socket).await, "");
}

#[tokio::test]
async fn test_invalid_token_terminates_connection() {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    let f = fixture().await;
    let addr = serve(build_router(f.state)).await;
    let mut socket = connect(addr, "/dataws").await;

    let forged = BASE64.encode(vec![0u8; 128]);
    let request = format!("{},0,1000000000,0,{},tag-3", f.public_stream, forged);
    socket.send(Message::Text(request.into())).await.unwrap();

    assert_eq!(next_text(&mut socket).await, "Invalid token");

    // No echo frame follows; the server closes the connection.
    match socket.next().await {
        None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {}
        Some(Ok(frame)) => panic!("expected close, got {:?}", frame),
    }
}

#[tokio::test]
async fn test_bracket_ws_roundtrip() {
    let f = fixture().await;
    let addr = serve(build_router(f.state)).await;
    let mut socket = connect(addr, "/bracketws").await;

    // Unauthenticated: the campus stream is filtered before dispatch
    let request = format!("{},{},,tag-4", f.public_stream, f.campus_stream);
    socket.send(Message::Text(request.into())).await.unwrap();

    let body = next_text(&mut socket).await;
    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["Brackets"].as_array().unwrap().len(), 1);

    assert_eq!(next_text(&mut socket).await, "tag-4");
}

#[tokio::test]
async fn test_backend_error_appears_as_trailer_in_frame() {
    let f = fixture().await;
    f.tsdb.poison(f.public_stream, "replica down");
    let addr = serve(build_router(f.state)).await;
    let mut socket = connect(addr, "/dataws").await;

    let request = format!("{},0,1000000000,0,,tag-5", f.public_stream);
    socket.send(Message::Text(request.into())).await.unwrap();

    let body = next_text(&mut socket).await;
    assert!(body.ends_with("Error: database error: replica down"), "{}", body);
    assert_eq!(next_text(&mut socket).await, "tag-5");
}
