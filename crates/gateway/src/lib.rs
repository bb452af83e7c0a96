//! Plotter Gateway - HTTP/WebSocket protocol adapter
//!
//! The wire surface of the plotting gateway. Every operation exists as an
//! HTTP endpoint, and the two query operations also as WebSocket variants
//! for interactive clients that pipeline requests:
//!
//! | Endpoint | Method | Body |
//! |----------|--------|------|
//! | `/data` | POST | `uuid,start,end,pw[,token[,echo]]` |
//! | `/dataws` | GET (upgrade) | same, one request per text frame |
//! | `/bracket` | POST | `uuid,...,token` |
//! | `/bracketws` | GET (upgrade) | `uuid,...,token,echo` per frame |
//! | `/login` | POST | JSON `{"username","password"}` |
//! | `/logoff` | POST | base64 token |
//! | `/checktoken` | POST | base64 token |
//! | `/changepw` | POST | JSON `{"token","oldpassword","newpassword"}` |
//!
//! Request bodies are capped (16 KiB by default); the WebSocket read limit
//! matches. Data responses stream as points arrive from the database.
//! On a WebSocket, each request frame is answered by one response frame
//! followed by one frame echoing the client's opaque tag, strictly in
//! request order.

pub mod handlers;
mod protocol;
mod routes;
mod sink;
mod state;
mod ws;

pub use protocol::{
    parse_bracket_request, parse_data_request, BracketRequest, DataRequest, ERROR_INVALID_TOKEN,
    SUCCESS,
};
pub use routes::build_router;
pub use sink::{streaming_body, ChannelSink};
pub use state::AppState;
