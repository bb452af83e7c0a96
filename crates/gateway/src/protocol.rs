//! Wire parsing
//!
//! Query bodies are comma-separated ASCII rather than JSON: the plotting UI
//! issues thousands of these per session, and the format predates the
//! gateway. Parse failures produce a plain-text diagnostic for the client,
//! never a panic.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use uuid::Uuid;

/// Status string for successful mutations.
pub const SUCCESS: &str = "Success";

/// Sentinel written for an expired or invalid session token.
pub const ERROR_INVALID_TOKEN: &str = "Invalid token";

/// A parsed data query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    pub uuid: Uuid,
    /// Aligned down to `2^pw`.
    pub start: i64,
    /// Aligned up to `2^pw`, plus one quantum so the endpoint is inclusive.
    pub end: i64,
    pub pw: u8,
    /// Base64 session token; empty for unauthenticated requests.
    pub token: String,
    /// Opaque client correlation tag (WebSocket only).
    pub echo_tag: String,
}

/// A parsed bracket query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketRequest {
    pub uuids: Vec<Uuid>,
    /// Base64 session token; empty for unauthenticated requests.
    pub token: String,
    /// Opaque client correlation tag (WebSocket only).
    pub echo_tag: String,
}

/// Parse `uuid,start,end,pw[,token[,echo]]`.
///
/// `start` and `end` come back aligned to the point width. The returned
/// `Err` is the diagnostic to send to the client.
pub fn parse_data_request(body: &str) -> Result<DataRequest, String> {
    let args: Vec<&str> = body.split(',').collect();

    if !(4..=6).contains(&args.len()) {
        return Err(format!(
            "Four, five, or six arguments are required; got {}",
            args.len()
        ));
    }

    let uuid = Uuid::parse_str(args[0]).map_err(|_| format!("Invalid UUID: got {}", args[0]))?;

    let start: i64 = args[1]
        .parse()
        .map_err(|e| format!("Could not interpret {} as an int64: {}", args[1], e))?;
    let end: i64 = args[2]
        .parse()
        .map_err(|e| format!("Could not interpret {} as an int64: {}", args[2], e))?;

    let pw: i16 = args[3]
        .parse()
        .map_err(|e| format!("Could not interpret {} as an int16: {}", args[3], e))?;
    if !(0..=62).contains(&pw) {
        return Err(format!("Invalid point width: {}", pw));
    }
    let pw = pw as u8;

    // Align the range to the point width. The end is rounded up one quantum
    // to make the endpoint inclusive. Arithmetic shifts floor negative
    // instants; overflow at the extremes wraps like the database's own
    // arithmetic.
    let start = (start >> pw) << pw;
    let end = (end >> pw).wrapping_add(1).wrapping_shl(pw as u32);

    let token = args.get(4).unwrap_or(&"").to_string();
    let echo_tag = args.get(5).unwrap_or(&"").to_string();

    Ok(DataRequest {
        uuid,
        start,
        end,
        pw,
        token,
        echo_tag,
    })
}

/// Parse `uuid,...,uuid,token` (HTTP) or `uuid,...,uuid,token,echo`
/// (WebSocket, `expect_echo`).
pub fn parse_bracket_request(body: &str, expect_echo: bool) -> Result<BracketRequest, String> {
    let args: Vec<&str> = body.split(',').collect();

    let trailing = if expect_echo { 2 } else { 1 };
    if args.len() < trailing + 1 {
        return Err(format!("Got only {} arguments", args.len()));
    }
    let num_uuids = args.len() - trailing;

    let mut uuids = Vec::with_capacity(num_uuids);
    for arg in &args[..num_uuids] {
        let uuid =
            Uuid::parse_str(arg).map_err(|_| format!("Received invalid UUID {}", arg))?;
        uuids.push(uuid);
    }

    let token = args[num_uuids].to_string();
    let echo_tag = if expect_echo {
        args[num_uuids + 1].to_string()
    } else {
        String::new()
    };

    Ok(BracketRequest {
        uuids,
        token,
        echo_tag,
    })
}

/// Decode a base64 session token. `None` if the encoding is invalid.
pub fn decode_token(encoded: &str) -> Option<Vec<u8>> {
    BASE64.decode(encoded.trim()).ok()
}
