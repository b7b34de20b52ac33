use crate::dispatcher::HandlerResponse;
use may_minihttp::Response;
use serde_json::{json, Value};
use tracing::error;

/// Wire Content-Type for every pipeline-produced response.
const CONTENT_TYPE_JSON: &str = "Content-Type: application/json; charset=utf-8";

/// Fixed failure messages, one per error category. Deliberately not
/// parameterized by internal state.
pub const MSG_NOT_FOUND: &str = "Not found.";
pub const MSG_FORBIDDEN: &str = "Forbidden.";
pub const MSG_NOT_JSON: &str = "Content-Type is not application/json.";
pub const MSG_TOO_LARGE: &str = "Message is too large.";
pub const MSG_PARSE: &str = "Message could not parse as JSON.";
pub const MSG_INVALID: &str = "Message is invalid.";
pub const MSG_INTERNAL: &str = "Internal server error.";

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        406 => "Not Acceptable",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// Write a responder-produced reply as `{"success": <payload>}`.
pub fn write_success(res: &mut Response, reply: HandlerResponse) {
    res.status_code(reply.status as usize, status_reason(reply.status));
    for (name, value) in &reply.headers {
        // The wire contract owns Content-Type.
        if name.eq_ignore_ascii_case("content-type") {
            continue;
        }
        let line = format!("{name}: {value}").into_boxed_str();
        res.header(&*Box::leak(line));
    }
    res.header(CONTENT_TYPE_JSON);
    res.body_vec(encode(&json!({ "success": reply.body })));
}

/// Write a pipeline failure as `{"failure": "<message>"}`.
pub fn write_failure(res: &mut Response, status: u16, message: &str) {
    res.status_code(status as usize, status_reason(status));
    res.header(CONTENT_TYPE_JSON);
    res.body_vec(encode(&json!({ "failure": message })));
}

fn encode(body: &Value) -> Vec<u8> {
    serde_json::to_vec(body).unwrap_or_else(|err| {
        // Unreachable for the envelope shapes above, but never panic the
        // connection coroutine over serialization.
        error!(error = %err, "Failed to encode response body");
        b"{\"failure\":\"Internal server error.\"}".to_vec()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_cover_pipeline_statuses() {
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(406), "Not Acceptable");
        assert_eq!(status_reason(413), "Payload Too Large");
        assert_eq!(status_reason(500), "Internal Server Error");
        assert_eq!(status_reason(299), "OK");
    }

    #[test]
    fn envelopes_are_fixed_shape() {
        assert_eq!(
            encode(&json!({ "failure": MSG_NOT_FOUND })),
            br#"{"failure":"Not found."}"#.to_vec()
        );
        assert_eq!(
            encode(&json!({ "success": 1 })),
            br#"{"success":1}"#.to_vec()
        );
    }
}
