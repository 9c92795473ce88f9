use serde::Deserialize;

use crate::error::RequestError;

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Convert a non-2xx response into a `RequestError`.
///
/// Uses `error.message` from a JSON body when present, otherwise the generic
/// `Request failed (<status>)` text.
pub fn normalize_error_response(status: u16, body: &[u8]) -> RequestError {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty())
        .map(|message| RequestError::status(status, message))
        .unwrap_or_else(|| RequestError::generic_status(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_server_message_when_present() {
        let err = normalize_error_response(400, br#"{"error":{"message":"body is required"}}"#);
        assert_eq!(err.message, "body is required");
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn falls_back_for_non_json_body() {
        let err = normalize_error_response(502, b"<html>Bad Gateway</html>");
        assert_eq!(err.message, "Request failed (502)");
    }

    #[test]
    fn falls_back_when_message_is_missing() {
        assert_eq!(
            normalize_error_response(500, br#"{"error":{}}"#).message,
            "Request failed (500)"
        );
        assert_eq!(
            normalize_error_response(404, br#"{"detail":"nope"}"#).message,
            "Request failed (404)"
        );
        assert_eq!(normalize_error_response(503, b"").message, "Request failed (503)");
    }
}
