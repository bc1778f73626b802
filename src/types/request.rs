//! Inbound chat request parsing and validation.

use serde_json::Value;

use crate::{Result, SportmlError};

/// Default ceiling on message length, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 2000;

/// A validated inbound chat request.
///
/// `message` is always trimmed, non-empty, and within the length ceiling
/// it was validated against. `client_id` is the opaque rate-limit identity
/// derived from the request origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub client_id: String,
}

impl ChatRequest {
    /// Validate `message` and build a request.
    pub fn new(message: &str, client_id: impl Into<String>, max_chars: usize) -> Result<Self> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(SportmlError::InvalidInput(
                "message is required and must contain text".into(),
            ));
        }
        let chars = trimmed.chars().count();
        if chars > max_chars {
            return Err(SportmlError::MessageTooLong {
                chars,
                limit: max_chars,
            });
        }
        Ok(Self {
            message: trimmed.to_owned(),
            client_id: client_id.into(),
        })
    }

    /// Parse a `{ "message": string }` body and validate it.
    ///
    /// Unparsable JSON, a missing or non-string `message`, a blank message
    /// and an oversized message are all rejected as invalid input.
    pub fn from_json(body: &[u8], client_id: impl Into<String>, max_chars: usize) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|_| {
            SportmlError::InvalidInput("request body is not valid JSON".into())
        })?;
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SportmlError::InvalidInput("message is required and must be a string".into())
            })?;
        Self::new(message, client_id, max_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_message() {
        let req = ChatRequest::new("  who won?  ", "1.2.3.4", 100).unwrap();
        assert_eq!(req.message, "who won?");
        assert_eq!(req.client_id, "1.2.3.4");
    }

    #[test]
    fn rejects_blank_message() {
        let err = ChatRequest::new(" \n\t ", "c", 100).unwrap_err();
        assert!(matches!(err, SportmlError::InvalidInput(_)));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 4 characters, 8 bytes
        assert!(ChatRequest::new("ăîșț", "c", 4).is_ok());
        let err = ChatRequest::new("ăîșțâ", "c", 4).unwrap_err();
        assert!(matches!(
            err,
            SportmlError::MessageTooLong { chars: 5, limit: 4 }
        ));
    }

    #[test]
    fn length_is_measured_after_trimming() {
        assert!(ChatRequest::new("   abcd   ", "c", 4).is_ok());
    }

    #[test]
    fn from_json_accepts_message_field() {
        let req = ChatRequest::from_json(br#"{"message":"Hello"}"#, "c", 100).unwrap();
        assert_eq!(req.message, "Hello");
    }

    #[test]
    fn from_json_rejects_garbage() {
        let err = ChatRequest::from_json(b"{not json", "c", 100).unwrap_err();
        assert!(matches!(err, SportmlError::InvalidInput(_)));
    }

    #[test]
    fn from_json_rejects_missing_or_non_string_message() {
        let bodies: [&[u8]; 4] = [br#"{}"#, br#"{"message":42}"#, br#"{"message":null}"#, b"[]"];
        for body in bodies {
            let err = ChatRequest::from_json(body, "c", 100).unwrap_err();
            assert!(matches!(err, SportmlError::InvalidInput(_)), "{err}");
        }
    }
}
