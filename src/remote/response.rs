//! Decoding of inference endpoint responses.
//!
//! The endpoint answers in several shapes depending on model and load.
//! [`InferenceResponse`] lists them in the order they are tried, with one
//! catch-all variant last.

use serde::Deserialize;
use tracing::debug;

use crate::chat::errors::{ChatError, ChatResult};

/// Reply used when a 2xx body has no usable text.
pub const NO_RESPONSE: &str = "(No response from model)";

/// An object carrying generated text.
#[derive(Debug, Deserialize)]
pub struct Generation {
    /// Model output.
    pub generated_text: String,
    /// Error reported alongside empty output.
    #[serde(default)]
    pub error: Option<String>,
}

/// An object carrying an error message.
#[derive(Debug, Deserialize)]
pub struct InferenceFailure {
    /// Error reported by the endpoint.
    pub error: String,
}

/// One element of a batch response.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    /// Element with generated text.
    Generation(Generation),
    /// Anything else.
    Other(serde_json::Value),
}

/// Every accepted response shape, tried top to bottom.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InferenceResponse {
    /// `[{"generated_text": "..."}, ...]`
    Generations(Vec<BatchItem>),
    /// `{"generated_text": "..."}`
    Generation(Generation),
    /// `"..."`
    Text(String),
    /// `{"error": "..."}`
    Failure(InferenceFailure),
    /// Any other JSON value.
    Unrecognized(serde_json::Value),
}

impl InferenceResponse {
    /// Decode a response body.
    ///
    /// # Errors
    /// Returns `Serialization` if the body is not JSON.
    pub fn parse(body: &str) -> ChatResult<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Normalize to reply text.
    ///
    /// An empty `generated_text` counts as absent.
    ///
    /// # Errors
    /// Returns `RemoteReported` for an error payload.
    pub fn into_reply(self) -> ChatResult<String> {
        match self {
            Self::Generations(items) => match items.into_iter().next() {
                Some(BatchItem::Generation(generation)) => generation_text(generation),
                _ => Ok(NO_RESPONSE.to_string()),
            },
            Self::Generation(generation) => generation_text(generation),
            Self::Text(text) => Ok(text.trim().to_string()),
            Self::Failure(failure) if !failure.error.is_empty() => {
                Err(ChatError::RemoteReported(failure.error))
            }
            Self::Failure(_) => Ok(NO_RESPONSE.to_string()),
            Self::Unrecognized(value) => {
                debug!("Unrecognized inference response: {value}");
                Ok(NO_RESPONSE.to_string())
            }
        }
    }
}

fn generation_text(generation: Generation) -> ChatResult<String> {
    if !generation.generated_text.is_empty() {
        return Ok(generation.generated_text.trim().to_string());
    }
    match generation.error {
        Some(error) if !error.is_empty() => Err(ChatError::RemoteReported(error)),
        _ => Ok(NO_RESPONSE.to_string()),
    }
}

/// Decode and normalize a 2xx body in one step.
///
/// # Errors
/// Returns `Serialization` for non-JSON bodies and `RemoteReported` for
/// error payloads.
pub fn decode_reply(body: &str) -> ChatResult<String> {
    InferenceResponse::parse(body)?.into_reply()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_shape() {
        assert_eq!(decode_reply(r#"[{"generated_text":" hi "}]"#).ok().as_deref(), Some("hi"));
    }

    #[test]
    fn test_object_shape() {
        assert_eq!(decode_reply(r#"{"generated_text":"hi"}"#).ok().as_deref(), Some("hi"));
    }

    #[test]
    fn test_bare_string_shape() {
        assert_eq!(decode_reply(r#""hi""#).ok().as_deref(), Some("hi"));
    }

    #[test]
    fn test_error_shape_fails() {
        let result = decode_reply(r#"{"error":"busy"}"#);
        assert!(matches!(result, Err(ChatError::RemoteReported(msg)) if msg == "busy"));
    }

    #[test]
    fn test_unknown_object_is_placeholder() {
        assert_eq!(decode_reply("{}").ok().as_deref(), Some(NO_RESPONSE));
        assert_eq!(decode_reply("42").ok().as_deref(), Some(NO_RESPONSE));
        assert_eq!(decode_reply("[]").ok().as_deref(), Some(NO_RESPONSE));
    }

    #[test]
    fn test_batch_first_element_decides() {
        assert_eq!(
            decode_reply(r#"[{"generated_text":"first"},{"unexpected":1}]"#).ok().as_deref(),
            Some("first")
        );
        assert_eq!(
            decode_reply(r#"[{"unexpected":1},{"generated_text":"second"}]"#).ok().as_deref(),
            Some(NO_RESPONSE)
        );
    }

    #[test]
    fn test_empty_generated_text_is_placeholder() {
        assert_eq!(decode_reply(r#"{"generated_text":""}"#).ok().as_deref(), Some(NO_RESPONSE));
    }

    #[test]
    fn test_empty_text_with_error_fails() {
        let result = decode_reply(r#"{"generated_text":"","error":"busy"}"#);
        assert!(matches!(result, Err(ChatError::RemoteReported(msg)) if msg == "busy"));

        let batch = decode_reply(r#"[{"generated_text":"","error":"overloaded"}]"#);
        assert!(matches!(batch, Err(ChatError::RemoteReported(msg)) if msg == "overloaded"));
    }

    #[test]
    fn test_text_wins_over_error() {
        assert_eq!(
            decode_reply(r#"{"generated_text":"hi","error":"ignored"}"#).ok().as_deref(),
            Some("hi")
        );
    }

    #[test]
    fn test_non_json_body_fails() {
        assert!(matches!(
            decode_reply("<html>oops</html>"),
            Err(ChatError::Serialization(_))
        ));
    }
}
