//! Remote completion: the inference HTTP client and its response decoder.

pub mod client;
pub mod response;

pub use client::{CompletionBackend, CompletionFuture, InferenceClient};
pub use response::{InferenceResponse, NO_RESPONSE, decode_reply};
