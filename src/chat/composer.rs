//! Reply orchestration: remote completion with a rule-based fallback.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::remote::CompletionBackend;

use super::errors::{ChatError, ChatResult};
use super::fallback::FallbackResponder;

/// Reply recorded when the user stops a pending request.
pub const CANCELLED_REPLY: &str = "(Request cancelled)";

/// Produces the reply for a submitted prompt. The user always gets text back.
pub struct Composer {
    backend: Arc<dyn CompletionBackend>,
    fallback: FallbackResponder,
    timeout: Duration,
}

impl Composer {
    /// Create a composer over `backend`, bounding each call by `timeout`.
    ///
    /// # Errors
    /// Returns `Pattern` if the fallback rules fail to compile.
    pub fn new(backend: Arc<dyn CompletionBackend>, timeout: Duration) -> ChatResult<Self> {
        Ok(Self {
            backend,
            fallback: FallbackResponder::new()?,
            timeout,
        })
    }

    /// Ask the backend; on any failure answer from the fallback rules.
    pub async fn reply_for(&self, prompt: &str) -> String {
        match self.remote_reply(prompt).await {
            Ok(reply) => {
                debug!("Remote reply received ({} chars)", reply.chars().count());
                reply
            }
            Err(err) if err.is_remote() => {
                warn!("Remote completion failed, using fallback: {err}");
                self.fallback.respond(prompt)
            }
            Err(err) => {
                error!("Completion failed outside the remote path, using fallback: {err}");
                self.fallback.respond(prompt)
            }
        }
    }

    async fn remote_reply(&self, prompt: &str) -> ChatResult<String> {
        tokio::time::timeout(self.timeout, self.backend.complete(prompt))
            .await
            .map_err(|_| ChatError::Timeout)?
    }
}
