//! HTTP client for the hosted text-generation endpoint.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::chat::config::RemoteConfig;
use crate::chat::errors::{ChatError, ChatResult};

use super::response::decode_reply;

/// Boxed future returned by completion backends.
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = ChatResult<String>> + Send + 'a>>;

/// Anything that can turn a prompt into reply text.
pub trait CompletionBackend: Send + Sync {
    /// Fetch one completion for `prompt`.
    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a>;
}

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
    use_cache: bool,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

/// Client for the Hugging Face inference API.
pub struct InferenceClient {
    client: reqwest::Client,
    endpoint: Url,
    token: String,
    config: RemoteConfig,
}

impl InferenceClient {
    /// Build a client for `config.model` under `config.base_url`.
    ///
    /// # Errors
    /// Returns `Config` for an unusable URL and `Http` if the HTTP client
    /// cannot be built.
    pub fn new(config: &RemoteConfig) -> ChatResult<Self> {
        let endpoint = endpoint_url(&config.base_url, &config.model)?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token: config.token.clone(),
            config: config.clone(),
        })
    }

    /// Resolved endpoint URL.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_body<'a>(&self, prompt: &'a str) -> InferenceRequest<'a> {
        let generation = &self.config.generation;
        InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: generation.max_new_tokens,
                temperature: generation.temperature,
                return_full_text: generation.return_full_text,
            },
            options: InferenceOptions {
                wait_for_model: generation.wait_for_model,
                use_cache: generation.use_cache,
            },
        }
    }
}

impl CompletionBackend for InferenceClient {
    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async move {
            let request = self.request_body(prompt);
            let response = self
                .client
                .post(self.endpoint.clone())
                .bearer_auth(&self.token)
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(ChatError::Remote {
                    status: status.as_u16(),
                    body,
                });
            }

            debug!("Inference endpoint answered {} bytes", body.len());
            decode_reply(&body)
        })
    }
}

/// Join the model id onto the base URL.
fn endpoint_url(base_url: &str, model: &str) -> ChatResult<Url> {
    let mut base = base_url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
        .and_then(|url| url.join(model.trim_start_matches('/')))
        .map_err(|e| ChatError::Config(format!("invalid inference URL {base_url:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Captured {
        body: Option<serde_json::Value>,
        authorization: Option<String>,
    }

    /// Serve one canned answer on a random local port and return its base URL.
    async fn spawn_endpoint(
        status: StatusCode,
        answer: &'static str,
    ) -> (String, Arc<Mutex<Captured>>) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let app = Router::new()
            .route(
                "/models/{org}/{name}",
                post(
                    move |State(captured): State<Arc<Mutex<Captured>>>,
                          headers: HeaderMap,
                          Json(body): Json<serde_json::Value>| async move {
                        let mut guard = captured.lock().await;
                        guard.body = Some(body);
                        guard.authorization = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        (status, answer)
                    },
                ),
            )
            .with_state(Arc::clone(&captured));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await;
        let Ok(listener) = listener else {
            panic!("failed to bind test listener");
        };
        let addr = listener.local_addr().map(|a| a.to_string()).unwrap_or_default();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        (format!("http://{addr}/models/"), captured)
    }

    fn client_for(base_url: String, token: &str) -> InferenceClient {
        let config = RemoteConfig {
            base_url,
            token: token.to_string(),
            ..RemoteConfig::default()
        };
        InferenceClient::new(&config).unwrap_or_else(|e| panic!("client: {e}"))
    }

    #[test]
    fn test_endpoint_url_joins_model() {
        let url = endpoint_url("https://api-inference.huggingface.co/models", "google/gemma-2b");
        assert_eq!(
            url.ok().map(|u| u.to_string()).as_deref(),
            Some("https://api-inference.huggingface.co/models/google/gemma-2b")
        );
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        assert!(matches!(
            endpoint_url("not a url", "m"),
            Err(ChatError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_request_shape_and_reply() {
        let (base, captured) =
            spawn_endpoint(StatusCode::OK, r#"[{"generated_text":"  Bonjour  "}]"#).await;
        let client = client_for(base, "hf_secret");

        let reply = client.complete("Hello").await;
        assert_eq!(reply.ok().as_deref(), Some("Bonjour"));

        let guard = captured.lock().await;
        assert_eq!(guard.authorization.as_deref(), Some("Bearer hf_secret"));
        let body = guard.body.clone().unwrap_or_default();
        assert_eq!(body["inputs"], "Hello");
        assert_eq!(body["parameters"]["max_new_tokens"], 200);
        assert_eq!(body["parameters"]["return_full_text"], false);
        assert_eq!(body["options"]["wait_for_model"], true);
        assert_eq!(body["options"]["use_cache"], true);
    }

    #[tokio::test]
    async fn test_non_success_status_is_remote_error() {
        let (base, _) = spawn_endpoint(StatusCode::UNAUTHORIZED, "Invalid credentials").await;
        let client = client_for(base, "");

        let result = client.complete("Hello").await;
        assert!(matches!(
            result,
            Err(ChatError::Remote { status: 401, ref body }) if body == "Invalid credentials"
        ));
    }

    #[tokio::test]
    async fn test_error_payload_is_failure() {
        let (base, _) = spawn_endpoint(StatusCode::OK, r#"{"error":"Model is loading"}"#).await;
        let client = client_for(base, "");

        assert!(matches!(
            client.complete("Hello").await,
            Err(ChatError::RemoteReported(_))
        ));
    }
}
