//! HTTP implementation of [`AgentBackend`]
//!
//! `POST /api/plan`, `POST /api/run` and `GET /api/run/{id}/stream` against
//! the configured base URL. The stream endpoint speaks `text/event-stream`;
//! its body is split into `data:` payloads by [`SseParser`].

use futures::StreamExt;
use prophet_web_sdk::{
    async_trait, AgentBackend, ClientError, FrameStream, PlanRequest, PlanResponse, Result,
    RunCreated, RunRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::decoder::SseParser;

fn network(e: reqwest::Error) -> ClientError {
    ClientError::Network(e.to_string())
}

/// Backend reached over HTTP
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(network)?;
        Ok(Self { client, config })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        tracing::debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        let text = response.text().await.map_err(network)?;
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: error_detail(&text),
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Pull the human-readable cause out of an error body.
///
/// Error responses usually look like `{"detail": "..."}`; anything else is
/// returned as-is.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("message"))
                .and_then(|d| d.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl AgentBackend for HttpBackend {
    async fn plan(&self, request: &PlanRequest) -> Result<PlanResponse> {
        self.post_json("/api/plan", request).await
    }

    async fn create_run(&self, request: &RunRequest) -> Result<RunCreated> {
        let created: RunCreated = self.post_json("/api/run", request).await?;
        tracing::debug!(run_id = %created.run_id, "run created");
        Ok(created)
    }

    async fn open_stream(&self, run_id: &str) -> Result<FrameStream> {
        let url = self.config.endpoint(&format!("/api/run/{}/stream", run_id));
        tracing::debug!(url = %url, "GET event stream");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: error_detail(&body),
            });
        }

        let mut bytes = response.bytes_stream();
        let frames = async_stream::stream! {
            let mut parser = SseParser::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for frame in parser.feed(&chunk) {
                            yield Ok(frame);
                        }
                    }
                    Err(e) => {
                        yield Err(ClientError::StreamClosed(e.to_string()));
                        return;
                    }
                }
            }
            if let Some(frame) = parser.finish() {
                yield Ok(frame);
            }
        };
        Ok(frames.boxed())
    }
}
