//! Concrete upstream collaborator (§6.1). The firehose is "an external
//! client library" the ingestion service merely consumes (§6.1) — this
//! module is that library's thinnest possible shape: an HTTP admin API
//! for the repo-tracking subscription, and a newline-delimited-JSON
//! stream of the two event shapes §6.1 specifies, both over `reqwest`
//! (the same HTTP-client pattern as `AccountAgeOracle` in
//! `forum-ingest/src/account_age.rs`).

use std::time::Duration;

use async_trait::async_trait;
use forum_core::{IdentityEvent, RecordEvent};
use forum_ingest::repo_tracker::{UpstreamClient, UpstreamError};
use forum_ingest::service::{UpstreamEvent, UpstreamStream};
use futures::StreamExt as _;
use tokio::sync::mpsc;
use tracing::warn;

const LOG_TARGET: &str = "forum::server::upstream";
const ADMIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum FirehoseLine {
    Record(RecordEvent),
    Identity(IdentityEvent),
}

/// Admin API client for the upstream's tracked-repo subscription.
pub struct HttpUpstreamClient {
    client: reqwest::Client,
    upstream_url: String,
    admin_password: String,
}

impl HttpUpstreamClient {
    pub fn new(upstream_url: String, admin_password: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(ADMIN_TIMEOUT)
            .build()
            .expect("reqwest client builder with only a timeout never fails");
        Self {
            client,
            upstream_url,
            admin_password,
        }
    }

    fn repo_url(&self, repo_id: &str) -> String {
        format!(
            "{}/admin/repos/{}",
            self.upstream_url.trim_end_matches('/'),
            urlencoding::encode(repo_id)
        )
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn add_repo(&self, repo_id: &str) -> Result<(), UpstreamError> {
        self.client
            .put(self.repo_url(repo_id))
            .bearer_auth(&self.admin_password)
            .send()
            .await
            .map_err(|source| UpstreamError {
                message: format!("failed to subscribe upstream to {repo_id}: {source}"),
            })?
            .error_for_status()
            .map_err(|source| UpstreamError {
                message: format!("upstream rejected subscribe for {repo_id}: {source}"),
            })?;
        Ok(())
    }

    async fn remove_repo(&self, repo_id: &str) -> Result<(), UpstreamError> {
        self.client
            .delete(self.repo_url(repo_id))
            .bearer_auth(&self.admin_password)
            .send()
            .await
            .map_err(|source| UpstreamError {
                message: format!("failed to unsubscribe upstream from {repo_id}: {source}"),
            })?
            .error_for_status()
            .map_err(|source| UpstreamError {
                message: format!("upstream rejected unsubscribe for {repo_id}: {source}"),
            })?;
        Ok(())
    }
}

/// Reads the firehose's NDJSON stream (§6.1) and forwards each parsed line
/// onto the ingestion service's channel.
pub struct HttpUpstreamStream {
    client: reqwest::Client,
    stream_url: String,
}

impl HttpUpstreamStream {
    pub fn new(stream_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            stream_url,
        }
    }
}

#[async_trait]
impl UpstreamStream for HttpUpstreamStream {
    async fn connect(&self, sink: mpsc::Sender<UpstreamEvent>) -> Result<(), UpstreamError> {
        let response = self
            .client
            .get(&self.stream_url)
            .send()
            .await
            .map_err(|source| UpstreamError {
                message: format!("firehose connect failed: {source}"),
            })?;

        let mut lines = response.bytes_stream();
        let mut carry = Vec::new();
        while let Some(chunk) = lines.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(source) => {
                    let _ = sink
                        .send(UpstreamEvent::Error(UpstreamError {
                            message: format!("firehose transport error: {source}"),
                        }))
                        .await;
                    continue;
                }
            };
            carry.extend_from_slice(&chunk);
            while let Some(pos) = carry.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = carry.drain(..=pos).collect();
                let line = &line[..line.len() - 1];
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_slice::<FirehoseLine>(line) {
                    Ok(FirehoseLine::Record(event)) => {
                        if sink.send(UpstreamEvent::Record(event)).await.is_err() {
                            return Ok(());
                        }
                    }
                    Ok(FirehoseLine::Identity(event)) => {
                        if sink.send(UpstreamEvent::Identity(event)).await.is_err() {
                            return Ok(());
                        }
                    }
                    Err(err) => {
                        warn!(target: LOG_TARGET, error = %err, "unparseable firehose line, skipping");
                    }
                }
            }
        }
        Ok(())
    }
}
