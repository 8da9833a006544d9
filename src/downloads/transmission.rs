//! Transmission RPC client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::client::{JobClient, JobHandle, JobSource};
use crate::config::TransmissionConfig;
use crate::error::{Error, Result};

/// CSRF token header the daemon hands out with a 409 response.
const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Transmission JSON-RPC client.
pub struct TransmissionClient {
    http: reqwest::Client,
    url: String,
    user: Option<String>,
    password: Option<String>,
    session_id: Mutex<Option<String>>,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct AddedTorrent {
    id: i64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct AddArguments {
    #[serde(rename = "torrent-added")]
    added: Option<AddedTorrent>,
    #[serde(rename = "torrent-duplicate")]
    duplicate: Option<AddedTorrent>,
}

#[derive(Deserialize)]
struct TorrentFields {
    #[serde(rename = "percentDone", default)]
    percent_done: Option<f64>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct GetArguments {
    #[serde(default)]
    torrents: Vec<TorrentFields>,
}

impl TransmissionClient {
    pub fn new(config: &TransmissionConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| Error::Config("transmission.url is required".to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            url,
            user: config.user.clone(),
            password: config.password.clone(),
            session_id: Mutex::new(None),
        })
    }

    /// Perform one RPC call, renewing the session id once if the daemon asks.
    async fn call(&self, method: &str, arguments: Value) -> Result<Value> {
        let body = json!({ "method": method, "arguments": arguments });

        for _ in 0..2 {
            let mut request = self.http.post(&self.url).json(&body);
            if let Some(user) = &self.user {
                request = request.basic_auth(user, self.password.as_ref());
            }
            if let Some(id) = self.session_id.lock().await.clone() {
                request = request.header(SESSION_HEADER, id);
            }

            let response = request.send().await?;
            if response.status() == StatusCode::CONFLICT {
                let id = response
                    .headers()
                    .get(SESSION_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
                    .ok_or_else(|| Error::Job("409 without a session id".to_string()))?;
                tracing::debug!("Renewed Transmission session id");
                *self.session_id.lock().await = Some(id);
                continue;
            }

            let reply: RpcResponse = response.error_for_status()?.json().await?;
            return rpc_arguments(reply);
        }

        Err(Error::Job(format!("{}: session id handshake failed", method)))
    }

    async fn torrent_fields(&self, job: JobHandle, fields: &[&str]) -> Result<TorrentFields> {
        let arguments = self
            .call("torrent-get", json!({ "fields": fields, "ids": [job.0] }))
            .await?;
        single_torrent(arguments, job)
    }
}

fn rpc_arguments(reply: RpcResponse) -> Result<Value> {
    if reply.result != "success" {
        return Err(Error::Job(reply.result));
    }
    Ok(reply.arguments)
}

/// `torrent-add` arguments. Links go out as `filename` untouched.
async fn add_arguments(source: &JobSource, download_dir: &str) -> Result<Value> {
    match source {
        JobSource::LocalTorrent(path) => {
            let bytes = tokio::fs::read(path).await?;
            Ok(json!({
                "metainfo": BASE64_STANDARD.encode(bytes),
                "download-dir": download_dir,
            }))
        }
        JobSource::Link(link) => Ok(json!({ "filename": link, "download-dir": download_dir })),
    }
}

fn added_handle(arguments: Value) -> Result<JobHandle> {
    let args: AddArguments = serde_json::from_value(arguments)?;
    let torrent = args
        .added
        .or(args.duplicate)
        .ok_or_else(|| Error::Job("torrent-add returned no torrent".to_string()))?;
    tracing::debug!(
        "Transmission accepted torrent {} ({})",
        torrent.id,
        torrent.name.as_deref().unwrap_or("unnamed")
    );
    Ok(JobHandle(torrent.id))
}

fn single_torrent(arguments: Value, job: JobHandle) -> Result<TorrentFields> {
    let args: GetArguments = serde_json::from_value(arguments)?;
    args.torrents
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(job.to_string()))
}

#[async_trait]
impl JobClient for TransmissionClient {
    async fn submit(&self, source: &JobSource, download_dir: &str) -> Result<JobHandle> {
        let arguments = add_arguments(source, download_dir).await?;
        added_handle(self.call("torrent-add", arguments).await?)
    }

    async fn is_complete(&self, job: JobHandle) -> Result<bool> {
        let torrent = self.torrent_fields(job, &["id", "percentDone"]).await?;
        Ok(torrent.percent_done.is_some_and(|done| done >= 1.0))
    }

    async fn name(&self, job: JobHandle) -> Result<String> {
        let torrent = self.torrent_fields(job, &["id", "name"]).await?;
        torrent
            .name
            .ok_or_else(|| Error::Job(format!("{} has no name", job)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_and_duplicate_handles() {
        let added = json!({ "torrent-added": { "id": 7, "name": "debian.iso", "hashString": "ab" } });
        assert_eq!(added_handle(added).unwrap(), JobHandle(7));

        let duplicate = json!({ "torrent-duplicate": { "id": 3 } });
        assert_eq!(added_handle(duplicate).unwrap(), JobHandle(3));

        assert!(added_handle(json!({})).is_err());
    }

    #[test]
    fn test_failed_result_is_an_error() {
        let reply = RpcResponse {
            result: "invalid or corrupt torrent file".to_string(),
            arguments: Value::Null,
        };
        match rpc_arguments(reply) {
            Err(Error::Job(msg)) => assert!(msg.contains("corrupt")),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_torrent_get_parsing() {
        let args = json!({ "torrents": [{ "id": 7, "percentDone": 1.0, "name": "debian.iso" }] });
        let torrent = single_torrent(args, JobHandle(7)).unwrap();
        assert_eq!(torrent.percent_done, Some(1.0));
        assert_eq!(torrent.name.as_deref(), Some("debian.iso"));

        let missing = single_torrent(json!({ "torrents": [] }), JobHandle(8));
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_link_naming_a_local_file_is_not_read() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let secret = temp_dir.path().join("settings.json");
        std::fs::write(&secret, r#"{"telegram":{"bot_token":"123:abc"}}"#).unwrap();
        let typed = secret.display().to_string();

        let args = add_arguments(&JobSource::Link(typed.clone()), "/downloads")
            .await
            .unwrap();
        assert_eq!(args, json!({ "filename": typed, "download-dir": "/downloads" }));
    }

    #[tokio::test]
    async fn test_local_torrent_is_sent_as_metainfo() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let torrent = temp_dir.path().join("FILE1.torrent");
        std::fs::write(&torrent, b"d4:infoe").unwrap();

        let args = add_arguments(&JobSource::LocalTorrent(torrent), "/downloads")
            .await
            .unwrap();
        assert_eq!(args["metainfo"], json!(BASE64_STANDARD.encode(b"d4:infoe")));
        assert!(args.get("filename").is_none());
    }

    #[test]
    fn test_requires_url() {
        assert!(TransmissionClient::new(&TransmissionConfig::default()).is_err());
    }
}
