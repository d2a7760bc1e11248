//! Artifact endpoints

use chrono::Utc;
use kiln_core::domain::artifact::PublishedArtifact;
use kiln_core::dto::artifact::ArtifactReceipt;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use crate::ArtifactStoreClient;
use crate::error::{ClientError, Result};

impl ArtifactStoreClient {
    // =============================================================================
    // Artifact Publication
    // =============================================================================

    /// URL an artifact of `run_id` is uploaded to
    pub fn artifact_url(&self, run_id: Uuid, name: &str) -> String {
        format!("{}/api/runs/{}/artifacts/{}", self.base_url, run_id, name)
    }

    /// Upload a single file as artifact `name` of run `run_id`
    ///
    /// The file is sent unchanged as the request body. A single attempt is
    /// made; any transport or status error is returned to the caller.
    pub async fn upload_artifact(
        &self,
        run_id: Uuid,
        name: &str,
        path: &Path,
    ) -> Result<PublishedArtifact> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_string());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::ReadError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let size_bytes = bytes.len() as u64;

        let url = self.artifact_url(run_id, name);
        debug!("Uploading {} ({} bytes) to {}", file_name, size_bytes, url);

        let response = self
            .client
            .put(&url)
            .query(&[("file", file_name.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        let receipt: ArtifactReceipt = self.handle_response(response).await?;

        Ok(PublishedArtifact {
            name: name.to_string(),
            run_id,
            generation: receipt.generation,
            location: receipt.location,
            file_name,
            size_bytes,
            published_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct ReceivedRequest {
        request_line: String,
        head: String,
        body: Vec<u8>,
    }

    /// Answers a single request with `status` and a JSON `body`
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<ReceivedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before the request head");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);

            while buf.len() < head_end + length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;

            ReceivedRequest {
                request_line: head.lines().next().unwrap_or_default().to_string(),
                body: buf[head_end..].to_vec(),
                head,
            }
        });

        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_artifact_url() {
        let client = ArtifactStoreClient::new("http://store.local/");
        let run_id = Uuid::nil();
        assert_eq!(
            client.artifact_url(run_id, "Survey_Processor"),
            "http://store.local/api/runs/00000000-0000-0000-0000-000000000000/artifacts/Survey_Processor"
        );
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = ArtifactStoreClient::new("http://127.0.0.1:9");

        let result = client
            .upload_artifact(Uuid::new_v4(), "Survey_Processor", &dir.path().join("missing"))
            .await;

        assert!(matches!(result, Err(ClientError::ReadError { .. })));
    }

    #[tokio::test]
    async fn test_upload_sends_file_and_reads_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Survey_Processor");
        std::fs::write(&path, b"\x7fELF packaged binary").unwrap();

        let (url, server) =
            serve_once("201 Created", r#"{"generation":4,"location":"/files/4/Survey_Processor"}"#)
                .await;
        let client = ArtifactStoreClient::new(url);
        let run_id = Uuid::new_v4();

        let published = client
            .upload_artifact(run_id, "Survey_Processor", &path)
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert_eq!(
            request.request_line,
            format!(
                "PUT /api/runs/{}/artifacts/Survey_Processor?file=Survey_Processor HTTP/1.1",
                run_id
            )
        );
        assert!(
            request
                .head
                .to_ascii_lowercase()
                .contains("content-type: application/octet-stream")
        );
        assert_eq!(request.body, b"\x7fELF packaged binary");

        assert_eq!(published.name, "Survey_Processor");
        assert_eq!(published.run_id, run_id);
        assert_eq!(published.generation, 4);
        assert_eq!(published.location, "/files/4/Survey_Processor");
        assert_eq!(published.file_name, "Survey_Processor");
        assert_eq!(published.size_bytes, 20);
    }

    #[tokio::test]
    async fn test_upload_error_status_is_api_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Survey_Processor");
        std::fs::write(&path, b"binary").unwrap();

        let (url, server) = serve_once("503 Service Unavailable", r#""maintenance""#).await;
        let client = ArtifactStoreClient::new(url);

        let err = client
            .upload_artifact(Uuid::new_v4(), "Survey_Processor", &path)
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, ClientError::ApiError { status: 503, .. }));
        assert!(err.is_server_error());
    }
}
