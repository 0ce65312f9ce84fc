pub mod error;

pub use error::{Result, SearchStoreError};

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;

/// Result of a create-by-id request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A document with the same id is already indexed. Nothing was written.
    AlreadyExists,
}

pub struct SearchStoreClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl SearchStoreClient {
    pub fn new(base_url: &str, credentials: Option<(String, String)>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Index `doc` under `id` in `index`, refusing to overwrite an existing document.
    pub async fn create<T: Serialize + ?Sized>(
        &self,
        index: &str,
        id: &str,
        doc: &T,
    ) -> Result<CreateOutcome> {
        let endpoint = self.create_endpoint(index, id)?;

        let mut req = self.client.put(&endpoint).json(doc);
        if let Some((user, password)) = &self.credentials {
            req = req.basic_auth(user, Some(password));
        }
        let resp = req.send().await?;

        let status = resp.status();
        let body = if status.is_success() || status == StatusCode::CONFLICT {
            String::new()
        } else {
            resp.text().await.unwrap_or_default()
        };
        let outcome = classify(status, body)?;
        tracing::debug!(index, id, ?outcome, "document create");
        Ok(outcome)
    }

    fn create_endpoint(&self, index: &str, id: &str) -> Result<String> {
        if index.is_empty() || index.contains('/') || index.starts_with('_') {
            return Err(SearchStoreError::InvalidRequest(format!(
                "invalid index name: {index:?}"
            )));
        }
        if id.is_empty() || id.contains('/') {
            return Err(SearchStoreError::InvalidRequest(format!(
                "invalid document id: {id:?}"
            )));
        }
        Ok(format!("{}/{}/_create/{}", self.base_url, index, id))
    }
}

fn classify(status: StatusCode, body: String) -> Result<CreateOutcome> {
    if status.is_success() {
        Ok(CreateOutcome::Created)
    } else if status == StatusCode::CONFLICT {
        Ok(CreateOutcome::AlreadyExists)
    } else {
        Err(SearchStoreError::Api {
            status: status.as_u16(),
            message: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn classify_statuses() {
        assert_eq!(
            classify(StatusCode::CREATED, String::new()).unwrap(),
            CreateOutcome::Created
        );
        assert_eq!(
            classify(StatusCode::CONFLICT, String::new()).unwrap(),
            CreateOutcome::AlreadyExists
        );
        match classify(StatusCode::BAD_REQUEST, "mapper_parsing_exception".into()) {
            Err(SearchStoreError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "mapper_parsing_exception");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn endpoint_trims_base_and_validates() {
        let client = SearchStoreClient::new("http://localhost:9200/", None).unwrap();
        assert_eq!(
            client.create_endpoint("posts", "abc").unwrap(),
            "http://localhost:9200/posts/_create/abc"
        );
        assert!(client.create_endpoint("", "abc").is_err());
        assert!(client.create_endpoint("_all", "abc").is_err());
        assert!(client.create_endpoint("posts", "a/b").is_err());
    }

    /// Serve one canned HTTP response and hand back the raw request text.
    async fn one_shot_server(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            // Read headers plus the full body before answering.
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn conflict_is_already_exists() {
        let (base, server) = one_shot_server(
            "HTTP/1.1 409 Conflict\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
        )
        .await;
        let client = SearchStoreClient::new(&base, None).unwrap();

        let outcome = client
            .create("posts", "deadbeef", &serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::AlreadyExists);

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /posts/_create/deadbeef "));
    }

    #[tokio::test]
    async fn created_sends_basic_auth() {
        let (base, server) = one_shot_server(
            "HTTP/1.1 201 Created\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
        )
        .await;
        let client =
            SearchStoreClient::new(&base, Some(("elastic".into(), "secret".into()))).unwrap();

        let outcome = client
            .create("posts", "abc", &serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::Created);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.contains("authorization: basic "));
    }
}
