//! HTTP Gateway
//!
//! Talks to a single JSON endpoint:
//! - `GET  <endpoint>` lists every item as a JSON array
//! - `POST <endpoint>?action=add|update` with the item as body
//! - `POST <endpoint>?action=delete&id=<id>` with `{"id": ...}` as body
//!
//! Mutation response bodies are never read; only the status is checked.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::traits::{RemoteGateway, WriteIntent};
use crate::domain::{Collection, DomainError, DomainResult, Item, ItemId};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

fn remote_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::RemoteUnavailable(e.to_string())
}

/// Parse and check an endpoint address
pub fn parse_endpoint(endpoint: &str) -> DomainResult<Url> {
    let url = Url::parse(endpoint.trim())
        .map_err(|e| DomainError::Validation(format!("invalid endpoint {}: {}", endpoint, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DomainError::Validation(format!(
            "endpoint must use http or https, got {}",
            other
        ))),
    }
}

pub struct HttpGateway {
    client: Client,
    endpoint: Url,
}

impl HttpGateway {
    pub fn new(endpoint: &str, timeout: Duration) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Internal(format!("Failed to build http client: {}", e)))?;
        Self::with_client(endpoint, client)
    }

    pub fn with_client(endpoint: &str, client: Client) -> DomainResult<Self> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(endpoint)?,
        })
    }

    fn action_url(&self, action: &str, id: Option<&ItemId>) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", action);
            if let Some(id) = id {
                query.append_pair("id", id.as_str());
            }
        }
        url
    }

    async fn post(&self, url: Url, body: &serde_json::Value) -> DomainResult<()> {
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?;
        Ok(())
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn list_all(&self) -> DomainResult<Collection> {
        let value: serde_json::Value = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)?;

        if !value.is_array() {
            return Err(DomainError::RemoteUnavailable(
                "remote listing is not a JSON array".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(remote_err)
    }

    async fn upsert(&self, item: &Item, intent: WriteIntent) -> DomainResult<()> {
        let body = serde_json::to_value(item).map_err(|e| DomainError::Internal(e.to_string()))?;
        self.post(self.action_url(intent.action(), None), &body).await
    }

    async fn delete(&self, id: &ItemId) -> DomainResult<()> {
        let body = serde_json::json!({ "id": id });
        self.post(self.action_url("delete", Some(id)), &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemDraft, Timestamp};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn gateway(endpoint: &str) -> HttpGateway {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpGateway::with_client(endpoint, client).unwrap()
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Answer one request with a fixed response and hand back what was received
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{}/exec", addr), handle)
    }

    #[test]
    fn test_parse_endpoint() {
        assert!(parse_endpoint("https://example.com/macros/exec").is_ok());
        assert!(matches!(parse_endpoint("ftp://example.com"), Err(DomainError::Validation(_))));
        assert!(matches!(parse_endpoint("not a url"), Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_all_parses_array() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"id":"item-1","title":"Learn Rust","updatedAt":5},{"id":2,"title":"Legacy"}]"#,
        )
        .await;

        let items = gateway(&url).list_all().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items.get(&ItemId::from("item-1")).unwrap().updated_at, Some(Timestamp(5)));
        assert!(items.contains(&ItemId::from("2")));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /exec "));
    }

    #[tokio::test]
    async fn test_list_all_rejects_non_array() {
        let (url, _server) = serve_once("200 OK", r#"{"error":"boom"}"#).await;
        let err = gateway(&url).list_all().await.unwrap_err();
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_server_error_is_remote_unavailable() {
        let (url, _server) = serve_once("500 Internal Server Error", "[]").await;
        let err = gateway(&url).list_all().await.unwrap_err();
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_upsert_posts_item() {
        let (url, server) = serve_once("200 OK", "{}").await;
        let item = ItemDraft::new("See Kyoto", "travel")
            .unwrap()
            .build(ItemId::from("item-9"), Timestamp(77));

        gateway(&url).upsert(&item, WriteIntent::Update).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /exec?action=update "));
        assert!(request.contains(r#""title":"See Kyoto""#));
        assert!(request.contains(r#""updatedAt":77"#));
    }

    #[tokio::test]
    async fn test_delete_posts_id() {
        let (url, server) = serve_once("200 OK", "").await;

        gateway(&url).delete(&ItemId::from("item-3")).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /exec?action=delete&id=item-3 "));
        assert!(request.contains(r#"{"id":"item-3"}"#));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = gateway(&format!("http://{}/exec", addr))
            .delete(&ItemId::from("x"))
            .await
            .unwrap_err();
        assert!(err.is_remote());
    }
}
