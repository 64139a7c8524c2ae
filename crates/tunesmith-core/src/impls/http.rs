//! HTTP binding of the [`GenerationApi`] port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::domain::{ApiError, GenerationRequest, RemoteTaskId};
use crate::ports::{CreateAck, GenerationApi, RemoteStatus};
use crate::wire::{CreateBody, parse_create_ack, parse_status};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error bodies are cut to this many characters before they reach the user.
const MAX_ERROR_BODY_CHARS: usize = 512;

pub struct HttpGenerationApi {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpGenerationApi {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Transport(format!("invalid API base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Transport(format!(
                "API base URL {base_url} cannot carry a path"
            )));
        }
        base_url.set_query(None);
        base_url.set_fragment(None);

        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` + path segments, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("cannot extend URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                body: truncate(body.trim(), MAX_ERROR_BODY_CHARS),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Malformed(format!("response is not JSON: {e}")))
    }
}

#[async_trait]
impl GenerationApi for HttpGenerationApi {
    async fn create(&self, request: &GenerationRequest) -> Result<CreateAck, ApiError> {
        let url = self.endpoint(&["api", "generate"])?;
        let body = CreateBody::from(request);
        tracing::debug!(%url, "sending create request");

        let response = self
            .authorize(self.http.post(url).json(&body))
            .send()
            .await
            .map_err(transport)?;
        let json = Self::read_json(response).await?;
        parse_create_ack(&json).map(|task_id| CreateAck { task_id })
    }

    async fn status(&self, task_id: &RemoteTaskId) -> Result<RemoteStatus, ApiError> {
        let url = self.endpoint(&["api", "status", task_id.as_str()])?;

        let response = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(transport)?;
        let json = Self::read_json(response).await?;
        parse_status(&json)
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    if err.is_builder() {
        ApiError::Encode(err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn api(base: &str) -> HttpGenerationApi {
        HttpGenerationApi::new(base, None, DEFAULT_REQUEST_TIMEOUT).unwrap()
    }

    #[rstest]
    #[case::bare_host("https://music.example.com")]
    #[case::trailing_slash("https://music.example.com/")]
    fn endpoints_from_host(#[case] base: &str) {
        let url = api(base).endpoint(&["api", "generate"]).unwrap();
        assert_eq!(url.as_str(), "https://music.example.com/api/generate");
    }

    #[rstest]
    #[case::no_slash("https://gw.example.com/suno")]
    #[case::slash("https://gw.example.com/suno/")]
    fn endpoints_keep_base_path(#[case] base: &str) {
        let url = api(base).endpoint(&["api", "status", "T1"]).unwrap();
        assert_eq!(url.as_str(), "https://gw.example.com/suno/api/status/T1");
    }

    #[test]
    fn task_ids_are_percent_encoded() {
        let url = api("https://music.example.com")
            .endpoint(&["api", "status", "a/b c"])
            .unwrap();
        assert_eq!(url.as_str(), "https://music.example.com/api/status/a%2Fb%20c");
    }

    #[test]
    fn query_is_dropped_from_base() {
        let api = api("https://music.example.com/v1?debug=1#frag");
        assert_eq!(api.base_url().as_str(), "https://music.example.com/v1");
    }

    #[rstest]
    #[case::garbage("not a url")]
    #[case::opaque("mailto:someone@example.com")]
    fn invalid_base_urls_are_rejected(#[case] base: &str) {
        let result = HttpGenerationApi::new(base, None, DEFAULT_REQUEST_TIMEOUT);
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let api = HttpGenerationApi::new(
            "https://music.example.com",
            Some("  ".into()),
            DEFAULT_REQUEST_TIMEOUT,
        )
        .unwrap();
        assert!(api.api_key.is_none());
    }

    /// Serves `status` + `body` to exactly one request and hands back the
    /// raw request text.
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (format!("http://{addr}"), handle)
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
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn create_posts_body_and_reads_task_id() {
        let (base, server) = serve_once("200 OK", r#"{"task_id":"T1"}"#).await;
        let api = HttpGenerationApi::new(&base, Some("secret".into()), DEFAULT_REQUEST_TIMEOUT)
            .unwrap();

        let ack = api
            .create(&GenerationRequest::new("night drive"))
            .await
            .unwrap();

        assert_eq!(ack, CreateAck::new("T1"));
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/generate HTTP/1.1"), "{request}");
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains(r#""prompt":"night drive""#), "{request}");
    }

    #[tokio::test]
    async fn status_gets_and_normalizes() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"code":200,"data":{"status":"processing","progress":30}}"#,
        )
        .await;

        let status = api(&base).status(&RemoteTaskId::from("T1")).await.unwrap();

        assert_eq!(status, RemoteStatus::InProgress { progress: Some(30) });
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/status/T1 HTTP/1.1"), "{request}");
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let (base, _server) = serve_once("500 Internal Server Error", "  boom  ").await;

        let err = api(&base)
            .create(&GenerationRequest::new("night drive"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Http {
                status: 500,
                body: "boom".into()
            }
        );
    }

    #[tokio::test]
    async fn long_error_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY_CHARS + 100);
        let (base, _server) = serve_once("503 Service Unavailable", &body).await;

        let err = api(&base).status(&RemoteTaskId::from("T1")).await.unwrap_err();

        match err {
            ApiError::Http { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body.chars().count(), MAX_ERROR_BODY_CHARS + 1);
                assert!(body.ends_with('…'));
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_success_is_malformed() {
        let (base, _server) = serve_once("200 OK", "not json").await;

        let err = api(&base).status(&RemoteTaskId::from("T1")).await.unwrap_err();

        assert!(matches!(err, ApiError::Malformed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn unrecognized_create_body_is_malformed() {
        let (base, _server) = serve_once("200 OK", r#"{"ok":true}"#).await;

        let err = api(&base)
            .create(&GenerationRequest::new("night drive"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Malformed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = api(&base).status(&RemoteTaskId::from("T1")).await.unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)), "{err:?}");
        assert_eq!(err.kind(), crate::domain::ErrorKind::Transient);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("short", 10), "short");
    }
}
