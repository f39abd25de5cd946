//! HTTP client for the order-status settlement service.

use crate::validator::{Result, Settlement, SettlementError, SettlementValidator};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

/// Payment status that counts as settled.
pub const SUCCEEDED_STATUS: &str = "succeeded";

/// Largest response the client reads, headers included.
pub const MAX_RESPONSE_BYTES: u64 = 1 << 20;

/// Response document of `GET /v1/order/status/{orderId}`.
///
/// ```json
/// { "status": 200, "body": { "status_updated": { "updated_payment_status": "succeeded" } } }
/// ```
#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    status: u16,
    body: Option<StatusBody>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status_updated: Option<StatusUpdate>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    updated_payment_status: String,
}

/// Settlement validator speaking plain HTTP to the order-status service.
#[derive(Debug, Clone)]
pub struct HttpSettlementClient {
    base_url: Url,
}

impl HttpSettlementClient {
    /// Create a client for the service rooted at `base_url` (http only).
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.scheme() != "http" {
            return Err(SettlementError::UnsupportedUrl(format!(
                "only http:// is supported, got {}",
                base_url
            )));
        }
        if base_url.host_str().is_none() {
            return Err(SettlementError::UnsupportedUrl(format!(
                "missing host in {}",
                base_url
            )));
        }
        Ok(Self { base_url })
    }

    /// The status URL for `reference_id`, with the id percent-encoded.
    pub fn status_url(&self, reference_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SettlementError::UnsupportedUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v1", "order", "status", reference_id]);
        Ok(url)
    }

    /// Issue a GET and return the status code and body.
    async fn get(&self, url: &Url) -> Result<(u16, String)> {
        let host = url
            .host_str()
            .ok_or_else(|| SettlementError::UnsupportedUrl(url.to_string()))?;
        let port = url.port_or_known_default().unwrap_or(80);

        let mut stream = TcpStream::connect((host, port)).await?;
        let host = host_header(url)?;

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        // HTTP/1.0 keeps the response unchunked and closes after the body.
        let request = format!(
            "GET {} HTTP/1.0\r\nHost: {}\r\nAccept: application/json\r\nConnection: close\r\n\r\n",
            path, host,
        );
        stream.write_all(request.as_bytes()).await?;

        let mut buf = Vec::new();
        (&mut stream)
            .take(MAX_RESPONSE_BYTES + 1)
            .read_to_end(&mut buf)
            .await?;
        if buf.len() as u64 > MAX_RESPONSE_BYTES {
            return Err(SettlementError::Malformed(format!(
                "response exceeds {} bytes",
                MAX_RESPONSE_BYTES
            )));
        }
        parse_response(&buf)
    }
}

/// Value of the `Host` header: the port is included when the URL names one.
fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| SettlementError::UnsupportedUrl(url.to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Split a raw HTTP response into status code and body.
fn parse_response(raw: &[u8]) -> Result<(u16, String)> {
    let text = String::from_utf8_lossy(raw);
    let (head, body) = text
        .split_once("\r\n\r\n")
        .ok_or_else(|| SettlementError::Malformed("missing header terminator".into()))?;

    let status_line = head
        .lines()
        .next()
        .ok_or_else(|| SettlementError::Malformed("empty response".into()))?;
    let code = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| SettlementError::Malformed(format!("bad status line: {}", status_line)))?;

    Ok((code, body.to_string()))
}

/// Interpret a status document.
fn interpret(body: &str) -> Result<Settlement> {
    let envelope: StatusEnvelope = serde_json::from_str(body)?;
    if envelope.status != 200 {
        return Ok(Settlement::failed(format!("status {}", envelope.status)));
    }

    let payment_status = envelope
        .body
        .and_then(|b| b.status_updated)
        .map(|u| u.updated_payment_status)
        .ok_or_else(|| SettlementError::Malformed("missing payment status".into()))?;

    if payment_status == SUCCEEDED_STATUS {
        Ok(Settlement::succeeded())
    } else {
        Ok(Settlement::failed(payment_status))
    }
}

#[async_trait]
impl SettlementValidator for HttpSettlementClient {
    async fn check_settlement(&self, reference_id: &str) -> Result<Settlement> {
        let url = self.status_url(reference_id)?;
        let (code, body) = self.get(&url).await?;

        if code != 200 {
            tracing::debug!(%url, code, "settlement service returned an error status");
            return Ok(Settlement::failed(format!("http {}", code)));
        }

        interpret(&body)
    }
}
