//! Local API client
//!
//! Talks to a single device by `host[:port]`. Every call is one HTTP
//! request; nothing is retried and no state is kept between calls.

use bytes::{Bytes, BytesMut};
use hyper::ext::ReasonPhrase;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use super::error::{Error, Result};
use super::types::IrSignal;
use crate::config::HttpConfig;

/// The only resource the device serves
pub const MESSAGES_PATH: &str = "/messages";

const REQUESTED_WITH: &str = "X-Requested-With";
const REQUESTED_WITH_VALUE: &str = "curl";

/// Client for the device's local HTTP API
#[derive(Debug, Clone)]
pub struct LocalClient {
    http: Client,
    addr: String,
}

impl LocalClient {
    /// Create a client for the device at `addr` (does not connect)
    pub fn new(addr: impl Into<String>) -> Self {
        let http = Client::builder()
            .no_proxy()
            .build()
            .expect("failed to build reqwest client");
        Self::with_http(addr, http)
    }

    /// Use a preconfigured HTTP client (timeouts, pooling)
    pub fn with_http(addr: impl Into<String>, http: Client) -> Self {
        Self {
            http,
            addr: addr.into(),
        }
    }

    /// Build the HTTP client from the `[http]` config section
    pub fn from_config(addr: impl Into<String>, config: &HttpConfig) -> Result<Self> {
        let mut builder = Client::builder().no_proxy();
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_http(addr, builder.build()?))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn messages_url(&self) -> String {
        format!("http://{}{}", self.addr, MESSAGES_PATH)
    }

    /// Fetch the newest IR signal the device received.
    ///
    /// `Ok(None)` means the device has nothing recorded.
    pub async fn fetch_newest_signal(&self) -> Result<Option<IrSignal>> {
        let url = self.messages_url();
        debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .header(REQUESTED_WITH, REQUESTED_WITH_VALUE)
            .send()
            .await?;
        let resp = check_status(resp)?;

        let body = read_body(resp).await?;
        debug!("Received {} body bytes from {}", body.len(), self.addr);

        let signal = IrSignal::decode(&body).map_err(Error::Decode)?;
        if signal.is_none() {
            debug!("Device at {} has no recorded signal", self.addr);
        }
        Ok(signal)
    }

    /// Make the device transmit `signal`.
    ///
    /// A 200 only means the device accepted the request.
    pub async fn emit_signal(&self, signal: &IrSignal) -> Result<()> {
        let url = self.messages_url();
        let body = signal.encode().map_err(Error::Encode)?;
        debug!("POST {} ({} bytes, {})", url, body.len(), signal);

        let resp = self
            .http
            .post(&url)
            .header(REQUESTED_WITH, REQUESTED_WITH_VALUE)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        check_status(resp)?;

        Ok(())
    }
}

fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status != StatusCode::OK {
        // hyper only records the phrase when it differs from the canonical one
        let status_text = match resp.extensions().get::<ReasonPhrase>() {
            Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
            None => status.canonical_reason().unwrap_or_default().to_string(),
        };
        return Err(Error::Device {
            status: status.as_u16(),
            status_text,
        });
    }
    Ok(resp)
}

/// Collect the response body.
///
/// The firmware may hang up before the advertised length; what arrived
/// before that is still handed to the decoder.
async fn read_body(mut resp: Response) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) if !buf.is_empty() => {
                warn!("Body ended early after {} bytes: {}", buf.len(), e);
                break;
            }
            Err(e) => return Err(Error::Transport(e)),
        }
    }
    Ok(buf.freeze())
}
