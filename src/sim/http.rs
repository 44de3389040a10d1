//! Minimal HTTP/1.1 framing for the simulator
//!
//! One request per connection. Only `Content-Length` bodies are understood;
//! that is all the local API ever sends.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a request head
const MAX_HEAD: usize = 16 * 1024;

/// A request received by the simulator
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Request {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the request head (everything before the blank line)
    pub fn parse_head(head: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(head)?;
        let mut lines = text.split("\r\n");

        let request_line = lines
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty request"))?;
        let mut parts = request_line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("Missing method"))?
            .to_string();
        let path = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("Missing request target"))?
            .to_string();

        let mut headers = Vec::new();
        for line in lines.filter(|l| !l.is_empty()) {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("Malformed header line: {:?}", line))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(Self {
            method,
            path,
            headers,
            body: Bytes::new(),
        })
    }

    fn content_length(&self) -> anyhow::Result<usize> {
        match self.header("content-length") {
            Some(v) => Ok(v.parse()?),
            None => Ok(0),
        }
    }
}

/// Response the simulator writes back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub reason: String,
    pub body: Bytes,
    /// Advertise a longer body than is sent, then hang up
    pub truncate: bool,
}

impl Reply {
    pub fn new(status: u16, reason: &str, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            reason: reason.to_string(),
            body: body.into(),
            truncate: false,
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, "OK", body)
    }

    pub fn empty(status: u16, reason: &str) -> Self {
        Self::new(status, reason, Bytes::new())
    }

    /// Send `body` but claim it is longer, so the reader sees a cut stream
    pub fn cut_short(mut self) -> Self {
        self.truncate = true;
        self
    }

    fn head(&self) -> String {
        let declared = if self.truncate {
            self.body.len() + 64
        } else {
            self.body.len()
        };
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status, self.reason, declared
        )
    }
}

/// Read one request off the stream
pub async fn read_request<S>(stream: &mut S) -> anyhow::Result<Request>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(1024);

    let head_end = loop {
        if let Some(pos) = find_blank_line(&buf) {
            break pos;
        }
        if buf.len() > MAX_HEAD {
            anyhow::bail!("Request head exceeds {} bytes", MAX_HEAD);
        }
        if stream.read_buf(&mut buf).await? == 0 {
            anyhow::bail!("Connection closed before request head was complete");
        }
    };

    let head = buf.split_to(head_end + 4);
    let mut request = Request::parse_head(&head[..head_end])?;

    let len = request.content_length()?;
    while buf.len() < len {
        if stream.read_buf(&mut buf).await? == 0 {
            anyhow::bail!("Connection closed after {} of {} body bytes", buf.len(), len);
        }
    }
    request.body = buf.split_to(len).freeze();

    Ok(request)
}

/// Write a reply and close our half of the connection
pub async fn write_reply<S>(stream: &mut S, reply: &Reply) -> anyhow::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(reply.head().as_bytes()).await?;
    stream.write_all(&reply.body).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
