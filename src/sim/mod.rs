//! Simulated Remo device
//!
//! Serves the local API on a TCP socket so the client can be exercised
//! without hardware. Two modes:
//!
//! - [`Mode::Device`] behaves like the firmware: POSTed signals are stored
//!   and served back on GET; with nothing stored, GET streams the truncated
//!   placeholder record.
//! - [`Mode::Scripted`] answers every request with a fixed [`Reply`].
//!
//! Every request is recorded and can be inspected with
//! [`DeviceSim::requests`].

pub mod http;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::remo::local::MESSAGES_PATH;
use crate::remo::types::IrSignal;
pub use http::{Reply, Request};

/// What the firmware streams when it has no recorded signal
pub const EMPTY_PLACEHOLDER: &str = r#"{"format":"us","freq":38,"data":["#;

/// How the simulator answers
#[derive(Debug, Clone)]
pub enum Mode {
    Device,
    Scripted(Reply),
}

#[derive(Debug)]
struct SimState {
    mode: Mode,
    stored: Option<IrSignal>,
    requests: Vec<Request>,
}

/// A running simulator. The accept loop stops when this is dropped.
pub struct DeviceSim {
    addr: SocketAddr,
    state: Arc<Mutex<SimState>>,
    task: JoinHandle<()>,
}

impl DeviceSim {
    /// Bind to `addr` and start serving in a background task
    pub async fn bind(addr: &str, mode: Mode) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        info!("Device simulator listening on {} ({} mode)", addr, mode_name(&mode));

        let state = Arc::new(Mutex::new(SimState {
            mode,
            stored: None,
            requests: Vec::new(),
        }));

        let task = tokio::spawn(accept_loop(listener, state.clone()));

        Ok(Self { addr, state, task })
    }

    /// Start a simulator on an ephemeral localhost port
    pub async fn start(mode: Mode) -> anyhow::Result<Self> {
        Self::bind("127.0.0.1:0", mode).await
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `host:port` string suitable for `LocalClient::new`
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.state).requests.clone()
    }

    /// Signal the simulated device would report on GET
    pub fn stored_signal(&self) -> Option<IrSignal> {
        lock(&self.state).stored.clone()
    }

    /// Pretend the device just received `signal` over IR
    pub fn receive(&self, signal: IrSignal) {
        lock(&self.state).stored = Some(signal);
    }

    /// Forget the stored signal
    pub fn clear(&self) {
        lock(&self.state).stored = None;
    }
}

impl Drop for DeviceSim {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn mode_name(mode: &Mode) -> &'static str {
    match mode {
        Mode::Device => "device",
        Mode::Scripted(_) => "scripted",
    }
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    // A panicked handler leaves the state usable
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn accept_loop(listener: TcpListener, state: Arc<Mutex<SimState>>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("Connection from {}", peer);
                tokio::spawn(handle_connection(stream, peer, state.clone()));
            }
            Err(e) => {
                warn!("Accept failed: {}", e);
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, state: Arc<Mutex<SimState>>) {
    let request = match http::read_request(&mut stream).await {
        Ok(req) => req,
        Err(e) => {
            warn!("Failed to read request from {}: {}", peer, e);
            return;
        }
    };

    debug!(
        "{} {} from {} ({} body bytes)",
        request.method,
        request.path,
        peer,
        request.body.len()
    );

    let reply = {
        let mut state = lock(&state);
        state.requests.push(request.clone());
        respond(&mut state, &request)
    };

    if let Err(e) = http::write_reply(&mut stream, &reply).await {
        warn!("Failed to write reply to {}: {}", peer, e);
    }
}

fn respond(state: &mut SimState, request: &Request) -> Reply {
    if let Mode::Scripted(reply) = &state.mode {
        return reply.clone();
    }

    if request.path != MESSAGES_PATH {
        return Reply::empty(404, "Not Found");
    }
    if request.header("x-requested-with").is_none() {
        return Reply::empty(400, "Bad Request");
    }

    match request.method.as_str() {
        "GET" => match &state.stored {
            Some(signal) => match signal.encode() {
                Ok(body) => Reply::ok(body),
                Err(_) => Reply::empty(500, "Internal Server Error"),
            },
            None => Reply::ok(EMPTY_PLACEHOLDER),
        },
        "POST" => match IrSignal::decode(&request.body) {
            Ok(Some(signal)) => {
                info!("Transmitting {}", signal);
                state.stored = Some(signal);
                Reply::empty(200, "OK")
            }
            _ => Reply::empty(400, "Bad Request"),
        },
        _ => Reply::empty(405, "Method Not Allowed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str, path: &str, with_header: bool, body: &str) -> Request {
        let mut headers = vec![("Host".to_string(), "sim".to_string())];
        if with_header {
            headers.push(("X-Requested-With".to_string(), "curl".to_string()));
        }
        Request {
            method: method.to_string(),
            path: path.to_string(),
            headers,
            body: bytes::Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    fn device_state() -> SimState {
        SimState {
            mode: Mode::Device,
            stored: None,
            requests: Vec::new(),
        }
    }

    #[test]
    fn test_empty_device_streams_placeholder() {
        let mut state = device_state();
        let reply = respond(&mut state, &request("GET", "/messages", true, ""));
        assert_eq!(reply.status, 200);
        assert_eq!(&reply.body[..], EMPTY_PLACEHOLDER.as_bytes());
    }

    #[test]
    fn test_post_then_get() {
        let mut state = device_state();
        let body = r#"{"freq":38,"data":[100,200,150],"format":"us"}"#;
        let reply = respond(&mut state, &request("POST", "/messages", true, body));
        assert_eq!(reply.status, 200);

        let reply = respond(&mut state, &request("GET", "/messages", true, ""));
        assert_eq!(reply.status, 200);
        let sig = IrSignal::decode(&reply.body).unwrap().unwrap();
        assert_eq!(sig, IrSignal::new(38, vec![100, 200, 150]));
    }

    #[test]
    fn test_missing_requested_with_rejected() {
        let mut state = device_state();
        let reply = respond(&mut state, &request("GET", "/messages", false, ""));
        assert_eq!(reply.status, 400);
    }

    #[test]
    fn test_unknown_path_and_method() {
        let mut state = device_state();
        assert_eq!(respond(&mut state, &request("GET", "/", true, "")).status, 404);
        assert_eq!(
            respond(&mut state, &request("DELETE", "/messages", true, "")).status,
            405
        );
    }

    #[test]
    fn test_post_garbage_rejected() {
        let mut state = device_state();
        let reply = respond(&mut state, &request("POST", "/messages", true, "nope"));
        assert_eq!(reply.status, 400);
        assert!(state.stored.is_none());
    }

    #[test]
    fn test_scripted_reply_ignores_request() {
        let mut state = SimState {
            mode: Mode::Scripted(Reply::empty(503, "Service Unavailable")),
            stored: None,
            requests: Vec::new(),
        };
        let reply = respond(&mut state, &request("GET", "/anything", false, ""));
        assert_eq!(reply.status, 503);
    }

    #[tokio::test]
    async fn test_receive_and_clear() {
        let sim = DeviceSim::start(Mode::Device).await.unwrap();
        assert!(sim.stored_signal().is_none());
        sim.receive(IrSignal::new(40, vec![1, 2]));
        assert_eq!(sim.stored_signal(), Some(IrSignal::new(40, vec![1, 2])));
        sim.clear();
        assert!(sim.stored_signal().is_none());
        assert!(sim.requests().is_empty());
    }
}
