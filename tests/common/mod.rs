//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;

use resumable_requester::auth::{AuthenticationError, AuthenticationLock, Credential};
use resumable_requester::{
    FormPart, Method, Parameters, RequestDescriptor, Response, Transport, TransportError,
};

/// Ordered record of unlocks and transport calls.
pub type EventLog = Arc<Mutex<Vec<&'static str>>>;

/// What the scripted transport does for one call.
pub enum Step {
    Respond(Result<Response, TransportError>),
    Delayed(Duration, Result<Response, TransportError>),
    /// Never completes; only an interruption ends the call.
    Hang,
}

pub fn ok(body: &'static str) -> Step {
    Step::Respond(Ok(Response::new(200, body)))
}

pub fn delayed_ok(millis: u64, body: &'static str) -> Step {
    Step::Delayed(Duration::from_millis(millis), Ok(Response::new(200, body)))
}

pub fn unavailable() -> Step {
    Step::Respond(Err(TransportError::Http {
        status: 503,
        body: "Service Unavailable".into(),
    }))
}

/// A call observed by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenCall {
    pub method: Method,
    pub route: String,
    pub authorization: Option<String>,
    pub parameters: Parameters,
    pub parts: Vec<FormPart>,
}

/// Transport driven by a per-call script, counting every call.
pub struct ScriptedTransport {
    script: Box<dyn Fn(usize) -> Step + Send + Sync>,
    calls: AtomicUsize,
    count: watch::Sender<usize>,
    seen: Mutex<Vec<SeenCall>>,
    events: EventLog,
}

impl ScriptedTransport {
    /// `script` receives the zero-based call number.
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(usize) -> Step + Send + Sync + 'static,
    {
        let (count, _) = watch::channel(0);
        Arc::new(Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            count,
            seen: Mutex::new(Vec::new()),
            events: EventLog::default(),
        })
    }

    pub fn always_ok(body: &'static str) -> Arc<Self> {
        Self::new(move |_| ok(body))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenCall> {
        self.seen.lock().unwrap().clone()
    }

    pub fn events(&self) -> EventLog {
        self.events.clone()
    }

    /// Wait until at least `n` calls have reached the transport.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.count.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|count| *count >= n))
            .await
            .expect("transport calls did not arrive in time")
            .expect("transport dropped");
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &RequestDescriptor,
        authorization: Option<&str>,
    ) -> Result<Response, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(SeenCall {
            method: request.method(),
            route: request.route().to_string(),
            authorization: authorization.map(str::to_string),
            parameters: request.parameters().clone(),
            parts: request.parts().to_vec(),
        });
        self.events.lock().unwrap().push("send");
        self.count.send_replace(call + 1);

        match (self.script)(call) {
            Step::Respond(result) => result,
            Step::Delayed(delay, result) => {
                tokio::time::sleep(delay).await;
                result
            }
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Authentication lock that counts unlocks.
pub struct CountingLock {
    unlocks: AtomicUsize,
    outcome: Result<Credential, AuthenticationError>,
    events: EventLog,
}

impl CountingLock {
    pub fn granting(token: &str, events: EventLog) -> Arc<Self> {
        Arc::new(Self {
            unlocks: AtomicUsize::new(0),
            outcome: Ok(Credential::new(token)),
            events,
        })
    }

    pub fn refusing(events: EventLog) -> Arc<Self> {
        Arc::new(Self {
            unlocks: AtomicUsize::new(0),
            outcome: Err(AuthenticationError::Failed("account suspended".into())),
            events,
        })
    }

    pub fn unlocks(&self) -> usize {
        self.unlocks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthenticationLock for CountingLock {
    async fn request_unlock(&self) -> Result<Credential, AuthenticationError> {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push("unlock");
        self.outcome.clone()
    }
}

/// Request as read off the socket by the programmable backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(CapturedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let request = match read_request(&mut socket).await {
                            Some(request) => request,
                            None => return,
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buffer.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    let end = buffer.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buffer[header_end..end]).into_owned();

    Some(CapturedRequest {
        method,
        target,
        headers,
        body,
    })
}
