//! One XAPI request/reply exchange over a dedicated TCP connection.
//!
//! A session walks `Idle -> Resolving -> Connecting -> Sending -> Receiving`
//! and ends in `Parsed`, `Failed`, or `Cancelled`. Every wait is cut into
//! ticks; the caller's [`CancelSignal`] is consulted at the top of each tick,
//! so cancellation is observed within one tick but never preempts an
//! in-flight read or write.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use acsapi::Status;
use bytes::BytesMut;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::time;
use tracing::{debug, info, trace, warn};
use xapi_xml::{Document, XmlError};

use crate::stats::SessionStats;

/// Session constants.
pub mod consts {
    use std::time::Duration;

    /// Initial receive buffer size and the step by which it grows.
    pub const RECV_INCREMENT: usize = 16 * 1024;
    /// Granularity of every bounded wait; cancellation is checked once per tick.
    pub const TICK: Duration = Duration::from_secs(1);
    /// Retries allowed when a connect reports would-block.
    pub const MAX_CONNECT_RETRIES: usize = 10;
    /// Retries allowed when a read is interrupted.
    pub const MAX_INTERRUPT_RETRIES: usize = 10;
    /// Pause between connect or interrupted-read retries.
    pub const RETRY_PAUSE: Duration = Duration::from_secs(1);

    pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);
    pub const RECV_FIRST_TIMEOUT: Duration = Duration::from_secs(300);
    pub const RECV_NEXT_TIMEOUT: Duration = Duration::from_secs(600);

    /// Reply wrapper tags that must both be present before parsing.
    pub const REPLY_OPEN: &[u8] = b"<libreply>";
    pub const REPLY_CLOSE: &[u8] = b"</libreply>";
    /// Name of the reply document root element.
    pub const REPLY_ROOT: &str = "libreply";
}

/// Cooperative cancellation signal polled by the session once per tick.
pub trait CancelSignal: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl CancelSignal for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Signal for callers that can never be cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl CancelSignal for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Timeout tiers applied to one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Bound on connect and on each wait for the socket to become writable.
    pub send: Duration,
    /// Wait before the first chunk of the reply.
    pub recv_first: Duration,
    /// Wait before each subsequent chunk.
    pub recv_next: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            send: consts::SEND_TIMEOUT,
            recv_first: consts::RECV_FIRST_TIMEOUT,
            recv_next: consts::RECV_NEXT_TIMEOUT,
        }
    }
}

/// Address family preference used when resolving the server name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpFamily {
    /// Prefer an IPv6 result, fall back to the first IPv4 one.
    #[default]
    Any,
    V4,
    V6,
}

impl IpFamily {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Some(IpFamily::Any),
            "ipv4" | "v4" | "4" => Some(IpFamily::V4),
            "ipv6" | "v6" | "6" => Some(IpFamily::V6),
            _ => None,
        }
    }

    /// Pick the address to connect to from a resolver result.
    pub fn select(self, candidates: &[SocketAddr]) -> Option<SocketAddr> {
        let v6 = candidates.iter().copied().find(SocketAddr::is_ipv6);
        let v4 = candidates.iter().copied().find(SocketAddr::is_ipv4);
        match self {
            IpFamily::Any => v6.or(v4),
            IpFamily::V4 => v4,
            IpFamily::V6 => v6,
        }
    }
}

/// Where and how to reach the XAPI server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub host: String,
    pub port: u16,
    pub family: IpFamily,
    pub timeouts: Timeouts,
    /// Poll granularity, [`consts::TICK`] unless shortened for tests.
    pub tick: Duration,
}

impl SessionOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            family: IpFamily::Any,
            timeouts: Timeouts::default(),
            tick: consts::TICK,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_family(mut self, family: IpFamily) -> Self {
        self.family = family;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Resolving,
    Connecting,
    Sending,
    Receiving,
    Parsed,
    Failed,
    Cancelled,
}

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("session failure: {0}")]
    Failure(String),
    #[error("timeout waiting for {0}")]
    Timeout(&'static str),
    #[error("session cancelled")]
    Cancelled,
    #[error("reply: {0}")]
    Xml(#[from] XmlError),
}

impl SessionError {
    /// ACSAPI status reported for this error.
    pub fn status(&self) -> Status {
        match self {
            SessionError::Timeout(_) => Status::NiTimeout,
            SessionError::Cancelled => Status::Cancelled,
            SessionError::Io(_) | SessionError::Failure(_) | SessionError::Xml(_) => {
                Status::NiFailure
            }
        }
    }
}

/// Await `fut` one tick at a time, checking `cancel` before every tick.
///
/// `budget` is the wait still allowed and is reduced by the time spent here,
/// so repeated waits for the same event share one timeout.
async fn tick_wait<F: Future>(
    fut: F,
    budget: &mut Duration,
    tick: Duration,
    cancel: &dyn CancelSignal,
    what: &'static str,
) -> Result<F::Output, SessionError> {
    tokio::pin!(fut);
    let tick = tick.max(Duration::from_millis(1));
    loop {
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        if budget.is_zero() {
            return Err(SessionError::Timeout(what));
        }
        let slice = tick.min(*budget);
        let started = Instant::now();
        let outcome = time::timeout(slice, fut.as_mut()).await;
        *budget = budget.saturating_sub(started.elapsed().min(slice));
        if let Ok(output) = outcome {
            return Ok(output);
        }
    }
}

/// Whether another retry is allowed after `retries` failed attempts.
fn within_retries(retries: usize, max: usize) -> bool {
    retries <= max
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Validate the reply wrapper and parse the collected bytes.
pub fn decode_reply(raw: &[u8]) -> Result<Document, SessionError> {
    if raw.is_empty() {
        return Err(SessionError::Failure("empty reply".into()));
    }
    if !contains(raw, consts::REPLY_OPEN) || !contains(raw, consts::REPLY_CLOSE) {
        return Err(SessionError::Failure("reply wrapper missing".into()));
    }
    let doc = xapi_xml::parse(raw)?;
    match doc.root().and_then(|root| doc.name(root)) {
        Some(consts::REPLY_ROOT) => Ok(doc),
        other => Err(SessionError::Failure(format!(
            "unexpected reply root {other:?}"
        ))),
    }
}

fn open_socket(addr: SocketAddr) -> Result<TcpSocket, SessionError> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nonblocking(true)?;
    socket.set_nodelay(true)?;
    socket.set_keepalive(true)?;
    Ok(TcpSocket::from_std_stream(socket.into()))
}

/// TCP session engine for XAPI exchanges.
///
/// ```rust,no_run
/// use tl_xapi::{NeverCancelled, SessionOptions, SessionStats, XapiSession};
///
/// # async fn run() -> Result<(), tl_xapi::SessionError> {
/// let mut session = XapiSession::new(SessionOptions::new("xapi.example", 8080), SessionStats::new());
/// let reply = session.transact(b"<libtrans></libtrans>", &NeverCancelled).await?;
/// println!("reply has {} elements", reply.len());
/// # Ok(())
/// # }
/// ```
pub struct XapiSession {
    options: SessionOptions,
    stats: SessionStats,
    state: SessionState,
}

impl XapiSession {
    pub fn new(options: SessionOptions, stats: SessionStats) -> Self {
        Self {
            options,
            stats,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    fn enter(&mut self, state: SessionState) {
        debug!(from = ?self.state, to = ?state, "XAPI session state");
        self.state = state;
    }

    /// Send `request` and return the parsed reply document.
    ///
    /// The socket is shut down and the raw reply buffer released on every
    /// path; callers only ever see the parsed document.
    pub async fn transact(
        &mut self,
        request: &[u8],
        cancel: &dyn CancelSignal,
    ) -> Result<Document, SessionError> {
        let started = Instant::now();
        let result = self.run(request, cancel).await;
        match &result {
            Ok(doc) => {
                self.enter(SessionState::Parsed);
                self.stats.record_exchange(started.elapsed());
                debug!(elements = doc.len(), elapsed = ?started.elapsed(), "XAPI exchange complete");
            }
            Err(SessionError::Cancelled) => {
                self.enter(SessionState::Cancelled);
                self.stats.record_cancellation();
                warn!(host = %self.options.host, "XAPI session cancelled");
            }
            Err(err @ SessionError::Timeout(_)) => {
                self.enter(SessionState::Failed);
                self.stats.record_timeout();
                warn!(host = %self.options.host, %err, "XAPI session timed out");
            }
            Err(err) => {
                self.enter(SessionState::Failed);
                self.stats.record_failure();
                warn!(host = %self.options.host, %err, "XAPI session failed");
            }
        }
        result
    }

    async fn run(
        &mut self,
        request: &[u8],
        cancel: &dyn CancelSignal,
    ) -> Result<Document, SessionError> {
        self.enter(SessionState::Resolving);
        let addr = self.resolve().await?;

        self.enter(SessionState::Connecting);
        let mut stream = self.connect(addr, cancel).await?;
        let exchanged = self.converse(&stream, request, cancel).await;
        if let Err(err) = stream.shutdown().await {
            debug!(%addr, ?err, "socket shutdown failed");
        }
        drop(stream);

        let raw = exchanged?;
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        decode_reply(&raw)
    }

    async fn resolve(&self) -> Result<SocketAddr, SessionError> {
        let host = self.options.host.as_str();
        let candidates: Vec<SocketAddr> = lookup_host((host, self.options.port))
            .await
            .map_err(|err| SessionError::Failure(format!("resolve {host}: {err}")))?
            .collect();
        let addr = self.options.family.select(&candidates).ok_or_else(|| {
            SessionError::Failure(format!(
                "no {:?} address for {host}",
                self.options.family
            ))
        })?;
        trace!(%host, %addr, candidates = candidates.len(), "resolved XAPI server");
        Ok(addr)
    }

    async fn connect(
        &self,
        addr: SocketAddr,
        cancel: &dyn CancelSignal,
    ) -> Result<TcpStream, SessionError> {
        let timeouts = self.options.timeouts;
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let socket = open_socket(addr)?;
            let mut budget = timeouts.send;
            let connected = tick_wait(
                socket.connect(addr),
                &mut budget,
                self.options.tick,
                cancel,
                "connect",
            )
            .await?;
            match connected {
                Ok(stream) => {
                    info!(%addr, attempt, "connected to XAPI server");
                    self.stats.record_connect();
                    return Ok(stream);
                }
                Err(err)
                    if err.kind() == io::ErrorKind::WouldBlock
                        && within_retries(attempt, consts::MAX_CONNECT_RETRIES) =>
                {
                    warn!(%addr, attempt, "connect would block, retrying");
                    if cancel.is_cancelled() {
                        return Err(SessionError::Cancelled);
                    }
                    time::sleep(consts::RETRY_PAUSE).await;
                }
                Err(err) => {
                    return Err(SessionError::Failure(format!("connect {addr}: {err}")));
                }
            }
        }
    }

    async fn converse(
        &mut self,
        stream: &TcpStream,
        request: &[u8],
        cancel: &dyn CancelSignal,
    ) -> Result<BytesMut, SessionError> {
        let timeouts = self.options.timeouts;
        let tick = self.options.tick;

        self.enter(SessionState::Sending);
        let mut written = 0usize;
        let mut budget = timeouts.send;
        while written < request.len() {
            tick_wait(stream.writable(), &mut budget, tick, cancel, "send").await??;
            match stream.try_write(&request[written..]) {
                Ok(n) => {
                    written += n;
                    budget = timeouts.send;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => continue,
                Err(err) => return Err(err.into()),
            }
        }
        self.stats.record_sent(written);
        trace!(bytes = written, "sent XAPI request");

        self.enter(SessionState::Receiving);
        let mut buf = BytesMut::with_capacity(consts::RECV_INCREMENT);
        let mut zero_reads = 0usize;
        let mut interrupts = 0usize;
        let mut budget = timeouts.recv_first;
        loop {
            tick_wait(stream.readable(), &mut budget, tick, cancel, "reply").await??;
            if buf.capacity() == buf.len() {
                buf.reserve(consts::RECV_INCREMENT);
                trace!(capacity = buf.capacity(), "grew receive buffer");
            }
            match stream.try_read_buf(&mut buf) {
                Ok(0) => {
                    zero_reads += 1;
                    if zero_reads >= 2 {
                        break;
                    }
                }
                Ok(n) => {
                    zero_reads = 0;
                    budget = timeouts.recv_next;
                    trace!(bytes = n, total = buf.len(), "received reply chunk");
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => continue,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                    interrupts += 1;
                    if !within_retries(interrupts, consts::MAX_INTERRUPT_RETRIES) {
                        return Err(err.into());
                    }
                    warn!(attempt = interrupts, "receive interrupted, retrying");
                    if cancel.is_cancelled() {
                        return Err(SessionError::Cancelled);
                    }
                    time::sleep(consts::RETRY_PAUSE).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
        self.stats.record_received(buf.len());
        debug!(bytes = buf.len(), "XAPI reply received");
        Ok(buf)
    }
}
